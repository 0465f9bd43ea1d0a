use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "variant-synth", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the variants a rule file expands to, without compositing anything.
    Inspect(PackArgs),
    /// Composite every derived texture and write textures, models and item bindings.
    Bake(BakeArgs),
}

#[derive(Parser, Debug)]
struct PackArgs {
    /// Pack directory (states.json, models/, textures/).
    #[arg(long)]
    pack: PathBuf,

    /// Rule file JSON.
    #[arg(long)]
    rules: PathBuf,

    /// Synthesis config JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct BakeArgs {
    #[command(flatten)]
    pack: PackArgs,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args),
        Command::Bake(args) => cmd_bake(args),
    }
}

fn synthesize(args: &PackArgs) -> anyhow::Result<variant_synth::Synthesis> {
    let config = match &args.config {
        Some(path) => variant_synth::SynthConfig::load(path)?,
        None => variant_synth::SynthConfig::default(),
    };
    let table = variant_synth::RuleTable::load(&args.rules)
        .with_context(|| format!("load rules '{}'", args.rules.display()))?;
    let host = Arc::new(
        variant_synth::PackHost::open(&args.pack, config.clone())
            .with_context(|| format!("open pack '{}'", args.pack.display()))?,
    );

    let mut session = variant_synth::SynthesisSession::new(config, host.clone());
    let mut progress = variant_synth::TracingProgress::default();
    Ok(session.synthesize(&table, &*host, &mut progress))
}

fn cmd_inspect(args: PackArgs) -> anyhow::Result<()> {
    let synthesis = synthesize(&args)?;
    for v in &synthesis.variants {
        println!("{}\t{}\t{} textures", v.id, v.target, v.textures.len());
    }
    for s in &synthesis.skipped {
        println!(
            "skipped rule={} ordinal={} slot={}: {}",
            s.rule, s.ordinal, s.slot, s.reason
        );
    }
    for f in &synthesis.failed_rules {
        println!("failed rule={}: {}", f.rule, f.reason);
    }
    println!("{}", serde_json::to_string(&synthesis.report())?);
    Ok(())
}

fn cmd_bake(args: BakeArgs) -> anyhow::Result<()> {
    let synthesis = synthesize(&args.pack)?;

    for (location, pixels) in synthesis.bake_all() {
        let png = variant_synth::assets::decode::encode_png(&pixels)?;
        let path = args
            .out
            .join(variant_synth::assets::decode::texture_resource_path(&location));
        write_file(&path, &png)?;
    }
    for binding in &synthesis.models {
        let path = args
            .out
            .join(variant_synth::pack::model_resource_path(&binding.target));
        write_file(&path, &serde_json::to_vec_pretty(&binding.model)?)?;
    }
    write_file(
        &args.out.join("items.json"),
        &serde_json::to_vec_pretty(&synthesis.items)?,
    )?;

    let report = synthesis.report();
    tracing::info!(?report, out = %args.out.display(), "bake finished");
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))
}
