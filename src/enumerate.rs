//! Expansion of the rule table into concrete variants, one synthesis pass at a time.
//!
//! A pass walks every rule, every live `from` ordinal and every live through-slot. For each
//! `(ordinal, slot)` it derives a texture location per through texture, hands out one
//! [`LazyPixelProducer`] per new derived texture, and binds a model under the factory's target
//! location. Failures are contained: a bad lookup skips one `(rule, ordinal, slot)` triple, and a
//! rule-data invariant violation discards that rule's whole expansion.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    assets::cache::{ImageCache, SharedImageCache},
    assets::{PixelBuffer, PixelView},
    composite::{BlendMode, composite},
    config::SynthConfig,
    foundation::core::{AssetLocation, ModelLocation, VisualState},
    foundation::error::{SynthError, SynthResult},
    host::{AssetRegistrar, ImageSource, ProgressSink, SynthesisHost},
    model::{ItemBinding, Model, TextureRemap},
    producer::LazyPixelProducer,
    rules::{RuleTable, VariantRule},
};

/// Identifier of one synthesized variant: `(sanitized from family + ordinal, through-slot)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct DerivedId {
    pub stem: String,
    pub slot: u8,
}

impl fmt::Display for DerivedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.stem, self.slot)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct DerivedVariant {
    pub id: DerivedId,
    pub rule: usize,
    pub ordinal: usize,
    pub target: ModelLocation,
    pub textures: Vec<AssetLocation>,
}

#[derive(Clone, Debug)]
pub struct TextureEntry {
    pub location: AssetLocation,
    pub variant: DerivedId,
    pub producer: LazyPixelProducer,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelBinding {
    pub variant: DerivedId,
    pub target: ModelLocation,
    pub model: Model,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SkippedEntry {
    pub rule: usize,
    pub ordinal: usize,
    pub slot: u8,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct RuleFailure {
    pub rule: usize,
    pub reason: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SynthesisReport {
    pub rules: usize,
    pub variants: usize,
    pub textures: usize,
    pub models: usize,
    pub skipped: usize,
    pub failed_rules: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Synthesis {
    pub rules: usize,
    pub variants: Vec<DerivedVariant>,
    pub textures: Vec<TextureEntry>,
    pub models: Vec<ModelBinding>,
    pub items: Vec<ItemBinding>,
    pub skipped: Vec<SkippedEntry>,
    pub failed_rules: Vec<RuleFailure>,
}

impl Synthesis {
    pub fn report(&self) -> SynthesisReport {
        SynthesisReport {
            rules: self.rules,
            variants: self.variants.len(),
            textures: self.textures.len(),
            models: self.models.len(),
            skipped: self.skipped.len(),
            failed_rules: self.failed_rules.len(),
        }
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn install(&self, registrar: &mut dyn AssetRegistrar) -> SynthesisReport {
        for entry in &self.textures {
            registrar.register_lazy_texture(entry.location.clone(), entry.producer.clone());
        }
        for binding in &self.models {
            registrar.put_model(binding.target.clone(), binding.model.clone());
        }
        for item in &self.items {
            registrar.bind_item_model(item.clone());
        }
        self.report()
    }

    /// Run every texture producer (in parallel) and return the resulting buffers in order.
    pub fn bake_all(&self) -> Vec<(AssetLocation, Arc<PixelBuffer>)> {
        self.textures
            .par_iter()
            .map(|entry| (entry.location.clone(), entry.producer.produce()))
            .collect()
    }
}

#[derive(Clone, Debug)]
struct OrdinalSources {
    from: AssetLocation,
    overlay: AssetLocation,
    based_upon: AssetLocation,
}

/// Per-rule staging area; merged into the pass only if the rule expands cleanly.
#[derive(Default)]
struct RuleExpansion {
    variants: Vec<DerivedVariant>,
    textures: Vec<TextureEntry>,
    models: Vec<ModelBinding>,
    items: Vec<ItemBinding>,
    skipped: Vec<SkippedEntry>,
}

#[derive(Default)]
struct Claims {
    ids: HashMap<DerivedId, usize>,
    targets: HashMap<ModelLocation, DerivedId>,
    textures: HashMap<AssetLocation, usize>,
}

impl Claims {
    fn check(&self, rule: usize, expansion: &RuleExpansion) -> SynthResult<()> {
        let mut ids = HashSet::new();
        let mut targets = HashSet::new();
        for v in &expansion.variants {
            if self.ids.contains_key(&v.id) || !ids.insert(&v.id) {
                return Err(SynthError::validation(format!(
                    "derived id {} is produced more than once",
                    v.id
                )));
            }
            if let Some(owner) = self.targets.get(&v.target) {
                return Err(SynthError::validation(format!(
                    "target {} of {} already belongs to {owner}",
                    v.target, v.id
                )));
            }
            if !targets.insert(&v.target) {
                return Err(SynthError::validation(format!(
                    "target {} is produced more than once",
                    v.target
                )));
            }
        }
        for t in &expansion.textures {
            if let Some(&owner) = self.textures.get(&t.location) {
                if owner != rule {
                    return Err(SynthError::validation(format!(
                        "texture {} already derived by rule {owner}",
                        t.location
                    )));
                }
            }
        }
        Ok(())
    }

    fn commit(&mut self, rule: usize, expansion: &RuleExpansion) {
        for v in &expansion.variants {
            self.ids.insert(v.id.clone(), rule);
            self.targets.insert(v.target.clone(), v.id.clone());
        }
        for t in &expansion.textures {
            self.textures.insert(t.location.clone(), rule);
        }
    }
}

/// Owns the caches of one host session and runs synthesis passes against it.
pub struct SynthesisSession {
    config: SynthConfig,
    cache: SharedImageCache,
    images: Arc<dyn ImageSource + Send + Sync>,
    blockstates: HashMap<String, serde_json::Value>,
}

impl SynthesisSession {
    pub fn new(config: SynthConfig, images: Arc<dyn ImageSource + Send + Sync>) -> Self {
        Self {
            config,
            cache: ImageCache::shared(),
            images,
            blockstates: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn cache(&self) -> &SharedImageCache {
        &self.cache
    }

    pub fn on_atlas_rebuild_begin(&mut self) {
        self.cache.lock().clear();
    }

    pub fn on_model_rebuild_begin(&mut self) {
        self.cache.lock().clear();
        self.blockstates.clear();
    }

    /// Atlas-rebuild entry point: clear caches, synthesize, and install into `registrar`.
    pub fn rebuild(
        &mut self,
        table: &RuleTable,
        host: &dyn SynthesisHost,
        registrar: &mut dyn AssetRegistrar,
        progress: &mut dyn ProgressSink,
    ) -> Synthesis {
        self.on_atlas_rebuild_begin();
        let synthesis = self.synthesize(table, host, progress);
        let report = synthesis.install(registrar);
        tracing::info!(?report, "synthesis installed");
        synthesis
    }

    /// Expand every rule of `table`. Nothing is decoded or composited here; that work is
    /// deferred into the returned producers.
    #[tracing::instrument(skip_all, fields(rules = table.len()))]
    pub fn synthesize(
        &mut self,
        table: &RuleTable,
        host: &dyn SynthesisHost,
        progress: &mut dyn ProgressSink,
    ) -> Synthesis {
        let mut out = Synthesis {
            rules: table.len(),
            ..Synthesis::default()
        };
        let mut claims = Claims::default();

        progress.push("generating models", table.len());
        for (index, rule) in table.iter().enumerate() {
            progress.step(&format!("{}%", (index + 1) * 100 / table.len()));

            let expansion = rule
                .validate()
                .and_then(|()| self.expand_rule(index, rule, host))
                .and_then(|exp| claims.check(index, &exp).map(|()| exp));

            match expansion {
                Ok(exp) => {
                    claims.commit(index, &exp);
                    out.variants.extend(exp.variants);
                    out.textures.extend(exp.textures);
                    out.models.extend(exp.models);
                    out.items.extend(exp.items);
                    out.skipped.extend(exp.skipped);
                }
                Err(err) => {
                    tracing::error!(rule = index, from = %rule.from_family, error = %err, "rule discarded");
                    out.failed_rules.push(RuleFailure {
                        rule: index,
                        reason: err.to_string(),
                    });
                }
            }
        }
        progress.pop();

        tracing::debug!(report = ?out.report(), "synthesis pass finished");
        out
    }

    fn expand_rule(
        &mut self,
        index: usize,
        rule: &VariantRule,
        host: &dyn SynthesisHost,
    ) -> SynthResult<RuleExpansion> {
        let mut exp = RuleExpansion::default();
        let mut seen_textures: HashMap<AssetLocation, AssetLocation> = HashMap::new();

        for (ordinal, from_state) in rule.live_ordinals() {
            let stem = rule.stem(ordinal);
            let factory = &rule.factories[ordinal];

            let sources = match self.ordinal_sources(rule, ordinal, from_state, host) {
                Ok(s) => s,
                Err(err) => {
                    tracing::warn!(rule = index, ordinal, error = %err, "sources unresolved, ordinal skipped");
                    for (slot, _) in rule.live_slots() {
                        exp.skipped.push(SkippedEntry {
                            rule: index,
                            ordinal,
                            slot,
                            reason: err.to_string(),
                        });
                    }
                    continue;
                }
            };

            for (slot, through_state) in rule.live_slots() {
                let id = DerivedId {
                    stem: stem.clone(),
                    slot,
                };
                let target = factory.target_for(slot)?;

                let (through_loc, through_model) =
                    match resolve_model(host, &rule.through_family, through_state) {
                        Ok(found) => found,
                        Err(err) => {
                            tracing::warn!(rule = index, ordinal, slot, error = %err, "through asset unresolved, skipped");
                            exp.skipped.push(SkippedEntry {
                                rule: index,
                                ordinal,
                                slot,
                                reason: err.to_string(),
                            });
                            continue;
                        }
                    };

                let mut remap = TextureRemap::new();
                for original in through_model.texture_locations() {
                    let derived = self.config.derived_texture(&stem, &original);
                    match seen_textures.get(&derived) {
                        Some(prev) if *prev != original => {
                            return Err(SynthError::validation(format!(
                                "textures {prev} and {original} both derive to {derived}"
                            )));
                        }
                        Some(_) => {}
                        None => {
                            seen_textures.insert(derived.clone(), original.clone());
                            exp.textures.push(TextureEntry {
                                location: derived.clone(),
                                variant: id.clone(),
                                producer: self.producer(&sources, original.clone(), rule.mode),
                            });
                        }
                    }
                    remap.insert(original, derived);
                }

                match self.bind_model(host, &through_loc, &through_model, &remap, &stem) {
                    Ok(Some(model)) => exp.models.push(ModelBinding {
                        variant: id.clone(),
                        target: target.clone(),
                        model,
                    }),
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(rule = index, ordinal, slot, error = %err, "compound model unavailable");
                        exp.skipped.push(SkippedEntry {
                            rule: index,
                            ordinal,
                            slot,
                            reason: err.to_string(),
                        });
                    }
                }

                exp.items.push(ItemBinding {
                    item: factory.family().clone(),
                    slot,
                    target: target.clone(),
                });
                exp.variants.push(DerivedVariant {
                    id,
                    rule: index,
                    ordinal,
                    target,
                    textures: remap.into_values().collect(),
                });
            }
        }

        Ok(exp)
    }

    fn ordinal_sources(
        &self,
        rule: &VariantRule,
        ordinal: usize,
        from_state: &VisualState,
        host: &dyn SynthesisHost,
    ) -> SynthResult<OrdinalSources> {
        // validate() guarantees both are present for live ordinals
        let overlay_state = rule.overlay[ordinal]
            .as_ref()
            .ok_or_else(|| SynthError::validation(format!("ordinal {ordinal} has no overlay")))?;
        let based_state = rule
            .based_upon_at(ordinal)
            .ok_or_else(|| SynthError::validation(format!("ordinal {ordinal} has no based_upon")))?;

        Ok(OrdinalSources {
            from: primary_texture(host, &rule.from_family, from_state)?,
            overlay: primary_texture(host, &rule.overlay_family, overlay_state)?,
            based_upon: primary_texture(host, &rule.based_upon_family, based_state)?,
        })
    }

    fn producer(
        &self,
        sources: &OrdinalSources,
        through_texture: AssetLocation,
        mode: BlendMode,
    ) -> LazyPixelProducer {
        let cache = Arc::clone(&self.cache);
        let images = Arc::clone(&self.images);
        let sources = sources.clone();
        LazyPixelProducer::new(move || {
            let [target, from, overlay, based_upon] = [
                &through_texture,
                &sources.from,
                &sources.overlay,
                &sources.based_upon,
            ]
            .map(|loc| load_pixels(&cache, images.as_ref(), loc));
            composite(
                view(&target),
                view(&from),
                view(&overlay),
                view(&based_upon),
                mode,
            )
        })
    }

    fn bind_model(
        &mut self,
        host: &dyn SynthesisHost,
        through_loc: &ModelLocation,
        through_model: &Model,
        remap: &TextureRemap,
        stem: &str,
    ) -> SynthResult<Option<Model>> {
        if through_loc.namespace() == self.config.compound_namespace {
            return self.compound_model(host, through_loc, stem);
        }
        Ok(host.retexture(through_model, remap))
    }

    /// Re-derive an externally-compound model from its blockstate definition.
    ///
    /// A through variant missing from the definition yields no binding.
    fn compound_model(
        &mut self,
        host: &dyn SynthesisHost,
        through_loc: &ModelLocation,
        stem: &str,
    ) -> SynthResult<Option<Model>> {
        let ns = self.config.compound_namespace.clone();
        if !self.blockstates.contains_key(&ns) {
            let def = host.read_blockstate(&ns, &self.config.compound_blockstate)?;
            self.blockstates.insert(ns.clone(), def);
        }

        let reference = self
            .blockstates
            .get(&ns)
            .and_then(|def| def.get("variants"))
            .and_then(|v| v.get(&through_loc.variant))
            .and_then(|v| v.get("model"))
            .and_then(serde_json::Value::as_str);
        let Some(reference) = reference else {
            return Ok(None);
        };

        let rewritten = self.config.compound_model_reference(reference, stem);
        let location =
            ModelLocation::parse_with_default(&rewritten, &self.config.default_model_variant)?;
        host.load_model(&location).map(Some)
    }
}

/// Decoded pixels of `location`; the source is read with the cache unlocked.
fn load_pixels(
    cache: &SharedImageCache,
    images: &dyn ImageSource,
    location: &AssetLocation,
) -> (u32, u32, Arc<Vec<u8>>) {
    let cached = cache.lock().get(location);
    let image = match cached {
        Some(hit) => hit,
        None => {
            let loaded = images.load_image(location);
            cache.lock().insert_loaded(location, loaded)
        }
    };
    let px = cache.lock().pixels(&image);
    (image.width(), image.height(), px)
}

fn view(entry: &(u32, u32, Arc<Vec<u8>>)) -> PixelView<'_> {
    PixelView::new(entry.0, entry.1, entry.2.as_slice()).unwrap_or_default()
}

fn resolve_model(
    host: &dyn SynthesisHost,
    family: &AssetLocation,
    state: &VisualState,
) -> SynthResult<(ModelLocation, Model)> {
    let loc = host
        .resolve(family, state)
        .ok_or_else(|| SynthError::resolution(format!("no model for {family}[{state}]")))?;
    let model = host
        .model(&loc)
        .ok_or_else(|| SynthError::resolution(format!("model {loc} not found")))?;
    Ok((loc, model))
}

fn primary_texture(
    host: &dyn SynthesisHost,
    family: &AssetLocation,
    state: &VisualState,
) -> SynthResult<AssetLocation> {
    let (loc, model) = resolve_model(host, family, state)?;
    model
        .primary_texture()
        .cloned()
        .ok_or_else(|| SynthError::resolution(format!("model {loc} has no textures")))
}
