use std::path::Path;

use anyhow::Context;

use crate::foundation::core::{AssetLocation, DEFAULT_VARIANT};
use crate::foundation::error::SynthResult;

/// Naming and lookup settings for one synthesis session.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub generated_namespace: String,
    /// Path prefix of derived textures, followed by the variant stem.
    pub texture_prefix: String,
    pub model_prefix: String,
    pub compound_namespace: String,
    /// Blockstate file (relative to the compound namespace) listing compound variants.
    pub compound_blockstate: String,
    pub default_model_variant: String,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            generated_namespace: "ucw_generated".to_string(),
            texture_prefix: "blocks/ucw_ucw_".to_string(),
            model_prefix: "ucw_ucw_".to_string(),
            compound_namespace: "chisel".to_string(),
            compound_blockstate: "blockstates/default.json".to_string(),
            default_model_variant: DEFAULT_VARIANT.to_string(),
        }
    }
}

impl SynthConfig {
    pub fn from_json_str(s: &str) -> SynthResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> SynthResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Location of the derived copy of `original` for variant stem `stem`:
    /// `<generated>:<texture_prefix><stem>/<original ns>/<original path minus "blocks/">`.
    pub fn derived_texture(&self, stem: &str, original: &AssetLocation) -> AssetLocation {
        let path = original
            .path
            .strip_prefix("blocks/")
            .unwrap_or(&original.path);
        AssetLocation {
            namespace: self.generated_namespace.clone(),
            path: format!(
                "{}{stem}/{}/{path}",
                self.texture_prefix, original.namespace
            ),
        }
    }

    /// Rewrite a compound model reference (`<compound ns>:<rest>`) into the generated namespace.
    ///
    /// References outside the compound namespace are returned unchanged.
    pub fn compound_model_reference(&self, reference: &str, stem: &str) -> String {
        let tag = format!("{}:", self.compound_namespace);
        match reference.trim().strip_prefix(&tag) {
            Some(rest) => format!(
                "{}:{}{stem}/{}/{rest}",
                self.generated_namespace, self.model_prefix, self.compound_namespace
            ),
            None => reference.to_string(),
        }
    }

    /// Inverse of [`SynthConfig::compound_model_reference`] on the path part:
    /// `<model_prefix><stem>/<ns>/<rest>` yields `(stem, <ns>:<rest>)`.
    pub fn split_generated_model_path(&self, path: &str) -> Option<(String, AssetLocation)> {
        let rest = path.strip_prefix(&self.model_prefix)?;
        let (stem, rest) = rest.split_once('/')?;
        let (ns, rest) = rest.split_once('/')?;
        let original = AssetLocation::new(ns, rest).ok()?;
        Some((stem.to_string(), original))
    }
}
