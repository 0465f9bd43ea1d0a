//! Host backed by a resource-pack-like directory.
//!
//! Layout under the pack root:
//!
//! - `states.json`: `{ "<family>": { "<state>": "<ns:path#variant>" } }`
//! - `models/<ns>/<path>#<variant>.json`, falling back to `models/<ns>/<path>.json`
//! - `textures/<ns>/<path>.png`
//! - `<ns>/<compound_blockstate>` for compound namespaces

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    assets::decode::{decode_image, texture_resource_path},
    config::SynthConfig,
    foundation::core::{AssetLocation, ModelLocation, VisualState},
    foundation::error::{SynthError, SynthResult},
    host::{ImageSource, ModelHost, StateResolver},
    model::{Model, TextureRemap},
};

/// Pack-relative path of a model description: `models/<ns>/<path>#<variant>.json`.
pub fn model_resource_path(location: &ModelLocation) -> String {
    format!(
        "models/{}/{}#{}.json",
        location.location.namespace, location.location.path, location.variant
    )
}

#[derive(Debug)]
pub struct PackHost {
    root: PathBuf,
    config: SynthConfig,
    states: HashMap<AssetLocation, HashMap<VisualState, ModelLocation>>,
}

impl PackHost {
    /// Open the pack at `root`, reading its state table up front.
    pub fn open(root: impl Into<PathBuf>, config: SynthConfig) -> SynthResult<Self> {
        let root = root.into();
        let states_path = root.join("states.json");
        let text = std::fs::read_to_string(&states_path)
            .with_context(|| format!("read state table '{}'", states_path.display()))?;
        let raw: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(&text)?;

        let mut states = HashMap::with_capacity(raw.len());
        for (family, entries) in raw {
            let family = AssetLocation::parse(&family)?;
            let mut by_state = HashMap::with_capacity(entries.len());
            for (state, model) in entries {
                let model = ModelLocation::parse_with_default(&model, &config.default_model_variant)?;
                by_state.insert(VisualState::new(state), model);
            }
            states.insert(family, by_state);
        }
        tracing::debug!(root = %root.display(), families = states.len(), "pack opened");

        Ok(Self {
            root,
            config,
            states,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    fn read_model_file(&self, location: &ModelLocation) -> SynthResult<Option<Model>> {
        let exact = self.root.join(model_resource_path(location));
        let shared = self.root.join(format!(
            "models/{}/{}.json",
            location.location.namespace, location.location.path
        ));
        let Some(path) = [exact, shared].into_iter().find(|p| p.is_file()) else {
            return Ok(None);
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("read model '{}'", path.display()))?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Derive the model behind a generated compound location from its original.
    fn derived_model(&self, location: &ModelLocation) -> Option<SynthResult<Model>> {
        if location.namespace() != self.config.generated_namespace {
            return None;
        }
        let (stem, original) = self
            .config
            .split_generated_model_path(&location.location.path)?;
        let original = ModelLocation::new(original, location.variant.clone());
        Some(self.load_model(&original).map(|model| {
            let remap: TextureRemap = model
                .texture_locations()
                .into_iter()
                .map(|t| {
                    let derived = self.config.derived_texture(&stem, &t);
                    (t, derived)
                })
                .collect();
            model.retextured(&remap)
        }))
    }
}

impl StateResolver for PackHost {
    fn resolve(&self, family: &AssetLocation, state: &VisualState) -> Option<ModelLocation> {
        self.states.get(family)?.get(state).cloned()
    }
}

impl ImageSource for PackHost {
    fn load_image(&self, location: &AssetLocation) -> SynthResult<image::DynamicImage> {
        let path = self.root.join(texture_resource_path(location));
        let bytes =
            std::fs::read(&path).with_context(|| format!("read texture '{}'", path.display()))?;
        decode_image(&bytes)
    }
}

impl ModelHost for PackHost {
    fn model(&self, location: &ModelLocation) -> Option<Model> {
        match self.read_model_file(location) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(model = %location, error = %err, "unreadable model");
                None
            }
        }
    }

    fn retexture(&self, model: &Model, remap: &TextureRemap) -> Option<Model> {
        model.retexturable.then(|| model.retextured(remap))
    }

    fn load_model(&self, location: &ModelLocation) -> SynthResult<Model> {
        if let Some(derived) = self.derived_model(location) {
            return derived;
        }
        self.read_model_file(location)?
            .ok_or_else(|| SynthError::resolution(format!("model {location} not found")))
    }

    fn read_blockstate(&self, namespace: &str, path: &str) -> SynthResult<serde_json::Value> {
        let file = self.root.join(namespace).join(path);
        let text = std::fs::read_to_string(&file)
            .with_context(|| format!("read blockstate '{}'", file.display()))?;
        Ok(serde_json::from_str(&text)?)
    }
}
