use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    foundation::core::{AssetLocation, ModelLocation, VisualState},
    foundation::error::{SynthError, SynthResult},
    host::{ImageSource, ModelHost, StateResolver},
    model::{Model, TextureRemap},
};

/// Host backed entirely by in-memory tables.
///
/// Useful for embedding with pre-loaded assets and as the reference host in tests. Images are
/// kept as encoded bytes so every load really decodes.
#[derive(Debug, Default)]
pub struct MemoryHost {
    states: HashMap<(AssetLocation, VisualState), ModelLocation>,
    models: HashMap<ModelLocation, Model>,
    images: HashMap<AssetLocation, Vec<u8>>,
    blockstates: HashMap<(String, String), serde_json::Value>,
    image_loads: AtomicU64,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(
        mut self,
        family: AssetLocation,
        state: VisualState,
        model: ModelLocation,
    ) -> Self {
        self.states.insert((family, state), model);
        self
    }

    pub fn with_model(mut self, location: ModelLocation, model: Model) -> Self {
        self.models.insert(location, model);
        self
    }

    /// Register encoded image bytes (any format the `image` crate can decode).
    pub fn with_image_bytes(mut self, location: AssetLocation, bytes: Vec<u8>) -> Self {
        self.images.insert(location, bytes);
        self
    }

    pub fn with_image(self, location: AssetLocation, image: &image::RgbaImage) -> SynthResult<Self> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| SynthError::decode(e.to_string()))?;
        Ok(self.with_image_bytes(location, bytes))
    }

    pub fn with_blockstate(
        mut self,
        namespace: impl Into<String>,
        path: impl Into<String>,
        definition: serde_json::Value,
    ) -> Self {
        self.blockstates
            .insert((namespace.into(), path.into()), definition);
        self
    }

    pub fn image_loads(&self) -> u64 {
        self.image_loads.load(Ordering::Relaxed)
    }
}

impl StateResolver for MemoryHost {
    fn resolve(&self, family: &AssetLocation, state: &VisualState) -> Option<ModelLocation> {
        self.states.get(&(family.clone(), state.clone())).cloned()
    }
}

impl ImageSource for MemoryHost {
    fn load_image(&self, location: &AssetLocation) -> SynthResult<image::DynamicImage> {
        self.image_loads.fetch_add(1, Ordering::Relaxed);
        let bytes = self
            .images
            .get(location)
            .ok_or_else(|| SynthError::resolution(format!("no image for {location}")))?;
        crate::assets::decode::decode_image(bytes)
    }
}

impl ModelHost for MemoryHost {
    fn model(&self, location: &ModelLocation) -> Option<Model> {
        self.models.get(location).cloned()
    }

    fn retexture(&self, model: &Model, remap: &TextureRemap) -> Option<Model> {
        model.retexturable.then(|| model.retextured(remap))
    }

    fn load_model(&self, location: &ModelLocation) -> SynthResult<Model> {
        self.model(location)
            .ok_or_else(|| SynthError::resolution(format!("model {location} not found")))
    }

    fn read_blockstate(&self, namespace: &str, path: &str) -> SynthResult<serde_json::Value> {
        self.blockstates
            .get(&(namespace.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| {
                SynthError::resolution(format!("no blockstate '{path}' in namespace {namespace}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_and_retexture_flag() {
        let fam = AssetLocation::parse("minecraft:planks").unwrap();
        let ml = ModelLocation::parse("minecraft:planks#variant=oak").unwrap();
        let mut fixed = Model::with_textures([("all", AssetLocation::parse("a:b").unwrap())]);
        fixed.retexturable = false;

        let host = MemoryHost::new()
            .with_state(fam.clone(), VisualState::new("variant=oak"), ml.clone())
            .with_model(ml.clone(), fixed.clone());

        assert_eq!(host.resolve(&fam, &VisualState::new("variant=oak")), Some(ml.clone()));
        assert_eq!(host.resolve(&fam, &VisualState::new("variant=birch")), None);
        assert_eq!(host.retexture(&fixed, &TextureRemap::new()), None);
        assert!(host.load_model(&ModelLocation::parse("x:y").unwrap()).is_err());
    }

    #[test]
    fn images_decode_on_every_load() {
        let loc = AssetLocation::parse("m:blocks/a").unwrap();
        let img = image::RgbaImage::from_raw(1, 1, vec![1, 2, 3, 255]).unwrap();
        let host = MemoryHost::new().with_image(loc.clone(), &img).unwrap();
        host.load_image(&loc).unwrap();
        host.load_image(&loc).unwrap();
        assert_eq!(host.image_loads(), 2);
        assert!(host.load_image(&AssetLocation::parse("m:none").unwrap()).is_err());
    }
}
