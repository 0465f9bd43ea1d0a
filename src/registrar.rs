use std::collections::BTreeMap;

use crate::{
    foundation::core::{AssetLocation, ModelLocation},
    host::AssetRegistrar,
    model::{ItemBinding, Model},
    producer::LazyPixelProducer,
};

/// Registrar that simply keeps what it is given, keyed by location.
///
/// Re-registering a location replaces the earlier entry, mirroring how host registries behave
/// across rebuilds.
#[derive(Debug, Default)]
pub struct CollectingRegistrar {
    pub textures: BTreeMap<AssetLocation, LazyPixelProducer>,
    pub models: BTreeMap<ModelLocation, Model>,
    pub items: BTreeMap<(AssetLocation, u8), ModelLocation>,
}

impl CollectingRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.models.clear();
        self.items.clear();
    }
}

impl AssetRegistrar for CollectingRegistrar {
    fn register_lazy_texture(&mut self, location: AssetLocation, producer: LazyPixelProducer) {
        self.textures.insert(location, producer);
    }

    fn put_model(&mut self, location: ModelLocation, model: Model) {
        self.models.insert(location, model);
    }

    fn bind_item_model(&mut self, binding: ItemBinding) {
        self.items
            .insert((binding.item, binding.slot), binding.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::PixelBuffer;

    #[test]
    fn later_registration_replaces_earlier() {
        let mut reg = CollectingRegistrar::new();
        let loc = AssetLocation::parse("g:blocks/x").unwrap();
        let a = LazyPixelProducer::new(|| PixelBuffer::new(1, 1, vec![0; 4]).unwrap());
        let b = LazyPixelProducer::new(|| PixelBuffer::new(1, 1, vec![1; 4]).unwrap());
        reg.register_lazy_texture(loc.clone(), a);
        reg.register_lazy_texture(loc.clone(), b.clone());
        assert_eq!(reg.textures.len(), 1);
        assert!(reg.textures[&loc].same_producer(&b));

        reg.bind_item_model(ItemBinding {
            item: AssetLocation::parse("ucw:planks").unwrap(),
            slot: 3,
            target: ModelLocation::parse("ucw:planks#v=3").unwrap(),
        });
        assert_eq!(reg.items.len(), 1);

        reg.clear();
        assert!(reg.textures.is_empty() && reg.items.is_empty());
    }
}
