use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    assets::decode::{extract_rgba8, missing_texture},
    assets::{ImageHandle, SourceImage},
    foundation::core::AssetLocation,
    foundation::error::SynthResult,
    host::ImageSource,
};

pub type SharedImageCache = Arc<parking_lot::Mutex<ImageCache>>;

/// Two-level cache scoped to one synthesis session.
///
/// - decoded images keyed by asset location (decode failures cache the missing placeholder)
/// - extracted RGBA8 pixels keyed by [`ImageHandle`], i.e. by decode identity, not content
///
/// Both levels are only ever cleared in full, see [`ImageCache::clear`].
#[derive(Debug, Default)]
pub struct ImageCache {
    generation: u32,
    next_serial: u64,
    images: HashMap<AssetLocation, SourceImage>,
    pixels: HashMap<ImageHandle, Arc<Vec<u8>>>,
    decode_counts: HashMap<AssetLocation, u32>,
    extractions: u64,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedImageCache {
        Arc::new(parking_lot::Mutex::new(Self::new()))
    }

    pub fn get(&self, location: &AssetLocation) -> Option<SourceImage> {
        self.images.get(location).cloned()
    }

    /// Return the decoded image for `location`, asking `source` only on a miss.
    pub fn get_or_decode(
        &mut self,
        location: &AssetLocation,
        source: &dyn ImageSource,
    ) -> SourceImage {
        if let Some(hit) = self.get(location) {
            return hit;
        }
        let loaded = source.load_image(location);
        self.insert_loaded(location, loaded)
    }

    /// Store the outcome of a load performed without holding the cache.
    ///
    /// If another caller stored `location` in the meantime, its entry wins and `loaded` is dropped.
    pub fn insert_loaded(
        &mut self,
        location: &AssetLocation,
        loaded: SynthResult<image::DynamicImage>,
    ) -> SourceImage {
        *self.decode_counts.entry(location.clone()).or_insert(0) += 1;
        if let Some(hit) = self.get(location) {
            return hit;
        }

        let image = match loaded {
            Ok(img) => Arc::new(img),
            Err(err) => {
                tracing::warn!(%location, error = %err, "texture failed to load, using placeholder");
                missing_texture()
            }
        };

        let entry = SourceImage {
            handle: self.issue_handle(),
            image,
        };
        self.images.insert(location.clone(), entry.clone());
        entry
    }

    pub fn pixels(&mut self, image: &SourceImage) -> Arc<Vec<u8>> {
        if let Some(hit) = self.pixels.get(&image.handle) {
            return Arc::clone(hit);
        }
        self.extractions += 1;
        let px = Arc::new(extract_rgba8(&image.image));
        self.pixels.insert(image.handle, Arc::clone(&px));
        px
    }

    /// Drop every decoded image and extracted pixel array and start a new handle generation.
    pub fn clear(&mut self) {
        tracing::debug!(
            generation = self.generation,
            images = self.images.len(),
            pixels = self.pixels.len(),
            "clearing image cache"
        );
        self.images.clear();
        self.pixels.clear();
        self.decode_counts.clear();
        self.generation = self.generation.wrapping_add(1);
        self.next_serial = 0;
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Loads of `location` in the current generation.
    pub fn decode_count(&self, location: &AssetLocation) -> u32 {
        self.decode_counts.get(location).copied().unwrap_or(0)
    }

    pub fn extraction_count(&self) -> u64 {
        self.extractions
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.pixels.is_empty()
    }

    fn issue_handle(&mut self) -> ImageHandle {
        let handle = ImageHandle {
            generation: self.generation,
            serial: self.next_serial,
        };
        self.next_serial += 1;
        handle
    }
}
