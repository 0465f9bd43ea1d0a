//! Contracts between the synthesis core and the host engine that owns the real registries.

use crate::{
    foundation::core::{AssetLocation, ModelLocation, VisualState},
    foundation::error::SynthResult,
    model::{ItemBinding, Model, TextureRemap},
    producer::LazyPixelProducer,
};

pub trait StateResolver {
    fn resolve(&self, family: &AssetLocation, state: &VisualState) -> Option<ModelLocation>;
}

pub trait ImageSource {
    fn load_image(&self, location: &AssetLocation) -> SynthResult<image::DynamicImage>;
}

pub trait ModelHost {
    fn model(&self, location: &ModelLocation) -> Option<Model>;

    /// Substitute textures; `None` when the model does not support substitution.
    fn retexture(&self, model: &Model, remap: &TextureRemap) -> Option<Model>;

    fn load_model(&self, location: &ModelLocation) -> SynthResult<Model>;

    /// Raw blockstate definition `path` of `namespace`, used for compound assets.
    fn read_blockstate(&self, namespace: &str, path: &str) -> SynthResult<serde_json::Value>;
}

pub trait SynthesisHost: StateResolver + ModelHost {}

impl<T: StateResolver + ModelHost + ?Sized> SynthesisHost for T {}

pub trait AssetRegistrar {
    fn register_lazy_texture(&mut self, location: AssetLocation, producer: LazyPixelProducer);

    fn put_model(&mut self, location: ModelLocation, model: Model);

    fn bind_item_model(&mut self, _binding: ItemBinding) {}
}

pub trait ProgressSink {
    fn push(&mut self, label: &str, steps: usize);
    fn step(&mut self, text: &str);
    fn pop(&mut self);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn push(&mut self, _label: &str, _steps: usize) {}
    fn step(&mut self, _text: &str) {}
    fn pop(&mut self) {}
}

#[derive(Debug, Default)]
pub struct TracingProgress {
    stack: Vec<(String, usize, usize)>,
}

impl ProgressSink for TracingProgress {
    fn push(&mut self, label: &str, steps: usize) {
        tracing::info!(label, steps, "progress start");
        self.stack.push((label.to_string(), steps, 0));
    }

    fn step(&mut self, text: &str) {
        if let Some((label, steps, done)) = self.stack.last_mut() {
            *done += 1;
            tracing::info!(label = %label, step = *done, steps = *steps, text, "progress");
        }
    }

    fn pop(&mut self) {
        if let Some((label, steps, done)) = self.stack.pop() {
            tracing::info!(label = %label, done, steps, "progress done");
        }
    }
}
