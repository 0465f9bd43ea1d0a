//! Synthesis of block variants by image-space compositing.
//!
//! A [`RuleTable`] describes, per rule, which visual states to derive from, which through-assets
//! to recolor, and how. A [`SynthesisSession`] expands the table against a host into derived
//! texture producers and model bindings, which the host then installs through an
//! [`AssetRegistrar`]. Pixel work is deferred until the host asks a [`LazyPixelProducer`] for it.
#![forbid(unsafe_code)]

pub mod assets;
pub mod composite;
pub mod config;
pub mod enumerate;
pub mod foundation;
pub mod host;
pub mod memory_host;
pub mod model;
pub mod pack;
pub mod producer;
pub mod registrar;
pub mod rules;

pub use crate::assets::cache::{ImageCache, SharedImageCache};
pub use crate::assets::{ImageHandle, PixelBuffer, PixelView, SourceImage};
pub use crate::composite::{BlendMode, composite};
pub use crate::config::SynthConfig;
pub use crate::enumerate::{
    DerivedId, DerivedVariant, ModelBinding, RuleFailure, SkippedEntry, Synthesis,
    SynthesisReport, SynthesisSession, TextureEntry,
};
pub use crate::foundation::core::{AssetLocation, ModelLocation, VisualState};
pub use crate::foundation::error::{SynthError, SynthResult};
pub use crate::host::{
    AssetRegistrar, ImageSource, ModelHost, NoProgress, ProgressSink, StateResolver,
    SynthesisHost, TracingProgress,
};
pub use crate::memory_host::MemoryHost;
pub use crate::model::{ItemBinding, Model, TextureRemap};
pub use crate::pack::PackHost;
pub use crate::producer::LazyPixelProducer;
pub use crate::registrar::CollectingRegistrar;
pub use crate::rules::{
    PropertyTargetFactory, RuleDef, RuleFile, RuleTable, THROUGH_SLOTS, TargetFactory,
    VariantRule,
};
