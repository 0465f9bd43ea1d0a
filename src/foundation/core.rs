use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{SynthError, SynthResult};

/// Namespace assumed when a location string carries no `namespace:` part.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Variant used when a model reference omits the `#variant` suffix.
pub const DEFAULT_VARIANT: &str = "normal";

/// Namespaced asset identifier, written `namespace:path`.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct AssetLocation {
    pub namespace: String,
    pub path: String,
}

impl AssetLocation {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> SynthResult<Self> {
        let namespace = namespace.into();
        let path = path.into();
        if namespace.is_empty() {
            return Err(SynthError::validation("asset namespace must be non-empty"));
        }
        if path.is_empty() {
            return Err(SynthError::validation("asset path must be non-empty"));
        }
        if namespace.contains(':') || path.contains(':') {
            return Err(SynthError::validation(format!(
                "asset location '{namespace}:{path}' has more than one ':'"
            )));
        }
        Ok(Self { namespace, path })
    }

    /// Parse `namespace:path`, falling back to [`DEFAULT_NAMESPACE`] when no colon is present.
    pub fn parse(s: &str) -> SynthResult<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((ns, path)) => Self::new(ns, path),
            None => Self::new(DEFAULT_NAMESPACE, s),
        }
    }

    /// `namespace:path` with every character outside `[A-Za-z0-9]` replaced by `_`.
    pub fn sanitized(&self) -> String {
        sanitize_identifier(&self.to_string())
    }
}

impl fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for AssetLocation {
    type Err = SynthError;

    fn from_str(s: &str) -> SynthResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AssetLocation {
    type Error = SynthError;

    fn try_from(s: String) -> SynthResult<Self> {
        Self::parse(&s)
    }
}

impl From<AssetLocation> for String {
    fn from(loc: AssetLocation) -> Self {
        loc.to_string()
    }
}

/// A model reference: an asset location plus the variant string selecting one appearance,
/// written `namespace:path#variant`.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ModelLocation {
    pub location: AssetLocation,
    pub variant: String,
}

impl ModelLocation {
    pub fn new(location: AssetLocation, variant: impl Into<String>) -> Self {
        Self {
            location,
            variant: variant.into(),
        }
    }

    /// Parse `namespace:path#variant`; a missing variant becomes `default_variant`.
    pub fn parse_with_default(s: &str, default_variant: &str) -> SynthResult<Self> {
        let (loc, variant) = match s.trim().split_once('#') {
            Some((loc, variant)) => (loc, variant),
            None => (s.trim(), default_variant),
        };
        Ok(Self::new(AssetLocation::parse(loc)?, variant))
    }

    pub fn parse(s: &str) -> SynthResult<Self> {
        Self::parse_with_default(s, DEFAULT_VARIANT)
    }

    pub fn namespace(&self) -> &str {
        &self.location.namespace
    }
}

impl fmt::Display for ModelLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.location, self.variant)
    }
}

impl FromStr for ModelLocation {
    type Err = SynthError;

    fn from_str(s: &str) -> SynthResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ModelLocation {
    type Error = SynthError;

    fn try_from(s: String) -> SynthResult<Self> {
        Self::parse(&s)
    }
}

impl From<ModelLocation> for String {
    fn from(loc: ModelLocation) -> Self {
        loc.to_string()
    }
}

/// Opaque identifier for one concrete appearance of a base asset family.
///
/// The core only compares and hashes states; their meaning belongs to the host's resolver.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct VisualState(pub String);

impl VisualState {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisualState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn sanitize_identifier(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
