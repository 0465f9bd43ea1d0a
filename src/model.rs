use std::collections::{BTreeMap, BTreeSet};

use crate::foundation::core::{AssetLocation, ModelLocation};

pub type TextureRemap = BTreeMap<AssetLocation, AssetLocation>;

/// Model description exchanged with the host.
///
/// The core only reads `textures`; everything else is carried opaquely in `extra` and handed
/// back to the host unchanged.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Model {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub textures: BTreeMap<String, AssetLocation>,
    #[serde(default = "default_retexturable")]
    pub retexturable: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_retexturable() -> bool {
    true
}

impl Model {
    pub fn with_textures<K, I>(textures: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AssetLocation)>,
    {
        Self {
            parent: None,
            textures: textures.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            retexturable: true,
            extra: serde_json::Map::new(),
        }
    }

    pub fn texture_locations(&self) -> Vec<AssetLocation> {
        self.textures
            .values()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Texture representing the model as a whole: `particle`, then `all`, then the first slot.
    pub fn primary_texture(&self) -> Option<&AssetLocation> {
        self.textures
            .get("particle")
            .or_else(|| self.textures.get("all"))
            .or_else(|| self.textures.values().next())
    }

    pub fn retextured(&self, remap: &TextureRemap) -> Self {
        let mut out = self.clone();
        for loc in out.textures.values_mut() {
            if let Some(new) = remap.get(loc) {
                *loc = new.clone();
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct ItemBinding {
    pub item: AssetLocation,
    pub slot: u8,
    pub target: ModelLocation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(s: &str) -> AssetLocation {
        AssetLocation::parse(s).unwrap()
    }

    #[test]
    fn primary_texture_preference() {
        let m = Model::with_textures([("side", loc("a:s")), ("all", loc("a:all"))]);
        assert_eq!(m.primary_texture(), Some(&loc("a:all")));

        let m = Model::with_textures([("all", loc("a:all")), ("particle", loc("a:p"))]);
        assert_eq!(m.primary_texture(), Some(&loc("a:p")));

        let m = Model::with_textures([("top", loc("a:t")), ("bottom", loc("a:b"))]);
        assert_eq!(m.primary_texture(), Some(&loc("a:b")));

        assert_eq!(Model::with_textures::<&str, _>([]).primary_texture(), None);
    }

    #[test]
    fn texture_locations_are_deduplicated() {
        let m = Model::with_textures([
            ("all", loc("a:x")),
            ("particle", loc("a:x")),
            ("side", loc("a:y")),
        ]);
        assert_eq!(m.texture_locations(), vec![loc("a:x"), loc("a:y")]);
    }

    #[test]
    fn retextured_substitutes_known_textures_only() {
        let m = Model::with_textures([("all", loc("a:x")), ("side", loc("a:y"))]);
        let mut remap = TextureRemap::new();
        remap.insert(loc("a:x"), loc("g:x2"));
        let r = m.retextured(&remap);
        assert_eq!(r.textures["all"], loc("g:x2"));
        assert_eq!(r.textures["side"], loc("a:y"));
    }

    #[test]
    fn model_json_keeps_unknown_fields() {
        let json = r#"{"parent":"block/cube_all","textures":{"all":"a:b"},"ambientocclusion":false}"#;
        let m: Model = serde_json::from_str(json).unwrap();
        assert!(m.retexturable);
        assert_eq!(m.extra["ambientocclusion"], serde_json::Value::Bool(false));
        let back = serde_json::to_value(&m).unwrap();
        assert_eq!(back["ambientocclusion"], serde_json::Value::Bool(false));
    }
}
