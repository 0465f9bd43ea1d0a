use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::{
    composite::BlendMode,
    foundation::core::{AssetLocation, DEFAULT_VARIANT, ModelLocation, VisualState},
    foundation::error::{SynthError, SynthResult},
};

pub const THROUGH_SLOTS: usize = 16;

/// Produces the concrete target model location of one `from` ordinal for a given through-slot.
pub trait TargetFactory: Send + Sync + fmt::Debug {
    fn family(&self) -> &AssetLocation;

    fn target_for(&self, slot: u8) -> SynthResult<ModelLocation>;
}

/// Target factory for a block whose states are enumerated by property values.
///
/// A slot is decoded as a mixed-radix number over the properties sorted by name, first property
/// least significant. The variant string lists `name=value` pairs sorted by name, joined by `,`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PropertyTargetFactory {
    pub block: AssetLocation,
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<String>>,
}

impl PropertyTargetFactory {
    pub fn new(block: AssetLocation) -> Self {
        Self {
            block,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        self.properties
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    fn variant_for(&self, slot: u8) -> SynthResult<String> {
        if self.properties.is_empty() {
            if slot != 0 {
                return Err(SynthError::validation(format!(
                    "{} has no properties, slot {slot} has no state",
                    self.block
                )));
            }
            return Ok(DEFAULT_VARIANT.to_string());
        }

        let mut rem = usize::from(slot);
        let mut parts = Vec::with_capacity(self.properties.len());
        for (name, values) in &self.properties {
            if values.is_empty() {
                return Err(SynthError::validation(format!(
                    "{} property '{name}' has no values",
                    self.block
                )));
            }
            parts.push(format!("{name}={}", values[rem % values.len()]));
            rem /= values.len();
        }
        if rem != 0 {
            return Err(SynthError::validation(format!(
                "slot {slot} exceeds the state space of {}",
                self.block
            )));
        }
        Ok(parts.join(","))
    }
}

impl TargetFactory for PropertyTargetFactory {
    fn family(&self) -> &AssetLocation {
        &self.block
    }

    fn target_for(&self, slot: u8) -> SynthResult<ModelLocation> {
        Ok(ModelLocation::new(self.block.clone(), self.variant_for(slot)?))
    }
}

/// Declarative description of one family of derived variants.
#[derive(Clone, Debug)]
pub struct VariantRule {
    pub from_family: AssetLocation,
    pub overlay_family: AssetLocation,
    pub through_family: AssetLocation,
    pub based_upon_family: AssetLocation,
    /// Indexed by rule-local ordinal; `None` means nothing is derived at that ordinal.
    pub from: Vec<Option<VisualState>>,
    pub overlay: Vec<Option<VisualState>>,
    pub through: [Option<VisualState>; THROUGH_SLOTS],
    /// Length 1 (shared by every ordinal) or aligned with `from`.
    pub based_upon: Vec<Option<VisualState>>,
    pub mode: BlendMode,
    pub factories: Vec<Arc<dyn TargetFactory>>,
}

impl VariantRule {
    /// Check sequence alignment and that every live ordinal has all of its sources.
    pub fn validate(&self) -> SynthResult<()> {
        let n = self.from.len();
        if self.overlay.len() != n {
            return Err(SynthError::validation(format!(
                "overlay has {} entries, from has {n}",
                self.overlay.len()
            )));
        }
        if self.factories.len() != n {
            return Err(SynthError::validation(format!(
                "{} target factories for {n} from entries",
                self.factories.len()
            )));
        }
        if self.based_upon.len() != 1 && self.based_upon.len() != n {
            return Err(SynthError::validation(format!(
                "based_upon must have 1 or {n} entries, has {}",
                self.based_upon.len()
            )));
        }
        for (i, _) in self.live_ordinals() {
            if self.overlay[i].is_none() {
                return Err(SynthError::validation(format!(
                    "ordinal {i} has a from state but no overlay state"
                )));
            }
            if self.based_upon_at(i).is_none() {
                return Err(SynthError::validation(format!(
                    "ordinal {i} has a from state but no based_upon state"
                )));
            }
        }
        Ok(())
    }

    pub fn live_ordinals(&self) -> impl Iterator<Item = (usize, &VisualState)> + '_ {
        self.from
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    pub fn live_slots(&self) -> impl Iterator<Item = (u8, &VisualState)> + '_ {
        self.through
            .iter()
            .enumerate()
            .filter_map(|(j, s)| s.as_ref().map(|s| (j as u8, s)))
    }

    pub fn based_upon_at(&self, ordinal: usize) -> Option<&VisualState> {
        let entry = if self.based_upon.len() == 1 {
            self.based_upon.first()
        } else {
            self.based_upon.get(ordinal)
        };
        entry.and_then(Option::as_ref)
    }

    /// Identifier-safe stem shared by every variant derived at `ordinal`.
    pub fn stem(&self, ordinal: usize) -> String {
        format!("{}_{ordinal}", self.from_family.sanitized())
    }

    pub fn expected_variant_count(&self) -> usize {
        self.live_ordinals().count() * self.live_slots().count()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RuleTable {
    rules: Vec<VariantRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<VariantRule>) -> Self {
        Self { rules }
    }

    pub fn from_defs(defs: Vec<RuleDef>) -> SynthResult<Self> {
        let rules = defs
            .into_iter()
            .enumerate()
            .map(|(i, d)| {
                d.into_rule()
                    .map_err(|e| SynthError::validation(format!("rule {i}: {e}")))
            })
            .collect::<SynthResult<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    pub fn from_json_str(s: &str) -> SynthResult<Self> {
        let file: RuleFile = serde_json::from_str(s)?;
        Self::from_defs(file.rules)
    }

    pub fn load(path: &Path) -> SynthResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read rules '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VariantRule> {
        self.rules.iter()
    }

    pub fn get(&self, index: usize) -> Option<&VariantRule> {
        self.rules.get(index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleTable {
    type Item = &'a VariantRule;
    type IntoIter = std::slice::Iter<'a, VariantRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RuleFile {
    pub rules: Vec<RuleDef>,
}

/// Serialized form of a [`VariantRule`].
///
/// Families other than `from_family` default to it; `through` is sparse (`slot → state`).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RuleDef {
    pub from_family: AssetLocation,
    pub from: Vec<Option<VisualState>>,
    #[serde(default)]
    pub overlay_family: Option<AssetLocation>,
    pub overlay: Vec<Option<VisualState>>,
    pub through_family: AssetLocation,
    pub through: BTreeMap<u8, VisualState>,
    #[serde(default)]
    pub based_upon_family: Option<AssetLocation>,
    pub based_upon: Vec<Option<VisualState>>,
    #[serde(default)]
    pub mode: BlendMode,
    pub targets: Vec<PropertyTargetFactory>,
}

impl RuleDef {
    pub fn into_rule(self) -> SynthResult<VariantRule> {
        let mut through: [Option<VisualState>; THROUGH_SLOTS] = Default::default();
        for (slot, state) in self.through {
            let entry = through.get_mut(usize::from(slot)).ok_or_else(|| {
                SynthError::validation(format!(
                    "through slot {slot} out of range (0..{THROUGH_SLOTS})"
                ))
            })?;
            *entry = Some(state);
        }

        Ok(VariantRule {
            overlay_family: self
                .overlay_family
                .unwrap_or_else(|| self.from_family.clone()),
            based_upon_family: self
                .based_upon_family
                .unwrap_or_else(|| self.from_family.clone()),
            from_family: self.from_family,
            through_family: self.through_family,
            from: self.from,
            overlay: self.overlay,
            through,
            based_upon: self.based_upon,
            mode: self.mode,
            factories: self
                .targets
                .into_iter()
                .map(|f| Arc::new(f) as Arc<dyn TargetFactory>)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(s: &str) -> AssetLocation {
        AssetLocation::parse(s).unwrap()
    }

    fn st(s: &str) -> Option<VisualState> {
        Some(VisualState::new(s))
    }

    fn rule(from: Vec<Option<VisualState>>) -> VariantRule {
        let n = from.len();
        let factory: Arc<dyn TargetFactory> = Arc::new(
            PropertyTargetFactory::new(loc("ucw:planks_chisel"))
                .with_property("variant", (0..16).map(|i| format!("v{i}"))),
        );
        let mut through: [Option<VisualState>; THROUGH_SLOTS] = Default::default();
        through[0] = st("raw");
        through[5] = st("bricks");
        VariantRule {
            from_family: loc("minecraft:planks"),
            overlay_family: loc("minecraft:planks"),
            through_family: loc("chisel:marble"),
            based_upon_family: loc("minecraft:stone"),
            overlay: from.clone(),
            from,
            through,
            based_upon: vec![st("stone")],
            mode: BlendMode::MultiplyMask,
            factories: vec![factory; n],
        }
    }

    #[test]
    fn property_factory_mixed_radix() {
        let f = PropertyTargetFactory::new(loc("m:b"))
            .with_property("color", ["white", "orange"])
            .with_property("axis", ["x", "y", "z"]);
        // axis sorts first, so it is the least significant digit
        assert_eq!(f.target_for(0).unwrap().variant, "axis=x,color=white");
        assert_eq!(f.target_for(1).unwrap().variant, "axis=y,color=white");
        assert_eq!(f.target_for(3).unwrap().variant, "axis=x,color=orange");
        assert!(f.target_for(6).is_err());
    }

    #[test]
    fn property_factory_without_properties() {
        let f = PropertyTargetFactory::new(loc("m:b"));
        assert_eq!(f.target_for(0).unwrap().to_string(), "m:b#normal");
        assert!(f.target_for(1).is_err());
    }

    #[test]
    fn sparse_rule_counts_and_stems() {
        let r = rule(vec![st("oak"), None, st("birch")]);
        r.validate().unwrap();
        assert_eq!(r.expected_variant_count(), 4);
        let ordinals: Vec<_> = r.live_ordinals().map(|(i, _)| i).collect();
        assert_eq!(ordinals, vec![0, 2]);
        let slots: Vec<_> = r.live_slots().map(|(j, _)| j).collect();
        assert_eq!(slots, vec![0, 5]);
        assert_eq!(r.stem(2), "minecraft_planks_2");
        assert_eq!(r.based_upon_at(2), Some(&VisualState::new("stone")));
    }

    #[test]
    fn misaligned_rule_is_rejected() {
        let mut r = rule(vec![st("oak"), st("birch")]);
        r.overlay.pop();
        assert!(matches!(r.validate(), Err(SynthError::Validation(_))));

        let mut r = rule(vec![st("oak"), st("birch")]);
        r.factories.pop();
        assert!(r.validate().is_err());

        let mut r = rule(vec![st("oak"), st("birch"), st("spruce")]);
        r.based_upon = vec![st("a"), st("b")];
        assert!(r.validate().is_err());

        let mut r = rule(vec![st("oak")]);
        r.overlay[0] = None;
        assert!(r.validate().is_err());
    }

    #[test]
    fn rule_file_parses_and_defaults_families() {
        let json = r#"{
            "rules": [{
                "from_family": "minecraft:planks",
                "from": ["variant=oak", null],
                "overlay": ["variant=oak", null],
                "through_family": "chisel:marble",
                "through": {"0": "variation=0", "5": "variation=5"},
                "based_upon_family": "minecraft:stone",
                "based_upon": ["variant=stone"],
                "mode": "multiply_mask",
                "targets": [
                    {"block": "ucw:planks_0", "properties": {"variation": ["0","1","2","3","4","5"]}},
                    {"block": "ucw:planks_1"}
                ]
            }]
        }"#;
        let table = RuleTable::from_json_str(json).unwrap();
        assert_eq!(table.len(), 1);
        let r = table.get(0).unwrap();
        assert_eq!(r.overlay_family, loc("minecraft:planks"));
        assert_eq!(r.mode, BlendMode::MultiplyMask);
        assert_eq!(r.through[5], st("variation=5"));
        assert!(r.through[1].is_none());
        r.validate().unwrap();
    }

    #[test]
    fn through_slot_out_of_range_fails_load() {
        let json = r#"{"rules":[{"from_family":"a:b","from":[],"overlay":[],
            "through_family":"c:d","through":{"16":"x"},"based_upon":[null],"targets":[]}]}"#;
        let err = RuleTable::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("rule 0"));
    }
}
