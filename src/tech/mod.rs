//! Technology design-rule tables.
//!
//! A [`Tech`] is loaded once per build and passed explicitly to every
//! generator. Rules are looked up by name (`minwidth_metal1`,
//! `metal1_to_metal1`, `metal2_enclosure_via1`, ...); the derived pitches
//! used by placement and routing are computed from them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub mod layers;

pub use layers::{Layer, M1, M2, M3, M4};

pub const SCN4M_SUBM: &str = include_str!("../../tech/scn4m_subm.toml");

/// The topmost routing metal.
pub const TOP_METAL: u8 = 4;

/// A GDS layer/datatype pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GdsLayer {
    pub layer: i16,
    pub datatype: i16,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tech {
    pub name: String,
    /// Manufacturing grid.
    pub grid: i64,
    pub dbu_per_micron: i64,
    rules: BTreeMap<String, i64>,
    layers: BTreeMap<String, GdsLayer>,
}

const REQUIRED_LAYERS: [Layer; 15] = [
    Layer::Nwell,
    Layer::Pwell,
    Layer::Active,
    Layer::Pimplant,
    Layer::Nimplant,
    Layer::Poly,
    Layer::Contact,
    Layer::Metal(1),
    Layer::Via(1),
    Layer::Metal(2),
    Layer::Via(2),
    Layer::Metal(3),
    Layer::Via(3),
    Layer::Metal(4),
    Layer::Boundary,
];

impl Tech {
    pub fn from_toml(s: &str) -> Result<Self> {
        let tech: Tech = toml::from_str(s)?;
        tech.validate()?;
        Ok(tech)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// The built-in four-metal SCMOS technology.
    pub fn scn4m_subm() -> Self {
        Self::from_toml(SCN4M_SUBM).unwrap_or_else(|e| panic!("invalid built-in technology: {e}"))
    }

    fn validate(&self) -> Result<()> {
        let mut required = vec![
            "well_to_well".to_string(),
            "implant_to_implant".to_string(),
            "active_to_active".to_string(),
            "minwidth_poly".to_string(),
            "minwidth_active".to_string(),
            "minwidth_contact".to_string(),
            "contact_to_contact".to_string(),
            "implant_enclosure_active".to_string(),
            "poly_extend_active".to_string(),
        ];
        for n in 1..=TOP_METAL {
            required.push(format!("minwidth_metal{n}"));
            required.push(format!("metal{n}_to_metal{n}"));
        }
        for n in 1..TOP_METAL {
            required.push(format!("minwidth_via{n}"));
            required.push(format!("via{n}_to_via{n}"));
        }
        for rule in required {
            if !self.rules.contains_key(&rule) {
                return Err(Error::MissingRule {
                    tech: self.name.clone(),
                    rule,
                });
            }
        }
        for layer in REQUIRED_LAYERS {
            if !self.layers.contains_key(&layer.to_string()) {
                return Err(Error::UnknownLayer(format!("{layer} (not in layer map of `{}`)", self.name)));
            }
        }
        if self.grid <= 0 || self.dbu_per_micron <= 0 {
            return Err(Error::config("tech", "grid and dbu_per_micron must be positive"));
        }
        Ok(())
    }

    /// Looks up a design rule by name.
    ///
    /// Rules checked by [`Tech::validate`] are always present.
    pub fn rule(&self, name: &str) -> i64 {
        self.try_rule(name)
            .unwrap_or_else(|| panic!("no such design rule: {name}"))
    }

    pub fn try_rule(&self, name: &str) -> Option<i64> {
        self.rules.get(name).copied()
    }

    pub fn gds_layer(&self, layer: Layer) -> GdsLayer {
        self.layers
            .get(&layer.to_string())
            .copied()
            .unwrap_or_else(|| panic!("no GDS mapping for layer {layer}"))
    }

    /// Minimum width of a drawn layer.
    pub fn width(&self, layer: Layer) -> i64 {
        self.try_rule(&format!("minwidth_{layer}")).unwrap_or_default()
    }

    /// Minimum same-layer spacing.
    pub fn space(&self, layer: Layer) -> i64 {
        self.try_rule(&format!("{layer}_to_{layer}")).unwrap_or_default()
    }

    /// Enclosure of `inner` by `outer`, or zero if the rule is absent.
    pub fn enclosure(&self, outer: Layer, inner: Layer) -> i64 {
        self.try_rule(&format!("{outer}_enclosure_{inner}"))
            .unwrap_or_default()
    }

    /// Minimum area of a routing layer, or zero if unconstrained.
    pub fn min_area(&self, layer: Layer) -> i64 {
        self.try_rule(&format!("minarea_{layer}")).unwrap_or_default()
    }

    /// The edge length of a square landing pad for `cut` on `metal`.
    pub fn via_pad(&self, cut: Layer, metal: Layer) -> i64 {
        self.width(cut) + 2 * self.enclosure(metal, cut)
    }

    /// The largest via landing pad drawn on `metal`.
    pub fn max_pad(&self, metal: Layer) -> i64 {
        let Some(level) = metal.level() else {
            return self.width(metal);
        };
        let below = (level > 0).then(|| self.via_pad(Layer::cut_above(level - 1), metal));
        let above = (level < TOP_METAL).then(|| self.via_pad(Layer::cut_above(level), metal));
        [below, above, Some(self.width(metal))]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or_default()
    }

    /// Center-to-center spacing of adjacent tracks on `metal`.
    ///
    /// Adjacent tracks may both carry vias, so the pitch is the larger of
    /// the wire width and the landing pad, plus the minimum spacing.
    pub fn pitch(&self, metal: Layer) -> i64 {
        self.max_pad(metal) + self.space(metal)
    }

    /// The gap left between abutting modules so that neither wells, implants
    /// nor active regions violate spacing rules.
    pub fn well_gap(&self) -> i64 {
        [
            self.rule("well_to_well"),
            self.rule("implant_to_implant"),
            self.rule("active_to_active"),
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
    }

    /// Width of one bitcell column; three vertical metal2 tracks.
    pub fn column_width(&self) -> i64 {
        3 * self.pitch(Layer::Metal(2))
    }

    /// Center of metal2 track `i` within a column, measured from its left edge.
    pub fn column_track(&self, i: usize) -> i64 {
        self.pitch(Layer::Metal(2)) / 2 + i as i64 * self.pitch(Layer::Metal(2))
    }

    /// Height of one bitcell row and of every standard gate.
    pub fn row_height(&self) -> i64 {
        3 * self.pitch(Layer::Metal(1)) + self.width(Layer::Metal(1))
    }

    /// Rounds `x` to the manufacturing grid.
    pub fn snap(&self, x: i64) -> i64 {
        crate::geom::snap(x, self.grid)
    }

    pub fn snap_up(&self, x: i64) -> i64 {
        crate::geom::snap_up(x, self.grid)
    }
}

impl Default for Tech {
    fn default() -> Self {
        Self::scn4m_subm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tech_derived_rules() {
        let tech = Tech::scn4m_subm();
        assert_eq!(tech.name, "scn4m_subm");
        assert_eq!(tech.width(M1), 600);
        assert_eq!(tech.via_pad(Layer::Via(1), M1), 800);
        assert_eq!(tech.pitch(M1), 1400);
        assert_eq!(tech.pitch(M2), 1600);
        assert_eq!(tech.pitch(M4), 2400);
        assert_eq!(tech.column_width(), 4800);
        assert_eq!(tech.column_track(1), 2400);
        assert_eq!(tech.row_height(), 4800);
        assert_eq!(tech.well_gap(), 1800);
        assert_eq!(tech.gds_layer(M2), GdsLayer { layer: 51, datatype: 0 });
    }

    #[test]
    fn test_missing_rule_is_rejected() {
        let stripped = SCN4M_SUBM.replace("metal2_to_metal2 = 800\n", "");
        let err = Tech::from_toml(&stripped).unwrap_err();
        assert!(matches!(err, Error::MissingRule { ref rule, .. } if rule == "metal2_to_metal2"));

        // Rules read while drawing leaf cells must be present up front.
        for (line, rule) in [
            ("implant_enclosure_active = 400\n", "implant_enclosure_active"),
            ("poly_extend_active = 400\n", "poly_extend_active"),
        ] {
            assert!(SCN4M_SUBM.contains(line));
            let err = Tech::from_toml(&SCN4M_SUBM.replace(line, "")).unwrap_err();
            assert!(matches!(err, Error::MissingRule { rule: ref r, .. } if r == rule));
        }
    }
}
