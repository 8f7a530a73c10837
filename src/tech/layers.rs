use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A process layer.
///
/// `Via(n)` connects `Metal(n)` to `Metal(n + 1)`; `Contact` connects
/// poly or active to `Metal(1)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Layer {
    Nwell,
    Pwell,
    Active,
    Pimplant,
    Nimplant,
    Poly,
    Contact,
    Metal(u8),
    Via(u8),
    Boundary,
}

pub const M1: Layer = Layer::Metal(1);
pub const M2: Layer = Layer::Metal(2);
pub const M3: Layer = Layer::Metal(3);
pub const M4: Layer = Layer::Metal(4);

impl Layer {
    /// Returns true for layers that carry routing.
    pub fn is_routing(&self) -> bool {
        matches!(self, Self::Metal(_) | Self::Poly)
    }

    /// The routing level of this layer; poly sits below metal 1.
    pub fn level(&self) -> Option<u8> {
        match self {
            Self::Poly | Self::Active => Some(0),
            Self::Metal(n) => Some(*n),
            _ => None,
        }
    }

    /// The routing layer at `level`.
    pub fn from_level(level: u8) -> Self {
        if level == 0 {
            Self::Poly
        } else {
            Self::Metal(level)
        }
    }

    /// The cut layer connecting routing level `level` to `level + 1`.
    pub fn cut_above(level: u8) -> Self {
        if level == 0 {
            Self::Contact
        } else {
            Self::Via(level)
        }
    }
}

impl Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nwell => write!(f, "nwell"),
            Self::Pwell => write!(f, "pwell"),
            Self::Active => write!(f, "active"),
            Self::Pimplant => write!(f, "pimplant"),
            Self::Nimplant => write!(f, "nimplant"),
            Self::Poly => write!(f, "poly"),
            Self::Contact => write!(f, "contact"),
            Self::Metal(n) => write!(f, "metal{n}"),
            Self::Via(n) => write!(f, "via{n}"),
            Self::Boundary => write!(f, "boundary"),
        }
    }
}

impl FromStr for Layer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let layer = match s {
            "nwell" => Self::Nwell,
            "pwell" => Self::Pwell,
            "active" => Self::Active,
            "pimplant" => Self::Pimplant,
            "nimplant" => Self::Nimplant,
            "poly" => Self::Poly,
            "contact" => Self::Contact,
            "boundary" => Self::Boundary,
            s => {
                if let Some(n) = s.strip_prefix("metal").and_then(|n| n.parse().ok()) {
                    Self::Metal(n)
                } else if let Some(n) = s.strip_prefix("via").and_then(|n| n.parse().ok()) {
                    Self::Via(n)
                } else {
                    return Err(Error::UnknownLayer(s.to_string()));
                }
            }
        };
        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_names_round_trip() {
        for layer in [Layer::Poly, M1, M4, Layer::Via(2), Layer::Boundary] {
            assert_eq!(layer.to_string().parse::<Layer>().unwrap(), layer);
        }
        assert!("metalx".parse::<Layer>().is_err());
    }
}
