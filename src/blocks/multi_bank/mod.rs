//! Replicated banks behind a single request interface.
//!
//! A multi-bank places one, two or four copies of a child (a bank, or
//! another multi-bank) in a grid and arbitrates between them with a
//! [`SplitMergeControl`](crate::blocks::split_merge::SplitMergeControl).
//! The bank select bits are appended above the child's address bits.
//! Data buses are shared: every child gates its own split and merge
//! arrays with its select, so only the selected child ever drives `dout`.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::blocks::bank::BankParams;
use crate::component::Component;
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::schematic::Direction;
use crate::tech::Tech;
use crate::{bus_bit, clog2};

pub(crate) mod layout;

/// How two replicated children are arranged.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BankOrientation {
    /// Side by side.
    #[default]
    H,
    /// Stacked.
    V,
}

/// The block replicated by a [`MultiBank`].
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BankKind {
    Bank(BankParams),
    MultiBank(Box<MultiBankParams>),
}

impl BankKind {
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Bank(p) => p.validate(),
            Self::MultiBank(p) => p.validate(),
        }
    }

    pub fn name(&self) -> ArcStr {
        match self {
            Self::Bank(p) => p.name(),
            Self::MultiBank(p) => p.name(),
        }
    }

    pub fn word_size(&self) -> usize {
        match self {
            Self::Bank(p) => p.word_size,
            Self::MultiBank(p) => p.child.word_size(),
        }
    }

    pub fn mask(&self) -> bool {
        match self {
            Self::Bank(p) => p.mask,
            Self::MultiBank(p) => p.child.mask(),
        }
    }

    pub fn power_gate(&self) -> bool {
        match self {
            Self::Bank(p) => p.power_gate,
            Self::MultiBank(p) => p.child.power_gate(),
        }
    }

    pub fn addr_size(&self) -> usize {
        match self {
            Self::Bank(p) => p.addr_size(),
            Self::MultiBank(p) => p.addr_size(),
        }
    }

    pub fn total_bits(&self) -> usize {
        match self {
            Self::Bank(p) => p.total_bits(),
            Self::MultiBank(p) => p.total_bits(),
        }
    }

    /// The number of banks at the leaves of this hierarchy.
    pub fn num_banks(&self) -> usize {
        match self {
            Self::Bank(_) => 1,
            Self::MultiBank(p) => p.num_banks * p.child.num_banks(),
        }
    }

    /// The same block with an input qualifying every request.
    fn selectable(&self) -> Self {
        match self {
            Self::Bank(p) => Self::Bank(BankParams {
                two_level_bank: true,
                ..*p
            }),
            Self::MultiBank(p) => Self::MultiBank(Box::new(MultiBankParams {
                gated: true,
                ..(**p).clone()
            })),
        }
    }

    /// The name of the select input added by [`BankKind::selectable`].
    pub fn select_port(&self) -> &'static str {
        match self {
            Self::Bank(_) => "sel",
            Self::MultiBank(_) => "en",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MultiBankParams {
    pub child: BankKind,
    pub num_banks: usize,
    pub orientation: BankOrientation,
    /// Adds an `en` input qualifying every request.
    pub gated: bool,
}

impl MultiBankParams {
    pub fn validate(&self) -> Result<()> {
        if ![1, 2, 4].contains(&self.num_banks) {
            return Err(Error::config(
                "multi_bank",
                format!("bank count must be 1, 2 or 4, got {}", self.num_banks),
            ));
        }
        self.child.validate()
    }

    pub fn name(&self) -> ArcStr {
        let o = match self.orientation {
            BankOrientation::H => "h",
            BankOrientation::V => "v",
        };
        let en = if self.gated { "_en" } else { "" };
        arcstr::format!("{}_x{}{o}{en}", self.child.name(), self.num_banks)
    }

    /// Whether requests pass through a split/merge control block.
    ///
    /// A single ungated child is wired straight to the outer pins.
    pub fn has_control(&self) -> bool {
        self.num_banks > 1 || self.gated
    }

    pub fn select_bits(&self) -> usize {
        clog2(self.num_banks)
    }

    pub fn addr_size(&self) -> usize {
        self.child.addr_size() + self.select_bits()
    }

    pub fn total_bits(&self) -> usize {
        self.child.total_bits() * self.num_banks
    }

    /// The parameters of every replicated child.
    pub fn child_params(&self) -> BankKind {
        if self.has_control() {
            self.child.selectable()
        } else {
            self.child.clone()
        }
    }

    /// Columns and rows of the placement grid.
    pub fn grid(&self) -> (usize, usize) {
        match (self.num_banks, self.orientation) {
            (1, _) => (1, 1),
            (2, BankOrientation::H) => (2, 1),
            (2, BankOrientation::V) => (1, 2),
            _ => (2, 2),
        }
    }

    /// The multi-bank's ports, in declaration order.
    pub fn ports(&self) -> Vec<(String, Direction)> {
        let ws = self.child.word_size();
        let mut ports = Vec::new();
        ports.extend((0..ws).map(|i| (bus_bit("din", i), Direction::Input)));
        ports.extend((0..ws).map(|i| (bus_bit("dout", i), Direction::Output)));
        ports.extend((0..self.addr_size()).map(|i| (bus_bit("addr", i), Direction::Input)));
        if self.child.mask() {
            ports.extend((0..ws).map(|i| (bus_bit("bm", i), Direction::Input)));
        }
        for p in ["reset", "r", "w", "rw"] {
            ports.push((p.to_string(), Direction::Input));
        }
        if self.gated {
            ports.push(("en".to_string(), Direction::Input));
        }
        if self.child.power_gate() {
            ports.push(("sleep".to_string(), Direction::Input));
        }
        for p in ["ack", "rack", "wack"] {
            ports.push((p.to_string(), Direction::Output));
        }
        ports.push(("vdd".to_string(), Direction::Power));
        ports.push(("gnd".to_string(), Direction::Ground));
        ports
    }
}

pub struct MultiBank {
    params: MultiBankParams,
}

impl Component for MultiBank {
    type Params = MultiBankParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        self.params.name()
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        for (name, dir) in self.params.ports() {
            ctx.declare_port(name, dir)?;
        }
        layout::draw(&self.params, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SramCtx;
    use crate::geom::BoundBox;

    fn bank() -> BankParams {
        BankParams {
            word_size: 4,
            words_per_row: 1,
            num_rows: 16,
            num_subanks: 1,
            two_level_bank: false,
            mask: false,
            power_gate: false,
        }
    }

    #[test]
    fn test_two_stacked_banks() {
        let mut ctx = SramCtx::default();
        let params = MultiBankParams {
            child: BankKind::Bank(bank()),
            num_banks: 2,
            orientation: BankOrientation::V,
            gated: false,
        };
        let mb = ctx.instantiate::<MultiBank>(&params).unwrap();
        assert_eq!(mb.name().as_str(), "bank_4x16_w1_s1_x2v");
        assert_eq!(params.grid(), (1, 2));

        // The bank select bit sits above the bank's own address bits.
        assert_eq!(params.addr_size(), bank().addr_size() + 1);
        assert!(mb.has_port(&bus_bit("addr", bank().addr_size())));
        assert!(!mb.has_port("en"));

        let stats = crate::validate::validate(&mb).unwrap();
        assert_eq!(stats.count("bank_4x16_w1_s1_tl"), 2);
        assert_eq!(stats.count("split_merge_control_2"), 1);
        assert_eq!(stats.count("sram_cell_6t"), 2 * 4 * 16);

        let brect = mb.brect();
        for (name, _) in params.ports() {
            if name == "vdd" || name == "gnd" {
                continue;
            }
            let rect = mb.port(&name).unwrap().largest_rect();
            assert_eq!(rect.bottom(), brect.bottom(), "{name}");
        }
    }

    #[test]
    fn test_four_banks_form_a_grid() {
        let mut ctx = SramCtx::default();
        let params = MultiBankParams {
            child: BankKind::Bank(bank()),
            num_banks: 4,
            orientation: BankOrientation::H,
            gated: true,
        };
        let mb = ctx.instantiate::<MultiBank>(&params).unwrap();
        assert_eq!(params.grid(), (2, 2));
        assert!(mb.has_port("en"));
        let stats = crate::validate::validate(&mb).unwrap();
        assert_eq!(stats.count("bank_4x16_w1_s1_tl"), 4);
        assert_eq!(stats.count("split_merge_control_4_en"), 1);

        // Columns are one well gap apart, rows one row gap apart.
        let (g, gx) = crate::blocks::bank::layout::gaps(ctx.tech());
        let bank = |k: usize| {
            mb.layout()
                .insts()
                .iter()
                .find(|i| i.name().as_str() == format!("bank_{k}"))
                .unwrap()
                .brect()
        };
        assert_eq!(bank(1).left(), bank(0).right() + gx);
        assert_eq!(bank(1).bottom(), bank(0).bottom());
        assert_eq!(bank(2).left(), bank(0).left());
        assert_eq!(bank(2).bottom(), bank(0).top() + g);
        assert_eq!(bank(3).left(), bank(2).right() + gx);
    }

    #[test]
    fn test_single_ungated_bank_has_no_control() {
        let mut ctx = SramCtx::default();
        let params = MultiBankParams {
            child: BankKind::Bank(bank()),
            num_banks: 1,
            orientation: BankOrientation::H,
            gated: false,
        };
        assert!(!params.has_control());
        let mb = ctx.instantiate::<MultiBank>(&params).unwrap();
        assert_eq!(params.addr_size(), bank().addr_size());
        let stats = crate::validate::validate(&mb).unwrap();
        assert_eq!(stats.count("bank_4x16_w1_s1"), 1);
        assert_eq!(stats.count("split_merge_control_1"), 0);
    }

    #[test]
    fn test_rejects_three_banks() {
        let mut ctx = SramCtx::default();
        let params = MultiBankParams {
            child: BankKind::Bank(bank()),
            num_banks: 3,
            orientation: BankOrientation::H,
            gated: false,
        };
        let err = ctx.instantiate::<MultiBank>(&params).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_nested_accounting() {
        let inner = MultiBankParams {
            child: BankKind::Bank(bank()),
            num_banks: 2,
            orientation: BankOrientation::H,
            gated: true,
        };
        let outer = MultiBankParams {
            child: BankKind::MultiBank(Box::new(inner)),
            num_banks: 4,
            orientation: BankOrientation::H,
            gated: false,
        };
        assert_eq!(outer.addr_size(), bank().addr_size() + 1 + 2);
        assert_eq!(outer.total_bits(), bank().total_bits() * 8);
        assert_eq!(outer.child.num_banks(), 2);
        assert_eq!(outer.child.select_port(), "en");
    }
}
