//! Small static CMOS logic blocks built from gate rows.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::cells::GateKind;
use crate::component::Component;
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{Point, Side};
use crate::layout::row::{GateRow, TreeOp};
use crate::schematic::Direction;
use crate::tech::Tech;
use crate::{bus_bit, clog2};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct LogicTreeParams {
    pub op: TreeOp,
    pub inputs: usize,
}

/// A balanced AND or OR of `in[n]` onto `out`.
///
/// Every port leaves through the bottom edge.
pub struct LogicTree {
    params: LogicTreeParams,
}

impl Component for LogicTree {
    type Params = LogicTreeParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        if params.inputs == 0 {
            return Err(Error::config("logic_tree", "a tree needs at least one input"));
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        match self.params.op {
            TreeOp::And => arcstr::format!("and_tree_{}", self.params.inputs),
            TreeOp::Or => arcstr::format!("or_tree_{}", self.params.inputs),
        }
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let inputs: Vec<ArcStr> = (0..self.params.inputs)
            .map(|i| ArcStr::from(bus_bit("in", i)))
            .collect();
        let mut row = GateRow::new();
        row.push_reduction(ctx, self.params.op, &inputs, "out", "t")?;
        for input in inputs {
            row.expose_on(input, Direction::Input, Side::Bot);
        }
        row.expose_on("out", Direction::Output, Side::Bot);
        row.finish(ctx, Point::zero())?;
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DelayChainParams {
    /// Inverter pairs.
    pub stages: usize,
}

impl DelayChainParams {
    /// A delay long enough for bitlines hanging off `rows` word lines to
    /// develop.
    pub fn for_rows(rows: usize) -> Self {
        Self {
            stages: clog2(rows).max(2),
        }
    }
}

/// A chain of inverter pairs from `a` to `z`.
///
/// Every internal net is a local metal1 link, so the chain is exactly one
/// row tall and can sit inside another gate row.
pub struct DelayChain {
    params: DelayChainParams,
}

impl Component for DelayChain {
    type Params = DelayChainParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        if params.stages == 0 {
            return Err(Error::config("delay_chain", "need at least one stage"));
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("delay_chain_{}", self.params.stages)
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let n = 2 * self.params.stages;
        let mut row = GateRow::new();
        let nets: Vec<String> = (0..=n)
            .map(|i| match i {
                0 => "a".to_string(),
                i if i == n => "z".to_string(),
                i => format!("d{i}"),
            })
            .collect();
        for i in 0..n {
            row.push_gate(ctx, GateKind::Inv, format!("inv_{i}"), &[&nets[i], &nets[i + 1]])?;
        }
        row.expose("a", Direction::Input);
        row.expose("z", Direction::Output);
        row.finish(ctx, Point::zero())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SramCtx;
    use crate::tech::M2;

    #[test]
    fn test_or_tree() {
        let mut ctx = SramCtx::default();
        let params = LogicTreeParams {
            op: TreeOp::Or,
            inputs: 4,
        };
        let tree = ctx.instantiate::<LogicTree>(&params).unwrap();
        assert_eq!(tree.name().as_str(), "or_tree_4");
        // nor2 x2 -> nand2.
        let stats = crate::validate::validate(&tree).unwrap();
        assert_eq!(stats.count("pnor2"), 2);
        assert_eq!(stats.count("pnand2"), 1);
        for i in 0..4 {
            let pin = tree.port(&bus_bit("in", i)).unwrap().largest();
            assert_eq!(pin.layer, M2);
            assert_eq!(pin.rect.bottom(), 0);
        }
        assert_eq!(tree.port("out").unwrap().largest_rect().bottom(), 0);
    }

    #[test]
    fn test_delay_chain_is_one_row() {
        let mut ctx = SramCtx::default();
        let tech = ctx.tech().clone();
        let chain = ctx
            .instantiate::<DelayChain>(&DelayChainParams::for_rows(64))
            .unwrap();
        assert_eq!(chain.name().as_str(), "delay_chain_6");
        assert_eq!(chain.height(), tech.row_height());
        assert_eq!(chain.width(), 12 * GateKind::Inv.width(&tech));
        let stats = crate::validate::validate(&chain).unwrap();
        assert_eq!(stats.count("pinv"), 12);
        assert_eq!(DelayChainParams::for_rows(2).stages, 2);
    }

    #[test]
    fn test_empty_tree_is_rejected() {
        let mut ctx = SramCtx::default();
        let params = LogicTreeParams {
            op: TreeOp::And,
            inputs: 0,
        };
        assert!(ctx.instantiate::<LogicTree>(&params).is_err());
    }
}
