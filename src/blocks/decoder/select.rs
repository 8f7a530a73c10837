use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::bus_bit;
use crate::cells::GateKind;
use crate::component::Component;
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{Point, Side};
use crate::layout::row::{GateRow, TreeOp};
use crate::schematic::Direction;
use crate::tech::Tech;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SelectDecoderParams {
    pub outputs: usize,
}

/// A one-hot decoder with an enable: `sel[k] = (a == k) & en`.
///
/// Used for sub-bank and column selection, where the number of outputs is
/// small enough for a single row. Every port leaves through the bottom
/// edge.
pub struct SelectDecoder {
    params: SelectDecoderParams,
}

impl SelectDecoder {
    pub fn bits(&self) -> usize {
        self.params.outputs.trailing_zeros() as usize
    }
}

impl Component for SelectDecoder {
    type Params = SelectDecoderParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        if !params.outputs.is_power_of_two() || params.outputs > 8 {
            return Err(Error::config(
                "select_decoder",
                format!("outputs must be a power of two up to 8, got {}", params.outputs),
            ));
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("select_decoder_{}", self.params.outputs)
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let bits = self.bits();
        let mut row = GateRow::new();
        let addr: Vec<ArcStr> = (0..bits).map(|i| ArcStr::from(bus_bit("a", i))).collect();
        let comp: Vec<ArcStr> = (0..bits).map(|i| arcstr::format!("a_b{i}")).collect();
        for i in 0..bits {
            row.push_gate(ctx, GateKind::Inv, format!("inv_{i}"), &[&addr[i], &comp[i]])?;
        }
        for k in 0..self.params.outputs {
            let mut terms: Vec<ArcStr> = (0..bits)
                .map(|i| {
                    if (k >> i) & 1 == 1 {
                        addr[i].clone()
                    } else {
                        comp[i].clone()
                    }
                })
                .collect();
            terms.push(ArcStr::from("en"));
            row.push_reduction(ctx, TreeOp::And, &terms, &bus_bit("sel", k), &format!("s{k}"))?;
        }
        for a in addr {
            row.expose_on(a, Direction::Input, Side::Bot);
        }
        row.expose_on("en", Direction::Input, Side::Bot);
        for k in 0..self.params.outputs {
            row.expose_on(bus_bit("sel", k), Direction::Output, Side::Bot);
        }
        row.finish(ctx, Point::zero())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SramCtx;

    #[test]
    fn test_select_decoder_ports() {
        let mut ctx = SramCtx::default();
        let dec = ctx
            .instantiate::<SelectDecoder>(&SelectDecoderParams { outputs: 4 })
            .unwrap();
        // a[2], en, sel[4], vdd, gnd.
        assert_eq!(dec.netlist().num_ports(), 9);
        for k in 0..4 {
            assert_eq!(dec.port(&bus_bit("sel", k)).unwrap().largest_rect().bottom(), 0);
        }
        let stats = crate::validate::validate(&dec).unwrap();
        // Two address inverters, plus nand2, carry inverter, nor2 per output.
        assert_eq!(stats.count("pnor2"), 4);
    }

    #[test]
    fn test_single_output_buffers_enable() {
        let mut ctx = SramCtx::default();
        let dec = ctx
            .instantiate::<SelectDecoder>(&SelectDecoderParams { outputs: 1 })
            .unwrap();
        assert!(dec.has_port("en"));
        assert!(dec.has_port("sel[0]"));
        assert_eq!(dec.netlist().instances().len(), 2);
    }

    #[test]
    fn test_select_decoder_sizes() {
        let mut ctx = SramCtx::default();
        for outputs in [3, 16] {
            let params = SelectDecoderParams { outputs };
            assert!(ctx.instantiate::<SelectDecoder>(&params).is_err());
        }
    }
}
