//! Request distribution across replicated banks.

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
pub struct SplitMergeControlParams {
    pub num_banks: usize,
    /// Qualify requests with an `en` input.
    pub gated: bool,
}

/// Decodes the bank address into a one-hot `sel`, forwards the request
/// to the selected bank only, and merges the banks' acknowledges.
///
/// Pins: `r`, `w`, `rw`, `en` if gated, `addr[log2 n]`, `bank_ack[n]`,
/// `bank_rack[n]`, `bank_wack[n]`, then `sel[n]`, `bank_r[n]`, `bank_w[n]`,
/// `bank_rw[n]`, `ack`, `rack`, `wack`, `vdd`, `gnd`.
pub struct SplitMergeControl {
    params: SplitMergeControlParams,
}

impl SplitMergeControl {
    pub fn addr_bits(&self) -> usize {
        clog2(self.params.num_banks)
    }
}

impl Component for SplitMergeControl {
    type Params = SplitMergeControlParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        if ![1, 2, 4].contains(&params.num_banks) {
            return Err(Error::config(
                "split_merge_control",
                format!("bank count must be 1, 2 or 4, got {}", params.num_banks),
            ));
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        let en = if self.params.gated { "_en" } else { "" };
        arcstr::format!("split_merge_control_{}{en}", self.params.num_banks)
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let n = self.params.num_banks;
        let bits = self.addr_bits();
        let mut row = GateRow::new();

        row.push_gate(ctx, GateKind::Nor3, "req_nor", &["r", "w", "rw", "req_b"])?;
        row.push_gate(ctx, GateKind::Inv, "req_inv", &["req_b", "req"])?;
        let active = if self.params.gated {
            row.push_gate(ctx, GateKind::Nand2, "active_nand", &["req", "en", "active_b"])?;
            row.push_gate(ctx, GateKind::Inv, "active_inv", &["active_b", "active"])?;
            "active"
        } else {
            "req"
        };

        let addr: Vec<ArcStr> = (0..bits).map(|i| ArcStr::from(bus_bit("addr", i))).collect();
        let comp: Vec<ArcStr> = (0..bits).map(|i| arcstr::format!("addr_b{i}")).collect();
        for i in 0..bits {
            row.push_gate(ctx, GateKind::Inv, format!("addr_inv_{i}"), &[&addr[i], &comp[i]])?;
        }
        for k in 0..n {
            let mut terms: Vec<ArcStr> = (0..bits)
                .map(|i| {
                    if (k >> i) & 1 == 1 {
                        addr[i].clone()
                    } else {
                        comp[i].clone()
                    }
                })
                .collect();
            terms.push(ArcStr::from(active));
            let sel = bus_bit("sel", k);
            row.push_reduction(ctx, TreeOp::And, &terms, &sel, &format!("sel{k}"))?;
            for req in ["r", "w", "rw"] {
                let mid = format!("bank_{req}_b{k}");
                let out = bus_bit(&format!("bank_{req}"), k);
                row.push_gate(ctx, GateKind::Nand2, format!("bank_{req}_nand_{k}"), &[req, &sel, &mid])?;
                row.push_gate(ctx, GateKind::Inv, format!("bank_{req}_inv_{k}"), &[&mid, &out])?;
            }
        }
        for ack in ["ack", "rack", "wack"] {
            let inputs: Vec<ArcStr> = (0..n)
                .map(|k| ArcStr::from(bus_bit(&format!("bank_{ack}"), k)))
                .collect();
            row.push_reduction(ctx, TreeOp::Or, &inputs, ack, &format!("{ack}_or"))?;
        }

        let mut inputs: Vec<String> = vec!["r".into(), "w".into(), "rw".into()];
        if self.params.gated {
            inputs.push("en".into());
        }
        inputs.extend(addr.iter().map(|a| a.to_string()));
        for ack in ["ack", "rack", "wack"] {
            inputs.extend((0..n).map(|k| bus_bit(&format!("bank_{ack}"), k)));
        }
        for input in inputs {
            row.expose_on(input, Direction::Input, Side::Bot);
        }
        let mut outputs: Vec<String> = (0..n).map(|k| bus_bit("sel", k)).collect();
        for req in ["r", "w", "rw"] {
            outputs.extend((0..n).map(|k| bus_bit(&format!("bank_{req}"), k)));
        }
        outputs.extend(["ack", "rack", "wack"].map(String::from));
        for output in outputs {
            row.expose_on(output, Direction::Output, Side::Bot);
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
    fn test_four_bank_control() {
        let mut ctx = SramCtx::default();
        let params = SplitMergeControlParams {
            num_banks: 4,
            gated: true,
        };
        let smc = ctx.instantiate::<SplitMergeControl>(&params).unwrap();
        assert_eq!(smc.name().as_str(), "split_merge_control_4_en");
        // r, w, rw, en, addr[2], 3 x 4 acknowledges, 4 x 4 outputs,
        // ack, rack, wack, vdd, gnd.
        assert_eq!(smc.netlist().num_ports(), 4 + 2 + 12 + 16 + 3 + 2);
        let stats = crate::validate::validate(&smc).unwrap();
        assert_eq!(stats.count("pnor3"), 1);
    }

    #[test]
    fn test_one_hot_select() {
        let mut ctx = SramCtx::default();
        let params = SplitMergeControlParams {
            num_banks: 4,
            gated: true,
        };
        let smc = ctx.instantiate::<SplitMergeControl>(&params).unwrap();
        for en in [false, true] {
            for k in 0..4 {
                let acks: Vec<String> = ["ack", "rack", "wack"]
                    .iter()
                    .flat_map(|a| (0..4).map(move |j| bus_bit(&format!("bank_{a}"), j)))
                    .collect();
                let mut inputs = vec![
                    ("r", true),
                    ("w", false),
                    ("rw", false),
                    ("en", en),
                    ("addr[0]", k & 1 == 1),
                    ("addr[1]", k & 2 == 2),
                ];
                for name in acks.iter() {
                    // Only the selected bank acknowledges a read.
                    let high = en
                        && (*name == bus_bit("bank_ack", k) || *name == bus_bit("bank_rack", k));
                    inputs.push((name.as_str(), high));
                }
                let nets = crate::tests::eval_gates(&smc, &inputs);
                for j in 0..4 {
                    let selected = en && j == k;
                    assert_eq!(nets[bus_bit("sel", j).as_str()], selected, "sel[{j}] k={k} en={en}");
                    assert_eq!(nets[bus_bit("bank_r", j).as_str()], selected);
                    assert!(!nets[bus_bit("bank_w", j).as_str()]);
                    assert!(!nets[bus_bit("bank_rw", j).as_str()]);
                }
                assert_eq!(nets["ack"], en);
                assert_eq!(nets["rack"], en);
                assert!(!nets["wack"]);
            }
        }
    }

    #[test]
    fn test_single_bank_control_is_a_buffer() {
        let mut ctx = SramCtx::default();
        let params = SplitMergeControlParams {
            num_banks: 1,
            gated: false,
        };
        let smc = ctx.instantiate::<SplitMergeControl>(&params).unwrap();
        assert!(smc.has_port("sel[0]"));
        assert!(!smc.has_port("addr[0]"));
        crate::validate::validate(&smc).unwrap();
    }

    #[test]
    fn test_rejects_three_banks() {
        let mut ctx = SramCtx::default();
        let params = SplitMergeControlParams {
            num_banks: 3,
            gated: false,
        };
        let err = ctx.instantiate::<SplitMergeControl>(&params).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
