//! Asynchronous bank control.
//!
//! The controller is a network of static gates rather than an encoded state
//! machine. With no request pending the bank idles with its bitlines
//! precharged; a request on `r`, `w` or `rw` releases precharge and enables
//! the word lines, a delay chain matched to the bitline swing fires the
//! sense amplifiers, and the completion signals `dr` (data ready) and `wc`
//! (write complete) from the column detectors raise the acknowledges.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::blocks::logic::{DelayChain, DelayChainParams};
use crate::cells::GateKind;
use crate::component::Component;
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{Point, Side};
use crate::layout::row::GateRow;
use crate::schematic::Direction;
use crate::tech::Tech;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BankControlParams {
    /// Qualify every request with a bank `sel` input.
    pub two_level: bool,
    /// Force the acknowledges low while `sleep` is high.
    pub power_gate: bool,
    pub delay: DelayChainParams,
}

pub struct BankControlLogic {
    params: BankControlParams,
}

impl BankControlLogic {
    pub fn inputs(&self) -> Vec<&'static str> {
        let mut inputs = vec!["r", "w", "rw", "reset", "dr", "wc"];
        if self.params.two_level {
            inputs.push("sel");
        }
        if self.params.power_gate {
            inputs.push("sleep");
        }
        inputs
    }

    pub const OUTPUTS: [&'static str; 7] = ["pchg", "wl_en", "sen", "wen", "ack", "rack", "wack"];
}

/// Pushes `out = a & b` as a nand2 followed by an inverter.
fn push_and2(row: &mut GateRow, ctx: &mut ModuleCtx, name: &str, a: &str, b: &str, out: &str) -> Result<()> {
    let mid = format!("{name}_b");
    row.push_gate(ctx, GateKind::Nand2, format!("{name}_nand"), &[a, b, &mid])?;
    row.push_gate(ctx, GateKind::Inv, format!("{name}_inv"), &[&mid, out])
}

/// Pushes `out = a | b` as a nor2 followed by an inverter.
fn push_or2(row: &mut GateRow, ctx: &mut ModuleCtx, name: &str, a: &str, b: &str, out: &str) -> Result<()> {
    let mid = format!("{name}_b");
    row.push_gate(ctx, GateKind::Nor2, format!("{name}_nor"), &[a, b, &mid])?;
    row.push_gate(ctx, GateKind::Inv, format!("{name}_inv"), &[&mid, out])
}

impl Component for BankControlLogic {
    type Params = BankControlParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        if params.delay.stages == 0 {
            return Err(Error::config("bank_control_logic", "the sense delay needs at least one stage"));
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        let tl = if self.params.two_level { "_tl" } else { "" };
        let pg = if self.params.power_gate { "_pg" } else { "" };
        arcstr::format!("bank_control_logic{tl}{pg}_d{}", self.params.delay.stages)
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let mut row = GateRow::new();

        let (r, w, rw) = if self.params.two_level {
            push_and2(&mut row, ctx, "sel_r", "r", "sel", "r_s")?;
            push_and2(&mut row, ctx, "sel_w", "w", "sel", "w_s")?;
            push_and2(&mut row, ctx, "sel_rw", "rw", "sel", "rw_s")?;
            ("r_s", "w_s", "rw_s")
        } else {
            ("r", "w", "rw")
        };

        row.push_gate(ctx, GateKind::Nor3, "idle_nor", &[r, w, rw, "idle"])?;
        row.push_gate(ctx, GateKind::Nor2, "wl_en_nor", &["idle", "reset", "wl_en"])?;
        row.push_gate(ctx, GateKind::Inv, "pchg_inv", &["wl_en", "pchg"])?;

        let sense = ctx
            .instantiate::<DelayChain>(&self.params.delay)?
            .named("sense_delay")
            .with_connections([("a", "wl_en"), ("z", "xsen")]);
        row.push(sense);

        push_or2(&mut row, ctx, "rd", r, rw, "rd")?;
        push_or2(&mut row, ctx, "wr", w, rw, "wr")?;
        push_and2(&mut row, ctx, "sen", "rd", "xsen", "sen")?;

        row.push_gate(ctx, GateKind::Nand2, "wen_w", &[w, "wl_en", "wen_wb"])?;
        row.push_gate(ctx, GateKind::Nand2, "wen_rw", &[rw, "dr", "wen_rwb"])?;
        row.push_gate(ctx, GateKind::Nand2, "wen_or", &["wen_wb", "wen_rwb", "wen"])?;

        let (ack, rack, wack) = if self.params.power_gate {
            ("ack_i", "rack_i", "wack_i")
        } else {
            ("ack", "rack", "wack")
        };
        push_and2(&mut row, ctx, "rack", "rd", "dr", rack)?;
        push_and2(&mut row, ctx, "wack", "wr", "wc", wack)?;
        row.push_gate(ctx, GateKind::Nand2, "ack_r", &[r, "dr", "ack_rb"])?;
        row.push_gate(ctx, GateKind::Nand2, "ack_w", &["wr", "wc", "ack_wb"])?;
        row.push_gate(ctx, GateKind::Nand2, "ack_or", &["ack_rb", "ack_wb", ack])?;

        if self.params.power_gate {
            for (inner, out) in [(ack, "ack"), (rack, "rack"), (wack, "wack")] {
                let inv = format!("{out}_sb");
                row.push_gate(ctx, GateKind::Inv, format!("{out}_sleep_inv"), &[inner, &inv])?;
                row.push_gate(ctx, GateKind::Nor2, format!("{out}_sleep_nor"), &[&inv, "sleep", out])?;
            }
        }

        for input in self.inputs() {
            row.expose_on(input, Direction::Input, Side::Bot);
        }
        for output in Self::OUTPUTS {
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

    fn params(two_level: bool, power_gate: bool) -> BankControlParams {
        BankControlParams {
            two_level,
            power_gate,
            delay: DelayChainParams::for_rows(32),
        }
    }

    #[test]
    fn test_control_logic_ports() {
        let mut ctx = SramCtx::default();
        let logic = ctx
            .instantiate::<BankControlLogic>(&params(false, false))
            .unwrap();
        assert_eq!(logic.name().as_str(), "bank_control_logic_d5");
        let ports: Vec<_> = logic.netlist().port_names().map(|p| p.to_string()).collect();
        assert_eq!(
            ports,
            [
                "r", "w", "rw", "reset", "dr", "wc", "pchg", "wl_en", "sen", "wen", "ack",
                "rack", "wack", "vdd", "gnd"
            ]
        );
        for port in ports.iter().filter(|p| *p != "vdd" && *p != "gnd") {
            assert_eq!(logic.port(port).unwrap().largest_rect().bottom(), 0);
        }
        let stats = crate::validate::validate(&logic).unwrap();
        assert_eq!(stats.count("delay_chain_5"), 1);
        assert_eq!(stats.count("pnor3"), 1);
    }

    #[test]
    fn test_two_level_power_gated() {
        let mut ctx = SramCtx::default();
        let logic = ctx
            .instantiate::<BankControlLogic>(&params(true, true))
            .unwrap();
        assert!(logic.has_port("sel"));
        assert!(logic.has_port("sleep"));
        let stats = crate::validate::validate(&logic).unwrap();
        // One nor2 per gated acknowledge, plus wl_en, rd and wr.
        assert_eq!(stats.count("pnor2"), 6);
    }

    #[test]
    fn test_control_equations() {
        let mut ctx = SramCtx::default();
        let logic = ctx
            .instantiate::<BankControlLogic>(&params(false, true))
            .unwrap();
        let eval = |r, w, rw, reset, dr, wc, sleep| {
            let nets = crate::tests::eval_gates(
                &logic,
                &[
                    ("r", r),
                    ("w", w),
                    ("rw", rw),
                    ("reset", reset),
                    ("dr", dr),
                    ("wc", wc),
                    ("sleep", sleep),
                ],
            );
            BankControlLogic::OUTPUTS.map(|o| nets[o])
        };

        // pchg, wl_en, sen, wen, ack, rack, wack
        assert_eq!(
            eval(false, false, false, false, false, false, false),
            [true, false, false, false, false, false, false]
        );
        assert_eq!(
            eval(true, false, false, false, true, false, false),
            [false, true, true, false, true, true, false]
        );
        assert_eq!(
            eval(false, true, false, false, false, true, false),
            [false, true, false, true, true, false, true]
        );
        assert_eq!(
            eval(false, false, true, false, true, true, false),
            [false, true, true, true, true, true, true]
        );
        // Read-modify-write waits for data before driving the bitlines.
        assert_eq!(
            eval(false, false, true, false, false, false, false),
            [false, true, true, false, false, false, false]
        );
        // Reset holds the bank in precharge.
        assert_eq!(
            eval(true, false, false, true, false, false, false),
            [true, false, false, false, false, false, false]
        );
        // Sleep masks every acknowledge.
        assert_eq!(
            eval(true, false, false, false, true, false, true),
            [false, true, true, false, false, false, false]
        );
    }
}
