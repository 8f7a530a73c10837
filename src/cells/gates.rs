//! Standard logic gates, one row high.
//!
//! Input pins sit on metal1 pads along the horizontal centerline, one per
//! metal2 pitch, so that every pin can be reached by its own vertical
//! metal2 drop. The output pad is the rightmost pin.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use super::{boundary, mos, pad_pin, poly_gate, power_rails, wells};
use crate::component::Component;
use crate::context::ModuleCtx;
use crate::error::Result;
use crate::geom::{Point, Rect, Span};
use crate::schematic::Direction;
use crate::tech::{Tech, M1, M2};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum GateKind {
    Inv,
    Nand2,
    Nand3,
    Nor2,
    Nor3,
    Xor2,
    Mux2,
    Dff,
}

impl GateKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inv => "pinv",
            Self::Nand2 => "pnand2",
            Self::Nand3 => "pnand3",
            Self::Nor2 => "pnor2",
            Self::Nor3 => "pnor3",
            Self::Xor2 => "xor2",
            Self::Mux2 => "mux2",
            Self::Dff => "dff",
        }
    }

    pub fn inputs(&self) -> &'static [&'static str] {
        match self {
            Self::Inv => &["a"],
            Self::Nand2 | Self::Nor2 | Self::Xor2 => &["a", "b"],
            Self::Nand3 | Self::Nor3 => &["a", "b", "c"],
            Self::Mux2 => &["a", "b", "s"],
            Self::Dff => &["d", "clk", "rst"],
        }
    }

    pub fn output(&self) -> &'static str {
        match self {
            Self::Dff => "q",
            _ => "z",
        }
    }

    /// Width of the gate in metal2 pitches.
    fn slots(&self) -> i64 {
        let extra = match self {
            Self::Dff => 4,
            Self::Xor2 | Self::Mux2 => 3,
            _ => 2,
        };
        self.inputs().len() as i64 + extra
    }

    pub fn width(&self, tech: &Tech) -> i64 {
        self.slots() * tech.pitch(M2)
    }

    /// The x coordinate of input `k`, relative to the gate origin.
    pub fn input_x(&self, tech: &Tech, k: usize) -> i64 {
        (k as i64 + 1) * tech.pitch(M2)
    }

    pub fn output_x(&self, tech: &Tech) -> i64 {
        (self.slots() - 1) * tech.pitch(M2)
    }

    fn spice(&self) -> String {
        let mut s = String::new();
        match self {
            Self::Inv => {
                s += &mos("P0", "z", "a", "vdd", "vdd", "p", 1_800);
                s += &mos("N0", "z", "a", "gnd", "gnd", "n", 900);
            }
            Self::Nand2 => {
                s += &mos("P0", "z", "a", "vdd", "vdd", "p", 1_800);
                s += &mos("P1", "z", "b", "vdd", "vdd", "p", 1_800);
                s += &mos("N0", "z", "a", "x0", "gnd", "n", 1_800);
                s += &mos("N1", "x0", "b", "gnd", "gnd", "n", 1_800);
            }
            Self::Nand3 => {
                for (i, g) in ["a", "b", "c"].iter().enumerate() {
                    s += &mos(&format!("P{i}"), "z", g, "vdd", "vdd", "p", 1_800);
                }
                s += &mos("N0", "z", "a", "x0", "gnd", "n", 2_700);
                s += &mos("N1", "x0", "b", "x1", "gnd", "n", 2_700);
                s += &mos("N2", "x1", "c", "gnd", "gnd", "n", 2_700);
            }
            Self::Nor2 => {
                s += &mos("P0", "x0", "a", "vdd", "vdd", "p", 3_600);
                s += &mos("P1", "z", "b", "x0", "vdd", "p", 3_600);
                s += &mos("N0", "z", "a", "gnd", "gnd", "n", 900);
                s += &mos("N1", "z", "b", "gnd", "gnd", "n", 900);
            }
            Self::Nor3 => {
                s += &mos("P0", "x0", "a", "vdd", "vdd", "p", 5_400);
                s += &mos("P1", "x1", "b", "x0", "vdd", "p", 5_400);
                s += &mos("P2", "z", "c", "x1", "vdd", "p", 5_400);
                for (i, g) in ["a", "b", "c"].iter().enumerate() {
                    s += &mos(&format!("N{i}"), "z", g, "gnd", "gnd", "n", 900);
                }
            }
            Self::Xor2 => {
                // Complementary inputs, then a transmission-gate XOR.
                s += &mos("PA", "a_b", "a", "vdd", "vdd", "p", 1_800);
                s += &mos("NA", "a_b", "a", "gnd", "gnd", "n", 900);
                s += &mos("PB", "b_b", "b", "vdd", "vdd", "p", 1_800);
                s += &mos("NB", "b_b", "b", "gnd", "gnd", "n", 900);
                s += &mos("P0", "z", "b_b", "a", "vdd", "p", 1_800);
                s += &mos("N0", "z", "b", "a", "gnd", "n", 900);
                s += &mos("P1", "z", "b", "a_b", "vdd", "p", 1_800);
                s += &mos("N1", "z", "b_b", "a_b", "gnd", "n", 900);
            }
            Self::Mux2 => {
                s += &mos("PS", "s_b", "s", "vdd", "vdd", "p", 1_800);
                s += &mos("NS", "s_b", "s", "gnd", "gnd", "n", 900);
                s += &mos("P0", "y", "s", "a", "vdd", "p", 1_800);
                s += &mos("N0", "y", "s_b", "a", "gnd", "n", 900);
                s += &mos("P1", "y", "s_b", "b", "vdd", "p", 1_800);
                s += &mos("N1", "y", "s", "b", "gnd", "n", 900);
                s += &mos("PY", "y_b", "y", "vdd", "vdd", "p", 1_800);
                s += &mos("NY", "y_b", "y", "gnd", "gnd", "n", 900);
                s += &mos("PZ", "z", "y_b", "vdd", "vdd", "p", 1_800);
                s += &mos("NZ", "z", "y_b", "gnd", "gnd", "n", 900);
            }
            Self::Dff => {
                // Master-slave flip-flop with an active-high asynchronous clear.
                s += &mos("PC", "clk_b", "clk", "vdd", "vdd", "p", 1_800);
                s += &mos("NC", "clk_b", "clk", "gnd", "gnd", "n", 900);
                s += &mos("PR", "rst_b", "rst", "vdd", "vdd", "p", 1_800);
                s += &mos("NR", "rst_b", "rst", "gnd", "gnd", "n", 900);
                s += &mos("PM0", "m", "clk", "d", "vdd", "p", 1_800);
                s += &mos("NM0", "m", "clk_b", "d", "gnd", "n", 900);
                s += &mos("PM1", "m_b", "m", "vdd", "vdd", "p", 1_800);
                s += &mos("NM1", "m_b", "m", "xm", "gnd", "n", 900);
                s += &mos("NM2", "xm", "rst_b", "gnd", "gnd", "n", 900);
                s += &mos("PM2", "m_b", "rst_b", "vdd", "vdd", "p", 1_800);
                s += &mos("PS0", "s", "clk_b", "m_b", "vdd", "p", 1_800);
                s += &mos("NS0", "s", "clk", "m_b", "gnd", "n", 900);
                s += &mos("PS1", "q", "s", "x1", "vdd", "p", 1_800);
                s += &mos("PS2", "x1", "rst", "vdd", "vdd", "p", 1_800);
                s += &mos("NS1", "q", "s", "gnd", "gnd", "n", 900);
                s += &mos("NS2", "q", "rst", "gnd", "gnd", "n", 900);
            }
        }
        s
    }
}

/// A standard gate.
pub struct Gate {
    kind: GateKind,
}

impl Component for Gate {
    type Params = GateKind;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        Ok(Self { kind: *params })
    }

    fn name(&self) -> ArcStr {
        ArcStr::from(self.kind.name())
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let tech = ctx.tech.clone();
        let kind = self.kind;
        let w = kind.width(&tech);
        let h = tech.row_height();
        let y = h / 2;

        boundary(ctx, w, h);
        wells(ctx, w, h);
        for (k, pin) in kind.inputs().iter().enumerate() {
            let x = kind.input_x(&tech, k);
            poly_gate(ctx, x, h);
            pad_pin(ctx, *pin, Direction::Input, M1, Point::new(x, y))?;
        }

        let x = kind.output_x(&tech);
        pad_pin(ctx, kind.output(), Direction::Output, M1, Point::new(x, y))?;
        // Output strap joining the drains of both networks.
        let strap = Rect::from_spans(
            Span::from_center_span(x, tech.width(M1)),
            Span::new(h / 4, h - h / 4),
        );
        ctx.add_port_shape(kind.output(), crate::layout::Shape::new(M1, strap))?;

        power_rails(ctx, w, h)?;
        ctx.set_raw_spice(kind.spice());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SramCtx;

    #[test]
    fn test_gate_pins_and_width() {
        let mut ctx = SramCtx::default();
        let tech = Tech::scn4m_subm();
        for kind in [
            GateKind::Inv,
            GateKind::Nand2,
            GateKind::Nand3,
            GateKind::Nor2,
            GateKind::Nor3,
            GateKind::Xor2,
            GateKind::Mux2,
            GateKind::Dff,
        ] {
            let gate = ctx.instantiate::<Gate>(&kind).unwrap();
            assert_eq!(gate.name().as_str(), kind.name());
            assert_eq!(gate.width(), kind.width(&tech));
            assert_eq!(gate.height(), tech.row_height());
            let ports: Vec<_> = gate.netlist().port_names().map(|p| p.to_string()).collect();
            let mut expected: Vec<_> = kind.inputs().iter().map(|s| s.to_string()).collect();
            expected.push(kind.output().to_string());
            expected.push("vdd".into());
            expected.push("gnd".into());
            assert_eq!(ports, expected);
        }
    }

    #[test]
    fn test_input_pads_do_not_overlap() {
        let tech = Tech::scn4m_subm();
        let kind = GateKind::Nand3;
        let xs: Vec<_> = (0..3).map(|k| kind.input_x(&tech, k)).collect();
        for pair in xs.windows(2) {
            assert!(pair[1] - pair[0] >= tech.pitch(M2));
        }
        assert!(kind.output_x(&tech) - xs[2] >= tech.pitch(M2));
    }
}
