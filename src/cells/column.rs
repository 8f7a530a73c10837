//! Cells pitch-matched to one bitcell column.
//!
//! Column cells are `Tech::column_width` wide. Vertical signals use the
//! three metal2 column tracks T0, T1 and T2; shared controls are full-width
//! metal1 rails so that abutting cells form one continuous rail.

use arcstr::ArcStr;

use super::{boundary, mos, pad_pin, poly_gate, power_rails, rail_pin, rail_rect, track_pin, wells};
use crate::component::{Component, NoParams};
use crate::context::ModuleCtx;
use crate::error::Result;
use crate::geom::{Point, Span};
use crate::schematic::Direction;
use crate::tech::{Tech, M1, M3};

const T0: usize = 0;
const T1: usize = 1;
const T2: usize = 2;

/// Draws the parts shared by every column cell.
fn frame(ctx: &mut ModuleCtx, h: i64, gates: &[i64]) -> Result<i64> {
    let w = ctx.tech().column_width();
    boundary(ctx, w, h);
    wells(ctx, w, h);
    for x in gates {
        poly_gate(ctx, *x, h);
    }
    Ok(w)
}

/// The classic six-transistor bitcell.
pub struct Bitcell;

impl Component for Bitcell {
    type Params = NoParams;

    fn new(_params: &Self::Params, _tech: &Tech) -> Result<Self> {
        Ok(Self)
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("sram_cell_6t")
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let h = ctx.tech().row_height();
        let w = frame(ctx, h, &[1_600, 3_200])?;
        let full = Span::new(0, h);
        track_pin(ctx, "bl", Direction::InOut, T0, full)?;
        track_pin(ctx, "br", Direction::InOut, T2, full)?;
        rail_pin(ctx, "wl", Direction::Input, w, h / 2)?;
        power_rails(ctx, w, h)?;

        let mut s = String::new();
        s += &mos("PU0", "q", "qb", "vdd", "vdd", "p", 600);
        s += &mos("PU1", "qb", "q", "vdd", "vdd", "p", 600);
        s += &mos("PD0", "q", "qb", "gnd", "gnd", "n", 1_200);
        s += &mos("PD1", "qb", "q", "gnd", "gnd", "n", 1_200);
        s += &mos("PG0", "bl", "wl", "q", "gnd", "n", 800);
        s += &mos("PG1", "br", "wl", "qb", "gnd", "n", 800);
        ctx.set_raw_spice(s);
        Ok(())
    }
}

/// Bitline precharge and equalization, enabled while `en` is high.
pub struct Precharge;

impl Component for Precharge {
    type Params = NoParams;

    fn new(_params: &Self::Params, _tech: &Tech) -> Result<Self> {
        Ok(Self)
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("precharge")
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let h = 4_200;
        let w = frame(ctx, h, &[1_600, 3_200])?;
        let full = Span::new(0, h);
        track_pin(ctx, "bl", Direction::InOut, T0, full)?;
        track_pin(ctx, "br", Direction::InOut, T2, full)?;
        rail_pin(ctx, "en", Direction::Input, w, h / 2)?;
        power_rails(ctx, w, h)?;

        let mut s = String::new();
        s += &mos("PI", "en_b", "en", "vdd", "vdd", "p", 1_200);
        s += &mos("NI", "en_b", "en", "gnd", "gnd", "n", 600);
        s += &mos("P0", "bl", "en_b", "vdd", "vdd", "p", 1_600);
        s += &mos("P1", "br", "en_b", "vdd", "vdd", "p", 1_600);
        s += &mos("PEQ", "bl", "en_b", "br", "vdd", "p", 1_000);
        ctx.set_raw_spice(s);
        Ok(())
    }
}

/// One pass-gate pair of a column multiplexer.
///
/// The outputs occupy the lower half of the bitline tracks so that the
/// array can strap the outputs of one group together on metal3.
pub struct ColumnMux;

impl Component for ColumnMux {
    type Params = NoParams;

    fn new(_params: &Self::Params, _tech: &Tech) -> Result<Self> {
        Ok(Self)
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("column_mux")
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let h = 5_600;
        let w = frame(ctx, h, &[1_600, 3_200])?;
        track_pin(ctx, "bl", Direction::InOut, T0, Span::new(3_600, h))?;
        track_pin(ctx, "br", Direction::InOut, T2, Span::new(3_600, h))?;
        track_pin(ctx, "bl_out", Direction::InOut, T0, Span::new(0, 2_800))?;
        track_pin(ctx, "br_out", Direction::InOut, T2, Span::new(0, 2_800))?;
        track_pin(ctx, "sel", Direction::Input, T1, Span::new(0, 1_400))?;
        let gnd = rail_rect(ctx, w, h, false);
        ctx.add_pin("gnd", Direction::Ground, M1, gnd)?;

        let mut s = String::new();
        s += &mos("N0", "bl", "sel", "bl_out", "gnd", "n", 1_800);
        s += &mos("N1", "br", "sel", "br_out", "gnd", "n", 1_800);
        ctx.set_raw_spice(s);
        Ok(())
    }
}

/// Drives a bitline pair from `din` while `en` (and `bm`, if masked) is high.
pub struct WriteDriver {
    mask: bool,
}

impl Component for WriteDriver {
    type Params = bool;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        Ok(Self { mask: *params })
    }

    fn name(&self) -> ArcStr {
        if self.mask {
            arcstr::literal!("write_driver_mask")
        } else {
            arcstr::literal!("write_driver")
        }
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let h = 5_600;
        let w = frame(ctx, h, &[1_200, 2_400, 3_600])?;
        let full = Span::new(0, h);
        pad_pin(ctx, "din", Direction::Input, M3, Point::new(1_200, 1_400))?;
        track_pin(ctx, "bl", Direction::InOut, T0, full)?;
        track_pin(ctx, "br", Direction::InOut, T2, full)?;
        rail_pin(ctx, "en", Direction::Input, w, h / 2)?;
        if self.mask {
            pad_pin(ctx, "bm", Direction::Input, M3, Point::new(3_600, 1_400))?;
        }
        power_rails(ctx, w, h)?;

        let mut s = String::new();
        s += &mos("PD", "din_b", "din", "vdd", "vdd", "p", 1_200);
        s += &mos("ND", "din_b", "din", "gnd", "gnd", "n", 600);
        let tail = if self.mask {
            s += &mos("NM", "x_en", "bm", "gnd", "gnd", "n", 3_600);
            "x_en"
        } else {
            "gnd"
        };
        s += &mos("N0", "bl", "din_b", "x0", "gnd", "n", 3_600);
        s += &mos("N1", "x0", "en", tail, "gnd", "n", 3_600);
        s += &mos("N2", "br", "din", "x1", "gnd", "n", 3_600);
        s += &mos("N3", "x1", "en", tail, "gnd", "n", 3_600);
        ctx.set_raw_spice(s);
        Ok(())
    }
}

/// A latch-type sense amplifier fired by `en`.
pub struct SenseAmp;

impl Component for SenseAmp {
    type Params = NoParams;

    fn new(_params: &Self::Params, _tech: &Tech) -> Result<Self> {
        Ok(Self)
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("sense_amp")
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let h = 7_000;
        let w = frame(ctx, h, &[1_600, 3_200])?;
        track_pin(ctx, "bl", Direction::InOut, T0, Span::new(h / 2, h))?;
        track_pin(ctx, "br", Direction::InOut, T2, Span::new(h / 2, h))?;
        rail_pin(ctx, "en", Direction::Input, w, h / 2)?;
        track_pin(ctx, "dout", Direction::Output, T1, Span::new(0, 2_000))?;
        track_pin(ctx, "dout_b", Direction::Output, T0, Span::new(0, 2_000))?;
        power_rails(ctx, w, h)?;

        let mut s = String::new();
        s += &mos("P0", "sb", "s", "vdd", "vdd", "p", 1_200);
        s += &mos("P1", "s", "sb", "vdd", "vdd", "p", 1_200);
        s += &mos("N0", "sb", "s", "tail", "gnd", "n", 1_200);
        s += &mos("N1", "s", "sb", "tail", "gnd", "n", 1_200);
        s += &mos("NT", "tail", "en", "gnd", "gnd", "n", 2_400);
        s += &mos("PB0", "s", "en", "bl", "vdd", "p", 1_200);
        s += &mos("PB1", "sb", "en", "br", "vdd", "p", 1_200);
        // Outputs rest low while the latch is precharged high.
        s += &mos("PO0", "dout", "sb", "vdd", "vdd", "p", 1_200);
        s += &mos("NO0", "dout", "sb", "gnd", "gnd", "n", 600);
        s += &mos("PO1", "dout_b", "s", "vdd", "vdd", "p", 1_200);
        s += &mos("NO1", "dout_b", "s", "gnd", "gnd", "n", 600);
        ctx.set_raw_spice(s);
        Ok(())
    }
}

/// The height of both completion gates.
const COMPLETION_HEIGHT: i64 = 4_200;

/// Draws the shared `done` rail and its weak pull-up.
///
/// The rail is pseudo-NMOS: every column pulls it low until that column
/// has completed, so the rail is the AND of all columns.
fn done_rail(ctx: &mut ModuleCtx, w: i64, s: &mut String) -> Result<()> {
    rail_pin(ctx, "done", Direction::InOut, w, COMPLETION_HEIGHT / 2)?;
    *s += &mos("PU", "done", "gnd", "vdd", "vdd", "p", 600);
    Ok(())
}

/// Holds the `done` rail low while both bitlines are still high.
pub struct WriteCompleteGate;

impl Component for WriteCompleteGate {
    type Params = NoParams;

    fn new(_params: &Self::Params, _tech: &Tech) -> Result<Self> {
        Ok(Self)
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("write_complete_gate")
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let h = COMPLETION_HEIGHT;
        let w = frame(ctx, h, &[1_600, 3_200])?;
        let full = Span::new(0, h);
        track_pin(ctx, "a", Direction::Input, T0, full)?;
        track_pin(ctx, "b", Direction::Input, T2, full)?;
        let mut s = String::new();
        done_rail(ctx, w, &mut s)?;
        power_rails(ctx, w, h)?;

        s += &mos("N0", "done", "a", "x0", "gnd", "n", 1_200);
        s += &mos("N1", "x0", "b", "gnd", "gnd", "n", 1_200);
        ctx.set_raw_spice(s);
        Ok(())
    }
}

/// Holds the `done` rail low until the sense amplifier has resolved in
/// either direction.
pub struct DataReadyGate;

impl Component for DataReadyGate {
    type Params = NoParams;

    fn new(_params: &Self::Params, _tech: &Tech) -> Result<Self> {
        Ok(Self)
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("data_ready_gate")
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let h = COMPLETION_HEIGHT;
        let w = frame(ctx, h, &[1_600, 3_200])?;
        track_pin(ctx, "a", Direction::Input, T1, Span::new(0, h))?;
        track_pin(ctx, "b", Direction::Input, T0, Span::new(2_800, h))?;
        let mut s = String::new();
        done_rail(ctx, w, &mut s)?;
        power_rails(ctx, w, h)?;

        s += &mos("P0", "x0", "a", "vdd", "vdd", "p", 2_400);
        s += &mos("P1", "idle", "b", "x0", "vdd", "p", 2_400);
        s += &mos("N0", "idle", "a", "gnd", "gnd", "n", 600);
        s += &mos("N1", "idle", "b", "gnd", "gnd", "n", 600);
        s += &mos("N2", "done", "idle", "gnd", "gnd", "n", 1_200);
        ctx.set_raw_spice(s);
        Ok(())
    }
}

/// Drives the shared output `Q` from `D` while `sel` is high.
pub struct MergeCell;

impl Component for MergeCell {
    type Params = NoParams;

    fn new(_params: &Self::Params, _tech: &Tech) -> Result<Self> {
        Ok(Self)
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("merge_cell")
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let h = 4_200;
        let w = frame(ctx, h, &[1_600, 3_200])?;
        track_pin(ctx, "D", Direction::Input, T1, Span::new(2_800, h))?;
        track_pin(ctx, "Q", Direction::Output, T1, Span::new(0, 1_400))?;
        rail_pin(ctx, "sel", Direction::Input, w, 2_100)?;
        power_rails(ctx, w, h)?;

        // Tri-state inverter pair: Q follows D only while selected.
        let mut s = String::new();
        s += &mos("PS", "sel_b", "sel", "vdd", "vdd", "p", 1_200);
        s += &mos("NS", "sel_b", "sel", "gnd", "gnd", "n", 600);
        s += &mos("PD", "d_b", "D", "vdd", "vdd", "p", 1_200);
        s += &mos("ND", "d_b", "D", "gnd", "gnd", "n", 600);
        s += &mos("P0", "x0", "d_b", "vdd", "vdd", "p", 2_400);
        s += &mos("P1", "Q", "sel_b", "x0", "vdd", "p", 2_400);
        s += &mos("N1", "Q", "sel", "x1", "gnd", "n", 1_200);
        s += &mos("N0", "x1", "d_b", "gnd", "gnd", "n", 1_200);
        ctx.set_raw_spice(s);
        Ok(())
    }
}

/// Passes the shared input `D` (and mask bit `BM`) into one sub-bank while
/// `sel` is high.
pub struct SplitCell {
    mask: bool,
}

impl Component for SplitCell {
    type Params = bool;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        Ok(Self { mask: *params })
    }

    fn name(&self) -> ArcStr {
        if self.mask {
            arcstr::literal!("split_cell_mask")
        } else {
            arcstr::literal!("split_cell")
        }
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let h = 4_200;
        let w = frame(ctx, h, &[1_600, 3_200])?;
        track_pin(ctx, "D", Direction::Input, T0, Span::new(0, 1_400))?;
        pad_pin(ctx, "Q", Direction::Output, M3, Point::new(1_200, 3_500))?;
        rail_pin(ctx, "sel", Direction::Input, w, 2_100)?;
        if self.mask {
            track_pin(ctx, "BM", Direction::Input, T2, Span::new(0, 1_400))?;
            pad_pin(ctx, "BMQ", Direction::Output, M3, Point::new(3_600, 3_500))?;
        }
        power_rails(ctx, w, h)?;

        let mut s = String::new();
        let gate = |s: &mut String, d: &str, q: &str| {
            let x = format!("{q}_x");
            let n = format!("{q}_n");
            s.push_str(&mos(&format!("P{q}0"), &n, d, "vdd", "vdd", "p", 1_200));
            s.push_str(&mos(&format!("P{q}1"), &n, "sel", "vdd", "vdd", "p", 1_200));
            s.push_str(&mos(&format!("N{q}0"), &n, d, &x, "gnd", "n", 1_200));
            s.push_str(&mos(&format!("N{q}1"), &x, "sel", "gnd", "gnd", "n", 1_200));
            s.push_str(&mos(&format!("P{q}2"), q, &n, "vdd", "vdd", "p", 1_200));
            s.push_str(&mos(&format!("N{q}2"), q, &n, "gnd", "gnd", "n", 600));
        };
        gate(&mut s, "D", "Q");
        if self.mask {
            gate(&mut s, "BM", "BMQ");
        }
        ctx.set_raw_spice(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SramCtx;
    use crate::tech::M2;

    #[test]
    fn test_column_cells_are_one_column_wide() {
        let mut ctx = SramCtx::default();
        let w = ctx.tech().column_width();
        let cells = [
            ctx.instantiate::<Bitcell>(&NoParams).unwrap(),
            ctx.instantiate::<Precharge>(&NoParams).unwrap(),
            ctx.instantiate::<ColumnMux>(&NoParams).unwrap(),
            ctx.instantiate::<WriteDriver>(&true).unwrap(),
            ctx.instantiate::<SenseAmp>(&NoParams).unwrap(),
            ctx.instantiate::<WriteCompleteGate>(&NoParams).unwrap(),
            ctx.instantiate::<DataReadyGate>(&NoParams).unwrap(),
            ctx.instantiate::<MergeCell>(&NoParams).unwrap(),
            ctx.instantiate::<SplitCell>(&false).unwrap(),
        ];
        for cell in cells.iter() {
            assert_eq!(cell.width(), w, "{}", cell.name());
            assert!(cell.netlist().raw().is_some());
        }
    }

    #[test]
    fn test_split_cell_mask_pins() {
        let mut ctx = SramCtx::default();
        let plain = ctx.instantiate::<SplitCell>(&false).unwrap();
        let masked = ctx.instantiate::<SplitCell>(&true).unwrap();
        assert!(!plain.has_port("BM"));
        assert!(masked.has_port("BM"));
        assert!(masked.has_port("BMQ"));
        assert_eq!(masked.port("D").unwrap().largest().layer, M2);
        assert_eq!(masked.port("Q").unwrap().largest().layer, M3);
    }

    #[test]
    fn test_completion_gates_share_a_rail() {
        let mut ctx = SramCtx::default();
        let wc = ctx.instantiate::<WriteCompleteGate>(&NoParams).unwrap();
        let dr = ctx.instantiate::<DataReadyGate>(&NoParams).unwrap();
        let a = wc.port("done").unwrap().largest_rect();
        let b = dr.port("done").unwrap().largest_rect();
        assert_eq!(a, b);
        assert_eq!(a.width(), wc.width());
    }

    #[test]
    fn test_sense_amp_outputs_on_distinct_tracks() {
        let mut ctx = SramCtx::default();
        let sa = ctx.instantiate::<SenseAmp>(&NoParams).unwrap();
        let dout = sa.port("dout").unwrap().largest_rect();
        let dout_b = sa.port("dout_b").unwrap().largest_rect();
        assert!(!dout.intersects(&dout_b));
    }
}
