use arcstr::ArcStr;

use super::{boundary, mos, poly_gate, rail_pin, rail_rect};
use crate::component::{Component, NoParams};
use crate::context::ModuleCtx;
use crate::error::Result;
use crate::geom::Rect;
use crate::schematic::Direction;
use crate::tech::{Layer, Tech, M1};

/// A PMOS header switch connecting `vdd` to the virtual supply `vvdd`
/// while `sleep` is low.
///
/// Square so that a ring of them can turn corners; `vdd` runs along the
/// top edge and `vvdd` along the bottom.
pub struct SleepTx;

impl Component for SleepTx {
    type Params = NoParams;

    fn new(_params: &Self::Params, _tech: &Tech) -> Result<Self> {
        Ok(Self)
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("sleep_tx")
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let w = ctx.tech().column_width();
        let h = ctx.tech().row_height();
        boundary(ctx, w, h);
        ctx.add_rect(Layer::Nwell, Rect::from_sides(0, 0, w, h));
        let enc = ctx.tech().rule("implant_enclosure_active");
        let margin = ctx.tech().rule("active_to_active") / 2 + enc;
        let pdiff = Rect::from_sides(margin, h / 4, w - margin, h - h / 4);
        ctx.add_rect(Layer::Active, pdiff);
        ctx.add_rect(Layer::Pimplant, pdiff.expand(enc));
        for x in [w / 4, w / 2, w - w / 4] {
            poly_gate(ctx, x, h);
        }

        let vdd = rail_rect(ctx, w, h, true);
        let vvdd = rail_rect(ctx, w, h, false);
        ctx.add_pin("vdd", Direction::Power, M1, vdd)?;
        ctx.add_pin("vvdd", Direction::InOut, M1, vvdd)?;
        rail_pin(ctx, "sleep", Direction::Input, w, h / 2)?;

        ctx.set_raw_spice(mos("P0", "vvdd", "sleep", "vdd", "vdd", "p", 12_000));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SramCtx;

    #[test]
    fn test_sleep_tx_is_square() {
        let mut ctx = SramCtx::default();
        let tx = ctx.instantiate::<SleepTx>(&NoParams).unwrap();
        assert_eq!(tx.width(), tx.height());
        let ports: Vec<_> = tx.netlist().port_names().map(|p| p.as_str()).collect();
        assert_eq!(ports, ["vdd", "vvdd", "sleep"]);
    }
}
