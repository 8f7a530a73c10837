//! Word line drivers.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::bus_bit;
use crate::cells::{Gate, GateKind};
use crate::component::Component;
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{Mirror, Point, Rect, Span};
use crate::layout::Shape;
use crate::schematic::Direction;
use crate::tech::{Layer, Tech, M1, M2};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct WordlineDriverArrayParams {
    pub rows: usize,
}

/// One `nand2` and inverter per row, gating each decoded row with `en`.
pub struct WordlineDriverArray {
    params: WordlineDriverArrayParams,
}

impl WordlineDriverArray {
    /// The width of one driver row.
    pub fn row_width(tech: &Tech) -> i64 {
        GateKind::Nand2.width(tech) + GateKind::Inv.width(tech)
    }
}

impl Component for WordlineDriverArray {
    type Params = WordlineDriverArrayParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        if params.rows == 0 {
            return Err(Error::config("wordline_driver_array", "need at least one row"));
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("wordline_driver_array_{}", self.params.rows)
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let tech = ctx.tech.clone();
        let rows = self.params.rows;
        let h = tech.row_height();
        let width = Self::row_width(&tech);
        let height = rows as i64 * h;
        let inv_x = GateKind::Nand2.width(&tech);
        ctx.add_rect(Layer::Boundary, Rect::from_sides(0, 0, width, height));

        let nand = ctx.instantiate::<Gate>(&GateKind::Nand2)?;
        let inv = ctx.instantiate::<Gate>(&GateKind::Inv)?;

        for r in 0..rows {
            ctx.declare_port(bus_bit("in", r), Direction::Input)?;
        }
        for r in 0..rows {
            ctx.declare_port(bus_bit("wl", r), Direction::Output)?;
        }
        let en_x = GateKind::Nand2.input_x(&tech, 1);
        let en = Rect::from_spans(Span::from_center_span(en_x, tech.width(M2)), Span::new(0, height));
        ctx.add_pin("en", Direction::Input, M2, en)?;
        ctx.declare_port("vdd", Direction::Power)?;
        ctx.declare_port("gnd", Direction::Ground)?;

        for r in 0..rows {
            let (mirror, y) = if r % 2 == 1 {
                (Mirror::MX, (r as i64 + 1) * h)
            } else {
                (Mirror::R0, r as i64 * h)
            };
            let wlb = format!("wlb_{r}");
            let mut n = nand.clone().named(format!("nand_{r}")).with_orientation(mirror);
            n.set_loc(Point::new(0, y));
            n.connect("a", bus_bit("in", r))
                .connect("b", "en")
                .connect("z", wlb.as_str())
                .connect("vdd", "vdd")
                .connect("gnd", "gnd");
            let mut i = inv.clone().named(format!("inv_{r}")).with_orientation(mirror);
            i.set_loc(Point::new(inv_x, y));
            i.connect("a", wlb.as_str())
                .connect("z", bus_bit("wl", r))
                .connect("vdd", "vdd")
                .connect("gnd", "gnd");

            let z = n.port("z")?.largest_rect();
            let a = i.port("a")?.largest_rect();
            let yc = a.center().y;
            ctx.add_straight(M1, Point::new(z.center().x, yc), a.center())?;
            ctx.add_via_at(M1, M2, Point::new(en_x, yc))?;

            let out = i.port("z")?.largest_rect();
            let wl = Rect::from_spans(
                Span::new(out.center().x, width),
                Span::from_center_span(yc, tech.width(M1)),
            );
            ctx.add_pin(bus_bit("wl", r), Direction::Output, M1, wl)?;
            ctx.expose_pin(&n, "a", bus_bit("in", r))?;

            for supply in ["vdd", "gnd"] {
                let rail = n.port(supply)?.largest_rect();
                let rail = Rect::from_sides(0, rail.bottom(), width, rail.top());
                ctx.add_port_shape(supply, Shape::new(M1, rail))?;
            }
            ctx.add_instance(n)?;
            ctx.add_instance(i)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SramCtx;

    #[test]
    fn test_wordline_drivers() {
        let mut ctx = SramCtx::default();
        let tech = ctx.tech().clone();
        let drivers = ctx
            .instantiate::<WordlineDriverArray>(&WordlineDriverArrayParams { rows: 8 })
            .unwrap();
        assert_eq!(drivers.width(), WordlineDriverArray::row_width(&tech));
        assert_eq!(drivers.height(), 8 * tech.row_height());
        for r in 0..8 {
            let wl = drivers.port(&bus_bit("wl", r)).unwrap().largest_rect();
            assert_eq!(wl.right(), drivers.width());
            assert_eq!(wl.center().y, r as i64 * tech.row_height() + tech.row_height() / 2);
        }
        let stats = crate::validate::validate(&drivers).unwrap();
        assert_eq!(stats.count("pnand2"), 8);
        assert_eq!(stats.count("pinv"), 8);
    }
}
