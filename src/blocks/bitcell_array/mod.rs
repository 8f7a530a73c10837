use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::bus_bit;
use crate::cells::Bitcell;
use crate::component::{Component, NoParams};
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{Mirror, Point, Rect};
use crate::layout::Shape;
use crate::schematic::Direction;
use crate::tech::{Layer, Tech};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BitcellArrayParams {
    pub rows: usize,
    pub cols: usize,
}

/// A grid of bitcells.
///
/// Odd rows are mirrored about the x-axis and odd columns about the
/// y-axis, so neighbouring cells share supply rails and well edges.
pub struct BitcellArray {
    params: BitcellArrayParams,
}

impl Component for BitcellArray {
    type Params = BitcellArrayParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        if params.rows == 0 || params.cols == 0 {
            return Err(Error::config(
                "bitcell_array",
                format!("{} x {} array is empty", params.rows, params.cols),
            ));
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("bitcell_array_{}x{}", self.params.rows, self.params.cols)
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let BitcellArrayParams { rows, cols } = self.params;
        let cell = ctx.instantiate::<Bitcell>(&NoParams)?;
        let (w, h) = (cell.module().width(), cell.module().height());
        let (width, height) = (cols as i64 * w, rows as i64 * h);
        ctx.add_rect(Layer::Boundary, Rect::from_sides(0, 0, width, height));

        let mut insts = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let (mirror, loc) = match (r % 2 == 1, c % 2 == 1) {
                    (false, false) => (Mirror::R0, Point::new(c as i64 * w, r as i64 * h)),
                    (false, true) => (Mirror::MY, Point::new((c as i64 + 1) * w, r as i64 * h)),
                    (true, false) => (Mirror::MX, Point::new(c as i64 * w, (r as i64 + 1) * h)),
                    (true, true) => (
                        Mirror::XY,
                        Point::new((c as i64 + 1) * w, (r as i64 + 1) * h),
                    ),
                };
                let mut inst = cell.clone().named(format!("cell_{r}_{c}")).with_orientation(mirror);
                inst.set_loc(loc);
                inst.connect("bl", bus_bit("bl", c))
                    .connect("br", bus_bit("br", c))
                    .connect("wl", bus_bit("wl", r))
                    .connect("vdd", "vdd")
                    .connect("gnd", "gnd");
                insts.push(inst);
            }
        }

        // Bitlines run the full height of each column.
        for c in 0..cols {
            for port in ["bl", "br"] {
                let shape = insts[c].port(port)?.largest();
                let rect = Rect::from_sides(shape.rect.left(), 0, shape.rect.right(), height);
                ctx.add_pin(bus_bit(port, c), Direction::InOut, shape.layer, rect)?;
            }
        }

        for (r, first) in insts.iter().step_by(cols).enumerate() {
            let wl = first.port("wl")?.largest();
            let rail = Rect::from_sides(0, wl.rect.bottom(), width, wl.rect.top());
            ctx.add_pin(bus_bit("wl", r), Direction::Input, wl.layer, rail)?;
        }

        ctx.declare_port("vdd", Direction::Power)?;
        ctx.declare_port("gnd", Direction::Ground)?;
        // Mirrored rows share their rails with the row below or above;
        // every row still contributes its own shape.
        for first in insts.iter().step_by(cols) {
            for supply in ["vdd", "gnd"] {
                let s = first.port(supply)?.largest();
                let rail = Rect::from_sides(0, s.rect.bottom(), width, s.rect.top());
                ctx.add_port_shape(supply, Shape::new(s.layer, rail))?;
            }
        }

        for inst in insts {
            ctx.add_instance(inst)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SramCtx;

    #[test]
    fn test_bitcell_array_pins() {
        let mut ctx = SramCtx::default();
        let tech = ctx.tech().clone();
        let array = ctx
            .instantiate::<BitcellArray>(&BitcellArrayParams { rows: 4, cols: 2 })
            .unwrap();
        assert_eq!(array.name().as_str(), "bitcell_array_4x2");
        assert_eq!(array.width(), 2 * tech.column_width());
        assert_eq!(array.height(), 4 * tech.row_height());

        // Row 1 is mirrored, so its word line sits at the same offset from
        // the top of the row as row 0's does from the bottom.
        let wl0 = array.port("wl[0]").unwrap().largest_rect();
        let wl1 = array.port("wl[1]").unwrap().largest_rect();
        assert_eq!(wl0.center().y, tech.row_height() / 2);
        assert_eq!(wl1.center().y, tech.row_height() + tech.row_height() / 2);
        assert_eq!(array.port("vdd").unwrap().shapes().len(), 4);

        let mut expected = Vec::new();
        for c in 0..2 {
            expected.push(format!("bl[{c}]"));
            expected.push(format!("br[{c}]"));
        }
        expected.extend((0..4).map(|r| format!("wl[{r}]")));
        expected.extend(["vdd".to_string(), "gnd".to_string()]);
        let ports: Vec<&str> = array.netlist().port_names().map(|p| p.as_str()).collect();
        assert_eq!(ports, expected);

        let stats = crate::validate::validate(&array).unwrap();
        assert_eq!(stats.count("sram_cell_6t"), 8);
    }

    #[test]
    fn test_empty_array_is_rejected() {
        let mut ctx = SramCtx::default();
        let err = ctx
            .instantiate::<BitcellArray>(&BitcellArrayParams { rows: 0, cols: 2 })
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
