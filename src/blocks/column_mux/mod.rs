//! Column multiplexer array.
//!
//! One pass-gate pair per bitcell column. Columns are grouped by
//! `words_per_row`; within a group the outputs are strapped together on
//! metal3 and brought out on the group's first column. Select lines run as
//! metal3 rails in a band beneath the cells.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::bus_bit;
use crate::cells::ColumnMux;
use crate::component::{Component, NoParams};
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{Dir, Point, Rect, Span};
use crate::layout::tiler::ArrayTiler;
use crate::schematic::Direction;
use crate::tech::{Layer, Tech, M2, M3};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ColumnMuxArrayParams {
    /// Total bitcell columns.
    pub columns: usize,
    /// Columns per output; 2 or 4.
    pub words_per_row: usize,
}

impl ColumnMuxArrayParams {
    pub fn groups(&self) -> usize {
        self.columns / self.words_per_row
    }

    /// Height of the select rail band.
    pub fn band_height(&self, tech: &Tech) -> i64 {
        self.words_per_row as i64 * tech.pitch(M3)
    }
}

pub struct ColumnMuxArray {
    params: ColumnMuxArrayParams,
}

impl Component for ColumnMuxArray {
    type Params = ColumnMuxArrayParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        if ![2, 4].contains(&params.words_per_row) {
            return Err(Error::config(
                "column_mux_array",
                format!("fan-in must be 2 or 4, got {}", params.words_per_row),
            ));
        }
        if params.columns == 0 || params.columns % params.words_per_row != 0 {
            return Err(Error::config(
                "column_mux_array",
                format!(
                    "{} columns do not divide into groups of {}",
                    params.columns, params.words_per_row
                ),
            ));
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!(
            "column_mux_array_{}x{}",
            self.params.columns,
            self.params.words_per_row
        )
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let tech = ctx.tech.clone();
        let ColumnMuxArrayParams {
            columns,
            words_per_row: wpr,
        } = self.params;
        let cw = tech.column_width();
        let cell = ctx.instantiate::<ColumnMux>(&NoParams)?;
        let band = self.params.band_height(&tech);
        let width = columns as i64 * cw;
        let height = band + cell.module().height();
        ctx.add_rect(Layer::Boundary, Rect::from_sides(0, 0, width, height));

        let tiler = ArrayTiler::new(cell.module().clone(), columns, cw, Dir::Horiz).mirrored(true);
        let mut insts = Vec::with_capacity(columns);
        for i in 0..columns {
            let g = i / wpr;
            let mut inst = tiler.instance(i, Point::new(0, band)).named(format!("mux_{i}"));
            inst.connect("bl", bus_bit("bl", i))
                .connect("br", bus_bit("br", i))
                .connect("bl_out", bus_bit("bl_out", g))
                .connect("br_out", bus_bit("br_out", g))
                .connect("sel", bus_bit("sel", i % wpr))
                .connect("gnd", "gnd");
            insts.push(inst);
        }

        let rail_y = |j: usize| tech.pitch(M3) / 2 + j as i64 * tech.pitch(M3);
        for j in 0..wpr {
            let rail = Rect::from_spans(
                Span::new(0, width),
                Span::from_center_span(rail_y(j), tech.width(M3)),
            );
            ctx.add_pin(bus_bit("sel", j), Direction::Input, M3, rail)?;
        }

        for (i, inst) in insts.iter().enumerate() {
            let sel = inst.port("sel")?.largest_rect();
            let x = sel.center().x;
            let y = rail_y(i % wpr);
            ctx.add_straight(M2, Point::new(x, y), Point::new(x, sel.center().y))?;
            ctx.add_via_at(M2, M3, Point::new(x, y))?;
        }

        let strap_y = [band + tech.pitch(M3) / 2, band + 3 * tech.pitch(M3) / 2];
        for g in 0..self.params.groups() {
            let group = &insts[g * wpr..(g + 1) * wpr];
            for (k, port) in ["bl_out", "br_out"].into_iter().enumerate() {
                let y = strap_y[k];
                let xs: Vec<i64> = group
                    .iter()
                    .map(|inst| inst.port(port).map(|p| p.largest_rect().center().x))
                    .collect::<Result<_>>()?;
                let lo = xs.iter().copied().min().unwrap_or_default();
                let hi = xs.iter().copied().max().unwrap_or_default();
                ctx.add_straight(M3, Point::new(lo, y), Point::new(hi, y))?;
                for x in xs {
                    ctx.add_via_at(M2, M3, Point::new(x, y))?;
                }

                let out = group[0].port(port)?.largest_rect();
                let pin = Rect::from_sides(out.left(), 0, out.right(), out.top());
                ctx.add_pin(bus_bit(port, g), Direction::InOut, M2, pin)?;
            }
        }

        for (i, inst) in insts.iter().enumerate() {
            ctx.expose_pin(inst, "bl", bus_bit("bl", i))?;
            ctx.expose_pin(inst, "br", bus_bit("br", i))?;
        }
        let gnd = insts[0].port("gnd")?.largest();
        ctx.add_pin(
            "gnd",
            Direction::Ground,
            gnd.layer,
            Rect::from_sides(0, gnd.rect.bottom(), width, gnd.rect.top()),
        )?;

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
    fn test_column_mux_groups() {
        let mut ctx = SramCtx::default();
        let tech = ctx.tech().clone();
        let params = ColumnMuxArrayParams {
            columns: 8,
            words_per_row: 4,
        };
        let array = ctx.instantiate::<ColumnMuxArray>(&params).unwrap();
        assert_eq!(array.width(), 8 * tech.column_width());
        for g in 0..2 {
            let out = array.port(&bus_bit("bl_out", g)).unwrap().largest_rect();
            assert_eq!(out.bottom(), 0);
            assert_eq!(
                out.center().x,
                (4 * g) as i64 * tech.column_width() + tech.column_track(0)
            );
        }
        for j in 0..4 {
            assert!(array.has_port(&bus_bit("sel", j)));
        }
        let stats = crate::validate::validate(&array).unwrap();
        assert_eq!(stats.count("column_mux"), 8);
    }

    #[test]
    fn test_column_mux_fan_in() {
        let mut ctx = SramCtx::default();
        for wpr in [1, 3, 8] {
            let params = ColumnMuxArrayParams {
                columns: 8,
                words_per_row: wpr,
            };
            assert!(ctx.instantiate::<ColumnMuxArray>(&params).is_err());
        }
    }
}
