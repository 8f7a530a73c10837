//! Completion detection.
//!
//! One completion gate per data column pulls a shared wired-AND `done`
//! rail low until that column has finished. A small output stage to the
//! left of the gates restores the rail to a full swing signal and,
//! optionally, gates it with `en`. The `vdd` and `gnd` pins are single
//! rails along the bottom and top edges spanning both parts.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::blocks::columns::{ColumnCellKind, TiledArray, TiledArrayParams};
use crate::blocks::wl_driver::WordlineDriverArray;
use crate::bus_bit;
use crate::cells::GateKind;
use crate::component::Component;
use crate::context::ModuleCtx;
use crate::error::Result;
use crate::geom::{Point, Rect, Side};
use crate::layout::row::GateRow;
use crate::layout::Shape;
use crate::schematic::Direction;
use crate::tech::{Layer, Tech, M1, M3};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CompletionKind {
    /// Watches the bitline pair after the column mux.
    WriteComplete,
    /// Watches the sense amplifier outputs.
    DataReady,
}

impl CompletionKind {
    fn cell(&self) -> ColumnCellKind {
        match self {
            Self::WriteComplete => ColumnCellKind::WriteComplete,
            Self::DataReady => ColumnCellKind::DataReady,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CompletionDetectorParams {
    pub kind: CompletionKind,
    pub word_size: usize,
    pub words_per_row: usize,
    /// Gate the output with an `en` input.
    pub en: bool,
}

pub struct CompletionDetector {
    params: CompletionDetectorParams,
}

impl CompletionDetector {
    /// The x offset of the first completion gate.
    ///
    /// Matches the width of a word line driver row plus a well gap, so
    /// that a detector lines up with the bitcell columns of a sub-bank.
    pub fn array_offset(tech: &Tech) -> i64 {
        WordlineDriverArray::row_width(tech) + tech.well_gap()
    }

    fn array_params(&self) -> TiledArrayParams {
        TiledArrayParams::new(self.params.kind.cell(), self.params.word_size)
            .with_words_per_row(self.params.words_per_row)
    }
}

impl Component for CompletionDetector {
    type Params = CompletionDetectorParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        let base = match self.params.kind {
            CompletionKind::WriteComplete => "write_complete_detector",
            CompletionKind::DataReady => "data_ready_detector",
        };
        let en = if self.params.en { "_en" } else { "" };
        arcstr::format!(
            "{base}_{}_p{}{en}",
            self.params.word_size,
            self.params.words_per_row
        )
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let tech = ctx.tech.clone();
        let x0 = Self::array_offset(&tech);
        let mut array = ctx.instantiate::<TiledArray>(&self.array_params())?;
        array.set_name("gates");
        array.set_loc(Point::new(x0, 0));
        for pin in ["a", "b"] {
            for i in 0..self.params.word_size {
                array.connect(bus_bit(pin, i), bus_bit(pin, i));
            }
        }
        array
            .connect("done", "done_raw")
            .connect("vdd", "vdd")
            .connect("gnd", "gnd");

        let mut row = GateRow::new();
        let first = if self.params.en {
            row.push_gate(ctx, GateKind::Nand2, "nand_en", &["done_raw", "en", "done_b"])?;
            row.expose_on("en", Direction::Input, Side::Bot);
            GateKind::Nand2
        } else {
            row.push_gate(ctx, GateKind::Inv, "inv_raw", &["done_raw", "done_b"])?;
            GateKind::Inv
        };
        row.push_gate(ctx, GateKind::Inv, "inv_out", &["done_b", "done"])?;
        row.expose_on("done", Direction::Output, Side::Bot);
        row.finish(ctx, Point::zero())?;

        // Bring the wired rail into the gap and over to the first gate.
        let rail = array.port("done")?.largest_rect();
        let xg = x0 - tech.well_gap() / 2;
        let yr = rail.center().y;
        ctx.add_rect(M1, Rect::from_sides(xg - tech.width(M1), rail.bottom(), x0, rail.top()));
        ctx.add_via_at(M1, M3, Point::new(xg, yr))?;
        let pad = Point::new(first.input_x(&tech, 0), tech.row_height() / 2);
        ctx.add_path(M3, tech.width(M3), &[Point::new(xg, yr), Point::new(xg, pad.y), pad])?;
        ctx.add_via_at(M3, M1, pad)?;

        for pin in ["a", "b"] {
            for i in 0..self.params.word_size {
                ctx.expose_pin(&array, &bus_bit(pin, i), bus_bit(pin, i))?;
            }
        }
        // Full-width rails along both edges. The gates are shorter than a
        // gate row, so their vdd rail is widened up to the top edge.
        let width = x0 + array.module().width();
        let (h, rw) = (tech.row_height(), tech.width(M1));
        let gate_vdd = array.port("vdd")?.largest_rect();
        ctx.add_rect(M1, Rect::from_sides(x0, gate_vdd.bottom(), width, h));
        ctx.add_port_shape("vdd", Shape::new(M1, Rect::from_sides(0, h - rw, width, h)))?;
        ctx.add_port_shape("gnd", Shape::new(M1, Rect::from_sides(0, 0, width, rw)))?;
        ctx.add_rect(Layer::Boundary, Rect::from_sides(0, 0, width, h));
        ctx.add_instance(array)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SramCtx;
    use crate::geom::BoundBox;

    #[test]
    fn test_data_ready_detector() {
        let mut ctx = SramCtx::default();
        let tech = ctx.tech().clone();
        let params = CompletionDetectorParams {
            kind: CompletionKind::DataReady,
            word_size: 8,
            words_per_row: 2,
            en: true,
        };
        let det = ctx.instantiate::<CompletionDetector>(&params).unwrap();
        assert_eq!(det.name().as_str(), "data_ready_detector_8_p2_en");
        assert!(det.has_port("en"));
        assert_eq!(det.port("done").unwrap().largest_rect().bottom(), 0);
        let a3 = det.port("a[3]").unwrap().largest_rect();
        assert_eq!(
            a3.center().x,
            CompletionDetector::array_offset(&tech) + 3 * 2 * tech.column_width() + tech.column_track(1)
        );
        let stats = crate::validate::validate(&det).unwrap();
        assert_eq!(stats.count("data_ready_gate"), 8);
        assert_eq!(crate::validate::outline(&det), Some(det.brect()));
        assert_eq!(stats.count("pnand2"), 1);
    }

    #[test]
    fn test_ungated_detector() {
        let mut ctx = SramCtx::default();
        let params = CompletionDetectorParams {
            kind: CompletionKind::WriteComplete,
            word_size: 4,
            words_per_row: 1,
            en: false,
        };
        let det = ctx.instantiate::<CompletionDetector>(&params).unwrap();
        assert!(!det.has_port("en"));
        let stats = crate::validate::validate(&det).unwrap();
        assert_eq!(stats.count("pinv"), 2);
        assert_eq!(stats.count("write_complete_gate"), 4);
        let outline = crate::validate::outline(&det).unwrap();
        assert_eq!(outline, det.brect());
        assert!(outline.width() > CompletionDetector::array_offset(ctx.tech()));
    }
}
