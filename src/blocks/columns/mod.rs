//! Column peripheral arrays.
//!
//! Each array is a single row of one column cell, one copy every
//! `words_per_row` bitcell columns. Control and supply rails are merged
//! into one rail spanning the whole array; every other pin is re-exported
//! per copy as `pin[i]`.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::bus_bit;
use crate::cells::{
    DataReadyGate, MergeCell, Precharge, SenseAmp, SplitCell, WriteCompleteGate, WriteDriver,
};
use crate::component::{Component, NoParams};
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{Dir, Point, Rect};
use crate::layout::tiler::ArrayTiler;
use crate::module::Instance;
use crate::tech::{Layer, Tech};

/// Pins shared by every copy in an array.
pub const SHARED_PINS: [&str; 5] = ["vdd", "gnd", "en", "sel", "done"];

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ColumnCellKind {
    Precharge,
    SenseAmp,
    WriteDriver { mask: bool },
    Split { mask: bool },
    Merge,
    WriteComplete,
    DataReady,
}

impl ColumnCellKind {
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::Precharge => "precharge",
            Self::SenseAmp => "sense_amp",
            Self::WriteDriver { mask: false } => "write_driver",
            Self::WriteDriver { mask: true } => "write_driver_mask",
            Self::Split { mask: false } => "split",
            Self::Split { mask: true } => "split_mask",
            Self::Merge => "merge",
            Self::WriteComplete => "write_complete",
            Self::DataReady => "data_ready",
        }
    }

    fn instantiate(&self, ctx: &mut ModuleCtx) -> Result<Instance> {
        match *self {
            Self::Precharge => ctx.instantiate::<Precharge>(&NoParams),
            Self::SenseAmp => ctx.instantiate::<SenseAmp>(&NoParams),
            Self::WriteDriver { mask } => ctx.instantiate::<WriteDriver>(&mask),
            Self::Split { mask } => ctx.instantiate::<SplitCell>(&mask),
            Self::Merge => ctx.instantiate::<MergeCell>(&NoParams),
            Self::WriteComplete => ctx.instantiate::<WriteCompleteGate>(&NoParams),
            Self::DataReady => ctx.instantiate::<DataReadyGate>(&NoParams),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TiledArrayParams {
    pub cell: ColumnCellKind,
    pub columns: usize,
    pub words_per_row: usize,
}

impl TiledArrayParams {
    pub fn new(cell: ColumnCellKind, columns: usize) -> Self {
        Self {
            cell,
            columns,
            words_per_row: 1,
        }
    }

    pub fn with_words_per_row(mut self, words_per_row: usize) -> Self {
        self.words_per_row = words_per_row;
        self
    }

    /// The distance between copies.
    pub fn pitch(&self, tech: &Tech) -> i64 {
        self.words_per_row as i64 * tech.column_width()
    }

    pub fn width(&self, tech: &Tech) -> i64 {
        self.columns as i64 * self.pitch(tech)
    }
}

/// A row of column cells.
pub struct TiledArray {
    params: TiledArrayParams,
}

impl Component for TiledArray {
    type Params = TiledArrayParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        if params.columns == 0 {
            return Err(Error::config(
                "tiled_array",
                format!("{} array needs at least one column", params.cell.base_name()),
            ));
        }
        if ![1, 2, 4].contains(&params.words_per_row) {
            return Err(Error::config(
                "tiled_array",
                format!("words per row must be 1, 2 or 4, got {}", params.words_per_row),
            ));
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        let TiledArrayParams {
            cell,
            columns,
            words_per_row,
        } = self.params;
        if words_per_row > 1 {
            arcstr::format!("{}_array_{columns}_p{words_per_row}", cell.base_name())
        } else {
            arcstr::format!("{}_array_{columns}", cell.base_name())
        }
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let tech = ctx.tech.clone();
        let n = self.params.columns;
        let cell = self.params.cell.instantiate(ctx)?;
        let module = cell.module().clone();
        let tiler = ArrayTiler::new(module.clone(), n, self.params.pitch(&tech), Dir::Horiz)
            .mirrored(self.params.words_per_row == 1);
        let width = self.params.width(&tech);
        ctx.add_rect(Layer::Boundary, Rect::from_sides(0, 0, width, module.height()));

        let ports: Vec<ArcStr> = module.netlist().port_names().cloned().collect();
        let mut insts = Vec::with_capacity(n);
        for i in 0..n {
            let mut inst = tiler
                .instance(i, Point::zero())
                .named(format!("{}_{i}", self.params.cell.base_name()));
            for port in ports.iter() {
                if SHARED_PINS.contains(&port.as_str()) {
                    inst.connect(port.clone(), port.clone());
                } else {
                    inst.connect(port.clone(), bus_bit(port, i));
                }
            }
            insts.push(inst);
        }

        for port in ports.iter() {
            if SHARED_PINS.contains(&port.as_str()) {
                let shape = insts[0].port(port)?.largest();
                let rail = Rect::from_sides(0, shape.rect.bottom(), width, shape.rect.top());
                let dir = module.port_direction(port)?;
                ctx.add_pin(port.clone(), dir, shape.layer, rail)?;
            } else {
                for (i, inst) in insts.iter().enumerate() {
                    ctx.expose_pin(inst, port, bus_bit(port, i))?;
                }
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
    use crate::tech::M2;

    #[test]
    fn test_split_array_with_mask() {
        let mut ctx = SramCtx::default();
        let params = TiledArrayParams::new(ColumnCellKind::Split { mask: true }, 8);
        let array = ctx.instantiate::<TiledArray>(&params).unwrap();
        assert_eq!(array.name().as_str(), "split_mask_array_8");

        let netlist = array.netlist();
        let count = |prefix: &str| {
            netlist
                .port_names()
                .filter(|p| p.starts_with(&format!("{prefix}[")))
                .count()
        };
        assert_eq!(count("D"), 8);
        assert_eq!(count("Q"), 8);
        assert_eq!(count("BM"), 8);
        assert_eq!(count("BMQ"), 8);
        assert!(array.has_port("sel"));

        let split = ctx.instantiate::<SplitCell>(&true).unwrap();
        assert_eq!(array.width(), 8 * split.width());
        assert_eq!(array.height(), split.height());
        crate::validate::validate(&array).unwrap();
    }

    #[test]
    fn test_odd_columns_are_mirrored() {
        let mut ctx = SramCtx::default();
        let tech = ctx.tech().clone();
        let params = TiledArrayParams::new(ColumnCellKind::Precharge, 4);
        let array = ctx.instantiate::<TiledArray>(&params).unwrap();
        let cw = tech.column_width();
        for i in 0..4 {
            let bl = array.port(&bus_bit("bl", i)).unwrap().largest();
            assert_eq!(bl.layer, M2);
            let local = bl.rect.center().x - i as i64 * cw;
            let expected = if i % 2 == 0 {
                tech.column_track(0)
            } else {
                cw - tech.column_track(0)
            };
            assert_eq!(local, expected);
        }
        let en = array.port("en").unwrap().largest_rect();
        assert_eq!(en.width(), 4 * cw);
    }

    #[test]
    fn test_sense_amps_follow_words_per_row() {
        let mut ctx = SramCtx::default();
        let tech = ctx.tech().clone();
        let params = TiledArrayParams::new(ColumnCellKind::SenseAmp, 4).with_words_per_row(2);
        let array = ctx.instantiate::<TiledArray>(&params).unwrap();
        assert_eq!(array.name().as_str(), "sense_amp_array_4_p2");
        assert_eq!(array.width(), 8 * tech.column_width());
        let dout = array.port("dout[1]").unwrap().largest_rect();
        assert_eq!(dout.center().x, 2 * tech.column_width() + tech.column_track(1));
    }

    #[test]
    fn test_rejects_bad_words_per_row() {
        let mut ctx = SramCtx::default();
        let params = TiledArrayParams::new(ColumnCellKind::Merge, 4).with_words_per_row(3);
        assert!(ctx.instantiate::<TiledArray>(&params).is_err());
    }
}
