//! Placement of a cell repeated along one axis.

use std::sync::Arc;

use crate::geom::{BoundBox, Dir, Mirror, Point, Rect};
use crate::module::{Instance, Module};

/// Places `n` copies of a module at a fixed pitch along `dir`.
///
/// With mirroring enabled, odd copies are reflected across the tiling axis
/// (`MY` for horizontal arrays, `MX` for vertical ones) so that neighbours
/// share their abutting edge. Each copy's bounding box starts exactly at
/// `i * pitch` from the origin regardless of orientation.
#[derive(Debug, Clone)]
pub struct ArrayTiler {
    module: Arc<Module>,
    n: usize,
    pitch: i64,
    dir: Dir,
    mirror: bool,
}

impl ArrayTiler {
    pub fn new(module: Arc<Module>, n: usize, pitch: i64, dir: Dir) -> Self {
        Self {
            module,
            n,
            pitch,
            dir,
            mirror: false,
        }
    }

    pub fn mirrored(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// The extent of the tiled array along `dir`.
    pub fn length(&self) -> i64 {
        if self.n == 0 {
            return 0;
        }
        let cell = self.module.brect().length(self.dir);
        (self.n as i64 - 1) * self.pitch + cell
    }

    /// The bounding box of the whole array when its origin is at `origin`.
    pub fn brect(&self, origin: Point) -> Rect {
        let cell = self.module.brect();
        match self.dir {
            Dir::Horiz => Rect::ll_wh(origin.x, origin.y, self.length(), cell.height()),
            Dir::Vert => Rect::ll_wh(origin.x, origin.y, cell.width(), self.length()),
        }
    }

    /// Copy `i`, unnamed and unconnected, placed relative to `origin`.
    pub fn instance(&self, i: usize, origin: Point) -> Instance {
        let cell = self.module.brect();
        let flip = self.mirror && i % 2 == 1;
        let offset = i as i64 * self.pitch;
        let mut inst = Instance::new(self.module.clone());
        let loc = match (self.dir, flip) {
            (Dir::Horiz, false) => Point::new(offset - cell.left(), -cell.bottom()),
            (Dir::Horiz, true) => {
                inst.set_orientation(Mirror::MY);
                Point::new(offset + cell.right(), -cell.bottom())
            }
            (Dir::Vert, false) => Point::new(-cell.left(), offset - cell.bottom()),
            (Dir::Vert, true) => {
                inst.set_orientation(Mirror::MX);
                Point::new(-cell.left(), offset + cell.top())
            }
        };
        inst.set_loc(origin + loc);
        inst
    }
}
