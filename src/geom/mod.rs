//! Integer layout geometry.
//!
//! All coordinates are in database units (1 nm in the built-in technology).

use serde::{Deserialize, Serialize};

pub mod bbox;
pub mod rect;
pub mod transform;

pub use bbox::{Bbox, BoundBox};
pub use rect::{Rect, Span};
pub use transform::{Mirror, NamedOrientation, Orientation, Rotation, Transformation};

/// A point in two-dimensional layout space.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    #[inline]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// The coordinate of this point along `dir`.
    #[inline]
    pub fn coord(&self, dir: Dir) -> i64 {
        match dir {
            Dir::Horiz => self.x,
            Dir::Vert => self.y,
        }
    }

    #[inline]
    pub fn translate(self, p: Point) -> Self {
        Self::new(self.x + p.x, self.y + p.y)
    }

    #[inline]
    pub fn transform(self, t: &Transformation) -> Self {
        t.apply(self)
    }

    pub fn snap_to_grid(self, grid: i64) -> Self {
        Self::new(snap(self.x, grid), snap(self.y, grid))
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Rounds `x` to the nearest multiple of `grid`.
pub fn snap(x: i64, grid: i64) -> i64 {
    if grid <= 1 {
        return x;
    }
    let rem = x.rem_euclid(grid);
    if 2 * rem >= grid {
        x - rem + grid
    } else {
        x - rem
    }
}

/// Rounds `x` up to the next multiple of `grid`.
pub fn snap_up(x: i64, grid: i64) -> i64 {
    if grid <= 1 {
        return x;
    }
    let rem = x.rem_euclid(grid);
    if rem == 0 {
        x
    } else {
        x - rem + grid
    }
}

/// A routing direction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Dir {
    Horiz,
    Vert,
}

impl Dir {
    #[inline]
    pub fn other(&self) -> Self {
        match self {
            Self::Horiz => Self::Vert,
            Self::Vert => Self::Horiz,
        }
    }
}

impl std::fmt::Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Horiz => write!(f, "h"),
            Self::Vert => write!(f, "v"),
        }
    }
}

/// One side of a rectangle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
    Top,
    Bot,
}

impl Side {
    /// The direction normal to this side.
    pub fn coord_dir(&self) -> Dir {
        match self {
            Self::Left | Self::Right => Dir::Horiz,
            Self::Top | Self::Bot => Dir::Vert,
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Top => Self::Bot,
            Self::Bot => Self::Top,
        }
    }
}

/// A corner of a rectangle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Corner {
    LowerLeft,
    LowerRight,
    UpperLeft,
    UpperRight,
}
