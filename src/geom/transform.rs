//! Orientations and affine transformations.
//!
//! Child geometry is never mutated when it is placed; a [`Transformation`]
//! is computed from an instance's orientation and offset and applied at
//! query time.

use serde::{Deserialize, Serialize};

use super::Point;

/// A counter-clockwise rotation by a multiple of 90 degrees.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn degrees(&self) -> i64 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }

    /// Builds a rotation from an angle in degrees.
    ///
    /// Returns [`None`] unless the angle is a multiple of 90.
    pub fn from_degrees(angle: i64) -> Option<Self> {
        match angle.rem_euclid(360) {
            0 => Some(Self::R0),
            90 => Some(Self::R90),
            180 => Some(Self::R180),
            270 => Some(Self::R270),
            _ => None,
        }
    }

    fn add(self, other: Self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + other.quarter_turns())
    }

    fn sub(self, other: Self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() - other.quarter_turns())
    }

    fn quarter_turns(&self) -> i64 {
        self.degrees() / 90
    }

    fn from_quarter_turns(n: i64) -> Self {
        match n.rem_euclid(4) {
            0 => Self::R0,
            1 => Self::R90,
            2 => Self::R180,
            _ => Self::R270,
        }
    }
}

/// The mirror component of an instance placement.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Mirror {
    /// No mirroring.
    #[default]
    R0,
    /// Mirror about the x-axis.
    MX,
    /// Mirror about the y-axis.
    MY,
    /// Mirror about both axes.
    XY,
}

/// Commonly used orientations.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum NamedOrientation {
    #[default]
    R0,
    R90,
    R180,
    R270,
    /// Reflect about the x-axis.
    ReflectVert,
    /// Reflect about the y-axis.
    ReflectHoriz,
    /// Reflect across the line `y = x`.
    FlipYx,
    /// Reflect across the line `y = -x`.
    FlipMinusYx,
}

/// Reflection about the x-axis followed by a counter-clockwise rotation.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Orientation {
    reflect_vert: bool,
    rotation: Rotation,
}

impl From<NamedOrientation> for Orientation {
    fn from(value: NamedOrientation) -> Self {
        use NamedOrientation::*;
        let (reflect_vert, rotation) = match value {
            R0 => (false, Rotation::R0),
            R90 => (false, Rotation::R90),
            R180 => (false, Rotation::R180),
            R270 => (false, Rotation::R270),
            ReflectVert => (true, Rotation::R0),
            FlipYx => (true, Rotation::R90),
            ReflectHoriz => (true, Rotation::R180),
            FlipMinusYx => (true, Rotation::R270),
        };
        Self {
            reflect_vert,
            rotation,
        }
    }
}

impl From<Mirror> for Orientation {
    fn from(value: Mirror) -> Self {
        match value {
            Mirror::R0 => NamedOrientation::R0.into(),
            Mirror::MX => NamedOrientation::ReflectVert.into(),
            Mirror::MY => NamedOrientation::ReflectHoriz.into(),
            Mirror::XY => NamedOrientation::R180.into(),
        }
    }
}

impl Orientation {
    /// An orientation built the way instance placements are described:
    /// mirror first, then rotate counter-clockwise.
    pub fn new(mirror: Mirror, rotate: Rotation) -> Self {
        Orientation::from(mirror).apply(Orientation {
            reflect_vert: false,
            rotation: rotate,
        })
    }

    pub fn identity() -> Self {
        Self::default()
    }

    /// Applies `o` after this orientation.
    pub fn apply(mut self, o: impl Into<Orientation>) -> Self {
        let o = o.into();
        match (self.reflect_vert, o.reflect_vert) {
            (false, false) | (true, false) => {
                self.rotation = self.rotation.add(o.rotation);
            }
            (false, true) => {
                self.reflect_vert = true;
                self.rotation = o.rotation.sub(self.rotation);
            }
            (true, true) => {
                self.reflect_vert = false;
                self.rotation = o.rotation.sub(self.rotation);
            }
        }
        self
    }

    pub fn reflected_vert(self) -> Self {
        self.apply(NamedOrientation::ReflectVert)
    }

    pub fn reflected_horiz(self) -> Self {
        self.apply(NamedOrientation::ReflectHoriz)
    }

    #[inline]
    pub fn reflect_vert(&self) -> bool {
        self.reflect_vert
    }

    #[inline]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// The 2x2 integer matrix of this orientation.
    pub fn matrix(&self) -> [[i64; 2]; 2] {
        let rot = match self.rotation {
            Rotation::R0 => [[1, 0], [0, 1]],
            Rotation::R90 => [[0, -1], [1, 0]],
            Rotation::R180 => [[-1, 0], [0, -1]],
            Rotation::R270 => [[0, 1], [-1, 0]],
        };
        if self.reflect_vert {
            mat_mul(rot, [[1, 0], [0, -1]])
        } else {
            rot
        }
    }
}

fn mat_mul(a: [[i64; 2]; 2], b: [[i64; 2]; 2]) -> [[i64; 2]; 2] {
    let mut out = [[0; 2]; 2];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = a[i][0] * b[0][j] + a[i][1] * b[1][j];
        }
    }
    out
}

/// An orientation matrix followed by a translation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Transformation {
    mat: [[i64; 2]; 2],
    b: Point,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transformation {
    pub fn identity() -> Self {
        Self {
            mat: [[1, 0], [0, 1]],
            b: Point::zero(),
        }
    }

    pub fn translate(p: Point) -> Self {
        Self {
            mat: [[1, 0], [0, 1]],
            b: p,
        }
    }

    /// Orients about the origin, then translates by `offset`.
    pub fn with_loc_and_orientation(offset: Point, o: Orientation) -> Self {
        Self {
            mat: o.matrix(),
            b: offset,
        }
    }

    /// The transformation equivalent to applying `child` first, then `parent`.
    pub fn cascade(parent: Transformation, child: Transformation) -> Self {
        let b = parent.apply(child.b);
        Self {
            mat: mat_mul(parent.mat, child.mat),
            b,
        }
    }

    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.mat[0][0] * p.x + self.mat[0][1] * p.y + self.b.x,
            self.mat[1][0] * p.x + self.mat[1][1] * p.y + self.b.y,
        )
    }

    #[inline]
    pub fn offset(&self) -> Point {
        self.b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;

    #[test]
    fn test_mirror_about_y() {
        let t = Transformation::with_loc_and_orientation(Point::new(10, 0), Mirror::MY.into());
        let r = Rect::from_sides(0, 0, 10, 4).transform(&t);
        assert_eq!(r, Rect::from_sides(0, 0, 10, 4));
        let pin = Rect::from_sides(1, 0, 3, 4).transform(&t);
        assert_eq!(pin, Rect::from_sides(7, 0, 9, 4));
    }

    #[test]
    fn test_mirror_about_x() {
        let t = Transformation::with_loc_and_orientation(Point::new(0, 8), Mirror::MX.into());
        let pin = Rect::from_sides(0, 0, 2, 1).transform(&t);
        assert_eq!(pin, Rect::from_sides(0, 7, 2, 8));
    }

    #[test]
    fn test_rotation_matrices() {
        let o = Orientation::new(Mirror::R0, Rotation::R90);
        assert_eq!(o.matrix(), [[0, -1], [1, 0]]);
        let p = Transformation::with_loc_and_orientation(Point::zero(), o).apply(Point::new(2, 1));
        assert_eq!(p, Point::new(-1, 2));
    }

    #[test]
    fn test_orientation_composition() {
        let o = Orientation::from(Mirror::MX).apply(Mirror::MY);
        assert_eq!(o, Orientation::from(NamedOrientation::R180));
        let o = Orientation::identity().reflected_horiz().reflected_horiz();
        assert_eq!(o, Orientation::identity());
    }

    #[test]
    fn test_cascade() {
        let parent = Transformation::with_loc_and_orientation(Point::new(100, 0), Mirror::MY.into());
        let child = Transformation::translate(Point::new(5, 5));
        let t = Transformation::cascade(parent, child);
        assert_eq!(t.apply(Point::new(1, 1)), Point::new(94, 6));
    }
}
