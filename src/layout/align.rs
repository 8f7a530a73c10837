//! Relative placement of instances.

use crate::geom::{BoundBox, Point, Rect};
use crate::module::Instance;

/// Ways of aligning one rectangle against another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlignMode {
    Left,
    Right,
    Bottom,
    Top,
    /// Align horizontal centers.
    CenterHorizontal,
    /// Align vertical centers.
    CenterVertical,
    /// Place the left side at the right side of the other rectangle.
    ToTheRight,
    /// Place the right side at the left side of the other rectangle.
    ToTheLeft,
    /// Place the top side at the bottom side of the other rectangle.
    Beneath,
    /// Place the bottom side at the top side of the other rectangle.
    Above,
}

/// Objects that can be moved relative to a rectangle.
pub trait AlignRect {
    fn align_brect(&self) -> Rect;

    fn translate_by(&mut self, p: Point);

    /// Aligns `self` against `orect`, then shifts by `offset` along the
    /// alignment axis.
    fn align(&mut self, mode: AlignMode, orect: Rect, offset: i64) {
        let srect = self.align_brect();
        let p = match mode {
            AlignMode::Left => Point::new(orect.left() - srect.left() + offset, 0),
            AlignMode::Right => Point::new(orect.right() - srect.right() + offset, 0),
            AlignMode::Bottom => Point::new(0, orect.bottom() - srect.bottom() + offset),
            AlignMode::Top => Point::new(0, orect.top() - srect.top() + offset),
            AlignMode::ToTheRight => Point::new(orect.right() - srect.left() + offset, 0),
            AlignMode::ToTheLeft => Point::new(orect.left() - srect.right() + offset, 0),
            AlignMode::CenterHorizontal => Point::new(
                ((orect.left() + orect.right()) - (srect.left() + srect.right())) / 2 + offset,
                0,
            ),
            AlignMode::CenterVertical => Point::new(
                0,
                ((orect.bottom() + orect.top()) - (srect.bottom() + srect.top())) / 2 + offset,
            ),
            AlignMode::Beneath => Point::new(0, orect.bottom() - srect.top() + offset),
            AlignMode::Above => Point::new(0, orect.top() - srect.bottom() + offset),
        };
        self.translate_by(p);
    }

    fn align_left(&mut self, orect: Rect) {
        self.align(AlignMode::Left, orect, 0);
    }

    fn align_right(&mut self, orect: Rect) {
        self.align(AlignMode::Right, orect, 0);
    }

    fn align_top(&mut self, orect: Rect) {
        self.align(AlignMode::Top, orect, 0);
    }

    fn align_bottom(&mut self, orect: Rect) {
        self.align(AlignMode::Bottom, orect, 0);
    }

    fn align_centers_horizontally(&mut self, orect: Rect) {
        self.align(AlignMode::CenterHorizontal, orect, 0);
    }

    fn align_centers_vertically(&mut self, orect: Rect) {
        self.align(AlignMode::CenterVertical, orect, 0);
    }

    fn align_to_the_left_of(&mut self, orect: Rect, space: i64) {
        self.align(AlignMode::ToTheLeft, orect, -space);
    }

    fn align_to_the_right_of(&mut self, orect: Rect, space: i64) {
        self.align(AlignMode::ToTheRight, orect, space);
    }

    fn align_beneath(&mut self, orect: Rect, space: i64) {
        self.align(AlignMode::Beneath, orect, -space);
    }

    fn align_above(&mut self, orect: Rect, space: i64) {
        self.align(AlignMode::Above, orect, space);
    }
}

impl AlignRect for Rect {
    fn align_brect(&self) -> Rect {
        *self
    }

    fn translate_by(&mut self, p: Point) {
        *self = self.translate(p);
    }
}

impl AlignRect for Instance {
    fn align_brect(&self) -> Rect {
        self.brect()
    }

    fn translate_by(&mut self, p: Point) {
        self.translate(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_beneath_and_left() {
        let anchor = Rect::from_sides(100, 100, 300, 200);
        let mut r = Rect::from_sides(0, 0, 50, 20);
        r.align_beneath(anchor, 10);
        r.align_left(anchor);
        assert_eq!(r, Rect::from_sides(100, 70, 150, 90));
        r.align_to_the_right_of(anchor, 5);
        assert_eq!(r.left(), 305);
    }
}
