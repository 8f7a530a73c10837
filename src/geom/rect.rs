use serde::{Deserialize, Serialize};

use super::{snap, Corner, Dir, Point, Side, Transformation};

/// A closed interval of coordinates in one dimension.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Span {
    start: i64,
    stop: i64,
}

impl Span {
    /// Creates a span, swapping the endpoints if necessary.
    pub fn new(a: i64, b: i64) -> Self {
        if a <= b {
            Self { start: a, stop: b }
        } else {
            Self { start: b, stop: a }
        }
    }

    /// A span of width `width` centered at `center`.
    pub fn from_center_span(center: i64, width: i64) -> Self {
        assert!(width >= 0, "span width must be non-negative");
        Self::new(center - width / 2, center - width / 2 + width)
    }

    pub fn with_start_and_length(start: i64, length: i64) -> Self {
        Self::new(start, start + length)
    }

    pub fn with_stop_and_length(stop: i64, length: i64) -> Self {
        Self::new(stop - length, stop)
    }

    #[inline]
    pub fn start(&self) -> i64 {
        self.start
    }

    #[inline]
    pub fn stop(&self) -> i64 {
        self.stop
    }

    #[inline]
    pub fn length(&self) -> i64 {
        self.stop - self.start
    }

    #[inline]
    pub fn center(&self) -> i64 {
        (self.start + self.stop) / 2
    }

    pub fn union(self, other: Self) -> Self {
        Self::new(self.start.min(other.start), self.stop.max(other.stop))
    }

    pub fn add_point(self, x: i64) -> Self {
        Self::new(self.start.min(x), self.stop.max(x))
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.start <= other.stop && other.start <= self.stop
    }

    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.stop <= self.stop
    }

    pub fn expand(self, amount: i64) -> Self {
        Self::new(self.start - amount, self.stop + amount)
    }

    pub fn translate(self, amount: i64) -> Self {
        Self::new(self.start + amount, self.stop + amount)
    }
}

/// An axis-aligned rectangle.
///
/// `p0` is always the lower-left corner and `p1` the upper-right corner.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Rect {
    p0: Point,
    p1: Point,
}

impl Rect {
    /// Creates a rectangle from any two opposite corners.
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            p0: Point::new(a.x.min(b.x), a.y.min(b.y)),
            p1: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_sides(left: i64, bot: i64, right: i64, top: i64) -> Self {
        Self::new(Point::new(left, bot), Point::new(right, top))
    }

    pub fn from_spans(hspan: Span, vspan: Span) -> Self {
        Self::from_sides(hspan.start(), vspan.start(), hspan.stop(), vspan.stop())
    }

    /// A rectangle whose span along `dir` is `parallel` and whose other span is `perp`.
    pub fn from_dir_spans(dir: Dir, parallel: Span, perp: Span) -> Self {
        match dir {
            Dir::Horiz => Self::from_spans(parallel, perp),
            Dir::Vert => Self::from_spans(perp, parallel),
        }
    }

    /// A `w` by `h` rectangle whose lower-left corner is at `(x, y)`.
    pub fn ll_wh(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self::from_sides(x, y, x + w, y + h)
    }

    /// A `w` by `h` rectangle centered at `c`.
    pub fn centered(c: Point, w: i64, h: i64) -> Self {
        Self::from_spans(Span::from_center_span(c.x, w), Span::from_center_span(c.y, h))
    }

    #[inline]
    pub fn left(&self) -> i64 {
        self.p0.x
    }
    #[inline]
    pub fn right(&self) -> i64 {
        self.p1.x
    }
    #[inline]
    pub fn bottom(&self) -> i64 {
        self.p0.y
    }
    #[inline]
    pub fn top(&self) -> i64 {
        self.p1.y
    }
    #[inline]
    pub fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }
    #[inline]
    pub fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }
    #[inline]
    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    pub fn hspan(&self) -> Span {
        Span::new(self.p0.x, self.p1.x)
    }

    pub fn vspan(&self) -> Span {
        Span::new(self.p0.y, self.p1.y)
    }

    pub fn span(&self, dir: Dir) -> Span {
        match dir {
            Dir::Horiz => self.hspan(),
            Dir::Vert => self.vspan(),
        }
    }

    pub fn length(&self, dir: Dir) -> i64 {
        self.span(dir).length()
    }

    pub fn with_hspan(self, hspan: Span) -> Self {
        Self::from_spans(hspan, self.vspan())
    }

    pub fn with_vspan(self, vspan: Span) -> Self {
        Self::from_spans(self.hspan(), vspan)
    }

    pub fn with_span(self, span: Span, dir: Dir) -> Self {
        match dir {
            Dir::Horiz => self.with_hspan(span),
            Dir::Vert => self.with_vspan(span),
        }
    }

    /// The direction along which this rectangle is longer.
    ///
    /// Square rectangles report [`Dir::Vert`].
    pub fn longer_dir(&self) -> Dir {
        if self.width() > self.height() {
            Dir::Horiz
        } else {
            Dir::Vert
        }
    }

    pub fn ll(&self) -> Point {
        self.p0
    }
    pub fn ur(&self) -> Point {
        self.p1
    }
    pub fn lr(&self) -> Point {
        Point::new(self.p1.x, self.p0.y)
    }
    pub fn ul(&self) -> Point {
        Point::new(self.p0.x, self.p1.y)
    }
    pub fn center(&self) -> Point {
        Point::new(self.hspan().center(), self.vspan().center())
    }
    /// Center of the left edge.
    pub fn lc(&self) -> Point {
        Point::new(self.p0.x, self.vspan().center())
    }
    /// Center of the right edge.
    pub fn rc(&self) -> Point {
        Point::new(self.p1.x, self.vspan().center())
    }
    /// Center of the top edge.
    pub fn uc(&self) -> Point {
        Point::new(self.hspan().center(), self.p1.y)
    }
    /// Center of the bottom edge.
    pub fn bc(&self) -> Point {
        Point::new(self.hspan().center(), self.p0.y)
    }

    pub fn corner(&self, corner: Corner) -> Point {
        match corner {
            Corner::LowerLeft => self.ll(),
            Corner::LowerRight => self.lr(),
            Corner::UpperLeft => self.ul(),
            Corner::UpperRight => self.ur(),
        }
    }

    pub fn side(&self, side: Side) -> i64 {
        match side {
            Side::Left => self.left(),
            Side::Right => self.right(),
            Side::Top => self.top(),
            Side::Bot => self.bottom(),
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self::from_sides(
            self.left().min(other.left()),
            self.bottom().min(other.bottom()),
            self.right().max(other.right()),
            self.top().max(other.top()),
        )
    }

    pub fn union_all(rects: impl IntoIterator<Item = Rect>) -> Option<Self> {
        rects.into_iter().reduce(Rect::union)
    }

    pub fn intersection(self, other: Self) -> Option<Self> {
        let l = self.left().max(other.left());
        let b = self.bottom().max(other.bottom());
        let r = self.right().min(other.right());
        let t = self.top().min(other.top());
        if l > r || b > t {
            None
        } else {
            Some(Self::from_sides(l, b, r, t))
        }
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.hspan().intersects(&other.hspan()) && self.vspan().intersects(&other.vspan())
    }

    /// Returns true if `other` lies inside this rectangle or on its boundary.
    pub fn contains(&self, other: &Self) -> bool {
        self.hspan().contains(&other.hspan()) && self.vspan().contains(&other.vspan())
    }

    pub fn contains_point(&self, p: Point) -> bool {
        self.left() <= p.x && p.x <= self.right() && self.bottom() <= p.y && p.y <= self.top()
    }

    pub fn expand(self, amount: i64) -> Self {
        Self::from_sides(
            self.left() - amount,
            self.bottom() - amount,
            self.right() + amount,
            self.top() + amount,
        )
    }

    pub fn expand_dir(self, dir: Dir, amount: i64) -> Self {
        self.with_span(self.span(dir).expand(amount), dir)
    }

    pub fn expand_side(self, side: Side, amount: i64) -> Self {
        match side {
            Side::Left => Self::from_sides(self.left() - amount, self.bottom(), self.right(), self.top()),
            Side::Right => Self::from_sides(self.left(), self.bottom(), self.right() + amount, self.top()),
            Side::Bot => Self::from_sides(self.left(), self.bottom() - amount, self.right(), self.top()),
            Side::Top => Self::from_sides(self.left(), self.bottom(), self.right(), self.top() + amount),
        }
    }

    pub fn translate(self, p: Point) -> Self {
        Self {
            p0: self.p0 + p,
            p1: self.p1 + p,
        }
    }

    /// Applies `t` to both corners and renormalizes.
    pub fn transform(self, t: &Transformation) -> Self {
        Self::new(t.apply(self.p0), t.apply(self.p1))
    }

    pub fn snap_to_grid(self, grid: i64) -> Self {
        Self::from_sides(
            snap(self.left(), grid),
            snap(self.bottom(), grid),
            snap(self.right(), grid),
            snap(self.top(), grid),
        )
    }

    /// Returns true if the rectangle has non-zero width and height.
    pub fn is_valid(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_normalizes_corners() {
        let r = Rect::new(Point::new(10, 40), Point::new(-5, 2));
        assert_eq!(r.ll(), Point::new(-5, 2));
        assert_eq!(r.ur(), Point::new(10, 40));
        assert_eq!(r.width(), 15);
        assert_eq!(r.height(), 38);
    }

    #[test]
    fn test_rect_edge_queries() {
        let r = Rect::from_sides(0, 0, 100, 40);
        assert_eq!(r.lc(), Point::new(0, 20));
        assert_eq!(r.rc(), Point::new(100, 20));
        assert_eq!(r.uc(), Point::new(50, 40));
        assert_eq!(r.bc(), Point::new(50, 0));
        assert_eq!(r.longer_dir(), Dir::Horiz);
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::from_sides(0, 0, 10, 10);
        let b = Rect::from_sides(5, 5, 20, 20);
        assert_eq!(a.intersection(b), Some(Rect::from_sides(5, 5, 10, 10)));
        assert_eq!(a.intersection(Rect::from_sides(11, 0, 12, 1)), None);
        assert!(a.union(b).contains(&a));
    }
}
