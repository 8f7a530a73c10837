use super::{Point, Rect};

/// An optional bounding rectangle that grows as shapes are added.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Bbox {
    rect: Option<Rect>,
}

impl Bbox {
    pub fn empty() -> Self {
        Self { rect: None }
    }

    pub fn new(rect: Rect) -> Self {
        Self { rect: Some(rect) }
    }

    pub fn is_empty(&self) -> bool {
        self.rect.is_none()
    }

    pub fn union(self, other: Bbox) -> Self {
        match (self.rect, other.rect) {
            (Some(a), Some(b)) => Self::new(a.union(b)),
            (Some(a), None) | (None, Some(a)) => Self::new(a),
            (None, None) => Self::empty(),
        }
    }

    pub fn add_rect(&mut self, rect: Rect) {
        *self = self.union(Self::new(rect));
    }

    pub fn add_point(&mut self, p: Point) {
        self.add_rect(Rect::new(p, p));
    }

    pub fn into_rect(self) -> Option<Rect> {
        self.rect
    }

    /// The bounding rectangle, or a degenerate rectangle at the origin if empty.
    pub fn rect(&self) -> Rect {
        self.rect.unwrap_or_default()
    }
}

impl From<Rect> for Bbox {
    fn from(value: Rect) -> Self {
        Self::new(value)
    }
}

/// Objects with a bounding box.
pub trait BoundBox {
    fn bbox(&self) -> Bbox;

    /// The bounding rectangle of the object.
    ///
    /// Empty objects report a degenerate rectangle at the origin.
    fn brect(&self) -> Rect {
        self.bbox().rect()
    }
}

impl BoundBox for Rect {
    fn bbox(&self) -> Bbox {
        Bbox::new(*self)
    }
}

impl BoundBox for Bbox {
    fn bbox(&self) -> Bbox {
        *self
    }
}
