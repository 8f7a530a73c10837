//! Point-to-point wiring between pins.
//!
//! Odd metals run horizontally and even metals vertically. A route between
//! two pins uses as few bends as their relative placement allows and
//! inserts via stacks wherever the wire changes layer.

use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{Dir, Point, Rect, Span};
use crate::layout::Shape;
use crate::tech::{Layer, M2, M3, M4};

/// The preferred direction of a routing metal.
pub fn preferred_dir(layer: Layer) -> Dir {
    match layer.level() {
        Some(n) if n % 2 == 0 => Dir::Vert,
        _ => Dir::Horiz,
    }
}

/// The pair of layers (horizontal, vertical) used to route between pins on
/// `a` and `b`.
pub fn routing_layers(a: Layer, b: Layer) -> (Layer, Layer) {
    if a == M4 || b == M4 {
        (M3, M4)
    } else {
        (M3, M2)
    }
}

/// Clamps `x` so a wire of width `w` centered on it stays inside `span`.
fn clamp_into(x: i64, span: Span, w: i64) -> i64 {
    let lo = span.start() + w / 2;
    let hi = span.stop() - w / 2;
    if lo > hi {
        span.center()
    } else {
        x.clamp(lo, hi)
    }
}

impl ModuleCtx<'_> {
    /// Draws a Manhattan path of width `width` through `points`.
    ///
    /// Each segment is extended by half the width at both ends so that
    /// consecutive segments overlap at their corners.
    pub fn add_path(&mut self, layer: Layer, width: i64, points: &[Point]) -> Result<()> {
        for seg in points.windows(2) {
            let (a, b) = (seg[0], seg[1]);
            if a.x != b.x && a.y != b.y {
                return Err(Error::Routing(format!(
                    "segment {a:?} -> {b:?} on {layer} is not Manhattan"
                )));
            }
            let rect = Rect::new(a, b).expand(width / 2);
            self.add_rect(layer, rect);
        }
        Ok(())
    }

    /// Draws a wire through `points`, putting horizontal segments on `h`
    /// and vertical segments on `v`, with vias at every bend.
    pub fn add_wire(&mut self, h: Layer, v: Layer, points: &[Point]) -> Result<()> {
        let tech = self.tech.clone();
        let mut prev_layer: Option<Layer> = None;
        for seg in points.windows(2) {
            let (a, b) = (seg[0], seg[1]);
            let layer = if a.y == b.y { h } else { v };
            self.add_path(layer, tech.width(layer), seg)?;
            if let Some(prev) = prev_layer {
                if prev != layer {
                    self.add_via_at(prev, layer, a)?;
                }
            }
            prev_layer = Some(layer);
        }
        Ok(())
    }

    /// Draws a straight wire of minimum width on `layer` from `a` to `b`.
    pub fn add_straight(&mut self, layer: Layer, a: Point, b: Point) -> Result<()> {
        let w = self.tech.width(layer);
        self.add_path(layer, w, &[a, b])
    }

    /// Connects two pin shapes using the default routing layers.
    pub fn connect_pins(&mut self, a: Shape, b: Shape) -> Result<()> {
        let (h, v) = routing_layers(a.layer, b.layer);
        self.connect_pins_on(a, b, h, v)
    }

    /// Connects two pin shapes with a straight wire or a single bend.
    ///
    /// Pins whose spans overlap get a straight wire. Otherwise the route
    /// leaves `a` horizontally and enters `b` vertically.
    pub fn connect_pins_on(&mut self, a: Shape, b: Shape, h: Layer, v: Layer) -> Result<()> {
        let tech = self.tech.clone();
        let wh = tech.width(h);
        let wv = tech.width(v);
        let (ra, rb) = (a.rect, b.rect);

        if let Some(x) = overlap_center(ra.hspan(), rb.hspan(), wv) {
            let pa = Point::new(x, clamp_into(rb.center().y, ra.vspan(), wv));
            let pb = Point::new(x, clamp_into(pa.y, rb.vspan(), wv));
            let layer = if a.layer == b.layer && preferred_dir(a.layer) == Dir::Vert {
                a.layer
            } else {
                v
            };
            self.add_straight(layer, pa, pb)?;
            self.add_via_at(a.layer, layer, pa)?;
            self.add_via_at(b.layer, layer, pb)?;
            return Ok(());
        }

        if let Some(y) = overlap_center(ra.vspan(), rb.vspan(), wh) {
            let pa = Point::new(clamp_into(rb.center().x, ra.hspan(), wh), y);
            let pb = Point::new(clamp_into(pa.x, rb.hspan(), wh), y);
            let layer = if a.layer == b.layer && preferred_dir(a.layer) == Dir::Horiz {
                a.layer
            } else {
                h
            };
            self.add_straight(layer, pa, pb)?;
            self.add_via_at(a.layer, layer, pa)?;
            self.add_via_at(b.layer, layer, pb)?;
            return Ok(());
        }

        let pa = Point::new(
            clamp_into(rb.center().x, ra.hspan(), wh),
            clamp_into(rb.center().y, ra.vspan(), wh),
        );
        let pb = Point::new(
            clamp_into(pa.x, rb.hspan(), wv),
            clamp_into(pa.y, rb.vspan(), wv),
        );
        let corner = Point::new(pb.x, pa.y);
        self.add_straight(h, pa, corner)?;
        self.add_straight(v, corner, pb)?;
        self.add_via_at(h, v, corner)?;
        self.add_via_at(a.layer, h, pa)?;
        self.add_via_at(b.layer, v, pb)?;
        Ok(())
    }

    /// Connects `a` to `b` with a horizontal-vertical-horizontal route whose
    /// vertical jog runs at `x`.
    pub fn add_z_route(&mut self, a: Shape, b: Shape, x: i64, h: Layer, v: Layer) -> Result<()> {
        let pa = a.rect.center();
        let pb = b.rect.center();
        let p1 = Point::new(x, pa.y);
        let p2 = Point::new(x, pb.y);
        self.add_wire(h, v, &[pa, p1, p2, pb])?;
        self.add_via_at(a.layer, h, pa)?;
        self.add_via_at(b.layer, h, pb)?;
        Ok(())
    }
}

/// The center of the overlap of two spans, if it is at least `w` wide.
fn overlap_center(a: Span, b: Span, w: i64) -> Option<i64> {
    let lo = a.start().max(b.start());
    let hi = a.stop().min(b.stop());
    (hi - lo >= w).then(|| (lo + hi) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tech::M1;

    #[test]
    fn test_preferred_directions() {
        assert_eq!(preferred_dir(M1), Dir::Horiz);
        assert_eq!(preferred_dir(M2), Dir::Vert);
        assert_eq!(preferred_dir(M3), Dir::Horiz);
        assert_eq!(preferred_dir(M4), Dir::Vert);
        assert_eq!(routing_layers(M1, M2), (M3, M2));
        assert_eq!(routing_layers(M4, M1), (M3, M4));
    }

    #[test]
    fn test_overlap_center() {
        assert_eq!(overlap_center(Span::new(0, 1000), Span::new(400, 2000), 600), Some(700));
        assert_eq!(overlap_center(Span::new(0, 1000), Span::new(800, 2000), 600), None);
        assert_eq!(clamp_into(5000, Span::new(0, 1000), 600), 700);
        assert_eq!(clamp_into(5000, Span::new(0, 400), 600), 200);
    }
}
