//! Via arrays and stacks.

use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{Dir, Point, Rect, Span};
use crate::tech::{Layer, Tech};

/// The number of cuts that fit in `len` with cut size `size` and spacing `space`.
fn num_cuts(len: i64, size: i64, space: i64) -> i64 {
    ((len + space) / (size + space)).max(1)
}

/// Grows `rect` along its longer direction until it meets the minimum
/// area rule of `layer`.
pub fn min_area_patch(tech: &Tech, layer: Layer, rect: Rect) -> Rect {
    let min_area = tech.min_area(layer);
    if min_area == 0 || rect.area() >= min_area {
        return rect;
    }
    let dir = rect.longer_dir();
    let other = rect.length(dir.other()).max(1);
    let needed = tech.snap_up((min_area + other - 1) / other);
    let grow = tech.snap_up((needed - rect.length(dir) + 1) / 2);
    rect.expand_dir(dir, grow)
}

impl ModuleCtx<'_> {
    /// Tiles `cut` squares inside `region` and draws enclosing pads on
    /// `below` and `above`.
    ///
    /// At least one cut is always drawn, centered on `region`. Returns the
    /// bounding rectangle of the cuts.
    pub fn add_via_array(&mut self, cut: Layer, below: Layer, above: Layer, region: Rect) -> Rect {
        let tech = self.tech.clone();
        let size = tech.width(cut);
        let space = tech.space(cut);
        let nc = num_cuts(region.width(), size, space);
        let nr = num_cuts(region.height(), size, space);
        let w = nc * size + (nc - 1) * space;
        let h = nr * size + (nr - 1) * space;
        let c = region.center().snap_to_grid(tech.grid);
        let block = Rect::from_spans(
            Span::with_start_and_length(tech.snap(c.x - w / 2), w),
            Span::with_start_and_length(tech.snap(c.y - h / 2), h),
        );

        for i in 0..nr {
            for j in 0..nc {
                let cut_rect = Rect::ll_wh(
                    block.left() + (size + space) * j,
                    block.bottom() + (size + space) * i,
                    size,
                    size,
                );
                self.add_rect(cut, cut_rect);
            }
        }

        for metal in [below, above] {
            let pad = block.expand(tech.enclosure(metal, cut));
            let pad = if metal.is_routing() {
                min_area_patch(&tech, metal, pad)
            } else {
                pad
            };
            self.add_rect(metal, pad);
        }
        block
    }

    /// Draws a stack of vias connecting `from` to `to` within `region`.
    ///
    /// The layers may be given in either order. Intermediate metals receive
    /// landing pads. Returns the cut block of the last via drawn, or `region`
    /// if the layers are equal.
    pub fn add_via_stack(&mut self, from: Layer, to: Layer, region: Rect) -> Result<Rect> {
        let (Some(a), Some(b)) = (from.level(), to.level()) else {
            return Err(Error::NoVia(from, to));
        };
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let mut last = region;
        for level in lo..hi {
            let below = if level == 0 && (from == Layer::Active || to == Layer::Active) {
                Layer::Active
            } else {
                Layer::from_level(level)
            };
            last = self.add_via_array(
                Layer::cut_above(level),
                below,
                Layer::from_level(level + 1),
                region,
            );
        }
        Ok(last)
    }

    /// Draws a single-cut via stack centered at `p`.
    pub fn add_via_at(&mut self, from: Layer, to: Layer, p: Point) -> Result<Rect> {
        self.add_via_stack(from, to, Rect::centered(p, 1, 1))
    }

    /// Draws a via stack between two overlapping shapes, filling their
    /// overlap with as many cuts as fit.
    pub fn connect_overlap(&mut self, a: (Layer, Rect), b: (Layer, Rect)) -> Result<Rect> {
        let region = a.1.intersection(b.1).ok_or_else(|| {
            Error::Routing(format!("{} shape {:?} does not overlap {} shape {:?}", a.0, a.1, b.0, b.1))
        })?;
        let tech = self.tech.clone();
        let enc = [a.0, b.0]
            .into_iter()
            .filter_map(|l| l.level())
            .map(|l| tech.enclosure(Layer::from_level(l), Layer::cut_above(l.min(3))))
            .max()
            .unwrap_or_default();
        let shrunk = Rect::from_dir_spans(
            Dir::Horiz,
            shrink(region.hspan(), enc),
            shrink(region.vspan(), enc),
        );
        self.add_via_stack(a.0, b.0, shrunk)
    }
}

fn shrink(span: Span, amount: i64) -> Span {
    if span.length() > 2 * amount {
        Span::new(span.start() + amount, span.stop() - amount)
    } else {
        Span::from_center_span(span.center(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_area_patch_grows_small_pads() {
        let tech = Tech::scn4m_subm();
        let pad = Rect::centered(Point::zero(), 800, 800);
        let patched = min_area_patch(&tech, Layer::Metal(1), pad);
        assert!(patched.area() >= tech.min_area(Layer::Metal(1)));
        assert!(patched.contains(&pad));
        assert_eq!(patched.width(), 800);

        let big = Rect::centered(Point::zero(), 2000, 800);
        assert_eq!(min_area_patch(&tech, Layer::Metal(1), big), big);
    }

    #[test]
    fn test_num_cuts() {
        assert_eq!(num_cuts(400, 400, 600), 1);
        assert_eq!(num_cuts(1400, 400, 600), 2);
        assert_eq!(num_cuts(100, 400, 600), 1);
    }
}
