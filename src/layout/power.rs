//! Power straps.

use crate::context::ModuleCtx;
use crate::error::Result;
use crate::geom::{Rect, Span};
use crate::layout::Shape;
use crate::module::Instance;
use crate::tech::{Layer, Tech, M4};

/// The number of via columns a strap carries per unit of multiplier.
pub const MIN_STRAP_VIAS: usize = 2;

/// The width of a strap on `layer` wide enough for
/// `MIN_STRAP_VIAS * multiplier` side-by-side cuts from the layer below.
pub fn strap_width(tech: &Tech, layer: Layer, multiplier: usize) -> i64 {
    let level = layer.level().unwrap_or(1).max(1);
    let cut = Layer::cut_above(level - 1);
    let n = (MIN_STRAP_VIAS * multiplier.max(1)) as i64;
    let w = n * tech.width(cut) + (n - 1) * tech.space(cut) + 2 * tech.enclosure(layer, cut);
    tech.snap_up(w).max(tech.width(layer))
}

impl ModuleCtx<'_> {
    /// Draws a strap and drops via stacks onto every rail it crosses.
    ///
    /// Rails are given in this module's coordinates; rails that do not
    /// overlap the strap are skipped. Returns the number of taps drawn.
    pub fn add_strap(&mut self, layer: Layer, rect: Rect, rails: &[Shape]) -> Result<usize> {
        self.add_rect(layer, rect);
        let mut taps = 0;
        for rail in rails {
            if rail.layer == layer || rail.rect.intersection(rect).is_none() {
                continue;
            }
            self.connect_overlap((rail.layer, rail.rect), (layer, rect))?;
            taps += 1;
        }
        Ok(taps)
    }
}

/// The shapes of `inst`'s `supply` port on `layer`, in the parent's
/// coordinates.
pub fn supply_rails(inst: &Instance, supply: &str, layer: Layer) -> Result<Vec<Shape>> {
    Ok(inst
        .port(supply)?
        .shapes()
        .iter()
        .filter(|s| s.layer == layer)
        .copied()
        .collect())
}

/// A pair of vertical metal4 supply straps, `gnd` on the left and `vdd` on
/// the right, that collect the horizontal rails of the blocks beside them.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PowerLane {
    left: i64,
    strap: i64,
    space: i64,
}

impl PowerLane {
    pub fn new(tech: &Tech, left: i64, multiplier: usize) -> Self {
        Self {
            left,
            strap: strap_width(tech, M4, multiplier),
            space: tech.space(M4),
        }
    }

    pub fn left(&self) -> i64 {
        self.left
    }

    /// The first x coordinate free for other metal4 wires.
    pub fn right(&self) -> i64 {
        self.left + 2 * self.strap + 2 * self.space
    }

    pub fn width(&self) -> i64 {
        self.right() - self.left
    }

    pub fn gnd_span(&self) -> Span {
        Span::with_start_and_length(self.left, self.strap)
    }

    pub fn vdd_span(&self) -> Span {
        Span::with_start_and_length(self.left + self.strap + self.space, self.strap)
    }

    /// Draws both straps over `vspan`, extending every rail sideways on its
    /// own layer until it reaches its strap. Returns the `(vdd, gnd)` straps.
    pub fn draw(
        &self,
        ctx: &mut ModuleCtx,
        vspan: Span,
        vdd: &[Shape],
        gnd: &[Shape],
    ) -> Result<(Shape, Shape)> {
        let mut straps = Vec::with_capacity(2);
        for (span, rails) in [(self.vdd_span(), vdd), (self.gnd_span(), gnd)] {
            let strap = Rect::from_spans(span, vspan);
            let mut taps = Vec::with_capacity(rails.len());
            for rail in rails {
                let r = rail.rect;
                let ext = Rect::from_sides(
                    r.left().min(span.start()),
                    r.bottom(),
                    r.right().max(span.stop()),
                    r.top(),
                );
                ctx.add_rect(rail.layer, ext);
                taps.push(Shape::new(rail.layer, ext));
            }
            ctx.add_strap(M4, strap, &taps)?;
            straps.push(Shape::new(M4, strap));
        }
        Ok((straps[0], straps[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tech::M4;

    #[test]
    fn test_strap_width_grows_with_multiplier() {
        let tech = Tech::scn4m_subm();
        // Two via3 cuts: 2 * 400 + 600 + 2 * 400.
        assert_eq!(strap_width(&tech, M4, 1), 2200);
        // Four cuts.
        assert_eq!(strap_width(&tech, M4, 2), 4 * 400 + 3 * 600 + 800);
        assert!(strap_width(&tech, M4, 4) > strap_width(&tech, M4, 2));
    }

    #[test]
    fn test_power_lane_spans() {
        let tech = Tech::scn4m_subm();
        let lane = PowerLane::new(&tech, 1_000, 1);
        assert_eq!(lane.gnd_span(), Span::new(1_000, 3_200));
        assert_eq!(lane.vdd_span(), Span::new(4_400, 6_600));
        assert_eq!(lane.right(), 7_800);
    }
}
