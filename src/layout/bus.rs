//! Parallel routing tracks.

use arcstr::ArcStr;

use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{Dir, Point, Rect, Span};
use crate::layout::Shape;
use crate::tech::{Layer, Tech};

/// A set of equally spaced, named tracks on one layer.
///
/// Track 0 sits at `start`; subsequent tracks step by the layer pitch in
/// the positive direction perpendicular to `dir`.
#[derive(Debug, Clone)]
pub struct Bus {
    layer: Layer,
    dir: Dir,
    width: i64,
    pitch: i64,
    start: i64,
    span: Span,
    names: Vec<ArcStr>,
}

impl Bus {
    pub fn new(
        tech: &Tech,
        layer: Layer,
        dir: Dir,
        names: impl IntoIterator<Item = ArcStr>,
        start: i64,
        span: Span,
    ) -> Self {
        Self {
            layer,
            dir,
            width: tech.width(layer),
            pitch: tech.pitch(layer),
            start,
            span,
            names: names.into_iter().collect(),
        }
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[ArcStr] {
        &self.names
    }

    /// The total width of the bus, perpendicular to its tracks.
    pub fn extent(&self) -> i64 {
        self.names.len() as i64 * self.pitch
    }

    /// The span of the bus perpendicular to its tracks.
    pub fn perp_span(&self) -> Span {
        Span::with_start_and_length(self.start, self.extent())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// The centerline coordinate of track `i`.
    pub fn track_center(&self, i: usize) -> i64 {
        self.start + self.pitch / 2 + i as i64 * self.pitch
    }

    pub fn track(&self, i: usize) -> Rect {
        Rect::from_dir_spans(
            self.dir,
            self.span,
            Span::from_center_span(self.track_center(i), self.width),
        )
    }

    pub fn track_by_name(&self, name: &str) -> Result<Rect> {
        self.index_of(name)
            .map(|i| self.track(i))
            .ok_or_else(|| Error::Routing(format!("no bus track named `{name}`")))
    }

    /// Draws every track.
    pub fn draw(&self, ctx: &mut ModuleCtx) {
        for i in 0..self.names.len() {
            ctx.add_rect(self.layer, self.track(i));
        }
    }

    /// Connects `pin` to track `name` with an orthogonal stub on `stub`.
    pub fn tap(&self, ctx: &mut ModuleCtx, name: &str, pin: Shape, stub: Layer) -> Result<()> {
        let i = self
            .index_of(name)
            .ok_or_else(|| Error::Routing(format!("no bus track named `{name}`")))?;
        let c = pin.rect.center();
        let (p_pin, p_track) = match self.dir {
            Dir::Horiz => (c, Point::new(c.x, self.track_center(i))),
            Dir::Vert => (c, Point::new(self.track_center(i), c.y)),
        };
        ctx.add_straight(stub, p_pin, p_track)?;
        ctx.add_via_at(pin.layer, stub, p_pin)?;
        ctx.add_via_at(stub, self.layer, p_track)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tech::M3;

    #[test]
    fn test_bus_tracks() {
        let tech = Tech::scn4m_subm();
        let names = ["a", "b", "c"].into_iter().map(ArcStr::from);
        let bus = Bus::new(&tech, M3, Dir::Horiz, names, 1000, Span::new(0, 10_000));
        assert_eq!(bus.len(), 3);
        assert_eq!(bus.extent(), 3 * 1400);
        assert_eq!(bus.track_center(0), 1700);
        assert_eq!(bus.track(1), Rect::from_sides(0, 2800, 10_000, 3400));
        assert_eq!(bus.index_of("c"), Some(2));
        assert!(bus.track_by_name("d").is_err());
    }
}
