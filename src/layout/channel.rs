//! A left-edge channel router.
//!
//! Nets crossing a horizontal channel are assigned to tracks before the
//! rows bounding the channel are placed vertically, since assignment only
//! depends on the horizontal extent of each net. Once both rows are
//! placed, each net is drawn as one horizontal track with vertical drops
//! to its terminals.
//!
//! Drops to metal1 and metal2 terminals run on metal2; drops to metal3 and
//! metal4 terminals run on metal4. Callers that know a metal2 drop would
//! cross a foreign metal2 wire pick the drop layer per terminal with
//! [`ChannelPlan::route_with_drops`].

use arcstr::ArcStr;
use indexmap::IndexMap;

use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{Point, Rect, Span};
use crate::layout::Shape;
use crate::schematic::Direction;
use crate::tech::{Layer, Tech, M2, M3, M4};

/// Track assignment for a horizontal channel.
#[derive(Debug, Clone)]
pub struct ChannelPlan {
    track_layer: Layer,
    track_width: i64,
    pitch: i64,
    names: Vec<ArcStr>,
    spans: Vec<Span>,
    tracks: Vec<usize>,
    num_tracks: usize,
}

impl ChannelPlan {
    /// Assigns tracks for nets with the given horizontal terminal centers.
    ///
    /// Nets are processed in order of their leftmost terminal; each takes
    /// the topmost track whose previous occupant ends far enough to the
    /// left.
    pub fn new(tech: &Tech, nets: impl IntoIterator<Item = (ArcStr, Vec<i64>)>) -> Self {
        let track_layer = M3;
        let pitch = tech.pitch(track_layer);
        let clearance = tech.pitch(M4).max(tech.pitch(M2));
        let mut names = Vec::new();
        let mut spans = Vec::new();
        for (name, xs) in nets {
            let lo = xs.iter().copied().min().unwrap_or_default();
            let hi = xs.iter().copied().max().unwrap_or_default();
            names.push(name);
            spans.push(Span::new(lo, hi));
        }

        let mut order: Vec<usize> = (0..spans.len()).collect();
        order.sort_by_key(|&i| (spans[i].start(), spans[i].stop()));
        let mut ends: Vec<i64> = Vec::new();
        let mut tracks = vec![0; spans.len()];
        for i in order {
            let span = spans[i];
            let slot = ends.iter().position(|&end| end + clearance <= span.start());
            let t = match slot {
                Some(t) => t,
                None => {
                    ends.push(i64::MIN);
                    ends.len() - 1
                }
            };
            ends[t] = span.stop();
            tracks[i] = t;
        }

        Self {
            track_layer,
            track_width: tech.width(track_layer),
            pitch,
            names,
            spans,
            tracks,
            num_tracks: ends.len(),
        }
    }

    pub fn num_tracks(&self) -> usize {
        self.num_tracks
    }

    /// The vertical space taken by the channel, including one pitch of
    /// clearance to the rows on either side.
    pub fn height(&self) -> i64 {
        (self.num_tracks as i64 + 1) * self.pitch
    }

    pub fn track_of(&self, net: &str) -> Option<usize> {
        self.names.iter().position(|n| n == net).map(|i| self.tracks[i])
    }

    /// The y coordinate of track `t` in a channel whose top edge is `top`.
    pub fn track_y(&self, top: i64, t: usize) -> i64 {
        top - self.pitch - t as i64 * self.pitch
    }

    /// Draws net `net` in a channel whose top edge is at `top`, choosing
    /// each drop layer from the terminal layer.
    pub fn route(&self, ctx: &mut ModuleCtx, top: i64, net: &str, terminals: &[Shape]) -> Result<()> {
        let drops: Vec<(Shape, Layer)> = terminals
            .iter()
            .map(|t| (*t, default_drop(t.layer)))
            .collect();
        self.route_with_drops(ctx, top, net, &drops)
    }

    /// Draws net `net` with an explicit drop layer for every terminal.
    pub fn route_with_drops(
        &self,
        ctx: &mut ModuleCtx,
        top: i64,
        net: &str,
        terminals: &[(Shape, Layer)],
    ) -> Result<()> {
        let i = self
            .names
            .iter()
            .position(|n| n == net)
            .ok_or_else(|| Error::Routing(format!("net `{net}` is not in the channel")))?;
        let y = self.track_y(top, self.tracks[i]);
        let span = self.spans[i].expand(self.track_width / 2);
        ctx.add_rect(
            self.track_layer,
            Rect::from_spans(span, Span::from_center_span(y, self.track_width)),
        );
        for (term, drop) in terminals {
            let c = term.rect.center();
            let on_track = Point::new(c.x, y);
            if c.y != y {
                ctx.add_straight(*drop, on_track, c)?;
            }
            ctx.add_via_at(self.track_layer, *drop, on_track)?;
            ctx.add_via_at(term.layer, *drop, c)?;
        }
        Ok(())
    }
}

/// The vertical layer used to reach a terminal on `layer`.
pub fn default_drop(layer: Layer) -> Layer {
    match layer.level() {
        Some(n) if n >= 3 => M4,
        _ => M2,
    }
}

/// A channel along the bottom of a block whose terminals all lie above it.
///
/// Terminals are collected while the rows above are placed at a
/// provisional height; once every terminal is known the channel height is
/// fixed, the caller shifts its rows up by that height with
/// [`IoChannel::shift`], and [`IoChannel::route`] draws the tracks.
/// Exposed nets leave through the bottom edge.
#[derive(Debug, Clone, Default)]
pub struct IoChannel {
    terminals: IndexMap<ArcStr, Vec<(Shape, Layer)>>,
    exposed: IndexMap<ArcStr, Direction>,
}

impl IoChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_terminal(&mut self, net: impl Into<ArcStr>, shape: Shape) {
        let drop = default_drop(shape.layer);
        self.add_terminal_with_drop(net, shape, drop);
    }

    pub fn add_terminal_with_drop(&mut self, net: impl Into<ArcStr>, shape: Shape, drop: Layer) {
        self.terminals.entry(net.into()).or_default().push((shape, drop));
    }

    /// Brings `net` out through the bottom edge as a port of the enclosing
    /// module.
    pub fn expose(&mut self, net: impl Into<ArcStr>, direction: Direction) {
        self.exposed.insert(net.into(), direction);
    }

    pub fn nets(&self) -> impl Iterator<Item = &ArcStr> {
        self.terminals.keys()
    }

    pub fn terminals(&self, net: &str) -> &[(Shape, Layer)] {
        self.terminals.get(net).map(|t| t.as_slice()).unwrap_or_default()
    }

    pub fn plan(&self, tech: &Tech) -> ChannelPlan {
        ChannelPlan::new(
            tech,
            self.terminals.iter().map(|(net, terms)| {
                (net.clone(), terms.iter().map(|(s, _)| s.rect.center().x).collect())
            }),
        )
    }

    pub fn height(&self, tech: &Tech) -> i64 {
        self.plan(tech).height()
    }

    /// Moves every collected terminal up by `dy`.
    pub fn shift(&mut self, dy: i64) {
        for terms in self.terminals.values_mut() {
            for (shape, _) in terms.iter_mut() {
                shape.rect = shape.rect.translate(Point::new(0, dy));
            }
        }
    }

    /// Draws every net's track and drops in a channel whose top edge is at
    /// `top`, without exposing anything. Terminals may lie on either side.
    pub fn draw_tracks(&self, ctx: &mut ModuleCtx, top: i64) -> Result<()> {
        let plan = self.plan(&ctx.tech);
        for (net, terms) in self.terminals.iter() {
            plan.route_with_drops(ctx, top, net, terms)?;
        }
        Ok(())
    }

    /// Draws the channel with its bottom edge at `bottom`. Returns the top
    /// edge.
    pub fn route(&self, ctx: &mut ModuleCtx, bottom: i64) -> Result<i64> {
        let tech = ctx.tech.clone();
        let plan = self.plan(&tech);
        let top = bottom + plan.height();
        self.draw_tracks(ctx, top)?;
        for (net, direction) in self.exposed.iter() {
            let (term, drop) = self
                .terminals
                .get(net)
                .and_then(|t| t.iter().find(|(_, d)| *d == M2).or_else(|| t.first()))
                .ok_or_else(|| Error::Routing(format!("exposed net `{net}` has no terminal")))?;
            let track = plan
                .track_of(net)
                .ok_or_else(|| Error::Routing(format!("net `{net}` is not in the channel")))?;
            let y = plan.track_y(top, track);
            let stub = Rect::from_spans(
                Span::from_center_span(term.rect.center().x, tech.width(*drop)),
                Span::new(bottom, y),
            );
            ctx.declare_port(net.clone(), *direction)?;
            ctx.add_port_shape(net.clone(), Shape::new(*drop, stub))?;
        }
        Ok(top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tech::M1;

    #[test]
    fn test_left_edge_assignment() {
        let tech = Tech::scn4m_subm();
        let plan = ChannelPlan::new(
            &tech,
            [
                (ArcStr::from("a"), vec![0, 10_000]),
                (ArcStr::from("b"), vec![2_000, 5_000]),
                (ArcStr::from("c"), vec![20_000, 30_000]),
                (ArcStr::from("d"), vec![6_000, 8_000]),
            ],
        );
        assert_eq!(plan.track_of("a"), Some(0));
        assert_eq!(plan.track_of("b"), Some(1));
        // `c` starts well after `a` ends, so it reuses track 0.
        assert_eq!(plan.track_of("c"), Some(0));
        // `d` starts too close to the end of `b`.
        assert_eq!(plan.track_of("d"), Some(2));
        assert_eq!(plan.num_tracks(), 3);
        assert_eq!(plan.height(), 4 * 1400);
    }

    #[test]
    fn test_drop_layers() {
        assert_eq!(default_drop(M1), M2);
        assert_eq!(default_drop(M2), M2);
        assert_eq!(default_drop(M3), M4);
        assert_eq!(default_drop(M4), M4);
    }

    #[test]
    fn test_empty_channel() {
        let plan = ChannelPlan::new(&Tech::scn4m_subm(), std::iter::empty());
        assert_eq!(plan.num_tracks(), 0);
        assert_eq!(plan.height(), 1400);
    }

    #[test]
    fn test_io_channel_shift() {
        let tech = Tech::scn4m_subm();
        let mut channel = IoChannel::new();
        let pin = |x: i64| Shape::new(M2, Rect::from_sides(x - 300, 0, x + 300, 1_000));
        channel.add_terminal("a", pin(1_000));
        channel.add_terminal("a", pin(9_000));
        channel.add_terminal("b", pin(4_000));
        channel.expose("b", Direction::Input);
        assert_eq!(channel.plan(&tech).num_tracks(), 2);
        assert_eq!(channel.height(&tech), 3 * 1400);
        channel.shift(channel.height(&tech));
        assert_eq!(channel.terminals("a")[0].0.rect.bottom(), 4_200);
        assert_eq!(channel.terminals("a")[1].1, M2);
        assert!(channel.terminals("c").is_empty());
    }
}
