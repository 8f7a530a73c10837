//! Procedurally drawn leaf cells.
//!
//! Every leaf cell has a boundary rectangle, full-width metal1 `vdd`/`gnd`
//! rails along its top and bottom edges, representative well, implant,
//! active and poly shapes, and a transistor-level SPICE body. Column cells
//! are one bitcell column wide and carry their vertical signals on the three
//! metal2 column tracks.

use arcstr::ArcStr;

use crate::context::ModuleCtx;
use crate::error::Result;
use crate::geom::{Point, Rect, Span};
use crate::schematic::Direction;
use crate::tech::{Layer, M1, M2};

pub mod column;
pub mod gates;
pub mod sleep;

pub use column::{
    Bitcell, ColumnMux, DataReadyGate, MergeCell, Precharge, SenseAmp, SplitCell,
    WriteCompleteGate, WriteDriver,
};
pub use gates::{Gate, GateKind};
pub use sleep::SleepTx;

/// Height of a pin pad; tall enough to satisfy minimum area on its own.
pub(crate) const PAD_HEIGHT: i64 = 1_000;

pub(crate) fn boundary(ctx: &mut ModuleCtx, w: i64, h: i64) {
    ctx.add_rect(Layer::Boundary, Rect::ll_wh(0, 0, w, h));
}

/// The rail rectangle along the top (`top == true`) or bottom edge.
pub(crate) fn rail_rect(ctx: &ModuleCtx, w: i64, h: i64, top: bool) -> Rect {
    let rw = ctx.tech().width(M1);
    if top {
        Rect::from_sides(0, h - rw, w, h)
    } else {
        Rect::from_sides(0, 0, w, rw)
    }
}

pub(crate) fn power_rails(ctx: &mut ModuleCtx, w: i64, h: i64) -> Result<()> {
    let vdd = rail_rect(ctx, w, h, true);
    let gnd = rail_rect(ctx, w, h, false);
    ctx.add_pin("vdd", Direction::Power, M1, vdd)?;
    ctx.add_pin("gnd", Direction::Ground, M1, gnd)?;
    Ok(())
}

/// Draws wells, implants and diffusion for a cell with NMOS devices in the
/// bottom half and PMOS devices in the top half.
pub(crate) fn wells(ctx: &mut ModuleCtx, w: i64, h: i64) {
    let tech = ctx.tech.clone();
    let mid = h / 2;
    ctx.add_rect(Layer::Pwell, Rect::from_sides(0, 0, w, mid));
    ctx.add_rect(Layer::Nwell, Rect::from_sides(0, mid, w, h));

    let enc = tech.rule("implant_enclosure_active");
    let margin = tech.rule("active_to_active") / 2 + enc;
    let aw = 2 * tech.width(Layer::Active);
    let ndiff = Rect::from_sides(margin, mid / 2 - aw / 2, w - margin, mid / 2 + aw / 2);
    let pdiff = Rect::from_sides(
        margin,
        mid + mid / 2 - aw / 2,
        w - margin,
        mid + mid / 2 + aw / 2,
    );
    ctx.add_rect(Layer::Active, ndiff);
    ctx.add_rect(Layer::Active, pdiff);
    ctx.add_rect(Layer::Nimplant, ndiff.expand(enc));
    ctx.add_rect(Layer::Pimplant, pdiff.expand(enc));
}

/// Draws a vertical poly gate at `x` crossing both diffusion strips.
pub(crate) fn poly_gate(ctx: &mut ModuleCtx, x: i64, h: i64) {
    let tech = ctx.tech.clone();
    let pw = tech.width(Layer::Poly);
    let ext = tech.rule("poly_extend_active");
    let top = h - h / 4 + tech.width(Layer::Active) + ext;
    let bot = h / 4 - tech.width(Layer::Active) - ext;
    ctx.add_rect(
        Layer::Poly,
        Rect::from_spans(Span::from_center_span(x, pw), Span::new(bot, top)),
    );
}

/// A pad of `layer` centered at `c`, sized for a single via.
pub(crate) fn pad_rect(ctx: &ModuleCtx, layer: Layer, c: Point) -> Rect {
    let w = ctx.tech().max_pad(layer).max(ctx.tech().via_pad(Layer::Via(1), M1));
    Rect::centered(c, w, PAD_HEIGHT.max(w))
}

/// Declares a pad pin and drops a poly contact beneath metal1 pads.
pub(crate) fn pad_pin(
    ctx: &mut ModuleCtx,
    name: impl Into<ArcStr>,
    direction: Direction,
    layer: Layer,
    c: Point,
) -> Result<()> {
    let rect = pad_rect(ctx, layer, c);
    ctx.add_pin(name, direction, layer, rect)?;
    if layer == M1 && direction == Direction::Input {
        let tech = ctx.tech.clone();
        let cw = tech.width(Layer::Contact);
        let contact = Rect::centered(c, cw, cw);
        ctx.add_rect(Layer::Contact, contact);
        ctx.add_rect(Layer::Poly, contact.expand(tech.enclosure(Layer::Poly, Layer::Contact)));
    }
    Ok(())
}

/// Declares a pin on metal2 column track `track` covering `span` vertically.
pub(crate) fn track_pin(
    ctx: &mut ModuleCtx,
    name: impl Into<ArcStr>,
    direction: Direction,
    track: usize,
    span: Span,
) -> Result<()> {
    let tech = ctx.tech.clone();
    let rect = Rect::from_spans(
        Span::from_center_span(tech.column_track(track), tech.width(M2)),
        span,
    );
    ctx.add_pin(name, direction, M2, rect)
}

/// Declares a full-width horizontal metal1 pin centered at `y`.
pub(crate) fn rail_pin(
    ctx: &mut ModuleCtx,
    name: impl Into<ArcStr>,
    direction: Direction,
    w: i64,
    y: i64,
) -> Result<()> {
    let rw = ctx.tech().width(M1);
    ctx.add_pin(
        name,
        direction,
        M1,
        Rect::from_spans(Span::new(0, w), Span::from_center_span(y, rw)),
    )
}

/// Formats one MOSFET line of a SPICE body.
pub(crate) fn mos(name: &str, d: &str, g: &str, s: &str, b: &str, model: &str, w_nm: i64) -> String {
    format!(
        "M{name} {d} {g} {s} {b} {model} W={}u L=0.4u\n",
        w_nm as f64 / 1000.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mos_line() {
        assert_eq!(
            mos("N0", "z", "a", "gnd", "gnd", "n", 1200),
            "MN0 z a gnd gnd n W=1.2u L=0.4u\n"
        );
    }
}
