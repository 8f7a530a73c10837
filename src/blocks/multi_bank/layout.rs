//! Multi-bank floorplan and routing.
//!
//! A supply lane runs along the left edge. When the grid has two rows a
//! vertical metal4 spine follows, carrying every net of the upper row;
//! then come the split/merge control and the grid of children. Lower row
//! children face a channel along the bottom edge, which also brings every
//! external signal out. Upper row children are mirrored about the x-axis
//! so that their pins face a second channel along the top, fed from the
//! spine. Odd columns are mirrored about the y-axis.

use arcstr::ArcStr;
use indexmap::IndexSet;

use super::{BankKind, MultiBank, MultiBankParams};
use crate::blocks::bank::layout::gaps;
use crate::blocks::bank::Bank;
use crate::blocks::split_merge::{SplitMergeControl, SplitMergeControlParams};
use crate::context::ModuleCtx;
use crate::error::Result;
use crate::geom::{BoundBox, Dir, Mirror, Rect, Span};
use crate::layout::align::AlignRect;
use crate::layout::bus::Bus;
use crate::layout::channel::IoChannel;
use crate::layout::power::{strap_width, supply_rails, PowerLane};
use crate::layout::Shape;
use crate::module::Instance;
use crate::schematic::Direction;
use crate::tech::{Layer, Tech, M1, M3, M4};
use crate::{bus_bit, split_bus};

struct Floorplan {
    lane: PowerLane,
    spine: Option<Bus>,
    control: Option<Instance>,
    /// Children in row-major order, lower row first.
    children: Vec<Instance>,
    cols: usize,
    /// Top edge of the grid.
    top: i64,
    right: i64,
}

fn instantiate_child(ctx: &mut ModuleCtx, kind: &BankKind) -> Result<Instance> {
    match kind {
        BankKind::Bank(p) => ctx.instantiate::<Bank>(p),
        BankKind::MultiBank(p) => ctx.instantiate::<MultiBank>(p),
    }
}

/// The net bound to `port` of child `k`.
fn child_net(p: &MultiBankParams, k: usize, port: &str) -> String {
    if !p.has_control() {
        return port.to_string();
    }
    match split_bus(port).0 {
        base @ ("r" | "w" | "rw" | "ack" | "rack" | "wack") => bus_bit(&format!("bank_{base}"), k),
        "sel" | "en" => bus_bit("bank_sel", k),
        _ => port.to_string(),
    }
}

/// The net bound to `port` of the split/merge control.
fn control_net(p: &MultiBankParams, port: &str) -> String {
    match split_bus(port) {
        ("addr", Some(i)) => bus_bit("addr", p.child.addr_size() + i),
        ("sel", Some(k)) => bus_bit("bank_sel", k),
        _ => port.to_string(),
    }
}

fn bind(inst: &mut Instance, net: impl Fn(&str) -> String) {
    let ports: Vec<ArcStr> = inst.module().netlist().port_names().cloned().collect();
    for port in ports {
        let n = net(&port);
        inst.connect(port, n);
    }
}

/// Moves `inst` so that its lower-left corner lands on `(x, y)`.
fn place_ll(inst: &mut Instance, x: i64, y: i64) {
    let corner = Rect::from_sides(x, y, x, y);
    inst.align_left(corner);
    inst.align_bottom(corner);
}

fn is_supply(net: &str) -> bool {
    net == "vdd" || net == "gnd"
}

/// Nets of the upper row children, in pin order.
fn upper_nets(p: &MultiBankParams, template: &Instance, cols: usize) -> Vec<ArcStr> {
    let mut nets = IndexSet::new();
    for k in cols..2 * cols {
        for port in template.module().netlist().port_names() {
            if !is_supply(port) {
                nets.insert(ArcStr::from(child_net(p, k, port)));
            }
        }
    }
    nets.into_iter().collect()
}

fn place(p: &MultiBankParams, ctx: &mut ModuleCtx, base: i64) -> Result<Floorplan> {
    let tech = ctx.tech.clone();
    let (g, gx) = gaps(&tech);
    let (cols, rows) = p.grid();
    let lane = PowerLane::new(&tech, 0, p.num_banks);
    let template = instantiate_child(ctx, &p.child_params())?;
    let (cw, ch) = (template.module().width(), template.module().height());
    let top = base + rows as i64 * ch + (rows as i64 - 1) * g;
    let mut x = lane.right() + gx;

    let spine = if rows > 1 {
        let names = upper_nets(p, &template, cols);
        let bus = Bus::new(&tech, M4, Dir::Vert, names, x, Span::new(base, top));
        x += bus.extent() + gx;
        Some(bus)
    } else {
        None
    };

    let control = if p.has_control() {
        let mut smc = ctx.instantiate::<SplitMergeControl>(&SplitMergeControlParams {
            num_banks: p.num_banks,
            gated: p.gated,
        })?;
        smc.set_name("control");
        bind(&mut smc, |port| control_net(p, port));
        place_ll(&mut smc, x, base);
        x = smc.brect().right() + gx;
        Some(smc)
    } else {
        None
    };

    let mut children: Vec<Instance> = Vec::with_capacity(p.num_banks);
    for row in 0..rows {
        for col in 0..cols {
            let k = row * cols + col;
            let mirror = match (col % 2, row % 2) {
                (0, 0) => Mirror::R0,
                (_, 0) => Mirror::MY,
                (0, _) => Mirror::MX,
                _ => Mirror::XY,
            };
            let mut inst = template
                .clone()
                .named(format!("bank_{k}"))
                .with_orientation(mirror);
            bind(&mut inst, |port| child_net(p, k, port));
            match (row, col) {
                (0, 0) => place_ll(&mut inst, x, base),
                (_, 0) => {
                    let below = children[k - cols].brect();
                    inst.align_left(below);
                    inst.align_above(below, g);
                }
                _ => {
                    let left = children[k - 1].brect();
                    inst.align_bottom(left);
                    inst.align_to_the_right_of(left, gx);
                }
            }
            children.push(inst);
        }
    }

    Ok(Floorplan {
        lane,
        spine,
        control,
        children,
        cols,
        top,
        right: x + cols as i64 * cw + (cols as i64 - 1) * gx,
    })
}

fn signal_pins(inst: &Instance) -> Result<Vec<(ArcStr, Shape)>> {
    let mut pins = Vec::new();
    for (pin, net) in inst.connections() {
        if !is_supply(net) {
            pins.push((net.clone(), inst.port(pin)?.largest()));
        }
    }
    Ok(pins)
}

/// Collects the terminals of the lower and upper channels.
fn terminals(
    tech: &Tech,
    p: &MultiBankParams,
    fp: &Floorplan,
    base: i64,
) -> Result<(IoChannel, IoChannel)> {
    let pitch = tech.pitch(M3);
    let mut lower = IoChannel::new();
    let mut upper = IoChannel::new();
    if let Some(smc) = &fp.control {
        for (net, pin) in signal_pins(smc)? {
            lower.add_terminal(net, pin);
        }
    }
    for (k, child) in fp.children.iter().enumerate() {
        let channel = if k < fp.cols { &mut lower } else { &mut upper };
        for (net, pin) in signal_pins(child)? {
            channel.add_terminal(net, pin);
        }
    }
    if let Some(spine) = &fp.spine {
        for (i, name) in spine.names().iter().enumerate() {
            let t = spine.track(i);
            let bot = Rect::from_sides(t.left(), base, t.right(), base + pitch);
            let top = Rect::from_sides(t.left(), fp.top - pitch, t.right(), fp.top);
            lower.add_terminal(name.clone(), Shape::new(M4, bot));
            upper.add_terminal(name.clone(), Shape::new(M4, top));
        }
    }
    for (name, dir) in p.ports() {
        if !matches!(dir, Direction::Power | Direction::Ground) {
            lower.expose(name, dir);
        }
    }
    Ok((lower, upper))
}

pub(super) fn draw(p: &MultiBankParams, ctx: &mut ModuleCtx) -> Result<()> {
    let tech = ctx.tech.clone();
    let (g, _) = gaps(&tech);

    let trial = place(p, ctx, 0)?;
    let base = terminals(&tech, p, &trial, 0)?.0.height(&tech);
    let fp = place(p, ctx, base)?;
    let (lower, upper) = terminals(&tech, p, &fp, base)?;

    let mut top = fp.top;
    if let Some(spine) = &fp.spine {
        spine.draw(ctx);
        top += upper.height(&tech);
        upper.draw_tracks(ctx, top)?;
    }

    // The straps carry the current of every child, so they widen with
    // the bank count.
    let sw = strap_width(&tech, M3, p.num_banks);
    let band_y = top + g;
    let vdd_band = Rect::from_sides(0, band_y, fp.right, band_y + sw);
    let gnd_y = vdd_band.top() + tech.space(M3);
    let gnd_band = Rect::from_sides(0, gnd_y, fp.right, gnd_y + sw);
    let vspan = Span::new(base, gnd_band.top());

    let mut vdd = Vec::new();
    let mut gnd = Vec::new();
    if let Some(smc) = &fp.control {
        vdd.extend(supply_rails(smc, "vdd", M1)?);
        gnd.extend(supply_rails(smc, "gnd", M1)?);
    }
    for child in fp.children.iter() {
        vdd.extend(supply_rails(child, "vdd", M3)?);
        gnd.extend(supply_rails(child, "gnd", M3)?);
    }
    let (vdd_strap, gnd_strap) = fp.lane.draw(ctx, vspan, &vdd, &gnd)?;
    ctx.add_strap(M3, vdd_band, &[vdd_strap])?;
    ctx.add_strap(M3, gnd_band, &[gnd_strap])?;
    for (net, shapes) in [
        ("vdd", [Shape::new(M3, vdd_band), vdd_strap]),
        ("gnd", [Shape::new(M3, gnd_band), gnd_strap]),
    ] {
        for shape in shapes {
            ctx.add_port_shape(net, shape)?;
        }
    }

    if let Some(smc) = fp.control {
        ctx.add_instance(smc)?;
    }
    for child in fp.children {
        ctx.add_instance(child)?;
    }

    let top = lower.route(ctx, 0)?;
    debug_assert_eq!(top, base);
    ctx.add_rect(Layer::Boundary, Rect::from_sides(0, 0, fp.right, gnd_band.top()));
    Ok(())
}
