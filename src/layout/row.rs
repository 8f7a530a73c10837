//! Rows of standard gates with an overhead routing channel.
//!
//! Members are placed left to right and abut, so their `vdd` and `gnd`
//! rails merge. Every gate pin sits on a metal1 pad at the row's
//! horizontal centerline with a unique x coordinate. Nets between adjacent
//! members with nothing in between are linked directly on metal1; the
//! remaining multi-terminal nets are assigned to metal3 tracks in a
//! channel above the row and reached with metal2 drops.
//!
//! Exposed ports are metal2 stubs running from their pad to the top or
//! bottom edge of the row, so a parent can always reach them with a
//! vertical metal2 wire at the pad's x coordinate.

use arcstr::ArcStr;
use indexmap::IndexMap;

use crate::cells::{Gate, GateKind};
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{BoundBox, Point, Rect, Side, Span};
use crate::layout::channel::ChannelPlan;
use crate::layout::Shape;
use crate::module::Instance;
use crate::schematic::Direction;
use crate::tech::{Layer, M1, M2};

/// Boolean reductions built by [`GateRow::push_reduction`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TreeOp {
    And,
    Or,
}

impl TreeOp {
    /// The inverting two-input gate used at `level` of the tree.
    ///
    /// Levels alternate between NAND and NOR so that every second level
    /// restores true polarity.
    fn gate(&self, level: usize) -> GateKind {
        match (self, level % 2) {
            (Self::And, 0) | (Self::Or, 1) => GateKind::Nand2,
            _ => GateKind::Nor2,
        }
    }
}

#[derive(Debug, Clone)]
struct Exposed {
    net: ArcStr,
    direction: Direction,
    side: Side,
}

/// A row of gates under construction.
#[derive(Debug, Clone, Default)]
pub struct GateRow {
    members: Vec<Instance>,
    exposed: Vec<Exposed>,
}

/// The placed extent of a finished row.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RowExtent {
    /// The members alone.
    pub cells: Rect,
    /// The members plus the channel above them.
    pub total: Rect,
}

impl GateRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Appends a connected instance. Unbound `vdd` and `gnd` ports are tied
    /// to the row's supply nets.
    pub fn push(&mut self, mut inst: Instance) {
        for supply in ["vdd", "gnd"] {
            if inst.module().has_port(supply) && inst.net(supply).is_none() {
                inst.connect(supply, supply);
            }
        }
        self.members.push(inst);
    }

    /// Appends one gate with the given name and connections, in the order
    /// of the gate's inputs followed by its output.
    pub fn push_gate(
        &mut self,
        ctx: &mut ModuleCtx,
        kind: GateKind,
        name: impl Into<ArcStr>,
        nets: &[&str],
    ) -> Result<()> {
        let pins = kind.inputs().iter().copied().chain(std::iter::once(kind.output()));
        if nets.len() != kind.inputs().len() + 1 {
            return Err(Error::config(
                "gate_row",
                format!("{} takes {} nets, got {}", kind.name(), kind.inputs().len() + 1, nets.len()),
            ));
        }
        let inst = ctx
            .instantiate::<Gate>(&kind)?
            .named(name)
            .with_connections(pins.zip(nets.iter().copied()));
        self.push(inst);
        Ok(())
    }

    /// Exposes `net` as a port of the enclosing module, with a stub to the
    /// top edge of the row.
    pub fn expose(&mut self, net: impl Into<ArcStr>, direction: Direction) {
        self.expose_on(net, direction, Side::Top);
    }

    pub fn expose_on(&mut self, net: impl Into<ArcStr>, direction: Direction, side: Side) {
        self.exposed.push(Exposed {
            net: net.into(),
            direction,
            side,
        });
    }

    /// Appends gates computing the AND or OR of `inputs` onto net `out`.
    ///
    /// Internal nets and instances are named after `prefix`. A single
    /// input is buffered through two inverters.
    pub fn push_reduction(
        &mut self,
        ctx: &mut ModuleCtx,
        op: TreeOp,
        inputs: &[ArcStr],
        out: &str,
        prefix: &str,
    ) -> Result<()> {
        if inputs.is_empty() {
            return Err(Error::config("logic_tree", "a reduction needs at least one input"));
        }
        if inputs.len() == 1 {
            let mid = format!("{prefix}_b");
            self.push_gate(ctx, GateKind::Inv, format!("{prefix}_inv0"), &[&inputs[0], &mid])?;
            self.push_gate(ctx, GateKind::Inv, format!("{prefix}_inv1"), &[&mid, out])?;
            return Ok(());
        }

        let mut level = 0;
        let mut signals: Vec<ArcStr> = inputs.to_vec();
        while signals.len() > 1 {
            let kind = op.gate(level);
            let last_level = signals.len() == 2;
            let mut next = Vec::with_capacity((signals.len() + 1) / 2);
            for (k, pair) in signals.chunks(2).enumerate() {
                let net: ArcStr = if last_level && level % 2 == 1 {
                    ArcStr::from(out)
                } else {
                    arcstr::format!("{prefix}_l{}_{k}", level + 1)
                };
                match pair {
                    [a, b] => {
                        self.push_gate(ctx, kind, format!("{prefix}_g{level}_{k}"), &[a, b, &net])?;
                    }
                    [a] => {
                        // Carry an odd signal to the next level's polarity.
                        self.push_gate(ctx, GateKind::Inv, format!("{prefix}_c{level}_{k}"), &[a, &net])?;
                    }
                    _ => unreachable!(),
                }
                next.push(net);
            }
            signals = next;
            level += 1;
        }
        if level % 2 == 1 {
            self.push_gate(ctx, GateKind::Inv, format!("{prefix}_out"), &[&signals[0], out])?;
        }
        Ok(())
    }

    /// Places and routes the row with its lower-left corner at `origin`.
    pub fn finish(self, ctx: &mut ModuleCtx, origin: Point) -> Result<RowExtent> {
        let tech = ctx.tech.clone();
        if self.members.is_empty() {
            return Err(Error::config("gate_row", "a row needs at least one member"));
        }

        let height = self.members[0].module().height();
        let mut x = origin.x;
        let mut placed = Vec::with_capacity(self.members.len());
        for mut inst in self.members {
            if inst.module().height() != height {
                return Err(Error::Routing(format!(
                    "row member {} is {} tall, expected {height}",
                    inst.name(),
                    inst.module().height()
                )));
            }
            let brect = inst.module().brect();
            inst.set_loc(Point::new(x - brect.left(), origin.y - brect.bottom()));
            x += brect.width();
            placed.push(inst);
        }
        let cells = Rect::from_sides(origin.x, origin.y, x, origin.y + height);

        // Terminals of each signal net, in placement order.
        let mut nets: IndexMap<ArcStr, Vec<(usize, Shape)>> = IndexMap::new();
        for (i, inst) in placed.iter().enumerate() {
            for (pin, net) in inst.connections() {
                if net == "vdd" || net == "gnd" {
                    continue;
                }
                let shape = inst.port(pin)?.largest();
                nets.entry(net.clone()).or_default().push((i, shape));
            }
        }

        let pads: Vec<(usize, i64)> = nets
            .values()
            .flatten()
            .filter(|(_, s)| s.layer == M1)
            .map(|(i, s)| (*i, s.rect.center().x))
            .collect();
        let mut channel_nets = Vec::new();
        for (net, terms) in nets.iter() {
            match terms.as_slice() {
                [] | [_] => {}
                [(i, a), (j, b)] if local_link(&pads, *i, a, *j, b) => {
                    let (pa, pb) = (a.rect.center(), b.rect.center());
                    ctx.add_straight(M1, pa, Point::new(pb.x, pa.y))?;
                }
                _ => channel_nets.push(net.clone()),
            }
        }

        let plan = ChannelPlan::new(
            &tech,
            channel_nets.iter().map(|n| {
                let xs = nets[n].iter().map(|(_, s)| s.rect.center().x).collect();
                (n.clone(), xs)
            }),
        );
        let top = if plan.num_tracks() > 0 {
            let top = cells.top() + plan.height();
            for net in channel_nets.iter() {
                let shapes: Vec<Shape> = nets[net].iter().map(|(_, s)| *s).collect();
                plan.route(ctx, top, net, &shapes)?;
            }
            top
        } else {
            cells.top()
        };
        let total = Rect::from_sides(cells.left(), cells.bottom(), cells.right(), top);
        ctx.add_rect(Layer::Boundary, total);

        for port in self.exposed.iter() {
            let (_, term) = nets
                .get(&port.net)
                .and_then(|t| t.first())
                .ok_or_else(|| Error::Routing(format!("exposed net `{}` has no terminal", port.net)))?;
            let c = term.rect.center();
            let edge = match port.side {
                Side::Bot => total.bottom(),
                _ => total.top(),
            };
            let stub = Rect::from_spans(
                Span::from_center_span(c.x, tech.width(M2)),
                Span::new(c.y, edge),
            );
            ctx.add_via_at(term.layer, M2, c)?;
            ctx.declare_port(port.net.clone(), port.direction)?;
            ctx.add_port_shape(port.net.clone(), Shape::new(M2, stub))?;
        }

        let rw = tech.width(M1);
        let vdd = Rect::from_sides(cells.left(), cells.top() - rw, cells.right(), cells.top());
        let gnd = Rect::from_sides(cells.left(), cells.bottom(), cells.right(), cells.bottom() + rw);
        for inst in placed {
            ctx.add_instance(inst)?;
        }
        ctx.add_pin("vdd", Direction::Power, M1, vdd)?;
        ctx.add_pin("gnd", Direction::Ground, M1, gnd)?;

        Ok(RowExtent { cells, total })
    }
}

/// Whether a two-terminal net between members `i` and `j` can be linked
/// with a straight metal1 wire along the pad centerline.
fn local_link(pads: &[(usize, i64)], i: usize, a: &Shape, j: usize, b: &Shape) -> bool {
    if a.layer != M1 || b.layer != M1 || i.abs_diff(j) != 1 {
        return false;
    }
    if a.rect.center().y != b.rect.center().y {
        return false;
    }
    let (xa, xb) = (a.rect.center().x, b.rect.center().x);
    let (lo, hi) = (xa.min(xb), xa.max(xb));
    !pads.iter().any(|&(_, x)| x > lo && x < hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::context::SramCtx;
    use crate::error::Result;
    use crate::tech::Tech;

    struct TestTree {
        n: usize,
    }

    impl Component for TestTree {
        type Params = usize;

        fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
            Ok(Self { n: *params })
        }

        fn name(&self) -> ArcStr {
            arcstr::format!("test_tree_{}", self.n)
        }

        fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
            let inputs: Vec<ArcStr> = (0..self.n).map(|i| arcstr::format!("in{i}")).collect();
            let mut row = GateRow::new();
            row.push_reduction(ctx, TreeOp::And, &inputs, "out", "and")?;
            for input in inputs.iter() {
                row.expose(input.clone(), Direction::Input);
            }
            row.expose_on("out", Direction::Output, Side::Bot);
            row.finish(ctx, Point::zero())?;
            Ok(())
        }
    }

    #[test]
    fn test_and_tree_gate_counts() {
        let mut ctx = SramCtx::default();
        // in0..in4 -> 2 nand2 + carry inv -> nor2 + carry inv -> nand2 -> inv.
        let tree = ctx.instantiate::<TestTree>(&5).unwrap();
        let kinds: Vec<_> = tree
            .netlist()
            .instances()
            .iter()
            .map(|i| i.module().name().to_string())
            .collect();
        assert_eq!(kinds, ["pnand2", "pnand2", "pinv", "pnor2", "pinv", "pnand2", "pinv"]);
        assert_eq!(tree.netlist().num_ports(), 8);
        crate::validate::validate(&tree).unwrap();
    }

    #[test]
    fn test_single_input_is_buffered() {
        let mut ctx = SramCtx::default();
        let tree = ctx.instantiate::<TestTree>(&1).unwrap();
        assert_eq!(tree.netlist().instances().len(), 2);
        let out = tree.port("out").unwrap().largest();
        assert_eq!(out.layer, M2);
        assert_eq!(out.rect.bottom(), 0);
    }

    #[test]
    fn test_two_inputs_need_no_channel() {
        let mut ctx = SramCtx::default();
        let tree = ctx.instantiate::<TestTree>(&2).unwrap();
        // nand2 followed by an inverter, linked on metal1.
        assert_eq!(tree.height(), ctx.tech().row_height());
    }
}
