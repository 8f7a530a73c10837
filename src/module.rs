//! Finished modules and placed instances.

use std::sync::Arc;

use arcstr::ArcStr;
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::geom::{Bbox, BoundBox, Orientation, Point, Transformation};
use crate::layout::{Layout, Port};
use crate::schematic::{Direction, Netlist};
use crate::bus_bit;

/// An immutable, generated circuit block.
///
/// A module owns its layout in local coordinates, its netlist, and an
/// optional behavioral model. Parents refer to modules only through
/// [`Instance`]s holding an `Arc`.
#[derive(Debug)]
pub struct Module {
    name: ArcStr,
    layout: Layout,
    netlist: Netlist,
    verilog: Option<String>,
}

impl Module {
    pub(crate) fn new(name: ArcStr, layout: Layout, netlist: Netlist, verilog: Option<String>) -> Self {
        Self {
            name,
            layout,
            netlist,
            verilog,
        }
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[inline]
    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    pub fn verilog(&self) -> Option<&str> {
        self.verilog.as_deref()
    }

    pub fn width(&self) -> i64 {
        self.brect().width()
    }

    pub fn height(&self) -> i64 {
        self.brect().height()
    }

    /// A port in the module's local coordinates.
    pub fn port(&self, name: &str) -> Result<&Port> {
        self.layout.port(name).ok_or_else(|| Error::PortNotFound {
            module: self.name.clone(),
            port: name.into(),
        })
    }

    pub fn port_direction(&self, name: &str) -> Result<Direction> {
        self.netlist.direction(name).ok_or_else(|| Error::PortNotFound {
            module: self.name.clone(),
            port: name.into(),
        })
    }

    pub fn has_port(&self, name: &str) -> bool {
        self.netlist.direction(name).is_some()
    }
}

impl BoundBox for Module {
    fn bbox(&self) -> Bbox {
        self.layout.bbox()
    }
}

/// A placed reference to a [`Module`].
///
/// The child's geometry is never copied or mutated; queries apply the
/// instance transformation on the fly.
#[derive(Debug, Clone)]
pub struct Instance {
    name: ArcStr,
    module: Arc<Module>,
    loc: Point,
    orientation: Orientation,
    connections: IndexMap<ArcStr, ArcStr>,
    conflicts: Vec<ArcStr>,
}

impl Instance {
    pub fn new(module: Arc<Module>) -> Self {
        Self {
            name: module.name().clone(),
            module,
            loc: Point::zero(),
            orientation: Orientation::identity(),
            connections: IndexMap::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<ArcStr>) -> Self {
        self.name = name.into();
        self
    }

    pub fn set_name(&mut self, name: impl Into<ArcStr>) {
        self.name = name.into();
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    #[inline]
    pub fn loc(&self) -> Point {
        self.loc
    }

    pub fn set_loc(&mut self, loc: Point) {
        self.loc = loc;
    }

    pub fn translate(&mut self, p: Point) {
        self.loc = self.loc + p;
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: impl Into<Orientation>) {
        self.orientation = orientation.into();
    }

    pub fn with_orientation(mut self, orientation: impl Into<Orientation>) -> Self {
        self.set_orientation(orientation);
        self
    }

    pub fn transformation(&self) -> Transformation {
        Transformation::with_loc_and_orientation(self.loc, self.orientation)
    }

    /// Queries a port of the child, in the parent's coordinates.
    pub fn port(&self, name: &str) -> Result<Port> {
        Ok(self.module.port(name)?.transform(&self.transformation()))
    }

    /// Queries bit `index` of a bus port of the child.
    pub fn bus_port(&self, name: &str, index: usize) -> Result<Port> {
        self.port(&bus_bit(name, index))
    }

    /// Binds a port of the child to a net of the parent.
    pub fn connect(&mut self, pin: impl Into<ArcStr>, net: impl Into<ArcStr>) -> &mut Self {
        let pin = pin.into();
        let net = net.into();
        if let Some(prev) = self.connections.insert(pin.clone(), net.clone()) {
            if prev != net {
                self.conflicts.push(pin);
            }
        }
        self
    }

    /// Binds `pin[i]` to `net[i]` for `i` in `0..width`.
    pub fn connect_bus(&mut self, pin: &str, net: &str, width: usize) -> &mut Self {
        for i in 0..width {
            self.connect(bus_bit(pin, i), bus_bit(net, i));
        }
        self
    }

    pub fn with_connections<P, N>(mut self, conns: impl IntoIterator<Item = (P, N)>) -> Self
    where
        P: Into<ArcStr>,
        N: Into<ArcStr>,
    {
        for (pin, net) in conns {
            self.connect(pin, net);
        }
        self
    }

    pub fn connections(&self) -> &IndexMap<ArcStr, ArcStr> {
        &self.connections
    }

    /// Ports that were bound to more than one net.
    pub fn conflicts(&self) -> &[ArcStr] {
        &self.conflicts
    }

    /// The net bound to `pin`, if any.
    pub fn net(&self, pin: &str) -> Option<&ArcStr> {
        self.connections.get(pin)
    }
}

impl BoundBox for Instance {
    fn bbox(&self) -> Bbox {
        match self.module.bbox().into_rect() {
            Some(r) => Bbox::new(r.transform(&self.transformation())),
            None => Bbox::empty(),
        }
    }
}
