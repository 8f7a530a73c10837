//! Connectivity: ordered ports, instances with positional net lists, and
//! raw transistor-level bodies for leaf cells.

use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;

use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::module::{Instance, Module};

/// The direction of a port.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
    InOut,
    Power,
    Ground,
}

impl Direction {
    /// The Verilog keyword for a port with this direction.
    pub fn verilog(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::InOut | Self::Power | Self::Ground => "inout",
        }
    }

    /// The LEF `DIRECTION` of a port with this direction.
    pub fn lef(&self) -> &'static str {
        match self {
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
            Self::InOut | Self::Power | Self::Ground => "INOUT",
        }
    }

    /// The LEF `USE` of a port with this direction.
    pub fn lef_use(&self) -> &'static str {
        match self {
            Self::Power => "POWER",
            Self::Ground => "GROUND",
            _ => "SIGNAL",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
            Self::InOut => write!(f, "inout"),
            Self::Power => write!(f, "power"),
            Self::Ground => write!(f, "ground"),
        }
    }
}

/// A child instance as seen by the netlist.
#[derive(Debug, Clone)]
pub struct SchematicInstance {
    name: ArcStr,
    module: Arc<Module>,
    /// Net names, in the order of the child's declared ports.
    nets: Vec<ArcStr>,
}

impl SchematicInstance {
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    pub fn nets(&self) -> &[ArcStr] {
        &self.nets
    }
}

/// A finished netlist.
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    ports: IndexMap<ArcStr, Direction>,
    instances: Vec<SchematicInstance>,
    raw: Option<String>,
}

impl Netlist {
    pub fn ports(&self) -> impl Iterator<Item = (&ArcStr, Direction)> {
        self.ports.iter().map(|(k, v)| (k, *v))
    }

    pub fn port_names(&self) -> impl Iterator<Item = &ArcStr> {
        self.ports.keys()
    }

    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    pub fn direction(&self, port: &str) -> Option<Direction> {
        self.ports.get(port).copied()
    }

    pub fn instances(&self) -> &[SchematicInstance] {
        &self.instances
    }

    /// The transistor-level body of a leaf cell.
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

/// Accumulates ports and instances while a module is being generated.
#[derive(Debug)]
pub struct NetlistBuilder {
    module: ArcStr,
    ports: IndexMap<ArcStr, Direction>,
    instances: Vec<SchematicInstance>,
    instance_names: HashSet<ArcStr>,
    raw: Option<String>,
}

impl NetlistBuilder {
    pub fn new(module: ArcStr) -> Self {
        Self {
            module,
            ports: IndexMap::new(),
            instances: Vec::new(),
            instance_names: HashSet::new(),
            raw: None,
        }
    }

    /// Declares a port.
    ///
    /// Declaring an existing port again with the same direction is a no-op.
    pub fn add_port(&mut self, name: impl Into<ArcStr>, direction: Direction) -> Result<()> {
        let name = name.into();
        match self.ports.get(&name) {
            Some(&first) if first != direction => Err(Error::PortDirection {
                module: self.module.clone(),
                port: name,
                first,
                second: direction,
            }),
            Some(_) => Ok(()),
            None => {
                self.ports.insert(name, direction);
                Ok(())
            }
        }
    }

    pub fn has_port(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    pub fn port_names(&self) -> impl Iterator<Item = &ArcStr> {
        self.ports.keys()
    }

    /// Binds an instance's connections positionally.
    ///
    /// Every port of the child must be bound exactly once, and every bound
    /// name must be a port of the child.
    pub fn add_instance(&mut self, inst: &Instance) -> Result<()> {
        let child = inst.module();
        if !self.instance_names.insert(inst.name().clone()) {
            return Err(Error::DuplicateInstance {
                module: self.module.clone(),
                inst: inst.name().clone(),
            });
        }
        let conns = inst.connections();
        let err = |message: String| Error::Connection {
            inst: inst.name().clone(),
            child: child.name().clone(),
            message,
        };
        if let Some(pin) = inst.conflicts().first() {
            return Err(err(format!("port `{pin}` is bound to more than one net")));
        }
        for pin in conns.keys() {
            if child.netlist().direction(pin).is_none() {
                return Err(err(format!("`{}` has no port named `{pin}`", child.name())));
            }
        }
        let mut nets = Vec::with_capacity(child.netlist().num_ports());
        for port in child.netlist().port_names() {
            let net = conns
                .get(port)
                .ok_or_else(|| err(format!("port `{port}` is not connected")))?;
            nets.push(net.clone());
        }
        self.instances.push(SchematicInstance {
            name: inst.name().clone(),
            module: child.clone(),
            nets,
        });
        Ok(())
    }

    pub fn set_raw(&mut self, body: impl Into<String>) {
        self.raw = Some(body.into());
    }

    pub fn build(self) -> Netlist {
        Netlist {
            ports: self.ports,
            instances: self.instances,
            raw: self.raw,
        }
    }
}

/// Holds an optional behavioral Verilog model of the module.
#[derive(Debug, Default)]
pub struct BehavioralModelBuilder {
    verilog: Option<String>,
}

impl BehavioralModelBuilder {
    pub fn set_verilog(&mut self, verilog: impl Into<String>) {
        self.verilog = Some(verilog.into());
    }

    pub fn build(self) -> Option<String> {
        self.verilog
    }
}
