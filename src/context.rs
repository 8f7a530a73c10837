//! The build context: module registry and per-module builders.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use arcstr::ArcStr;
use log::{debug, trace};

use crate::component::Component;
use crate::error::{Error, Result};
use crate::geom::{BoundBox, Rect};
use crate::layout::{LayoutBuilder, Shape};
use crate::module::{Instance, Module};
use crate::schematic::{BehavioralModelBuilder, Direction, NetlistBuilder};
use crate::tech::{Layer, Tech};

type ModuleKey = (TypeId, String);

/// Owns the technology and the registry of generated modules for one build.
///
/// Modules are cached by component type and parameters. A module name may
/// only ever be produced by one such key; call [`SramCtx::reset`] between
/// independent top-level builds.
pub struct SramCtx {
    tech: Arc<Tech>,
    modules: HashMap<ModuleKey, Arc<Module>>,
    names: HashMap<ArcStr, ModuleKey>,
}

impl SramCtx {
    pub fn new(tech: Tech) -> Self {
        Self {
            tech: Arc::new(tech),
            modules: HashMap::new(),
            names: HashMap::new(),
        }
    }

    pub fn tech(&self) -> &Tech {
        &self.tech
    }

    /// Forgets every generated module and claimed name.
    pub fn reset(&mut self) {
        self.modules.clear();
        self.names.clear();
    }

    pub fn num_modules(&self) -> usize {
        self.modules.len()
    }

    /// Returns the module for `params`, generating it if necessary.
    pub fn instantiate<C: Component>(&mut self, params: &C::Params) -> Result<Arc<Module>> {
        let key = (TypeId::of::<C>(), format!("{params:?}"));
        if let Some(module) = self.modules.get(&key) {
            trace!("reusing module {}", module.name());
            return Ok(module.clone());
        }

        let component = C::new(params, &self.tech)?;
        let name = component.name();
        if self.names.get(&name).is_some_and(|k| *k != key) {
            return Err(Error::DuplicateName(name));
        }

        debug!("generating {name} with {params:?}");
        let mut ctx = ModuleCtx::new(self, name.clone());
        let module = component
            .generate(&mut ctx)
            .and_then(|_| ctx.finish())
            .map_err(|e| Error::Generator {
                module: name.clone(),
                source: Box::new(e),
            })?;
        let module = Arc::new(module);

        self.names.insert(name, key.clone());
        self.modules.insert(key, module.clone());
        Ok(module)
    }
}

impl Default for SramCtx {
    fn default() -> Self {
        Self::new(Tech::default())
    }
}

/// The state of one module under construction.
///
/// Delegates geometry to a [`LayoutBuilder`], connectivity to a
/// [`NetlistBuilder`] and behavioral Verilog to a
/// [`BehavioralModelBuilder`], keeping the first two in lock-step for
/// instances and ports.
pub struct ModuleCtx<'a> {
    inner: &'a mut SramCtx,
    pub(crate) tech: Arc<Tech>,
    name: ArcStr,
    pub(crate) layout: LayoutBuilder,
    pub(crate) netlist: NetlistBuilder,
    behavioral: BehavioralModelBuilder,
}

impl<'a> ModuleCtx<'a> {
    fn new(inner: &'a mut SramCtx, name: ArcStr) -> Self {
        let tech = inner.tech.clone();
        Self {
            inner,
            tech,
            netlist: NetlistBuilder::new(name.clone()),
            name,
            layout: LayoutBuilder::new(),
            behavioral: BehavioralModelBuilder::default(),
        }
    }

    pub fn tech(&self) -> &Tech {
        &self.tech
    }

    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Generates (or reuses) a child module and wraps it in an unplaced instance.
    pub fn instantiate<C: Component>(&mut self, params: &C::Params) -> Result<Instance> {
        let module = self.inner.instantiate::<C>(params)?;
        Ok(Instance::new(module))
    }

    /// Adds a placed, fully connected instance.
    pub fn add_instance(&mut self, inst: Instance) -> Result<()> {
        self.netlist.add_instance(&inst)?;
        self.layout.add_instance(inst);
        Ok(())
    }

    pub fn add_rect(&mut self, layer: Layer, rect: Rect) {
        self.layout.add_shape(Shape::new(layer, rect));
    }

    pub fn add_shape(&mut self, shape: Shape) {
        self.layout.add_shape(shape);
    }

    /// Declares a port and gives it one shape.
    pub fn add_pin(
        &mut self,
        name: impl Into<ArcStr>,
        direction: Direction,
        layer: Layer,
        rect: Rect,
    ) -> Result<()> {
        let name = name.into();
        self.netlist.add_port(name.clone(), direction)?;
        self.layout.add_port_shape(name, Shape::new(layer, rect));
        Ok(())
    }

    /// Declares a port without geometry; shapes must be added before the
    /// module is finished.
    pub fn declare_port(&mut self, name: impl Into<ArcStr>, direction: Direction) -> Result<()> {
        self.netlist.add_port(name, direction)
    }

    /// Adds a shape to a previously declared port.
    pub fn add_port_shape(&mut self, name: impl Into<ArcStr>, shape: Shape) -> Result<()> {
        let name = name.into();
        if !self.netlist.has_port(&name) {
            return Err(Error::PortNotFound {
                module: self.name.clone(),
                port: name,
            });
        }
        self.layout.add_port_shape(name, shape);
        Ok(())
    }

    /// Re-exports port `pin` of `inst` as port `name` of this module,
    /// keeping the child's direction.
    pub fn expose_pin(&mut self, inst: &Instance, pin: &str, name: impl Into<ArcStr>) -> Result<()> {
        let direction = inst.module().port_direction(pin)?;
        self.expose_pin_as(inst, pin, name, direction)
    }

    /// Re-exports port `pin` of `inst` with an explicit direction.
    pub fn expose_pin_as(
        &mut self,
        inst: &Instance,
        pin: &str,
        name: impl Into<ArcStr>,
        direction: Direction,
    ) -> Result<()> {
        let name = name.into();
        let port = inst.port(pin)?;
        self.netlist.add_port(name.clone(), direction)?;
        for shape in port.shapes() {
            self.layout.add_port_shape(name.clone(), *shape);
        }
        Ok(())
    }

    pub fn set_raw_spice(&mut self, body: impl Into<String>) {
        self.netlist.set_raw(body);
    }

    pub fn set_verilog(&mut self, verilog: impl Into<String>) {
        self.behavioral.set_verilog(verilog);
    }

    /// The bounding rectangle of everything drawn so far.
    pub fn brect(&self) -> Rect {
        self.layout.brect()
    }

    /// Freezes the module.
    ///
    /// Fails if a declared port never received geometry.
    pub(crate) fn finish(self) -> Result<Module> {
        for port in self.netlist.port_names() {
            if self.layout.port(port).map_or(true, |p| p.is_empty()) {
                return Err(Error::MissingPinGeometry {
                    module: self.name.clone(),
                    port: port.clone(),
                });
            }
        }
        Ok(Module::new(
            self.name,
            self.layout.build(),
            self.netlist.build(),
            self.behavioral.build(),
        ))
    }
}
