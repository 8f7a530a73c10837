//! Structural checks over a finished module tree.
//!
//! These checks cover what can be verified without extracting geometric
//! connectivity: positional arity of every instantiation, containment of
//! child geometry, presence of pin geometry, and uniqueness of module names.
//! Geometric connectivity is left to external LVS.

use std::collections::HashMap;
use std::sync::Arc;

use arcstr::ArcStr;

use crate::error::{Error, Result};
use crate::geom::{BoundBox, Rect};
use crate::module::Module;
use crate::tech::Layer;

/// Counts gathered while validating a module tree.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct TreeStats {
    /// Distinct modules in the tree, including the root.
    pub modules: usize,
    /// Instances of each module, flattened through the hierarchy.
    pub instances: HashMap<ArcStr, usize>,
}

impl TreeStats {
    pub fn count(&self, module: &str) -> usize {
        self.instances.get(module).copied().unwrap_or_default()
    }
}

/// Runs every structural check on `top` and all of its descendants.
pub fn validate(top: &Arc<Module>) -> Result<TreeStats> {
    let mut seen: HashMap<ArcStr, *const Module> = HashMap::new();
    check_module(top, &mut seen)?;
    let mut stats = TreeStats {
        modules: seen.len(),
        ..Default::default()
    };
    count_instances(top, 1, &mut stats.instances);
    Ok(stats)
}

fn check_module(module: &Arc<Module>, seen: &mut HashMap<ArcStr, *const Module>) -> Result<()> {
    let ptr = Arc::as_ptr(module);
    match seen.get(module.name()) {
        Some(&p) if p == ptr => return Ok(()),
        Some(_) => return Err(Error::DuplicateName(module.name().clone())),
        None => {
            seen.insert(module.name().clone(), ptr);
        }
    }

    check_arity(module)?;
    check_pins(module)?;
    check_containment(module)?;

    for inst in module.netlist().instances() {
        check_module(inst.module(), seen)?;
    }
    Ok(())
}

/// Every instantiation binds exactly as many nets as the child has ports.
pub fn check_arity(module: &Module) -> Result<()> {
    for inst in module.netlist().instances() {
        let expected = inst.module().netlist().num_ports();
        if inst.nets().len() != expected {
            return Err(Error::Validation(format!(
                "{}: instance {} of {} binds {} nets but the child has {} ports",
                module.name(),
                inst.name(),
                inst.module().name(),
                inst.nets().len(),
                expected
            )));
        }
    }
    if module.netlist().instances().len() != module.layout().insts().len() {
        return Err(Error::Validation(format!(
            "{}: {} netlist instances but {} placed instances",
            module.name(),
            module.netlist().instances().len(),
            module.layout().insts().len()
        )));
    }
    Ok(())
}

/// Every declared port has geometry and every drawn port has a declaration.
pub fn check_pins(module: &Module) -> Result<()> {
    for name in module.netlist().port_names() {
        match module.layout().port(name) {
            Some(port) if !port.is_empty() => {}
            _ => {
                return Err(Error::MissingPinGeometry {
                    module: module.name().clone(),
                    port: name.clone(),
                })
            }
        }
    }
    for port in module.layout().ports() {
        if !module.has_port(port.name()) {
            return Err(Error::Validation(format!(
                "{}: pin geometry for undeclared port {}",
                module.name(),
                port.name()
            )));
        }
        for shape in port.shapes() {
            if !shape.rect.is_valid() {
                return Err(Error::Validation(format!(
                    "{}: port {} has a degenerate shape {:?}",
                    module.name(),
                    port.name(),
                    shape.rect
                )));
            }
        }
    }
    Ok(())
}

/// The module's outline: the union of the shapes on its boundary layer.
pub fn outline(module: &Module) -> Option<Rect> {
    Rect::union_all(
        module
            .layout()
            .elems()
            .iter()
            .filter(|s| s.layer == Layer::Boundary)
            .map(|s| s.rect),
    )
}

/// Every drawn shape, pin shape and placed child lies within the outline.
pub fn check_containment(module: &Module) -> Result<()> {
    let outer = outline(module)
        .ok_or_else(|| Error::Validation(format!("{}: no boundary shape", module.name())))?;
    let escapes = |what: String, r: Rect| {
        Error::Validation(format!(
            "{}: {what} at {r:?} escapes the outline {outer:?}",
            module.name()
        ))
    };
    for shape in module.layout().elems() {
        if !outer.contains(&shape.rect) {
            return Err(escapes(format!("{} shape", shape.layer), shape.rect));
        }
    }
    for port in module.layout().ports() {
        for shape in port.shapes() {
            if !outer.contains(&shape.rect) {
                return Err(escapes(format!("pin {}", port.name()), shape.rect));
            }
        }
    }
    for inst in module.layout().insts() {
        let brect = inst.brect();
        if !outer.contains(&brect) {
            return Err(escapes(format!("instance {}", inst.name()), brect));
        }
    }
    Ok(())
}

fn count_instances(module: &Module, mult: usize, counts: &mut HashMap<ArcStr, usize>) {
    for inst in module.netlist().instances() {
        *counts.entry(inst.module().name().clone()).or_default() += mult;
        count_instances(inst.module(), mult, counts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::Bitcell;
    use crate::component::{Component, NoParams};
    use crate::context::{ModuleCtx, SramCtx};
    use crate::geom::Point;
    use crate::tech::Tech;

    #[test]
    fn test_leaf_cell_is_valid() {
        let mut ctx = SramCtx::default();
        let bitcell = ctx.instantiate::<Bitcell>(&NoParams).unwrap();
        let stats = validate(&bitcell).unwrap();
        assert_eq!(stats.modules, 1);
        assert!(stats.instances.is_empty());
    }

    struct Stray;

    impl Component for Stray {
        type Params = NoParams;

        fn new(_params: &Self::Params, _tech: &Tech) -> Result<Self> {
            Ok(Self)
        }

        fn name(&self) -> ArcStr {
            arcstr::literal!("stray")
        }

        fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
            ctx.add_rect(Layer::Boundary, Rect::from_sides(0, 0, 1_000, 1_000));
            let mut cell = ctx.instantiate::<Bitcell>(&NoParams)?;
            cell.set_name("cell");
            cell.set_loc(Point::new(1_000_000, 1_000_000));
            for port in ["bl", "br", "wl", "vdd", "gnd"] {
                cell.connect(port, port);
            }
            ctx.add_instance(cell)?;
            Ok(())
        }
    }

    #[test]
    fn test_escaping_instance_is_rejected() {
        let mut ctx = SramCtx::default();
        let stray = ctx.instantiate::<Stray>(&NoParams).unwrap();
        assert_eq!(outline(&stray), Some(Rect::from_sides(0, 0, 1_000, 1_000)));
        let err = validate(&stray).unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.contains("instance cell")));
    }
}
