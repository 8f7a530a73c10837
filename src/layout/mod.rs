//! Layout construction: shapes, ports, placement and routing.

use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::geom::{Bbox, BoundBox, Rect, Transformation};
use crate::module::Instance;
use crate::tech::Layer;

pub mod align;
pub mod bus;
pub mod channel;
pub mod power;
pub mod route;
pub mod row;
pub mod tiler;
pub mod via;

/// A rectangle drawn on a layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub layer: Layer,
    pub rect: Rect,
}

impl Shape {
    pub fn new(layer: Layer, rect: Rect) -> Self {
        Self { layer, rect }
    }

    pub fn transform(&self, t: &Transformation) -> Self {
        Self {
            layer: self.layer,
            rect: self.rect.transform(t),
        }
    }
}

/// The geometry of one named port.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Port {
    name: ArcStr,
    shapes: Vec<Shape>,
}

impl Port {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            shapes: Vec::new(),
        }
    }

    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn add(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// The largest shape of the port.
    ///
    /// # Panics
    ///
    /// Panics if the port has no shapes; finished modules never do.
    pub fn largest(&self) -> Shape {
        *self
            .shapes
            .iter()
            .max_by_key(|s| s.rect.area())
            .unwrap_or_else(|| panic!("port `{}` has no shapes", self.name))
    }

    /// The largest rectangle of the port.
    pub fn largest_rect(&self) -> Rect {
        self.largest().rect
    }

    /// The largest shape of the port on `layer`.
    pub fn shape_on(&self, layer: Layer) -> Option<Shape> {
        self.shapes
            .iter()
            .filter(|s| s.layer == layer)
            .max_by_key(|s| s.rect.area())
            .copied()
    }

    pub fn transform(&self, t: &Transformation) -> Self {
        Self {
            name: self.name.clone(),
            shapes: self.shapes.iter().map(|s| s.transform(t)).collect(),
        }
    }
}

impl BoundBox for Port {
    fn bbox(&self) -> Bbox {
        let mut bbox = Bbox::empty();
        for s in self.shapes.iter() {
            bbox.add_rect(s.rect);
        }
        bbox
    }
}

/// The finished layout of a module, in local coordinates.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    elems: Vec<Shape>,
    insts: Vec<Instance>,
    ports: IndexMap<ArcStr, Port>,
    bbox: Bbox,
}

impl Layout {
    pub fn elems(&self) -> &[Shape] {
        &self.elems
    }

    pub fn insts(&self) -> &[Instance] {
        &self.insts
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.get(name)
    }
}

impl BoundBox for Layout {
    fn bbox(&self) -> Bbox {
        self.bbox
    }
}

/// Accumulates geometry while a module is being generated.
#[derive(Debug, Default)]
pub struct LayoutBuilder {
    elems: Vec<Shape>,
    insts: Vec<Instance>,
    ports: IndexMap<ArcStr, Port>,
    bbox: Bbox,
}

impl LayoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_shape(&mut self, shape: Shape) {
        self.bbox.add_rect(shape.rect);
        self.elems.push(shape);
    }

    pub fn add_instance(&mut self, inst: Instance) {
        self.bbox = self.bbox.union(inst.bbox());
        self.insts.push(inst);
    }

    /// Adds a shape to a port, creating the port if needed.
    pub fn add_port_shape(&mut self, name: ArcStr, shape: Shape) {
        self.bbox.add_rect(shape.rect);
        self.ports
            .entry(name.clone())
            .or_insert_with(|| Port::new(name))
            .add(shape);
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.get(name)
    }

    pub fn insts(&self) -> &[Instance] {
        &self.insts
    }

    pub fn build(self) -> Layout {
        Layout {
            elems: self.elems,
            insts: self.insts,
            ports: self.ports,
            bbox: self.bbox,
        }
    }
}

impl BoundBox for LayoutBuilder {
    fn bbox(&self) -> Bbox {
        self.bbox
    }
}
