//! LEF abstracts.
//!
//! A macro carries the module's outline and the geometry of every port.
//! Metal layers without pin shapes are obstructed over the whole outline;
//! layers with pins are left open so that the router can reach them.

use std::path::Path;
use std::sync::Arc;

use lef21::{
    LefDbuPerMicron, LefGeometry, LefLayerGeometries, LefLayerGeometriesBuilder,
    LefLibrary, LefLibraryBuilder, LefMacroBuilder, LefPin, LefPinDirection, LefPinUse,
    LefPoint, LefPortBuilder, LefPortClass, LefShape, LefSymmetry, LefUnits,
};

use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::geom::{BoundBox, Point, Rect};
use crate::layout::Shape;
use crate::module::Module;
use crate::schematic::Direction;
use crate::tech::{Layer, Tech, TOP_METAL};

fn lef_err(e: impl std::fmt::Debug) -> Error {
    Error::Lef(format!("{e:?}"))
}

struct Exporter {
    dbu: Decimal,
}

impl Exporter {
    fn decimal(&self, x: i64) -> Decimal {
        (Decimal::from(x) / self.dbu).normalize()
    }

    fn point(&self, p: Point) -> LefPoint {
        LefPoint::new(self.decimal(p.x), self.decimal(p.y))
    }

    fn rect(&self, r: Rect) -> LefShape {
        LefShape::Rect(self.point(r.ll()), self.point(r.ur()))
    }

    fn layer_geometries(&self, layer: Layer, rects: &[Rect]) -> Result<LefLayerGeometries> {
        LefLayerGeometriesBuilder::default()
            .layer_name(layer.to_string())
            .geometries(
                rects
                    .iter()
                    .map(|r| LefGeometry::Shape(self.rect(*r)))
                    .collect::<Vec<_>>(),
            )
            .vias([])
            .build()
            .map_err(lef_err)
    }

    fn pin(&self, name: &str, direction: Direction, shapes: &[Shape]) -> Result<LefPin> {
        let mut layers = Vec::new();
        for level in 1..=TOP_METAL {
            let layer = Layer::Metal(level);
            let rects: Vec<Rect> = shapes
                .iter()
                .filter(|s| s.layer == layer)
                .map(|s| s.rect)
                .collect();
            if !rects.is_empty() {
                layers.push(self.layer_geometries(layer, &rects)?);
            }
        }
        let port = LefPortBuilder::default()
            .class(LefPortClass::None)
            .layers(layers)
            .build()
            .map_err(lef_err)?;
        let (direction, use_) = match direction {
            Direction::Input => (LefPinDirection::Input, LefPinUse::Signal),
            Direction::Output => (LefPinDirection::Output { tristate: false }, LefPinUse::Signal),
            Direction::InOut => (LefPinDirection::Inout, LefPinUse::Signal),
            Direction::Power => (LefPinDirection::Inout, LefPinUse::Power),
            Direction::Ground => (LefPinDirection::Inout, LefPinUse::Ground),
        };
        Ok(LefPin {
            name: name.to_string(),
            ports: vec![port],
            direction: Some(direction),
            use_: Some(use_),
            ..Default::default()
        })
    }
}

/// Builds a single-macro LEF library for `module`.
pub fn to_lef(module: &Module, tech: &Tech) -> Result<LefLibrary> {
    let dbu = u32::try_from(tech.dbu_per_micron)
        .map_err(|_| Error::config("lef", "dbu_per_micron does not fit in 32 bits"))?;
    let exporter = Exporter {
        dbu: Decimal::from(dbu),
    };
    let brect = module.brect();

    let mut pins = Vec::with_capacity(module.netlist().num_ports());
    let mut pin_layers = Vec::new();
    for (name, direction) in module.netlist().ports() {
        let port = module.port(name)?;
        if port.is_empty() {
            return Err(Error::MissingPinGeometry {
                module: module.name().clone(),
                port: name.clone(),
            });
        }
        pin_layers.extend(port.shapes().iter().map(|s| s.layer));
        pins.push(exporter.pin(name, direction, port.shapes())?);
    }

    let mut obs = Vec::new();
    for level in 1..=TOP_METAL {
        let layer = Layer::Metal(level);
        if !pin_layers.contains(&layer) {
            obs.push(exporter.layer_geometries(layer, &[brect])?);
        }
    }

    // The macro origin is the lower-left corner of the outline.
    let origin = Point::new(-brect.left(), -brect.bottom());
    let makro = LefMacroBuilder::default()
        .name(module.name().as_str())
        .pins(pins)
        .obs(obs)
        .origin(exporter.point(origin))
        .size((exporter.decimal(brect.width()), exporter.decimal(brect.height())))
        .symmetry([LefSymmetry::X, LefSymmetry::Y])
        .build()
        .map_err(lef_err)?;

    let units = LefUnits {
        database_microns: Some(LefDbuPerMicron(dbu)),
        ..Default::default()
    };

    LefLibraryBuilder::default()
        .macros([makro])
        .bus_bit_chars(('[', ']'))
        .divider_char('/')
        .units(units)
        .vias(lef21::Unsupported)
        .sites([])
        .build()
        .map_err(lef_err)
}

pub fn save_lef(module: &Arc<Module>, tech: &Tech, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    super::create_parent(path)?;
    to_lef(module, tech)?.save(path).map_err(lef_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::blocks::split_merge::{SplitMergeControl, SplitMergeControlParams};
    use crate::context::SramCtx;
    use crate::paths::out_lef;
    use crate::tests::test_work_dir;

    #[test]
    fn test_lef_macro() {
        let mut ctx = SramCtx::default();
        let smc = ctx
            .instantiate::<SplitMergeControl>(&SplitMergeControlParams {
                num_banks: 2,
                gated: false,
            })
            .unwrap();
        let lib = to_lef(&smc, ctx.tech()).unwrap();
        assert_eq!(lib.macros.len(), 1);
        let makro = &lib.macros[0];
        assert_eq!(makro.name, smc.name().as_str());
        assert_eq!(makro.pins.len(), smc.netlist().num_ports());

        let (w, h) = makro.size.unwrap();
        assert_eq!(w * dec!(1000), Decimal::from(smc.width()));
        assert_eq!(h * dec!(1000), Decimal::from(smc.height()));

        let vdd = makro.pins.iter().find(|p| p.name == "vdd").unwrap();
        assert_eq!(vdd.use_, Some(LefPinUse::Power));
        let ack = makro.pins.iter().find(|p| p.name == "ack").unwrap();
        assert_eq!(ack.direction, Some(LefPinDirection::Output { tristate: false }));

        let work_dir = test_work_dir("test_lef_macro");
        save_lef(&smc, ctx.tech(), out_lef(&work_dir, smc.name())).unwrap();
    }
}
