//! GDSII export through `gds21`.
//!
//! Every module becomes one struct. Instances become struct references,
//! drawn shapes and pin shapes become boundaries, and every pin shape gets
//! a text label at its lower-left corner. Timestamps are fixed so that the
//! same module tree always produces the same bytes.

use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use gds21::{
    GdsBoundary, GdsDateTimes, GdsElement, GdsLibrary, GdsPoint, GdsStrans, GdsStruct,
    GdsStructRef, GdsTextElem, GdsUnits,
};

use crate::error::{Error, Result};
use crate::geom::{Point, Rect, Rotation};
use crate::layout::Shape;
use crate::module::{Instance, Module};
use crate::tech::Tech;

fn timestamp() -> Result<GdsDateTimes> {
    let t: NaiveDateTime = NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Error::Gds("invalid fixed timestamp".into()))?;
    Ok(GdsDateTimes {
        modified: t,
        accessed: t,
    })
}

fn coord(x: i64) -> Result<i32> {
    i32::try_from(x).map_err(|_| Error::Gds(format!("coordinate {x} does not fit in 32 bits")))
}

fn point(p: Point) -> Result<GdsPoint> {
    Ok(GdsPoint::new(coord(p.x)?, coord(p.y)?))
}

fn boundary(tech: &Tech, shape: &Shape) -> Result<GdsElement> {
    let gl = tech.gds_layer(shape.layer);
    let r: Rect = shape.rect;
    let xy = [r.ll(), r.lr(), r.ur(), r.ul(), r.ll()]
        .into_iter()
        .map(point)
        .collect::<Result<Vec<_>>>()?;
    Ok(GdsElement::GdsBoundary(GdsBoundary {
        layer: gl.layer,
        datatype: gl.datatype,
        xy,
        ..Default::default()
    }))
}

fn label(tech: &Tech, name: &str, shape: &Shape) -> Result<GdsElement> {
    let gl = tech.gds_layer(shape.layer);
    Ok(GdsElement::GdsTextElem(GdsTextElem {
        string: name.to_string(),
        layer: gl.layer,
        texttype: gl.datatype,
        xy: point(shape.rect.ll())?,
        ..Default::default()
    }))
}

fn reference(inst: &Instance) -> Result<GdsElement> {
    let o = inst.orientation();
    let angle = match o.rotation() {
        Rotation::R0 => None,
        r => Some(r.degrees() as f64),
    };
    let strans = if o.reflect_vert() || angle.is_some() {
        Some(GdsStrans {
            reflected: o.reflect_vert(),
            angle,
            ..Default::default()
        })
    } else {
        None
    };
    Ok(GdsElement::GdsStructRef(GdsStructRef {
        name: inst.module().name().to_string(),
        xy: point(inst.loc())?,
        strans,
        ..Default::default()
    }))
}

fn convert_module(tech: &Tech, module: &Module) -> Result<GdsStruct> {
    let layout = module.layout();
    let mut elems = Vec::new();
    for inst in layout.insts() {
        elems.push(reference(inst)?);
    }
    for shape in layout.elems() {
        elems.push(boundary(tech, shape)?);
    }
    for port in layout.ports() {
        for shape in port.shapes() {
            elems.push(boundary(tech, shape)?);
            elems.push(label(tech, port.name(), shape)?);
        }
    }
    let mut s = GdsStruct::new(module.name().as_str());
    s.dates = timestamp()?;
    s.elems = elems;
    Ok(s)
}

/// Converts `top` and everything below it into a GDS library named after
/// `top`, children first.
pub fn to_gds(top: &Arc<Module>, tech: &Tech) -> Result<GdsLibrary> {
    let mut lib = GdsLibrary::new(top.name().as_str());
    let dbu = tech.dbu_per_micron as f64;
    lib.units = GdsUnits::new(1.0 / dbu, 1e-6 / dbu);
    lib.dates = timestamp()?;
    lib.structs = super::post_order(top, |m| {
        m.layout()
            .insts()
            .iter()
            .map(|i| i.module().clone())
            .collect()
    })
    .iter()
    .map(|m| convert_module(tech, m))
    .collect::<Result<Vec<_>>>()?;
    Ok(lib)
}

pub fn save_gds(top: &Arc<Module>, tech: &Tech, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    super::create_parent(path)?;
    let lib = to_gds(top, tech)?;
    lib.save(path).map_err(|e| Error::Gds(format!("{e:?}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::spice;
    use crate::blocks::lfsr::{Lfsr, LfsrParams};
    use crate::context::SramCtx;
    use crate::paths::out_gds;
    use crate::tests::test_work_dir;

    #[test]
    fn test_gds_structs_and_labels() {
        let mut ctx = SramCtx::default();
        let lfsr = ctx.instantiate::<Lfsr>(&LfsrParams { size: 4 }).unwrap();
        let lib = to_gds(&lfsr, ctx.tech()).unwrap();

        let last = lib.structs.last().unwrap();
        assert_eq!(last.name, "lfsr_4");
        let names: Vec<&str> = lib.structs.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"dff"));
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());

        let labels: Vec<&str> = last
            .elems
            .iter()
            .filter_map(|e| match e {
                GdsElement::GdsTextElem(t) => Some(t.string.as_str()),
                _ => None,
            })
            .collect();
        for pin in ["clk", "reset", "up", "q[3]", "vdd", "gnd"] {
            assert!(labels.contains(&pin), "missing label {pin}");
        }
    }

    #[test]
    fn test_output_is_deterministic() {
        let work_dir = test_work_dir("test_output_is_deterministic");
        let mut outputs = Vec::new();
        for run in 0..2 {
            let mut ctx = SramCtx::default();
            let lfsr = ctx.instantiate::<Lfsr>(&LfsrParams { size: 5 }).unwrap();
            let path = out_gds(&work_dir, &format!("lfsr_{run}"));
            save_gds(&lfsr, ctx.tech(), &path).unwrap();
            let gds = std::fs::read(&path).unwrap();
            let netlist = spice::netlist_string(&lfsr).unwrap();
            outputs.push((gds, netlist));
        }
        assert_eq!(outputs[0], outputs[1]);
    }
}
