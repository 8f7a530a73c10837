//! A ring of header switches around an SRAM.
//!
//! The core runs from a virtual supply `vvdd`. Rows of [`SleepTx`] cells
//! along the bottom and top edges and columns of rotated cells along the
//! left and right edges connect `vvdd` to the global `vdd` while `sleep` is
//! low. Every cell keeps `vdd` on the outside of the ring and `vvdd` on the
//! inside; metal2 jumpers join the strips at the corners. Signal pins cross
//! the bottom strip on metal2.

use arcstr::ArcStr;

use super::{Sram, SramParams};
use crate::blocks::bank::layout::gaps;
use crate::cells::SleepTx;
use crate::component::{Component, NoParams};
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{NamedOrientation, Point, Rect};
use crate::layout::align::AlignRect;
use crate::layout::Shape;
use crate::module::Instance;
use crate::tech::{Layer, Tech, M1, M2, M4};

pub struct PowerGateSram {
    params: SramParams,
}

const RING_NETS: [&str; 3] = ["vdd", "vvdd", "sleep"];

/// Joins a rail of a horizontal strip to the same rail of a vertical strip.
fn jumper(ctx: &mut ModuleCtx, horiz: Rect, vert: Rect) -> Result<()> {
    let x = vert.center().x;
    let yh = horiz.center().y;
    let half = vert.width() / 2;
    let yv = if vert.center().y > yh {
        vert.bottom() + half
    } else {
        vert.top() - half
    };
    ctx.add_straight(M2, Point::new(x, yh), Point::new(x, yv))?;
    ctx.add_via_at(M1, M2, Point::new(x, yh))?;
    ctx.add_via_at(M1, M2, Point::new(x, yv))?;
    Ok(())
}

fn rails(cells: &[Instance], net: &str) -> Result<Vec<Shape>> {
    cells.iter().map(|c| Ok(c.port(net)?.largest())).collect()
}

impl Component for PowerGateSram {
    type Params = SramParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        if !params.power_gate {
            return Err(Error::config(
                "power_gate_sram",
                "the wrapped SRAM must be built with power gating enabled",
            ));
        }
        params.validate()?;
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("power_gate_{}", self.params.name())
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let tech = ctx.tech.clone();
        let (g, _) = gaps(&tech);
        let ports = self.params.ports();
        for (name, dir) in ports.iter() {
            ctx.declare_port(name.as_str(), *dir)?;
        }

        let tx = ctx.instantiate::<SleepTx>(&NoParams)?;
        let s = tx.module().width();
        let mut core = ctx.instantiate::<Sram>(&self.params)?;
        core.set_name("core");
        let (cw, ch) = (core.module().width(), core.module().height());
        let nx = (cw + 2 * g + s - 1) / s + 2;
        let ny = ((ch + 2 * g + s - 1) / s + 2).max(5);
        let (w, h) = (nx * s, ny * s);
        let inner = Rect::from_sides(s + g, s + g, w - s - g, h - s - g);
        core.align_left(inner);
        core.align_bottom(inner);

        let cell = |name: String, orientation: NamedOrientation, x: i64, y: i64| {
            let mut t = tx
                .clone()
                .named(name)
                .with_orientation(orientation)
                .with_connections(RING_NETS.map(|n| (n, n)));
            let slot = Rect::ll_wh(x, y, s, s);
            t.align_left(slot);
            t.align_bottom(slot);
            t
        };
        let bottom: Vec<Instance> = (0..nx)
            .map(|i| cell(format!("tx_b{i}"), NamedOrientation::ReflectVert, i * s, 0))
            .collect();
        let top: Vec<Instance> = (0..nx)
            .map(|i| cell(format!("tx_t{i}"), NamedOrientation::R0, i * s, h - s))
            .collect();
        // The side columns stop one cell short of the corners so that
        // their rails never touch the rails of the other net.
        let left: Vec<Instance> = (2..ny - 2)
            .map(|j| cell(format!("tx_l{j}"), NamedOrientation::R90, 0, j * s))
            .collect();
        let right: Vec<Instance> = (2..ny - 2)
            .map(|j| cell(format!("tx_r{j}"), NamedOrientation::R270, w - s, j * s))
            .collect();

        let corners = [
            (&bottom[0], &left[0]),
            (&bottom[bottom.len() - 1], &right[0]),
            (&top[0], &left[left.len() - 1]),
            (&top[top.len() - 1], &right[right.len() - 1]),
        ];
        for (horiz, vert) in corners {
            for net in RING_NETS {
                jumper(
                    ctx,
                    horiz.port(net)?.largest_rect(),
                    vert.port(net)?.largest_rect(),
                )?;
            }
        }

        // Extend the core supply strap onto the inner rails of both strips.
        let strap = core
            .port("vdd")?
            .shape_on(M4)
            .ok_or_else(|| Error::Routing("core has no metal4 supply strap".into()))?
            .rect;
        let bottom_vvdd = rails(&bottom, "vvdd")?;
        let top_vvdd = rails(&top, "vvdd")?;
        let (lo, hi) = (bottom_vvdd[0].rect.bottom(), top_vvdd[0].rect.top());
        ctx.add_strap(
            M4,
            Rect::from_sides(strap.left(), lo, strap.right(), strap.bottom()),
            &bottom_vvdd,
        )?;
        ctx.add_strap(
            M4,
            Rect::from_sides(strap.left(), strap.top(), strap.right(), hi),
            &top_vvdd,
        )?;

        // The corner jumpers overhang the ring, so the outline grows to
        // cover them and the signal stubs run down to its bottom edge.
        let outline = ctx.brect().union(Rect::from_sides(0, 0, w, h));
        let sleep_y = bottom[0].port("sleep")?.largest_rect().center().y;
        for (name, _) in ports.iter() {
            match name.as_str() {
                "vdd" => {
                    core.connect("vdd", "vvdd");
                    let rw = tech.width(M1);
                    ctx.add_port_shape("vdd", Shape::new(M1, Rect::from_sides(0, 0, w, rw)))?;
                }
                "gnd" => {
                    core.connect("gnd", "gnd");
                    ctx.expose_pin(&core, "gnd", "gnd")?;
                }
                _ => {
                    core.connect(name.as_str(), name.as_str());
                    let stub = core.port(name)?.largest();
                    let ext = Rect::from_sides(
                        stub.rect.left(),
                        outline.bottom(),
                        stub.rect.right(),
                        stub.rect.top(),
                    );
                    ctx.add_rect(stub.layer, ext);
                    ctx.add_port_shape(name.as_str(), Shape::new(stub.layer, ext))?;
                    if name == "sleep" {
                        ctx.add_via_at(M1, stub.layer, Point::new(stub.rect.center().x, sleep_y))?;
                    }
                }
            }
        }

        ctx.add_rect(Layer::Boundary, outline);
        ctx.set_verilog(crate::verilog::generate_sram_verilog(&self.name(), &self.params)?);
        for inst in bottom.into_iter().chain(top).chain(left).chain(right) {
            ctx.add_instance(inst)?;
        }
        ctx.add_instance(core)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::sram::SramParamsBuilder;
    use crate::context::SramCtx;
    use crate::geom::BoundBox;

    fn params() -> SramParams {
        SramParamsBuilder::default()
            .word_size(4)
            .num_rows(16)
            .power_gate(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_ring_surrounds_core() {
        let mut ctx = SramCtx::default();
        let module = ctx.instantiate::<PowerGateSram>(&params()).unwrap();
        let sram = ctx.instantiate::<Sram>(&params()).unwrap();
        let s = ctx.instantiate::<SleepTx>(&NoParams).unwrap().width();

        let stats = crate::validate::validate(&module).unwrap();
        let nx = module.width() / s;
        let ny = module.height() / s;
        assert_eq!(stats.count("sleep_tx"), (2 * nx + 2 * (ny - 4)) as usize);
        assert_eq!(stats.count(sram.name()), 1);
        assert!(module.width() > sram.width() + 2 * s);

        let ports: Vec<String> = module.netlist().port_names().map(|p| p.to_string()).collect();
        let expected: Vec<String> = params().ports().into_iter().map(|(p, _)| p).collect();
        assert_eq!(ports, expected);
        let outline = crate::validate::outline(&module).unwrap();
        assert_eq!(outline, module.brect());
        assert_eq!(module.port("sleep").unwrap().largest_rect().bottom(), outline.bottom());
    }

    #[test]
    fn test_requires_power_gating() {
        let mut ctx = SramCtx::default();
        let params = SramParams {
            power_gate: false,
            ..params()
        };
        let err = ctx.instantiate::<PowerGateSram>(&params).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
