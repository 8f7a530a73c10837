//! Address decoders.
//!
//! A [`RowDecoder`] splits its address into groups of two or three bits.
//! Each group is fully decoded by a [`Predecoder`]; every row then ANDs one
//! predecoded line from each group with a final `nand2`/`nand3` and an
//! inverter.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::cells::{Gate, GateKind};
use crate::component::Component;
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{BoundBox, Mirror, Point, Rect, Side, Span};
use crate::layout::channel::ChannelPlan;
use crate::layout::row::GateRow;
use crate::layout::Shape;
use crate::schematic::Direction;
use crate::tech::{Layer, Tech, M1, M2, M3};
use crate::{bus_bit, clog2};

pub mod select;

pub use select::{SelectDecoder, SelectDecoderParams};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PredecoderParams {
    pub bits: usize,
}

/// A full decoder of one to three address bits.
///
/// Pins: `a[bits]` entering from the bottom edge, `out[2^bits]` leaving
/// from the top edge, `vdd`, `gnd`.
pub struct Predecoder {
    params: PredecoderParams,
}

impl Component for Predecoder {
    type Params = PredecoderParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        if !(1..=3).contains(&params.bits) {
            return Err(Error::config(
                "predecoder",
                format!("predecoders take 1 to 3 bits, got {}", params.bits),
            ));
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("predecoder_{}", self.params.bits)
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let bits = self.params.bits;
        let mut row = GateRow::new();
        let addr: Vec<String> = (0..bits).map(|i| bus_bit("a", i)).collect();
        let outs: Vec<String> = (0..1 << bits).map(|k| bus_bit("out", k)).collect();

        if bits == 1 {
            row.push_gate(ctx, GateKind::Inv, "inv_0", &[&addr[0], &outs[0]])?;
            row.push_gate(ctx, GateKind::Inv, "inv_1", &[&outs[0], &outs[1]])?;
        } else {
            let comp: Vec<String> = (0..bits).map(|i| format!("a_b{i}")).collect();
            for i in 0..bits {
                row.push_gate(ctx, GateKind::Inv, format!("inv_{i}"), &[&addr[i], &comp[i]])?;
            }
            let kind = if bits == 2 {
                GateKind::Nand2
            } else {
                GateKind::Nand3
            };
            for (k, out) in outs.iter().enumerate() {
                let outb = format!("out_b{k}");
                let mut nets: Vec<&str> = (0..bits)
                    .map(|i| {
                        if (k >> i) & 1 == 1 {
                            addr[i].as_str()
                        } else {
                            comp[i].as_str()
                        }
                    })
                    .collect();
                nets.push(&outb);
                row.push_gate(ctx, kind, format!("nand_{k}"), &nets)?;
                row.push_gate(ctx, GateKind::Inv, format!("drv_{k}"), &[&outb, out])?;
            }
        }

        for a in addr {
            row.expose_on(a, Direction::Input, Side::Bot);
        }
        for out in outs {
            row.expose(out, Direction::Output);
        }
        row.finish(ctx, Point::zero())?;
        Ok(())
    }
}

/// How the address bits of a row decoder are grouped, least significant
/// group first.
pub fn decoder_groups(bits: usize) -> Result<Vec<usize>> {
    let groups = match bits {
        4 => vec![2, 2],
        5 => vec![3, 2],
        6 => vec![3, 3],
        7 => vec![3, 2, 2],
        8 => vec![3, 3, 2],
        9 => vec![3, 3, 3],
        _ => {
            return Err(Error::config(
                "row_decoder",
                format!("row decoders take 4 to 9 address bits, got {bits}"),
            ))
        }
    };
    Ok(groups)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RowDecoderParams {
    pub rows: usize,
}

/// A hierarchical row decoder for 16 to 512 rows.
///
/// Predecoders sit along the bottom. Their outputs cross a channel onto
/// vertical metal2 address lines at the left edge; each row taps its lines
/// with metal3 wires at three fixed heights. Row `r`'s output `dec[r]` is a
/// metal3 wire at the row's centerline reaching the right edge.
pub struct RowDecoder {
    params: RowDecoderParams,
    groups: Vec<usize>,
}

impl RowDecoder {
    fn floorplan(&self, ctx: &mut ModuleCtx) -> Result<Floorplan> {
        let tech = ctx.tech.clone();
        let m2p = tech.pitch(M2);
        let num_lines: usize = self.groups.iter().map(|b| 1 << b).sum();
        let row_x = (num_lines as i64 + 1) * m2p;

        let mut preds = Vec::with_capacity(self.groups.len());
        let mut x = row_x;
        let mut bit = 0;
        for (k, &b) in self.groups.iter().enumerate() {
            let mut inst = ctx
                .instantiate::<Predecoder>(&PredecoderParams { bits: b })?
                .named(format!("predecoder_{k}"));
            let brect = inst.module().brect();
            inst.set_loc(Point::new(x - brect.left(), -brect.bottom()));
            for i in 0..b {
                inst.connect(bus_bit("a", i), bus_bit("a", bit + i));
            }
            for m in 0..1 << b {
                inst.connect(bus_bit("out", m), format!("pre_{k}_{m}"));
            }
            inst.connect("vdd", "vdd").connect("gnd", "gnd");
            x += brect.width();
            bit += b;
            preds.push(inst);
        }
        let pred_top = preds.iter().map(|p| p.brect().top()).max().unwrap_or_default();

        let mut lines = Vec::with_capacity(num_lines);
        for (k, &b) in self.groups.iter().enumerate() {
            for m in 0..1 << b {
                let stub = preds[k].port(&bus_bit("out", m))?.largest();
                lines.push((arcstr::format!("pre_{k}_{m}"), stub));
            }
        }
        let line_x = |l: usize| m2p / 2 + l as i64 * m2p;
        let plan = ChannelPlan::new(
            &tech,
            lines
                .iter()
                .enumerate()
                .map(|(l, (net, stub))| (net.clone(), vec![line_x(l), stub.rect.center().x])),
        );
        let channel_top = pred_top + plan.height();

        Ok(Floorplan {
            row_x,
            preds_right: x,
            preds,
            lines,
            plan,
            channel_top,
            rows_y: channel_top,
        })
    }
}

struct Floorplan {
    row_x: i64,
    preds_right: i64,
    preds: Vec<crate::module::Instance>,
    lines: Vec<(ArcStr, Shape)>,
    plan: ChannelPlan,
    channel_top: i64,
    rows_y: i64,
}

impl Component for RowDecoder {
    type Params = RowDecoderParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        if !params.rows.is_power_of_two() || !(16..=512).contains(&params.rows) {
            return Err(Error::config(
                "row_decoder",
                format!("rows must be a power of two from 16 to 512, got {}", params.rows),
            ));
        }
        let groups = decoder_groups(clog2(params.rows))?;
        Ok(Self {
            params: *params,
            groups,
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("row_decoder_{}", self.params.rows)
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let tech = ctx.tech.clone();
        let rows = self.params.rows;
        let h = tech.row_height();
        let m2p = tech.pitch(M2);
        let m3p = tech.pitch(M3);
        let fp = self.floorplan(ctx)?;
        let line_x = |l: usize| m2p / 2 + l as i64 * m2p;
        let rows_top = fp.rows_y + rows as i64 * h;

        let kind = if self.groups.len() == 2 {
            GateKind::Nand2
        } else {
            GateKind::Nand3
        };
        let row_w = kind.width(&tech) + GateKind::Inv.width(&tech);
        let width = (fp.row_x + row_w).max(fp.preds_right);

        let num_bits: usize = self.groups.iter().sum();
        for i in 0..num_bits {
            ctx.declare_port(bus_bit("a", i), Direction::Input)?;
        }
        for r in 0..rows {
            ctx.declare_port(bus_bit("dec", r), Direction::Output)?;
        }
        ctx.declare_port("vdd", Direction::Power)?;
        ctx.declare_port("gnd", Direction::Ground)?;

        // Predecoded address lines.
        for (l, (net, stub)) in fp.lines.iter().enumerate() {
            let t = fp
                .plan
                .track_of(net)
                .ok_or_else(|| Error::Routing(format!("address line `{net}` has no track")))?;
            let y = fp.plan.track_y(fp.channel_top, t);
            let line = Rect::from_spans(
                Span::from_center_span(line_x(l), tech.width(M2)),
                Span::new(y, rows_top),
            );
            ctx.add_rect(M2, line);
            fp.plan
                .route(ctx, fp.channel_top, net, &[*stub, Shape::new(M2, line)])?;
        }

        let mut bit = 0;
        for (k, pred) in fp.preds.iter().enumerate() {
            for i in 0..self.groups[k] {
                ctx.expose_pin(pred, &bus_bit("a", i), bus_bit("a", bit + i))?;
            }
            bit += self.groups[k];
        }
        for supply in ["vdd", "gnd"] {
            let rail = fp.preds[0].port(supply)?.largest_rect();
            let rail = Rect::from_sides(0, rail.bottom(), fp.preds_right, rail.top());
            ctx.add_port_shape(supply, Shape::new(M1, rail))?;
        }

        let line_offsets: Vec<usize> = self
            .groups
            .iter()
            .scan(0, |acc, &b| {
                let off = *acc;
                *acc += 1 << b;
                Some(off)
            })
            .collect();
        let tap_y = [h / 2 - m3p, h / 2, h / 2 + m3p];

        let nand = ctx.instantiate::<Gate>(&kind)?;
        let inv = ctx.instantiate::<Gate>(&GateKind::Inv)?;
        for r in 0..rows {
            let mirrored = r % 2 == 1;
            let (mirror, y) = if mirrored {
                (Mirror::MX, fp.rows_y + (r as i64 + 1) * h)
            } else {
                (Mirror::R0, fp.rows_y + r as i64 * h)
            };
            let decb = format!("dec_b{r}");
            let mut n = nand.clone().named(format!("nand_{r}")).with_orientation(mirror);
            n.set_loc(Point::new(fp.row_x, y));
            let mut bit = 0;
            for (k, &b) in self.groups.iter().enumerate() {
                let digit = (r >> bit) & ((1 << b) - 1);
                n.connect(kind.inputs()[k], format!("pre_{k}_{digit}"));
                bit += b;

                let pad = n.port(kind.inputs()[k])?.largest_rect().center();
                let base = fp.rows_y + r as i64 * h;
                let ty = if mirrored {
                    base + h - tap_y[k]
                } else {
                    base + tap_y[k]
                };
                let lx = line_x(line_offsets[k] + digit);
                ctx.add_straight(M3, Point::new(lx, ty), Point::new(pad.x, ty))?;
                ctx.add_via_at(M2, M3, Point::new(lx, ty))?;
                if ty == pad.y {
                    ctx.add_via_at(M1, M3, pad)?;
                } else {
                    ctx.add_straight(M2, Point::new(pad.x, ty), pad)?;
                    ctx.add_via_at(M2, M3, Point::new(pad.x, ty))?;
                    ctx.add_via_at(M1, M2, pad)?;
                }
            }
            n.connect(kind.output(), decb.as_str())
                .connect("vdd", "vdd")
                .connect("gnd", "gnd");

            let mut i = inv.clone().named(format!("inv_{r}")).with_orientation(mirror);
            i.set_loc(Point::new(fp.row_x + kind.width(&tech), y));
            i.connect("a", decb.as_str())
                .connect("z", bus_bit("dec", r))
                .connect("vdd", "vdd")
                .connect("gnd", "gnd");

            let z = n.port(kind.output())?.largest_rect().center();
            let a = i.port("a")?.largest_rect().center();
            ctx.add_straight(M1, Point::new(z.x, a.y), a)?;

            let out = i.port("z")?.largest_rect().center();
            ctx.add_via_at(M1, M3, Point::new(out.x, a.y))?;
            let dec = Rect::from_spans(
                Span::new(out.x, width),
                Span::from_center_span(a.y, tech.width(M3)),
            );
            ctx.add_pin(bus_bit("dec", r), Direction::Output, M3, dec)?;

            for supply in ["vdd", "gnd"] {
                let rail = n.port(supply)?.largest_rect();
                let rail = Rect::from_sides(0, rail.bottom(), fp.row_x + row_w, rail.top());
                ctx.add_port_shape(supply, Shape::new(M1, rail))?;
            }
            ctx.add_instance(n)?;
            ctx.add_instance(i)?;
        }

        for pred in fp.preds {
            ctx.add_instance(pred)?;
        }
        ctx.add_rect(Layer::Boundary, Rect::from_sides(0, 0, width, rows_top));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SramCtx;

    #[test]
    fn test_predecoder_ports() {
        let mut ctx = SramCtx::default();
        for bits in 1..=3 {
            let pre = ctx
                .instantiate::<Predecoder>(&PredecoderParams { bits })
                .unwrap();
            let names: Vec<String> = pre.netlist().port_names().map(|p| p.to_string()).collect();
            assert_eq!(names.len(), bits + (1 << bits) + 2);
            for i in 0..bits {
                let a = pre.port(&bus_bit("a", i)).unwrap().largest_rect();
                assert_eq!(a.bottom(), 0);
            }
            crate::validate::validate(&pre).unwrap();
        }
        assert!(ctx
            .instantiate::<Predecoder>(&PredecoderParams { bits: 4 })
            .is_err());
    }

    #[test]
    fn test_decoder_groups() {
        for bits in 4..=9 {
            let groups = decoder_groups(bits).unwrap();
            assert_eq!(groups.iter().sum::<usize>(), bits);
            assert!(groups.iter().all(|b| (2..=3).contains(b)));
        }
        assert!(decoder_groups(3).is_err());
        assert!(decoder_groups(10).is_err());
    }

    #[test]
    fn test_row_decoder_32() {
        let mut ctx = SramCtx::default();
        let tech = ctx.tech().clone();
        let dec = ctx
            .instantiate::<RowDecoder>(&RowDecoderParams { rows: 32 })
            .unwrap();
        let stats = crate::validate::validate(&dec).unwrap();
        // 3 + 2 bits: one 3-bit and one 2-bit predecoder, then 32 rows.
        assert_eq!(stats.count("predecoder_3"), 1);
        assert_eq!(stats.count("predecoder_2"), 1);
        assert_eq!(stats.count("pnand2"), 32 + 4);
        for i in 0..5 {
            assert!(dec.has_port(&bus_bit("a", i)));
        }
        // Consecutive rows are one row height apart.
        let d0 = dec.port("dec[0]").unwrap().largest_rect();
        let d1 = dec.port("dec[1]").unwrap().largest_rect();
        assert_eq!(d1.center().y - d0.center().y, tech.row_height());
        assert_eq!(d0.right(), dec.width());
    }

    #[test]
    fn test_row_decoder_rejects_odd_sizes() {
        let mut ctx = SramCtx::default();
        for rows in [8, 48, 1024] {
            assert!(ctx
                .instantiate::<RowDecoder>(&RowDecoderParams { rows })
                .is_err());
        }
    }
}
