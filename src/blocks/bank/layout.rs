//! Bank floorplan and routing.
//!
//! Left to right the bank holds a supply lane, the row decoder with the
//! shared logic blocks beside it, then one column per sub-bank: a supply
//! lane, a vertical metal4 control bus, the word line drivers and the
//! bitcell array. Beneath each array the column periphery is stacked
//! bottom up as split, merge, data ready detector, sense amplifiers, write
//! drivers, write complete detector and the optional column mux, with the
//! precharge row above the array. Every external signal enters through a
//! channel along the bottom edge; supplies leave through a pair of metal3
//! straps along the top edge and the metal4 lane straps.
//!
//! Placement runs twice. The first pass only collects the x positions of
//! the channel terminals, which fix the channel height; the second pass
//! places everything above the channel.

use arcstr::ArcStr;

use super::BankParams;
use crate::blocks::bitcell_array::{BitcellArray, BitcellArrayParams};
use crate::blocks::column_mux::{ColumnMuxArray, ColumnMuxArrayParams};
use crate::blocks::columns::{ColumnCellKind, TiledArray, TiledArrayParams};
use crate::blocks::completion::{CompletionDetector, CompletionDetectorParams, CompletionKind};
use crate::blocks::control::BankControlLogic;
use crate::blocks::decoder::{RowDecoder, RowDecoderParams, SelectDecoder, SelectDecoderParams};
use crate::blocks::logic::{LogicTree, LogicTreeParams};
use crate::blocks::wl_driver::{WordlineDriverArray, WordlineDriverArrayParams};
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{BoundBox, Dir, Point, Rect, Span};
use crate::layout::align::AlignRect;
use crate::layout::bus::Bus;
use crate::layout::channel::IoChannel;
use crate::layout::power::{strap_width, supply_rails, PowerLane};
use crate::layout::row::TreeOp;
use crate::layout::Shape;
use crate::module::Instance;
use crate::tech::{Layer, Tech, M1, M2, M3, M4};
use crate::{bus_bit, split_bus};

/// Vertical and horizontal spacing between blocks.
pub(crate) fn gaps(tech: &Tech) -> (i64, i64) {
    let g = tech.snap_up(tech.well_gap().max(2 * tech.pitch(M3)));
    (g, tech.well_gap())
}

/// Binds every port of `inst` to the net returned by `net` for the port's
/// base name and bus index. Supplies are tied to the bank supplies.
fn bind(inst: &mut Instance, net: impl Fn(&str, usize) -> String) {
    let ports: Vec<ArcStr> = inst.module().netlist().port_names().cloned().collect();
    for port in ports {
        let (base, idx) = split_bus(&port);
        let n = match base {
            "vdd" | "gnd" => base.to_string(),
            _ => net(base, idx.unwrap_or_default()),
        };
        inst.connect(port.clone(), n);
    }
}

struct Subbank {
    lane: PowerLane,
    bus: Bus,
    drivers: Instance,
    precharge: Instance,
    array: Instance,
    mux: Option<Instance>,
    wc: Instance,
    wd: Instance,
    sa: Instance,
    dr: Instance,
    merge: Instance,
    split: Instance,
}

impl Subbank {
    /// Blocks whose supply rails are collected by the sub-bank lane.
    fn powered(&self) -> Vec<&Instance> {
        let mut blocks = vec![
            &self.split,
            &self.merge,
            &self.dr,
            &self.sa,
            &self.wd,
            &self.wc,
            &self.array,
            &self.precharge,
        ];
        blocks.extend(self.mux.as_ref());
        blocks
    }

    fn into_instances(self) -> impl Iterator<Item = Instance> {
        [
            Some(self.drivers),
            Some(self.precharge),
            Some(self.array),
            self.mux,
            Some(self.wc),
            Some(self.wd),
            Some(self.sa),
            Some(self.dr),
            Some(self.merge),
            Some(self.split),
        ]
        .into_iter()
        .flatten()
    }
}

struct Placement {
    lane: PowerLane,
    decoder: Instance,
    logic: Vec<Instance>,
    subbanks: Vec<Subbank>,
    top: i64,
    right: i64,
}

/// Places every block with the periphery starting at `base`.
fn place(p: &BankParams, ctx: &mut ModuleCtx, base: i64) -> Result<Placement> {
    let tech = ctx.tech.clone();
    let (g, gx) = gaps(&tech);
    let h = tech.row_height();
    let (ws, wpr, rows) = (p.word_size, p.words_per_row, p.num_rows);
    let col_bits = p.col_addr_bits();
    let row_bits = p.row_addr_bits();

    let lane = PowerLane::new(&tech, 0, 1);
    let dec_x = lane.right() + gx;
    let mut decoder = ctx
        .instantiate::<RowDecoder>(&RowDecoderParams { rows })?
        .named("row_decoder");
    bind(&mut decoder, |pin, i| match pin {
        "a" => bus_bit("addr", col_bits + i),
        _ => bus_bit(pin, i),
    });
    let dec_rows = decoder.port(&bus_bit("dec", 0))?.largest_rect().center().y - h / 2;

    let mut logic = Vec::new();
    let mut control = ctx
        .instantiate::<BankControlLogic>(&p.control_params())?
        .named("control");
    bind(&mut control, |pin, _| pin.to_string());
    logic.push(control);

    let mut sb_dec = ctx
        .instantiate::<SelectDecoder>(&SelectDecoderParams {
            outputs: p.num_subanks,
        })?
        .named("subbank_decoder");
    bind(&mut sb_dec, |pin, i| match pin {
        "a" => bus_bit("addr", col_bits + row_bits + i),
        "en" => "wl_en".to_string(),
        _ => bus_bit("sb_sel", i),
    });
    logic.push(sb_dec);

    if wpr > 1 {
        let mut col_dec = ctx
            .instantiate::<SelectDecoder>(&SelectDecoderParams { outputs: wpr })?
            .named("column_decoder");
        bind(&mut col_dec, |pin, i| match pin {
            "a" => bus_bit("addr", i),
            "en" => "wl_en".to_string(),
            _ => bus_bit("csel", i),
        });
        logic.push(col_dec);
    }

    for (name, done) in [("wc_merge", "wc"), ("dr_merge", "dr")] {
        let tree = LogicTreeParams {
            op: TreeOp::Or,
            inputs: p.num_subanks,
        };
        let mut inst = ctx.instantiate::<LogicTree>(&tree)?.named(name);
        bind(&mut inst, |pin, i| match pin {
            "in" => bus_bit(&format!("{done}_sb"), i),
            _ => done.to_string(),
        });
        logic.push(inst);
    }

    let mut x = dec_x + decoder.module().width() + gx;
    let mut logic_h = 0;
    for inst in logic.iter_mut() {
        let corner = Rect::from_sides(x, base, x, base);
        inst.align_left(corner);
        inst.align_bottom(corner);
        let brect = inst.brect();
        x = brect.right() + gx;
        logic_h = logic_h.max(brect.height());
    }
    let logic_right = x - gx;

    // Templates shared by every sub-bank.
    let tiled = |cell| TiledArrayParams::new(cell, ws).with_words_per_row(wpr);
    let detector = |kind| CompletionDetectorParams {
        kind,
        word_size: ws,
        words_per_row: wpr,
        en: true,
    };
    let split = ctx.instantiate::<TiledArray>(&tiled(ColumnCellKind::Split { mask: p.mask }))?;
    let merge = ctx.instantiate::<TiledArray>(&tiled(ColumnCellKind::Merge))?;
    let dr = ctx.instantiate::<CompletionDetector>(&detector(CompletionKind::DataReady))?;
    let sa = ctx.instantiate::<TiledArray>(&tiled(ColumnCellKind::SenseAmp))?;
    let wd = ctx.instantiate::<TiledArray>(&tiled(ColumnCellKind::WriteDriver { mask: p.mask }))?;
    let wc = ctx.instantiate::<CompletionDetector>(&detector(CompletionKind::WriteComplete))?;
    let mux = if wpr > 1 {
        Some(ctx.instantiate::<ColumnMuxArray>(&ColumnMuxArrayParams {
            columns: p.columns(),
            words_per_row: wpr,
        })?)
    } else {
        None
    };
    let array = ctx.instantiate::<BitcellArray>(&BitcellArrayParams {
        rows,
        cols: p.columns(),
    })?;
    let precharge =
        ctx.instantiate::<TiledArray>(&TiledArrayParams::new(ColumnCellKind::Precharge, p.columns()))?;
    let drivers = ctx.instantiate::<WordlineDriverArray>(&WordlineDriverArrayParams { rows })?;

    let mut stack_y = Vec::new();
    let mut y = base;
    for inst in [Some(&split), Some(&merge), Some(&dr), Some(&sa), Some(&wd), Some(&wc), mux.as_ref()]
        .into_iter()
        .flatten()
    {
        stack_y.push(y);
        y += inst.module().height() + g;
    }
    // The decoder rows line up with the array rows and the decoder must
    // clear the logic blocks beneath it.
    let array_y = y.max(base + logic_h + g + dec_rows);
    let pchg_y = array_y + array.module().height() + g;
    let bank_top = pchg_y + precharge.module().height();
    decoder.set_loc(Point::new(dec_x, array_y - dec_rows));

    let mut subbanks = Vec::with_capacity(p.num_subanks);
    let mut x = logic_right.max(decoder.brect().right()) + gx;
    for k in 0..p.num_subanks {
        let sb_lane = PowerLane::new(&tech, x, 1);
        let sel = bus_bit("sb_sel", k);
        let wc_net = bus_bit("wc_sb", k);
        let dr_net = bus_bit("dr_sb", k);
        let mut names: Vec<ArcStr> = ["pchg", "wen", "sen"].into_iter().map(ArcStr::from).collect();
        names.extend([&sel, &wc_net, &dr_net].map(|n| ArcStr::from(n.as_str())));
        if wpr > 1 {
            names.extend((0..wpr).map(|j| ArcStr::from(bus_bit("csel", j))));
        }
        let bus = Bus::new(
            &tech,
            M4,
            Dir::Vert,
            names,
            sb_lane.right(),
            Span::new(base, bank_top),
        );
        let dx = sb_lane.right() + bus.extent() + gx;
        let ax = dx + CompletionDetector::array_offset(&tech);

        let bl = |c: usize| bus_bit(&format!("bl_{k}"), c);
        let br = |c: usize| bus_bit(&format!("br_{k}"), c);
        let wl = |r: usize| bus_bit(&format!("wl_{k}"), r);
        // Data bitlines after the column mux.
        let (dbl, dbr) = if wpr > 1 {
            (format!("dbl_{k}"), format!("dbr_{k}"))
        } else {
            (format!("bl_{k}"), format!("br_{k}"))
        };
        let dq = format!("dq_{k}");
        let bmq = format!("bmq_{k}");
        let sa_out = format!("sa_{k}");
        let sa_out_b = format!("sab_{k}");

        let mut drivers = drivers.clone().named(format!("wl_driver_{k}"));
        drivers.set_loc(Point::new(dx, array_y));
        bind(&mut drivers, |pin, r| match pin {
            "in" => bus_bit("dec", r),
            "wl" => wl(r),
            _ => sel.clone(),
        });

        let mut arr = array.clone().named(format!("array_{k}"));
        arr.set_loc(Point::new(ax, array_y));
        bind(&mut arr, |pin, i| match pin {
            "bl" => bl(i),
            "br" => br(i),
            _ => wl(i),
        });

        let mut pchg = precharge.clone().named(format!("precharge_{k}"));
        pchg.set_loc(Point::new(ax, pchg_y));
        bind(&mut pchg, |pin, i| match pin {
            "bl" => bl(i),
            "br" => br(i),
            _ => "pchg".to_string(),
        });

        let mut ys = stack_y.iter().copied();
        let mut next_y = || ys.next().ok_or_else(|| Error::Routing("periphery stack underflow".into()));

        let mut split = split.clone().named(format!("split_{k}"));
        split.set_loc(Point::new(ax, next_y()?));
        bind(&mut split, |pin, i| match pin {
            "D" => bus_bit("din", i),
            "Q" => bus_bit(&dq, i),
            "BM" => bus_bit("bm", i),
            "BMQ" => bus_bit(&bmq, i),
            _ => sel.clone(),
        });

        let mut merge = merge.clone().named(format!("merge_{k}"));
        merge.set_loc(Point::new(ax, next_y()?));
        bind(&mut merge, |pin, i| match pin {
            "D" => bus_bit(&sa_out, i),
            "Q" => bus_bit("dout", i),
            _ => sel.clone(),
        });

        let mut dr = dr.clone().named(format!("data_ready_{k}"));
        dr.set_loc(Point::new(dx, next_y()?));
        bind(&mut dr, |pin, i| match pin {
            "a" => bus_bit(&sa_out, i),
            "b" => bus_bit(&sa_out_b, i),
            "en" => sel.clone(),
            _ => dr_net.clone(),
        });

        let mut sa = sa.clone().named(format!("sense_amp_{k}"));
        sa.set_loc(Point::new(ax, next_y()?));
        bind(&mut sa, |pin, i| match pin {
            "bl" => bus_bit(&dbl, i),
            "br" => bus_bit(&dbr, i),
            "dout" => bus_bit(&sa_out, i),
            "dout_b" => bus_bit(&sa_out_b, i),
            _ => "sen".to_string(),
        });

        let mut wd = wd.clone().named(format!("write_driver_{k}"));
        wd.set_loc(Point::new(ax, next_y()?));
        bind(&mut wd, |pin, i| match pin {
            "bl" => bus_bit(&dbl, i),
            "br" => bus_bit(&dbr, i),
            "din" => bus_bit(&dq, i),
            "bm" => bus_bit(&bmq, i),
            _ => "wen".to_string(),
        });

        let mut wc = wc.clone().named(format!("write_complete_{k}"));
        wc.set_loc(Point::new(dx, next_y()?));
        bind(&mut wc, |pin, i| match pin {
            "a" => bus_bit(&dbl, i),
            "b" => bus_bit(&dbr, i),
            "en" => sel.clone(),
            _ => wc_net.clone(),
        });

        let mux = match mux.as_ref() {
            Some(m) => {
                let mut m = m.clone().named(format!("column_mux_{k}"));
                m.set_loc(Point::new(ax, next_y()?));
                bind(&mut m, |pin, i| match pin {
                    "bl" => bl(i),
                    "br" => br(i),
                    "bl_out" => bus_bit(&dbl, i),
                    "br_out" => bus_bit(&dbr, i),
                    _ => bus_bit("csel", i),
                });
                Some(m)
            }
            None => None,
        };

        let right = [&drivers, &pchg, &arr, &wc, &wd, &sa, &dr, &merge, &split]
            .into_iter()
            .chain(mux.as_ref())
            .map(|inst| inst.brect().right())
            .max()
            .unwrap_or(ax);
        x = right + gx;
        subbanks.push(Subbank {
            lane: sb_lane,
            bus,
            drivers,
            precharge: pchg,
            array: arr,
            mux,
            wc,
            wd,
            sa,
            dr,
            merge,
            split,
        });
    }

    let top = logic
        .iter()
        .map(|l| l.brect().top())
        .chain([bank_top, decoder.brect().top()])
        .max()
        .unwrap_or(bank_top);
    Ok(Placement {
        lane,
        decoder,
        logic,
        subbanks,
        top,
        right: x - gx,
    })
}

/// Collects the channel terminals of a placement, along with the metal2
/// extensions that bring buried pins down to the top of the channel.
fn terminals(
    tech: &Tech,
    p: &BankParams,
    fp: &Placement,
    base: i64,
) -> Result<(IoChannel, Vec<Shape>)> {
    let mut channel = IoChannel::new();
    let mut extensions = Vec::new();
    let mut extend = |channel: &mut IoChannel, net: String, pin: Shape| {
        let rect = Rect::from_sides(pin.rect.left(), base, pin.rect.right(), pin.rect.top());
        let shape = Shape::new(pin.layer, rect);
        channel.add_terminal(net, shape);
        extensions.push(shape);
    };

    for inst in fp.logic.iter() {
        for (pin, net) in inst.connections() {
            if net == "vdd" || net == "gnd" {
                continue;
            }
            channel.add_terminal(net.clone(), inst.port(pin)?.largest());
        }
    }
    for i in 0..p.row_addr_bits() {
        let pin = fp.decoder.port(&bus_bit("a", i))?.largest();
        extend(&mut channel, bus_bit("addr", p.col_addr_bits() + i), pin);
    }
    for sb in fp.subbanks.iter() {
        for (i, name) in sb.bus.names().iter().enumerate() {
            let track = sb.bus.track(i);
            let stub = Rect::from_sides(track.left(), base, track.right(), base + tech.pitch(M3));
            channel.add_terminal(name.clone(), Shape::new(M4, stub));
        }
        for i in 0..p.word_size {
            channel.add_terminal(bus_bit("din", i), sb.split.port(&bus_bit("D", i))?.largest());
            if p.mask {
                channel.add_terminal(bus_bit("bm", i), sb.split.port(&bus_bit("BM", i))?.largest());
            }
            let q = sb.merge.port(&bus_bit("Q", i))?.largest();
            extend(&mut channel, bus_bit("dout", i), q);
        }
    }
    for (port, dir) in p.ports() {
        if port != "vdd" && port != "gnd" {
            channel.expose(port, dir);
        }
    }
    Ok((channel, extensions))
}

/// Connects vertically adjacent pins with a straight wire on `layer`.
fn stitch(ctx: &mut ModuleCtx, layer: Layer, lower: (&Instance, &str), upper: (&Instance, &str)) -> Result<()> {
    let a = lower.0.port(lower.1)?.largest_rect();
    let b = upper.0.port(upper.1)?.largest_rect();
    let (xa, xb) = (a.center().x, b.center().x);
    if xa != xb {
        return Err(Error::Routing(format!(
            "{}.{} at x = {xa} does not line up with {}.{} at x = {xb}",
            lower.0.name(),
            lower.1,
            upper.0.name(),
            upper.1
        )));
    }
    if layer == M2 {
        ctx.add_straight(M2, Point::new(xa, a.top()), Point::new(xb, b.bottom()))
    } else {
        ctx.add_straight(layer, a.center(), b.center())
    }
}

/// Brings a bottom-edge pin down to `y`, then across on metal3 to a bus
/// track.
fn jog(ctx: &mut ModuleCtx, bus: &Bus, track: &str, pin: Shape, y: i64) -> Result<()> {
    let x = pin.rect.center().x;
    let tx = bus.track_by_name(track)?.center().x;
    ctx.add_straight(M2, Point::new(x, pin.rect.bottom()), Point::new(x, y))?;
    ctx.add_via_at(M2, M3, Point::new(x, y))?;
    ctx.add_straight(M3, Point::new(x, y), Point::new(tx, y))?;
    ctx.add_via_at(M3, M4, Point::new(tx, y))?;
    Ok(())
}

fn route_subbank(ctx: &mut ModuleCtx, p: &BankParams, k: usize, sb: &Subbank) -> Result<()> {
    let tech = ctx.tech.clone();
    let (g, _) = gaps(&tech);
    let (ws, wpr) = (p.word_size, p.words_per_row);
    let sel = bus_bit("sb_sel", k);
    sb.bus.draw(ctx);

    for c in 0..p.columns() {
        for pin in ["bl", "br"] {
            let port = bus_bit(pin, c);
            stitch(ctx, M2, (&sb.array, &port), (&sb.precharge, &port))?;
            if let Some(mux) = sb.mux.as_ref() {
                stitch(ctx, M2, (mux, &port), (&sb.array, &port))?;
            }
        }
    }
    for i in 0..ws {
        let b = |pin: &str| bus_bit(pin, i);
        for (det, upper) in [("a", "bl"), ("b", "br")] {
            match sb.mux.as_ref() {
                Some(mux) => stitch(ctx, M2, (&sb.wc, &b(det)), (mux, &b(&format!("{upper}_out"))))?,
                None => stitch(ctx, M2, (&sb.wc, &b(det)), (&sb.array, &b(upper)))?,
            }
            stitch(ctx, M2, (&sb.wd, &b(upper)), (&sb.wc, &b(det)))?;
            stitch(ctx, M2, (&sb.sa, &b(upper)), (&sb.wd, &b(upper)))?;
        }
        stitch(ctx, M2, (&sb.dr, &b("a")), (&sb.sa, &b("dout")))?;
        stitch(ctx, M2, (&sb.dr, &b("b")), (&sb.sa, &b("dout_b")))?;
        stitch(ctx, M2, (&sb.merge, &b("D")), (&sb.dr, &b("a")))?;
        stitch(ctx, M3, (&sb.split, &b("Q")), (&sb.wd, &b("din")))?;
        if p.mask {
            stitch(ctx, M3, (&sb.split, &b("BMQ")), (&sb.wd, &b("bm")))?;
        }
    }

    // Control rails.
    sb.bus.tap(ctx, "pchg", sb.precharge.port("en")?.largest(), M1)?;
    sb.bus.tap(ctx, "wen", sb.wd.port("en")?.largest(), M1)?;
    sb.bus.tap(ctx, "sen", sb.sa.port("en")?.largest(), M1)?;
    sb.bus.tap(ctx, &sel, sb.split.port("sel")?.largest(), M1)?;
    sb.bus.tap(ctx, &sel, sb.merge.port("sel")?.largest(), M1)?;
    if let Some(mux) = sb.mux.as_ref() {
        for j in 0..wpr {
            let rail = mux.port(&bus_bit("sel", j))?.largest();
            sb.bus.tap(ctx, &bus_bit("csel", j), rail, M3)?;
        }
    }
    let en = sb.drivers.port("en")?.largest();
    jog(ctx, &sb.bus, &sel, en, sb.drivers.brect().bottom() - g / 2)?;
    for (det, done) in [(&sb.wc, bus_bit("wc_sb", k)), (&sb.dr, bus_bit("dr_sb", k))] {
        let y = det.brect().bottom();
        jog(ctx, &sb.bus, &sel, det.port("en")?.largest(), y - g / 4)?;
        jog(ctx, &sb.bus, &done, det.port("done")?.largest(), y - 3 * g / 4)?;
    }

    // Word lines.
    let ax = sb.array.brect().left();
    for r in 0..p.num_rows {
        let wl = sb.drivers.port(&bus_bit("wl", r))?.largest_rect();
        ctx.add_rect(M1, Rect::from_sides(wl.right(), wl.bottom(), ax, wl.top()));
    }
    Ok(())
}

pub(super) fn draw(p: &BankParams, ctx: &mut ModuleCtx) -> Result<()> {
    let tech = ctx.tech.clone();
    let (g, _) = gaps(&tech);

    let trial = place(p, ctx, 0)?;
    let base = terminals(&tech, p, &trial, 0)?.0.height(&tech);
    let fp = place(p, ctx, base)?;
    let (channel, extensions) = terminals(&tech, p, &fp, base)?;
    for ext in extensions {
        ctx.add_shape(ext);
    }

    for (k, sb) in fp.subbanks.iter().enumerate() {
        route_subbank(ctx, p, k, sb)?;
    }

    // Decoded rows run on metal3 across every sub-bank's drivers.
    for r in 0..p.num_rows {
        let dec = fp.decoder.port(&bus_bit("dec", r))?.largest_rect();
        let y = dec.center().y;
        let mut last = dec.right();
        for sb in fp.subbanks.iter() {
            let pad = sb.drivers.port(&bus_bit("in", r))?.largest_rect().center();
            ctx.add_via_at(M1, M3, pad)?;
            last = last.max(pad.x);
        }
        ctx.add_straight(M3, Point::new(dec.right(), y), Point::new(last, y))?;
    }

    // Supplies.
    let sw = strap_width(&tech, M3, 1);
    let band_y = fp.top + g;
    let vdd_band = Rect::from_sides(0, band_y, fp.right, band_y + sw);
    let gnd_y = vdd_band.top() + tech.space(M3);
    let gnd_band = Rect::from_sides(0, gnd_y, fp.right, gnd_y + sw);
    let vspan = Span::new(base, gnd_band.top());

    let mut shared = vec![&fp.decoder];
    shared.extend(fp.logic.iter());
    let mut lanes = vec![(fp.lane, shared)];
    for sb in fp.subbanks.iter() {
        lanes.push((sb.lane, sb.powered()));
    }
    let mut vdd_straps = Vec::new();
    let mut gnd_straps = Vec::new();
    for (lane, blocks) in lanes {
        let mut vdd = Vec::new();
        let mut gnd = Vec::new();
        for inst in blocks {
            if inst.module().has_port("vdd") {
                vdd.extend(supply_rails(inst, "vdd", M1)?);
            }
            gnd.extend(supply_rails(inst, "gnd", M1)?);
        }
        let (v, gn) = lane.draw(ctx, vspan, &vdd, &gnd)?;
        vdd_straps.push(v);
        gnd_straps.push(gn);
    }
    ctx.add_strap(M3, vdd_band, &vdd_straps)?;
    ctx.add_strap(M3, gnd_band, &gnd_straps)?;
    ctx.add_port_shape("vdd", Shape::new(M3, vdd_band))?;
    ctx.add_port_shape("gnd", Shape::new(M3, gnd_band))?;
    for strap in vdd_straps {
        ctx.add_port_shape("vdd", strap)?;
    }
    for strap in gnd_straps {
        ctx.add_port_shape("gnd", strap)?;
    }

    ctx.add_instance(fp.decoder)?;
    for inst in fp.logic {
        ctx.add_instance(inst)?;
    }
    for sb in fp.subbanks {
        for inst in sb.into_instances() {
            ctx.add_instance(inst)?;
        }
    }

    let top = channel.route(ctx, 0)?;
    debug_assert_eq!(top, base);
    ctx.add_rect(Layer::Boundary, Rect::from_sides(0, 0, fp.right, gnd_band.top()));
    Ok(())
}
