use std::path::Path;

use itertools::Itertools;
use serde::Serialize;
use tera::Context;

use crate::blocks::sram::SramParams;
use crate::module::Module;
use crate::schematic::Direction;
use crate::{split_bus, Error, Result, TEMPLATES};

/// Nominal access delay of the behavioral model, in nanoseconds.
const ACCESS_DELAY: usize = 1;

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct VerilogPort {
    pub name: String,
    pub dir: &'static str,
    pub width: usize,
}

#[derive(Clone, Eq, PartialEq, Serialize)]
pub struct BlackBoxParams {
    pub module_name: String,
    pub ports: Vec<VerilogPort>,
}

#[derive(Clone, Eq, PartialEq, Serialize)]
pub struct SramVerilogParams {
    pub module_name: String,
    pub ports: Vec<VerilogPort>,
    pub num_words: usize,
    pub data_width: usize,
    pub addr_width: usize,
    pub mask: bool,
    pub power_gate: bool,
    pub delay: usize,
}

/// Collapses `name[i]` bits into buses, keeping the position of each bus's
/// first bit.
///
/// Every bus must hold bits `0..width` exactly once.
pub fn group_ports<'a>(
    ports: impl IntoIterator<Item = (&'a str, Direction)>,
) -> Result<Vec<VerilogPort>> {
    let mut out: Vec<VerilogPort> = Vec::new();
    let mut bits: Vec<Vec<usize>> = Vec::new();
    for (port, direction) in ports {
        let (base, idx) = split_bus(port);
        let dir = direction.verilog();
        match out.iter().position(|p| p.name == base) {
            Some(i) => {
                if out[i].dir != dir {
                    return Err(Error::Validation(format!(
                        "bits of bus `{base}` have different directions"
                    )));
                }
                bits[i].push(idx.unwrap_or(0));
            }
            None => {
                out.push(VerilogPort {
                    name: base.to_string(),
                    dir,
                    width: 0,
                });
                bits.push(vec![idx.unwrap_or(0)]);
            }
        }
    }
    for (port, idx) in out.iter_mut().zip(bits) {
        if !idx.iter().copied().sorted().eq(0..idx.len()) {
            return Err(Error::Validation(format!(
                "bus `{}` does not hold contiguous bits starting at zero",
                port.name
            )));
        }
        port.width = idx.len();
    }
    Ok(out)
}

pub fn generate_black_box(module: &Module) -> Result<String> {
    let params = BlackBoxParams {
        module_name: module.name().to_string(),
        ports: group_ports(module.netlist().ports().map(|(p, d)| (p.as_str(), d)))?,
    };
    Ok(TEMPLATES.render("black_box.v", &Context::from_serialize(params)?)?)
}

pub fn generate_sram_verilog(name: &str, params: &SramParams) -> Result<String> {
    let ports = params.ports();
    let template_params = SramVerilogParams {
        module_name: name.to_string(),
        ports: group_ports(ports.iter().map(|(p, d)| (p.as_str(), *d)))?,
        num_words: params.num_words(),
        data_width: params.word_size,
        addr_width: params.addr_size(),
        mask: params.mask,
        power_gate: params.power_gate,
        delay: ACCESS_DELAY,
    };
    Ok(TEMPLATES.render("sram.v", &Context::from_serialize(template_params)?)?)
}

fn write(path: &Path, verilog: String) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, verilog)?;
    Ok(())
}

pub fn save_sram_verilog(path: impl AsRef<Path>, name: &str, params: &SramParams) -> Result<()> {
    write(path.as_ref(), generate_sram_verilog(name, params)?)
}

/// Saves the module's behavioral model, or a black box when it has none.
pub fn save_verilog(path: impl AsRef<Path>, module: &Module) -> Result<()> {
    let verilog = match module.verilog() {
        Some(v) => v.to_string(),
        None => generate_black_box(module)?,
    };
    write(path.as_ref(), verilog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::lfsr::{Lfsr, LfsrParams};
    use crate::blocks::sram::SramParamsBuilder;
    use crate::context::SramCtx;
    use crate::paths::out_verilog;
    use crate::tests::test_work_dir;

    #[test]
    fn test_group_ports() {
        let ports = [
            ("din[0]", Direction::Input),
            ("din[1]", Direction::Input),
            ("clk", Direction::Input),
            ("din[2]", Direction::Input),
            ("vdd", Direction::Power),
        ];
        let grouped = group_ports(ports).unwrap();
        let summary: Vec<(&str, &str, usize)> = grouped
            .iter()
            .map(|p| (p.name.as_str(), p.dir, p.width))
            .collect();
        assert_eq!(
            summary,
            [("din", "input", 3), ("clk", "input", 1), ("vdd", "inout", 1)]
        );

        let gap = [("q[0]", Direction::Output), ("q[2]", Direction::Output)];
        assert!(group_ports(gap).is_err());
    }

    #[test]
    fn test_sram_model() {
        let params = SramParamsBuilder::default()
            .word_size(8)
            .num_rows(32)
            .mask(true)
            .power_gate(true)
            .build()
            .unwrap();
        let verilog = generate_sram_verilog("sram_test", &params).unwrap();
        assert!(verilog.contains("module sram_test ("));
        assert!(verilog.contains("input [4:0] addr,"));
        assert!(verilog.contains("output [7:0] dout,"));
        assert!(verilog.contains("input [7:0] bm,"));
        assert!(verilog.contains("input sleep,"));
        assert!(verilog.contains("inout gnd\n"));
        assert!(verilog.contains("reg [7:0] mem [0:31];"));
        save_sram_verilog(
            out_verilog(test_work_dir("test_sram_model"), "sram_test"),
            "sram_test",
            &params,
        )
        .unwrap();
    }

    #[test]
    fn test_black_box() {
        let mut ctx = SramCtx::default();
        let lfsr = ctx.instantiate::<Lfsr>(&LfsrParams { size: 6 }).unwrap();
        let verilog = generate_black_box(&lfsr).unwrap();
        assert!(verilog.contains("module lfsr_6 ("));
        assert!(verilog.contains("output [5:0] q"));
        assert!(verilog.trim_end().ends_with("endmodule"));
    }
}
