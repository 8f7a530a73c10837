use lazy_static::lazy_static;
use tera::Tera;

pub mod backend;
pub mod blocks;
pub mod cells;
pub mod cli;
pub mod component;
pub mod config;
pub mod context;
pub mod error;
pub mod geom;
pub mod layout;
pub mod module;
pub mod paths;
pub mod plan;
pub mod report;
pub mod schematic;
pub mod tech;
pub mod validate;
pub mod verilog;

pub use error::{Error, Result};

pub const BUILD_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/build");

lazy_static! {
    pub static ref TEMPLATES: Tera =
        match Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/*")) {
            Ok(t) => t,
            Err(e) => panic!("Error parsing templates: {e}"),
        };
}

pub fn bus_bit(name: &str, index: usize) -> String {
    format!("{name}[{index}]")
}

/// Splits `dout[3]` into `("dout", Some(3))`. Names without a well formed
/// index are returned whole.
pub(crate) fn split_bus(port: &str) -> (&str, Option<usize>) {
    if let Some(stripped) = port.strip_suffix(']') {
        if let Some((base, idx)) = stripped.rsplit_once('[') {
            if let Ok(idx) = idx.parse() {
                return (base, Some(idx));
            }
        }
    }
    (port, None)
}

#[inline]
pub(crate) fn clog2(x: usize) -> usize {
    (x as f64).log2().ceil() as usize
}

#[cfg(test)]
pub mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use arcstr::ArcStr;

    use super::*;
    use crate::module::Module;
    use crate::schematic::Direction;

    pub(crate) fn test_work_dir(name: &str) -> PathBuf {
        PathBuf::from(BUILD_PATH).join(name)
    }

    fn eval_leaf(module: &Module, inputs: &[(&str, bool)]) -> HashMap<ArcStr, bool> {
        let v = |pin: &str| {
            inputs
                .iter()
                .find(|(p, _)| *p == pin)
                .map(|(_, v)| *v)
                .unwrap_or_else(|| panic!("{} has no input {pin}", module.name()))
        };
        let z = match module.name().as_str() {
            "pinv" => !v("a"),
            "pnand2" => !(v("a") && v("b")),
            "pnand3" => !(v("a") && v("b") && v("c")),
            "pnor2" => !(v("a") || v("b")),
            "pnor3" => !(v("a") || v("b") || v("c")),
            "xor2" => v("a") ^ v("b"),
            _ => return eval_gates(module, inputs),
        };
        HashMap::from([(ArcStr::from("z"), z)])
    }

    /// Evaluates the static gate network of `module` for the given input
    /// values, returning the value of every net that could be resolved.
    pub(crate) fn eval_gates(module: &Module, inputs: &[(&str, bool)]) -> HashMap<ArcStr, bool> {
        let mut nets: HashMap<ArcStr, bool> = inputs
            .iter()
            .map(|(n, v)| (ArcStr::from(*n), *v))
            .collect();
        loop {
            let mut changed = false;
            for inst in module.netlist().instances() {
                let child = inst.module();
                let ports: Vec<(&ArcStr, Direction)> = child.netlist().ports().collect();
                let values: Option<Vec<(&str, bool)>> = ports
                    .iter()
                    .zip(inst.nets())
                    .filter(|((_, d), _)| *d == Direction::Input)
                    .map(|((p, _), n)| nets.get(n).map(|v| (p.as_str(), *v)))
                    .collect();
                let Some(values) = values else {
                    continue;
                };
                let outputs = eval_leaf(child, &values);
                for ((p, d), n) in ports.iter().zip(inst.nets()) {
                    if *d == Direction::Output && !nets.contains_key(n) {
                        if let Some(v) = outputs.get(*p) {
                            nets.insert(n.clone(), *v);
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                return nets;
            }
        }
    }

    #[test]
    fn test_split_bus() {
        assert_eq!(split_bus("dout[12]"), ("dout", Some(12)));
        assert_eq!(split_bus("bank_ack[0]"), ("bank_ack", Some(0)));
        assert_eq!(split_bus("vdd"), ("vdd", None));
        assert_eq!(split_bus("x[a]"), ("x[a]", None));
    }

    #[test]
    fn test_clog2() {
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(64), 6);
        assert_eq!(clog2(65), 7);
    }
}
