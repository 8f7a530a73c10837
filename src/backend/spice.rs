//! Hierarchical SPICE netlists.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::module::Module;

/// Continuation lines start once a line grows past this many columns.
const LINE_WIDTH: usize = 80;

pub struct SpiceWriter<W> {
    out: W,
    col: usize,
}

impl<W: Write> SpiceWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, col: 0 }
    }

    fn token(&mut self, token: &str) -> Result<()> {
        if self.col == 0 {
            write!(self.out, "{token}")?;
            self.col = token.len();
        } else if self.col + 1 + token.len() > LINE_WIDTH {
            write!(self.out, "\n+ {token}")?;
            self.col = 2 + token.len();
        } else {
            write!(self.out, " {token}")?;
            self.col += 1 + token.len();
        }
        Ok(())
    }

    fn end_line(&mut self) -> Result<()> {
        writeln!(self.out)?;
        self.col = 0;
        Ok(())
    }

    pub fn comment(&mut self, comment: &str) -> Result<()> {
        writeln!(self.out, "* {comment}")?;
        Ok(())
    }

    pub fn subcircuit<'a>(
        &mut self,
        name: &str,
        ports: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        self.token(".subckt")?;
        self.token(name)?;
        for port in ports {
            self.token(port)?;
        }
        self.end_line()
    }

    pub fn end_subcircuit(&mut self) -> Result<()> {
        writeln!(self.out, ".ends\n")?;
        Ok(())
    }

    pub fn instance<'a>(
        &mut self,
        name: &str,
        terminals: impl IntoIterator<Item = &'a str>,
        cell: &str,
    ) -> Result<()> {
        self.token(&format!("X{name}"))?;
        for t in terminals {
            self.token(t)?;
        }
        self.token(cell)?;
        self.end_line()
    }

    /// Copies a leaf cell body verbatim.
    pub fn raw(&mut self, body: &str) -> Result<()> {
        for line in body.lines() {
            writeln!(self.out, "{}", line.trim_end())?;
        }
        Ok(())
    }

    pub fn module(&mut self, module: &Module) -> Result<()> {
        let netlist = module.netlist();
        self.subcircuit(module.name(), netlist.port_names().map(|p| p.as_str()))?;
        if let Some(body) = netlist.raw() {
            self.raw(body)?;
        }
        for inst in netlist.instances() {
            self.instance(
                inst.name(),
                inst.nets().iter().map(|n| n.as_str()),
                inst.module().name(),
            )?;
        }
        self.end_subcircuit()
    }

    pub fn finish(mut self) -> Result<W> {
        writeln!(self.out, ".end")?;
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Writes `top` and every module below it, each subcircuit once, children
/// first.
pub fn write_netlist<W: Write>(top: &Arc<Module>, out: W) -> Result<W> {
    let mut writer = SpiceWriter::new(out);
    writer.comment(&format!("{} netlist generated by amc", top.name()))?;
    writer.comment("")?;
    for module in super::post_order(top, |m| {
        m.netlist()
            .instances()
            .iter()
            .map(|i| i.module().clone())
            .collect()
    }) {
        writer.module(&module)?;
    }
    writer.finish()
}

pub fn netlist_string(top: &Arc<Module>) -> Result<String> {
    let buf = write_netlist(top, Vec::new())?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn save_netlist(top: &Arc<Module>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    super::create_parent(path)?;
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_netlist(top, file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::blocks::split_merge::{SplitMergeControl, SplitMergeControlParams};
    use crate::context::SramCtx;

    /// Joins continuation lines and drops comments.
    fn logical_lines(netlist: &str) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        for line in netlist.lines() {
            if let Some(rest) = line.strip_prefix('+') {
                if let Some(last) = lines.last_mut() {
                    last.push_str(rest);
                }
            } else if !line.starts_with('*') && !line.trim().is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }

    #[test]
    fn test_netlist_is_hierarchical_and_complete() {
        let mut ctx = SramCtx::default();
        let smc = ctx
            .instantiate::<SplitMergeControl>(&SplitMergeControlParams {
                num_banks: 4,
                gated: true,
            })
            .unwrap();
        let netlist = netlist_string(&smc).unwrap();
        let lines = logical_lines(&netlist);
        assert_eq!(lines.last().map(|s| s.as_str()), Some(".end"));

        // Re-parse: every instance must refer to an already defined
        // subcircuit and bind exactly as many nets as it has ports.
        let mut arity: HashMap<String, usize> = HashMap::new();
        let mut current = None;
        for line in lines.iter() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens[0] {
                ".subckt" => {
                    assert!(
                        !arity.contains_key(tokens[1]),
                        "{} defined twice",
                        tokens[1]
                    );
                    current = Some((tokens[1].to_string(), tokens.len() - 2));
                }
                ".ends" => {
                    let (name, n) = current.take().unwrap();
                    arity.insert(name, n);
                }
                t if t.starts_with('X') => {
                    let cell = tokens[tokens.len() - 1];
                    let expected = arity
                        .get(cell)
                        .unwrap_or_else(|| panic!("{cell} used before it is defined"));
                    assert_eq!(tokens.len() - 2, *expected, "{line}");
                }
                _ => {}
            }
        }
        assert_eq!(arity[smc.name().as_str()], smc.netlist().num_ports());
    }

    #[test]
    fn test_long_lines_are_continued() {
        let mut writer = SpiceWriter::new(Vec::new());
        let ports: Vec<String> = (0..64).map(|i| crate::bus_bit("addr", i)).collect();
        writer
            .subcircuit("wide", ports.iter().map(|s| s.as_str()))
            .unwrap();
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert!(out.lines().all(|l| l.len() <= LINE_WIDTH));
        assert!(out.lines().nth(1).unwrap().starts_with("+ "));
    }
}
