//! A machine-readable summary of a generated macro.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::blocks::sram::SramParams;
use crate::error::Result;
use crate::module::Module;
use crate::tech::Tech;
use crate::validate::TreeStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SramReport {
    pub name: String,
    /// Outline width in microns.
    pub width: f64,
    /// Outline height in microns.
    pub height: f64,
    pub word_size: usize,
    pub num_words: usize,
    pub addr_size: usize,
    pub total_bits: usize,
    pub num_banks: usize,
    pub mask: bool,
    pub power_gate: bool,
    /// Distinct modules in the hierarchy.
    pub num_modules: usize,
    /// Flattened instance counts, by module name.
    pub instances: BTreeMap<String, usize>,
}

impl SramReport {
    pub fn new(top: &Arc<Module>, params: &SramParams, stats: &TreeStats, tech: &Tech) -> Self {
        let um = |x: i64| x as f64 / tech.dbu_per_micron as f64;
        Self {
            name: top.name().to_string(),
            width: um(top.width()),
            height: um(top.height()),
            word_size: params.word_size,
            num_words: params.num_words(),
            addr_size: params.addr_size(),
            total_bits: params.total_bits(),
            num_banks: params.num_banks(),
            mask: params.mask,
            power_gate: params.power_gate,
            num_modules: stats.modules,
            instances: stats
                .instances
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::blocks::sram::{Sram, SramParamsBuilder};
    use crate::context::SramCtx;
    use crate::paths::out_report;
    use crate::tests::test_work_dir;

    #[test]
    fn test_report() {
        let params = SramParamsBuilder::default()
            .word_size(4)
            .num_rows(16)
            .build()
            .unwrap();
        let mut ctx = SramCtx::default();
        let sram = ctx.instantiate::<Sram>(&params).unwrap();
        let stats = crate::validate::validate(&sram).unwrap();
        let report = SramReport::new(&sram, &params, &stats, ctx.tech());

        assert_relative_eq!(
            report.width * ctx.tech().dbu_per_micron as f64,
            sram.width() as f64
        );
        assert_eq!(report.total_bits, 64);
        assert_eq!(report.instances["sram_cell_6t"], 64);

        let path = out_report(test_work_dir("test_report"), &report.name);
        report.save(&path).unwrap();
        let loaded: SramReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.instances, report.instances);
        assert_relative_eq!(loaded.height, report.height);
    }
}
