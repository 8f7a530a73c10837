use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;

use crate::backend::{gds, lef, spice};
use crate::blocks::sram::power_gate::PowerGateSram;
use crate::blocks::sram::{Sram, SramParams};
use crate::cli::progress::StepContext;
use crate::config::SramConfig;
use crate::context::SramCtx;
use crate::module::Module;
use crate::paths::{out_gds, out_lef, out_report, out_spice, out_verilog};
use crate::report::SramReport;
use crate::tech::Tech;
use crate::validate::validate;
use crate::verilog::save_verilog;

/// A concrete plan for an SRAM.
pub struct SramPlan {
    pub sram_params: SramParams,
    pub tech: Tech,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TaskKey {
    GeneratePlan,
    GenerateModules,
    GenerateNetlist,
    GenerateLayout,
    GenerateVerilog,
    GenerateLef,
    GenerateReport,
}

pub struct ExecutePlanParams<'a> {
    pub work_dir: &'a Path,
    pub plan: &'a SramPlan,
    pub ctx: Option<&'a mut StepContext>,
}

/// Names end up in SPICE, GDS, LEF and Verilog, so they must be plain
/// identifiers.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn generate_plan(config: &SramConfig) -> Result<SramPlan> {
    if let Some(name) = &config.name {
        if !is_identifier(name) {
            bail!("SRAM name `{name}` must start with a letter and contain only letters, digits and underscores");
        }
    }
    let sram_params = config.params()?;
    let tech = config.tech().context("failed to load technology")?;
    Ok(SramPlan { sram_params, tech })
}

macro_rules! try_finish_task {
    ( $ctx:expr, $task:expr ) => {
        if let Some(ctx) = $ctx.as_mut() {
            ctx.finish($task);
        }
    };
}

/// Builds the top module; power gated SRAMs are wrapped in a header ring.
pub fn build(ctx: &mut SramCtx, params: &SramParams) -> crate::Result<Arc<Module>> {
    if params.power_gate {
        ctx.instantiate::<PowerGateSram>(params)
    } else {
        ctx.instantiate::<Sram>(params)
    }
}

pub fn execute_plan(params: ExecutePlanParams) -> Result<()> {
    let ExecutePlanParams {
        work_dir,
        plan,
        mut ctx,
    } = params;

    std::fs::create_dir_all(work_dir)?;

    let mut sctx = SramCtx::new(plan.tech.clone());
    let sram = build(&mut sctx, &plan.sram_params).context("failed to generate SRAM")?;
    let stats = validate(&sram).context("generated SRAM failed validation")?;
    info!(
        "generated {} ({} modules, {} x {})",
        sram.name(),
        stats.modules,
        sram.width(),
        sram.height()
    );
    try_finish_task!(ctx, TaskKey::GenerateModules);

    let name = sram.name().as_str();
    spice::save_netlist(&sram, out_spice(work_dir, name)).context("failed to write netlist")?;
    try_finish_task!(ctx, TaskKey::GenerateNetlist);

    gds::save_gds(&sram, sctx.tech(), out_gds(work_dir, name)).context("failed to write layout")?;
    try_finish_task!(ctx, TaskKey::GenerateLayout);

    save_verilog(out_verilog(work_dir, name), &sram)
        .context("failed to write behavioral model")?;
    try_finish_task!(ctx, TaskKey::GenerateVerilog);

    lef::save_lef(&sram, sctx.tech(), out_lef(work_dir, name)).context("failed to write abstract")?;
    try_finish_task!(ctx, TaskKey::GenerateLef);

    SramReport::new(&sram, &plan.sram_params, &stats, sctx.tech())
        .save(out_report(work_dir, name))
        .context("failed to write report")?;
    try_finish_task!(ctx, TaskKey::GenerateReport);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_work_dir;

    fn config(toml: &str) -> SramConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_rejects_bad_names() {
        for name in ["1sram", "my-sram", "", "sram x"] {
            let cfg = SramConfig {
                name: Some(name.to_string()),
                ..config("word_size = 4\nnum_rows = 16\n")
            };
            assert!(generate_plan(&cfg).is_err(), "{name}");
        }
        assert!(is_identifier("_sram_4x16"));
    }

    #[test]
    fn test_execute_plan() {
        let plan = generate_plan(&config(
            "name = \"sram_plan\"\nword_size = 4\nnum_rows = 16\nbranch_factors = [1, 2]\n",
        ))
        .unwrap();
        let work_dir = test_work_dir("test_execute_plan");
        execute_plan(ExecutePlanParams {
            work_dir: &work_dir,
            plan: &plan,
            ctx: None,
        })
        .unwrap();

        for path in [
            out_spice(&work_dir, "sram_plan"),
            out_gds(&work_dir, "sram_plan"),
            out_verilog(&work_dir, "sram_plan"),
            out_lef(&work_dir, "sram_plan"),
            out_report(&work_dir, "sram_plan"),
        ] {
            assert!(path.exists(), "{path:?} was not written");
        }
        let verilog = std::fs::read_to_string(out_verilog(&work_dir, "sram_plan")).unwrap();
        assert!(verilog.contains("module sram_plan ("));
    }

    #[test]
    fn test_power_gated_top() {
        let plan = generate_plan(&config("word_size = 4\nnum_rows = 16\npower_gate = true\n")).unwrap();
        let mut ctx = SramCtx::new(plan.tech.clone());
        let top = build(&mut ctx, &plan.sram_params).unwrap();
        assert_eq!(top.name().as_str(), "power_gate_sram_4x16_w1_b1x1_pg");
        assert!(top.has_port("sleep"));
    }
}
