use std::fs::canonicalize;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::args::Args;
use crate::cli::progress::StepContext;
use crate::config::parse_sram_config;
use crate::plan::{execute_plan, generate_plan, ExecutePlanParams, TaskKey};

pub mod args;
pub mod progress;

pub const BANNER: &str = r"
    _    __  __  ____
   / \  |  \/  |/ ___|
  / _ \ | |\/| | |
 / ___ \| |  | | |___
/_/   \_\_|  |_|\____|

Asynchronous Memory Compiler
";

pub fn run() -> Result<()> {
    let args = Args::parse();

    let config_path = canonicalize(&args.config)?;

    if !args.quiet {
        println!("{BANNER}");
        println!("Reading configuration file...\n");
    }
    let config = parse_sram_config(&config_path)?;

    if !args.quiet {
        let (outer, inner) = (config.branch_factors[0], config.branch_factors[1]);
        println!("Configuration file: {:?}", &config_path);
        println!("SRAM parameters:");
        println!("\tWord size: {}", config.word_size);
        println!("\tWords per row: {}", config.words_per_row as usize);
        println!("\tRows: {}", config.num_rows);
        println!("\tSub-banks: {}", config.num_subanks);
        println!("\tBanks: {outer} x {inner}");
        println!("\tWrite mask: {}", config.mask);
        println!("\tPower gating: {}\n", config.power_gate);
    }

    let mut ctx = if args.quiet {
        None
    } else {
        Some(StepContext::new())
    };

    let plan = match ctx.as_mut() {
        Some(ctx) => ctx.check(generate_plan(&config))?,
        None => generate_plan(&config)?,
    };
    if let Some(ctx) = ctx.as_mut() {
        ctx.finish(TaskKey::GeneratePlan);
    }

    let work_dir = if let Some(output_dir) = args.output_dir {
        output_dir
    } else {
        PathBuf::from(plan.sram_params.name().as_str())
    };
    std::fs::create_dir_all(&work_dir)?;
    let work_dir = canonicalize(work_dir)?;

    let res = execute_plan(ExecutePlanParams {
        work_dir: &work_dir,
        plan: &plan,
        ctx: ctx.as_mut(),
    });

    match ctx.as_mut() {
        Some(ctx) => ctx.check(res)?,
        None => res?,
    }
    if !args.quiet {
        println!("Artifacts saved to: {:?}\n", &work_dir);
    }

    Ok(())
}
