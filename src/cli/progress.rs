use std::fmt::Display;
use std::time::Duration;

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::plan::TaskKey;

#[derive(PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Pending,
    InProgress,
    Skipped,
    Failed,
}

pub struct StepContext {
    step_num: usize,
    steps: Vec<Step>,
}

pub struct Step {
    desc: &'static str,
    key: TaskKey,
    progress_bar: ProgressBar,
}

const STEPS: [(&str, TaskKey); 7] = [
    ("Generate plan", TaskKey::GeneratePlan),
    ("Generate modules", TaskKey::GenerateModules),
    ("Generate netlist", TaskKey::GenerateNetlist),
    ("Generate layout", TaskKey::GenerateLayout),
    ("Generate Verilog", TaskKey::GenerateVerilog),
    ("Generate LEF", TaskKey::GenerateLef),
    ("Generate report", TaskKey::GenerateReport),
];

impl StepContext {
    pub fn new() -> Self {
        println!("Tasks:");

        let mp = MultiProgress::new();
        let width = format!("{}", STEPS.len()).len();
        let mut steps = Vec::with_capacity(STEPS.len());
        for (i, (desc, key)) in STEPS.into_iter().enumerate() {
            let mut step = Step {
                desc,
                key,
                progress_bar: mp.add(ProgressBar::new_spinner()),
            };
            let msg = format!("[{:width$}/{:width$}] {}", i + 1, STEPS.len(), step.desc);
            step.set_status(StepStatus::Pending, Some(msg));
            steps.push(step);
        }
        steps[0].set_status(StepStatus::InProgress, None);
        StepContext { step_num: 0, steps }
    }

    #[inline]
    pub fn current_step(&mut self) -> Option<&mut Step> {
        self.steps.get_mut(self.step_num)
    }

    /// Marks the current step failed and every later step skipped if `res`
    /// is an error.
    pub fn check<T, E>(&mut self, res: Result<T, E>) -> Result<T, E> {
        if res.is_err() {
            if let Some(current_step) = self.current_step() {
                current_step.set_status(StepStatus::Failed, None);
                self.step_num += 1;
                while let Some(current_step) = self.current_step() {
                    current_step.set_status(StepStatus::Skipped, None);
                    self.step_num += 1;
                }
            }
            println!("\n");
        }

        res
    }

    pub fn finish(&mut self, key: TaskKey) {
        let Some(current_step) = self.current_step() else {
            log::warn!("step {key:?} finished after all steps were completed");
            return;
        };
        if current_step.key != key {
            log::warn!("step {key:?} finished out of order");
        }
        current_step.set_status(StepStatus::Done, None);
        self.step_num += 1;

        if let Some(current_step) = self.current_step() {
            current_step.set_status(StepStatus::InProgress, None);
        } else {
            println!("\n\nCompleted all tasks");
        }
    }
}

impl Default for StepContext {
    fn default() -> Self {
        Self::new()
    }
}

fn format_template(spinner: bool, status: impl Display) -> String {
    if spinner {
        format!("{{spinner:.green}} {:16} {{msg}}", status)
    } else {
        format!("  {:16} {{msg}}", status)
    }
}

impl Step {
    fn set_status(&mut self, status: StepStatus, msg: Option<String>) {
        let status_template = match status {
            StepStatus::Done => format_template(false, "Done".green().bold()),
            StepStatus::Failed => format_template(false, "Failed".bright_white().on_red().bold()),
            StepStatus::InProgress => format_template(true, "In Progress".bright_white().bold()),
            StepStatus::Pending => format_template(true, "Pending".blue().bold()),
            StepStatus::Skipped => format_template(false, "Skipped".yellow().bold()),
        };
        self.progress_bar.set_style(
            ProgressStyle::with_template(&status_template)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        if let Some(msg) = msg {
            self.progress_bar.set_message(msg);
        }

        if status == StepStatus::InProgress {
            self.progress_bar
                .enable_steady_tick(Duration::from_millis(200));
        } else if status != StepStatus::Pending {
            self.progress_bar.finish();
        }
    }
}
