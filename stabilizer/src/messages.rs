//! Actor instruction rendering.
//!
//! Every outbound instruction is rendered from an embedded template with
//! enough phase/step context (step number, total steps, latest error count)
//! to be self-contained even if the actor's memory was compacted or reset.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::types::{Phase, PlanStep, VerifyResult};
use crate::io::layout::{plan_display_path, triage_display_path};
use crate::io::state::RunState;

const PLANNING_TEMPLATE: &str = include_str!("messages/planning.md");
const ORGANIZE_ONLY_TEMPLATE: &str = include_str!("messages/organize_only.md");
const PLANNING_RETRY_TEMPLATE: &str = include_str!("messages/planning_retry.md");
const PLAN_REJECTED_TEMPLATE: &str = include_str!("messages/plan_rejected.md");
const EXECUTE_STEP_TEMPLATE: &str = include_str!("messages/execute_step.md");
const RETRY_STEP_TEMPLATE: &str = include_str!("messages/retry_step.md");
const ESCALATE_STEP_TEMPLATE: &str = include_str!("messages/escalate_step.md");
const VERIFY_REPORT_TEMPLATE: &str = include_str!("messages/verify_report.md");
const CYCLE_ESCALATE_TEMPLATE: &str = include_str!("messages/cycle_escalate.md");
const RESUME_TEMPLATE: &str = include_str!("messages/resume.md");

/// Inputs for the initial planning instruction.
#[derive(Debug, Clone, Serialize)]
pub struct PlanningContext {
    pub build_commands: String,
    pub test_commands: String,
    pub error_count: usize,
    pub build_output: String,
    pub test_output: Option<String>,
}

/// Inputs for the final verification report (both outcomes).
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReportContext {
    pub build_passed: bool,
    pub tests_ran: bool,
    pub tests_passed: bool,
    pub all_green: bool,
    pub build_output: Option<String>,
    pub test_output: Option<String>,
}

/// Template engine wrapper around minijinja.
pub struct MessageEngine {
    env: Environment<'static>,
}

impl Default for MessageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        let templates = [
            ("planning", PLANNING_TEMPLATE),
            ("organize_only", ORGANIZE_ONLY_TEMPLATE),
            ("planning_retry", PLANNING_RETRY_TEMPLATE),
            ("plan_rejected", PLAN_REJECTED_TEMPLATE),
            ("execute_step", EXECUTE_STEP_TEMPLATE),
            ("retry_step", RETRY_STEP_TEMPLATE),
            ("escalate_step", ESCALATE_STEP_TEMPLATE),
            ("verify_report", VERIFY_REPORT_TEMPLATE),
            ("cycle_escalate", CYCLE_ESCALATE_TEMPLATE),
            ("resume", RESUME_TEMPLATE),
        ];
        for (name, source) in templates {
            env.add_template(name, source)
                .expect("embedded template should be valid");
        }
        Self { env }
    }

    pub fn planning(&self, ctx: &PlanningContext) -> Result<String> {
        let template = self.env.get_template("planning")?;
        let rendered = template.render(context! {
            build_commands => ctx.build_commands,
            test_commands => ctx.test_commands,
            error_count => ctx.error_count,
            build_output => ctx.build_output,
            test_output => ctx.test_output,
            plan_path => plan_display_path(),
        })?;
        Ok(rendered)
    }

    pub fn organize_only(&self) -> Result<String> {
        let template = self.env.get_template("organize_only")?;
        let rendered = template.render(context! { plan_path => plan_display_path() })?;
        Ok(rendered)
    }

    pub fn planning_retry(&self, attempt: u32, max_attempts: u32) -> Result<String> {
        let template = self.env.get_template("planning_retry")?;
        let rendered = template.render(context! {
            attempt,
            max_attempts,
            plan_path => plan_display_path(),
        })?;
        Ok(rendered)
    }

    pub fn plan_rejected(
        &self,
        reason: &str,
        attempt: u32,
        max_attempts: u32,
        baseline_error_count: usize,
    ) -> Result<String> {
        let template = self.env.get_template("plan_rejected")?;
        let rendered = template.render(context! {
            reason,
            attempt,
            max_attempts,
            baseline_error_count,
            plan_path => plan_display_path(),
        })?;
        Ok(rendered)
    }

    pub fn execute_step(&self, step: &PlanStep, state: &RunState) -> Result<String> {
        let template = self.env.get_template("execute_step")?;
        let build_command = state
            .build_commands
            .first()
            .map(String::as_str)
            .unwrap_or("cargo build");
        let rendered = template.render(context! {
            number => step.number,
            total => state.total_steps,
            category => step.category.as_str(),
            description => step.description,
            error_count => state.current_error_count,
            build_command,
            commit_prefix => step.category.commit_prefix(),
        })?;
        Ok(rendered)
    }

    pub fn retry_step(
        &self,
        step: &PlanStep,
        verdict: &VerifyResult,
        attempt: u32,
        max_attempts: u32,
        build_output: &str,
    ) -> Result<String> {
        let template = self.env.get_template("retry_step")?;
        let rendered = template.render(context! {
            number => step.number,
            attempt,
            max_attempts,
            reason => verdict.reason,
            build_output,
        })?;
        Ok(rendered)
    }

    pub fn escalate_step(&self, step: &PlanStep, max_attempts: u32) -> Result<String> {
        let template = self.env.get_template("escalate_step")?;
        let rendered = template.render(context! {
            number => step.number,
            max_attempts,
            category => step.category.as_str(),
            description => step.description,
        })?;
        Ok(rendered)
    }

    pub fn verify_report(&self, ctx: &VerifyReportContext) -> Result<String> {
        let template = self.env.get_template("verify_report")?;
        let rendered = template.render(context! {
            build_passed => ctx.build_passed,
            tests_ran => ctx.tests_ran,
            tests_passed => ctx.tests_passed,
            all_green => ctx.all_green,
            build_output => ctx.build_output,
            test_output => ctx.test_output,
            plan_path => plan_display_path(),
            triage_path => triage_display_path(),
        })?;
        Ok(rendered)
    }

    pub fn cycle_escalation(&self, max_cycles: u32, remaining_errors: usize) -> Result<String> {
        let template = self.env.get_template("cycle_escalate")?;
        let rendered = template.render(context! { max_cycles, remaining_errors })?;
        Ok(rendered)
    }

    pub fn resume(&self, phase: Phase) -> Result<String> {
        let template = self.env.get_template("resume")?;
        let rendered = template.render(context! {
            phase => phase.as_str(),
            plan_path => plan_display_path(),
        })?;
        Ok(rendered.trim().to_string())
    }
}
