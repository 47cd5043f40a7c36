//! Filesystem layout of the project-local control directory.

use std::path::{Path, PathBuf};

/// Hidden control directory inside the target project.
pub const CONTROL_DIR: &str = ".stabilizer";
pub const STATE_FILE: &str = "state.json";
pub const CONFIG_FILE: &str = "config.toml";
pub const PLAN_FILE: &str = "plan.md";
pub const TRIAGE_FILE: &str = "triage.md";
/// Conventional root-level path agents sometimes write the plan to instead
/// of the control directory.
pub const PLAN_FALLBACK_FILE: &str = "stabilizer-plan.md";

/// Resolved paths of all control files for one project.
#[derive(Debug, Clone)]
pub struct ControlPaths {
    pub dir: PathBuf,
    pub state_path: PathBuf,
    pub config_path: PathBuf,
    pub plan_path: PathBuf,
    pub plan_fallback_path: PathBuf,
    pub triage_path: PathBuf,
}

impl ControlPaths {
    pub fn new(root: &Path) -> Self {
        let dir = root.join(CONTROL_DIR);
        Self {
            state_path: dir.join(STATE_FILE),
            config_path: dir.join(CONFIG_FILE),
            plan_path: dir.join(PLAN_FILE),
            plan_fallback_path: root.join(PLAN_FALLBACK_FILE),
            triage_path: dir.join(TRIAGE_FILE),
            dir,
        }
    }
}

/// Project-relative plan path for use in actor-facing messages.
pub fn plan_display_path() -> String {
    format!("{CONTROL_DIR}/{PLAN_FILE}")
}

/// Project-relative triage path for use in actor-facing messages.
pub fn triage_display_path() -> String {
    format!("{CONTROL_DIR}/{TRIAGE_FILE}")
}
