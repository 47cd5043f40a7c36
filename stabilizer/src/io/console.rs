//! Operator-facing notifications and confirmations.
//!
//! Escalations and stop offers go to a human decision-maker; the rendering
//! surface is owned by the hosting environment. The CLI implementation is
//! non-interactive: notifications go to stderr and confirmations are
//! answered with a preset default (`--force` style flags).

use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

impl NotifyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NotifyLevel::Info => "info",
            NotifyLevel::Warning => "warning",
            NotifyLevel::Error => "error",
        }
    }
}

pub trait Console {
    fn notify(&self, message: &str, level: NotifyLevel);
    /// Ask a yes/no question. Implementations may answer without a human.
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Console writing to stderr, answering confirmations with a fixed default.
pub struct StderrConsole {
    confirm_default: bool,
}

impl StderrConsole {
    pub fn new(confirm_default: bool) -> Self {
        Self { confirm_default }
    }
}

impl Console for StderrConsole {
    fn notify(&self, message: &str, level: NotifyLevel) {
        eprintln!("[{}] {message}", level.as_str());
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        eprintln!(
            "[confirm] {prompt} (answering {})",
            if self.confirm_default { "yes" } else { "no" }
        );
        Ok(self.confirm_default)
    }
}
