//! Test-only fakes and project scaffolding.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow};

use crate::io::console::{Console, NotifyLevel};
use crate::io::exec::{Exec, ExecOutput, ExecRequest};
use crate::io::layout::ControlPaths;
use crate::io::messenger::Messenger;
use crate::io::state::{RunState, load_run_state, write_run_state};

/// One canned process result for [`ScriptedExec`].
#[derive(Debug, Clone)]
pub struct ScriptedResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptedResult {
    pub fn ok(stdout: &str) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: &str) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

/// Executor returning queued results in order, without spawning processes.
pub struct ScriptedExec {
    results: RefCell<VecDeque<ScriptedResult>>,
    /// Rendered command lines, in invocation order.
    pub calls: RefCell<Vec<String>>,
}

impl ScriptedExec {
    pub fn new(results: Vec<ScriptedResult>) -> Self {
        Self {
            results: RefCell::new(results.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Queue more results after construction.
    pub fn push(&self, result: ScriptedResult) {
        self.results.borrow_mut().push_back(result);
    }
}

impl Exec for ScriptedExec {
    fn exec(&self, request: &ExecRequest) -> Result<ExecOutput> {
        let mut line = request.program.clone();
        for arg in &request.args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.borrow_mut().push(line.clone());

        let scripted = self
            .results
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted exec exhausted (command: {line})"))?;
        Ok(ExecOutput {
            exit_code: Some(scripted.exit_code),
            stdout: scripted.stdout.into_bytes(),
            stderr: scripted.stderr.into_bytes(),
            timed_out: false,
        })
    }
}

/// Messenger recording every delivered instruction.
#[derive(Default)]
pub struct RecordingMessenger {
    pub messages: RefCell<Vec<String>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<String> {
        self.messages.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

impl Messenger for RecordingMessenger {
    fn send(&self, message: &str) -> Result<()> {
        self.messages.borrow_mut().push(message.to_string());
        Ok(())
    }
}

/// Console answering every confirmation with a fixed value and recording
/// notifications.
pub struct StaticConsole {
    confirm_answer: bool,
    pub notices: RefCell<Vec<(NotifyLevel, String)>>,
}

impl StaticConsole {
    pub fn new(confirm_answer: bool) -> Self {
        Self {
            confirm_answer,
            notices: RefCell::new(Vec::new()),
        }
    }
}

impl Console for StaticConsole {
    fn notify(&self, message: &str, level: NotifyLevel) {
        self.notices.borrow_mut().push((level, message.to_string()));
    }

    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(self.confirm_answer)
    }
}

/// Temporary project directory with a root Cargo manifest, so stack
/// detection yields `cargo build` / `cargo test`.
pub struct TestProject {
    temp: tempfile::TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        fs::write(
            temp.path().join("Cargo.toml"),
            "[package]\nname = \"fixture\"\nversion = \"0.1.0\"\n",
        )?;
        Ok(Self { temp })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn paths(&self) -> ControlPaths {
        ControlPaths::new(self.root())
    }

    pub fn write_plan(&self, contents: &str) -> Result<()> {
        let paths = self.paths();
        fs::create_dir_all(&paths.dir)?;
        fs::write(&paths.plan_path, contents)?;
        Ok(())
    }

    pub fn write_triage(&self) -> Result<()> {
        let paths = self.paths();
        fs::create_dir_all(&paths.dir)?;
        fs::write(&paths.triage_path, "# Triage\n")?;
        Ok(())
    }

    pub fn read_state(&self) -> Result<RunState> {
        load_run_state(&self.paths().state_path)
    }

    pub fn write_state(&self, state: &RunState) -> Result<()> {
        write_run_state(&self.paths().state_path, state)
    }
}

/// Build output carrying `errors` heuristic error lines; exit code 0 when
/// clean, 1 otherwise.
pub fn build_result(errors: usize) -> ScriptedResult {
    if errors == 0 {
        return ScriptedResult::ok("Compiling fixture v0.1.0\nFinished dev profile\n");
    }
    let mut stderr = String::new();
    for i in 0..errors {
        stderr.push_str(&format!(
            "error[E0425]: cannot find value `missing_{i}` in this scope\n"
        ));
    }
    ScriptedResult::failed(1, &stderr)
}

/// Test-run output with a pass/fail exit code and no error-looking lines.
pub fn test_result(passed: bool) -> ScriptedResult {
    if passed {
        ScriptedResult::ok("test result: ok. 12 passed; 0 failed\n")
    } else {
        ScriptedResult::failed(1, "test result: FAILED. 11 passed; 1 failed\n")
    }
}
