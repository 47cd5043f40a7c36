//! Plan document access and the closing triage artifact.

use std::fs;
use std::io;

use anyhow::{Context, Result};
use tracing::warn;

use crate::io::layout::ControlPaths;

/// Read the plan document, if any.
///
/// The primary location is inside the control directory. Agents sometimes
/// write the plan at the conventional project-root path instead; when that
/// happens the file is relocated to the primary location transparently.
pub fn read_plan(paths: &ControlPaths) -> Result<Option<String>> {
    match fs::read_to_string(&paths.plan_path) {
        Ok(contents) => return Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("read plan {}", paths.plan_path.display()));
        }
    }

    match fs::read_to_string(&paths.plan_fallback_path) {
        Ok(contents) => {
            warn!(
                from = %paths.plan_fallback_path.display(),
                to = %paths.plan_path.display(),
                "relocating plan to the control directory"
            );
            fs::create_dir_all(&paths.dir)
                .with_context(|| format!("create directory {}", paths.dir.display()))?;
            fs::write(&paths.plan_path, &contents)
                .with_context(|| format!("write plan {}", paths.plan_path.display()))?;
            fs::remove_file(&paths.plan_fallback_path).with_context(|| {
                format!("remove fallback plan {}", paths.plan_fallback_path.display())
            })?;
            Ok(Some(contents))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| {
            format!("read fallback plan {}", paths.plan_fallback_path.display())
        }),
    }
}

/// The closing artifact's mere existence signals that the done phase is
/// truly finished; its content is not checked.
pub fn triage_exists(paths: &ControlPaths) -> bool {
    paths.triage_path.exists()
}
