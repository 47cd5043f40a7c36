//! Outbound instruction channel to the code-editing actor.
//!
//! The controller emits at most one instruction per invocation. Delivery is
//! owned by the hosting environment; this seam only hands the message over.

use anyhow::{Context, Result};
use std::io::Write;

pub trait Messenger {
    fn send(&self, message: &str) -> Result<()>;
}

/// Prints instructions to stdout for the hosting harness to deliver.
pub struct StdoutMessenger;

impl Messenger for StdoutMessenger {
    fn send(&self, message: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{message}").context("write instruction to stdout")?;
        Ok(())
    }
}
