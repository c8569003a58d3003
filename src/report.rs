//! What the drivers print, and the optional JSON copy of it.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Single,
    FanOut,
}

/// One result slot. `hash` stays `None` if the worker never reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub index: usize,
    pub seed: u64,
    pub hash: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub mode: Mode,
    pub iterations: u64,
    pub wide: bool,
    pub results: Vec<Slot>,
    pub elapsed_ms: u64,
}

impl Report {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))
    }
}

/// The result lines, without the timing line.
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for slot in &self.results {
            let hash = slot
                .hash
                .map(|h| h.to_string())
                .unwrap_or_else(|| "unset".into());
            match self.mode {
                Mode::Single => writeln!(f, "{}", hash)?,
                Mode::FanOut => writeln!(f, "worker result #{}: {}", slot.index + 1, hash)?,
            }
        }

        Ok(())
    }
}

pub fn time_line(elapsed: Duration) -> String {
    format!("time: {}ms", elapsed.as_millis())
}
