//! The child side of the fan-out: compute one workload, send one message.
//!
//! A worker's stdout is a pipe owned by the parent, so the message is written
//! there as a single JSON line and nothing else may be printed to it.

use std::io::{self, Write};

use anyhow::{Context, Result};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::workload::{self, to_u64, Width};

/// Numbers travel as decimal strings so seeds and hashes of any size survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerMessage {
    #[serde(with = "decimal")]
    pub seed: BigUint,
    #[serde(with = "decimal")]
    pub hash: BigUint,
}

mod decimal {
    use num_bigint::BigUint;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(n: &BigUint, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(n)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(D::Error::custom)
    }
}

impl WorkerMessage {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reads the first line of whatever the worker wrote. `None` when the
    /// worker exited without sending anything.
    pub fn decode(channel: &str) -> Result<Option<WorkerMessage>> {
        let line = channel.lines().map(str::trim).find(|l| !l.is_empty());
        match line {
            Some(line) => serde_json::from_str(line)
                .map(Some)
                .with_context(|| format!("malformed worker message: {:?}", line)),
            None => Ok(None),
        }
    }
}

fn compute(width: Width, value: &BigUint, seed: &BigUint) -> Result<BigUint> {
    match width {
        Width::Wide => Ok(workload::workload(value.clone(), seed.clone())),
        Width::Plain => {
            let value = to_u64(value).context("count does not fit a 64-bit worker")?;
            let seed = to_u64(seed).context("seed does not fit a 64-bit worker")?;
            Ok(BigUint::from(workload::workload(value, seed)))
        }
    }
}

pub fn run(width: Width, value: &BigUint, seed: &BigUint) -> Result<()> {
    let hash = compute(width, value, seed)?;
    tracing::debug!(%value, %seed, %hash, "workload done");

    let message = WorkerMessage {
        seed: seed.clone(),
        hash,
    }
    .encode()?;
    let mut channel = io::stdout().lock();
    writeln!(channel, "{}", message).context("failed to message the parent")?;
    channel.flush().context("failed to message the parent")?;

    Ok(())
}
