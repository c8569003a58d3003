//! The parent side of the fan-out.
//!
//! One child process per worker, each re-running this executable in worker
//! mode. The parent blocks in `wait(2)` until every child has been reaped and
//! collects each child's message from its stdout pipe as it is reaped.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::wait::{wait, waitpid, WaitStatus};
use nix::unistd::Pid;
use num_bigint::BigUint;
use tracing::{debug, info, warn, Level};

use crate::cli::WORKER_MODE;
use crate::report::Slot;
use crate::worker::WorkerMessage;
use crate::workload::{to_u64, Width};

/// Number of logical CPUs, 1 if it cannot be determined.
pub fn logical_cpus() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Seed for the worker at `index`.
///
/// NOTE: every worker runs the full iteration count, only the seed differs,
/// so adding workers does not split the work. Kept that way on purpose so the
/// results stay comparable with earlier runs; it is not a partitioning scheme.
pub fn seed_for(index: usize) -> u64 {
    index as u64 * 4
}

/// Repeats `f` for as long as a signal interrupts it.
fn retry_eintr<T>(mut f: impl FnMut() -> nix::Result<T>) -> nix::Result<T> {
    loop {
        match f() {
            Err(Errno::EINTR) => continue,
            result => return result,
        }
    }
}

#[derive(Debug)]
struct Worker {
    index: usize,
    child: Child,
}

impl Worker {
    /// Drains the stdout pipe of an already reaped child.
    fn message(&mut self) -> Option<WorkerMessage> {
        let mut channel = String::new();
        let read = self
            .child
            .stdout
            .take()
            .map(|mut stdout| stdout.read_to_string(&mut channel));

        if let Some(Err(e)) = read {
            warn!(worker = self.index, "failed to read worker channel: {}", e);
            return None;
        }

        match WorkerMessage::decode(&channel) {
            Ok(message) => message,
            Err(e) => {
                warn!(worker = self.index, "{:#}", e);
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FanOut {
    /// Executable to re-run in worker mode, normally `std::env::current_exe()`.
    pub exe: PathBuf,
    pub width: Width,
    pub workers: usize,
    /// Forwarded so workers log at the same verbosity.
    pub log_level: Level,
}

impl FanOut {
    fn worker_command(&self, iterations: u64, seed: u64) -> Command {
        let mut cmd = Command::new(&self.exe);
        if self.width.is_wide() {
            cmd.arg("--wide");
        }
        if self.log_level == Level::DEBUG {
            cmd.arg("--debug");
        } else if self.log_level == Level::ERROR {
            cmd.arg("--quiet");
        }

        cmd.arg(WORKER_MODE)
            .arg(iterations.to_string())
            .arg(seed.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        cmd
    }

    /// Spawns every worker and blocks until all of them have exited.
    ///
    /// Returns one slot per worker in spawn order. A worker that exits without
    /// a readable message leaves its slot's hash unset; that is not an error.
    pub fn run(&self, iterations: u64) -> Result<Vec<Slot>> {
        let mut slots: Vec<Slot> = (0..self.workers)
            .map(|index| Slot {
                index,
                seed: seed_for(index),
                hash: None,
            })
            .collect();

        let mut active: HashMap<Pid, Worker> = HashMap::with_capacity(self.workers);
        for slot in &slots {
            let child = match self.worker_command(iterations, slot.seed).spawn() {
                Ok(child) => child,
                Err(e) => {
                    abort(active);
                    return Err(e)
                        .with_context(|| format!("failed to spawn worker #{}", slot.index + 1));
                }
            };

            let pid = Pid::from_raw(child.id() as i32);
            debug!(worker = slot.index, %pid, seed = slot.seed, "spawned");
            active.insert(
                pid,
                Worker {
                    index: slot.index,
                    child,
                },
            );
        }

        info!(workers = active.len(), iterations, "waiting for workers");
        while !active.is_empty() {
            let pid = match retry_eintr(wait).context("failed waiting for workers")? {
                WaitStatus::Exited(pid, code) => {
                    if code != 0 {
                        warn!(%pid, code, "worker exited unsuccessfully");
                    }
                    pid
                }
                WaitStatus::Signaled(pid, signal, _) => {
                    warn!(%pid, ?signal, "worker killed by signal");
                    pid
                }
                _ => continue,
            };

            let Some(mut worker) = active.remove(&pid) else {
                warn!(%pid, "reaped a process that is not a worker");
                continue;
            };

            let slot = &mut slots[worker.index];
            match worker.message() {
                Some(message) => {
                    if message.seed != BigUint::from(slot.seed) {
                        warn!(
                            worker = worker.index,
                            expected = slot.seed,
                            got = %message.seed,
                            "worker reported for another seed"
                        );
                    }
                    debug!(worker = worker.index, hash = %message.hash, "result");
                    slot.hash = to_u64(&message.hash);
                    if slot.hash.is_none() {
                        warn!(worker = worker.index, hash = %message.hash, "result out of range");
                    }
                }
                None => warn!(worker = worker.index, "worker exited without a result"),
            }
        }

        Ok(slots)
    }
}

/// Kills and reaps workers that were already started.
fn abort(active: HashMap<Pid, Worker>) {
    for (pid, mut worker) in active {
        if let Err(e) = worker.child.kill() {
            warn!(worker = worker.index, %pid, "failed to kill worker: {}", e);
        }
        if let Err(e) = retry_eintr(|| waitpid(pid, None)) {
            warn!(worker = worker.index, %pid, "failed to reap worker: {}", e);
        }
    }
}
