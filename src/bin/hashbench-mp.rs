use std::env;
use std::time::Instant;

use anyhow::Context;
use hashbench::cli::{Command, Driver};
use hashbench::error::Result;
use hashbench::harness::{logical_cpus, FanOut};
use hashbench::report::{Mode, Report};
use hashbench::worker;

fn main() {
    let start = Instant::now();
    let result = run(start);
    hashbench::exit(start, result);
}

fn run(start: Instant) -> Result<()> {
    let args = hashbench::parse_args(Driver::FanOut)?;

    let iterations = match args.command {
        Command::Run { iterations } => iterations,
        Command::Worker { value, seed } => {
            worker::run(args.width, &value, &seed)?;
            return Ok(());
        }
    };

    let fan_out = FanOut {
        exe: env::current_exe().context("failed to locate the current executable")?,
        width: args.width,
        workers: args.workers.unwrap_or_else(logical_cpus),
        log_level: args.log_level,
    };

    let results = fan_out.run(iterations)?;
    let elapsed = start.elapsed();

    let report = Report {
        mode: Mode::FanOut,
        iterations,
        wide: args.width.is_wide(),
        results,
        elapsed_ms: elapsed.as_millis() as u64,
    };

    hashbench::publish(&report, elapsed, args.output.as_deref())?;
    Ok(())
}
