use std::time::Instant;

use hashbench::cli::{Command, Driver};
use hashbench::error::{BenchError, Result};
use hashbench::report::{Mode, Report, Slot};

fn main() {
    let start = Instant::now();
    let result = run(start);
    hashbench::exit(start, result);
}

fn run(start: Instant) -> Result<()> {
    let args = hashbench::parse_args(Driver::Single)?;

    let iterations = match args.command {
        Command::Run { iterations } => iterations,
        // worker mode is only recognised by the fan-out driver
        Command::Worker { .. } => return Err(BenchError::Usage),
    };

    tracing::debug!(iterations, wide = args.width.is_wide(), "running");
    let hash = args.width.run(iterations, 0);
    let elapsed = start.elapsed();

    let report = Report {
        mode: Mode::Single,
        iterations,
        wide: args.width.is_wide(),
        results: vec![Slot {
            index: 0,
            seed: 0,
            hash: Some(hash),
        }],
        elapsed_ms: elapsed.as_millis() as u64,
    };

    hashbench::publish(&report, elapsed, args.output.as_deref())?;
    Ok(())
}
