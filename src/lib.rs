//! A CPU-bound hash loop benchmark.
//!
//! `hashbench` runs the loop once in-process, `hashbench-mp` runs it once per
//! logical CPU in separate worker processes. Both print the result(s) and the
//! elapsed wall-clock time.

use std::path::Path;
use std::process;
use std::time::{Duration, Instant};

use tracing::Level;

pub mod cli;
pub mod error;
pub mod harness;
pub mod logging;
pub mod report;
pub mod worker;
pub mod workload;

use crate::cli::{Args, Driver};
use crate::error::BenchError;
use crate::report::{time_line, Report};

/// Parses the command line and installs logging.
///
/// Logging starts even when parsing fails, at the default level, so the
/// rejection itself can still be logged.
pub fn parse_args(driver: Driver) -> error::Result<Args> {
    let args = Args::parse(driver);
    let level = args.as_ref().map_or(Level::WARN, |args| args.log_level);
    init_logging(level);
    args
}

pub fn init_logging(level: Level) {
    logging::init(
        logging::LogConfig::default()
            .with_level(level)
            .with_env_overrides(),
    );
}

/// Prints the report and the timing line, then writes the JSON copy if asked.
pub fn publish(report: &Report, elapsed: Duration, output: Option<&Path>) -> anyhow::Result<()> {
    print!("{}", report);
    println!("{}", time_line(elapsed));

    if let Some(path) = output {
        report.write_json(path)?;
    }

    Ok(())
}

/// Exits the process with the code matching `result`.
///
/// Usage problems are printed on stdout followed by the timing line, the way
/// a successful run ends; anything else goes to stderr.
pub fn exit(start: Instant, result: error::Result<()>) -> ! {
    match result {
        Ok(()) => process::exit(0),
        Err(e) if e.is_runtime() => {
            eprintln!("error: {:#}", e);
            process::exit(e.exit_code());
        }
        Err(e) => {
            if let BenchError::InvalidArgument(arg) = &e {
                tracing::debug!(arg = arg.as_str(), "rejected argument");
            }
            println!("{}", e);
            println!("{}", time_line(start.elapsed()));
            process::exit(e.exit_code());
        }
    }
}
