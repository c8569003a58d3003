use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process;

use lexopt::Parser;
use num_bigint::BigUint;
use tracing::Level;

use crate::error::{BenchError, Result};
use crate::workload::Width;

/// Literal first positional that switches the fan-out driver into worker mode.
pub const WORKER_MODE: &str = "fork";

/// Which binary is parsing its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Single,
    FanOut,
}

impl Driver {
    pub fn bin_name(self) -> &'static str {
        match self {
            Driver::Single => "hashbench",
            Driver::FanOut => "hashbench-mp",
        }
    }
}

fn print_version(driver: Driver) {
    println!(
        "{bin} ({crate_name}) {crate_version}",
        bin = driver.bin_name(),
        crate_name = env!("CARGO_PKG_NAME"),
        crate_version = env!("CARGO_PKG_VERSION")
    );
}

fn print_help(driver: Driver) {
    let about = match driver {
        Driver::Single => {
            r#"Runs the hash loop once in this process, starting from a zero seed, and
prints the resulting hash followed by the elapsed wall-clock time."#
        }
        Driver::FanOut => {
            r#"Spawns one worker process per logical CPU. Every worker runs the full hash
loop with its own seed (worker #i starts from (i - 1) * 4) and reports the
hash back through a pipe. Results are printed in spawn order once every
worker has exited, followed by the total elapsed wall-clock time."#
        }
    };

    let workers = match driver {
        Driver::Single => "",
        Driver::FanOut => {
            r#"
    -w N, --workers N
        Number of worker processes. Defaults to the number of logical CPUs.
"#
        }
    };

    println!(
        "{}",
        format!(
            r#"
{crate_name} {crate_version}

{about}

USAGE:
    {bin} [flags] <COUNT>

ARGS:
    <COUNT>
        Number of loop iterations. Parsed as a number, must be finite and
        greater than zero, fractions are truncated.

OPTIONS:
    --wide
        Use arbitrary-precision integers instead of 64-bit ones.

    -o OUTPUT, --output OUTPUT
        Also write the results as JSON to OUTPUT.
{workers}
    -q, --quiet
        Only log errors to stderr.

    -d, --debug
        Log debug events to stderr. HASHBENCH_LOG (or RUST_LOG) takes
        precedence over both flags.

EXIT CODES:
    0 success, 1 missing COUNT, 2 invalid COUNT, 3 any other failure.
"#,
            bin = driver.bin_name(),
            crate_name = env!("CARGO_PKG_NAME"),
            crate_version = env!("CARGO_PKG_VERSION"),
        )
        .trim()
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Benchmark `iterations` loop iterations.
    Run { iterations: u64 },
    /// Hidden mode: compute one workload and report it to the parent.
    Worker { value: BigUint, seed: BigUint },
}

#[derive(Debug)]
pub struct Args {
    pub command: Command,
    pub width: Width,
    pub output: Option<PathBuf>,
    pub workers: Option<usize>,
    pub log_level: Level,
}

impl Args {
    pub fn parse(driver: Driver) -> Result<Args> {
        Args::parse_impl(driver, lexopt::Parser::from_env())
    }

    fn parse_impl(driver: Driver, mut parser: Parser) -> Result<Args> {
        use lexopt::prelude::*;

        let mut width = Width::Plain;
        let mut output = None;
        let mut workers = None;
        let mut log_level = Level::WARN;
        let mut positionals: Vec<OsString> = vec![];

        while let Some(arg) = parser.next()? {
            match arg {
                Long("wide") => width = Width::Wide,

                // -o=X, --output=X
                Short('o') | Long("output") => {
                    output = Some(parser.value()?.into());
                }

                // -w=N, --workers=N
                Short('w') | Long("workers") if driver == Driver::FanOut => {
                    let value = parser.value()?;
                    workers = Some(parse_workers(&value)?);
                }

                Short('q') | Long("quiet") => log_level = Level::ERROR,
                Short('d') | Long("debug") => log_level = Level::DEBUG,

                // -h, --help
                Short('h') | Long("help") => {
                    print_help(driver);
                    process::exit(0);
                }

                // -v, --version
                Short('v') | Long("version") => {
                    print_version(driver);
                    process::exit(0);
                }

                // a negative count looks like a short flag, keep it as a value
                // so it is rejected as an invalid count rather than a bad flag
                Short(c) if c.is_ascii_digit() || c == '.' => {
                    let rest = parser.optional_value().unwrap_or_default();
                    positionals.push(format!("-{}{}", c, rest.to_string_lossy()).into());
                }

                Value(other) => positionals.push(other),

                _ => return Err(arg.unexpected().into()),
            }
        }

        let command = Args::command(driver, width, &positionals)?;

        Ok(Args {
            command,
            width,
            output,
            workers,
            log_level,
        })
    }

    fn command(driver: Driver, width: Width, positionals: &[OsString]) -> Result<Command> {
        if driver == Driver::FanOut && positionals.len() >= 3 && positionals[0] == WORKER_MODE {
            return Ok(Command::Worker {
                value: parse_integer(width, &positionals[1])?,
                seed: parse_integer(width, &positionals[2])?,
            });
        }

        match positionals.last() {
            Some(count) => Ok(Command::Run {
                iterations: parse_count(count)?,
            }),
            None => Err(BenchError::Usage),
        }
    }
}

fn invalid(s: &OsStr) -> BenchError {
    BenchError::InvalidArgument(s.to_string_lossy().into_owned())
}

/// Parses an iteration count: any finite number greater than zero, truncated.
pub fn parse_count(s: &OsStr) -> Result<u64> {
    let n: f64 = s
        .to_str()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| invalid(s))?;

    if !n.is_finite() || n <= 0.0 {
        return Err(invalid(s));
    }

    // saturates for counts beyond u64::MAX
    Ok(n.trunc() as u64)
}

/// Parses a worker's count or seed. Only the wide representation takes
/// values beyond `u64`.
fn parse_integer(width: Width, s: &OsStr) -> Result<BigUint> {
    let n: BigUint = s
        .to_str()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| invalid(s))?;

    if !width.is_wide() && n.bits() > 64 {
        return Err(invalid(s));
    }

    Ok(n)
}

fn parse_workers(s: &OsStr) -> Result<usize> {
    match s.to_str().and_then(|s| s.trim().parse::<usize>().ok()) {
        Some(n) if n > 0 => Ok(n),
        _ => Err(invalid(s)),
    }
}
