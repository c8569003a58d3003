use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use serde_json::Value;

const SINGLE: &str = env!("CARGO_BIN_EXE_hashbench");
const FAN_OUT: &str = env!("CARGO_BIN_EXE_hashbench-mp");

struct Run {
    code: i32,
    stdout: String,
}

impl Run {
    fn lines(&self) -> Vec<&str> {
        self.stdout.lines().collect()
    }

    /// Everything but the trailing timing line.
    fn results(&self) -> Vec<&str> {
        let mut lines = self.lines();
        let time = lines.pop().expect("no output");
        assert!(
            time.starts_with("time: ") && time.ends_with("ms"),
            "bad timing line: {:?}",
            time
        );
        lines
    }
}

fn command(bin: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(bin);
    cmd.args(args)
        .env_remove("HASHBENCH_LOG")
        .env_remove("HASHBENCH_LOG_FORMAT")
        .env_remove("RUST_LOG")
        .stdin(Stdio::null());
    cmd
}

fn run(bin: &str, args: &[&str]) -> Run {
    let out = command(bin, args)
        .stderr(Stdio::null())
        .output()
        .expect("failed to run driver");

    Run {
        code: out.status.code().expect("driver killed by signal"),
        stdout: String::from_utf8(out.stdout).expect("stdout is not utf-8"),
    }
}

fn report_path(name: &str) -> PathBuf {
    let path = env::temp_dir().join(format!("hashbench-{}-{}.json", name, std::process::id()));
    let _ = fs::remove_file(&path);
    path
}

fn read_report(path: &PathBuf) -> Value {
    let text = fs::read_to_string(path).expect("failed to read output");
    let _ = fs::remove_file(path);
    serde_json::from_str::<Value>(&text).expect("failed to parse JSON")
}

#[test]
fn single_missing_count() {
    let run = run(SINGLE, &[]);
    assert_eq!(run.code, 1);
    assert_eq!(run.results(), vec!["provide test sequence index"]);
}

#[test]
fn single_invalid_count() {
    for bad in ["abc", "0", "-3", "-.5", "nan"] {
        let run = run(SINGLE, &[bad]);
        assert_eq!(run.code, 2, "{:?}", bad);
        assert_eq!(run.results(), vec!["invalid test sequence index"]);
    }
}

#[test]
fn single() {
    let run = run(SINGLE, &["5"]);
    assert_eq!(run.code, 0);
    assert_eq!(run.results(), vec!["4739715"]);
}

#[test]
fn single_is_idempotent() {
    let first = run(SINGLE, &["100000"]);
    let second = run(SINGLE, &["100000"]);
    assert_eq!(first.code, 0);
    assert_eq!(first.results(), vec!["621419696"]);
    assert_eq!(first.results(), second.results());
}

#[test]
fn single_wide() {
    let run = run(SINGLE, &["--wide", "100000"]);
    assert_eq!(run.code, 0);
    assert_eq!(run.results(), vec!["621419696"]);
}

#[test]
fn single_json() {
    let path = report_path("single");
    let run = run(SINGLE, &["--output", path.to_str().unwrap(), "5"]);
    assert_eq!(run.code, 0);

    let json = read_report(&path);
    assert_eq!(json["mode"], "single");
    assert_eq!(json["iterations"], 5);
    assert_eq!(json["wide"], false);
    assert_eq!(json["results"][0]["hash"], 4739715);
}

#[test]
fn fan_out_missing_count() {
    let run = run(FAN_OUT, &[]);
    assert_eq!(run.code, 1);
    assert_eq!(run.results(), vec!["provide test sequence index"]);
}

#[test]
fn fan_out_invalid_count() {
    let run = run(FAN_OUT, &["-w", "2", "zero"]);
    assert_eq!(run.code, 2);
    assert_eq!(run.results(), vec!["invalid test sequence index"]);
}

#[test]
fn fan_out_results_in_spawn_order() {
    let run = run(FAN_OUT, &["--workers", "4", "5"]);
    assert_eq!(run.code, 0);
    assert_eq!(
        run.results(),
        vec![
            "worker result #1: 4739715",
            "worker result #2: 119256319",
            "worker result #3: 233772923",
            "worker result #4: 348289527",
        ]
    );
}

#[test]
fn fan_out_wide_json() {
    let path = report_path("fan-out");
    let run = run(
        FAN_OUT,
        &["--wide", "-w", "3", "-o", path.to_str().unwrap(), "20000"],
    );
    assert_eq!(run.code, 0);

    let json = read_report(&path);
    assert_eq!(json["mode"], "fan-out");
    assert_eq!(json["wide"], true);
    assert_eq!(json["iterations"], 20000);

    let results = json["results"].as_array().expect("results is not an array");
    let hashes: Vec<&Value> = results.iter().map(|r| &r["hash"]).collect();
    assert_eq!(hashes, vec![826030320, 235153652, 718018808]);
    let seeds: Vec<&Value> = results.iter().map(|r| &r["seed"]).collect();
    assert_eq!(seeds, vec![0, 4, 8]);
}

#[test]
fn fan_out_one_worker_per_cpu() {
    let cpus = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let run = run(FAN_OUT, &["1000"]);
    assert_eq!(run.code, 0);

    let results = run.results();
    assert_eq!(results.len(), cpus);
    for (i, line) in results.iter().enumerate() {
        assert!(line.starts_with(&format!("worker result #{}: ", i + 1)), "{:?}", line);
    }
}

#[test]
fn worker_mode_reports_on_stdout_only() {
    let run = run(FAN_OUT, &["fork", "5", "4"]);
    assert_eq!(run.code, 0);
    assert_eq!(run.lines(), vec![r#"{"seed":"4","hash":"119256319"}"#]);
}

#[test]
fn wide_worker_beyond_u64() {
    // 2^64 is a multiple of 2^30, so the hash matches a zero seed
    let wide = run(FAN_OUT, &["--wide", "fork", "5", "18446744073709551616"]);
    assert_eq!(wide.code, 0);
    assert_eq!(
        wide.lines(),
        vec![r#"{"seed":"18446744073709551616","hash":"4739715"}"#]
    );

    let plain = run(FAN_OUT, &["fork", "5", "18446744073709551616"]);
    assert_eq!(plain.code, 2);
}

#[test]
fn rejected_arguments_are_logged() {
    let out = command(SINGLE, &["abc"])
        .env("HASHBENCH_LOG", "debug")
        .env("HASHBENCH_LOG_FORMAT", "json")
        .output()
        .expect("failed to run driver");

    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("rejected argument"), "{}", stderr);
    assert!(stderr.contains("abc"), "{}", stderr);
}
