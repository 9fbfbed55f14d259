//! End-to-end tests for the memc-load binary
//!
//! These tests validate:
//! - The codec self-test
//! - Dry runs (logged payloads, renamed files)
//! - Exit codes for fatal errors and high error rates

use assert_cmd::Command;
use flate2::write::GzEncoder;
use flate2::Compression;
use predicates::prelude::*;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use tempfile::TempDir;

fn write_gz(dir: &Path, name: &str, content: &str) {
    let mut encoder = GzEncoder::new(
        std::fs::File::create(dir.join(name)).unwrap(),
        Compression::default(),
    );
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

fn memc_load(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("memc-load").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("LOG_LEVEL")
        .env_remove("LOG_OUTPUT")
        .env_remove("LOG_FORMAT")
        .arg("--pattern")
        .arg(format!("{}/*.tsv.gz", dir.path().display()));
    cmd
}

/// Address with nothing listening on it
fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

/// Fake memcached on a thread, answering every `set` with STORED
fn fake_memcached() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { return };
            std::thread::spawn(move || serve(stream));
        }
    });
    addr
}

fn serve(stream: TcpStream) {
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).unwrap_or(0) == 0 {
            return;
        }
        let len: usize = header.trim_end().split(' ').nth(4).unwrap().parse().unwrap();
        let mut data = vec![0u8; len + 2];
        reader.read_exact(&mut data).unwrap();
        writer.write_all(b"STORED\r\n").unwrap();
    }
}

// ============================================================================
// Self-test
// ============================================================================

#[test]
fn test_self_test_passes() {
    let dir = TempDir::new().unwrap();
    memc_load(&dir)
        .arg("--test")
        .assert()
        .success()
        .stdout(predicate::str::contains("Self-test passed"));
}

// ============================================================================
// Dry Run
// ============================================================================

#[test]
fn test_dry_run_logs_payload_and_renames() {
    let dir = TempDir::new().unwrap();
    write_gz(
        dir.path(),
        "20170929000000.tsv.gz",
        "idfa\t1rfw452y52g2gq4g\t55.55\t42.42\t1423,43,567,3,7,23\n",
    );
    let log = dir.path().join("logs").join("memc_load.log");

    memc_load(&dir)
        .arg("--dry")
        .arg("--log")
        .arg(&log)
        .assert()
        .success();

    let output = std::fs::read_to_string(&log).unwrap();
    let line = output
        .lines()
        .find(|l| l.contains("key=idfa:1rfw452y52g2gq4g"))
        .expect("dry run line logged");
    assert!(line.contains("127.0.0.1:33013"));
    assert!(line.contains("payload=0a"));
    assert!(output.contains("Processing took"));

    assert!(dir.path().join(".20170929000000.tsv.gz").exists());
}

// ============================================================================
// Exit Codes
// ============================================================================

#[test]
fn test_unknown_category_exits_with_fatal_code() {
    let dir = TempDir::new().unwrap();
    write_gz(dir.path(), "a.tsv.gz", "imei\tx\t1\t2\t3\n");

    memc_load(&dir).arg("--dry").assert().code(1);
    assert!(dir.path().join("a.tsv.gz").exists());
}

#[test]
fn test_high_error_rate_exits_with_code_2() {
    let dir = TempDir::new().unwrap();
    write_gz(dir.path(), "a.tsv.gz", "idfa\ti1\t1\t2\t3\ngaid\tg1\t1\t2\t3\n");

    memc_load(&dir)
        .arg("--idfa")
        .arg(fake_memcached())
        .arg("--gaid")
        .arg(closed_port())
        .assert()
        .code(2)
        .stdout(predicate::str::contains("High error rate"));
}

#[test]
fn test_no_input_files_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    memc_load(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No input files matched"));
}
