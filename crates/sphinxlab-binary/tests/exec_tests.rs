//! Integration tests for provision-then-run
//!
//! The "binary" is a shell script served by mockito, so these only run on
//! Unix.

#![cfg(unix)]

use mockito::ServerGuard;
use sphinxlab_binary::exec::OutputSinks;
use sphinxlab_binary::{Arch, ErrorKind, Os, Platform, RunnerOptions, SphinxRunner};
use sphinxlab_testkit::{CaptureBuffer, ReleaseMocks, fake_sphinx_script, mock_release, sidecar_for};
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const BINARY_PATH: &str = "/releases/v1.0.0/tool.linux-x86_64";

struct Fixture {
    // Kept alive so the release stays mounted
    _server: ServerGuard,
    mocks: ReleaseMocks,
    cache: TempDir,
    runner: SphinxRunner,
}

fn fixture(script: &str, customize: impl FnOnce(&mut RunnerOptions)) -> Fixture {
    let mut server = mockito::Server::new();
    let body = fake_sphinx_script(script);
    let mocks = mock_release(&mut server, BINARY_PATH, &body, &sidecar_for(&body), 1);

    let cache = TempDir::new().unwrap();
    let mut options = RunnerOptions::new("v1.0.0", cache.path());
    options.base_url = format!("{}/releases/", server.url());
    options.tool_name = "tool".to_string();
    options.platform = Some(Platform::new(Os::Linux, Arch::X86_64));
    customize(&mut options);

    let runner = SphinxRunner::new(options).unwrap();
    Fixture {
        _server: server,
        mocks,
        cache,
        runner,
    }
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn run_captured(fixture: &Fixture, argv: &[&str]) -> (i32, String, String) {
    let stdout = CaptureBuffer::new();
    let stderr = CaptureBuffer::new();
    let code = fixture
        .runner
        .run_with_output(
            fixture.cache.path(),
            &args(argv),
            OutputSinks::new(stdout.clone(), stderr.clone()),
        )
        .unwrap();
    (code, stdout.to_string_lossy(), stderr.to_string_lossy())
}

#[test]
fn test_run_version_prints_and_exits_zero() {
    let fixture = fixture(r#"[ "$1" = "--version" ] && echo 1.2.3"#, |_| {});

    let (code, stdout, _) = run_captured(&fixture, &["--version"]);

    assert_eq!(code, 0);
    assert!(stdout.contains("1.2.3"), "stdout was {:?}", stdout);
    fixture.mocks.assert();
}

#[test]
fn test_second_run_reuses_cache() {
    let fixture = fixture("echo hi", |_| {});

    run_captured(&fixture, &["a"]);
    run_captured(&fixture, &["b"]);

    // Each mock expects exactly one request
    fixture.mocks.assert();
}

#[test]
fn test_exit_code_is_returned_unmodified() {
    let fixture = fixture("exit 3", |_| {});
    let (code, _, _) = run_captured(&fixture, &["-b", "html"]);
    assert_eq!(code, 3);
}

#[test]
fn test_stderr_is_relayed_separately() {
    let fixture = fixture("echo out; echo oops >&2", |_| {});

    let (_, stdout, stderr) = run_captured(&fixture, &["x"]);

    assert_eq!(stdout.trim(), "out");
    assert_eq!(stderr.trim(), "oops");
}

#[test]
fn test_environment_overlay_reaches_child() {
    let fixture = fixture(r#"echo "$TZ|$LANG|$LC_ALL|$plantuml""#, |_| {});

    let (_, stdout, _) = run_captured(&fixture, &["x"]);

    let entry = fixture.runner.reference().entry_dir(fixture.cache.path());
    let expected = format!(
        "UTC|en_US.UTF-8|en_US.UTF-8|java -jar {}",
        entry.join("plantuml.jar").display()
    );
    assert_eq!(stdout.trim(), expected);
}

#[test]
fn test_caller_environment_overrides_defaults() {
    let fixture = fixture(r#"echo "$TZ|$plantuml|$SPHINXOPTS""#, |options| {
        options.env.insert("TZ".to_string(), "Asia/Seoul".to_string());
        options.env.insert("SPHINXOPTS".to_string(), "-j auto".to_string());
        options.plantuml_command = Some("plantuml -headless".to_string());
    });

    let (_, stdout, _) = run_captured(&fixture, &["x"]);
    assert_eq!(stdout.trim(), "Asia/Seoul|plantuml -headless|-j auto");
}

#[test]
fn test_runs_in_requested_working_directory() {
    let fixture = fixture("pwd -P", |_| {});
    let workdir = TempDir::new().unwrap();

    let stdout = CaptureBuffer::new();
    fixture
        .runner
        .run_with_output(
            workdir.path(),
            &args(&["x"]),
            OutputSinks::new(stdout.clone(), std::io::sink()),
        )
        .unwrap();

    let expected = workdir.path().canonicalize().unwrap();
    assert_eq!(stdout.to_string_lossy().trim(), expected.to_string_lossy());
}

#[test]
fn test_large_output_on_both_streams_does_not_deadlock() {
    let script = r#"i=0
while [ $i -lt 20000 ]; do
  echo "stdout-line-$i"
  echo "stderr-line-$i" >&2
  i=$((i+1))
done"#;
    let fixture = fixture(script, |_| {});

    let (code, stdout, stderr) = run_captured(&fixture, &["x"]);

    assert_eq!(code, 0);
    assert_eq!(stdout.lines().count(), 20000);
    assert_eq!(stderr.lines().count(), 20000);
    assert_eq!(stdout.lines().last(), Some("stdout-line-19999"));
}

#[test]
fn test_timeout_kills_child() {
    let fixture = fixture("exec sleep 30", |options| {
        options.timeout = Some(Duration::from_millis(300));
    });

    let started = Instant::now();
    let err = fixture
        .runner
        .run_with_output(fixture.cache.path(), &args(&["x"]), OutputSinks::null())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(20));
}

#[test]
fn test_empty_arguments_never_touch_the_network() {
    let mut server = mockito::Server::new();
    let body = fake_sphinx_script("true");
    let mocks = mock_release(&mut server, BINARY_PATH, &body, &sidecar_for(&body), 0);

    let cache = TempDir::new().unwrap();
    let mut options = RunnerOptions::new("v1.0.0", cache.path());
    options.base_url = format!("{}/releases", server.url());
    options.tool_name = "tool".to_string();
    options.platform = Some(Platform::new(Os::Linux, Arch::X86_64));
    let runner = SphinxRunner::new(options).unwrap();

    let err = runner
        .run_with_output(cache.path(), &[], OutputSinks::null())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    mocks.assert();
}

/// Sink whose reader has gone away
struct ClosedPipe;

impl Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_relay_failure_still_returns_exit_code() {
    let fixture = fixture("echo out; echo err >&2; exit 3", |_| {});
    let stderr = CaptureBuffer::new();

    let code = fixture
        .runner
        .run_with_output(
            fixture.cache.path(),
            &args(&["x"]),
            OutputSinks::new(ClosedPipe, stderr.clone()),
        )
        .unwrap();

    assert_eq!(code, 3);
    assert_eq!(stderr.to_string_lossy().trim(), "err");
}

#[test]
fn test_relative_cache_root_with_other_working_directory() {
    // Relative to the test process cwd, not to the child's working directory
    let relative_cache = tempfile::Builder::new()
        .prefix(".tmp-cache-")
        .tempdir_in(".")
        .unwrap();
    assert!(relative_cache.path().is_relative());

    let fixture = fixture(r#"[ "$1" = "--version" ] && echo 1.2.3"#, |options| {
        options.cache_root = relative_cache.path().to_path_buf();
    });
    assert!(fixture.runner.cache_root().is_absolute());

    // Runs inside a different directory than the cache lives in
    let (code, stdout, _) = run_captured(&fixture, &["--version"]);

    assert_eq!(code, 0);
    assert!(stdout.contains("1.2.3"), "stdout was {:?}", stdout);
    assert!(
        relative_cache
            .path()
            .join("v1.0.0")
            .join("tool.linux-x86_64")
            .is_file()
    );
}
