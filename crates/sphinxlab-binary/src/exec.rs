//! Supervised execution of a provisioned binary
//!
//! The child's stdout and stderr are each drained by a dedicated thread into
//! a caller-supplied sink, so a chatty process can never block on a full
//! pipe. The child runs with a fixed locale and timezone unless the caller
//! overrides them.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const LOCALE: &str = "en_US.UTF-8";
pub const TIMEZONE: &str = "UTC";

/// Variable the Sphinx plantuml extension reads its launch command from
pub const PLANTUML_ENV: &str = "plantuml";

/// Jar expected next to the binary when no plantuml command is configured
pub const PLANTUML_JAR: &str = "plantuml.jar";

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exit code reported when the child was terminated by a signal
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// How to run the binary
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub working_dir: PathBuf,
    pub args: Vec<String>,
    /// Applied after the locale/timezone/plantuml defaults, so it wins
    pub env: BTreeMap<String, String>,
    /// Replaces the `java -jar <cache>/plantuml.jar` default
    pub plantuml_command: Option<String>,
    /// Kill the child after this long; `None` waits forever
    pub timeout: Option<Duration>,
}

/// Destinations for the child's output streams
pub struct OutputSinks {
    pub stdout: Box<dyn Write + Send>,
    pub stderr: Box<dyn Write + Send>,
}

impl OutputSinks {
    pub fn new(stdout: impl Write + Send + 'static, stderr: impl Write + Send + 'static) -> Self {
        Self {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        }
    }

    /// Forwards to this process's stdout and stderr
    pub fn inherit() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    /// Discards everything
    pub fn null() -> Self {
        Self::new(io::sink(), io::sink())
    }
}

impl Default for OutputSinks {
    fn default() -> Self {
        Self::inherit()
    }
}

/// Default PlantUML launch command for a binary living in `binary_dir`
///
/// Backslashes are doubled because the consumer parses the value with
/// shell-like escaping.
pub fn default_plantuml_command(binary_dir: &Path) -> String {
    let jar = binary_dir.join(PLANTUML_JAR);
    format!("java -jar {}", jar.display().to_string().replace('\\', "\\\\"))
}

/// Environment variables set on top of the inherited environment
pub fn environment_overlay(binary: &Path, options: &ExecOptions) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("LANG".to_string(), LOCALE.to_string());
    env.insert("LC_ALL".to_string(), LOCALE.to_string());
    env.insert("TZ".to_string(), TIMEZONE.to_string());

    let plantuml = match &options.plantuml_command {
        Some(command) => command.clone(),
        None => default_plantuml_command(binary.parent().unwrap_or_else(|| Path::new("."))),
    };
    env.insert(PLANTUML_ENV.to_string(), plantuml);

    env.extend(options.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

/// Runs `binary` to completion and returns its exit code
///
/// # Errors
///
/// Returns `ExecError` if the argument list is empty, the process cannot be
/// started or waited on, or the timeout elapses (the child is killed first)
pub fn run_binary(
    binary: &Path,
    options: &ExecOptions,
    sinks: OutputSinks,
) -> Result<i32, ExecError> {
    if options.args.is_empty() {
        return Err(ExecError::EmptyArguments);
    }

    let mut command = Command::new(binary);
    command
        .args(&options.args)
        .current_dir(&options.working_dir)
        .envs(environment_overlay(binary, options))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    info!(
        "Running {} {} in {}",
        binary.display(),
        options.args.join(" "),
        options.working_dir.display()
    );
    let started = Instant::now();

    let mut child = command.spawn().map_err(|source| ExecError::LaunchFailed {
        program: binary.to_path_buf(),
        source,
    })?;

    let OutputSinks { stdout, stderr } = sinks;
    let drains = [
        child.stdout.take().map(|out| spawn_drain("stdout", out, stdout)),
        child.stderr.take().map(|err| spawn_drain("stderr", err, stderr)),
    ];

    let status = wait_for_exit(&mut child, binary, options.timeout)?;

    for drain in drains.into_iter().flatten() {
        join_drain(drain);
    }

    let code = exit_code(status);
    info!(
        "{} exited with code {} after {:.1?}",
        binary.display(),
        code,
        started.elapsed()
    );
    Ok(code)
}

type Drain = (&'static str, JoinHandle<io::Result<u64>>);

fn spawn_drain(
    name: &'static str,
    mut source: impl Read + Send + 'static,
    mut sink: Box<dyn Write + Send>,
) -> Drain {
    let handle = thread::spawn(move || {
        let copied = io::copy(&mut source, &mut sink)?;
        sink.flush()?;
        Ok(copied)
    });
    (name, handle)
}

/// Drain failures are logged and otherwise ignored
fn join_drain((name, handle): Drain) {
    match handle.join() {
        Ok(Ok(bytes)) => debug!("Relayed {} bytes of {}", bytes, name),
        Ok(Err(e)) => warn!("Failed to relay child {}: {}", name, e),
        Err(_) => warn!("Relay thread for child {} panicked", name),
    }
}

fn wait_for_exit(
    child: &mut Child,
    program: &Path,
    timeout: Option<Duration>,
) -> Result<ExitStatus, ExecError> {
    let wait_failed = |source| ExecError::WaitFailed {
        program: program.to_path_buf(),
        source,
    };

    let Some(timeout) = timeout else {
        return child.wait().map_err(wait_failed);
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().map_err(wait_failed)? {
            return Ok(status);
        }

        if Instant::now() >= deadline {
            warn!(
                "{} did not exit within {:?}, killing it",
                program.display(),
                timeout
            );
            if let Err(e) = child.kill() {
                debug!("Kill failed (process may have just exited): {}", e);
            }
            match child.wait() {
                Ok(status) => debug!("Killed child reaped: {}", status),
                Err(e) => debug!("Failed to reap killed child: {}", e),
            }
            // Drain threads are detached; they end once the pipes close
            return Err(ExecError::TimedOut {
                program: program.to_path_buf(),
                timeout,
            });
        }

        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => {
            debug!("Child terminated by signal: {}", status);
            SIGNAL_EXIT_CODE
        }
    }
}

/// Execution errors
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("argument list must not be empty")]
    EmptyArguments,

    #[error("failed to launch {path}: {source}", path = .program.display())]
    LaunchFailed {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for {path}: {source}", path = .program.display())]
    WaitFailed {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} did not exit within {timeout:?} and was killed", path = .program.display())]
    TimedOut { program: PathBuf, timeout: Duration },
}
