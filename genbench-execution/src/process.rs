//! Deadline-bounded execution of the external tool

use crate::error::{ExecutionError, ExecutionResult};
use crate::launcher::RunContext;
use crate::shutdown::ShutdownListener;
use chrono::{DateTime, Utc};
use genbench_config::ExecutionConfig;
use genbench_core::record::round_to;
use genbench_core::{EndpointDescriptor, RunKey};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::{Duration, Instant};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Exit code recorded when the tool could not be started at all
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

const ANNOTATION_PREFIX: &str = "[genbench]";

/// One (endpoint, iteration) invocation
#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    pub endpoint: &'a EndpointDescriptor,
    pub run_number: u32,
    pub search_budget_seconds: u64,
    /// Exclusive output directory for this run
    pub run_dir: PathBuf,
}

impl<'a> RunRequest<'a> {
    pub fn key(&self) -> RunKey {
        RunKey::new(self.endpoint.id, self.run_number)
    }
}

/// What the executor observed about one run, before classification
#[derive(Debug, Clone, PartialEq)]
pub struct RawExecution {
    pub key: RunKey,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub search_budget_seconds: u64,
    pub exit_code: i32,
    pub timed_out: bool,
    pub run_dir: PathBuf,
    pub log_path: PathBuf,
    pub deadline: Duration,
}

impl RawExecution {
    /// Captured log, lossily decoded
    pub async fn read_log(&self) -> ExecutionResult<String> {
        let bytes = tokio::fs::read(&self.log_path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.run_dir.join(genbench_core::layout::GENERATED_TESTS_DIR)
    }

    pub fn report_dir(&self) -> PathBuf {
        self.run_dir.join(genbench_core::layout::TOOL_REPORT_DIR)
    }
}

enum Outcome {
    Exited(ExitStatus),
    DeadlineExceeded,
    Interrupted(crate::shutdown::ShutdownSignal),
}

/// Launches the tool for one run and bounds it by a hard deadline
#[derive(Debug, Clone)]
pub struct RunExecutor {
    config: ExecutionConfig,
}

impl RunExecutor {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Run the tool once.
    ///
    /// A tool that fails, hangs or cannot be started still yields a
    /// [`RawExecution`]; only an operator interrupt or a broken run
    /// directory is an error.
    pub async fn execute(
        &self,
        request: &RunRequest<'_>,
        shutdown: &mut ShutdownListener,
    ) -> ExecutionResult<RawExecution> {
        let key = request.key();
        tokio::fs::create_dir_all(&request.run_dir).await?;
        let run_dir = tokio::fs::canonicalize(&request.run_dir).await?;
        let ctx = RunContext::new(
            request.endpoint,
            request.run_number,
            request.search_budget_seconds,
            &run_dir,
        );
        tokio::fs::create_dir_all(ctx.tests_dir()).await?;
        tokio::fs::create_dir_all(ctx.report_dir()).await?;

        let log_path = run_dir.join(&self.config.log_file_name);
        let deadline = self.config.deadline_for(request.search_budget_seconds);
        let (log_tx, log_writer) = spawn_log_writer(&log_path).await?;

        let started_at = Utc::now();
        let clock = Instant::now();
        let program = ctx.render(&self.config.tool.program);

        info!(
            endpoint_id = key.endpoint_id,
            run_number = key.run_number,
            deadline_secs = deadline.as_secs(),
            "Launching {} for {}",
            program,
            request.endpoint.controller_class
        );

        let mut child = match ctx.tool_command(&self.config.tool).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(
                    endpoint_id = key.endpoint_id,
                    run_number = key.run_number,
                    "Failed to spawn {}: {}",
                    program,
                    e
                );
                let _ = log_tx.send(format!(
                    "{} failed to spawn '{}': {}",
                    ANNOTATION_PREFIX, program, e
                ));
                drop(log_tx);
                finish_log_writer(log_writer).await?;
                return Ok(RawExecution {
                    key,
                    started_at,
                    finished_at: Utc::now(),
                    duration_seconds: round_to(clock.elapsed().as_secs_f64(), 3),
                    search_budget_seconds: request.search_budget_seconds,
                    exit_code: SPAWN_FAILURE_EXIT_CODE,
                    timed_out: false,
                    run_dir,
                    log_path,
                    deadline,
                });
            }
        };

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, log_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, log_tx.clone()));
        }

        let outcome = tokio::select! {
            waited = tokio::time::timeout(deadline, child.wait()) => match waited {
                Ok(status) => Outcome::Exited(status?),
                Err(_) => Outcome::DeadlineExceeded,
            },
            signal = shutdown.wait() => Outcome::Interrupted(signal),
        };

        let (exit_code, timed_out) = match outcome {
            Outcome::Exited(status) => {
                self.drain_readers(readers).await;
                (exit_code_of(status), false)
            }
            Outcome::DeadlineExceeded => {
                warn!(
                    endpoint_id = key.endpoint_id,
                    run_number = key.run_number,
                    "Deadline of {}s exceeded, terminating tool",
                    deadline.as_secs()
                );
                self.terminate(&mut child).await;
                self.drain_readers(readers).await;
                let _ = log_tx.send(format!(
                    "{} deadline of {}s exceeded (search budget {}s x {}); process terminated",
                    ANNOTATION_PREFIX,
                    deadline.as_secs(),
                    request.search_budget_seconds,
                    self.config.deadline_multiplier
                ));
                self.cleanup(&ctx).await;
                (self.config.timeout_exit_code, true)
            }
            Outcome::Interrupted(signal) => {
                warn!(
                    endpoint_id = key.endpoint_id,
                    run_number = key.run_number,
                    "Run interrupted by {}, terminating tool",
                    signal
                );
                self.terminate(&mut child).await;
                self.drain_readers(readers).await;
                self.cleanup(&ctx).await;
                drop(log_tx);
                let _ = finish_log_writer(log_writer).await;
                return Err(ExecutionError::Cancelled(signal));
            }
        };

        drop(log_tx);
        finish_log_writer(log_writer).await?;

        let finished_at = Utc::now();
        let duration_seconds = round_to(clock.elapsed().as_secs_f64(), 3);
        info!(
            endpoint_id = key.endpoint_id,
            run_number = key.run_number,
            exit_code,
            timed_out,
            "Tool finished after {:.1}s",
            duration_seconds
        );

        Ok(RawExecution {
            key,
            started_at,
            finished_at,
            duration_seconds,
            search_budget_seconds: request.search_budget_seconds,
            exit_code,
            timed_out,
            run_dir,
            log_path,
            deadline,
        })
    }

    /// SIGTERM the whole process group, then SIGKILL after the grace period
    async fn terminate(&self, child: &mut Child) {
        let grace = self.config.kill_grace_period;

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            signal_group(pid, nix::sys::signal::Signal::SIGTERM);
            if let Ok(Ok(status)) = tokio::time::timeout(grace, child.wait()).await {
                debug!("Tool exited after SIGTERM with {}", status);
                signal_group(pid, nix::sys::signal::Signal::SIGKILL);
                return;
            }
            signal_group(pid, nix::sys::signal::Signal::SIGKILL);
        }

        if let Err(e) = child.start_kill() {
            debug!("Kill after deadline: {}", e);
        }
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => debug!("Tool killed with {}", status),
            Ok(Err(e)) => warn!("Error reaping killed tool: {}", e),
            Err(_) => warn!("Tool did not exit within {:?} of SIGKILL", grace),
        }
    }

    /// Let readers flush what the pipes still hold, then give up on them
    async fn drain_readers(&self, readers: Vec<JoinHandle<()>>) {
        for reader in readers {
            let abort = reader.abort_handle();
            if tokio::time::timeout(self.config.kill_grace_period, reader).await.is_err() {
                debug!("Output reader still blocked after grace period; aborting");
                abort.abort();
            }
        }
    }

    async fn cleanup(&self, ctx: &RunContext<'_>) {
        let Some(mut cmd) = ctx.cleanup_command(&self.config.tool) else {
            return;
        };
        match tokio::time::timeout(self.config.kill_grace_period, cmd.status()).await {
            Ok(Ok(status)) => debug!("Cleanup command finished with {}", status),
            Ok(Err(e)) => debug!("Cleanup command failed to start: {}", e),
            Err(_) => warn!("Cleanup command did not finish in time"),
        }
    }
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: nix::sys::signal::Signal) {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    // The tool leads its own group, so its pid is the group id
    if let Err(e) = killpg(Pid::from_raw(pid as i32), signal) {
        debug!("Failed to send {:?} to process group {}: {}", signal, pid, e);
    }
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

async fn spawn_log_writer(
    path: &Path,
) -> ExecutionResult<(mpsc::UnboundedSender<String>, JoinHandle<std::io::Result<()>>)> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await?;
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_lines(file, rx));
    Ok((tx, writer))
}

async fn write_lines(
    mut file: File,
    mut rx: mpsc::UnboundedReceiver<String>,
) -> std::io::Result<()> {
    while let Some(line) = rx.recv().await {
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        // Flushed per line so a hung run still leaves its output behind
        file.flush().await?;
    }
    file.sync_all().await
}

async fn finish_log_writer(writer: JoinHandle<std::io::Result<()>>) -> ExecutionResult<()> {
    match writer.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ExecutionError::LogWriter(e.to_string())),
        Err(e) => Err(ExecutionError::LogWriter(e.to_string())),
    }
}

fn spawn_line_reader<R>(stream: R, tx: mpsc::UnboundedSender<String>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Output stream closed with error: {}", e);
                    break;
                }
            }
        }
    })
}
