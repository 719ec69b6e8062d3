//! Subprocess execution with live output tee.
//!
//! Foreground children have stdout and stderr merged into one captured
//! buffer, in arrival order, while each chunk is also echoed to the
//! terminal. Background children are detached and never waited on.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;

use termai_core::config::ExecutorConfig;

use crate::error::ExecError;

/// Result of a foreground child that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code; `128 + signal` when the child was killed by a signal.
    pub status: i32,
    /// Combined stdout and stderr, lossily decoded.
    pub output: String,
    pub duration: Duration,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Runs commands in a fixed working directory.
#[derive(Debug, Clone)]
pub struct Executor {
    shell: String,
    echo: bool,
    working_dir: PathBuf,
}

impl Executor {
    pub fn new(config: &ExecutorConfig, working_dir: PathBuf) -> Self {
        Self {
            shell: config.shell.clone(),
            echo: config.echo_output,
            working_dir,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Resolve `path` against the working directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    /// Run a command line through the configured shell.
    pub async fn run_shell(&self, command_line: &str) -> Result<ExecOutput, ExecError> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command_line);
        self.capture(cmd, &self.shell, None).await
    }

    /// Run a program directly with an argument vector.
    pub async fn run_program<S: AsRef<str>>(
        &self,
        program: &str,
        args: &[S],
    ) -> Result<ExecOutput, ExecError> {
        let mut cmd = Command::new(program);
        cmd.args(args.iter().map(|a| a.as_ref()));
        self.capture(cmd, program, None).await
    }

    /// Run a program with `input` written to its stdin.
    pub async fn run_with_input<S: AsRef<str>>(
        &self,
        program: &str,
        args: &[S],
        input: &[u8],
    ) -> Result<ExecOutput, ExecError> {
        let mut cmd = Command::new(program);
        cmd.args(args.iter().map(|a| a.as_ref()));
        self.capture(cmd, program, Some(input)).await
    }

    /// Launch a command line detached from this process and return its pid.
    ///
    /// Standard streams are discarded and the child gets its own process
    /// group, so it survives the engine exiting.
    pub fn spawn_background(&self, command_line: &str) -> Result<u32, ExecError> {
        let mut cmd = std::process::Command::new(&self.shell);
        cmd.arg("-c")
            .arg(format!("exec {}", command_line))
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|source| ExecError::Launch {
            program: self.shell.clone(),
            source,
        })?;
        let pid = child.id();
        tracing::info!(pid, command = %command_line, "Background process launched");
        Ok(pid)
    }

    async fn capture(
        &self,
        mut cmd: Command,
        program: &str,
        input: Option<&[u8]>,
    ) -> Result<ExecOutput, ExecError> {
        cmd.current_dir(&self.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::inherit()
            });

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| ExecError::Launch {
            program: program.to_string(),
            source,
        })?;

        let writer = match (input, child.stdin.take()) {
            (Some(bytes), Some(mut stdin)) => {
                let bytes = bytes.to_vec();
                Some(tokio::spawn(async move {
                    let result = stdin.write_all(&bytes).await;
                    drop(stdin);
                    result
                }))
            }
            _ => None,
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<(Stream, Vec<u8>)>();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward(stdout, Stream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward(stderr, Stream::Stderr, tx.clone()));
        }
        drop(tx);

        let mut captured = Vec::new();
        while let Some((stream, chunk)) = rx.recv().await {
            if self.echo {
                echo_chunk(stream, &chunk);
            }
            captured.extend_from_slice(&chunk);
        }

        let status = child.wait().await.map_err(|source| ExecError::Io {
            program: program.to_string(),
            source,
        })?;

        if let Some(writer) = writer {
            if let Ok(Err(e)) = writer.await {
                tracing::debug!(error = %e, "Child closed stdin early");
            }
        }

        let output = ExecOutput {
            status: exit_code(status),
            output: String::from_utf8_lossy(&captured).into_owned(),
            duration: started.elapsed(),
        };
        tracing::debug!(
            program = %program,
            exit_code = output.status,
            duration_ms = output.duration.as_millis() as u64,
            bytes = captured.len(),
            "Child process finished"
        );
        Ok(output)
    }
}

async fn forward<R>(mut reader: R, stream: Stream, tx: mpsc::UnboundedSender<(Stream, Vec<u8>)>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send((stream, buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Child output read failed");
                break;
            }
        }
    }
}

fn echo_chunk(stream: Stream, chunk: &[u8]) {
    use std::io::Write;
    let _ = match stream {
        Stream::Stdout => {
            let mut out = std::io::stdout().lock();
            out.write_all(chunk).and_then(|_| out.flush())
        }
        Stream::Stderr => {
            let mut err = std::io::stderr().lock();
            err.write_all(chunk).and_then(|_| err.flush())
        }
    };
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Quote `s` for safe inclusion in a POSIX shell command line.
pub fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "_./=:,+@%-".contains(c));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
