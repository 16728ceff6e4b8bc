//! Spawns the spark-submit process and owns its lifetime.
//!
//! A drain task reads stdout and stderr into one append-only buffer and
//! publishes the exit code through a watch channel once the process is
//! reaped. Callers only ever see cloned views ([`ProcessHandle`]), so reads
//! never block the job.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::warn;

use crate::error::Error;
use crate::model::spec::EnvPolicy;

/// Append-only capture of the process's combined stdout/stderr.
///
/// Readers always observe a prefix consistent with write order; a snapshot
/// taken mid-run is a prefix of the final output.
#[derive(Debug, Default, Clone)]
pub struct OutputBuffer(Arc<Mutex<String>>);

impl OutputBuffer {
    pub(crate) fn append_line(&self, line: &str) {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        buf.push_str(line);
        buf.push('\n');
    }

    pub fn snapshot(&self) -> String {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }
}

/// Cheap cloneable view of a spawned submission process.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: Option<u32>,
    output: OutputBuffer,
    exit: watch::Receiver<Option<i32>>,
}

impl ProcessHandle {
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    pub fn output_snapshot(&self) -> String {
        self.output.snapshot()
    }

    /// Non-blocking: the exit code once the process has been reaped.
    pub fn poll_exit(&self) -> Option<i32> {
        *self.exit.borrow()
    }

    pub fn is_alive(&self) -> bool {
        self.poll_exit().is_none()
    }

    /// Subscribes to the exit notification.
    pub(crate) fn exit_watch(&self) -> watch::Receiver<Option<i32>> {
        self.exit.clone()
    }

    /// Waits until the process exits, or until `timeout` elapses.
    ///
    /// A timeout is advisory: the process is left running and
    /// [`Error::WaitTimeout`] is returned, never a kill.
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<i32, Error> {
        let mut exit = self.exit.clone();
        let reaped = async move {
            loop {
                if let Some(code) = *exit.borrow_and_update() {
                    return code;
                }
                if exit.changed().await.is_err() {
                    // drain task gone; the last published value is final
                    return exit.borrow().unwrap_or(-1);
                }
            }
        };
        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, reaped)
                .await
                .map_err(|_| Error::WaitTimeout),
            None => Ok(reaped.await),
        }
    }
}

/// Spawns `program` with the given argument tokens and environment policy.
///
/// Returns immediately; output capture and reaping happen on a background
/// task. A spawn failure is fatal and surfaced synchronously.
pub fn launch(program: &Path, args: &[String], env: &EnvPolicy) -> Result<ProcessHandle, Error> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    match env {
        EnvPolicy::Clean => {
            cmd.env_clear();
        }
        EnvPolicy::Inherit => {}
        EnvPolicy::Overlay(extra) => {
            cmd.envs(extra);
        }
    }

    let mut child = cmd.spawn().map_err(|source| Error::Launch {
        program: program.display().to_string(),
        source,
    })?;
    let pid = child.id();
    let output = OutputBuffer::default();
    let (exit_tx, exit_rx) = watch::channel(None);

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let buffer = output.clone();
    tokio::spawn(async move {
        let stdout_task = stdout.map(|s| tokio::spawn(drain(s, buffer.clone())));
        let stderr_task = stderr.map(|s| tokio::spawn(drain(s, buffer.clone())));
        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        if let Some(task) = stderr_task {
            let _ = task.await;
        }
        let code = match child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                warn!("failed to reap submission process: {e}");
                -1
            }
        };
        let _ = exit_tx.send(Some(code));
    });

    Ok(ProcessHandle {
        pid,
        output,
        exit: exit_rx,
    })
}

async fn drain<R>(reader: R, buffer: OutputBuffer)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        buffer.append_line(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_owned(), script.to_owned()]
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr_and_exit_code() {
        let handle = launch(
            Path::new("sh"),
            &sh("echo out line; echo err line 1>&2; exit 3"),
            &EnvPolicy::Inherit,
        )
        .unwrap();
        let code = handle.wait(None).await.unwrap();
        assert_eq!(code, 3);
        assert_eq!(handle.poll_exit(), Some(3));
        let output = handle.output_snapshot();
        assert!(output.contains("out line"));
        assert!(output.contains("err line"));
    }

    #[tokio::test]
    async fn wait_timeout_leaves_process_running() {
        let handle = launch(Path::new("sh"), &sh("sleep 5"), &EnvPolicy::Inherit).unwrap();
        let err = handle.wait(Some(Duration::from_millis(100))).await.unwrap_err();
        assert!(matches!(err, Error::WaitTimeout));
        assert!(handle.is_alive());
    }

    #[tokio::test]
    async fn overlay_env_wins_but_inherits_the_rest() {
        std::env::set_var("SPARK_SUBMIT_TEST_INHERITED", "kept");
        let mut extra = std::collections::HashMap::new();
        extra.insert("SPARK_SUBMIT_TEST_EXTRA".to_owned(), "set".to_owned());
        let handle = launch(
            Path::new("sh"),
            &sh("echo $SPARK_SUBMIT_TEST_INHERITED $SPARK_SUBMIT_TEST_EXTRA"),
            &EnvPolicy::Overlay(extra),
        )
        .unwrap();
        handle.wait(None).await.unwrap();
        assert!(handle.output_snapshot().contains("kept set"));
    }

    #[tokio::test]
    async fn clean_env_drops_inherited_variables() {
        std::env::set_var("SPARK_SUBMIT_TEST_DROPPED", "visible");
        let handle = launch(
            Path::new("/bin/sh"),
            &sh("echo [$SPARK_SUBMIT_TEST_DROPPED]"),
            &EnvPolicy::Clean,
        )
        .unwrap();
        handle.wait(None).await.unwrap();
        assert!(handle.output_snapshot().contains("[]"));
    }

    #[tokio::test]
    async fn missing_executable_is_a_launch_error() {
        let err = launch(
            Path::new("/no/such/spark-submit"),
            &[],
            &EnvPolicy::Inherit,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Launch { .. }));
    }

    #[tokio::test]
    async fn snapshot_is_a_prefix_of_the_final_output() {
        let handle = launch(
            Path::new("sh"),
            &sh("echo first; sleep 0.3; echo second"),
            &EnvPolicy::Inherit,
        )
        .unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        let early = handle.output_snapshot();
        handle.wait(None).await.unwrap();
        let full = handle.output_snapshot();
        assert!(full.starts_with(&early));
        assert!(full.contains("second"));
    }
}
