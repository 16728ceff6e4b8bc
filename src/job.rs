//! The job controller: builds the submit command, owns the spark-submit
//! process, extracts the submission id and tracks the driver state until
//! the job concludes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

use crate::command;
use crate::error::Error;
use crate::extract;
use crate::model::spec::{default_spark_home, DeployMode, EnvPolicy, SparkArgs};
use crate::model::state::{advance, JobState};
use crate::process::{self, ProcessHandle};
use crate::status::{self, DriverStatusService};

/// Consecutive UNKNOWN poll cycles tolerated before the background poller
/// gives up on an unreachable manager.
const MAX_UNKNOWN_POLLS: u32 = 10;

/// How often the capture task re-scans early output for the submission id.
const OUTPUT_SCAN_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct SubmitOptions {
    /// Poll the driver state on this interval in a background task until
    /// the job concludes. Cluster mode only.
    #[builder(default, setter(strip_option))]
    pub poll_interval: Option<Duration>,

    /// Wait for spark-submit to exit before returning, up to this long.
    /// On elapse the process is left running and [`Error::WaitTimeout`]
    /// is returned.
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,

    /// Environment handed to the spark-submit process.
    #[builder(default)]
    pub env: EnvPolicy,
}

/// One Spark job: submit once, then query state, output and exit code, or
/// kill it (cluster mode only).
pub struct SparkJob {
    args: SparkArgs,
    spark_bin: PathBuf,
    submit_args: Vec<String>,
    backend: Arc<dyn DriverStatusService>,
    state: Arc<watch::Sender<JobState>>,
    id: Arc<watch::Sender<Option<String>>>,
    handle: Option<ProcessHandle>,
    polling: Arc<AtomicBool>,
}

impl SparkJob {
    /// Validates the main file and locates `bin/spark-submit` under the
    /// configured (or `SPARK_HOME`-derived) Spark home, failing fast when
    /// either is missing.
    pub fn new(args: SparkArgs) -> Result<Self, Error> {
        let backend = status::backend_for(&args);
        Self::with_backend(args, backend)
    }

    fn with_backend(
        args: SparkArgs,
        backend: Arc<dyn DriverStatusService>,
    ) -> Result<Self, Error> {
        let main_file = &args.main_file;
        let remote = main_file.starts_with("s3")
            || main_file.starts_with("local:")
            || main_file.contains("://");
        if !remote && !Path::new(main_file).is_file() {
            return Err(Error::MainFileMissing(main_file.clone()));
        }

        let spark_home = args.spark_home.clone().unwrap_or_else(default_spark_home);
        let spark_bin = Path::new(&spark_home).join("bin").join("spark-submit");
        if !spark_bin.is_file() {
            return Err(Error::SparkBinMissing(spark_home));
        }

        if std::env::var_os("JAVA_HOME").is_none() {
            warn!(r#""JAVA_HOME" is not defined in environment variables"#);
        }

        let submit_args = command::build_args(&args);
        let (state, _) = watch::channel(JobState::NotSubmitted);
        let (id, _) = watch::channel(None);
        Ok(Self {
            args,
            spark_bin,
            submit_args,
            backend,
            state: Arc::new(state),
            id: Arc::new(id),
            handle: None,
            polling: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Launches spark-submit and returns as soon as the process is up,
    /// unless `opts.timeout` requests a synchronous wait.
    ///
    /// One-shot: a second call fails with [`Error::AlreadySubmitted`] and
    /// leaves the running job untouched.
    pub async fn submit(&mut self, opts: SubmitOptions) -> Result<(), Error> {
        if *self.state.borrow() != JobState::NotSubmitted {
            return Err(Error::AlreadySubmitted);
        }

        let handle = process::launch(&self.spark_bin, &self.submit_args, &opts.env)?;
        debug!(pid = handle.id(), "spark-submit launched");
        advance(&self.state, JobState::Submitted);
        self.handle = Some(handle.clone());
        self.spawn_supervisor(handle.clone());

        if opts.poll_interval.is_some() && !self.args.is_cluster() {
            warn!("poll_interval ignored: client-mode state follows the local process");
        }
        if let (Some(interval), DeployMode::Cluster) = (opts.poll_interval, self.args.deploy_mode)
        {
            self.spawn_poller(interval);
        }

        if let Some(timeout) = opts.timeout {
            handle.wait(Some(timeout)).await?;
        }
        Ok(())
    }

    /// Watches the process: extracts the submission id from early output,
    /// reflects local process signals into the state machine and settles
    /// the final state once the process exits.
    fn spawn_supervisor(&self, handle: ProcessHandle) {
        let state = self.state.clone();
        let id_cell = self.id.clone();
        let deploy = self.args.deploy_mode;
        let kind = self.args.master_kind();
        tokio::spawn(async move {
            let mut exit = handle.exit_watch();
            loop {
                if deploy == DeployMode::Cluster && id_cell.borrow().is_none() {
                    if let Some(id) = extract::submission_id(&handle.output_snapshot(), kind) {
                        debug!("extracted submission id {id}");
                        id_cell.send_replace(Some(id));
                    }
                }
                // until the manager hands out an id, local signals are all
                // we have: output flowing means the job is underway
                if id_cell.borrow().is_none() && !handle.output().is_empty() {
                    advance(&state, JobState::Running);
                }
                if exit.borrow_and_update().is_some() {
                    break;
                }
                tokio::select! {
                    _ = exit.changed() => break,
                    _ = tokio::time::sleep(OUTPUT_SCAN_INTERVAL) => {}
                }
            }

            // the exit code is published only after both streams closed,
            // so the buffer is complete here
            if deploy == DeployMode::Cluster && id_cell.borrow().is_none() {
                if let Some(id) = extract::submission_id(&handle.output_snapshot(), kind) {
                    id_cell.send_replace(Some(id));
                }
            }
            let code = handle.poll_exit().unwrap_or(-1);
            match deploy {
                // the local process hosts the driver: its exit is the job's
                DeployMode::Client => {
                    let last = if code == 0 { JobState::Finished } else { JobState::Failed };
                    advance(&state, last);
                }
                DeployMode::Cluster => {
                    if id_cell.borrow().is_none() {
                        if code != 0 {
                            warn!("spark-submit exited with {code} before a submission id appeared");
                            advance(&state, JobState::Failed);
                        } else {
                            warn!("no submission id found in spark-submit output");
                            advance(&state, JobState::Unknown);
                        }
                    }
                }
            }
        });
    }

    /// Polls the status backend on `interval` once the submission id is
    /// known, until a terminal state or too many UNKNOWN cycles in a row.
    fn spawn_poller(&self, interval: Duration) {
        let state = self.state.clone();
        let backend = self.backend.clone();
        let mut id_rx = self.id.subscribe();
        let mut state_rx = self.state.subscribe();
        let polling = self.polling.clone();
        polling.store(true, Ordering::Relaxed);
        tokio::spawn(async move {
            let id = loop {
                if let Some(id) = id_rx.borrow_and_update().clone() {
                    break id;
                }
                // the submission may fail before an id ever appears
                if state_rx.borrow_and_update().is_terminal() {
                    polling.store(false, Ordering::Relaxed);
                    return;
                }
                tokio::select! {
                    changed = id_rx.changed() => {
                        if changed.is_err() {
                            polling.store(false, Ordering::Relaxed);
                            return;
                        }
                    }
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            polling.store(false, Ordering::Relaxed);
                            return;
                        }
                    }
                }
            };

            let mut unknown_streak = 0u32;
            loop {
                tokio::time::sleep(interval).await;
                if state.borrow().is_terminal() {
                    break;
                }
                match backend.driver_state(&id).await {
                    Ok(next) => {
                        unknown_streak =
                            if next == JobState::Unknown { unknown_streak + 1 } else { 0 };
                        advance(&state, next);
                    }
                    Err(e) => {
                        unknown_streak += 1;
                        warn!("status query for submission {id} failed: {e:#}");
                        advance(&state, JobState::Unknown);
                    }
                }
                if state.borrow().is_terminal() {
                    break;
                }
                if unknown_streak >= MAX_UNKNOWN_POLLS {
                    warn!(
                        "state unknown after {MAX_UNKNOWN_POLLS} consecutive polls \
                         for submission {id}; giving up"
                    );
                    break;
                }
            }
            polling.store(false, Ordering::Relaxed);
        });
    }

    /// Current job state. For a cluster job with a known submission id and
    /// no background poller, one status query is made first so the answer
    /// is fresh.
    pub async fn get_state(&self) -> JobState {
        let current = *self.state.borrow();
        if current.is_terminal()
            || current == JobState::NotSubmitted
            || self.polling.load(Ordering::Relaxed)
            || !self.args.is_cluster()
        {
            return current;
        }
        let Some(id) = self.id.borrow().clone() else {
            return current;
        };
        match self.backend.driver_state(&id).await {
            Ok(next) => advance(&self.state, next),
            Err(e) => {
                warn!("status query for submission {id} failed: {e:#}");
                advance(&self.state, JobState::Unknown);
            }
        }
        *self.state.borrow()
    }

    /// Kills the cluster job through the manager and optimistically moves
    /// to KILLED pending poller confirmation.
    ///
    /// Client-mode jobs cannot be killed: the local process owns their
    /// lifetime. A kill before the submission id is known fails immediately
    /// instead of blocking until the id appears.
    pub async fn kill(&self) -> Result<(), Error> {
        if !self.args.is_cluster() {
            return Err(Error::NotKillable(
                "client-mode jobs follow the local process".to_owned(),
            ));
        }
        let current = *self.state.borrow();
        if current == JobState::NotSubmitted {
            return Err(Error::NotKillable("job has not been submitted".to_owned()));
        }
        if current.is_terminal() {
            return Err(Error::NotKillable(format!(
                "job already concluded with state {current}"
            )));
        }
        let Some(id) = self.id.borrow().clone() else {
            return Err(Error::NotKillable(
                "submission id is not yet known".to_owned(),
            ));
        };
        self.backend.kill_driver(&id).await.map_err(|e| Error::Kill {
            id: id.clone(),
            reason: format!("{e:#}"),
        })?;
        advance(&self.state, JobState::Killed);
        Ok(())
    }

    /// Waits for the local spark-submit process to exit. A timeout leaves
    /// the process running.
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<i32, Error> {
        match &self.handle {
            Some(handle) => handle.wait(timeout).await,
            None => Err(Error::NotSubmitted),
        }
    }

    /// Local process exit code, once available.
    pub fn get_code(&self) -> Option<i32> {
        self.handle.as_ref().and_then(ProcessHandle::poll_exit)
    }

    /// Snapshot of the captured spark-submit output so far.
    pub fn get_output(&self) -> String {
        self.handle
            .as_ref()
            .map(ProcessHandle::output_snapshot)
            .unwrap_or_default()
    }

    /// Cluster-assigned submission identifier, once extracted.
    pub fn get_id(&self) -> Option<String> {
        self.id.borrow().clone()
    }

    /// The full command line, for display only. With `multiline`, one flag
    /// per backslash-continued line.
    pub fn get_submit_cmd(&self, multiline: bool) -> String {
        command::render(&self.spark_bin, &self.args, multiline)
    }

    /// Whether the job reached a terminal state.
    pub fn concluded(&self) -> bool {
        self.state.borrow().is_terminal()
    }
}
