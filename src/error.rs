use std::io;

use thiserror::Error;

/// Errors surfaced by the public API.
///
/// Transient status-query failures are not represented here: a failed poll
/// cycle degrades the job state to [`JobState::Unknown`] instead of erroring,
/// so a flaky master is never mistaken for a concluded job.
///
/// [`JobState::Unknown`]: crate::JobState::Unknown
#[derive(Debug, Error)]
pub enum Error {
    #[error("file {0} does not exist")]
    MainFileMissing(String),

    #[error("bin/spark-submit was not found in {0:?}")]
    SparkBinMissing(String),

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("job was already submitted")]
    AlreadySubmitted,

    #[error("job has not been submitted")]
    NotSubmitted,

    #[error("job cannot be killed: {0}")]
    NotKillable(String),

    #[error("failed to kill submission {id}: {reason}")]
    Kill { id: String, reason: String },

    #[error("spark-submit did not exit within the requested timeout")]
    WaitTimeout,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
