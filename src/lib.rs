//! Submit and monitor Apache Spark jobs from Rust.
//!
//! Wraps the `spark-submit` command for standalone, YARN and Kubernetes
//! masters: builds the argument vector, owns the launched process, extracts
//! the cluster-assigned submission id from its output and tracks the driver
//! through one unified state machine until the job concludes.
//!
//! ```no_run
//! use std::time::Duration;
//! use spark_submit::{SparkArgs, SparkJob, SubmitOptions, DeployMode};
//!
//! # async fn run() -> Result<(), spark_submit::Error> {
//! let args = SparkArgs::builder()
//!     .main_file("s3://bucket/app.py")
//!     .master("spark://master:6066")
//!     .deploy_mode(DeployMode::Cluster)
//!     .build();
//! let mut job = SparkJob::new(args)?;
//! job.submit(
//!     SubmitOptions::builder()
//!         .poll_interval(Duration::from_secs(10))
//!         .build(),
//! )
//! .await?;
//! println!("submitted as {:?}", job.get_id());
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod error;
pub mod extract;
mod job;
pub mod model;
pub mod process;
pub mod status;
pub mod system;

pub use error::{Error, Result};
pub use job::{SparkJob, SubmitOptions};
pub use model::spec::{ArgValue, DeployMode, EnvPolicy, MasterKind, SparkArgs};
pub use model::state::JobState;
pub use process::{OutputBuffer, ProcessHandle};
pub use status::DriverStatusService;
pub use system::{system_info, SystemInfo};
