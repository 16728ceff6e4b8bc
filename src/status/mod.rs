//! Manager-specific status and kill surfaces, normalized into the unified
//! [`JobState`]. Each backend owns the exhaustive mapping from its own
//! status vocabulary; nothing outside this module branches on the manager
//! kind.

mod kubernetes;
mod standalone;
mod yarn;

use std::sync::Arc;

use async_trait::async_trait;

pub use kubernetes::KubernetesApi;
pub use standalone::StandaloneRest;
pub use yarn::YarnCli;

use crate::model::spec::{MasterKind, SparkArgs};
use crate::model::state::JobState;

/// One cluster manager's view of a submitted driver.
///
/// Errors are transient by contract: the caller degrades a failed query to
/// [`JobState::Unknown`] for that cycle and retries on the next.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DriverStatusService: Send + Sync {
    /// Queries the manager for the driver's current state.
    async fn driver_state(&self, id: &str) -> anyhow::Result<JobState>;

    /// Issues a manager-specific kill for the driver.
    async fn kill_driver(&self, id: &str) -> anyhow::Result<()>;
}

/// Picks the backend matching the submission's master URL.
pub fn backend_for(args: &SparkArgs) -> Arc<dyn DriverStatusService> {
    match args.master_kind() {
        MasterKind::Standalone => Arc::new(StandaloneRest::new(&args.master)),
        MasterKind::Yarn => Arc::new(YarnCli),
        MasterKind::Kubernetes => Arc::new(KubernetesApi::new(args.kubernetes_namespace())),
    }
}
