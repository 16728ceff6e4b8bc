//! Kubernetes surface: the driver pod's phase, addressed by the pod name
//! extracted at submission and the namespace from the job's conf.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::warn;

use super::DriverStatusService;
use crate::model::state::JobState;

pub struct KubernetesApi {
    namespace: String,
}

#[derive(Debug, Default, Deserialize)]
struct Pod {
    #[serde(default)]
    status: PodStatus,
}

#[derive(Debug, Default, Deserialize)]
struct PodStatus {
    #[serde(default)]
    phase: Option<String>,
}

impl KubernetesApi {
    pub fn new(namespace: String) -> Self {
        Self { namespace }
    }
}

#[async_trait]
impl DriverStatusService for KubernetesApi {
    async fn driver_state(&self, id: &str) -> anyhow::Result<JobState> {
        let out = Command::new("kubectl")
            .args(["get", "pod", id, "-n", self.namespace.as_str(), "-o", "json"])
            .output()
            .await?;
        if !out.status.success() {
            anyhow::bail!("kubectl get pod exited with {}", out.status);
        }
        let pod: Pod = serde_json::from_slice(&out.stdout)?;
        let Some(phase) = pod.status.phase else {
            warn!("driver pod {id} reports no phase");
            return Ok(JobState::Unknown);
        };
        Ok(map_phase(&phase))
    }

    async fn kill_driver(&self, id: &str) -> anyhow::Result<()> {
        let out = Command::new("kubectl")
            .args(["delete", "pod", id, "-n", self.namespace.as_str()])
            .output()
            .await?;
        if !out.status.success() {
            anyhow::bail!("kubectl delete pod exited with {}", out.status);
        }
        Ok(())
    }
}

/// Pod phase into the unified state. A deleted pod never reports a phase;
/// the controller records the kill it issued itself.
fn map_phase(phase: &str) -> JobState {
    match phase {
        "Pending" => JobState::Submitted,
        "Running" => JobState::Running,
        "Succeeded" => JobState::Finished,
        "Failed" => JobState::Failed,
        other => {
            warn!("unrecognized pod phase {other:?}");
            JobState::Unknown
        }
    }
}
