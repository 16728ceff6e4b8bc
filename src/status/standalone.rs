//! Standalone master REST surface (`/v1/submissions`), addressed by the
//! `driver-…` submission id against the configured master URL.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::DriverStatusService;
use crate::model::state::JobState;

pub struct StandaloneRest {
    base: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SubmissionStatusResponse {
    #[serde(rename = "driverState", default)]
    driver_state: Option<String>,
}

impl StandaloneRest {
    pub fn new(master: &str) -> Self {
        let base = master.trim_end_matches('/').replacen("spark://", "http://", 1);
        Self {
            base,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, endpoint: &str, id: &str) -> String {
        format!("{}/v1/submissions/{endpoint}/{id}", self.base)
    }
}

#[async_trait]
impl DriverStatusService for StandaloneRest {
    async fn driver_state(&self, id: &str) -> anyhow::Result<JobState> {
        let response: SubmissionStatusResponse = self
            .http
            .get(self.url("status", id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let Some(state) = response.driver_state else {
            warn!("driverState missing in status response for submission {id}");
            return Ok(JobState::Unknown);
        };
        Ok(map_driver_state(&state))
    }

    async fn kill_driver(&self, id: &str) -> anyhow::Result<()> {
        self.http
            .get(self.url("kill", id))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Standalone driver vocabulary into the unified state. RELAUNCHING means
/// the worker is restarting the driver, so the job is still in flight.
fn map_driver_state(state: &str) -> JobState {
    match state {
        "SUBMITTED" => JobState::Submitted,
        "RUNNING" | "RELAUNCHING" => JobState::Running,
        "FINISHED" => JobState::Finished,
        "FAILED" | "ERROR" => JobState::Failed,
        "KILLED" => JobState::Killed,
        other => {
            warn!("unrecognized driver state {other:?}");
            JobState::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_url_becomes_http_base() {
        let rest = StandaloneRest::new("spark://master:6066/");
        assert_eq!(
            rest.url("status", "driver-20260826123456-0001"),
            "http://master:6066/v1/submissions/status/driver-20260826123456-0001"
        );
    }

    #[test]
    fn driver_vocabulary_maps_exhaustively() {
        assert_eq!(map_driver_state("SUBMITTED"), JobState::Submitted);
        assert_eq!(map_driver_state("RUNNING"), JobState::Running);
        assert_eq!(map_driver_state("RELAUNCHING"), JobState::Running);
        assert_eq!(map_driver_state("FINISHED"), JobState::Finished);
        assert_eq!(map_driver_state("FAILED"), JobState::Failed);
        assert_eq!(map_driver_state("ERROR"), JobState::Failed);
        assert_eq!(map_driver_state("KILLED"), JobState::Killed);
        assert_eq!(map_driver_state("SOMETHING_NEW"), JobState::Unknown);
    }

    #[test]
    fn status_response_parses_with_and_without_state() {
        let body = r#"{
            "action" : "SubmissionStatusResponse",
            "driverState" : "RUNNING",
            "success" : true
        }"#;
        let parsed: SubmissionStatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.driver_state.as_deref(), Some("RUNNING"));

        let parsed: SubmissionStatusResponse =
            serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(parsed.driver_state.is_none());
    }
}
