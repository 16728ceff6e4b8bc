//! YARN resource manager surface via the `yarn application` CLI, addressed
//! by application id.

use async_trait::async_trait;
use tokio::process::Command;

use super::DriverStatusService;
use crate::model::state::JobState;

pub struct YarnCli;

#[async_trait]
impl DriverStatusService for YarnCli {
    async fn driver_state(&self, id: &str) -> anyhow::Result<JobState> {
        let out = Command::new("yarn")
            .args(["application", "-status", id])
            .output()
            .await?;
        if !out.status.success() {
            anyhow::bail!("yarn application -status exited with {}", out.status);
        }
        Ok(parse_report(&String::from_utf8_lossy(&out.stdout)))
    }

    async fn kill_driver(&self, id: &str) -> anyhow::Result<()> {
        let out = Command::new("yarn")
            .args(["application", "-kill", id])
            .output()
            .await?;
        if !out.status.success() {
            anyhow::bail!("yarn application -kill exited with {}", out.status);
        }
        Ok(())
    }
}

/// Application report into the unified state. FINISHED alone says nothing;
/// the final status decides between success and failure.
fn parse_report(report: &str) -> JobState {
    let mut state = None;
    let mut final_state = None;
    for line in report.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("State :") {
            state = Some(value.trim().to_owned());
        } else if let Some(value) = line.strip_prefix("Final-State :") {
            final_state = Some(value.trim().to_owned());
        }
    }
    match state.as_deref() {
        Some("NEW" | "NEW_SAVING" | "SUBMITTED" | "ACCEPTED") => JobState::Submitted,
        Some("RUNNING") => JobState::Running,
        Some("FINISHED") => match final_state.as_deref() {
            Some("SUCCEEDED") => JobState::Finished,
            Some("FAILED") => JobState::Failed,
            Some("KILLED") => JobState::Killed,
            _ => JobState::Unknown,
        },
        Some("FAILED") => JobState::Failed,
        Some("KILLED") => JobState::Killed,
        _ => JobState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(state: &str, final_state: &str) -> String {
        format!(
            "Application Report : \n\
             \tApplication-Id : application_1700000000_0001\n\
             \tState : {state}\n\
             \tFinal-State : {final_state}\n\
             \tTracking-URL : http://rm:8088\n"
        )
    }

    #[test]
    fn accepted_is_submitted() {
        assert_eq!(parse_report(&report("ACCEPTED", "UNDEFINED")), JobState::Submitted);
    }

    #[test]
    fn running_stays_running() {
        assert_eq!(parse_report(&report("RUNNING", "UNDEFINED")), JobState::Running);
    }

    #[test]
    fn finished_splits_on_final_status() {
        assert_eq!(parse_report(&report("FINISHED", "SUCCEEDED")), JobState::Finished);
        assert_eq!(parse_report(&report("FINISHED", "FAILED")), JobState::Failed);
        assert_eq!(parse_report(&report("FINISHED", "KILLED")), JobState::Killed);
    }

    #[test]
    fn killed_and_failed_map_directly() {
        assert_eq!(parse_report(&report("KILLED", "KILLED")), JobState::Killed);
        assert_eq!(parse_report(&report("FAILED", "FAILED")), JobState::Failed);
    }

    #[test]
    fn unparseable_report_is_unknown() {
        assert_eq!(parse_report("Application with id not found"), JobState::Unknown);
        assert_eq!(parse_report(""), JobState::Unknown);
    }
}
