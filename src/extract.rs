//! Pulls the cluster-assigned submission identifier out of spark-submit
//! output. Cluster-mode submissions print it early; absence is a normal
//! state while output is still accumulating, never an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::spec::MasterKind;

static YARN_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(application[0-9_]+)").unwrap());
static K8S_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*pod name: ((.+?)-([a-z0-9]+)-driver)").unwrap());
static STANDALONE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""submissionId" : "(.+)""#).unwrap());

/// First submission identifier found in `output`, if any. Idempotent: safe
/// to call repeatedly as more output accumulates.
pub fn submission_id(output: &str, kind: MasterKind) -> Option<String> {
    let pattern = match kind {
        MasterKind::Yarn => &YARN_ID,
        MasterKind::Kubernetes => &K8S_ID,
        MasterKind::Standalone => &STANDALONE_ID,
    };
    pattern.captures(output).map(|caps| caps[1].to_owned())
}
