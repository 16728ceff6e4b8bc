//! Read-only discovery of the Spark tooling installed on this machine.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::model::spec::default_spark_home;

static SPARK_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)  version (.+)").unwrap());
static SCALA_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)scala version (.+?),").unwrap());
static JAVA_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)version "(.+)""#).unwrap());

/// Detected versions of the submission tooling. A missing tool is reported
/// as "not detected", never as an error.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub spark_version: Option<String>,
    pub scala_version: Option<String>,
    pub java_version: Option<String>,
    pub os: String,
}

impl fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detected = |v: &Option<String>| v.clone().unwrap_or_else(|| "not detected".to_owned());
        writeln!(f, "Spark version: {}", detected(&self.spark_version))?;
        writeln!(f, "Scala version: {}", detected(&self.scala_version))?;
        writeln!(f, "Java version: {}", detected(&self.java_version))?;
        write!(f, "OS: {}", self.os)
    }
}

/// Runs `spark-submit --version` and `java -version` and scrapes their
/// banners. Never mutates state.
pub async fn system_info() -> SystemInfo {
    let spark_bin = format!("{}/bin/spark-submit", default_spark_home());
    let mut banner = String::new();
    append_output(&mut banner, Command::new(&spark_bin).arg("--version")).await;

    let java_bin = match std::env::var("JAVA_HOME") {
        Ok(java_home) if !java_home.is_empty() => format!("{java_home}/bin/java"),
        _ => "java".to_owned(),
    };
    append_output(&mut banner, Command::new(&java_bin).arg("-version")).await;

    SystemInfo {
        spark_version: scrape(&SPARK_VERSION, &banner),
        scala_version: scrape(&SCALA_VERSION, &banner),
        java_version: scrape(&JAVA_VERSION, &banner),
        os: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
    }
}

/// Version banners routinely go to stderr, so both streams are collected.
async fn append_output(banner: &mut String, cmd: &mut Command) {
    if let Ok(out) = cmd.output().await {
        banner.push_str(&String::from_utf8_lossy(&out.stdout));
        banner.push_str(&String::from_utf8_lossy(&out.stderr));
    }
}

fn scrape(pattern: &Regex, banner: &str) -> Option<String> {
    pattern
        .captures(banner)
        .map(|caps| caps[1].trim().to_owned())
}
