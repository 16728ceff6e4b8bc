use std::collections::HashMap;

use typed_builder::TypedBuilder;

/// Whether the local spark-submit process hosts the driver (`client`) or
/// only dispatches it to the cluster (`cluster`). Only cluster-mode jobs can
/// be killed: in client mode the local process owns the job's lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    #[default]
    Client,
    Cluster,
}

impl DeployMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Cluster => "cluster",
        }
    }
}

/// Which cluster manager backs the job, derived from the master URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterKind {
    Standalone,
    Yarn,
    Kubernetes,
}

impl MasterKind {
    /// `local[*]` and `spark://…` masters both use the standalone surfaces.
    pub fn from_master(master: &str) -> Self {
        if master.contains("yarn") {
            Self::Yarn
        } else if master.contains("k8s") {
            Self::Kubernetes
        } else {
            Self::Standalone
        }
    }
}

/// Value of a pass-through submission option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// Emits the bare flag when true, nothing when false.
    Flag(bool),
    Scalar(String),
    /// Emits the flag once per element, in order.
    Repeated(Vec<String>),
}

/// Environment handed to the spawned spark-submit process.
#[derive(Debug, Default, Clone)]
pub enum EnvPolicy {
    /// Start from an empty environment.
    Clean,
    /// Inherit the caller's environment untouched.
    #[default]
    Inherit,
    /// Inherit, then overlay these variables. Overlay keys win, every other
    /// inherited key is retained.
    Overlay(HashMap<String, String>),
}

/// Immutable description of one submission. Field defaults mirror the
/// stock spark-submit defaults; anything spark-submit grows in the future
/// goes through `extra` unvalidated, so the builder does not need to chase
/// upstream releases.
#[derive(Debug, Clone, TypedBuilder)]
pub struct SparkArgs {
    /// Entry .jar or .py file, either a local path or a remote URI.
    #[builder(setter(into))]
    pub main_file: String,

    /// Overrides the `SPARK_HOME` environment variable.
    #[builder(default, setter(strip_option, into))]
    pub spark_home: Option<String>,

    #[builder(default = "local[*]".into(), setter(into))]
    pub master: String,

    #[builder(default = "spark-submit-task".into(), setter(into))]
    pub name: String,

    #[builder(default)]
    pub deploy_mode: DeployMode,

    #[builder(default = "1g".into(), setter(into))]
    pub driver_memory: String,

    #[builder(default = "1g".into(), setter(into))]
    pub executor_memory: String,

    #[builder(default = "1".into(), setter(into))]
    pub executor_cores: String,

    #[builder(default = "2".into(), setter(into))]
    pub total_executor_cores: String,

    #[builder(default, setter(strip_option, into))]
    pub class: Option<String>,

    #[builder(default, setter(strip_option, into))]
    pub py_files: Option<String>,

    #[builder(default, setter(strip_option, into))]
    pub files: Option<String>,

    #[builder(default, setter(strip_option, into))]
    pub jars: Option<String>,

    #[builder(default, setter(strip_option, into))]
    pub packages: Option<String>,

    #[builder(default, setter(strip_option, into))]
    pub exclude_packages: Option<String>,

    #[builder(default, setter(strip_option, into))]
    pub repositories: Option<String>,

    #[builder(default, setter(strip_option, into))]
    pub properties_file: Option<String>,

    #[builder(default)]
    pub verbose: bool,

    #[builder(default)]
    pub supervise: bool,

    /// Repeated `--conf key=value` overrides, emitted in order.
    #[builder(default)]
    pub conf: Vec<String>,

    /// Positional arguments for the main file.
    #[builder(default)]
    pub main_file_args: Vec<String>,

    /// Options the builder does not know about, passed through verbatim.
    /// Keys use `snake_case` and are translated to `--kebab-case` flags.
    #[builder(default)]
    pub extra: Vec<(String, ArgValue)>,
}

impl SparkArgs {
    pub fn master_kind(&self) -> MasterKind {
        MasterKind::from_master(&self.master)
    }

    pub fn is_cluster(&self) -> bool {
        self.deploy_mode == DeployMode::Cluster
    }

    /// Namespace the driver pod lives in, from `spark.kubernetes.namespace`.
    pub fn kubernetes_namespace(&self) -> String {
        self.conf
            .iter()
            .find_map(|c| c.strip_prefix("spark.kubernetes.namespace="))
            .map(|v| v.trim_matches(|c| c == '"' || c == '\'').to_owned())
            .unwrap_or_else(|| "default".to_owned())
    }
}

/// `SPARK_HOME`, falling back to `~/spark_home`.
pub(crate) fn default_spark_home() -> String {
    std::env::var("SPARK_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_owned());
        format!("{home}/spark_home")
    })
}
