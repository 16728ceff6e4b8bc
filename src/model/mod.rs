pub mod spec;
pub mod state;

pub use spec::{ArgValue, DeployMode, EnvPolicy, MasterKind, SparkArgs};
pub use state::JobState;
