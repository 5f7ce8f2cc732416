//! Step and notification payload definitions.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One unit of work in a plan, executed as a subprocess.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Step {
    /// Display name, not used for any path
    #[serde(default)]
    pub name: String,

    /// Script text written to an executable file and run directly, so it
    /// should start with a shebang line
    pub payload: String,
}

/// A post-run side effect, executed once per target after a run finishes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Notification {
    /// Target identifier; also names the materialized `notify-<target>` file
    pub target: String,

    /// Script text executed with the finished run as context
    pub payload: String,
}
