//! Plan model definition and validation.

use std::collections::{BTreeSet, HashSet};

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Notification, Step, Tag};
use crate::error::{ChannonError, Result};

/// Longest name accepted for a path segment, in bytes.
const MAX_SEGMENT_LEN: usize = 255;

/// Trigger kind used when a plan document does not name one.
pub const DEFAULT_TRIGGER_KIND: &str = "post";

/// Describes what starts a plan's runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Trigger {
    /// Trigger kind, copied onto every run (e.g. `post`, `scheduled`)
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            kind: DEFAULT_TRIGGER_KIND.to_string(),
        }
    }
}

/// A named workflow definition. This is the `plan.json` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Plan {
    /// Unique name, also the plan's directory name
    pub name: String,

    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Notifications fired after every run
    #[serde(default, rename = "notify")]
    pub notifications: Vec<Notification>,

    /// Trigger descriptor
    #[serde(default)]
    pub trigger: Trigger,

    /// Tags used for filtering
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
}

impl Plan {
    /// Creates an empty plan with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Appends a step. Used to build plans fluently.
    pub fn with_step(mut self, name: impl Into<String>, payload: impl Into<String>) -> Self {
        self.steps.push(Step {
            name: name.into(),
            payload: payload.into(),
        });
        self
    }

    /// Appends a notification.
    pub fn with_notification(
        mut self,
        target: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        self.notifications.push(Notification {
            target: target.into(),
            payload: payload.into(),
        });
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Whether any of `filter` is in this plan's tag set.
    pub fn has_any_tag<'a, I>(&self, filter: I) -> bool
    where
        I: IntoIterator<Item = &'a Tag>,
    {
        filter.into_iter().any(|tag| self.tags.contains(tag))
    }

    /// Checks that the name and every notification target can be used as
    /// a single path segment, and that targets are unique.
    ///
    /// # Errors
    ///
    /// Returns `ChannonError::InvalidInput` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        validate_segment("name", &self.name)?;

        let mut targets = HashSet::new();
        for notification in &self.notifications {
            validate_segment("notify.target", &notification.target)?;
            if !targets.insert(notification.target.as_str()) {
                return Err(ChannonError::invalid_input("notify.target").with_reason(format!(
                    "duplicate notification target '{}'",
                    notification.target
                )));
            }
        }
        Ok(())
    }
}

/// Rejects values that are not a single, plain path segment.
///
/// # Examples
///
/// ```rust
/// use channon_core::models::validate_segment;
///
/// assert!(validate_segment("name", "nightly-build").is_ok());
/// assert!(validate_segment("name", "../etc").is_err());
/// assert!(validate_segment("name", "").is_err());
/// ```
pub fn validate_segment(field: &str, value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value.len() > MAX_SEGMENT_LEN {
        Some("must be at most 255 bytes")
    } else if value.starts_with('.') {
        Some("must not start with '.'")
    } else if value.contains(['/', '\\', '\0']) {
        Some("must not contain path separators or NUL")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ChannonError::invalid_input(field)
            .with_reason(format!("'{}' {reason}", value.escape_debug()))),
        None => Ok(()),
    }
}
