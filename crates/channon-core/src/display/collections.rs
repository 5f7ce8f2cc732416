//! Collection wrapper types for displaying groups of domain objects.
//!
//! Each wrapper formats its items and prints a fixed line when empty.

use std::{fmt, ops::Index};

use crate::models::{Run, Tag};

/// Newtype wrapper for displaying a list of plan names.
///
/// # Examples
///
/// ```rust
/// use channon_core::display::PlanNames;
///
/// let names = PlanNames(vec!["deploy".to_string(), "nightly".to_string()]);
/// assert_eq!(names.to_string(), "- deploy\n- nightly\n");
/// assert_eq!(PlanNames(vec![]).to_string(), "No plans found.\n");
/// ```
pub struct PlanNames(pub Vec<String>);

impl PlanNames {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl fmt::Display for PlanNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No plans found.")
        } else {
            for name in &self.0 {
                writeln!(f, "- {name}")?;
            }
            Ok(())
        }
    }
}

/// Newtype wrapper for displaying the runs of a plan.
///
/// Each run is formatted with its own `Display` implementation.
pub struct Runs(pub Vec<Run>);

impl Runs {
    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of runs in the collection.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get a reference to the run at the given position.
    pub fn get(&self, index: usize) -> Option<&Run> {
        self.0.get(index)
    }

    /// Get an iterator over the runs.
    pub fn iter(&self) -> std::slice::Iter<'_, Run> {
        self.0.iter()
    }
}

impl Index<usize> for Runs {
    type Output = Run;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IntoIterator for Runs {
    type Item = Run;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Runs {
    type Item = &'a Run;
    type IntoIter = std::slice::Iter<'a, Run>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Runs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No runs found.")
        } else {
            for run in &self.0 {
                write!(f, "{run}")?;
            }
            Ok(())
        }
    }
}

/// Newtype wrapper for displaying the tag registry.
pub struct Tags(pub Vec<Tag>);

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No tags found.")
        } else {
            for tag in &self.0 {
                writeln!(f, "- {tag}")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::models::RunStatus;

    fn create_test_run(id: u64, status: RunStatus) -> Run {
        let mut run = Run::new("deploy", id, "post", PathBuf::from("/plans/deploy/runs"));
        run.status = status;
        run
    }

    #[test]
    fn test_runs_display() {
        let runs = Runs(vec![
            create_test_run(0, RunStatus::Success),
            create_test_run(2, RunStatus::Failure),
        ]);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].id, 2);

        let output = format!("{runs}");
        assert!(output.contains("## Run 0 of deploy (✓ Success)"));
        assert!(output.contains("## Run 2 of deploy (✗ Failure)"));

        assert_eq!(format!("{}", Runs(vec![])), "No runs found.\n");
    }

    #[test]
    fn test_tags_display() {
        let tags = Tags(vec![Tag::new("ci"), Tag::new("prod")]);
        assert_eq!(format!("{tags}"), "- ci\n- prod\n");
        assert_eq!(format!("{}", Tags(vec![])), "No tags found.\n");
    }
}
