//! Display implementations for domain models.
//!
//! All output is markdown so the CLI can render it with termimad and the MCP
//! server can hand it to clients unchanged.

use std::fmt;

use super::datetime::{Elapsed, LocalDateTime};
use crate::{
    disk::StepOutput,
    models::{Notification, Plan, Run, RunStatus, Step},
};

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.name)?;
        writeln!(f)?;

        writeln!(f, "- Trigger: {}", self.trigger.kind)?;
        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(|tag| tag.as_str()).collect();
            writeln!(f, "- Tags: {}", tags.join(", "))?;
        }

        if self.steps.is_empty() {
            writeln!(f, "\nNo steps in this plan.")?;
        } else {
            writeln!(f, "\n## Steps")?;
            writeln!(f)?;
            for (index, step) in self.steps.iter().enumerate() {
                fmt_step(f, index, step)?;
            }
        }

        if !self.notifications.is_empty() {
            writeln!(f, "## Notifications")?;
            writeln!(f)?;
            for notification in &self.notifications {
                write!(f, "{notification}")?;
            }
        }

        Ok(())
    }
}

fn fmt_step(f: &mut fmt::Formatter<'_>, index: usize, step: &Step) -> fmt::Result {
    if step.name.is_empty() {
        writeln!(f, "### {index}.")?;
    } else {
        writeln!(f, "### {index}. {}", step.name)?;
    }
    writeln!(f)?;
    fmt_payload(f, &step.payload)
}

fn fmt_payload(f: &mut fmt::Formatter<'_>, payload: &str) -> fmt::Result {
    writeln!(f, "```")?;
    write!(f, "{payload}")?;
    if !payload.ends_with('\n') {
        writeln!(f)?;
    }
    writeln!(f, "```")?;
    writeln!(f)
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### {}", self.target)?;
        writeln!(f)?;
        fmt_payload(f, &self.payload)
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## Run {} of {} ({})", self.id, self.plan, self.status.with_icon())?;
        writeln!(f)?;
        if !self.trigger.is_empty() {
            writeln!(f, "- **Trigger**: {}", self.trigger)?;
        }
        writeln!(f, "- **Started**: {}", LocalDateTime(&self.start))?;
        if let Some(duration) = &self.duration {
            writeln!(f, "- **Duration**: {}", Elapsed(duration))?;
        }
        writeln!(f)
    }
}

impl fmt::Display for StepOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (title, stream) in [("stdout", &self.stdout), ("stderr", &self.stderr)] {
            writeln!(f, "### {title}")?;
            writeln!(f)?;
            if stream.is_empty() {
                writeln!(f, "(empty)")?;
                writeln!(f)?;
            } else {
                fmt_payload(f, stream)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use jiff::{SignedDuration, Timestamp};

    use super::*;

    fn create_test_run() -> Run {
        let mut run = Run::new("deploy", 3, "post", PathBuf::from("/plans/deploy/runs/3"));
        run.start = Timestamp::from_second(1640995200).unwrap();
        run
    }

    #[test]
    fn test_plan_display() {
        let plan = Plan::new("deploy")
            .with_step("build", "#!/bin/sh\nmake\n")
            .with_step("", "#!/bin/sh\nmake install")
            .with_notification("mail", "#!/bin/sh\necho done\n")
            .with_tag("prod")
            .with_tag("ci");
        let output = format!("{plan}");

        assert!(output.starts_with("# deploy\n"));
        assert!(output.contains("- Trigger: post"));
        assert!(output.contains("- Tags: ci, prod"));
        assert!(output.contains("### 0. build"));
        assert!(output.contains("### 1.\n"));
        assert!(output.contains("make install\n```"));
        assert!(output.contains("## Notifications"));
        assert!(output.contains("### mail"));
    }

    #[test]
    fn test_plan_display_without_steps() {
        let output = format!("{}", Plan::new("empty"));
        assert!(output.contains("No steps in this plan."));
        assert!(!output.contains("Tags"));
        assert!(!output.contains("Notifications"));
    }

    #[test]
    fn test_run_display() {
        let mut run = create_test_run();
        let output = format!("{run}");
        assert!(output.contains("## Run 3 of deploy (○ Pending)"));
        assert!(output.contains("- **Trigger**: post"));
        assert!(!output.contains("Duration"));

        run.status = RunStatus::Success;
        run.duration = Some(SignedDuration::from_millis(1500));
        let output = format!("{run}");
        assert!(output.contains("✓ Success"));
        assert!(output.contains("- **Duration**: 1.500s"));
    }

    #[test]
    fn test_step_output_display() {
        let output = StepOutput {
            stdout: "hello\n".to_string(),
            stderr: String::new(),
        };
        let rendered = format!("{output}");
        assert!(rendered.contains("### stdout\n\n```\nhello\n```"));
        assert!(rendered.contains("### stderr\n\n(empty)"));
    }

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::Executing.to_string(), "executing");
        assert_eq!(RunStatus::Failure.to_string(), "failure");
    }
}
