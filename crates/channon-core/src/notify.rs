//! Fire-and-forget notifications for finished runs.
//!
//! Each notification gets its own blocking task. Nothing waits for them, their
//! outcome never touches the run, and a failure is only logged.

use std::ffi::OsString;

use log::{debug, warn};
use tokio::runtime::Handle;

use crate::{
    disk::StepArtifacts,
    executor::{run_payload, ENV_TRIGGER},
    models::{Notification, Run},
};

pub const ENV_PLAN: &str = "CHANNON_PLAN";
pub const ENV_RUN_ID: &str = "CHANNON_RUN_ID";
pub const ENV_RUN_STATUS: &str = "CHANNON_RUN_STATUS";
/// Path of the finished run's `run.json`.
pub const ENV_RUN: &str = "CHANNON_RUN";

/// Dispatches every notification of a plan for one finished run.
#[derive(Debug)]
pub struct NotificationDispatcher {
    run: Run,
    notifications: Vec<Notification>,
}

impl NotificationDispatcher {
    pub fn new(run: Run, notifications: Vec<Notification>) -> Self {
        Self { run, notifications }
    }

    /// Environment handed to every notification of this run.
    pub fn environment(&self) -> Vec<(&'static str, OsString)> {
        vec![
            (ENV_TRIGGER, self.run.trigger_path().into_os_string()),
            (ENV_PLAN, OsString::from(&self.run.plan)),
            (ENV_RUN_ID, OsString::from(self.run.id.to_string())),
            (ENV_RUN_STATUS, OsString::from(self.run.status.as_str())),
            (ENV_RUN, self.run.document_path().into_os_string()),
        ]
    }

    /// Starts every notification and returns immediately.
    pub fn dispatch(self) {
        if self.notifications.is_empty() {
            return;
        }
        let env = self.environment();
        let handle = Handle::try_current().ok();

        for notification in self.notifications {
            let run = self.run.clone();
            let env = env.clone();
            let job = move || notify(&run, &notification, &env);
            match &handle {
                Some(handle) => {
                    handle.spawn_blocking(job);
                }
                None => {
                    std::thread::spawn(job);
                }
            }
        }
    }
}

fn notify(run: &Run, notification: &Notification, env: &[(&'static str, OsString)]) {
    let artifacts = StepArtifacts::for_notification(&run.path, &notification.target);
    let label = format!("notify-{}", notification.target);

    match run_payload(&label, &notification.payload, &artifacts, &run.path, env) {
        Ok(()) => debug!(
            "Notified {} for run {} of {}",
            notification.target, run.id, run.plan
        ),
        Err(e) => warn!(
            "Notification {} for run {} of {} failed: {e}",
            notification.target, run.id, run.plan
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunStatus;
    use std::{
        fs,
        time::{Duration, Instant},
    };
    use tempfile::TempDir;

    fn finished_run(dir: &std::path::Path) -> Run {
        let mut run = Run::new("deploy", 4, "post", dir.to_path_buf());
        run.status = RunStatus::Success;
        run
    }

    #[test]
    fn test_environment_describes_run() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let run = finished_run(temp_dir.path());
        let dispatcher = NotificationDispatcher::new(run.clone(), Vec::new());

        let env = dispatcher.environment();
        let lookup = |key: &str| {
            env.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(lookup(ENV_PLAN), "deploy");
        assert_eq!(lookup(ENV_RUN_ID), "4");
        assert_eq!(lookup(ENV_RUN_STATUS), "success");
        assert_eq!(lookup(ENV_TRIGGER), run.trigger_path().into_os_string());
        assert_eq!(lookup(ENV_RUN), run.document_path().into_os_string());
    }

    #[test]
    fn test_dispatch_outside_runtime_runs_on_threads() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let run = finished_run(temp_dir.path());
        let notifications = vec![Notification {
            target: "mail".to_string(),
            payload: "#!/bin/sh\necho \"$CHANNON_PLAN $CHANNON_RUN_STATUS\"\n".to_string(),
        }];

        NotificationDispatcher::new(run, notifications).dispatch();

        let out = temp_dir.path().join("notify-mail.out");
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Ok(contents) = fs::read_to_string(&out) {
                if contents == "deploy success\n" {
                    break;
                }
            }
            assert!(Instant::now() < deadline, "notification never wrote output");
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}
