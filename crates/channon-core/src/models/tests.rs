#[cfg(test)]
mod model_tests {
    use std::path::PathBuf;

    use jiff::{SignedDuration, Timestamp};

    use crate::{
        error::ChannonError,
        models::{Plan, Run, RunStatus, Tag, DEFAULT_TRIGGER_KIND},
    };

    fn create_test_plan() -> Plan {
        Plan::new("deploy")
            .with_step("build", "#!/bin/sh\necho build\n")
            .with_step("ship", "#!/bin/sh\necho ship\n")
            .with_notification("slack", "#!/bin/sh\necho done\n")
            .with_tag("prod")
    }

    #[test]
    fn test_plan_document_field_names() {
        let json = serde_json::to_value(create_test_plan()).unwrap();

        assert_eq!(json["name"], "deploy");
        assert_eq!(json["steps"][1]["name"], "ship");
        assert_eq!(json["notify"][0]["target"], "slack");
        assert_eq!(json["trigger"]["type"], DEFAULT_TRIGGER_KIND);
        assert_eq!(json["tags"][0], "prod");
    }

    #[test]
    fn test_plan_document_defaults() {
        let plan: Plan = serde_json::from_str(r#"{"name": "bare"}"#).unwrap();

        assert_eq!(plan.name, "bare");
        assert!(plan.steps.is_empty());
        assert!(plan.notifications.is_empty());
        assert!(plan.tags.is_empty());
        assert_eq!(plan.trigger.kind, DEFAULT_TRIGGER_KIND);
    }

    #[test]
    fn test_plan_validate_rejects_unsafe_names() {
        for name in ["", ".", "..", ".hidden", "a/b", "a\\b", "nul\0byte"] {
            let err = Plan::new(name).validate().unwrap_err();
            assert!(
                matches!(err, ChannonError::InvalidInput { ref field, .. } if field == "name"),
                "{name:?} should be rejected, got {err:?}"
            );
        }

        let too_long = "x".repeat(256);
        assert!(Plan::new(too_long).validate().is_err());
        assert!(Plan::new("x".repeat(255)).validate().is_ok());
    }

    #[test]
    fn test_plan_validate_checks_notification_targets() {
        let plan = Plan::new("ok").with_notification("../escape", "#!/bin/sh\n");
        assert!(plan.validate().is_err());

        let plan = Plan::new("ok")
            .with_notification("mail", "#!/bin/sh\n")
            .with_notification("mail", "#!/bin/sh\n");
        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate notification target"));
    }

    #[test]
    fn test_has_any_tag_is_or_semantics() {
        let plan = create_test_plan().with_tag("nightly");

        assert!(plan.has_any_tag(&[Tag::from("nope"), Tag::from("nightly")]));
        assert!(!plan.has_any_tag(&[Tag::from("nope")]));
        assert!(!plan.has_any_tag(std::iter::empty::<&Tag>()));
    }

    #[test]
    fn test_run_status_only_moves_forward() {
        use RunStatus::*;

        assert!(Pending.can_advance_to(Executing));
        assert!(Pending.can_advance_to(Failure));
        assert!(Executing.can_advance_to(Success));
        assert!(!Executing.can_advance_to(Pending));
        assert!(!Success.can_advance_to(Failure));
        assert!(!Failure.can_advance_to(Success));
        assert!(!Failure.can_advance_to(Failure));
    }

    #[test]
    fn test_run_status_parse_and_names() {
        for status in [
            RunStatus::Pending,
            RunStatus::Executing,
            RunStatus::Success,
            RunStatus::Failure,
        ] {
            assert_eq!(status.as_str().parse::<RunStatus>(), Ok(status));
        }
        assert!("cancelled".parse::<RunStatus>().is_err());
        assert!(RunStatus::Failure.is_terminal());
        assert!(!RunStatus::Executing.is_terminal());
    }

    #[test]
    fn test_run_document_skips_layout_fields() {
        let mut run = Run::new("deploy", 4, "post", PathBuf::from("/plans/deploy/runs/4"));
        run.start = Timestamp::from_second(1_700_000_000).unwrap();
        run.duration = Some(SignedDuration::from_millis(1500));

        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["status"], "pending");
        assert_eq!(json["trigger"], "post");
        assert!(json.get("plan").is_none());
        assert!(json.get("path").is_none());

        let decoded: Run = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.duration, run.duration);
        assert_eq!(decoded.start, run.start);
        assert!(decoded.plan.is_empty());
    }

    #[test]
    fn test_run_paths_live_in_run_directory() {
        let run = Run::new("deploy", 0, "post", PathBuf::from("/plans/deploy/runs/0"));
        assert_eq!(run.trigger_path(), PathBuf::from("/plans/deploy/runs/0/trigger"));
        assert_eq!(run.document_path(), PathBuf::from("/plans/deploy/runs/0/run.json"));
    }
}
