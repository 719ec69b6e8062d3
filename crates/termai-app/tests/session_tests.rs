//! Session driver integration tests.
//!
//! Each test drives a full session against a scripted in-process backend,
//! a real dispatcher running `/bin/sh`, and a context store in a temp dir.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use termai_action::{Action, ActionStatus, Dispatcher, ScriptedPrompter};
use termai_app::{
    Backend, BackendDiagnoser, BackendError, PlanRequest, ProcessBackend, SessionDriver,
    SessionOutcome,
};
use termai_context::ContextStore;
use termai_core::config::TermaiConfig;
use termai_core::error::TermaiError;

// =============================================================================
// Helpers
// =============================================================================

/// Backend that replays canned plans and records the context it was given.
struct FakeBackend {
    plans: Mutex<Vec<Result<Vec<Action>, BackendError>>>,
    contexts: Mutex<Vec<String>>,
    diagnosis: String,
}

impl FakeBackend {
    fn new(plans: Vec<Result<Vec<Action>, BackendError>>) -> Self {
        Self {
            plans: Mutex::new(plans.into_iter().rev().collect()),
            contexts: Mutex::new(Vec::new()),
            diagnosis: "check the spelling".to_string(),
        }
    }

    fn contexts(&self) -> Vec<String> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn plan(&self, request: &PlanRequest<'_>) -> Result<Vec<Action>, BackendError> {
        self.contexts.lock().unwrap().push(request.context.to_string());
        self.plans
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn diagnose(&self, _failure: &str, _cwd: &Path) -> Result<String, BackendError> {
        Ok(self.diagnosis.clone())
    }

    async fn complete(&self, _partial: &str, _cwd: &Path) -> Result<Vec<String>, BackendError> {
        Ok(Vec::new())
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    work: PathBuf,
    store: ContextStore,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    std::fs::create_dir(&work).unwrap();
    let store = ContextStore::new(dir.path().join("context"));
    Fixture {
        _dir: dir,
        work,
        store,
    }
}

fn driver(fx: &Fixture, backend: Arc<FakeBackend>) -> SessionDriver {
    let mut config = TermaiConfig::default();
    config.executor.echo_output = false;
    config.actions.escalation_command = "false".to_string();
    let dispatcher = Dispatcher::from_config(
        &config,
        fx.work.clone(),
        Arc::new(ScriptedPrompter::default()),
    )
    .unwrap()
    .with_diagnoser(Arc::new(BackendDiagnoser::new(backend.clone(), fx.work.clone())));
    SessionDriver::new(backend, dispatcher, fx.store.clone(), fx.work.clone())
}

/// A backend script that plans `first` on its first call and `then` on
/// every later one.
#[cfg(unix)]
fn two_step_backend(dir: &Path, first: &str, then: &str) -> Arc<ProcessBackend> {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("backend.sh");
    let script = format!(
        "#!/bin/sh\nif [ -f \"$0.done\" ]; then\ncat <<'EOF'\n{}\nEOF\nelse\ntouch \"$0.done\"\ncat <<'EOF'\n{}\nEOF\nfi\n",
        then, first
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    Arc::new(ProcessBackend::new(path.to_string_lossy().into_owned(), Vec::new()))
}

#[cfg(unix)]
fn process_driver(fx: &Fixture, backend: Arc<ProcessBackend>) -> SessionDriver {
    let mut config = TermaiConfig::default();
    config.executor.echo_output = false;
    config.actions.escalation_command = "false".to_string();
    config.actions.diagnose_failures = false;
    let dispatcher = Dispatcher::from_config(
        &config,
        fx.work.clone(),
        Arc::new(ScriptedPrompter::default()),
    )
    .unwrap();
    SessionDriver::new(backend, dispatcher, fx.store.clone(), fx.work.clone())
}

fn command(line: &str) -> Action {
    Action::Command {
        command: line.to_string(),
        auto_execute: true,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_empty_plan_reports_no_actions() {
    let fx = fixture();
    let backend = Arc::new(FakeBackend::new(vec![Ok(Vec::new())]));

    let outcome = driver(&fx, backend).run("do nothing").await.unwrap();

    assert!(matches!(outcome, SessionOutcome::NoActions));
    assert!(!fx.store.last_output_path().exists());
}

#[tokio::test]
async fn test_backend_failure_is_fatal_and_persists_nothing() {
    let fx = fixture();
    let backend = Arc::new(FakeBackend::new(vec![Err(BackendError::Failed {
        status: 1,
        stderr: "GOOGLE_API_KEY not set".to_string(),
    })]));

    let err = driver(&fx, backend).run("anything").await.unwrap_err();

    assert!(matches!(err, TermaiError::Backend(ref m) if m.contains("GOOGLE_API_KEY")));
    assert_eq!(fx.store.load().unwrap(), "");
}

#[tokio::test]
async fn test_empty_and_malformed_responses_are_fatal() {
    let fx = fixture();
    let backend = Arc::new(FakeBackend::new(vec![
        Err(BackendError::Empty),
        Err(BackendError::Malformed("expected value at line 1".to_string())),
    ]));
    let driver = driver(&fx, backend);

    assert!(matches!(
        driver.run("first").await.unwrap_err(),
        TermaiError::EmptyResponse
    ));
    assert!(matches!(
        driver.run("second").await.unwrap_err(),
        TermaiError::MalformedResponse(_)
    ));
}

#[tokio::test]
async fn test_action_failures_do_not_fail_the_session() {
    let fx = fixture();
    let backend = Arc::new(FakeBackend::new(vec![Ok(vec![
        command("echo killed; exit 137"),
        command("echo survivor > after.txt"),
    ])]));

    let outcome = driver(&fx, backend).run("try things").await.unwrap();

    let SessionOutcome::Completed(report) = outcome else {
        panic!("expected a completed session");
    };
    assert_eq!(
        report.statuses,
        vec![ActionStatus::Failed, ActionStatus::Succeeded]
    );
    assert_eq!(
        std::fs::read_to_string(fx.work.join("after.txt")).unwrap(),
        "survivor\n"
    );
    let persisted = fx.store.load().unwrap();
    assert!(persisted.contains("EXIT CODE: 137"));
    assert!(persisted.contains("killed"));
}

#[tokio::test]
async fn test_outcome_log_chains_into_next_session() {
    let fx = fixture();
    let backend = Arc::new(FakeBackend::new(vec![
        Ok(vec![command("echo first-run-marker")]),
        Ok(vec![Action::Text {
            content: "done".to_string(),
        }]),
    ]));
    let driver = driver(&fx, backend.clone());

    let SessionOutcome::Completed(first) = driver.run("one").await.unwrap() else {
        panic!("expected a completed session");
    };
    assert_eq!(fx.store.load().unwrap(), first.log.render());

    driver.run("two").await.unwrap();

    let contexts = backend.contexts();
    assert_eq!(contexts.len(), 2);
    assert!(!contexts[0].contains("first-run-marker"));
    assert!(contexts[1].contains("first-run-marker"));
    assert!(contexts[1].contains(&format!("cwd: {}", fx.work.display())));
    assert_eq!(fx.store.load().unwrap(), "AI: done");
}

#[tokio::test]
async fn test_deep_context_holds_environment_and_log() {
    let fx = fixture();
    std::fs::write(fx.work.join("Cargo.toml"), "[package]").unwrap();
    let backend = Arc::new(FakeBackend::new(vec![Ok(vec![Action::Text {
        content: "hello".to_string(),
    }])]));

    driver(&fx, backend).run("hi").await.unwrap();

    let deep = fx.store.load_deep().unwrap();
    assert!(deep.contains("project_type: rust"));
    assert!(deep.ends_with("AI: hello"));
}

#[tokio::test]
async fn test_unknown_and_known_actions_mixed() {
    let fx = fixture();
    let backend = Arc::new(FakeBackend::new(vec![Ok(vec![
        Action::Unknown {
            kind: "browse".to_string(),
        },
        Action::WriteFile {
            path: "notes/todo.txt".to_string(),
            content: r"one\ntwo".to_string(),
        },
    ])]));

    let SessionOutcome::Completed(report) = driver(&fx, backend).run("note").await.unwrap() else {
        panic!("expected a completed session");
    };
    assert_eq!(
        report.statuses,
        vec![ActionStatus::Skipped, ActionStatus::Succeeded]
    );
    assert_eq!(
        std::fs::read_to_string(fx.work.join("notes/todo.txt")).unwrap(),
        "one\ntwo"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_large_output_does_not_break_next_session() {
    let fx = fixture();
    let backend = two_step_backend(
        &fx.work,
        r#"[{"type": "command", "command": "yes a | head -c 200000"}]"#,
        r#"[{"type": "text", "content": "second"}]"#,
    );
    let driver = process_driver(&fx, backend);

    let SessionOutcome::Completed(first) = driver.run("flood").await.unwrap() else {
        panic!("expected a completed session");
    };
    assert_eq!(first.statuses, vec![ActionStatus::Succeeded]);
    assert!(fx.store.load().unwrap().len() < 128 * 1024);

    for query in ["again", "and again"] {
        let outcome = driver.run(query).await.unwrap();
        assert!(matches!(outcome, SessionOutcome::Completed(_)));
    }
    assert_eq!(fx.store.load().unwrap(), "AI: second");
}

#[cfg(unix)]
#[tokio::test]
async fn test_nul_output_does_not_break_next_session() {
    let fx = fixture();
    let backend = two_step_backend(
        &fx.work,
        r#"[{"type": "command", "command": "printf 'x\\000y'"}]"#,
        r#"[{"type": "text", "content": "second"}]"#,
    );
    let driver = process_driver(&fx, backend);

    driver.run("binary").await.unwrap();
    let persisted = fx.store.load().unwrap();
    assert!(!persisted.contains('\0'));
    assert!(persisted.contains("xy"));

    assert!(matches!(
        driver.run("next").await.unwrap(),
        SessionOutcome::Completed(_)
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_oversized_log_on_disk_is_bounded_before_planning() {
    let fx = fixture();
    std::fs::create_dir_all(fx.store.dir()).unwrap();
    std::fs::write(fx.store.last_output_path(), "z".repeat(300_000)).unwrap();
    let backend = two_step_backend(
        &fx.work,
        r#"[{"type": "text", "content": "recovered"}]"#,
        r#"[]"#,
    );

    let outcome = process_driver(&fx, backend).run("hello").await.unwrap();

    assert!(matches!(outcome, SessionOutcome::Completed(_)));
    assert_eq!(fx.store.load().unwrap(), "AI: recovered");
}
