//! Account controller tests driving a fake task binary.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tasksync_core::exec::observer::InvocationObserver;
use tasksync_core::logging::init_test_logging;
use tasksync_core::{AccountConfig, AccountController, Error};
use tasksync_test_utils::{FakeTaskd, TestCa, write_script};

fn config_for(dir: &Path, script: std::path::PathBuf) -> AccountConfig {
    AccountConfig::new("Work", dir.to_path_buf(), script, dir.to_path_buf())
}

#[tokio::test(flavor = "multi_thread")]
async fn settings_query_filters_requested_keys() {
    init_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    let script = write_script(
        tmp.path(),
        "task",
        concat!(
            "if [ \"$3\" = show ]; then\n",
            "  echo \"taskd.server            example.org:1234\"\n",
            "  echo \"color                   off\"\n",
            "fi\n",
            "exit 0\n",
        ),
    );

    let controller = AccountController::new(config_for(tmp.path(), script)).await;
    let settings = controller.settings(&["taskd.server"]).await;

    assert_eq!(settings.len(), 1);
    assert_eq!(settings["taskd.server"], "example.org:1234");
}

#[tokio::test(flavor = "multi_thread")]
async fn incomplete_sync_configuration_stays_unconfigured() {
    init_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    // taskd.server is present but the certificate paths are not.
    let script = write_script(
        tmp.path(),
        "task",
        concat!(
            "if [ \"$3\" = show ]; then\n",
            "  echo \"taskd.server            example.org:1234\"\n",
            "fi\n",
            "exit 0\n",
        ),
    );

    let controller = AccountController::new(config_for(tmp.path(), script)).await;
    assert!(!controller.sync_configured());
}

#[tokio::test(flavor = "multi_thread")]
async fn unconfigured_sync_fails_fast() {
    init_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    let script = write_script(tmp.path(), "task", "exit 0\n");

    let controller = AccountController::new(config_for(tmp.path(), script)).await;
    assert!(!controller.sync_configured());

    let err = controller.sync().await.unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    assert!(err.to_string().contains("not configured"));
}

#[tokio::test(flavor = "multi_thread")]
async fn configured_sync_starts_listener_and_invokes_binary() {
    init_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    let ca = TestCa::generate();
    let server = FakeTaskd::start(&ca, vec![0x01]).await;
    let (ca_path, cert_path, key_path) = ca.write_client_files(tmp.path());

    let script = write_script(
        tmp.path(),
        "task",
        &format!(
            concat!(
                "if [ \"$3\" = show ]; then\n",
                "  echo \"taskd.server   {server}\"\n",
                "  echo \"taskd.ca       {ca}\"\n",
                "  echo \"taskd.certificate {cert}\"\n",
                "  echo \"taskd.key      {key}\"\n",
                "fi\n",
                "if [ \"$4\" = sync ]; then\n",
                "  case \"$3\" in\n",
                "    rc.taskd.socket=*) exit 0 ;;\n",
                "    *) exit 1 ;;\n",
                "  esac\n",
                "fi\n",
                "exit 0\n",
            ),
            server = server.server_setting(),
            ca = ca_path.display(),
            cert = cert_path.display(),
            key = key_path.display(),
        ),
    );

    let controller = AccountController::new(config_for(tmp.path(), script)).await;
    assert!(controller.sync_configured());

    // The sync invocation is handed the relay's socket address.
    controller.sync().await.expect("sync invocation");
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_invocation_surfaces_stderr() {
    init_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    let script = write_script(
        tmp.path(),
        "task",
        concat!(
            "if [ \"$3\" = add ]; then\n",
            "  echo \"The duration value 'yesterday' is not supported\" >&2\n",
            "  exit 2\n",
            "fi\n",
            "exit 0\n",
        ),
    );

    let controller = AccountController::new(config_for(tmp.path(), script)).await;
    let err = controller
        .add(&["broken task".to_string()])
        .await
        .unwrap_err();

    match err {
        Error::Process { message } => {
            assert_eq!(message, "The duration value 'yesterday' is not supported");
        }
        other => panic!("expected process error, got {other}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn export_parses_json_lines() {
    init_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    let script = write_script(
        tmp.path(),
        "task",
        concat!(
            "if [ \"$4\" = export ]; then\n",
            "  echo '{\"uuid\":\"a1\",\"description\":\"first\"}'\n",
            "  echo\n",
            "  echo '{\"uuid\":\"b2\",\"description\":\"second\"}'\n",
            "fi\n",
            "exit 0\n",
        ),
    );

    let controller = AccountController::new(config_for(tmp.path(), script)).await;
    let tasks = controller.export("status:pending").await;

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["uuid"], "a1");
    assert_eq!(tasks[1]["description"], "second");
}

#[tokio::test(flavor = "multi_thread")]
async fn reports_and_report_info() {
    init_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    let script = write_script(
        tmp.path(),
        "task",
        concat!(
            "if [ \"$3\" = reports ]; then\n",
            "  echo \"next    Most urgent tasks\"\n",
            "  echo \"all     All tasks\"\n",
            "fi\n",
            "if [ \"$3\" = show ] && [ \"$4\" = report.next ]; then\n",
            "  echo \"report.next.columns      id,description.count\"\n",
            "  echo \"report.next.sort         urgency-\"\n",
            "  echo \"report.next.filter       status:pending\"\n",
            "  echo \"report.next.description  Most urgent tasks\"\n",
            "fi\n",
            "if [ \"$3\" = show ] && [ \"$4\" = uda.priority.values ]; then\n",
            "  echo \"uda.priority.values      H,M,L,\"\n",
            "fi\n",
            "exit 0\n",
        ),
    );

    let controller = AccountController::new(config_for(tmp.path(), script)).await;

    let reports = controller.reports().await;
    assert_eq!(reports[0].0, "next");
    assert_eq!(reports[1].0, "all");

    let info = controller.report_info("next").await;
    assert_eq!(info.query, "status:pending");
    assert_eq!(info.description, "Most urgent tasks");
    assert_eq!(info.fields.len(), 2);
    assert_eq!(info.sort, vec![("urgency".to_string(), false)]);
    assert_eq!(info.priorities, vec!["H", "M", "L"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn observers_see_start_then_finish() {
    init_test_logging();

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<&'static str>>,
    }

    impl InvocationObserver for Recorder {
        fn on_start(&self) {
            self.events.lock().unwrap().push("start");
        }

        fn on_finish(&self) {
            self.events.lock().unwrap().push("finish");
        }
    }

    let tmp = tempfile::tempdir().unwrap();
    let script = write_script(tmp.path(), "task", "exit 0\n");
    let controller = AccountController::new(config_for(tmp.path(), script)).await;

    let recorder = Arc::new(Recorder::default());
    controller.add_observer(recorder.clone());

    controller.add(&["something".to_string()]).await.unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(events, vec!["start", "finish"]);
}
