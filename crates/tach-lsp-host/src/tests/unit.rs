//! Unit tests for the session supervisor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;
use lsp_types::TraceValue;
use rstest::{fixture, rstest};
use tach_lsp_config::LogLevel;

use crate::client::SessionState;
use crate::settings::SettingsScope;
use crate::tests::support::{Severity, SupervisorWorld};

#[fixture]
fn world() -> SupervisorWorld {
    SupervisorWorld::new()
}

#[fixture]
fn running() -> SupervisorWorld {
    let mut world = SupervisorWorld::new();
    world.restart().expect("first restart succeeds");
    world
}

#[rstest]
fn restart_starts_session_and_watches_project_root(mut world: SupervisorWorld) {
    let id = world.restart().expect("session starts");

    assert_eq!(id.to_string(), "session-1");
    assert_eq!(world.supervisor.session_state(), Some(SessionState::Running));
    assert_eq!(world.supervisor.disposable_count(), 2);
    assert_eq!(world.supervisor.active_watch_generation(), Some(1));
    assert_eq!(world.watches.active_count(), 1);
    assert_eq!(world.watches.root(0), Some(Utf8PathBuf::from("/workspace")));
    assert!(world.sink.contains(Severity::Info, "Server: Start requested."));
    assert!(
        world
            .sink
            .contains(Severity::Info, "Server run command: /usr/bin/python3 -m tach server")
    );
    assert!(world.sink.messages(Severity::Error).is_empty());
}

#[rstest]
fn restart_replaces_previous_session(mut running: SupervisorWorld) {
    let id = running.restart().expect("second restart succeeds");

    let records = running.clients.records();
    assert_eq!(id.to_string(), "session-2");
    assert_eq!(records.len(), 2);
    let first = records.first().expect("first client");
    assert_eq!(first.stops, 1);
    assert_eq!(first.state(), SessionState::Stopped);
    assert_eq!(first.observer_count(), 0);
    assert_eq!(running.watches.registered(), 2);
    assert_eq!(running.watches.active_count(), 1);
    assert_eq!(running.supervisor.disposable_count(), 2);
    assert_eq!(running.supervisor.active_watch_generation(), Some(2));
    assert!(running.sink.contains(Severity::Info, "Server: Stop requested"));
}

#[rstest]
fn state_transitions_are_traced_verbosely(mut running: SupervisorWorld) {
    running.restart();

    assert_eq!(
        running.sink.messages(Severity::Verbose),
        vec![
            "Server State: Starting",
            "Server State: Running",
            "Server State: Stopped",
            "Server State: Starting",
            "Server State: Running",
        ]
    );
}

#[rstest]
fn failed_start_leaves_nothing_behind(mut world: SupervisorWorld) {
    world.clients.fail_start(true);

    assert!(world.restart().is_none());
    assert!(world.supervisor.session().is_none());
    assert_eq!(world.supervisor.disposable_count(), 0);
    assert_eq!(world.supervisor.active_watch_generation(), None);
    assert_eq!(world.watches.registered(), 0);
    assert!(
        world
            .sink
            .contains(Severity::Error, "Server: Start failed: ")
    );
}

#[rstest]
fn failed_start_after_running_session_stops_the_old_one(mut running: SupervisorWorld) {
    running.clients.fail_start(true);

    assert!(running.restart().is_none());
    let first = running.clients.records().into_iter().next().expect("first client");
    assert_eq!(first.stops, 1);
    assert_eq!(running.watches.active_count(), 0);
    assert_eq!(running.supervisor.disposable_count(), 0);
}

#[rstest]
#[case(SettingsScope::Workspace, "workspace settings")]
#[case(SettingsScope::Extension, "extension settings")]
#[case(SettingsScope::Global, "global settings")]
fn settings_failure_aborts_start(
    mut world: SupervisorWorld,
    #[case] scope: SettingsScope,
    #[case] needle: &str,
) {
    world.settings.fail(Some(scope));

    assert!(world.restart().is_none());
    assert_eq!(world.clients.created(), 0);
    assert!(world.sink.contains(Severity::Error, needle));
}

#[rstest]
fn every_start_reads_settings_afresh(mut running: SupervisorWorld) {
    running.settings.update(|settings| {
        settings.interpreter = vec![String::from("/opt/python/bin/python")];
    });

    running.restart().expect("restart succeeds");

    let records = running.clients.records();
    let latest = records.last().expect("latest client");
    assert_eq!(latest.plan.spec.command, "/opt/python/bin/python");
    assert_eq!(running.settings.reads(), 6);
}

#[rstest]
fn custom_configuration_reaches_the_launch_plan(mut world: SupervisorWorld) {
    world.settings.update(|settings| {
        settings.configuration = Some(Utf8PathBuf::from("/workspace/conf/tach.toml"));
    });

    world.restart().expect("session starts");

    let records = world.clients.records();
    let plan = &records.first().expect("client").plan;
    assert_eq!(
        plan.spec.args,
        vec!["-m", "tach", "server", "-c", "/workspace/conf/tach.toml"]
    );
}

#[rstest]
fn configuration_change_restarts_session(mut running: SupervisorWorld) {
    assert!(running.watches.fire_latest("/workspace/tach.toml"));

    assert_eq!(running.process_triggers(), 1);
    assert_eq!(running.clients.created(), 2);
    assert!(
        running
            .sink
            .contains(Severity::Info, "Configuration changed: /workspace/tach.toml")
    );
}

#[rstest]
#[case("/workspace/src/app.py")]
#[case("/workspace/setup.cfg")]
fn unrelated_files_do_not_restart(mut running: SupervisorWorld, #[case] path: &str) {
    assert!(!running.watches.fire_latest(path));

    assert_eq!(running.process_triggers(), 0);
    assert_eq!(running.clients.created(), 1);
}

#[rstest]
fn trigger_from_replaced_watcher_is_ignored(mut running: SupervisorWorld) {
    assert!(running.watches.fire(0, "/workspace/pyproject.toml"));
    running.restart().expect("manual restart succeeds");

    assert_eq!(running.process_triggers(), 0);
    assert_eq!(running.clients.created(), 2);
}

#[rstest]
fn disposed_watcher_reports_nothing(mut running: SupervisorWorld) {
    running.restart().expect("manual restart succeeds");

    assert!(!running.watches.fire(0, "/workspace/tach.toml"));
}

#[rstest]
#[case(LogLevel::Info, LogLevel::Info, TraceValue::Messages)]
#[case(LogLevel::Info, LogLevel::Trace, TraceValue::Verbose)]
#[case(LogLevel::Trace, LogLevel::Error, TraceValue::Verbose)]
#[case(LogLevel::Debug, LogLevel::Info, TraceValue::Verbose)]
#[case(LogLevel::Off, LogLevel::Trace, TraceValue::Off)]
fn negotiated_trace_level_is_applied(
    #[case] output: LogLevel,
    #[case] global: LogLevel,
    #[case] expected: TraceValue,
) {
    let mut world = SupervisorWorld::with_levels(output, global);

    world.restart().expect("session starts");

    let records = world.clients.records();
    assert_eq!(records.first().expect("client").traces, vec![expected]);
}

#[rstest]
fn trace_level_failure_keeps_session(mut world: SupervisorWorld) {
    world.clients.fail_set_trace(true);

    assert!(world.restart().is_some());
    assert_eq!(world.supervisor.session_state(), Some(SessionState::Running));
    assert!(
        world
            .sink
            .contains(Severity::Error, "Failed to set trace level")
    );
}

#[rstest]
fn watch_failure_keeps_session_without_watcher(mut world: SupervisorWorld) {
    world.watches.fail(true);

    assert!(world.restart().is_some());
    assert_eq!(world.supervisor.active_watch_generation(), None);
    assert_eq!(world.supervisor.disposable_count(), 1);
    assert!(
        world
            .sink
            .contains(Severity::Error, "Failed to watch configuration files")
    );
}

#[rstest]
fn server_crash_is_observed_but_not_restarted(running: SupervisorWorld) {
    running.clients.crash(0);

    assert_eq!(running.supervisor.session_state(), Some(SessionState::Stopped));
    assert_eq!(running.clients.created(), 1);
    assert_eq!(
        running.sink.messages(Severity::Verbose).last().map(String::as_str),
        Some("Server State: Stopped")
    );
}

#[rstest]
fn shutdown_stops_session_and_disposes_everything(mut running: SupervisorWorld) {
    running.supervisor.shutdown();
    running.supervisor.shutdown();

    let first = running.clients.records().into_iter().next().expect("client");
    assert_eq!(first.stops, 1);
    assert!(running.supervisor.session().is_none());
    assert_eq!(running.supervisor.disposable_count(), 0);
    assert_eq!(running.watches.active_count(), 0);
}

#[rstest]
fn dropping_supervisor_stops_session(running: SupervisorWorld) {
    let clients = running.clients.clone();
    let watches = running.watches.clone();

    drop(running);

    let first = clients.records().into_iter().next().expect("client");
    assert_eq!(first.stops, 1);
    assert_eq!(watches.active_count(), 0);
}

#[rstest]
fn run_until_returns_once_flag_is_set(mut running: SupervisorWorld) {
    let shutdown = AtomicBool::new(true);

    running
        .supervisor
        .run_until(&shutdown, Duration::from_millis(10));

    assert_eq!(running.clients.created(), 1);
}

#[rstest]
fn run_until_handles_queued_triggers(mut running: SupervisorWorld) {
    assert!(running.watches.fire_latest("/workspace/requirements.txt"));
    let shutdown = Arc::new(AtomicBool::new(false));
    let setter = Arc::clone(&shutdown);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        setter.store(true, Ordering::SeqCst);
    });

    running
        .supervisor
        .run_until(&shutdown, Duration::from_millis(10));
    handle.join().expect("flag setter joins");

    assert_eq!(running.clients.created(), 2);
}
