//! systemd driver behavior against a scripted systemctl

use super::helpers::{Reply, ScriptedRunner, TestEnvironment};
use rustle_service::service_managers::{
    from_name, from_raw_template, ServiceError, ServiceManager, SystemdService,
};
use rustle_service::types::{RestartPolicy, ServiceDescriptor, NO_PID};
use rustle_service::Engine;
use std::path::PathBuf;

const UNIT: &str = "[Unit]\nDescription=Adopted\n\n[Service]\nExecStart=/opt/adopted --flag\n";

fn demo() -> ServiceDescriptor {
    ServiceDescriptor::new("demo", "/usr/local/bin/demo")
        .with_description("Demo service")
        .with_args(["--port", "8080"])
        .with_restart(RestartPolicy::OnFailure)
        .with_run_at_load(true)
}

#[tokio::test]
async fn test_install_writes_unit_under_user_home() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    let service = SystemdService::new(demo(), env.user_deps(runner.clone()));

    service.install().await.unwrap();

    let path = env.systemd_unit("demo");
    assert_eq!(service.file_path().unwrap(), path);
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("ExecStart=/usr/local/bin/demo --port 8080"));
    assert!(content.contains("Restart=on-failure"));
    assert!(runner.calls().is_empty(), "install must not touch systemctl");
}

#[tokio::test]
async fn test_install_rejects_invalid_descriptor() {
    let env = TestEnvironment::new();
    let descriptor = demo().with_env("MOTD", "line one\nline two");
    let service = SystemdService::new(descriptor, env.user_deps(ScriptedRunner::new()));

    let err = service.install().await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidDescriptor { .. }));
    assert!(!env.systemd_unit("demo").exists());
}

#[tokio::test]
async fn test_start_sequence_as_user() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    let service = SystemdService::new(demo(), env.user_deps(runner.clone()));

    service.start().await.unwrap();

    assert_eq!(
        runner.calls(),
        vec![
            "systemctl --user daemon-reload",
            "systemctl --user enable demo",
            "systemctl --user start demo",
        ]
    );
}

#[tokio::test]
async fn test_root_scope_has_no_user_flag() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    let service = SystemdService::new(demo(), env.root_deps(runner.clone()));

    assert_eq!(
        service.file_path().unwrap(),
        PathBuf::from("/etc/systemd/system/demo.service")
    );
    service.stop().await.unwrap();

    assert_eq!(
        runner.calls(),
        vec![
            "systemctl daemon-reload",
            "systemctl stop demo",
            "systemctl disable demo",
            "systemctl daemon-reload",
            "systemctl reset-failed",
        ]
    );
}

#[tokio::test]
async fn test_start_never_installed_is_does_not_exist() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply(
        "--user enable demo",
        Reply::fail(1, "Failed to enable unit: Unit file demo.service does not exist."),
    );
    let service = SystemdService::new(demo(), env.user_deps(runner.clone()));

    let err = service.start().await.unwrap_err();
    assert!(err.is_does_not_exist());
    assert!(!runner.calls().contains(&"systemctl --user start demo".to_string()));
}

#[tokio::test]
async fn test_start_unit_not_found() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply(
        "--user start demo",
        Reply::fail(5, "Failed to start demo.service: Unit demo.service not found."),
    );
    let service = SystemdService::new(demo(), env.user_deps(runner));

    assert!(service.start().await.unwrap_err().is_does_not_exist());
}

#[tokio::test]
async fn test_unmatched_failure_is_passed_through() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply(
        "--user start demo",
        Reply::fail(1, "Job for demo.service failed because the control process exited."),
    );
    let service = SystemdService::new(demo(), env.user_deps(runner));

    match service.start().await.unwrap_err() {
        ServiceError::CommandFailed {
            program,
            args,
            exit_code,
            output,
        } => {
            assert_eq!(program, "systemctl");
            assert_eq!(args, vec!["--user", "start", "demo"]);
            assert_eq!(exit_code, Some(1));
            assert!(output.contains("control process exited"));
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_daemon_reload_failure_is_fatal() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply("--user daemon-reload", Reply::fail(1, "Failed to connect to bus"));
    let service = SystemdService::new(demo(), env.user_deps(runner.clone()));

    assert!(matches!(
        service.start().await,
        Err(ServiceError::CommandFailed { .. })
    ));
    assert_eq!(runner.calls().len(), 1);
}

#[tokio::test]
async fn test_stop_not_loaded_is_does_not_exist() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply(
        "--user stop demo",
        Reply::fail(5, "Failed to stop demo.service: Unit demo.service not loaded."),
    );
    let service = SystemdService::new(demo(), env.user_deps(runner));

    assert!(service.stop().await.unwrap_err().is_does_not_exist());
}

#[tokio::test]
async fn test_disable_removed_output_counts_as_stopped() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply(
        "--user disable demo",
        Reply::fail(1, "Removed /home/u/.config/systemd/user/default.target.wants/demo.service."),
    );
    let service = SystemdService::new(demo(), env.user_deps(runner.clone()));

    service.stop().await.unwrap();
    let calls = runner.calls();
    assert_eq!(calls.last().unwrap(), "systemctl --user disable demo");
    assert!(!calls.iter().any(|c| c.contains("reset-failed")));
}

#[tokio::test]
async fn test_disable_missing_unit_is_does_not_exist() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply(
        "--user disable demo",
        Reply::fail(1, "Failed to disable unit: Unit file demo.service does not exist."),
    );
    let service = SystemdService::new(demo(), env.user_deps(runner));

    assert!(service.stop().await.unwrap_err().is_does_not_exist());
}

#[tokio::test]
async fn test_uninstall_tolerates_missing_service() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply(
        "--user stop demo",
        Reply::fail(5, "Failed to stop demo.service: Unit demo.service not loaded."),
    );
    let service = SystemdService::new(demo(), env.user_deps(runner));

    service.uninstall().await.unwrap();
    service.uninstall().await.unwrap();
}

#[tokio::test]
async fn test_uninstall_removes_unit_file() {
    let env = TestEnvironment::new();
    let service = SystemdService::new(demo(), env.user_deps(ScriptedRunner::new()));

    service.install().await.unwrap();
    assert!(env.systemd_unit("demo").exists());
    service.uninstall().await.unwrap();
    assert!(!env.systemd_unit("demo").exists());
}

#[tokio::test]
async fn test_uninstall_propagates_other_stop_failures() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply("--user stop demo", Reply::fail(1, "Access denied"));
    let service = SystemdService::new(demo(), env.user_deps(runner));

    service.install().await.unwrap();
    assert!(service.uninstall().await.is_err());
    assert!(env.systemd_unit("demo").exists());
}

#[tokio::test]
async fn test_info_missing_unit() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply(
        "--user status demo",
        Reply::fail(4, "Unit demo.service could not be found."),
    );
    let service = SystemdService::new(demo(), env.user_deps(runner));

    let info = service.info().await;
    assert!(info.error.as_ref().unwrap().is_does_not_exist());
    assert!(!info.is_running);
    assert_eq!(info.pid, NO_PID);
    assert_eq!(info.file_path, env.systemd_unit("demo"));
    assert!(info.file_content.is_empty());
    assert_eq!(info.service, demo());
}

#[tokio::test]
async fn test_info_running_unit() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply(
        "--user status demo",
        Reply::Ok(
            "● demo.service - Demo service\n   Active: active (running) since now\n Main PID: 31337 (demo)\n"
                .to_string(),
        ),
    );
    let service = SystemdService::new(demo(), env.user_deps(runner));
    service.install().await.unwrap();

    let info = service.info().await;
    assert!(info.error.is_none(), "unexpected error {:?}", info.error);
    assert!(info.is_running);
    assert_eq!(info.pid, 31337);
    assert!(info.file_content.contains("ExecStart="));
}

#[tokio::test]
async fn test_info_inactive_exit_code_is_not_an_error() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply(
        "--user status demo",
        Reply::fail(3, "○ demo.service\n   Active: inactive (dead)\n"),
    );
    let service = SystemdService::new(demo(), env.user_deps(runner));
    service.install().await.unwrap();

    let info = service.info().await;
    assert!(info.error.is_none());
    assert!(!info.is_running);
    assert_eq!(info.pid, NO_PID);
}

#[tokio::test]
async fn test_info_unrecognized_failure_is_recorded() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply("--user status demo", Reply::fail(1, "Failed to connect to bus"));
    let service = SystemdService::new(demo(), env.user_deps(runner));
    service.install().await.unwrap();

    let info = service.info().await;
    assert!(matches!(info.error, Some(ServiceError::CommandFailed { .. })));
    assert_eq!(info.pid, NO_PID);
}

#[tokio::test]
async fn test_info_spawn_failure_is_recorded() {
    let env = TestEnvironment::new();
    let runner = ScriptedRunner::new();
    runner.reply("--user status demo", Reply::SpawnError);
    let service = SystemdService::new(demo(), env.user_deps(runner));

    let info = service.info().await;
    assert!(matches!(info.error, Some(ServiceError::Io(_))));
    assert!(!info.is_running);
}

#[tokio::test]
async fn test_from_name_missing_unit() {
    let env = TestEnvironment::new();
    let result = from_name(Engine::Systemd, "ghost", &env.user_deps(ScriptedRunner::new())).await;
    assert!(result.err().unwrap().is_does_not_exist());
}

#[tokio::test]
async fn test_from_name_adopts_and_reinstalls_verbatim() {
    let env = TestEnvironment::new();
    let path = env.systemd_unit("adopted");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, UNIT).unwrap();

    let deps = env.user_deps(ScriptedRunner::new());
    let service = from_name(Engine::Systemd, "adopted", &deps).await.unwrap();
    assert_eq!(service.engine(), Engine::Systemd);
    assert_eq!(service.descriptor().name, "adopted");
    assert_eq!(service.descriptor().description, "Adopted");
    assert_eq!(service.descriptor().executable, "/opt/adopted");
    assert_eq!(service.render().unwrap(), UNIT);

    std::fs::remove_file(&path).unwrap();
    service.install().await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), UNIT);
}

#[tokio::test]
async fn test_raw_template_rejects_path_names() {
    let env = TestEnvironment::new();
    let deps = env.user_deps(ScriptedRunner::new());
    for name in ["", "../escape", "a b", ".."] {
        let result = from_raw_template(Engine::Systemd, name, UNIT, &deps);
        assert!(
            matches!(result, Err(ServiceError::InvalidDescriptor { .. })),
            "name {name:?} was accepted"
        );
    }
}
