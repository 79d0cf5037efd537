use assert_cmd::cargo::cargo_bin_cmd;

fn fixture(path: &str) -> String {
    format!("{}/tests/fixtures/{path}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn recorder_help_lists_list_and_alias() {
    let mut cmd = cargo_bin_cmd!("recorderctl");
    cmd.args(["recorder", "--help"]);
    let out = cmd.assert().success();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).expect("utf8");

    assert!(stdout.contains("list"));
    assert!(stdout.contains("ls"));
    assert!(!stdout.contains("delete"));
}

#[test]
fn list_help_mentions_output_flag() {
    let mut cmd = cargo_bin_cmd!("recorderctl");
    cmd.args(["recorder", "ls", "--help"]);
    let out = cmd.assert().success();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).expect("utf8");
    assert!(stdout.contains("--output"));
}

#[test]
fn unreachable_daemon_exits_nonzero_without_table() {
    let mut cmd = cargo_bin_cmd!("recorderctl");
    cmd.args(["recorder", "list", "--config"])
        .arg(fixture("configs/minimal.toml"))
        .env_remove("RECORDERCTL_HOST");
    let out = cmd.assert().failure();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).expect("utf8");
    let stderr = String::from_utf8(out.get_output().stderr.clone()).expect("utf8");
    assert!(stdout.is_empty());
    assert!(stderr.contains("cannot get recorder list"));
}

#[test]
fn unix_socket_host_exits_nonzero() {
    let mut cmd = cargo_bin_cmd!("recorderctl");
    cmd.args(["recorder", "list", "--config"])
        .arg(fixture("configs/unix-host.toml"))
        .env_remove("RECORDERCTL_HOST");
    let out = cmd.assert().failure();
    let stderr = String::from_utf8(out.get_output().stderr.clone()).expect("utf8");
    assert!(stderr.contains("invalid config"));
}

#[test]
fn missing_config_path_exits_nonzero() {
    let mut cmd = cargo_bin_cmd!("recorderctl");
    cmd.args(["recorder", "list", "--config"])
        .arg(fixture("configs/missing.toml"));
    cmd.assert().failure();
}
