//! CLI tests for pgtop: help text and batch output against a fake procfs tree.
use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn fake_host() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    fs::write(root.join("stat"), "cpu  10 0 10 80 0 0 0 0\n").unwrap();
    fs::write(root.join("loadavg"), "1.00 0.50 0.25 1/99 1234\n").unwrap();
    fs::write(
        root.join("meminfo"),
        "MemTotal: 4096 kB\nMemFree: 1024 kB\nSwapTotal: 0 kB\nSwapFree: 0 kB\n",
    )
    .unwrap();
    fs::write(root.join("uptime"), "100.0 200.0\n").unwrap();
    dir
}

fn rows_file(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("rows.json");
    fs::write(
        &path,
        r#"{
          "sessions": [
            {"pid": 501, "username": "alice", "state": "active", "query": "SELECT now()"},
            {"pid": 502, "username": "bob", "state": "idle", "query": "COMMIT"}
          ],
          "replication": [
            {"pid": 601, "application_name": "standby_a", "replay_lag": 100},
            {"pid": 602, "application_name": "standby_b", "replay_lag": 9000}
          ]
        }"#,
    )
    .unwrap();
    path
}

fn pgtop(host: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pgtop").expect("pgtop binary");
    cmd.env("PGTOP_PROCFS", host.path())
        .env("XDG_CONFIG_HOME", host.path().join("config"))
        .env_remove("PGTOP_LOG");
    cmd
}

#[test]
fn help_mentions_short_and_long_flags() {
    let host = fake_host();
    let out = pgtop(&host).arg("--help").output().expect("run pgtop --help");
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stderr);
    for flag in ["--rows", "--demo", "-d|--delay", "-o|--order", "-R|--replication", "-b|--batch"] {
        assert!(text.contains(flag), "help text missing {flag}\n{text}");
    }
}

#[test]
fn batch_prints_summary_and_rows() {
    let host = fake_host();
    let rows = rows_file(host.path());
    let out = pgtop(&host)
        .args(["-b", "-n", "1", "-r", "--rows"])
        .arg(&rows)
        .output()
        .expect("run pgtop");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("2 processes: 1 idle, 1 active"), "{text}");
    assert!(text.contains("    PID USERNAME    SIZE"), "{text}");
    assert!(text.contains("SELECT now()"), "{text}");
    assert!(text.contains("last pid:   1234"), "{text}");
}

#[test]
fn batch_user_filter_and_hidden_idle() {
    let host = fake_host();
    let rows = rows_file(host.path());
    let out = pgtop(&host)
        .args(["-b", "-n", "1", "-r", "-i", "--rows"])
        .arg(&rows)
        .output()
        .expect("run pgtop");
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("alice"));
    assert!(!text.contains("COMMIT"), "{text}");
}

#[test]
fn batch_replication_sorted_by_lag() {
    let host = fake_host();
    let rows = rows_file(host.path());
    let out = pgtop(&host)
        .args(["-b", "-n", "1", "-R", "-o", "rlag", "--rows"])
        .arg(&rows)
        .output()
        .expect("run pgtop");
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    let b = text.find("standby_b").expect("standby_b listed");
    let a = text.find("standby_a").expect("standby_a listed");
    assert!(b < a, "higher lag should come first\n{text}");
}

#[test]
fn missing_row_source_is_an_error() {
    let host = fake_host();
    let out = pgtop(&host).args(["-b", "-n", "1"]).output().expect("run pgtop");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("--rows FILE or --demo"));
}

#[test]
fn unreachable_host_source_is_an_error() {
    let host = fake_host();
    let rows = rows_file(host.path());
    let out = pgtop(&host)
        .env("PGTOP_PROCFS", host.path().join("nowhere"))
        .args(["-b", "-n", "1", "--rows"])
        .arg(&rows)
        .output()
        .expect("run pgtop");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("host counter source not available"));
}
