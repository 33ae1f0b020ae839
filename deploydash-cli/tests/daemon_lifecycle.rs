use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use deploydash_core::{settings, Project};
use tempfile::TempDir;

fn deploydash_bin() -> PathBuf {
    PathBuf::from(assert_cmd::cargo::cargo_bin!("deploydash"))
}

fn command(binary: &Path, home: &Path) -> Command {
    let mut cmd = Command::new(binary);
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("DEPLOYDASH_DB")
        .env_remove("GITHUB_TOKEN");
    cmd
}

struct DaemonProcess {
    child: Child,
    binary: PathBuf,
    home: PathBuf,
}

impl DaemonProcess {
    fn start(binary: PathBuf, home: PathBuf) -> Self {
        let child = command(&binary, &home)
            .args(["daemon", "start"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn daemon");

        Self {
            child,
            binary,
            home,
        }
    }

    fn stop(&mut self) {
        let _ = command(&self.binary, &self.home)
            .args(["daemon", "stop"])
            .status();

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            sleep(Duration::from_millis(50));
        }

        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    fn exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }
}

impl Drop for DaemonProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

fn daemon_status(binary: &Path, home: &Path) -> Option<serde_json::Value> {
    let output = command(binary, home).args(["daemon", "status"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    serde_json::from_slice(&output.stdout).ok()
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(100));
    }
    false
}

#[test]
fn daemon_reports_status_runs_a_pass_and_stops() {
    let home = TempDir::new().expect("home");
    settings::save_at(
        home.path(),
        &settings::Settings {
            sync_interval_secs: 3600,
            ..settings::Settings::default()
        },
    )
    .expect("save settings");

    let binary = deploydash_bin();
    let mut daemon = DaemonProcess::start(binary.clone(), home.path().to_path_buf());

    let mut status = None;
    assert!(
        wait_until(Duration::from_secs(10), || {
            status = daemon_status(&binary, home.path());
            status
                .as_ref()
                .and_then(|s| s["running"].as_bool())
                .unwrap_or(false)
        }),
        "daemon did not report running state in time",
    );
    let status = status.expect("status");
    assert_eq!(status["interval_secs"], 3600);

    // The startup pass has nothing to sync but is still recorded.
    assert!(
        wait_until(Duration::from_secs(10), || {
            daemon_status(&binary, home.path())
                .map(|s| !s["last_pass"].is_null())
                .unwrap_or(false)
        }),
        "startup pass was not recorded",
    );

    let output = command(&binary, home.path())
        .args(["daemon", "sync"])
        .output()
        .expect("daemon sync");
    assert!(
        output.status.success(),
        "daemon sync failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("0/0 repositories synced"));

    // The CLI keeps working against the store while the daemon holds it open.
    let project = command(&binary, home.path())
        .args(["project", "add", "Ops"])
        .output()
        .expect("project add");
    assert!(project.status.success());
    let projects: Vec<Project> = serde_json::from_slice(
        &command(&binary, home.path())
            .args(["project", "list", "--json"])
            .output()
            .expect("project list")
            .stdout,
    )
    .expect("projects JSON");
    assert_eq!(projects.len(), 1);

    daemon.stop();
    assert!(daemon.exited(), "daemon process should exit after stop");
    assert!(!home.path().join(".deploydash/daemon.sock").exists());
    let after = daemon_status(&binary, home.path()).expect("status after stop");
    assert_eq!(after["running"], false);
}
