//! Process table queries against the live host.
//!
//! These tests spawn short-lived `sleep` children so lookup and termination
//! can be exercised on a process we own.

use procscan::{find_process, kill, list_processes, process_exists, PsError};
use std::thread;
use std::time::{Duration, Instant};

/// A pid no supported OS hands out in practice.
const UNUSED_PID: u32 = 0x7FFF_FFF0;

/// Poll `condition` until it holds or `timeout` elapses.
fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    condition()
}

#[test]
fn list_contains_own_process() {
    let pid = std::process::id();

    for full_info in [false, true] {
        let processes = list_processes(full_info).unwrap();
        assert!(!processes.is_empty());
        assert!(
            processes.iter().any(|p| p.pid() == pid),
            "own pid {pid} missing (full_info={full_info})"
        );
    }
}

#[test]
fn find_own_process() {
    let pid = std::process::id();
    let process = find_process(pid, true).unwrap().expect("own process is running");

    assert_eq!(process.pid(), pid);
    assert!(!process.executable().is_empty());
    if let Some(owner) = process.owner() {
        assert!(!owner.is_empty());
    }
}

#[test]
#[cfg(target_os = "linux")]
fn own_architecture_matches_build_target() {
    let pid = std::process::id();
    let process = find_process(pid, false).unwrap().unwrap();
    assert_eq!(process.architecture(), procscan::Architecture::native());
}

#[test]
fn find_unused_pid_is_none_not_error() {
    assert!(find_process(UNUSED_PID, false).unwrap().is_none());
    assert!(find_process(UNUSED_PID, true).unwrap().is_none());
}

#[test]
fn listed_processes_can_be_found_again() {
    let processes = list_processes(true).unwrap();
    let mut found = 0;

    for listed in &processes {
        // Processes may exit between the two calls; only check the survivors
        if let Some(process) = find_process(listed.pid(), true).unwrap() {
            assert_eq!(process.pid(), listed.pid());
            found += 1;
        }
    }

    assert!(found > 0);
    assert!(found * 2 >= processes.len(), "too many processes vanished: {found}/{}", processes.len());
}

#[test]
fn light_listing_skips_expensive_fields() {
    for process in list_processes(false).unwrap() {
        assert!(process.owner().is_none(), "pid {} resolved an owner", process.pid());
        assert!(process.cmd_line().is_empty(), "pid {} read its cmdline", process.pid());
    }

    // Timing is noisy; only catch gross inversions
    let started = Instant::now();
    list_processes(false).unwrap();
    let light = started.elapsed();

    let started = Instant::now();
    list_processes(true).unwrap();
    let full = started.elapsed();

    assert!(light <= full * 5 + Duration::from_millis(200), "light {light:?} vs full {full:?}");
}

#[test]
fn kill_unused_pid_fails_without_side_effects() {
    let before = list_processes(false).unwrap().len();

    let err = kill(UNUSED_PID).unwrap_err();
    assert!(err.is_termination_failure());
    assert!(matches!(err, PsError::ResolutionFailed { .. }));

    // Nothing of ours disappeared
    assert!(process_exists(std::process::id()).unwrap());
    assert!(before > 0);
}

#[test]
#[cfg(unix)]
fn child_is_visible_with_parent_and_args() {
    let mut child = std::process::Command::new("sleep")
        .arg("30")
        .spawn()
        .expect("spawn sleep");
    let child_pid = child.id();

    let process = find_process(child_pid, true).unwrap().expect("child is running");
    assert_eq!(process.pid(), child_pid);
    assert_eq!(process.ppid(), std::process::id());

    // spawn() returns once exec has started, before the new image's name and
    // argv are installed
    assert!(wait_until(Duration::from_secs(5), || {
        find_process(child_pid, true)
            .unwrap()
            .is_some_and(|p| p.executable().contains("sleep") && p.cmd_line().iter().any(|arg| arg == "30"))
    }));

    let listed = list_processes(false).unwrap();
    assert!(listed.iter().any(|p| p.pid() == child_pid));

    child.kill().ok();
    child.wait().ok();
}

#[test]
#[cfg(unix)]
fn kill_terminates_child() {
    let mut child = std::process::Command::new("sleep")
        .arg("30")
        .spawn()
        .expect("spawn sleep");
    let child_pid = child.id();
    assert!(process_exists(child_pid).unwrap());

    kill(child_pid).unwrap();

    // Reap the zombie so the pid leaves the process table
    let status = child.wait().unwrap();
    assert!(!status.success());

    assert!(wait_until(Duration::from_secs(5), || {
        find_process(child_pid, false).unwrap().is_none()
    }));
}

#[test]
#[cfg(windows)]
fn kill_terminates_child() {
    let mut child = std::process::Command::new("cmd")
        .args(["/C", "ping -n 30 127.0.0.1 > NUL"])
        .spawn()
        .expect("spawn cmd");
    let child_pid = child.id();
    assert!(find_process(child_pid, false).unwrap().is_some());

    kill(child_pid).unwrap();
    child.wait().unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        find_process(child_pid, false).unwrap().is_none()
    }));
}
