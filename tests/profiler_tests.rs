// SPDX-License-Identifier: PMPL-1.0-or-later

//! Debug log and profile points

use smart_factory::profiler::{DebugProfiler, DEBUG_FILE, PROFILE_FILE};
use std::fs;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn profiler_in(dir: &TempDir) -> DebugProfiler {
    DebugProfiler::new(&dir.path().display().to_string(), false).expect("log dir should be writable")
}

#[test]
fn test_profile_points_measure_each_interval() {
    let dir = TempDir::new().unwrap();
    let mut profiler = profiler_in(&dir);

    assert_eq!(profiler.fix_profile_point("not started").unwrap(), None);

    profiler.start_profile_point("import").unwrap();
    thread::sleep(Duration::from_millis(20));
    let first = profiler.fix_profile_point("parsed").unwrap().unwrap();
    let second = profiler.fix_profile_point("stored").unwrap().unwrap();

    assert!(first >= 0.02, "first interval was {}", first);
    assert!(second >= 0.0);
    assert!(second < first, "second interval restarts timing");

    let log = fs::read_to_string(dir.path().join(PROFILE_FILE)).unwrap();
    assert!(log.contains("\r\n\r\nimport\r\n-------\r\n"));
    assert!(log.contains(&format!("parsed: {:.3} seconds", first)));
    assert!(log.contains(" seconds\r\n-------\r\n"));
}

#[test]
fn test_call_stack_section_is_written_on_request() {
    let dir = TempDir::new().unwrap();
    let profiler = profiler_in(&dir);

    profiler.debug_message("with stack", true, DEBUG_FILE).unwrap();
    let log = fs::read_to_string(dir.path().join(DEBUG_FILE)).unwrap();
    assert!(log.starts_with("\r\n#Callstack:\r\n"));
    assert!(log.ends_with("\r\n\r\nwith stack\r\n-------\r\n"));
}

#[test]
fn test_clear_log_files_only_removes_logs() {
    let dir = TempDir::new().unwrap();
    let profiler = profiler_in(&dir);

    profiler.debug_message("one", false, DEBUG_FILE).unwrap();
    profiler.debug_message("two", false, "custom.log").unwrap();
    fs::write(dir.path().join("notes.txt"), "keep").unwrap();

    profiler.clear_log_files();
    assert!(!dir.path().join(DEBUG_FILE).exists());
    assert!(!dir.path().join("custom.log").exists());
    assert!(dir.path().join("notes.txt").exists());

    profiler.clear_log_file("never-written.log");
}
