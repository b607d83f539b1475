use std::path::PathBuf;
use std::process::Command;
use vn32::{CpuState, Snapshot};

fn write_program(name: &str, source: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("vn32-cli-{}-{}.asm", name, std::process::id()));
    std::fs::write(&path, source).unwrap();
    path
}

fn vn32(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_vn32")).args(args).output().unwrap()
}

#[test]
fn snapshot_stdout_is_only_json() {
    let path = write_program("snapshot", "Load r1, #0\nAdd r2, r1, r1\nStore r2, #1\n");
    let output = vn32(&["snapshot", path.to_str().unwrap(), "--data", "5"]);
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    let snapshot: Snapshot = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snapshot.state, CpuState::Halted);
    assert_eq!(snapshot.gpr[2], 10);
    assert_eq!(snapshot.data[..2], [5, 10]);
}

#[test]
fn unaligned_memory_flag_fails() {
    let path = write_program("unaligned", "Add r1, r1, r1\n");
    let output = vn32(&["run", path.to_str().unwrap(), "--memory", "10"]);
    let _ = std::fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a multiple of 4"));
}
