use std::path::PathBuf;
use std::process::Command;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_posevid")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "posevid.exe"
            } else {
                "posevid"
            });
            p
        })
}

#[test]
fn cli_without_input_prints_usage_and_fails() {
    let out = Command::new(exe()).output().unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Usage:"), "{stderr}");
}

#[test]
fn cli_with_two_inputs_fails() {
    let out = Command::new(exe()).args(["a.csv", "b.csv"]).output().unwrap();
    assert!(!out.status.success());
}

#[test]
fn cli_print_config_dumps_defaults() {
    let out = Command::new(exe())
        .args(["unused.csv", "--print-config", "--no-labels"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let cfg: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(cfg["canvas"]["width"], 600);
    assert_eq!(cfg["fps"]["num"], 15);
    assert_eq!(cfg["start_frame"], 60);
    assert_eq!(cfg["should_label"], false);
    assert_eq!(cfg["keypoints"].as_array().unwrap().len(), 17);
}

#[test]
fn cli_missing_input_fails_without_output() {
    let dir = PathBuf::from("target").join("cli_smoke").join("missing_input");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let out_path = dir.join("animation.mp4");

    let status = Command::new(exe())
        .arg(dir.join("nope.csv"))
        .arg("--no-labels")
        .arg("--out")
        .arg(&out_path)
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(!out_path.exists());
}

#[test]
fn cli_renders_video() {
    if !posevid::is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not on PATH");
        return;
    }
    let dir = PathBuf::from("target").join("cli_smoke").join("render");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let input = dir.join("posenet.csv");
    std::fs::write(&input, "frame,nose_x,nose_y\n60,100,100\n61,102,101\n").unwrap();
    let out_path = dir.join("animation.mp4");
    let frames_dir = dir.join("frames");

    let status = Command::new(exe())
        .arg(&input)
        .arg("--no-labels")
        .arg("--out")
        .arg(&out_path)
        .arg("--frames-dir")
        .arg(&frames_dir)
        .status()
        .unwrap();

    assert!(status.success());
    assert!(out_path.exists());
    assert!(frames_dir.join("00060.png").exists());
    assert!(frames_dir.join("00061.png").exists());
}
