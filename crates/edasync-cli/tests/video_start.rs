use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::error::Error;

#[test]
fn extracts_time_from_camera_export_name() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("edasync");
    cmd.args([
        "video-start",
        "--filename",
        "SYS1Cam3--2018-05-14_10_22_27_frames_1-9470.mp4",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let value: Value = serde_json::from_slice(&output)?;
    assert_eq!(value["start_time"].as_str(), Some("10:22:27"));
    Ok(())
}

#[test]
fn unmatched_name_prints_null() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("edasync");
    cmd.args(["video-start", "--filename", "interview_final.mov"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let value: Value = serde_json::from_slice(&output)?;
    assert!(value["start_time"].is_null());
    Ok(())
}

#[test]
fn window_subcommand_falls_back_to_full_series() -> Result<(), Box<dyn Error>> {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join("test_data/headered_iso.csv");
    let input = root.to_string_lossy().to_string();

    let mut cmd = cargo_bin_cmd!("edasync");
    cmd.args(["window", "--input", &input, "--offset", "20", "--duration", "30"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let value: Value = serde_json::from_slice(&output)?;
    assert_eq!(value["stats"]["count"].as_u64(), Some(2));

    let mut cmd = cargo_bin_cmd!("edasync");
    cmd.args(["window", "--input", &input, "--offset", "200", "--duration", "10"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let value: Value = serde_json::from_slice(&output)?;
    assert_eq!(value["stats"]["count"].as_u64(), Some(5));
    assert_eq!(value["start_index"].as_u64(), Some(0));
    Ok(())
}
