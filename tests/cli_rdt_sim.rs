use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "rdt-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn read_units(path: &PathBuf) -> Vec<i32> {
    fs::read_to_string(path)
        .expect("read delivered data")
        .lines()
        .map(|l| l.parse().expect("one integer per line"))
        .collect()
}

#[test]
fn rdt_sim_delivers_synthetic_blocks_over_a_lossy_link() {
    let dir = unique_temp_dir("rdt-sim-lossy");
    let out = dir.join("recvData.txt");
    let report = dir.join("report.json");

    let output = Command::new(env!("CARGO_BIN_EXE_rdt_sim"))
        .args([
            "--variant",
            "tahoe",
            "--blocks",
            "30",
            "--block-len",
            "10",
            "--batch-size",
            "4",
            "--rto-ms",
            "40",
            "--latency-ms",
            "1",
            "--loss",
            "0.1",
            "--seed",
            "7",
            "--out",
            out.to_str().unwrap(),
            "--report-json",
            report.to_str().unwrap(),
        ])
        .env("RUST_LOG", "warn")
        .output()
        .expect("run rdt_sim");
    assert!(
        output.status.success(),
        "rdt_sim failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert_eq!(read_units(&out), (0..300).collect::<Vec<_>>());

    let raw = fs::read_to_string(&report).expect("read report.json");
    let v: Value = serde_json::from_str(&raw).expect("parse report.json");
    assert_eq!(v["variant"], "tahoe");
    assert_eq!(v["blocks_sent"], 30);
    assert_eq!(v["blocks_delivered"], 30);
    assert_eq!(v["batches_flushed"], 8);
    assert_eq!(v["sender"]["in_flight"], 0);
    assert!(v["sender"]["stats"]["transmissions"].as_u64() == Some(30));
    assert!(v["data_link"]["sent"].as_u64().unwrap() >= 30);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("blocks_delivered=30"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn rdt_sim_reads_config_and_data_file() {
    let dir = unique_temp_dir("rdt-sim-config");
    let config = write_file(
        &dir,
        "config.json",
        r#"
{
    "variant": "reno",
    "rto_ms": 50,
    "block_len": 3,
    "batch_size": 2,
    "link": {
        "latency_ms": 1,
        "seed": 11,
        "script": [ { "target": "seq", "value": 4, "action": "drop" } ]
    }
}
        "#,
    );
    let data = write_file(&dir, "data.txt", "10 20 30\n40 50 60\n70\n");
    let out = dir.join("recvData.txt");
    let report = dir.join("report.json");

    let output = Command::new(env!("CARGO_BIN_EXE_rdt_sim"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--data-file",
            data.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
            "--report-json",
            report.to_str().unwrap(),
        ])
        .env("RUST_LOG", "warn")
        .output()
        .expect("run rdt_sim");
    assert!(
        output.status.success(),
        "rdt_sim failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    // 最后一块补零
    assert_eq!(read_units(&out), vec![10, 20, 30, 40, 50, 60, 70, 0, 0]);

    let v: Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(v["variant"], "reno");
    assert_eq!(v["blocks_delivered"], 3);
    assert_eq!(v["data_link"]["dropped"], 1);
    assert!(v["sender"]["stats"]["retransmissions"].as_u64().unwrap() >= 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn rdt_sim_rejects_invalid_overrides() {
    let output = Command::new(env!("CARGO_BIN_EXE_rdt_sim"))
        .args(["--blocks", "1", "--ssthresh", "1"])
        .output()
        .expect("run rdt_sim");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("init_ssthresh"), "stderr={stderr}");
}
