use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// `quill` isolated in a scratch working directory with its own config and cache locations
fn quill_process(dir: &Path) -> std::process::Command {
    let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin("quill"));
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_CACHE_HOME", dir.join("cache"))
        .env_remove("QUILL_MODEL")
        .env_remove("QUILL_DEVICE")
        .env_remove("QUILL_LANGUAGE")
        .env_remove("RUST_LOG");
    for proxy in ["http_proxy", "https_proxy", "all_proxy", "HTTP_PROXY", "HTTPS_PROXY", "ALL_PROXY"] {
        cmd.env_remove(proxy);
    }
    cmd
}

fn quill(dir: &Path) -> Command {
    Command::from_std(quill_process(dir))
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn transcribe_help_lists_every_option() {
    let tmp = TempDir::new().unwrap();
    quill(tmp.path())
        .args(["transcribe", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INPUT_SOURCE"))
        .stdout(predicate::str::contains("OUTPUT_FILE"))
        .stdout(predicate::str::contains("--model"))
        .stdout(predicate::str::contains("--device"))
        .stdout(predicate::str::contains("--language"))
        .stdout(predicate::str::contains("--timestamps"))
        .stdout(predicate::str::contains("--no-timestamps"));
}

#[test]
fn missing_input_file_fails_without_side_effects() {
    let tmp = TempDir::new().unwrap();
    quill(tmp.path())
        .args(["--quiet", "transcribe", "no-such-recording.mp3"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Input file does not exist"));

    assert!(entries(tmp.path()).is_empty());
}

#[test]
fn unknown_model_fails_and_keeps_local_input() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("speech.wav"), b"RIFF....WAVE").unwrap();

    quill(tmp.path())
        .args(["--quiet", "transcribe", "speech.wav", "out.txt", "--model", "gigantic"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown model size 'gigantic'"));

    assert_eq!(entries(tmp.path()), vec!["speech.wav".to_string()]);
}

#[test]
fn unreachable_url_cleans_up_temporary_audio() {
    let tmp = TempDir::new().unwrap();
    quill(tmp.path())
        .args(["--quiet", "transcribe", "http://127.0.0.1:9/episode.mp3"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to download file"));

    assert!(!entries(tmp.path())
        .iter()
        .any(|name| name.starts_with("temp_audio_file")));
    assert!(!tmp.path().join("transcription.txt").exists());
}

#[test]
fn rejects_unknown_device() {
    let tmp = TempDir::new().unwrap();
    quill(tmp.path())
        .args(["transcribe", "speech.wav", "--device", "tpu"])
        .assert()
        .code(2);
}

#[test]
fn platforms_lists_input_sources() {
    let tmp = TempDir::new().unwrap();
    quill(tmp.path())
        .arg("platforms")
        .assert()
        .success()
        .stdout(predicate::str::contains("YouTube"))
        .stdout(predicate::str::contains("Direct audio URLs"))
        .stdout(predicate::str::contains("Local audio files"));
}

#[test]
fn models_lists_sizes_from_configured_cache() {
    let tmp = TempDir::new().unwrap();
    let models = tmp.path().join("models");
    std::fs::create_dir(&models).unwrap();
    std::fs::write(models.join("ggml-tiny.bin"), vec![0u8; 2048]).unwrap();
    std::fs::write(
        tmp.path().join("config.yaml"),
        format!("app:\n  models_dir: {}\n", models.display()),
    )
    .unwrap();

    quill(tmp.path())
        .arg("models")
        .assert()
        .success()
        .stdout(predicate::str::contains("tiny"))
        .stdout(predicate::str::contains("2.0 KB"))
        .stdout(predicate::str::contains("medium"))
        .stdout(predicate::str::contains("not downloaded"))
        .stdout(predicate::str::contains("large-v3 (large)"));
}

#[test]
fn config_show_reads_local_file() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("config.yaml"),
        "transcription:\n  model: small\n  language: fr\n",
    )
    .unwrap();

    quill(tmp.path())
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Model: small"))
        .stdout(predicate::str::contains("Language: fr"))
        .stdout(predicate::str::contains("Default Output: transcription.txt"));
}

#[test]
fn invalid_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("config.yaml"), "transcription: [not, a, map]\n").unwrap();

    quill(tmp.path())
        .args(["config", "--show"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[cfg(unix)]
#[test]
fn interrupt_during_download_cancels_and_cleans_up() {
    use std::net::TcpListener;
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let tmp = TempDir::new().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let url = format!("http://{}/episode.mp3", listener.local_addr().unwrap());

    let mut child = quill_process(tmp.path())
        .args(["--quiet", "transcribe", &url])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // Accept the download request and never answer it
    let deadline = Instant::now() + Duration::from_secs(30);
    let _connection = loop {
        match listener.accept() {
            Ok((connection, _)) => break connection,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock && Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(e) => {
                let _ = child.kill();
                panic!("quill never connected: {e}");
            }
        }
    };

    let status = std::process::Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let output = child.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(130), "stderr: {stderr}");
    assert!(stderr.contains("Transcription cancelled by user. Cleaning up..."));
    assert!(stderr.contains("Aborted!"));

    assert!(!entries(tmp.path())
        .iter()
        .any(|name| name.starts_with("temp_audio_file")));
    assert!(!tmp.path().join("transcription.txt").exists());
}
