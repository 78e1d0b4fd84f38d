//! End-to-end tests of the `pollen` binary.
//!
//! Each test runs with `HOME` pointed at a temp directory so no user
//! configuration, secrets, or saved images leak in.

use std::path::Path;

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use pollen::core::codec::START_MARKER;
use pollen::core::params::GenerationParams;
use pollen::generator::mock::synthetic_payload;

// =============================================================================
// Test Fixtures
// =============================================================================

fn pollen(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pollen").expect("binary built");
    cmd.env("HOME", home)
        .env_remove("POLLEN_CONFIG")
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("POLLINATIONS_API_TOKEN")
        .env_remove("RUST_LOG")
        .arg("--no-interactive");
    cmd
}

/// Write a config that keeps everything under `home` and talks to `api_base`.
fn write_config(home: &Path, api_base: &str) -> std::path::PathBuf {
    let path = home.join("pollen.toml");
    let content = format!(
        "[generator]\napi_base = \"{}\"\n\n[storage]\nrecords = \"{}\"\ncache_dir = \"{}\"\n",
        api_base,
        home.join("images.json").display(),
        home.join("cache").display(),
    );
    std::fs::write(&path, content).expect("write config");
    path
}

// =============================================================================
// Offline commands
// =============================================================================

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    pollen(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("export"));
}

#[test]
fn inspect_prints_embedded_metadata() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("image.jpg");
    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend_from_slice(&START_MARKER);
    bytes.extend_from_slice(br#"{"seed":42,"prompt":"moon"}"#);
    bytes.push(0x06);
    bytes.extend_from_slice(b"rest of the image");
    std::fs::write(&file, bytes).unwrap();

    pollen(home.path())
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("seed: 42"))
        .stdout(predicate::str::contains("prompt: moon"));

    pollen(home.path())
        .args(["inspect", "--json"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"seed\": 42"));
}

#[test]
fn inspect_without_metadata_is_not_an_error() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("plain.jpg");
    std::fs::write(&file, [0xFFu8, 0xD8, 0xFF, 0xD9]).unwrap();

    pollen(home.path())
        .args(["inspect", "--json"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::diff("null\n"));
}

#[test]
fn inspect_missing_file_fails() {
    let home = TempDir::new().unwrap();
    pollen(home.path())
        .args(["inspect", "does-not-exist.jpg"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error: Failed to read"));
}

#[test]
fn list_empty_collection() {
    let home = TempDir::new().unwrap();
    pollen(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved images"));
}

#[test]
fn blank_prompt_is_rejected_before_any_request() {
    let home = TempDir::new().unwrap();
    let config = write_config(home.path(), "http://127.0.0.1:9");
    pollen(home.path())
        .arg("--config")
        .arg(&config)
        .args(["generate", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid generation parameters"));
}

#[test]
fn config_set_then_get() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("custom.toml");

    pollen(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "generator.width", "800"])
        .assert()
        .success();
    assert!(config.exists());

    pollen(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "generator.width"])
        .assert()
        .success()
        .stdout(predicate::str::diff("800\n"));

    pollen(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "generator.width", "0"])
        .assert()
        .failure();
}

#[test]
fn config_get_unknown_key_fails() {
    let home = TempDir::new().unwrap();
    pollen(home.path())
        .args(["config", "get", "generator.colour"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("generator.colour"));
}

#[test]
fn auth_store_status_logout() {
    let home = TempDir::new().unwrap();

    pollen(home.path())
        .args(["auth", "--token", "sk_test_0123456789"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sk_test").not());

    pollen(home.path())
        .args(["-q", "auth", "--status"])
        .assert()
        .success()
        .stdout(predicate::str::diff("authenticated\n"));

    pollen(home.path())
        .args(["auth", "--logout"])
        .assert()
        .success();

    pollen(home.path())
        .args(["-q", "auth", "--status"])
        .assert()
        .success()
        .stdout(predicate::str::diff("not_authenticated\n"));
}

#[test]
fn delete_unknown_id_fails() {
    let home = TempDir::new().unwrap();
    pollen(home.path())
        .args(["delete", "deadbeef", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No saved image matches 'deadbeef'"));
}

#[test]
fn completion_script() {
    let home = TempDir::new().unwrap();
    pollen(home.path())
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pollen"));
}

// =============================================================================
// Against a mock image service
// =============================================================================

#[tokio::test]
async fn generate_save_list_export_delete() {
    let server = MockServer::start().await;
    let body = synthetic_payload(&GenerationParams::new("red fox").with_seed(5));
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.bytes().to_vec(), "image/jpeg"))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let config = write_config(home.path(), &server.uri());
    let out = home.path().join("out");

    let run = |args: Vec<String>| {
        let mut cmd = pollen(home.path());
        cmd.arg("--config").arg(&config).args(args);
        async move {
            tokio::task::spawn_blocking(move || cmd.output().expect("run pollen"))
                .await
                .expect("command thread")
                .assert()
        }
    };
    let args = |s: &str| s.split_whitespace().map(str::to_string).collect::<Vec<_>>();

    // The server runs on this runtime, so the blocking binary runs elsewhere.
    let saved = run(args("-q generate red_fox --seed 5 --save")).await.success();
    let id = String::from_utf8(saved.get_output().stdout.clone())
        .unwrap()
        .trim()
        .to_string();
    assert_eq!(id.len(), 36, "expected a full id, got {:?}", id);

    run(args("list"))
        .await
        .success()
        .stdout(predicate::str::contains("red_fox"));

    run(args(&format!("params {}", &id[..8])))
        .await
        .success()
        .stdout(predicate::str::contains("\"seed\": 5"));

    run(args(&format!("export {} --out {}", id, out.display())))
        .await
        .success();
    let exported = std::fs::read(out.join("red_fox.jpeg")).expect("exported file");
    assert_eq!(exported, body.bytes());

    run(args(&format!("delete {}", id))).await.success();
    run(args("-q list"))
        .await
        .success()
        .stdout(predicate::str::is_empty());

    // Every display file was cleaned up with its session.
    let cache = home.path().join("cache");
    let leftovers = std::fs::read_dir(&cache).map(|d| d.count()).unwrap_or(0);
    assert_eq!(leftovers, 0);
}

async fn run_pollen(home: &Path, config: &Path, args: &str) -> assert_cmd::assert::Assert {
    let mut cmd = pollen(home);
    cmd.arg("--config")
        .arg(config)
        .args(args.split_whitespace());
    tokio::task::spawn_blocking(move || cmd.output().expect("run pollen"))
        .await
        .expect("command thread")
        .assert()
}

fn stdout_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

#[tokio::test]
async fn generate_from_saved_parameters() {
    let server = MockServer::start().await;
    let body = synthetic_payload(&GenerationParams::new("lighthouse").with_seed(-7));
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.bytes().to_vec(), "image/jpeg"))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let config = write_config(home.path(), &server.uri());

    let saved = run_pollen(
        home.path(),
        &config,
        "-q generate lighthouse --seed -7 --preset square --model turbo --nologo --save",
    )
    .await
    .success();
    let id = stdout_of(&saved).trim().to_string();

    run_pollen(home.path(), &config, &format!("-q generate --from {} --safe", &id[..8]))
        .await
        .success();

    let params_file = home.path().join("lighthouse.json");
    let printed = run_pollen(home.path(), &config, &format!("params {}", id))
        .await
        .success();
    std::fs::write(&params_file, stdout_of(&printed)).unwrap();
    run_pollen(
        home.path(),
        &config,
        &format!("-q generate --params {} --seed 3", params_file.display()),
    )
    .await
    .success();

    let requests = server.received_requests().await.expect("requests recorded");
    assert_eq!(requests.len(), 3);
    let query = |i: usize| {
        requests[i]
            .url
            .query_pairs()
            .into_owned()
            .collect::<std::collections::HashMap<String, String>>()
    };

    let original = query(0);
    assert_eq!(original["seed"], "-7");

    // --from repeats everything, seed included, and adds --safe.
    let from = query(1);
    assert_eq!(requests[1].url.path(), "/prompt/lighthouse");
    assert_eq!(from["seed"], "-7");
    assert_eq!(from["width"], "512");
    assert_eq!(from["height"], "512");
    assert_eq!(from["model"], "turbo");
    assert_eq!(from["nologo"], "true");
    assert_eq!(from["safe"], "true");

    let from_file = query(2);
    assert_eq!(requests[2].url.path(), "/prompt/lighthouse");
    assert_eq!(from_file["seed"], "3");
    assert_eq!(from_file["model"], "turbo");
    assert!(!from_file.contains_key("safe"));
}

#[tokio::test]
async fn png_export_and_orphan_cleanup() {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 4, Rgb([250, 200, 0])))
        .write_to(&mut std::io::Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .expect("encode fixture");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(jpeg, "image/jpeg"))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let config = write_config(home.path(), &server.uri());
    let out = home.path().join("out");

    // Left by a pollen process that was killed mid-request.
    let orphan = home.path().join("cache").join("session-0badc0de");
    std::fs::create_dir_all(&orphan).unwrap();
    std::fs::write(orphan.join("stale.jpeg"), [1u8, 2, 3]).unwrap();

    let saved = run_pollen(
        home.path(),
        &config,
        &format!("-q generate sunflower --save --out {} --format png", out.display()),
    )
    .await
    .success();
    let id = stdout_of(&saved).trim().to_string();
    assert!(!orphan.exists());

    run_pollen(
        home.path(),
        &config,
        &format!("export {} --out {} --format png", id, out.display()),
    )
    .await
    .success();

    for name in ["sunflower.png", "sunflower_1.png"] {
        let bytes = std::fs::read(out.join(name)).expect("exported png");
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&bytes).expect("decodable png");
        assert_eq!((decoded.width(), decoded.height()), (6, 4));
    }

    let leftovers = std::fs::read_dir(home.path().join("cache"))
        .map(|d| d.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}
