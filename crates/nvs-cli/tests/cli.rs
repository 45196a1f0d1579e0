// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used)]
//! End-to-end runs of the `nvs` binary against dump files on disk.

use std::path::PathBuf;

use assert_cmd::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const DEVICE_DUMP: &[u8] = b"\
\x03\x03\x01mascds\x01\
\x03\x02\x01mascn\x01\
\x05\x04\x01a_cs1port\x02\
\x05\x04\x01a_cs1sclk\x12\
\x05\x04\x21a_nw1ssid\x00\x00\x00\x03lab\
\x05\x02\x04a_nw1ip\xc0\xa8\x04\x01\
\x05\x03\x11a_s31off\xff";

/// `nvs` isolated to a temp config dir, plus the fixture dump written there.
fn nvs(work: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("nvs");
    cmd.current_dir(work.path());
    cmd.env("NVS_CONFIG_DIR", work.path().join("config"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture(work: &TempDir) -> PathBuf {
    let path = work.path().join("device.nvs");
    std::fs::write(&path, DEVICE_DUMP).unwrap();
    path
}

#[test]
fn help_lists_subcommands() {
    cargo_bin_cmd!("nvs")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dump"))
        .stdout(predicate::str::contains("edit"))
        .stdout(predicate::str::contains("payload"));
}

#[test]
fn dump_prints_one_line_per_entry() {
    let work = TempDir::new().unwrap();
    let file = fixture(&work);
    nvs(&work)
        .arg("dump")
        .arg(&file)
        .assert()
        .success()
        .stdout(
            "mas.cds = 1\n\
             mas.cn = 1\n\
             a_cs1.port = 2\n\
             a_cs1.sclk = 18\n\
             a_nw1.ip = 3232236545\n\
             a_nw1.ssid = lab\n\
             a_s31.off = 255\n",
        );
}

#[test]
fn dump_reads_stdin() {
    let work = TempDir::new().unwrap();
    nvs(&work)
        .args(["dump", "-"])
        .write_stdin(DEVICE_DUMP)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("mas.cds = 1\n"));
}

#[test]
fn truncated_dump_fails() {
    let work = TempDir::new().unwrap();
    let file = work.path().join("short.nvs");
    std::fs::write(&file, &DEVICE_DUMP[..DEVICE_DUMP.len() - 1]).unwrap();
    nvs(&work)
        .arg("dump")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to decode"))
        .stderr(predicate::str::contains("out of data"));
}

#[test]
fn show_formats() {
    let work = TempDir::new().unwrap();
    let file = fixture(&work);
    nvs(&work)
        .arg("show")
        .arg(&file)
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""namespace": "a_s31""#))
        .stdout(predicate::str::contains(r#""tag": "i8""#));
    nvs(&work)
        .arg("show")
        .arg(&file)
        .args(["--format", "table", "--sign-extend", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Namespace"))
        .stdout(predicate::str::contains("-1"));
}

#[test]
fn get_single_values() {
    let work = TempDir::new().unwrap();
    let file = fixture(&work);
    nvs(&work)
        .arg("get")
        .arg(&file)
        .args(["a_nw1", "ssid", "--tag", "str"])
        .assert()
        .success()
        .stdout("lab\n");
    nvs(&work)
        .arg("get")
        .arg(&file)
        .args(["mas", "cdu", "--tag", "u8"])
        .assert()
        .success()
        .stdout("<unset>\n");
    nvs(&work)
        .arg("get")
        .arg(&file)
        .args(["nope", "cds", "--tag", "u8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("namespace `nope` not found"));
}

#[test]
fn get_sign_extends_on_request() {
    let work = TempDir::new().unwrap();
    let file = fixture(&work);
    nvs(&work)
        .arg("get")
        .arg(&file)
        .args(["a_s31", "off", "--tag", "i8"])
        .assert()
        .success()
        .stdout("255\n");
    nvs(&work)
        .arg("get")
        .arg(&file)
        .args(["a_s31", "off", "--tag", "i8", "--sign-extend", "true"])
        .assert()
        .success()
        .stdout("-1\n");
}

#[test]
fn config_projects_device_records() {
    let work = TempDir::new().unwrap();
    let file = fixture(&work);
    nvs(&work)
        .arg("config")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("SPI2 (MISO: ?, MOSI: ?, SCLK: 18)"))
        .stdout(predicate::str::contains("ip: 192.168.4.1"));
    nvs(&work)
        .arg("config")
        .arg(&file)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""ssid": "lab""#));
}

#[test]
fn edit_commits_and_writes_the_dump() {
    let work = TempDir::new().unwrap();
    let file = fixture(&work);
    let out = work.path().join("edited.nvs");
    nvs(&work)
        .arg("edit")
        .arg(&file)
        .args(["--set", "mas.cds:u8=2", "--set", "a_nw1.ssid:str=lab"])
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout("mas.cds (u8) = 2: 000000036d6173000000036364730102\n");
    nvs(&work)
        .arg("dump")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("mas.cds = 2\n"))
        .stdout(predicate::str::contains("a_nw1.ssid = lab\n"));
}

#[test]
fn edit_rejects_bad_assignments() {
    let work = TempDir::new().unwrap();
    let file = fixture(&work);
    nvs(&work)
        .arg("edit")
        .arg(&file)
        .args(["--set", "mas.cds:u8=300"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not fit in u8"));
}

#[test]
fn payload_encodes_one_field() {
    let work = TempDir::new().unwrap();
    nvs(&work)
        .args(["payload", "mas", "off", "i8", "-1"])
        .assert()
        .success()
        .stdout("000000036d6173000000036f666611ff\n");
}

#[test]
fn saved_prefs_drive_show() {
    let work = TempDir::new().unwrap();
    let file = fixture(&work);
    nvs(&work)
        .args(["prefs", "--format", "table"])
        .assert()
        .success()
        .stdout("format = table\nsign_extend = false\n");
    assert!(work.path().join("config").join("cli.json").is_file());
    nvs(&work)
        .arg("show")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Namespace"));
}
