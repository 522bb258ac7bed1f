use assert_cmd::Command;
use predicates::prelude::*;
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(bytes).unwrap();
    f
}

fn run_cli(text: &[u8], k: Option<u32>) -> Vec<u8> {
    let input = write_temp(text);
    let output = NamedTempFile::new().unwrap();
    let mut cmd = Command::cargo_bin("cw-bwt").unwrap();
    cmd.arg(input.path()).arg(output.path());
    if let Some(k) = k {
        cmd.arg(k.to_string());
    }
    cmd.assert().success();
    std::fs::read(output.path()).unwrap()
}

#[test]
fn banana_matches_known_bwt() {
    assert_eq!(run_cli(b"banana", None), b"annb\0aa");
}

#[test]
fn mississippi_with_explicit_k() {
    assert_eq!(run_cli(b"mississippi", Some(2)), b"ipssm\0pissii");
}

#[test]
fn abracadabra_with_explicit_k() {
    assert_eq!(run_cli(b"abracadabra", Some(3)), b"ard\0rcaaaabb");
}

#[test]
fn zero_byte_input_is_rejected_with_diagnostic() {
    let input = write_temp(b"ba\0nana");
    let output = NamedTempFile::new().unwrap();
    let mut cmd = Command::cargo_bin("cw-bwt").unwrap();
    cmd.arg(input.path()).arg(output.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("0x00"));
}

#[test]
fn context_length_too_large_is_rejected() {
    let input = write_temp(b"ab");
    let output = NamedTempFile::new().unwrap();
    let mut cmd = Command::cargo_bin("cw-bwt").unwrap();
    cmd.arg(input.path()).arg(output.path()).arg("3");
    cmd.assert().failure();
}

#[test]
fn verbose_prints_statistics_to_stdout() {
    let input = write_temp(b"banana");
    let output = NamedTempFile::new().unwrap();
    let mut cmd = Command::cargo_bin("cw-bwt").unwrap();
    cmd.arg(input.path()).arg(output.path()).arg("--verbose");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("empirical entropy"));
}

/// Inverts a BWT column (with a single `0x00` terminator) via the classic
/// LF-mapping walk, used only to check the CLI's output, not exercised by
/// the library itself.
fn invert_bwt(bwt: &[u8]) -> Vec<u8> {
    let n = bwt.len();
    let mut counts: BTreeMap<u8, u64> = BTreeMap::new();
    for &b in bwt {
        *counts.entry(b).or_insert(0) += 1;
    }
    let mut base: BTreeMap<u8, u64> = BTreeMap::new();
    let mut running = 0u64;
    for (&b, &c) in counts.iter() {
        base.insert(b, running);
        running += c;
    }
    let mut occ = BTreeMap::new();
    let mut lf = vec![0u64; n];
    for (i, &b) in bwt.iter().enumerate() {
        let rank = *occ.get(&b).unwrap_or(&0);
        lf[i] = base[&b] + rank;
        occ.insert(b, rank + 1);
    }
    let mut row = bwt.iter().position(|&b| b == 0).unwrap() as u64;
    let mut out = Vec::with_capacity(n - 1);
    for _ in 0..n - 1 {
        row = lf[row as usize];
        out.push(bwt[row as usize]);
    }
    out.reverse();
    out
}

#[test]
fn cli_output_inverts_back_to_the_original_text() {
    for text in [&b"banana"[..], b"mississippi", b"abracadabra", b"aaaa"] {
        let bwt = run_cli(text, None);
        assert_eq!(invert_bwt(&bwt), text);
    }
}
