mod util;

use std::path::Path;
use std::process::Command;

use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509, X509Req, X509StoreContext};
use regex::Regex;
use util::{TEST_BITS, run_devcerts};

fn issue_example(dir: &Path) {
    run_devcerts(
        dir,
        &[
            "--no-interaction",
            "-b",
            TEST_BITS,
            "-c",
            "US",
            "-s",
            "CA",
            "-o",
            "Org",
            "-n",
            "example.com",
            "-a",
            "www.example.com,api.example.com",
        ],
        "",
    )
    .expect("devcerts run failed");
}

fn load_cert(path: &Path) -> X509 {
    X509::from_pem(&std::fs::read(path).unwrap()).expect("Failed to parse PEM")
}

fn common_name(name: &openssl::x509::X509NameRef) -> String {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap()
        .to_string()
}

#[test]
fn test_openssl_crate_validate_chain() {
    let dir = tempfile::tempdir().unwrap();
    issue_example(dir.path());

    let ca = load_cert(&dir.path().join("CA.pem"));
    let leaf = load_cert(&dir.path().join("example.com.crt"));

    assert_eq!(common_name(leaf.subject_name()), "example.com");
    assert_eq!(common_name(leaf.issuer_name()), "example.com");
    assert_eq!(leaf.version(), 2, "X509 version should be 3 (0-based index)");
    assert_eq!(
        leaf.signature_algorithm().object().nid(),
        Nid::SHA256WITHRSAENCRYPTION
    );
    assert!(leaf.verify(&ca.public_key().unwrap()).unwrap());
    assert!(ca.verify(&ca.public_key().unwrap()).unwrap());

    let mut store = X509StoreBuilder::new().unwrap();
    store.add_cert(ca.clone()).unwrap();
    let store = store.build();
    let mut ctx = X509StoreContext::new().unwrap();
    let chain = Stack::new().unwrap();
    let verified = ctx
        .init(&store, &leaf, &chain, |ctx| {
            let ok = ctx.verify_cert()?;
            Ok((ok, ctx.error()))
        })
        .unwrap();
    assert!(verified.0, "chain verification failed: {}", verified.1);
}

#[test]
fn test_openssl_crate_san_order() {
    let dir = tempfile::tempdir().unwrap();
    issue_example(dir.path());

    let leaf = load_cert(&dir.path().join("example.com.crt"));
    let names: Vec<String> = leaf
        .subject_alt_names()
        .expect("no subjectAltName")
        .iter()
        .filter_map(|name| name.dnsname().map(str::to_string))
        .collect();
    assert_eq!(names, ["example.com", "www.example.com", "api.example.com"]);
}

#[test]
fn test_openssl_crate_keys_and_request() {
    let dir = tempfile::tempdir().unwrap();
    issue_example(dir.path());

    let ca = load_cert(&dir.path().join("CA.pem"));
    let ca_key = PKey::private_key_from_pem(&std::fs::read(dir.path().join("CA.key")).unwrap())
        .expect("CA key is not readable by OpenSSL");
    assert!(ca.public_key().unwrap().public_eq(&ca_key));

    let leaf = load_cert(&dir.path().join("example.com.crt"));
    let leaf_key =
        PKey::private_key_from_pem(&std::fs::read(dir.path().join("example.com.key")).unwrap())
            .unwrap();
    assert!(leaf.public_key().unwrap().public_eq(&leaf_key));
    assert_eq!(leaf_key.bits(), 1024);

    let req = X509Req::from_pem(&std::fs::read(dir.path().join("example.com.csr")).unwrap())
        .expect("request is not readable by OpenSSL");
    assert!(req.verify(&req.public_key().unwrap()).unwrap());
    assert_eq!(common_name(req.subject_name()), "example.com");
}

fn openssl_cli_available() -> bool {
    Command::new("openssl").arg("version").output().is_ok()
}

#[test]
fn test_openssl_cli_text_and_verify() {
    if !openssl_cli_available() {
        eprintln!("openssl CLI not found, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    issue_example(dir.path());
    let leaf = dir.path().join("example.com.crt");

    let output = Command::new("openssl")
        .arg("x509")
        .arg("-in")
        .arg(&leaf)
        .arg("-noout")
        .arg("-text")
        .output()
        .expect("Failed to execute OpenSSL command");
    assert!(
        output.status.success(),
        "OpenSSL command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let output_text = String::from_utf8_lossy(&output.stdout);

    assert!(output_text.contains("Version: 3 (0x2)"), "Version field is incorrect");
    assert!(output_text.contains("CA:FALSE"), "basicConstraints missing");
    assert!(
        output_text.contains("DNS:example.com, DNS:www.example.com, DNS:api.example.com"),
        "subjectAltName is incorrect"
    );
    assert!(
        output_text.contains("TLS Web Server Authentication"),
        "extendedKeyUsage is incorrect"
    );
    assert!(
        Regex::new(r"Signature Algorithm: sha256WithRSAEncryption")
            .unwrap()
            .is_match(&output_text),
        "Signature Algorithm field is incorrect"
    );
    assert!(
        Regex::new(r"Subject: C\s?=\s?US, ST\s?=\s?CA, O\s?=\s?Org, CN\s?=\s?example\.com")
            .unwrap()
            .is_match(&output_text),
        "Subject field is incorrect"
    );
    assert!(Regex::new(r"Not Before: .+").unwrap().is_match(&output_text));
    assert!(Regex::new(r"Not After : .+").unwrap().is_match(&output_text));

    let verify = Command::new("openssl")
        .arg("verify")
        .arg("-CAfile")
        .arg(dir.path().join("CA.pem"))
        .arg(&leaf)
        .output()
        .expect("Failed to execute OpenSSL command");
    assert!(
        verify.status.success(),
        "openssl verify failed: {}{}",
        String::from_utf8_lossy(&verify.stdout),
        String::from_utf8_lossy(&verify.stderr)
    );
    assert!(String::from_utf8_lossy(&verify.stdout).trim_end().ends_with("OK"));
}
