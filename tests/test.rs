mod util;

use devcerts::authority::CaOrigin;
use devcerts::cert::Certificate;
use devcerts::cert::extensions::{AltName, SubjectAltName};
use devcerts::error::{DevCertsError, Result};
use util::{TEST_BITS, file_names, names, run_devcerts};

/// A fresh directory gets the CA, the serial file, the leaf key, request and
/// certificate, and nothing else.
#[test]
fn end_to_end_non_interactive() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let report = run_devcerts(
        dir.path(),
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
    )?;

    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        file_names(dir.path()),
        names(&[
            "CA.key",
            "CA.pem",
            "CA.srl",
            "example.com.key",
            "example.com.csr",
            "example.com.crt",
        ])
    );

    let cert = Certificate::load(&dir.path().join("example.com.crt"))?;
    let san = cert.extension::<SubjectAltName>()?.unwrap();
    assert_eq!(
        san.names,
        vec![
            AltName::Dns("example.com".to_string()),
            AltName::Dns("www.example.com".to_string()),
            AltName::Dns("api.example.com".to_string()),
        ]
    );
    Ok(())
}

/// A second run against the same directory reuses the CA byte for byte.
#[test]
fn second_run_does_not_rotate_ca() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let args = ["--no-interaction", "-b", TEST_BITS, "-n", "example.com"];

    let first = run_devcerts(dir.path(), &args, "")?;
    assert_eq!(first.ca.as_ref().unwrap().origin, CaOrigin::Generated);
    let key = std::fs::read(dir.path().join("CA.key")).unwrap();
    let pem = std::fs::read(dir.path().join("CA.pem")).unwrap();

    let second = run_devcerts(dir.path(), &args, "")?;
    assert_eq!(second.ca.as_ref().unwrap().origin, CaOrigin::Reused);
    assert_eq!(std::fs::read(dir.path().join("CA.key")).unwrap(), key);
    assert_eq!(std::fs::read(dir.path().join("CA.pem")).unwrap(), pem);

    // the serial file records the last serial handed out
    let serial = std::fs::read_to_string(dir.path().join("CA.srl")).unwrap();
    let leaf = Certificate::load(&dir.path().join("example.com.crt"))?;
    assert_eq!(
        hex::encode_upper(leaf.serial_number().as_bytes()).trim_start_matches('0'),
        serial.trim().trim_start_matches('0')
    );
    Ok(())
}

#[test]
fn ca_only_writes_only_the_ca() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let report = run_devcerts(
        dir.path(),
        &["--no-interaction", "--ca-only", "-b", TEST_BITS, "-n", "Dev CA"],
        "",
    )?;

    assert!(report.csr.is_none());
    assert!(report.certificate.is_none());
    assert_eq!(file_names(dir.path()), names(&["CA.key", "CA.pem"]));
    Ok(())
}

#[test]
fn csr_only_with_supplied_ca_issues_nothing() -> Result<()> {
    let ca_dir = tempfile::tempdir().unwrap();
    run_devcerts(
        ca_dir.path(),
        &["--no-interaction", "--ca-only", "-b", TEST_BITS, "-n", "Dev CA"],
        "",
    )?;

    let dir = tempfile::tempdir().unwrap();
    let ca = ca_dir.path().join("CA.pem");
    let ca_key = ca_dir.path().join("CA.key");
    let report = run_devcerts(
        dir.path(),
        &[
            "--no-interaction",
            "--csr-only",
            "-b",
            TEST_BITS,
            "--ca",
            ca.to_str().unwrap(),
            "--ca-key",
            ca_key.to_str().unwrap(),
            "-n",
            "example.com",
        ],
        "",
    )?;

    assert_eq!(report.ca.unwrap().origin, CaOrigin::Supplied);
    assert!(report.certificate.is_none());
    assert_eq!(
        file_names(dir.path()),
        names(&["example.com.key", "example.com.csr"])
    );
    Ok(())
}

#[test]
fn supplied_csr_is_signed_and_serial_lives_next_to_ca() -> Result<()> {
    let ca_dir = tempfile::tempdir().unwrap();
    run_devcerts(
        ca_dir.path(),
        &["--no-interaction", "--ca-only", "-b", TEST_BITS, "-n", "Dev CA"],
        "",
    )?;
    let csr_dir = tempfile::tempdir().unwrap();
    run_devcerts(
        csr_dir.path(),
        &["--no-interaction", "--csr-only", "-b", TEST_BITS, "-n", "app.localhost"],
        "",
    )?;

    let dir = tempfile::tempdir().unwrap();
    let ca = ca_dir.path().join("CA.pem");
    let ca_key = ca_dir.path().join("CA.key");
    let csr = csr_dir.path().join("app.localhost.csr");
    let report = run_devcerts(
        dir.path(),
        &[
            "--no-interaction",
            "--ca",
            ca.to_str().unwrap(),
            "--ca-key",
            ca_key.to_str().unwrap(),
            "--csr",
            csr.to_str().unwrap(),
            "-n",
            "app.localhost",
        ],
        "",
    )?;

    assert_eq!(report.csr.unwrap().key_path, None);
    assert_eq!(file_names(dir.path()), names(&["app.localhost.crt"]));
    assert!(ca_dir.path().join("CA.srl").exists());
    Ok(())
}

#[test]
fn incomplete_ca_pair_is_rejected_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("my-ca.pem"), "placeholder").unwrap();
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let result = run_devcerts(
        &out,
        &["--no-interaction", "--ca", "../my-ca.pem", "-n", "example.com"],
        "",
    );
    assert!(matches!(result, Err(DevCertsError::Validation(_))));
    assert!(file_names(&out).is_empty());
}

#[test]
fn wildcard_common_name_drives_file_names() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    run_devcerts(
        dir.path(),
        &["--no-interaction", "-b", TEST_BITS, "-n", "*.docker.localhost"],
        "",
    )?;

    assert_eq!(
        file_names(dir.path()),
        names(&[
            "CA.key",
            "CA.pem",
            "CA.srl",
            "docker.localhost.key",
            "docker.localhost.csr",
            "docker.localhost.crt",
        ])
    );
    let cert = Certificate::load(&dir.path().join("docker.localhost.crt"))?;
    let san = cert.extension::<SubjectAltName>()?.unwrap();
    assert_eq!(san.names, vec![AltName::Dns("*.docker.localhost".to_string())]);
    Ok(())
}

#[test]
fn missing_common_name_fails_without_files() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_devcerts(dir.path(), &["--no-interaction", "-b", TEST_BITS], "");
    assert!(matches!(result, Err(DevCertsError::Config(_))));
    assert!(file_names(dir.path()).is_empty());
}

#[test]
fn interactive_answers_end_up_in_subject() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    // C, ST, L, O, OU, CN, SAN, email
    run_devcerts(
        dir.path(),
        &["-b", TEST_BITS],
        "NZ\n\nWellington\n.\n\nexample.test\nwww.example.test\n\n",
    )?;

    let cert = Certificate::load(&dir.path().join("example.test.crt"))?;
    let subject = devcerts::cert::params::DistinguishedName::from_x509_name(cert.subject());
    assert_eq!(subject.country.as_deref(), Some("NZ"));
    assert_eq!(subject.state.as_deref(), Some("Some-State"));
    assert_eq!(subject.locality.as_deref(), Some("Wellington"));
    assert_eq!(subject.organization, None);
    assert_eq!(subject.common_name, "example.test");
    Ok(())
}

#[test]
fn path_create_makes_the_output_directory() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    run_devcerts(
        dir.path(),
        &[
            "--no-interaction",
            "--ca-only",
            "-b",
            TEST_BITS,
            "-p",
            "nested/certs",
            "--path-create",
            "-n",
            "Dev CA",
        ],
        "",
    )?;
    assert!(dir.path().join("nested/certs/CA.pem").is_file());
    Ok(())
}

/// Keys above 4096 bits are read back for signing, and a second run can sign
/// with the CA the first one left behind.
#[test]
fn large_keys_can_be_signed_and_reused() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let args = ["--no-interaction", "-b", "4160", "-n", "example.com"];

    run_devcerts(dir.path(), &args, "")?;
    let second = run_devcerts(dir.path(), &args, "")?;
    assert_eq!(second.ca.as_ref().unwrap().origin, CaOrigin::Reused);

    let ca = Certificate::load(&dir.path().join("CA.pem"))?;
    let cert = Certificate::load(&dir.path().join("example.com.crt"))?;
    assert_eq!(cert.subject(), ca.subject());
    Ok(())
}

#[test]
fn unrepresentable_duration_is_rejected_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_devcerts(
        dir.path(),
        &["--no-interaction", "-b", TEST_BITS, "-d", "4000000", "-n", "example.com"],
        "",
    );
    assert!(matches!(result, Err(DevCertsError::Validation(_))));
    assert!(file_names(dir.path()).is_empty());
}
