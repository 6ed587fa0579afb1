//! Locating, reusing or creating the certificate authority.

use std::path::{Path, PathBuf};

use crate::cert::extensions::SubjectKeyIdentifier;
use crate::cert::params::{CertificationRequestInfo, Validity};
use crate::cert::{Certificate, CertificateWithPrivateKey};
use crate::error::{DevCertsError, Result};
use crate::extfile::{CA_EXTENSIONS, CA_SECTION, ExtensionConfig, ExtensionContext};
use crate::files::{self, Mode};
use crate::key::{KeyPair, PublicKey};
use crate::options::{Config, Scope};
use crate::serial;
use crate::subject::Subject;

pub const CA_KEY_FILE: &str = "CA.key";
pub const CA_CERT_FILE: &str = "CA.pem";

/// Where a CA came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaOrigin {
    /// Given with `--ca`/`--ca-key`.
    Supplied,
    /// Found complete in the output directory.
    Reused,
    /// Created by this run.
    Generated,
}

/// A complete CA on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaHandle {
    pub key_path: PathBuf,
    pub cert_path: PathBuf,
    pub origin: CaOrigin,
}

impl CaHandle {
    /// Reads the key and certificate back, checking that they belong together.
    pub fn load(&self) -> Result<CertificateWithPrivateKey> {
        let cert = Certificate::load(&self.cert_path)?;
        let key_pem = std::fs::read_to_string(&self.key_path)
            .map_err(|e| DevCertsError::io("read CA key", &self.key_path, e))?;
        let key = KeyPair::import_from_pem(&key_pem).map_err(|e| {
            DevCertsError::InvalidInput(format!("{}: {e}", self.key_path.display()))
        })?;
        CertificateWithPrivateKey::new(cert, key)
    }
}

/// Makes sure a CA exists and returns it.
///
/// A supplied pair is returned as is (after checking the key matches the
/// certificate). A CSR-only run without a supplied pair has no CA. Otherwise
/// `CA.key`/`CA.pem` in the output directory are reused when both exist and created
/// when they don't; an existing CA is never rotated.
pub fn ensure_ca(config: &Config, subject: &Subject) -> Result<Option<CaHandle>> {
    if let Some(ca) = &config.ca {
        let handle = CaHandle {
            key_path: ca.key.clone(),
            cert_path: ca.cert.clone(),
            origin: CaOrigin::Supplied,
        };
        handle.load()?;
        log::info!("Using CA {}", handle.cert_path.display());
        return Ok(Some(handle));
    }
    if config.scope == Scope::CsrOnly {
        return Ok(None);
    }

    let key_path = config.output_path(CA_KEY_FILE);
    let cert_path = config.output_path(CA_CERT_FILE);
    match (key_path.exists(), cert_path.exists()) {
        (true, true) => {
            log::info!("Reusing existing CA {}", cert_path.display());
            return Ok(Some(CaHandle {
                key_path,
                cert_path,
                origin: CaOrigin::Reused,
            }));
        }
        (false, false) => {}
        _ => log::warn!(
            "Incomplete CA in {}, generating a new one",
            config.output_dir.display()
        ),
    }

    let (key, cert) = generate_ca(config, subject)?;

    log::info!("Writing CA key {}", key_path.display());
    files::write_atomic(&key_path, key.to_pkcs8_pem()?.as_bytes(), Mode::Private)?;
    log::info!("Writing CA certificate {}", cert_path.display());
    files::write_atomic(&cert_path, cert.to_pem()?.as_bytes(), Mode::Public)?;

    Ok(Some(CaHandle {
        key_path,
        cert_path,
        origin: CaOrigin::Generated,
    }))
}

fn generate_ca(config: &Config, subject: &Subject) -> Result<(KeyPair, Certificate)> {
    log::info!("Generating {}-bit RSA key for the CA", config.bits);
    let key = KeyPair::generate_rsa(config.bits)?;

    let name = subject.distinguished_name()?.as_x509_name()?;
    let spki = key.as_spki()?;
    let serial = serial::random_serial();
    let section = config.ca_extensions.as_deref().unwrap_or(CA_SECTION);
    let extensions = ca_extension_config(config.extfile.as_deref(), section)?.build_extensions(
        section,
        &ExtensionContext {
            subject_public_key: &spki,
            issuer_key_id: SubjectKeyIdentifier::from_spki(&spki).0,
            issuer_name: &name,
            issuer_serial: &serial,
        },
    )?;

    let info = CertificationRequestInfo::builder()
        .subject(name)
        .subject_public_key(PublicKey::from_key_pair(&key))
        .extensions(extensions)
        .build();
    let cert = Certificate::new_self_signed(
        &info,
        &key,
        &Validity::for_days(i64::from(config.days))?,
        &serial,
    )?;
    Ok((key, cert))
}

/// The `--ca-ext` section comes from the extensions file when that file has it,
/// otherwise from the built-in CA profile.
fn ca_extension_config(extfile: Option<&Path>, section: &str) -> Result<ExtensionConfig> {
    if let Some(path) = extfile {
        let config = ExtensionConfig::load(path)?;
        if config.has_section(section) {
            return Ok(config);
        }
    }
    let builtin = ExtensionConfig::parse(CA_EXTENSIONS)?;
    if !builtin.has_section(section) {
        return Err(DevCertsError::Validation(format!(
            "unknown CA extensions section `{section}`"
        )));
    }
    Ok(builtin)
}
