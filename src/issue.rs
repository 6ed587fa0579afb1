//! The leaf side: key and signing request, then the certificate signed by the CA.

use std::path::PathBuf;

use crate::authority::CaHandle;
use crate::cert::params::{CertificationRequestInfo, Validity};
use crate::csr::CertificateRequest;
use crate::error::{DevCertsError, Result};
use crate::extfile::{self, DEFAULT_SECTION, ExtensionConfig, ExtensionContext};
use crate::files::{self, Mode, TransientFile};
use crate::issuer::Issuer;
use crate::key::KeyPair;
use crate::options::{Config, Scope};
use crate::serial::SerialFile;
use crate::subject::Subject;

/// A signing request on disk, and the key generated with it if this run made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrHandle {
    pub csr_path: PathBuf,
    pub key_path: Option<PathBuf>,
}

/// Returns the request to sign: the supplied one, or a fresh key and request
/// written as `<file>.key` and `<file>.csr`. CA-only runs have none.
pub fn ensure_csr(config: &Config, subject: &Subject) -> Result<Option<CsrHandle>> {
    if config.scope == Scope::CaOnly {
        return Ok(None);
    }
    if let Some(csr) = &config.csr {
        log::info!("Using certificate signing request {}", csr.display());
        return Ok(Some(CsrHandle {
            csr_path: csr.clone(),
            key_path: None,
        }));
    }

    let file_name = subject.file_name();
    let key_path = config.output_path(&format!("{file_name}.key"));
    let csr_path = config.output_path(&format!("{file_name}.csr"));

    log::info!("Generating {}-bit RSA key {}", config.bits, key_path.display());
    let key = KeyPair::generate_rsa(config.bits)?;
    let request = CertificateRequest::new(subject.distinguished_name()?.as_x509_name()?, &key)?;

    files::write_atomic(&key_path, key.to_pkcs8_pem()?.as_bytes(), Mode::Private)?;
    log::info!("Writing certificate signing request {}", csr_path.display());
    files::write_atomic(&csr_path, request.to_pem()?.as_bytes(), Mode::Public)?;

    Ok(Some(CsrHandle {
        csr_path,
        key_path: Some(key_path),
    }))
}

/// Signs the request with the CA and writes `<file>.crt`. Only full runs issue a
/// certificate.
///
/// Extensions come from the default section of `--extfile`, or from a generated
/// `<file>.ext` that is removed again however signing ends.
pub fn issue_certificate(
    config: &Config,
    ca: Option<&CaHandle>,
    csr: Option<&CsrHandle>,
    subject: &Subject,
) -> Result<Option<PathBuf>> {
    if config.scope != Scope::Full {
        return Ok(None);
    }
    let (Some(ca), Some(csr)) = (ca, csr) else {
        return Err(DevCertsError::CertificateError(
            "signing needs both a CA and a certificate signing request".to_string(),
        ));
    };

    let file_name = subject.file_name();
    let (extensions, _generated) = match &config.extfile {
        Some(path) => (ExtensionConfig::load(path)?, None),
        None => {
            let path = config.output_path(&format!("{file_name}.ext"));
            let guard = TransientFile::new(path.clone());
            std::fs::write(&path, extfile::leaf_extensions(&subject.san_block()))
                .map_err(|e| DevCertsError::io("write extensions file", &path, e))?;
            (ExtensionConfig::load(guard.path())?, Some(guard))
        }
    };

    let authority = ca.load()?;
    let request = CertificateRequest::load(&csr.csr_path)?;
    request.verify()?;

    let issuer_key_id = authority.cert.key_identifier()?;
    let issuer_serial = authority.cert.serial_number().as_bytes().to_vec();
    let params = extensions.build_extensions(
        DEFAULT_SECTION,
        &ExtensionContext {
            subject_public_key: &request.inner.info.public_key,
            issuer_key_id,
            issuer_name: authority.cert.subject(),
            issuer_serial: &issuer_serial,
        },
    )?;

    let info = CertificationRequestInfo::builder()
        .subject(request.subject().clone())
        .subject_public_key(request.public_key()?)
        .extensions(params)
        .build();
    let serials = SerialFile::for_ca_cert(&ca.cert_path);
    let serial = serials.next()?;

    let cert = authority.issue(&info, &Validity::for_days(i64::from(config.days))?, &serial)?;
    serials.record(&serial)?;
    log::debug!("Serial {} recorded in {}", hex::encode_upper(&serial), serials.path().display());
    let cert_path = config.output_path(&format!("{file_name}.crt"));
    log::info!("Writing certificate {}", cert_path.display());
    files::write_atomic(&cert_path, cert.to_pem()?.as_bytes(), Mode::Public)?;

    Ok(Some(cert_path))
}
