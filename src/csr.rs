//! PKCS#10 certificate signing requests.

use std::path::Path;

use der::{DecodePem, Encode, EncodePem};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use sha2::Sha256;
use x509_cert::name::Name;
use x509_cert::request::{CertReq, CertReqInfo, Version};

use crate::cert::SignatureAlgorithm;
use crate::error::{DevCertsError, Result};
use crate::key::{KeyPair, PublicKey};

/// A signed certificate request, as written to `<name>.csr`.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub inner: CertReq,
}

impl CertificateRequest {
    /// Builds a request for `subject` and signs it with `key`.
    pub fn new(subject: Name, key: &KeyPair) -> Result<Self> {
        let info = CertReqInfo {
            version: Version::V1,
            subject,
            public_key: key.as_spki()?,
            attributes: Default::default(),
        };
        let signature = key.sign_data(&info.to_der()?)?;

        Ok(Self {
            inner: CertReq {
                info,
                algorithm: SignatureAlgorithm::Sha256WithRSA.to_algorithm_identifier()?,
                signature: der::asn1::BitString::from_bytes(&signature)?,
            },
        })
    }

    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| DevCertsError::EncodingError(e.to_string()))
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Ok(Self {
            inner: CertReq::from_pem(pem.as_bytes())?,
        })
    }

    /// Reads a PEM request from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let pem = std::fs::read_to_string(path)
            .map_err(|e| DevCertsError::io("read certificate request", path, e))?;
        Self::from_pem(&pem)
            .map_err(|e| DevCertsError::InvalidInput(format!("{}: {e}", path.display())))
    }

    pub fn subject(&self) -> &Name {
        &self.inner.info.subject
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.info.public_key)
    }

    /// Checks the proof of possession: the request must be signed by the key it carries.
    pub fn verify(&self) -> Result<()> {
        if self.inner.algorithm.oid != const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION {
            return Err(DevCertsError::InvalidInput(format!(
                "unsupported request signature algorithm {}",
                self.inner.algorithm.oid
            )));
        }
        let signature_bytes = self.inner.signature.as_bytes().ok_or_else(|| {
            DevCertsError::DecodingError("request signature has unused bits".to_string())
        })?;
        let signature = Signature::try_from(signature_bytes)
            .map_err(|e| DevCertsError::DecodingError(e.to_string()))?;

        let verifying_key = VerifyingKey::<Sha256>::new(self.public_key()?.0);
        verifying_key
            .verify(&self.inner.info.to_der()?, &signature)
            .map_err(|_| {
                DevCertsError::InvalidInput("request signature does not verify".to_string())
            })
    }
}
