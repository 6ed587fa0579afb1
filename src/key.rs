use rsa::{
    BigUint, RsaPrivateKey, RsaPublicKey,
    pkcs1::DecodeRsaPrivateKey,
    pkcs1v15::SigningKey,
    pkcs8::{DecodePrivateKey, EncodePrivateKey},
    signature::{SignatureEncoding, Signer},
};
use sha2::Sha256;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{DevCertsError, Result};

const PKCS8_LABEL: &str = "PRIVATE KEY";
const PKCS1_LABEL: &str = "RSA PRIVATE KEY";
/// Largest modulus accepted when reading public keys back out of certificates
/// and requests.
pub const MAX_PUBLIC_KEY_BITS: usize = 16384;

/// An RSA key pair used for the CA or a leaf certificate.
#[derive(Clone, Debug)]
pub struct KeyPair {
    private: Box<RsaPrivateKey>,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| DevCertsError::KeyGenerationError(format!("{bits}-bit RSA: {e}")))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair {
            private: Box::new(private),
            public,
        })
    }

    /// Imports a private key from PEM, accepting both PKCS#8 and the traditional PKCS#1
    /// encoding older OpenSSL versions write.
    pub fn import_from_pem(pem_str: &str) -> Result<Self> {
        let block = pem::parse(pem_str)?;
        let private = match block.tag() {
            PKCS8_LABEL => RsaPrivateKey::from_pkcs8_der(block.contents())?,
            PKCS1_LABEL => RsaPrivateKey::from_pkcs1_der(block.contents())?,
            other => {
                return Err(DevCertsError::InvalidInput(format!(
                    "expected an RSA private key, found a `{other}` PEM block"
                )));
            }
        };
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair {
            private: Box::new(private),
            public,
        })
    }

    /// Exports the private key as a PKCS#8 PEM document.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let pem = self.private.to_pkcs8_pem(pkcs8::LineEnding::LF)?;
        Ok(pem.to_string())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.public.clone())
    }

    /// Signs the provided data with RSASSA-PKCS1-v1_5 over SHA-256.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signing_key = SigningKey::<Sha256>::new(*self.private.clone());
        let signature = signing_key
            .try_sign(data)
            .map_err(|e| DevCertsError::RsaError(e.to_string()))?;
        Ok(signature.to_vec())
    }

    /// The SubjectPublicKeyInfo of the public half.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        self.public_key().to_spki()
    }
}

/// The public half of an RSA key pair, as placed in certificates and requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(pub RsaPublicKey);

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        key_pair.public_key()
    }

    /// Decodes an RSA public key out of a SubjectPublicKeyInfo.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        if spki.algorithm.oid != const_oid::db::rfc5912::RSA_ENCRYPTION {
            return Err(DevCertsError::InvalidInput(format!(
                "unsupported public key algorithm {}",
                spki.algorithm.oid
            )));
        }
        let bytes = spki.subject_public_key.as_bytes().ok_or_else(|| {
            DevCertsError::DecodingError("public key bit string is not octet aligned".to_string())
        })?;
        let pkcs1 = rsa::pkcs1::RsaPublicKey::try_from(bytes)
            .map_err(|e| DevCertsError::DecodingError(e.to_string()))?;
        let public = RsaPublicKey::new_with_max_size(
            BigUint::from_bytes_be(pkcs1.modulus.as_bytes()),
            BigUint::from_bytes_be(pkcs1.public_exponent.as_bytes()),
            MAX_PUBLIC_KEY_BITS,
        )
        .map_err(|e| DevCertsError::DecodingError(e.to_string()))?;
        Ok(PublicKey(public))
    }

    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        Ok(SubjectPublicKeyInfoOwned::from_key(self.0.clone())?)
    }
}
