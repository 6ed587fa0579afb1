//! The CA serial number file (`CA.srl`), kept the way `openssl x509 -CAcreateserial`
//! keeps it: one line of hex holding the last serial handed out.

use std::path::{Path, PathBuf};

use rand_core::RngCore;

use crate::error::{DevCertsError, Result};
use crate::files;

const INITIAL_SERIAL_BYTES: usize = 16;

/// Serial file living next to a CA certificate.
#[derive(Debug, Clone)]
pub struct SerialFile {
    path: PathBuf,
}

impl SerialFile {
    /// `CA.pem` → `CA.srl`.
    pub fn for_ca_cert(ca_cert: &Path) -> Self {
        Self {
            path: ca_cert.with_extension("srl"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the serial for the next certificate. A missing file starts from a
    /// random serial. Nothing is written until [`SerialFile::record`].
    pub fn next(&self) -> Result<Vec<u8>> {
        let current = if self.path.exists() {
            let text = std::fs::read_to_string(&self.path)
                .map_err(|e| DevCertsError::io("read serial file", &self.path, e))?;
            parse_serial(&text).map_err(|msg| {
                DevCertsError::Validation(format!("{}: {msg}", self.path.display()))
            })?
        } else {
            random_serial()
        };
        Ok(increment(&current))
    }

    /// Stores `serial` as the last one handed out.
    pub fn record(&self, serial: &[u8]) -> Result<()> {
        files::write_atomic(
            &self.path,
            format!("{}\n", hex::encode_upper(serial)).as_bytes(),
            files::Mode::Public,
        )
    }
}

/// A random positive 128-bit serial, also used for self-signed CA certificates.
pub fn random_serial() -> Vec<u8> {
    let mut bytes = vec![0u8; INITIAL_SERIAL_BYTES];
    rand_core::OsRng.fill_bytes(&mut bytes);
    // positive, and no leading zero octet to strip
    bytes[0] = (bytes[0] & 0x7f).max(1);
    bytes
}

fn parse_serial(text: &str) -> std::result::Result<Vec<u8>, String> {
    let digits = text.trim();
    if digits.is_empty() {
        return Err("serial file is empty".to_string());
    }
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(&padded).map_err(|e| format!("invalid serial `{digits}`: {e}"))?;
    Ok(normalize(bytes))
}

/// Big-endian +1, then re-normalized as a positive DER integer body.
fn increment(serial: &[u8]) -> Vec<u8> {
    let mut bytes = serial.to_vec();
    let mut carry = true;
    for byte in bytes.iter_mut().rev() {
        if !carry {
            break;
        }
        let (sum, overflow) = byte.overflowing_add(1);
        *byte = sum;
        carry = overflow;
    }
    if carry {
        bytes.insert(0, 1);
    }
    normalize(bytes)
}

fn normalize(mut bytes: Vec<u8>) -> Vec<u8> {
    while bytes.len() > 1 && bytes[0] == 0 {
        bytes.remove(0);
    }
    if bytes.is_empty() {
        bytes.push(0);
    }
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0);
    }
    bytes
}
