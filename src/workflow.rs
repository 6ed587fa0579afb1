//! One run, start to finish: output directory, CA, trust, request, certificate.

use std::path::PathBuf;

use crate::authority::{self, CaHandle};
use crate::error::{DevCertsError, Result};
use crate::issue::{self, CsrHandle};
use crate::options::Config;
use crate::subject::Subject;
use crate::trust::TrustRegistrar;

/// What a run produced.
#[derive(Debug, Default)]
pub struct Report {
    pub ca: Option<CaHandle>,
    pub csr: Option<CsrHandle>,
    pub certificate: Option<PathBuf>,
    /// Name of the trust store the CA went into.
    pub trusted_in: Option<&'static str>,
    /// Trust registration does not stop the run; its failure is kept here.
    pub trust_error: Option<DevCertsError>,
}

impl Report {
    pub fn exit_code(&self) -> u8 {
        if self.trust_error.is_some() { 1 } else { 0 }
    }
}

/// Runs every phase the configuration asks for. Any error other than a trust
/// failure aborts the run.
pub fn run(config: &Config, subject: &Subject, registrar: &TrustRegistrar) -> Result<Report> {
    if config.create_output_dir && !config.output_dir.is_dir() {
        log::info!("Creating {}", config.output_dir.display());
        std::fs::create_dir_all(&config.output_dir)
            .map_err(|e| DevCertsError::io("create directory", &config.output_dir, e))?;
    }

    let mut report = Report {
        ca: authority::ensure_ca(config, subject)?,
        ..Default::default()
    };

    if config.trust {
        match &report.ca {
            Some(ca) if ca.cert_path.is_file() => {
                match registrar.register(&ca.cert_path, &subject.file_name()) {
                    Ok(store) => {
                        log::info!("CA trusted in the {store}");
                        report.trusted_in = Some(store);
                    }
                    Err(err) => report.trust_error = Some(err),
                }
            }
            _ => log::info!("No CA certificate to trust"),
        }
    }

    report.csr = issue::ensure_csr(config, subject)?;
    report.certificate =
        issue::issue_certificate(config, report.ca.as_ref(), report.csr.as_ref(), subject)?;

    if let Some(certificate) = &report.certificate {
        log::info!("Done: {}", certificate.display());
    }
    Ok(report)
}
