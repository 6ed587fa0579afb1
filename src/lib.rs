//! # devcerts - Local Certificate Authority for Development HTTPS
//!
//! devcerts creates (or reuses) a small certificate authority in a directory and issues
//! leaf certificates signed by it, the way a handful of `openssl req` / `openssl x509`
//! invocations would, but without OpenSSL at runtime. All X.509 work is done with
//! rustcrypto libraries.
//!
//! ## Artefacts
//!
//! A full run against an output directory leaves:
//! - **`CA.key` / `CA.pem`**: the CA key pair, created once and then reused
//! - **`CA.srl`**: the last serial number the CA handed out
//! - **`<name>.key` / `<name>.csr`**: the leaf key and its signing request
//! - **`<name>.crt`**: the signed leaf certificate
//!
//! `<name>` is the common name without a leading `*.`, so `*.docker.localhost` gives
//! `docker.localhost.crt`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use devcerts::{
//!     options::{Config, Invocation},
//!     prompt::Prompter,
//!     trust::TrustRegistrar,
//!     workflow,
//! };
//!
//! # fn main() -> Result<(), devcerts::error::DevCertsError> {
//! let args = ["devcerts", "--no-interaction", "-n", "example.com", "-a", "www.example.com"];
//! let Invocation::Run(cli) = devcerts::options::parse_args(args)? else {
//!     return Ok(());
//! };
//! let (config, fields) = Config::resolve(*cli, std::path::Path::new("/tmp/certs"))?;
//!
//! let subject = Prompter::new(std::io::empty(), std::io::sink(), config.mode).complete(fields)?;
//! let report = workflow::run(&config, &subject, &TrustRegistrar::for_host())?;
//! println!("{:?}", report.certificate);
//! # Ok(())
//! # }
//! ```
//!
//! ## Working with the X.509 Layer Directly
//!
//! ```rust,no_run
//! use devcerts::{
//!     cert::{Certificate, params::{CertificationRequestInfo, DistinguishedName, Validity}},
//!     key::{KeyPair, PublicKey},
//! };
//!
//! # fn main() -> Result<(), devcerts::error::DevCertsError> {
//! let key = KeyPair::generate_rsa(2048)?;
//! let subject = DistinguishedName::builder()
//!     .common_name("Example CA".to_string())
//!     .organization("Example Corp".to_string())
//!     .build();
//!
//! let info = CertificationRequestInfo::builder()
//!     .subject(subject.as_x509_name()?)
//!     .subject_public_key(PublicKey::from_key_pair(&key))
//!     .build();
//!
//! let cert = Certificate::new_self_signed(&info, &key, &Validity::for_days(365)?, &[1])?;
//! println!("{}", cert.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`options`]: command line flags and the resolved [`options::Config`]
//! - [`prompt`]: filling missing subject fields interactively
//! - [`subject`]: DN string, SAN block and artefact names
//! - [`authority`]: finding, reusing or creating the CA
//! - [`issue`]: leaf key, signing request and certificate
//! - [`trust`]: OS trust store registration
//! - [`workflow`]: one run, all phases in order
//! - [`extfile`]: OpenSSL-style extension files
//! - [`key`], [`cert`], [`csr`], [`issuer`], [`tbs_certificate`]: the X.509 layer
//! - [`error`]: the error type shared by all of the above

pub mod authority;
pub mod cert;
pub mod csr;
pub mod error;
pub mod extfile;
pub mod files;
pub mod issue;
pub mod issuer;
pub mod key;
pub mod options;
pub mod prompt;
pub mod serial;
pub mod subject;
pub mod tbs_certificate;
pub mod trust;
pub mod workflow;
