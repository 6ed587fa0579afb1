//! Command line parsing and resolution into an immutable [`Config`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, CommandFactory, FromArgMatches, Parser};

use crate::cert::params::Validity;
use crate::error::{DevCertsError, Result};
use crate::subject::SubjectFields;

pub const DEFAULT_BITS: usize = 2048;
pub const DEFAULT_DAYS: u32 = 3650;
pub const MAX_BITS: usize = crate::key::MAX_PUBLIC_KEY_BITS;

const AFTER_HELP: &str = "\
EXAMPLES:
    $ devcerts -n '*.docker.localhost' -t
    Create CA.key/CA.pem (or reuse them), trust the CA, and issue
    docker.localhost.key/docker.localhost.crt.

    $ devcerts --no-interaction -c US -o Org -n example.com -a www.example.com,api.example.com
    Issue a certificate for three names without asking anything.

    $ devcerts --ca-only -n 'Dev CA' -p ./certs --path-create
    Only create the certificate authority.
";

/// Command line flags, exactly as typed.
#[derive(Parser, Debug, Default)]
#[command(name = "devcerts")]
#[command(about = "Issue a local certificate authority and development TLS certificates")]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Output directory [default: current directory]
    #[arg(short = 'p', long = "path", value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Create the output directory if it does not exist
    #[arg(long = "path-create")]
    pub path_create: bool,

    /// Validity of generated certificates, in days
    #[arg(short = 'd', long = "duration", value_name = "DAYS", default_value_t = DEFAULT_DAYS)]
    pub duration: u32,

    /// RSA key size in bits
    #[arg(short = 'b', long = "bits", value_name = "BITS", default_value_t = DEFAULT_BITS)]
    pub bits: usize,

    /// Never prompt, except for a missing common name
    #[arg(long = "no-interaction")]
    pub no_interaction: bool,

    /// Existing CA certificate to sign with
    #[arg(long = "ca", value_name = "FILE")]
    pub ca: Option<PathBuf>,

    /// Existing CA private key to sign with
    #[arg(long = "ca-key", value_name = "FILE")]
    pub ca_key: Option<PathBuf>,

    /// Only create (or reuse) the CA
    #[arg(long = "ca-only", conflicts_with = "csr_only")]
    pub ca_only: bool,

    /// Extensions section applied to a generated CA [default: v3_ca]
    #[arg(long = "ca-ext", value_name = "NAME")]
    pub ca_ext: Option<String>,

    /// Add the CA certificate to the system trust store
    #[arg(short = 't', long = "trust")]
    pub trust: bool,

    /// Existing certificate signing request to sign
    #[arg(long = "csr", value_name = "FILE")]
    pub csr: Option<PathBuf>,

    /// Stop after creating the key and signing request
    #[arg(long = "csr-only")]
    pub csr_only: bool,

    /// Extensions file used when signing the leaf certificate
    #[arg(long = "extfile", value_name = "FILE")]
    pub extfile: Option<PathBuf>,

    /// Country name (2 letter code)
    #[arg(short = 'c', long = "country")]
    pub country: Option<String>,

    /// State or province name
    #[arg(short = 's', long = "state")]
    pub state: Option<String>,

    /// Locality name (e.g. city)
    #[arg(short = 'l', long = "locality")]
    pub locality: Option<String>,

    /// Organization name
    #[arg(short = 'o', long = "organization")]
    pub organization: Option<String>,

    /// Organizational unit name
    #[arg(short = 'u', long = "unit")]
    pub unit: Option<String>,

    /// Common name, e.g. the server FQDN or `*.example.com`
    #[arg(short = 'n', long = "common-name", value_name = "NAME")]
    pub common_name: Option<String>,

    /// Extra subject alternative names, comma separated
    #[arg(short = 'a', long = "san", value_name = "NAMES")]
    pub san: Option<String>,

    /// Email address
    #[arg(short = 'e', long = "email")]
    pub email: Option<String>,
}

/// What the command line asks for.
#[derive(Debug)]
pub enum Invocation {
    /// Help or version text to print before exiting successfully.
    Print(String),
    Run(Box<Cli>),
}

/// The clap command, with `-v` instead of clap's `-V` for the version.
pub fn command() -> clap::Command {
    Cli::command()
        .version(env!("CARGO_PKG_VERSION"))
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::Version)
                .help("Print version"),
        )
}

/// Parses the arguments (program name first). Help and version requests come back as
/// [`Invocation::Print`]; every other parse failure as a usage error carrying clap's
/// rendered message and usage line.
pub fn parse_args<I, T>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = match command().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(err) => {
            return match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    Ok(Invocation::Print(err.render().to_string()))
                }
                _ => Err(DevCertsError::Usage(err.render().to_string())),
            };
        }
    };
    let cli = Cli::from_arg_matches(&matches)
        .map_err(|err| DevCertsError::Usage(err.render().to_string()))?;
    Ok(Invocation::Run(Box::new(cli)))
}

/// Interactive prompting or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    NonInteractive,
}

/// How far the run goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// CA, request and signed certificate.
    Full,
    CaOnly,
    CsrOnly,
}

/// A CA supplied on the command line: both halves, both existing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// The resolved run parameters. Built once, then only read.
#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub create_output_dir: bool,
    pub days: u32,
    pub bits: usize,
    pub mode: Mode,
    pub scope: Scope,
    pub trust: bool,
    pub ca: Option<CaPaths>,
    pub ca_extensions: Option<String>,
    pub csr: Option<PathBuf>,
    pub extfile: Option<PathBuf>,
}

impl Config {
    /// Validates the flags and splits them into the run configuration and the raw
    /// subject fields. Relative paths are resolved against `cwd`. Nothing is written.
    pub fn resolve(cli: Cli, cwd: &Path) -> Result<(Config, SubjectFields)> {
        let absolute = |p: PathBuf| if p.is_absolute() { p } else { cwd.join(p) };

        let output_dir = cli.path.map(absolute).unwrap_or_else(|| cwd.to_path_buf());
        if !output_dir.is_dir() && !cli.path_create {
            return Err(DevCertsError::Validation(format!(
                "output directory {} does not exist (use --path-create to create it)",
                output_dir.display()
            )));
        }

        if cli.duration == 0 {
            return Err(DevCertsError::Validation(
                "--duration must be at least one day".to_string(),
            ));
        }
        Validity::for_days(i64::from(cli.duration))?;
        if cli.bits == 0 {
            return Err(DevCertsError::Validation(
                "--bits must be a positive number".to_string(),
            ));
        }
        if cli.bits > MAX_BITS {
            return Err(DevCertsError::Validation(format!(
                "--bits must be at most {MAX_BITS}"
            )));
        }

        let ca = match (cli.ca.map(absolute), cli.ca_key.map(absolute)) {
            (Some(cert), Some(key)) => {
                require_file(&cert, "CA certificate")?;
                require_file(&key, "CA key")?;
                Some(CaPaths { cert, key })
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(DevCertsError::Validation(
                    "--ca requires --ca-key".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(DevCertsError::Validation(
                    "--ca-key requires --ca".to_string(),
                ));
            }
        };

        let csr = cli.csr.map(absolute);
        if let Some(csr) = &csr {
            require_file(csr, "certificate signing request")?;
        }
        let extfile = cli.extfile.map(absolute);
        if let Some(extfile) = &extfile {
            require_file(extfile, "extensions file")?;
        }

        let scope = match (cli.ca_only, cli.csr_only) {
            (true, true) => {
                return Err(DevCertsError::Usage(
                    "--ca-only and --csr-only are mutually exclusive".to_string(),
                ));
            }
            (true, false) => Scope::CaOnly,
            (false, true) => Scope::CsrOnly,
            (false, false) => Scope::Full,
        };

        let config = Config {
            output_dir,
            create_output_dir: cli.path_create,
            days: cli.duration,
            bits: cli.bits,
            mode: if cli.no_interaction {
                Mode::NonInteractive
            } else {
                Mode::Interactive
            },
            scope,
            trust: cli.trust,
            ca,
            ca_extensions: cli.ca_ext,
            csr,
            extfile,
        };
        let fields = SubjectFields {
            country: cli.country,
            state: cli.state,
            locality: cli.locality,
            organization: cli.organization,
            unit: cli.unit,
            common_name: cli.common_name,
            alt_names: cli.san,
            email: cli.email,
        };
        Ok((config, fields))
    }

    /// `<output>/<name>`.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

fn require_file(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DevCertsError::Validation(format!(
            "{what} {} does not exist",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Cli {
        let argv = std::iter::once("devcerts").chain(args.iter().copied());
        match parse_args(argv).unwrap() {
            Invocation::Run(cli) => *cli,
            Invocation::Print(text) => panic!("unexpected print: {text}"),
        }
    }

    #[test]
    fn test_defaults() {
        let cli = run(&[]);
        assert_eq!(cli.bits, 2048);
        assert_eq!(cli.duration, 3650);
        assert!(!cli.no_interaction);
        assert!(cli.path.is_none());
    }

    #[test]
    fn test_long_short_and_equals_forms() {
        let cli = run(&[
            "--common-name=example.com",
            "-c",
            "US",
            "--state",
            "CA",
            "--bits=4096",
            "--san=www.example.com,api.example.com",
            "-t",
            "--no-interaction",
        ]);
        assert_eq!(cli.common_name.as_deref(), Some("example.com"));
        assert_eq!(cli.country.as_deref(), Some("US"));
        assert_eq!(cli.state.as_deref(), Some("CA"));
        assert_eq!(cli.bits, 4096);
        assert_eq!(cli.san.as_deref(), Some("www.example.com,api.example.com"));
        assert!(cli.trust);
        assert!(cli.no_interaction);
    }

    #[test]
    fn test_help_and_version_short_circuit() {
        for flag in ["-h", "--help", "-v", "--version"] {
            assert!(
                matches!(parse_args(["devcerts", flag]), Ok(Invocation::Print(_))),
                "{flag} should print"
            );
        }
        match parse_args(["devcerts", "-v"]).unwrap() {
            Invocation::Print(text) => assert!(text.contains(env!("CARGO_PKG_VERSION"))),
            Invocation::Run(_) => unreachable!(),
        }
    }

    #[test]
    fn test_unknown_flag_is_a_usage_error() {
        match parse_args(["devcerts", "--frobnicate"]) {
            Err(DevCertsError::Usage(text)) => assert!(text.contains("Usage")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_boolean_flags_take_no_value() {
        assert!(matches!(
            parse_args(["devcerts", "--trust=yes"]),
            Err(DevCertsError::Usage(_))
        ));
    }

    #[test]
    fn test_value_flags_require_a_value() {
        assert!(matches!(
            parse_args(["devcerts", "--common-name"]),
            Err(DevCertsError::Usage(_))
        ));
    }

    #[test]
    fn test_ca_only_conflicts_with_csr_only() {
        assert!(matches!(
            parse_args(["devcerts", "--ca-only", "--csr-only"]),
            Err(DevCertsError::Usage(_))
        ));
    }

    #[test]
    fn test_resolve_defaults_to_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let (config, fields) = Config::resolve(run(&["-n", "example.com"]), dir.path()).unwrap();
        assert_eq!(config.output_dir, dir.path());
        assert_eq!(config.scope, Scope::Full);
        assert_eq!(config.mode, Mode::Interactive);
        assert_eq!(fields.common_name.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_resolve_rejects_half_a_ca() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("CA.pem"), "x").unwrap();
        std::fs::write(dir.path().join("CA.key"), "x").unwrap();

        let err = Config::resolve(run(&["--ca", "CA.pem"]), dir.path()).unwrap_err();
        assert!(matches!(err, DevCertsError::Validation(_)));
        let err = Config::resolve(run(&["--ca-key", "CA.key"]), dir.path()).unwrap_err();
        assert!(matches!(err, DevCertsError::Validation(_)));

        let (config, _) =
            Config::resolve(run(&["--ca", "CA.pem", "--ca-key", "CA.key"]), dir.path()).unwrap();
        assert_eq!(
            config.ca,
            Some(CaPaths {
                cert: dir.path().join("CA.pem"),
                key: dir.path().join("CA.key"),
            })
        );
    }

    #[test]
    fn test_resolve_rejects_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        for args in [
            &["--csr", "missing.csr"][..],
            &["--extfile", "missing.ext"][..],
            &["--ca", "CA.pem", "--ca-key", "CA.key"][..],
        ] {
            assert!(
                matches!(
                    Config::resolve(run(args), dir.path()),
                    Err(DevCertsError::Validation(_))
                ),
                "{args:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_resolve_bounds_key_size_and_duration() {
        let dir = tempfile::tempdir().unwrap();
        for args in [
            &["-b", "0"][..],
            &["-b", "16385"][..],
            &["-d", "0"][..],
            &["-d", "4000000"][..],
        ] {
            assert!(
                matches!(
                    Config::resolve(run(args), dir.path()),
                    Err(DevCertsError::Validation(_))
                ),
                "{args:?} should be rejected"
            );
        }
        let (config, _) = Config::resolve(run(&["-b", "8192"]), dir.path()).unwrap();
        assert_eq!(config.bits, 8192);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_resolve_requires_existing_output_unless_create() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::resolve(run(&["-p", "certs"]), dir.path()).is_err());

        let (config, _) = Config::resolve(run(&["-p", "certs", "--path-create"]), dir.path()).unwrap();
        assert_eq!(config.output_dir, dir.path().join("certs"));
        assert!(config.create_output_dir);
        assert!(!config.output_dir.exists());
    }
}
