//! Registering the CA certificate with the operating system's trust store.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{DevCertsError, Result};

const MACOS_SYSTEM_KEYCHAIN: &str = "/Library/Keychains/System.keychain";
const LINUX_TRUST_ANCHORS_DIR: &str = "/etc/pki/ca-trust/source/anchors";
const LINUX_CA_CERTIFICATES_DIR: &str = "/usr/local/share/ca-certificates";

/// Runs the external commands a trust store needs.
pub trait CommandRunner {
    fn exists(&self, program: &str) -> bool;

    /// Runs `program` to completion. `privileged` commands get elevated when needed.
    /// The error is a one-line summary of what went wrong.
    fn run(
        &self,
        program: &str,
        args: &[&OsStr],
        privileged: bool,
    ) -> std::result::Result<(), String>;
}

/// Runs commands on the host, through `sudo` for privileged ones unless already root.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn exists(&self, program: &str) -> bool {
        command_exists(program)
    }

    fn run(
        &self,
        program: &str,
        args: &[&OsStr],
        privileged: bool,
    ) -> std::result::Result<(), String> {
        let mut command = if privileged && needs_sudo() {
            let mut sudo = Command::new("sudo");
            sudo.arg(program);
            sudo
        } else {
            Command::new(program)
        };
        command.args(args);
        log::debug!("Running {}", render(program, args));

        let output = command
            .output()
            .map_err(|e| format!("cannot run `{program}`: {e}"))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(format!(
                "`{program}` failed ({})",
                command_failure_summary(&output)
            ))
        }
    }
}

fn needs_sudo() -> bool {
    !is_root() && command_exists("sudo")
}

#[cfg(unix)]
fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

fn command_exists(name: &str) -> bool {
    command_on_path(name, env::var_os("PATH"))
}

/// An executable named `name` is in one of the `path` directories.
fn command_on_path(name: &str, path: Option<OsString>) -> bool {
    let cwd = env::current_dir().unwrap_or_default();
    which::which_in(name, path, cwd).is_ok()
}

fn command_failure_summary(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !stderr.is_empty() {
        return stderr;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !stdout.is_empty() {
        return stdout;
    }
    match output.status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// One way of making the host trust a CA certificate.
pub trait TrustStore {
    fn name(&self) -> &'static str;

    fn is_available(&self, runner: &dyn CommandRunner) -> bool;

    /// Installs `ca_cert`; `name` is the base filename to install it under.
    fn install(
        &self,
        runner: &dyn CommandRunner,
        ca_cert: &Path,
        name: &str,
    ) -> std::result::Result<(), String>;
}

/// The macOS system keychain.
#[derive(Debug, Default)]
pub struct MacosKeychain;

impl TrustStore for MacosKeychain {
    fn name(&self) -> &'static str {
        "macOS system keychain"
    }

    fn is_available(&self, runner: &dyn CommandRunner) -> bool {
        runner.exists("security")
    }

    fn install(
        &self,
        runner: &dyn CommandRunner,
        ca_cert: &Path,
        _name: &str,
    ) -> std::result::Result<(), String> {
        runner.run(
            "security",
            &[
                OsStr::new("add-trusted-cert"),
                OsStr::new("-d"),
                OsStr::new("-r"),
                OsStr::new("trustRoot"),
                OsStr::new("-k"),
                OsStr::new(MACOS_SYSTEM_KEYCHAIN),
                ca_cert.as_os_str(),
            ],
            true,
        )
    }
}

/// A directory of CA files plus the command that rebuilds the bundle from it.
#[derive(Debug, Clone)]
pub struct AnchorDirectory {
    label: &'static str,
    dir: PathBuf,
    extension: &'static str,
    refresh: &'static str,
    refresh_args: &'static [&'static str],
}

impl AnchorDirectory {
    /// p11-kit trust anchors (Fedora, RHEL, Arch).
    pub fn trust_anchors() -> Self {
        Self {
            label: "ca-trust anchors",
            dir: PathBuf::from(LINUX_TRUST_ANCHORS_DIR),
            extension: "pem",
            refresh: "update-ca-trust",
            refresh_args: &["extract"],
        }
    }

    /// Debian-style local CA certificates.
    pub fn ca_certificates() -> Self {
        Self {
            label: "ca-certificates",
            dir: PathBuf::from(LINUX_CA_CERTIFICATES_DIR),
            extension: "crt",
            refresh: "update-ca-certificates",
            refresh_args: &[],
        }
    }

    /// Same store rooted somewhere else.
    pub fn with_dir(mut self, dir: PathBuf) -> Self {
        self.dir = dir;
        self
    }

    pub fn target(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.extension))
    }
}

impl TrustStore for AnchorDirectory {
    fn name(&self) -> &'static str {
        self.label
    }

    fn is_available(&self, runner: &dyn CommandRunner) -> bool {
        self.dir.is_dir() && runner.exists(self.refresh)
    }

    fn install(
        &self,
        runner: &dyn CommandRunner,
        ca_cert: &Path,
        name: &str,
    ) -> std::result::Result<(), String> {
        let target = self.target(name);
        if target.exists() {
            log::info!("{} already present, refreshing only", target.display());
        } else {
            runner.run("cp", &[ca_cert.as_os_str(), target.as_os_str()], true)?;
        }
        let args: Vec<&OsStr> = self.refresh_args.iter().map(OsStr::new).collect();
        runner.run(self.refresh, &args, true)
    }
}

/// The trust stores of this host, tried in order.
pub struct TrustRegistrar {
    stores: Vec<Box<dyn TrustStore>>,
    runner: Box<dyn CommandRunner>,
}

impl TrustRegistrar {
    pub fn new(stores: Vec<Box<dyn TrustStore>>, runner: Box<dyn CommandRunner>) -> Self {
        Self { stores, runner }
    }

    /// The stores that apply to the platform this binary was built for.
    pub fn for_host() -> Self {
        let stores: Vec<Box<dyn TrustStore>> = if cfg!(target_os = "macos") {
            vec![Box::new(MacosKeychain)]
        } else if cfg!(target_os = "linux") {
            vec![
                Box::new(AnchorDirectory::trust_anchors()),
                Box::new(AnchorDirectory::ca_certificates()),
            ]
        } else {
            Vec::new()
        };
        Self::new(stores, Box::new(SystemRunner))
    }

    /// Installs `ca_cert` into the first store that accepts it and returns that
    /// store's name. Unavailable and failing stores are skipped; when none is left
    /// the reasons are reported together.
    pub fn register(&self, ca_cert: &Path, name: &str) -> Result<&'static str> {
        if self.stores.is_empty() {
            return Err(DevCertsError::UnsupportedPlatform(env::consts::OS.to_string()));
        }

        let mut failures = Vec::new();
        for store in &self.stores {
            if !store.is_available(self.runner.as_ref()) {
                log::debug!("{} is not available", store.name());
                failures.push(format!("{}: not available", store.name()));
                continue;
            }
            log::info!("Adding {} to the {}", ca_cert.display(), store.name());
            match store.install(self.runner.as_ref(), ca_cert, name) {
                Ok(()) => return Ok(store.name()),
                Err(reason) => {
                    log::warn!("{}: {reason}", store.name());
                    failures.push(format!("{}: {reason}", store.name()));
                }
            }
        }
        Err(DevCertsError::Trust(failures.join("; ")))
    }
}

fn render(program: &str, args: &[&OsStr]) -> String {
    std::iter::once(OsString::from(program))
        .chain(args.iter().map(|a| a.to_os_string()))
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
