#![allow(dead_code)]

use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::Path;

use devcerts::error::{DevCertsError, Result};
use devcerts::options::{self, Config, Invocation};
use devcerts::prompt::Prompter;
use devcerts::trust::{CommandRunner, TrustRegistrar};
use devcerts::workflow::{self, Report};

/// A runner for tests that must never touch the host trust store.
pub struct NoCommands;

impl CommandRunner for NoCommands {
    fn exists(&self, _program: &str) -> bool {
        false
    }

    fn run(
        &self,
        program: &str,
        _args: &[&std::ffi::OsStr],
        _privileged: bool,
    ) -> std::result::Result<(), String> {
        Err(format!("`{program}` is not run in tests"))
    }
}

/// Runs the whole tool as `devcerts <args>` from `cwd`, answering prompts with `answers`.
pub fn run_devcerts(cwd: &Path, args: &[&str], answers: &str) -> Result<Report> {
    let argv = std::iter::once("devcerts").chain(args.iter().copied());
    let cli = match options::parse_args(argv)? {
        Invocation::Run(cli) => *cli,
        Invocation::Print(text) => {
            return Err(DevCertsError::Usage(format!("unexpected output: {text}")));
        }
    };
    let (config, fields) = Config::resolve(cli, cwd)?;
    let subject = Prompter::new(Cursor::new(answers.as_bytes()), std::io::sink(), config.mode)
        .complete(fields)?;
    let registrar = TrustRegistrar::new(Vec::new(), Box::new(NoCommands));
    workflow::run(&config, &subject, &registrar)
}

/// File names directly inside `dir`.
pub fn file_names(dir: &Path) -> BTreeSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

pub fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// The smallest key size that keeps test runs quick.
pub const TEST_BITS: &str = "1024";
