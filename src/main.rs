use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use devcerts::error::DevCertsError;
use devcerts::options::{self, Config, Invocation};
use devcerts::prompt::Prompter;
use devcerts::trust::TrustRegistrar;
use devcerts::workflow;

fn main() -> ExitCode {
    // narration on stdout, plain for info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .format(|buf, record| match record.level() {
            log::Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "[{level}] {}", record.args()),
        })
        .init();

    match real_main() {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<DevCertsError>() {
                // clap already rendered the message and usage line
                Some(DevCertsError::Usage(rendered)) => eprintln!("{}", rendered.trim_end()),
                _ => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn real_main() -> Result<ExitCode> {
    let cli = match options::parse_args(std::env::args_os())? {
        Invocation::Print(text) => {
            print!("{text}");
            return Ok(ExitCode::SUCCESS);
        }
        Invocation::Run(cli) => *cli,
    };

    let cwd = std::env::current_dir().context("cannot determine the current directory")?;
    let (config, fields) = Config::resolve(cli, &cwd)?;

    let stdin = io::stdin();
    let subject = Prompter::new(stdin.lock(), io::stdout(), config.mode).complete(fields)?;
    log::debug!("Subject {}", subject.dn_string());

    let report = workflow::run(&config, &subject, &TrustRegistrar::for_host())?;
    if let Some(err) = &report.trust_error {
        eprintln!("Error: {err}");
    }
    Ok(ExitCode::from(report.exit_code()))
}
