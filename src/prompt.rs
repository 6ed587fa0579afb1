//! Fills in subject fields the command line left unset, asking on a terminal the
//! way `openssl req` does.

use std::io::{BufRead, Write};

use crate::error::{DevCertsError, Result};
use crate::options::Mode;
use crate::subject::{Subject, SubjectFields};

/// Answer that leaves a field blank even when it has a default.
const BLANK: &str = ".";

struct Question {
    label: &'static str,
    default: &'static str,
}

const COUNTRY: Question = Question {
    label: "Country Name (2 letter code)",
    default: "AU",
};
const STATE: Question = Question {
    label: "State or Province Name (full name)",
    default: "Some-State",
};
const LOCALITY: Question = Question {
    label: "Locality Name (eg, city)",
    default: "",
};
const ORGANIZATION: Question = Question {
    label: "Organization Name (eg, company)",
    default: "Internet Widgits Pty Ltd",
};
const UNIT: Question = Question {
    label: "Organizational Unit Name (eg, section)",
    default: "",
};
const COMMON_NAME: Question = Question {
    label: "Common Name (e.g. server FQDN or YOUR name)",
    default: "",
};
const ALT_NAMES: Question = Question {
    label: "Subject Alternative Names (comma separated)",
    default: "",
};
const EMAIL: Question = Question {
    label: "Email Address",
    default: "",
};

/// Reads answers from `input`, writes questions to `output`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
    mode: Mode,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W, mode: Mode) -> Self {
        Self {
            input,
            output,
            mode,
        }
    }

    /// Completes `fields` into a [`Subject`].
    ///
    /// Non-interactive runs only ever ask for a missing common name. A common name
    /// that is still blank afterwards is a configuration error.
    pub fn complete(&mut self, fields: SubjectFields) -> Result<Subject> {
        let interactive = self.mode == Mode::Interactive;
        // the SAN question only makes sense when the user gave no names at all
        let ask_alt_names =
            interactive && fields.alt_names.is_none() && fields.common_name.is_none();

        let country = self.fill(fields.country, &COUNTRY, interactive)?;
        let state = self.fill(fields.state, &STATE, interactive)?;
        let locality = self.fill(fields.locality, &LOCALITY, interactive)?;
        let organization = self.fill(fields.organization, &ORGANIZATION, interactive)?;
        let unit = self.fill(fields.unit, &UNIT, interactive)?;
        let common_name = self
            .fill(fields.common_name, &COMMON_NAME, true)?
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| DevCertsError::Config("a common name is required".to_string()))?;
        let alt_names = self.fill(fields.alt_names, &ALT_NAMES, ask_alt_names)?;
        let email = self.fill(fields.email, &EMAIL, interactive)?;

        Ok(Subject {
            country,
            state,
            locality,
            organization,
            unit,
            common_name: common_name.trim().to_string(),
            email,
            alt_names,
        })
    }

    fn fill(
        &mut self,
        value: Option<String>,
        question: &Question,
        ask: bool,
    ) -> Result<Option<String>> {
        match value {
            Some(value) => Ok(Some(value)),
            None if ask => self.ask(question),
            None => Ok(None),
        }
    }

    fn ask(&mut self, question: &Question) -> Result<Option<String>> {
        write!(self.output, "{} [{}]: ", question.label, question.default)
            .and_then(|_| self.output.flush())
            .map_err(|e| DevCertsError::Config(format!("cannot write prompt: {e}")))?;

        let mut line = String::new();
        // end of input reads as an empty answer
        self.input
            .read_line(&mut line)
            .map_err(|e| DevCertsError::Config(format!("cannot read answer: {e}")))?;

        let answer = line.trim();
        let value = match answer {
            BLANK => "",
            "" => question.default,
            other => other,
        };
        Ok((!value.is_empty()).then(|| value.to_string()))
    }
}
