//! The certificate subject and everything derived from it: the OpenSSL-style DN
//! string, the `[alt_names]` block and the base filename of the artefacts.

use crate::cert::params::DistinguishedName;
use crate::error::Result;

/// Subject fields as they arrive from the command line, before prompting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectFields {
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub unit: Option<String>,
    pub common_name: Option<String>,
    /// Comma separated extra names.
    pub alt_names: Option<String>,
    pub email: Option<String>,
}

/// A complete subject. Only the common name is mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub unit: Option<String>,
    pub common_name: String,
    pub email: Option<String>,
    /// Extra SAN entries, raw and comma separated as typed.
    pub alt_names: Option<String>,
}

impl Subject {
    /// The DN in `openssl req -subj` form: `/C=../ST=../L=../O=../OU=../CN=../emailAddress=..`.
    pub fn dn_string(&self) -> String {
        let fields = [
            ("C", self.country.as_deref()),
            ("ST", self.state.as_deref()),
            ("L", self.locality.as_deref()),
            ("O", self.organization.as_deref()),
            ("OU", self.unit.as_deref()),
            ("CN", Some(self.common_name.as_str())),
            ("emailAddress", self.email.as_deref()),
        ];

        fields
            .into_iter()
            .filter_map(|(field, value)| {
                value
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| format!("/{field}={}", escape_dn_value(v)))
            })
            .collect()
    }

    /// All DNS names the certificate is valid for: the common name first, then each
    /// comma separated extra name. Whitespace inside a name is dropped, blank names
    /// are skipped.
    pub fn dns_names(&self) -> Vec<String> {
        std::iter::once(self.common_name.as_str())
            .chain(self.alt_names.as_deref().unwrap_or_default().split(','))
            .map(|name| name.chars().filter(|c| !c.is_whitespace()).collect::<String>())
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// The `[alt_names]` body: `DNS.1 = ...` lines, numbered without gaps.
    pub fn san_block(&self) -> String {
        self.dns_names()
            .iter()
            .enumerate()
            .map(|(i, name)| format!("DNS.{} = {name}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Base filename of every artefact: the common name without a leading `*.`.
    pub fn file_name(&self) -> String {
        let name = self.common_name.trim();
        name.strip_prefix("*.").unwrap_or(name).to_string()
    }

    /// The structured name used for the CA and the request, parsed back from
    /// [`Subject::dn_string`].
    pub fn distinguished_name(&self) -> Result<DistinguishedName> {
        DistinguishedName::parse_openssl_subject(&self.dn_string())
    }
}

fn escape_dn_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('/', "\\/")
}
