//! OpenSSL-style extension configuration files.
//!
//! Only the subset needed to describe a development CA and its leaf certificates is
//! understood: `basicConstraints`, `keyUsage`, `extendedKeyUsage`, `subjectAltName`,
//! `subjectKeyIdentifier` and `authorityKeyIdentifier`. Lines before the first
//! `[section]` header belong to the default section, which is what `-extfile` without
//! `-extensions` uses.

use std::net::IpAddr;
use std::path::Path;

use x509_cert::name::Name;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::extensions::{
    AltName, AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption,
    FlagSet, KeyUsage, KeyUsages, SubjectAltName, SubjectKeyIdentifier,
};
use crate::cert::params::ExtensionParam;
use crate::error::{DevCertsError, Result};

/// Name of the implicit section before any header.
pub const DEFAULT_SECTION: &str = "default";

/// Section name of the built-in CA profile.
pub const CA_SECTION: &str = "v3_ca";

/// Built-in CA profile, the same one `openssl req -x509` applies by default.
pub const CA_EXTENSIONS: &str = "\
[ v3_ca ]
subjectKeyIdentifier = hash
authorityKeyIdentifier = keyid:always,issuer
basicConstraints = critical,CA:true
keyUsage = critical, digitalSignature, keyCertSign, cRLSign
";

/// Renders the extensions file used for a leaf certificate when none was supplied.
pub fn leaf_extensions(san_block: &str) -> String {
    format!(
        "authorityKeyIdentifier=keyid,issuer\n\
         basicConstraints=CA:FALSE\n\
         keyUsage = digitalSignature, nonRepudiation, keyEncipherment, dataEncipherment\n\
         extendedKeyUsage = serverAuth\n\
         subjectAltName = @alt_names\n\
         \n\
         [alt_names]\n\
         {san_block}\n"
    )
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    value: String,
    line: usize,
}

#[derive(Debug, Clone)]
struct Section {
    name: String,
    entries: Vec<Entry>,
}

/// Everything the extension builders need to know about the two parties.
pub struct ExtensionContext<'a> {
    pub subject_public_key: &'a SubjectPublicKeyInfoOwned,
    /// Key identifier of the issuing key.
    pub issuer_key_id: Vec<u8>,
    pub issuer_name: &'a Name,
    pub issuer_serial: &'a [u8],
}

/// A parsed extensions file.
#[derive(Debug, Clone)]
pub struct ExtensionConfig {
    sections: Vec<Section>,
}

impl ExtensionConfig {
    pub fn parse(text: &str) -> Result<Self> {
        let mut sections = vec![Section {
            name: DEFAULT_SECTION.to_string(),
            entries: Vec::new(),
        }];

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let content = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();
            if content.is_empty() {
                continue;
            }

            if let Some(header) = content.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .ok_or_else(|| config_error(line, "unterminated section header"))?
                    .trim();
                if name.is_empty() {
                    return Err(config_error(line, "empty section name"));
                }
                sections.push(Section {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                continue;
            }

            let (key, value) = content
                .split_once('=')
                .ok_or_else(|| config_error(line, "expected `name = value`"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(config_error(line, "missing name before `=`"));
            }
            if let Some(section) = sections.last_mut() {
                section.entries.push(Entry {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                    line,
                });
            }
        }

        Ok(Self { sections })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DevCertsError::io("read extensions file", path, e))?;
        Self::parse(&text)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Builds the extensions listed in `section`, in file order.
    pub fn build_extensions(
        &self,
        section: &str,
        ctx: &ExtensionContext<'_>,
    ) -> Result<Vec<ExtensionParam>> {
        let section = self.section(section).ok_or_else(|| {
            DevCertsError::Validation(format!("no section `{section}` in extensions file"))
        })?;

        section
            .entries
            .iter()
            .map(|entry| self.build_extension(entry, ctx))
            .collect()
    }

    fn build_extension(&self, entry: &Entry, ctx: &ExtensionContext<'_>) -> Result<ExtensionParam> {
        let (critical, items) = split_critical(&entry.value);
        let line = entry.line;

        match entry.key.as_str() {
            "basicConstraints" => {
                let mut constraints = BasicConstraints::default();
                for item in items {
                    let (name, value) = item
                        .split_once(':')
                        .ok_or_else(|| config_error(line, format!("bad basicConstraints `{item}`")))?;
                    match (name.trim(), value.trim()) {
                        ("CA", v) => constraints.is_ca = parse_bool(v, line)?,
                        ("pathlen", v) => {
                            constraints.max_path_length = Some(v.parse().map_err(|_| {
                                config_error(line, format!("bad pathlen `{v}`"))
                            })?)
                        }
                        _ => return Err(config_error(line, format!("bad basicConstraints `{item}`"))),
                    }
                }
                ExtensionParam::from_extension(constraints, critical)
            }
            "keyUsage" => {
                let mut flags: FlagSet<KeyUsages> = FlagSet::empty();
                for item in items {
                    flags |= match item {
                        "digitalSignature" => KeyUsages::DigitalSignature,
                        "nonRepudiation" => KeyUsages::NonRepudiation,
                        "keyEncipherment" => KeyUsages::KeyEncipherment,
                        "dataEncipherment" => KeyUsages::DataEncipherment,
                        "keyAgreement" => KeyUsages::KeyAgreement,
                        "keyCertSign" => KeyUsages::KeyCertSign,
                        "cRLSign" => KeyUsages::CRLSign,
                        "encipherOnly" => KeyUsages::EncipherOnly,
                        "decipherOnly" => KeyUsages::DecipherOnly,
                        other => return Err(config_error(line, format!("unknown key usage `{other}`"))),
                    };
                }
                ExtensionParam::from_extension(KeyUsage(flags), critical)
            }
            "extendedKeyUsage" => {
                let usage = items
                    .into_iter()
                    .map(|item| match item {
                        "serverAuth" => Ok(ExtendedKeyUsageOption::ServerAuth),
                        "clientAuth" => Ok(ExtendedKeyUsageOption::ClientAuth),
                        "codeSigning" => Ok(ExtendedKeyUsageOption::CodeSigning),
                        "emailProtection" => Ok(ExtendedKeyUsageOption::EmailProtection),
                        "timeStamping" => Ok(ExtendedKeyUsageOption::TimeStamping),
                        "OCSPSigning" => Ok(ExtendedKeyUsageOption::OcspSigning),
                        other => Err(config_error(
                            line,
                            format!("unknown extended key usage `{other}`"),
                        )),
                    })
                    .collect::<Result<Vec<_>>>()?;
                ExtensionParam::from_extension(ExtendedKeyUsage { usage }, critical)
            }
            "subjectAltName" => {
                let mut names = Vec::new();
                for item in items {
                    if let Some(reference) = item.strip_prefix('@') {
                        let section = self.section(reference.trim()).ok_or_else(|| {
                            config_error(line, format!("no section `{reference}`"))
                        })?;
                        for alt in &section.entries {
                            let kind = alt.key.split('.').next().unwrap_or_default();
                            names.push(alt_name(kind, &alt.value, alt.line)?);
                        }
                    } else {
                        let (kind, value) = item
                            .split_once(':')
                            .ok_or_else(|| config_error(line, format!("bad subjectAltName `{item}`")))?;
                        names.push(alt_name(kind.trim(), value.trim(), line)?);
                    }
                }
                ExtensionParam::from_extension(SubjectAltName { names }, critical)
            }
            "subjectKeyIdentifier" => match items.as_slice() {
                ["hash"] => ExtensionParam::from_extension(
                    SubjectKeyIdentifier::from_spki(ctx.subject_public_key),
                    critical,
                ),
                _ => Err(config_error(line, "only `subjectKeyIdentifier = hash` is supported")),
            },
            "authorityKeyIdentifier" => {
                let mut aki = AuthorityKeyIdentifier::default();
                for item in items {
                    match item {
                        "keyid" | "keyid:always" => {
                            aki.key_identifier = Some(ctx.issuer_key_id.clone())
                        }
                        // only added when no key id is available, and one always is
                        "issuer" => {}
                        "issuer:always" => {
                            aki.authority_cert_issuer = Some(ctx.issuer_name.clone());
                            aki.authority_cert_serial_number = Some(ctx.issuer_serial.to_vec());
                        }
                        other => {
                            return Err(config_error(
                                line,
                                format!("bad authorityKeyIdentifier `{other}`"),
                            ));
                        }
                    }
                }
                ExtensionParam::from_extension(aki, critical)
            }
            other => Err(config_error(line, format!("unsupported extension `{other}`"))),
        }
    }
}

fn split_critical(value: &str) -> (bool, Vec<&str>) {
    let mut items: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();
    let critical = items.first() == Some(&"critical");
    if critical {
        items.remove(0);
    }
    (critical, items)
}

fn parse_bool(value: &str, line: usize) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" => Ok(true),
        "false" | "no" | "n" => Ok(false),
        _ => Err(config_error(line, format!("expected TRUE or FALSE, got `{value}`"))),
    }
}

fn alt_name(kind: &str, value: &str, line: usize) -> Result<AltName> {
    match kind {
        "DNS" => Ok(AltName::Dns(value.to_string())),
        "email" => Ok(AltName::Email(value.to_string())),
        "IP" => value
            .parse::<IpAddr>()
            .map(AltName::Ip)
            .map_err(|_| config_error(line, format!("bad IP address `{value}`"))),
        other => Err(config_error(line, format!("unsupported alternative name type `{other}`"))),
    }
}

fn config_error(line: usize, message: impl Into<String>) -> DevCertsError {
    DevCertsError::ExtensionConfig {
        line,
        message: message.into(),
    }
}
