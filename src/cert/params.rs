use bon::Builder;
use const_oid::ObjectIdentifier;
use der::{Tag, Tagged};
use der::asn1::{Any, SetOfVec};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::error::DevCertsError;
use crate::key::PublicKey;

const COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const STATE_OR_PROVINCE_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const LOCALITY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const ORGANIZATIONAL_UNIT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const EMAIL_ADDRESS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.1");

/// Parameters for building an X.509 certificate.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - The X.509 extensions, already encoded.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: Name,
    pub subject_public_key: PublicKey,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

/// Distinguished name parameters for building an X.509 certificate.
///
/// Fields are written in the fixed order C, ST, L, O, OU, CN, emailAddress and unset
/// fields are left out entirely.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
    pub email: Option<String>,
}

impl DistinguishedName {
    /// Parses an OpenSSL `-subj` style string such as `/C=US/O=Org/CN=example.com`.
    ///
    /// A backslash escapes the following character, so `\/` is a literal slash.
    pub fn parse_openssl_subject(subject: &str) -> Result<Self, DevCertsError> {
        let body = subject.strip_prefix('/').ok_or_else(|| {
            DevCertsError::InvalidInput(format!("subject `{subject}` must start with `/`"))
        })?;

        let mut components = Vec::new();
        let mut current = String::new();
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => {
                        return Err(DevCertsError::InvalidInput(format!(
                            "subject `{subject}` ends with a dangling escape"
                        )));
                    }
                },
                '/' => components.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        components.push(current);

        let mut dn = DistinguishedName::default();
        for component in components.into_iter().filter(|c| !c.is_empty()) {
            let (field, value) = component.split_once('=').ok_or_else(|| {
                DevCertsError::InvalidInput(format!("subject component `{component}` has no `=`"))
            })?;
            let value = value.to_string();
            match field {
                "C" => dn.country = Some(value),
                "ST" => dn.state = Some(value),
                "L" => dn.locality = Some(value),
                "O" => dn.organization = Some(value),
                "OU" => dn.organization_unit = Some(value),
                "CN" => dn.common_name = value,
                "emailAddress" => dn.email = Some(value),
                other => {
                    return Err(DevCertsError::InvalidInput(format!(
                        "unknown subject field `{other}`"
                    )));
                }
            }
        }

        if dn.common_name.is_empty() {
            return Err(DevCertsError::InvalidInput(format!(
                "subject `{subject}` has no CN"
            )));
        }
        Ok(dn)
    }

    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// Country is encoded as a PrintableString, email as an IA5String and every other
    /// field as a UTF8String, matching what `openssl req` produces.
    pub fn as_x509_name(&self) -> Result<Name, DevCertsError> {
        let mut rdns = Vec::new();

        if let Some(country) = &self.country {
            if country.chars().count() != 2 {
                return Err(DevCertsError::InvalidInput(format!(
                    "country `{country}` must be a two letter code"
                )));
            }
            rdns.push(rdn(COUNTRY_NAME, Tag::PrintableString, country)?);
        }
        let utf8_fields = [
            (STATE_OR_PROVINCE_NAME, &self.state),
            (LOCALITY_NAME, &self.locality),
            (ORGANIZATION_NAME, &self.organization),
            (ORGANIZATIONAL_UNIT_NAME, &self.organization_unit),
        ];
        for (oid, value) in utf8_fields {
            if let Some(value) = value {
                rdns.push(rdn(oid, Tag::Utf8String, value)?);
            }
        }
        rdns.push(rdn(COMMON_NAME, Tag::Utf8String, &self.common_name)?);
        if let Some(email) = &self.email {
            if !email.is_ascii() {
                return Err(DevCertsError::InvalidInput(format!(
                    "email `{email}` must be ASCII"
                )));
            }
            rdns.push(rdn(EMAIL_ADDRESS, Tag::Ia5String, email)?);
        }

        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509 name.
    ///
    /// Attributes outside the seven supported fields are ignored.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        let mut dn = DistinguishedName::default();

        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let Some(value) = attribute_string(attr) else {
                    continue;
                };
                match attr.oid {
                    COUNTRY_NAME => dn.country = Some(value),
                    STATE_OR_PROVINCE_NAME => dn.state = Some(value),
                    LOCALITY_NAME => dn.locality = Some(value),
                    ORGANIZATION_NAME => dn.organization = Some(value),
                    ORGANIZATIONAL_UNIT_NAME => dn.organization_unit = Some(value),
                    COMMON_NAME => dn.common_name = value,
                    EMAIL_ADDRESS => dn.email = Some(value),
                    _ => {}
                }
            }
        }

        dn
    }
}

fn rdn(
    oid: ObjectIdentifier,
    tag: Tag,
    value: &str,
) -> Result<RelativeDistinguishedName, DevCertsError> {
    let atv = AttributeTypeAndValue {
        oid,
        value: Any::new(tag, value.as_bytes())?,
    };
    Ok(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?))
}

fn attribute_string(attr: &AttributeTypeAndValue) -> Option<String> {
    match attr.value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::TeletexString => {
            String::from_utf8(attr.value.value().to_vec()).ok()
        }
        _ => None,
    }
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    ///
    /// # Arguments
    /// * `days` - The number of days for the validity period.
    ///
    /// # Returns
    /// A `Validity` object, or a validation error when the end of the period is
    /// past what a certificate can express.
    pub fn for_days(days: i64) -> Result<Self, DevCertsError> {
        let now = OffsetDateTime::now_utc();
        let not_after = now
            .checked_add(Duration::days(days))
            .filter(|end| end.year() <= 9999)
            .ok_or_else(|| {
                DevCertsError::Validation(format!("a validity of {days} days ends after 9999"))
            })?;
        Ok(Self {
            not_before: now,
            not_after,
        })
    }
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    ///
    /// # Arguments
    /// * `extension` - The extension to encode.
    /// * `critical` - Indicates if the extension is critical.
    pub fn from_extension<E: ToAndFromX509Extension>(
        extension: E,
        critical: bool,
    ) -> Result<Self, DevCertsError> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    ///
    /// # Returns
    /// A decoded extension object.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E, DevCertsError> {
        E::from_x509_extension_value(&self.value)
    }
}
