//! Credential parsing
//!
//! Device credentials are configured as a single `protocol:secret` string.
//! The protocol tag selects which pairing protocol the secret belongs to;
//! unknown tags fall back to the companion protocol, which is the default
//! for current devices.

use crate::error::{DeviceError, Result};

/// Pairing protocol a credential belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Companion,
    AirPlay,
    Mrp,
    Raop,
    Dmap,
}

impl Protocol {
    /// Parse a protocol tag, case-insensitively. Unknown tags map to
    /// [`Protocol::Companion`].
    fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "companion" => Protocol::Companion,
            "airplay" => Protocol::AirPlay,
            "mrp" => Protocol::Mrp,
            "raop" => Protocol::Raop,
            "dmap" => Protocol::Dmap,
            _ => Protocol::Companion,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Protocol::Companion => "companion",
            Protocol::AirPlay => "airplay",
            Protocol::Mrp => "mrp",
            Protocol::Raop => "raop",
            Protocol::Dmap => "dmap",
        };
        write!(f, "{name}")
    }
}

/// A parsed pairing credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Protocol the secret was issued for
    pub protocol: Protocol,
    /// Opaque pairing secret, passed through to the backend verbatim
    pub secret: String,
}

impl Credential {
    /// Parse a `protocol:secret` pair. The secret may itself contain colons;
    /// only the first one separates the tag.
    pub fn parse(raw: &str) -> Result<Self> {
        let (tag, secret) = raw.split_once(':').ok_or_else(|| {
            DeviceError::InvalidCredential(format!(
                "expected protocol:secret, got {raw:?}"
            ))
        })?;
        if secret.is_empty() {
            return Err(DeviceError::InvalidCredential("empty secret".into()));
        }
        Ok(Self {
            protocol: Protocol::from_tag(tag),
            secret: secret.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_protocol_tag() {
        let credential = Credential::parse("airplay:abc123").unwrap();
        assert_eq!(credential.protocol, Protocol::AirPlay);
        assert_eq!(credential.secret, "abc123");
    }

    #[test]
    fn protocol_tag_is_case_insensitive() {
        let credential = Credential::parse("MRP:secret").unwrap();
        assert_eq!(credential.protocol, Protocol::Mrp);
    }

    #[test]
    fn unknown_tag_falls_back_to_companion() {
        let credential = Credential::parse("mystery:secret").unwrap();
        assert_eq!(credential.protocol, Protocol::Companion);
    }

    #[test]
    fn secret_keeps_embedded_colons() {
        let credential = Credential::parse("companion:aa:bb:cc").unwrap();
        assert_eq!(credential.secret, "aa:bb:cc");
    }

    #[test]
    fn missing_separator_is_an_error() {
        let result = Credential::parse("justasecret");
        assert!(matches!(result, Err(DeviceError::InvalidCredential(_))));
    }

    #[test]
    fn empty_secret_is_an_error() {
        let result = Credential::parse("companion:");
        assert!(matches!(result, Err(DeviceError::InvalidCredential(_))));
    }
}
