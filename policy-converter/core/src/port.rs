use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// A destination port match: an inclusive numeric range (a single port is a range of one) or a
/// port name resolved by the enforcement layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Port {
    Range { min: u16, max: u16 },
    Named(String),
}

/// An IP protocol, either by name (e.g. `TCP`) or by number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    Named(String),
    Number(u8),
}

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum PortParseError {
    #[error("port range must be increasing: {min}:{max}")]
    Decreasing { min: u16, max: u16 },

    #[error("port number out of range: {0}")]
    OutOfRange(i64),

    #[error("invalid port: {0:?}")]
    Invalid(String),
}

// === impl Port ===

impl Port {
    #[inline]
    pub fn single(port: u16) -> Self {
        Self::Range {
            min: port,
            max: port,
        }
    }

    pub fn range(min: u16, max: u16) -> Result<Self, PortParseError> {
        if min > max {
            return Err(PortParseError::Decreasing { min, max });
        }
        Ok(Self::Range { min, max })
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Checks a 32-bit port value (as found in Kubernetes resources) against the 16-bit port
    /// space. Port 0 is not a valid destination.
    pub fn number(port: i32) -> Result<u16, PortParseError> {
        match u16::try_from(port) {
            Ok(0) | Err(_) => Err(PortParseError::OutOfRange(port.into())),
            Ok(port) => Ok(port),
        }
    }
}

impl FromStr for Port {
    type Err = PortParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn parse_num(s: &str) -> Result<u16, PortParseError> {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PortParseError::Invalid(s.to_string()));
            }
            match s.parse::<i64>() {
                Ok(0) => Err(PortParseError::OutOfRange(0)),
                Ok(n) => u16::try_from(n).map_err(|_| PortParseError::OutOfRange(n)),
                Err(_) => Err(PortParseError::Invalid(s.to_string())),
            }
        }

        if let Some((min, max)) = s.split_once(':') {
            return Self::range(parse_num(min)?, parse_num(max)?);
        }

        if s.bytes().next().is_some_and(|b| b.is_ascii_digit()) {
            return parse_num(s).map(Self::single);
        }

        // Port names are IANA service names: alphanumerics and inner hyphens, with at least one
        // letter.
        let valid_name = s.bytes().any(|b| b.is_ascii_alphabetic())
            && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
            && !s.starts_with('-')
            && !s.ends_with('-');
        if !valid_name {
            return Err(PortParseError::Invalid(s.to_string()));
        }
        Ok(Self::Named(s.to_string()))
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range { min, max } if min == max => min.fmt(f),
            Self::Range { min, max } => write!(f, "{min}:{max}"),
            Self::Named(name) => name.fmt(f),
        }
    }
}

impl Serialize for Port {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Range { min, max } if min == max => serializer.serialize_u16(*min),
            port => serializer.collect_str(port),
        }
    }
}

impl<'de> Deserialize<'de> for Port {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u16),
            String(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(port) => Ok(Self::single(port)),
            Raw::String(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

// === impl Protocol ===

impl Protocol {
    pub fn tcp() -> Self {
        Self::Named("TCP".to_string())
    }
}

impl From<&str> for Protocol {
    fn from(s: &str) -> Self {
        match s.parse::<u8>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Named(s.to_string()),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => name.fmt(f),
            Self::Number(n) => n.fmt(f),
        }
    }
}

impl Serialize for Protocol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Named(name) => serializer.serialize_str(name),
            Self::Number(n) => serializer.serialize_u8(*n),
        }
    }
}

impl<'de> Deserialize<'de> for Protocol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u8),
            String(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self::Number(n),
            Raw::String(s) => Self::from(s.as_str()),
        })
    }
}
