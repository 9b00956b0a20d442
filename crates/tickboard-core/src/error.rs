use std::fmt;
use std::path::PathBuf;

use crate::model::ParseEnumError;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigReadFailed,
    ConfigParseError,
    ViewDecodeFailed,
    InvalidRefPattern,
    InvalidEnumValue,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigReadFailed => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ViewDecodeFailed => "E2001",
            Self::InvalidRefPattern => "E2002",
            Self::InvalidEnumValue => "E2003",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigReadFailed => "Config file could not be read",
            Self::ConfigParseError => "Config file parse error",
            Self::ViewDecodeFailed => "Saved view could not be decoded",
            Self::InvalidRefPattern => "Invalid ticket reference pattern",
            Self::InvalidEnumValue => "Invalid field/operator/sort/group value",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigReadFailed => Some("Check that the config file is readable."),
            Self::ConfigParseError => Some("Fix syntax in .tickboard/config.toml and retry."),
            Self::ViewDecodeFailed => Some(
                "A view is a JSON object with filters, sort_field, sort_dir, search, group_by.",
            ),
            Self::InvalidRefPattern => Some("Set [refs] pattern to a valid regular expression."),
            Self::InvalidEnumValue => {
                Some("Use one of the documented names; see `tb query --help`.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures at the library boundary. The query, grouping, and selection
/// engines themselves never fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid view: {0}")]
    ViewDecode(#[from] serde_json::Error),

    #[error("invalid reference pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error(transparent)]
    InvalidEnum(#[from] ParseEnumError),
}

impl Error {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::ConfigReadFailed,
            Self::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Self::ViewDecode(_) => ErrorCode::ViewDecodeFailed,
            Self::InvalidPattern(_) => ErrorCode::InvalidRefPattern,
            Self::InvalidEnum(_) => ErrorCode::InvalidEnumValue,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
