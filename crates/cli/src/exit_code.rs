//! Exit codes for the GraphQL CLI.
//!
//! Scripts can tell a failed operation apart from a broken setup.

/// Exit codes used by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success - no errors
    Success = 0,
    /// The operation ran and returned errors (or a chunk of a batch did)
    OperationError = 1,
    /// Configuration error (missing or invalid config file, no endpoint)
    ConfigError = 2,
    /// The definitions artifact could not be read or parsed
    DefinitionsError = 3,
    /// The request named a relation, argument or variable the catalog lacks
    BuildError = 4,
    /// The subscription connection could not be established
    ConnectionError = 5,
}

impl ExitCode {
    /// Exit the process with this exit code.
    pub fn exit(self) -> ! {
        std::process::exit(self as i32)
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::OperationError => write!(f, "operation error"),
            Self::ConfigError => write!(f, "configuration error"),
            Self::DefinitionsError => write!(f, "definitions error"),
            Self::BuildError => write!(f, "build error"),
            Self::ConnectionError => write!(f, "connection error"),
        }
    }
}
