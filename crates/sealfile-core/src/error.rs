use thiserror::Error;

pub type SealResult<T> = Result<T, SealError>;

/// Every failure a transform can surface to its caller.
///
/// Primitive-specific errors never cross the engine boundary; they are
/// reclassified into one of these variants first.
#[derive(Debug, Error)]
pub enum SealError {
    /// Sidecar artifact missing, unreadable, or missing/invalid field
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Padding / block mode / key length combination rejected
    #[error("incompatible parameters: {0}")]
    ParameterIncompatibility(String),

    /// Tag mismatch, or any decrypt failure attributable to a wrong passphrase
    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("crypto provider error: {0}")]
    CryptoProvider(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Payload-free discriminant of [`SealError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    ParameterIncompatibility,
    AuthenticationFailure,
    CryptoProvider,
    Io,
}

impl SealError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SealError::Configuration(_) => ErrorKind::Configuration,
            SealError::ParameterIncompatibility(_) => ErrorKind::ParameterIncompatibility,
            SealError::AuthenticationFailure(_) => ErrorKind::AuthenticationFailure,
            SealError::CryptoProvider(_) => ErrorKind::CryptoProvider,
            SealError::Io(_) => ErrorKind::Io,
        }
    }

    /// Process exit code for this error class (0 and 1 are reserved for
    /// success and "check ran and did not match").
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Configuration => 2,
            ErrorKind::ParameterIncompatibility => 3,
            ErrorKind::AuthenticationFailure => 4,
            ErrorKind::CryptoProvider => 5,
            ErrorKind::Io => 6,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        SealError::Configuration(msg.into())
    }
}
