use std::fmt;

/// Errors from reading JVM listings and building method bodies
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// Malformed line in a textual listing
    Parse { line: usize, message: String },

    /// Field or method descriptor that does not parse
    BadDescriptor(String),

    /// Method body whose labels, handlers, or control flow don't make sense
    InvalidMethod { method: String, message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::Parse { line, message } => write!(f, "line {}: {}", line, message),
            Error::BadDescriptor(message) => f.write_str(message),
            Error::InvalidMethod { method, message } => {
                write!(f, "invalid method {}: {}", method, message)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
