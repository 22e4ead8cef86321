use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Caller misuse
    InvalidArgument,
    InvalidLimit,
    DocumentTooLarge,

    NotFound,

    // Undo log / backing store state
    NothingToUndo,
    TargetNotFound,
    AlreadyUndone,
    DuplicateTarget,
    NoPersistenceBackend,

    // Backing store I/O
    Io,
    Serialization,
    Corruption,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidArgument, context.into())
    }

    pub fn not_found(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::NotFound, context.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidArgument | ErrorKind::InvalidLimit | ErrorKind::DocumentTooLarge
        )
    }

    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::NothingToUndo
                | ErrorKind::TargetNotFound
                | ErrorKind::AlreadyUndone
                | ErrorKind::DuplicateTarget
                | ErrorKind::NoPersistenceBackend
        )
    }

    pub fn is_io_failure(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Io | ErrorKind::Serialization | ErrorKind::Corruption
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error {
            kind: ErrorKind::Serialization,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Serialization,
            context: format!("JSON error: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
