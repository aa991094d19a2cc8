/// Error type shared by every vector-commitment operation.
#[derive(Debug)]
pub enum VcsError {
    /// Two lengths that must agree do not
    SizeMismatch {
        /// What was being checked
        context: &'static str,
        /// Length required by the parameters
        expected: usize,
        /// Length actually supplied
        found: usize,
    },
    /// Height, level or index outside the domain of the tree
    Domain(String),
    /// Stored key material is shorter than the requested height needs
    KeyMaterialIncomplete {
        /// Which record was short
        context: String,
        /// Number of elements (or bytes) required
        expected: u64,
        /// Number of elements (or bytes) available
        found: u64,
    },
    /// Invalid configuration parameter
    InvalidConfig(String),
    /// Filesystem error from the persistence layer
    Io(String),
    /// Group or field element failed to encode or decode
    Serialization(String),
    /// Arithmetic backend or worker failure
    Backend(String),
}

impl VcsError {
    pub(crate) fn size_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        VcsError::SizeMismatch {
            context,
            expected,
            found,
        }
    }
}

impl std::fmt::Display for VcsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VcsError::SizeMismatch {
                context,
                expected,
                found,
            } => write!(
                f,
                "Size mismatch in {}: expected {}, found {}",
                context, expected, found
            ),
            VcsError::Domain(msg) => write!(f, "Domain error: {}", msg),
            VcsError::KeyMaterialIncomplete {
                context,
                expected,
                found,
            } => write!(
                f,
                "Key material incomplete ({}): need {}, found {}",
                context, expected, found
            ),
            VcsError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            VcsError::Io(msg) => write!(f, "I/O error: {}", msg),
            VcsError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            VcsError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for VcsError {}

impl From<std::io::Error> for VcsError {
    fn from(err: std::io::Error) -> Self {
        VcsError::Io(err.to_string())
    }
}

impl From<ark_serialize::SerializationError> for VcsError {
    fn from(err: ark_serialize::SerializationError) -> Self {
        VcsError::Serialization(err.to_string())
    }
}
