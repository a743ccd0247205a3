use exbridge_core_types::RequestId;
use thiserror::Error;

/// Result type alias using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that is used in structured logs
/// and in HTTP error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Snapshot parsing
    /// Exchanged content is not valid JSON
    Malformed,
    /// Exchanged content is valid JSON but its top level is not an object
    InvalidShape,

    // Notification
    /// A change subscriber returned an error or panicked
    SubscriberFailure,

    // Query
    NotFound,

    // Integration/IO
    Io,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Malformed => "ERR_MALFORMED",
            ExErrorKind::InvalidShape => "ERR_INVALID_SHAPE",
            ExErrorKind::SubscriberFailure => "ERR_SUBSCRIBER_FAILURE",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling plus the key and
/// request context that produced it.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    key: Option<String>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            key: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add snapshot key context
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the key context, if any
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {})", key)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for exbridge operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    // ===== Parse Errors =====
    /// Exchanged content is not valid JSON
    #[error("Malformed snapshot at line {line}, column {column}: {reason}")]
    Malformed {
        reason: String,
        line: usize,
        column: usize,
    },

    /// Top level of the exchanged document is not an object
    #[error("Invalid snapshot shape: expected a top-level object, found {found}")]
    InvalidShape { found: &'static str },

    // ===== Notification Errors =====
    /// A subscriber failed while handling a key event
    #[error("Subscriber {subscription} failed on key {key}: {reason}")]
    SubscriberFailed {
        subscription: u64,
        key: String,
        reason: String,
    },

    // ===== Query Errors =====
    /// No entry exists for the requested key
    #[error("Key not found: {key}")]
    KeyNotFound { key: String },

    // ===== Integration Errors =====
    /// Filesystem access failed
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Configuration could not be loaded or is invalid
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BridgeError {
    /// Canonical kind of this error
    pub fn kind(&self) -> ExErrorKind {
        match self {
            BridgeError::Malformed { .. } => ExErrorKind::Malformed,
            BridgeError::InvalidShape { .. } => ExErrorKind::InvalidShape,
            BridgeError::SubscriberFailed { .. } => ExErrorKind::SubscriberFailure,
            BridgeError::KeyNotFound { .. } => ExErrorKind::NotFound,
            BridgeError::Io { .. } => ExErrorKind::Io,
            BridgeError::Config { .. } => ExErrorKind::Config,
            BridgeError::Internal { .. } => ExErrorKind::Internal,
        }
    }

    /// Build an `Io` error for the given path
    pub fn io(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        BridgeError::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// True for errors produced by the snapshot parser
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            BridgeError::Malformed { .. } | BridgeError::InvalidShape { .. }
        )
    }
}

/// Conversion from BridgeError to ExError
impl From<BridgeError> for ExError {
    fn from(err: BridgeError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        match err {
            BridgeError::Malformed { .. } => ExError::new(kind)
                .with_op("parse_snapshot")
                .with_message(message),

            BridgeError::InvalidShape { .. } => ExError::new(kind)
                .with_op("parse_snapshot")
                .with_message(message),

            BridgeError::SubscriberFailed { key, .. } => ExError::new(kind)
                .with_op("notify")
                .with_key(key)
                .with_message(message),

            BridgeError::KeyNotFound { key } => ExError::new(kind)
                .with_op("get_current_entry")
                .with_key(key)
                .with_message("Key not found"),

            BridgeError::Io { .. } | BridgeError::Config { .. } | BridgeError::Internal { .. } => {
                ExError::new(kind).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to BridgeError
impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Malformed {
            reason: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}
