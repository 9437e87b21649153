//! Unified error handling for pim-mha
//!
//! Errors only exist at the orchestration boundary: allocating units,
//! uploading tensors, launching and downloading results. Everything that runs
//! inside a lane is infallible given a geometry that passed its compile-time
//! checks; a lane that violates a contract panics and the whole unit is
//! reported as a [`PimError::LaneFault`].

use std::fmt;

/// Unified error type for pim-mha
#[derive(Debug, thiserror::Error)]
pub enum PimError {
    // ========== Launch Errors ==========
    /// The rank granted a different number of units than the geometry needs
    #[error("Unit count mismatch: expected {expected} units, got {actual}")]
    UnitCountMismatch { expected: usize, actual: usize },

    /// A lane panicked; the unit was aborted as a whole
    #[error("Lane {lane} of unit {unit} faulted; unit aborted")]
    LaneFault { unit: usize, lane: usize },

    // ========== Transfer Errors ==========
    /// Host referenced a bulk-memory symbol that was never laid out
    #[error("Unknown bulk-memory symbol: {0}")]
    UnknownSymbol(String),

    /// Transfer would run past the end of a symbol
    #[error("Transfer out of bounds on {symbol}: offset {offset} + {len} > {size}")]
    TransferOutOfBounds {
        symbol: String,
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Transfer offset or length is not a multiple of the block alignment
    #[error("Misaligned transfer: offset {offset}, length {len} (alignment {alignment})")]
    MisalignedTransfer {
        offset: usize,
        len: usize,
        alignment: usize,
    },

    /// Bulk memory layout does not fit the unit
    #[error("Bulk memory exhausted: need {requested} bytes, capacity {capacity}")]
    BulkExhausted { requested: usize, capacity: usize },

    // ========== Scratch Errors ==========
    /// Scratch arena cannot satisfy an allocation
    #[error("Scratch exhausted: need {requested} bytes, {available} available")]
    ScratchExhausted { requested: usize, available: usize },

    // ========== Configuration Errors ==========
    /// Invalid runtime configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Host tensors do not match the geometry
    #[error("Input shape mismatch: {0}")]
    InputShapeMismatch(String),

    // ========== I/O Errors ==========
    /// File I/O error (reports, log files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========== Internal Errors ==========
    /// Lock poisoned (a panic happened while holding it)
    #[error("Internal lock poisoned: {0}")]
    LockPoisoned(String),

    /// Internal error (indicates a bug)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PimError {
    /// Categorize the error for handling decisions
    pub fn category(&self) -> ErrorCategory {
        match self {
            PimError::InvalidConfiguration(_) | PimError::InputShapeMismatch(_) => {
                ErrorCategory::User
            }

            PimError::UnitCountMismatch { .. } | PimError::LaneFault { .. } => {
                ErrorCategory::Launch
            }

            PimError::UnknownSymbol(_)
            | PimError::TransferOutOfBounds { .. }
            | PimError::MisalignedTransfer { .. }
            | PimError::BulkExhausted { .. }
            | PimError::ScratchExhausted { .. } => ErrorCategory::Transfer,

            PimError::Io(_) | PimError::Serialization(_) => ErrorCategory::Io,

            PimError::LockPoisoned(_) | PimError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Fatal errors abort the whole run; there is no partial retry
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Launch | ErrorCategory::Internal
        )
    }

    /// Check if this is a user-facing error (actionable by users)
    pub fn is_user_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::User)
    }
}

/// Error category for handling decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid input or configuration
    User,
    /// Unit allocation or lane execution failed
    Launch,
    /// Bulk or scratch memory contract violated
    Transfer,
    /// File or serialization problem
    Io,
    /// Indicates a bug
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::User => write!(f, "User"),
            ErrorCategory::Launch => write!(f, "Launch"),
            ErrorCategory::Transfer => write!(f, "Transfer"),
            ErrorCategory::Io => write!(f, "Io"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for PimError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        PimError::LockPoisoned(err.to_string())
    }
}

/// Result alias used at the orchestration boundary
pub type PimResult<T> = std::result::Result<T, PimError>;

/// Create an internal error with context
///
/// # Examples
/// ```ignore
/// return Err(internal_error!("record {} missing", slot));
/// ```
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::PimError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::PimError::Internal(format!($fmt, $($arg)*))
    };
}

/// Create a configuration error with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::PimError::InvalidConfiguration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::PimError::InvalidConfiguration(format!($fmt, $($arg)*))
    };
}
