//! Error types for the binding layer
//!
//! Native failures carry the libgit2 error code, class and message. Contract
//! violations (out-of-range view access, bad substitutions, calls made in the
//! wrong walker state) get their own variants so callers can tell a caller
//! bug apart from an engine failure. Expected terminations such as the end of
//! a revision walk are not errors at all; those are `Ok(None)`.

use std::ffi::CStr;

use libc::c_int;
use thiserror::Error;

use crate::native::raw;

/// the main error type for binding operations
#[derive(Debug, Error)]
pub enum GgitError {
    /// failure reported by the native engine
    #[error("native error {code} (class {class}): {message}")]
    Native {
        code: i32,
        class: i32,
        message: String,
    },

    /// the identifier is malformed or does not name a usable commit
    #[error("invalid object id: {0}")]
    InvalidOId(String),

    /// no object with the given id exists in the store
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// no reference with the given name exists
    #[error("reference not found: {0}")]
    ReferenceNotFound(String),

    /// the object exists but is of another kind
    #[error("unexpected object kind: expected {expected}, found {found}")]
    UnexpectedKind {
        expected: &'static str,
        found: &'static str,
    },

    /// view access past the owner's current extent
    #[error("index {index} out of range for collection of {len}")]
    OutOfRange { index: usize, len: usize },

    /// substitution with a type that does not derive from the base
    #[error("{subtype} does not derive from {base}")]
    NotDerived {
        base: &'static str,
        subtype: &'static str,
    },

    /// a registered constructor built something other than its subtype
    #[error("constructor registered for {expected} built {built}")]
    SubstitutionMismatch {
        expected: &'static str,
        built: &'static str,
    },

    /// the call is not allowed in the current state
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// the path cannot be passed to the native engine
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// malformed JSON input
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (filesystem level)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GgitError {
    /// capture the engine's last error for a failed native call
    pub(crate) fn from_native(code: c_int) -> Self {
        // SAFETY: git_error_last returns either null or a pointer to the
        // thread-local error record, valid until the next native call.
        let (class, message) = unsafe {
            let err = raw::git_error_last();
            if err.is_null() || (*err).message.is_null() {
                (0, String::from("unknown native error"))
            } else {
                let message = CStr::from_ptr((*err).message).to_string_lossy().into_owned();
                ((*err).klass, message)
            }
        };

        GgitError::Native {
            code,
            class,
            message,
        }
    }

    /// replace an engine "not found" with a more specific error
    pub(crate) fn or_not_found(self, f: impl FnOnce() -> GgitError) -> GgitError {
        if self.code() == Some(raw::GIT_ENOTFOUND) {
            f()
        } else {
            self
        }
    }

    /// the native error code, if this came from the engine
    pub fn code(&self) -> Option<i32> {
        match self {
            GgitError::Native { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GgitError::ObjectNotFound(_) | GgitError::ReferenceNotFound(_)
        ) || self.code() == Some(raw::GIT_ENOTFOUND)
    }

    /// check if this error is a caller bug rather than an engine failure
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            GgitError::OutOfRange { .. }
                | GgitError::NotDerived { .. }
                | GgitError::SubstitutionMismatch { .. }
                | GgitError::Precondition(_)
                | GgitError::InvalidPath(_)
        )
    }
}

/// result type alias for binding operations
pub type GgitResult<T> = Result<T, GgitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let missing = GgitError::ObjectNotFound("abc".into());
        assert!(missing.is_not_found());
        assert!(!missing.is_contract_violation());

        let oob = GgitError::OutOfRange { index: 4, len: 2 };
        assert!(oob.is_contract_violation());
        assert!(!oob.is_not_found());
        assert_eq!(oob.code(), None);
    }

    #[test]
    fn test_native_not_found_code() {
        let err = GgitError::Native {
            code: raw::GIT_ENOTFOUND,
            class: 0,
            message: "nope".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.code(), Some(raw::GIT_ENOTFOUND));

        let mapped = err.or_not_found(|| GgitError::ReferenceNotFound("refs/heads/x".into()));
        assert!(matches!(mapped, GgitError::ReferenceNotFound(_)));
    }

    #[test]
    fn test_other_codes_pass_through() {
        let err = GgitError::Native {
            code: -1,
            class: 0,
            message: "boom".into(),
        };
        let mapped = err.or_not_found(|| GgitError::ObjectNotFound("x".into()));
        assert_eq!(mapped.code(), Some(-1));
    }
}
