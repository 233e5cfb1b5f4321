use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_body {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// Enumerated weaving failure codes, surfaced to the host alongside the error message.
///
/// Every fatal weaving condition maps to exactly one code; the host reports the code
/// and the [`Error`]'s rendered message verbatim as a build failure. Conditions that
/// indicate an internal or malformed-input failure rather than a weaving rule
/// violation map to [`WeavingErrorCode::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum WeavingErrorCode {
    /// Unknown or internal error.
    None,
    /// A type implements both the synchronous and asynchronous disposal contracts.
    ContainsBothInterfaces,
    /// A type already declares a disposed-state member that does not match the expected shape.
    ContainsIncompatibleExistingMember,
    /// The disposed-state property could not be resolved during guard injection.
    PropertyNotFound,
    /// No reachable, overridable dispose method exists anywhere in a type's ancestor chain.
    BaseMethodNotFound,
    /// A required external reference could not be resolved from the module.
    UnknownReference,
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The weaving-specific variants carry an enumerated [`WeavingErrorCode`] retrievable
/// through [`Error::code`]; the remaining variants cover malformed input models and
/// internal lookup failures.
///
/// # Examples
///
/// ```rust,no_run
/// use dotweave::{Error, WeavingErrorCode, Weaver, metadata::Module};
///
/// let mut module = Module::new("App.dll");
/// match Weaver::new().execute(&mut module) {
///     Ok(report) => println!("woven {} types", report.discovered),
///     Err(e @ Error::ContainsBothInterfaces { .. }) => {
///         assert_eq!(e.code(), WeavingErrorCode::ContainsBothInterfaces);
///         eprintln!("{e}");
///     }
///     Err(e) => eprintln!("weaving failed: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A type implements both the synchronous and asynchronous disposal contracts,
    /// directly or through its ancestor chain. Raised during validation, before any
    /// mutation of the module.
    #[error("The type '{type_name}' cannot implement both the synchronous and asynchronous disposal contracts")]
    ContainsBothInterfaces {
        /// Full name of the offending type
        type_name: String,
    },

    /// A type already declares a disposed-state member whose shape does not match
    /// what the weaver would synthesize. Raised during validation.
    #[error("The type '{type_name}' already contains a member '{member}' that is not useable: {reason}")]
    IncompatibleExistingMember {
        /// Full name of the offending type
        type_name: String,
        /// Name of the conflicting member
        member: String,
        /// Why the member cannot be reused
        reason: String,
    },

    /// The disposed-state property could not be resolved for a type slated for
    /// guarding: the type owns neither a local disposed-state property nor an
    /// ancestor that exposes one.
    #[error("Cannot find the property 'IsDisposed' on '{type_name}' or its ancestors for determining whether the object is already disposed")]
    PropertyNotFound {
        /// Full name of the type being guarded
        type_name: String,
    },

    /// A type implements a disposal contract but declares no dispose method of its
    /// own, and no overridable dispose method is reachable through its ancestor chain.
    #[error("The type '{type_name}' has no overridable '{method}' method anywhere in its ancestor chain")]
    BaseMethodNotFound {
        /// Full name of the offending type
        type_name: String,
        /// Name of the dispose method that could not be found
        method: String,
    },

    /// A required external reference (exception constructor, continuation-registration
    /// method, callback constructor, generated-code marker) could not be resolved from
    /// the module's reference table. Raised at setup, before discovery.
    #[error("The required external reference '{0}' could not be resolved from the module")]
    UnknownReference(String),

    /// An instruction stream or method body violates an invariant the weaver relies on,
    /// such as a dispose method without a return instruction or a splice that would
    /// collide with existing labels. The error includes the source location where the
    /// malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Failed to find a type for the given token in the module.
    #[error("Failed to find type in module - {0}")]
    TypeNotFound(Token),

    /// Failed to find a method for the given token in the module.
    #[error("Failed to find method in module - {0}")]
    MethodNotFound(Token),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns the enumerated [`WeavingErrorCode`] for this error.
    ///
    /// Variants outside the weaving taxonomy map to [`WeavingErrorCode::None`].
    #[must_use]
    pub fn code(&self) -> WeavingErrorCode {
        match self {
            Error::ContainsBothInterfaces { .. } => WeavingErrorCode::ContainsBothInterfaces,
            Error::IncompatibleExistingMember { .. } => {
                WeavingErrorCode::ContainsIncompatibleExistingMember
            }
            Error::PropertyNotFound { .. } => WeavingErrorCode::PropertyNotFound,
            Error::BaseMethodNotFound { .. } => WeavingErrorCode::BaseMethodNotFound,
            Error::UnknownReference(_) => WeavingErrorCode::UnknownReference,
            _ => WeavingErrorCode::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        let cases: Vec<(Error, WeavingErrorCode)> = vec![
            (
                Error::ContainsBothInterfaces {
                    type_name: "A".to_string(),
                },
                WeavingErrorCode::ContainsBothInterfaces,
            ),
            (
                Error::IncompatibleExistingMember {
                    type_name: "A".to_string(),
                    member: "isDisposed".to_string(),
                    reason: "not a boolean".to_string(),
                },
                WeavingErrorCode::ContainsIncompatibleExistingMember,
            ),
            (
                Error::PropertyNotFound {
                    type_name: "A".to_string(),
                },
                WeavingErrorCode::PropertyNotFound,
            ),
            (
                Error::BaseMethodNotFound {
                    type_name: "A".to_string(),
                    method: "Dispose".to_string(),
                },
                WeavingErrorCode::BaseMethodNotFound,
            ),
            (
                Error::UnknownReference("System.ObjectDisposedException".to_string()),
                WeavingErrorCode::UnknownReference,
            ),
            (
                Error::Error("something else".to_string()),
                WeavingErrorCode::None,
            ),
            (
                Error::TypeNotFound(Token::new(0x0200_0001)),
                WeavingErrorCode::None,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.code(), expected, "wrong code for {error:?}");
        }
    }

    #[test]
    fn test_code_display() {
        assert_eq!(
            WeavingErrorCode::ContainsBothInterfaces.to_string(),
            "ContainsBothInterfaces"
        );
        assert_eq!(
            WeavingErrorCode::UnknownReference.to_string(),
            "UnknownReference"
        );
    }

    #[test]
    fn test_malformed_body_macro() {
        let err = malformed_body!("no return instruction in '{}'", "Dispose");
        match err {
            Error::Malformed { message, file, .. } => {
                assert_eq!(message, "no return instruction in 'Dispose'");
                assert!(file.ends_with("error.rs"));
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::ContainsBothInterfaces {
            type_name: "App.Connection".to_string(),
        };
        assert!(err.to_string().contains("App.Connection"));

        let err = Error::BaseMethodNotFound {
            type_name: "App.Connection".to_string(),
            method: "DisposeAsync".to_string(),
        };
        assert!(err.to_string().contains("DisposeAsync"));
    }
}
