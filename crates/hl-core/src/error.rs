//! Error types for hl-algebra.
//!
//! Arithmetic never fails: division by zero and domain violations surface as
//! `inf`/`NaN` in the results. These variants cover structural misuse of a
//! trace (bad node ids, malformed node lists) and trace (de)serialization.

use thiserror::Error;

/// hl-algebra error type
#[derive(Error, Debug)]
pub enum Error {
    /// A node id that is the sentinel or lies beyond the end of the trace.
    #[error("unknown node id {id} (trace holds {len} nodes)")]
    UnknownNode {
        /// The offending id.
        id: usize,
        /// Number of nodes in the trace.
        len: usize,
    },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_node_message() {
        let err = Error::UnknownNode { id: 7, len: 3 };
        assert_eq!(err.to_string(), "unknown node id 7 (trace holds 3 nodes)");
    }

    #[test]
    fn test_json_error_converts() {
        fn parse(s: &str) -> Result<serde_json::Value> {
            Ok(serde_json::from_str(s)?)
        }
        let err = parse("{not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().starts_with("JSON error:"));
    }
}
