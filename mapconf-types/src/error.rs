//! Error type used by the crate.

use thiserror::Error;

/// Error of reading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON or does not match the expected structure.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
    /// Two groups share the same id.
    #[error("duplicate group id {0:?}")]
    DuplicateId(String),
    /// A `layer-group` contains another `layer-group`.
    #[error("layer group {parent:?} contains nested layer group {child:?}")]
    NestedChoice {
        /// Id of the outer group.
        parent: String,
        /// Id of the nested group.
        child: String,
    },
    /// A required field is empty or absent.
    #[error("group {id:?} is missing required field `{field}`")]
    MissingField {
        /// Id of the group.
        id: String,
        /// Name of the field.
        field: &'static str,
    },
    /// The query string could not be interpreted.
    #[error("invalid query parameter: {0}")]
    InvalidQuery(String),
}
