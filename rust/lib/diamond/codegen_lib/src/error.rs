use std::path::PathBuf;

use thiserror::Error;

/// Fatal generation errors. Any of these stops the run before the output
/// file is touched.
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("facet config not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("malformed facet config {}: {reason}", path.display())]
    ConfigMalformed { path: PathBuf, reason: String },

    #[error("malformed generator settings {}: {reason}", path.display())]
    SettingsMalformed { path: PathBuf, reason: String },

    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// The same signature is listed in `ownedSelectors` of two facets.
    #[error("selector {signature} is owned by both {first} and {second}")]
    Conflict {
        signature: String,
        first: String,
        second: String,
    },

    /// Two resolved facets would expose the same selector.
    #[error("selector {selector} ({first_signature}) of {first} collides with {second_signature} of {second}")]
    SelectorCollision {
        selector: String,
        first: String,
        first_signature: String,
        second: String,
        second_signature: String,
    },

    /// Two deployed facets derive the same struct field name.
    #[error("facets {first} and {second} both map to field {field}")]
    FieldNameClash {
        field: String,
        first: String,
        second: String,
    },

    /// A facet's field name is already declared by the template.
    #[error("field {field} of {facet} is reserved by the deployer template")]
    ReservedFieldName { field: String, facet: String },

    /// The facet that registers cuts is not among the deployed facets.
    #[error("cut facet {0} is not deployed (not configured, or no artifact and not required)")]
    MissingCutFacet(String),

    #[error("template placeholder has no fragment: {0}")]
    UnresolvedPlaceholder(String),

    #[error("I/O error on {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    #[error("generated output is out of date: {}", .0.display())]
    OutOfDate(PathBuf),
}

impl CodegenError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        CodegenError::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

/// Problems with a single compiled artifact. These are never fatal: the
/// reader logs them and treats the artifact as missing.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("malformed artifact: {0}")]
    Malformed(String),

    #[error("artifact has neither methodIdentifiers nor abi")]
    MissingIdentifiers,

    #[error("invalid selector {selector:?} for {signature}")]
    InvalidSelector { signature: String, selector: String },
}
