//! Structured error types for masterfile.
//!
//! Configuration and structural lookup failures abort the run; malformed
//! auxiliary objects (tables, defined names) are handled locally by the
//! patcher and never surface here.

/// All errors that can occur while resolving columns and patching a package.
#[derive(Debug, thiserror::Error)]
pub enum MasterfileError {
    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The named sheet does not exist in the workbook descriptor.
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// A relationship id has no resolvable target.
    #[error("unresolvable relationship: {0}")]
    Relationship(String),

    /// A part referenced by a relationship is missing from the archive.
    #[error("missing package part: {0}")]
    MissingPart(String),

    /// Malformed alias table or onboarding input.
    #[error("mapping configuration: {0}")]
    Mapping(String),

    /// Structurally invalid package content.
    #[error("invalid package structure: {0}")]
    Invalid(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MasterfileError>;

impl From<String> for MasterfileError {
    fn from(s: String) -> Self {
        Self::Invalid(s)
    }
}
