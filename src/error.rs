//! Error types for the icon pack engine
//!
//! Most failures inside the engine are recovered locally (a malformed appfilter
//! tag, a mask layer that cannot be decoded) and only show up in the log. The
//! variants here are what escapes those layers: pack load failures, requests for
//! unavailable entries, and the platform errors that cause them.
//!
//! Error variants use `#[source]` to preserve error chains for better
//! observability and debugging.

use crate::platform::ResourceKind;
use thiserror::Error;

/// Simple error type for wrapping string messages while implementing `std::error::Error`
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

impl StringError {
    /// Create a new `StringError` from a string message
    pub fn new(msg: impl Into<String>) -> Box<Self> {
        Box::new(Self(msg.into()))
    }
}

/// Main error type for the icon pack engine
#[derive(Debug, Error)]
pub enum IconPackError {
    /// A named resource does not exist in the package
    #[error("{kind} resource not found: {name}")]
    ResourceNotFound {
        /// Resource kind that was looked up
        kind: ResourceKind,
        /// Resource name or formatted id
        name: String,
    },

    /// XML document could not be parsed
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// Image data could not be decoded or encoded
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration error
    /// Preserves the underlying error source for full error chain transparency
    #[error("Configuration error: {0}")]
    ConfigError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An icon pack could not be loaded at all
    #[error("Failed to load icon pack {package}: {source}")]
    PackLoadFailed {
        /// Package name of the pack
        package: String,
        /// Underlying failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A drawable was requested for an entry that reported itself unavailable
    #[error("Trying to access an unavailable entry {0}")]
    EntryUnavailable(String),

    /// A dynamic drawable declared a layer without any drawable in it
    #[error("Dynamic drawable layer {0} has no drawables")]
    EmptyDynamicLayer(String),

    /// A component string could not be parsed
    #[error("Invalid component name: {0}")]
    InvalidComponent(String),
}

/// Result type alias for icon pack operations
pub type Result<T> = std::result::Result<T, IconPackError>;

impl IconPackError {
    /// Shorthand for a missing resource looked up by name
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            kind,
            name: name.into(),
        }
    }

    /// Shorthand for a missing resource looked up by id
    pub fn id_not_found(kind: ResourceKind, id: u32) -> Self {
        Self::ResourceNotFound {
            kind,
            name: format!("0x{id:08x}"),
        }
    }
}

/// Convert an error to a user-friendly message
///
/// The pack load failure message is the one notice the engine surfaces to the
/// user; everything else is only expected in diagnostics.
pub fn get_user_friendly_error(error: &IconPackError) -> String {
    match error {
        IconPackError::PackLoadFailed { package, .. } => {
            format!(
                "Failed to parse appfilter of {package}.\n\n\
                 Icons from this pack will not be applied."
            )
        }
        IconPackError::ResourceNotFound { kind, name } => {
            format!("The icon pack is missing the {kind} resource {name}.")
        }
        IconPackError::XmlError(e) => {
            format!(
                "An icon pack document is malformed:\n\n{e}\n\n\
                 Try updating or reinstalling the icon pack."
            )
        }
        IconPackError::ImageError(e) => format!("An icon image could not be decoded:\n\n{e}"),
        IconPackError::IoError(e) => {
            format!(
                "A file system error occurred:\n\n{e}\n\n\
                 Please check file permissions and disk space."
            )
        }
        IconPackError::JsonError(e) => {
            format!(
                "Configuration file is corrupted:\n\n{e}\n\n\
                 The default icon settings will be used."
            )
        }
        IconPackError::ConfigError(_) => "Failed to load or save icon settings.\n\n\
             Your icon choices may not persist."
            .to_string(),
        IconPackError::EntryUnavailable(name) => {
            format!("The icon {name} is no longer available.")
        }
        IconPackError::EmptyDynamicLayer(key) => {
            format!("The dynamic icon layer {key} is empty. Try updating the icon pack.")
        }
        IconPackError::InvalidComponent(component) => {
            format!("{component} is not a valid application component.")
        }
    }
}
