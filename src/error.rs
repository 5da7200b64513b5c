use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Problems found while normalizing catalog documents.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog item {id} has neither a flat price nor size variants")]
    MissingPrice { id: String },

    #[error("catalog item {id} has a negative price ({context})")]
    NegativePrice { id: String, context: String },

    #[error("catalog document is missing `{field}`")]
    MissingField { field: &'static str },

    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Rejected user picks when building an add-to-cart configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("{item} is not available right now")]
    Unavailable { item: String },

    #[error("{item} requires a size selection")]
    SizeRequired { item: String },

    #[error("{item} has no size variants")]
    SizeNotOffered { item: String },

    #[error("unknown size `{key}` for {item}")]
    UnknownSize { item: String, key: String },

    #[error("unknown choice group `{group}` for {item}")]
    UnknownGroup { item: String, group: String },

    #[error("unknown option `{option}` in choice group {group}")]
    UnknownOption { group: String, option: String },

    #[error("choice group {group} requires a selection")]
    ChoiceRequired { group: String },

    #[error("choice group {group} allows at most {max} selection(s), got {got}")]
    TooManyChoices { group: String, max: u32, got: usize },
}

/// Failures of the local cart slot.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored slot `{slot}` failed checksum validation")]
    Corrupt { slot: String },

    #[error("slot `{slot}` is not writable: {reason}")]
    Unavailable { slot: String, reason: String },
}

/// Checkout failures. All of them leave the cart unchanged.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to connect to the server. Please try again later. ({0})")]
    Transport(String),

    #[error("failed to read payment proof {path}: {source}")]
    Proof {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode order data: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Order document and dashboard errors.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order {order} cannot move from {from} to {to}")]
    Transition {
        order: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("unknown order status `{0}`")]
    UnknownStatus(String),

    #[error("order {0} not found")]
    NotFound(String),

    #[error("failed to read orders {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse orders {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {reason}")]
    Invalid { name: String, reason: String },

    #[error("invalid checkout url `{url}`: {source}")]
    Url {
        url: String,
        source: url::ParseError,
    },
}

/// Canonical error surface for the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to render json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}
