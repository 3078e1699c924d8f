use std::fmt;
use std::path::PathBuf;

use super::record::RecordId;

//------------ ParseError ----------------------------------------------------

/// A single input record could not be turned into a route, VRP or
/// delegation. Parse errors are never fatal for a run: the offending record
/// is skipped, logged and counted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// The text is neither an IPv4 (contains a `.`) nor an IPv6 (contains a
    /// `:`) address.
    UnknownFamily(String),
    /// The text looks like an address of a family, but isn't one.
    InvalidAddress(String),
    /// The prefix length is not a number, or it exceeds the family width.
    InvalidLength(String),
    /// The ASN field cannot be parsed.
    InvalidAsn(String),
    /// The peer count of a route dump line is not a number.
    InvalidPeerCount(String),
    /// The max length field of a VRP is not a number.
    InvalidMaxLength(String),
    /// The max length of a VRP is shorter than its prefix, or longer than
    /// the family allows.
    MaxLengthOutOfRange { prefix: String, max_length: u8 },
    /// A stored validity code is not one of -1 to 4.
    InvalidValidity(i8),
    /// A field that the record type requires is absent.
    MissingField(&'static str),
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::UnknownFamily(s) => {
                write!(f, "Error: Cannot detect address family of '{}'.", s)
            }
            ParseError::InvalidAddress(s) => {
                write!(f, "Error: Invalid IP address '{}'.", s)
            }
            ParseError::InvalidLength(s) => {
                write!(f, "Error: Invalid prefix length '{}'.", s)
            }
            ParseError::InvalidAsn(s) => {
                write!(f, "Error: Invalid AS number '{}'.", s)
            }
            ParseError::InvalidPeerCount(s) => {
                write!(f, "Error: Invalid peer count '{}'.", s)
            }
            ParseError::InvalidMaxLength(s) => {
                write!(f, "Error: Invalid max length '{}'.", s)
            }
            ParseError::MaxLengthOutOfRange { prefix, max_length } => {
                write!(
                    f,
                    "Error: Max length {} is out of range for prefix {}.",
                    max_length, prefix
                )
            }
            ParseError::InvalidValidity(code) => {
                write!(f, "Error: Invalid validity code '{}'.", code)
            }
            ParseError::MissingField(field) => {
                write!(f, "Error: Missing field '{}'.", field)
            }
        }
    }
}

//------------ StoreError ----------------------------------------------------

/// Errors returned by a [RecordStore](crate::store::RecordStore). All store
/// errors are fatal for a run: the run has no partial-result mode, so the
/// caller should abort and start over with a fresh snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The named collection does not exist (yet).
    CollectionNotFound(String),
    /// A record with this id does not exist in the collection.
    RecordNotFound { collection: String, id: RecordId },
    /// The storage backend failed, e.g. a lost connection to a remote
    /// store.
    Backend(String),
}

impl std::error::Error for StoreError {}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::CollectionNotFound(name) => {
                write!(f, "Error: Collection '{}' does not exist.", name)
            }
            StoreError::RecordNotFound { collection, id } => {
                write!(
                    f,
                    "Error: Record {} not found in collection '{}'.",
                    id, collection
                )
            }
            StoreError::Backend(reason) => {
                write!(f, "FATAL: The record store failed: {}", reason)
            }
        }
    }
}

//------------ FetchError ----------------------------------------------------

/// A feed could not be retrieved or decoded.
#[derive(Debug)]
pub enum FetchError {
    /// The URL scheme is neither http(s) nor file.
    UnsupportedUrl(String),
    /// The request failed, or the server answered with an error status.
    Transport { url: String, reason: String },
    /// Reading (or gunzipping) the body failed.
    Io { url: String, source: std::io::Error },
    /// The body is not valid CSV.
    Csv { url: String, source: csv::Error },
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Io { source, .. } => Some(source),
            FetchError::Csv { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FetchError::UnsupportedUrl(url) => {
                write!(f, "Error: Unsupported feed URL '{}'.", url)
            }
            FetchError::Transport { url, reason } => {
                write!(f, "Error: Download of {} failed: {}", url, reason)
            }
            FetchError::Io { url, source } => {
                write!(f, "Error: Failed to read {}: {}", url, source)
            }
            FetchError::Csv { url, source } => {
                write!(f, "Error: Failed to read csv file {}: {}", url, source)
            }
        }
    }
}

//------------ CoordinatorError ----------------------------------------------

#[derive(Debug)]
pub enum CoordinatorError {
    /// A coordinator needs room for at least one work item.
    ZeroCapacity,
    /// The worker pool could not be started.
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl std::error::Error for CoordinatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoordinatorError::ThreadPool(e) => Some(e),
            CoordinatorError::ZeroCapacity => None,
        }
    }
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CoordinatorError::ZeroCapacity => {
                write!(f, "Error: The worker capacity must be at least 1.")
            }
            CoordinatorError::ThreadPool(e) => {
                write!(f, "Error: Cannot start worker pool: {}", e)
            }
        }
    }
}

//------------ ConfigError ---------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    InvalidDate(String),
    InvalidMatching(String),
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "Error: Cannot read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Json { path, source } => {
                write!(
                    f,
                    "Error: Invalid config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::InvalidDate(s) => {
                write!(f, "Error: Invalid snapshot date '{}', expected \
                    YYYY-MM-DD.", s)
            }
            ConfigError::InvalidMatching(s) => {
                write!(f, "Error: Unknown IPv4 RIR matching mode '{}'.", s)
            }
        }
    }
}

//------------ RunError ------------------------------------------------------

/// An unrecoverable error that aborts a run. A failed run has to be started
/// over from the beginning; there is no checkpoint to resume from.
#[derive(Debug)]
pub enum RunError {
    Fetch(FetchError),
    Store(StoreError),
    Coordinator(CoordinatorError),
    Config(ConfigError),
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Fetch(e) => Some(e),
            RunError::Store(e) => Some(e),
            RunError::Coordinator(e) => Some(e),
            RunError::Config(e) => Some(e),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RunError::Fetch(e) => write!(f, "{}", e),
            RunError::Store(e) => write!(f, "{}", e),
            RunError::Coordinator(e) => write!(f, "{}", e),
            RunError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl From<FetchError> for RunError {
    fn from(value: FetchError) -> Self {
        RunError::Fetch(value)
    }
}

impl From<StoreError> for RunError {
    fn from(value: StoreError) -> Self {
        RunError::Store(value)
    }
}

impl From<CoordinatorError> for RunError {
    fn from(value: CoordinatorError) -> Self {
        RunError::Coordinator(value)
    }
}

impl From<ConfigError> for RunError {
    fn from(value: ConfigError) -> Self {
        RunError::Config(value)
    }
}
