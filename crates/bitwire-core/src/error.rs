use thiserror::Error;

/// Errors raised while decoding a message from any read backend.
///
/// Every variant aborts the parse in progress; there is no per-field retry.
///
/// # Examples
/// ```
/// use bitwire_core::ParseError;
///
/// let err = ParseError::InvalidBitLength {
///     type_name: "unsigned short",
///     bit_length: 17,
///     max: 16,
/// };
/// assert!(err.to_string().contains("unsigned short"));
/// ```
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{type_name} must contain between 1 and {max} bits, got {bit_length}")]
    InvalidBitLength {
        type_name: &'static str,
        bit_length: u32,
        max: u32,
    },
    #[error("unsupported bit length {bit_length} for {type_name}")]
    UnsupportedWidth {
        type_name: &'static str,
        bit_length: u32,
    },
    #[error("unsupported encoding: {encoding}")]
    UnsupportedEncoding { encoding: String },
    #[error("buffer exhausted: need {needed} bits at bit {pos}, {available} remaining")]
    Exhausted {
        needed: usize,
        pos: usize,
        available: usize,
    },
    #[error("reset position {pos} is beyond the buffer end at bit {limit}")]
    ResetOutOfRange { pos: usize, limit: usize },
    #[error("invalid {encoding} digits in field '{name}': {raw:?}")]
    InvalidDigits {
        name: String,
        encoding: &'static str,
        raw: String,
    },
    #[error("required context '{name}' not found")]
    ContextNotFound { name: String },
    #[error("required element '{name}' not found")]
    ElementNotFound { name: String },
    #[error("unexpected closing context '{actual}', expected '{expected}'")]
    ContextMismatch { expected: String, actual: String },
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("unexpected {key}: got {actual:?}, want {expected:?}")]
    AttributeMismatch {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("invalid value for '{name}': {message}")]
    InvalidValue { name: String, message: String },
    #[error("invalid parser state: {0}")]
    InvalidState(String),
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while encoding a message into any write backend.
///
/// # Examples
/// ```
/// use bitwire_core::SerializationError;
///
/// let err = SerializationError::ValueTooLarge {
///     name: "digits".to_string(),
///     value: "100".to_string(),
///     max: "99".to_string(),
/// };
/// assert!(err.to_string().contains("exceeds"));
/// ```
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("{type_name} must contain between 1 and {max} bits, got {bit_length}")]
    InvalidBitLength {
        type_name: &'static str,
        bit_length: u32,
        max: u32,
    },
    #[error("unsupported bit length {bit_length} for {type_name}")]
    UnsupportedWidth {
        type_name: &'static str,
        bit_length: u32,
    },
    #[error("unsupported encoding: {encoding}")]
    UnsupportedEncoding { encoding: String },
    #[error("buffer overflow: writing {requested} bits at bit {pos} exceeds capacity of {capacity} bits")]
    Overflow {
        requested: usize,
        pos: usize,
        capacity: usize,
    },
    #[error("value {value} of '{name}' exceeds the max value of {max}")]
    ValueTooLarge {
        name: String,
        value: String,
        max: String,
    },
    #[error("unexpected closing context '{actual}', expected '{expected}'")]
    ContextMismatch { expected: String, actual: String },
    #[error("no open context for '{name}'")]
    NoOpenContext { name: String },
    #[error("{count} context(s) still open: {names}")]
    UnclosedContexts { count: usize, names: String },
    #[error("invalid value for '{name}': {message}")]
    InvalidValue { name: String, message: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML error: {0}")]
    Xml(String),
}

/// Misuse of the codec helper functions.
///
/// These signal a bug in a hand-written or generated codec, not malformed
/// input, so they are kept apart from [`ParseError`] and
/// [`SerializationError`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HelperError {
    #[error("unable to cast value to {expected}")]
    InvalidCast { expected: &'static str },
    #[error("index {index} out of range for collection of {len} elements")]
    IndexOutOfRange { index: usize, len: usize },
}
