//! Per-field capability flags and the helpers every backend shares.
//!
//! Flags are passed as an immutable slice; extraction is a linear scan for the
//! first matching variant, so the first occurrence of a flag wins.

/// Placeholder used by keyed backends when a field has no logical name.
pub const DEFAULT_LOGICAL_NAME: &str = "value";

/// Encoding assumed for strings when no `Encoding` flag is present.
pub const DEFAULT_STRING_ENCODING: &str = "UTF-8";

/// A directive altering how a backend renders or encodes a single field.
///
/// # Examples
/// ```
/// use bitwire_core::args::{ReaderWriterArg, is_render_as_list};
///
/// let args = [ReaderWriterArg::RenderAsList(true)];
/// assert!(is_render_as_list(&args));
/// assert!(!is_render_as_list(&[]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderWriterArg {
    /// Render the context as a list (JSON array, XML `isList` sequence).
    RenderAsList(bool),
    /// Encoding identifier, e.g. `ASCII`, `UTF8`, `UTF16LE`, `BCD`.
    Encoding(String),
    /// Extra display text attached to the field.
    AdditionalStringRepresentation(String),
}

impl ReaderWriterArg {
    pub fn encoding(encoding: impl Into<String>) -> Self {
        ReaderWriterArg::Encoding(encoding.into())
    }

    pub fn additional(representation: impl Into<String>) -> Self {
        ReaderWriterArg::AdditionalStringRepresentation(representation.into())
    }
}

/// Map a blank logical name to [`DEFAULT_LOGICAL_NAME`].
///
/// # Examples
/// ```
/// use bitwire_core::args::sanitize_logical_name;
///
/// assert_eq!(sanitize_logical_name(""), "value");
/// assert_eq!(sanitize_logical_name("  "), "value");
/// assert_eq!(sanitize_logical_name("crc"), "crc");
/// ```
pub fn sanitize_logical_name(logical_name: &str) -> &str {
    if logical_name.trim().is_empty() {
        DEFAULT_LOGICAL_NAME
    } else {
        logical_name
    }
}

/// Whether the field should be rendered as a list. Defaults to `false`.
pub fn is_render_as_list(args: &[ReaderWriterArg]) -> bool {
    args.iter()
        .find_map(|arg| match arg {
            ReaderWriterArg::RenderAsList(value) => Some(*value),
            _ => None,
        })
        .unwrap_or(false)
}

/// The first `Encoding` flag, if any.
pub fn extract_encoding(args: &[ReaderWriterArg]) -> Option<&str> {
    args.iter().find_map(|arg| match arg {
        ReaderWriterArg::Encoding(encoding) => Some(encoding.as_str()),
        _ => None,
    })
}

/// The first `AdditionalStringRepresentation` flag, if any.
pub fn extract_additional_string_representation(args: &[ReaderWriterArg]) -> Option<&str> {
    args.iter().find_map(|arg| match arg {
        ReaderWriterArg::AdditionalStringRepresentation(text) => Some(text.as_str()),
        _ => None,
    })
}

/// Normalize an encoding identifier: strip non-alphanumerics and upper-case.
///
/// `"utf-16le"` and `"UTF16LE"` both become `"UTF16LE"`.
pub fn normalize_encoding(encoding: &str) -> String {
    encoding
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_flag_wins() {
        let args = [
            ReaderWriterArg::encoding("ASCII"),
            ReaderWriterArg::RenderAsList(false),
            ReaderWriterArg::encoding("UTF16"),
            ReaderWriterArg::RenderAsList(true),
        ];
        assert_eq!(extract_encoding(&args), Some("ASCII"));
        assert!(!is_render_as_list(&args));
    }

    #[test]
    fn absent_flags_fall_back_to_defaults() {
        let args = [ReaderWriterArg::encoding("ASCII")];
        assert!(!is_render_as_list(&args));
        assert_eq!(extract_additional_string_representation(&args), None);
        assert_eq!(extract_encoding(&[]), None);
    }

    #[test]
    fn additional_representation_is_extracted() {
        let args = [ReaderWriterArg::additional("SET_PARAM")];
        assert_eq!(
            extract_additional_string_representation(&args),
            Some("SET_PARAM")
        );
    }

    #[test]
    fn normalize_encoding_strips_separators() {
        assert_eq!(normalize_encoding("utf-16le"), "UTF16LE");
        assert_eq!(normalize_encoding("UTF_8"), "UTF8");
        assert_eq!(normalize_encoding("ascii"), "ASCII");
    }
}
