//! XML backend on top of `quick-xml` events.
//!
//! ```text
//! <frame>
//!   <items isList="true">
//!     <item dataType="uint" bitLength="8">1</item>
//!   </items>
//! </frame>
//! ```

mod reader;
mod writer;

pub use reader::{ReadBufferXmlBased, XmlReadOptions};
pub use writer::WriteBufferXmlBased;

pub(crate) const DATA_TYPE: &str = "dataType";
pub(crate) const BIT_LENGTH: &str = "bitLength";
pub(crate) const ENCODING: &str = "encoding";
pub(crate) const STRING_REPRESENTATION: &str = "stringRepresentation";
pub(crate) const IS_LIST: &str = "isList";

pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() && value.is_sign_positive() {
        "Infinity".to_string()
    } else if value.is_infinite() {
        "-Infinity".to_string()
    } else {
        value.to_string()
    }
}
