//! JSON backend built on `serde_json::Value` trees.

pub mod layout;
mod reader;
mod writer;

pub use reader::{JsonReadOptions, ReadBufferJsonBased};
pub use writer::WriteBufferJsonBased;
