//! Human-readable debug rendering: every scalar becomes a named box and every
//! context a box around its children.
//!
//! ```text
//! ╔═frame══════════╗
//! ║╔═a════╗╔═b════╗║
//! ║║0x01 1║║0x02 2║║
//! ║╚══════╝╚══════╝║
//! ╚════════════════╝
//! ```

mod ascii;
pub mod hex;
mod writer;

pub use ascii::{AsciiBox, AsciiBoxWriter};
pub use writer::{BoxOptions, WriteBufferBoxBased};
