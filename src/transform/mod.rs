// src/transform/mod.rs

//! Value transformation for mappings with a configured keystore.
//!
//! - [`decrypt`] replaces tagged segments in a value with their AES-GCM
//!   plaintext, using keys from the keystore directory.
//! - [`template`] is a minimal text-template renderer: literal text plus
//!   calls to a single registered function, executed with no data context.
//! - [`pipeline`] chains the two: decrypt, parse, execute. A failure at any
//!   stage skips only the affected key's write.

pub mod decrypt;
pub mod pipeline;
pub mod template;

pub use decrypt::Decryptor;
pub use pipeline::TransformPipeline;
pub use template::{Template, TemplateFunc};
