//! Resource loading
//!
//! Texture decoding and the default file-backed texture loader.

mod texture;

pub use texture::*;
