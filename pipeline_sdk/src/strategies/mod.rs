//! # Reference strategies
//!
//! One module per strategy kind. Each module exports its loaders and
//! declares the discriminator values it serves.

pub mod download;
pub mod filter;
pub mod function;
pub mod mapping;
pub mod parse;
pub mod resource;
pub mod transformation;

use pipeline_base::strategies::PluginRegistrar;

/// Session keys shared by the download, parse and filter strategies
pub mod keys {
    /// Raw payload, base64 encoded
    pub const CONTENT_BASE64: &str = "content_base64";
    /// Raw payload size in bytes
    pub const CONTENT_LENGTH: &str = "content_length";
    /// Parsed payload
    pub const CONTENT: &str = "content";
}

/// Register every reference strategy
pub fn register_all(registrar: &mut PluginRegistrar<'_>) {
    download::register(registrar);
    parse::register(registrar);
    resource::register(registrar);
    filter::register(registrar);
    mapping::register(registrar);
    function::register(registrar);
    transformation::register(registrar);
}
