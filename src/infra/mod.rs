pub mod config;
pub mod input;

pub use config::{mask_secret, ConfigError, FileConfig, Settings};
pub use input::{read_document, InputError, MAX_DOCUMENT_BYTES};
