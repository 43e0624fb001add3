pub mod cache;
pub mod config_gen;
pub mod obfuscate;
pub mod transfer;

pub use cache::sync_cache;
pub use config_gen::generate_config;
pub use obfuscate::run_obfuscate;
pub use transfer::{export_data, import_data};
