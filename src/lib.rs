pub mod config;
pub mod glob;
pub mod logging;
pub mod parser;
pub mod source;
pub mod version;
