pub mod models;
pub mod errors;
pub mod decoder;
pub mod parsers;
pub mod input;
pub mod correlator;
pub mod reporting;
pub mod config;
pub mod runner;

// Re-export commonly used items
pub use models::*;
pub use errors::*;
pub use decoder::*;
pub use parsers::*;
pub use input::*;
pub use correlator::*;
pub use reporting::*;
pub use config::*;
pub use runner::*;
