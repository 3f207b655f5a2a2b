pub mod har;

pub use har::HarParser;
