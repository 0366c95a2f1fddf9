mod config;
mod plan;

pub use config::*;
pub use plan::*;
