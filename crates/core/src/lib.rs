pub mod config;
pub mod error;
pub mod row;

pub use config::Config;
pub use error::*;
pub use row::*;
