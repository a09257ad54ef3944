pub mod collector;
pub mod config;
pub mod external;
pub mod firmware;
pub mod models;

pub use config::*;
pub use models::*;
