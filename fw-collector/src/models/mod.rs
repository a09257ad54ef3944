pub mod badge;
pub mod cli;
pub mod manifest;
pub mod task;

pub use badge::*;
pub use cli::*;
pub use manifest::*;
pub use task::*;
