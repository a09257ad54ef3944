pub mod downloads;
pub mod ghcr;
pub mod github;

pub use downloads::*;
pub use ghcr::*;
pub use github::*;
