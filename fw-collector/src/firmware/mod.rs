pub mod archive;
pub mod chips;
pub mod naming;

pub use archive::*;
pub use chips::*;
pub use naming::*;
