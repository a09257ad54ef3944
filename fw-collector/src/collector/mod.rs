pub mod badge;
pub mod sl;
pub mod ti;

pub use badge::*;
pub use sl::*;
pub use ti::*;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

pub(crate) fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    )?);
    Ok(pb)
}
