//! Host resource sampling.
//!
//! # Responsibilities
//! - Read point-in-time CPU utilisation
//! - Read memory and disk usage as byte counts
//!
//! Every reading may fail independently. The collector decides what a
//! failure means for the sample it is building.

mod system;

use std::path::{Path, PathBuf};

pub use system::SysinfoSampler;

#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("no disk mounted at {}", .0.display())]
    MountNotFound(PathBuf),

    #[error("{0} reading unavailable")]
    Unavailable(&'static str),
}

/// Source of host resource readings.
///
/// Methods take `&mut self` because CPU utilisation is a delta between two
/// refreshes and implementations keep the previous snapshot.
pub trait Sampler: Send + 'static {
    /// CPU utilisation in percent, `None` when no reading is available yet.
    fn sample_cpu(&mut self) -> Result<Option<f64>, SamplerError>;

    /// `(used, total)` memory in bytes.
    fn sample_memory(&mut self) -> Result<(u64, u64), SamplerError>;

    /// `(used, total)` bytes of the filesystem mounted at `mount`.
    fn sample_disk(&mut self, mount: &Path) -> Result<(u64, u64), SamplerError>;
}
