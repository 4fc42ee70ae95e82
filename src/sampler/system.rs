//! `sysinfo`-backed sampler.

use std::path::Path;

use sysinfo::{Disk, DiskRefreshKind, Disks, System};

use super::{Sampler, SamplerError};

/// Keeps one `System` across ticks so CPU usage has a baseline.
///
/// The mount list is enumerated once; later ticks only refresh the space
/// counters of the watched disk.
pub struct SysinfoSampler {
    sys: System,
    disks: Disks,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        // First refresh only establishes the baseline for the next delta.
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        Self {
            sys,
            disks: Disks::new_with_refreshed_list_specifics(storage_only()),
        }
    }

    fn find_disk(&mut self, mount: &Path) -> Option<&mut Disk> {
        self.disks
            .list_mut()
            .iter_mut()
            .find(|disk| disk.mount_point() == mount)
    }
}

fn storage_only() -> DiskRefreshKind {
    DiskRefreshKind::nothing().with_storage()
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SysinfoSampler {
    fn sample_cpu(&mut self) -> Result<Option<f64>, SamplerError> {
        self.sys.refresh_cpu_usage();
        if self.sys.cpus().is_empty() {
            return Ok(None);
        }
        let usage = f64::from(self.sys.global_cpu_usage());
        Ok(usage.is_finite().then_some(usage))
    }

    fn sample_memory(&mut self) -> Result<(u64, u64), SamplerError> {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return Err(SamplerError::Unavailable("memory"));
        }
        Ok((self.sys.used_memory(), total))
    }

    fn sample_disk(&mut self, mount: &Path) -> Result<(u64, u64), SamplerError> {
        if self.find_disk(mount).is_none() {
            // Mounted after startup, or never; re-list before giving up.
            self.disks.refresh_specifics(true, storage_only());
        }
        let disk = self
            .find_disk(mount)
            .ok_or_else(|| SamplerError::MountNotFound(mount.to_path_buf()))?;
        disk.refresh_specifics(storage_only());

        let total = disk.total_space();
        let used = total.saturating_sub(disk.available_space());
        Ok((used, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_reading_is_a_percentage() {
        let mut sampler = SysinfoSampler::new();
        if let Ok(Some(cpu)) = sampler.sample_cpu() {
            assert!(cpu.is_finite());
            assert!(cpu >= 0.0);
        }
    }

    #[test]
    fn test_memory_used_within_total() {
        let mut sampler = SysinfoSampler::new();
        if let Ok((used, total)) = sampler.sample_memory() {
            assert!(used <= total);
        }
    }

    #[test]
    fn test_unknown_mount_is_an_error() {
        let mut sampler = SysinfoSampler::new();
        let err = sampler
            .sample_disk(Path::new("/definitely/not/a/mount/point"))
            .unwrap_err();
        assert!(matches!(err, SamplerError::MountNotFound(_)));
    }

    #[test]
    fn test_disk_list_reused_across_samples() {
        let mut sampler = SysinfoSampler::new();
        let Some(mount) = sampler
            .disks
            .list()
            .first()
            .map(|disk| disk.mount_point().to_path_buf())
        else {
            return;
        };
        let listed = sampler.disks.list().len();

        for _ in 0..3 {
            let (used, total) = sampler.sample_disk(&mount).unwrap();
            assert!(used <= total);
        }
        assert_eq!(sampler.disks.list().len(), listed);
    }
}
