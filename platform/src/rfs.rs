//! rfs.rs — Remote-file-system shared-area protection
//!
//! The modem and ADSP read their EFS images out of DRAM carveouts that the
//! OS never learns about. Before boot-device selection starts enumerating,
//! those carveouts are handed to the host firmware's memory-protection
//! service so a later phase cannot reclaim them.

use core::fmt;

use crate::memmap::MemoryMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectError {
    /// Neither EFS carveout exists in the memory map.
    NoSharedArea,
    /// The protection service rejected the range.
    Rejected,
}

impl fmt::Display for ProtectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectError::NoSharedArea => f.write_str("no RFS shared area in memory map"),
            ProtectError::Rejected => f.write_str("protection service rejected range"),
        }
    }
}

/// Memory-protection service seam.
pub trait SharedAreaProtector {
    fn protect(&mut self, base: u64, length: u64) -> Result<(), ProtectError>;
}

/// Locate the modem and ADSP EFS carveouts and protect each one found.
pub fn protect_rfs_shared_area(
    map: &MemoryMap<'_>,
    protector: &mut dyn SharedAreaProtector,
) -> Result<(), ProtectError> {
    let mut protected = false;

    for name in ["MPSS_EFS", "ADSP_EFS"] {
        if let Some(region) = map.lookup(name) {
            protector.protect(region.base, region.length)?;
            log::debug!(target: "rfs", "{} protected: {:#x}+{:#x}", name, region.base, region.length);
            protected = true;
        }
    }

    if protected {
        Ok(())
    } else {
        Err(ProtectError::NoSharedArea)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memmap::{HobPolicy, MemoryKind, MemoryRegion};

    struct Recorder {
        ranges: Vec<(u64, u64)>,
    }

    impl SharedAreaProtector for Recorder {
        fn protect(&mut self, base: u64, length: u64) -> Result<(), ProtectError> {
            self.ranges.push((base, length));
            Ok(())
        }
    }

    #[test]
    fn protects_both_efs_carveouts() {
        const TABLE: &[MemoryRegion] = &[
            MemoryRegion::new("MPSS_EFS", 0x85D0_0000, 0x0020_0000, MemoryKind::Reserved, HobPolicy::Guid),
            MemoryRegion::new("ADSP_EFS", 0x8620_0000, 0x0020_0000, MemoryKind::Reserved, HobPolicy::Guid),
            MemoryRegion::sentinel(),
        ];
        let mut rec = Recorder { ranges: Vec::new() };
        protect_rfs_shared_area(&MemoryMap::new(TABLE), &mut rec).unwrap();
        assert_eq!(rec.ranges, [(0x85D0_0000, 0x0020_0000), (0x8620_0000, 0x0020_0000)]);
    }

    #[test]
    fn missing_carveouts_report_no_shared_area() {
        const TABLE: &[MemoryRegion] = &[MemoryRegion::sentinel()];
        let mut rec = Recorder { ranges: Vec::new() };
        assert_eq!(
            protect_rfs_shared_area(&MemoryMap::new(TABLE), &mut rec),
            Err(ProtectError::NoSharedArea)
        );
    }
}
