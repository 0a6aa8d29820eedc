//! board.rs — Fixed configuration for the SM8150 reference board
//!
//! One immutable `BoardConfig` instance replaces the pile of per-file
//! constants a board port usually accretes. The boot phase receives a
//! reference and never mutates it; addresses below are contracts with the
//! SoC and the prior boot stage, not tunables.

use crate::memmap::{MemoryMap, MemoryRegion};

/// SoC identity used to gate raw register pokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocId {
    Sm8150,
    Unknown,
}

/// Immutable board configuration handed to the boot sequencer.
pub struct BoardConfig {
    pub soc: SocId,

    /// First byte of DRAM as seen by the application processor.
    pub system_memory_base: u64,
    /// Total DRAM size.
    pub system_memory_size: u64,
    /// DRAM carved out below the UEFI pool (prior-stage images, carveouts).
    pub prealloc_memory_size: u64,
    /// Size of the UEFI memory pool; the HOB arena, boot allocations and the
    /// phase stack all live inside it.
    pub uefi_pool_size: u64,

    /// Firmware device (flashed image) placement.
    pub fd_base: u64,
    pub fd_size: u64,

    /// CPU memory-mapped IO space size exponent reported in the CPU HOB.
    pub cpu_io_size: u8,

    /// Watchdog-timer disable register. Bit-exact SoC contract.
    pub watchdog_disable_addr: u64,
    /// UFS interconnect context-bank registers. Bit-exact SoC contract.
    pub ufs_smmu_base: u64,

    /// Firmware version string shown in the boot banner.
    pub firmware_version: &'static str,

    pub memory_map: &'static [MemoryRegion],
}

impl BoardConfig {
    pub fn memory_map(&self) -> MemoryMap<'_> {
        MemoryMap::new(self.memory_map)
    }
}

/// The SM8150 reference board.
pub const SM8150: BoardConfig = BoardConfig {
    soc: SocId::Sm8150,
    system_memory_base: 0x8000_0000,
    system_memory_size: 0x8000_0000,
    prealloc_memory_size: 0x1080_0000,
    uefi_pool_size: 0x0800_0000,
    fd_base: 0x9FC0_0000,
    fd_size: 0x0040_0000,
    cpu_io_size: 0,
    watchdog_disable_addr: 0x17C1_0008,
    ufs_smmu_base: 0x1508_1000,
    firmware_version: "2.4.118",
    memory_map: crate::memmap::SM8150_MEMORY_MAP,
};
