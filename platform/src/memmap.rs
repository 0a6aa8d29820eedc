//! memmap.rs — Static platform memory map with lookup-by-name
//!
//! The board's physical address space is described once, at compile time, as
//! an ordered table of named regions. Two consumers run the same lookup: the
//! boot phase resolving its diagnostics region, and description-table
//! patching resolving the modem/ADSP/TGCM carveouts. The table keeps a
//! zero-length terminator for layout fidelity with the flashed tables, but
//! is exposed as an explicit slice; the terminator stops the scan and is
//! never a candidate match.

/// How a region is treated by the MMU plan and the HOB installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    /// Normal write-back DRAM usable by the firmware.
    Ram,
    /// Shared with other subsystems; mapped non-cacheable.
    Shared,
    /// Carveout owned by another master; described but never mapped.
    Reserved,
    /// Memory-mapped IO.
    Device,
}

/// What the platform HOB installer emits for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HobPolicy {
    /// No HOB; the region is an MMU concern only.
    None,
    /// System-memory resource descriptor.
    Resource,
    /// Reserved-memory resource descriptor.
    ReservedResource,
    /// GUID-extension HOB carrying the region bounds for later phases.
    Guid,
}

/// Named, addressed, fixed-length entry in the platform memory map.
#[derive(Debug, Clone, Copy)]
pub struct MemoryRegion {
    pub name: &'static str,
    pub base: u64,
    pub length: u64,
    pub kind: MemoryKind,
    pub hob: HobPolicy,
}

impl MemoryRegion {
    pub const fn new(
        name: &'static str,
        base: u64,
        length: u64,
        kind: MemoryKind,
        hob: HobPolicy,
    ) -> Self {
        Self { name, base, length, kind, hob }
    }

    /// Zero-length table terminator.
    pub const fn sentinel() -> Self {
        Self::new("", 0, 0, MemoryKind::Reserved, HobPolicy::None)
    }

    pub fn end(&self) -> u64 {
        self.base + self.length
    }
}

/// Read-only view over a sentinel-terminated region table.
#[derive(Clone, Copy)]
pub struct MemoryMap<'a> {
    table: &'a [MemoryRegion],
}

impl<'a> MemoryMap<'a> {
    pub const fn new(table: &'a [MemoryRegion]) -> Self {
        Self { table }
    }

    /// Find a region by name, ASCII case-insensitive.
    ///
    /// Scans from the start on every call; the table is small and static.
    /// The zero-length terminator stops the scan and is never reported as a
    /// match, even for an empty name.
    pub fn lookup(&self, name: &str) -> Option<&'a MemoryRegion> {
        self.entries().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Iterate live entries, stopping at the terminator.
    pub fn entries(&self) -> impl Iterator<Item = &'a MemoryRegion> {
        self.table.iter().take_while(|r| r.length != 0)
    }
}

/// SM8150 reference board memory map. Ascending, non-overlapping; DRAM
/// starts at 2 GiB, the first GiB of the address space is SoC peripheral
/// space. Bases and lengths are 2 MiB aligned so the MMU plan can block-map
/// every mapped region.
pub const SM8150_MEMORY_MAP: &[MemoryRegion] = &[
    MemoryRegion::new("SoC MMIO", 0x0000_0000, 0x4000_0000, MemoryKind::Device, HobPolicy::None),
    MemoryRegion::new("HLOS", 0x8000_0000, 0x0560_0000, MemoryKind::Ram, HobPolicy::Resource),
    MemoryRegion::new("Hypervisor", 0x8560_0000, 0x0070_0000, MemoryKind::Reserved, HobPolicy::ReservedResource),
    MemoryRegion::new("MPSS_EFS", 0x85D0_0000, 0x0020_0000, MemoryKind::Reserved, HobPolicy::Guid),
    MemoryRegion::new("SMEM", 0x8600_0000, 0x0020_0000, MemoryKind::Shared, HobPolicy::ReservedResource),
    MemoryRegion::new("ADSP_EFS", 0x8620_0000, 0x0020_0000, MemoryKind::Reserved, HobPolicy::Guid),
    MemoryRegion::new("PIL Reserved", 0x8640_0000, 0x0A40_0000, MemoryKind::Reserved, HobPolicy::ReservedResource),
    MemoryRegion::new("UEFI Pool", 0x9080_0000, 0x0800_0000, MemoryKind::Ram, HobPolicy::Resource),
    MemoryRegion::new("TGCM", 0x9880_0000, 0x0140_0000, MemoryKind::Reserved, HobPolicy::Guid),
    MemoryRegion::new("Display Reserved", 0x99C0_0000, 0x0240_0000, MemoryKind::Reserved, HobPolicy::ReservedResource),
    MemoryRegion::new("PStore", 0x9C00_0000, 0x0020_0000, MemoryKind::Shared, HobPolicy::ReservedResource),
    MemoryRegion::new("UEFI FD", 0x9FC0_0000, 0x0040_0000, MemoryKind::Ram, HobPolicy::Resource),
    MemoryRegion::new("SDRAM", 0xA000_0000, 0x6000_0000, MemoryKind::Ram, HobPolicy::Resource),
    MemoryRegion::sentinel(),
];

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[MemoryRegion] = &[
        MemoryRegion::new("PStore", 0x9BC0_0000, 0x0020_0000, MemoryKind::Shared, HobPolicy::None),
        MemoryRegion::new("TGCM", 0x9840_0000, 0x0140_0000, MemoryKind::Reserved, HobPolicy::Guid),
        MemoryRegion::sentinel(),
        // Unreachable: the terminator above must stop the scan.
        MemoryRegion::new("Ghost", 0xDEAD_0000, 0x1000, MemoryKind::Ram, HobPolicy::None),
    ];

    #[test]
    fn lookup_finds_by_name_case_insensitive() {
        let map = MemoryMap::new(TABLE);
        let r = map.lookup("pstore").unwrap();
        assert_eq!(r.base, 0x9BC0_0000);
        assert_eq!(r.length, 0x0020_0000);
        assert!(map.lookup("tgcm").is_some());
    }

    #[test]
    fn lookup_miss_returns_none() {
        let map = MemoryMap::new(TABLE);
        assert!(map.lookup("MPSS_EFS").is_none());
    }

    #[test]
    fn sentinel_never_matches() {
        let map = MemoryMap::new(TABLE);
        // The empty name equals the sentinel's name; it must still miss.
        assert!(map.lookup("").is_none());
    }

    #[test]
    fn entries_stop_at_sentinel() {
        let map = MemoryMap::new(TABLE);
        assert_eq!(map.entries().count(), 2);
        assert!(map.lookup("Ghost").is_none());
    }

    #[test]
    fn board_map_is_terminated_and_nonoverlapping() {
        let map = MemoryMap::new(SM8150_MEMORY_MAP);
        let mut prev_end = 0u64;
        for r in map.entries() {
            assert!(r.base >= prev_end, "{} overlaps previous region", r.name);
            prev_end = r.end();
        }
        assert_eq!(SM8150_MEMORY_MAP.last().unwrap().length, 0);
    }
}
