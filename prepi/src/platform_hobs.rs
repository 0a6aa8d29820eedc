//! platform_hobs.rs — Board-specific HOB installation
//!
//! Once the core HOBs (stack, CPU, boot mode) are in place, the board map is
//! replayed into the list so later phases inherit the same picture of the
//! address space: resource descriptors for DRAM and reserved carveouts,
//! GUID records carrying the bounds of regions a driver will want by name,
//! and the firmware-device volume record.

use ember_platform::memmap::HobPolicy;
use ember_platform::MemoryMap;
use r_efi::efi::Guid;

use crate::error::BootError;
use crate::hob::{
    HobList, ResourceAttributes, RESOURCE_MEMORY_RESERVED, RESOURCE_SYSTEM_MEMORY,
};
use crate::layout::MemoryLayout;

/// Name under which carveout-bound records travel to later phases.
pub const BOARD_REGION_GUID: Guid = Guid::from_fields(
    0x8c68b759,
    0x22e4,
    0x4f93,
    0xb3,
    0x5c,
    &[0x21, 0x5a, 0x7c, 0x0f, 0x8e, 0x02],
);

/// GUID-record payload: region bounds, little-endian.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RegionRecord {
    pub base: u64,
    pub length: u64,
}

fn dram_attributes() -> ResourceAttributes {
    ResourceAttributes::PRESENT
        | ResourceAttributes::INITIALIZED
        | ResourceAttributes::TESTED
        | ResourceAttributes::WRITE_BACK_CACHEABLE
}

fn reserved_attributes() -> ResourceAttributes {
    ResourceAttributes::PRESENT | ResourceAttributes::INITIALIZED
        | ResourceAttributes::UNCACHEABLE
}

/// Replay the memory map into the HOB list, then record the firmware
/// device's volume.
pub fn install(
    map: &MemoryMap<'_>,
    layout: &MemoryLayout,
    hob: &mut HobList,
) -> Result<(), BootError> {
    for region in map.entries() {
        match region.hob {
            HobPolicy::None => {}
            HobPolicy::Resource => {
                hob.build_resource_hob(
                    RESOURCE_SYSTEM_MEMORY,
                    dram_attributes(),
                    region.base,
                    region.length,
                )?;
            }
            HobPolicy::ReservedResource => {
                hob.build_resource_hob(
                    RESOURCE_MEMORY_RESERVED,
                    reserved_attributes(),
                    region.base,
                    region.length,
                )?;
            }
            HobPolicy::Guid => {
                let record = RegionRecord { base: region.base, length: region.length };
                let bytes = unsafe {
                    // SAFETY: repr(C), two u64 fields, no padding.
                    core::slice::from_raw_parts(
                        &record as *const RegionRecord as *const u8,
                        core::mem::size_of::<RegionRecord>(),
                    )
                };
                hob.build_guid_hob(BOARD_REGION_GUID, bytes)?;
            }
        }
    }

    hob.build_fv_hob(layout.fd_base, layout.fd_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hob::{
        HOB_TYPE_FV, HOB_TYPE_GUID_EXTENSION, HOB_TYPE_RESOURCE_DESCRIPTOR,
    };
    use ember_platform::memmap::{MemoryKind, MemoryRegion};
    use ember_platform::{BoardConfig, SM8150};

    #[repr(align(8))]
    struct Arena([u8; 8192]);

    #[test]
    fn map_replays_into_records() {
        const TABLE: &[MemoryRegion] = &[
            MemoryRegion::new("SoC MMIO", 0, 0x4000_0000, MemoryKind::Device, HobPolicy::None),
            MemoryRegion::new("HLOS", 0x8000_0000, 0x0560_0000, MemoryKind::Ram, HobPolicy::Resource),
            MemoryRegion::new("MPSS_EFS", 0x85D0_0000, 0x0020_0000, MemoryKind::Reserved, HobPolicy::Guid),
            MemoryRegion::new("SMEM", 0x8600_0000, 0x0020_0000, MemoryKind::Shared, HobPolicy::ReservedResource),
            MemoryRegion::sentinel(),
        ];

        let arena = Box::new(Arena([0; 8192]));
        let base = arena.0.as_ptr() as u64;
        let mut hob = unsafe { crate::hob::HobList::construct(base, 8192, base, base + 8192) }.unwrap();

        let board = BoardConfig { memory_map: TABLE, ..SM8150 };
        let layout = crate::layout::MemoryLayout::compute(&board, 0x1_0000).unwrap();
        install(&board.memory_map(), &layout, &mut hob).unwrap();

        let resources = hob
            .records()
            .filter(|(t, _, _)| *t == HOB_TYPE_RESOURCE_DESCRIPTOR)
            .count();
        let guids = hob
            .records()
            .filter(|(t, _, _)| *t == HOB_TYPE_GUID_EXTENSION)
            .count();
        let fvs = hob.records().filter(|(t, _, _)| *t == HOB_TYPE_FV).count();

        assert_eq!(resources, 2); // HLOS + SMEM
        assert_eq!(guids, 1); // MPSS_EFS
        assert_eq!(fvs, 1); // firmware device
    }
}
