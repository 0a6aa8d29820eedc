//! error.rs — Boot-phase error taxonomy
//!
//! Every fallible step funnels into one enum so the sequencer has a single
//! fatal path. There is no recovery tier: by the time any of these fire, no
//! recovery infrastructure exists, so the only consumer is the halt path's
//! log line.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// Layout arithmetic left the configured DRAM window.
    LayoutOverflow,
    /// The phase stack does not fit inside the UEFI pool.
    StackTooLarge,
    /// A named region required at this point is absent from the memory map.
    RegionMissing(&'static str),
    /// A mapped region is not block-alignable.
    MisalignedRegion,
    /// The translation plan is over capacity or outside the VA range.
    PlanOverflow,
    /// A region conflicts with an already-placed block mapping.
    OverlappingPlan,
    /// The translation-table arena ran out of pages.
    TranslationArenaExhausted,
    /// The HOB arena cannot hold another record.
    HobArenaExhausted,
    /// A boot-time page allocation does not fit below the free-memory top.
    AllocExhausted,
    /// Firmware volume signature or geometry is wrong.
    FvCorrupt,
    /// No firmware-volume-image file in the outer volume.
    FvImageNotFound,
    /// The expected section is missing from a file.
    SectionNotFound,
    /// The compressed section did not inflate to its declared size.
    DecompressFailed,
    /// No next-phase core file in the inner volume.
    CoreNotFound,
    /// The next-phase image is not a well-formed PE image.
    BadPeImage,
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::LayoutOverflow => f.write_str("memory layout overflows DRAM window"),
            BootError::StackTooLarge => f.write_str("stack larger than UEFI pool"),
            BootError::RegionMissing(name) => write!(f, "memory map region missing: {}", name),
            BootError::MisalignedRegion => f.write_str("region not block-aligned"),
            BootError::PlanOverflow => f.write_str("translation plan overflow"),
            BootError::OverlappingPlan => f.write_str("overlapping translation plan entries"),
            BootError::TranslationArenaExhausted => f.write_str("translation arena exhausted"),
            BootError::HobArenaExhausted => f.write_str("HOB arena exhausted"),
            BootError::AllocExhausted => f.write_str("boot allocation exhausted"),
            BootError::FvCorrupt => f.write_str("firmware volume corrupt"),
            BootError::FvImageNotFound => f.write_str("no firmware volume image file"),
            BootError::SectionNotFound => f.write_str("section not found"),
            BootError::DecompressFailed => f.write_str("firmware volume decompression failed"),
            BootError::CoreNotFound => f.write_str("next-phase core not found"),
            BootError::BadPeImage => f.write_str("next-phase image is not valid PE"),
        }
    }
}
