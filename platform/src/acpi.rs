//! acpi.rs — Description-table patching from the chip snapshot
//!
//! The flashed ACPI tables carry named placeholder fields; after protocol
//! discovery the firmware overwrites each one with the value read from
//! hardware. Writes are one-directional and verbatim: nothing is read back,
//! nothing is validated. The patch surface is a 4-character tag plus a
//! fixed-size little-endian payload, one call per field.
//!
//! Failure model: a missing protocol aborts the whole pass before the first
//! write (all-or-nothing at discovery granularity, logged on the debug
//! channel only); a missing memory-map region degrades its fields to zero
//! and the pass continues.

use crate::chipinfo::{self, ChipSnapshot, ProtocolError, ProtocolRegistry, ProtocolSet};
use crate::memmap::MemoryMap;

/// 4-character table tag packed little-endian, matching the byte order the
/// table compiler emits.
pub const fn signature_32(tag: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*tag)
}

/// Table patch sink. Propagation cannot fail once protocols are located, so
/// the sink is infallible; an implementation that cannot find a tag simply
/// leaves the placeholder in place.
pub trait AslPatcher {
    fn update(&mut self, signature: u32, payload: &[u8]);
}

/// An (address, length) half of a split region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfRegion {
    pub base: u64,
    pub length: u64,
}

/// Split one region into two equal halves: the low half at the original
/// base, the high half starting at base + length/2.
pub fn split_half_regions(base: u64, length: u64) -> (HalfRegion, HalfRegion) {
    let half = length / 2;
    (
        HalfRegion { base, length: half },
        HalfRegion { base: base + half, length: half },
    )
}

// Fixed values for slots with no runtime source on this board.
const STORAGE_TYPE_UFS: u32 = 0x1;
const UFS_SLOT_UNUSED: u32 = 0xFFFF_FFFF;
const USB3_PRIMARY_PORT: u32 = 0x0;
const USB3_SECONDARY_UNUSED: u32 = 0xFFFF_FFFF;
const TPM_AVAILABLE: u32 = 0x1;
const TPM_DTPM_TAG: u32 = 0x6654_504D;
const PEP_RESOURCE_UNSET: u32 = 0xFFFF_FFFF;

/// Patch every identification field in the description tables.
///
/// Protocol discovery is the only failure point; the error is for the debug
/// log, there is nothing else to surface it to.
pub fn update_platform_tables(
    patcher: &mut dyn AslPatcher,
    map: &MemoryMap<'_>,
    registry: &dyn ProtocolRegistry,
) -> Result<(), ProtocolError> {
    let protocols = ProtocolSet::locate(registry)?;

    let mpss_efs = map.lookup("MPSS_EFS");
    let adsp_efs = map.lookup("ADSP_EFS");
    let tgcm = map.lookup("TGCM");

    let snap = ChipSnapshot::capture(&protocols);
    let feature_code = chipinfo::read_feature_code();

    // Modem EFS: one region, reported whole.
    let (modem_base, modem_len) = mpss_efs.map_or((0, 0), |r| (r.base, r.length));

    // ADSP EFS carveout is shared: ADSP keeps the low half, the modem RFS
    // client gets the high half.
    let (adsp_half, modem_rfs_half) = adsp_efs
        .map(|r| split_half_regions(r.base, r.length))
        .unwrap_or((HalfRegion { base: 0, length: 0 }, HalfRegion { base: 0, length: 0 }));

    let (tgcm_base, tgcm_len) = tgcm.map_or((0, 0), |r| (r.base, r.length));

    log::warn!(target: "acpi", "chip id: {}", snap.chip_id);
    log::warn!(target: "acpi", "chip version: {}.{}", snap.version_major(), snap.version_minor());
    log::warn!(target: "acpi", "chip serial: {:#x}", snap.serial());
    log::warn!(target: "acpi", "platform subtype: {}", snap.platform_subtype);

    patcher.update(signature_32(b"SOID"), &snap.chip_id.to_le_bytes());
    patcher.update(signature_32(b"STOR"), &STORAGE_TYPE_UFS.to_le_bytes());
    patcher.update(signature_32(b"SIDV"), &snap.version.to_le_bytes());
    patcher.update(signature_32(b"SVMJ"), &snap.version_major().to_le_bytes());
    patcher.update(signature_32(b"SVMI"), &snap.version_minor().to_le_bytes());
    patcher.update(signature_32(b"SDFE"), &snap.family.to_le_bytes());
    patcher.update(signature_32(b"SIDM"), &snap.modem_support.to_le_bytes());
    patcher.update(signature_32(b"SUFS"), &UFS_SLOT_UNUSED.to_le_bytes());
    patcher.update(signature_32(b"PUS3"), &USB3_PRIMARY_PORT.to_le_bytes());
    patcher.update(signature_32(b"SUS3"), &USB3_SECONDARY_UNUSED.to_le_bytes());
    patcher.update(signature_32(b"SIDT"), &feature_code.to_le_bytes());
    patcher.update(signature_32(b"SOSN"), &snap.serial().to_le_bytes());
    patcher.update(signature_32(b"PLST"), &snap.platform_subtype.to_le_bytes());
    patcher.update(signature_32(b"RMTB"), &(modem_base as u32).to_le_bytes());
    patcher.update(signature_32(b"RMTX"), &(modem_len as u32).to_le_bytes());
    patcher.update(signature_32(b"RFMB"), &(modem_rfs_half.base as u32).to_le_bytes());
    patcher.update(signature_32(b"RFMS"), &(modem_rfs_half.length as u32).to_le_bytes());
    patcher.update(signature_32(b"RFAB"), &(adsp_half.base as u32).to_le_bytes());
    patcher.update(signature_32(b"RFAS"), &(adsp_half.length as u32).to_le_bytes());
    patcher.update(signature_32(b"TPMA"), &TPM_AVAILABLE.to_le_bytes());
    patcher.update(signature_32(b"TDTV"), &TPM_DTPM_TAG.to_le_bytes());
    patcher.update(signature_32(b"TCMA"), &(tgcm_base as u32).to_le_bytes());
    patcher.update(signature_32(b"TCML"), &(tgcm_len as u32).to_le_bytes());
    patcher.update(signature_32(b"SOSI"), &snap.build_record_addr.to_le_bytes());
    patcher.update(signature_32(b"PRP0"), &PEP_RESOURCE_UNSET.to_le_bytes());
    patcher.update(signature_32(b"PRP1"), &PEP_RESOURCE_UNSET.to_le_bytes());
    patcher.update(signature_32(b"PRP2"), &PEP_RESOURCE_UNSET.to_le_bytes());
    patcher.update(signature_32(b"PRP3"), &PEP_RESOURCE_UNSET.to_le_bytes());
    patcher.update(signature_32(b"SIDS"), &snap.id_string);

    Ok(())
}
