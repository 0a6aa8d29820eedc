//! chipinfo.rs — Hardware-query protocol seams and the chip snapshot
//!
//! Three vendor protocols describe the silicon and the board: chip
//! identification, shared-memory query, and platform info. The firmware
//! consults them exactly once per boot and copies the answers verbatim into
//! description-table slots. Discovery is all-or-nothing: if any protocol is
//! absent, nothing downstream runs. Once a `ProtocolSet` exists, value
//! propagation cannot fail — the getters are infallible by contract.

use core::fmt;

/// Fixed length of the chip id string, NUL padded.
pub const CHIP_ID_STRING_LEN: usize = 32;

/// Shared-memory function selector for the hardware/software build record.
pub const SMEM_HW_SW_BUILD_ID: u32 = 137;

/// Chip-identification protocol.
pub trait ChipInfo {
    fn chip_id(&self) -> u32;
    /// Combined version word: major in bits 31..16, minor in bits 15..0.
    fn chip_version(&self) -> u32;
    fn chip_family(&self) -> u16;
    fn modem_support(&self) -> u16;
    /// Low half of the 64-bit serial.
    fn serial_number(&self) -> u32;
    /// High half of the 64-bit serial, from the QFPROM fuses.
    fn qfprom_chip_id(&self) -> u32;
    fn chip_id_string(&self, out: &mut [u8; CHIP_ID_STRING_LEN]);
}

/// One shared-memory table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmemEntry {
    pub size: u32,
    pub address: u64,
}

/// Shared-memory query protocol. A selector the table does not carry yields
/// `None`; the caller degrades that field to zero.
pub trait SharedMem {
    fn query(&self, func: u32) -> Option<SmemEntry>;
}

/// Platform-info protocol result.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformInfoData {
    pub platform: u32,
    pub version: u32,
    pub subtype: u32,
}

pub trait PlatformInfo {
    fn platform_info(&self) -> PlatformInfoData;
}

/// Discovery surface the host firmware implements. Each accessor returns
/// `None` when the protocol has not been published.
pub trait ProtocolRegistry {
    fn chip_info(&self) -> Option<&dyn ChipInfo>;
    fn shared_mem(&self) -> Option<&dyn SharedMem>;
    fn platform_info(&self) -> Option<&dyn PlatformInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    ChipInfoUnavailable,
    SharedMemUnavailable,
    PlatformInfoUnavailable,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolError::ChipInfoUnavailable => "chip-info protocol unavailable",
            ProtocolError::SharedMemUnavailable => "shared-memory protocol unavailable",
            ProtocolError::PlatformInfoUnavailable => "platform-info protocol unavailable",
        };
        f.write_str(name)
    }
}

/// The three protocols, located together or not at all.
pub struct ProtocolSet<'a> {
    pub chip: &'a dyn ChipInfo,
    pub smem: &'a dyn SharedMem,
    pub plat: &'a dyn PlatformInfo,
}

impl<'a> ProtocolSet<'a> {
    /// All-or-nothing discovery. The first missing protocol aborts the whole
    /// location; callers must not act on a partial set.
    pub fn locate(registry: &'a dyn ProtocolRegistry) -> Result<Self, ProtocolError> {
        let chip = registry.chip_info().ok_or(ProtocolError::ChipInfoUnavailable)?;
        let smem = registry.shared_mem().ok_or(ProtocolError::SharedMemUnavailable)?;
        let plat = registry.platform_info().ok_or(ProtocolError::PlatformInfoUnavailable)?;
        Ok(Self { chip, smem, plat })
    }
}

/// One-shot copy of everything the description tables need. Captured once
/// per boot and read-only afterwards.
pub struct ChipSnapshot {
    pub chip_id: u32,
    pub version: u32,
    pub family: u16,
    pub modem_support: u16,
    pub serial_lo: u32,
    pub serial_hi: u32,
    pub id_string: [u8; CHIP_ID_STRING_LEN],
    /// Address half of the hardware/software build record, zero if absent.
    pub build_record_addr: u64,
    pub platform_subtype: u32,
}

impl ChipSnapshot {
    pub fn capture(protocols: &ProtocolSet<'_>) -> Self {
        let mut id_string = [0u8; CHIP_ID_STRING_LEN];
        protocols.chip.chip_id_string(&mut id_string);

        let build_record = protocols.smem.query(SMEM_HW_SW_BUILD_ID);
        let info = protocols.plat.platform_info();

        Self {
            chip_id: protocols.chip.chip_id(),
            version: protocols.chip.chip_version(),
            family: protocols.chip.chip_family(),
            modem_support: protocols.chip.modem_support(),
            serial_lo: protocols.chip.serial_number(),
            serial_hi: protocols.chip.qfprom_chip_id(),
            id_string,
            build_record_addr: build_record.map(|e| e.address).unwrap_or(0),
            platform_subtype: info.subtype,
        }
    }

    /// Major version: bits 31..16 of the combined word.
    pub fn version_major(&self) -> u16 {
        (self.version >> 16) as u16
    }

    /// Minor version: bits 15..0 of the combined word.
    pub fn version_minor(&self) -> u16 {
        self.version as u16
    }

    /// Full serial: QFPROM id shifted into bits 63..32 over the low half.
    pub fn serial(&self) -> u64 {
        ((self.serial_hi as u64) << 32) | self.serial_lo as u64
    }
}

/// Feature-code fuse, read straight out of QFPROM-mapped IMEM. The field is
/// bits 27..20 of the fuse word.
pub const FEATURE_CODE_FUSE_ADDR: u64 = 0x0078_4130;

pub fn read_feature_code() -> u32 {
    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: fixed SoC fuse address, readable from the boot context.
        let word = unsafe { core::ptr::read_volatile(FEATURE_CODE_FUSE_ADDR as *const u32) };
        (word & 0x0FF0_0000) >> 20
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        0
    }
}


#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;

    #[test]
    fn version_word_splits_into_halves() {
        let registry = MockRegistry::complete();
        let set = ProtocolSet::locate(&registry).unwrap();
        let snap = ChipSnapshot::capture(&set);
        assert_eq!(snap.version_major(), 0x0003);
        assert_eq!(snap.version_minor(), 0x0007);
    }

    #[test]
    fn serial_concatenates_qfprom_high() {
        let registry = MockRegistry::complete();
        let set = ProtocolSet::locate(&registry).unwrap();
        let snap = ChipSnapshot::capture(&set);
        assert_eq!(snap.serial(), 0x0000_0002_0000_0001);
    }

    #[test]
    fn locate_is_all_or_nothing() {
        let mut registry = MockRegistry::complete();
        registry.smem = None;
        assert_eq!(
            ProtocolSet::locate(&registry).err(),
            Some(ProtocolError::SharedMemUnavailable)
        );

        let mut registry = MockRegistry::complete();
        registry.chip = None;
        assert_eq!(
            ProtocolSet::locate(&registry).err(),
            Some(ProtocolError::ChipInfoUnavailable)
        );
    }

    #[test]
    fn missing_build_record_degrades_to_zero() {
        let mut registry = MockRegistry::complete();
        registry.smem = Some(MockSmem { entry: None });
        let set = ProtocolSet::locate(&registry).unwrap();
        let snap = ChipSnapshot::capture(&set);
        assert_eq!(snap.build_record_addr, 0);
    }
}
