//! quirks.rs — SoC register pokes the boot path depends on
//!
//! Two pieces of raw register programming with no abstraction worth the
//! name: both are bit-exact contracts with the SM8150 and run nowhere else.
//! Each poke checks the board's SoC identity first; on anything else it
//! logs and does nothing.

use ember_platform::{BoardConfig, SocId};

use crate::arch;

/// Stop the watchdog reboot timer the prior stage left armed. Without this
/// the SoC resets mid-phase.
pub fn disable_watchdog(board: &BoardConfig) {
    if board.soc != SocId::Sm8150 {
        log::warn!(target: "quirk", "watchdog poke skipped on unknown SoC");
        return;
    }
    log::info!(target: "quirk", "disabling watchdog reboot timer");
    // SAFETY: architected watchdog disable register for this SoC.
    unsafe { arch::mmio_write32(board.watchdog_disable_addr, 0) };
    log::info!(target: "quirk", "watchdog reboot timer disabled");
}

// UFS interconnect context-bank register offsets.
const CB_SCTLR: u64 = 0x00;
const CB_TTBR0_LO: u64 = 0x20;
const CB_TTBR0_HI: u64 = 0x24;
const CB_TTBR1_LO: u64 = 0x28;
const CB_TTBR1_HI: u64 = 0x2C;
const CB_MAIR0: u64 = 0x38;
const CB_MAIR1: u64 = 0x3C;
const CB_TCR: u64 = 0x30;

/// Reprogram the UFS context bank for cache coherency.
///
/// The storage controller is attached to the system MMU on context bank 1,
/// and the configuration inherited from the prior firmware is not
/// coherency-compliant. The value written to the bank control register and
/// the zeroed translation state are the working configuration for this SoC.
pub fn fix_ufs_cache_coherency(board: &BoardConfig) {
    if board.soc != SocId::Sm8150 {
        log::warn!(target: "quirk", "UFS coherency poke skipped on unknown SoC");
        return;
    }

    let cb = board.ufs_smmu_base;
    // SAFETY: fixed context-bank registers for this SoC; values are the
    // bit-exact working configuration.
    unsafe {
        arch::mmio_write32(cb + CB_SCTLR, 0x009F_00E0);
        arch::mmio_write32(cb + CB_TTBR0_LO, 0);
        arch::mmio_write32(cb + CB_TTBR0_HI, 0);
        arch::mmio_write32(cb + CB_TTBR1_LO, 0);
        arch::mmio_write32(cb + CB_TTBR1_HI, 0);
        arch::mmio_write32(cb + CB_MAIR0, 0);
        arch::mmio_write32(cb + CB_MAIR1, 0);
        arch::mmio_write32(cb + CB_TCR, 0);
    }
    log::info!(target: "quirk", "UFS context bank set cache coherent");
}
