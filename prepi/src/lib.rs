//! Ember Pre-EFI Phase — SM8150 Early Boot
//!
//! The earliest firmware code on the application processor: entered from the
//! prior boot stage with nothing but a stack hint and two load addresses, it
//! builds the execution environment the rest of the firmware assumes —
//! memory layout, hand-off block list, caches and MMU — then decompresses
//! the next firmware volume and jumps into it. There is no caller to return
//! to; every failure ends in a logged permanent halt.
//!
//! Everything that is not a register access is ordinary testable code: the
//! layout arithmetic, the HOB arena, the volume walker and the translation
//! plan all build and run on the host. The AArch64 surface is confined to
//! `arch`, `mmu::enable` and the quirk pokes.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod error;
pub mod fv;
pub mod hob;
pub mod layout;
pub mod mmu;
pub mod platform_hobs;
pub mod quirks;
pub mod sequence;
pub mod uart;

pub use error::BootError;
