//! Ember Platform Library — SM8150 Reference Board Description
//!
//! Everything the boot-device-selection subsystem needs to know about the
//! board, expressed as data rather than discovery:
//! - Static platform memory map with lookup-by-name
//! - Console connect tables and device-path accessors
//! - USB port classification for boot-option filtering
//! - Chip-identification snapshot and description-table patching
//!
//! The library is freestanding and side-effect free at module scope. All
//! host-firmware services (protocol discovery, table patching, controller
//! connection) enter through traits so the same code drives real hardware
//! and the test suite.

#![cfg_attr(not(test), no_std)]

pub mod acpi;
pub mod board;
pub mod chipinfo;
pub mod console;
pub mod devicepath;
pub mod memmap;
pub mod rfs;

pub use board::{BoardConfig, SocId, SM8150};
pub use memmap::{MemoryKind, MemoryMap, MemoryRegion};
