//! console.rs — Console connect tables and preferred-console resolution
//!
//! The boot-device-selection subsystem asks the board three questions at
//! fixed points in its flow: which consoles to connect, which devices must
//! be connected before anything else, and which devices to bring up when
//! console-in connects. All three answers are compile-time tables. The
//! must-connect hook doubles as the board's one chance to run work that has
//! to happen before enumeration: shared-region protection and
//! description-table patching.

use bitflags::bitflags;

use crate::acpi::{self, AslPatcher};
use crate::chipinfo::ProtocolRegistry;
use crate::devicepath::{self, is_end_only, DISPLAY_DEVICE_PATH, KEYPAD_DEVICE_PATH};
use crate::memmap::MemoryMap;
use crate::rfs::{self, SharedAreaProtector};

bitflags! {
    /// Role a console device plays; a device may hold several.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ConsoleRole: u32 {
        const CONSOLE_IN = 1 << 0;
        const CONSOLE_OUT = 1 << 1;
        const STD_ERROR = 1 << 2;
    }
}

/// One (device path, role) pair in the console connect table.
pub struct ConsoleConnectEntry {
    pub device_path: &'static devicepath::VendorDevicePath,
    pub role: ConsoleRole,
}

/// Platform console devices: keypad in, panel out + error.
pub fn platform_console_list() -> &'static [ConsoleConnectEntry] {
    static CONSOLES: [ConsoleConnectEntry; 2] = [
        ConsoleConnectEntry {
            device_path: &KEYPAD_DEVICE_PATH,
            role: ConsoleRole::CONSOLE_IN,
        },
        ConsoleConnectEntry {
            device_path: &DISPLAY_DEVICE_PATH,
            role: ConsoleRole::CONSOLE_OUT.union(ConsoleRole::STD_ERROR),
        },
    ];
    &CONSOLES
}

/// Devices to connect when console-in comes up. None on this board.
pub fn platform_connect_on_con_in_list() -> &'static [&'static [u8]] {
    &[]
}

/// Devices that must be connected at the start of boot-device selection.
///
/// The board has none, but this hook runs exactly once at the right moment,
/// so the shared-region protection and the description-table patch ride on
/// it. Both degrade to a debug-log line on failure; boot-device selection
/// proceeds regardless.
pub fn platform_connect_list(
    map: &MemoryMap<'_>,
    protector: &mut dyn SharedAreaProtector,
    patcher: &mut dyn AslPatcher,
    registry: &dyn ProtocolRegistry,
) -> &'static [&'static [u8]] {
    if let Err(e) = rfs::protect_rfs_shared_area(map, protector) {
        log::debug!(target: "bds", "RFS share protection skipped: {}", e);
    }

    if let Err(e) = acpi::update_platform_tables(patcher, map, registry) {
        log::debug!(target: "bds", "table patch skipped: {}", e);
    }

    &[]
}

/// Opaque handle to a connected controller, owned by the host firmware.
pub type DeviceHandle = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    /// No graphics-output provider sits on the display path.
    NoGraphicsProvider,
    /// A provider exists but does not cover the whole display path.
    PathNotConsumed,
}

impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConsoleError::NoGraphicsProvider => f.write_str("no graphics provider on display path"),
            ConsoleError::PathNotConsumed => f.write_str("display path not fully consumed"),
        }
    }
}

/// Host-firmware services needed to resolve the preferred console.
pub trait ConsoleLocator {
    /// Walk `path` towards the closest handle publishing graphics output.
    /// Returns the handle and the unconsumed remainder of the path.
    fn locate_graphics_provider<'p>(&self, path: &'p [u8]) -> Option<(DeviceHandle, &'p [u8])>;

    /// Connect the controller so its output protocol is live.
    fn connect_controller(&self, handle: DeviceHandle);

    /// The normalized graphics-output device path for a connected handle.
    /// May carry a controller node; the caller must not free it.
    fn graphics_device_path(&self, handle: DeviceHandle) -> Option<&[u8]>;
}

/// The preferred console: the display-path graphics controller, connected
/// and reported with its normalized device path.
pub fn platform_preferred_console(
    locator: &dyn ConsoleLocator,
) -> Result<(DeviceHandle, &[u8]), ConsoleError> {
    let display = DISPLAY_DEVICE_PATH.as_bytes();

    let (handle, remaining) = locator
        .locate_graphics_provider(display)
        .ok_or(ConsoleError::NoGraphicsProvider)?;

    // The provider must sit at the end of the path; a partial match means
    // some other device claimed a prefix of it.
    if !is_end_only(remaining) {
        log::error!(target: "bds", "unable to locate platform preferred console");
        return Err(ConsoleError::PathNotConsumed);
    }

    locator.connect_controller(handle);

    let path = locator
        .graphics_device_path(handle)
        .ok_or(ConsoleError::NoGraphicsProvider)?;

    Ok((handle, path))
}
