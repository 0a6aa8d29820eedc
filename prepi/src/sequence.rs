//! sequence.rs — The boot handoff sequence
//!
//! One linear pass from "the prior stage just branched here" to "the next
//! phase owns the machine". The order is load-bearing end to end:
//!
//! 1. Diagnostic sink first — nothing else may log before it exists.
//! 2. FP/branch-prediction enablement before any vectorizable code runs.
//! 3. Memory layout before HOB construction; the arena lives inside it.
//! 4. Data cache invalidated for the firmware image before the MMU comes up.
//! 5. The HOB list exists (and is installed) before any platform HOB step.
//! 6. Deferred constructors only after the list is process-wide state.
//!
//! There is no recovery tier and no caller: any error is logged and the
//! core parks forever in [`arch::dead_loop`].

use ember_platform::BoardConfig;

use crate::arch;
use crate::error::BootError;
use crate::fv;
use crate::hob::{self, HobList, BOOT_WITH_FULL_CONFIGURATION};
use crate::layout::MemoryLayout;
use crate::mmu;
use crate::platform_hobs;
use crate::quirks;
use crate::uart;

/// Raw register state handed over by the prior boot stage. Trusted by
/// contract; there is nothing to validate it against this early.
#[derive(Debug, Clone, Copy)]
pub struct HandoffArgs {
    pub stack_base: u64,
    pub stack_size: u64,
    pub kernel_load_address: u64,
    pub device_tree_load_address: u64,
}

/// Deferred initializer: runs after the HOB list is installed, may read it,
/// must not fail.
pub type Constructor = (&'static str, fn());

/// Everything the sequencer needs, built by the entry point. Immutable.
pub struct BootEnv {
    pub board: &'static BoardConfig,
    pub constructors: &'static [Constructor],
}

/// Where the successful sequence ends up: the next phase's entry point and
/// the HOB list it receives.
struct Handoff {
    entry: u64,
    hob_list: u64,
}

/// Drive the whole sequence. Never returns: either control transfers to the
/// next phase or the core parks.
pub fn run(env: &BootEnv, args: HandoffArgs) -> ! {
    let map = env.board.memory_map();

    // Diagnostics before anything that might want to log. A board without a
    // PStore window boots silent rather than not at all.
    if let Some(pstore) = map.lookup("PStore") {
        // SAFETY: the PStore region is reserved for the diagnostic sink.
        unsafe { uart::init(pstore.base, pstore.length as usize) };
    }
    uart::init_logging();

    arch::enable_vfp();
    arch::enable_branch_prediction();

    uart::banner(env.board.firmware_version);

    match boot(env, &args) {
        Ok(handoff) => {
            log::info!(target: "boot", "transferring to next phase at {:#x}", handoff.entry);
            transfer(handoff)
        }
        Err(err) => fatal(err),
    }
}

fn boot(env: &BootEnv, args: &HandoffArgs) -> Result<Handoff, BootError> {
    let board = env.board;
    let map = board.memory_map();

    let layout = MemoryLayout::compute(board, args.stack_size)?;
    log::info!(
        target: "boot",
        "UEFI memory base = {:#x}, size = {:#x}, stack base = {:#x}, stack size = {:#x}",
        layout.uefi_base,
        layout.uefi_size,
        layout.stack_base,
        layout.stack_size,
    );
    log::info!(
        target: "boot",
        "kernel load address = {:#x}, device tree load address = {:#x}",
        args.kernel_load_address,
        args.device_tree_load_address,
    );

    quirks::disable_watchdog(board);

    // SAFETY: the layout places the arena inside the UEFI pool, which this
    // phase owns outright until handoff.
    let mut hob_list = unsafe {
        HobList::construct(
            layout.uefi_base,
            layout.uefi_size,
            layout.uefi_base,
            layout.stack_base,
        )
    }?;
    hob::install(&hob_list);

    // The firmware image must be clean in the cache hierarchy before the
    // MMU (and the caches behind it) come up.
    arch::invalidate_dcache_range(layout.fd_base, layout.fd_size);

    mmu::configure(&map, &layout, &mut hob_list)?;
    log::info!(target: "boot", "MMU configured from device map");

    hob_list.build_stack_hob(layout.stack_base, layout.stack_size)?;
    hob_list.build_cpu_hob(arch::phys_address_bits(), board.cpu_io_size)?;
    hob_list.set_boot_mode(BOOT_WITH_FULL_CONFIGURATION);

    platform_hobs::install(&map, &layout, &mut hob_list)?;

    run_constructors(env.constructors);

    let entry = chain_next_volume(&layout, &mut hob_list)?;

    quirks::fix_ufs_cache_coherency(board);

    Ok(Handoff { entry, hob_list: hob_list.phit_addr() })
}

/// Run the deferred initializers. They may consult the installed HOB list,
/// so the caller must have published it first.
pub fn run_constructors(constructors: &[Constructor]) {
    debug_assert!(hob::installed().is_some());
    for (name, ctor) in constructors {
        log::debug!(target: "boot", "constructor: {}", name);
        ctor();
    }
}

/// Decompress the inner firmware volume out of the flashed image and
/// resolve the next-phase core's entry point.
fn chain_next_volume(layout: &MemoryLayout, hob_list: &mut HobList) -> Result<u64, BootError> {
    // SAFETY: the firmware device range is board configuration; mapped
    // read-only normal memory by this point.
    let fd = unsafe {
        core::slice::from_raw_parts(layout.fd_base as *const u8, layout.fd_size as usize)
    };
    let outer = fv::FirmwareVolume::parse(fd)?;

    let uncompressed = fv::fv_image_uncompressed_size(&outer)? as u64;
    let pages = uncompressed.div_ceil(4096);
    let scratch_base = hob_list.alloc_pages(pages)?;
    // SAFETY: freshly carved pages, exclusively owned.
    let scratch = unsafe {
        core::slice::from_raw_parts_mut(scratch_base as *mut u8, (pages * 4096) as usize)
    };

    let written = fv::decompress_fv_image(&outer, scratch)?;
    log::info!(
        target: "boot",
        "inner volume: {:#x} bytes at {:#x}",
        written,
        scratch_base,
    );
    hob_list.build_fv_hob(scratch_base, written as u64)?;

    fv::find_core_entry(&scratch[..written], scratch_base)
}

/// Hand the machine to the next phase.
fn transfer(handoff: Handoff) -> ! {
    #[cfg(target_arch = "aarch64")]
    {
        // Next-phase entry contract: receives the HOB list, never returns.
        type PhaseEntry = extern "C" fn(*const core::ffi::c_void) -> !;
        // SAFETY: the entry address was resolved from a well-formed core
        // image inside the volume this phase just decompressed.
        let entry: PhaseEntry = unsafe { core::mem::transmute(handoff.entry) };
        entry(handoff.hob_list as *const core::ffi::c_void)
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        let _: (u64, u64) = (handoff.entry, handoff.hob_list);
        arch::dead_loop()
    }
}

/// Terminal failure: log the reason and park. No retry, no return.
fn fatal(err: BootError) -> ! {
    log::error!(target: "boot", "fatal: {}", err);
    arch::dead_loop()
}
