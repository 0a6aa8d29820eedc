//! main.rs — Pre-EFI phase entry
//!
//! The prior boot stage branches here with the stack already live and four
//! arguments in the calling convention's registers: stack base, stack size,
//! and the staged kernel / device-tree load addresses. Nothing returns; the
//! firmware binary exists only for the bare-metal target, and host builds
//! get a stub so the workspace compiles and tests everywhere.

#![cfg_attr(target_os = "none", no_std, no_main)]

#[cfg(target_os = "none")]
mod firmware {
    use core::panic::PanicInfo;

    use ember_platform::SM8150;
    use ember_prepi::sequence::{self, BootEnv, Constructor, HandoffArgs};
    use ember_prepi::arch;

    /// Deferred initializers for this board. None yet; the machinery runs
    /// them after the HOB list is installed.
    static CONSTRUCTORS: &[Constructor] = &[];

    static ENV: BootEnv = BootEnv { board: &SM8150, constructors: CONSTRUCTORS };

    #[no_mangle]
    pub extern "C" fn _start(
        stack_base: u64,
        stack_size: u64,
        kernel_load_address: u64,
        device_tree_load_address: u64,
    ) -> ! {
        sequence::run(
            &ENV,
            HandoffArgs {
                stack_base,
                stack_size,
                kernel_load_address,
                device_tree_load_address,
            },
        )
    }

    #[panic_handler]
    fn panic(info: &PanicInfo<'_>) -> ! {
        log::error!(target: "boot", "panic: {}", info);
        arch::dead_loop()
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("ember_prepi is firmware; build for the bare-metal AArch64 target");
}
