//! layout.rs — Boot-time memory layout
//!
//! Where everything lives, computed once from the board constants before the
//! first HOB is written. The prior stage hands us a stack pointer, but the
//! layout places its own: the phase stack sits at the top of the UEFI pool,
//! the HOB arena grows up from the bottom, and boot-time page allocations
//! carve down from just under the stack.
//!
//! ```text
//!   uefi_base                                  stack_base    pool end
//!   | PHIT + HOB records ->      ...      <- boot allocs | stack |
//!   ```

use ember_platform::BoardConfig;

use crate::error::BootError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    /// Whole DRAM window.
    pub memory_base: u64,
    pub memory_size: u64,
    /// UEFI pool: HOB arena, boot allocations, phase stack.
    pub uefi_base: u64,
    pub uefi_size: u64,
    /// Phase stack, top of the pool.
    pub stack_base: u64,
    pub stack_size: u64,
    /// Flashed firmware image.
    pub fd_base: u64,
    pub fd_size: u64,
}

impl MemoryLayout {
    /// Compute the layout for this boot. `stack_size` comes from the prior
    /// stage; everything else is board configuration.
    pub fn compute(board: &BoardConfig, stack_size: u64) -> Result<Self, BootError> {
        let memory_base = board.system_memory_base;
        let memory_size = board.system_memory_size;

        let uefi_base = memory_base
            .checked_add(board.prealloc_memory_size)
            .ok_or(BootError::LayoutOverflow)?;
        let uefi_size = board.uefi_pool_size;

        let uefi_end = uefi_base.checked_add(uefi_size).ok_or(BootError::LayoutOverflow)?;
        let memory_end = memory_base
            .checked_add(memory_size)
            .ok_or(BootError::LayoutOverflow)?;
        if uefi_end > memory_end {
            return Err(BootError::LayoutOverflow);
        }

        if stack_size == 0 || stack_size >= uefi_size {
            return Err(BootError::StackTooLarge);
        }
        let stack_base = uefi_end - stack_size;

        Ok(Self {
            memory_base,
            memory_size,
            uefi_base,
            uefi_size,
            stack_base,
            stack_size,
            fd_base: board.fd_base,
            fd_size: board.fd_size,
        })
    }
}
