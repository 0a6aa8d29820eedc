//! uart.rs — Memory-backed diagnostic sink
//!
//! The board routes early serial output into the PStore region instead of a
//! live UART: the ramoops console picks it up after the OS boots, which is
//! the only way to see this phase fail in the field. The sink clears the
//! region once at init and then appends, wrapping when full.
//!
//! Everything downstream logs through the `log` facade; the logger here is
//! the first thing the sequencer brings up and the reason "diagnostics
//! before everything else" is an ordering invariant rather than a
//! preference.

use core::fmt::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;

/// Byte sink over a fixed memory window.
pub struct PStoreSink {
    base: *mut u8,
    len: usize,
    cursor: usize,
}

// SAFETY: the boot phase has exactly one execution context; the Mutex below
// exists for the API, not for contention.
unsafe impl Send for PStoreSink {}

impl PStoreSink {
    /// Wrap (and clear) the diagnostic window.
    ///
    /// # Safety
    /// `[base, base + len)` must be writable memory owned by the diagnostic
    /// sink for the rest of the phase.
    pub unsafe fn new(base: u64, len: usize) -> Self {
        core::ptr::write_bytes(base as *mut u8, 0, len);
        Self { base: base as *mut u8, len, cursor: 0 }
    }

    fn push(&mut self, byte: u8) {
        if self.len == 0 {
            return;
        }
        // SAFETY: cursor < len by construction; the window is owned.
        unsafe { self.base.add(self.cursor).write_volatile(byte) };
        self.cursor = (self.cursor + 1) % self.len;
    }
}

impl Write for PStoreSink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            self.push(b);
        }
        Ok(())
    }
}

static SINK: Mutex<Option<PStoreSink>> = Mutex::new(None);

/// Install the sink over the given window. Idempotent enough for one boot:
/// a second call re-clears and replaces.
///
/// # Safety
/// Same contract as [`PStoreSink::new`].
pub unsafe fn init(base: u64, len: usize) {
    *SINK.lock() = Some(PStoreSink::new(base, len));
}

struct PStoreLogger;

impl Log for PStoreLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let mut guard = SINK.lock();
        if let Some(sink) = guard.as_mut() {
            let tag = match record.level() {
                Level::Error => "fail",
                Level::Warn => "warn",
                Level::Info => "info",
                Level::Debug | Level::Trace => "dbg ",
            };
            let _ = writeln!(sink, "[{}] {}: {}", tag, record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: PStoreLogger = PStoreLogger;

/// Route the `log` facade into the sink. Safe to call before `init`; lines
/// are dropped until a window exists.
pub fn init_logging() {
    // A second set_logger call can only happen if the entry point re-ran,
    // and the dead loop makes that unreachable; ignore the error anyway.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Trace);
}

/// Boot banner, first lines into a fresh window.
pub fn banner(firmware_version: &str) {
    log::info!(target: "boot", "Ember on SM8150 (AArch64)");
    log::info!(target: "boot", "firmware version {}", firmware_version);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_clears_window_and_appends() {
        let mut buf = vec![0xAAu8; 64];
        let mut sink = unsafe { PStoreSink::new(buf.as_mut_ptr() as u64, buf.len()) };
        assert!(buf.iter().all(|&b| b == 0));

        sink.write_str("hello").unwrap();
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(buf[5], 0);
    }

    #[test]
    fn sink_wraps_when_full() {
        let mut buf = vec![0u8; 8];
        let mut sink = unsafe { PStoreSink::new(buf.as_mut_ptr() as u64, buf.len()) };
        sink.write_str("abcdefgh12").unwrap();
        // "12" wrapped over "ab".
        assert_eq!(&buf[..], b"12cdefgh");
    }

    #[test]
    fn zero_length_window_swallows_output() {
        let mut buf = vec![0u8; 1];
        let mut sink = unsafe { PStoreSink::new(buf.as_mut_ptr() as u64, 0) };
        sink.write_str("dropped").unwrap();
        assert_eq!(buf[0], 0);
    }
}
