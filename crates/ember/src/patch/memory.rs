//! Raw executable-memory rewriting.
//!
//! Everything that touches page protection or writes into a mapped image
//! lives here. The protection flip is scoped: the guard returned by `region`
//! restores the previous protection on every exit path, so a failed write can
//! never leave a page writable.

use std::ptr;

use region::Protection;

use super::PatchError;
use crate::module::Module;

/// Bounds-check a target range and verify it currently holds `expected`.
/// Touches nothing; both failure modes leave the image byte-for-byte intact.
pub(crate) fn expect_bytes(
    module: &Module,
    offset: usize,
    expected: &[u8],
) -> Result<(), PatchError> {
    let current = module
        .slice(offset, expected.len())
        .ok_or(PatchError::OutOfBounds {
            offset,
            len: expected.len(),
            size: module.size(),
        })?;

    if current != expected {
        return Err(PatchError::UnexpectedBytes {
            offset,
            expected: hex(expected),
            found: hex(current),
        });
    }

    Ok(())
}

/// Write `bytes` at `addr`, temporarily making the containing pages
/// writable, then flush the instruction cache for the range.
///
/// # Safety
///
/// `addr` must be valid for `bytes.len()` bytes inside a mapped image, and
/// no other thread may be executing the target range. The launcher
/// guarantees the latter by patching before the engine receives control.
pub(crate) unsafe fn write_bytes(addr: *mut u8, bytes: &[u8]) -> Result<(), PatchError> {
    // SAFETY: caller guarantees the range is mapped.
    let _guard = unsafe { region::protect_with_handle(addr, bytes.len(), Protection::READ_WRITE_EXECUTE) }?;
    // SAFETY: the pages are writable while the guard is alive.
    unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), addr, bytes.len()) };
    drop(_guard);

    flush_icache(addr, bytes.len());
    Ok(())
}

/// Make sure threads that later execute the rewritten range observe the new
/// bytes rather than a stale cached instruction stream.
pub(crate) fn flush_icache(addr: *const u8, len: usize) {
    #[cfg(target_os = "windows")]
    {
        use windows::Win32::System::Diagnostics::Debug::FlushInstructionCache;
        use windows::Win32::System::Threading::GetCurrentProcess;

        // SAFETY: flushing a range of our own address space has no
        // preconditions; a failure here is not actionable.
        let _ = unsafe { FlushInstructionCache(GetCurrentProcess(), Some(addr.cast()), len) };
    }
    #[cfg(not(target_os = "windows"))]
    {
        // x86 keeps instruction fetch coherent with data writes; a fence is
        // enough to order the writes before any later execution.
        let _ = (addr, len);
        std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
    }
}

/// Render a byte sequence for error messages.
pub(crate) fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_renders_spaced_bytes() {
        assert_eq!(hex(&[0x74, 0x1A, 0x00]), "74 1a 00");
        assert_eq!(hex(&[]), "");
    }

    #[test]
    fn write_bytes_rewrites_heap_memory() {
        let mut image = vec![0u8; 16].into_boxed_slice();
        let addr = image.as_mut_ptr();
        unsafe { write_bytes(addr.add(4), &[0xAA, 0xBB]).unwrap() };
        assert_eq!(&image[..8], &[0, 0, 0, 0, 0xAA, 0xBB, 0, 0]);
    }
}
