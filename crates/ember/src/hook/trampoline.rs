//! Trampoline generation for tap hooks.
//!
//! A tap trampoline receives control from the redirect at the hooked site,
//! invokes the launcher handler with the site's argument registers intact,
//! re-executes the displaced original instructions, and jumps back to the
//! continuation address. The displaced sequence comes straight from the
//! catalog's expected bytes, which the curation rules require to be whole,
//! position-independent instructions.

use std::mem::ManuallyDrop;

use region::Protection;

use super::code;
use crate::patch::PatchError;
use crate::patch::memory;

/// An executable buffer holding generated redirect code.
///
/// The allocation is deliberately never freed: once the engine is running,
/// any of its threads may be executing inside the trampoline, so unmapping
/// it is never safe. Dropping a `Trampoline` leaks the pages on purpose.
pub struct Trampoline {
    alloc: ManuallyDrop<region::Allocation>,
    len: usize,
}

impl Trampoline {
    /// Assemble a tap trampoline: call `handler`, replay `displaced`, jump
    /// to `continue_at`.
    pub(crate) fn emit_tap(
        handler: usize,
        displaced: &[u8],
        continue_at: usize,
    ) -> Result<Self, PatchError> {
        let capacity = displaced.len() + 64;
        let mut alloc = region::alloc(capacity, Protection::READ_WRITE_EXECUTE)
            .map_err(PatchError::Trampoline)?;
        let base = alloc.as_mut_ptr::<u8>() as usize;

        let body = Self::assemble(base, handler, displaced, continue_at);
        debug_assert!(body.len() <= capacity);

        // SAFETY: the allocation is writable and at least `body.len()` bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(body.as_ptr(), base as *mut u8, body.len());
        }
        memory::flush_icache(base as *const u8, body.len());

        Ok(Self {
            alloc: ManuallyDrop::new(alloc),
            len: body.len(),
        })
    }

    #[cfg(target_pointer_width = "64")]
    fn assemble(base: usize, handler: usize, displaced: &[u8], continue_at: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(displaced.len() + 64);
        // Preserve every integer argument register of both 64-bit calling
        // conventions, then keep the stack 16-aligned (with shadow space for
        // the Windows ABI) across the handler call.
        out.extend_from_slice(&[0x51]); // push rcx
        out.extend_from_slice(&[0x52]); // push rdx
        out.extend_from_slice(&[0x41, 0x50]); // push r8
        out.extend_from_slice(&[0x41, 0x51]); // push r9
        out.extend_from_slice(&[0x57]); // push rdi
        out.extend_from_slice(&[0x56]); // push rsi
        out.extend_from_slice(&[0x48, 0x83, 0xEC, 0x28]); // sub rsp, 0x28
        out.extend_from_slice(&code::call(base + out.len(), handler));
        out.extend_from_slice(&[0x48, 0x83, 0xC4, 0x28]); // add rsp, 0x28
        out.extend_from_slice(&[0x5E]); // pop rsi
        out.extend_from_slice(&[0x5F]); // pop rdi
        out.extend_from_slice(&[0x41, 0x59]); // pop r9
        out.extend_from_slice(&[0x41, 0x58]); // pop r8
        out.extend_from_slice(&[0x5A]); // pop rdx
        out.extend_from_slice(&[0x59]); // pop rcx
        out.extend_from_slice(displaced);
        let at = base + out.len();
        out.extend_from_slice(&code::jmp(at, continue_at));
        out
    }

    #[cfg(not(target_pointer_width = "64"))]
    fn assemble(base: usize, handler: usize, displaced: &[u8], continue_at: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(displaced.len() + 16);
        out.push(0x60); // pushad
        out.extend_from_slice(&code::call(base + out.len(), handler));
        out.push(0x61); // popad
        out.extend_from_slice(displaced);
        let at = base + out.len();
        out.extend_from_slice(&code::jmp(at, continue_at));
        out
    }

    /// Entry point the hooked site redirects to.
    pub fn entry(&self) -> *const u8 {
        self.alloc.as_ptr::<u8>()
    }

    /// Assembled code length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View of the assembled code, for verification.
    pub fn code(&self) -> &[u8] {
        // SAFETY: `len` bytes were written at the allocation base and the
        // allocation is never freed.
        unsafe { std::slice::from_raw_parts(self.entry(), self.len) }
    }
}
