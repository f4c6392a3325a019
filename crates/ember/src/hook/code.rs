//! Redirect instruction emission.
//!
//! Two sequences per architecture: a jump used to divert a hooked site, and
//! a call used inside trampolines. 32-bit images use rel32 forms, which
//! reach the whole address space there. 64-bit images cannot count on a
//! ±2 GiB distance between an engine module and the launcher, so they use an
//! absolute jump through rax — a scratch register at every site the catalog
//! hooks, which is a curation requirement, not something checked here.

/// Site bytes consumed by a redirect on 32-bit images (`jmp rel32`).
pub(crate) const REDIRECT_LEN_X86: usize = 5;

/// Site bytes consumed by a redirect on 64-bit images
/// (`mov rax, imm64; jmp rax`).
pub(crate) const REDIRECT_LEN_X64: usize = 12;

/// Redirect length for the architecture this launcher was built for.
pub(crate) const REDIRECT_LEN: usize = if cfg!(target_pointer_width = "64") {
    REDIRECT_LEN_X64
} else {
    REDIRECT_LEN_X86
};

/// rel32 displacement from the end of an instruction of `inst_len` bytes
/// emitted at `from`.
#[cfg(not(target_pointer_width = "64"))]
fn rel32(from: usize, to: usize, inst_len: usize) -> [u8; 4] {
    (to.wrapping_sub(from + inst_len) as u32).to_le_bytes()
}

/// Absolute jump to `target`, assembled for emission at `at`.
#[cfg(target_pointer_width = "64")]
pub(crate) fn jmp(_at: usize, target: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(REDIRECT_LEN_X64);
    out.extend_from_slice(&[0x48, 0xB8]); // mov rax, imm64
    out.extend_from_slice(&(target as u64).to_le_bytes());
    out.extend_from_slice(&[0xFF, 0xE0]); // jmp rax
    out
}

#[cfg(not(target_pointer_width = "64"))]
pub(crate) fn jmp(at: usize, target: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(REDIRECT_LEN_X86);
    out.push(0xE9);
    out.extend_from_slice(&rel32(at, target, REDIRECT_LEN_X86));
    out
}

/// Call to `target`, assembled for emission at `at`.
#[cfg(target_pointer_width = "64")]
pub(crate) fn call(_at: usize, target: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(12);
    out.extend_from_slice(&[0x48, 0xB8]); // mov rax, imm64
    out.extend_from_slice(&(target as u64).to_le_bytes());
    out.extend_from_slice(&[0xFF, 0xD0]); // call rax
    out
}

#[cfg(not(target_pointer_width = "64"))]
pub(crate) fn call(at: usize, target: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    out.push(0xE8);
    out.extend_from_slice(&rel32(at, target, 5));
    out
}
