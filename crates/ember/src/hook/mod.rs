//! Hook installation.
//!
//! A hook is a specialized patch: instead of replacing bytes with fixed
//! data, the site is overwritten with a redirect. Replace hooks jump
//! straight to the launcher handler, which takes over the routine entirely.
//! Tap hooks jump to a generated [`Trampoline`] that calls the handler and
//! then re-executes the displaced original instructions, preserving engine
//! behavior.
//!
//! Installation follows the same verify-before-write discipline as plain
//! patches, applied to the bytes the redirect overwrites. Once installed, a
//! hook is never removed: engine threads may be inside the trampoline at any
//! point after handoff.

pub(crate) mod code;
mod trampoline;

pub use trampoline::Trampoline;

use crate::callbacks::Callbacks;
use crate::catalog::{HandlerId, HookBytes, HookInfo, HookKind};
use crate::module::Module;
use crate::patch::PatchError;
use crate::patch::memory;

/// A hook that has been written into a module. Terminal state: there is no
/// uninstall. The owner keeps this alive (trampoline included) for the rest
/// of the process.
pub struct InstalledHook {
    handler: HandlerId,
    site: usize,
    trampoline: Option<Trampoline>,
}

impl InstalledHook {
    pub fn handler(&self) -> HandlerId {
        self.handler
    }

    /// Absolute address of the rewritten site.
    pub fn site(&self) -> usize {
        self.site
    }

    /// The generated trampoline, present for tap hooks only.
    pub fn trampoline(&self) -> Option<&Trampoline> {
        self.trampoline.as_ref()
    }
}

/// Verify the site and write the redirect. The remainder of the expected
/// range beyond the redirect is NOP-filled so the site disassembles cleanly
/// and replay-continuation lands on an instruction boundary.
pub(crate) fn install(
    module: &Module,
    bytes: &HookBytes,
    info: &HookInfo,
    callbacks: &Callbacks,
) -> Result<InstalledHook, PatchError> {
    if bytes.expected.len() < code::REDIRECT_LEN {
        return Err(PatchError::SiteTooSmall {
            need: code::REDIRECT_LEN,
            have: bytes.expected.len(),
        });
    }

    memory::expect_bytes(module, bytes.offset, bytes.expected)?;

    let site = module.base() as usize + bytes.offset;
    let handler = callbacks.address_of(info.handler);

    let (target, trampoline) = match info.kind {
        HookKind::Replace => (handler, None),
        HookKind::Tap => {
            let tramp =
                Trampoline::emit_tap(handler, bytes.expected, site + bytes.expected.len())?;
            (tramp.entry() as usize, Some(tramp))
        }
    };

    let mut redirect = code::jmp(site, target);
    redirect.resize(bytes.expected.len(), 0x90);

    // SAFETY: the range was bounds-checked by expect_bytes and the install
    // phase is single-threaded.
    unsafe { memory::write_bytes(site as *mut u8, &redirect)? };

    Ok(InstalledHook {
        handler: info.handler,
        site,
        trampoline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CallAbi;
    use crate::module::ModuleKind;

    const PROLOGUE_X64: &[u8] = &[
        0x48, 0x89, 0x5C, 0x24, 0x08, 0x57, 0x48, 0x83, 0xEC, 0x20, 0x48, 0x8B, 0xF9,
    ];
    const PROLOGUE_X86: &[u8] = &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x08];

    fn prologue() -> &'static [u8] {
        if cfg!(target_pointer_width = "64") {
            PROLOGUE_X64
        } else {
            PROLOGUE_X86
        }
    }

    fn seeded_module(offset: usize) -> Module {
        let mut image = vec![0xCCu8; offset + 0x40];
        image[offset..offset + prologue().len()].copy_from_slice(prologue());
        Module::synthetic(ModuleKind::System, image)
    }

    fn hook_info(kind: HookKind) -> HookInfo {
        HookInfo {
            kind,
            abi: CallAbi::System,
            handler: HandlerId::CpuDetect,
            sites: &[],
        }
    }

    fn site_bytes(offset: usize) -> HookBytes {
        HookBytes {
            offset,
            expected: prologue(),
        }
    }

    #[test]
    fn replace_hook_writes_redirect_and_nop_fill() {
        let callbacks = Callbacks::standard();
        let module = seeded_module(0x10);

        let hook = install(
            &module,
            &site_bytes(0x10),
            &hook_info(HookKind::Replace),
            &callbacks,
        )
        .unwrap();

        assert!(hook.trampoline().is_none());
        assert_eq!(hook.site(), module.base() as usize + 0x10);

        let written = module.slice(0x10, prologue().len()).unwrap();
        let expected_redirect =
            code::jmp(hook.site(), callbacks.address_of(HandlerId::CpuDetect));
        assert_eq!(&written[..expected_redirect.len()], &expected_redirect[..]);
        assert!(
            written[expected_redirect.len()..].iter().all(|&b| b == 0x90),
            "fill is not NOPs"
        );
    }

    #[test]
    fn tap_hook_redirects_into_a_trampoline() {
        let callbacks = Callbacks::standard();
        let module = seeded_module(0x20);

        let hook = install(
            &module,
            &site_bytes(0x20),
            &hook_info(HookKind::Tap),
            &callbacks,
        )
        .unwrap();

        let tramp = hook.trampoline().expect("tap hook must own a trampoline");
        // The displaced prologue is preserved inside the trampoline.
        assert!(
            tramp
                .code()
                .windows(prologue().len())
                .any(|w| w == prologue())
        );

        let written = module.slice(0x20, code::REDIRECT_LEN).unwrap();
        let expected_redirect = code::jmp(hook.site(), tramp.entry() as usize);
        assert_eq!(written, &expected_redirect[..]);
    }

    #[test]
    fn drifted_prologue_is_rejected_untouched() {
        let callbacks = Callbacks::standard();
        let mut image = vec![0xCCu8; 0x60];
        let mut drifted = prologue().to_vec();
        drifted[2] ^= 0xFF;
        image[0x10..0x10 + drifted.len()].copy_from_slice(&drifted);
        let module = Module::synthetic(ModuleKind::System, image);

        let result = install(
            &module,
            &site_bytes(0x10),
            &hook_info(HookKind::Replace),
            &callbacks,
        );
        assert!(matches!(result, Err(PatchError::UnexpectedBytes { .. })));
        assert_eq!(module.slice(0x10, drifted.len()).unwrap(), &drifted[..]);
    }

    #[test]
    fn narrow_site_is_rejected() {
        let callbacks = Callbacks::standard();
        let module = seeded_module(0x10);
        let narrow = HookBytes {
            offset: 0x10,
            expected: &[0x55, 0x8B],
        };

        let result = install(
            &module,
            &narrow,
            &hook_info(HookKind::Replace),
            &callbacks,
        );
        assert!(matches!(result, Err(PatchError::SiteTooSmall { .. })));
    }

    /// End-to-end tap semantics on a real executable buffer: the callback
    /// runs, then the displaced original instructions still execute.
    #[cfg(target_arch = "x86_64")]
    mod execution {
        use std::sync::atomic::{AtomicUsize, Ordering};

        use region::Protection;

        use super::*;

        static TAPS_SEEN: AtomicUsize = AtomicUsize::new(0);

        unsafe extern "system" fn counting_tap() {
            TAPS_SEEN.fetch_add(1, Ordering::SeqCst);
        }

        #[test]
        fn tap_preserves_original_behavior() {
            // mov eax, 42 ; nop x7 ; ret  — the first 12 bytes are the
            // hooked range, the ret at +12 is the continuation.
            let mut func: Vec<u8> = vec![0xB8, 0x2A, 0x00, 0x00, 0x00];
            func.resize(12, 0x90);
            func.push(0xC3);

            let mut alloc = region::alloc(func.len(), Protection::READ_WRITE_EXECUTE).unwrap();
            let base = alloc.as_mut_ptr::<u8>();
            unsafe {
                std::ptr::copy_nonoverlapping(func.as_ptr(), base, func.len());
            }

            let displaced = &func[..12];
            let tramp = Trampoline::emit_tap(
                counting_tap as usize,
                displaced,
                base as usize + 12,
            )
            .unwrap();

            let mut redirect = code::jmp(base as usize, tramp.entry() as usize);
            redirect.resize(12, 0x90);
            unsafe {
                memory::write_bytes(base, &redirect).unwrap();
            }

            let hooked: unsafe extern "system" fn() -> i32 =
                unsafe { std::mem::transmute(base as *const u8) };

            let before = TAPS_SEEN.load(Ordering::SeqCst);
            let ret = unsafe { hooked() };
            assert_eq!(ret, 42, "displaced instructions did not execute");
            assert_eq!(TAPS_SEEN.load(Ordering::SeqCst), before + 1);

            let ret = unsafe { hooked() };
            assert_eq!(ret, 42);
            assert_eq!(TAPS_SEEN.load(Ordering::SeqCst), before + 2);
        }
    }
}
