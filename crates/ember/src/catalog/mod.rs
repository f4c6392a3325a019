//! The patch catalog: build-indexed patch and hook descriptors.
//!
//! Everything in this module is `'static` data derived from reverse
//! engineering the shipped engine binaries. Each site records the exact byte
//! sequence the target build is known to contain at a given offset; the patch
//! engine refuses to write anywhere those bytes do not match. Offsets and
//! byte sequences differ between the 32-bit and 64-bit images, so every site
//! carries both variants.
//!
//! Invariants the data must uphold (enforced by the tests at the bottom):
//! - all sites for one (module kind, build, architecture) target disjoint
//!   address ranges, so application order never matters;
//! - expected and replacement sequences have equal length and differ;
//! - hook sites are wide enough for the architecture's redirect sequence and
//!   cover whole, position-independent instructions.

mod game;
mod network;
mod render;
mod system;

use crate::module::ModuleKind;

/// Whether a failed descriptor aborts the launch or is logged and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Necessity {
    Mandatory,
    Optional,
}

impl Necessity {
    pub fn is_mandatory(self) -> bool {
        self == Self::Mandatory
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mandatory => "mandatory",
            Self::Optional => "optional",
        }
    }
}

/// Byte-level data for one patch site on one architecture.
#[derive(Debug, Clone, Copy)]
pub struct SiteBytes {
    pub offset: usize,
    pub expected: &'static [u8],
    pub replacement: &'static [u8],
}

/// A patch location shared by a group of builds.
#[derive(Debug, Clone, Copy)]
pub struct PatchSite {
    pub builds: &'static [u32],
    pub x86: Option<SiteBytes>,
    pub x64: Option<SiteBytes>,
}

impl PatchSite {
    pub fn applies_to(&self, build: u32) -> bool {
        self.builds.contains(&build)
    }

    /// The site data for the architecture this launcher was built for.
    pub fn native(&self) -> Option<&SiteBytes> {
        if cfg!(target_pointer_width = "64") {
            self.x64.as_ref()
        } else {
            self.x86.as_ref()
        }
    }
}

/// Byte-level data for one hook site on one architecture.
///
/// `expected` doubles as the displaced instruction sequence: for tap hooks it
/// is copied into the trampoline and re-executed after the callback returns,
/// so it must cover whole instructions that are valid at any address.
#[derive(Debug, Clone, Copy)]
pub struct HookBytes {
    pub offset: usize,
    pub expected: &'static [u8],
}

/// A hook location shared by a group of builds.
#[derive(Debug, Clone, Copy)]
pub struct HookSite {
    pub builds: &'static [u32],
    pub x86: Option<HookBytes>,
    pub x64: Option<HookBytes>,
}

impl HookSite {
    pub fn applies_to(&self, build: u32) -> bool {
        self.builds.contains(&build)
    }

    pub fn native(&self) -> Option<&HookBytes> {
        if cfg!(target_pointer_width = "64") {
            self.x64.as_ref()
        } else {
            self.x86.as_ref()
        }
    }
}

/// How a hook treats the displaced original instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// The handler fully replaces the original routine; displaced bytes are
    /// never executed again.
    Replace,
    /// The handler observes the call and the displaced bytes run afterwards,
    /// so original behavior is preserved.
    Tap,
}

/// Calling convention the engine uses at the hooked site. Descriptor
/// metadata: the handler signatures in [`crate::callbacks`] are written to
/// match, and this records the contract per site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallAbi {
    System,
    Cdecl,
    Thiscall,
}

/// Which launcher handler a hook dispatches to. Resolved to a concrete
/// function address through [`crate::callbacks::Callbacks`] at install time,
/// keeping the catalog free of function pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerId {
    CpuDetect,
    EngineError,
    LanguageInit,
    UserPath,
    AdapterInfoD3D9,
    AdapterInfoD3D10,
    InitApiD3D10,
}

/// Hook-specific descriptor payload.
#[derive(Debug, Clone, Copy)]
pub struct HookInfo {
    pub kind: HookKind,
    pub abi: CallAbi,
    pub handler: HandlerId,
    pub sites: &'static [HookSite],
}

/// Descriptor payload: a plain byte patch or a hook installation.
#[derive(Debug, Clone, Copy)]
pub enum Body {
    Patch(&'static [PatchSite]),
    Hook(HookInfo),
}

/// One named modification to one engine module.
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    pub name: &'static str,
    pub module: ModuleKind,
    pub necessity: Necessity,
    pub body: Body,
}

impl Descriptor {
    pub fn is_hook(&self) -> bool {
        matches!(self.body, Body::Hook(_))
    }

    /// Whether any site of this descriptor targets the given build.
    pub fn applies_to(&self, build: u32) -> bool {
        match self.body {
            Body::Patch(sites) => sites.iter().any(|s| s.applies_to(build)),
            Body::Hook(info) => info.sites.iter().any(|s| s.applies_to(build)),
        }
    }
}

/// All descriptors for a module kind, applicable or not. The patch engine
/// walks this list and reports non-matching builds as skipped.
pub fn descriptors_for(kind: ModuleKind) -> &'static [Descriptor] {
    match kind {
        ModuleKind::System => system::DESCRIPTORS,
        ModuleKind::Game => game::GAME_DESCRIPTORS,
        ModuleKind::Action => game::ACTION_DESCRIPTORS,
        ModuleKind::Network => network::DESCRIPTORS,
        ModuleKind::RenderD3D9 => render::D3D9_DESCRIPTORS,
        ModuleKind::RenderD3D10 => render::D3D10_DESCRIPTORS,
    }
}

/// The descriptors that actually apply to one build. Display/tooling view;
/// the engine itself uses [`descriptors_for`].
pub fn descriptors_for_build(kind: ModuleKind, build: u32) -> Vec<&'static Descriptor> {
    descriptors_for(kind)
        .iter()
        .filter(|d| d.applies_to(build))
        .collect()
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::build::SUPPORTED_BUILDS;
    use crate::hook::code::{REDIRECT_LEN_X64, REDIRECT_LEN_X86};

    /// Sanity cap on patch targets; every engine image is larger than this
    /// offset never reaches.
    const IMAGE_SIZE_CAP: usize = 0x40_0000;

    fn supported_builds() -> Vec<u32> {
        SUPPORTED_BUILDS.iter().map(|r| r.build).collect()
    }

    fn has_x64_binaries(build: u32) -> bool {
        SUPPORTED_BUILDS
            .iter()
            .find(|r| r.build == build)
            .is_some_and(|r| r.has_x64)
    }

    /// Collect (offset, len) ranges for one (kind, build, arch) selection.
    fn ranges_for(kind: ModuleKind, build: u32, x64: bool) -> Vec<(usize, usize, &'static str)> {
        let mut out = Vec::new();
        for desc in descriptors_for(kind) {
            match desc.body {
                Body::Patch(sites) => {
                    for site in sites.iter().filter(|s| s.applies_to(build)) {
                        let bytes = if x64 { site.x64 } else { site.x86 };
                        if let Some(b) = bytes {
                            out.push((b.offset, b.expected.len(), desc.name));
                        }
                    }
                }
                Body::Hook(info) => {
                    for site in info.sites.iter().filter(|s| s.applies_to(build)) {
                        let bytes = if x64 { site.x64 } else { site.x86 };
                        if let Some(b) = bytes {
                            out.push((b.offset, b.expected.len(), desc.name));
                        }
                    }
                }
            }
        }
        out
    }

    #[test]
    fn patch_sites_have_consistent_byte_sequences() {
        for kind in ModuleKind::iter() {
            for desc in descriptors_for(kind) {
                if let Body::Patch(sites) = desc.body {
                    for site in sites {
                        for bytes in [site.x86.as_ref(), site.x64.as_ref()].into_iter().flatten() {
                            assert!(!bytes.expected.is_empty(), "{}: empty site", desc.name);
                            assert_eq!(
                                bytes.expected.len(),
                                bytes.replacement.len(),
                                "{}: expected/replacement length mismatch",
                                desc.name
                            );
                            assert_ne!(
                                bytes.expected, bytes.replacement,
                                "{}: replacement equals expected",
                                desc.name
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn hook_sites_are_wide_enough_for_the_redirect() {
        for kind in ModuleKind::iter() {
            for desc in descriptors_for(kind) {
                if let Body::Hook(info) = desc.body {
                    for site in info.sites {
                        if let Some(b) = site.x86.as_ref() {
                            assert!(
                                b.expected.len() >= REDIRECT_LEN_X86,
                                "{}: x86 site narrower than the redirect",
                                desc.name
                            );
                        }
                        if let Some(b) = site.x64.as_ref() {
                            assert!(
                                b.expected.len() >= REDIRECT_LEN_X64,
                                "{}: x64 site narrower than the redirect",
                                desc.name
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn every_referenced_build_is_in_the_support_table() {
        let known = supported_builds();
        for kind in ModuleKind::iter() {
            for desc in descriptors_for(kind) {
                let builds: Vec<u32> = match desc.body {
                    Body::Patch(sites) => sites.iter().flat_map(|s| s.builds).copied().collect(),
                    Body::Hook(info) => {
                        info.sites.iter().flat_map(|s| s.builds).copied().collect()
                    }
                };
                for build in builds {
                    assert!(
                        known.contains(&build),
                        "{} references unknown build {build}",
                        desc.name
                    );
                }
            }
        }
    }

    #[test]
    fn sites_carry_data_for_the_architectures_their_builds_shipped() {
        for kind in ModuleKind::iter() {
            for desc in descriptors_for(kind) {
                let sites: Vec<(&[u32], bool, bool)> = match desc.body {
                    Body::Patch(sites) => sites
                        .iter()
                        .map(|s| (s.builds, s.x86.is_some(), s.x64.is_some()))
                        .collect(),
                    Body::Hook(info) => info
                        .sites
                        .iter()
                        .map(|s| (s.builds, s.x86.is_some(), s.x64.is_some()))
                        .collect(),
                };
                for (builds, has_x86, has_x64) in sites {
                    assert!(has_x86, "{}: missing 32-bit data", desc.name);
                    if builds.iter().any(|&b| has_x64_binaries(b)) {
                        assert!(has_x64, "{}: missing 64-bit data", desc.name);
                    }
                }
            }
        }
    }

    #[test]
    fn ranges_are_disjoint_and_in_bounds_per_build() {
        for kind in ModuleKind::iter() {
            for &build in &supported_builds() {
                for x64 in [false, true] {
                    let mut ranges = ranges_for(kind, build, x64);
                    ranges.sort_unstable();
                    for window in ranges.windows(2) {
                        let (a_off, a_len, a_name) = window[0];
                        let (b_off, _, b_name) = window[1];
                        assert!(
                            a_off + a_len <= b_off,
                            "{kind}/{build}: {a_name} overlaps {b_name}"
                        );
                    }
                    for (off, len, name) in ranges {
                        assert!(
                            off + len <= IMAGE_SIZE_CAP,
                            "{kind}/{build}: {name} ends past the image cap"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn build_filter_matches_site_lists() {
        let for_6156 = descriptors_for_build(ModuleKind::System, 6156);
        assert!(!for_6156.is_empty());
        assert!(for_6156.iter().all(|d| d.applies_to(6156)));

        // Nothing in the catalog targets the rejected standalone expansion.
        for kind in ModuleKind::iter() {
            assert!(descriptors_for_build(kind, 710).is_empty());
        }
    }
}
