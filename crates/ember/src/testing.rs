//! Synthetic-module helpers shared by unit tests.

use crate::catalog::{self, Body};
use crate::module::{Module, ModuleKind};

/// Native-arch (offset, expected bytes) pairs for every site of `kind`
/// applicable to `build`.
pub(crate) fn applicable_sites(kind: ModuleKind, build: u32) -> Vec<(usize, &'static [u8])> {
    let mut out = Vec::new();
    for desc in catalog::descriptors_for(kind) {
        match desc.body {
            Body::Patch(sites) => {
                for site in sites.iter().filter(|s| s.applies_to(build)) {
                    if let Some(bytes) = site.native() {
                        out.push((bytes.offset, bytes.expected));
                    }
                }
            }
            Body::Hook(info) => {
                for site in info.sites.iter().filter(|s| s.applies_to(build)) {
                    if let Some(bytes) = site.native() {
                        out.push((bytes.offset, bytes.expected));
                    }
                }
            }
        }
    }
    out
}

/// A synthetic module pre-seeded with the documented original bytes at every
/// site the catalog addresses for `build`, surrounded by 0xCC filler.
pub(crate) fn seeded_module(kind: ModuleKind, build: u32) -> Module {
    let sites = applicable_sites(kind, build);
    let size = sites
        .iter()
        .map(|(offset, bytes)| offset + bytes.len())
        .max()
        .unwrap_or(0)
        + 0x100;

    let mut image = vec![0xCCu8; size];
    for (offset, bytes) in sites {
        image[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
    Module::synthetic(kind, image)
}
