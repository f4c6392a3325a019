//! Descriptors for the game-logic modules (`EmberGame.dll`, `EmberAction.dll`).

use super::{Body, Descriptor, Necessity, PatchSite, SiteBytes};
use crate::module::ModuleKind;

const BASE_EARLY: &[u32] = &[5767, 5879];
const BASE_LATE: &[u32] = &[6115, 6156];
const EXP_EARLY: &[u32] = &[6527, 6566, 6586];
const EXP_LATE: &[u32] = &[6627, 6670, 6729];

pub(super) static GAME_DESCRIPTORS: &[Descriptor] = &[
    // The server browser refuses to join D3D10 servers from a D3D9 client
    // even though the netcode is identical. Drop the renderer comparison.
    Descriptor {
        name: "allow_dx10_servers",
        module: ModuleKind::Game,
        necessity: Necessity::Optional,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x082D40,
                    expected: &[0x74, 0x12],
                    replacement: &[0x90, 0x90],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0A96E0,
                    expected: &[0x74, 0x15],
                    replacement: &[0x90, 0x90],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x0833F0,
                    expected: &[0x74, 0x12],
                    replacement: &[0x90, 0x90],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0A9F50,
                    expected: &[0x74, 0x15],
                    replacement: &[0x90, 0x90],
                }),
            },
            PatchSite {
                builds: EXP_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x083E84,
                    expected: &[0x74, 0x16],
                    replacement: &[0x90, 0x90],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0AAB18,
                    expected: &[0x74, 0x19],
                    replacement: &[0x90, 0x90],
                }),
            },
            PatchSite {
                builds: EXP_LATE,
                x86: Some(SiteBytes {
                    offset: 0x084A30,
                    expected: &[0x74, 0x16],
                    replacement: &[0x90, 0x90],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0AB760,
                    expected: &[0x74, 0x19],
                    replacement: &[0x90, 0x90],
                }),
            },
        ]),
    },
    // The D3D10 graphics menu page is compiled in but gated behind a
    // predicate that always returns false on the base game. Force it true.
    Descriptor {
        name: "enable_dx10_menu",
        module: ModuleKind::Game,
        necessity: Necessity::Optional,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x0B5520,
                    expected: &[0x32, 0xC0, 0xC3],
                    replacement: &[0xB0, 0x01, 0xC3],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0E8890,
                    expected: &[0x32, 0xC0, 0xC3],
                    replacement: &[0xB0, 0x01, 0xC3],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x0B5C10,
                    expected: &[0x32, 0xC0, 0xC3],
                    replacement: &[0xB0, 0x01, 0xC3],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0E9120,
                    expected: &[0x32, 0xC0, 0xC3],
                    replacement: &[0xB0, 0x01, 0xC3],
                }),
            },
        ]),
    },
    // NOPs out the call that queues the vendor intro movies. Kept optional;
    // the --splash flag disables this patch entirely.
    Descriptor {
        name: "skip_intro_videos",
        module: ModuleKind::Game,
        necessity: Necessity::Optional,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x1470D0,
                    expected: &[0xE8, 0x5B, 0x27, 0xF1, 0xFF],
                    replacement: &[0x90; 5],
                }),
                x64: Some(SiteBytes {
                    offset: 0x19C240,
                    expected: &[0xE8, 0x1B, 0xE4, 0xEE, 0xFF],
                    replacement: &[0x90; 5],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x147830,
                    expected: &[0xE8, 0xFB, 0x20, 0xF1, 0xFF],
                    replacement: &[0x90; 5],
                }),
                x64: Some(SiteBytes {
                    offset: 0x19CAE0,
                    expected: &[0xE8, 0x7B, 0xDB, 0xEE, 0xFF],
                    replacement: &[0x90; 5],
                }),
            },
            PatchSite {
                builds: EXP_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x1483C8,
                    expected: &[0xE8, 0x63, 0x15, 0xF1, 0xFF],
                    replacement: &[0x90; 5],
                }),
                x64: Some(SiteBytes {
                    offset: 0x19D6A8,
                    expected: &[0xE8, 0xB3, 0xCF, 0xEE, 0xFF],
                    replacement: &[0x90; 5],
                }),
            },
            PatchSite {
                builds: EXP_LATE,
                x86: Some(SiteBytes {
                    offset: 0x148F80,
                    expected: &[0xE8, 0xAB, 0x09, 0xF1, 0xFF],
                    replacement: &[0x90; 5],
                }),
                x64: Some(SiteBytes {
                    offset: 0x19E360,
                    expected: &[0xE8, 0xFB, 0xC2, 0xEE, 0xFF],
                    replacement: &[0x90; 5],
                }),
            },
        ]),
    },
];

pub(super) static ACTION_DESCRIPTORS: &[Descriptor] = &[
    // Multiplayer immersive mode is rejected under the D3D9 renderer with a
    // near jz at the capability check; rewrite it into an unconditional jmp
    // so D3D9 clients take the same path as D3D10.
    Descriptor {
        name: "allow_dx9_immersive_multiplayer",
        module: ModuleKind::Action,
        necessity: Necessity::Optional,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x11BB20,
                    expected: &[0x0F, 0x84, 0x9E, 0x00, 0x00, 0x00],
                    replacement: &[0x90, 0xE9, 0x9E, 0x00, 0x00, 0x00],
                }),
                x64: Some(SiteBytes {
                    offset: 0x16D9A0,
                    expected: &[0x0F, 0x84, 0xB2, 0x00, 0x00, 0x00],
                    replacement: &[0x90, 0xE9, 0xB2, 0x00, 0x00, 0x00],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x11C280,
                    expected: &[0x0F, 0x84, 0x9E, 0x00, 0x00, 0x00],
                    replacement: &[0x90, 0xE9, 0x9E, 0x00, 0x00, 0x00],
                }),
                x64: Some(SiteBytes {
                    offset: 0x16E260,
                    expected: &[0x0F, 0x84, 0xB2, 0x00, 0x00, 0x00],
                    replacement: &[0x90, 0xE9, 0xB2, 0x00, 0x00, 0x00],
                }),
            },
            PatchSite {
                builds: EXP_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x11CD44,
                    expected: &[0x0F, 0x84, 0xA6, 0x00, 0x00, 0x00],
                    replacement: &[0x90, 0xE9, 0xA6, 0x00, 0x00, 0x00],
                }),
                x64: Some(SiteBytes {
                    offset: 0x16EE08,
                    expected: &[0x0F, 0x84, 0xBE, 0x00, 0x00, 0x00],
                    replacement: &[0x90, 0xE9, 0xBE, 0x00, 0x00, 0x00],
                }),
            },
            PatchSite {
                builds: EXP_LATE,
                x86: Some(SiteBytes {
                    offset: 0x11D900,
                    expected: &[0x0F, 0x84, 0xA6, 0x00, 0x00, 0x00],
                    replacement: &[0x90, 0xE9, 0xA6, 0x00, 0x00, 0x00],
                }),
                x64: Some(SiteBytes {
                    offset: 0x16FA50,
                    expected: &[0x0F, 0x84, 0xBE, 0x00, 0x00, 0x00],
                    replacement: &[0x90, 0xE9, 0xBE, 0x00, 0x00, 0x00],
                }),
            },
        ]),
    },
];
