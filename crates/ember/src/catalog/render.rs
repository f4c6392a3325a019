//! Descriptors for the rendering modules (`EmberRenderD3D9.dll`,
//! `EmberRenderD3D10.dll`).

use super::{
    Body, CallAbi, Descriptor, HandlerId, HookBytes, HookInfo, HookKind, HookSite, Necessity,
    PatchSite, SiteBytes,
};
use crate::module::ModuleKind;

const BASE_EARLY: &[u32] = &[5767, 5879];
const BASE_LATE: &[u32] = &[6115, 6156];
const EXP_EARLY: &[u32] = &[6527, 6566, 6586];
const EXP_LATE: &[u32] = &[6627, 6670, 6729];

pub(super) static D3D9_DESCRIPTORS: &[Descriptor] = &[
    // Taps the adapter enumeration so the selected adapter's identity lands
    // in the launcher log. Observational only.
    Descriptor {
        name: "adapter_info",
        module: ModuleKind::RenderD3D9,
        necessity: Necessity::Optional,
        body: Body::Hook(HookInfo {
            kind: HookKind::Tap,
            abi: CallAbi::System,
            handler: HandlerId::AdapterInfoD3D9,
            sites: &[
                HookSite {
                    builds: BASE_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x0D64B0,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x08],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x1166F0,
                        expected: &[
                            0x48, 0x89, 0x5C, 0x24, 0x08, 0x57, 0x48, 0x83, 0xEC, 0x20, 0x48,
                            0x8B, 0xF9,
                        ],
                    }),
                },
                HookSite {
                    builds: BASE_LATE,
                    x86: Some(HookBytes {
                        offset: 0x0D6B70,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x08],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x116F60,
                        expected: &[
                            0x48, 0x89, 0x5C, 0x24, 0x08, 0x57, 0x48, 0x83, 0xEC, 0x20, 0x48,
                            0x8B, 0xF9,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x0D7634,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x08],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x117A98,
                        expected: &[
                            0x48, 0x89, 0x5C, 0x24, 0x08, 0x57, 0x48, 0x83, 0xEC, 0x20, 0x48,
                            0x8B, 0xF9,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_LATE,
                    x86: Some(HookBytes {
                        offset: 0x0D81E0,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x08],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x118650,
                        expected: &[
                            0x48, 0x89, 0x5C, 0x24, 0x08, 0x57, 0x48, 0x83, 0xEC, 0x20, 0x48,
                            0x8B, 0xF9,
                        ],
                    }),
                },
            ],
        }),
    },
];

pub(super) static D3D10_DESCRIPTORS: &[Descriptor] = &[
    // Fullscreen mode selection keeps the first mode whose refresh rate is
    // at most the desktop's, which on modern displays picks 24 Hz. Drop the
    // early accept and let the scan find the highest rate.
    Descriptor {
        name: "fix_low_refresh_rate",
        module: ModuleKind::RenderD3D10,
        necessity: Necessity::Mandatory,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x09F3C2,
                    expected: &[0x76, 0x0C],
                    replacement: &[0x90, 0x90],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0D0A14,
                    expected: &[0x76, 0x0E],
                    replacement: &[0x90, 0x90],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x09F9E2,
                    expected: &[0x76, 0x0C],
                    replacement: &[0x90, 0x90],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0D12B4,
                    expected: &[0x76, 0x0E],
                    replacement: &[0x90, 0x90],
                }),
            },
            PatchSite {
                builds: EXP_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x0A04F6,
                    expected: &[0x76, 0x0C],
                    replacement: &[0x90, 0x90],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0D1E78,
                    expected: &[0x76, 0x0E],
                    replacement: &[0x90, 0x90],
                }),
            },
            PatchSite {
                builds: EXP_LATE,
                x86: Some(SiteBytes {
                    offset: 0x0A10B2,
                    expected: &[0x76, 0x0C],
                    replacement: &[0x90, 0x90],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0D2A3C,
                    expected: &[0x76, 0x0E],
                    replacement: &[0x90, 0x90],
                }),
            },
        ]),
    },
    // Taps adapter enumeration for logging, including the memory tiers the
    // D3D10 path reports.
    Descriptor {
        name: "adapter_info",
        module: ModuleKind::RenderD3D10,
        necessity: Necessity::Optional,
        body: Body::Hook(HookInfo {
            kind: HookKind::Tap,
            abi: CallAbi::System,
            handler: HandlerId::AdapterInfoD3D10,
            sites: &[
                HookSite {
                    builds: BASE_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x0E0FD0,
                        expected: &[0x55, 0x8B, 0xEC, 0x51, 0x56, 0x8B, 0xF1],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x124D60,
                        expected: &[
                            0x48, 0x89, 0x74, 0x24, 0x18, 0x57, 0x41, 0x56, 0x48, 0x83, 0xEC,
                            0x40,
                        ],
                    }),
                },
                HookSite {
                    builds: BASE_LATE,
                    x86: Some(HookBytes {
                        offset: 0x0E1690,
                        expected: &[0x55, 0x8B, 0xEC, 0x51, 0x56, 0x8B, 0xF1],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x125630,
                        expected: &[
                            0x48, 0x89, 0x74, 0x24, 0x18, 0x57, 0x41, 0x56, 0x48, 0x83, 0xEC,
                            0x40,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x0E2154,
                        expected: &[0x55, 0x8B, 0xEC, 0x51, 0x56, 0x8B, 0xF1],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x126188,
                        expected: &[
                            0x48, 0x89, 0x74, 0x24, 0x18, 0x57, 0x41, 0x56, 0x48, 0x83, 0xEC,
                            0x40,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_LATE,
                    x86: Some(HookBytes {
                        offset: 0x0E2D00,
                        expected: &[0x55, 0x8B, 0xEC, 0x51, 0x56, 0x8B, 0xF1],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x126D40,
                        expected: &[
                            0x48, 0x89, 0x74, 0x24, 0x18, 0x57, 0x41, 0x56, 0x48, 0x83, 0xEC,
                            0x40,
                        ],
                    }),
                },
            ],
        }),
    },
    // Replaces the renderer's own LoadLibrary dance for d3d10/dxgi with the
    // launcher's resolver, which reports a clean error instead of a late
    // crash when the system libraries are missing.
    Descriptor {
        name: "init_api",
        module: ModuleKind::RenderD3D10,
        necessity: Necessity::Mandatory,
        body: Body::Hook(HookInfo {
            kind: HookKind::Replace,
            abi: CallAbi::System,
            handler: HandlerId::InitApiD3D10,
            sites: &[
                HookSite {
                    builds: BASE_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x025870,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x10, 0x56],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x031B40,
                        expected: &[
                            0x40, 0x55, 0x56, 0x48, 0x83, 0xEC, 0x48, 0x48, 0x8B, 0xE9, 0x33,
                            0xD2, 0x33, 0xF6,
                        ],
                    }),
                },
                HookSite {
                    builds: BASE_LATE,
                    x86: Some(HookBytes {
                        offset: 0x025F30,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x10, 0x56],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x032400,
                        expected: &[
                            0x40, 0x55, 0x56, 0x48, 0x83, 0xEC, 0x48, 0x48, 0x8B, 0xE9, 0x33,
                            0xD2, 0x33, 0xF6,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x026A14,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x10, 0x56],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x032FA8,
                        expected: &[
                            0x40, 0x55, 0x56, 0x48, 0x83, 0xEC, 0x48, 0x48, 0x8B, 0xE9, 0x33,
                            0xD2, 0x33, 0xF6,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_LATE,
                    x86: Some(HookBytes {
                        offset: 0x0275C0,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x10, 0x56],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x033B60,
                        expected: &[
                            0x40, 0x55, 0x56, 0x48, 0x83, 0xEC, 0x48, 0x48, 0x8B, 0xE9, 0x33,
                            0xD2, 0x33, 0xF6,
                        ],
                    }),
                },
            ],
        }),
    },
];
