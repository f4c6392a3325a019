//! Descriptors for the core system module (`EmberSystem.dll`).

use super::{
    Body, CallAbi, Descriptor, HandlerId, HookBytes, HookInfo, HookKind, HookSite, Necessity,
    PatchSite, SiteBytes,
};
use crate::module::ModuleKind;

const BASE_EARLY: &[u32] = &[5767, 5879];
const BASE_LATE: &[u32] = &[6115, 6156];
const EXP_EARLY: &[u32] = &[6527, 6566, 6586];
const EXP_LATE: &[u32] = &[6627, 6670, 6729];

pub(super) static DESCRIPTORS: &[Descriptor] = &[
    // NOPs out the call into the disc-check stub left in the base game
    // binaries; without this the engine stalls probing for an optical drive.
    Descriptor {
        name: "disable_copy_protection",
        module: ModuleKind::System,
        necessity: Necessity::Mandatory,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x1E63A0,
                    expected: &[0xE8, 0x3B, 0x9C, 0xFE, 0xFF],
                    replacement: &[0x90; 5],
                }),
                x64: Some(SiteBytes {
                    offset: 0x26A9D0,
                    expected: &[0xE8, 0xAB, 0xC4, 0xFD, 0xFF],
                    replacement: &[0x90; 5],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x1E6A80,
                    expected: &[0xE8, 0x87, 0x95, 0xFE, 0xFF],
                    replacement: &[0x90; 5],
                }),
                x64: Some(SiteBytes {
                    offset: 0x26B2A0,
                    expected: &[0xE8, 0x13, 0xBC, 0xFD, 0xFF],
                    replacement: &[0x90; 5],
                }),
            },
        ]),
    },
    // The base game clamps the system spec to High when running the D3D9
    // renderer; drop the clamp so Very High is selectable there too.
    Descriptor {
        name: "unlock_very_high_spec",
        module: ModuleKind::System,
        necessity: Necessity::Optional,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x158B24,
                    expected: &[0x83, 0xF8, 0x03, 0x7E, 0x0A],
                    replacement: &[0x83, 0xF8, 0x03, 0x90, 0x90],
                }),
                x64: Some(SiteBytes {
                    offset: 0x1B3E60,
                    expected: &[0x83, 0xF8, 0x03, 0x7E, 0x0C],
                    replacement: &[0x83, 0xF8, 0x03, 0x90, 0x90],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x159280,
                    expected: &[0x83, 0xF8, 0x03, 0x7E, 0x0A],
                    replacement: &[0x83, 0xF8, 0x03, 0x90, 0x90],
                }),
                x64: Some(SiteBytes {
                    offset: 0x1B46F0,
                    expected: &[0x83, 0xF8, 0x03, 0x7E, 0x0C],
                    replacement: &[0x83, 0xF8, 0x03, 0x90, 0x90],
                }),
            },
        ]),
    },
    // Turns the single-instance mutex check into an unconditional jump past
    // the "already running" bail-out.
    Descriptor {
        name: "allow_multiple_instances",
        module: ModuleKind::System,
        necessity: Necessity::Optional,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x0C25B0,
                    expected: &[0x75, 0x0E],
                    replacement: &[0xEB, 0x0E],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0F81C0,
                    expected: &[0x75, 0x10],
                    replacement: &[0xEB, 0x10],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x0C2C40,
                    expected: &[0x75, 0x0E],
                    replacement: &[0xEB, 0x0E],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0F8A60,
                    expected: &[0x75, 0x10],
                    replacement: &[0xEB, 0x10],
                }),
            },
            PatchSite {
                builds: EXP_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x0C36F8,
                    expected: &[0x75, 0x12],
                    replacement: &[0xEB, 0x12],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0F95D4,
                    expected: &[0x75, 0x14],
                    replacement: &[0xEB, 0x14],
                }),
            },
            PatchSite {
                builds: EXP_LATE,
                x86: Some(SiteBytes {
                    offset: 0x0C4150,
                    expected: &[0x75, 0x12],
                    replacement: &[0xEB, 0x12],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0FA2C8,
                    expected: &[0x75, 0x14],
                    replacement: &[0xEB, 0x14],
                }),
            },
        ]),
    },
    // The engine installs its own unhandled-exception filter, which swallows
    // faults before the launcher's crash logging sees them. NOP the
    // registration call.
    Descriptor {
        name: "disable_engine_crash_handler",
        module: ModuleKind::System,
        necessity: Necessity::Mandatory,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x1120F0,
                    expected: &[0xFF, 0x15, 0x88, 0x40, 0x33, 0x00],
                    replacement: &[0x90; 6],
                }),
                x64: Some(SiteBytes {
                    offset: 0x15A480,
                    expected: &[0xFF, 0x15, 0x7A, 0x13, 0x1E, 0x00],
                    replacement: &[0x90; 6],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x112810,
                    expected: &[0xFF, 0x15, 0x2C, 0x47, 0x33, 0x00],
                    replacement: &[0x90; 6],
                }),
                x64: Some(SiteBytes {
                    offset: 0x15AD20,
                    expected: &[0xFF, 0x15, 0xDA, 0x0A, 0x1E, 0x00],
                    replacement: &[0x90; 6],
                }),
            },
            PatchSite {
                builds: EXP_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x1132A4,
                    expected: &[0xFF, 0x15, 0xE0, 0x52, 0x33, 0x00],
                    replacement: &[0x90; 6],
                }),
                x64: Some(SiteBytes {
                    offset: 0x15B8F0,
                    expected: &[0xFF, 0x15, 0x0A, 0xFF, 0x1D, 0x00],
                    replacement: &[0x90; 6],
                }),
            },
            PatchSite {
                builds: EXP_LATE,
                x86: Some(SiteBytes {
                    offset: 0x113E60,
                    expected: &[0xFF, 0x15, 0x94, 0x5E, 0x33, 0x00],
                    replacement: &[0x90; 6],
                }),
                x64: Some(SiteBytes {
                    offset: 0x15C540,
                    expected: &[0xFF, 0x15, 0xBA, 0xF2, 0x1D, 0x00],
                    replacement: &[0x90; 6],
                }),
            },
        ]),
    },
    // The CPU info collector writes one entry per logical CPU into a
    // 64-slot stack array but machines with more cores overflow it. Halve
    // the loop bound to stay inside the array.
    Descriptor {
        name: "fix_cpu_info_overflow",
        module: ModuleKind::System,
        necessity: Necessity::Mandatory,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x0F7A42,
                    expected: &[0x83, 0xF9, 0x40],
                    replacement: &[0x83, 0xF9, 0x20],
                }),
                x64: Some(SiteBytes {
                    offset: 0x13D6B2,
                    expected: &[0x83, 0xF9, 0x40],
                    replacement: &[0x83, 0xF9, 0x20],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x0F80D2,
                    expected: &[0x83, 0xF9, 0x40],
                    replacement: &[0x83, 0xF9, 0x20],
                }),
                x64: Some(SiteBytes {
                    offset: 0x13DF52,
                    expected: &[0x83, 0xF9, 0x40],
                    replacement: &[0x83, 0xF9, 0x20],
                }),
            },
            PatchSite {
                builds: EXP_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x0F8BE6,
                    expected: &[0x83, 0xF9, 0x40],
                    replacement: &[0x83, 0xF9, 0x20],
                }),
                x64: Some(SiteBytes {
                    offset: 0x13EA96,
                    expected: &[0x83, 0xF9, 0x40],
                    replacement: &[0x83, 0xF9, 0x20],
                }),
            },
            PatchSite {
                builds: EXP_LATE,
                x86: Some(SiteBytes {
                    offset: 0x0F9722,
                    expected: &[0x83, 0xF9, 0x40],
                    replacement: &[0x83, 0xF9, 0x20],
                }),
                x64: Some(SiteBytes {
                    offset: 0x13F652,
                    expected: &[0x83, 0xF9, 0x40],
                    replacement: &[0x83, 0xF9, 0x20],
                }),
            },
        ]),
    },
    // Replaces the engine's own hardware detection, which misreports newer
    // CPU topologies, with the launcher's probe.
    Descriptor {
        name: "cpu_detect",
        module: ModuleKind::System,
        necessity: Necessity::Mandatory,
        body: Body::Hook(HookInfo {
            kind: HookKind::Replace,
            abi: CallAbi::System,
            handler: HandlerId::CpuDetect,
            sites: &[
                HookSite {
                    builds: BASE_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x0F4C00,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x08],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x13A190,
                        expected: &[
                            0x48, 0x89, 0x5C, 0x24, 0x08, 0x57, 0x48, 0x83, 0xEC, 0x20, 0x48,
                            0x8B, 0xF9,
                        ],
                    }),
                },
                HookSite {
                    builds: BASE_LATE,
                    x86: Some(HookBytes {
                        offset: 0x0F5280,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x08],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x13A9F0,
                        expected: &[
                            0x48, 0x89, 0x5C, 0x24, 0x08, 0x57, 0x48, 0x83, 0xEC, 0x20, 0x48,
                            0x8B, 0xF9,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x0F5D90,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x0C],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x13B4C8,
                        expected: &[
                            0x48, 0x89, 0x5C, 0x24, 0x10, 0x55, 0x48, 0x8B, 0xEC, 0x48, 0x83,
                            0xEC, 0x50,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_LATE,
                    x86: Some(HookBytes {
                        offset: 0x0F68D0,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x0C],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x13C058,
                        expected: &[
                            0x48, 0x89, 0x5C, 0x24, 0x10, 0x55, 0x48, 0x8B, 0xEC, 0x48, 0x83,
                            0xEC, 0x50,
                        ],
                    }),
                },
            ],
        }),
    },
    // Routes the engine's unrecoverable-error reporter into the launcher so
    // diagnostics land in the crash log before the process dies.
    Descriptor {
        name: "engine_error",
        module: ModuleKind::System,
        necessity: Necessity::Mandatory,
        body: Body::Hook(HookInfo {
            kind: HookKind::Replace,
            abi: CallAbi::Cdecl,
            handler: HandlerId::EngineError,
            sites: &[
                HookSite {
                    builds: BASE_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x09D850,
                        expected: &[0x55, 0x8B, 0xEC, 0x81, 0xEC, 0x00, 0x04, 0x00, 0x00],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x0C9E00,
                        expected: &[
                            0x48, 0x89, 0x4C, 0x24, 0x08, 0x48, 0x81, 0xEC, 0x88, 0x04, 0x00,
                            0x00,
                        ],
                    }),
                },
                HookSite {
                    builds: BASE_LATE,
                    x86: Some(HookBytes {
                        offset: 0x09DE30,
                        expected: &[0x55, 0x8B, 0xEC, 0x81, 0xEC, 0x00, 0x04, 0x00, 0x00],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x0CA5D0,
                        expected: &[
                            0x48, 0x89, 0x4C, 0x24, 0x08, 0x48, 0x81, 0xEC, 0x88, 0x04, 0x00,
                            0x00,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x09E8F4,
                        expected: &[0x55, 0x8B, 0xEC, 0x81, 0xEC, 0x04, 0x04, 0x00, 0x00],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x0CB128,
                        expected: &[
                            0x48, 0x89, 0x4C, 0x24, 0x08, 0x48, 0x81, 0xEC, 0x88, 0x04, 0x00,
                            0x00,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_LATE,
                    x86: Some(HookBytes {
                        offset: 0x09F3B0,
                        expected: &[0x55, 0x8B, 0xEC, 0x81, 0xEC, 0x04, 0x04, 0x00, 0x00],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x0CBD90,
                        expected: &[
                            0x48, 0x89, 0x4C, 0x24, 0x08, 0x48, 0x81, 0xEC, 0xA8, 0x04, 0x00,
                            0x00,
                        ],
                    }),
                },
            ],
        }),
    },
    // Observes localization startup so the launcher can override the
    // language the engine picked before any resources load. The original
    // routine still runs afterwards.
    Descriptor {
        name: "language_init",
        module: ModuleKind::System,
        necessity: Necessity::Mandatory,
        body: Body::Hook(HookInfo {
            kind: HookKind::Tap,
            abi: CallAbi::Thiscall,
            handler: HandlerId::LanguageInit,
            sites: &[
                HookSite {
                    builds: BASE_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x17C310,
                        expected: &[0x51, 0x53, 0x56, 0x8B, 0xF1, 0x57],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x1E4A50,
                        expected: &[
                            0x48, 0x89, 0x74, 0x24, 0x18, 0x57, 0x41, 0x56, 0x48, 0x83, 0xEC,
                            0x40,
                        ],
                    }),
                },
                HookSite {
                    builds: BASE_LATE,
                    x86: Some(HookBytes {
                        offset: 0x17C9F0,
                        expected: &[0x51, 0x53, 0x56, 0x8B, 0xF1, 0x57],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x1E52F0,
                        expected: &[
                            0x48, 0x89, 0x74, 0x24, 0x18, 0x57, 0x41, 0x56, 0x48, 0x83, 0xEC,
                            0x40,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x17D4B8,
                        expected: &[0x55, 0x8B, 0xEC, 0x51, 0x56, 0x8B, 0xF1],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x1E5E48,
                        expected: &[
                            0x40, 0x53, 0x48, 0x83, 0xEC, 0x30, 0x48, 0x8B, 0xD9, 0x33, 0xFF,
                            0x45, 0x33, 0xC0,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_LATE,
                    x86: Some(HookBytes {
                        offset: 0x17E050,
                        expected: &[0x55, 0x8B, 0xEC, 0x51, 0x56, 0x8B, 0xF1],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x1E6A10,
                        expected: &[
                            0x40, 0x53, 0x48, 0x83, 0xEC, 0x30, 0x48, 0x8B, 0xD9, 0x33, 0xFF,
                            0x45, 0x33, 0xC0,
                        ],
                    }),
                },
            ],
        }),
    },
    // Replaces the routine that computes the engine's writable data
    // directory, redirecting saves and configs out of the install folder.
    Descriptor {
        name: "user_path",
        module: ModuleKind::System,
        necessity: Necessity::Mandatory,
        body: Body::Hook(HookInfo {
            kind: HookKind::Replace,
            abi: CallAbi::Thiscall,
            handler: HandlerId::UserPath,
            sites: &[
                HookSite {
                    builds: BASE_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x1A08E0,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x10, 0x56],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x20D170,
                        expected: &[
                            0x40, 0x55, 0x56, 0x48, 0x83, 0xEC, 0x48, 0x48, 0x8B, 0xE9, 0x33,
                            0xD2, 0x33, 0xF6,
                        ],
                    }),
                },
                HookSite {
                    builds: BASE_LATE,
                    x86: Some(HookBytes {
                        offset: 0x1A0FC0,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x10, 0x56],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x20D9B0,
                        expected: &[
                            0x40, 0x55, 0x56, 0x48, 0x83, 0xEC, 0x48, 0x48, 0x8B, 0xE9, 0x33,
                            0xD2, 0x33, 0xF6,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_EARLY,
                    x86: Some(HookBytes {
                        offset: 0x1A1A88,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x10, 0x56],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x20E508,
                        expected: &[
                            0x40, 0x55, 0x56, 0x48, 0x83, 0xEC, 0x48, 0x48, 0x8B, 0xE9, 0x33,
                            0xD2, 0x33, 0xF6,
                        ],
                    }),
                },
                HookSite {
                    builds: EXP_LATE,
                    x86: Some(HookBytes {
                        offset: 0x1A2640,
                        expected: &[0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x14, 0x56],
                    }),
                    x64: Some(HookBytes {
                        offset: 0x20F1C0,
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
