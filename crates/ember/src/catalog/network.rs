//! Descriptors for the network module (`EmberNetwork.dll`).

use super::{Body, Descriptor, Necessity, PatchSite, SiteBytes};
use crate::module::ModuleKind;

const BASE_EARLY: &[u32] = &[5767, 5879];
const BASE_LATE: &[u32] = &[6115, 6156];
const EXP_EARLY: &[u32] = &[6527, 6566, 6586];
const EXP_LATE: &[u32] = &[6627, 6670, 6729];

pub(super) static DESCRIPTORS: &[Descriptor] = &[
    // The preorder bonus flag is computed from a service that no longer
    // exists, so the getter always reports false. Make it report true.
    Descriptor {
        name: "enable_preorder_content",
        module: ModuleKind::Network,
        necessity: Necessity::Optional,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x05F6D0,
                    expected: &[0x32, 0xC0],
                    replacement: &[0xB0, 0x01],
                }),
                x64: Some(SiteBytes {
                    offset: 0x07D130,
                    expected: &[0x32, 0xC0],
                    replacement: &[0xB0, 0x01],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x05FCE0,
                    expected: &[0x32, 0xC0],
                    replacement: &[0xB0, 0x01],
                }),
                x64: Some(SiteBytes {
                    offset: 0x07D970,
                    expected: &[0x32, 0xC0],
                    replacement: &[0xB0, 0x01],
                }),
            },
        ]),
    },
    // Skips the duplicate-key kick so LAN games no longer require a unique
    // key per machine. The master servers that enforced this are gone.
    Descriptor {
        name: "allow_duplicate_keys",
        module: ModuleKind::Network,
        necessity: Necessity::Optional,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x048A10,
                    expected: &[0x75, 0x1C],
                    replacement: &[0xEB, 0x1C],
                }),
                x64: Some(SiteBytes {
                    offset: 0x05C490,
                    expected: &[0x75, 0x1F],
                    replacement: &[0xEB, 0x1F],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x049050,
                    expected: &[0x75, 0x1C],
                    replacement: &[0xEB, 0x1C],
                }),
                x64: Some(SiteBytes {
                    offset: 0x05CCF0,
                    expected: &[0x75, 0x1F],
                    replacement: &[0xEB, 0x1F],
                }),
            },
            PatchSite {
                builds: EXP_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x049B64,
                    expected: &[0x75, 0x20],
                    replacement: &[0xEB, 0x20],
                }),
                x64: Some(SiteBytes {
                    offset: 0x05D854,
                    expected: &[0x75, 0x23],
                    replacement: &[0xEB, 0x23],
                }),
            },
            PatchSite {
                builds: EXP_LATE,
                x86: Some(SiteBytes {
                    offset: 0x04A720,
                    expected: &[0x75, 0x20],
                    replacement: &[0xEB, 0x20],
                }),
                x64: Some(SiteBytes {
                    offset: 0x05E4A8,
                    expected: &[0x75, 0x23],
                    replacement: &[0xEB, 0x23],
                }),
            },
        ]),
    },
    // Internet connect passes the wrong socket-mode argument when no
    // gamespy session is present, which every modern install hits. Pass the
    // direct-connect mode instead.
    Descriptor {
        name: "fix_internet_connect",
        module: ModuleKind::Network,
        necessity: Necessity::Mandatory,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x072C3E,
                    expected: &[0x6A, 0x00],
                    replacement: &[0x6A, 0x01],
                }),
                x64: Some(SiteBytes {
                    offset: 0x092E71,
                    expected: &[0x45, 0x33, 0xC9],
                    replacement: &[0x41, 0xB1, 0x01],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x0732AE,
                    expected: &[0x6A, 0x00],
                    replacement: &[0x6A, 0x01],
                }),
                x64: Some(SiteBytes {
                    offset: 0x0936D1,
                    expected: &[0x45, 0x33, 0xC9],
                    replacement: &[0x41, 0xB1, 0x01],
                }),
            },
            PatchSite {
                builds: EXP_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x073DC2,
                    expected: &[0x6A, 0x00],
                    replacement: &[0x6A, 0x01],
                }),
                x64: Some(SiteBytes {
                    offset: 0x094235,
                    expected: &[0x45, 0x33, 0xC9],
                    replacement: &[0x41, 0xB1, 0x01],
                }),
            },
            PatchSite {
                builds: EXP_LATE,
                x86: Some(SiteBytes {
                    offset: 0x074980,
                    expected: &[0x6A, 0x00],
                    replacement: &[0x6A, 0x01],
                }),
                x64: Some(SiteBytes {
                    offset: 0x094E89,
                    expected: &[0x45, 0x33, 0xC9],
                    replacement: &[0x41, 0xB1, 0x01],
                }),
            },
        ]),
    },
    // The server-side file consistency check dereferences a stale entry
    // when a client disconnects mid-verification and takes the whole server
    // down. Jump past the dereference on the disconnected path.
    Descriptor {
        name: "fix_file_check_crash",
        module: ModuleKind::Network,
        necessity: Necessity::Mandatory,
        body: Body::Patch(&[
            PatchSite {
                builds: BASE_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x06B2A4,
                    expected: &[0x74, 0x08],
                    replacement: &[0xEB, 0x08],
                }),
                x64: Some(SiteBytes {
                    offset: 0x088D10,
                    expected: &[0x74, 0x0A],
                    replacement: &[0xEB, 0x0A],
                }),
            },
            PatchSite {
                builds: BASE_LATE,
                x86: Some(SiteBytes {
                    offset: 0x06B914,
                    expected: &[0x74, 0x08],
                    replacement: &[0xEB, 0x08],
                }),
                x64: Some(SiteBytes {
                    offset: 0x089570,
                    expected: &[0x74, 0x0A],
                    replacement: &[0xEB, 0x0A],
                }),
            },
            PatchSite {
                builds: EXP_EARLY,
                x86: Some(SiteBytes {
                    offset: 0x06C428,
                    expected: &[0x74, 0x08],
                    replacement: &[0xEB, 0x08],
                }),
                x64: Some(SiteBytes {
                    offset: 0x08A0D4,
                    expected: &[0x74, 0x0A],
                    replacement: &[0xEB, 0x0A],
                }),
            },
            PatchSite {
                builds: EXP_LATE,
                x86: Some(SiteBytes {
                    offset: 0x06CFE0,
                    expected: &[0x74, 0x08],
                    replacement: &[0xEB, 0x08],
                }),
                x64: Some(SiteBytes {
                    offset: 0x08AD28,
                    expected: &[0x74, 0x0A],
                    replacement: &[0xEB, 0x0A],
                }),
            },
        ]),
    },
];
