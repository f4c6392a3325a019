//! Hardware capability probe.
//!
//! Installed over the engine's own CPU detection, which predates modern
//! core counts and feature flags and misreports both.

use tracing::info;

/// Capability record the engine expects the detection routine to fill.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCaps {
    pub cores: u32,
    pub features: u32,
}

pub const FEATURE_MMX: u32 = 1 << 0;
pub const FEATURE_SSE: u32 = 1 << 1;
pub const FEATURE_SSE2: u32 = 1 << 2;
pub const FEATURE_SSE3: u32 = 1 << 3;

/// Collect core count and instruction-set features for the running machine.
pub fn probe() -> CpuCaps {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1);

    #[allow(unused_mut)]
    let mut features = 0u32;
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if std::arch::is_x86_feature_detected!("mmx") {
            features |= FEATURE_MMX;
        }
        if std::arch::is_x86_feature_detected!("sse") {
            features |= FEATURE_SSE;
        }
        if std::arch::is_x86_feature_detected!("sse2") {
            features |= FEATURE_SSE2;
        }
        if std::arch::is_x86_feature_detected!("sse3") {
            features |= FEATURE_SSE3;
        }
    }

    CpuCaps { cores, features }
}

/// Replace-hook handler: fill the engine's capability record.
pub(super) unsafe extern "system" fn cpu_detect(out: *mut CpuCaps) {
    if out.is_null() {
        return;
    }
    let caps = probe();
    info!(
        cores = caps.cores,
        features = %format_args!("{:#06b}", caps.features),
        "cpu capabilities probed"
    );
    // SAFETY: the engine passes a pointer to its own capability record.
    unsafe { *out = caps };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_reports_at_least_one_core() {
        assert!(probe().cores >= 1);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn sse2_is_baseline_on_x86_64() {
        let caps = probe();
        assert_ne!(caps.features & FEATURE_SSE2, 0);
    }

    #[test]
    fn handler_tolerates_null_output() {
        unsafe { cpu_detect(std::ptr::null_mut()) };
    }

    #[test]
    fn handler_fills_the_record() {
        let mut caps = CpuCaps {
            cores: 0,
            features: 0,
        };
        unsafe { cpu_detect(&mut caps) };
        assert!(caps.cores >= 1);
    }
}
