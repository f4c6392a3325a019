//! Graphics-adapter logging and D3D10 API resolution.

use std::ffi::c_void;

use tracing::{info, warn};

use crate::module::{library_symbol, load_system_library};

/// Adapter record the D3D9 renderer fills during enumeration. No memory
/// sizes are available on this path.
#[repr(C)]
pub struct D3d9AdapterInfo {
    pub description: [u8; 512],
    pub vendor_id: u32,
    pub device_id: u32,
    pub revision: u32,
}

/// Adapter record the D3D10 renderer fills during enumeration.
#[repr(C)]
pub struct D3d10AdapterInfo {
    pub description: [u16; 128],
    pub vendor_id: u32,
    pub device_id: u32,
    pub revision: u32,
    pub dedicated_video_memory: usize,
    pub dedicated_system_memory: usize,
    pub shared_system_memory: usize,
}

/// Entry-point table the D3D10 renderer expects its loader to fill.
#[repr(C)]
pub struct D3d10Api {
    pub d3d10: *mut c_void,
    pub d3d10_create_device: *mut c_void,
    pub dxgi: *mut c_void,
    pub create_dxgi_factory: *mut c_void,
}

/// Render a byte count with binary-unit suffixes, e.g. `512M`.
pub fn format_bytes(mut bytes: usize) -> String {
    let mut unit = "";
    for next in ["K", "M", "G", "T", "P", "E"] {
        if bytes < 1024 {
            break;
        }
        unit = next;
        bytes /= 1024;
    }
    format!("{bytes}{unit}")
}

/// Tap-hook handler: log the D3D9 adapter identity.
pub(super) unsafe extern "system" fn adapter_info_d3d9(info: *const D3d9AdapterInfo) {
    if info.is_null() {
        return;
    }
    // SAFETY: the renderer passes its own enumeration record, valid for the
    // duration of the call.
    let info = unsafe { &*info };

    let end = info
        .description
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(info.description.len());
    let description = String::from_utf8_lossy(&info.description[..end]);

    info!("D3D9 adapter: {description}");
    info!(
        "D3D9 adapter: PCI {:04x}:{:04x} (rev {:02x})",
        info.vendor_id, info.device_id, info.revision
    );
}

/// Tap-hook handler: log the D3D10 adapter identity and memory tiers.
pub(super) unsafe extern "system" fn adapter_info_d3d10(info: *const D3d10AdapterInfo) {
    if info.is_null() {
        return;
    }
    // SAFETY: as above.
    let info = unsafe { &*info };

    let end = info
        .description
        .iter()
        .position(|&w| w == 0)
        .unwrap_or(info.description.len());
    let description = String::from_utf16_lossy(&info.description[..end]);

    info!("D3D10 adapter: {description}");
    info!(
        "D3D10 adapter: PCI {:04x}:{:04x} (rev {:02x})",
        info.vendor_id, info.device_id, info.revision
    );
    info!(
        "D3D10 adapter: dedicated video memory = {}",
        format_bytes(info.dedicated_video_memory)
    );
    info!(
        "D3D10 adapter: dedicated system memory = {}",
        format_bytes(info.dedicated_system_memory)
    );
    info!(
        "D3D10 adapter: shared system memory = {}",
        format_bytes(info.shared_system_memory)
    );
}

fn resolve_d3d10(api: &mut D3d10Api) -> crate::error::Result<()> {
    let d3d10 = load_system_library("d3d10.dll")?;
    api.d3d10 = d3d10;
    api.d3d10_create_device = library_symbol(d3d10, "D3D10CreateDevice")? as *mut c_void;

    let dxgi = load_system_library("dxgi.dll")?;
    api.dxgi = dxgi;
    api.create_dxgi_factory = library_symbol(dxgi, "CreateDXGIFactory")? as *mut c_void;

    Ok(())
}

/// Replace-hook handler: resolve the D3D10 entry points the renderer needs,
/// in place of its own LoadLibrary sequence.
pub(super) unsafe extern "system" fn init_api_d3d10(api: *mut D3d10Api) -> bool {
    if api.is_null() {
        return false;
    }
    // SAFETY: the renderer passes its own API table.
    let api = unsafe { &mut *api };
    match resolve_d3d10(api) {
        Ok(()) => true,
        Err(e) => {
            warn!("D3D10 initialization failed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_uses_binary_units() {
        assert_eq!(format_bytes(0), "0");
        assert_eq!(format_bytes(1023), "1023");
        assert_eq!(format_bytes(1024), "1K");
        assert_eq!(format_bytes(1536), "1K");
        assert_eq!(format_bytes(1024 * 1024), "1M");
        assert_eq!(format_bytes(768 * 1024 * 1024), "768M");
        assert_eq!(format_bytes(2 * 1024 * 1024 * 1024), "2G");
    }

    #[test]
    fn adapter_handlers_tolerate_null() {
        unsafe {
            adapter_info_d3d9(std::ptr::null());
            adapter_info_d3d10(std::ptr::null());
        }
    }

    #[test]
    fn d3d9_description_stops_at_nul() {
        let mut info = D3d9AdapterInfo {
            description: [0u8; 512],
            vendor_id: 0x10DE,
            device_id: 0x0191,
            revision: 0xA1,
        };
        info.description[..4].copy_from_slice(b"Test");
        // Garbage after the terminator must not leak into the log.
        info.description[5] = b'X';
        unsafe { adapter_info_d3d9(&info) };
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn init_api_fails_cleanly_off_windows() {
        let mut api = D3d10Api {
            d3d10: std::ptr::null_mut(),
            d3d10_create_device: std::ptr::null_mut(),
            dxgi: std::ptr::null_mut(),
            create_dxgi_factory: std::ptr::null_mut(),
        };
        assert!(!unsafe { init_api_d3d10(&mut api) });
    }
}
