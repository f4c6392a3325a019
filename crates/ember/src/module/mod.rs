//! Engine module handles.
//!
//! A [`Module`] is a binary image mapped into the current process: one of the
//! engine's own DLLs on Windows, or an owned in-memory image used by tests
//! and tooling. The patch engine only ever sees a base address and a mapped
//! size, so the two are interchangeable everywhere below the loader.

use strum::{Display, EnumIter, IntoStaticStr};

use crate::error::{Error, Result};

/// The engine modules this launcher knows how to load and patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum ModuleKind {
    System,
    Game,
    Action,
    Network,
    RenderD3D9,
    RenderD3D10,
}

impl ModuleKind {
    /// File name of the engine DLL for this module kind.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::System => "EmberSystem.dll",
            Self::Game => "EmberGame.dll",
            Self::Action => "EmberAction.dll",
            Self::Network => "EmberNetwork.dll",
            Self::RenderD3D9 => "EmberRenderD3D9.dll",
            Self::RenderD3D10 => "EmberRenderD3D10.dll",
        }
    }
}

enum Backing {
    /// Image mapped by the OS loader. Never unmapped; the engine keeps
    /// executing out of it until the process exits.
    #[cfg(target_os = "windows")]
    Native(windows::Win32::Foundation::HMODULE),
    /// Owned image for tests and tooling.
    Synthetic(Box<[u8]>),
}

/// A loaded engine module.
///
/// Modules are never copied or unloaded; everything downstream refers to them
/// by reference for the lifetime of the process.
pub struct Module {
    kind: ModuleKind,
    base: *mut u8,
    size: usize,
    backing: Backing,
}

impl Module {
    /// Map the engine DLL for `kind` into the current process.
    #[cfg(target_os = "windows")]
    pub fn load(kind: ModuleKind) -> Result<Self> {
        use windows::Win32::System::ProcessStatus::{GetModuleInformation, MODULEINFO};
        use windows::Win32::System::Threading::GetCurrentProcess;
        use windows::core::HSTRING;

        let name = kind.file_name();
        let handle =
            unsafe { windows::Win32::System::LibraryLoader::LoadLibraryW(&HSTRING::from(name)) }
                .map_err(|e| Error::Load {
                    name: name.to_string(),
                    reason: e.message().to_string(),
                })?;

        let mut info = MODULEINFO::default();
        // SAFETY: the handle was just returned by the loader and stays valid
        // for the process lifetime; MODULEINFO is plain data.
        unsafe {
            GetModuleInformation(
                GetCurrentProcess(),
                handle,
                &mut info,
                std::mem::size_of::<MODULEINFO>() as u32,
            )
        }
        .map_err(|e| Error::Load {
            name: name.to_string(),
            reason: e.message().to_string(),
        })?;

        Ok(Self {
            kind,
            base: info.lpBaseOfDll as *mut u8,
            size: info.SizeOfImage as usize,
            backing: Backing::Native(handle),
        })
    }

    #[cfg(not(target_os = "windows"))]
    pub fn load(_kind: ModuleKind) -> Result<Self> {
        Err(Error::UnsupportedPlatform)
    }

    /// Wrap an owned byte image as a module. The image plays the role of the
    /// mapped DLL for the patch engine; tests pre-seed it with the byte
    /// sequences a given build is documented to contain.
    pub fn synthetic(kind: ModuleKind, image: Vec<u8>) -> Self {
        let mut image = image.into_boxed_slice();
        let base = image.as_mut_ptr();
        let size = image.len();
        Self {
            kind,
            base,
            size,
            backing: Backing::Synthetic(image),
        }
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn base(&self) -> *mut u8 {
        self.base
    }

    /// Mapped size of the image in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn name(&self) -> &'static str {
        self.kind.file_name()
    }

    /// Bounds-checked read view into the image. Returns `None` if the range
    /// does not lie entirely within the mapped size.
    pub fn slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        if end > self.size {
            return None;
        }
        // SAFETY: the range was checked against the mapped size and the image
        // stays mapped for as long as `self` exists.
        Some(unsafe { std::slice::from_raw_parts(self.base.add(offset), len) })
    }

    /// Resolve an exported symbol to its address.
    pub fn find_symbol(&self, symbol: &str) -> Result<*const std::ffi::c_void> {
        match &self.backing {
            #[cfg(target_os = "windows")]
            Backing::Native(handle) => {
                use windows::core::PCSTR;

                let c_name = std::ffi::CString::new(symbol).map_err(|_| Error::Symbol {
                    name: self.name().to_string(),
                    symbol: symbol.to_string(),
                })?;
                // SAFETY: `c_name` outlives the call and the handle is a live
                // module handle.
                let proc = unsafe {
                    windows::Win32::System::LibraryLoader::GetProcAddress(
                        *handle,
                        PCSTR::from_raw(c_name.as_ptr() as *const u8),
                    )
                };
                match proc {
                    Some(p) => Ok(p as *const std::ffi::c_void),
                    None => Err(Error::Symbol {
                        name: self.name().to_string(),
                        symbol: symbol.to_string(),
                    }),
                }
            }
            Backing::Synthetic(_) => Err(Error::Symbol {
                name: self.name().to_string(),
                symbol: symbol.to_string(),
            }),
        }
    }

    /// Read the engine build number from the module's version resource.
    ///
    /// The engine stamps its build into the patch field of the file version
    /// (`major.minor.revision.build`), so this is the low word of the
    /// version's low dword.
    #[cfg(target_os = "windows")]
    pub fn build_number(&self) -> Result<u32> {
        match &self.backing {
            Backing::Native(handle) => version::read_build_number(*handle).map_err(|reason| {
                Error::Version {
                    name: self.name().to_string(),
                    reason,
                }
            }),
            Backing::Synthetic(_) => Err(Error::Version {
                name: self.name().to_string(),
                reason: "synthetic modules carry no version resource".to_string(),
            }),
        }
    }

    #[cfg(not(target_os = "windows"))]
    pub fn build_number(&self) -> Result<u32> {
        Err(Error::Version {
            name: self.name().to_string(),
            reason: "version resources are only available on Windows".to_string(),
        })
    }
}

/// Load an auxiliary OS library by name (e.g. `d3d10.dll`). Used by the
/// device-init callback, not for engine modules.
#[cfg(target_os = "windows")]
pub fn load_system_library(name: &str) -> Result<*mut std::ffi::c_void> {
    use windows::core::HSTRING;

    let handle =
        unsafe { windows::Win32::System::LibraryLoader::LoadLibraryW(&HSTRING::from(name)) }
            .map_err(|e| Error::Load {
                name: name.to_string(),
                reason: e.message().to_string(),
            })?;
    Ok(handle.0)
}

#[cfg(not(target_os = "windows"))]
pub fn load_system_library(name: &str) -> Result<*mut std::ffi::c_void> {
    Err(Error::Load {
        name: name.to_string(),
        reason: "system libraries are only loadable on Windows".to_string(),
    })
}

/// Resolve a symbol from a library handle returned by [`load_system_library`].
#[cfg(target_os = "windows")]
pub fn library_symbol(
    handle: *mut std::ffi::c_void,
    symbol: &str,
) -> Result<*const std::ffi::c_void> {
    use windows::Win32::Foundation::HMODULE;
    use windows::core::PCSTR;

    let c_name = std::ffi::CString::new(symbol).map_err(|_| Error::Symbol {
        name: "<system library>".to_string(),
        symbol: symbol.to_string(),
    })?;
    // SAFETY: the handle came from LoadLibraryW and `c_name` outlives the call.
    let proc = unsafe {
        windows::Win32::System::LibraryLoader::GetProcAddress(
            HMODULE(handle),
            PCSTR::from_raw(c_name.as_ptr() as *const u8),
        )
    };
    proc.map(|p| p as *const std::ffi::c_void)
        .ok_or_else(|| Error::Symbol {
            name: "<system library>".to_string(),
            symbol: symbol.to_string(),
        })
}

#[cfg(not(target_os = "windows"))]
pub fn library_symbol(
    _handle: *mut std::ffi::c_void,
    symbol: &str,
) -> Result<*const std::ffi::c_void> {
    Err(Error::Symbol {
        name: "<system library>".to_string(),
        symbol: symbol.to_string(),
    })
}

#[cfg(target_os = "windows")]
mod version {
    //! Version-resource query for the build number.

    use windows::Win32::Foundation::HMODULE;
    use windows::Win32::Storage::FileSystem::{
        GetFileVersionInfoSizeW, GetFileVersionInfoW, VS_FIXEDFILEINFO, VerQueryValueW,
    };
    use windows::Win32::System::LibraryLoader::GetModuleFileNameW;
    use windows::core::{HSTRING, w};

    pub(super) fn read_build_number(handle: HMODULE) -> Result<u32, String> {
        let mut path_buf = [0u16; 512];
        // SAFETY: the buffer is writable for its full length.
        let len = unsafe { GetModuleFileNameW(handle, &mut path_buf) } as usize;
        if len == 0 || len >= path_buf.len() {
            return Err("could not resolve the module path".to_string());
        }
        let path = HSTRING::from(String::from_utf16_lossy(&path_buf[..len]));

        // SAFETY: querying the size of a version resource has no
        // preconditions beyond a valid path string.
        let size = unsafe { GetFileVersionInfoSizeW(&path, None) };
        if size == 0 {
            return Err("module has no version resource".to_string());
        }

        let mut data = vec![0u8; size as usize];
        // SAFETY: `data` is writable for `size` bytes.
        unsafe { GetFileVersionInfoW(&path, 0, size, data.as_mut_ptr().cast()) }
            .map_err(|e| e.message().to_string())?;

        let mut fixed: *mut VS_FIXEDFILEINFO = std::ptr::null_mut();
        let mut fixed_len = 0u32;
        // SAFETY: `data` holds a complete version block; the root sub-block
        // yields a pointer into it.
        let ok = unsafe {
            VerQueryValueW(
                data.as_ptr().cast(),
                w!("\\"),
                &mut fixed as *mut _ as *mut *mut std::ffi::c_void,
                &mut fixed_len,
            )
        };
        if !ok.as_bool() || fixed.is_null() || (fixed_len as usize) < size_of::<VS_FIXEDFILEINFO>()
        {
            return Err("version resource has no fixed info block".to_string());
        }

        // SAFETY: verified non-null and large enough above; points into `data`.
        let info = unsafe { &*fixed };
        if info.dwSignature != 0xFEEF_04BD {
            return Err("fixed version info signature mismatch".to_string());
        }

        Ok(info.dwFileVersionLS & 0xFFFF)
    }
}
