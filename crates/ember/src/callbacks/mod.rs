//! Launcher-side handlers invoked by installed hooks.
//!
//! Every handler here is an `extern "system"` function the engine ends up
//! calling through a redirect or trampoline, possibly from multiple engine
//! threads at once. None of them re-enter the patch engine and none hold
//! state beyond the set-once [`HandlerConfig`] and internally synchronized
//! sinks (tracing, the crash log file).

mod cpu;
mod graphics;

pub use cpu::{CpuCaps, FEATURE_MMX, FEATURE_SSE, FEATURE_SSE2, FEATURE_SSE3, probe};
pub use graphics::{D3d9AdapterInfo, D3d10AdapterInfo, D3d10Api, format_bytes};

use std::ffi::{CStr, c_char};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{error, info};

use crate::catalog::HandlerId;

/// Settings the handlers consult at dispatch time. Set once before any hook
/// is installed and read-only afterwards; handlers may run on engine threads
/// where no launcher context exists.
#[derive(Debug, Clone, Default)]
pub struct HandlerConfig {
    /// `--language` override for localization init.
    pub language_override: Option<String>,
    /// Explicit user-data directory, replacing the documents-folder default.
    pub user_path_override: Option<PathBuf>,
    /// Where the fatal-error handler persists diagnostics.
    pub crash_log: Option<PathBuf>,
}

static HANDLER_CONFIG: OnceLock<HandlerConfig> = OnceLock::new();

/// Install the process-wide handler configuration. Returns false if it was
/// already set; the first value wins.
pub fn init_handler_config(config: HandlerConfig) -> bool {
    HANDLER_CONFIG.set(config).is_ok()
}

fn config() -> &'static HandlerConfig {
    HANDLER_CONFIG.get_or_init(HandlerConfig::default)
}

/// The dispatch table binding catalog handler ids to implementations.
///
/// The catalog stays pure data; this table is where a [`HandlerId`] becomes
/// a function address, at install time. Tests substitute their own table.
pub struct Callbacks {
    pub cpu_detect: unsafe extern "system" fn(*mut CpuCaps),
    pub engine_error: unsafe extern "system" fn(*const c_char) -> !,
    pub language_init: unsafe extern "system" fn(*mut c_char, usize),
    pub user_path: unsafe extern "system" fn(*mut c_char, usize),
    pub adapter_info_d3d9: unsafe extern "system" fn(*const D3d9AdapterInfo),
    pub adapter_info_d3d10: unsafe extern "system" fn(*const D3d10AdapterInfo),
    pub init_api_d3d10: unsafe extern "system" fn(*mut D3d10Api) -> bool,
}

impl Callbacks {
    /// The production handler set.
    pub fn standard() -> Self {
        Self {
            cpu_detect: cpu::cpu_detect,
            engine_error,
            language_init,
            user_path,
            adapter_info_d3d9: graphics::adapter_info_d3d9,
            adapter_info_d3d10: graphics::adapter_info_d3d10,
            init_api_d3d10: graphics::init_api_d3d10,
        }
    }

    /// Address a hook redirect should target for the given handler.
    pub(crate) fn address_of(&self, id: HandlerId) -> usize {
        match id {
            HandlerId::CpuDetect => self.cpu_detect as usize,
            HandlerId::EngineError => self.engine_error as usize,
            HandlerId::LanguageInit => self.language_init as usize,
            HandlerId::UserPath => self.user_path as usize,
            HandlerId::AdapterInfoD3D9 => self.adapter_info_d3d9 as usize,
            HandlerId::AdapterInfoD3D10 => self.adapter_info_d3d10 as usize,
            HandlerId::InitApiD3D10 => self.init_api_d3d10 as usize,
        }
    }
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::standard()
    }
}

/// Copy `value` into a NUL-terminated C string buffer, truncating to fit.
fn fill_cstr(buf: &mut [u8], value: &str) {
    if buf.is_empty() {
        return;
    }
    let len = value.len().min(buf.len() - 1);
    buf[..len].copy_from_slice(&value.as_bytes()[..len]);
    buf[len] = 0;
}

/// Append one timestamped line to the crash log.
fn append_crash_line(path: &Path, message: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "[{stamp}] engine error: {message}")
}

/// Default writable data directory: `Documents/My Games/Ember`.
fn default_user_path() -> Option<PathBuf> {
    dirs::document_dir().map(|docs| docs.join("My Games").join("Ember"))
}

fn resolve_user_path(override_path: Option<&Path>) -> Option<PathBuf> {
    override_path
        .map(Path::to_path_buf)
        .or_else(default_user_path)
}

/// Fatal-error sink. The engine calls this where it would otherwise show
/// its own error box and die; persist what we can, then terminate with a
/// non-zero status. Never returns.
unsafe extern "system" fn engine_error(message: *const c_char) -> ! {
    let text = if message.is_null() {
        "<no message>".to_string()
    } else {
        // SAFETY: the engine passes a NUL-terminated message string.
        unsafe { CStr::from_ptr(message) }
            .to_string_lossy()
            .into_owned()
    };

    error!("engine reported an unrecoverable error: {text}");

    let path = config()
        .crash_log
        .clone()
        .unwrap_or_else(|| PathBuf::from("crash.log"));
    if let Err(e) = append_crash_line(&path, &text) {
        error!("could not write {}: {e}", path.display());
    }

    std::process::exit(1);
}

/// Localization-init tap. The buffer holds the language the engine picked;
/// overwrite it when the user asked for a specific one.
unsafe extern "system" fn language_init(buf: *mut c_char, cap: usize) {
    if buf.is_null() || cap == 0 {
        return;
    }
    // SAFETY: the engine owns a writable language buffer of `cap` bytes.
    let slice = unsafe { std::slice::from_raw_parts_mut(buf as *mut u8, cap) };

    let end = slice.iter().position(|&b| b == 0).unwrap_or(0);
    let current = String::from_utf8_lossy(&slice[..end]).into_owned();

    match &config().language_override {
        Some(language) => {
            info!("language: {current} -> {language} (override)");
            fill_cstr(slice, language);
        }
        None => info!("language: {current}"),
    }
}

/// User-data-path handler. Replaces the engine's computation of its
/// writable directory; the buffer receives the resolved path.
unsafe extern "system" fn user_path(buf: *mut c_char, cap: usize) {
    if buf.is_null() || cap == 0 {
        return;
    }
    // SAFETY: the engine owns a writable path buffer of `cap` bytes.
    let slice = unsafe { std::slice::from_raw_parts_mut(buf as *mut u8, cap) };

    if let Some(path) = resolve_user_path(config().user_path_override.as_deref()) {
        info!("user data path: {}", path.display());
        fill_cstr(slice, &path.to_string_lossy());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_cstr_terminates_and_truncates() {
        let mut buf = [0xFFu8; 8];
        fill_cstr(&mut buf, "abc");
        assert_eq!(&buf[..4], b"abc\0");

        let mut small = [0xFFu8; 4];
        fill_cstr(&mut small, "longer than four");
        assert_eq!(&small, b"lon\0");

        let mut empty: [u8; 0] = [];
        fill_cstr(&mut empty, "x");
    }

    #[test]
    fn crash_line_is_appended_with_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crash.log");

        append_crash_line(&path, "first").unwrap();
        append_crash_line(&path, "second").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("engine error: first"));
        assert!(lines[1].contains("engine error: second"));
        assert!(lines[0].starts_with('['));
    }

    #[test]
    fn user_path_override_wins() {
        let override_path = Path::new("/data/ember");
        assert_eq!(
            resolve_user_path(Some(override_path)),
            Some(override_path.to_path_buf())
        );
    }

    #[test]
    fn every_handler_id_resolves_to_its_table_entry() {
        let callbacks = Callbacks::standard();
        let addresses = [
            callbacks.address_of(HandlerId::CpuDetect),
            callbacks.address_of(HandlerId::EngineError),
            callbacks.address_of(HandlerId::LanguageInit),
            callbacks.address_of(HandlerId::UserPath),
            callbacks.address_of(HandlerId::AdapterInfoD3D9),
            callbacks.address_of(HandlerId::AdapterInfoD3D10),
            callbacks.address_of(HandlerId::InitApiD3D10),
        ];
        assert!(addresses.iter().all(|&a| a != 0));
        let unique: std::collections::HashSet<_> = addresses.iter().collect();
        assert_eq!(unique.len(), addresses.len());
    }

    #[test]
    fn language_tap_respects_capacity() {
        let mut buf = [0u8; 4];
        buf[..3].copy_from_slice(b"en\0");
        unsafe { language_init(buf.as_mut_ptr() as *mut c_char, buf.len()) };
        // No override configured in tests: buffer is left alone.
        assert_eq!(&buf[..3], b"en\0");
    }
}
