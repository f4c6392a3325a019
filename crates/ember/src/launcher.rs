//! Launch orchestration.
//!
//! The ordering here is the launcher's central correctness invariant: load
//! every target module, resolve and verify the build, apply all patches and
//! hooks, and only then transfer control to the engine entry point. Nothing
//! executes out of a module while it is being rewritten, which is why the
//! patch engine needs no locking at all.

use std::ffi::{CString, c_char, c_void};
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::info;

use crate::build;
use crate::callbacks::{Callbacks, HandlerConfig, init_handler_config};
use crate::error::{Error, Result};
use crate::hook::InstalledHook;
use crate::module::{Module, ModuleKind};
use crate::patch::Patcher;
use crate::report::PatchSummary;

/// Capacity of the command-line buffer embedded in [`InitParams`].
pub const CMD_LINE_CAP: usize = 2048;

/// Symbol the game module exports to create the startup interface.
pub const STARTUP_SYMBOL: &str = "CreateEngineStartup";

/// Renderer selection for the launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Renderer {
    /// Prefer the D3D10 renderer.
    #[default]
    Auto,
    D3D9,
    D3D10,
}

/// Everything the orchestrator needs to know for one launch.
#[derive(Debug, Clone, Default)]
pub struct LaunchConfig {
    /// Filesystem root for logs; defaults to the working directory.
    pub root: Option<PathBuf>,
    /// Engine log file name passed through to the engine.
    pub log_file: Option<PathBuf>,
    /// Localization override applied by the language-init tap.
    pub language: Option<String>,
    /// Keep the vendor intro videos (`--splash`).
    pub keep_intros: bool,
    pub renderer: Renderer,
    pub dedicated: bool,
    /// Explicit user-data directory for the path handler.
    pub user_dir: Option<PathBuf>,
}

impl LaunchConfig {
    /// Which rendering module this launch loads, if any.
    pub fn render_module(&self) -> Option<ModuleKind> {
        if self.dedicated {
            return None;
        }
        match self.renderer {
            Renderer::D3D9 => Some(ModuleKind::RenderD3D9),
            Renderer::Auto | Renderer::D3D10 => Some(ModuleKind::RenderD3D10),
        }
    }

    fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            language_override: self.language.clone(),
            user_path_override: self.user_dir.clone(),
            crash_log: Some(
                self.root
                    .clone()
                    .unwrap_or_default()
                    .join("crash.log"),
            ),
        }
    }
}

/// Init parameter block handed to the engine startup interface.
#[repr(C)]
pub struct InitParams {
    pub instance: *mut c_void,
    pub log_file: *const c_char,
    pub on_early_init: Option<unsafe extern "system" fn(*mut c_void)>,
    pub is_dedicated: bool,
    pub cmd_line: [c_char; CMD_LINE_CAP],
}

impl InitParams {
    pub fn new() -> Self {
        Self {
            instance: std::ptr::null_mut(),
            log_file: std::ptr::null(),
            on_early_init: None,
            is_dedicated: false,
            cmd_line: [0; CMD_LINE_CAP],
        }
    }

    /// Copy the process command line into the embedded buffer.
    pub fn set_cmd_line(&mut self, line: &str) -> Result<()> {
        let bytes = line.as_bytes();
        if bytes.len() + 1 > CMD_LINE_CAP {
            return Err(Error::CommandLineTooLong {
                len: bytes.len(),
                limit: CMD_LINE_CAP - 1,
            });
        }
        for (dst, &src) in self.cmd_line.iter_mut().zip(bytes) {
            *dst = src as c_char;
        }
        self.cmd_line[bytes.len()] = 0;
        Ok(())
    }
}

impl Default for InitParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Vtable of the startup interface the engine entry point returns. Layout
/// is the engine's ABI; field order must not change.
#[repr(C)]
pub struct StartupVtable {
    pub init: unsafe extern "system" fn(*mut EngineStartup, *mut InitParams) -> bool,
    pub run: unsafe extern "system" fn(*mut EngineStartup, *const c_char) -> i32,
    pub shutdown: unsafe extern "system" fn(*mut EngineStartup),
}

#[repr(C)]
pub struct EngineStartup {
    pub vtable: *const StartupVtable,
}

/// Signature of [`STARTUP_SYMBOL`].
pub type CreateStartupFn = unsafe extern "system" fn() -> *mut EngineStartup;

/// The engine's global environment pointer, captured exactly once during
/// early engine init and read-only afterwards.
struct EngineEnv(*mut c_void);

// SAFETY: only the address is stored; the engine itself shares the
// environment across its threads.
unsafe impl Send for EngineEnv {}
unsafe impl Sync for EngineEnv {}

static ENGINE_ENV: OnceLock<EngineEnv> = OnceLock::new();

/// The captured engine environment, if early init has run.
pub fn engine_env() -> Option<*mut c_void> {
    ENGINE_ENV.get().map(|env| env.0)
}

unsafe extern "system" fn on_early_init(env: *mut c_void) {
    if ENGINE_ENV.set(EngineEnv(env)).is_ok() {
        info!("engine environment captured");
    }
}

/// Verify the build, then run the full catalog over every loaded module.
///
/// Verification strictly precedes any patch engine invocation: an unknown
/// or rejected build returns before a single byte of any module is read or
/// written. Mandatory descriptor failures abort with an error; the caller
/// must treat that as fatal and never hand control to the engine.
pub fn patch_modules(
    build: u32,
    modules: &[&Module],
    config: &LaunchConfig,
    callbacks: &Callbacks,
) -> Result<(PatchSummary, Vec<InstalledHook>)> {
    let variant = build::verify(build)?;
    info!(build, %variant, "engine build verified");

    let mut patcher = Patcher::new(build, callbacks);
    if config.keep_intros {
        patcher.disable("skip_intro_videos");
    }

    let mut summary = PatchSummary::default();
    for module in modules {
        summary.extend(patcher.apply_module(module)?);
    }
    summary.log();

    Ok((summary, patcher.into_hooks()))
}

struct LoadedModules {
    system: Module,
    game: Module,
    action: Module,
    network: Module,
    render: Option<Module>,
}

impl LoadedModules {
    fn all(&self) -> Vec<&Module> {
        let mut out = vec![&self.system, &self.game, &self.action, &self.network];
        out.extend(self.render.as_ref());
        out
    }
}

/// Sequences one complete launch.
pub struct Launcher {
    config: LaunchConfig,
}

impl Launcher {
    pub fn new(config: LaunchConfig) -> Self {
        Self { config }
    }

    /// Load, verify, patch, and hand off. Returns the engine's exit code.
    pub fn run(self) -> Result<i32> {
        let system = Module::load(ModuleKind::System)?;
        let build = system.build_number()?;

        let game = Module::load(ModuleKind::Game)?;
        let action = Module::load(ModuleKind::Action)?;
        let network = Module::load(ModuleKind::Network)?;
        let render = match self.config.render_module() {
            Some(kind) => Some(Module::load(kind)?),
            None => None,
        };
        let modules = LoadedModules {
            system,
            game,
            action,
            network,
            render,
        };

        if !init_handler_config(self.config.handler_config()) {
            info!("handler configuration was already set; keeping the first value");
        }

        let callbacks = Callbacks::standard();
        let (_summary, hooks) =
            patch_modules(build, &modules.all(), &self.config, &callbacks)?;
        info!(hooks = hooks.len(), "all patches and hooks in place");

        let code = start_engine(&modules.game, &self.config)?;

        // The engine has shut down; modules and trampolines stay mapped
        // until process exit regardless.
        drop(hooks);
        Ok(code)
    }
}

/// Resolve the engine entry point and drive init -> run -> shutdown.
fn start_engine(game: &Module, config: &LaunchConfig) -> Result<i32> {
    let sym = game.find_symbol(STARTUP_SYMBOL)?;
    // SAFETY: the export carries this signature on every supported build.
    let create: CreateStartupFn = unsafe { std::mem::transmute(sym) };

    // SAFETY: calling the verified entry point.
    let startup = unsafe { create() };
    if startup.is_null() {
        return Err(Error::Startup(
            "entry point returned no startup interface".to_string(),
        ));
    }

    let mut params = InitParams::new();
    let log_file = CString::new(
        config
            .log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("engine.log"))
            .to_string_lossy()
            .into_owned(),
    )
    .map_err(|_| Error::Startup("log file name contains NUL".to_string()))?;
    params.log_file = log_file.as_ptr();
    params.is_dedicated = config.dedicated;
    params.on_early_init = Some(on_early_init);
    #[cfg(target_os = "windows")]
    {
        // SAFETY: querying our own module handle cannot fail meaningfully.
        if let Ok(instance) =
            unsafe { windows::Win32::System::LibraryLoader::GetModuleHandleW(None) }
        {
            params.instance = instance.0;
        }
    }

    let cmd_line = std::env::args().collect::<Vec<_>>().join(" ");
    params.set_cmd_line(&cmd_line)?;

    // SAFETY: startup is non-null and its vtable layout is the engine ABI
    // declared above. `params` and `log_file` outlive every call.
    unsafe {
        let vtable = &*(*startup).vtable;
        if !(vtable.init)(startup, &mut params) {
            return Err(Error::Startup("engine initialization failed".to_string()));
        }
        let code = (vtable.run)(startup, std::ptr::null());
        (vtable.shutdown)(startup);
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{ApplyStatus, SkipReason};
    use crate::testing::seeded_module;

    #[test]
    fn cmd_line_fits_or_errors() {
        let mut params = InitParams::new();
        params.set_cmd_line("launcher --dx10").unwrap();
        assert_eq!(params.cmd_line[0], b'l' as c_char);
        assert_eq!(params.cmd_line[15], 0);

        let long = "x".repeat(CMD_LINE_CAP);
        match params.set_cmd_line(&long) {
            Err(Error::CommandLineTooLong { len, limit }) => {
                assert_eq!(len, CMD_LINE_CAP);
                assert_eq!(limit, CMD_LINE_CAP - 1);
            }
            other => panic!("expected CommandLineTooLong, got {other:?}"),
        }
    }

    #[test]
    fn renderer_selection_follows_config() {
        let mut config = LaunchConfig::default();
        assert_eq!(config.render_module(), Some(ModuleKind::RenderD3D10));

        config.renderer = Renderer::D3D9;
        assert_eq!(config.render_module(), Some(ModuleKind::RenderD3D9));

        config.dedicated = true;
        assert_eq!(config.render_module(), None);
    }

    #[test]
    fn verification_gates_all_patching() {
        let callbacks = Callbacks::standard();
        let config = LaunchConfig::default();
        let module = seeded_module(ModuleKind::Network, 6156);
        let before: Vec<u8> = module.slice(0, module.size()).unwrap().to_vec();

        let result = patch_modules(9999, &[&module], &config, &callbacks);
        assert!(matches!(result, Err(Error::UnknownBuild(9999))));

        // Not one byte was touched.
        assert_eq!(module.slice(0, module.size()).unwrap(), &before[..]);
    }

    #[test]
    fn rejected_variant_gates_patching_too() {
        let callbacks = Callbacks::standard();
        let config = LaunchConfig::default();
        let module = seeded_module(ModuleKind::Network, 6156);

        let result = patch_modules(710, &[&module], &config, &callbacks);
        assert!(matches!(result, Err(Error::UnsupportedVariant { build: 710, .. })));
    }

    #[test]
    fn keep_intros_disables_the_intro_patch() {
        let callbacks = Callbacks::standard();
        let config = LaunchConfig {
            keep_intros: true,
            ..Default::default()
        };
        let module = seeded_module(ModuleKind::Game, 6156);

        let (summary, _hooks) =
            patch_modules(6156, &[&module], &config, &callbacks).unwrap();

        let intro = summary
            .reports()
            .iter()
            .find(|r| r.name == "skip_intro_videos")
            .expect("intro descriptor must be reported");
        assert!(matches!(
            intro.status,
            ApplyStatus::Skipped(SkipReason::DisabledForLaunch)
        ));

        let others_applied = summary
            .reports()
            .iter()
            .filter(|r| r.name != "skip_intro_videos")
            .all(|r| matches!(r.status, ApplyStatus::Applied | ApplyStatus::Skipped(_)));
        assert!(others_applied);
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn launch_fails_cleanly_off_windows() {
        let result = Launcher::new(LaunchConfig::default()).run();
        assert!(matches!(result, Err(Error::UnsupportedPlatform)));
    }
}
