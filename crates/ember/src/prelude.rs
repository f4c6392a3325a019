//! Prelude module for convenient imports.
//!
//! ```ignore
//! use ember::prelude::*;
//! ```

pub use crate::build::{ProductVariant, verify};
pub use crate::callbacks::{Callbacks, HandlerConfig};
pub use crate::error::{Error, Result};
pub use crate::launcher::{LaunchConfig, Launcher, Renderer};
pub use crate::module::{Module, ModuleKind};
pub use crate::patch::{ApplyReport, ApplyStatus, Patcher};
pub use crate::report::PatchSummary;
