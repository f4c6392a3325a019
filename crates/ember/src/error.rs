use thiserror::Error;

use crate::build::ProductVariant;
use crate::patch::PatchError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load {name}: {reason}")]
    Load { name: String, reason: String },

    #[error("Failed to read the engine build number from {name}: {reason}")]
    Version { name: String, reason: String },

    #[error("Missing entry point {symbol} in {name}")]
    Symbol { name: String, symbol: String },

    #[error("Unknown engine build {0}")]
    UnknownBuild(u32),

    #[error("Engine build {build} ({variant}) is not supported by this launcher")]
    UnsupportedVariant {
        build: u32,
        variant: ProductVariant,
    },

    #[error("Engine build {0} shipped without 64-bit binaries")]
    MissingNativeBinaries(u32),

    #[error("Mandatory patch {name} failed: {source}")]
    MandatoryPatchFailed {
        name: &'static str,
        source: PatchError,
    },

    #[error("Command line is too long ({len} bytes, limit {limit})")]
    CommandLineTooLong { len: usize, limit: usize },

    #[error("Engine startup failed: {0}")]
    Startup(String),

    #[error("Loading engine modules is only supported on Windows")]
    UnsupportedPlatform,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the failure is a build-identification rejection rather than a
    /// mechanical one. Used to pick the user-facing message shape.
    pub fn is_build_rejection(&self) -> bool {
        matches!(
            self,
            Error::UnknownBuild(_)
                | Error::UnsupportedVariant { .. }
                | Error::MissingNativeBinaries(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejections_are_classified() {
        assert!(Error::UnknownBuild(9999).is_build_rejection());
        assert!(
            Error::UnsupportedVariant {
                build: 710,
                variant: ProductVariant::UnsupportedExpansion,
            }
            .is_build_rejection()
        );
        assert!(!Error::UnsupportedPlatform.is_build_rejection());
    }

    #[test]
    fn unknown_build_message_names_the_number() {
        let msg = Error::UnknownBuild(9999).to_string();
        assert!(msg.contains("9999"));
        assert!(msg.contains("Unknown"));
    }
}
