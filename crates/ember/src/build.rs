//! Build identification and the fixed support table.
//!
//! The engine stamps a numeric build into each module's version resource.
//! That number is the sole key for everything downstream: variant
//! classification, the patch catalog, and user-facing messaging. Adding
//! support for a new build means adding a row here plus its catalog entries;
//! nothing else changes.

use strum::Display;

use crate::error::{Error, Result};

/// Which logical product a build belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ProductVariant {
    #[strum(serialize = "base game")]
    BaseGame,
    #[strum(serialize = "expansion")]
    Expansion,
    /// Recognized, deliberately rejected: the patch catalog for this product
    /// line is not maintained.
    #[strum(serialize = "standalone expansion")]
    UnsupportedExpansion,
}

/// One row of the support table.
#[derive(Debug, Clone, Copy)]
pub struct BuildRow {
    pub build: u32,
    pub variant: ProductVariant,
    /// The first expansion build shipped 32-bit binaries only.
    pub has_x64: bool,
}

/// Every build this launcher recognizes, supported or not.
pub static SUPPORTED_BUILDS: &[BuildRow] = &[
    BuildRow { build: 5767, variant: ProductVariant::BaseGame, has_x64: true },
    BuildRow { build: 5879, variant: ProductVariant::BaseGame, has_x64: true },
    BuildRow { build: 6115, variant: ProductVariant::BaseGame, has_x64: true },
    BuildRow { build: 6156, variant: ProductVariant::BaseGame, has_x64: true },
    BuildRow { build: 6527, variant: ProductVariant::Expansion, has_x64: false },
    BuildRow { build: 6566, variant: ProductVariant::Expansion, has_x64: true },
    BuildRow { build: 6586, variant: ProductVariant::Expansion, has_x64: true },
    BuildRow { build: 6627, variant: ProductVariant::Expansion, has_x64: true },
    BuildRow { build: 6670, variant: ProductVariant::Expansion, has_x64: true },
    BuildRow { build: 6729, variant: ProductVariant::Expansion, has_x64: true },
    BuildRow { build: 687, variant: ProductVariant::UnsupportedExpansion, has_x64: false },
    BuildRow { build: 710, variant: ProductVariant::UnsupportedExpansion, has_x64: false },
    BuildRow { build: 711, variant: ProductVariant::UnsupportedExpansion, has_x64: false },
];

/// Look up a build in the support table.
pub fn lookup(build: u32) -> Option<&'static BuildRow> {
    SUPPORTED_BUILDS.iter().find(|row| row.build == build)
}

/// Validate a resolved build number and classify its product variant.
///
/// This is the gate in front of the patch engine: no patch or hook is ever
/// applied to a build this function rejects. Unknown builds and
/// recognized-but-rejected builds fail with distinct errors so the user sees
/// "unknown version" vs. "this version is intentionally unsupported".
pub fn verify(build: u32) -> Result<ProductVariant> {
    let row = lookup(build).ok_or(Error::UnknownBuild(build))?;

    if row.variant == ProductVariant::UnsupportedExpansion {
        return Err(Error::UnsupportedVariant {
            build,
            variant: row.variant,
        });
    }

    if cfg!(target_pointer_width = "64") && !row.has_x64 {
        return Err(Error::MissingNativeBinaries(build));
    }

    Ok(row.variant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_game_builds_verify() {
        for build in [5767, 5879, 6115, 6156] {
            assert_eq!(verify(build).unwrap(), ProductVariant::BaseGame);
        }
    }

    #[test]
    fn expansion_builds_verify() {
        for build in [6566, 6586, 6627, 6670, 6729] {
            assert_eq!(verify(build).unwrap(), ProductVariant::Expansion);
        }
    }

    #[test]
    fn unknown_build_is_rejected() {
        assert!(matches!(verify(9999), Err(Error::UnknownBuild(9999))));
        assert!(matches!(verify(0), Err(Error::UnknownBuild(0))));
    }

    #[test]
    fn rejected_expansion_gets_a_distinct_error() {
        for build in [687, 710, 711] {
            match verify(build) {
                Err(Error::UnsupportedVariant { build: b, .. }) => assert_eq!(b, build),
                other => panic!("expected UnsupportedVariant, got {other:?}"),
            }
        }
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn first_expansion_build_lacks_x64_binaries() {
        assert!(matches!(verify(6527), Err(Error::MissingNativeBinaries(6527))));
    }

    #[test]
    fn table_has_no_duplicate_builds() {
        let mut builds: Vec<u32> = SUPPORTED_BUILDS.iter().map(|r| r.build).collect();
        builds.sort_unstable();
        builds.dedup();
        assert_eq!(builds.len(), SUPPORTED_BUILDS.len());
    }
}
