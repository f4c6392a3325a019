//! Per-launch apply summaries and catalog listings for tooling.

use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::info;

use crate::catalog::{self, Body};
use crate::module::ModuleKind;
use crate::patch::{ApplyReport, ApplyStatus};

/// Accumulated outcome of one launch's patch phase.
#[derive(Default)]
pub struct PatchSummary {
    reports: Vec<ApplyReport>,
}

impl PatchSummary {
    pub fn extend(&mut self, reports: Vec<ApplyReport>) {
        self.reports.extend(reports);
    }

    pub fn reports(&self) -> &[ApplyReport] {
        &self.reports
    }

    pub fn applied(&self) -> usize {
        self.count(|s| matches!(s, ApplyStatus::Applied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ApplyStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ApplyStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&ApplyStatus) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.status)).count()
    }

    pub fn log(&self) {
        info!(
            applied = self.applied(),
            skipped = self.skipped(),
            failed = self.failed(),
            "patch phase complete"
        );
    }
}

/// One catalog row, flattened for display or JSON export. Offsets are for
/// the architecture this launcher was built for.
#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub module: &'static str,
    pub kind: &'static str,
    pub necessity: &'static str,
    pub offset: Option<usize>,
    pub size: Option<usize>,
}

/// Flatten every descriptor applicable to `build` across all module kinds.
pub fn catalog_entries(build: u32) -> Vec<CatalogEntry> {
    let mut out = Vec::new();
    for kind in ModuleKind::iter() {
        for desc in catalog::descriptors_for_build(kind, build) {
            let (body_kind, site) = match desc.body {
                Body::Patch(sites) => (
                    "patch",
                    sites
                        .iter()
                        .find(|s| s.applies_to(build))
                        .and_then(|s| s.native())
                        .map(|b| (b.offset, b.expected.len())),
                ),
                Body::Hook(info) => (
                    "hook",
                    info.sites
                        .iter()
                        .find(|s| s.applies_to(build))
                        .and_then(|s| s.native())
                        .map(|b| (b.offset, b.expected.len())),
                ),
            };
            out.push(CatalogEntry {
                name: desc.name,
                module: kind.into(),
                kind: body_kind,
                necessity: desc.necessity.as_str(),
                offset: site.map(|(o, _)| o),
                size: site.map(|(_, l)| l),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Necessity;
    use crate::patch::SkipReason;

    #[test]
    fn summary_counts_by_status() {
        let mut summary = PatchSummary::default();
        summary.extend(vec![
            ApplyReport {
                name: "a",
                module: ModuleKind::System,
                necessity: Necessity::Optional,
                status: ApplyStatus::Applied,
            },
            ApplyReport {
                name: "b",
                module: ModuleKind::System,
                necessity: Necessity::Optional,
                status: ApplyStatus::Skipped(SkipReason::BuildNotApplicable),
            },
        ]);
        assert_eq!(summary.applied(), 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.failed(), 0);
    }

    #[test]
    fn entries_cover_every_module_for_6156() {
        let entries = catalog_entries(6156);
        assert!(!entries.is_empty());

        let modules: std::collections::HashSet<_> =
            entries.iter().map(|e| e.module).collect();
        assert_eq!(modules.len(), ModuleKind::iter().count());

        for entry in &entries {
            assert!(entry.offset.is_some(), "{}: no native offset", entry.name);
            assert!(entry.size.is_some());
        }
    }

    #[test]
    fn no_entries_for_unknown_or_rejected_builds() {
        assert!(catalog_entries(9999).is_empty());
        assert!(catalog_entries(710).is_empty());
    }

    #[test]
    fn entries_serialize_to_json() {
        let entries = catalog_entries(6156);
        let json = serde_json::to_string(&entries).unwrap();
        assert!(json.contains("\"disable_copy_protection\""));
    }
}
