//! `catalog` command: list the descriptors for one build.

use anyhow::{Result, bail};
use ember::catalog_entries;

pub fn run(build: u32, json: bool) -> Result<()> {
    if ember::lookup(build).is_none() {
        bail!("unknown engine build {build}");
    }

    let entries = catalog_entries(build);
    if entries.is_empty() {
        println!("no catalog entries for build {build}");
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!(
        "{:<22} {:<32} {:<6} {:<10} {:>10} {:>5}",
        "MODULE", "NAME", "KIND", "NECESSITY", "OFFSET", "SIZE"
    );
    for entry in &entries {
        let offset = entry
            .offset
            .map(|o| format!("{o:#x}"))
            .unwrap_or_else(|| "-".to_string());
        let size = entry
            .size
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<22} {:<32} {:<6} {:<10} {offset:>10} {size:>5}",
            entry.module, entry.name, entry.kind, entry.necessity
        );
    }

    Ok(())
}
