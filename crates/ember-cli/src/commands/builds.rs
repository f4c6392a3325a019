//! `builds` command: print the support table.

use anyhow::Result;
use ember::{Error, SUPPORTED_BUILDS};
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    println!("{:<8} {:<22} STATUS", "BUILD", "PRODUCT");

    for row in SUPPORTED_BUILDS {
        let status = match ember::verify(row.build) {
            Ok(_) => "supported".green().to_string(),
            Err(Error::MissingNativeBinaries(_)) => "32-bit only".yellow().to_string(),
            Err(_) => "rejected".red().to_string(),
        };
        println!("{:<8} {:<22} {status}", row.build, row.variant.to_string());
    }

    Ok(())
}
