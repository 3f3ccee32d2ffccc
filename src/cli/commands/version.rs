//! version command - Print the gitflow version

use anyhow::Result;

/// Print the crate's version string.
pub fn version() -> Result<()> {
    println!("gitflow {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
