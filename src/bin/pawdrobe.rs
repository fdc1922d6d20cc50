//! Pawdrobe Outfit Finishing CLI Tool
//!
//! Command-line interface for assessing and cleaning backdrops on generated
//! outfit frames using the pawdrobe library.

#[cfg(feature = "cli")]
use pawdrobe::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
