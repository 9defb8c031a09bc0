use tracing::{info, warn};
use weblaunch::Launcher;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// The URL to open.
    url: String,

    /// Skip the system URL handler and use the platform fallbacks directly.
    #[arg(long)]
    no_system_handler: bool,
}

pub fn main(args: Args) -> anyhow::Result<()> {
    let Args { url, no_system_handler } = args;

    let mut launcher = Launcher::new();
    if no_system_handler {
        launcher = launcher.without_system_handler();
    }

    match launcher.try_open(&url) {
        Ok(mechanism) => info!("Opened URL {} with {}", url, mechanism),
        Err(e) => {
            warn!("Failed to open URL {}: {:#}", url, anyhow::Error::from(e));
            println!("Browse to the following URL: {}", url);
        }
    }
    Ok(())
}
