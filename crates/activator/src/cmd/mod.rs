mod check;
mod serve;
mod setup_vlans;

use std::path::PathBuf;

use clap::Args;

pub use check::run_check;
pub use serve::run_serve;
pub use setup_vlans::run_setup_vlans;

#[derive(Args)]
pub struct ConfigArgs {
    /// Path to activator.yaml config file
    #[arg(long, short, env = "ACTIVATOR_CONFIG")]
    config: PathBuf,
}
