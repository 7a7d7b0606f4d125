use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[clap(name = "ore-tally", version)]
pub struct Cli {
    /// JSON-lines file of session and cargo events to replay
    #[clap(long)]
    pub events: PathBuf,

    /// Print the request each lookup would send instead of querying
    #[clap(long)]
    pub dry_run: bool,

    /// Print estimate snapshots as JSON instead of the overlay/summary text
    #[clap(long)]
    pub json: bool,
}
