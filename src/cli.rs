use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Enable debug logging (overrides RUST_LOG)
    #[clap(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start semsearch as a service.
    Daemon {
        /// Listen address, e.g. 127.0.0.1:8080
        #[clap(long)]
        addr: Option<String>,
    },
    /// Rank the corpus against a query and print the results
    Search {
        /// Free text query
        #[clap(allow_hyphen_values = true)]
        query: String,

        /// Minimum similarity in [-1.0, 1.0]
        #[clap(short, long, allow_hyphen_values = true)]
        threshold: Option<f32>,

        /// Maximum number of results
        #[clap(short, long)]
        limit: Option<usize>,
    },
    /// Print the corpus
    Corpus {},
}
