use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Override the config/state directory.
    #[clap(long)]
    pub dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the bot as a long-polling service.
    Daemon {},

    /// Fetch and print the merged record for an item link or identifier.
    Fetch {
        /// An archive.org details URL or a bare item identifier
        input: String,

        /// Skip the secondary catalog lookup
        #[clap(long, default_value = "false")]
        no_enrich: bool,
    },

    /// Search the primary catalog and print the hits.
    Search {
        /// Free-text query
        query: String,
    },

    /// Parse a video filename and print the title/year guess.
    Parse {
        /// A filename, e.g. Movie.Name.1999.1080p.x264.mkv
        filename: String,
    },

    /// Add a user id to the allow list.
    Authorize {
        /// Numeric account id
        user_id: u64,
    },
}
