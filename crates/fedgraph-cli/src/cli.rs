use crate::config::DEFAULT_CONFIG_PATH;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fedgraph",
    about = "Fedgraph: compose subgraph schemas and resolve entity references",
    version
)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose all subgraphs and print the supergraph SDL
    Compose {
        /// Path to the gateway config
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,

        /// Write the supergraph to this file instead of stdout
        #[arg(long)]
        out: Option<String>,

        /// Output the composition report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the subgraphs compose, reporting every violation
    Validate {
        /// Path to the gateway config
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,

        /// Output the composition report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve `_Any` entity representations through their owning subgraphs
    Resolve {
        /// JSON file holding one representation or an array of them (`-` for stdin)
        representations: String,

        /// Path to the gateway config
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,

        /// Per-reference timeout, overriding `resolution_timeout_ms`
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}
