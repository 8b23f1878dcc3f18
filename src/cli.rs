use clap::{Parser, Subcommand};

/// Embed gateway — serves report embed info for browser front-ends
#[derive(Parser)]
#[command(name = "embed-gateway", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default when no command is given)
    Serve {
        /// Port to bind; overrides EMBED_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the embed flow once and print the result as JSON
    Fetch,
}
