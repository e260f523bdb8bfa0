use clap::{Parser, Subcommand};

/// Mall token refresher — renews storefront OAuth credentials
#[derive(Parser)]
#[command(name = "mall-token-refresh", version, about)]
pub struct Cli {
    /// Mall to act on (overrides MALL_ID)
    #[arg(long, global = true)]
    pub mall_id: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one refresh cycle and print the result (default)
    Refresh,

    /// Refresh on a fixed interval until interrupted
    Schedule {
        /// Seconds between cycles (overrides MALL_REFRESH_INTERVAL_SECS)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Serve the refresh HTTP endpoint
    Serve {
        /// Port to bind (overrides MALL_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply database migrations
    Migrate,

    /// Show the stored credential's metadata
    Show,
}
