//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "artscout",
    version,
    author = "neur0map",
    about = "Natural-language and image search over an artwork collection",
    long_about = "Artscout indexes artwork images with CLIP embeddings alongside their catalogue \
                  metadata, then answers text or image queries by visual similarity, metadata \
                  filters, or both."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/artscout/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Configuration profile to apply
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed artwork images and build the index
    Index {
        /// Drop the collection before ingesting
        #[arg(long)]
        rebuild: bool,

        /// Catalog file (JSON array or JSON Lines); defaults to the image store folder
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },

    /// Search artworks with a natural-language query
    Search {
        /// Search query text
        query: String,

        /// Skip routing and use this strategy
        #[arg(short, long, value_parser = ["feature", "metadata", "hybrid", "random"])]
        strategy: Option<String>,

        /// Maximum number of results to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Find artworks similar to an image
    Image {
        /// Image path or http(s) URL
        source: String,

        /// Maximum number of results to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show which strategy a query would be routed to
    Route {
        /// Query text
        query: String,
    },

    /// Normalize a period expression to a year range
    Period {
        /// Period text, e.g. "1851-1900" or "after 2000"
        text: String,
    },

    /// Show index status
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_search_with_strategy() {
        let cli = Cli::try_parse_from([
            "artscout",
            "search",
            "oil on canvas",
            "--strategy",
            "metadata",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Search {
                query,
                strategy,
                json,
                ..
            } => {
                assert_eq!(query, "oil on canvas");
                assert_eq!(strategy.as_deref(), Some("metadata"));
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_strategy() {
        assert!(Cli::try_parse_from(["artscout", "search", "x", "--strategy", "fuzzy"]).is_err());
    }
}
