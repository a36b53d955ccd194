//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ualr-rag",
    version,
    about = "Retrieval core for the UALR campus chatbot",
    long_about = "Embeds a question with a local sentence-embedding model, searches a prebuilt \
                  similarity index over the campus corpus, and returns the best-matching passages \
                  with their source metadata."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/ualr-rag/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Retrieve the passages most relevant to a question
    Query {
        /// Question text
        query: String,

        /// Number of passages to return (defaults to retrieval.default_k)
        #[arg(short, long)]
        k: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,

        /// Print only the joined passage text handed to the prompt layer
        #[arg(long, conflicts_with = "json")]
        context: bool,

        /// Profile to use (e.g., "fast")
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Embed a JSON Lines corpus and write the index and metadata artifacts
    Build {
        /// Corpus file, one {"id"?, "content", "metadata"?} object per line
        #[arg(long, value_name = "FILE")]
        corpus: PathBuf,

        /// Index output path (defaults to artifacts.index_path)
        #[arg(long, value_name = "FILE")]
        index_out: Option<PathBuf>,

        /// Metadata output path (defaults to artifacts.metadata_path)
        #[arg(long, value_name = "FILE")]
        metadata_out: Option<PathBuf>,
    },

    /// Load the configured artifacts and check that they belong together
    Verify,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

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
    fn test_parse_query() {
        let cli = Cli::try_parse_from(["ualr-rag", "query", "When is the library open?", "-k", "5"])
            .unwrap();
        match cli.command {
            Commands::Query { query, k, json, .. } => {
                assert_eq!(query, "When is the library open?");
                assert_eq!(k, Some(5));
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_negative_k_rejected() {
        assert!(Cli::try_parse_from(["ualr-rag", "query", "library", "-k", "-1"]).is_err());
    }

    #[test]
    fn test_json_and_context_conflict() {
        assert!(Cli::try_parse_from(["ualr-rag", "query", "library", "--json", "--context"]).is_err());
    }
}
