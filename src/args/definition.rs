//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// lexicache - fetch, cache and query translation bundles
#[derive(Parser, Debug)]
#[command(name = "lexicache")]
#[command(version)]
#[command(about = "Fetch, cache and query translation bundles", long_about = None)]
pub struct Args {
    /// Path to lexicache.yml (default: ~/.config/lexicache/lexicache.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output (equivalent to --log-level debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load a locale and print how it was acquired
    Fetch {
        /// Locale to load
        locale: String,
        /// Fallback locale (default: from config)
        #[arg(long)]
        fallback: Option<String>,
        /// Skip the cache check and go to the network
        #[arg(long)]
        force: bool,
    },
    /// Print the translation of a key
    Get {
        /// Locale to use
        locale: String,
        /// Translation key
        key: String,
        /// Text printed when the key is missing
        #[arg(long)]
        default: Option<String>,
    },
    /// Print the plural form of a key for a count
    Plural {
        /// Locale to use
        locale: String,
        /// Key without the category suffix
        base_key: String,
        /// Item count
        count: u64,
    },
    /// Detect the writing direction of a text
    Direction {
        /// Text to classify
        text: String,
    },
    /// Tell whether a locale is written right-to-left
    IsRtl {
        /// Locale code
        locale: String,
    },
    /// Check the translation service health endpoint
    Health,
    /// Show persisted bundle statistics
    Stats,
    /// Remove cached bundles
    Clear {
        /// Only remove this locale
        #[arg(long)]
        locale: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fetch_with_flags() {
        let args = Args::try_parse_from([
            "lexicache",
            "--verbose",
            "fetch",
            "fr",
            "--fallback",
            "en",
            "--force",
        ])
        .expect("parse");
        assert!(args.verbose);
        assert_eq!(
            args.command,
            Command::Fetch {
                locale: "fr".to_string(),
                fallback: Some("en".to_string()),
                force: true,
            }
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "lexicache",
            "plural",
            "ru",
            "items",
            "21",
            "--log-level",
            "warn",
            "--config",
            "/tmp/l.yml",
        ])
        .expect("parse");
        assert_eq!(args.log_level, "warn");
        assert_eq!(args.config, Some(PathBuf::from("/tmp/l.yml")));
        assert!(matches!(args.command, Command::Plural { count: 21, .. }));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Args::try_parse_from(["lexicache"]).is_err());
        assert!(Args::try_parse_from(["lexicache", "plural", "ru", "items", "-1"]).is_err());
    }
}
