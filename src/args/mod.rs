//! Command-line argument parsing and handling.

pub mod cache;
pub mod definition;
pub mod fetch;
pub mod lookup;
pub mod utils;

// Re-export commonly used items
pub use definition::{Args, Command};
pub use utils::determine_log_level;

use lexicache::config::EngineConfig;
use lexicache::error::Result;
use lexicache::loader::Loader;
use lexicache::translator::Translator;

/// What: Run the parsed subcommand.
///
/// Inputs:
/// - `args`: Parsed command-line arguments
/// - `config`: Loaded engine configuration
///
/// # Errors
/// - Construction errors of the storage or HTTP stack
/// - Storage and network errors surfaced by `stats`, `clear` and `health`
pub async fn run(args: &Args, config: EngineConfig) -> Result<()> {
    match &args.command {
        Command::Direction { text } => lookup::handle_direction(text),
        Command::IsRtl { locale } => lookup::handle_is_rtl(locale),
        Command::Fetch {
            locale,
            fallback,
            force,
        } => {
            let loader = Loader::from_config(&config)?;
            fetch::handle_fetch(&loader, &config, locale, fallback.as_deref(), *force).await;
        }
        Command::Stats => cache::handle_stats(&Loader::from_config(&config)?)?,
        Command::Health => cache::handle_health(&Loader::from_config(&config)?).await?,
        Command::Get {
            locale,
            key,
            default,
        } => {
            let translator = build_translator(config)?;
            lookup::handle_get(&translator, locale, key, default.as_deref()).await;
        }
        Command::Plural {
            locale,
            base_key,
            count,
        } => {
            let translator = build_translator(config)?;
            lookup::handle_plural(&translator, locale, base_key, *count).await;
        }
        Command::Clear { locale } => {
            cache::handle_clear(&build_translator(config)?, locale.as_deref())?;
        }
    }
    Ok(())
}

/// Translator over the production loader stack.
fn build_translator(config: EngineConfig) -> Result<Translator> {
    let loader = Loader::from_config(&config)?;
    Ok(Translator::new(loader, config))
}
