//! `fetch` subcommand.

use lexicache::config::EngineConfig;
use lexicache::loader::{LoadOutcome, LoadRequest, Loader, is_builtin};

/// What: Load a locale and print how it was acquired.
///
/// Inputs:
/// - `loader`: Configured loader
/// - `config`: Engine configuration (fallback resolution)
/// - `locale`: Locale to load
/// - `fallback`: Explicit fallback locale overriding the configured one
/// - `force`: Skip the cache check
pub async fn handle_fetch(
    loader: &Loader,
    config: &EngineConfig,
    locale: &str,
    fallback: Option<&str>,
    force: bool,
) {
    let fallback = fallback.map_or_else(|| config.fallback_for(locale), str::to_string);
    tracing::info!(locale, fallback = %fallback, force, "fetch requested from CLI");
    let outcome = loader
        .load(
            LoadRequest::new(locale)
                .fallback(fallback.as_str())
                .force_refresh(force),
        )
        .await;
    println!("{}", describe_outcome(locale, &outcome));
}

/// Human-readable summary of a load.
fn describe_outcome(requested: &str, outcome: &LoadOutcome) -> String {
    let source = if is_builtin(&outcome.bundle) {
        "built-in".to_string()
    } else {
        outcome.bundle.locale.clone()
    };
    format!(
        "locale: {requested}\nserved: {source}\nentries: {}\nfrom cache: {}\nused fallback: {}\nstages: {}",
        outcome.bundle.len(),
        outcome.from_cache,
        outcome.used_fallback,
        outcome.path()
    )
}
