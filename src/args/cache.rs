//! `stats`, `clear` and `health` subcommands.

use lexicache::cache::StoreStats;
use lexicache::error::Result;
use lexicache::loader::Loader;
use lexicache::translator::Translator;

/// What: Print statistics of the persistent tier.
///
/// # Errors
/// - Storage errors while listing records
pub fn handle_stats(loader: &Loader) -> Result<()> {
    let Some(store) = loader.cache().store() else {
        println!("no persistent store configured");
        return Ok(());
    };
    let stats = store.stats()?;
    let locales = store.locales()?;
    println!("{}", describe_stats(&stats, &locales));
    Ok(())
}

/// Human-readable store statistics.
fn describe_stats(stats: &StoreStats, locales: &[String]) -> String {
    let locales = if locales.is_empty() {
        "-".to_string()
    } else {
        locales.join(", ")
    };
    format!(
        "entries: {}\ncompressed: {}\nstored bytes: {}\noriginal bytes: {}\nlocales: {locales}",
        stats.entries, stats.compressed_entries, stats.total_bytes, stats.original_bytes
    )
}

/// What: Remove one locale or every cached bundle.
///
/// # Errors
/// - Storage errors while removing records
pub fn handle_clear(translator: &Translator, locale: Option<&str>) -> Result<()> {
    tracing::info!(?locale, "clear cache requested from CLI");
    match locale {
        Some(locale) => {
            translator.deactivate_locale(locale)?;
            println!("removed {locale}");
        }
        None => {
            translator.clear_cache()?;
            println!("cache cleared");
        }
    }
    Ok(())
}

/// What: Probe the service health endpoint.
///
/// # Errors
/// - Network errors from the probe
pub async fn handle_health(loader: &Loader) -> Result<()> {
    let healthy = loader.transport().health().await?;
    println!("{}", if healthy { "ok" } else { "unhealthy" });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_render_locales() {
        let stats = StoreStats {
            entries: 2,
            total_bytes: 900,
            compressed_entries: 1,
            original_bytes: 2_000,
        };
        let text = describe_stats(&stats, &["en".to_string(), "ru".to_string()]);
        assert!(text.contains("entries: 2"));
        assert!(text.contains("locales: en, ru"));
        assert!(describe_stats(&StoreStats::default(), &[]).contains("locales: -"));
    }
}
