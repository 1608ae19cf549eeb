//! Translator façade over a fake translation service.

mod common;

use std::sync::Arc;

use common::{FakeTransport, loader_over};
use lexicache::config::EngineConfig;
use lexicache::locale::Direction;
use lexicache::translator::Translator;

fn config_with_fallbacks() -> EngineConfig {
    EngineConfig::from_yaml("default_locale: en\nfallback_locale: en\nfallbacks:\n  de-CH: de\n")
        .expect("config parses")
}

fn translator_over(transport: &Arc<FakeTransport>) -> Translator {
    Translator::new(loader_over(Arc::clone(transport), None), config_with_fallbacks())
}

#[tokio::test(start_paused = true)]
async fn initialize_loads_default_locale() {
    let transport = FakeTransport::new();
    transport.serve(
        "en",
        &[
            ("greeting", "Hello"),
            ("items_one", "{{count}} item"),
            ("items_other", "{{count}} items"),
        ],
        None,
    );
    let translator = translator_over(&transport);

    let outcome = translator.initialize().await;
    assert!(!outcome.used_fallback);
    assert_eq!(translator.t("greeting"), "Hello");
    assert_eq!(translator.plural("items", 1, None), "1 item");
    assert_eq!(translator.plural("items", 12, None), "12 items");
    assert_eq!(translator.direction(), Direction::Ltr);
    assert_eq!(transport.calls_for("en"), 1);
}

#[tokio::test(start_paused = true)]
async fn regional_locale_uses_configured_fallback() {
    let transport = FakeTransport::new();
    transport.serve("de", &[("greeting", "Hallo"), ("farewell", "Tschüss")], None);
    transport.serve("en", &[("greeting", "Hello"), ("settings", "Settings")], None);
    let translator = translator_over(&transport);

    let outcome = translator.change_locale("de-CH").await;
    assert!(outcome.used_fallback);
    assert_eq!(outcome.bundle.locale, "de");
    assert_eq!(translator.locale(), "de-CH");
    assert_eq!(translator.t("farewell"), "Tschüss");
    // Only the `de` fallback is consulted, so English-only keys fall to built-ins or the key.
    assert_eq!(translator.t("settings"), "settings");
    assert_eq!(translator.t("common.ok"), "OK");
    assert_eq!(transport.calls_for("de-CH"), 3);
    assert_eq!(transport.calls_for("de"), 1);
}

#[tokio::test(start_paused = true)]
async fn refresh_picks_up_new_version() {
    let transport = FakeTransport::new();
    transport.serve("ru", &[("greeting", "Привет")], Some("\"1\""));
    let translator = translator_over(&transport);
    transport.serve("en", &[("greeting", "Hello")], None);

    translator.change_locale("ru").await;
    assert_eq!(translator.t("greeting"), "Привет");

    let unchanged = translator.refresh().await;
    assert!(unchanged.from_cache);

    transport.serve("ru", &[("greeting", "Здравствуйте")], Some("\"2\""));
    let updated = translator.refresh().await;
    assert!(!updated.from_cache);
    assert_eq!(translator.t("greeting"), "Здравствуйте");
    assert_eq!(updated.bundle.version, "2");
}

#[tokio::test(start_paused = true)]
async fn total_outage_still_answers_every_key() {
    let transport = FakeTransport::new();
    transport.set_offline(true);
    let translator = translator_over(&transport);

    let mut rx = translator.subscribe();
    let outcome = translator.change_locale("he").await;
    assert!(outcome.used_fallback);
    assert_eq!(*rx.borrow_and_update(), "he");
    assert_eq!(translator.direction(), Direction::Rtl);
    assert_eq!(translator.t("common.retry"), "Retry");
    assert_eq!(translator.get("dashboard.title", Some("Dashboard")), "Dashboard");
    assert_eq!(translator.plural("files", 3, Some("{{count}} files")), "3 files");
}
