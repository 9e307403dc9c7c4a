//! Tiered intent detection. Each tier may short-circuit; the source tag
//! records which one fired so downstream guards can reason about it.
//!
//! Order: context short-circuits → lexical override → regex intents →
//! catalog match → backup resolver (expert mode only).

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug_span;

use kelner_core::catalog::Catalog;
use kelner_core::cuisine::{expand_cuisine, mentions_dish};
use kelner_core::resolve::{parse_order_phrase, parse_order_utterance};
use kelner_core::settings::settings;
use kelner_core::text::normalize;

use crate::icm;
use crate::types::{
    Domain, Entities, ExpectedContext, Intent, IntentSource, NluResult, Session,
};

/// Backup intent resolver (external LLM). Consulted only in expert mode
/// when every deterministic tier returned unknown.
pub trait IntentResolver: Send + Sync {
    fn resolve(&self, input: &str, allowed_intents: &[&'static str]) -> Option<ResolvedIntent>;
}

pub struct ResolvedIntent {
    pub intent: String,
    pub confidence: f64,
}

fn re(pattern: &str, cell: &'static OnceLock<Regex>) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

fn negative_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(r"^nie\b", &RE)
}

fn positive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(
        r"\b(tak|potwierdzam|zamawiam|ok|dobra|jasne|dawaj|pewnie)\b",
        &RE,
    )
}

fn order_verb_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(r"\b(wybieram|poprosze|wezme|dodaj|zamawiam|chce)\b", &RE)
}

fn vague_want_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(r"\bchce\s+(cos|zjesc|gdzie)\b", &RE)
}

fn discovery_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(
        r"(gdzie zjesc|szukam|polecisz|w poblizu|\b(pizzerie|restauracje|knajpy|bary|kebaby)\b|\bglodn\w*\b)",
        &RE,
    )
}

fn menu_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(
        r"^(pokaz\s+)?(menu|karta|karte|oferta|oferte|lista dan)$",
        &RE,
    )
}

fn reset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(r"(nowe zamowienie|od nowa|\bstart\b|resetuj)", &RE)
}

fn add_to_cart_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(r"do koszyka", &RE)
}

fn more_options_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(
        r"(wiecej opcji|inne opcje|wszystkie opcje|pokaz wszystkie|cala lista)",
        &RE,
    )
}

/// Proper noun after " w " in the raw (unfolded) input: "w Bytomiu".
fn location_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(r"\b[wW]\s+(\p{Lu}\p{L}+)", &RE)
}

fn cuisine_after_szukam_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(r"szukam\s+(\p{L}+)", &RE)
}

/// Affirmation check shared with the orchestrator's confirm guards.
pub(crate) fn is_positive(input: &str) -> bool {
    positive_re().is_match(&normalize(input))
}

/// Refusal check: "nie" leading the utterance.
pub(crate) fn is_negative(input: &str) -> bool {
    negative_re().is_match(&normalize(input))
}

const CUISINE_STOPWORDS: &[&str] = &[
    "czegos", "jedzenia", "restauracji", "knajpy", "miejsca", "gdzie", "teraz",
];

fn domain_of(intent: Intent) -> Domain {
    icm::spec(intent).map_or(Domain::System, |s| s.domain)
}

fn result(intent: Intent, source: IntentSource, confidence: f64, entities: Entities) -> NluResult {
    NluResult {
        intent,
        domain: domain_of(intent),
        confidence,
        entities,
        source,
    }
}

fn intent_from_wire(name: &str) -> Option<Intent> {
    let all = [
        Intent::FindNearby,
        Intent::MenuRequest,
        Intent::CreateOrder,
        Intent::ConfirmOrder,
        Intent::ConfirmAddToCart,
        Intent::SelectRestaurant,
        Intent::ShowMoreOptions,
        Intent::CancelOrder,
        Intent::Recommend,
        Intent::ChooseRestaurant,
        Intent::ConfirmRestaurant,
        Intent::NewOrder,
        Intent::StartOver,
        Intent::Help,
    ];
    all.into_iter().find(|i| i.as_str() == name)
}

/// Run the tiers against one utterance.
pub fn detect(
    session: &Session,
    catalog: &dyn Catalog,
    resolver: Option<&dyn IntentResolver>,
    input: &str,
) -> NluResult {
    let _span = debug_span!("nlu_detect", input).entered();
    let folded = normalize(input);

    // Tier 1: context short-circuits.
    match session.expected_context {
        Some(ExpectedContext::ConfirmOrder) => {
            if negative_re().is_match(&folded) {
                return result(Intent::CancelOrder, IntentSource::ContextLock, 1.0, Entities::default());
            }
            if positive_re().is_match(&folded) {
                return result(Intent::ConfirmOrder, IntentSource::ContextLock, 1.0, Entities::default());
            }
        }
        Some(ExpectedContext::SelectRestaurant)
        | Some(ExpectedContext::ShowMoreOptions)
        | Some(ExpectedContext::ChooseRestaurant) => {
            let entities = Entities {
                raw_text: Some(input.to_string()),
                ..Entities::default()
            };
            return result(Intent::SelectRestaurant, IntentSource::ContextLock, 1.0, entities);
        }
        _ => {}
    }

    // "do koszyka" wins over the generic order verbs it contains.
    if add_to_cart_re().is_match(&folded) {
        let line = parse_order_phrase(&folded.replace("do koszyka", " "));
        let entities = Entities {
            dish: (!line.name.is_empty()).then(|| line.name.clone()),
            quantity: Some(line.qty),
            ..Entities::default()
        };
        return result(Intent::ConfirmAddToCart, IntentSource::RegexV2, 0.95, entities);
    }

    // Tier 2: explicit order verbs.
    if order_verb_re().is_match(&folded) && !vague_want_re().is_match(&folded) {
        let parsed = parse_order_utterance(catalog, input);
        let restaurant = parsed.groups[0]
            .restaurant_id
            .as_deref()
            .and_then(|id| catalog.all_restaurants().into_iter().find(|r| r.id == id));
        let line = parsed.groups[0].items.first().cloned();
        let entities = Entities {
            restaurant,
            dish: line.as_ref().map(|l| l.name.clone()),
            quantity: line.as_ref().map(|l| l.qty),
            parsed_order: Some(parsed),
            ..Entities::default()
        };
        return result(Intent::CreateOrder, IntentSource::LexicalOverride, 0.95, entities);
    }

    // Tier 3: regex intents.
    if menu_re().is_match(&folded) {
        return result(Intent::MenuRequest, IntentSource::RegexV2, 0.9, Entities::default());
    }
    if more_options_re().is_match(&folded) {
        return result(Intent::ShowMoreOptions, IntentSource::RegexV2, 0.9, Entities::default());
    }
    if reset_re().is_match(&folded) {
        return result(Intent::NewOrder, IntentSource::RegexV2, 0.9, Entities::default());
    }
    if discovery_re().is_match(&folded) {
        let location = location_re()
            .captures(input)
            .map(|c| c[1].to_string());
        let cuisine = cuisine_after_szukam_re()
            .captures(&folded)
            .map(|c| c[1].to_string())
            .filter(|w| !CUISINE_STOPWORDS.contains(&w.as_str()))
            .or_else(|| {
                // Plural category words double as cuisine hints.
                ["pizzerie", "kebaby"]
                    .iter()
                    .find(|w| folded.contains(*w))
                    .map(|w| w.to_string())
            })
            .filter(|w| expand_cuisine(w).is_some());
        let entities = Entities {
            location,
            cuisine,
            ..Entities::default()
        };
        return result(Intent::FindNearby, IntentSource::RegexV2, 0.85, entities);
    }

    // Tier 4: catalog match.
    if let Some(restaurant) = catalog.find_by_text(input) {
        if mentions_dish(input) {
            let parsed = parse_order_utterance(catalog, input);
            let line = parsed.groups[0].items.first().cloned();
            let entities = Entities {
                restaurant: Some(restaurant),
                dish: line.as_ref().map(|l| l.name.clone()),
                quantity: line.as_ref().map(|l| l.qty),
                parsed_order: Some(parsed),
                ..Entities::default()
            };
            return result(Intent::CreateOrder, IntentSource::CatalogMatch, 0.8, entities);
        }
        let entities = Entities {
            restaurant: Some(restaurant),
            raw_text: Some(input.to_string()),
            ..Entities::default()
        };
        return result(Intent::SelectRestaurant, IntentSource::CatalogMatch, 0.8, entities);
    }

    // Tier 5: backup resolver, expert mode only.
    if settings().nlu.expert_mode {
        if let Some(resolver) = resolver {
            let allowed: Vec<&'static str> = [
                Intent::FindNearby,
                Intent::MenuRequest,
                Intent::CreateOrder,
                Intent::SelectRestaurant,
                Intent::ShowMoreOptions,
                Intent::CancelOrder,
                Intent::Help,
            ]
            .iter()
            .map(|i| i.as_str())
            .collect();
            if let Some(resolved) = resolver.resolve(input, &allowed) {
                if let Some(intent) = intent_from_wire(&resolved.intent) {
                    if icm::spec(intent).is_some() {
                        let confidence =
                            resolved.confidence.min(settings().nlu.llm_confidence_cap);
                        return result(intent, IntentSource::LlmHybrid, confidence, Entities::default());
                    }
                }
            }
        }
    }

    result(Intent::Unknown, IntentSource::Fallback, 0.0, Entities::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kelner_core::catalog::{MenuItem, Restaurant, StaticCatalog};

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(
            vec![Restaurant {
                id: "1".to_string(),
                name: "Bar Praha".to_string(),
                aliases: vec!["praha".to_string()],
                city: "Bytom".to_string(),
                cuisine: "Polska".to_string(),
                lat: 0.0,
                lng: 0.0,
                is_open: true,
                min_order_pln: 0.0,
            }],
            vec![MenuItem {
                id: "m1".to_string(),
                restaurant_id: "1".to_string(),
                name: "Kebab".to_string(),
                price: 22.0,
                category: "dania".to_string(),
                available: true,
                size: None,
                extras: vec![],
            }],
        )
    }

    fn session() -> Session {
        Session::new("sess_t".to_string())
    }

    #[test]
    fn test_confirm_context_positive_and_negative() {
        let c = catalog();
        let mut s = session();
        s.expected_context = Some(ExpectedContext::ConfirmOrder);

        let r = detect(&s, &c, None, "tak");
        assert_eq!(r.intent, Intent::ConfirmOrder);
        assert_eq!(r.source, IntentSource::ContextLock);

        let r = detect(&s, &c, None, "nie, dziękuję");
        assert_eq!(r.intent, Intent::CancelOrder);

        // "nie" not at the start is not a refusal
        let r = detect(&s, &c, None, "no dobra, czemu nie");
        assert_eq!(r.intent, Intent::ConfirmOrder);
    }

    #[test]
    fn test_selection_context_locks_any_input() {
        let c = catalog();
        let mut s = session();
        s.expected_context = Some(ExpectedContext::SelectRestaurant);

        let r = detect(&s, &c, None, "dwa");
        assert_eq!(r.intent, Intent::SelectRestaurant);
        assert_eq!(r.source, IntentSource::ContextLock);
        assert_eq!(r.entities.raw_text.as_deref(), Some("dwa"));
    }

    #[test]
    fn test_lexical_override() {
        let c = catalog();
        let s = session();
        let r = detect(&s, &c, None, "Poproszę dwa kebaby");
        assert_eq!(r.intent, Intent::CreateOrder);
        assert_eq!(r.source, IntentSource::LexicalOverride);
        assert_eq!(r.entities.quantity, Some(2));
        assert_eq!(r.entities.dish.as_deref(), Some("kebaby"));
    }

    #[test]
    fn test_vague_want_is_discovery() {
        let c = catalog();
        let s = session();
        let r = detect(&s, &c, None, "chcę coś zjeść, jestem głodny");
        assert_eq!(r.intent, Intent::FindNearby);
        assert_eq!(r.source, IntentSource::RegexV2);
    }

    #[test]
    fn test_discovery_extracts_location_and_cuisine() {
        let c = catalog();
        let s = session();
        let r = detect(&s, &c, None, "szukam azjatyckiej w Bytomiu");
        assert_eq!(r.intent, Intent::FindNearby);
        assert_eq!(r.entities.location.as_deref(), Some("Bytomiu"));
        assert_eq!(r.entities.cuisine.as_deref(), Some("azjatyckiej"));
    }

    #[test]
    fn test_bare_menu() {
        let c = catalog();
        let s = session();
        let r = detect(&s, &c, None, "pokaż menu");
        assert_eq!(r.intent, Intent::MenuRequest);
        assert_eq!(r.source, IntentSource::RegexV2);
        let r = detect(&s, &c, None, "menu");
        assert_eq!(r.intent, Intent::MenuRequest);
    }

    #[test]
    fn test_reset() {
        let c = catalog();
        let s = session();
        let r = detect(&s, &c, None, "nowe zamówienie");
        assert_eq!(r.intent, Intent::NewOrder);
    }

    #[test]
    fn test_catalog_match_select_vs_order() {
        let c = catalog();
        let s = session();

        let r = detect(&s, &c, None, "Bar Praha");
        assert_eq!(r.intent, Intent::SelectRestaurant);
        assert_eq!(r.source, IntentSource::CatalogMatch);
        assert_eq!(r.entities.restaurant.as_ref().unwrap().id, "1");

        let r = detect(&s, &c, None, "kebab z Bar Praha");
        assert_eq!(r.intent, Intent::CreateOrder);
        assert_eq!(r.source, IntentSource::CatalogMatch);
    }

    #[test]
    fn test_more_options() {
        let c = catalog();
        let s = session();
        let r = detect(&s, &c, None, "daj inne opcje");
        assert_eq!(r.intent, Intent::ShowMoreOptions);
        assert_eq!(r.source, IntentSource::RegexV2);
    }

    #[test]
    fn test_unknown_fallback() {
        let c = catalog();
        let s = session();
        let r = detect(&s, &c, None, "jaka jest pogoda");
        assert_eq!(r.intent, Intent::Unknown);
        assert_eq!(r.source, IntentSource::Fallback);
    }

    #[test]
    fn test_add_to_cart_wins_over_order_verb() {
        let c = catalog();
        let s = session();
        let r = detect(&s, &c, None, "dodaj kebab do koszyka");
        assert_eq!(r.intent, Intent::ConfirmAddToCart);
        assert_eq!(r.entities.dish.as_deref(), Some("kebab"));
    }
}
