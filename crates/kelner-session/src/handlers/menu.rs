//! Menu preview for the selected restaurant.

use tracing::warn;

use kelner_core::catalog::MenuItem;
use kelner_core::settings::settings;
use kelner_core::surface::format_pln;
use kelner_core::text::normalize;

use crate::types::{
    ContextUpdates, DomainResult, ExpectedContext, MenuSnapshot, Patch,
};

use super::HandlerCtx;

/// Categories never shown in a spoken menu preview.
const BANNED_CATEGORIES: &[&str] = &["napoje", "sosy", "dodatki", "extra"];
const BANNED_NAME_TOKENS: &[&str] = &["sos", "napoj", "dodatek", "opakowanie", "sztucce"];

pub fn execute(ctx: &HandlerCtx) -> DomainResult {
    let Some(restaurant) = ctx.session.current_restaurant.clone() else {
        // The ICM gate and its soft bridge run first; this is a plain miss.
        return DomainResult::with_reply(
            "Najpierw wybierz restaurację, wtedy pokażę menu.".to_string(),
        );
    };

    // Anti-loop: a repeated generic menu request re-serves the cached
    // shortlist instead of hitting the repository again.
    if let Some(cached) = ctx.session.last_menu.as_ref() {
        if cached.restaurant_id == restaurant.id && is_generic_request(ctx.input) {
            return reply_with_items(&restaurant.name, cached.items.clone(), None);
        }
    }

    let items = match ctx.catalog.get_menu(&restaurant.id, true) {
        Ok(items) => items,
        Err(e) => {
            warn!("menu fetch failed for {}: {e}", restaurant.id);
            return DomainResult::with_reply(format!(
                "Nie mogę teraz pobrać menu {}. Spróbuj za chwilę.",
                restaurant.name
            ));
        }
    };

    let shortlist: Vec<MenuItem> = items
        .into_iter()
        .filter(|i| !BANNED_CATEGORIES.contains(&normalize(&i.category).as_str()))
        .filter(|i| {
            let name = normalize(&i.name);
            !BANNED_NAME_TOKENS
                .iter()
                .any(|t| name.split_whitespace().any(|w| w == *t))
        })
        .take(settings().limits.menu_preview)
        .collect();

    if shortlist.is_empty() {
        return DomainResult::with_reply(format!(
            "Menu {} jest teraz puste. Może wybierzesz inną restaurację?",
            restaurant.name
        ));
    }

    let snapshot = MenuSnapshot {
        restaurant_id: restaurant.id.clone(),
        items: shortlist.clone(),
    };
    reply_with_items(&restaurant.name, shortlist, Some(snapshot))
}

fn is_generic_request(input: &str) -> bool {
    !kelner_core::cuisine::mentions_dish(input)
}

fn reply_with_items(
    restaurant_name: &str,
    items: Vec<MenuItem>,
    snapshot: Option<MenuSnapshot>,
) -> DomainResult {
    let listed = items
        .iter()
        .map(|i| format!("{} ({})", i.name, format_pln(i.price)))
        .collect::<Vec<_>>()
        .join(", ");
    let mut result = DomainResult::with_reply(format!(
        "Oto menu {restaurant_name}: {listed}. Co zamawiasz?"
    ));
    result.menu_items = items;
    result.context = ContextUpdates {
        expected_context: Patch::Set(ExpectedContext::MenuOrOrder),
        last_menu: match snapshot {
            Some(s) => Patch::Set(s),
            None => Patch::Keep,
        },
        ..ContextUpdates::default()
    };
    result
}
