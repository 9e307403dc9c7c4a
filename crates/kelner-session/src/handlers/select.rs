//! Restaurant selection from the last surfaced list.

use kelner_core::surface::{render, Facts, SurfaceKey};
use kelner_core::text::{fuzzy_includes, parse_number_word_pl, parse_ordinal_pl, tokenize};

use crate::types::{
    Action, ContextUpdates, DomainResult, ExpectedContext, ListedRestaurant, OrderedDish, Patch,
    RestaurantRef,
};

use super::HandlerCtx;

pub fn execute(ctx: &HandlerCtx) -> DomainResult {
    let list = &ctx.session.last_restaurants_list;
    let raw = ctx
        .nlu
        .entities
        .raw_text
        .as_deref()
        .unwrap_or(ctx.input);

    let Some(chosen) = resolve_selection(ctx, list, raw) else {
        let facts = Facts {
            city: ctx.session.last_location.clone(),
            restaurants: list.iter().map(|r| r.name.clone()).collect(),
            ..Facts::default()
        };
        let rendered = render(SurfaceKey::ChooseRestaurant, &facts);
        let mut result = DomainResult::with_reply(format!(
            "Nie wiem, którą wybrać. {}",
            rendered.reply
        ));
        result.context.expected_context = Patch::Set(ExpectedContext::SelectRestaurant);
        result.surface = Some((SurfaceKey::ChooseRestaurant, facts));
        return result;
    };

    let restaurant_ref = RestaurantRef {
        id: chosen.id.clone(),
        name: chosen.name.clone(),
        city: chosen.city.clone(),
    };

    let mut context = ContextUpdates {
        current_restaurant: Patch::Set(restaurant_ref.clone()),
        last_restaurant: Patch::Set(restaurant_ref.clone()),
        locked_restaurant_id: Patch::Set(chosen.id.clone()),
        pending_dish: Patch::Clear,
        dialog_focus: Patch::Clear,
        ..ContextUpdates::default()
    };

    // A dish remembered across the selection sub-dialog turns straight
    // into an order for the chosen place.
    if let Some(dish) = ctx.session.pending_dish.clone() {
        context.expected_context = Patch::Set(ExpectedContext::ConfirmOrder);
        let mut result = DomainResult::with_reply(String::new());
        result.actions = vec![Action::CreateOrder {
            restaurant: restaurant_ref,
            items: vec![OrderedDish {
                name: dish,
                quantity: ctx.nlu.entities.quantity.unwrap_or(1),
            }],
        }];
        result.context = context;
        return result;
    }

    context.expected_context = Patch::Set(ExpectedContext::ConfirmMenu);
    let mut result = DomainResult::with_reply(format!(
        "Wybrałaś {}. Pokazać menu?",
        chosen.name
    ));
    result.context = context;
    result
}

/// Resolve a selection utterance to one list entry: (a) 1-based number,
/// (b) Polish ordinal or number word, (c) fuzzy name match, (d) the
/// restaurant entity NLU already bound.
fn resolve_selection(
    ctx: &HandlerCtx,
    list: &[ListedRestaurant],
    raw: &str,
) -> Option<ListedRestaurant> {
    if list.is_empty() {
        return None;
    }

    for token in tokenize(raw) {
        let position = token
            .parse::<usize>()
            .ok()
            .or_else(|| parse_ordinal_pl(&token))
            .or_else(|| parse_number_word_pl(&token).map(|n| n as usize));
        if let Some(n) = position {
            if (1..=list.len()).contains(&n) {
                return Some(list[n - 1].clone());
            }
            return None;
        }
    }

    if let Some(hit) = list.iter().find(|r| fuzzy_includes(raw, &r.name)) {
        return Some(hit.clone());
    }
    if let Some(hit) = list
        .iter()
        .find(|r| fuzzy_includes(&r.name, raw))
    {
        return Some(hit.clone());
    }

    let bound = ctx.nlu.entities.restaurant.as_ref()?;
    list.iter().find(|r| r.id == bound.id).cloned()
}
