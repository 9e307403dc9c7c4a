//! Order creation: dish resolution, validation, pending-order assembly.

use tracing::warn;

use kelner_core::orders::{validate_item_before_add, CartLine, OrderError, OrderWarning};
use kelner_core::resolve::{parse_order_phrase, resolve_dish, DishResolution};
use kelner_core::surface::{format_pln, render, Facts, ItemFact, SurfaceKey};
use kelner_core::text::{parse_number_word_pl, parse_ordinal_pl, tokenize};

use crate::types::{
    ContextUpdates, DomainResult, ExpectedContext, ListedRestaurant, Patch, PendingOrder,
    RestaurantRef,
};

use super::HandlerCtx;

pub fn execute(ctx: &HandlerCtx) -> DomainResult {
    let entities = &ctx.nlu.entities;

    let parsed_line = entities
        .parsed_order
        .as_ref()
        .and_then(|p| p.groups.first())
        .and_then(|g| g.items.first())
        .cloned();

    let dish = entities
        .dish
        .clone()
        .or_else(|| parsed_line.as_ref().map(|l| l.name.clone()))
        .or_else(|| ctx.session.pending_dish.clone())
        .unwrap_or_else(|| parse_order_phrase(ctx.input).name);

    if dish.is_empty() {
        let mut result =
            DomainResult::with_reply("Co chcesz zamówić? Możesz też poprosić o menu.");
        result.context.expected_context = Patch::Set(ExpectedContext::ContinueOrder);
        return result;
    }

    let qty = entities
        .quantity
        .or(parsed_line.as_ref().map(|l| l.qty))
        .unwrap_or(1);

    // Deictic pick: "wezmę drugie" points at the menu list on screen.
    let dish_tokens = tokenize(&dish);
    if dish_tokens.len() == 1 {
        let position = parse_ordinal_pl(&dish_tokens[0])
            .or_else(|| parse_number_word_pl(&dish_tokens[0]).map(|n| n as usize));
        if let Some(item) = position.and_then(|p| ctx.session.entity_cache.item_at(p)) {
            let (restaurant_id, name) = (item.restaurant_id.clone(), item.name.clone());
            return execute_for(ctx, Some(&restaurant_id), &name, qty);
        }
    }

    // Explicitly named restaurant wins over the session context.
    let hint = entities
        .restaurant
        .as_ref()
        .map(|r| r.id.clone())
        .or_else(|| ctx.session.current_restaurant.as_ref().map(|r| r.id.clone()))
        .or_else(|| ctx.session.locked_restaurant_id.clone());

    execute_for(ctx, hint.as_deref(), &dish, qty)
}

/// Resolve and stage one dish. `restaurant_hint` narrows ambiguity; the
/// pipeline also calls this directly when a selection carried a pending
/// dish.
pub fn execute_for(
    ctx: &HandlerCtx,
    restaurant_hint: Option<&str>,
    dish: &str,
    qty: u32,
) -> DomainResult {
    let resolution = match resolve_dish(ctx.catalog, dish, restaurant_hint) {
        Ok(r) => r,
        Err(e) => {
            warn!("dish resolution failed: {e}");
            let mut result = DomainResult::with_reply(
                "Przepraszam, nie mogę teraz sprawdzić menu. Spróbuj za chwilę.",
            );
            result.surface = Some((SurfaceKey::Error, Facts::default()));
            return result;
        }
    };

    match resolution {
        DishResolution::NotFound => item_not_found(ctx, dish),
        DishResolution::Clarify { restaurant, items } => {
            let facts = Facts {
                restaurant_name: Some(restaurant.name.clone()),
                items: items
                    .iter()
                    .map(|i| ItemFact {
                        name: i.name.clone(),
                        price: i.price,
                        size: i.size.clone(),
                        qty: 1,
                    })
                    .collect(),
                ..Facts::default()
            };
            let rendered = render(SurfaceKey::ClarifyItems, &facts);
            let mut result = DomainResult::with_reply(rendered.reply);
            result.flags.needs_clarification = true;
            result.menu_items = items;
            result.context.expected_context = Patch::Set(ExpectedContext::ContinueOrder);
            result.surface = Some((SurfaceKey::ClarifyItems, facts));
            result
        }
        DishResolution::Ambiguous { groups } => {
            let list: Vec<ListedRestaurant> = groups
                .iter()
                .enumerate()
                .map(|(i, g)| ListedRestaurant {
                    index: i + 1,
                    id: g.restaurant.id.clone(),
                    name: g.restaurant.name.clone(),
                    city: g.restaurant.city.clone(),
                })
                .collect();
            let facts = Facts {
                dish: Some(dish.to_string()),
                restaurants: list.iter().map(|r| r.name.clone()).collect(),
                ..Facts::default()
            };
            let rendered = render(SurfaceKey::AskRestaurantForOrder, &facts);
            let mut result = DomainResult::with_reply(rendered.reply);
            result.intent_override = Some(crate::types::Intent::ChooseRestaurant);
            result.restaurants = groups.into_iter().map(|g| g.restaurant).collect();
            result.context = ContextUpdates {
                last_restaurants_list: Some(list),
                pending_dish: Patch::Set(dish.to_string()),
                expected_context: Patch::Set(ExpectedContext::ChooseRestaurant),
                ..ContextUpdates::default()
            };
            result.surface = Some((SurfaceKey::AskRestaurantForOrder, facts));
            result
        }
        DishResolution::Single { restaurant, item } => {
            let line = CartLine {
                menu_item_id: item.id.clone(),
                restaurant_id: item.restaurant_id.clone(),
                name: item.name.clone(),
                price: item.price,
                qty,
            };
            let (line, warnings) = match validate_item_before_add(ctx.catalog, line) {
                Ok(v) => v,
                Err(OrderError::QuantityTooHigh { qty, max }) => {
                    return DomainResult::with_reply(format!(
                        "{qty} sztuk to za dużo – mogę przyjąć najwyżej {max}."
                    ));
                }
                Err(OrderError::ItemNotAvailable(name)) => {
                    return DomainResult::with_reply(format!(
                        "{name} jest teraz niedostępne. Wybierz coś innego z menu."
                    ));
                }
                Err(e) => {
                    warn!("item validation failed: {e}");
                    return DomainResult::with_reply(
                        "Nie udało się dodać pozycji. Spróbuj jeszcze raz.",
                    );
                }
            };

            let mut notices: Vec<String> = warnings
                .iter()
                .map(|w| match w {
                    OrderWarning::ItemPriceIncreased { name, to, .. } => {
                        format!("Uwaga: cena {name} wzrosła do {}.", format_pln(*to))
                    }
                    OrderWarning::DifferentRestaurantSuggestion { restaurant_name } => {
                        format!("Znalazłam to w {restaurant_name}.")
                    }
                })
                .collect();

            // Auto-switch: the matched item lives in another restaurant
            // than the one in context.
            let switched = ctx
                .session
                .current_restaurant
                .as_ref()
                .is_some_and(|c| c.id != restaurant.id);
            if switched {
                notices.push(format!(
                    "Uwaga: {} znalazłam w {}, przełączam restaurację.",
                    item.name, restaurant.name
                ));
            }

            let pending = build_pending_order(
                ctx.session.pending_order.as_ref(),
                &restaurant.id,
                &restaurant.name,
                line,
            );

            let facts = Facts {
                restaurant_name: Some(restaurant.name.clone()),
                items: pending
                    .items
                    .iter()
                    .map(|l| ItemFact {
                        name: l.name.clone(),
                        price: l.price,
                        size: None,
                        qty: l.qty,
                    })
                    .collect(),
                total: Some(pending.total),
                ..Facts::default()
            };
            let rendered = render(SurfaceKey::ConfirmAdd, &facts);
            let reply = if notices.is_empty() {
                rendered.reply
            } else {
                format!("{} {}", notices.join(" "), rendered.reply)
            };

            let restaurant_ref = RestaurantRef::from(&restaurant);
            let mut result = DomainResult::with_reply(reply);
            result.context = ContextUpdates {
                pending_order: Patch::Set(pending),
                expected_context: Patch::Set(ExpectedContext::ConfirmOrder),
                current_restaurant: Patch::Set(restaurant_ref.clone()),
                last_restaurant: Patch::Set(restaurant_ref),
                pending_dish: Patch::Clear,
                ..ContextUpdates::default()
            };
            result.surface = Some((SurfaceKey::ConfirmAdd, facts));
            result
        }
    }
}

fn item_not_found(ctx: &HandlerCtx, dish: &str) -> DomainResult {
    let facts = Facts {
        unknown_item: Some(dish.to_string()),
        restaurant_name: ctx
            .session
            .current_restaurant
            .as_ref()
            .map(|r| r.name.clone()),
        ..Facts::default()
    };
    let rendered = render(SurfaceKey::ItemNotFound, &facts);
    let mut result = DomainResult::with_reply(rendered.reply);
    result.flags.unknown_items = vec![dish.to_string()];
    result.surface = Some((SurfaceKey::ItemNotFound, facts));
    result
}

/// Merge a validated line into the pending order. Same restaurant merges
/// (same item bumps quantity); a different restaurant starts over.
pub fn build_pending_order(
    existing: Option<&PendingOrder>,
    restaurant_id: &str,
    restaurant_name: &str,
    line: CartLine,
) -> PendingOrder {
    let mut pending = match existing {
        Some(p) if p.restaurant_id == restaurant_id => p.clone(),
        _ => PendingOrder {
            restaurant_id: restaurant_id.to_string(),
            restaurant_name: restaurant_name.to_string(),
            items: Vec::new(),
            total: 0.0,
        },
    };
    match pending
        .items
        .iter_mut()
        .find(|l| l.menu_item_id == line.menu_item_id)
    {
        Some(slot) => slot.qty += line.qty,
        None => pending.items.push(line),
    }
    pending.recompute_total();
    pending
}
