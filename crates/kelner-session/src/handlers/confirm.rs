//! Order confirmation (the only cart-mutating path) and the add-to-cart
//! close that hands the conversation over to the UI cart.

use tracing::warn;

use kelner_core::orders::{
    persist_order, validate_cart_before_checkout, CartLine, OrderError, PersistRequest,
};
use kelner_core::resolve::{resolve_dish, DishResolution};
use kelner_core::surface::format_pln;

use crate::types::{
    Action, CloseReason, ContextUpdates, DomainResult, ExpectedContext, Patch, RestaurantRef,
};

use super::HandlerCtx;

/// Commit the pending order: validate, persist idempotently, move items to
/// the cart and close the conversation.
pub fn execute_confirm_order(ctx: &HandlerCtx) -> DomainResult {
    let Some(pending) = ctx.session.pending_order.clone() else {
        return DomainResult::with_reply("Nie mam zamówienia do potwierdzenia.");
    };

    if let Err(e) =
        validate_cart_before_checkout(ctx.catalog, &pending.restaurant_id, &pending.items)
    {
        return checkout_blocked(&pending.restaurant_name, pending.total, e);
    }

    // Persistence failure degrades to a logged warning: the conversational
    // close still happens and the idempotency key preserves intent.
    let (order_id, skipped) = match persist_order(
        ctx.orders,
        PersistRequest {
            user_id: None,
            restaurant_id: pending.restaurant_id.clone(),
            restaurant_name: pending.restaurant_name.clone(),
            session_id: ctx.session.id.clone(),
            items: pending.items.clone(),
        },
    ) {
        Ok(outcome) => (Some(outcome.order_id), outcome.skipped),
        Err(e) => {
            warn!("order persistence failed: {e}");
            (None, false)
        }
    };

    let mut result = DomainResult::with_reply(match &order_id {
        Some(id) => format!(
            "Zamówienie przyjęte! Numer: {id}. Razem {}. Dziękuję!",
            format_pln(pending.total)
        ),
        None => format!(
            "Zamówienie przyjęte! Razem {}. Dziękuję!",
            format_pln(pending.total)
        ),
    });
    result.actions = vec![Action::ShowCart];
    result.meta.added_to_cart = true;
    result.meta.order_id = order_id;
    result.meta.order_skipped = skipped;
    result.conversation_closed = true;
    result.context = ContextUpdates {
        cart_append: pending.items.clone(),
        pending_order: Patch::Clear,
        expected_context: Patch::Clear,
        close: Some(CloseReason::OrderConfirmed),
        ..ContextUpdates::default()
    };
    result
}

fn checkout_blocked(restaurant_name: &str, total: f64, e: OrderError) -> DomainResult {
    match e {
        OrderError::MinOrderNotMet { total, min } => {
            let mut result = DomainResult::with_reply(format!(
                "Minimalna wartość zamówienia w {restaurant_name} to {}, a masz {}. Dodasz coś jeszcze?",
                format_pln(min),
                format_pln(total)
            ));
            // Keep the pending order so the user can extend it.
            result.context.expected_context = Patch::Set(ExpectedContext::ConfirmOrder);
            result
        }
        OrderError::RestaurantClosed(name) => {
            let mut result = DomainResult::with_reply(format!(
                "{name} jest teraz zamknięta. Zamówienie anulowane – poszukać czegoś innego?"
            ));
            result.context.pending_order = Patch::Clear;
            result.context.expected_context = Patch::Clear;
            result
        }
        OrderError::MixedRestaurants => {
            let mut result = DomainResult::with_reply(
                "Coś się pomieszało – pozycje pochodzą z różnych restauracji. Zacznijmy zamówienie od nowa.",
            );
            result.context.pending_order = Patch::Clear;
            result.context.expected_context = Patch::Clear;
            result
        }
        other => {
            warn!("checkout validation failed: {other}");
            let mut result = DomainResult::with_reply(format!(
                "Nie mogę potwierdzić zamówienia za {}. Spróbuj za chwilę.",
                format_pln(total)
            ));
            result.context.expected_context = Patch::Set(ExpectedContext::ConfirmOrder);
            result
        }
    }
}

/// Validate `{dish, restaurant}` and close the conversation with the item
/// handed to the UI cart. Does not touch the session cart.
pub fn execute_confirm_add(ctx: &HandlerCtx) -> DomainResult {
    let dish = ctx
        .nlu
        .entities
        .dish
        .clone()
        .or_else(|| ctx.session.pending_dish.clone());
    let Some(dish) = dish else {
        return DomainResult::with_reply("Co mam dodać do koszyka?");
    };

    let hint = ctx
        .session
        .current_restaurant
        .as_ref()
        .map(|r| r.id.clone());
    let resolution = match resolve_dish(ctx.catalog, &dish, hint.as_deref()) {
        Ok(r) => r,
        Err(e) => {
            warn!("add-to-cart resolution failed: {e}");
            return DomainResult::with_reply(
                "Nie mogę teraz sprawdzić tej pozycji. Spróbuj za chwilę.",
            );
        }
    };

    let (restaurant, item) = match resolution {
        DishResolution::Single { restaurant, item } => (restaurant, item),
        DishResolution::Clarify { restaurant, items } => {
            let first = items.into_iter().next();
            match first {
                Some(item) => (restaurant, item),
                None => return DomainResult::with_reply("Nie znalazłam tej pozycji w menu."),
            }
        }
        _ => {
            return DomainResult::with_reply(format!(
                "Nie wiem skąd dodać \"{dish}\" – najpierw wybierz restaurację."
            ));
        }
    };

    let qty = ctx.nlu.entities.quantity.unwrap_or(1);
    let restaurant_ref = RestaurantRef::from(&restaurant);
    let mut result = DomainResult::with_reply(format!(
        "Dodałam {} z {} do koszyka. Smacznego!",
        item.name, restaurant.name
    ));
    result.actions = vec![Action::AddToCart {
        restaurant: restaurant_ref,
        item: CartLine {
            menu_item_id: item.id.clone(),
            restaurant_id: item.restaurant_id.clone(),
            name: item.name.clone(),
            price: item.price,
            qty,
        },
    }];
    result.conversation_closed = true;
    result.context = ContextUpdates {
        pending_dish: Patch::Clear,
        expected_context: Patch::Clear,
        close: Some(CloseReason::CartItemAdded),
        ..ContextUpdates::default()
    };
    result
}
