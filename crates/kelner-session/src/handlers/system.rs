//! System-domain handlers: reset, help, fuzzy-selection confirmation and
//! the fallback for unrouted intents.

use crate::types::{DomainResult, ExpectedContext, Patch};

use super::HandlerCtx;

/// `new_order` / `start_over`: wipe the conversational context, keep the
/// session identity and cart.
pub fn reset(_ctx: &HandlerCtx) -> DomainResult {
    let mut result =
        DomainResult::with_reply("Zaczynamy od nowa! W jakim mieście szukamy jedzenia?");
    result.context = crate::types::ContextUpdates {
        expected_context: Patch::Clear,
        awaiting: Patch::Clear,
        current_restaurant: Patch::Clear,
        last_restaurant: Patch::Clear,
        locked_restaurant_id: Patch::Clear,
        last_restaurants_list: Some(Vec::new()),
        last_menu: Patch::Clear,
        pending_dish: Patch::Clear,
        pending_order: Patch::Clear,
        dialog_focus: Patch::Clear,
        ..crate::types::ContextUpdates::default()
    };
    result
}

pub fn help() -> DomainResult {
    DomainResult::with_reply(
        "Mogę znaleźć restauracje (\"szukam pizzy w Bytomiu\"), pokazać menu, \
         przyjąć zamówienie (\"zamawiam dwa kebaby\") i je potwierdzić. \
         Powiedz \"stop\", żebym ucichła.",
    )
}

pub fn fallback() -> DomainResult {
    DomainResult::with_reply(
        "Nie do końca rozumiem. Powiedz np. \"szukam pizzy w Bytomiu\" albo \"pokaż menu\".",
    )
}

/// The user confirmed they meant the restaurant already in context.
pub fn confirm_restaurant(ctx: &HandlerCtx) -> DomainResult {
    match ctx.session.current_restaurant.as_ref() {
        Some(r) => {
            let mut result = DomainResult::with_reply(format!(
                "Świetnie, zostajemy w {}. Pokazać menu?",
                r.name
            ));
            result.context.expected_context = Patch::Set(ExpectedContext::ConfirmMenu);
            result
        }
        None => fallback(),
    }
}
