//! Domain handlers: pure transformers from `(session, nlu, input)` to a
//! `DomainResult`. Handlers never write the session; the orchestrator
//! applies their `ContextUpdates` atomically.

mod cancel;
mod confirm;
mod find;
mod menu;
mod options;
mod order;
mod select;
mod system;

pub use find::distances as find_distances;
pub use order::execute_for as order_execute_for;

use kelner_core::catalog::Catalog;
use kelner_core::orders::OrderStore;

use crate::types::{DomainResult, Intent, NluResult, Session};

pub struct HandlerCtx<'a> {
    pub catalog: &'a dyn Catalog,
    pub orders: &'a dyn OrderStore,
    pub session: &'a Session,
    pub nlu: &'a NluResult,
    pub input: &'a str,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Route an intent to its handler; anything unrouted lands in the system
/// fallback.
pub fn dispatch(ctx: &HandlerCtx) -> DomainResult {
    match ctx.nlu.intent {
        Intent::FindNearby | Intent::Recommend => find::execute(ctx),
        Intent::MenuRequest => menu::execute(ctx),
        Intent::SelectRestaurant => select::execute(ctx),
        Intent::ShowMoreOptions => options::execute(ctx),
        Intent::CreateOrder => order::execute(ctx),
        Intent::ConfirmOrder => confirm::execute_confirm_order(ctx),
        Intent::ConfirmAddToCart => confirm::execute_confirm_add(ctx),
        Intent::CancelOrder => cancel::execute(ctx),
        Intent::ConfirmRestaurant => system::confirm_restaurant(ctx),
        Intent::NewOrder | Intent::StartOver => system::reset(ctx),
        Intent::Help => system::help(),
        _ => system::fallback(),
    }
}
