//! Order cancellation.

use crate::types::{DomainResult, Patch};

use super::HandlerCtx;

pub fn execute(ctx: &HandlerCtx) -> DomainResult {
    let had_pending = ctx.session.pending_order.is_some();
    let mut result = DomainResult::with_reply(if had_pending {
        "Anulowałam zamówienie. W czym jeszcze mogę pomóc?".to_string()
    } else {
        "Nie ma czego anulować. Szukamy czegoś do jedzenia?".to_string()
    });
    result.context.pending_order = Patch::Clear;
    result.context.expected_context = Patch::Clear;
    result
}
