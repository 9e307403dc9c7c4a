//! `show_more_options`: re-surface the full persisted restaurant list.

use kelner_core::surface::{render, Facts, SurfaceKey};

use crate::types::{DomainResult, ExpectedContext, Patch};

use super::HandlerCtx;

pub fn execute(ctx: &HandlerCtx) -> DomainResult {
    let list = &ctx.session.last_restaurants_list;
    if list.is_empty() {
        return DomainResult::with_reply(
            "Nie mam teraz żadnej listy. Powiedz, gdzie szukać restauracji.",
        );
    }

    let facts = Facts {
        city: ctx.session.last_location.clone(),
        restaurants: list.iter().map(|r| r.name.clone()).collect(),
        ..Facts::default()
    };
    let rendered = render(SurfaceKey::ChooseRestaurant, &facts);

    let ids: Vec<&str> = list.iter().map(|r| r.id.as_str()).collect();
    let restaurants = ctx
        .catalog
        .all_restaurants()
        .into_iter()
        .filter(|r| ids.contains(&r.id.as_str()))
        .collect();

    let mut result = DomainResult::with_reply(rendered.reply);
    result.restaurants = restaurants;
    result.context.expected_context = Patch::Set(ExpectedContext::SelectRestaurant);
    result.surface = Some((SurfaceKey::ChooseRestaurant, facts));
    result
}
