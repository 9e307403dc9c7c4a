//! Restaurant discovery: `find_nearby` and `recommend`.

use tracing::warn;

use kelner_core::catalog::{haversine_m, Restaurant};
use kelner_core::cuisine::expand_cuisine;
use kelner_core::settings::settings;
use kelner_core::surface::{render, Facts, SurfaceKey};

use crate::types::{
    Awaiting, ContextUpdates, DomainResult, ExpectedContext, ListedRestaurant, Patch,
    RestaurantRef,
};

use super::HandlerCtx;

pub fn execute(ctx: &HandlerCtx) -> DomainResult {
    let entities = &ctx.nlu.entities;
    // A stale cuisine from a previous search is remembered but never
    // silently re-applied as a filter.
    let cuisine_word = entities.cuisine.clone();
    let cuisine_filter = cuisine_word.as_deref().and_then(expand_cuisine);

    let location = entities
        .location
        .clone()
        .or_else(|| ctx.session.last_location.clone())
        .or_else(|| nearest_city(ctx));

    let Some(city) = location else {
        return ask_location(entities.dish.clone().or_else(|| ctx.session.pending_dish.clone()));
    };

    let found = match ctx.catalog.search_restaurants(&city, cuisine_filter.as_ref()) {
        Ok(found) => found,
        Err(e) => {
            warn!("restaurant search failed: {e}");
            let mut result =
                DomainResult::with_reply("Przepraszam, nie mogę teraz przeszukać restauracji. Spróbuj za chwilę.");
            result.surface = Some((SurfaceKey::Error, Facts::default()));
            return result;
        }
    };

    if found.is_empty() {
        return no_results(ctx, &city);
    }

    let limit = if cuisine_filter.is_some() {
        settings().limits.cuisine_results
    } else {
        settings().limits.generic_results
    };
    let shown: Vec<Restaurant> = found.into_iter().take(limit).collect();

    let mut context = ContextUpdates {
        last_location: Patch::Set(city.clone()),
        last_restaurants_list: Some(listed(&shown)),
        awaiting: Patch::Clear,
        ..ContextUpdates::default()
    };
    if let Some(word) = cuisine_word {
        context.last_cuisine = Patch::Set(word);
    }

    if shown.len() == 1 {
        let only = &shown[0];
        context.current_restaurant = Patch::Set(RestaurantRef::from(only));
        context.last_restaurant = Patch::Set(RestaurantRef::from(only));
        context.expected_context = Patch::Set(ExpectedContext::ConfirmMenu);
        let mut result = DomainResult::with_reply(format!(
            "Znalazłam jedno miejsce: {} w {}. Pokazać menu?",
            only.name, only.city
        ));
        result.restaurants = shown;
        result.context = context;
        return result;
    }

    context.expected_context = Patch::Set(ExpectedContext::SelectRestaurant);
    let facts = Facts {
        city: Some(city),
        restaurants: shown.iter().map(|r| r.name.clone()).collect(),
        ..Facts::default()
    };
    let rendered = render(SurfaceKey::ChooseRestaurant, &facts);
    let mut result = DomainResult::with_reply(rendered.reply);
    result.restaurants = shown;
    result.context = context;
    result.surface = Some((SurfaceKey::ChooseRestaurant, facts));
    result
}

fn ask_location(dish: Option<String>) -> DomainResult {
    let facts = Facts {
        dish,
        ..Facts::default()
    };
    let rendered = render(SurfaceKey::AskLocation, &facts);
    let mut result = DomainResult::with_reply(rendered.reply);
    result.flags.needs_location = true;
    result.context = ContextUpdates {
        awaiting: Patch::Set(Awaiting::Location),
        expected_context: Patch::Set(ExpectedContext::FindNearbyAskLocation),
        pending_dish: match facts.dish.clone() {
            Some(d) => Patch::Set(d),
            None => Patch::Keep,
        },
        ..ContextUpdates::default()
    };
    result.surface = Some((SurfaceKey::AskLocation, facts));
    result
}

/// A named location with no hits: offer the cities the catalog does cover.
fn no_results(ctx: &HandlerCtx, city: &str) -> DomainResult {
    let mut cities: Vec<String> = Vec::new();
    for r in ctx.catalog.all_restaurants() {
        if kelner_core::text::normalize(&r.city) != kelner_core::text::normalize(city)
            && !cities.contains(&r.city)
        {
            cities.push(r.city.clone());
        }
    }
    let reply = if cities.is_empty() {
        format!("W {city} niczego nie znalazłam. Spróbuj innego miasta.")
    } else {
        format!(
            "W {city} niczego nie znalazłam. Mam za to miejsca w: {}.",
            cities.join(", ")
        )
    };
    let mut result = DomainResult::with_reply(reply);
    result.context = ContextUpdates {
        awaiting: Patch::Set(Awaiting::Location),
        expected_context: Patch::Set(ExpectedContext::FindNearbyAskLocation),
        ..ContextUpdates::default()
    };
    result
}

/// Pick the catalog city nearest to the caller's coordinates.
fn nearest_city(ctx: &HandlerCtx) -> Option<String> {
    let (lat, lng) = (ctx.lat?, ctx.lng?);
    ctx.catalog
        .all_restaurants()
        .into_iter()
        .map(|r| (haversine_m(lat, lng, r.lat, r.lng), r.city))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, city)| city)
}

fn listed(restaurants: &[Restaurant]) -> Vec<ListedRestaurant> {
    restaurants
        .iter()
        .enumerate()
        .map(|(i, r)| ListedRestaurant {
            index: i + 1,
            id: r.id.clone(),
            name: r.name.clone(),
            city: r.city.clone(),
        })
        .collect()
}

/// Distances for the response payload when coordinates were provided.
pub fn distances(ctx: &HandlerCtx, restaurants: &[Restaurant]) -> Vec<Option<f64>> {
    match (ctx.lat, ctx.lng) {
        (Some(lat), Some(lng)) => restaurants
            .iter()
            .map(|r| Some(haversine_m(lat, lng, r.lat, r.lng).round()))
            .collect(),
        _ => vec![None; restaurants.len()],
    }
}
