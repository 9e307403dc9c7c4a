//! Per-turn orchestration: session resolution, navigation guard, NLU, the
//! ICM gate with soft bridges, UX guards, dispatch, surface detection,
//! atomic context merge and optional TTS.
//!
//! Steps are strictly sequential and each may short-circuit. The session
//! lock is held from resolution through the context merge; TTS work runs
//! after release so a new utterance can barge in.

use std::sync::atomic::Ordering;
use std::time::Instant;

use base64::Engine as _;
use tracing::{debug, debug_span, warn};

use kelner_core::settings::settings;
use kelner_core::surface::{render, Facts, SurfaceKey};
use kelner_core::text::normalize;
use kelner_core::tts::{list_intro, polish_for_speech};

use crate::handlers::{self, HandlerCtx};
use crate::icm;
use crate::nav_guard;
use crate::nlu;
use crate::session_store::now_ms;
use crate::types::{
    Awaiting, ContextUpdates, DialogStackEntry, DomainResult, Entities, EntitySnapshot,
    ExpectedContext, Intent, IntentSource, NluResult, Patch, RestaurantRef, ResponseMeta, Session,
    Speaker, TurnRecord, TurnRequest, TurnResponse,
};
use crate::{DialogEngine, FallbackMode};

pub(crate) fn run(engine: &DialogEngine, req: TurnRequest) -> TurnResponse {
    let started = Instant::now();
    let input = req.input.trim().to_string();

    // Step 1: reject empty input without touching any session.
    if input.is_empty() {
        return TurnResponse::soft_error(
            req.session_id.as_deref().unwrap_or(""),
            "brak_tekstu",
            "Nie usłyszałam żadnego tekstu. Powiedz, czego szukasz.",
        );
    }

    // Step 2: resolve the session, rotating away from closed ids.
    let resolution = engine.store().get_or_create_active(req.session_id.as_deref());
    let session_id = resolution.session_id.clone();
    let _span = debug_span!("turn", session = %session_id).entered();

    let mut session = match resolution.session.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    session.stop_tts = false;

    let admin = engine.admin();

    // Step 3: dialog navigation guard. STOP always wins; the rest obey the
    // admin toggles.
    if let Some(action) = nav_guard::detect(&input) {
        let honored = action == nav_guard::NavAction::Stop
            || (admin.dialog_navigation_enabled && admin.fallback_mode == FallbackMode::Smart);
        if honored {
            let nav = nav_guard::apply(&mut session, action);
            record_turns(&mut session, &input, &nav.reply, &Entities::default());
            return TurnResponse {
                ok: true,
                session_id: session_id.clone(),
                intent: nav.intent.as_str().to_string(),
                reply: nav.reply,
                error: None,
                tts_text: None,
                audio_content: None,
                restaurants: Vec::new(),
                menu_items: Vec::new(),
                actions: Vec::new(),
                conversation_closed: false,
                new_session_id: rotation_notice(&resolution.rotated_from, &session_id),
                stop_tts: nav.stop_tts,
                meta: ResponseMeta {
                    source: IntentSource::RuleGuard.as_str().to_string(),
                    latency_total_ms: started.elapsed().as_millis() as u64,
                    styling_ms: 0,
                    tts_ms: 0,
                },
            };
        }
    }

    // Step 4: NLU.
    let mut nlu_result = nlu::detect(&session, engine.catalog(), engine.resolver(), &input);

    // Location follow-up: when the session is waiting for a city, a bare
    // answer is the city.
    if session.awaiting == Some(Awaiting::Location) && nlu_result.intent == Intent::Unknown {
        nlu_result.intent = Intent::FindNearby;
        nlu_result.source = IntentSource::RuleGuard;
        nlu_result.entities.location = Some(input.clone());
    }

    // Legacy hard block: an intent from the legacy classifier that the ICM
    // lists as blocked is demoted to its fallback.
    if nlu_result.source == IntentSource::ClassicLegacy {
        if let Some(spec) = icm::spec(nlu_result.intent) {
            if spec.hard_block_legacy {
                nlu_result.intent = spec.fallback.unwrap_or(Intent::FindNearby);
                nlu_result.source = IntentSource::LegacyHardBlocked;
            }
        }
    }

    // Step 5: ICM gate with soft-dialog bridges.
    if !icm::check_required_state(nlu_result.intent, &session, &nlu_result.entities) {
        if let Some(bridged) = soft_bridge(&session, &nlu_result) {
            record_turns(&mut session, &input, &bridged.reply, &nlu_result.entities);
            return finish(
                engine, &req, started, session, session_id, &resolution.rotated_from, nlu_result,
                bridged,
            );
        }
        match icm::spec(nlu_result.intent).and_then(|s| s.fallback) {
            Some(fallback) => {
                debug!(from = nlu_result.intent.as_str(), to = fallback.as_str(), "icm_fallback");
                nlu_result.intent = fallback;
                nlu_result.source = IntentSource::IcmFallback;
            }
            None => {
                let reply = gate_miss_reply(nlu_result.intent);
                record_turns(&mut session, &input, &reply, &nlu_result.entities);
                let result = DomainResult::with_reply(reply);
                return finish(
                    engine, &req, started, session, session_id, &resolution.rotated_from,
                    nlu_result, result,
                );
            }
        }
    }

    // Step 6: cart mutation guard. Only confirm_order may carry the flag;
    // anything else claiming it is forced into discovery.
    if let Some(spec) = icm::spec(nlu_result.intent) {
        if spec.mutates_cart && nlu_result.intent != Intent::ConfirmOrder {
            nlu_result.intent = Intent::FindNearby;
            nlu_result.source = IntentSource::CartMutationBlocked;
        }
    }

    // Step 7: discovery reset.
    if nlu_result.intent == Intent::FindNearby && !nlu_result.source.is_blocked() {
        session.current_restaurant = None;
        session.locked_restaurant_id = None;
    }

    // Step 8: choose_restaurant carrying candidate options from NLU.
    if nlu_result.intent == Intent::ChooseRestaurant && !nlu_result.entities.options.is_empty() {
        let options = nlu_result.entities.options.clone();
        let facts = Facts {
            dish: nlu_result
                .entities
                .dish
                .clone()
                .or_else(|| session.pending_dish.clone()),
            restaurants: options.iter().map(|o| o.name.clone()).collect(),
            ..Facts::default()
        };
        let rendered = render(SurfaceKey::AskRestaurantForOrder, &facts);
        let mut result = DomainResult::with_reply(rendered.reply);
        result.context = ContextUpdates {
            last_restaurants_list: Some(options),
            expected_context: Patch::Set(ExpectedContext::SelectRestaurant),
            pending_dish: match facts.dish.clone() {
                Some(d) => Patch::Set(d),
                None => Patch::Keep,
            },
            ..ContextUpdates::default()
        };
        result.surface = Some((SurfaceKey::AskRestaurantForOrder, facts));
        record_turns(&mut session, &input, &result.reply, &nlu_result.entities);
        return finish(
            engine, &req, started, session, session_id, &resolution.rotated_from, nlu_result,
            result,
        );
    }

    // Step 9: UX guards. Never re-enable a blocked intent.
    if !nlu_result.source.is_blocked() {
        apply_ux_guards(engine, &mut session, &mut nlu_result, &input);
    }

    // Fuzzy restaurant confirmation may decide to ask instead of acting.
    if let Some(prompt) = fuzzy_restaurant_prompt(&session, &nlu_result, &input) {
        let mut result = DomainResult::with_reply(prompt);
        result.context.expected_context = Patch::Set(ExpectedContext::ConfirmRestaurant);
        record_turns(&mut session, &input, &result.reply, &nlu_result.entities);
        return finish(
            engine, &req, started, session, session_id, &resolution.rotated_from, nlu_result,
            result,
        );
    }

    // Step 10: zombie kill switch for the legacy completed marker.
    if session.legacy_completed {
        if icm::ZOMBIE_EXEMPT.contains(&nlu_result.intent) {
            session.legacy_completed = false;
        } else {
            let reply =
                "Ta rozmowa jest już zakończona. Powiedz \"nowe zamówienie\", aby zacząć od nowa."
                    .to_string();
            record_turns(&mut session, &input, &reply, &nlu_result.entities);
            let mut locked = TurnResponse::soft_error(&session_id, "session_locked", &reply);
            locked.ok = true;
            locked.intent = Intent::SessionLocked.as_str().to_string();
            locked.meta.source = nlu_result.source.as_str().to_string();
            locked.meta.latency_total_ms = started.elapsed().as_millis() as u64;
            return locked;
        }
    }

    // Step 11: dispatch.
    let mut result = {
        let ctx = HandlerCtx {
            catalog: engine.catalog(),
            orders: engine.orders(),
            session: &session,
            nlu: &nlu_result,
            input: &input,
            lat: req.lat,
            lng: req.lng,
        };
        handlers::dispatch(&ctx)
    };

    // Selection that carried a pending dish chains straight into ordering.
    result = chain_pending_dish(engine, &req, &session, &nlu_result, &input, result);

    // Step 12: surface detection can still override a bare reply.
    detect_surface(&mut result, &session);

    record_turns(&mut session, &input, &result.reply, &nlu_result.entities);
    finish(
        engine, &req, started, session, session_id, &resolution.rotated_from, nlu_result, result,
    )
}

/// Steps 13-16: stack push, atomic context merge, close/rotation, entity
/// cache, TTS outside the lock, response assembly.
#[allow(clippy::too_many_arguments)]
fn finish(
    engine: &DialogEngine,
    req: &TurnRequest,
    started: Instant,
    mut session: std::sync::MutexGuard<'_, Session>,
    session_id: String,
    rotated_from: &Option<String>,
    nlu_result: NluResult,
    result: DomainResult,
) -> TurnResponse {
    let intent = result.intent_override.unwrap_or(nlu_result.intent);

    // Step 13: dialog stack push for the rendered surface.
    if result.should_reply && !result.reply.is_empty() {
        let (key, facts) = match &result.surface {
            Some((key, facts)) => (key.as_str().to_string(), facts.clone()),
            None => (stack_key(intent), Facts::default()),
        };
        session.dialog_stack.push(DialogStackEntry {
            surface_key: key,
            facts,
            rendered_text: result.reply.clone(),
        });
    }

    // Step 14: atomic context merge + bookkeeping.
    result.context.clone().apply(&mut session);
    session.last_intent = Some(intent.as_str().to_string());
    if !result.restaurants.is_empty() {
        session.entity_cache.restaurants =
            result.restaurants.iter().map(RestaurantRef::from).collect();
    }
    if !result.menu_items.is_empty() {
        session.entity_cache.items = result.menu_items.clone();
    }

    let mut new_session_id = rotation_notice(rotated_from, &session_id);
    let mut conversation_closed = result.conversation_closed;
    if let Some(reason) = result.context.close {
        let successor = engine.store().close(&mut session, reason);
        new_session_id = Some(successor);
        conversation_closed = true;
    }

    let distances = {
        let ctx = HandlerCtx {
            catalog: engine.catalog(),
            orders: engine.orders(),
            session: &session,
            nlu: &nlu_result,
            input: "",
            lat: req.lat,
            lng: req.lng,
        };
        crate::handlers::find_distances(&ctx, &result.restaurants)
    };

    // Step 15: release the lock before any TTS work.
    drop(session);

    let admin = engine.admin();
    let mut tts_text = None;
    let mut audio_content = None;
    let mut styling_ms = 0;
    let mut tts_ms = 0;
    if req.include_tts && admin.tts_enabled && result.should_reply && !result.reply.is_empty() {
        let deadline_ms = settings().timeouts.turn_deadline_ms;
        if started.elapsed().as_millis() as u64 >= deadline_ms {
            warn!("turn deadline exceeded, skipping TTS");
        } else {
            let styling_started = Instant::now();
            let has_list = !result.restaurants.is_empty() || !result.menu_items.is_empty();
            let speakable = if has_list {
                polish_for_speech(&list_intro(&result.reply))
            } else {
                polish_for_speech(&result.reply)
            };
            styling_ms = styling_started.elapsed().as_millis() as u64;

            if let Some(synthesizer) = engine.synthesizer() {
                let tts_started = Instant::now();
                let abort = engine.tts_abort();
                abort.store(false, Ordering::SeqCst);
                match synthesizer.synthesize(&speakable) {
                    Ok(bytes) if !abort.load(Ordering::SeqCst) => {
                        audio_content =
                            Some(base64::engine::general_purpose::STANDARD.encode(bytes));
                    }
                    Ok(_) => debug!("tts aborted by barge-in"),
                    Err(e) => warn!("tts synthesis failed: {e}"),
                }
                tts_ms = tts_started.elapsed().as_millis() as u64;
            }
            tts_text = Some(speakable);
        }
    }

    TurnResponse {
        ok: true,
        session_id,
        intent: intent.as_str().to_string(),
        reply: result.reply,
        error: None,
        tts_text,
        audio_content,
        restaurants: result
            .restaurants
            .iter()
            .zip(distances)
            .map(|(r, d)| crate::types::restaurant_out(r, d))
            .collect(),
        menu_items: result.menu_items.iter().map(crate::types::menu_item_out).collect(),
        actions: result.actions,
        conversation_closed,
        new_session_id,
        stop_tts: false,
        meta: ResponseMeta {
            source: nlu_result.source.as_str().to_string(),
            latency_total_ms: started.elapsed().as_millis() as u64,
            styling_ms,
            tts_ms,
        },
    }
}

/// ICM soft bridges: instead of falling back, ask the clarifying question
/// that advances the dialog.
fn soft_bridge(session: &Session, nlu_result: &NluResult) -> Option<DomainResult> {
    if session.last_restaurants_list.is_empty() {
        return None;
    }
    let names: Vec<String> = session
        .last_restaurants_list
        .iter()
        .map(|r| r.name.clone())
        .collect();

    match nlu_result.intent {
        Intent::MenuRequest => {
            let facts = Facts {
                restaurants: names,
                ..Facts::default()
            };
            let rendered = render(SurfaceKey::AskRestaurantForMenu, &facts);
            let mut result = DomainResult::with_reply(rendered.reply);
            result.context = ContextUpdates {
                expected_context: Patch::Set(ExpectedContext::SelectRestaurant),
                dialog_focus: Patch::Set("CHOOSING_RESTAURANT_FOR_MENU".to_string()),
                ..ContextUpdates::default()
            };
            result.surface = Some((SurfaceKey::AskRestaurantForMenu, facts));
            Some(result)
        }
        Intent::CreateOrder => {
            let dish = nlu_result
                .entities
                .dish
                .clone()
                .or_else(|| session.pending_dish.clone());
            let facts = Facts {
                dish: dish.clone(),
                restaurants: names,
                ..Facts::default()
            };
            let rendered = render(SurfaceKey::AskRestaurantForOrder, &facts);
            let mut result = DomainResult::with_reply(rendered.reply);
            result.context = ContextUpdates {
                expected_context: Patch::Set(ExpectedContext::SelectRestaurant),
                dialog_focus: Patch::Set("CHOOSING_RESTAURANT_FOR_ORDER".to_string()),
                pending_dish: match dish {
                    Some(d) => Patch::Set(d),
                    None => Patch::Keep,
                },
                ..ContextUpdates::default()
            };
            result.surface = Some((SurfaceKey::AskRestaurantForOrder, facts));
            Some(result)
        }
        _ => None,
    }
}

fn gate_miss_reply(intent: Intent) -> String {
    match intent {
        Intent::ConfirmOrder => "Nie mam zamówienia do potwierdzenia.".to_string(),
        Intent::ConfirmAddToCart => "Nie wiem, co dodać do koszyka.".to_string(),
        _ => "Nie do końca rozumiem. Powiedz np. \"szukam pizzy w Bytomiu\".".to_string(),
    }
}

/// Step 9 guards, in order. Each may rewrite the intent in place.
fn apply_ux_guards(
    engine: &DialogEngine,
    session: &mut Session,
    nlu_result: &mut NluResult,
    input: &str,
) {
    let folded = normalize(input);

    // Menu-scoped ordering: discovery vocabulary while browsing a menu is
    // an order, not a new search.
    if nlu_result.intent == Intent::FindNearby {
        let menu_scoped = session.last_intent.as_deref() == Some("menu_request")
            || matches!(
                session.expected_context,
                Some(ExpectedContext::RestaurantMenu)
                    | Some(ExpectedContext::ContinueOrder)
                    | Some(ExpectedContext::MenuOrOrder)
            );
        if menu_scoped {
            if let Some(current) = session.last_restaurant.clone().or_else(|| {
                // Discovery reset already cleared current_restaurant; the
                // last selected one is the menu's owner.
                session.current_restaurant.clone()
            }) {
                nlu_result.intent = Intent::CreateOrder;
                nlu_result.entities.restaurant = engine
                    .catalog()
                    .all_restaurants()
                    .into_iter()
                    .find(|r| r.id == current.id);
                session.current_restaurant = Some(current);
            }
        }
    }

    // Confirm guards for yes/no follow-ups.
    match session.expected_context {
        Some(ExpectedContext::ConfirmOrder) if nlu::is_positive(input) => {
            nlu_result.intent = Intent::ConfirmOrder;
            nlu_result.source = IntentSource::RuleGuard;
        }
        Some(ExpectedContext::ConfirmRestaurant) => {
            if nlu::is_positive(input) {
                nlu_result.intent = Intent::ConfirmRestaurant;
                nlu_result.source = IntentSource::RuleGuard;
            } else if nlu::is_negative(input) {
                session.current_restaurant = None;
                session.locked_restaurant_id = None;
                nlu_result.intent = Intent::FindNearby;
                nlu_result.source = IntentSource::RuleGuard;
            }
        }
        Some(ExpectedContext::ConfirmMenu)
            if nlu_result.intent == Intent::Unknown && nlu::is_positive(input) =>
        {
            nlu_result.intent = Intent::MenuRequest;
            nlu_result.source = IntentSource::RuleGuard;
        }
        _ => {}
    }

    // Auto-menu: "pokaż X" on a selection means the menu, unless the user
    // is changing restaurants.
    if nlu_result.intent == Intent::SelectRestaurant {
        let show_verb = ["pokaz", "zobacz", "wyswietl"]
            .iter()
            .any(|v| folded.contains(v));
        let change_verb = ["zmien", "inna", "inny", "zamiast"]
            .iter()
            .any(|v| folded.contains(v));
        if show_verb && !change_verb {
            if let Some(restaurant) = nlu_result.entities.restaurant.as_ref() {
                session.current_restaurant = Some(RestaurantRef::from(restaurant));
                session.locked_restaurant_id = Some(restaurant.id.clone());
            }
            if session.current_restaurant.is_some() {
                nlu_result.intent = Intent::MenuRequest;
            }
        }
    }

    // Empty-order guard: an order with no dish and no explicit verb is a
    // menu request in context, or a question otherwise.
    if nlu_result.intent == Intent::CreateOrder {
        let has_dish = nlu_result.entities.dish.as_deref().is_some_and(|d| !d.is_empty())
            || nlu_result
                .entities
                .parsed_order
                .as_ref()
                .is_some_and(|p| p.groups.iter().any(|g| !g.items.is_empty()));
        let has_verb = nlu_result.source == IntentSource::LexicalOverride;
        if !has_dish && !has_verb && session.current_restaurant.is_some() {
            nlu_result.intent = Intent::MenuRequest;
        }
    }
}

/// A name close to the current restaurant (shared 4-char head or mutual
/// 5-char prefix) gets an explicit confirmation instead of a context switch.
fn fuzzy_restaurant_prompt(
    session: &Session,
    nlu_result: &NluResult,
    input: &str,
) -> Option<String> {
    if nlu_result.intent != Intent::Unknown {
        return None;
    }
    let current = session.current_restaurant.as_ref()?;
    let name_tokens: Vec<String> = kelner_core::text::tokenize(&current.name)
        .into_iter()
        .filter(|t| t.chars().count() >= 4)
        .collect();
    let input_tokens = kelner_core::text::tokenize(input);

    let similar = input_tokens.iter().any(|t| {
        name_tokens.iter().any(|n| {
            let head = |s: &str, k: usize| s.chars().take(k).collect::<String>();
            (t.chars().count() >= 4 && head(t, 4) == head(n, 4))
                || (t.chars().count() >= 5 && n.starts_with(&head(t, 5)))
                || (n.chars().count() >= 5 && t.starts_with(&head(n, 5)))
        })
    });
    // An exact mention is not "similar", it is the same restaurant.
    let exact = normalize(input).contains(&normalize(&current.name));

    (similar && !exact).then(|| format!("Chodzi Ci o {}? (tak/nie)", current.name))
}

/// A selection that carried a pending dish emits a synthetic create_order
/// action; run the order handler for it and merge the outcome.
fn chain_pending_dish(
    engine: &DialogEngine,
    req: &TurnRequest,
    session: &Session,
    nlu_result: &NluResult,
    input: &str,
    result: DomainResult,
) -> DomainResult {
    if nlu_result.intent != Intent::SelectRestaurant {
        return result;
    }
    let Some(crate::types::Action::CreateOrder { restaurant, items }) = result.actions.first()
    else {
        return result;
    };
    let Some(dish) = items.first() else {
        return result;
    };

    let ctx = HandlerCtx {
        catalog: engine.catalog(),
        orders: engine.orders(),
        session,
        nlu: nlu_result,
        input,
        lat: req.lat,
        lng: req.lng,
    };
    let chained = crate::handlers::order_execute_for(
        &ctx,
        Some(restaurant.id.as_str()),
        &dish.name,
        dish.quantity,
    );

    // Selection context first, then the order's own updates on top.
    let mut merged = chained;
    let mut context = result.context.clone();
    overlay_context(&mut context, merged.context);
    merged.context = context;
    let mut actions = result.actions.clone();
    actions.extend(merged.actions);
    merged.actions = actions;
    merged
}

fn overlay_context(base: &mut ContextUpdates, top: ContextUpdates) {
    if top.last_intent.is_some() {
        base.last_intent = top.last_intent;
    }
    overlay_patch(&mut base.expected_context, top.expected_context);
    overlay_patch(&mut base.awaiting, top.awaiting);
    overlay_patch(&mut base.current_restaurant, top.current_restaurant);
    overlay_patch(&mut base.last_restaurant, top.last_restaurant);
    overlay_patch(&mut base.locked_restaurant_id, top.locked_restaurant_id);
    overlay_patch(&mut base.last_location, top.last_location);
    overlay_patch(&mut base.last_cuisine, top.last_cuisine);
    if top.last_restaurants_list.is_some() {
        base.last_restaurants_list = top.last_restaurants_list;
    }
    overlay_patch(&mut base.last_menu, top.last_menu);
    overlay_patch(&mut base.pending_dish, top.pending_dish);
    overlay_patch(&mut base.pending_order, top.pending_order);
    overlay_patch(&mut base.dialog_focus, top.dialog_focus);
    base.cart_append.extend(top.cart_append);
    if top.close.is_some() {
        base.close = top.close;
    }
}

fn overlay_patch<T>(base: &mut Patch<T>, top: Patch<T>) {
    if !matches!(top, Patch::Keep) {
        *base = top;
    }
}

/// Step 12: map handler flags to a surface when the handler did not pick
/// one itself; the deterministic render overrides the ad-hoc reply.
fn detect_surface(result: &mut DomainResult, session: &Session) {
    if result.surface.is_some() || !result.should_reply {
        return;
    }

    let key = if result.flags.needs_location {
        Some(SurfaceKey::AskLocation)
    } else if !result.flags.unknown_items.is_empty() {
        Some(SurfaceKey::ItemNotFound)
    } else if result.flags.needs_clarification {
        Some(SurfaceKey::ClarifyItems)
    } else if result.restaurants.len() > 1
        && matches!(
            result.context.expected_context,
            Patch::Set(ExpectedContext::SelectRestaurant)
        )
    {
        Some(SurfaceKey::ChooseRestaurant)
    } else {
        None
    };

    let Some(key) = key else { return };
    let facts = Facts {
        city: session.last_location.clone(),
        unknown_item: result.flags.unknown_items.first().cloned(),
        restaurant_name: session.current_restaurant.as_ref().map(|r| r.name.clone()),
        restaurants: result.restaurants.iter().map(|r| r.name.clone()).collect(),
        ..Facts::default()
    };
    let rendered = render(key, &facts);
    result.reply = rendered.reply;
    result.surface = Some((key, facts));
}

fn stack_key(intent: Intent) -> String {
    match intent {
        Intent::MenuRequest => "MENU".to_string(),
        Intent::FindNearby | Intent::Recommend => "RESULTS".to_string(),
        other => other.as_str().to_ascii_uppercase(),
    }
}

fn rotation_notice(rotated_from: &Option<String>, active_id: &str) -> Option<String> {
    rotated_from.as_ref().map(|_| active_id.to_string())
}

fn record_turns(session: &mut Session, input: &str, reply: &str, entities: &Entities) {
    let snapshot = EntitySnapshot {
        restaurant: entities.restaurant.as_ref().map(|r| r.name.clone()),
        dish: entities.dish.clone(),
        location: entities.location.clone(),
    };
    session.push_turn(TurnRecord {
        speaker: Speaker::User,
        text: input.to_string(),
        entities: snapshot.clone(),
        at_ms: now_ms(),
    });
    if !reply.is_empty() {
        session.push_turn(TurnRecord {
            speaker: Speaker::Assistant,
            text: reply.to_string(),
            entities: snapshot,
            at_ms: now_ms(),
        });
    }
}
