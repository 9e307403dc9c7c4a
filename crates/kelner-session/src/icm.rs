//! Intent Capability Map: the single source of truth for what each intent
//! requires from the session, where it falls back, and whether it may touch
//! the cart. Requirements are code, not reflection: each entry carries a
//! predicate over `(Session, Entities)`.

use crate::types::{Domain, Entities, ExpectedContext, Intent, Session};

type StatePredicate = fn(&Session, &Entities) -> bool;

pub struct IntentSpec {
    pub intent: Intent,
    pub domain: Domain,
    pub required: StatePredicate,
    /// Advisory: which intents typically follow.
    pub allowed_transitions: &'static [Intent],
    /// Audit-only: session keys this intent writes on success.
    pub sets_state: &'static [&'static str],
    /// Substituted when `required` fails and no soft bridge applies.
    /// `None` means the turn is ignored with a clarification.
    pub fallback: Option<Intent>,
    /// Demote this intent when the legacy classifier produced it.
    pub hard_block_legacy: bool,
    /// Exactly one intent carries this flag: `confirm_order`.
    pub mutates_cart: bool,
}

fn always(_: &Session, _: &Entities) -> bool {
    true
}

fn has_current_restaurant(s: &Session, _: &Entities) -> bool {
    s.current_restaurant.is_some()
}

fn has_any_restaurant_context(s: &Session, _: &Entities) -> bool {
    s.current_restaurant.is_some() || s.last_restaurant.is_some()
}

fn has_restaurant_list(s: &Session, _: &Entities) -> bool {
    !s.last_restaurants_list.is_empty()
}

fn can_confirm_order(s: &Session, _: &Entities) -> bool {
    s.pending_order
        .as_ref()
        .is_some_and(|p| !p.items.is_empty())
        && s.expected_context == Some(ExpectedContext::ConfirmOrder)
}

fn has_dish(s: &Session, e: &Entities) -> bool {
    s.pending_dish.is_some() || e.dish.is_some()
}

const REGISTRY: &[IntentSpec] = &[
    IntentSpec {
        intent: Intent::FindNearby,
        domain: Domain::Food,
        required: always,
        allowed_transitions: &[
            Intent::SelectRestaurant,
            Intent::MenuRequest,
            Intent::ShowMoreOptions,
        ],
        sets_state: &["last_restaurants_list", "last_location", "expected_context"],
        fallback: None,
        hard_block_legacy: false,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::MenuRequest,
        domain: Domain::Food,
        required: has_current_restaurant,
        allowed_transitions: &[Intent::CreateOrder, Intent::FindNearby],
        sets_state: &["last_menu", "expected_context"],
        fallback: Some(Intent::FindNearby),
        hard_block_legacy: false,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::CreateOrder,
        domain: Domain::Ordering,
        required: has_any_restaurant_context,
        allowed_transitions: &[Intent::ConfirmOrder, Intent::CancelOrder],
        sets_state: &["pending_order", "expected_context"],
        fallback: Some(Intent::FindNearby),
        hard_block_legacy: true,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::ConfirmOrder,
        domain: Domain::Ordering,
        required: can_confirm_order,
        allowed_transitions: &[],
        sets_state: &["cart", "pending_order", "expected_context"],
        fallback: None,
        hard_block_legacy: false,
        mutates_cart: true,
    },
    IntentSpec {
        intent: Intent::ConfirmAddToCart,
        domain: Domain::Ordering,
        required: has_dish,
        allowed_transitions: &[],
        sets_state: &["status"],
        fallback: None,
        hard_block_legacy: false,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::SelectRestaurant,
        domain: Domain::Food,
        required: has_restaurant_list,
        allowed_transitions: &[Intent::MenuRequest, Intent::CreateOrder],
        sets_state: &["current_restaurant", "locked_restaurant_id", "pending_dish"],
        fallback: Some(Intent::FindNearby),
        hard_block_legacy: false,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::ShowMoreOptions,
        domain: Domain::Food,
        required: has_restaurant_list,
        allowed_transitions: &[Intent::SelectRestaurant],
        sets_state: &["expected_context"],
        fallback: Some(Intent::FindNearby),
        hard_block_legacy: false,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::CancelOrder,
        domain: Domain::Ordering,
        required: always,
        allowed_transitions: &[Intent::FindNearby],
        sets_state: &["pending_order", "expected_context"],
        fallback: None,
        hard_block_legacy: false,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::ChooseRestaurant,
        domain: Domain::Food,
        required: always,
        allowed_transitions: &[Intent::SelectRestaurant],
        sets_state: &["last_restaurants_list", "pending_dish", "expected_context"],
        fallback: None,
        hard_block_legacy: false,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::ConfirmRestaurant,
        domain: Domain::Food,
        required: has_any_restaurant_context,
        allowed_transitions: &[Intent::CreateOrder, Intent::MenuRequest],
        sets_state: &["current_restaurant"],
        fallback: Some(Intent::FindNearby),
        hard_block_legacy: false,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::Recommend,
        domain: Domain::Food,
        required: always,
        allowed_transitions: &[Intent::SelectRestaurant],
        sets_state: &[],
        fallback: Some(Intent::FindNearby),
        hard_block_legacy: false,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::NewOrder,
        domain: Domain::System,
        required: always,
        allowed_transitions: &[Intent::FindNearby],
        sets_state: &["expected_context", "pending_order", "pending_dish"],
        fallback: None,
        hard_block_legacy: false,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::StartOver,
        domain: Domain::System,
        required: always,
        allowed_transitions: &[Intent::FindNearby],
        sets_state: &[],
        fallback: None,
        hard_block_legacy: false,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::Help,
        domain: Domain::System,
        required: always,
        allowed_transitions: &[],
        sets_state: &[],
        fallback: None,
        hard_block_legacy: false,
        mutates_cart: false,
    },
    IntentSpec {
        intent: Intent::Unknown,
        domain: Domain::System,
        required: always,
        allowed_transitions: &[],
        sets_state: &[],
        fallback: None,
        hard_block_legacy: false,
        mutates_cart: false,
    },
];

/// Look up the registry entry for an intent. Navigation and bookkeeping
/// intents (DIALOG_*, session_locked) never reach the gate.
pub fn spec(intent: Intent) -> Option<&'static IntentSpec> {
    REGISTRY.iter().find(|s| s.intent == intent)
}

/// Evaluate the state predicate for an intent against the session.
/// Unregistered intents pass.
pub fn check_required_state(intent: Intent, session: &Session, entities: &Entities) -> bool {
    spec(intent).map_or(true, |s| (s.required)(session, entities))
}

/// The intents allowed to revive a session stuck in the legacy completed
/// state.
pub const ZOMBIE_EXEMPT: &[Intent] = &[Intent::NewOrder, Intent::StartOver, Intent::Help];
