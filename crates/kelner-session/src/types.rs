//! Shared types for the dialog engine: intents, session state, handler
//! results, and the wire-facing request/response shapes.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use kelner_core::catalog::{MenuItem, Restaurant};
use kelner_core::orders::CartLine;
use kelner_core::resolve::ParsedOrder;
use kelner_core::settings::settings;
use kelner_core::surface::Facts;

// --- Intents ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    FindNearby,
    MenuRequest,
    CreateOrder,
    ConfirmOrder,
    ConfirmAddToCart,
    SelectRestaurant,
    ShowMoreOptions,
    CancelOrder,
    Recommend,
    ChooseRestaurant,
    ConfirmRestaurant,
    NewOrder,
    StartOver,
    Help,
    DialogBack,
    DialogRepeat,
    DialogNext,
    DialogStop,
    SessionLocked,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::FindNearby => "find_nearby",
            Intent::MenuRequest => "menu_request",
            Intent::CreateOrder => "create_order",
            Intent::ConfirmOrder => "confirm_order",
            Intent::ConfirmAddToCart => "confirm_add_to_cart",
            Intent::SelectRestaurant => "select_restaurant",
            Intent::ShowMoreOptions => "show_more_options",
            Intent::CancelOrder => "cancel_order",
            Intent::Recommend => "recommend",
            Intent::ChooseRestaurant => "choose_restaurant",
            Intent::ConfirmRestaurant => "confirm_restaurant",
            Intent::NewOrder => "new_order",
            Intent::StartOver => "start_over",
            Intent::Help => "help",
            Intent::DialogBack => "DIALOG_BACK",
            Intent::DialogRepeat => "DIALOG_REPEAT",
            Intent::DialogNext => "DIALOG_NEXT",
            Intent::DialogStop => "DIALOG_STOP",
            Intent::SessionLocked => "session_locked",
            Intent::Unknown => "unknown",
        }
    }
}

/// Which tier produced the intent. Blocked/fallback sources gate several
/// downstream guards, so the distinction is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentSource {
    RuleGuard,
    LexicalOverride,
    RegexV2,
    CatalogMatch,
    ClassicLegacy,
    LlmHybrid,
    ContextLock,
    Fallback,
    IcmFallback,
    CartMutationBlocked,
    LegacyHardBlocked,
}

impl IntentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentSource::RuleGuard => "rule_guard",
            IntentSource::LexicalOverride => "lexical_override",
            IntentSource::RegexV2 => "regex_v2",
            IntentSource::CatalogMatch => "catalog_match",
            IntentSource::ClassicLegacy => "classic_legacy",
            IntentSource::LlmHybrid => "llm_hybrid",
            IntentSource::ContextLock => "context_lock",
            IntentSource::Fallback => "fallback",
            IntentSource::IcmFallback => "icm_fallback",
            IntentSource::CartMutationBlocked => "cart_mutation_blocked",
            IntentSource::LegacyHardBlocked => "legacy_hard_blocked",
        }
    }

    /// A source that must never be re-upgraded by UX guards.
    pub fn is_blocked(&self) -> bool {
        *self == IntentSource::IcmFallback || self.as_str().ends_with("_blocked")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Food,
    Ordering,
    System,
}

// --- Session state ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    CartItemAdded,
    OrderConfirmed,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::CartItemAdded => "CART_ITEM_ADDED",
            CloseReason::OrderConfirmed => "ORDER_CONFIRMED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedContext {
    SelectRestaurant,
    ConfirmOrder,
    ConfirmRestaurant,
    ConfirmMenu,
    MenuOrOrder,
    ChooseRestaurant,
    ContinueOrder,
    RestaurantMenu,
    FindNearbyAskLocation,
    ShowMoreOptions,
}

impl ExpectedContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpectedContext::SelectRestaurant => "select_restaurant",
            ExpectedContext::ConfirmOrder => "confirm_order",
            ExpectedContext::ConfirmRestaurant => "confirm_restaurant",
            ExpectedContext::ConfirmMenu => "confirm_menu",
            ExpectedContext::MenuOrOrder => "menu_or_order",
            ExpectedContext::ChooseRestaurant => "choose_restaurant",
            ExpectedContext::ContinueOrder => "continue_order",
            ExpectedContext::RestaurantMenu => "restaurant_menu",
            ExpectedContext::FindNearbyAskLocation => "find_nearby_ask_location",
            ExpectedContext::ShowMoreOptions => "show_more_options",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Awaiting {
    Location,
}

/// Light reference to a selected restaurant kept on the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRef {
    pub id: String,
    pub name: String,
    pub city: String,
}

impl From<&Restaurant> for RestaurantRef {
    fn from(r: &Restaurant) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
            city: r.city.clone(),
        }
    }
}

/// Entry of the last surfaced restaurant list. `index` is the stable
/// 1-based position the user refers to ("dwa", "drugą").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedRestaurant {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuSnapshot {
    pub restaurant_id: String,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub items: Vec<CartLine>,
    pub total: f64,
}

impl PendingOrder {
    pub fn recompute_total(&mut self) {
        self.total = self.items.iter().map(CartLine::line_total).sum();
    }
}

// --- Dialog stack ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogStackEntry {
    pub surface_key: String,
    pub facts: Facts,
    pub rendered_text: String,
}

/// Bounded history of rendered surfaces for BACK/REPEAT/NEXT.
/// Invariant: `index < entries.len()` whenever entries is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogStack {
    entries: Vec<DialogStackEntry>,
    index: usize,
}

impl DialogStack {
    pub fn push(&mut self, entry: DialogStackEntry) {
        let cap = settings().limits.dialog_stack_cap;
        if self.entries.len() == cap {
            self.entries.remove(0);
        }
        self.entries.push(entry);
        self.index = self.entries.len() - 1;
    }

    /// Move back one entry. No-op at the bottom.
    pub fn back(&mut self) -> Option<&DialogStackEntry> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index)
    }

    pub fn forward(&mut self) -> Option<&DialogStackEntry> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index)
    }

    pub fn current(&self) -> Option<&DialogStackEntry> {
        self.entries.get(self.index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

// --- Turn buffer & entity cache ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub restaurant: Option<String>,
    pub dish: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub speaker: Speaker,
    pub text: String,
    pub entities: EntitySnapshot,
    pub at_ms: i64,
}

/// Position-indexed cache of the last shown lists, for deictic references
/// ("the second one"). Positions are 1-based and stable while the same
/// list is displayed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityCache {
    pub restaurants: Vec<RestaurantRef>,
    pub items: Vec<MenuItem>,
}

impl EntityCache {
    pub fn restaurant_at(&self, position: usize) -> Option<&RestaurantRef> {
        position.checked_sub(1).and_then(|i| self.restaurants.get(i))
    }

    pub fn item_at(&self, position: usize) -> Option<&MenuItem> {
        position.checked_sub(1).and_then(|i| self.items.get(i))
    }
}

// --- Session ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
    pub closed_reason: Option<CloseReason>,
    pub closed_at: Option<i64>,
    /// Successor allocated when this session closed.
    pub successor_id: Option<String>,
    /// Legacy completed marker honored only by the zombie kill switch.
    pub legacy_completed: bool,
    pub last_intent: Option<String>,
    pub expected_context: Option<ExpectedContext>,
    pub awaiting: Option<Awaiting>,
    pub current_restaurant: Option<RestaurantRef>,
    pub last_restaurant: Option<RestaurantRef>,
    pub locked_restaurant_id: Option<String>,
    pub last_location: Option<String>,
    pub last_cuisine: Option<String>,
    pub last_restaurants_list: Vec<ListedRestaurant>,
    pub last_menu: Option<MenuSnapshot>,
    pub pending_dish: Option<String>,
    pub pending_order: Option<PendingOrder>,
    pub cart: Vec<CartLine>,
    pub dialog_stack: DialogStack,
    pub dialog_focus: Option<String>,
    pub turn_buffer: VecDeque<TurnRecord>,
    pub entity_cache: EntityCache,
    pub stop_tts: bool,
}

impl Session {
    pub fn new(id: String) -> Self {
        Self {
            id,
            status: SessionStatus::Active,
            closed_reason: None,
            closed_at: None,
            successor_id: None,
            legacy_completed: false,
            last_intent: None,
            expected_context: None,
            awaiting: None,
            current_restaurant: None,
            last_restaurant: None,
            locked_restaurant_id: None,
            last_location: None,
            last_cuisine: None,
            last_restaurants_list: Vec::new(),
            last_menu: None,
            pending_dish: None,
            pending_order: None,
            cart: Vec::new(),
            dialog_stack: DialogStack::default(),
            dialog_focus: None,
            turn_buffer: VecDeque::new(),
            entity_cache: EntityCache::default(),
            stop_tts: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == SessionStatus::Closed
    }

    pub fn push_turn(&mut self, record: TurnRecord) {
        let cap = settings().limits.turn_buffer_cap;
        while self.turn_buffer.len() >= cap {
            self.turn_buffer.pop_front();
        }
        self.turn_buffer.push_back(record);
    }
}

// --- Entities & NLU result ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entities {
    pub restaurant: Option<Restaurant>,
    pub location: Option<String>,
    pub cuisine: Option<String>,
    pub dish: Option<String>,
    pub items: Vec<String>,
    pub quantity: Option<u32>,
    pub parsed_order: Option<ParsedOrder>,
    /// Candidate restaurants attached to a `choose_restaurant` intent.
    pub options: Vec<ListedRestaurant>,
    /// Raw text carried into `select_restaurant`.
    pub raw_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NluResult {
    pub intent: Intent,
    pub domain: Domain,
    pub confidence: f64,
    pub entities: Entities,
    pub source: IntentSource,
}

// --- Context updates (atomic merge) ---

/// Three-state field update, so "leave alone" and "clear" are distinct.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Keep,
    Clear,
    Set(T),
}

// Hand-written so `Patch<T>: Default` holds without `T: Default`.
impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    pub fn apply(self, slot: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Clear => *slot = None,
            Patch::Set(value) => *slot = Some(value),
        }
    }
}

/// Declarative session delta produced by a handler and applied by the
/// orchestrator in one merge while the session lock is held.
#[derive(Debug, Clone, Default)]
pub struct ContextUpdates {
    pub last_intent: Option<Intent>,
    pub expected_context: Patch<ExpectedContext>,
    pub awaiting: Patch<Awaiting>,
    pub current_restaurant: Patch<RestaurantRef>,
    pub last_restaurant: Patch<RestaurantRef>,
    pub locked_restaurant_id: Patch<String>,
    pub last_location: Patch<String>,
    pub last_cuisine: Patch<String>,
    /// `None` keeps the list, `Some` replaces it (possibly with empty).
    pub last_restaurants_list: Option<Vec<ListedRestaurant>>,
    pub last_menu: Patch<MenuSnapshot>,
    pub pending_dish: Patch<String>,
    pub pending_order: Patch<PendingOrder>,
    pub dialog_focus: Patch<String>,
    pub cart_append: Vec<CartLine>,
    pub close: Option<CloseReason>,
}

impl ContextUpdates {
    pub fn apply(self, session: &mut Session) {
        if let Some(intent) = self.last_intent {
            session.last_intent = Some(intent.as_str().to_string());
        }
        self.expected_context.apply(&mut session.expected_context);
        self.awaiting.apply(&mut session.awaiting);
        self.current_restaurant.apply(&mut session.current_restaurant);
        self.last_restaurant.apply(&mut session.last_restaurant);
        self.locked_restaurant_id
            .apply(&mut session.locked_restaurant_id);
        self.last_location.apply(&mut session.last_location);
        self.last_cuisine.apply(&mut session.last_cuisine);
        if let Some(list) = self.last_restaurants_list {
            session.last_restaurants_list = list;
        }
        self.last_menu.apply(&mut session.last_menu);
        self.pending_dish.apply(&mut session.pending_dish);
        self.pending_order.apply(&mut session.pending_order);
        self.dialog_focus.apply(&mut session.dialog_focus);
        session.cart.extend(self.cart_append);
    }
}

// --- Handler results ---

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HandlerMeta {
    pub added_to_cart: bool,
    pub order_id: Option<String>,
    pub order_skipped: bool,
}

/// Structured flags the surface detector inspects after a handler ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceFlags {
    pub needs_clarification: bool,
    pub unknown_items: Vec<String>,
    pub needs_location: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum Action {
    #[serde(rename = "SHOW_CART")]
    ShowCart,
    #[serde(rename = "add_to_cart")]
    AddToCart {
        restaurant: RestaurantRef,
        item: CartLine,
    },
    #[serde(rename = "create_order")]
    CreateOrder {
        restaurant: RestaurantRef,
        items: Vec<OrderedDish>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderedDish {
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct DomainResult {
    pub reply: String,
    pub intent_override: Option<Intent>,
    pub restaurants: Vec<Restaurant>,
    pub menu_items: Vec<MenuItem>,
    pub actions: Vec<Action>,
    pub context: ContextUpdates,
    pub meta: HandlerMeta,
    pub should_reply: bool,
    pub conversation_closed: bool,
    pub flags: SurfaceFlags,
    /// Surface chosen by the handler itself; the detector may override.
    pub surface: Option<(kelner_core::surface::SurfaceKey, Facts)>,
}

impl DomainResult {
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            intent_override: None,
            restaurants: Vec::new(),
            menu_items: Vec::new(),
            actions: Vec::new(),
            context: ContextUpdates::default(),
            meta: HandlerMeta::default(),
            should_reply: true,
            conversation_closed: false,
            flags: SurfaceFlags::default(),
            surface: None,
        }
    }

    pub fn silent() -> Self {
        let mut r = Self::with_reply("");
        r.should_reply = false;
        r
    }
}

// --- Wire types ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestMeta {
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(alias = "text", default)]
    pub input: String,
    #[serde(default)]
    pub meta: Option<RequestMeta>,
    #[serde(alias = "includeTTS", default)]
    pub include_tts: bool,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl TurnRequest {
    pub fn text(input: impl Into<String>, session_id: Option<&str>) -> Self {
        Self {
            session_id: session_id.map(str::to_string),
            input: input.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RestaurantOut {
    pub id: String,
    pub name: String,
    pub city: String,
    pub cuisine_type: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuItemOut {
    pub id: String,
    pub name: String,
    pub price_pln: f64,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResponseMeta {
    pub source: String,
    pub latency_total_ms: u64,
    pub styling_ms: u64,
    pub tts_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub ok: bool,
    pub session_id: String,
    pub intent: String,
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_text: Option<String>,
    #[serde(rename = "audioContent", skip_serializing_if = "Option::is_none")]
    pub audio_content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub restaurants: Vec<RestaurantOut>,
    #[serde(rename = "menuItems", skip_serializing_if = "Vec::is_empty")]
    pub menu_items: Vec<MenuItemOut>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    #[serde(rename = "conversationClosed")]
    pub conversation_closed: bool,
    #[serde(rename = "newSessionId", skip_serializing_if = "Option::is_none")]
    pub new_session_id: Option<String>,
    #[serde(rename = "stopTTS")]
    pub stop_tts: bool,
    pub meta: ResponseMeta,
}

impl TurnResponse {
    pub fn soft_error(session_id: &str, code: &str, reply: &str) -> Self {
        Self {
            ok: false,
            session_id: session_id.to_string(),
            intent: Intent::Unknown.as_str().to_string(),
            reply: reply.to_string(),
            error: Some(code.to_string()),
            tts_text: None,
            audio_content: None,
            restaurants: Vec::new(),
            menu_items: Vec::new(),
            actions: Vec::new(),
            conversation_closed: false,
            new_session_id: None,
            stop_tts: false,
            meta: ResponseMeta::default(),
        }
    }
}

pub fn restaurant_out(r: &Restaurant, distance: Option<f64>) -> RestaurantOut {
    RestaurantOut {
        id: r.id.clone(),
        name: r.name.clone(),
        city: r.city.clone(),
        cuisine_type: r.cuisine.clone(),
        lat: r.lat,
        lng: r.lng,
        distance,
    }
}

pub fn menu_item_out(i: &MenuItem) -> MenuItemOut {
    MenuItemOut {
        id: i.id.clone(),
        name: i.name.clone(),
        price_pln: i.price,
        category: i.category.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str) -> DialogStackEntry {
        DialogStackEntry {
            surface_key: key.to_string(),
            facts: Facts::default(),
            rendered_text: format!("tekst {key}"),
        }
    }

    #[test]
    fn test_dialog_stack_push_and_nav() {
        let mut stack = DialogStack::default();
        assert!(stack.current().is_none());

        stack.push(entry("A"));
        stack.push(entry("B"));
        stack.push(entry("C"));
        assert_eq!(stack.index(), 2);
        assert_eq!(stack.current().unwrap().surface_key, "C");

        assert_eq!(stack.back().unwrap().surface_key, "B");
        assert_eq!(stack.back().unwrap().surface_key, "A");
        assert!(stack.back().is_none());
        assert_eq!(stack.index(), 0);

        assert_eq!(stack.forward().unwrap().surface_key, "B");
        assert_eq!(stack.forward().unwrap().surface_key, "C");
        assert!(stack.forward().is_none());
    }

    #[test]
    fn test_dialog_stack_cap_drops_oldest() {
        let cap = settings().limits.dialog_stack_cap;
        let mut stack = DialogStack::default();
        for i in 0..cap + 3 {
            stack.push(entry(&format!("S{i}")));
        }
        assert_eq!(stack.len(), cap);
        assert_eq!(stack.current().unwrap().surface_key, format!("S{}", cap + 2));
        // index stays in range
        assert!(stack.index() < stack.len());
    }

    #[test]
    fn test_turn_buffer_fifo() {
        let mut session = Session::new("sess_x".to_string());
        let cap = settings().limits.turn_buffer_cap;
        for i in 0..cap + 2 {
            session.push_turn(TurnRecord {
                speaker: Speaker::User,
                text: format!("turn {i}"),
                entities: EntitySnapshot::default(),
                at_ms: i as i64,
            });
        }
        assert_eq!(session.turn_buffer.len(), cap);
        assert_eq!(session.turn_buffer.front().unwrap().text, "turn 2");
    }

    #[test]
    fn test_patch_apply() {
        let mut slot = Some("old".to_string());
        Patch::Keep.apply(&mut slot);
        assert_eq!(slot.as_deref(), Some("old"));
        Patch::Set("new".to_string()).apply(&mut slot);
        assert_eq!(slot.as_deref(), Some("new"));
        Patch::<String>::Clear.apply(&mut slot);
        assert!(slot.is_none());
    }

    #[test]
    fn test_context_updates_apply() {
        let mut session = Session::new("sess_x".to_string());
        session.pending_dish = Some("kebab".to_string());

        let updates = ContextUpdates {
            last_intent: Some(Intent::SelectRestaurant),
            expected_context: Patch::Set(ExpectedContext::ConfirmOrder),
            pending_dish: Patch::Clear,
            cart_append: vec![CartLine {
                menu_item_id: "m1".to_string(),
                restaurant_id: "1".to_string(),
                name: "Pizza".to_string(),
                price: 25.0,
                qty: 2,
            }],
            ..ContextUpdates::default()
        };
        updates.apply(&mut session);

        assert_eq!(session.last_intent.as_deref(), Some("select_restaurant"));
        assert_eq!(session.expected_context, Some(ExpectedContext::ConfirmOrder));
        assert!(session.pending_dish.is_none());
        assert_eq!(session.cart.len(), 1);
        // untouched fields keep their values
        assert!(session.current_restaurant.is_none());
    }

    #[test]
    fn test_entity_cache_positions() {
        let cache = EntityCache {
            restaurants: vec![
                RestaurantRef {
                    id: "1".to_string(),
                    name: "A".to_string(),
                    city: "B".to_string(),
                },
                RestaurantRef {
                    id: "2".to_string(),
                    name: "C".to_string(),
                    city: "B".to_string(),
                },
            ],
            items: vec![],
        };
        assert_eq!(cache.restaurant_at(2).unwrap().id, "2");
        assert!(cache.restaurant_at(0).is_none());
        assert!(cache.restaurant_at(3).is_none());
    }

    #[test]
    fn test_source_blocked() {
        assert!(IntentSource::IcmFallback.is_blocked());
        assert!(IntentSource::CartMutationBlocked.is_blocked());
        assert!(IntentSource::LegacyHardBlocked.is_blocked());
        assert!(!IntentSource::RegexV2.is_blocked());
        assert!(!IntentSource::Fallback.is_blocked());
    }

    #[test]
    fn test_turn_request_accepts_text_alias() {
        let req: TurnRequest =
            serde_json::from_str(r#"{"text":"pokaż menu","includeTTS":true}"#).unwrap();
        assert_eq!(req.input, "pokaż menu");
        assert!(req.include_tts);
        assert!(req.session_id.is_none());
    }

    #[test]
    fn test_action_serialization_shape() {
        let action = Action::CreateOrder {
            restaurant: RestaurantRef {
                id: "2".to_string(),
                name: "Tasty King".to_string(),
                city: "Bytom".to_string(),
            },
            items: vec![OrderedDish {
                name: "kebab".to_string(),
                quantity: 1,
            }],
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "create_order");
        assert_eq!(json["payload"]["restaurant"]["id"], "2");
        assert_eq!(json["payload"]["items"][0]["name"], "kebab");
    }
}
