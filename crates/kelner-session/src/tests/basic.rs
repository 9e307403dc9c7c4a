use super::*;
use crate::types::ExpectedContext;

// --- Input validation ---

#[test]
fn test_empty_input_is_soft_error() {
    let (engine, _) = make_engine();
    let resp = turn(&engine, "sess_1_aaaaaa", "   ");
    assert!(!resp.ok);
    assert_eq!(resp.error.as_deref(), Some("brak_tekstu"));
    // no session was touched
    assert!(engine.session_snapshot("sess_1_aaaaaa").is_none());
}

// --- Discovery ---

#[test]
fn test_discovery_lists_restaurants() {
    let (engine, _) = make_engine();
    let resp = turn(&engine, "sess_1_find01", "gdzie zjeść w Bytomiu");
    assert_eq!(resp.intent, "find_nearby");
    assert!(resp.reply.contains("Bytomiu"));
    assert!(!resp.restaurants.is_empty());
    assert!(resp.restaurants.len() <= 3);

    let session = engine.session_snapshot("sess_1_find01").unwrap();
    assert_eq!(
        session.expected_context,
        Some(ExpectedContext::SelectRestaurant)
    );
    // 1-based stable positions
    for (i, entry) in session.last_restaurants_list.iter().enumerate() {
        assert_eq!(entry.index, i + 1);
    }
    assert_eq!(session.last_location.as_deref(), Some("Bytomiu"));
}

#[test]
fn test_discovery_without_location_asks() {
    let (engine, _) = make_engine();
    let resp = turn(&engine, "sess_1_find02", "jestem głodny");
    assert_eq!(resp.intent, "find_nearby");
    assert!(resp.reply.contains("Brak miasta"));

    // The bare city answer is understood as the location.
    let resp = turn(&engine, "sess_1_find02", "Bytom");
    assert_eq!(resp.intent, "find_nearby");
    assert!(!resp.restaurants.is_empty());
    assert_eq!(resp.meta.source, "rule_guard");
}

#[test]
fn test_discovery_cuisine_filter() {
    let (engine, _) = make_engine();
    let resp = turn(&engine, "sess_1_find03", "szukam azjatyckiej w Bytomiu");
    assert_eq!(resp.intent, "find_nearby");
    assert_eq!(resp.restaurants.len(), 1);
    assert_eq!(resp.restaurants[0].name, "Hanoi Pho");
}

#[test]
fn test_discovery_unknown_city_suggests_others() {
    let (engine, _) = make_engine();
    let resp = turn(&engine, "sess_1_find04", "gdzie zjeść w Gdańsku");
    assert!(resp.reply.contains("niczego nie znalazłam"));
    assert!(resp.reply.contains("Bytom"));
}

// --- Selection and menu ---

#[test]
fn test_select_by_number_then_menu() {
    let (engine, _) = make_engine();
    turn(&engine, "sess_1_sel01", "gdzie zjeść w Bytomiu");
    let resp = turn(&engine, "sess_1_sel01", "1");
    assert_eq!(resp.intent, "select_restaurant");
    assert!(resp.reply.contains("Wybrałaś"));

    let session = engine.session_snapshot("sess_1_sel01").unwrap();
    let current = session.current_restaurant.unwrap();
    assert_eq!(session.locked_restaurant_id.as_deref(), Some(current.id.as_str()));

    let resp = turn(&engine, "sess_1_sel01", "pokaż menu");
    assert_eq!(resp.intent, "menu_request");
    assert!(!resp.menu_items.is_empty());
    assert!(resp.menu_items.len() <= 6);
}

#[test]
fn test_menu_filters_banned_categories() {
    let (engine, _) = make_engine();
    with_session(&engine, "sess_1_menu01", |s| {
        s.current_restaurant = Some(crate::types::RestaurantRef {
            id: "1".to_string(),
            name: "Bar Praha".to_string(),
            city: "Bytom".to_string(),
        });
    });
    let resp = turn(&engine, "sess_1_menu01", "pokaż menu");
    assert!(resp.menu_items.iter().all(|i| i.category != "napoje"));
    assert!(!resp.menu_items.iter().any(|i| i.name == "Kompot"));

    let session = engine.session_snapshot("sess_1_menu01").unwrap();
    assert_eq!(session.expected_context, Some(ExpectedContext::MenuOrOrder));
    assert!(session.last_menu.is_some());
}

#[test]
fn test_unknown_input_falls_back() {
    let (engine, _) = make_engine();
    let resp = turn(&engine, "sess_1_unk01", "jaka jest pogoda w grudniu");
    assert_eq!(resp.intent, "unknown");
    assert!(!resp.reply.is_empty());
    assert_eq!(resp.meta.source, "fallback");
}

#[test]
fn test_auto_menu_on_show_verb() {
    let (engine, _) = make_engine();
    turn(&engine, "sess_1_auto1", "gdzie zjeść w Bytomiu");
    turn(&engine, "sess_1_auto1", "1");

    let resp = turn(&engine, "sess_1_auto1", "pokaż Bar Praha");
    assert_eq!(resp.intent, "menu_request");
    assert!(!resp.menu_items.is_empty());
}
