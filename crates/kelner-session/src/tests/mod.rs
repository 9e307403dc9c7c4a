mod basic;

use std::sync::Arc;

use kelner_core::catalog::{MenuItem, Restaurant, StaticCatalog};
use kelner_core::orders::{MemoryOrderStore, OrderStore};

use crate::types::{ListedRestaurant, TurnRequest, TurnResponse};
use crate::DialogEngine;

fn restaurant(id: &str, name: &str, city: &str, cuisine: &str, aliases: &[&str]) -> Restaurant {
    Restaurant {
        id: id.to_string(),
        name: name.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        city: city.to_string(),
        cuisine: cuisine.to_string(),
        lat: 50.34 + id.len() as f64 * 0.01,
        lng: 18.91,
        is_open: true,
        min_order_pln: 0.0,
    }
}

fn item(id: &str, rid: &str, name: &str, price: f64, category: &str) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        restaurant_id: rid.to_string(),
        name: name.to_string(),
        price,
        category: category.to_string(),
        available: true,
        size: None,
        extras: vec![],
    }
}

pub(super) fn make_test_catalog() -> Arc<StaticCatalog> {
    Arc::new(StaticCatalog::new(
        vec![
            restaurant("1", "Bar Praha", "Bytom", "Polska", &["praha"]),
            restaurant("2", "Tasty King", "Bytom", "Kebab", &[]),
            restaurant("3", "Pizzeria Roma", "Katowice", "Pizzeria", &["roma"]),
            restaurant("4", "Hanoi Pho", "Bytom", "Wietnamska", &[]),
        ],
        vec![
            item("m1", "1", "Pierogi ruskie", 24.0, "dania główne"),
            item("m2", "1", "Pizza Margherita", 25.0, "pizza"),
            item("m3", "1", "Kompot", 6.0, "napoje"),
            item("m4", "1", "Zupa dnia", 12.0, "zupy"),
            item("m5", "2", "Kebab", 22.0, "dania główne"),
            item("m6", "2", "Pizza Margherita", 26.0, "pizza"),
            item("m7", "2", "Frytki", 8.0, "dodatki"),
            item("m8", "3", "Pizza Hawajska", 28.0, "pizza"),
            item("m9", "3", "Lasagne", 30.0, "dania główne"),
            item("m10", "4", "Pho Bo", 29.0, "zupy"),
        ],
    ))
}

pub(super) fn make_engine() -> (DialogEngine, Arc<MemoryOrderStore>) {
    let orders = Arc::new(MemoryOrderStore::new());
    let engine = DialogEngine::new(make_test_catalog(), orders.clone());
    (engine, orders)
}

/// Run one text turn against a named session.
pub(super) fn turn(engine: &DialogEngine, session_id: &str, input: &str) -> TurnResponse {
    engine.handle_turn(TurnRequest::text(input, Some(session_id)))
}

pub(super) fn listed(entries: &[(&str, &str)]) -> Vec<ListedRestaurant> {
    entries
        .iter()
        .enumerate()
        .map(|(i, (id, name))| ListedRestaurant {
            index: i + 1,
            id: id.to_string(),
            name: name.to_string(),
            city: "Bytom".to_string(),
        })
        .collect()
}

/// Seed session state directly through the store.
pub(super) fn with_session<F>(engine: &DialogEngine, session_id: &str, f: F)
where
    F: FnOnce(&mut crate::types::Session),
{
    let res = engine.store().get_or_create_active(Some(session_id));
    let mut guard = res.session.lock().unwrap();
    f(&mut guard);
}
