//! Embedded demo catalog: a few restaurants around Bytom and Katowice with
//! small menus, enough to exercise every dialog path from the terminal.

use std::path::Path;
use std::sync::Arc;

use kelner_core::catalog::{MenuItem, Restaurant, StaticCatalog};
use kelner_core::orders::{JournalOrderStore, MemoryOrderStore, OrderStore};
use kelner_session::DialogEngine;

fn restaurant(
    id: &str,
    name: &str,
    aliases: &[&str],
    city: &str,
    cuisine: &str,
    lat: f64,
    lng: f64,
    min_order: f64,
) -> Restaurant {
    Restaurant {
        id: id.to_string(),
        name: name.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        city: city.to_string(),
        cuisine: cuisine.to_string(),
        lat,
        lng,
        is_open: true,
        min_order_pln: min_order,
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

pub fn demo_catalog() -> Arc<StaticCatalog> {
    Arc::new(StaticCatalog::new(
        vec![
            restaurant("r1", "Bar Praha", &["praha"], "Bytom", "Polska", 50.348, 18.915, 0.0),
            restaurant("r2", "Tasty King", &[], "Bytom", "Kebab", 50.351, 18.923, 25.0),
            restaurant("r3", "Hanoi Pho", &["pho"], "Bytom", "Wietnamska", 50.346, 18.909, 0.0),
            restaurant(
                "r4",
                "Pizzeria Roma",
                &["roma"],
                "Katowice",
                "Pizzeria",
                50.259,
                19.021,
                30.0,
            ),
            restaurant("r5", "Sushi Yama", &["yama"], "Katowice", "Sushi", 50.264, 19.027, 40.0),
        ],
        vec![
            item("m01", "r1", "Pierogi ruskie", 24.0, "dania główne"),
            item("m02", "r1", "Żurek z jajkiem", 16.0, "zupy"),
            item("m03", "r1", "Schabowy z ziemniakami", 32.0, "dania główne"),
            item("m04", "r1", "Kompot", 6.0, "napoje"),
            item("m05", "r2", "Kebab w bułce", 22.0, "dania główne"),
            item("m06", "r2", "Kebab na talerzu", 28.0, "dania główne"),
            item("m07", "r2", "Frytki", 8.0, "dodatki"),
            item("m08", "r3", "Pho Bo", 29.0, "zupy"),
            item("m09", "r3", "Nem sajgonki", 18.0, "przystawki"),
            item("m10", "r4", "Pizza Margherita", 26.0, "pizza"),
            item("m11", "r4", "Pizza Hawajska", 29.0, "pizza"),
            item("m12", "r4", "Lasagne", 31.0, "dania główne"),
            item("m13", "r5", "Zestaw nigiri", 45.0, "sushi"),
            item("m14", "r5", "Pizza Margherita", 27.0, "pizza"),
        ],
    ))
}

/// Engine over the demo catalog. With `orders_path`, confirmed orders land
/// in a JSONL journal that survives restarts; otherwise they stay in memory.
pub fn demo_engine(orders_path: Option<&Path>) -> std::io::Result<DialogEngine> {
    let orders: Arc<dyn OrderStore> = match orders_path {
        Some(path) => Arc::new(
            JournalOrderStore::open(path)
                .map_err(|e| std::io::Error::other(e.to_string()))?,
        ),
        None => Arc::new(MemoryOrderStore::new()),
    };
    Ok(DialogEngine::new(demo_catalog(), orders))
}
