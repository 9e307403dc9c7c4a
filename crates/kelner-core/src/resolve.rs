//! Dish resolution and the order phrase parser.
//!
//! `resolve_dish` turns an utterance into one concrete menu item, or reports
//! why it cannot: unknown item, several variants inside one restaurant
//! (clarify), or the same dish across restaurants (disambiguate).

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogError, MenuItem, Restaurant};
use crate::text::{fuzzy_includes, normalize, parse_number_word_pl, tokenize};

#[derive(Debug, Clone)]
pub struct CandidateGroup {
    pub restaurant: Restaurant,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone)]
pub enum DishResolution {
    /// No menu item matched the query.
    NotFound,
    /// Exactly one item won.
    Single {
        restaurant: Restaurant,
        item: MenuItem,
    },
    /// Several variants within one restaurant (sizes, versions).
    Clarify {
        restaurant: Restaurant,
        items: Vec<MenuItem>,
    },
    /// The dish exists in more than one restaurant.
    Ambiguous { groups: Vec<CandidateGroup> },
}

/// Resolve a dish query against every restaurant's menu.
///
/// Zero matches → `NotFound`. One match → `Single`. Otherwise the current
/// restaurant context narrows the field, then an exact normalized name
/// equality wins if unique, and what remains is grouped per restaurant.
pub fn resolve_dish(
    catalog: &dyn Catalog,
    query: &str,
    current_restaurant_id: Option<&str>,
) -> Result<DishResolution, CatalogError> {
    let query_n = normalize(query);
    if query_n.is_empty() {
        return Ok(DishResolution::NotFound);
    }

    let mut matches: Vec<(Restaurant, MenuItem)> = Vec::new();
    for restaurant in catalog.all_restaurants() {
        let menu = match catalog.get_menu(&restaurant.id, true) {
            Ok(items) => items,
            Err(CatalogError::MenuNotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        for item in menu {
            if fuzzy_includes(&item.name, &query_n) {
                matches.push((restaurant.clone(), item));
            }
        }
    }

    if matches.is_empty() {
        return Ok(DishResolution::NotFound);
    }
    if matches.len() == 1 {
        let (restaurant, item) = matches.remove(0);
        return Ok(DishResolution::Single { restaurant, item });
    }

    // Current restaurant narrows the field.
    if let Some(rid) = current_restaurant_id {
        let mut local: Vec<(Restaurant, MenuItem)> = matches
            .iter()
            .filter(|(r, _)| r.id == rid)
            .cloned()
            .collect();
        if local.len() == 1 {
            let (restaurant, item) = local.remove(0);
            return Ok(DishResolution::Single { restaurant, item });
        }
        if local.len() > 1 {
            let restaurant = local[0].0.clone();
            return Ok(DishResolution::Clarify {
                restaurant,
                items: local.into_iter().map(|(_, i)| i).collect(),
            });
        }
    }

    // A single exact name equality wins over fuzzy matches.
    let exact: Vec<&(Restaurant, MenuItem)> = matches
        .iter()
        .filter(|(_, i)| normalize(&i.name) == query_n)
        .collect();
    if exact.len() == 1 {
        let (restaurant, item) = exact[0].clone();
        return Ok(DishResolution::Single { restaurant, item });
    }

    // Group remaining candidates per restaurant.
    let mut groups: Vec<CandidateGroup> = Vec::new();
    for (restaurant, item) in matches {
        match groups.iter_mut().find(|g| g.restaurant.id == restaurant.id) {
            Some(g) => g.items.push(item),
            None => groups.push(CandidateGroup {
                restaurant,
                items: vec![item],
            }),
        }
    }
    Ok(DishResolution::Ambiguous { groups })
}

// --- Order phrase parsing ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedLine {
    /// Dish phrase with verbs, counts and size words stripped.
    pub name: String,
    pub qty: u32,
    pub size: Option<String>,
    pub extras: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedOrder {
    /// True when the utterance means "anything" rather than a named dish.
    pub any: bool,
    pub groups: Vec<OrderGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderGroup {
    pub restaurant_id: Option<String>,
    pub restaurant_name: Option<String>,
    pub items: Vec<ParsedLine>,
}

const ORDER_VERBS: &[&str] = &[
    "zamawiam", "zamow", "poprosze", "prosze", "wezme", "biore", "dodaj",
    "chce", "chcialbym", "chcialabym", "wybieram", "daj", "dla", "mnie",
];

const ANY_PHRASES: &[&str] = &["cos", "cokolwiek", "obojetnie"];

/// Extract quantity, global size and global extras from an order utterance,
/// leaving the dish phrase.
pub fn parse_order_phrase(text: &str) -> ParsedLine {
    let tokens = tokenize(text);
    let mut qty: Option<u32> = None;
    let mut size: Option<String> = None;
    let mut extras: Vec<String> = Vec::new();
    let mut name_tokens: Vec<String> = Vec::new();

    let mut after_extras_marker = false;
    for token in &tokens {
        if after_extras_marker {
            extras.push(token.clone());
            after_extras_marker = false;
            continue;
        }
        if token == "z" || token == "ze" {
            after_extras_marker = true;
            continue;
        }
        if qty.is_none() {
            if let Ok(n) = token.parse::<u32>() {
                qty = Some(n);
                continue;
            }
            if let Some(n) = parse_number_word_pl(token) {
                qty = Some(n);
                continue;
            }
        }
        if size.is_none() && (token.starts_with("mal") || token.starts_with("duz")) {
            size = Some(if token.starts_with("mal") {
                "mała".to_string()
            } else {
                "duża".to_string()
            });
            continue;
        }
        if ORDER_VERBS.contains(&token.as_str()) {
            continue;
        }
        name_tokens.push(token.clone());
    }

    ParsedLine {
        name: name_tokens.join(" "),
        qty: qty.unwrap_or(1),
        size,
        extras,
    }
}

/// Parse a whole order utterance: restaurant binding plus one parsed line.
pub fn parse_order_utterance(catalog: &dyn Catalog, text: &str) -> ParsedOrder {
    let restaurant = catalog.find_by_text(text);
    let mut stripped = text.to_string();
    if let Some(ref r) = restaurant {
        // Remove the restaurant mention from the dish phrase.
        let text_n = normalize(text);
        let name_n = normalize(&r.name);
        stripped = text_n.replace(&name_n, " ");
        for alias in &r.aliases {
            stripped = stripped.replace(&normalize(alias), " ");
        }
    }
    let line = parse_order_phrase(&stripped);
    let any = line.name.is_empty()
        || tokenize(&line.name)
            .iter()
            .all(|t| ANY_PHRASES.contains(&t.as_str()));

    ParsedOrder {
        any,
        groups: vec![OrderGroup {
            restaurant_id: restaurant.as_ref().map(|r| r.id.clone()),
            restaurant_name: restaurant.map(|r| r.name),
            items: if any { vec![] } else { vec![line] },
        }],
    }
}
