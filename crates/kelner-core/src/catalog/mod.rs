//! Restaurant catalog: static records and the repository trait.
//!
//! `StaticCatalog` is the in-memory index built at boot. External stores
//! (SQL, HTTP) plug in behind the same `Catalog` trait.

mod static_index;

pub use static_index::StaticCatalog;

use serde::{Deserialize, Serialize};

use crate::cuisine::CuisineFilter;
use crate::text::normalize;

/// Unified error type for repository queries.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("restaurant not found: {0}")]
    RestaurantNotFound(String),

    #[error("menu not found for restaurant {0}")]
    MenuNotFound(String),

    #[error("repository query failed: {0}")]
    Query(String),

    #[error("repository query timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub city: String,
    pub cuisine: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_true")]
    pub is_open: bool,
    #[serde(default)]
    pub min_order_pln: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub restaurant_id: String,
    pub name: String,
    /// PLN.
    pub price: f64,
    pub category: String,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub extras: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Repository contract for restaurant and menu lookups.
pub trait Catalog: Send + Sync {
    /// Case-insensitive substring match on city; cuisine is an optional
    /// `Eq` or `In` filter.
    fn search_restaurants(
        &self,
        city: &str,
        cuisine: Option<&CuisineFilter>,
    ) -> Result<Vec<Restaurant>, CatalogError>;

    fn get_menu(
        &self,
        restaurant_id: &str,
        only_available: bool,
    ) -> Result<Vec<MenuItem>, CatalogError>;

    fn all_restaurants(&self) -> Vec<Restaurant>;

    /// Bind free text to a known restaurant.
    ///
    /// Word-boundary match on the main name first, then aliases; candidates
    /// are tried longest name first so "Pizzeria Roma Express" wins over
    /// "Pizzeria Roma". Substrings crossing word boundaries never match.
    fn find_by_text(&self, text: &str) -> Option<Restaurant> {
        let text_n = normalize(text);
        if text_n.is_empty() {
            return None;
        }
        let mut restaurants = self.all_restaurants();
        restaurants.sort_by_key(|r| std::cmp::Reverse(normalize(&r.name).len()));

        for by_alias in [false, true] {
            for r in &restaurants {
                let needles: Vec<String> = if by_alias {
                    r.aliases.iter().map(|a| normalize(a)).collect()
                } else {
                    vec![normalize(&r.name)]
                };
                for needle in needles {
                    if needle.is_empty() {
                        continue;
                    }
                    let pattern = format!(r"\b{}\b", regex::escape(&needle));
                    if let Ok(re) = regex::Regex::new(&pattern) {
                        if re.is_match(&text_n) {
                            return Some(r.clone());
                        }
                    }
                }
            }
        }
        None
    }
}

/// Loose city comparison for discovery queries.
///
/// Plain substring both ways first, then a per-token prefix overlap that
/// covers Polish case inflection: "Bytomiu" finds "Bytom", "Katowicach"
/// finds "Katowice". A token matches when it shares at least three leading
/// characters with the stored name and covers it up to two trailing ones.
pub fn city_matches(stored: &str, query: &str) -> bool {
    let stored_n = normalize(stored);
    let query_n = normalize(query);
    if stored_n.is_empty() || query_n.is_empty() {
        return false;
    }
    if stored_n.contains(&query_n) || query_n.contains(&stored_n) {
        return true;
    }
    let stored_len = stored_n.chars().count();
    crate::text::tokenize(&query_n).iter().any(|token| {
        let common = stored_n
            .chars()
            .zip(token.chars())
            .take_while(|(a, b)| a == b)
            .count();
        common >= 3 && common + 2 >= stored_len
    })
}

/// Great-circle distance in metres. Used only for the optional `distance`
/// field on discovery results.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_R_M: f64 = 6_371_000.0;
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lng2 - lng1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_R_M * a.sqrt().atan2((1.0 - a).sqrt())
}
