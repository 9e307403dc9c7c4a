//! In-memory catalog built once at boot.

use std::collections::HashMap;

use crate::cuisine::CuisineFilter;
use crate::text::normalize;

use super::{Catalog, CatalogError, MenuItem, Restaurant};

pub struct StaticCatalog {
    restaurants: Vec<Restaurant>,
    menus: HashMap<String, Vec<MenuItem>>,
}

impl StaticCatalog {
    pub fn new(restaurants: Vec<Restaurant>, items: Vec<MenuItem>) -> Self {
        let mut menus: HashMap<String, Vec<MenuItem>> = HashMap::new();
        for item in items {
            menus.entry(item.restaurant_id.clone()).or_default().push(item);
        }
        Self { restaurants, menus }
    }

    pub fn restaurant(&self, id: &str) -> Option<&Restaurant> {
        self.restaurants.iter().find(|r| r.id == id)
    }

    /// Cities present in the catalog, deduplicated, insertion order.
    pub fn cities(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for r in &self.restaurants {
            if !seen.iter().any(|c: &String| normalize(c) == normalize(&r.city)) {
                seen.push(r.city.clone());
            }
        }
        seen
    }
}

impl Catalog for StaticCatalog {
    fn search_restaurants(
        &self,
        city: &str,
        cuisine: Option<&CuisineFilter>,
    ) -> Result<Vec<Restaurant>, CatalogError> {
        let hits = self
            .restaurants
            .iter()
            .filter(|r| super::city_matches(&r.city, city))
            .filter(|r| cuisine.map_or(true, |f| f.matches(&r.cuisine)))
            .cloned()
            .collect();
        Ok(hits)
    }

    fn get_menu(
        &self,
        restaurant_id: &str,
        only_available: bool,
    ) -> Result<Vec<MenuItem>, CatalogError> {
        let items = self
            .menus
            .get(restaurant_id)
            .ok_or_else(|| CatalogError::MenuNotFound(restaurant_id.to_string()))?;
        Ok(items
            .iter()
            .filter(|i| !only_available || i.available)
            .cloned()
            .collect())
    }

    fn all_restaurants(&self) -> Vec<Restaurant> {
        self.restaurants.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(id: &str, name: &str, city: &str, cuisine: &str) -> Restaurant {
        Restaurant {
            id: id.to_string(),
            name: name.to_string(),
            aliases: vec![],
            city: city.to_string(),
            cuisine: cuisine.to_string(),
            lat: 0.0,
            lng: 0.0,
            is_open: true,
            min_order_pln: 0.0,
        }
    }

    fn item(id: &str, rid: &str, name: &str, available: bool) -> MenuItem {
        MenuItem {
            id: id.to_string(),
            restaurant_id: rid.to_string(),
            name: name.to_string(),
            price: 20.0,
            category: "dania główne".to_string(),
            available,
            size: None,
            extras: vec![],
        }
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(
            vec![
                restaurant("1", "Bar Praha", "Bytom", "Polska"),
                restaurant("2", "Hanoi Pho", "Bytom", "Wietnamska"),
                restaurant("3", "Pizzeria Roma", "Katowice", "Pizzeria"),
            ],
            vec![
                item("m1", "1", "Pierogi ruskie", true),
                item("m2", "1", "Zupa dnia", false),
            ],
        )
    }

    #[test]
    fn test_search_by_city_substring() {
        let c = catalog();
        let hits = c.search_restaurants("byto", None).unwrap();
        assert_eq!(hits.len(), 2);
        let hits = c.search_restaurants("Katowice", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "3");
    }

    #[test]
    fn test_search_matches_inflected_city() {
        let c = catalog();
        let hits = c.search_restaurants("Bytomiu", None).unwrap();
        assert_eq!(hits.len(), 2);
        let hits = c.search_restaurants("w Katowicach", None).unwrap();
        assert_eq!(hits.len(), 1);
        let hits = c.search_restaurants("Gdańsk", None).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_with_cuisine_filter() {
        let c = catalog();
        let f = CuisineFilter::In(vec!["Wietnamska".to_string(), "Tajska".to_string()]);
        let hits = c.search_restaurants("Bytom", Some(&f)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "2");
    }

    #[test]
    fn test_get_menu_filters_availability() {
        let c = catalog();
        assert_eq!(c.get_menu("1", false).unwrap().len(), 2);
        assert_eq!(c.get_menu("1", true).unwrap().len(), 1);
        assert!(matches!(
            c.get_menu("nope", true),
            Err(CatalogError::MenuNotFound(_))
        ));
    }

    #[test]
    fn test_cities() {
        let c = catalog();
        assert_eq!(c.cities(), vec!["Bytom".to_string(), "Katowice".to_string()]);
    }
}
