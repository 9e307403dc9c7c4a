//! TTL memoization for repository discovery queries.
//!
//! Wraps the user catalog so repeated `search_restaurants` calls within the
//! TTL window (same city + cuisine filter) skip the repository. Menu and
//! text lookups pass through untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use kelner_core::catalog::{Catalog, CatalogError, MenuItem, Restaurant};
use kelner_core::cuisine::CuisineFilter;
use kelner_core::settings::settings;
use kelner_core::text::normalize;

pub(crate) struct CachedCatalog {
    inner: Arc<dyn Catalog>,
    cache: Mutex<HashMap<String, (Instant, Vec<Restaurant>)>>,
}

impl CachedCatalog {
    pub(crate) fn new(inner: Arc<dyn Catalog>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn key(city: &str, cuisine: Option<&CuisineFilter>) -> String {
        let cuisine_part = match cuisine {
            None => String::new(),
            Some(CuisineFilter::Eq(label)) => normalize(label),
            Some(CuisineFilter::In(labels)) => {
                let mut parts: Vec<String> = labels.iter().map(|l| normalize(l)).collect();
                parts.sort();
                parts.join("+")
            }
        };
        format!("{}|{}", normalize(city), cuisine_part)
    }

    fn ttl() -> Duration {
        Duration::from_millis(settings().timeouts.location_cache_ttl_ms)
    }
}

impl Catalog for CachedCatalog {
    fn search_restaurants(
        &self,
        city: &str,
        cuisine: Option<&CuisineFilter>,
    ) -> Result<Vec<Restaurant>, CatalogError> {
        let key = Self::key(city, cuisine);
        if let Ok(cache) = self.cache.lock() {
            if let Some((at, hit)) = cache.get(&key) {
                if at.elapsed() < Self::ttl() {
                    return Ok(hit.clone());
                }
            }
        }

        let fresh = self.inner.search_restaurants(city, cuisine)?;
        if let Ok(mut cache) = self.cache.lock() {
            // Drop stale entries opportunistically; the key space is tiny.
            cache.retain(|_, (at, _)| at.elapsed() < Self::ttl());
            cache.insert(key, (Instant::now(), fresh.clone()));
        }
        Ok(fresh)
    }

    fn get_menu(
        &self,
        restaurant_id: &str,
        only_available: bool,
    ) -> Result<Vec<MenuItem>, CatalogError> {
        self.inner.get_menu(restaurant_id, only_available)
    }

    fn all_restaurants(&self) -> Vec<Restaurant> {
        self.inner.all_restaurants()
    }

    fn find_by_text(&self, text: &str) -> Option<Restaurant> {
        self.inner.find_by_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCatalog {
        hits: AtomicUsize,
    }

    impl Catalog for CountingCatalog {
        fn search_restaurants(
            &self,
            _city: &str,
            _cuisine: Option<&CuisineFilter>,
        ) -> Result<Vec<Restaurant>, CatalogError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }

        fn get_menu(
            &self,
            _restaurant_id: &str,
            _only_available: bool,
        ) -> Result<Vec<MenuItem>, CatalogError> {
            Ok(vec![])
        }

        fn all_restaurants(&self) -> Vec<Restaurant> {
            vec![]
        }
    }

    #[test]
    fn test_repeat_search_hits_cache() {
        let inner = Arc::new(CountingCatalog {
            hits: AtomicUsize::new(0),
        });
        let cached = CachedCatalog::new(inner.clone());

        cached.search_restaurants("Bytom", None).unwrap();
        cached.search_restaurants("bytom", None).unwrap();
        cached.search_restaurants("Bytom ", None).unwrap();
        assert_eq!(inner.hits.load(Ordering::SeqCst), 1);

        // Different cuisine filter is a different key.
        let filter = CuisineFilter::Eq("Kebab".to_string());
        cached.search_restaurants("Bytom", Some(&filter)).unwrap();
        assert_eq!(inner.hits.load(Ordering::SeqCst), 2);
    }
}
