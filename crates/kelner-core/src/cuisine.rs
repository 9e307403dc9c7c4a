//! Cuisine lexicon: maps user vocabulary to catalog cuisine labels.
//!
//! A single user word may expand to several catalog cuisines ("azjatyckie"
//! covers Vietnamese, Chinese and Thai); the repository layer turns the
//! expansion into an `IN` filter.

use crate::text::normalize;

/// Repository-side cuisine filter: one label or a set of labels.
#[derive(Debug, Clone, PartialEq)]
pub enum CuisineFilter {
    Eq(String),
    In(Vec<String>),
}

impl CuisineFilter {
    pub fn matches(&self, cuisine: &str) -> bool {
        let c = normalize(cuisine);
        match self {
            CuisineFilter::Eq(label) => normalize(label) == c,
            CuisineFilter::In(labels) => labels.iter().any(|l| normalize(l) == c),
        }
    }
}

/// Alias → catalog labels. Folded forms, so both "azjatycka" and
/// "azjatyckie" land on the same row via prefix match.
const EXPANSIONS: &[(&str, &[&str])] = &[
    ("azjatyck", &["Wietnamska", "Chińska", "Tajska"]),
    ("orientaln", &["Wietnamska", "Chińska", "Tajska"]),
    ("wloska", &["Włoska", "Pizzeria"]),
    ("wloski", &["Włoska", "Pizzeria"]),
    ("fastfood", &["Burgery", "Kebab"]),
    ("fast food", &["Burgery", "Kebab"]),
];

/// Direct single-label vocabulary. The user word already names one cuisine.
const DIRECT: &[(&str, &str)] = &[
    ("pizza", "Pizzeria"),
    ("pizze", "Pizzeria"),
    ("pizzeri", "Pizzeria"),
    ("kebab", "Kebab"),
    ("burger", "Burgery"),
    ("sushi", "Sushi"),
    ("wietnamsk", "Wietnamska"),
    ("chinsk", "Chińska"),
    ("tajsk", "Tajska"),
    ("polsk", "Polska"),
    ("indyjsk", "Indyjska"),
    ("wegansk", "Wegańska"),
];

/// Resolve a user cuisine word to a repository filter.
///
/// Alias expansions win over direct labels; unknown words yield `None`
/// rather than guessing an `Eq` filter that would empty the result set.
pub fn expand_cuisine(word: &str) -> Option<CuisineFilter> {
    let w = normalize(word);
    if w.is_empty() {
        return None;
    }
    for (prefix, labels) in EXPANSIONS {
        if w.starts_with(prefix) {
            return Some(CuisineFilter::In(
                labels.iter().map(|l| l.to_string()).collect(),
            ));
        }
    }
    for (prefix, label) in DIRECT {
        if w.starts_with(prefix) {
            return Some(CuisineFilter::Eq(label.to_string()));
        }
    }
    None
}

/// Generic dish vocabulary used to tell "name a restaurant" apart from
/// "name a restaurant and a dish" in catalog-match NLU.
const DISH_WORDS: &[&str] = &[
    "pizza", "pizze", "pizzy", "kebab", "kebaba", "kebaby", "burger",
    "burgera", "burgery", "sushi", "zupa", "zupe", "salatka", "salatke",
    "makaron", "frytki", "kurczak", "kurczaka", "pierogi", "nalesniki",
    "tortilla",
];

/// True when the utterance mentions a generic dish word.
pub fn mentions_dish(text: &str) -> bool {
    crate::text::tokenize(text)
        .iter()
        .any(|t| DISH_WORDS.contains(&t.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_alias_to_set() {
        let f = expand_cuisine("azjatyckie").unwrap();
        assert_eq!(
            f,
            CuisineFilter::In(vec![
                "Wietnamska".to_string(),
                "Chińska".to_string(),
                "Tajska".to_string()
            ])
        );
        assert!(f.matches("chińska"));
        assert!(!f.matches("Polska"));
    }

    #[test]
    fn test_expand_direct() {
        assert_eq!(
            expand_cuisine("Pizzeria"),
            Some(CuisineFilter::Eq("Pizzeria".to_string()))
        );
        assert_eq!(
            expand_cuisine("wietnamskiej"),
            Some(CuisineFilter::Eq("Wietnamska".to_string()))
        );
    }

    #[test]
    fn test_expand_unknown() {
        assert_eq!(expand_cuisine("szybkie"), None);
        assert_eq!(expand_cuisine(""), None);
    }

    #[test]
    fn test_mentions_dish() {
        assert!(mentions_dish("Bar Praha i dwa kebaby"));
        assert!(mentions_dish("chcę pizzę w Bytomiu"));
        assert!(mentions_dish("duza pizza"));
        assert!(!mentions_dish("Bar Praha"));
    }
}
