//! Polish text normalization and grammar helpers.
//!
//! Everything downstream (NLU, catalog matching, dish resolution) compares
//! *normalized* forms: lowercased, diacritic-folded, whitespace-collapsed.
//! The raw input is kept only for display and proper-noun extraction.

/// Fold a single Polish letter to its ASCII base. Other characters pass through.
fn fold_char(c: char) -> char {
    match c {
        'ą' => 'a',
        'ć' => 'c',
        'ę' => 'e',
        'ł' => 'l',
        'ń' => 'n',
        'ó' => 'o',
        'ś' => 's',
        'ź' | 'ż' => 'z',
        _ => c,
    }
}

/// Lowercase, fold diacritics, collapse runs of whitespace to single spaces.
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(s: &str) -> String {
    let folded: String = s
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_char)
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split normalized text on word boundaries. Digits count as word characters
/// so "2 pizze" tokenizes to ["2", "pizze"].
pub fn tokenize(s: &str) -> Vec<String> {
    normalize(s)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Loose containment check used for dish and restaurant matching.
///
/// True when the normalized needle is a substring of the normalized hay, or
/// when the share of needle tokens present in hay reaches the configured
/// overlap threshold.
pub fn fuzzy_includes(hay: &str, needle: &str) -> bool {
    let hay_n = normalize(hay);
    let needle_n = normalize(needle);
    if needle_n.is_empty() {
        return false;
    }
    if hay_n.contains(&needle_n) {
        return true;
    }
    let hay_tokens = tokenize(&hay_n);
    let needle_tokens = tokenize(&needle_n);
    if needle_tokens.is_empty() {
        return false;
    }
    let hits = needle_tokens
        .iter()
        .filter(|t| hay_tokens.iter().any(|h| h == *t))
        .count();
    let overlap = hits as f64 / needle_tokens.len() as f64;
    overlap >= crate::settings::settings().nlu.fuzzy_overlap
}

/// The three Polish plural forms: 1 / 2-4 / everything else.
#[derive(Clone, Copy)]
pub struct PluralForms<'a> {
    pub one: &'a str,
    pub few: &'a str,
    pub many: &'a str,
}

/// Pick the Polish plural form for `n`.
///
/// 1 → one, 2-4 (except 12-14) → few, rest → many. So "1 miejsce",
/// "3 miejsca", "5 miejsc", "12 miejsc", "23 miejsca".
pub fn plural_pl<'a>(n: u64, forms: PluralForms<'a>) -> &'a str {
    if n == 1 {
        return forms.one;
    }
    let tens = n % 100;
    if (2..=4).contains(&(n % 10)) && !(12..=14).contains(&tens) {
        forms.few
    } else {
        forms.many
    }
}

/// Parse a Polish ordinal word ("pierwsza", "drugiego", "trzecią", …) into
/// its 1-based position. Matches on folded prefixes so inflected forms work.
pub fn parse_ordinal_pl(word: &str) -> Option<usize> {
    let w = normalize(word);
    let table: &[(&str, usize)] = &[
        ("pierwsz", 1),
        ("drug", 2),
        ("trzec", 3),
        ("czwart", 4),
        ("piat", 5),
        ("szost", 6),
        ("siodm", 7),
        ("osm", 8),
        ("dziewiat", 9),
        ("dziesiat", 10),
    ];
    table
        .iter()
        .find(|(prefix, _)| w.starts_with(prefix))
        .map(|&(_, n)| n)
}

/// Parse a Polish cardinal number word ("dwa", "pięć", …) up to ten.
pub fn parse_number_word_pl(word: &str) -> Option<u32> {
    let w = normalize(word);
    let table: &[(&str, u32)] = &[
        ("jeden", 1),
        ("jedna", 1),
        ("jedno", 1),
        ("jedne", 1),
        ("dwa", 2),
        ("dwie", 2),
        ("dwoch", 2),
        ("trzy", 3),
        ("cztery", 4),
        ("piec", 5),
        ("szesc", 6),
        ("siedem", 7),
        ("osiem", 8),
        ("dziewiec", 9),
        ("dziesiec", 10),
    ];
    table
        .iter()
        .find(|(form, _)| w == *form)
        .map(|&(_, n)| n)
}

/// Format a distance for display: metres under 1 km, otherwise km with one
/// decimal and a Polish decimal comma.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round() as i64)
    } else {
        format!("{:.1} km", meters / 1000.0).replace('.', ",")
    }
}

/// Spoken list intro for the n-th item (1-based): "Po pierwsze", "Po drugie", …
/// Returns `None` above ten; callers keep the digits in that case.
pub fn ordinal_intro_pl(n: usize) -> Option<&'static str> {
    match n {
        1 => Some("Po pierwsze"),
        2 => Some("Po drugie"),
        3 => Some("Po trzecie"),
        4 => Some("Po czwarte"),
        5 => Some("Po piąte"),
        6 => Some("Po szóste"),
        7 => Some("Po siódme"),
        8 => Some("Po ósme"),
        9 => Some("Po dziewiąte"),
        10 => Some("Po dziesiąte"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_diacritics() {
        assert_eq!(normalize("Żółć"), "zolc");
        assert_eq!(normalize("Pokaż   MENU "), "pokaz menu");
        assert_eq!(normalize("pięć dań"), "piec dan");
    }

    #[test]
    fn test_normalize_idempotent() {
        for s in ["Żółta łódź", "  a  b  ", "Kraków", ""] {
            assert_eq!(normalize(&normalize(s)), normalize(s));
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Zamawiam 2 pizze!"), vec!["zamawiam", "2", "pizze"]);
        assert_eq!(tokenize("  "), Vec::<String>::new());
    }

    #[test]
    fn test_fuzzy_includes_substring() {
        assert!(fuzzy_includes("Pizzeria Róża w Bytomiu", "roza"));
        assert!(fuzzy_includes("pizza margherita", "Margherita"));
        assert!(!fuzzy_includes("Bar Praha", "sushi"));
    }

    #[test]
    fn test_fuzzy_includes_token_overlap() {
        assert!(fuzzy_includes("duża pizza margherita na cienkim", "margherita pizza"));
        assert!(!fuzzy_includes("kebab w bułce", "pizza hawajska"));
    }

    #[test]
    fn test_plural_pl() {
        let forms = PluralForms {
            one: "miejsce",
            few: "miejsca",
            many: "miejsc",
        };
        assert_eq!(plural_pl(1, forms), "miejsce");
        assert_eq!(plural_pl(3, forms), "miejsca");
        assert_eq!(plural_pl(5, forms), "miejsc");
        assert_eq!(plural_pl(12, forms), "miejsc");
        assert_eq!(plural_pl(22, forms), "miejsca");
    }

    #[test]
    fn test_parse_ordinal_pl() {
        assert_eq!(parse_ordinal_pl("pierwsza"), Some(1));
        assert_eq!(parse_ordinal_pl("Drugiego"), Some(2));
        assert_eq!(parse_ordinal_pl("trzecią"), Some(3));
        assert_eq!(parse_ordinal_pl("piąty"), Some(5));
        assert_eq!(parse_ordinal_pl("ósma"), Some(8));
        assert_eq!(parse_ordinal_pl("dziesiąta"), Some(10));
        assert_eq!(parse_ordinal_pl("kebab"), None);
    }

    #[test]
    fn test_parse_number_word_pl() {
        assert_eq!(parse_number_word_pl("dwa"), Some(2));
        assert_eq!(parse_number_word_pl("dwie"), Some(2));
        assert_eq!(parse_number_word_pl("pięć"), Some(5));
        assert_eq!(parse_number_word_pl("dziesięć"), Some(10));
        assert_eq!(parse_number_word_pl("sto"), None);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(350.0), "350 m");
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(1250.0), "1,2 km");
        assert_eq!(format_distance(12000.0), "12,0 km");
    }

    #[test]
    fn test_ordinal_intro() {
        assert_eq!(ordinal_intro_pl(1), Some("Po pierwsze"));
        assert_eq!(ordinal_intro_pl(10), Some("Po dziesiąte"));
        assert_eq!(ordinal_intro_pl(11), None);
    }
}
