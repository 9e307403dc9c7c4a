//! Surface renderer: structured facts → deterministic Polish reply text.
//!
//! No network, no state. Every user-visible template lives here so the
//! dialog layer only decides *which* surface to show.

use serde::{Deserialize, Serialize};

use crate::text::{plural_pl, PluralForms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurfaceKey {
    AskLocation,
    ChooseRestaurant,
    AskRestaurantForMenu,
    AskRestaurantForOrder,
    ItemNotFound,
    ClarifyItems,
    ConfirmAdd,
    Error,
}

impl SurfaceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceKey::AskLocation => "ASK_LOCATION",
            SurfaceKey::ChooseRestaurant => "CHOOSE_RESTAURANT",
            SurfaceKey::AskRestaurantForMenu => "ASK_RESTAURANT_FOR_MENU",
            SurfaceKey::AskRestaurantForOrder => "ASK_RESTAURANT_FOR_ORDER",
            SurfaceKey::ItemNotFound => "ITEM_NOT_FOUND",
            SurfaceKey::ClarifyItems => "CLARIFY_ITEMS",
            SurfaceKey::ConfirmAdd => "CONFIRM_ADD",
            SurfaceKey::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFact {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default = "one")]
    pub qty: u32,
}

fn one() -> u32 {
    1
}

/// Snapshot of everything a template may mention. Unused fields are ignored
/// by the selected template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facts {
    pub city: Option<String>,
    pub dish: Option<String>,
    pub unknown_item: Option<String>,
    pub restaurant_name: Option<String>,
    pub restaurants: Vec<String>,
    pub items: Vec<ItemFact>,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiHints {
    pub show_list: bool,
    pub expect_choice: bool,
    pub expect_confirmation: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub reply: String,
    pub ui_hints: UiHints,
}

/// Format PLN with a Polish decimal comma: 24.5 → "24,50 zł".
pub fn format_pln(amount: f64) -> String {
    format!("{amount:.2} zł").replace('.', ",")
}

fn numbered_list(names: &[String]) -> String {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {}", i + 1, name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render one surface. Deterministic and offline.
pub fn render(key: SurfaceKey, facts: &Facts) -> Rendered {
    match key {
        SurfaceKey::AskLocation => {
            let reply = match &facts.dish {
                Some(dish) => format!(
                    "Brak miasta – powiedz mi miasto (np. Bytom) lub 'w pobliżu', a znajdę {dish}."
                ),
                None => "Brak miasta – powiedz mi miasto (np. Bytom) lub 'w pobliżu'.".to_string(),
            };
            Rendered {
                reply,
                ui_hints: UiHints::default(),
            }
        }

        SurfaceKey::ChooseRestaurant => {
            let n = facts.restaurants.len();
            let noun = plural_pl(
                n as u64,
                PluralForms {
                    one: "miejsce",
                    few: "miejsca",
                    many: "miejsc",
                },
            );
            let city = facts.city.as_deref().unwrap_or("okolicy");
            Rendered {
                reply: format!(
                    "W {city} mam {n} {noun}: {}. Którą wybierasz?",
                    numbered_list(&facts.restaurants)
                ),
                ui_hints: UiHints {
                    show_list: true,
                    expect_choice: true,
                    expect_confirmation: false,
                },
            }
        }

        SurfaceKey::AskRestaurantForMenu => Rendered {
            reply: format!(
                "Z której restauracji pokazać menu? {}",
                numbered_list(&facts.restaurants)
            ),
            ui_hints: UiHints {
                show_list: true,
                expect_choice: true,
                expect_confirmation: false,
            },
        },

        SurfaceKey::AskRestaurantForOrder => {
            let reply = match &facts.dish {
                Some(dish) => format!(
                    "W której restauracji zamówić {dish}? {}",
                    numbered_list(&facts.restaurants)
                ),
                None => format!(
                    "W której restauracji złożyć zamówienie? {}",
                    numbered_list(&facts.restaurants)
                ),
            };
            Rendered {
                reply,
                ui_hints: UiHints {
                    show_list: true,
                    expect_choice: true,
                    expect_confirmation: false,
                },
            }
        }

        SurfaceKey::ItemNotFound => {
            let item = facts.unknown_item.as_deref().unwrap_or("ta pozycja");
            let reply = match &facts.restaurant_name {
                Some(name) => format!(
                    "Nie znalazłam pozycji \"{item}\" w {name}. Powiedz to inaczej albo poproś o menu."
                ),
                None => format!(
                    "Nie znalazłam pozycji \"{item}\". Powiedz to inaczej albo poproś o menu."
                ),
            };
            Rendered {
                reply,
                ui_hints: UiHints::default(),
            }
        }

        SurfaceKey::ClarifyItems => {
            let mut bases: Vec<(String, Vec<&ItemFact>)> = Vec::new();
            for item in &facts.items {
                match bases.iter_mut().find(|(name, _)| *name == item.name) {
                    Some((_, variants)) => variants.push(item),
                    None => bases.push((item.name.clone(), vec![item])),
                }
            }
            let listed = bases
                .iter()
                .map(|(name, variants)| {
                    let options = variants
                        .iter()
                        .map(|v| match &v.size {
                            Some(size) => format!("{size} {}", format_pln(v.price)),
                            None => format_pln(v.price),
                        })
                        .collect::<Vec<_>>()
                        .join(" / ");
                    format!("{name}: {options}")
                })
                .collect::<Vec<_>>()
                .join("; ");
            Rendered {
                reply: format!("Mam kilka opcji – {listed}. Którą wybierasz?"),
                ui_hints: UiHints {
                    show_list: true,
                    expect_choice: true,
                    expect_confirmation: false,
                },
            }
        }

        SurfaceKey::ConfirmAdd => {
            let items = facts
                .items
                .iter()
                .map(|i| {
                    if i.qty > 1 {
                        format!("{}× {}", i.qty, i.name)
                    } else {
                        i.name.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            let total = format_pln(facts.total.unwrap_or_else(|| {
                facts.items.iter().map(|i| i.price * i.qty as f64).sum()
            }));
            Rendered {
                reply: format!("Dodałam {items}. Razem {total}. Potwierdzasz? (tak/nie)"),
                ui_hints: UiHints {
                    show_list: false,
                    expect_choice: false,
                    expect_confirmation: true,
                },
            }
        }

        SurfaceKey::Error => Rendered {
            reply: "Przepraszam, coś poszło nie tak. Spróbuj jeszcze raz.".to_string(),
            ui_hints: UiHints::default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurants() -> Vec<String> {
        vec!["Bar Praha".to_string(), "Pizzeria Roma".to_string()]
    }

    #[test]
    fn test_ask_location() {
        let r = render(SurfaceKey::AskLocation, &Facts::default());
        assert!(r.reply.contains("Brak miasta"));
        assert!(r.reply.contains("Bytom"));

        let r = render(
            SurfaceKey::AskLocation,
            &Facts {
                dish: Some("kebab".to_string()),
                ..Facts::default()
            },
        );
        assert!(r.reply.contains("kebab"));
    }

    #[test]
    fn test_choose_restaurant_plural() {
        let r = render(
            SurfaceKey::ChooseRestaurant,
            &Facts {
                city: Some("Bytomiu".to_string()),
                restaurants: restaurants(),
                ..Facts::default()
            },
        );
        assert_eq!(
            r.reply,
            "W Bytomiu mam 2 miejsca: 1. Bar Praha, 2. Pizzeria Roma. Którą wybierasz?"
        );
        assert!(r.ui_hints.expect_choice);

        let r = render(
            SurfaceKey::ChooseRestaurant,
            &Facts {
                city: Some("Bytomiu".to_string()),
                restaurants: vec!["Bar Praha".to_string(); 5],
                ..Facts::default()
            },
        );
        assert!(r.reply.contains("5 miejsc:"));
    }

    #[test]
    fn test_ask_restaurant_surfaces_keep_dish() {
        let r = render(
            SurfaceKey::AskRestaurantForOrder,
            &Facts {
                dish: Some("kebab".to_string()),
                restaurants: restaurants(),
                ..Facts::default()
            },
        );
        assert!(r.reply.contains("kebab"));
        assert!(r.reply.contains("1. Bar Praha"));
        assert!(r.reply.contains("2. Pizzeria Roma"));

        let r = render(
            SurfaceKey::AskRestaurantForMenu,
            &Facts {
                restaurants: restaurants(),
                ..Facts::default()
            },
        );
        assert!(r.reply.contains("menu"));
        assert!(r.reply.contains("2. Pizzeria Roma"));
    }

    #[test]
    fn test_item_not_found() {
        let r = render(
            SurfaceKey::ItemNotFound,
            &Facts {
                unknown_item: Some("ramen".to_string()),
                restaurant_name: Some("Bar Praha".to_string()),
                ..Facts::default()
            },
        );
        assert!(r.reply.contains("\"ramen\""));
        assert!(r.reply.contains("Bar Praha"));
    }

    #[test]
    fn test_clarify_items_groups_variants() {
        let r = render(
            SurfaceKey::ClarifyItems,
            &Facts {
                items: vec![
                    ItemFact {
                        name: "Pizza Margherita".to_string(),
                        price: 19.0,
                        size: Some("mała".to_string()),
                        qty: 1,
                    },
                    ItemFact {
                        name: "Pizza Margherita".to_string(),
                        price: 25.0,
                        size: Some("duża".to_string()),
                        qty: 1,
                    },
                ],
                ..Facts::default()
            },
        );
        assert!(r.reply.contains("Pizza Margherita: mała 19,00 zł / duża 25,00 zł"));
    }

    #[test]
    fn test_confirm_add() {
        let r = render(
            SurfaceKey::ConfirmAdd,
            &Facts {
                items: vec![ItemFact {
                    name: "Pizza".to_string(),
                    price: 25.0,
                    size: None,
                    qty: 2,
                }],
                total: Some(50.0),
                ..Facts::default()
            },
        );
        assert_eq!(r.reply, "Dodałam 2× Pizza. Razem 50,00 zł. Potwierdzasz? (tak/nie)");
        assert!(r.ui_hints.expect_confirmation);
    }

    #[test]
    fn test_format_pln() {
        assert_eq!(format_pln(6.5), "6,50 zł");
        assert_eq!(format_pln(120.0), "120,00 zł");
    }
}
