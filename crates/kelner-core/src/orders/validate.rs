//! Pre-cart and pre-checkout validation against the catalog.

use crate::catalog::Catalog;
use crate::settings::settings;

use super::{CartLine, OrderError, OrderWarning};

/// Validate one line before it enters the pending order.
///
/// Quantity below 1 is auto-fixed to 1; above the limit is a hard error.
/// The item must exist in the restaurant's menu and be available. When the
/// catalog price drifted from the requested one, the catalog price is
/// adopted, with a warning if it went up.
pub fn validate_item_before_add(
    catalog: &dyn Catalog,
    mut line: CartLine,
) -> Result<(CartLine, Vec<OrderWarning>), OrderError> {
    let limits = &settings().limits;
    let mut warnings = Vec::new();

    if line.qty < 1 {
        line.qty = 1;
    }
    if line.qty > limits.max_quantity {
        return Err(OrderError::QuantityTooHigh {
            qty: line.qty,
            max: limits.max_quantity,
        });
    }

    let menu = catalog.get_menu(&line.restaurant_id, false)?;
    let db_item = menu
        .iter()
        .find(|i| i.id == line.menu_item_id)
        .ok_or_else(|| OrderError::ItemNotAvailable(line.name.clone()))?;
    if !db_item.available {
        return Err(OrderError::ItemNotAvailable(line.name.clone()));
    }

    if (db_item.price - line.price).abs() > limits.price_epsilon {
        if db_item.price > line.price {
            warnings.push(OrderWarning::ItemPriceIncreased {
                name: line.name.clone(),
                from: line.price,
                to: db_item.price,
            });
        }
        line.price = db_item.price;
    }

    Ok((line, warnings))
}

/// Validate the assembled cart right before checkout.
///
/// All lines must share one restaurant, the restaurant must exist and be
/// open, and the total must clear its minimum order value.
pub fn validate_cart_before_checkout(
    catalog: &dyn Catalog,
    restaurant_id: &str,
    lines: &[CartLine],
) -> Result<(), OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyCart);
    }
    if lines.iter().any(|l| l.restaurant_id != restaurant_id) {
        return Err(OrderError::MixedRestaurants);
    }

    let restaurant = catalog
        .all_restaurants()
        .into_iter()
        .find(|r| r.id == restaurant_id)
        .ok_or_else(|| OrderError::RestaurantUnknown(restaurant_id.to_string()))?;
    if !restaurant.is_open {
        return Err(OrderError::RestaurantClosed(restaurant.name));
    }

    let total: f64 = lines.iter().map(CartLine::line_total).sum();
    if total < restaurant.min_order_pln {
        return Err(OrderError::MinOrderNotMet {
            total,
            min: restaurant.min_order_pln,
        });
    }
    Ok(())
}
