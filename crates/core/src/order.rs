//! Checkout and orders.
//!
//! The storefront assembles a [`NewOrder`] from the cart and the shipping
//! form; the backend owns everything after that, returning an [`Order`].

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::{Cart, CartLine};
use crate::types::{Email, OrderId, OrderStatus, PaymentStatus, ProductId, Sku};

/// Payment is simulated; every order carries this method.
pub const SIMULATED_PAYMENT_METHOD: &str = "Credit Card (Simulated)";

/// Checkout validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid email address")]
    InvalidEmail,
    #[error("the cart is empty")]
    EmptyCart,
}

/// Where the order ships, as entered on the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(default)]
    pub notes: String,
}

impl ShippingAddress {
    /// Check required fields and trim every value.
    ///
    /// # Errors
    ///
    /// Returns the first missing required field, or
    /// [`OrderError::InvalidEmail`].
    pub fn validate(self) -> Result<Self, OrderError> {
        let required = |value: String, field: &'static str| {
            let value = value.trim().to_owned();
            if value.is_empty() {
                Err(OrderError::MissingField(field))
            } else {
                Ok(value)
            }
        };

        let first_name = required(self.first_name, "first name")?;
        let last_name = required(self.last_name, "last name")?;
        let email = required(self.email, "email")?;
        let email = Email::parse(&email).map_err(|_| OrderError::InvalidEmail)?;
        let address = required(self.address, "address")?;
        let city = required(self.city, "city")?;
        let state = required(self.state, "state")?;
        let zip = required(self.zip, "zip code")?;

        Ok(Self {
            first_name,
            last_name,
            email: email.as_str().to_owned(),
            phone: self.phone.trim().to_owned(),
            address,
            city,
            state,
            zip,
            notes: self.notes.trim().to_owned(),
        })
    }

    /// "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One purchased SKU on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub sku: Option<Sku>,
    pub name: String,
    pub size_name: String,
    pub color_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl OrderItem {
    /// Cost × quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.cost * Decimal::from(self.quantity)
    }
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            sku: Some(line.sku.clone()),
            name: line.name.clone(),
            size_name: line.size_name.clone(),
            color_name: line.color_name.clone(),
            cost: line.cost,
            quantity: line.quantity,
            image: line.image.clone(),
        }
    }
}

/// Totals shown at checkout and sent with the order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckoutQuote {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

impl CheckoutQuote {
    /// Tax is `subtotal × tax_rate` rounded half-up to 2 decimal places.
    /// An empty cart (zero subtotal) ships free.
    #[must_use]
    pub fn compute(subtotal: Decimal, shipping_cost: Decimal, tax_rate: Decimal) -> Self {
        let shipping_cost = if subtotal.is_zero() {
            Decimal::ZERO
        } else {
            shipping_cost
        };
        let tax_amount =
            (subtotal * tax_rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        Self {
            subtotal,
            shipping_cost,
            tax_amount,
            total_amount: subtotal + shipping_cost + tax_amount,
        }
    }
}

/// The order payload posted to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl NewOrder {
    /// Assemble an order from the cart.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::EmptyCart`] when the cart has no lines.
    pub fn from_cart(
        cart: &Cart,
        shipping_address: ShippingAddress,
        quote: CheckoutQuote,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        Ok(Self {
            items: cart.lines().iter().map(OrderItem::from).collect(),
            shipping_address,
            payment_method: SIMULATED_PAYMENT_METHOD.to_owned(),
            subtotal: quote.subtotal,
            shipping_cost: quote.shipping_cost,
            tax_amount: quote.tax_amount,
            total_amount: quote.total_amount,
        })
    }
}

/// An order as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// The last six characters of the ID, uppercased, for display.
    #[must_use]
    pub fn short_reference(&self) -> String {
        let id = self.id.as_str();
        let start = id
            .char_indices()
            .rev()
            .nth(5)
            .map_or(0, |(index, _)| index);
        id.get(start..).unwrap_or(id).to_uppercase()
    }

    /// Total units across all items.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }
}

/// One page of the admin order listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub pages: u32,
    #[serde(default)]
    pub total: u64,
}

const fn first_page() -> u32 {
    1
}

impl OrderPage {
    /// Whether a previous page exists.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Whether a next page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            first_name: " Ana ".to_string(),
            last_name: "Gómez".to_string(),
            email: "ana@Example.COM".to_string(),
            phone: String::new(),
            address: "Calle 10 # 5-20".to_string(),
            city: "Medellín".to_string(),
            state: "Antioquia".to_string(),
            zip: "050021".to_string(),
            notes: String::new(),
        }
    }

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add(
            CartLine {
                product_id: ProductId::new("p1"),
                sku: Sku::new("CAM-M-ROJO"),
                name: "Camisa".to_string(),
                size_name: "M".to_string(),
                color_name: "Rojo".to_string(),
                cost: Decimal::new(59_900, 0),
                quantity: 1,
                image: None,
            },
            2,
        )
        .unwrap();
        cart
    }

    #[test]
    fn test_validate_trims_and_normalizes() {
        let address = address().validate().unwrap();
        assert_eq!(address.first_name, "Ana");
        assert_eq!(address.email, "ana@example.com");
        assert_eq!(address.full_name(), "Ana Gómez");
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let mut blank_city = address();
        blank_city.city = "   ".to_string();
        assert_eq!(
            blank_city.validate().unwrap_err(),
            OrderError::MissingField("city")
        );

        let mut bad_email = address();
        bad_email.email = "not-an-email".to_string();
        assert_eq!(bad_email.validate().unwrap_err(), OrderError::InvalidEmail);
    }

    #[test]
    fn test_phone_and_notes_are_optional() {
        let mut a = address();
        a.phone.clear();
        a.notes.clear();
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_quote_applies_tax_and_shipping() {
        let quote = CheckoutQuote::compute(
            Decimal::new(119_800, 0),
            Decimal::new(5_000, 0),
            Decimal::new(19, 2),
        );
        assert_eq!(quote.tax_amount, Decimal::new(22_762, 0));
        assert_eq!(quote.total_amount, Decimal::new(147_562, 0));
    }

    #[test]
    fn test_quote_rounds_tax_to_cents() {
        let quote = CheckoutQuote::compute(Decimal::new(1_005, 2), Decimal::ZERO, Decimal::new(19, 2));
        // 10.05 * 0.19 = 1.9095
        assert_eq!(quote.tax_amount, Decimal::new(191, 2));
    }

    #[test]
    fn test_empty_cart_ships_free() {
        let quote = CheckoutQuote::compute(Decimal::ZERO, Decimal::new(5_000, 0), Decimal::new(19, 2));
        assert_eq!(quote, CheckoutQuote::default());
    }

    #[test]
    fn test_new_order_from_cart() {
        let cart = cart();
        let quote = CheckoutQuote::compute(cart.subtotal(), Decimal::new(5_000, 0), Decimal::new(19, 2));
        let order = NewOrder::from_cart(&cart, address().validate().unwrap(), quote).unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.payment_method, SIMULATED_PAYMENT_METHOD);

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["subtotal"], serde_json::json!(119_800.0));
        assert_eq!(json["shippingAddress"]["firstName"], "Ana");
        assert_eq!(json["items"][0]["sizeName"], "M");
        assert_eq!(json["paymentMethod"], "Credit Card (Simulated)");
    }

    #[test]
    fn test_new_order_rejects_empty_cart() {
        let err = NewOrder::from_cart(&Cart::new(), address(), CheckoutQuote::default()).unwrap_err();
        assert_eq!(err, OrderError::EmptyCart);
    }

    #[test]
    fn test_order_from_backend_json() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "_id": "65f1c0ffee00000000abc123",
            "items": [{
                "productId": "p1",
                "name": "Camisa",
                "sizeName": "M",
                "colorName": "Rojo",
                "cost": 59900,
                "quantity": 2
            }],
            "totalAmount": 147562.0,
            "status": "Shipped",
            "paymentStatus": "Paid",
            "createdAt": "2026-03-01T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(order.short_reference(), "ABC123");
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.total_amount, Decimal::new(147_562, 0));
        assert!(order.created_at.is_some());
    }

    #[test]
    fn test_short_reference_of_short_id() {
        let order: Order = serde_json::from_value(serde_json::json!({ "_id": "ab1" })).unwrap();
        assert_eq!(order.short_reference(), "AB1");
    }

    #[test]
    fn test_order_page_navigation() {
        let page: OrderPage = serde_json::from_value(serde_json::json!({
            "orders": [],
            "page": 2,
            "pages": 3
        }))
        .unwrap();
        assert!(page.has_prev());
        assert!(page.has_next());
        assert_eq!(page.total, 0);
    }
}
