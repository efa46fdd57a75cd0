//! Display models shared by the page templates.
//!
//! Templates only print strings and flags; prices are formatted here in the
//! store currency so no template does arithmetic.

use rust_decimal::Decimal;
use webcommerce_core::{
    Cart, CartLine, CheckoutQuote, CurrencyCode, Order, OrderItem, OrderStatus, Price, Product,
    ShippingAddress,
};

/// Format an amount in the store currency.
#[must_use]
pub fn money(amount: Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).display()
}

/// A product tile in listings.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub category: &'static str,
    pub price: String,
    pub image: Option<String>,
    pub in_stock: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.label(),
            price: product.price(currency).display(),
            image: product.image.clone(),
            in_stock: product.in_stock(),
        }
    }
}

/// One line of the cart page.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub key: String,
    pub product_id: String,
    pub name: String,
    pub size: String,
    pub color: String,
    pub sku: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl CartLineView {
    fn new(line: &CartLine, currency: CurrencyCode) -> Self {
        Self {
            key: line.key().to_string(),
            product_id: line.product_id.to_string(),
            name: line.name.clone(),
            size: line.size_name.clone(),
            color: line.color_name.clone(),
            sku: line.sku.to_string(),
            image: line.image.clone(),
            quantity: line.quantity,
            unit_price: money(line.cost, currency),
            line_total: money(line.line_total(), currency),
        }
    }
}

/// The cart with derived totals.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: String,
    pub is_empty: bool,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, currency: CurrencyCode) -> Self {
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineView::new(line, currency))
                .collect(),
            item_count: cart.total_items(),
            subtotal: money(cart.subtotal(), currency),
            is_empty: cart.is_empty(),
        }
    }
}

/// Checkout totals.
#[derive(Debug, Clone)]
pub struct QuoteView {
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub total: String,
}

impl QuoteView {
    #[must_use]
    pub fn new(quote: &CheckoutQuote, currency: CurrencyCode) -> Self {
        Self {
            subtotal: money(quote.subtotal, currency),
            shipping: money(quote.shipping_cost, currency),
            tax: money(quote.tax_amount, currency),
            total: money(quote.total_amount, currency),
        }
    }
}

/// An ordered item.
#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub name: String,
    pub size: String,
    pub color: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl OrderItemView {
    fn new(item: &OrderItem, currency: CurrencyCode) -> Self {
        Self {
            name: item.name.clone(),
            size: item.size_name.clone(),
            color: item.color_name.clone(),
            sku: item.sku.as_ref().map(ToString::to_string).unwrap_or_default(),
            quantity: item.quantity,
            unit_price: money(item.cost, currency),
            line_total: money(item.line_total(), currency),
        }
    }
}

/// An order for the confirmation page and the admin console.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: String,
    pub reference: String,
    pub status: OrderStatus,
    pub status_label: &'static str,
    pub payment_method: String,
    pub payment_status: String,
    pub created_at: String,
    pub customer: String,
    pub email: String,
    pub address: ShippingAddress,
    pub items: Vec<OrderItemView>,
    pub item_count: u32,
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub total: String,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
        Self {
            id: order.id.to_string(),
            reference: order.short_reference(),
            status: order.status,
            status_label: order.status.label(),
            payment_method: order.payment_method.clone(),
            payment_status: order.payment_status.to_string(),
            created_at: order
                .created_at
                .map(|at| at.format("%d/%m/%Y %H:%M").to_string())
                .unwrap_or_default(),
            customer: order.shipping_address.full_name(),
            email: order.shipping_address.email.clone(),
            address: order.shipping_address.clone(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView::new(item, currency))
                .collect(),
            item_count: order.item_count(),
            subtotal: money(order.subtotal, currency),
            shipping: money(order.shipping_cost, currency),
            tax: money(order.tax_amount, currency),
            total: money(order.total_amount, currency),
        }
    }
}

/// An `<option>` of a status select.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Every order status, with `current` pre-selected.
#[must_use]
pub fn status_options(current: Option<OrderStatus>) -> Vec<StatusOption> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| StatusOption {
            value: status.as_str(),
            label: status.label(),
            selected: current == Some(status),
        })
        .collect()
}
