//! Checkout and order confirmation route handlers.
//!
//! Payment is simulated: placing an order sends the cart, shipping address
//! and computed totals to the backend, which checks stock and stores it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use webcommerce_core::{
    Cart, CheckoutQuote, NewOrder, Order, OrderId, SIMULATED_PAYMENT_METHOD, ShippingAddress,
};

use crate::cart_store::CartSession;
use crate::config::CheckoutConfig;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{PageContext, backend_cookie};
use crate::models::Flash;
use crate::routes::views::{CartView, OrderView, QuoteView};
use crate::state::AppState;

/// Shipping form data. Field names match the form inputs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub notes: String,
}

impl From<CheckoutForm> for ShippingAddress {
    fn from(form: CheckoutForm) -> Self {
        Self {
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email,
            phone: form.phone,
            address: form.address,
            city: form.city,
            state: form.state,
            zip: form.zip,
            notes: form.notes,
        }
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub form: CheckoutForm,
    pub cart: CartView,
    pub quote: QuoteView,
    pub payment_method: &'static str,
    pub error: Option<String>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub ctx: PageContext,
    pub order: OrderView,
}

/// Totals for a cart under the configured tax and shipping.
#[must_use]
pub fn quote_for(cart: &Cart, config: &CheckoutConfig) -> CheckoutQuote {
    CheckoutQuote::compute(cart.subtotal(), config.shipping_cost, config.tax_rate)
}

fn checkout_page(
    ctx: PageContext,
    cart: &Cart,
    config: &CheckoutConfig,
    form: CheckoutForm,
    error: Option<String>,
) -> CheckoutTemplate {
    CheckoutTemplate {
        ctx,
        form,
        cart: CartView::new(cart, config.currency),
        quote: QuoteView::new(&quote_for(cart, config), config.currency),
        payment_method: SIMULATED_PAYMENT_METHOD,
        error,
    }
}

/// Display the checkout form. An empty cart goes back to the cart page.
#[instrument(skip(state, ctx, carts))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    carts: CartSession,
) -> Response {
    let cart = carts.load().await;
    if cart.is_empty() {
        Flash::error("Tu carrito está vacío").push(carts.session()).await;
        return Redirect::to("/cart").into_response();
    }

    // Signed-in shoppers start with their name and email filled in
    let form = ctx.user.as_ref().map_or_else(CheckoutForm::default, |user| {
        let (first, last) = user.name.split_once(' ').unwrap_or((user.name.as_str(), ""));
        CheckoutForm {
            first_name: first.to_owned(),
            last_name: last.to_owned(),
            email: user.email.clone(),
            ..CheckoutForm::default()
        }
    });

    checkout_page(ctx, &cart, &state.checkout(), form, None).into_response()
}

/// Place the order.
///
/// On success the cart is emptied and the shopper lands on the confirmation
/// page. Invalid addresses and backend rejections (such as stock that ran
/// out) re-render the form with the message and keep the cart.
#[instrument(skip(state, ctx, carts, form))]
pub async fn place(
    State(state): State<AppState>,
    ctx: PageContext,
    carts: CartSession,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let cart = carts.load().await;
    let config = state.checkout();

    match place_order(&state, carts.session(), &cart, form.clone()).await {
        Ok(order) => {
            carts.clear().await?;
            add_breadcrumb(
                "checkout",
                "Order placed",
                Some([("order_id", order.id.as_str())].as_slice()),
            );
            tracing::info!(order_id = %order.id, total = %order.total_amount, "Order placed");
            Ok(Redirect::to(&format!("/order-confirmation/{}", order.id)).into_response())
        }
        Err(AppError::Order(webcommerce_core::OrderError::EmptyCart)) => {
            Flash::error("Tu carrito está vacío").push(carts.session()).await;
            Ok(Redirect::to("/cart").into_response())
        }
        Err(e) if e.is_user_correctable() => {
            tracing::debug!(error = %e, "Checkout refused");
            let page = checkout_page(ctx, &cart, &config, form, Some(e.public_message()));
            Ok((e.status(), page).into_response())
        }
        Err(e) => Err(e),
    }
}

async fn place_order(
    state: &AppState,
    session: &Session,
    cart: &Cart,
    form: CheckoutForm,
) -> Result<Order> {
    let address = ShippingAddress::from(form).validate()?;
    let quote = quote_for(cart, &state.checkout());
    let order = NewOrder::from_cart(cart, address, quote)?;
    let cookie = backend_cookie(session).await;

    Ok(state
        .backend()
        .create_order(&order, cookie.as_ref())
        .await?)
}

/// Display the confirmation for a placed order.
#[instrument(skip(state, ctx, session))]
pub async fn confirmation(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let cookie = backend_cookie(&session).await;
    let order = state
        .backend()
        .get_order(&OrderId::new(id), cookie.as_ref())
        .await?;

    Ok(ConfirmationTemplate {
        ctx,
        order: OrderView::new(&order, state.checkout().currency),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use webcommerce_core::{CartLine, CurrencyCode, ProductId, Sku};

    use super::*;

    #[test]
    fn test_quote_uses_config() {
        let mut cart = Cart::new();
        cart.add(
            CartLine {
                product_id: ProductId::new("p1"),
                sku: Sku::new("JEAN-32-AZUL"),
                name: "Jean".to_string(),
                size_name: "32".to_string(),
                color_name: "Azul".to_string(),
                cost: Decimal::new(100_000, 0),
                quantity: 1,
                image: None,
            },
            2,
        )
        .ok();

        let config = CheckoutConfig {
            currency: CurrencyCode::COP,
            tax_rate: Decimal::new(19, 2),
            shipping_cost: Decimal::new(5_000, 0),
        };
        let quote = quote_for(&cart, &config);
        assert_eq!(quote.subtotal, Decimal::new(200_000, 0));
        assert_eq!(quote.tax_amount, Decimal::new(38_000, 0));
        assert_eq!(quote.total_amount, Decimal::new(243_000, 0));

        let empty = quote_for(&Cart::new(), &config);
        assert_eq!(empty.shipping_cost, Decimal::ZERO);
        assert_eq!(empty.total_amount, Decimal::ZERO);
    }

    #[test]
    fn test_form_maps_to_address() {
        let form = CheckoutForm {
            first_name: "Ana".to_string(),
            zip: "050021".to_string(),
            ..CheckoutForm::default()
        };
        let address = ShippingAddress::from(form);
        assert_eq!(address.first_name, "Ana");
        assert_eq!(address.zip, "050021");
        assert_eq!(
            address.validate().unwrap_err(),
            webcommerce_core::OrderError::MissingField("last name")
        );
    }
}
