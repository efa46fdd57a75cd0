//! Cart route handlers.
//!
//! Every mutation is a form POST that updates the session cart and redirects
//! (post/redirect/get). Problems the shopper can fix, like a sold-out size
//! or too many units, come back as flash messages instead of error pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;
use webcommerce_core::{CartError, CartLine, LineKey, ProductId, SelectionError, VariantSelection};

use crate::cart_store::CartSession;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::PageContext;
use crate::models::Flash;
use crate::routes::views::CartView;
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
    /// Defaults to 1 when left blank.
    pub quantity: Option<String>,
}

impl AddToCartForm {
    /// The product page with the submitted selection, to return to on error.
    fn product_page(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in [("size", &self.size), ("color", &self.color)] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                query.append_pair(name, value);
            }
        }
        let product = url::form_urlencoded::byte_serialize(self.product_id.as_bytes())
            .collect::<String>();
        let query = query.finish();
        if query.is_empty() {
            format!("/products/{product}")
        } else {
            format!("/products/{product}?{query}")
        }
    }
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub key: String,
    #[serde(default)]
    pub quantity: String,
}

/// Parse a typed quantity. Blank, negative or non-numeric input is refused
/// the same way as 0 so the shopper gets a flash message.
fn parse_quantity(raw: &str) -> std::result::Result<u32, SelectionError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| SelectionError::ZeroQuantity)
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub key: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub ctx: PageContext,
    pub cart: CartView,
}

/// Display cart page.
#[instrument(skip(state, ctx, carts))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    carts: CartSession,
) -> impl IntoResponse {
    let cart = carts.load().await;
    CartShowTemplate {
        ctx,
        cart: CartView::new(&cart, state.checkout().currency),
    }
}

/// Add a size/color variant to the cart.
///
/// The product is re-fetched so stock and price are current; the requested
/// quantity plus what is already in the cart must fit the variant's stock.
#[instrument(skip(state, carts))]
pub async fn add(
    State(state): State<AppState>,
    carts: CartSession,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let back = form.product_page();
    match add_line(&state, &carts, form).await {
        Ok(name) => {
            Flash::success(format!("{name} se agregó al carrito"))
                .push(carts.session())
                .await;
            Ok(Redirect::to("/cart").into_response())
        }
        Err(e) => recover(&carts, e, &back).await,
    }
}

async fn add_line(state: &AppState, carts: &CartSession, form: AddToCartForm) -> Result<String> {
    let quantity = match form.quantity.as_deref().map(str::trim) {
        None | Some("") => 1,
        Some(raw) => parse_quantity(raw)?,
    };
    let product = state
        .backend()
        .fetch_product(&ProductId::new(form.product_id))
        .await?;
    let resolved = VariantSelection::new(form.size, form.color).resolve(&product);

    // Stock is checked against the cart being written, not an earlier read.
    let sku = carts
        .update(|cart| -> Result<String> {
            let in_cart = resolved
                .variant()
                .map_or(0, |variant| {
                    cart.quantity_of(&CartLine::for_variant(&product, variant, 1).key())
                });
            let variant = resolved.check_quantity(quantity, in_cart)?;
            let line = CartLine::for_variant(&product, variant, quantity);
            let sku = line.sku.to_string();
            cart.add(line, quantity)?;
            Ok(sku)
        })
        .await?;

    add_breadcrumb("cart", "Added to cart", Some([("sku", sku.as_str())].as_slice()));
    tracing::info!(sku = %sku, quantity, "Added to cart");
    Ok(product.name)
}

/// Change a line's quantity; 0 removes it. Increases are checked against
/// current stock.
#[instrument(skip(state, carts))]
pub async fn update(
    State(state): State<AppState>,
    carts: CartSession,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let key = LineKey::from_raw(form.key);
    let outcome = match parse_quantity(&form.quantity) {
        Ok(quantity) => update_line(&state, &carts, &key, quantity).await,
        Err(e) => Err(e.into()),
    };
    match outcome {
        Ok(()) => Ok(Redirect::to("/cart").into_response()),
        Err(e) => recover(&carts, e, "/cart").await,
    }
}

async fn update_line(
    state: &AppState,
    carts: &CartSession,
    key: &LineKey,
    quantity: u32,
) -> Result<()> {
    let not_found = || CartError::LineNotFound(key.clone());
    let (product_id, current) = carts
        .load()
        .await
        .get(key)
        .map(|line| (line.product_id.clone(), line.quantity))
        .ok_or_else(not_found)?;
    // Reductions never need stock; fetch only when the line grows.
    let product = if quantity > current {
        Some(state.backend().fetch_product(&product_id).await?)
    } else {
        None
    };

    // Stock is checked against the cart being written, not the read above.
    carts
        .update(|cart| -> Result<()> {
            let line = cart.get(key).ok_or_else(not_found)?;
            let growth = quantity.saturating_sub(line.quantity);
            if let Some(product) = product.as_ref().filter(|_| growth > 0) {
                let selection = VariantSelection::new(
                    Some(line.size_name.clone()),
                    Some(line.color_name.clone()),
                );
                selection
                    .resolve(product)
                    .check_quantity(growth, line.quantity)?;
            }
            cart.update_quantity(key, quantity)?;
            Ok(())
        })
        .await
}

/// Remove a line.
#[instrument(skip(carts))]
pub async fn remove(carts: CartSession, Form(form): Form<RemoveFromCartForm>) -> Result<Response> {
    let key = LineKey::from_raw(form.key);
    match carts.update(|cart| cart.remove(&key)).await {
        Ok(line) => {
            Flash::success(format!("{} se eliminó del carrito", line.name))
                .push(carts.session())
                .await;
            Ok(Redirect::to("/cart").into_response())
        }
        Err(e) => recover(&carts, e, "/cart").await,
    }
}

/// Empty the cart.
#[instrument(skip(carts))]
pub async fn clear(carts: CartSession) -> Result<Response> {
    carts.clear().await?;
    Flash::success("Vaciaste tu carrito").push(carts.session()).await;
    Ok(Redirect::to("/cart").into_response())
}

/// Turn a correctable error into a flash message and a redirect; anything
/// else becomes an error page.
async fn recover(carts: &CartSession, err: AppError, back: &str) -> Result<Response> {
    if !err.is_user_correctable() {
        return Err(err);
    }
    tracing::debug!(error = %err, "Cart change refused");
    Flash::error(err.public_message())
        .push(carts.session())
        .await;
    Ok(Redirect::to(back).into_response())
}
