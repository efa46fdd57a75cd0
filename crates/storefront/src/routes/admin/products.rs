//! Admin product management.
//!
//! Products are edited through a plain form. Variants are entered one per
//! line as `size, color, quantity`; the backend receives the validated
//! product with a SKU derived for every variant.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use webcommerce_core::{Category, Product, ProductDraft, ProductId, VariantDraft};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin};
use crate::models::Flash;
use crate::state::AppState;

/// A row of the product table.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub code: String,
    pub category: &'static str,
    pub price: String,
    pub variants: usize,
    pub stock: u64,
}

/// Products list page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products/index.html")]
pub struct ProductsIndexTemplate {
    pub ctx: PageContext,
    pub products: Vec<ProductRow>,
}

/// A category `<option>`.
#[derive(Debug, Clone)]
pub struct CategoryOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products/form.html")]
pub struct ProductFormTemplate {
    pub ctx: PageContext,
    pub heading: &'static str,
    pub action: String,
    pub form: ProductForm,
    pub categories: Vec<CategoryOption>,
    pub error: Option<String>,
}

/// Product form data, as typed by the admin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub cost: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    /// One variant per line: `size, color, quantity`.
    #[serde(default)]
    pub variants: String,
}

impl ProductForm {
    /// Prefill the form from an existing product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        let draft = product.to_draft();
        let variants = draft
            .variants
            .iter()
            .map(|v| format!("{}, {}, {}", v.size, v.color, v.quantity))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            name: draft.name,
            code: draft.code,
            cost: draft.cost.normalize().to_string(),
            description: draft.description,
            image: draft.image.unwrap_or_default(),
            category: draft.category.slug().to_owned(),
            variants,
        }
    }

    /// Parse the typed fields into a draft. Business rules (required
    /// fields, duplicate variants) are checked later by
    /// [`ProductDraft::validate`].
    ///
    /// # Errors
    ///
    /// Returns a message for the admin when a number or line is malformed.
    pub fn to_draft(&self) -> std::result::Result<ProductDraft, String> {
        let cost = self
            .cost
            .trim()
            .parse::<Decimal>()
            .map_err(|_| "El precio debe ser un número, sin separadores de miles".to_string())?;
        let category = self.category.parse().unwrap_or_default();
        let image = Some(self.image.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_owned);

        Ok(ProductDraft {
            name: self.name.clone(),
            code: self.code.clone(),
            cost,
            description: self.description.trim().to_owned(),
            image,
            category,
            variants: parse_variant_lines(&self.variants)?,
        })
    }
}

/// Parse `size, color, quantity` lines. Blank lines are skipped.
fn parse_variant_lines(text: &str) -> std::result::Result<Vec<VariantDraft>, String> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let number = index + 1;
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let [size, color, quantity] = fields.as_slice() else {
                return Err(format!(
                    "Línea {number} de variantes: usa el formato talla, color, cantidad"
                ));
            };
            let quantity = quantity.parse::<u32>().map_err(|_| {
                format!("Línea {number} de variantes: la cantidad debe ser un entero positivo")
            })?;
            Ok(VariantDraft {
                size: (*size).to_owned(),
                color: (*color).to_owned(),
                quantity,
            })
        })
        .collect()
}

fn category_options(current: &str) -> Vec<CategoryOption> {
    let current = current.parse::<Category>().unwrap_or_default();
    Category::DEPARTMENTS
        .into_iter()
        .chain([Category::Other])
        .map(|category| CategoryOption {
            value: category.slug(),
            label: category.label(),
            selected: category == current,
        })
        .collect()
}

fn form_page(
    ctx: PageContext,
    id: Option<&ProductId>,
    form: ProductForm,
    error: Option<String>,
) -> ProductFormTemplate {
    let (heading, action) = match id {
        Some(id) => ("Editar producto", format!("/admin/products/{id}")),
        None => ("Nuevo producto", "/admin/products".to_string()),
    };
    ProductFormTemplate {
        ctx,
        heading,
        action,
        categories: category_options(&form.category),
        form,
        error,
    }
}

/// Products list page handler.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ctx: PageContext,
) -> Result<impl IntoResponse> {
    let currency = state.checkout().currency;
    let products = state
        .backend()
        .list_products()
        .await?
        .iter()
        .map(|p| ProductRow {
            id: p.id.to_string(),
            name: p.name.clone(),
            code: p.code.clone(),
            category: p.category.label(),
            price: p.price(currency).display(),
            variants: p.variants.len(),
            stock: p.total_stock(),
        })
        .collect();

    Ok(ProductsIndexTemplate { ctx, products })
}

/// Empty create form.
pub async fn new(_admin: RequireAdmin, ctx: PageContext) -> impl IntoResponse {
    let form = ProductForm {
        category: Category::Men.slug().to_owned(),
        ..ProductForm::default()
    };
    form_page(ctx, None, form, None)
}

/// Edit form for an existing product.
#[instrument(skip(state, _admin, ctx))]
pub async fn edit(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ctx: PageContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = ProductId::new(id);
    let product = state.backend().fetch_product(&id).await?;
    Ok(form_page(ctx, Some(&id), ProductForm::from_product(&product), None))
}

/// Create a product.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ctx: PageContext,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    save(&state, &admin, ctx, &session, None, form).await
}

/// Update a product.
#[instrument(skip(state, admin, ctx, session, form))]
pub async fn update(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ctx: PageContext,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let id = ProductId::new(id);
    save(&state, &admin, ctx, &session, Some(&id), form).await
}

/// Validate and send a product; invalid input re-renders the form.
async fn save(
    state: &AppState,
    admin: &RequireAdmin,
    ctx: PageContext,
    session: &Session,
    id: Option<&ProductId>,
    form: ProductForm,
) -> Result<Response> {
    let draft = match form.to_draft() {
        Ok(draft) => draft,
        Err(message) => {
            let page = form_page(ctx, id, form, Some(message));
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let outcome = async {
        let product = draft.validate()?;
        match id {
            Some(id) => state.backend().update_product(id, &product, &admin.cookie).await?,
            None => state.backend().create_product(&product, &admin.cookie).await?,
        }
        Ok::<_, AppError>(product)
    }
    .await;

    match outcome {
        Ok(product) => {
            add_breadcrumb(
                "admin",
                "Product saved",
                Some([("code", product.code.as_str())].as_slice()),
            );
            tracing::info!(code = %product.code, admin = %admin.user.id, "Product saved");
            let message = if id.is_some() {
                format!("{} se actualizó", product.name)
            } else {
                format!("{} se creó", product.name)
            };
            Flash::success(message).push(session).await;
            Ok(Redirect::to("/admin/products").into_response())
        }
        Err(e) if e.is_user_correctable() => {
            let status = e.status();
            let page = form_page(ctx, id, form, Some(e.public_message()));
            Ok((status, page).into_response())
        }
        Err(e) => Err(e),
    }
}

/// Delete a product.
#[instrument(skip(state, admin, session))]
pub async fn delete(
    State(state): State<AppState>,
    admin: RequireAdmin,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = ProductId::new(id);
    state.backend().delete_product(&id, &admin.cookie).await?;
    tracing::info!(product_id = %id, admin = %admin.user.id, "Product deleted");
    Flash::success("Producto eliminado").push(&session).await;
    Ok(Redirect::to("/admin/products").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use webcommerce_core::{CatalogError, Variant};

    use super::*;

    fn form(variants: &str) -> ProductForm {
        ProductForm {
            name: "Camiseta básica".to_string(),
            code: "cam-01".to_string(),
            cost: "45000".to_string(),
            description: "Algodón".to_string(),
            image: "  ".to_string(),
            category: "women".to_string(),
            variants: variants.to_string(),
        }
    }

    #[test]
    fn test_variant_lines_are_parsed() {
        let draft = form("m, Rojo, 3\n\n l , Azul marino, 0\n").to_draft().unwrap();
        assert_eq!(draft.variants.len(), 2);
        assert_eq!(draft.variants[1].size, "l");
        assert_eq!(draft.variants[1].color, "Azul marino");
        assert_eq!(draft.variants[1].quantity, 0);
        assert_eq!(draft.category, Category::Women);
        assert_eq!(draft.image, None);

        let valid = draft.validate().unwrap();
        assert_eq!(valid.variants[0].size_name, "M");
        assert_eq!(
            valid.variants[0].sku.as_ref().map(ToString::to_string).as_deref(),
            Some("CAM-01-M-ROJO")
        );
    }

    #[test]
    fn test_malformed_lines_name_the_line() {
        let err = form("M, Rojo, 3\nL, Azul").to_draft().unwrap_err();
        assert!(err.starts_with("Línea 2"));

        let err = form("M, Rojo, -1").to_draft().unwrap_err();
        assert!(err.contains("cantidad"));

        let mut bad_cost = form("M, Rojo, 1");
        bad_cost.cost = "45.000,50".to_string();
        assert!(bad_cost.to_draft().is_err());
    }

    #[test]
    fn test_duplicate_variants_are_left_to_validation() {
        let draft = form("M, Rojo, 1\nm, rojo , 2").to_draft().unwrap();
        assert!(matches!(
            draft.validate(),
            Err(CatalogError::DuplicateVariant { .. })
        ));
    }

    #[test]
    fn test_form_prefills_from_product() {
        let product = Product {
            id: ProductId::new("p1"),
            name: "Jean".to_string(),
            code: "JEAN".to_string(),
            cost: Decimal::new(1_200_000, 2),
            description: String::new(),
            image: Some("https://cdn.example/jean.jpg".to_string()),
            category: Category::Men,
            variants: vec![Variant {
                size_name: "32".to_string(),
                color_name: "Azul".to_string(),
                quantity: 4,
                sku: None,
            }],
        };
        let form = ProductForm::from_product(&product);
        assert_eq!(form.cost, "12000");
        assert_eq!(form.variants, "32, Azul, 4");
        assert_eq!(form.category, "men");

        let options = category_options(&form.category);
        assert_eq!(options.len(), 4);
        assert!(options[0].selected);
    }
}
