//! Product route handlers.
//!
//! Create takes a multipart form. Update takes either a multipart form or a
//! JSON body, chosen by `Content-Type`; in both, absent fields keep their
//! stored value.

use axum::{
    Json,
    extract::{
        FromRequest, Multipart, Path, Query, Request, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::header::CONTENT_TYPE,
};
use bytes::Bytes;
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{Value, json};

use little_threads_core::ListInput;

use crate::error::{AppError, Result};
use crate::middleware::Caller;
use crate::models::Product;
use crate::services::{ImageUpload, NewProduct, ProductFilters, ProductPatch};
use crate::state::AppState;

/// Multipart field carrying the image file.
const IMAGE_FIELD: &str = "itemImage";

/// Product fields as read from a multipart form.
#[derive(Debug, Default)]
struct ProductForm {
    price: Option<String>,
    image: Option<ImageUpload>,
    categories: Option<ListInput>,
    age_groups: Option<ListInput>,
    seasons: Option<ListInput>,
    occasions: Option<ListInput>,
}

impl From<ProductForm> for NewProduct {
    fn from(form: ProductForm) -> Self {
        Self {
            price: form.price,
            image: form.image,
            categories: form.categories,
            age_groups: form.age_groups,
            seasons: form.seasons,
            occasions: form.occasions,
        }
    }
}

impl From<ProductForm> for ProductPatch {
    fn from(form: ProductForm) -> Self {
        Self {
            price: form.price,
            image: form.image,
            categories: form.categories,
            age_groups: form.age_groups,
            seasons: form.seasons,
            occasions: form.occasions,
        }
    }
}

fn multipart_error(e: &MultipartError) -> AppError {
    AppError::BadRequest(e.body_text())
}

/// Read the known product fields. Unknown fields are skipped.
async fn read_form(mut multipart: Multipart) -> Result<ProductForm> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let content = field.bytes().await.map_err(|e| multipart_error(&e))?;
            form.image = Some(ImageUpload { file_name, content });
            continue;
        }

        let slot = match name.as_str() {
            "price" => {
                form.price = Some(field.text().await.map_err(|e| multipart_error(&e))?);
                continue;
            }
            "categories" => &mut form.categories,
            "ageGroups" => &mut form.age_groups,
            "seasons" => &mut form.seasons,
            "occasions" => &mut form.occasions,
            _ => continue,
        };
        let text = field.text().await.map_err(|e| multipart_error(&e))?;
        *slot = Some(ListInput::Delimited(text));
    }

    Ok(form)
}

/// JSON update body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductUpdateBody {
    /// A number or a numeric string.
    price: Option<Value>,
    categories: Option<ListInput>,
    age_groups: Option<ListInput>,
    seasons: Option<ListInput>,
    occasions: Option<ListInput>,
}

impl TryFrom<ProductUpdateBody> for ProductPatch {
    type Error = AppError;

    fn try_from(body: ProductUpdateBody) -> Result<Self> {
        let price = match body.price {
            None => None,
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) => Some(s),
            Some(_) => return Err(AppError::BadRequest("Invalid price format".to_owned())),
        };

        Ok(Self {
            price,
            image: None,
            categories: body.categories,
            age_groups: body.age_groups,
            seasons: body.seasons,
            occasions: body.occasions,
        })
    }
}

fn parse_update_body(bytes: &Bytes) -> Result<ProductPatch> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ProductPatch::default());
    }
    let body: ProductUpdateBody = serde_json::from_slice(bytes)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?;
    body.try_into()
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("multipart/form-data"))
}

/// `POST /api/add-product`
pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>> {
    let multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let form = read_form(multipart).await?;

    let product = state.catalog().create(caller.id(), form.into()).await?;

    Ok(Json(json!({
        "ok": true,
        "itemId": product.id,
        "price": product.price,
        "imageUrl": product.image_url,
    })))
}

/// Listing filters. Each is optional; blank values are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub category: Option<String>,
    pub age_group: Option<String>,
    pub season: Option<String>,
    pub occasion: Option<String>,
}

impl From<ListParams> for ProductFilters {
    fn from(params: ListParams) -> Self {
        Self {
            category: params.category,
            age_group: params.age_group,
            season: params.season,
            occasion: params.occasion,
        }
    }
}

/// `GET /api/products`
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>> {
    let filters = ProductFilters::from(params);
    let products: Vec<Product> = state.catalog().list(&filters).try_collect().await?;

    Ok(Json(json!({ "ok": true, "products": products })))
}

/// `PUT /api/products/{id}`
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Value>> {
    let patch = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        read_form(multipart).await?.into()
    } else {
        let bytes = Bytes::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        parse_update_body(&bytes)?
    };

    let product = state.catalog().update(caller.id(), &id, patch).await?;

    Ok(Json(json!({
        "ok": true,
        "message": "Product updated successfully",
        "product": product,
    })))
}

/// `DELETE /api/products/{id}`
pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let deleted = state.catalog().delete(caller.id(), &id).await?;

    let mut body = json!({
        "ok": true,
        "message": format!("Product {} deleted", deleted.id),
    });
    if let Some(warning) = deleted.image.warning() {
        body["warning"] = Value::from(warning);
    }

    Ok(Json(body))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_update_body_accepts_numeric_price() {
        let patch = parse_update_body(&Bytes::from_static(br#"{"price": 12.5}"#)).unwrap();
        assert_eq!(patch.price.as_deref(), Some("12.5"));
    }

    #[test]
    fn test_update_body_accepts_string_lists() {
        let patch = parse_update_body(&Bytes::from_static(
            br#"{"price": "450", "categories": "Girls,Unisex", "ageGroups": ["0-3 Months"]}"#,
        ))
        .unwrap();
        assert_eq!(patch.price.as_deref(), Some("450"));
        assert_eq!(
            patch.categories.unwrap().normalize(),
            vec!["Girls".to_owned(), "Unisex".to_owned()]
        );
        assert_eq!(
            patch.age_groups.unwrap().normalize(),
            vec!["0-3 Months".to_owned()]
        );
        assert!(patch.seasons.is_none());
    }

    #[test]
    fn test_update_body_rejects_non_scalar_price() {
        let result = parse_update_body(&Bytes::from_static(br#"{"price": [1]}"#));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_update_body_empty_is_empty_patch() {
        let patch = parse_update_body(&Bytes::from_static(b"  ")).unwrap();
        assert!(patch.price.is_none());
        assert!(patch.categories.is_none());
    }

    #[test]
    fn test_update_body_malformed_json() {
        let result = parse_update_body(&Bytes::from_static(b"{not json"));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
