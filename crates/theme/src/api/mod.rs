//! Storefront REST API client.
//!
//! # Architecture
//!
//! - Same-origin JSON endpoints under `/webstoreapi/`, all tagged with the
//!   `X-Requested-With` header the backend uses to pick JSON error bodies
//!   over HTML error pages (it does not always honor it).
//! - Product detail lookups are cached in-memory via `moka` (5 minute TTL).
//! - Controllers depend on the [`StorefrontApi`] trait, not the concrete
//!   client, so tests script responses without a network.
//!
//! # Auth detection
//!
//! Cart mutations can fail because the customer must sign in, but the
//! backend reports that four different ways. [`ApiClient`] folds all of
//! them into [`ApiError::AuthRequired`]:
//!
//! 1. an HTML error page with status 401/404
//! 2. a JSON parse failure with status 401/404
//! 3. an explicit `requiresAuth` flag in the envelope, any status
//! 4. a bare 401/404

pub mod types;

#[cfg(test)]
pub mod testing;

pub use types::*;

use std::sync::Arc;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use webstore_core::{ProductId, UserGuid, VariantId, ZoneId};

use crate::config::ThemeConfig;
use crate::error::ApiError;

/// Statuses the backend uses interchangeably for "please sign in".
const AUTH_STATUSES: [u16; 2] = [401, 404];

// =============================================================================
// StorefrontApi trait
// =============================================================================

/// Operations the theme engine needs from the storefront backend.
///
/// Controllers take this as a generic parameter; the engine is
/// single-threaded so no `Send` bound is required.
pub trait StorefrontApi {
    /// Fetch the full cart.
    async fn get_cart(&self) -> Result<Cart, ApiError>;

    /// Fetch just the cart item count.
    async fn cart_quantity(&self) -> Result<u32, ApiError>;

    /// Add a product (or variant) to the cart.
    async fn add_to_cart(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: u32,
    ) -> Result<CartPayload, ApiError>;

    /// Set the quantity of a cart line (drawer path).
    async fn update_cart_line(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: u32,
    ) -> Result<CartPayload, ApiError>;

    /// Set the quantity of a cart line (cart page path).
    async fn update_cart_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartPayload, ApiError>;

    /// Remove a cart line (drawer path).
    async fn remove_cart_line(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<CartPayload, ApiError>;

    /// Remove a cart line (cart page path).
    async fn remove_cart_item(&self, product_id: &ProductId) -> Result<CartPayload, ApiError>;

    /// Fetch product detail, including variants.
    async fn get_product(&self, product_id: &ProductId) -> Result<Product, ApiError>;

    /// Toggle a product's wishlist membership; returns the new state.
    async fn toggle_wishlist(&self, product_id: &ProductId) -> Result<bool, ApiError>;

    /// Re-check checkout prices.
    async fn get_checkout(&self) -> Result<CheckoutState, ApiError>;

    /// Search zipcodes by prefix.
    async fn search_zipcodes(&self, query: &str) -> Result<Vec<ZipcodeMatch>, ApiError>;

    /// Resolve the delivery zone serving a zipcode.
    async fn zone_by_zipcode(&self, zipcode: &str) -> Result<ZoneMatch, ApiError>;

    /// List cities with their delivery zones.
    async fn list_cities(&self) -> Result<Vec<CityZone>, ApiError>;

    /// Persist the customer's delivery zone choice.
    async fn select_zone(&self, zone_id: &ZoneId, zipcode: Option<&str>) -> Result<(), ApiError>;

    /// Password login.
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
        remember: bool,
    ) -> Result<(), ApiError>;

    /// Start an email OTP challenge.
    async fn send_email_otp(&self, email: &str) -> Result<OtpChallenge, ApiError>;

    /// Complete an email OTP challenge.
    async fn verify_email_otp(
        &self,
        user_guid: Option<&UserGuid>,
        otp: &str,
    ) -> Result<(), ApiError>;

    /// Start a phone OTP challenge.
    async fn send_phone_otp(&self, phone: &str) -> Result<OtpChallenge, ApiError>;

    /// Complete a phone OTP challenge.
    async fn verify_phone_otp(
        &self,
        user_guid: Option<&UserGuid>,
        otp: &str,
    ) -> Result<(), ApiError>;

    /// Fetch the data payload of an asynchronously rendered section.
    async fn get_section(&self, name: &str) -> Result<serde_json::Value, ApiError>;
}

// =============================================================================
// ApiClient
// =============================================================================

/// HTTP client for the storefront REST API.
///
/// Cheap to clone; all clones share the HTTP pool and the product cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base: Url,
    product_cache: Cache<ProductId, Product>,
}

impl ApiClient {
    /// Create a client for the configured API origin.
    #[must_use]
    pub fn new(config: &ThemeConfig) -> Self {
        let product_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.product_cache_ttl)
            .build();

        Self {
            inner: Arc::new(ApiClientInner {
                http: reqwest::Client::new(),
                base: config.api_base_url.clone(),
                product_cache,
            }),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base.as_str().trim_end_matches('/'))
    }

    /// Send a request and decode the standard envelope.
    ///
    /// `auth_sensitive` enables the layered 401/404 heuristics used by cart
    /// mutations; other endpoints surface those statuses as backend errors.
    async fn execute<T: DeserializeOwned + Default>(
        &self,
        request: reqwest::RequestBuilder,
        auth_sensitive: bool,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let response = request
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await?;

        let status = response.status();
        let is_auth_status = AUTH_STATUSES.contains(&status.as_u16());
        let html_body = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("text/html"));

        // Get response body as text first for better error diagnostics.
        let text = response.text().await?;

        if auth_sensitive && html_body && is_auth_status {
            return Err(ApiError::AuthRequired);
        }

        let envelope: ApiEnvelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                if auth_sensitive && is_auth_status {
                    return Err(ApiError::AuthRequired);
                }
                if !status.is_success() {
                    tracing::error!(
                        status = %status,
                        body = %text.chars().take(500).collect::<String>(),
                        "storefront API returned non-success status"
                    );
                    return Err(ApiError::Backend {
                        status: status.as_u16(),
                        message: text.chars().take(200).collect(),
                    });
                }
                tracing::error!(
                    error = %e,
                    body = %text.chars().take(500).collect::<String>(),
                    "failed to parse storefront API response"
                );
                return Err(ApiError::Parse(e));
            }
        };

        if envelope.requires_auth {
            return Err(ApiError::AuthRequired);
        }
        if auth_sensitive && is_auth_status {
            return Err(ApiError::AuthRequired);
        }
        if !status.is_success() || !envelope.success {
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message: envelope.failure_message(),
            });
        }

        Ok(envelope)
    }

    async fn get_data<T: DeserializeOwned + Default>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.inner.http.get(self.endpoint(path));
        let envelope = self.execute::<T>(request, false).await?;
        envelope.data.ok_or(ApiError::MissingData)
    }

    async fn send_data<T: DeserializeOwned + Default, B: Serialize + ?Sized>(
        &self,
        request: reqwest::RequestBuilder,
        body: &B,
        auth_sensitive: bool,
    ) -> Result<T, ApiError> {
        let envelope = self.execute::<T>(request.json(body), auth_sensitive).await?;
        envelope.data.ok_or(ApiError::MissingData)
    }

    /// Like [`Self::send_data`] for endpoints whose success carries no body.
    async fn send_ok<B: Serialize + ?Sized>(
        &self,
        request: reqwest::RequestBuilder,
        body: &B,
    ) -> Result<(), ApiError> {
        self.execute::<serde_json::Value>(request.json(body), false)
            .await?;
        Ok(())
    }
}

impl StorefrontApi for ApiClient {
    #[instrument(skip(self))]
    async fn get_cart(&self) -> Result<Cart, ApiError> {
        self.get_data("/webstoreapi/carts").await
    }

    #[instrument(skip(self))]
    async fn cart_quantity(&self) -> Result<u32, ApiError> {
        let quantity: CartQuantity = self.get_data("/webstoreapi/carts/quantity").await?;
        Ok(quantity.cart_quantity.unwrap_or(0))
    }

    #[instrument(skip(self), fields(product = %product_id))]
    async fn add_to_cart(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: u32,
    ) -> Result<CartPayload, ApiError> {
        let request = self.inner.http.post(self.endpoint("/webstoreapi/carts/add"));
        self.send_data(
            request,
            &serde_json::json!({
                "productId": product_id,
                "variantId": variant_id,
                "quantity": quantity,
            }),
            true,
        )
        .await
    }

    #[instrument(skip(self), fields(product = %product_id))]
    async fn update_cart_line(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: u32,
    ) -> Result<CartPayload, ApiError> {
        let request = self
            .inner
            .http
            .post(self.endpoint("/webstoreapi/cart/update"));
        self.send_data(
            request,
            &serde_json::json!({
                "productId": product_id,
                "variantId": variant_id,
                "quantity": quantity,
            }),
            true,
        )
        .await
    }

    #[instrument(skip(self), fields(product = %product_id))]
    async fn update_cart_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartPayload, ApiError> {
        let request = self
            .inner
            .http
            .put(self.endpoint("/webstoreapi/carts/update"));
        self.send_data(
            request,
            &serde_json::json!({
                "productId": product_id,
                "quantity": quantity,
            }),
            true,
        )
        .await
    }

    #[instrument(skip(self), fields(product = %product_id))]
    async fn remove_cart_line(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<CartPayload, ApiError> {
        let request = self
            .inner
            .http
            .post(self.endpoint("/webstoreapi/cart/remove"));
        self.send_data(
            request,
            &serde_json::json!({
                "productId": product_id,
                "variantId": variant_id,
            }),
            true,
        )
        .await
    }

    #[instrument(skip(self), fields(product = %product_id))]
    async fn remove_cart_item(&self, product_id: &ProductId) -> Result<CartPayload, ApiError> {
        let request = self
            .inner
            .http
            .delete(self.endpoint("/webstoreapi/carts/remove"));
        self.send_data(request, &serde_json::json!({"productId": product_id}), true)
            .await
    }

    #[instrument(skip(self), fields(product = %product_id))]
    async fn get_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        if let Some(product) = self.inner.product_cache.get(product_id).await {
            debug!("cache hit for product");
            return Ok(product);
        }

        let product: Product = self
            .get_data(&format!("/webstoreapi/products/{product_id}"))
            .await?;

        self.inner
            .product_cache
            .insert(product_id.clone(), product.clone())
            .await;

        Ok(product)
    }

    #[instrument(skip(self), fields(product = %product_id))]
    async fn toggle_wishlist(&self, product_id: &ProductId) -> Result<bool, ApiError> {
        #[derive(serde::Deserialize, Default)]
        #[serde(rename_all = "camelCase", default)]
        struct WishlistState {
            in_wishlist: bool,
        }

        let request = self
            .inner
            .http
            .post(self.endpoint("/webstoreapi/wishlist/toggle"));
        let state: WishlistState = self
            .send_data(request, &serde_json::json!({"productId": product_id}), true)
            .await?;
        Ok(state.in_wishlist)
    }

    #[instrument(skip(self))]
    async fn get_checkout(&self) -> Result<CheckoutState, ApiError> {
        self.get_data("/webstoreapi/checkout").await
    }

    #[instrument(skip(self))]
    async fn search_zipcodes(&self, query: &str) -> Result<Vec<ZipcodeMatch>, ApiError> {
        let request = self
            .inner
            .http
            .get(self.endpoint("/webstoreapi/delivery-zone/search-zipcodes"))
            .query(&[("q", query)]);
        let envelope = self.execute::<Vec<ZipcodeMatch>>(request, false).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn zone_by_zipcode(&self, zipcode: &str) -> Result<ZoneMatch, ApiError> {
        self.get_data(&format!("/webstoreapi/delivery-zone/by-zipcode/{zipcode}"))
            .await
    }

    #[instrument(skip(self))]
    async fn list_cities(&self) -> Result<Vec<CityZone>, ApiError> {
        let envelope = self
            .execute::<Vec<CityZone>>(
                self.inner
                    .http
                    .get(self.endpoint("/webstoreapi/delivery-zone/cities")),
                false,
            )
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    #[instrument(skip(self), fields(zone = %zone_id))]
    async fn select_zone(&self, zone_id: &ZoneId, zipcode: Option<&str>) -> Result<(), ApiError> {
        let request = self
            .inner
            .http
            .post(self.endpoint("/webstoreapi/delivery-zone/select"));
        self.send_ok(
            request,
            &serde_json::json!({"zoneId": zone_id, "zipcode": zipcode}),
        )
        .await
    }

    #[instrument(skip(self, password))]
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
        remember: bool,
    ) -> Result<(), ApiError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.expose_secret().to_string(),
            remember,
        };
        let request = self
            .inner
            .http
            .post(self.endpoint("/webstoreapi/customer/login"));
        self.send_ok(request, &body).await
    }

    #[instrument(skip(self))]
    async fn send_email_otp(&self, email: &str) -> Result<OtpChallenge, ApiError> {
        let request = self
            .inner
            .http
            .post(self.endpoint("/webstoreapi/auth/email/send-otp"));
        let envelope = self
            .execute::<OtpChallenge>(request.json(&serde_json::json!({"email": email})), false)
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    #[instrument(skip(self, otp))]
    async fn verify_email_otp(
        &self,
        user_guid: Option<&UserGuid>,
        otp: &str,
    ) -> Result<(), ApiError> {
        let body = OtpVerification {
            user_guid: user_guid.cloned(),
            otp: otp.to_string(),
        };
        let request = self
            .inner
            .http
            .post(self.endpoint("/webstoreapi/auth/email/verify-otp"));
        self.send_ok(request, &body).await
    }

    #[instrument(skip(self))]
    async fn send_phone_otp(&self, phone: &str) -> Result<OtpChallenge, ApiError> {
        let request = self
            .inner
            .http
            .post(self.endpoint("/webstoreapi/auth/phone/send-otp"));
        let envelope = self
            .execute::<OtpChallenge>(request.json(&serde_json::json!({"phone": phone})), false)
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    #[instrument(skip(self, otp))]
    async fn verify_phone_otp(
        &self,
        user_guid: Option<&UserGuid>,
        otp: &str,
    ) -> Result<(), ApiError> {
        let body = OtpVerification {
            user_guid: user_guid.cloned(),
            otp: otp.to_string(),
        };
        let request = self
            .inner
            .http
            .post(self.endpoint("/webstoreapi/auth/phone/verify-otp"));
        self.send_ok(request, &body).await
    }

    #[instrument(skip(self))]
    async fn get_section(&self, name: &str) -> Result<serde_json::Value, ApiError> {
        self.get_data(&format!("/webstoreapi/sections/{name}")).await
    }
}
