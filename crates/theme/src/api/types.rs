//! Wire types for the storefront REST API.
//!
//! The backend is inconsistent about field naming and payload shape, so
//! these types are deliberately tolerant: most fields are optional, several
//! carry aliases, and cart-like payloads may nest a second cart object under
//! a `cart` key. Readers use the accessor methods rather than poking fields.

use serde::{Deserialize, Serialize};
use webstore_core::{Money, ProductId, UserGuid, VariantId, ZoneId};

// =============================================================================
// Response Envelope
// =============================================================================

/// Standard response envelope used by most endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub requires_auth: bool,
}

impl<T> ApiEnvelope<T> {
    /// First available human-readable failure text.
    #[must_use]
    pub fn failure_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Request failed".to_string())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A single cart line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CartItem {
    #[serde(alias = "id")]
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub title: String,
    pub variant_title: Option<String>,
    pub image: Option<String>,
    pub product_slug: Option<String>,
    pub quantity: u32,
    #[serde(alias = "price")]
    pub line_price: Option<Money>,
}

/// A fully materialized cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub item_count: Option<u32>,
    pub total: Option<Money>,
}

impl Cart {
    /// Item count, preferring the explicit field over summing lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.item_count
            .filter(|n| *n > 0)
            .unwrap_or_else(|| self.items.iter().map(|i| i.quantity).sum())
    }
}

/// Cart-shaped payload returned by cart mutations.
///
/// Different endpoints report the count under different names, sometimes
/// inside a nested `cart` object. [`CartPayload::canonical_count`] folds all
/// of them into one number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CartPayload {
    pub item_count: Option<u32>,
    pub cart_quantity: Option<u32>,
    pub items: Option<Vec<CartItem>>,
    pub total: Option<Money>,
    pub cart: Option<Box<CartPayload>>,
}

impl CartPayload {
    /// Build a payload that carries only a count.
    #[must_use]
    pub fn from_count(count: u32) -> Self {
        Self {
            item_count: Some(count),
            ..Self::default()
        }
    }

    /// Resolve the canonical item count for this payload.
    ///
    /// Priority: `itemCount`, then `cartQuantity`, then the length of
    /// `items`, then the same three inside a nested `cart` object, then 0.
    /// A field holding zero is treated as unset so a sibling field can still
    /// supply the real number.
    #[must_use]
    pub fn canonical_count(&self) -> u32 {
        self.own_count()
            .or_else(|| self.cart.as_deref().and_then(CartPayload::own_count))
            .unwrap_or(0)
    }

    fn own_count(&self) -> Option<u32> {
        self.item_count
            .filter(|n| *n > 0)
            .or(self.cart_quantity.filter(|n| *n > 0))
            .or_else(|| {
                self.items
                    .as_ref()
                    .map(|items| u32::try_from(items.len()).unwrap_or(u32::MAX))
                    .filter(|n| *n > 0)
            })
    }

    /// View this payload as a full cart, if it carries line items.
    #[must_use]
    pub fn as_cart(&self) -> Option<Cart> {
        let source = if self.items.is_some() {
            self
        } else {
            self.cart.as_deref().filter(|c| c.items.is_some())?
        };
        Some(Cart {
            items: source.items.clone().unwrap_or_default(),
            item_count: source.item_count.or(source.cart_quantity),
            total: source.total,
        })
    }
}

impl From<Cart> for CartPayload {
    fn from(cart: Cart) -> Self {
        Self {
            item_count: cart.item_count,
            cart_quantity: None,
            items: Some(cart.items),
            total: cart.total,
            cart: None,
        }
    }
}

/// Body of a cart-quantity lookup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CartQuantity {
    #[serde(alias = "itemCount")]
    pub cart_quantity: Option<u32>,
}

// =============================================================================
// Products and Variants
// =============================================================================

/// Price pair for a product or variant.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Prices {
    pub price: Option<Money>,
    pub mrp: Option<Money>,
}

/// One selectable axis value on a variant, e.g. `Color = Red`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VariantOption {
    pub option_name: String,
    pub value: String,
    pub display_type: Option<String>,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Variant {
    #[serde(alias = "variantId")]
    pub id: VariantId,
    pub product_id: Option<ProductId>,
    pub price: Option<Money>,
    pub prices: Option<Prices>,
    pub mrp: Option<Money>,
    pub in_stock: Option<bool>,
    pub available: Option<bool>,
    pub images: Vec<String>,
    pub options: Vec<VariantOption>,
}

impl Variant {
    /// Effective selling price, from either field shape.
    #[must_use]
    pub fn effective_price(&self) -> Money {
        self.price
            .or(self.prices.and_then(|p| p.price))
            .unwrap_or(Money(0.0))
    }

    /// Strike-through price when one exists and exceeds the selling price.
    #[must_use]
    pub fn effective_mrp(&self) -> Option<Money> {
        let mrp = self.mrp.or(self.prices.and_then(|p| p.mrp))?;
        (mrp.0 > self.effective_price().0).then_some(mrp)
    }

    /// Availability with both backend field shapes honored.
    ///
    /// `available` wins when present, then `inStock`, and a variant that
    /// states neither is assumed purchasable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.unwrap_or(self.in_stock.unwrap_or(true))
    }
}

/// A product as returned by the detail endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    #[serde(alias = "productId")]
    pub id: ProductId,
    pub title: String,
    pub slug: Option<String>,
    pub prices: Option<Prices>,
    pub price: Option<Money>,
    pub mrp: Option<Money>,
    pub images: Vec<String>,
    pub thumbnail_image: Option<String>,
    #[serde(alias = "variations")]
    pub variants: Vec<Variant>,
    /// Non-empty when the product is built from combinations of other
    /// products; such products cannot be configured in the quick-add modal.
    pub combinations: Vec<serde_json::Value>,
    /// Non-empty when the product carries subscription plans; also beyond
    /// the quick-add modal.
    pub subscriptions: Vec<serde_json::Value>,
    pub in_stock: Option<bool>,
    pub available: Option<bool>,
}

impl Product {
    /// Whether the quick-add modal can handle this product, or the customer
    /// must go to the full product page.
    #[must_use]
    pub fn needs_product_page(&self) -> bool {
        !self.combinations.is_empty() || !self.subscriptions.is_empty()
    }

    /// Base selling price from either field shape.
    #[must_use]
    pub fn base_price(&self) -> Money {
        self.price
            .or(self.prices.and_then(|p| p.price))
            .unwrap_or(Money(0.0))
    }

    /// Base availability with the same precedence as variants.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.unwrap_or(self.in_stock.unwrap_or(true))
    }

    /// Image used when no variant-specific image applies.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .first()
            .map(String::as_str)
            .or(self.thumbnail_image.as_deref())
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Aggregate describing what a price re-check found.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceChangeMetadata {
    pub detected: bool,
    pub items_changed: u32,
    pub total_change: Option<Money>,
    pub has_critical_issues: bool,
}

/// Checkout state as reported by the re-check endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutState {
    pub items: Vec<CartItem>,
    pub total: Option<Money>,
    pub price_changes: Option<PriceChangeMetadata>,
}

// =============================================================================
// Delivery Zones
// =============================================================================

/// One zipcode suggestion from the zipcode search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZipcodeMatch {
    pub zipcode: String,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// A delivery zone resolved from a zipcode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoneMatch {
    pub zone_id: ZoneId,
    pub zone_name: Option<String>,
}

/// A city and its zone, for city-mode selection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CityZone {
    pub zone_id: ZoneId,
    pub zone_name: String,
}

// =============================================================================
// Authentication
// =============================================================================

/// Password login request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub remember: bool,
}

/// Response to an OTP send request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OtpChallenge {
    pub user_guid: Option<UserGuid>,
}

/// OTP verification request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerification {
    pub user_guid: Option<UserGuid>,
    pub otp: String,
}
