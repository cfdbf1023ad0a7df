//! Browser persistence surfaces: session storage, local storage, cookies.
//!
//! The engine reads and writes three small key-value surfaces the browser
//! would normally provide. Session values live for the tab session, local
//! values survive reloads, and cookies are read-only to this layer (the
//! backend sets them).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use webstore_core::ProductId;

/// Cookie flagging an authenticated customer; set by the backend.
pub const LOGGED_IN_COOKIE: &str = "O2VENDIsUserLoggedin";

/// Session-storage key remembering a dismissed price-change banner.
pub const PRICE_BANNER_DISMISSED_KEY: &str = "priceChangeBannerDismissed";

/// Recover the guard even if a writer panicked; these maps stay valid.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory model of the browser's client-side persistence.
#[derive(Debug, Default)]
pub struct ClientSession {
    session: Mutex<HashMap<String, String>>,
    local: Mutex<HashMap<String, String>>,
    cookies: Mutex<HashMap<String, String>>,
}

impl ClientSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Session storage (tab lifetime)
    // -------------------------------------------------------------------------

    pub fn session_set(&self, key: &str, value: &str) {
        lock(&self.session).insert(key.to_string(), value.to_string());
    }

    #[must_use]
    pub fn session_get(&self, key: &str) -> Option<String> {
        lock(&self.session).get(key).cloned()
    }

    // -------------------------------------------------------------------------
    // Local storage (survives reloads)
    // -------------------------------------------------------------------------

    pub fn local_set(&self, key: &str, value: &str) {
        lock(&self.local).insert(key.to_string(), value.to_string());
    }

    #[must_use]
    pub fn local_get(&self, key: &str) -> Option<String> {
        lock(&self.local).get(key).cloned()
    }

    pub fn local_remove(&self, key: &str) {
        lock(&self.local).remove(key);
    }

    // -------------------------------------------------------------------------
    // Cookies (read-only to the theme layer)
    // -------------------------------------------------------------------------

    pub fn set_cookie(&self, name: &str, value: &str) {
        lock(&self.cookies).insert(name.to_string(), value.to_string());
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        lock(&self.cookies).get(name).cloned()
    }

    /// Whether the backend has flagged this session as logged in.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.cookie(LOGGED_IN_COOKIE)
            .is_some_and(|v| v.contains("true"))
    }

    // -------------------------------------------------------------------------
    // Theme-specific helpers
    // -------------------------------------------------------------------------

    /// Local-storage key for a per-product variant image override.
    #[must_use]
    pub fn variant_image_key(product_id: &ProductId) -> String {
        format!("variantImage_{product_id}")
    }

    /// Remember the image of the variant just added to the cart so drawer
    /// rendering can show it even though the cart API reports the base
    /// product image.
    pub fn store_variant_image(&self, product_id: &ProductId, url: &str) {
        self.local_set(&Self::variant_image_key(product_id), url);
    }

    /// Look up a stored variant image override.
    #[must_use]
    pub fn variant_image(&self, product_id: &ProductId) -> Option<String> {
        self.local_get(&Self::variant_image_key(product_id))
    }

    /// Whether the price-change banner was dismissed this tab session.
    #[must_use]
    pub fn price_banner_dismissed(&self) -> bool {
        self.session_get(PRICE_BANNER_DISMISSED_KEY)
            .is_some_and(|v| v == "true")
    }

    /// Record a price-change banner dismissal for this tab session.
    pub fn dismiss_price_banner(&self) {
        self.session_set(PRICE_BANNER_DISMISSED_KEY, "true");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logged_in_cookie() {
        let session = ClientSession::new();
        assert!(!session.is_logged_in());

        session.set_cookie(LOGGED_IN_COOKIE, "false");
        assert!(!session.is_logged_in());

        session.set_cookie(LOGGED_IN_COOKIE, "true");
        assert!(session.is_logged_in());
    }

    #[test]
    fn test_variant_image_roundtrip() {
        let session = ClientSession::new();
        let product = ProductId::new("prod-1");
        assert_eq!(session.variant_image(&product), None);

        session.store_variant_image(&product, "https://cdn.example.com/red.jpg");
        assert_eq!(
            session.variant_image(&product).as_deref(),
            Some("https://cdn.example.com/red.jpg")
        );
        assert_eq!(
            ClientSession::variant_image_key(&product),
            "variantImage_prod-1"
        );
    }

    #[test]
    fn test_price_banner_dismissal_is_session_scoped() {
        let session = ClientSession::new();
        assert!(!session.price_banner_dismissed());
        session.dismiss_price_banner();
        assert!(session.price_banner_dismissed());

        // A new tab session starts clean.
        let fresh = ClientSession::new();
        assert!(!fresh.price_banner_dismissed());
    }
}
