//! Add-to-cart orchestration shared by product grids, product pages, and
//! the quick-add modal.
//!
//! This is the one place that knows what to do when a cart mutation needs
//! authentication (walk the login-opener chain) and how to rehydrate the
//! shared cart state after an add (full cart, then forced count, then the
//! fields of the add response itself).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{instrument, warn};
use webstore_core::{ProductId, VariantId};

use crate::api::types::CartPayload;
use crate::api::StorefrontApi;
use crate::cart::manager::CartManager;
use crate::ui::{ButtonState, Page, ToastTone};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type Opener = Box<dyn Fn() + Send + Sync>;

/// Result of an add-to-cart attempt, for callers that react differently
/// (the quick-add modal closes on `Added`, stays open otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added { count: u32 },
    LoginRequired,
    Failed,
}

/// Cart mutations with their user-facing side effects.
pub struct CartActions<A> {
    api: Arc<A>,
    manager: Arc<CartManager<A>>,
    page: Arc<Page>,
    local_opener: Mutex<Option<Opener>>,
    global_opener: Mutex<Option<Opener>>,
}

impl<A: StorefrontApi> CartActions<A> {
    #[must_use]
    pub fn new(api: Arc<A>, manager: Arc<CartManager<A>>, page: Arc<Page>) -> Self {
        Self {
            api,
            manager,
            page,
            local_opener: Mutex::new(None),
            global_opener: Mutex::new(None),
        }
    }

    /// Bind the login opener this component was constructed with.
    pub fn set_local_login_opener(&self, opener: Opener) {
        *lock(&self.local_opener) = Some(opener);
    }

    /// Register the page-wide login opener.
    pub fn set_global_login_opener(&self, opener: Opener) {
        *lock(&self.global_opener) = Some(opener);
    }

    /// Walk the login-opener chain: locally bound opener, then the global
    /// registration, then the fallback of showing the login view directly.
    fn open_login(&self) {
        if let Some(opener) = &*lock(&self.local_opener) {
            opener();
            return;
        }
        if let Some(opener) = &*lock(&self.global_opener) {
            opener();
            return;
        }
        self.page.update_login(|login| login.visible = true);
    }

    /// Add a product to the cart.
    ///
    /// `skip_button_update` is set by callers that manage their own button
    /// state (the quick-add modal).
    #[instrument(skip(self), fields(product = %product_id))]
    pub async fn add_to_cart(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: u32,
        skip_button_update: bool,
    ) -> AddOutcome {
        if !skip_button_update {
            self.page
                .set_product_button(product_id, ButtonState::busy("Adding..."));
        }

        let result = self.api.add_to_cart(product_id, variant_id, quantity).await;

        if !skip_button_update {
            self.page
                .set_product_button(product_id, ButtonState::ready("Add to cart"));
        }

        match result {
            Ok(payload) => {
                let count = self.rehydrate(payload).await;
                self.page.push_toast(ToastTone::Success, "Added to cart");
                AddOutcome::Added { count }
            }
            Err(e) if e.is_auth_required() => {
                self.open_login();
                AddOutcome::LoginRequired
            }
            Err(e) => {
                warn!(error = %e, "add to cart failed");
                self.page.push_toast(ToastTone::Error, &e.user_message());
                AddOutcome::Failed
            }
        }
    }

    /// Refresh the shared cart state after a successful add.
    ///
    /// Chain: a full cart fetch, then a forced count-only fetch, then the
    /// fields of the add response. Whatever source wins is dispatched as
    /// one `CartUpdated` broadcast.
    async fn rehydrate(&self, add_response: CartPayload) -> u32 {
        match self.api.get_cart().await {
            Ok(cart) => self.manager.dispatch_cart_updated(cart.into()),
            Err(e) => {
                warn!(error = %e, "cart rehydration fetch failed, trying count");
                let count = self.manager.cart_count(true).await;
                if count > 0 {
                    self.manager
                        .dispatch_cart_updated(CartPayload::from_count(count))
                } else {
                    self.manager.dispatch_cart_updated(add_response)
                }
            }
        }
    }

    /// Set a cart-page line quantity and broadcast the result.
    #[instrument(skip(self), fields(product = %product_id))]
    pub async fn update_cart_item(&self, product_id: &ProductId, quantity: u32) {
        match self.api.update_cart_item(product_id, quantity).await {
            Ok(payload) => {
                self.manager.dispatch_cart_updated(payload);
            }
            Err(e) => {
                warn!(error = %e, "cart item update failed");
                self.page.push_toast(ToastTone::Error, &e.user_message());
            }
        }
    }

    /// Remove a cart-page line.
    ///
    /// The row disappears immediately; it is restored if the backend
    /// refuses the removal. This optimistic path is cart-page only, the
    /// drawer always reloads instead.
    #[instrument(skip(self), fields(product = %product_id))]
    pub async fn remove_from_cart(&self, product_id: &ProductId) {
        self.page.set_row_removed(product_id, true);

        match self.api.remove_cart_item(product_id).await {
            Ok(payload) => {
                self.manager.dispatch_cart_updated(payload);
            }
            Err(e) => {
                warn!(error = %e, "cart item removal failed, restoring row");
                self.page.set_row_removed(product_id, false);
                self.page.push_toast(ToastTone::Error, &e.user_message());
            }
        }
    }

    /// Flip a product's wishlist membership.
    #[instrument(skip(self), fields(product = %product_id))]
    pub async fn toggle_wishlist(&self, product_id: &ProductId) {
        match self.api.toggle_wishlist(product_id).await {
            Ok(wishlisted) => self.page.set_wishlisted(product_id, wishlisted),
            Err(e) if e.is_auth_required() => self.open_login(),
            Err(e) => {
                warn!(error = %e, "wishlist toggle failed");
                self.page.push_toast(ToastTone::Error, &e.user_message());
            }
        }
    }
}
