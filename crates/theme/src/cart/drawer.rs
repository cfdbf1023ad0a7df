//! Cart drawer controller.
//!
//! The drawer is a slide-out panel with its own copy of the cart lines.
//! It never trusts partial payloads: every mutation triggers a full cart
//! reload, and only the quantity-revert path re-renders from memory.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use askama::Template;
use tokio::task::AbortHandle;
use tracing::{error, instrument, warn};

use crate::api::types::{Cart, CartItem};
use crate::api::StorefrontApi;
use crate::cart::manager::CartManager;
use crate::session::ClientSession;
use crate::ui::{ButtonState, Page};
use webstore_core::{ProductId, VariantId};

/// Quantity bounds enforced on drawer inputs.
const MIN_QUANTITY: u32 = 1;
const MAX_QUANTITY: u32 = 99;

/// How long the checkout button may stay in its processing state before
/// the fallback timer restores it.
const CHECKOUT_RESET_AFTER: Duration = Duration::from_secs(5);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Template)]
#[template(path = "partials/cart_items.html")]
struct CartItemsTemplate {
    items: Vec<DrawerItemView>,
}

struct DrawerItemView {
    product_id: String,
    variant_id: Option<String>,
    title: String,
    variant_title: Option<String>,
    image: Option<String>,
    slug: String,
    quantity: u32,
    price_text: String,
}

#[derive(Default)]
struct DrawerState {
    lines: Vec<CartItem>,
    checkout_busy: bool,
    checkout_reset: Option<AbortHandle>,
}

/// The cart drawer.
pub struct CartDrawer<A> {
    api: Arc<A>,
    manager: Arc<CartManager<A>>,
    page: Arc<Page>,
    session: Arc<ClientSession>,
    currency_symbol: String,
    state: Arc<Mutex<DrawerState>>,
}

impl<A: StorefrontApi> CartDrawer<A> {
    #[must_use]
    pub fn new(
        api: Arc<A>,
        manager: Arc<CartManager<A>>,
        page: Arc<Page>,
        session: Arc<ClientSession>,
        currency_symbol: &str,
    ) -> Self {
        Self {
            api,
            manager,
            page,
            session,
            currency_symbol: currency_symbol.to_string(),
            state: Arc::new(Mutex::new(DrawerState::default())),
        }
    }

    /// Open the drawer: reset the checkout button, lock page scroll, and
    /// reload the cart.
    #[instrument(skip(self))]
    pub async fn open(&self) {
        self.reset_checkout_button();
        self.page.update_drawer(|d| d.open = true);
        self.page.set_body_scroll_locked(true);
        self.load_cart().await;
    }

    /// Close the drawer and restore page scroll.
    pub fn close(&self) {
        self.page.update_drawer(|d| d.open = false);
        self.page.set_body_scroll_locked(false);
    }

    /// Open automatically when the landing query string asks for it.
    pub async fn handle_page_query(&self, query: &str) {
        let wants_open = url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .any(|(key, value)| key == "openCart" && value == "true");
        if wants_open {
            self.open().await;
        }
    }

    /// Reload the drawer contents from the backend.
    ///
    /// Shows the loading indicator, branches to the empty or list state,
    /// and on success concludes by applying the fresh count to the shared
    /// badge state. Failures render the empty state; the loading indicator
    /// is never left visible.
    #[instrument(skip(self))]
    pub async fn load_cart(&self) {
        self.page.update_drawer(|d| d.loading = true);

        match self.api.get_cart().await {
            Ok(cart) => {
                let count = cart.count();
                lock(&self.state).lines = cart.items.clone();
                self.render(&cart);
                self.page.update_drawer(|d| d.loading = false);
                self.manager.apply_count(count);
            }
            Err(e) => {
                error!(error = %e, "cart drawer load failed");
                lock(&self.state).lines.clear();
                self.render_empty();
                self.page.update_drawer(|d| d.loading = false);
            }
        }
    }

    /// Step a line's quantity by `delta`, clamped to `[1, 99]`.
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        delta: i64,
    ) {
        let Some(current) = self.line_quantity(product_id, variant_id) else {
            return;
        };
        let requested = i64::from(current).saturating_add(delta);
        self.apply_quantity(product_id, variant_id, current, requested)
            .await;
    }

    /// Apply a typed-in quantity, clamped to `[1, 99]`.
    pub async fn sync_quantity(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        requested: i64,
    ) {
        let Some(current) = self.line_quantity(product_id, variant_id) else {
            return;
        };
        self.apply_quantity(product_id, variant_id, current, requested)
            .await;
    }

    async fn apply_quantity(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        current: u32,
        requested: i64,
    ) {
        let clamped = requested
            .clamp(i64::from(MIN_QUANTITY), i64::from(MAX_QUANTITY));
        let quantity = u32::try_from(clamped).unwrap_or(MIN_QUANTITY);
        if quantity == current {
            // Still re-render so a typed out-of-range value snaps back.
            self.render_stored();
            return;
        }

        match self
            .api
            .update_cart_line(product_id, variant_id, quantity)
            .await
        {
            Ok(_) => self.load_cart().await,
            Err(e) => {
                warn!(error = %e, "quantity update failed, reverting");
                self.render_stored();
            }
        }
    }

    /// Remove a line, then reload. No optimistic removal in the drawer.
    pub async fn remove_item(&self, product_id: &ProductId, variant_id: Option<&VariantId>) {
        match self.api.remove_cart_line(product_id, variant_id).await {
            Ok(_) => self.load_cart().await,
            Err(e) => error!(error = %e, "cart drawer remove failed"),
        }
    }

    /// Badge-only reaction to a `CartUpdated` broadcast. Goes through the
    /// skip-dispatch path so it can never re-broadcast.
    pub fn on_cart_updated(&self, count: u32) {
        self.manager.apply_count(count);
    }

    // -------------------------------------------------------------------------
    // Checkout button
    // -------------------------------------------------------------------------

    /// Start checkout navigation. Returns false when a submission is
    /// already in flight. Arms a fallback timer that restores the button
    /// in case navigation never happens.
    pub fn begin_checkout(&self) -> bool {
        {
            let mut state = lock(&self.state);
            if state.checkout_busy {
                return false;
            }
            state.checkout_busy = true;
            if let Some(handle) = state.checkout_reset.take() {
                handle.abort();
            }
        }

        self.page
            .update_drawer(|d| d.checkout = ButtonState::busy("Processing..."));

        let page = Arc::clone(&self.page);
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(CHECKOUT_RESET_AFTER).await;
            let mut state = lock(&state);
            state.checkout_busy = false;
            state.checkout_reset = None;
            drop(state);
            page.update_drawer(|d| d.checkout = ButtonState::ready("Checkout"));
        });
        lock(&self.state).checkout_reset = Some(handle.abort_handle());
        true
    }

    /// Cancel the fallback reset; called on before-unload, when navigation
    /// is actually happening.
    pub fn cancel_checkout_reset(&self) {
        if let Some(handle) = lock(&self.state).checkout_reset.take() {
            handle.abort();
        }
    }

    fn reset_checkout_button(&self) {
        let mut state = lock(&self.state);
        state.checkout_busy = false;
        if let Some(handle) = state.checkout_reset.take() {
            handle.abort();
        }
        drop(state);
        self.page
            .update_drawer(|d| d.checkout = ButtonState::ready("Checkout"));
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    fn line_quantity(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> Option<u32> {
        lock(&self.state)
            .lines
            .iter()
            .find(|line| {
                line.product_id == *product_id && line.variant_id.as_ref() == variant_id
            })
            .map(|line| line.quantity)
    }

    fn render_stored(&self) {
        let cart = Cart {
            items: lock(&self.state).lines.clone(),
            item_count: None,
            total: None,
        };
        if cart.items.is_empty() {
            self.render_empty();
        } else {
            self.render(&cart);
        }
    }

    fn render(&self, cart: &Cart) {
        if cart.items.is_empty() {
            self.render_empty();
            return;
        }

        let items = cart
            .items
            .iter()
            .map(|item| self.item_view(item))
            .collect();
        let html = match (CartItemsTemplate { items }).render() {
            Ok(html) => html,
            Err(e) => {
                error!(error = %e, "cart items fragment render failed");
                String::new()
            }
        };
        let total_text = cart
            .total
            .map(|t| t.format(&self.currency_symbol))
            .unwrap_or_default();

        self.page.update_drawer(|d| {
            d.empty_visible = false;
            d.list_visible = true;
            d.footer_visible = true;
            d.items_html = html;
            d.total_text = total_text;
        });
    }

    fn render_empty(&self) {
        self.page.update_drawer(|d| {
            d.empty_visible = true;
            d.list_visible = false;
            d.footer_visible = false;
            d.items_html.clear();
            d.total_text.clear();
        });
    }

    fn item_view(&self, item: &CartItem) -> DrawerItemView {
        // A stored variant image beats whatever the cart API reports.
        let image = self
            .session
            .variant_image(&item.product_id)
            .or_else(|| item.image.clone());

        DrawerItemView {
            product_id: item.product_id.to_string(),
            variant_id: item.variant_id.as_ref().map(ToString::to_string),
            title: item.title.clone(),
            variant_title: item.variant_title.clone(),
            image,
            slug: item
                .product_slug
                .clone()
                .unwrap_or_else(|| item.product_id.to_string()),
            quantity: item.quantity,
            price_text: item
                .line_price
                .map(|p| p.format(&self.currency_symbol))
                .unwrap_or_default(),
        }
    }
}
