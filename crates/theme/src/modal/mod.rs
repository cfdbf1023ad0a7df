//! Quick-add modal: pick a variant without leaving the grid.

pub mod options;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{instrument, warn};
use webstore_core::ProductId;

use crate::api::types::Product;
use crate::api::StorefrontApi;
use crate::cart::orchestrator::{AddOutcome, CartActions};
use crate::session::ClientSession;
use crate::ui::{ButtonState, ModalView, OptionGroupView, OptionValueView, Page};
use options::{
    build_option_groups, default_selection, resolve_variant, OptionGroup, OptionKey,
    ResolvedVariant, Selection,
};

const MIN_QUANTITY: u32 = 1;
const MAX_QUANTITY: u32 = 99;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Why the modal is being asked to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Button,
    Overlay,
    Escape,
}

/// What `open` decided to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    /// Combination and subscription products cannot be configured here;
    /// the caller should navigate to the product page instead.
    RedirectToProduct { slug: Option<String> },
}

/// Live state of one modal interaction. Dropped on close.
struct ModalSession {
    product: Product,
    groups: Vec<OptionGroup>,
    selection: Selection,
    resolved: ResolvedVariant,
    quantity: u32,
    /// Set for the whole duration of a confirm; guards every other
    /// interaction, including close.
    adding: bool,
}

/// The quick-add modal controller.
pub struct QuickAddModal<A> {
    api: Arc<A>,
    actions: Arc<CartActions<A>>,
    page: Arc<Page>,
    session_store: Arc<ClientSession>,
    currency_symbol: String,
    state: Mutex<Option<ModalSession>>,
}

impl<A: StorefrontApi> QuickAddModal<A> {
    #[must_use]
    pub fn new(
        api: Arc<A>,
        actions: Arc<CartActions<A>>,
        page: Arc<Page>,
        session_store: Arc<ClientSession>,
        currency_symbol: &str,
    ) -> Self {
        Self {
            api,
            actions,
            page,
            session_store,
            currency_symbol: currency_symbol.to_string(),
            state: Mutex::new(None),
        }
    }

    /// Open the modal for a product.
    ///
    /// Fetches product detail, builds the option groups, applies the
    /// default selection, and resolves the initial variant. Products with
    /// combinations or subscriptions are redirected to their page.
    #[instrument(skip(self), fields(product = %product_id))]
    pub async fn open(&self, product_id: &ProductId) -> Result<OpenOutcome, crate::error::ThemeError> {
        let product = self.api.get_product(product_id).await?;

        if product.needs_product_page() {
            return Ok(OpenOutcome::RedirectToProduct {
                slug: product.slug.clone(),
            });
        }

        let groups = build_option_groups(&product.variants);
        let selection = default_selection(&groups);
        let resolved = resolve_variant(&product, &selection);

        *lock(&self.state) = Some(ModalSession {
            product,
            groups,
            selection,
            resolved,
            quantity: MIN_QUANTITY,
            adding: false,
        });
        self.render();
        Ok(OpenOutcome::Opened)
    }

    /// Change one option axis. Ignored while an add is in flight.
    pub fn select_option(&self, key: &OptionKey, value: &str) {
        {
            let mut state = lock(&self.state);
            let Some(session) = state.as_mut() else {
                return;
            };
            if session.adding {
                return;
            }
            session.selection.insert(key.clone(), value.to_string());
            session.resolved = resolve_variant(&session.product, &session.selection);
        }
        self.render();
    }

    /// Set the desired quantity, clamped to `[1, 99]`.
    pub fn set_quantity(&self, quantity: u32) {
        {
            let mut state = lock(&self.state);
            let Some(session) = state.as_mut() else {
                return;
            };
            if session.adding {
                return;
            }
            session.quantity = quantity.clamp(MIN_QUANTITY, MAX_QUANTITY);
        }
        self.render();
    }

    /// Submit the current selection to the cart.
    ///
    /// Re-resolves the variant right before the request so the submitted
    /// variant always matches what the customer sees. Returns the add
    /// outcome; the modal closes itself only on success.
    #[instrument(skip(self))]
    pub async fn confirm(&self) -> AddOutcome {
        let Some((product_id, variant_id, quantity, image)) = self.prepare_confirm() else {
            return AddOutcome::Failed;
        };

        // Remember the variant image so the drawer can show it even though
        // the cart API reports the base product image.
        if let Some(image) = &image {
            self.session_store.store_variant_image(&product_id, image);
        }

        let outcome = self
            .actions
            .add_to_cart(&product_id, variant_id.as_ref(), quantity, true)
            .await;

        {
            let mut state = lock(&self.state);
            if let Some(session) = state.as_mut() {
                session.adding = false;
            }
            if matches!(outcome, AddOutcome::Added { .. }) {
                *state = None;
            }
        }

        if matches!(outcome, AddOutcome::Added { .. }) {
            self.page.update_modal(|m| *m = ModalView::default());
        } else {
            self.render();
        }
        outcome
    }

    /// Close request from the close button, the overlay, or Escape.
    /// Refused while an add is in flight.
    pub fn request_close(&self, reason: CloseReason) -> bool {
        let _ = reason;
        let mut state = lock(&self.state);
        if state.as_ref().is_some_and(|s| s.adding) {
            return false;
        }
        *state = None;
        drop(state);
        self.page.update_modal(|m| *m = ModalView::default());
        true
    }

    /// Snapshot confirm inputs and flip the adding guard, or bail when
    /// there is no session or a confirm is already running.
    fn prepare_confirm(
        &self,
    ) -> Option<(ProductId, Option<webstore_core::VariantId>, u32, Option<String>)> {
        let mut state = lock(&self.state);
        let session = state.as_mut()?;
        if session.adding {
            warn!("confirm ignored, add already in flight");
            return None;
        }
        session.adding = true;

        if !session.selection.is_empty() {
            session.resolved = resolve_variant(&session.product, &session.selection);
        }

        let product_id = session.product.id.clone();
        let variant_id = (!session.resolved.synthetic).then(|| session.resolved.variant.id.clone());
        let image = session.resolved.variant.images.first().cloned();
        let quantity = session.quantity;
        drop(state);

        self.render();
        Some((product_id, variant_id, quantity, image))
    }

    /// Project the session into the page view-model.
    fn render(&self) {
        let state = lock(&self.state);
        let Some(session) = state.as_ref() else {
            return;
        };

        let price = if session.resolved.synthetic {
            session.product.base_price()
        } else {
            session.resolved.variant.effective_price()
        };
        let mrp_text = session
            .resolved
            .variant
            .effective_mrp()
            .map(|m| m.format(&self.currency_symbol));
        let image = session
            .resolved
            .variant
            .images
            .first()
            .cloned()
            .or_else(|| session.product.primary_image().map(str::to_string));
        let available = if session.resolved.synthetic {
            session.product.is_available()
        } else {
            session.resolved.variant.is_available()
        };

        let groups = session
            .groups
            .iter()
            .map(|group| OptionGroupView {
                label: group.key.label().to_string(),
                values: group
                    .values
                    .iter()
                    .map(|value| OptionValueView {
                        value: value.value.clone(),
                        selected: session.selection.get(&group.key) == Some(&value.value),
                        available: value.available,
                    })
                    .collect(),
            })
            .collect();

        let confirm = if session.adding {
            ButtonState::busy("Adding...")
        } else if available {
            ButtonState::ready("Add to cart")
        } else {
            ButtonState {
                enabled: false,
                label: "Sold out".to_string(),
            }
        };

        let view = ModalView {
            visible: true,
            title: session.product.title.clone(),
            price_text: price.format(&self.currency_symbol),
            mrp_text,
            image,
            current_product_id: Some(session.product.id.clone()),
            option_groups: groups,
            quantity: session.quantity,
            confirm,
            error: None,
        };
        drop(state);
        self.page.update_modal(|m| *m = view);
    }
}
