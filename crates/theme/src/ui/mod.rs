//! In-memory page view-model.
//!
//! The engine does not touch a real DOM; controllers render into this
//! shared structure and a host shell (or a test) reads it back. Each
//! region mirrors a fixed piece of storefront chrome: cart badges, the
//! cart drawer, the quick-add modal, the checkout banner, toasts, the
//! login modal, and the delivery-zone modal.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use webstore_core::ProductId;

/// Recover the guard from a poisoned lock; the view-model stays usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Region view structs
// =============================================================================

/// Where a cart-count badge sits. Header badges hide at zero, the badge on
/// the drawer title stays visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeContext {
    Header,
    DrawerTitle,
}

/// One cart-count badge.
#[derive(Debug, Clone)]
pub struct Badge {
    pub context: BadgeContext,
    pub text: String,
    pub count: u32,
    pub visible: bool,
}

/// Enabled/label pair for a rendered button.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub enabled: bool,
    pub label: String,
}

impl ButtonState {
    #[must_use]
    pub fn ready(label: &str) -> Self {
        Self {
            enabled: true,
            label: label.to_string(),
        }
    }

    #[must_use]
    pub fn busy(label: &str) -> Self {
        Self {
            enabled: false,
            label: label.to_string(),
        }
    }
}

/// Cart drawer region.
#[derive(Debug, Clone)]
pub struct DrawerView {
    pub open: bool,
    pub loading: bool,
    pub empty_visible: bool,
    pub list_visible: bool,
    pub footer_visible: bool,
    pub items_html: String,
    pub total_text: String,
    pub checkout: ButtonState,
}

impl Default for DrawerView {
    fn default() -> Self {
        Self {
            open: false,
            loading: false,
            empty_visible: false,
            list_visible: false,
            footer_visible: false,
            items_html: String::new(),
            total_text: String::new(),
            checkout: ButtonState::ready("Checkout"),
        }
    }
}

/// Quick-add modal region.
#[derive(Debug, Clone, Default)]
pub struct ModalView {
    pub visible: bool,
    pub title: String,
    pub price_text: String,
    /// Strike-through price; only set when it exceeds the selling price.
    pub mrp_text: Option<String>,
    pub image: Option<String>,
    pub current_product_id: Option<ProductId>,
    pub option_groups: Vec<OptionGroupView>,
    pub quantity: u32,
    pub confirm: ButtonState,
    pub error: Option<String>,
}

/// One rendered option group inside the quick-add modal.
#[derive(Debug, Clone, Default)]
pub struct OptionGroupView {
    pub label: String,
    pub values: Vec<OptionValueView>,
}

/// One selectable swatch/chip in an option group.
#[derive(Debug, Clone, Default)]
pub struct OptionValueView {
    pub value: String,
    pub selected: bool,
    pub available: bool,
}

/// Visual weight of the checkout price-change banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BannerTone {
    #[default]
    Info,
    Decrease,
    Critical,
}

/// Checkout price-change banner region.
#[derive(Debug, Clone, Default)]
pub struct BannerView {
    pub visible: bool,
    pub tone: BannerTone,
    pub message: String,
}

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastTone {
    Success,
    Error,
}

/// A transient notification.
#[derive(Debug, Clone)]
pub struct Toast {
    pub tone: ToastTone,
    pub message: String,
}

/// Which pane of the login modal is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginPane {
    #[default]
    MethodSelect,
    Password,
    EmailOtpInput,
    EmailOtpVerify,
    PhoneOtpInput,
    PhoneOtpVerify,
    Success,
}

/// Login modal region.
#[derive(Debug, Clone, Default)]
pub struct LoginView {
    pub visible: bool,
    pub pane: LoginPane,
    pub step_label: String,
    pub error: Option<String>,
    pub busy: bool,
}

/// Delivery-zone modal region.
#[derive(Debug, Clone, Default)]
pub struct ZoneView {
    pub visible: bool,
    pub results_html: String,
    pub city_options_html: String,
    pub message: Option<String>,
}

// =============================================================================
// Page
// =============================================================================

#[derive(Debug, Clone, Default)]
struct PageState {
    badges: Vec<Badge>,
    cart_toggle_label: String,
    drawer: DrawerView,
    modal: ModalView,
    banner: BannerView,
    toasts: Vec<Toast>,
    login: LoginView,
    zone: ZoneView,
    body_scroll_locked: bool,
    product_buttons: HashMap<ProductId, ButtonState>,
    removed_rows: Vec<ProductId>,
    wishlist: HashMap<ProductId, bool>,
}

/// The shared page view-model. Cheap interior mutability behind one lock;
/// controllers hold it as `Arc<Page>`.
#[derive(Debug, Default)]
pub struct Page {
    state: Mutex<PageState>,
}

impl Page {
    /// A page with the standard badge set: two header badges and the badge
    /// on the drawer title.
    #[must_use]
    pub fn new() -> Self {
        Self::with_badges(&[
            BadgeContext::Header,
            BadgeContext::Header,
            BadgeContext::DrawerTitle,
        ])
    }

    /// A page with an explicit badge layout.
    #[must_use]
    pub fn with_badges(contexts: &[BadgeContext]) -> Self {
        let badges = contexts
            .iter()
            .map(|&context| Badge {
                context,
                text: "0".to_string(),
                count: 0,
                visible: context == BadgeContext::DrawerTitle,
            })
            .collect();
        Self {
            state: Mutex::new(PageState {
                badges,
                cart_toggle_label: "Cart, 0 items".to_string(),
                ..PageState::default()
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Badges and cart toggles
    // -------------------------------------------------------------------------

    /// Render `count` into every badge and refresh the cart-toggle label.
    ///
    /// Idempotent. Header badges hide at zero, drawer-title badges stay
    /// visible, and the toggle label uses singular/plural wording.
    pub fn render_cart_count(&self, count: u32) {
        let mut state = lock(&self.state);
        for badge in &mut state.badges {
            badge.text = count.to_string();
            badge.count = count;
            badge.visible = badge.context == BadgeContext::DrawerTitle || count > 0;
        }
        state.cart_toggle_label = if count == 1 {
            "Cart, 1 item".to_string()
        } else {
            format!("Cart, {count} items")
        };
    }

    #[must_use]
    pub fn badges(&self) -> Vec<Badge> {
        lock(&self.state).badges.clone()
    }

    #[must_use]
    pub fn cart_toggle_label(&self) -> String {
        lock(&self.state).cart_toggle_label.clone()
    }

    // -------------------------------------------------------------------------
    // Region accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn drawer(&self) -> DrawerView {
        lock(&self.state).drawer.clone()
    }

    pub fn update_drawer(&self, f: impl FnOnce(&mut DrawerView)) {
        f(&mut lock(&self.state).drawer);
    }

    #[must_use]
    pub fn modal(&self) -> ModalView {
        lock(&self.state).modal.clone()
    }

    pub fn update_modal(&self, f: impl FnOnce(&mut ModalView)) {
        f(&mut lock(&self.state).modal);
    }

    #[must_use]
    pub fn banner(&self) -> BannerView {
        lock(&self.state).banner.clone()
    }

    pub fn update_banner(&self, f: impl FnOnce(&mut BannerView)) {
        f(&mut lock(&self.state).banner);
    }

    #[must_use]
    pub fn login(&self) -> LoginView {
        lock(&self.state).login.clone()
    }

    pub fn update_login(&self, f: impl FnOnce(&mut LoginView)) {
        f(&mut lock(&self.state).login);
    }

    #[must_use]
    pub fn zone(&self) -> ZoneView {
        lock(&self.state).zone.clone()
    }

    pub fn update_zone(&self, f: impl FnOnce(&mut ZoneView)) {
        f(&mut lock(&self.state).zone);
    }

    // -------------------------------------------------------------------------
    // Toasts
    // -------------------------------------------------------------------------

    pub fn push_toast(&self, tone: ToastTone, message: &str) {
        lock(&self.state).toasts.push(Toast {
            tone,
            message: message.to_string(),
        });
    }

    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        lock(&self.state).toasts.clone()
    }

    // -------------------------------------------------------------------------
    // Body scroll lock
    // -------------------------------------------------------------------------

    pub fn set_body_scroll_locked(&self, locked: bool) {
        lock(&self.state).body_scroll_locked = locked;
    }

    #[must_use]
    pub fn body_scroll_locked(&self) -> bool {
        lock(&self.state).body_scroll_locked
    }

    // -------------------------------------------------------------------------
    // Per-product add buttons
    // -------------------------------------------------------------------------

    pub fn set_product_button(&self, product_id: &ProductId, button: ButtonState) {
        lock(&self.state)
            .product_buttons
            .insert(product_id.clone(), button);
    }

    #[must_use]
    pub fn product_button(&self, product_id: &ProductId) -> Option<ButtonState> {
        lock(&self.state).product_buttons.get(product_id).cloned()
    }

    // -------------------------------------------------------------------------
    // Cart page rows and wishlist hearts
    // -------------------------------------------------------------------------

    /// Mark or restore a cart-page row hidden by an optimistic removal.
    pub fn set_row_removed(&self, product_id: &ProductId, removed: bool) {
        let mut state = lock(&self.state);
        if removed {
            if !state.removed_rows.contains(product_id) {
                state.removed_rows.push(product_id.clone());
            }
        } else {
            state.removed_rows.retain(|id| id != product_id);
        }
    }

    #[must_use]
    pub fn removed_rows(&self) -> Vec<ProductId> {
        lock(&self.state).removed_rows.clone()
    }

    pub fn set_wishlisted(&self, product_id: &ProductId, wishlisted: bool) {
        lock(&self.state)
            .wishlist
            .insert(product_id.clone(), wishlisted);
    }

    #[must_use]
    pub fn wishlisted(&self, product_id: &ProductId) -> bool {
        lock(&self.state)
            .wishlist
            .get(product_id)
            .copied()
            .unwrap_or(false)
    }
}
