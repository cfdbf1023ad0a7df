//! Checkout price-change polling.
//!
//! While the customer sits on the checkout page, prices can drift under
//! them. The poller re-checks on a fixed cadence, shows a banner on the
//! rising edge of a detected change, and self-terminates after a hard cap
//! so an abandoned tab stops generating traffic.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::api::types::PriceChangeMetadata;
use crate::api::StorefrontApi;
use crate::session::ClientSession;
use crate::ui::{BannerTone, Page};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Desktop notification sink. The poller only notifies when permission
/// was already granted; it never prompts.
pub trait DesktopNotifier {
    fn permission_granted(&self) -> bool;
    fn notify(&self, title: &str, body: &str);
}

/// Notifier for hosts without a notification surface.
pub struct NoopNotifier;

impl DesktopNotifier for NoopNotifier {
    fn permission_granted(&self) -> bool {
        false
    }

    fn notify(&self, _title: &str, _body: &str) {}
}

#[derive(Default)]
struct PollerState {
    active: bool,
    visible: bool,
    on_checkout_route: bool,
    attempts: u32,
    /// Last observed (detected, items_changed) pair.
    last: Option<(bool, u32)>,
}

/// The checkout price poller.
pub struct PricePoller<A, N> {
    api: Arc<A>,
    page: Arc<Page>,
    session: Arc<ClientSession>,
    notifier: N,
    interval: Duration,
    max_attempts: u32,
    state: Mutex<PollerState>,
}

impl<A: StorefrontApi, N: DesktopNotifier> PricePoller<A, N> {
    #[must_use]
    pub fn new(
        api: Arc<A>,
        page: Arc<Page>,
        session: Arc<ClientSession>,
        notifier: N,
        interval: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            api,
            page,
            session,
            notifier,
            interval,
            max_attempts,
            state: Mutex::new(PollerState {
                visible: true,
                ..PollerState::default()
            }),
        }
    }

    /// Arm or disarm based on the current route. Arming resets the
    /// attempt budget.
    pub fn activate(&self, route: &str) {
        let mut state = lock(&self.state);
        state.on_checkout_route = route.starts_with("/checkout");
        if state.on_checkout_route && state.visible {
            state.active = true;
            state.attempts = 0;
        } else {
            state.active = false;
        }
    }

    /// Page visibility change: pause when hidden, resume when visible.
    /// The attempt budget carries across pauses.
    pub fn set_visible(&self, visible: bool) {
        let mut state = lock(&self.state);
        state.visible = visible;
        state.active = visible && state.on_checkout_route && state.attempts < self.max_attempts;
    }

    /// Stop for good (navigation away).
    pub fn unload(&self) {
        lock(&self.state).active = false;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }

    /// Run the polling loop until the poller deactivates.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if !self.is_active() {
                break;
            }
            self.poll_once().await;
        }
    }

    /// One polling step.
    ///
    /// The attempt counter is consumed before the fetch, so once the cap
    /// is reached no further request leaves this client.
    #[instrument(skip(self))]
    pub async fn poll_once(&self) {
        {
            let mut state = lock(&self.state);
            if !state.active {
                return;
            }
            state.attempts += 1;
            if state.attempts > self.max_attempts {
                debug!("price poll attempt cap reached, stopping");
                state.active = false;
                return;
            }
        }

        match self.api.get_checkout().await {
            Ok(checkout) => {
                let meta = checkout.price_changes.unwrap_or_default();
                self.handle_metadata(&meta);
            }
            Err(e) => warn!(error = %e, "checkout price re-check failed"),
        }
    }

    fn handle_metadata(&self, meta: &PriceChangeMetadata) {
        let snapshot = (meta.detected, meta.items_changed);
        let rising_edge = {
            let mut state = lock(&self.state);
            let changed = state.last != Some(snapshot);
            state.last = Some(snapshot);
            meta.detected && changed
        };

        if !rising_edge {
            return;
        }
        if self.session.price_banner_dismissed() {
            return;
        }

        let tone = if meta.has_critical_issues {
            BannerTone::Critical
        } else if meta.total_change.is_some_and(|c| c.amount() < 0.0) {
            BannerTone::Decrease
        } else {
            BannerTone::Info
        };
        let message = if meta.items_changed == 1 {
            "The price of 1 item in your order has changed.".to_string()
        } else {
            format!(
                "The prices of {} items in your order have changed.",
                meta.items_changed
            )
        };

        self.page.update_banner(|banner| {
            banner.visible = true;
            banner.tone = tone;
            banner.message = message.clone();
        });

        if self.notifier.permission_granted() {
            self.notifier.notify("Price update", &message);
        }
    }

    /// Hide the banner and remember the dismissal for this tab session.
    pub fn dismiss_banner(&self) {
        self.session.dismiss_price_banner();
        self.page.update_banner(|banner| banner.visible = false);
    }

    /// Checkout form submission.
    ///
    /// `acknowledgment` is the state of the price-change acknowledgment
    /// checkbox when one is rendered. Submission is blocked while the
    /// banner is visible and the box is unchecked; a successful submit
    /// stops the poller.
    pub fn form_submitted(&self, acknowledgment: Option<bool>) -> bool {
        if self.page.banner().visible && acknowledgment == Some(false) {
            return false;
        }
        lock(&self.state).active = false;
        true
    }
}
