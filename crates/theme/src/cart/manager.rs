//! Shared cart state: cached count, badge rendering, update broadcast.
//!
//! Every component that mutates the cart funnels the resulting payload
//! through [`CartManager::dispatch_cart_updated`] so badges, the drawer,
//! and the cache stay agreed on one number.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{instrument, warn};

use crate::api::types::CartPayload;
use crate::api::StorefrontApi;
use crate::events::{EventBus, ThemeEvent};
use crate::ui::Page;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct CountCache {
    count: Option<u32>,
    fetched_at: Option<Instant>,
    /// Receiver handed to callers that arrive while a fetch is in flight.
    inflight: Option<watch::Receiver<Option<u32>>>,
}

enum FetchRole {
    Cached(u32),
    Leader(watch::Sender<Option<u32>>),
    Joiner(watch::Receiver<Option<u32>>),
}

/// Owner of the shared cart count.
pub struct CartManager<A> {
    api: Arc<A>,
    page: Arc<Page>,
    bus: EventBus,
    ttl: Duration,
    cache: Mutex<CountCache>,
}

impl<A: StorefrontApi> CartManager<A> {
    #[must_use]
    pub fn new(api: Arc<A>, page: Arc<Page>, bus: EventBus, ttl: Duration) -> Self {
        Self {
            api,
            page,
            bus,
            ttl,
            cache: Mutex::new(CountCache::default()),
        }
    }

    /// The current cart item count.
    ///
    /// Serves the cached value while it is younger than the TTL (unless
    /// `force_refresh`). Concurrent callers that miss the cache share one
    /// backend request. Fetch failures resolve to 0 rather than erroring;
    /// the failed value is not cached, so the next call retries.
    #[instrument(skip(self))]
    pub async fn cart_count(&self, force_refresh: bool) -> u32 {
        let role = {
            let mut cache = lock(&self.cache);

            if let Some(rx) = &cache.inflight {
                // Even forced refreshes piggyback on the request in flight.
                FetchRole::Joiner(rx.clone())
            } else if !force_refresh
                && let (Some(count), Some(fetched_at)) = (cache.count, cache.fetched_at)
                && fetched_at.elapsed() < self.ttl
            {
                FetchRole::Cached(count)
            } else {
                let (tx, rx) = watch::channel(None);
                cache.inflight = Some(rx);
                FetchRole::Leader(tx)
            }
        };

        match role {
            FetchRole::Cached(count) => count,
            FetchRole::Joiner(mut rx) => {
                if rx.changed().await.is_err() {
                    return 0;
                }
                (*rx.borrow()).unwrap_or(0)
            }
            FetchRole::Leader(tx) => {
                let result = self.api.cart_quantity().await;

                let count = {
                    let mut cache = lock(&self.cache);
                    cache.inflight = None;
                    match result {
                        Ok(count) => {
                            cache.count = Some(count);
                            cache.fetched_at = Some(Instant::now());
                            count
                        }
                        Err(e) => {
                            warn!(error = %e, "cart count fetch failed, resolving 0");
                            0
                        }
                    }
                };

                let _ = tx.send(Some(count));
                count
            }
        }
    }

    /// Broadcast a cart change and re-render the badges.
    ///
    /// Extracts the canonical count from `payload`, publishes
    /// [`ThemeEvent::CartUpdated`], then updates the badges and overwrites
    /// the cached count with a fresh timestamp. Returns the count.
    pub fn dispatch_cart_updated(&self, payload: CartPayload) -> u32 {
        let count = payload.canonical_count();
        self.bus.send(ThemeEvent::CartUpdated {
            count,
            cart: payload,
        });
        self.apply_count(count);
        count
    }

    /// Apply a known count to badges and cache without re-broadcasting.
    ///
    /// This is the path event listeners use, so a badge refresh can never
    /// trigger another `CartUpdated` round.
    pub fn apply_count(&self, count: u32) {
        self.update_cart_badge(i64::from(count));
        let mut cache = lock(&self.cache);
        cache.count = Some(count);
        cache.fetched_at = Some(Instant::now());
    }

    /// Render `count` into every badge; negative input clamps to 0.
    pub fn update_cart_badge(&self, count: i64) {
        let count = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
        self.page.render_cart_count(count);
    }

    /// Drop the cached count so the next read hits the backend.
    pub fn invalidate_cache(&self) {
        let mut cache = lock(&self.cache);
        cache.count = None;
        cache.fetched_at = None;
    }

    /// The event bus this manager publishes on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedApi;
    use crate::error::ApiError;
    use crate::ui::BadgeContext;

    fn manager(api: Arc<ScriptedApi>) -> CartManager<ScriptedApi> {
        CartManager::new(
            api,
            Arc::new(Page::new()),
            EventBus::default(),
            Duration::from_millis(5000),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_is_cached_within_ttl() {
        let api = Arc::new(ScriptedApi::new());
        api.push_quantity(Ok(4));
        let manager = manager(Arc::clone(&api));

        assert_eq!(manager.cart_count(false).await, 4);
        assert_eq!(manager.cart_count(false).await, 4);
        assert_eq!(api.calls("cart_quantity"), 1);

        // One tick shy of the TTL the cache still serves.
        tokio::time::advance(Duration::from_millis(4999)).await;
        assert_eq!(manager.cart_count(false).await, 4);
        assert_eq!(api.calls("cart_quantity"), 1);

        // Past the TTL the cache expires.
        tokio::time::advance(Duration::from_millis(2)).await;
        api.push_quantity(Ok(6));
        assert_eq!(manager.cart_count(false).await, 6);
        assert_eq!(api.calls("cart_quantity"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_refresh_bypasses_fresh_cache() {
        let api = Arc::new(ScriptedApi::new());
        api.push_quantity(Ok(2));
        api.push_quantity(Ok(3));
        let manager = manager(Arc::clone(&api));

        assert_eq!(manager.cart_count(false).await, 2);
        assert_eq!(manager.cart_count(true).await, 3);
        assert_eq!(api.calls("cart_quantity"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_share_one_request() {
        let api = Arc::new(ScriptedApi::new());
        api.set_quantity_delay(Duration::from_millis(50));
        api.push_quantity(Ok(7));
        let manager = manager(Arc::clone(&api));

        let (a, b, c) = tokio::join!(
            manager.cart_count(false),
            manager.cart_count(false),
            // A forced refresh arriving mid-flight joins too.
            manager.cart_count(true),
        );
        assert_eq!((a, b, c), (7, 7, 7));
        assert_eq!(api.calls("cart_quantity"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_resolves_zero_and_is_not_cached() {
        let api = Arc::new(ScriptedApi::new());
        api.push_quantity(Err(ApiError::Backend {
            status: 500,
            message: "boom".to_string(),
        }));
        api.push_quantity(Ok(5));
        let manager = manager(Arc::clone(&api));

        assert_eq!(manager.cart_count(false).await, 0);
        // The failure was not cached; the next call retries immediately.
        assert_eq!(manager.cart_count(false).await, 5);
        assert_eq!(api.calls("cart_quantity"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_cache_forces_refetch() {
        let api = Arc::new(ScriptedApi::new());
        api.push_quantity(Ok(1));
        api.push_quantity(Ok(2));
        let manager = manager(Arc::clone(&api));

        assert_eq!(manager.cart_count(false).await, 1);
        manager.invalidate_cache();
        assert_eq!(manager.cart_count(false).await, 2);
    }

    #[tokio::test]
    async fn test_dispatch_broadcasts_and_renders_badges() {
        let api = Arc::new(ScriptedApi::new());
        let page = Arc::new(Page::new());
        let bus = EventBus::default();
        let manager = CartManager::new(
            api,
            Arc::clone(&page),
            bus.clone(),
            Duration::from_millis(5000),
        );
        let mut rx = bus.subscribe();

        let count = manager.dispatch_cart_updated(CartPayload::from_count(3));
        assert_eq!(count, 3);
        assert!(matches!(
            rx.recv().await.unwrap(),
            ThemeEvent::CartUpdated { count: 3, .. }
        ));
        assert!(page.badges().iter().all(|b| b.text == "3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_refreshes_the_cache() {
        let api = Arc::new(ScriptedApi::new());
        let manager = manager(Arc::clone(&api));

        manager.dispatch_cart_updated(CartPayload::from_count(9));
        // Cache was just written, so no fetch happens.
        assert_eq!(manager.cart_count(false).await, 9);
        assert_eq!(api.calls("cart_quantity"), 0);
    }

    #[test]
    fn test_badge_clamps_negative_counts() {
        let page = Arc::new(Page::with_badges(&[BadgeContext::Header]));
        let manager = CartManager::new(
            Arc::new(ScriptedApi::new()),
            Arc::clone(&page),
            EventBus::default(),
            Duration::from_millis(5000),
        );

        manager.update_cart_badge(-3);
        assert_eq!(page.badges()[0].text, "0");
        assert!(!page.badges()[0].visible);
    }
}
