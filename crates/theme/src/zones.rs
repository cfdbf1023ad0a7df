//! Delivery-zone selection modal.
//!
//! A one-shot flow: the customer picks a zone by zipcode search, by city,
//! or gives up on auto-detection and types it in. Zipcode search debounces
//! keystrokes and drops stale responses via a generation counter.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use askama::Template;
use tracing::{error, instrument};
use webstore_core::ZoneId;

use crate::api::types::{CityZone, ZipcodeMatch};
use crate::api::StorefrontApi;
use crate::ui::Page;

const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
const MIN_QUERY_LEN: usize = 2;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Template)]
#[template(path = "partials/zipcode_results.html")]
struct ZipcodeResultsTemplate {
    results: Vec<ZipcodeMatch>,
}

#[derive(Template)]
#[template(path = "partials/city_options.html")]
struct CityOptionsTemplate {
    cities: Vec<CityZone>,
}

/// How the customer is choosing their zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneMode {
    #[default]
    Zipcode,
    City,
    AutoDetect,
}

/// What the host should do after a successful selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneOutcome {
    /// The zone is persisted; reload so every price reflects it.
    Reload,
}

#[derive(Default)]
struct ZoneState {
    mode: ZoneMode,
    generation: u64,
    chosen_zipcode: Option<String>,
    chosen_city: Option<ZoneId>,
}

/// The delivery-zone modal controller.
pub struct ZoneSelector<A> {
    api: Arc<A>,
    page: Arc<Page>,
    state: Mutex<ZoneState>,
}

impl<A: StorefrontApi> ZoneSelector<A> {
    #[must_use]
    pub fn new(api: Arc<A>, page: Arc<Page>) -> Self {
        Self {
            api,
            page,
            state: Mutex::new(ZoneState::default()),
        }
    }

    /// Show the modal in zipcode mode.
    pub fn open(&self) {
        *lock(&self.state) = ZoneState::default();
        self.page.update_zone(|zone| {
            zone.visible = true;
            zone.results_html.clear();
            zone.city_options_html.clear();
            zone.message = None;
        });
    }

    pub fn close(&self) {
        self.page.update_zone(|zone| zone.visible = false);
    }

    /// Switch modes. Auto-detect stays backend-owned, so it only surfaces
    /// the manual-entry guidance.
    pub fn set_mode(&self, mode: ZoneMode) {
        lock(&self.state).mode = mode;
        let message = (mode == ZoneMode::AutoDetect)
            .then(|| "We couldn't detect your location. Please enter your zipcode.".to_string());
        self.page.update_zone(|zone| zone.message = message);
    }

    /// Debounced zipcode search.
    ///
    /// Queries shorter than two characters clear the results. Each call
    /// invalidates the previous one; a response that comes back for a
    /// superseded query is dropped.
    #[instrument(skip(self))]
    pub async fn search_zipcodes(&self, query: &str) {
        let query = query.trim().to_string();
        if query.len() < MIN_QUERY_LEN {
            self.page.update_zone(|zone| zone.results_html.clear());
            return;
        }

        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.generation
        };

        tokio::time::sleep(SEARCH_DEBOUNCE).await;
        if lock(&self.state).generation != generation {
            return;
        }

        let results = match self.api.search_zipcodes(&query).await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "zipcode search failed");
                return;
            }
        };
        if lock(&self.state).generation != generation {
            return;
        }

        match (ZipcodeResultsTemplate { results }).render() {
            Ok(html) => self.page.update_zone(|zone| zone.results_html = html),
            Err(e) => error!(error = %e, "zipcode results fragment render failed"),
        }
    }

    /// The customer picked a zipcode from the results.
    pub fn choose_zipcode(&self, zipcode: &str) {
        let mut state = lock(&self.state);
        state.chosen_zipcode = Some(zipcode.to_string());
        state.chosen_city = None;
    }

    /// Populate the city select for city mode.
    #[instrument(skip(self))]
    pub async fn load_cities(&self) {
        let cities = match self.api.list_cities().await {
            Ok(cities) => cities,
            Err(e) => {
                error!(error = %e, "city list load failed");
                self.page
                    .update_zone(|zone| zone.message = Some("Could not load cities.".to_string()));
                return;
            }
        };

        match (CityOptionsTemplate { cities }).render() {
            Ok(html) => self
                .page
                .update_zone(|zone| zone.city_options_html = html),
            Err(e) => error!(error = %e, "city options fragment render failed"),
        }
    }

    /// The customer picked a city from the select.
    pub fn choose_city(&self, zone_id: &ZoneId) {
        let mut state = lock(&self.state);
        state.chosen_city = Some(zone_id.clone());
        state.chosen_zipcode = None;
    }

    /// Persist the selection.
    ///
    /// In zipcode mode the zipcode is first resolved to its zone; in city
    /// mode the select already carries the zone id. The outcome asks the
    /// host to reload the page.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> Option<ZoneOutcome> {
        let (zipcode, city) = {
            let state = lock(&self.state);
            (state.chosen_zipcode.clone(), state.chosen_city.clone())
        };

        let (zone_id, zipcode) = if let Some(zipcode) = zipcode {
            match self.api.zone_by_zipcode(&zipcode).await {
                Ok(zone) => (zone.zone_id, Some(zipcode)),
                Err(e) => {
                    error!(error = %e, "zone lookup by zipcode failed");
                    self.page.update_zone(|zone| {
                        zone.message = Some("We don't deliver to that zipcode yet.".to_string());
                    });
                    return None;
                }
            }
        } else if let Some(zone_id) = city {
            (zone_id, None)
        } else {
            self.page.update_zone(|zone| {
                zone.message = Some("Please choose a zipcode or city first.".to_string());
            });
            return None;
        };

        match self.api.select_zone(&zone_id, zipcode.as_deref()).await {
            Ok(()) => {
                self.page.update_zone(|zone| zone.visible = false);
                Some(ZoneOutcome::Reload)
            }
            Err(e) => {
                error!(error = %e, "zone selection failed");
                self.page.update_zone(|zone| {
                    zone.message = Some("Could not save your delivery zone.".to_string());
                });
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedApi;
    use crate::error::ApiError;

    struct Fixture {
        api: Arc<ScriptedApi>,
        page: Arc<Page>,
        selector: ZoneSelector<ScriptedApi>,
    }

    fn fixture() -> Fixture {
        let api = Arc::new(ScriptedApi::new());
        let page = Arc::new(Page::new());
        let selector = ZoneSelector::new(Arc::clone(&api), Arc::clone(&page));
        Fixture {
            api,
            page,
            selector,
        }
    }

    fn matches(zips: &[&str]) -> Vec<ZipcodeMatch> {
        zips.iter()
            .map(|z| ZipcodeMatch {
                zipcode: (*z).to_string(),
                city: Some("Springfield".to_string()),
                state: None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_queries_clear_without_fetch() {
        let f = fixture();
        f.selector.open();
        f.selector.search_zipcodes("9").await;
        assert_eq!(f.api.calls("search_zipcodes"), 0);
        assert!(f.page.zone().results_html.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_renders_results_after_debounce() {
        let f = fixture();
        f.selector.open();
        f.api.push_zipcodes(Ok(matches(&["90210", "90211"])));

        f.selector.search_zipcodes("902").await;

        assert_eq!(f.api.calls("search_zipcodes"), 1);
        let html = f.page.zone().results_html;
        assert!(html.contains("90210"));
        assert!(html.contains("90211"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_search_is_dropped() {
        let f = fixture();
        f.selector.open();
        f.api.push_zipcodes(Ok(matches(&["22222"])));

        // The second keystroke supersedes the first mid-debounce, so only
        // one request reaches the backend.
        let first = f.selector.search_zipcodes("111");
        let second = f.selector.search_zipcodes("222");
        tokio::join!(first, second);

        assert_eq!(f.api.calls("search_zipcodes"), 1);
        let html = f.page.zone().results_html;
        assert!(!html.contains("11111"));
        assert!(html.contains("22222"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_results_render_no_match_message() {
        let f = fixture();
        f.selector.open();
        f.api.push_zipcodes(Ok(Vec::new()));
        f.selector.search_zipcodes("99999").await;
        assert!(f.page.zone().results_html.contains("No matching zipcodes"));
    }

    #[tokio::test]
    async fn test_load_cities_populates_select() {
        let f = fixture();
        f.api.push_cities(Ok(vec![
            CityZone {
                zone_id: ZoneId::new("z1"),
                zone_name: "North".to_string(),
            },
            CityZone {
                zone_id: ZoneId::new("z2"),
                zone_name: "South".to_string(),
            },
        ]));

        f.selector.load_cities().await;

        let html = f.page.zone().city_options_html;
        assert!(html.contains("North"));
        assert!(html.contains("value=\"z2\""));
    }

    #[tokio::test]
    async fn test_submit_zipcode_resolves_zone_then_selects() {
        let f = fixture();
        f.selector.open();
        f.selector.choose_zipcode("90210");
        f.api.push_zone(Ok(crate::api::types::ZoneMatch {
            zone_id: ZoneId::new("z9"),
            zone_name: None,
        }));

        let outcome = f.selector.submit().await;

        assert_eq!(outcome, Some(ZoneOutcome::Reload));
        let (zone, zip) = f.api.last_select_zone.lock().unwrap().clone().unwrap();
        assert_eq!(zone.as_str(), "z9");
        assert_eq!(zip.as_deref(), Some("90210"));
        assert!(!f.page.zone().visible);
    }

    #[tokio::test]
    async fn test_submit_city_uses_zone_directly() {
        let f = fixture();
        f.selector.open();
        f.selector.choose_city(&ZoneId::new("z2"));

        let outcome = f.selector.submit().await;

        assert_eq!(outcome, Some(ZoneOutcome::Reload));
        assert_eq!(f.api.calls("zone_by_zipcode"), 0);
        let (zone, zip) = f.api.last_select_zone.lock().unwrap().clone().unwrap();
        assert_eq!(zone.as_str(), "z2");
        assert!(zip.is_none());
    }

    #[tokio::test]
    async fn test_submit_without_choice_sets_message() {
        let f = fixture();
        f.selector.open();
        assert_eq!(f.selector.submit().await, None);
        assert!(f.page.zone().message.is_some());
        assert_eq!(f.api.calls("select_zone"), 0);
    }

    #[tokio::test]
    async fn test_unserved_zipcode_shows_message() {
        let f = fixture();
        f.selector.open();
        f.selector.choose_zipcode("00000");
        f.api.push_zone(Err(ApiError::Backend {
            status: 404,
            message: "no zone".to_string(),
        }));

        assert_eq!(f.selector.submit().await, None);
        assert!(
            f.page
                .zone()
                .message
                .unwrap()
                .contains("don't deliver")
        );
    }

    #[tokio::test]
    async fn test_auto_detect_surfaces_manual_guidance() {
        let f = fixture();
        f.selector.open();
        f.selector.set_mode(ZoneMode::AutoDetect);
        assert!(
            f.page
                .zone()
                .message
                .unwrap()
                .contains("enter your zipcode")
        );

        f.selector.set_mode(ZoneMode::Zipcode);
        assert!(f.page.zone().message.is_none());
    }
}
