//! Deferred section loading.
//!
//! Below-the-fold sections are fetched after first paint; every loaded
//! section is announced on the bus so interested components (recently
//! viewed rails, recommendation grids) can react.

use std::sync::Arc;

use tracing::{error, instrument};

use crate::api::StorefrontApi;
use crate::events::{EventBus, ThemeEvent};

/// Fetches deferred sections and broadcasts their payloads.
pub struct SectionLoader<A> {
    api: Arc<A>,
    bus: EventBus,
}

impl<A: StorefrontApi> SectionLoader<A> {
    #[must_use]
    pub fn new(api: Arc<A>, bus: EventBus) -> Self {
        Self { api, bus }
    }

    /// Load one section by name. Failures are logged and swallowed; a
    /// missing rail is not worth breaking the page over.
    #[instrument(skip(self))]
    pub async fn load(&self, section_name: &str) {
        match self.api.get_section(section_name).await {
            Ok(data) => self.bus.send(ThemeEvent::AsyncSectionLoaded {
                section_name: section_name.to_string(),
                data,
            }),
            Err(e) => error!(error = %e, section = section_name, "section load failed"),
        }
    }

    /// Load a batch of sections in order.
    pub async fn load_all(&self, section_names: &[&str]) {
        for name in section_names {
            self.load(name).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedApi;
    use crate::error::ApiError;

    #[tokio::test]
    async fn test_load_broadcasts_payload() {
        let api = Arc::new(ScriptedApi::new());
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        api.push_section(Ok(serde_json::json!({"products": [1, 2, 3]})));

        let loader = SectionLoader::new(api, bus);
        loader.load("featured").await;

        match rx.recv().await.unwrap() {
            ThemeEvent::AsyncSectionLoaded { section_name, data } => {
                assert_eq!(section_name, "featured");
                assert_eq!(data["products"].as_array().unwrap().len(), 3);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_failure_broadcasts_nothing() {
        let api = Arc::new(ScriptedApi::new());
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        api.push_section(Err(ApiError::MissingData));

        let loader = SectionLoader::new(api, bus);
        loader.load("featured").await;

        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_load_all_preserves_order() {
        let api = Arc::new(ScriptedApi::new());
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let loader = SectionLoader::new(Arc::clone(&api), bus);
        loader.load_all(&["hero", "recent"]).await;

        assert_eq!(api.calls("get_section"), 2);
        for expected in ["hero", "recent"] {
            match rx.recv().await.unwrap() {
                ThemeEvent::AsyncSectionLoaded { section_name, .. } => {
                    assert_eq!(section_name, expected);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }
}
