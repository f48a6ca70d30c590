//! Selected language pair and the events pages react to.

use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::config::LanguageConfig;

/// Capacity of the event channel; slow subscribers see `Lagged`.
const EVENT_CAPACITY: usize = 32;

/// Something every live page must react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The selected pair changed; pages re-translate their current text.
    LanguageChanged { from: String, to: String },
    /// The user left the page; pages clear their state.
    PageReset,
}

/// Current source / destination language, shared by every page.
pub struct LanguageState {
    config: LanguageConfig,
    pair: Mutex<(String, String)>,
    events: broadcast::Sender<SessionEvent>,
}

impl LanguageState {
    pub fn new(config: LanguageConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let pair = (config.from.clone(), config.to.clone());
        Self {
            config,
            pair: Mutex::new(pair),
            events,
        }
    }

    /// `(from, to)` codes currently selected.
    pub fn current(&self) -> (String, String) {
        self.pair.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Select a new pair. Broadcasts [`SessionEvent::LanguageChanged`] when
    /// the pair actually changed and returns whether it did.
    pub fn set_languages(&self, from: &str, to: &str) -> bool {
        {
            let mut pair = self.pair.lock().unwrap_or_else(PoisonError::into_inner);
            if pair.0 == from && pair.1 == to {
                return false;
            }
            *pair = (from.to_string(), to.to_string());
        }

        log::info!("session: languages set to {from}->{to}");
        // No subscribers is fine.
        let _ = self.events.send(SessionEvent::LanguageChanged {
            from: from.to_string(),
            to: to.to_string(),
        });
        true
    }

    /// Select by display label ("English", "Urdu"); unknown labels map to
    /// English.
    pub fn set_by_labels(&self, from_label: &str, to_label: &str) -> bool {
        let from = self.config.code_for_label(from_label).to_string();
        let to = self.config.code_for_label(to_label).to_string();
        self.set_languages(&from, &to)
    }

    /// Tell every page to clear its state.
    pub fn reset_page(&self) {
        log::debug!("session: page reset");
        let _ = self.events.send(SessionEvent::PageReset);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_configured_pair() {
        let state = LanguageState::new(LanguageConfig::default());
        assert_eq!(state.current(), ("en".to_string(), "en".to_string()));
    }

    #[test]
    fn change_is_broadcast_once() {
        let state = LanguageState::new(LanguageConfig::default());
        let mut rx = state.subscribe();

        assert!(state.set_languages("en", "ur"));
        assert!(!state.set_languages("en", "ur"));

        assert_eq!(
            rx.try_recv().ok(),
            Some(SessionEvent::LanguageChanged {
                from: "en".into(),
                to: "ur".into()
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn labels_resolve_through_catalog() {
        let state = LanguageState::new(LanguageConfig::default());
        state.set_by_labels("Arabic", "Klingon");
        assert_eq!(state.current(), ("ar".to_string(), "en".to_string()));
    }

    #[test]
    fn reset_reaches_subscribers() {
        let state = LanguageState::new(LanguageConfig::default());
        let mut rx = state.subscribe();
        state.reset_page();
        assert_eq!(rx.try_recv().ok(), Some(SessionEvent::PageReset));
    }

    #[test]
    fn sending_without_subscribers_is_harmless() {
        let state = LanguageState::new(LanguageConfig::default());
        state.reset_page();
        assert!(state.set_languages("ur", "en"));
    }
}
