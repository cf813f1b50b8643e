//! Observability Module
//!
//! - `events`: structured event logging with consistent fields
//! - `metrics`: counters and histograms recorded through the `metrics` facade;
//!   a no-op until the binary installs a recorder

pub mod events;
pub mod metrics;

#[cfg(test)]
pub(crate) mod testing {
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::subscriber::DefaultGuard;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Level and `event_type` of every structured event seen on this thread.
    #[derive(Clone, Default)]
    pub struct CapturedEvents(Arc<Mutex<Vec<(Level, String)>>>);

    impl CapturedEvents {
        /// Capture until the returned guard is dropped.
        pub fn install() -> (Self, DefaultGuard) {
            let captured = Self::default();
            let subscriber = tracing_subscriber::registry().with(captured.clone());
            (captured, tracing::subscriber::set_default(subscriber))
        }

        pub fn levels_of(&self, event_type: &str) -> Vec<Level> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, kind)| kind == event_type)
                .map(|(level, _)| *level)
                .collect()
        }
    }

    struct EventType(Option<String>);

    impl Visit for EventType {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "event_type" {
                self.0 = Some(value.to_string());
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn fmt::Debug) {}
    }

    impl<S: Subscriber> Layer<S> for CapturedEvents {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut kind = EventType(None);
            event.record(&mut kind);
            if let Some(kind) = kind.0 {
                self.0.lock().unwrap().push((*event.metadata().level(), kind));
            }
        }
    }
}
