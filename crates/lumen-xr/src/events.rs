//! Typed observer registration for lighting changes.

use crate::controller::LightingState;
use crate::environment::EnvironmentMap;

/// Something observers of the controller may care about.
#[derive(Clone, Debug, PartialEq)]
pub enum LightingEvent {
    /// The exposed environment map changed. `None` when no map is available.
    EnvironmentMapChanged {
        environment_map: Option<EnvironmentMap>,
    },
    /// The session state machine moved between states.
    StateChanged {
        from: LightingState,
        to: LightingState,
    },
}

/// Handle returned by [`EventDispatcher::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&LightingEvent)>;

/// Ordered list of listeners, invoked synchronously on emit.
#[derive(Default)]
pub struct EventDispatcher {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners run in subscription order.
    pub fn subscribe(&mut self, listener: impl FnMut(&LightingEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener.
    pub fn emit(&mut self, event: &LightingEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn state_event() -> LightingEvent {
        LightingEvent::StateChanged {
            from: LightingState::Inactive,
            to: LightingState::Probing,
        }
    }

    #[test]
    fn test_listeners_run_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        for tag in ["a", "b"] {
            let log = Rc::clone(&log);
            dispatcher.subscribe(move |_| log.borrow_mut().push(tag));
        }
        dispatcher.emit(&state_event());
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut dispatcher = EventDispatcher::new();
        let id = {
            let count = Rc::clone(&count);
            dispatcher.subscribe(move |_| *count.borrow_mut() += 1)
        };
        dispatcher.emit(&state_event());
        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));
        dispatcher.emit(&state_event());
        assert_eq!(*count.borrow(), 1);
        assert!(dispatcher.is_empty());
    }
}
