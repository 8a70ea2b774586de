//! One-shot handler registration keyed by message type.
//!
//! A [`Dispatcher`] holds at most one pending handler and the single
//! message type it is waiting for. Delivering that message type hands the
//! handler back exactly once; any other message type finds nothing.

/// A handler is already pending; the caller must take or clear it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerPending {
    pub message_type: u8,
}

pub struct Dispatcher<H> {
    pending: Option<(u8, H)>,
}

impl<H> Default for Dispatcher<H> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<H> Dispatcher<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for the next message of type `message_type`.
    ///
    /// On conflict the new handler is handed back along with the error so
    /// the caller can dispose of it.
    pub fn register(&mut self, message_type: u8, handler: H) -> Result<(), (HandlerPending, H)> {
        if let Some((pending, _)) = &self.pending {
            return Err((
                HandlerPending {
                    message_type: *pending,
                },
                handler,
            ));
        }
        self.pending = Some((message_type, handler));
        Ok(())
    }

    /// The message type currently awaited.
    pub fn pending(&self) -> Option<u8> {
        self.pending.as_ref().map(|(message_type, _)| *message_type)
    }

    /// Take the handler if it is waiting for `message_type`.
    ///
    /// A mismatched type leaves the registration in place.
    pub fn take_for(&mut self, message_type: u8) -> Option<H> {
        match &self.pending {
            Some((pending, _)) if *pending == message_type => {
                self.pending.take().map(|(_, handler)| handler)
            }
            _ => None,
        }
    }

    /// Remove any registration, returning its handler.
    pub fn clear(&mut self) -> Option<H> {
        self.pending.take().map(|(_, handler)| handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_fires_once() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(31, "reply").unwrap();
        assert_eq!(dispatcher.pending(), Some(31));

        assert_eq!(dispatcher.take_for(31), Some("reply"));
        assert_eq!(dispatcher.take_for(31), None);
        assert_eq!(dispatcher.pending(), None);
    }

    #[test]
    fn other_message_types_find_nothing() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(30, 7u32).unwrap();

        assert_eq!(dispatcher.take_for(31), None);
        assert_eq!(dispatcher.take_for(20), None);
        assert_eq!(dispatcher.pending(), Some(30));
        assert_eq!(dispatcher.take_for(30), Some(7));
    }

    #[test]
    fn second_registration_rejected() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(30, 1u8).unwrap();

        let (err, handler) = dispatcher.register(31, 2u8).unwrap_err();
        assert_eq!(err, HandlerPending { message_type: 30 });
        assert_eq!(handler, 2);
        assert_eq!(dispatcher.pending(), Some(30));
    }

    #[test]
    fn clear_returns_handler() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.clear(), None::<()>);

        dispatcher.register(31, ()).unwrap();
        assert_eq!(dispatcher.clear(), Some(()));
        assert_eq!(dispatcher.pending(), None);
        dispatcher.register(30, ()).unwrap();
    }
}
