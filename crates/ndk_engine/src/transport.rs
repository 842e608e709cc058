//! Pluggable envelope delivery.
//!
//! A [`Transport`] pairs a plain send function with an opaque state value.
//! The engine calls the send function once per completed envelope, from its
//! own worker thread, handing over ownership of the envelope. When the
//! transport is dropped the state is passed to the registered free function,
//! which therefore runs exactly once.

use crate::envelope::Envelope;
use std::any::Any;
use std::fmt;

/// State carried by a transport.
pub type TransportState = Box<dyn Any + Send + Sync>;

/// Delivers one envelope. The envelope is owned by the callee.
pub type SendFunc = fn(Envelope, Option<&(dyn Any + Send + Sync)>);

/// Releases the transport state at teardown.
pub type FreeFunc = fn(TransportState);

/// A delivery endpoint for completed envelopes.
pub struct Transport {
    send_func: SendFunc,
    state: Option<TransportState>,
    free_func: Option<FreeFunc>,
}

impl Transport {
    /// Creates a transport around `send_func` with no state.
    pub fn new(send_func: SendFunc) -> Self {
        Self {
            send_func,
            state: None,
            free_func: None,
        }
    }

    /// Attaches the state handed to every send call.
    ///
    /// A previously attached state is released through the free function.
    pub fn set_state(&mut self, state: TransportState) {
        if let Some(previous) = self.state.replace(state) {
            self.release(previous);
        }
    }

    /// Registers the function that releases the state at teardown.
    pub fn set_free_func(&mut self, free_func: FreeFunc) {
        self.free_func = Some(free_func);
    }

    /// Returns true if a state is attached.
    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    /// Delivers `envelope`.
    pub fn send(&self, envelope: Envelope) {
        (self.send_func)(envelope, self.state.as_deref());
    }

    fn release(&self, state: TransportState) {
        match self.free_func {
            Some(free) => free(state),
            None => drop(state),
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            self.release(state);
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("has_state", &self.state.is_some())
            .field("has_free_func", &self.free_func.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static FREED: AtomicUsize = AtomicUsize::new(0);
    static SENT: AtomicUsize = AtomicUsize::new(0);

    fn count_send(_envelope: Envelope, state: Option<&(dyn Any + Send + Sync)>) {
        if state.and_then(|s| s.downcast_ref::<u32>()) == Some(&7) {
            SENT.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn count_free(state: TransportState) {
        assert!(state.downcast::<u32>().is_ok());
        FREED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn state_reaches_send_and_is_freed_once() {
        let mut transport = Transport::new(count_send);
        transport.set_state(Box::new(7u32));
        transport.set_free_func(count_free);

        let envelope = Envelope::from_event(Value::new_object(), None).unwrap();
        transport.send(envelope);
        assert_eq!(SENT.load(Ordering::SeqCst), 1);

        let before = FREED.load(Ordering::SeqCst);
        drop(transport);
        assert_eq!(FREED.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn stateless_transport_drops_cleanly() {
        let transport = Transport::new(count_send);
        assert!(!transport.has_state());
        drop(transport);
    }
}
