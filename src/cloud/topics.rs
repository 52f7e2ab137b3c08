//! Fixed-capacity topic → callback registry.
//!
//! Bindings are kept in insertion order. Lookup is an exact string match over
//! the slots in order and the first hit wins, so at most one callback runs per
//! inbound message. Bindings are never removed.

use super::error::Error;
use core::fmt;
use heapless::{String, Vec};

/// Longest topic a binding can hold.
pub const MAX_TOPIC_LEN: usize = 128;
/// Slots in a registry unless another size is chosen.
pub const DEFAULT_TOPIC_CAPACITY: usize = 32;

/// Receives the payload of messages published on a bound topic.
///
/// Implemented for every `FnMut(&[u8])`, so closures capturing device state
/// can be bound directly.
pub trait TopicCallback {
    /// Called once per inbound message on the bound topic.
    fn on_message(&mut self, payload: &[u8]);
}

impl<F: FnMut(&[u8])> TopicCallback for F {
    fn on_message(&mut self, payload: &[u8]) {
        self(payload)
    }
}

/// Sink for everything a messaging session receives.
///
/// Sessions hand each inbound `(topic, payload)` to this during
/// [`Session::poll`](super::connection::Session::poll).
pub trait InboundHandler {
    /// Handles one inbound message.
    fn on_message(&mut self, topic: &str, payload: &[u8]);
}

/// One slot of the registry.
pub struct TopicBinding<'a> {
    topic: String<MAX_TOPIC_LEN>,
    callback: &'a mut dyn TopicCallback,
}

impl TopicBinding<'_> {
    /// The bound topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl fmt::Debug for TopicBinding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicBinding")
            .field("topic", &self.topic.as_str())
            .finish_non_exhaustive()
    }
}

/// Ordered, bounded set of topic bindings.
///
/// `N` is the compile-time slot count; [`with_capacity`](Self::with_capacity)
/// can lower the usable capacity at runtime.
///
/// ```rust
/// use core::cell::Cell;
/// use kinton::cloud::TopicRegistry;
///
/// let hits = Cell::new(0);
/// let mut on_led = |payload: &[u8]| hits.set(hits.get() + payload.len());
///
/// let mut registry: TopicRegistry<'_, 4> = TopicRegistry::new();
/// registry.on("led", &mut on_led).unwrap();
///
/// assert!(registry.dispatch("led", b"on"));
/// assert!(!registry.dispatch("fan", b"on"));
/// drop(registry);
/// assert_eq!(hits.get(), 2);
/// ```
pub struct TopicRegistry<'a, const N: usize = DEFAULT_TOPIC_CAPACITY> {
    bindings: Vec<TopicBinding<'a>, N>,
    limit: usize,
}

impl<'a, const N: usize> TopicRegistry<'a, N> {
    /// An empty registry using all `N` slots.
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            limit: N,
        }
    }

    /// An empty registry that accepts at most `min(limit, N)` bindings.
    pub fn with_capacity(limit: usize) -> Self {
        Self {
            bindings: Vec::new(),
            limit: limit.min(N),
        }
    }

    /// Binds `callback` to `topic` in the first free slot.
    ///
    /// The topic is copied. A duplicate topic is stored but shadowed by the
    /// earlier binding. When every slot is taken the registry is left
    /// untouched and [`Error::RegistryFull`] is returned.
    pub fn on(&mut self, topic: &str, callback: &'a mut dyn TopicCallback) -> Result<(), Error> {
        if self.is_full() {
            warn!("topics: registry full ({} slots), dropping {}", self.limit, topic);
            return Err(Error::RegistryFull);
        }
        let owned = String::try_from(topic).map_err(|_| Error::TopicTooLong)?;
        if self.contains(topic) {
            warn!("topics: {} already bound, new binding is shadowed", topic);
        }
        self.bindings
            .push(TopicBinding {
                topic: owned,
                callback,
            })
            .map_err(|_| Error::RegistryFull)?;
        debug!("topics: bound {} in slot {}", topic, self.bindings.len() - 1);
        Ok(())
    }

    /// Runs the callback of the first binding whose topic equals `topic`.
    ///
    /// Returns whether a callback ran. An unmatched topic is not an error.
    pub fn dispatch(&mut self, topic: &str, payload: &[u8]) -> bool {
        match self.bindings.iter_mut().find(|b| b.topic.as_str() == topic) {
            Some(binding) => {
                trace!("topics: {} bytes on {}", payload.len(), topic);
                binding.callback.on_message(payload);
                true
            }
            None => {
                debug!("topics: no binding for {}", topic);
                false
            }
        }
    }

    /// All bindings in slot order, duplicates included.
    pub fn bindings(&self) -> impl Iterator<Item = &TopicBinding<'a>> {
        self.bindings.iter()
    }

    /// Each distinct bound topic once, in order of first registration.
    ///
    /// This is the set a session subscribes to.
    pub fn subscriptions(&self) -> impl Iterator<Item = &str> {
        self.bindings
            .iter()
            .enumerate()
            .filter(|(i, b)| !self.bindings[..*i].iter().any(|e| e.topic == b.topic))
            .map(|(_, b)| b.topic.as_str())
    }

    /// Whether any binding holds exactly `topic`.
    pub fn contains(&self, topic: &str) -> bool {
        self.bindings.iter().any(|b| b.topic.as_str() == topic)
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Usable slot count.
    pub fn capacity(&self) -> usize {
        self.limit
    }

    /// Whether another binding would be dropped.
    pub fn is_full(&self) -> bool {
        self.bindings.len() >= self.limit
    }
}

impl<const N: usize> Default for TopicRegistry<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> InboundHandler for TopicRegistry<'_, N> {
    fn on_message(&mut self, topic: &str, payload: &[u8]) {
        self.dispatch(topic, payload);
    }
}

impl<const N: usize> fmt::Debug for TopicRegistry<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicRegistry")
            .field("bindings", &self.bindings)
            .field("limit", &self.limit)
            .finish()
    }
}
