/// Opaque handle returned by [`Listeners::on`]; required to
/// unsubscribe with [`Listeners::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An explicit event-subscriber list.
///
/// Replaces event-emitter mixins with a plain owned struct: callers
/// subscribe with `on` (receiving an id), unsubscribe with `off`, and
/// the owner broadcasts with `emit`. Subscribers receive a shared
/// reference to the event; anything that needs to mutate wider state
/// forwards a message to the app event channel instead of reaching
/// back into it.
pub struct Listeners<E> {
    next_id: u64,
    subs: Vec<(ListenerId, Box<dyn Fn(&E) + Send>)>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            subs: Vec::new(),
        }
    }

    /// Register a subscriber and return its id.
    pub fn on<F>(&mut self, f: F) -> ListenerId
    where
        F: Fn(&E) + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.subs.push((id, Box::new(f)));
        id
    }

    /// Remove a subscriber. Returns false if the id was already gone,
    /// so double-unsubscribe is observable in tests.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.subs.len();
        self.subs.retain(|(sub_id, _)| *sub_id != id);
        self.subs.len() != before
    }

    /// Invoke every subscriber, in subscription order.
    pub fn emit(&self, event: &E) {
        for (_, f) in &self.subs {
            f(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}
