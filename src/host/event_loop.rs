/// Callbacks run around each event-loop iteration.
pub trait TickHandler {
    /// Runs before the loop blocks waiting for events. This is the per-frame sync point.
    fn block(&mut self);

    /// Runs after the loop wakes up.
    fn wakeup(&mut self) {}
}

/// Registration handle returned by [`EventLoop::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickToken(u64);

/// Minimal model of the host's event loop: an ordered list of block/wakeup handlers.
pub struct EventLoop {
    handlers: Vec<(TickToken, Box<dyn TickHandler>)>,
    next_token: u64,
    capacity: usize,
    iterations: u64,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::with_capacity(16)
    }
}

impl EventLoop {
    /// Loop that accepts at most `capacity` registrations.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handlers: Vec::new(),
            next_token: 1,
            capacity,
            iterations: 0,
        }
    }

    /// Register a handler. Returns `None` when the loop is full.
    pub fn register(&mut self, handler: Box<dyn TickHandler>) -> Option<TickToken> {
        if self.handlers.len() >= self.capacity {
            return None;
        }
        let token = TickToken(self.next_token);
        self.next_token += 1;
        self.handlers.push((token, handler));
        Some(token)
    }

    /// Remove a registration. Returns `false` if the token is unknown.
    pub fn unregister(&mut self, token: TickToken) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(t, _)| *t != token);
        self.handlers.len() != before
    }

    /// One iteration: every block handler in registration order, then every wakeup handler.
    pub fn run_once(&mut self) {
        for (_, h) in &mut self.handlers {
            h.block();
        }
        for (_, h) in &mut self.handlers {
            h.wakeup();
        }
        self.iterations += 1;
    }

    /// Registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// `true` with no registrations.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Completed iterations.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Change the registration limit. Existing registrations are kept.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/event_loop.rs"]
mod tests;
