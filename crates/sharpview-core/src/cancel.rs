use std::cell::Cell;
use std::rc::Rc;

/// Monotonic request counter shared between the controller and its in-flight start sequences.
///
/// Every start sequence holds a [`CancelToken`] for the value current when it began; advancing
/// the clock supersedes all of them at once.
#[derive(Debug, Clone, Default)]
pub struct RequestClock {
    current: Rc<Cell<u64>>,
}

impl RequestClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersedes every outstanding token and returns a fresh one.
    pub fn advance(&self) -> CancelToken {
        let ticket = self.current.get().wrapping_add(1);
        self.current.set(ticket);
        CancelToken {
            clock: self.clone(),
            ticket,
        }
    }

    /// Supersedes every outstanding token.
    pub fn cancel_all(&self) {
        self.current.set(self.current.get().wrapping_add(1));
    }

    pub fn current(&self) -> u64 {
        self.current.get()
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    clock: RequestClock,
    ticket: u64,
}

impl CancelToken {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn is_cancelled(&self) -> bool {
        self.clock.current() != self.ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advancing_supersedes_older_tokens() {
        let clock = RequestClock::new();
        let first = clock.advance();
        assert!(!first.is_cancelled());

        let second = clock.advance();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_ne!(first.ticket(), second.ticket());

        clock.cancel_all();
        assert!(second.is_cancelled());
    }
}
