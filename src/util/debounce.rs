//! Trailing-edge debounce for typeahead input
//!
//! Each `schedule` replaces the previously pending timer, so only the last
//! event of a burst is delivered, once the quiet period has passed.
//!
//! Aborting a timer cannot recall an event it already sent. Every schedule
//! and cancel therefore moves the debouncer to a new ticket; the receiver
//! checks the ticket carried by an event with [`Debouncer::is_current`].

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Trailing-edge debouncer that delivers its event over a channel.
///
/// # Example
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use kadx::util::debounce::Debouncer;
/// use std::time::Duration;
///
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// let mut deb = Debouncer::new(Duration::from_millis(10));
///
/// deb.schedule(&tx, |t| (t, "a"));
/// deb.schedule(&tx, |t| (t, "ab"));
///
/// // Only the last scheduled event arrives
/// let (ticket, text) = rx.recv().await.unwrap();
/// assert_eq!(text, "ab");
/// assert!(deb.is_current(ticket));
/// # }
/// ```
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
    ticket: u64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            ticket: 0,
        }
    }

    /// Start the quiet period, dropping any earlier pending event. `make`
    /// builds the event from the new ticket, which is also returned.
    pub fn schedule<E, F>(&mut self, tx: &UnboundedSender<E>, make: F) -> u64
    where
        E: Send + 'static,
        F: FnOnce(u64) -> E,
    {
        self.cancel();
        let ticket = self.ticket;
        let event = make(ticket);
        let tx = tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        }));
        ticket
    }

    /// Drop the pending event, if any, and retire the current ticket so an
    /// event that already fired reads as stale. Returns whether a timer was
    /// still running.
    pub fn cancel(&mut self) -> bool {
        self.ticket = self.ticket.wrapping_add(1);
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Whether an event carrying `ticket` belongs to the latest schedule and
    /// has not been cancelled since.
    pub fn is_current(&self, ticket: u64) -> bool {
        self.pending.is_some() && ticket == self.ticket
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
