//! Listener hooks into the relay.
//!
//! Listeners are consulted in registration order. The first one to return
//! [`Intercept::Claim`] for a line stops it from being forwarded; later
//! listeners never see it.

use slbnc_proto::{Message, ModeChange};

/// What a listener wants done with a line it was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intercept {
    /// Carry on as usual.
    Pass,
    /// The listener handled the line; do not forward it.
    Claim,
}

/// Observer of session events with the power to swallow lines.
///
/// Every method has a no-op default so implementors only override what
/// they care about.
pub trait Listener: Send {
    /// Name used in logs.
    fn name(&self) -> &str {
        "listener"
    }

    /// A line from the upstream server, after tracked state was updated
    /// (before, for PART, KICK, QUIT and a detached 433).
    fn intercept_server(&mut self, _msg: &Message) -> Intercept {
        Intercept::Pass
    }

    /// A line from the attached client.
    fn intercept_client(&mut self, _msg: &Message) -> Intercept {
        Intercept::Pass
    }

    /// One applied channel mode change.
    fn on_single_mode_change(&mut self, _channel: &str, _source: &str, _change: &ModeChange) {}

    fn on_attach(&mut self, _nick: &str) {}

    fn on_detach(&mut self) {}

    /// Registration with the upstream server finished.
    fn on_server_logon(&mut self, _server: &str) {}

    fn on_server_disconnect(&mut self, _reason: &str) {}
}

/// Offer `msg` to each listener until one claims it.
pub(super) fn offer<F>(listeners: &mut [Box<dyn Listener>], mut ask: F) -> Intercept
where
    F: FnMut(&mut dyn Listener) -> Intercept,
{
    for listener in listeners.iter_mut() {
        if ask(listener.as_mut()) == Intercept::Claim {
            tracing::debug!(listener = listener.name(), "Line claimed by listener");
            return Intercept::Claim;
        }
    }
    Intercept::Pass
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Claimer;
    impl Listener for Claimer {
        fn intercept_server(&mut self, msg: &Message) -> Intercept {
            if msg.is("PRIVMSG") {
                Intercept::Claim
            } else {
                Intercept::Pass
            }
        }
    }

    #[derive(Default)]
    struct Counter(usize);
    impl Listener for Counter {
        fn intercept_server(&mut self, _msg: &Message) -> Intercept {
            self.0 += 1;
            Intercept::Pass
        }
    }

    #[test]
    fn test_first_claim_short_circuits() {
        let mut listeners: Vec<Box<dyn Listener>> =
            vec![Box::new(Claimer), Box::new(Counter::default())];

        let privmsg: Message = "PRIVMSG #a :hi".parse().unwrap();
        let notice: Message = "NOTICE #a :hi".parse().unwrap();

        assert_eq!(
            offer(&mut listeners, |l| l.intercept_server(&privmsg)),
            Intercept::Claim
        );
        assert_eq!(
            offer(&mut listeners, |l| l.intercept_server(&notice)),
            Intercept::Pass
        );
    }
}
