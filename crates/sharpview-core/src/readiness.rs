use std::time::Duration;

use futures_util::future::{select, Either};
use futures_util::pin_mut;

use crate::cancel::CancelToken;
use crate::config::ControllerConfig;
use crate::platform::{MediaDom, MediaSignals, Runtime};

/// Retry budget for [`await_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub max_retries: u32,
    pub attempt_timeout: Duration,
    /// Pause after a media signal before re-reading the element.
    pub settle: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            attempt_timeout: Duration::from_millis(10_000),
            settle: Duration::from_millis(50),
        }
    }
}

impl From<&ControllerConfig> for ReadinessPolicy {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            max_retries: config.ready_max_retries.max(1),
            attempt_timeout: config.ready_attempt_timeout(),
            settle: config.ready_settle(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
    /// The owning start sequence was superseded while waiting. Not a failure.
    Cancelled,
}

/// Decoded metadata is available and the intrinsic size is known.
pub fn is_ready<D: MediaDom + ?Sized>(dom: &D, media: &D::Media) -> bool {
    dom.ready_level(media).has_metadata() && dom.decoded_size(media).is_positive()
}

/// Waits until `media` has usable decoded dimensions.
///
/// Each attempt waits for the next media signal or the attempt timeout, whichever comes first,
/// then re-checks. A timed-out attempt moves on to the next one; only running out of attempts
/// yields [`Readiness::TimedOut`].
pub async fn await_ready<H>(
    host: &H,
    media: &H::Media,
    policy: &ReadinessPolicy,
    cancel: &CancelToken,
) -> Readiness
where
    H: MediaSignals + Runtime + ?Sized,
{
    if is_ready(host, media) {
        return Readiness::Ready;
    }

    for attempt in 1..=policy.max_retries.max(1) {
        if cancel.is_cancelled() {
            return Readiness::Cancelled;
        }

        let signal = host.next_media_signal(media);
        let timeout = host.sleep(policy.attempt_timeout);
        pin_mut!(signal, timeout);
        match select(signal, timeout).await {
            Either::Left((signal, _)) => {
                tracing::trace!(?signal, attempt, "media signal received");
                host.sleep(policy.settle).await;
            }
            Either::Right(((), _)) => {
                tracing::debug!(attempt, "media readiness attempt timed out");
            }
        }

        if cancel.is_cancelled() {
            return Readiness::Cancelled;
        }
        if is_ready(host, media) {
            return Readiness::Ready;
        }
    }

    Readiness::TimedOut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::RequestClock;
    use crate::platform::{DecodedSize, ReadyLevel};
    use crate::test_utils::{FakeHost, FakeMedia};

    fn unloaded() -> FakeMedia {
        FakeMedia {
            ready: ReadyLevel::HaveNothing,
            decoded: DecodedSize::new(0, 0),
            ..FakeMedia::playable("blob:video", 0, 0)
        }
    }

    #[test]
    fn policy_from_config_clamps_retries() {
        let config = ControllerConfig {
            ready_max_retries: 0,
            ready_attempt_timeout_ms: 250,
            ..Default::default()
        };
        let policy = ReadinessPolicy::from(&config);
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.attempt_timeout, Duration::from_millis(250));
        assert_eq!(policy.settle, Duration::from_millis(50));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn already_loaded_media_is_ready_immediately() {
        let host = FakeHost::new();
        let media = host.add_media(FakeMedia::playable("blob:video", 640, 360));
        let clock = RequestClock::new();

        let start = tokio::time::Instant::now();
        let result = await_ready(&host, &media, &ReadinessPolicy::default(), &clock.advance()).await;
        assert_eq!(result, Readiness::Ready);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn signal_followed_by_dimensions_resolves_after_settle() {
        let host = FakeHost::new();
        let media = host.add_media(unloaded());
        let clock = RequestClock::new();
        let token = clock.advance();
        let policy = ReadinessPolicy::default();

        let waiter = await_ready(&host, &media, &policy, &token);
        let loader = async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            host.update_media(media, |m| {
                m.ready = ReadyLevel::HaveMetadata;
                m.decoded = DecodedSize::new(1920, 1080);
            });
            host.emit_media_signal();
        };

        let start = tokio::time::Instant::now();
        let (result, ()) = futures_util::future::join(waiter, loader).await;
        assert_eq!(result, Readiness::Ready);
        assert_eq!(start.elapsed(), Duration::from_millis(550));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn times_out_after_every_attempt_expires() {
        let host = FakeHost::new();
        let media = host.add_media(unloaded());
        let clock = RequestClock::new();
        let policy = ReadinessPolicy {
            max_retries: 3,
            attempt_timeout: Duration::from_millis(100),
            settle: Duration::from_millis(5),
        };

        let start = tokio::time::Instant::now();
        let result = await_ready(&host, &media, &policy, &clock.advance()).await;
        assert_eq!(result, Readiness::TimedOut);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn late_dimensions_are_picked_up_by_a_later_attempt() {
        let host = FakeHost::new();
        let media = host.add_media(unloaded());
        let clock = RequestClock::new();
        let token = clock.advance();
        let policy = ReadinessPolicy {
            max_retries: 3,
            attempt_timeout: Duration::from_millis(100),
            settle: Duration::from_millis(5),
        };

        let waiter = await_ready(&host, &media, &policy, &token);
        let loader = async {
            // No signal: the page fills in dimensions silently during the second attempt.
            tokio::time::sleep(Duration::from_millis(150)).await;
            host.update_media(media, |m| {
                m.ready = ReadyLevel::HaveEnoughData;
                m.decoded = DecodedSize::new(640, 360);
            });
        };

        let (result, ()) = futures_util::future::join(waiter, loader).await;
        assert_eq!(result, Readiness::Ready);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn superseded_wait_reports_cancelled() {
        let host = FakeHost::new();
        let media = host.add_media(unloaded());
        let clock = RequestClock::new();
        let token = clock.advance();
        let policy = ReadinessPolicy::default();

        let waiter = await_ready(&host, &media, &policy, &token);
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            clock.cancel_all();
            host.emit_media_signal();
        };

        let (result, ()) = futures_util::future::join(waiter, canceller).await;
        assert_eq!(result, Readiness::Cancelled);
    }
}
