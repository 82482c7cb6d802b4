mod common;

use std::io;
use std::sync::{Arc, Mutex};

use common::{controller, local, pump};
use sharpview::Phase;
use sharpview_core::test_utils::{FakeHost, FakeMedia};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn lines_containing(&self, needle: &str) -> usize {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(captured.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}

const WAITING: &str = "waiting for the next page change";

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn repeated_misses_log_once_per_waiting_episode() {
    let (captured, _guard) = capture();
    local(async {
        let host = FakeHost::new();
        let ctl = controller(&host);

        ctl.apply(true);
        pump().await;
        for _ in 0..50 {
            ctl.on_dom_mutated();
            pump().await;
        }
        assert_eq!(ctl.phase(), Phase::AwaitingMedia);
        assert_eq!(ctl.stats().locate_misses, 51);
        assert_eq!(captured.lines_containing(WAITING), 1);

        // A new episode after disabling gets its own line.
        ctl.apply(false);
        ctl.apply(true);
        pump().await;
        ctl.on_dom_mutated();
        pump().await;
        assert_eq!(captured.lines_containing(WAITING), 2);

        // So does one that follows a session.
        let media = host.add_media(FakeMedia::playable("blob:a", 854, 480));
        ctl.on_dom_mutated();
        pump().await;
        assert_eq!(ctl.phase(), Phase::Active);
        host.remove_media(media);
        ctl.on_dom_mutated();
        pump().await;
        ctl.on_dom_mutated();
        pump().await;
        assert_eq!(ctl.phase(), Phase::AwaitingMedia);
        assert_eq!(captured.lines_containing(WAITING), 3);
    })
    .await;
}
