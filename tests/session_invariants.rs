mod common;

use std::time::Duration;

use common::{advance, controller, controller_at, init_tracing, local, pump};
use sharpview::{CapabilityError, CapabilityState, Phase, ReadyLevel};
use sharpview_core::test_utils::{FakeHost, FakeMedia};

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn repeated_enable_keeps_a_single_session() {
    local(async {
        init_tracing();
        let host = FakeHost::new();
        host.add_media(FakeMedia::playable("blob:a", 854, 480));
        let ctl = controller(&host);

        for _ in 0..5 {
            ctl.apply(true);
            ctl.on_dom_mutated();
            pump().await;
            assert!(host.running_pipelines() <= 1);
            assert!(host.attached_surface_count() <= 1);
        }

        assert_eq!(ctl.phase(), Phase::Active);
        assert_eq!(host.pipelines_started(), 1);
        assert_eq!(host.surfaces_created(), 1);
        assert_eq!(ctl.stats().sessions_started, 1);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn disable_enable_disable_restores_the_page() {
    local(async {
        let host = FakeHost::new();
        let media = host.add_media(FakeMedia::playable("blob:a", 854, 480));
        let pristine = host.media(media).unwrap();
        let ctl = controller(&host);

        // From cold: nothing may touch the DOM.
        ctl.apply(false);
        ctl.apply(true);
        ctl.apply(false);
        pump().await;
        assert_eq!(ctl.phase(), Phase::Disabled);
        assert_eq!(host.dom_writes(), 0);
        assert_eq!(host.pipelines_started(), 0);

        // From an active session: everything we changed is put back.
        ctl.apply(true);
        pump().await;
        assert_eq!(ctl.phase(), Phase::Active);

        ctl.apply(false);
        ctl.apply(true);
        ctl.apply(false);
        pump().await;
        assert_eq!(ctl.phase(), Phase::Disabled);
        assert_eq!(host.attached_surface_count(), 0);
        assert_eq!(host.running_pipelines(), 0);
        assert_eq!(host.media(media).unwrap(), pristine);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn content_video_wins_over_the_ad_in_either_order() {
    for ad_first in [true, false] {
        local(async move {
            let host = FakeHost::new();
            let ad = FakeMedia {
                decoded: Default::default(),
                in_ad_container: true,
                ..FakeMedia::playable("https://ads.example/spot.mp4", 0, 0)
            };
            let content = FakeMedia::playable("blob:content", 1280, 720);
            let content = if ad_first {
                host.add_media(ad);
                host.add_media(content)
            } else {
                let id = host.add_media(content);
                host.add_media(ad);
                id
            };

            let ctl = controller(&host);
            ctl.apply(true);
            pump().await;

            assert_eq!(ctl.phase(), Phase::Active);
            assert_eq!(ctl.session().unwrap().media, content);
            assert_eq!(host.pipeline(0).unwrap().media, content);
        })
        .await;
    }
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn unsupported_probe_is_not_repeated() {
    local(async {
        let host = FakeHost::new();
        host.add_media(FakeMedia::playable("blob:a", 854, 480));
        host.set_adapter_result(Err(CapabilityError::AdapterUnavailable));
        let ctl = controller(&host);

        ctl.apply(true);
        pump().await;
        assert_eq!(ctl.capability(), CapabilityState::Unsupported);

        ctl.apply(false);
        ctl.apply(true);
        ctl.set_path("/watch/other");
        ctl.on_fullscreen_change(true);
        ctl.on_fullscreen_change(false);
        advance(Duration::from_secs(1)).await;

        assert_eq!(host.adapter_requests(), 1);
        assert_eq!(ctl.phase(), Phase::Disabled);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn fullscreen_tears_down_and_resumes_after_the_settle_delay() {
    local(async {
        let host = FakeHost::new();
        let media = host.add_media(FakeMedia::playable("blob:a", 854, 480));
        let ctl = controller(&host);
        ctl.apply(true);
        pump().await;
        assert_eq!(ctl.phase(), Phase::Active);

        ctl.on_fullscreen_change(true);
        // Synchronous: no pump between the notification and the checks.
        assert_eq!(ctl.phase(), Phase::SuspendedForFullscreen);
        assert_eq!(host.running_pipelines(), 0);
        assert_eq!(host.attached_surface_count(), 0);
        assert!(!host.media(media).unwrap().hidden);

        ctl.on_fullscreen_change(false);
        assert_eq!(ctl.phase(), Phase::AwaitingMedia);

        advance(Duration::from_millis(250)).await;
        assert_eq!(host.pipelines_started(), 1, "still settling");

        advance(Duration::from_millis(50)).await;
        assert_eq!(ctl.phase(), Phase::Active);
        assert_eq!(host.pipelines_started(), 2);
        assert_eq!(host.running_pipelines(), 1);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn fullscreen_exit_after_disable_stays_disabled() {
    local(async {
        let host = FakeHost::new();
        host.add_media(FakeMedia::playable("blob:a", 854, 480));
        let ctl = controller(&host);
        ctl.apply(true);
        pump().await;

        ctl.on_fullscreen_change(true);
        ctl.apply(false);
        ctl.on_fullscreen_change(false);
        advance(Duration::from_secs(1)).await;

        assert_eq!(ctl.phase(), Phase::Disabled);
        assert_eq!(host.pipelines_started(), 1);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn source_swap_on_the_same_element_starts_a_fresh_session() {
    local(async {
        let host = FakeHost::new();
        let media = host.add_media(FakeMedia::playable("blob:first", 854, 480));
        let ctl = controller(&host);
        ctl.apply(true);
        pump().await;

        host.update_media(media, |m| {
            m.source = Some("blob:second".to_owned());
            m.ready = ReadyLevel::HaveMetadata;
        });
        ctl.on_media_changed();
        assert_eq!(host.running_pipelines(), 0, "old pipeline halted first");
        pump().await;

        assert_eq!(ctl.phase(), Phase::Active);
        let old = host.pipeline(0).unwrap();
        let new = host.pipeline(1).unwrap();
        assert!(!old.running);
        assert_eq!(old.halts, 1);
        assert_eq!(old.source.as_deref(), Some("blob:first"));
        assert!(new.running);
        assert_eq!(new.media, media);
        assert_eq!(new.source.as_deref(), Some("blob:second"));
        assert_eq!(
            ctl.session().unwrap().source.as_deref(),
            Some("blob:second")
        );
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn non_watch_route_stays_disabled_without_dom_changes() {
    local(async {
        let host = FakeHost::new();
        host.add_media(FakeMedia::playable("blob:a", 854, 480));
        let ctl = controller_at(&host, "/results");

        ctl.apply(true);
        ctl.on_dom_mutated();
        pump().await;
        assert_eq!(ctl.phase(), Phase::Disabled);
        assert_eq!(host.dom_writes(), 0);
        assert_eq!(host.adapter_requests(), 0);

        // `/watchlist` is not the watch route either.
        ctl.set_path("/watchlist");
        pump().await;
        assert_eq!(ctl.phase(), Phase::Disabled);
        assert_eq!(host.dom_writes(), 0);

        ctl.set_path("/watch");
        pump().await;
        assert_eq!(ctl.phase(), Phase::Active);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn stats_snapshot_is_plain_json() {
    local(async {
        let host = FakeHost::new();
        host.add_media(FakeMedia::playable("blob:a", 854, 480));
        let ctl = controller(&host);
        ctl.apply(true);
        pump().await;
        ctl.apply(false);

        let json = serde_json::to_value(ctl.stats()).unwrap();
        assert_eq!(json["sessions_started"], 1);
        assert_eq!(json["sessions_torn_down"], 1);
        assert_eq!(json["render_faults"], 0);
    })
    .await;
}
