//! Shared helpers for the lifecycle scenario tests.

#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use sharpview_core::test_utils::FakeHost;
use sharpview::{Controller, ControllerConfig};

pub const WATCH: &str = "/watch";

pub fn controller(host: &FakeHost) -> Controller<FakeHost> {
    controller_at(host, WATCH)
}

pub fn controller_at(host: &FakeHost, path: &str) -> Controller<FakeHost> {
    Controller::new(host.clone(), ControllerConfig::default(), path).unwrap()
}

/// Lets spawned start sequences run until they block on a timer or a signal.
pub async fn pump() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Advances paused time, then pumps.
pub async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
    pump().await;
}

/// Runs `test` inside a `LocalSet` so the controller can spawn `!Send` tasks.
pub fn local(test: impl Future<Output = ()>) -> impl Future<Output = ()> {
    async move { tokio::task::LocalSet::new().run_until(test).await }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
