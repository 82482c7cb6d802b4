#![cfg(target_arch = "wasm32")]

use std::time::Duration;

use sharpview_core::{
    locate, Controller, ControllerConfig, LayoutStyle, MediaDom, MediaError, Phase, Runtime,
    SurfaceDom,
};
use sharpview_wasm::WebHost;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{HtmlCanvasElement, HtmlVideoElement, Node};

wasm_bindgen_test_configure!(run_in_browser);

const PLAYER: &str = r#"
<div id="movie_player">
  <div class="video-ads"><video id="ad"></video></div>
  <div class="html5-video-container">
    <video id="main" class="video-stream html5-main-video" style="opacity: 0.8"></video>
  </div>
</div>
<video id="elsewhere"></video>
"#;

fn fixture() -> WebHost {
    let window = web_sys::window().unwrap();
    let body = window.document().unwrap().body().unwrap();
    body.set_inner_html(PLAYER);
    WebHost::new(window, ControllerConfig::default()).unwrap()
}

fn video(host: &WebHost, id: &str) -> HtmlVideoElement {
    host.document()
        .get_element_by_id(id)
        .unwrap()
        .dyn_into::<HtmlVideoElement>()
        .unwrap()
}

#[wasm_bindgen_test]
fn player_media_is_confined_to_the_player_root() {
    let host = fixture();
    let media = host.player_media();
    assert_eq!(media.len(), 2);
    assert_eq!(media[0].id(), "ad");
    assert_eq!(media[1].id(), "main");

    assert!(host.in_ad_container(&media[0]));
    assert!(!host.in_ad_container(&media[1]));
    assert!(host.has_parent(&media[1]));
    assert!(host.is_connected(&media[1]));
}

#[wasm_bindgen_test]
fn undecoded_videos_are_not_candidates() {
    let host = fixture();
    assert_eq!(locate(&host).unwrap_err(), MediaError::NotFound);
    assert_eq!(host.media_source(&video(&host, "main")), None);
}

#[wasm_bindgen_test]
fn surface_becomes_the_next_sibling_and_is_reused() {
    let host = fixture();
    let main = video(&host, "main");

    let surface = host.create_surface("sv-test-surface").unwrap();
    host.insert_surface_after(&surface, &main).unwrap();
    host.insert_surface_after(&surface, &main).unwrap();

    let next: Node = main.next_sibling().unwrap();
    let surface_node: &Node = surface.as_ref();
    assert_eq!(&next, surface_node);
    assert_eq!(
        host.find_surface("sv-test-surface"),
        Some(surface.clone())
    );
    assert_eq!(
        main.parent_node()
            .unwrap()
            .child_nodes()
            .length(),
        // The container's whitespace text nodes plus the video and the surface.
        4
    );

    host.set_surface_resolution(&surface, sharpview_core::DecodedSize::new(1708, 960));
    assert_eq!((surface.width(), surface.height()), (1708, 960));

    host.remove_surface(&surface);
    assert_eq!(host.find_surface("sv-test-surface"), None);
}

#[wasm_bindgen_test]
fn orphaned_media_cannot_host_a_surface() {
    let host = fixture();
    let orphan = host
        .document()
        .create_element("video")
        .unwrap()
        .dyn_into::<HtmlVideoElement>()
        .unwrap();
    let surface = host.create_surface("sv-orphan-surface").unwrap();
    assert_eq!(
        host.insert_surface_after(&surface, &orphan).unwrap_err(),
        MediaError::NoParent
    );
}

#[wasm_bindgen_test]
fn layout_is_mirrored_onto_the_surface() {
    let host = fixture();
    let main = video(&host, "main");
    let surface: HtmlCanvasElement = host.create_surface("sv-layout-surface").unwrap();

    let layout = host.computed_layout(&main);
    assert_eq!(layout.class_name, "video-stream html5-main-video");
    assert!(layout.get("position").is_some());

    host.apply_surface_layout(
        &surface,
        &LayoutStyle {
            properties: vec![("left", "12px".to_owned()), ("z-index", "3".to_owned())],
            class_name: layout.class_name.clone(),
        },
    );
    let style = surface.style();
    assert_eq!(style.get_property_value("left").unwrap(), "12px");
    assert_eq!(style.get_property_value("z-index").unwrap(), "3");
    assert_eq!(style.get_property_value("pointer-events").unwrap(), "none");
    assert_eq!(surface.class_name(), "video-stream html5-main-video");
}

#[wasm_bindgen_test]
fn hiding_and_marking_round_trip() {
    let host = fixture();
    let main = video(&host, "main");
    let marker = host.config().marker_attribute.clone();

    host.set_media_hidden(&main, true);
    host.set_upscale_marker(&main, true);
    assert_eq!(main.style().get_property_value("opacity").unwrap(), "0");
    assert_eq!(main.get_attribute(&marker).as_deref(), Some("active"));

    // Hiding twice must not overwrite the saved value with "0".
    host.set_media_hidden(&main, true);

    host.set_media_hidden(&main, false);
    host.set_upscale_marker(&main, false);
    assert_eq!(main.style().get_property_value("opacity").unwrap(), "0.8");
    assert_eq!(main.get_attribute(&marker), None);
    assert!(!main
        .get_attribute_names()
        .iter()
        .any(|name| name.as_string().is_some_and(|n| n.starts_with(&marker))));
}

#[wasm_bindgen_test]
fn off_route_apply_leaves_the_page_alone() {
    let host = fixture();
    let body = host.document().body().unwrap();
    let before = body.inner_html();

    let controller = Controller::new(host, ControllerConfig::default(), "/results").unwrap();
    controller.apply(true);
    assert_eq!(controller.phase(), Phase::Disabled);
    assert_eq!(body.inner_html(), before);
}

#[wasm_bindgen_test(async)]
async fn sleep_resolves_on_the_event_loop() {
    let host = fixture();
    host.sleep(Duration::from_millis(5)).await;
}
