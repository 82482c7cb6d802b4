//! `MediaDom` / `SurfaceDom` over the live document.

use sharpview_core::{
    DecodedSize, LayoutStyle, MediaDom, MediaError, ReadyLevel, SurfaceDom, MIRRORED_PROPERTIES,
};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlCanvasElement, HtmlVideoElement, Node};

use crate::host::WebHost;

fn dom_error(context: &str, err: JsValue) -> MediaError {
    MediaError::Dom(format!("{context}: {err:?}"))
}

impl MediaDom for WebHost {
    type Media = HtmlVideoElement;

    fn player_media(&self) -> Vec<HtmlVideoElement> {
        let selector = &self.config().player_root_selector;
        let root = match self.document().query_selector(selector) {
            Ok(Some(root)) => root,
            Ok(None) => {
                tracing::trace!(selector, "player root not mounted");
                return Vec::new();
            }
            Err(err) => {
                tracing::warn!(selector, "player root selector rejected: {err:?}");
                return Vec::new();
            }
        };

        let Ok(nodes) = root.query_selector_all("video") else {
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<HtmlVideoElement>().ok())
            .collect()
    }

    fn media_source(&self, media: &HtmlVideoElement) -> Option<String> {
        [media.current_src(), media.src()]
            .into_iter()
            .find(|src| !src.is_empty())
    }

    fn decoded_size(&self, media: &HtmlVideoElement) -> DecodedSize {
        DecodedSize::new(media.video_width(), media.video_height())
    }

    fn ready_level(&self, media: &HtmlVideoElement) -> ReadyLevel {
        ReadyLevel::from_raw(media.ready_state())
    }

    fn in_ad_container(&self, media: &HtmlVideoElement) -> bool {
        self.config()
            .ad_container_selectors
            .iter()
            .any(|selector| matches!(media.closest(selector), Ok(Some(_))))
    }

    fn is_connected(&self, media: &HtmlVideoElement) -> bool {
        media.is_connected()
    }

    fn has_parent(&self, media: &HtmlVideoElement) -> bool {
        media.parent_node().is_some()
    }

    fn set_media_hidden(&self, media: &HtmlVideoElement, hidden: bool) {
        let style = media.style();
        let saved = self.saved_opacity_attribute();
        let result = if hidden {
            if !media.has_attribute(&saved) {
                let previous = style.get_property_value("opacity").unwrap_or_default();
                let _ = media.set_attribute(&saved, &previous);
            }
            style.set_property("opacity", "0")
        } else {
            let previous = media.get_attribute(&saved).unwrap_or_default();
            let _ = media.remove_attribute(&saved);
            if previous.is_empty() {
                style.remove_property("opacity").map(|_| ())
            } else {
                style.set_property("opacity", &previous)
            }
        };
        if let Err(err) = result {
            tracing::warn!(hidden, "failed to toggle source visibility: {err:?}");
        }
    }

    fn set_upscale_marker(&self, media: &HtmlVideoElement, active: bool) {
        let marker = &self.config().marker_attribute;
        let result = if active {
            media.set_attribute(marker, "active")
        } else {
            media.remove_attribute(marker)
        };
        if let Err(err) = result {
            tracing::warn!(marker, "failed to update marker: {err:?}");
        }
    }
}

impl SurfaceDom for WebHost {
    type Surface = HtmlCanvasElement;

    fn find_surface(&self, id: &str) -> Option<HtmlCanvasElement> {
        self.document()
            .get_element_by_id(id)
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
    }

    fn create_surface(&self, id: &str) -> Result<HtmlCanvasElement, MediaError> {
        let canvas = self
            .document()
            .create_element("canvas")
            .map_err(|err| dom_error("create canvas", err))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|el| dom_error("create canvas", el.into()))?;
        canvas.set_id(id);
        Ok(canvas)
    }

    fn insert_surface_after(
        &self,
        surface: &HtmlCanvasElement,
        media: &HtmlVideoElement,
    ) -> Result<(), MediaError> {
        let parent = media.parent_node().ok_or(MediaError::NoParent)?;
        let next = media.next_sibling();
        let surface_node: &Node = surface.as_ref();
        if next.as_ref() == Some(surface_node) {
            return Ok(());
        }
        parent
            .insert_before(surface_node, next.as_ref())
            .map_err(|err| dom_error("insert overlay", err))?;
        Ok(())
    }

    fn set_surface_resolution(&self, surface: &HtmlCanvasElement, size: DecodedSize) {
        if surface.width() != size.width {
            surface.set_width(size.width);
        }
        if surface.height() != size.height {
            surface.set_height(size.height);
        }
    }

    fn computed_layout(&self, media: &HtmlVideoElement) -> LayoutStyle {
        let class_name = media.class_name();
        let style = match self.window().get_computed_style(media) {
            Ok(Some(style)) => style,
            Ok(None) | Err(_) => {
                tracing::debug!("no computed style for source element");
                return LayoutStyle {
                    properties: Vec::new(),
                    class_name,
                };
            }
        };
        let properties = MIRRORED_PROPERTIES
            .iter()
            .map(|&name| (name, style.get_property_value(name).unwrap_or_default()))
            .collect();
        LayoutStyle {
            properties,
            class_name,
        }
    }

    fn apply_surface_layout(&self, surface: &HtmlCanvasElement, layout: &LayoutStyle) {
        surface.set_class_name(&layout.class_name);
        let style = surface.style();
        for (name, value) in &layout.properties {
            if let Err(err) = style.set_property(name, value) {
                tracing::warn!(property = name, "failed to mirror style: {err:?}");
            }
        }
        // The overlay only draws; clicks belong to the player underneath.
        let _ = style.set_property("pointer-events", "none");
    }

    fn remove_surface(&self, surface: &HtmlCanvasElement) {
        surface.remove();
    }
}
