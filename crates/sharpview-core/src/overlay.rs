use crate::error::MediaError;
use crate::platform::SurfaceDom;

/// Ratio between the overlay surface resolution and the decoded source resolution.
pub const UPSCALE_FACTOR: u32 = 2;

/// Owner of the single well-known overlay surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySurfaces {
    surface_id: String,
}

impl OverlaySurfaces {
    pub fn new(surface_id: impl Into<String>) -> Self {
        Self {
            surface_id: surface_id.into(),
        }
    }

    pub fn surface_id(&self) -> &str {
        &self.surface_id
    }

    /// Returns the overlay surface for `media`, creating it if the document has none.
    ///
    /// On every call the surface is moved to be the immediate next sibling of `media`, its
    /// resolution is set to the decoded size times [`UPSCALE_FACTOR`], and the source element's
    /// computed layout is copied over so it sits exactly on top of the source.
    pub fn create_or_reuse<D>(&self, dom: &D, media: &D::Media) -> Result<D::Surface, MediaError>
    where
        D: SurfaceDom + ?Sized,
    {
        let decoded = dom.decoded_size(media);
        if !decoded.is_positive() {
            return Err(MediaError::InvalidDimensions {
                width: decoded.width,
                height: decoded.height,
            });
        }
        if !dom.has_parent(media) {
            return Err(MediaError::NoParent);
        }

        let surface = match dom.find_surface(&self.surface_id) {
            Some(existing) => existing,
            None => {
                tracing::debug!(id = %self.surface_id, "creating overlay surface");
                dom.create_surface(&self.surface_id)?
            }
        };

        dom.insert_surface_after(&surface, media)?;
        dom.set_surface_resolution(&surface, decoded.scaled(UPSCALE_FACTOR));
        dom.apply_surface_layout(&surface, &dom.computed_layout(media));
        Ok(surface)
    }

    pub fn remove<D>(&self, dom: &D, surface: &D::Surface)
    where
        D: SurfaceDom + ?Sized,
    {
        dom.remove_surface(surface);
    }

    /// Removes the well-known surface if the document has one. Returns whether it did.
    pub fn remove_any<D>(&self, dom: &D) -> bool
    where
        D: SurfaceDom + ?Sized,
    {
        match dom.find_surface(&self.surface_id) {
            Some(surface) => {
                dom.remove_surface(&surface);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::DecodedSize;
    use crate::test_utils::{FakeHost, FakeMedia};

    const ID: &str = "overlay";

    #[test]
    fn creates_surface_as_next_sibling_at_double_resolution() {
        let host = FakeHost::new();
        let media = host.add_media(FakeMedia::playable("blob:v", 854, 480));
        let overlays = OverlaySurfaces::new(ID);

        let surface = overlays.create_or_reuse(&host, &media).unwrap();
        let record = host.surface(surface).unwrap();
        assert_eq!(record.dom_id, ID);
        assert_eq!(record.next_to, Some(media));
        assert_eq!(record.resolution, DecodedSize::new(1708, 960));
        assert_eq!(host.attached_surface_count(), 1);
    }

    #[test]
    fn reuses_existing_surface_and_resyncs_layout() {
        let host = FakeHost::new();
        let first = host.add_media(FakeMedia::playable("blob:a", 640, 360));
        let second = host.add_media(FakeMedia::playable("blob:b", 1280, 720));
        let overlays = OverlaySurfaces::new(ID);

        let a = overlays.create_or_reuse(&host, &first).unwrap();
        host.update_media(second, |m| {
            m.layout.properties = vec![("top", "12px".to_owned()), ("z-index", "3".to_owned())];
            m.layout.class_name = "video-stream html5-main-video".to_owned();
        });
        let b = overlays.create_or_reuse(&host, &second).unwrap();

        assert_eq!(a, b);
        assert_eq!(host.surfaces_created(), 1);
        let record = host.surface(b).unwrap();
        assert_eq!(record.next_to, Some(second));
        assert_eq!(record.resolution, DecodedSize::new(2560, 1440));
        let layout = record.layout.unwrap();
        assert_eq!(layout.get("top"), Some("12px"));
        assert_eq!(layout.class_name, "video-stream html5-main-video");
    }

    #[test]
    fn rejects_non_positive_dimensions_and_orphans() {
        let host = FakeHost::new();
        let overlays = OverlaySurfaces::new(ID);

        let empty = host.add_media(FakeMedia::playable("blob:v", 0, 480));
        assert_eq!(
            overlays.create_or_reuse(&host, &empty),
            Err(MediaError::InvalidDimensions {
                width: 0,
                height: 480
            })
        );

        let orphan = host.add_media(FakeMedia {
            has_parent: false,
            ..FakeMedia::playable("blob:v", 640, 360)
        });
        assert_eq!(
            overlays.create_or_reuse(&host, &orphan),
            Err(MediaError::NoParent)
        );
        assert_eq!(host.surfaces_created(), 0);
    }

    #[test]
    fn remove_any_is_idempotent() {
        let host = FakeHost::new();
        let media = host.add_media(FakeMedia::playable("blob:v", 640, 360));
        let overlays = OverlaySurfaces::new(ID);

        overlays.create_or_reuse(&host, &media).unwrap();
        assert!(overlays.remove_any(&host));
        assert!(!overlays.remove_any(&host));
        assert_eq!(host.attached_surface_count(), 0);
    }
}
