//! Finding the media element that carries the actual content.
//!
//! The player container routinely holds more than one media element: advertisement players,
//! preloading placeholders and elements that have not been given a source yet. Only the content
//! element is worth upscaling.

use crate::error::MediaError;
use crate::platform::{DecodedSize, MediaDom, ReadyLevel};

/// A media element plus the facts the locator judged it by.
///
/// Recomputed on every [`locate`]; never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCandidate<M> {
    pub media: M,
    pub has_source: bool,
    pub decoded: DecodedSize,
    pub is_advertisement: bool,
    pub ready_level: ReadyLevel,
}

impl<M> MediaCandidate<M> {
    pub fn is_valid(&self) -> bool {
        self.has_source && self.decoded.is_positive() && !self.is_advertisement
    }
}

pub fn inspect<D: MediaDom + ?Sized>(dom: &D, media: D::Media) -> MediaCandidate<D::Media> {
    let has_source = dom
        .media_source(&media)
        .is_some_and(|src| !src.trim().is_empty());
    MediaCandidate {
        has_source,
        decoded: dom.decoded_size(&media),
        is_advertisement: dom.in_ad_container(&media),
        ready_level: dom.ready_level(&media),
        media,
    }
}

/// Picks the most loaded valid media element under the player root.
///
/// Ties go to the element that comes first in document order. `NotFound` is an expected state
/// while the page is still mounting its player and is not worth more than a trace line.
pub fn locate<D: MediaDom + ?Sized>(dom: &D) -> Result<MediaCandidate<D::Media>, MediaError> {
    let mut best: Option<MediaCandidate<D::Media>> = None;
    for media in dom.player_media() {
        let candidate = inspect(dom, media);
        if !candidate.is_valid() {
            tracing::trace!(
                media = ?candidate.media,
                has_source = candidate.has_source,
                decoded = %candidate.decoded,
                advertisement = candidate.is_advertisement,
                "skipping media element"
            );
            continue;
        }
        match &best {
            Some(current) if current.ready_level >= candidate.ready_level => {}
            _ => best = Some(candidate),
        }
    }
    best.ok_or(MediaError::NotFound)
}

/// Which underlying stream an element is playing.
///
/// Two identities are equal only if both the element and its current source are the same; the
/// page swaps sources on a live element when navigating between videos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaIdentity<M> {
    media: M,
    source: Option<String>,
}

impl<M: Clone + PartialEq> MediaIdentity<M> {
    pub fn capture<D>(dom: &D, media: &M) -> Self
    where
        D: MediaDom<Media = M> + ?Sized,
    {
        Self {
            media: media.clone(),
            source: dom.media_source(media),
        }
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Whether `media` is still the same element playing the same source.
    pub fn matches<D>(&self, dom: &D, media: &M) -> bool
    where
        D: MediaDom<Media = M> + ?Sized,
    {
        self.media == *media && self.source == dom.media_source(media)
    }
}
