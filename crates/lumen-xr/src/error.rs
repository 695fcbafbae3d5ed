//! Errors surfaced to callers of the lighting controller.

use crate::environment::BackendError;
use crate::panorama::LoadError;

/// Failure of a panorama request, delivered through its [`PanoramaRequest`].
///
/// [`PanoramaRequest`]: crate::PanoramaRequest
#[derive(Debug, thiserror::Error)]
pub enum LightingError {
    /// Fetching or decoding the image failed.
    #[error("panorama {url} failed to load: {source}")]
    Load {
        url: String,
        #[source]
        source: LoadError,
    },
    /// The controller was dropped before the load finished.
    #[error("panorama {url} was abandoned before it finished loading")]
    Abandoned { url: String },
    /// The backend could not prefilter the decoded image.
    #[error("panorama {url} failed to bake: {source}")]
    Bake {
        url: String,
        #[source]
        source: BackendError,
    },
}
