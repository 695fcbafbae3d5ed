//! Equirectangular panorama loading.
//!
//! Loads are fire-and-forget: the controller hands a [`PanoramaLoader`] a
//! [`PanoramaDelivery`] and later drains finished images from a channel in
//! completion order. Callers track their own load through a
//! [`PanoramaRequest`].

use std::cell::Cell;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::{debug, warn};

use crate::environment::EnvironmentMap;
use crate::error::LightingError;

/// Decoded equirectangular image in linear RGB.
#[derive(Clone, Debug, PartialEq)]
pub struct EquirectImage {
    width: u32,
    height: u32,
    pixels: Vec<glam::Vec3>,
}

impl EquirectImage {
    /// Wrap row-major linear RGB pixels.
    pub fn new(width: u32, height: u32, pixels: Vec<glam::Vec3>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major pixels.
    pub fn pixels(&self) -> &[glam::Vec3] {
        &self.pixels
    }

    /// Average radiance over the sphere, weighting rows by solid angle.
    pub fn mean_radiance(&self) -> glam::Vec3 {
        if self.width == 0 || self.height == 0 {
            return glam::Vec3::ZERO;
        }
        let mut sum = glam::Vec3::ZERO;
        let mut weight_sum = 0.0;
        for (row, pixels) in self.pixels.chunks_exact(self.width as usize).enumerate() {
            let theta = (row as f32 + 0.5) / self.height as f32 * std::f32::consts::PI;
            let weight = theta.sin();
            for p in pixels {
                sum += *p * weight;
            }
            weight_sum += weight * self.width as f32;
        }
        if weight_sum > 0.0 {
            sum / weight_sum
        } else {
            glam::Vec3::ZERO
        }
    }
}

/// Errors raised while fetching or decoding a panorama.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read panorama {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The bytes are not a decodable image.
    #[error("failed to decode panorama: {0}")]
    Decode(#[from] image::ImageError),
    /// The image is not 2:1.
    #[error("panorama must be 2:1 equirectangular, got {width}x{height}")]
    NotEquirectangular { width: u32, height: u32 },
    /// The loader dropped the request without reporting an outcome.
    #[error("panorama loader dropped the request")]
    Abandoned,
}

/// Identity of one panorama load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PanoramaTicket(pub u64);

/// A finished load as seen by the controller.
#[derive(Debug)]
pub struct PanoramaCompletion {
    /// Load this result belongs to.
    pub ticket: PanoramaTicket,
    /// Requested URL.
    pub url: String,
    /// Decoded image or the reason it failed.
    pub result: Result<EquirectImage, LoadError>,
}

/// Completion slot handed to a loader for one request.
///
/// Dropping it without calling [`deliver`](Self::deliver) reports
/// [`LoadError::Abandoned`].
#[derive(Debug)]
pub struct PanoramaDelivery {
    ticket: PanoramaTicket,
    url: String,
    sender: Option<Sender<PanoramaCompletion>>,
}

impl PanoramaDelivery {
    pub(crate) fn new(
        ticket: PanoramaTicket,
        url: String,
        sender: Sender<PanoramaCompletion>,
    ) -> Self {
        Self {
            ticket,
            url,
            sender: Some(sender),
        }
    }

    /// URL to fetch.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ticket of the load.
    pub fn ticket(&self) -> PanoramaTicket {
        self.ticket
    }

    /// Report the outcome. Returns `false` if the controller is gone.
    pub fn deliver(mut self, result: Result<EquirectImage, LoadError>) -> bool {
        self.send(result)
    }

    fn send(&mut self, result: Result<EquirectImage, LoadError>) -> bool {
        let Some(sender) = self.sender.take() else {
            return false;
        };
        sender
            .send(PanoramaCompletion {
                ticket: self.ticket,
                url: std::mem::take(&mut self.url),
                result,
            })
            .is_ok()
    }
}

impl Drop for PanoramaDelivery {
    fn drop(&mut self) {
        if self.sender.is_some() {
            debug!(ticket = self.ticket.0, url = %self.url, "panorama delivery dropped");
            self.send(Err(LoadError::Abandoned));
        }
    }
}

/// Asynchronous image source for panoramas.
pub trait PanoramaLoader {
    /// Begin loading `delivery.url()`; call [`PanoramaDelivery::deliver`] when done.
    fn load(&self, delivery: PanoramaDelivery);
}

/// Caller's view of a panorama load.
#[derive(Debug)]
pub struct PanoramaRequest {
    ticket: PanoramaTicket,
    url: String,
    receiver: Receiver<Result<EnvironmentMap, LightingError>>,
    settled: Cell<bool>,
}

impl PanoramaRequest {
    pub(crate) fn new(
        ticket: PanoramaTicket,
        url: String,
        receiver: Receiver<Result<EnvironmentMap, LightingError>>,
    ) -> Self {
        Self {
            ticket,
            url,
            receiver,
            settled: Cell::new(false),
        }
    }

    /// Ticket of the load.
    pub fn ticket(&self) -> PanoramaTicket {
        self.ticket
    }

    /// Requested URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Take the outcome once the controller has processed it.
    ///
    /// Returns `None` while the load is still in flight, and again after the
    /// outcome has been taken. If the controller was dropped first the
    /// outcome is [`LightingError::Abandoned`].
    pub fn try_take(&self) -> Option<Result<EnvironmentMap, LightingError>> {
        if self.settled.get() {
            return None;
        }
        let outcome = match self.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(LightingError::Abandoned {
                url: self.url.clone(),
            }),
        };
        self.settled.set(true);
        Some(outcome)
    }
}

/// Decode an in-memory PNG, JPEG, or Radiance HDR panorama.
pub fn decode_equirect(bytes: &[u8]) -> Result<EquirectImage, LoadError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb32f();
    let (width, height) = rgb.dimensions();
    if width != height * 2 {
        return Err(LoadError::NotEquirectangular { width, height });
    }
    let pixels = rgb
        .pixels()
        .map(|p| glam::Vec3::new(p[0], p[1], p[2]))
        .collect();
    Ok(EquirectImage::new(width, height, pixels))
}

/// Read and decode a panorama file.
pub fn load_equirect_file(path: &Path) -> Result<EquirectImage, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_equirect(&bytes)
}

/// Loads panoramas from the local filesystem on a worker thread per request.
///
/// URLs may be plain paths or `file://` URLs; relative paths resolve against
/// the base directory when one is set.
#[derive(Clone, Debug, Default)]
pub struct FilePanoramaLoader {
    base_dir: Option<PathBuf>,
}

impl FilePanoramaLoader {
    /// Loader resolving relative paths against the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader resolving relative paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Map a URL onto a filesystem path.
    pub fn resolve(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl PanoramaLoader for FilePanoramaLoader {
    fn load(&self, delivery: PanoramaDelivery) {
        let path = self.resolve(delivery.url());
        let spawned = std::thread::Builder::new()
            .name("panorama-loader".into())
            .spawn(move || {
                let result = load_equirect_file(&path);
                if let Err(err) = &result {
                    debug!(path = %path.display(), %err, "panorama load failed");
                }
                delivery.deliver(result);
            });
        // On failure the closure, and with it the delivery, is dropped, which
        // settles the request as abandoned.
        if let Err(err) = spawned {
            warn!(%err, "could not spawn panorama loader thread");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([255, 128, 0]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_decode_rejects_non_equirect() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "square.png", 4, 4);
        let err = load_equirect_file(&path).unwrap_err();
        assert!(matches!(
            err,
            LoadError::NotEquirectangular {
                width: 4,
                height: 4
            }
        ));
    }

    #[test]
    fn test_decode_equirect_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "pano.png", 8, 4);
        let image = load_equirect_file(&path).unwrap();
        assert_eq!((image.width(), image.height()), (8, 4));
        assert_eq!(image.pixels().len(), 32);
        assert!((image.pixels()[0].x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_equirect_file(Path::new("/nonexistent/pano.hdr")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = decode_equirect(b"definitely not an image").unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }

    #[test]
    fn test_resolve_paths() {
        let loader = FilePanoramaLoader::with_base_dir("/assets");
        assert_eq!(loader.resolve("sky.hdr"), PathBuf::from("/assets/sky.hdr"));
        assert_eq!(loader.resolve("file:///tmp/sky.hdr"), PathBuf::from("/tmp/sky.hdr"));
        assert_eq!(FilePanoramaLoader::new().resolve("sky.hdr"), PathBuf::from("sky.hdr"));
    }

    #[test]
    fn test_file_loader_delivers_on_channel() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "pano.png", 8, 4);
        let (tx, rx) = crossbeam_channel::unbounded();
        let loader = FilePanoramaLoader::with_base_dir(dir.path());
        loader.load(PanoramaDelivery::new(PanoramaTicket(3), "pano.png".into(), tx));

        let completion = rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .unwrap();
        assert_eq!(completion.ticket, PanoramaTicket(3));
        assert_eq!(completion.url, "pano.png");
        assert_eq!(completion.result.unwrap().width(), 8);
    }

    #[test]
    fn test_dropped_delivery_reports_abandoned() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let delivery = PanoramaDelivery::new(PanoramaTicket(5), "lost.hdr".into(), tx);
        drop(delivery);

        let completion = rx.try_recv().unwrap();
        assert_eq!(completion.ticket, PanoramaTicket(5));
        assert_eq!(completion.url, "lost.hdr");
        assert!(matches!(completion.result, Err(LoadError::Abandoned)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_delivered_outcome_is_sent_once() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let delivery = PanoramaDelivery::new(PanoramaTicket(1), "a.hdr".into(), tx);
        assert!(delivery.deliver(Ok(EquirectImage::new(2, 1, vec![glam::Vec3::ONE; 2]))));
        assert!(rx.try_recv().unwrap().result.is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_request_reports_controller_gone() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let request = PanoramaRequest::new(PanoramaTicket(2), "sky.hdr".into(), rx);
        assert!(request.try_take().is_none());
        drop(tx);
        assert!(matches!(
            request.try_take(),
            Some(Err(LightingError::Abandoned { ref url })) if url == "sky.hdr"
        ));
        assert!(request.try_take().is_none());
    }

    #[test]
    fn test_mean_radiance_of_constant_image() {
        let image = EquirectImage::new(4, 2, vec![glam::Vec3::new(0.5, 1.0, 2.0); 8]);
        let mean = image.mean_radiance();
        assert!((mean - glam::Vec3::new(0.5, 1.0, 2.0)).length() < 1e-5);
        assert_eq!(EquirectImage::new(0, 0, Vec::new()).mean_radiance(), glam::Vec3::ZERO);
    }
}
