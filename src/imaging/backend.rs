//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: decode, resample, and encode. It is the only seam through which
//! the rest of the crate touches a codec, so the queue and the transform
//! logic can be exercised against a mock.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::EncodeParams;
use crate::types::MediaType;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Resample failed: {0}")]
    Resample(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Decoded pixels ready to be drawn, scaled, or encoded.
#[derive(Debug, Clone)]
pub struct Surface {
    image: DynamicImage,
}

impl Surface {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Trait for image codec backends.
///
/// Calls are blocking; the queue runs them on a blocking thread. Every call
/// may fail independently.
pub trait ImageBackend: Send + Sync {
    /// Decode source bytes into a surface.
    fn decode(&self, bytes: &[u8], media_type: &MediaType) -> Result<Surface, BackendError>;

    /// Scale a surface to exactly `width` × `height` with a high-quality filter.
    fn resample(&self, surface: Surface, width: u32, height: u32)
    -> Result<Surface, BackendError>;

    /// Encode a surface with the given parameters.
    fn encode(&self, surface: &Surface, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::Quality;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    /// Mock backend that records operations without running a real codec.
    ///
    /// Decode reads the source dimensions from the bytes themselves
    /// (see [`MockBackend::source_bytes`]), so each job carries its own size.
    /// Encode emits `output_size` bytes. Uses Mutex (not RefCell) so it is
    /// Sync and can be shared with the queue's blocking threads.
    #[derive(Default)]
    pub struct MockBackend {
        pub operations: Mutex<Vec<RecordedOp>>,
        /// Bytes produced by every successful encode.
        pub output_size: usize,
        /// Source tags whose decode fails.
        pub failing: Mutex<Vec<String>>,
        /// Source tags whose decode sleeps for the given duration.
        pub delays: Mutex<HashMap<String, Duration>>,
        /// When each decode began, in call order.
        pub decode_starts: Mutex<Vec<Instant>>,
        active: AtomicUsize,
        pub max_active: AtomicUsize,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(String),
        Resample { width: u32, height: u32 },
        Encode {
            width: u32,
            height: u32,
            params: EncodeParams,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self {
                output_size: 100,
                ..Self::default()
            }
        }

        pub fn with_output_size(output_size: usize) -> Self {
            Self {
                output_size,
                ..Self::default()
            }
        }

        /// Build source bytes the mock understands: `tag:WxH`.
        pub fn source_bytes(tag: &str, width: u32, height: u32) -> Vec<u8> {
            format!("{tag}:{width}x{height}").into_bytes()
        }

        pub fn fail_on(self, tag: &str) -> Self {
            self.failing.lock().unwrap().push(tag.to_string());
            self
        }

        pub fn delay_on(self, tag: &str, delay: Duration) -> Self {
            self.delays.lock().unwrap().insert(tag.to_string(), delay);
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn decoded_tags(&self) -> Vec<String> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Decode(tag) => Some(tag),
                    _ => None,
                })
                .collect()
        }

        fn parse(bytes: &[u8]) -> Option<(String, u32, u32)> {
            let text = std::str::from_utf8(bytes).ok()?;
            let (tag, size) = text.rsplit_once(':')?;
            let (w, h) = size.split_once('x')?;
            Some((tag.to_string(), w.parse().ok()?, h.parse().ok()?))
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8], _media_type: &MediaType) -> Result<Surface, BackendError> {
            self.decode_starts.lock().unwrap().push(Instant::now());
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);

            let parsed = Self::parse(bytes);
            let tag = parsed.as_ref().map(|(t, _, _)| t.clone()).unwrap_or_default();
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(tag.clone()));

            let delay = self.delays.lock().unwrap().get(&tag).copied();
            if let Some(delay) = delay {
                std::thread::sleep(delay);
            }

            let result = match parsed {
                Some((tag, _, _)) if self.failing.lock().unwrap().contains(&tag) => {
                    Err(BackendError::Decode(format!("mock refused {tag}")))
                }
                Some((_, w, h)) => Ok(Surface::new(DynamicImage::new_rgba8(w, h))),
                None => Err(BackendError::Decode("not a mock image".to_string())),
            };

            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }

        fn resample(
            &self,
            _surface: Surface,
            width: u32,
            height: u32,
        ) -> Result<Surface, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Resample { width, height });
            Ok(Surface::new(DynamicImage::new_rgba8(width, height)))
        }

        fn encode(
            &self,
            surface: &Surface,
            params: &EncodeParams,
        ) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                width: surface.width(),
                height: surface.height(),
                params: *params,
            });
            Ok(vec![0u8; self.output_size])
        }
    }

    #[test]
    fn mock_decodes_tagged_dimensions() {
        let backend = MockBackend::new();
        let surface = backend
            .decode(&MockBackend::source_bytes("a", 800, 600), &MediaType::Jpeg)
            .unwrap();
        assert_eq!(surface.dimensions(), (800, 600));
        assert_eq!(backend.decoded_tags(), vec!["a".to_string()]);
    }

    #[test]
    fn mock_fails_on_request() {
        let backend = MockBackend::new().fail_on("bad");
        let result = backend.decode(&MockBackend::source_bytes("bad", 10, 10), &MediaType::Png);
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn mock_rejects_garbage() {
        let backend = MockBackend::new();
        assert!(backend.decode(b"\x89PNG", &MediaType::Png).is_err());
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::with_output_size(42);
        let surface = Surface::new(DynamicImage::new_rgba8(4, 3));
        let bytes = backend
            .encode(
                &surface,
                &EncodeParams::Jpeg {
                    quality: Quality::new(0.9),
                },
            )
            .unwrap();
        assert_eq!(bytes.len(), 42);
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Encode {
                width: 4,
                height: 3,
                params: EncodeParams::Jpeg { .. }
            }
        ));
    }
}
