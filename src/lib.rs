//! # Shrinkray
//!
//! A batch image optimizer. Callers hand over images and a transformation
//! (resize rule plus output format and quality); Shrinkray processes them one
//! at a time in arrival order and hands each result to an export sink.
//!
//! # Architecture: One Queue, One Worker
//!
//! ```text
//! files + TransformConfig ──▶ JobQueue ──▶ ImageBackend ──▶ Done | Error
//!                                │                             │
//!                                │ read model (JobRecord)      ▼
//!                                └──────────────────────▶ ExportThrottle ──▶ ExportSink
//! ```
//!
//! The core ([`queue`], [`job`], [`imaging`], [`export`]) knows nothing about
//! files on disk or terminals. The `shrinkray` binary is one caller: it walks
//! input paths, feeds the queue, and prints queue events through [`output`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`queue`] | Single-flight FIFO job queue, auto-export, export-all, clear |
//! | [`job`] | Job state machine and the serializable [`job::JobRecord`] read model |
//! | [`imaging`] | Geometry and format policy, the codec seam, the transform pipeline |
//! | [`export`] | Export sink trait, directory sink, cooldown throttle |
//! | [`naming`] | Output file names derived from source names |
//! | [`types`] | Media types and source images |
//! | [`inputs`] | Command-line paths to source images (directory walking) |
//! | [`config`] | `shrinkray.toml` loading, validation, and merging |
//! | [`output`] | CLI output formatting for queue events and summaries |
//!
//! # Design Decisions
//!
//! ## Tagged-Union Job State
//!
//! A job's state carries its data: the source bytes exist only while it is
//! `Pending`, the encoded result only once it is `Done`, and the failure
//! reason only in `Error`. A finished job cannot be mistaken for a pending
//! one, and the source is released as soon as the transform has consumed it.
//!
//! ## Explicit Scheduling
//!
//! The queue does not watch its own state for changes. Enqueue and job
//! completion each call one scheduling step that claims the next job if the
//! worker slot is free. All bookkeeping happens under a short synchronous
//! lock that is never held across an `.await`.
//!
//! ## Configuration Snapshots
//!
//! Every enqueue copies the [`imaging::TransformConfig`] into each new job.
//! Changing settings afterwards affects only images enqueued afterwards.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and resampling use the `image` crate (Lanczos3), SVG goes through
//! `resvg`, and lossy WebP comes from `webp`. The codec sits behind the
//! [`imaging::ImageBackend`] trait so the queue can be tested against a mock.

pub mod config;
pub mod export;
pub mod imaging;
pub mod inputs;
pub mod job;
pub mod naming;
pub mod output;
pub mod queue;
pub mod types;
