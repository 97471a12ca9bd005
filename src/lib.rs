//! Broadcast a single byte stream to many independent async readers.
//!
//! A [`ReadCaster`] owns one sequential source (anything implementing
//! [`tokio::io::AsyncRead`]) and hands out any number of [`CastReader`]s,
//! each of which sees the complete byte sequence of the source, in order,
//! at its own pace. The source is read exactly once, by a single background
//! pump task.
//!
//! # Architecture
//!
//! ```text
//!                ReadCaster
//!         ┌──────────────────────┐
//!         │ source (read once by │
//!         │ the pump task)       │
//!         │ outlets: Vec<Sender> │
//!         └──────────┬───────────┘
//!                    │ one chunk per read, fanned out
//!        ┌───────────┼───────────┐
//!        ▼           ▼           ▼
//!   [CastReader] [CastReader] [CastReader]
//!   inbox.recv() inbox.recv() inbox.recv()
//! ```
//!
//! Each reader has its own bounded inbox of `backlog_depth` chunks, so
//! readers may drift apart by up to that many chunks before the pump blocks
//! delivering to the laggard. A reader that fails to accept a chunk within
//! `reader_timeout` is evicted: its inbox is closed, its subsequent reads
//! fail with [`std::io::ErrorKind::TimedOut`], and the remaining readers are
//! unaffected.
//!
//! # Zero-copy fan-out
//!
//! Chunks are [`bytes::Bytes`]: one allocation per pump iteration, shared by
//! reference count across every reader's inbox. Delivering to N readers
//! clones the handle, not the data.
//!
//! # Example
//!
//! ```
//! use readcast::ReadCaster;
//! use tokio::io::AsyncReadExt;
//!
//! # tokio_test::block_on(async {
//! let source = std::io::Cursor::new(b"Hello from readcast.".to_vec());
//! let caster = ReadCaster::new(source);
//!
//! let mut r1 = caster.new_reader().unwrap();
//! let mut r2 = caster.new_reader().unwrap();
//!
//! let (mut out1, mut out2) = (Vec::new(), Vec::new());
//! let (a, b) = tokio::join!(r1.read_to_end(&mut out1), r2.read_to_end(&mut out2));
//! a.unwrap();
//! b.unwrap();
//!
//! assert_eq!(out1, b"Hello from readcast.");
//! assert_eq!(out2, b"Hello from readcast.");
//! # });
//! ```

pub mod caster;
pub mod config;
pub mod error;
pub mod reader;

pub use caster::ReadCaster;
pub use config::CasterConfig;
pub use error::{CastError, Result};
pub use reader::CastReader;
