//! buildah - drive the buildah container-image builder from Rust.
//!
//! A thin, synchronous binding over the `buildah(1)` CLI. Every operation
//! shells out to buildah and translates its textual/JSON output into
//! in-process values; all state and consistency belongs to buildah's own
//! image store.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use buildah::{Buildah, Options};
//!
//! let client = Buildah::new();
//! let container = client.from_image("alpine:3.12", Some("builder"), &Options::new())?;
//! container.add_bytes(b"#!/bin/sh\necho hi\n", "/entry.sh", Some(0o755), &Options::new())?;
//! container.set_entrypoint(&["/entry.sh".to_string()])?;
//! let image = container.commit("my-image", &Options::new())?;
//! println!("built {}", image.id());
//! ```
//!
//! # Testing
//!
//! All command execution goes through the
//! [`CommandRunner`](runner::CommandRunner) trait;
//! [`MockCommandRunner`](runner::MockCommandRunner) records calls and
//! replays canned output, so client code can be tested without buildah
//! installed.

pub mod client;
pub mod collections;
mod config;
pub mod container;
pub mod error;
pub mod image;
pub mod inspect;
mod ops;
pub mod options;
pub mod runner;
pub mod timings;

pub use client::{Buildah, BuildahBuilder};
pub use collections::{ConfigMap, ConfigSet};
pub use container::{Container, MountGuard};
pub use error::{BuildahError, Result};
pub use image::Image;
pub use inspect::EntityKind;
pub use options::{OptValue, Options};
pub use runner::{CommandOutput, CommandRunner, MockCommandRunner, MockResponse, RealCommandRunner};
