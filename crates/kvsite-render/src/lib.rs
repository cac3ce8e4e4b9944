//! Edge worker generator for kvsite.
//!
//! [`render`] turns a namespace binding and a [`Manifest`](kvsite_types::Manifest)
//! into the source of a stateless worker script. The manifest is embedded as
//! data; the request handling is fixed boilerplate in [`template`].
//!
//! Rendering is a pure function: the same inputs always produce byte-identical
//! output, and there is no process-wide template registry.

pub mod error;
pub mod render;
pub mod template;

pub use error::{RenderError, RenderResult};
pub use render::{render, validate_namespace};
