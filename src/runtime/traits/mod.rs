// ABOUTME: Capability traits for container runtimes.
// ABOUTME: Defines ImageOps and RuntimeInfo.

mod image;
mod runtime_info;

pub use image::{ImageError, ImageErrorKind, ImageOps, RemoteImage};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError, RuntimeMetadata};
