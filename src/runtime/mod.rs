// ABOUTME: Container runtime access for Docker and Podman.
// ABOUTME: Detects the local runtime and exposes the image operations the engine uses.

mod bollard;
mod detection;
mod error;
pub mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use detection::{DetectionError, detect, detect_local};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use traits::{
    ImageError, ImageErrorKind, ImageOps, RemoteImage, RuntimeInfo as RuntimeInfoTrait,
    RuntimeInfoError, RuntimeMetadata,
};
pub use types::{RuntimeConfig, RuntimeInfo, RuntimeType};
