// ABOUTME: Validated domain types shared by the engine and its collaborators.
// ABOUTME: Image references, origin roles, and registry credentials.

mod auth;
mod image_ref;
mod origin;

pub use auth::{DecodeAuthError, EncodedAuth, RegistryAuth};
pub use image_ref::{DEFAULT_REGISTRY, ImageRef, ParseImageRefError};
pub(crate) use image_ref::canonical_host;
pub use origin::{Origin, ParseOriginError};
