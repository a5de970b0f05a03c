// ABOUTME: Desired-state construction from an image list or a manifest.
// ABOUTME: Resolves one credential per image and rejects conflicting duplicates.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use snafu::ResultExt;

use crate::auth::AuthProvider;
use crate::config::SyncConfig;
use crate::manifest::{Manifest, ManifestError};
use crate::types::{EncodedAuth, ImageRef, Origin};

use super::error::{
    AuthResolutionSnafu, ConflictingCredentialsSnafu, InvalidImageSnafu, ManifestSnafu, SyncError,
};

/// Where a run's desired state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredSource {
    /// The `--images` override list.
    ImageList,
    /// Manifest entries for the given role.
    Manifest(Origin),
}

impl fmt::Display for DesiredSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredSource::ImageList => write!(f, "command line"),
            DesiredSource::Manifest(origin) => write!(f, "{} registry", origin),
        }
    }
}

/// Images a run must make available, each with its credential.
#[derive(Debug, Clone)]
pub struct DesiredState {
    source: DesiredSource,
    images: BTreeMap<ImageRef, EncodedAuth>,
}

impl DesiredState {
    pub fn new(source: DesiredSource) -> Self {
        Self {
            source,
            images: BTreeMap::new(),
        }
    }

    /// Build from exactly one input: the override list when non-empty,
    /// otherwise the manifest. The manifest is not loaded in override mode.
    pub fn build<A, M>(config: &SyncConfig, auth: &A, load_manifest: M) -> Result<Self, SyncError>
    where
        A: AuthProvider + ?Sized,
        M: FnOnce() -> Result<Manifest, ManifestError>,
    {
        if config.uses_image_override() {
            return Self::from_image_list(&config.images, auth);
        }
        let manifest = load_manifest().context(ManifestSnafu)?;
        Self::from_manifest(&manifest, config.origin, auth)
    }

    /// Parse each entry and resolve its credential through the provider.
    pub fn from_image_list<A, S>(images: &[S], auth: &A) -> Result<Self, SyncError>
    where
        A: AuthProvider + ?Sized,
        S: AsRef<str>,
    {
        let mut state = Self::new(DesiredSource::ImageList);
        for input in images {
            let input = input.as_ref();
            let image = ImageRef::parse(input).context(InvalidImageSnafu { input })?;
            let encoded = auth.resolve(image.host()).context(AuthResolutionSnafu {
                image: image.to_string(),
                host: image.host(),
            })?;
            state.insert(image, encoded)?;
        }
        Ok(state)
    }

    /// Select each entry's reference and credential for `origin`.
    ///
    /// Inline manifest credentials win; entries without them fall back to
    /// the provider for the image's host.
    pub fn from_manifest<A>(manifest: &Manifest, origin: Origin, auth: &A) -> Result<Self, SyncError>
    where
        A: AuthProvider + ?Sized,
    {
        let mut state = Self::new(DesiredSource::Manifest(origin));
        for entry in manifest.entries(origin).context(ManifestSnafu)? {
            let host = entry.image.host().to_string();
            let encoded = match entry.auth {
                Some(inline) => inline.resolve(&host),
                None => auth.resolve(&host),
            }
            .context(AuthResolutionSnafu {
                image: entry.image.to_string(),
                host: host.as_str(),
            })?;
            state.insert(entry.image, encoded)?;
        }
        Ok(state)
    }

    /// Add an image. A repeat with the same credential is absorbed; a repeat
    /// with a different credential is rejected.
    pub fn insert(&mut self, image: ImageRef, auth: EncodedAuth) -> Result<(), SyncError> {
        match self.images.entry(image) {
            Entry::Vacant(slot) => {
                slot.insert(auth);
                Ok(())
            }
            Entry::Occupied(existing) if *existing.get() == auth => {
                tracing::debug!(image = %existing.key(), "ignoring duplicate image");
                Ok(())
            }
            Entry::Occupied(existing) => ConflictingCredentialsSnafu {
                image: existing.key().clone(),
            }
            .fail(),
        }
    }

    pub fn source(&self) -> DesiredSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn contains(&self, image: &ImageRef) -> bool {
        self.images.contains_key(image)
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageRef> {
        self.images.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ImageRef, &EncodedAuth)> {
        self.images.iter()
    }

    pub(crate) fn into_entries(self) -> BTreeMap<ImageRef, EncodedAuth> {
        self.images
    }
}

/// Desired images confirmed absent from local storage.
#[derive(Debug, Clone, Default)]
pub struct WorkSet {
    images: BTreeMap<ImageRef, EncodedAuth>,
}

impl WorkSet {
    pub(crate) fn from_entries(images: BTreeMap<ImageRef, EncodedAuth>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn contains(&self, image: &ImageRef) -> bool {
        self.images.contains_key(image)
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageRef> {
        self.images.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ImageRef, &EncodedAuth)> {
        self.images.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;

    struct Anonymous;

    impl AuthProvider for Anonymous {
        fn resolve(&self, _host: &str) -> Result<EncodedAuth, AuthError> {
            Ok(EncodedAuth::anonymous())
        }
    }

    fn image(s: &str) -> ImageRef {
        ImageRef::parse(s).unwrap()
    }

    #[test]
    fn identical_duplicates_collapse() {
        let state = DesiredState::from_image_list(
            &["quay.io/org/app:v1", "quay.io/org/app:v1"],
            &Anonymous,
        )
        .unwrap();
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn conflicting_duplicates_are_rejected() {
        let mut state = DesiredState::new(DesiredSource::ImageList);
        state
            .insert(image("quay.io/org/app:v1"), EncodedAuth::anonymous())
            .unwrap();
        let err = state
            .insert(
                image("quay.io/org/app:v1"),
                EncodedAuth::from_encoded("c2VjcmV0"),
            )
            .unwrap_err();
        assert!(matches!(err, SyncError::ConflictingCredentials { .. }));
    }

    #[test]
    fn invalid_entry_is_fatal() {
        let err = DesiredState::from_image_list(&["not an image!"], &Anonymous).unwrap_err();
        assert!(matches!(err, SyncError::InvalidImage { ref input, .. } if input == "not an image!"));
    }

    #[test]
    fn iteration_is_sorted() {
        let state = DesiredState::from_image_list(
            &["quay.io/b:1", "quay.io/a:1", "ghcr.io/c:1"],
            &Anonymous,
        )
        .unwrap();
        let images: Vec<String> = state.images().map(|i| i.to_string()).collect();
        let mut sorted = images.clone();
        sorted.sort();
        assert_eq!(images, sorted);
    }
}
