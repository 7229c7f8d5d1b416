//! Artifact resolution and installation for provisioning steps.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use steward_model::Instance;
use url::Url;

use crate::error::{Result, StewardError};

/// Where a deployable artifact comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactSource {
    /// A file already present on the orchestrator's filesystem.
    LocalFile(PathBuf),
    /// A file to download first.
    Url(Url),
    /// A dependency coordinate `group:name:version` resolved through a
    /// configured artifact repository.
    Coordinate(String),
}

impl ArtifactSource {
    /// Interprets a notation string: URLs stay URLs, `group:name:version`
    /// becomes a coordinate, everything else is a local path.
    pub fn parse(notation: &str) -> Self {
        if notation.starts_with("http://") || notation.starts_with("https://") {
            if let Ok(url) = Url::parse(notation) {
                return ArtifactSource::Url(url);
            }
        }
        if notation.matches(':').count() == 2 && !notation.contains(['/', '\\']) {
            return ArtifactSource::Coordinate(notation.to_string());
        }
        ArtifactSource::LocalFile(PathBuf::from(notation))
    }

    /// File name the artifact is expected to resolve to.
    pub fn file_name(&self) -> String {
        match self {
            ArtifactSource::LocalFile(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            ArtifactSource::Url(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .unwrap_or("artifact")
                .to_string(),
            ArtifactSource::Coordinate(coordinate) => {
                let mut parts = coordinate.split(':');
                let _group = parts.next();
                let name = parts.next().unwrap_or("artifact");
                match parts.next() {
                    Some(version) => format!("{name}-{version}"),
                    None => name.to_string(),
                }
            }
        }
    }
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactSource::LocalFile(path) => write!(f, "{}", path.display()),
            ArtifactSource::Url(url) => write!(f, "{url}"),
            ArtifactSource::Coordinate(coordinate) => f.write_str(coordinate),
        }
    }
}

/// Resolves artifact notations to local files ready for installation.
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    async fn resolve(&self, source: &ArtifactSource) -> Result<PathBuf>;
}

/// Resolver for artifacts already present on the local filesystem. Remote
/// notations are rejected; deployments that need them plug in a resolver
/// wired to their download infrastructure.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalArtifactResolver;

#[async_trait]
impl ArtifactResolver for LocalArtifactResolver {
    async fn resolve(&self, source: &ArtifactSource) -> Result<PathBuf> {
        match source {
            ArtifactSource::LocalFile(path) => {
                if tokio::fs::try_exists(path).await? {
                    Ok(path.clone())
                } else {
                    Err(StewardError::Validation(format!(
                        "artifact file does not exist: {}",
                        path.display()
                    )))
                }
            }
            other => Err(StewardError::Validation(format!(
                "cannot resolve '{other}' locally"
            ))),
        }
    }
}

/// Installs a resolved artifact onto an instance.
#[async_trait]
pub trait ArtifactInstaller: Send + Sync {
    /// Returns true when installation changed the instance, false when the
    /// artifact was already present in this version.
    async fn install(&self, instance: &Instance, file: &Path) -> Result<bool>;
}

/// Short content digest of a file, suitable as a step version: artifacts
/// with identical bytes share a digest.
pub async fn checksum(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    let digest = Sha256::digest(&bytes);
    Ok(URL_SAFE_NO_PAD.encode(&digest[..16]))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn notation_parsing_distinguishes_the_three_shapes() {
        assert!(matches!(
            ArtifactSource::parse("https://repo.example.com/app-1.2.0.zip"),
            ArtifactSource::Url(_)
        ));
        assert!(matches!(
            ArtifactSource::parse("com.example:app:1.2.0"),
            ArtifactSource::Coordinate(_)
        ));
        assert!(matches!(
            ArtifactSource::parse("build/distributions/app-1.2.0.zip"),
            ArtifactSource::LocalFile(_)
        ));
        // A path with a drive-like colon count still reads as a path.
        assert!(matches!(
            ArtifactSource::parse("dir/a:b:c.zip"),
            ArtifactSource::LocalFile(_)
        ));
    }

    #[test]
    fn file_names_derive_from_each_shape() {
        assert_eq!(
            ArtifactSource::parse("https://repo.example.com/dist/app-1.2.0.zip").file_name(),
            "app-1.2.0.zip"
        );
        assert_eq!(
            ArtifactSource::parse("com.example:app:1.2.0").file_name(),
            "app-1.2.0"
        );
        assert_eq!(
            ArtifactSource::parse("build/app.zip").file_name(),
            "app.zip"
        );
    }

    #[tokio::test]
    async fn local_resolver_requires_the_file_to_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("app.zip");
        let missing = LocalArtifactResolver
            .resolve(&ArtifactSource::LocalFile(path.clone()))
            .await;
        assert!(matches!(missing, Err(StewardError::Validation(_))));

        std::fs::File::create(&path)
            .and_then(|mut file| file.write_all(b"payload"))
            .expect("write artifact");
        let resolved = LocalArtifactResolver
            .resolve(&ArtifactSource::LocalFile(path.clone()))
            .await
            .expect("resolves");
        assert_eq!(resolved, path);
    }

    #[tokio::test]
    async fn checksums_depend_only_on_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("a.zip");
        let second = dir.path().join("b.zip");
        std::fs::write(&first, b"same bytes").expect("write");
        std::fs::write(&second, b"same bytes").expect("write");
        let third = dir.path().join("c.zip");
        std::fs::write(&third, b"other bytes").expect("write");

        let first_sum = checksum(&first).await.expect("digest");
        assert_eq!(first_sum, checksum(&second).await.expect("digest"));
        assert_ne!(first_sum, checksum(&third).await.expect("digest"));
        // 16 digest bytes encode to 22 unpadded base64 characters.
        assert_eq!(first_sum.len(), 22);
        assert!(!first_sum.contains(['+', '/', '=']));
    }
}
