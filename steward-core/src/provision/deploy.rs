//! Ready-made step for deploying an artifact across the fleet.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::cache::InvocationCache;
use crate::sync::{ArtifactInstaller, ArtifactResolver, ArtifactSource};

use super::action::ActionEffect;
use super::step::Step;

static VERSION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_]v?\d[\w.-]*$").expect("version suffix regex should compile"));

/// Builds a step that installs the artifact behind `notation` on every
/// bound instance.
///
/// The step id comes from the artifact name with its version suffix
/// stripped, so `dist/app-1.4.0.zip` and `dist/app-1.5.0.zip` address the
/// same marker. The version is the full artifact name, which makes the
/// step perform again whenever the artifact version changes. Resolution
/// runs once per provisioning pass through the invocation cache; each
/// instance then installs the same resolved file.
pub fn deploy_artifact(
    notation: &str,
    cache: Arc<InvocationCache>,
    resolver: Arc<dyn ArtifactResolver>,
    installer: Arc<dyn ArtifactInstaller>,
) -> Step {
    let source = ArtifactSource::parse(notation);
    let version = source.file_name();
    let init_cache = Arc::clone(&cache);
    let init_resolver = Arc::clone(&resolver);
    let init_source = source.clone();
    let action_source = source.clone();

    Step::named(artifact_step_id(&source))
        .description(format!("deploy {source}"))
        .version(version)
        .init(move || {
            let cache = Arc::clone(&init_cache);
            let resolver = Arc::clone(&init_resolver);
            let source = init_source.clone();
            async move {
                let file = cache
                    .get_or_try_init(&artifact_cache_key(&source), || async {
                        info!(artifact = %source, "Resolving artifact");
                        resolver.resolve(&source).await
                    })
                    .await?;
                debug!(artifact = %source, file = %file.display(), "Artifact resolved");
                Ok(())
            }
        })
        .action(move |instance| {
            let cache = Arc::clone(&cache);
            let resolver = Arc::clone(&resolver);
            let installer = Arc::clone(&installer);
            let source = action_source.clone();
            async move {
                let file = cache
                    .get_or_try_init(&artifact_cache_key(&source), || async {
                        resolver.resolve(&source).await
                    })
                    .await?;
                let changed = installer.install(&instance, &file).await?;
                Ok(if changed {
                    ActionEffect::Changed
                } else {
                    ActionEffect::Unchanged
                })
            }
        })
        .build()
}

fn artifact_cache_key(source: &ArtifactSource) -> String {
    format!("artifact:{source}")
}

fn artifact_step_id(source: &ArtifactSource) -> String {
    let file_name = source.file_name();
    let stem = Path::new(&file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or(file_name);
    let base = VERSION_SUFFIX.replace(&stem, "");
    if base.is_empty() {
        format!("deploy-{stem}")
    } else {
        format!("deploy-{base}")
    }
}
