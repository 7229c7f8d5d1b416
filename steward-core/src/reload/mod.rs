//! File-watch driven configuration reloads with health verification.
//!
//! One watcher per managed process feeds an unbounded change queue. The
//! reload loop blocks for the first event of a burst, drains everything
//! already queued into a single batch, reloads each affected process once,
//! and signals the verify loop. Verification runs on its own queue so a
//! slow health round never blocks the intake of new changes.

mod watcher;

use std::any::type_name_of_val;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use steward_model::{FileEvent, HealthCheck, Instance};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ReloadConfig;
use crate::error::{Result, StewardError};
use crate::health::HealthChecker;
use crate::sync::ProcessController;

/// One managed process and the directories whose changes it must reload.
#[derive(Debug, Clone)]
pub struct WatchedProcess {
    pub name: String,
    pub instance: Instance,
    pub dirs: Vec<PathBuf>,
}

/// Everything a reloader run watches and verifies.
#[derive(Debug, Clone, Default)]
pub struct WatchSpec {
    pub processes: Vec<WatchedProcess>,
    /// Endpoints probed after each reload batch.
    pub health_checks: Vec<HealthCheck>,
}

#[derive(Debug)]
struct ChangeMessage {
    process: String,
    event: FileEvent,
}

/// Watches configured directories and reloads the owning processes on
/// change.
pub struct Reloader {
    controller: Arc<dyn ProcessController>,
    health: Arc<HealthChecker>,
    config: ReloadConfig,
}

impl Reloader {
    pub fn new(
        controller: Arc<dyn ProcessController>,
        health: Arc<HealthChecker>,
        config: ReloadConfig,
    ) -> Self {
        Self {
            controller,
            health,
            config,
        }
    }

    /// Starts watching the given processes and returns the handle that
    /// keeps the watchers and both processing loops alive.
    pub fn start(&self, spec: WatchSpec) -> Result<ReloaderHandle> {
        validate(&spec)?;

        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let (verify_tx, verify_rx) = mpsc::unbounded_channel();

        let watchers = init_watchers(&spec, &change_tx)?;
        let instances: BTreeMap<String, Instance> = spec
            .processes
            .iter()
            .map(|process| (process.name.clone(), process.instance.clone()))
            .collect();

        let reload_task = tokio::spawn(reload_loop(
            Arc::clone(&self.controller),
            instances,
            change_rx,
            verify_tx,
            self.config.verify,
        ));
        let verify_task = tokio::spawn(verify_loop(
            Arc::clone(&self.health),
            spec.health_checks,
            verify_rx,
        ));

        info!(watchers = watchers.len(), "Reloader started");
        Ok(ReloaderHandle {
            watchers,
            reload_task,
            verify_task,
        })
    }
}

impl fmt::Debug for Reloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reloader")
            .field("controller", &type_name_of_val(self.controller.as_ref()))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Keeps a started reloader running; dropping or stopping it ends watching.
pub struct ReloaderHandle {
    watchers: Vec<RecommendedWatcher>,
    reload_task: JoinHandle<()>,
    verify_task: JoinHandle<()>,
}

impl ReloaderHandle {
    /// Active watchers, one per managed process.
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Stops watching and shuts both processing loops down.
    pub fn stop(self) {
        // Dropping the watchers ends the notification streams.
        drop(self.watchers);
        self.reload_task.abort();
        self.verify_task.abort();
        info!("Reloader stopped");
    }
}

impl fmt::Debug for ReloaderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloaderHandle")
            .field("watchers", &self.watchers.len())
            .finish_non_exhaustive()
    }
}

fn validate(spec: &WatchSpec) -> Result<()> {
    for process in &spec.processes {
        if process.name.trim().is_empty() {
            return Err(StewardError::Validation(
                "watched process name must not be blank".to_string(),
            ));
        }
        if process.dirs.is_empty() {
            return Err(StewardError::Validation(format!(
                "process '{}' watches no directories",
                process.name
            )));
        }
    }
    Ok(())
}

fn init_watchers(
    spec: &WatchSpec,
    change_tx: &mpsc::UnboundedSender<ChangeMessage>,
) -> Result<Vec<RecommendedWatcher>> {
    let mut watchers = Vec::with_capacity(spec.processes.len());
    for process in &spec.processes {
        let name = process.name.clone();
        let tx = change_tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |outcome: std::result::Result<notify::Event, notify::Error>| match outcome {
                Ok(event) => {
                    for event in watcher::convert(&event) {
                        let message = ChangeMessage {
                            process: name.clone(),
                            event,
                        };
                        if tx.send(message).is_err() {
                            return;
                        }
                    }
                }
                Err(error) => warn!(process = %name, error = %error, "Watch error"),
            },
            notify::Config::default(),
        )
        .map_err(|error| StewardError::Internal(format!("failed to create watcher: {error}")))?;
        for dir in &process.dirs {
            watcher.watch(dir, RecursiveMode::Recursive).map_err(|error| {
                StewardError::Internal(format!("failed to watch {}: {error}", dir.display()))
            })?;
            info!(process = %process.name, dir = %dir.display(), "Watching directory");
        }
        watchers.push(watcher);
    }
    Ok(watchers)
}

/// Consumes change events in coalesced batches and reloads each affected
/// process once per batch. A failed reload is logged and does not keep the
/// remaining processes of the batch from reloading.
async fn reload_loop(
    controller: Arc<dyn ProcessController>,
    instances: BTreeMap<String, Instance>,
    mut changes: mpsc::UnboundedReceiver<ChangeMessage>,
    verify_tx: mpsc::UnboundedSender<Uuid>,
    verify: bool,
) {
    while let Some(first) = changes.recv().await {
        let mut batch = vec![first];
        while let Ok(message) = changes.try_recv() {
            batch.push(message);
        }
        let batch_id = Uuid::now_v7();
        info!(batch = %batch_id, events = batch.len(), "Processing change batch");

        let mut by_process: BTreeMap<String, Vec<FileEvent>> = BTreeMap::new();
        for message in batch {
            by_process.entry(message.process).or_default().push(message.event);
        }
        for (process, events) in by_process {
            let Some(instance) = instances.get(&process) else {
                warn!(process = %process, "Change events for an unknown process");
                continue;
            };
            debug!(
                process = %process,
                events = events.len(),
                "Reloading process after file changes"
            );
            if let Err(error) = controller.reload(instance).await {
                warn!(
                    process = %process,
                    error = %error,
                    "Reload failed, continuing with the rest of the batch"
                );
            }
        }
        if verify && verify_tx.send(batch_id).is_err() {
            return;
        }
    }
}

/// Consumes verify signals, coalescing to the newest one, and reports the
/// environment's health after reloads.
async fn verify_loop(
    health: Arc<HealthChecker>,
    checks: Vec<HealthCheck>,
    mut signals: mpsc::UnboundedReceiver<Uuid>,
) {
    while let Some(mut batch_id) = signals.recv().await {
        // Later signals supersede earlier ones; one verification covers all.
        while let Ok(newer) = signals.try_recv() {
            batch_id = newer;
        }
        let unavailable = health.find_unavailable(&checks).await;
        if unavailable.is_empty() {
            info!(batch = %batch_id, "Environment stable after reload");
        } else {
            let endpoints = unavailable
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            warn!(
                batch = %batch_id,
                unhealthy = %endpoints,
                "Environment unstable after reload"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use dashmap::DashSet;
    use steward_model::{ChangeKind, ProcessStatus};

    use crate::check::testing::instance;
    use crate::config::HealthConfig;
    use crate::health::{ProbeOutcome, ServiceProber};

    use super::*;

    #[derive(Default)]
    struct CountingController {
        reloads: Mutex<Vec<String>>,
        failing: DashSet<String>,
    }

    impl CountingController {
        fn reloads(&self) -> Vec<String> {
            self.reloads.lock().expect("controller lock").clone()
        }
    }

    #[async_trait]
    impl ProcessController for CountingController {
        async fn status(&self, _instance: &Instance) -> ProcessStatus {
            ProcessStatus::Running
        }

        async fn reload(&self, instance: &Instance) -> Result<()> {
            let name = instance.full_name();
            self.reloads.lock().expect("controller lock").push(name.clone());
            if self.failing.contains(&name) {
                Err(StewardError::Internal("reload script failed".to_string()))
            } else {
                Ok(())
            }
        }

        async fn restart(&self, _instance: &Instance) -> Result<()> {
            Ok(())
        }
    }

    struct CountingProber {
        probes: AtomicU32,
    }

    #[async_trait]
    impl ServiceProber for CountingProber {
        async fn probe(&self, _check: &HealthCheck) -> ProbeOutcome {
            self.probes.fetch_add(1, Ordering::SeqCst);
            ProbeOutcome::Healthy
        }
    }

    fn change(process: &str, path: &str) -> ChangeMessage {
        ChangeMessage {
            process: process.to_string(),
            event: FileEvent::new(path, ChangeKind::Modified),
        }
    }

    fn fleet() -> BTreeMap<String, Instance> {
        BTreeMap::from([
            ("author".to_string(), instance("author")),
            ("publish".to_string(), instance("publish")),
        ])
    }

    #[tokio::test]
    async fn a_burst_of_changes_causes_one_reload() {
        let controller = Arc::new(CountingController::default());
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let (verify_tx, mut verify_rx) = mpsc::unbounded_channel();
        for index in 0..5 {
            change_tx
                .send(change("author", &format!("/etc/steward/conf-{index}.cfg")))
                .expect("queue open");
        }
        drop(change_tx);

        reload_loop(
            Arc::clone(&controller) as Arc<dyn ProcessController>,
            fleet(),
            change_rx,
            verify_tx,
            true,
        )
        .await;

        assert_eq!(controller.reloads(), vec!["local-author".to_string()]);
        assert!(verify_rx.recv().await.is_some());
        assert!(verify_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn batches_reload_each_owning_process_once() {
        let controller = Arc::new(CountingController::default());
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let (verify_tx, _verify_rx) = mpsc::unbounded_channel();
        change_tx.send(change("author", "/etc/a1.cfg")).expect("queue open");
        change_tx.send(change("publish", "/etc/p1.cfg")).expect("queue open");
        change_tx.send(change("author", "/etc/a2.cfg")).expect("queue open");
        change_tx.send(change("publish", "/etc/p2.cfg")).expect("queue open");
        drop(change_tx);

        reload_loop(
            Arc::clone(&controller) as Arc<dyn ProcessController>,
            fleet(),
            change_rx,
            verify_tx,
            false,
        )
        .await;

        assert_eq!(
            controller.reloads(),
            vec!["local-author".to_string(), "local-publish".to_string()]
        );
    }

    #[tokio::test]
    async fn a_failing_reload_leaves_siblings_running() {
        let controller = Arc::new(CountingController::default());
        controller.failing.insert("local-author".to_string());
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let (verify_tx, mut verify_rx) = mpsc::unbounded_channel();
        change_tx.send(change("author", "/etc/a.cfg")).expect("queue open");
        change_tx.send(change("publish", "/etc/p.cfg")).expect("queue open");
        drop(change_tx);

        reload_loop(
            Arc::clone(&controller) as Arc<dyn ProcessController>,
            fleet(),
            change_rx,
            verify_tx,
            true,
        )
        .await;

        // Both reloads were attempted and the batch still got verified.
        assert_eq!(
            controller.reloads(),
            vec!["local-author".to_string(), "local-publish".to_string()]
        );
        assert!(verify_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn queued_verify_signals_coalesce_into_one_round() {
        let prober = Arc::new(CountingProber {
            probes: AtomicU32::new(0),
        });
        let health = Arc::new(HealthChecker::new(
            Arc::clone(&prober) as Arc<dyn ServiceProber>,
            HealthConfig::default(),
        ));
        let (verify_tx, verify_rx) = mpsc::unbounded_channel();
        for _ in 0..3 {
            verify_tx.send(Uuid::now_v7()).expect("queue open");
        }
        drop(verify_tx);

        let login = url::Url::parse("http://localhost:4502/login.html").expect("static url");
        verify_loop(health, vec![HealthCheck::new(login)], verify_rx).await;

        assert_eq!(prober.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_registers_one_watcher_per_process() {
        let author_dir = tempfile::tempdir().expect("tempdir");
        let publish_dir = tempfile::tempdir().expect("tempdir");
        let reloader = Reloader::new(
            Arc::new(CountingController::default()),
            Arc::new(HealthChecker::http(HealthConfig::default()).expect("client")),
            ReloadConfig::default(),
        );

        let spec = WatchSpec {
            processes: vec![
                WatchedProcess {
                    name: "author".to_string(),
                    instance: instance("author"),
                    dirs: vec![author_dir.path().to_path_buf()],
                },
                WatchedProcess {
                    name: "publish".to_string(),
                    instance: instance("publish"),
                    dirs: vec![publish_dir.path().to_path_buf()],
                },
            ],
            health_checks: Vec::new(),
        };
        let handle = reloader.start(spec).expect("starts");
        assert_eq!(handle.watcher_count(), 2);
        handle.stop();
    }

    #[tokio::test]
    async fn specs_are_validated_before_any_watcher_exists() {
        let reloader = Reloader::new(
            Arc::new(CountingController::default()),
            Arc::new(HealthChecker::http(HealthConfig::default()).expect("client")),
            ReloadConfig::default(),
        );

        let blank = WatchSpec {
            processes: vec![WatchedProcess {
                name: "  ".to_string(),
                instance: instance("author"),
                dirs: vec![PathBuf::from("/etc/steward")],
            }],
            health_checks: Vec::new(),
        };
        assert!(matches!(
            reloader.start(blank),
            Err(StewardError::Validation(_))
        ));

        let dirless = WatchSpec {
            processes: vec![WatchedProcess {
                name: "author".to_string(),
                instance: instance("author"),
                dirs: Vec::new(),
            }],
            health_checks: Vec::new(),
        };
        assert!(matches!(
            reloader.start(dirless),
            Err(StewardError::Validation(_))
        ));
    }
}
