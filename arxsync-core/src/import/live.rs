//! Keeps the archive in step with the roots after the initial drain.
//!
//! Creations and content changes are re-dispatched through the same engine as
//! the drain, with [`ErrorPolicy::Report`]. Removals are observed and logged
//! but never delete archive entries: the archive only grows.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::ImportError;
use crate::import::dispatch::{Engine, ErrorPolicy};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LiveAction {
    Import(PathBuf),
    /// Source deletion; intentionally leaves the archive untouched.
    IgnoreRemoval(Vec<PathBuf>),
    Ignore,
}

pub(crate) fn classify(event: &Event) -> LiveAction {
    match &event.kind {
        EventKind::Create(_) => match event.paths.last() {
            Some(p) => LiveAction::Import(p.clone()),
            None => LiveAction::Ignore,
        },
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            LiveAction::IgnoreRemoval(event.paths.clone())
        }
        EventKind::Modify(
            ModifyKind::Data(_)
            | ModifyKind::Any
            | ModifyKind::Other
            | ModifyKind::Name(RenameMode::To | RenameMode::Both | RenameMode::Any),
        ) => match event.paths.last() {
            // for Both, paths are [from, to]
            Some(p) => LiveAction::Import(p.clone()),
            None => LiveAction::Ignore,
        },
        EventKind::Remove(_) => LiveAction::IgnoreRemoval(event.paths.clone()),
        _ => LiveAction::Ignore,
    }
}

/// Owns the notify subscription and the worker that drains it.
/// Dropping it unsubscribes and joins the worker.
pub struct LiveWatcher {
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
}

impl LiveWatcher {
    pub(crate) fn spawn(engine: Arc<Engine>, roots: &[PathBuf]) -> Result<Self, ImportError> {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // receiver gone means we are shutting down
            let _ = tx.send(res);
        })?;

        for root in roots {
            let mode = if root.is_dir() {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            watcher.watch(root, mode)?;
            tracing::debug!(root = %root.display(), ?mode, "watching");
        }

        let worker = thread::Builder::new()
            .name("arxsync-live".into())
            .spawn(move || {
                for res in rx {
                    match res {
                        Ok(event) => handle(&engine, &event),
                        Err(e) => engine.reporter.error(ImportError::Watch(e)),
                    }
                }
                tracing::debug!("live worker stopped");
            })
            .map_err(ImportError::Spawn)?;

        Ok(Self {
            watcher: Some(watcher),
            worker: Some(worker),
        })
    }
}

fn handle(engine: &Engine, event: &Event) {
    match classify(event) {
        LiveAction::Import(path) => {
            tracing::debug!(path = %path.display(), kind = ?event.kind, "live change");
            if let Err(err) = engine.dispatch(&engine.source_for(path), ErrorPolicy::Report) {
                engine.reporter.error(err);
            }
        }
        LiveAction::IgnoreRemoval(paths) => {
            for p in &paths {
                tracing::debug!(path = %p.display(), "source removed; archive entry kept");
            }
        }
        LiveAction::Ignore => {}
    }
}

impl Drop for LiveWatcher {
    fn drop(&mut self) {
        // dropping the watcher drops the sender, which ends the worker loop
        drop(self.watcher.take());
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                tracing::error!("live worker panicked");
            }
        }
    }
}
