use std::{
    collections::BTreeSet,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use classmate_api::{Comment, Event, RecordId, Thread};
use serde::{de::DeserializeOwned, Serialize};
use tokio::{io::AsyncWriteExt, sync::RwLock};

use crate::Error;

pub const THREADS_FILE: &str = "threads.json";
pub const EVENTS_FILE: &str = "events.json";

pub trait Record {
    fn id(&self) -> &RecordId;
}

impl Record for Event {
    fn id(&self) -> &RecordId {
        &self.id
    }
}

impl Record for Thread {
    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// An ordered list of records, mirrored to its backing file
#[derive(Debug)]
struct Collection<T> {
    path: PathBuf,
    items: Vec<T>,
}

impl<T> Collection<T>
where
    T: Record + Serialize + DeserializeOwned,
{
    async fn load(path: PathBuf) -> anyhow::Result<Collection<T>> {
        match tokio::fs::read(&path).await {
            Ok(data) => {
                let items = serde_json::from_slice(&data)
                    .with_context(|| format!("parsing collection file {path:?}"))?;
                Ok(Collection { path, items })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(?path, "no collection file, creating an empty one");
                let collection = Collection {
                    path,
                    items: Vec::new(),
                };
                collection.persist().await?;
                Ok(collection)
            }
            Err(e) => Err(e).with_context(|| format!("reading collection file {path:?}")),
        }
    }

    /// Rewrite the whole backing file, through a synced temporary file renamed into place
    async fn persist(&self) -> anyhow::Result<()> {
        let data = serde_json::to_vec(&self.items)
            .with_context(|| format!("serializing collection for {:?}", self.path))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .with_context(|| format!("creating temporary file {tmp:?}"))?;
        file.write_all(&data)
            .await
            .with_context(|| format!("writing temporary file {tmp:?}"))?;
        file.sync_all()
            .await
            .with_context(|| format!("syncing temporary file {tmp:?}"))?;
        drop(file);
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            if let Err(err) = tokio::fs::remove_file(&tmp).await {
                tracing::warn!(?err, ?tmp, "failed removing temporary file");
            }
            return Err(e).with_context(|| format!("renaming {tmp:?} into {:?}", self.path));
        }
        Ok(())
    }

    fn find(&self, id: &RecordId) -> Option<&T> {
        self.items.iter().find(|r| r.id() == id)
    }

    fn find_mut(&mut self, id: &RecordId) -> Option<&mut T> {
        self.items.iter_mut().find(|r| r.id() == id)
    }

    /// Push `record` and persist. On failure the push is undone, so memory keeps matching disk.
    async fn append_and_persist(&mut self, record: T) -> anyhow::Result<()> {
        self.items.push(record);
        if let Err(e) = self.persist().await {
            self.items.pop();
            return Err(e);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Collections {
    events: Collection<Event>,
    threads: Collection<Thread>,
}

/// Handle to the two collections. Cloning it shares the same underlying data.
///
/// Writers keep the lock across the file write, so the order of snapshots on
/// disk is always the order of appends in memory.
#[derive(Clone, Debug)]
pub struct Store(Arc<RwLock<Collections>>);

impl Store {
    pub async fn load(data_dir: &Path) -> anyhow::Result<Store> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("creating data directory {data_dir:?}"))?;
        let events = Collection::load(data_dir.join(EVENTS_FILE))
            .await
            .context("loading events")?;
        let threads = Collection::load(data_dir.join(THREADS_FILE))
            .await
            .context("loading threads")?;
        tracing::info!(
            events = events.items.len(),
            threads = threads.items.len(),
            "loaded collections from {data_dir:?}"
        );
        Ok(Store(Arc::new(RwLock::new(Collections { events, threads }))))
    }

    pub async fn events(&self) -> Vec<Event> {
        self.0.read().await.events.items.clone()
    }

    pub async fn event(&self, id: &RecordId) -> Option<Event> {
        self.0.read().await.events.find(id).cloned()
    }

    pub async fn threads(&self) -> Vec<Thread> {
        self.0.read().await.threads.items.clone()
    }

    pub async fn thread(&self, id: &RecordId) -> Option<Thread> {
        self.0.read().await.threads.find(id).cloned()
    }

    /// Every category used by some thread, deduplicated and sorted
    pub async fn categories(&self) -> Vec<String> {
        self.0
            .read()
            .await
            .threads
            .items
            .iter()
            .map(|t| t.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub async fn add_event(&self, event: Event) -> anyhow::Result<()> {
        self.0
            .write()
            .await
            .events
            .append_and_persist(event)
            .await
            .context("saving events")
    }

    pub async fn add_thread(&self, thread: Thread) -> anyhow::Result<()> {
        self.0
            .write()
            .await
            .threads
            .append_and_persist(thread)
            .await
            .context("saving threads")
    }

    pub async fn add_comment(&self, thread: &RecordId, comment: Comment) -> Result<(), Error> {
        let mut collections = self.0.write().await;
        let threads = &mut collections.threads;
        threads
            .find_mut(thread)
            .ok_or_else(|| Error::unknown_thread(thread.clone()))?
            .comments
            .push(comment);
        if let Err(e) = threads.persist().await {
            if let Some(t) = threads.find_mut(thread) {
                t.comments.pop();
            }
            return Err(Error::Anyhow(e.context("saving threads")));
        }
        Ok(())
    }
}
