//! Background writer for owner documents.
//!
//! Snapshots are queued from the caller's thread and written by a single
//! worker thread. Several snapshots for the same owner queued before the
//! worker gets to them collapse into the newest one.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::core::types::{OwnerId, Result};
use crate::storage::ShapePersistence;
use crate::storage::schema::OwnerDocument;
use crate::storage::store::ShapeStore;

enum FlushMessage {
    Write(OwnerId, OwnerDocument),
    /// Reply once everything queued before it is on disk
    Sync(Sender<()>),
    Shutdown,
}

/// Handle to the flush thread. Dropping it drains the queue and joins.
pub struct FlushWorker {
    store: ShapeStore,
    tx: Sender<FlushMessage>,
    handle: Option<JoinHandle<()>>,
}

impl FlushWorker {
    pub fn spawn(store: ShapeStore) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let worker_store = store.clone();
        let handle = thread::Builder::new()
            .name("shape-flush".into())
            .spawn(move || run(worker_store, rx))?;
        Ok(Self { store, tx, handle: Some(handle) })
    }

    pub fn store(&self) -> &ShapeStore {
        &self.store
    }
}

fn write_pending(store: &ShapeStore, pending: &mut HashMap<OwnerId, OwnerDocument>) {
    for (owner, doc) in pending.drain() {
        if let Err(e) = store.save(owner, &doc) {
            log::error!("Failed to save shapes for {owner}: {e}");
        }
    }
}

fn run(store: ShapeStore, rx: Receiver<FlushMessage>) {
    let mut pending: HashMap<OwnerId, OwnerDocument> = HashMap::new();
    let mut waiters: Vec<Sender<()>> = Vec::new();

    while let Ok(first) = rx.recv() {
        let mut shutdown = false;
        // Take everything already queued so repeated writes coalesce
        for msg in std::iter::once(first).chain(rx.try_iter()) {
            match msg {
                FlushMessage::Write(owner, doc) => {
                    pending.insert(owner, doc);
                }
                FlushMessage::Sync(reply) => waiters.push(reply),
                FlushMessage::Shutdown => shutdown = true,
            }
        }

        write_pending(&store, &mut pending);
        for reply in waiters.drain(..) {
            let _ = reply.send(());
        }
        if shutdown {
            break;
        }
    }
    log::debug!("Shape flush thread stopped");
}

impl ShapePersistence for FlushWorker {
    fn load(&self, owner: OwnerId) -> Result<OwnerDocument> {
        // Reads must observe writes still in the queue
        self.sync();
        self.store.load(owner)
    }

    fn flush(&self, owner: OwnerId, doc: OwnerDocument) {
        if self.tx.send(FlushMessage::Write(owner, doc)).is_err() {
            log::error!("Flush thread gone; shapes for {owner} not saved");
        }
    }

    fn sync(&self) {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.tx.send(FlushMessage::Sync(reply_tx)).is_ok() {
            let _ = reply_rx.recv();
        }
    }
}

impl Drop for FlushWorker {
    fn drop(&mut self) {
        let _ = self.tx.send(FlushMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Shape flush thread panicked");
            }
        }
    }
}
