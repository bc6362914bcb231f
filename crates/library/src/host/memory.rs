//! In-memory content host for testing.

use super::{ChangeEvent, ContentHost, ListingItem, PackInfo};
use crate::error::{ErrorKind, Result};
use async_stream::stream;
use async_trait::async_trait;
use bestiary_extract::Document;
use futures::Stream;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{Semaphore, mpsc};

struct MemoryPack {
    info: PackInfo,
    documents: Vec<Value>,
}

/// In-memory content host for testing.
///
/// Packs and documents are plain JSON held in memory. Listing and document
/// loads are counted, individual packs can be made to fail, and document
/// loads can be held behind a gate so a test can observe a build while it's
/// in flight.
pub struct MemoryHost {
    system: RwLock<String>,
    packs: RwLock<Vec<MemoryPack>>,
    auto_invalidate: AtomicBool,
    failing_listings: Mutex<HashSet<String>>,
    failing_documents: Mutex<HashSet<String>>,
    fail_catalogue: AtomicBool,
    gate: Mutex<Option<Arc<Semaphore>>>,
    listing_loads: AtomicUsize,
    document_loads: AtomicUsize,
    events: Mutex<Option<mpsc::UnboundedSender<ChangeEvent>>>,
}

impl MemoryHost {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: RwLock::new(system.into()),
            packs: RwLock::new(Vec::new()),
            auto_invalidate: AtomicBool::new(true),
            failing_listings: Mutex::new(HashSet::new()),
            failing_documents: Mutex::new(HashSet::new()),
            fail_catalogue: AtomicBool::new(false),
            gate: Mutex::new(None),
            listing_loads: AtomicUsize::new(0),
            document_loads: AtomicUsize::new(0),
            events: Mutex::new(None),
        }
    }

    pub fn with_pack(self, info: PackInfo, documents: Vec<Value>) -> Self {
        self.add_pack(info, documents);
        self
    }

    /// Add a pack, replacing any pack with the same id.
    pub fn add_pack(&self, info: PackInfo, documents: Vec<Value>) {
        let mut packs = self.packs.write().unwrap_or_else(PoisonError::into_inner);
        packs.retain(|pack| pack.info.id != info.id);
        packs.push(MemoryPack { info, documents });
    }

    pub fn remove_pack(&self, pack_id: &str) {
        self.packs.write().unwrap_or_else(PoisonError::into_inner).retain(|pack| pack.info.id != pack_id);
    }

    /// Append a document to an existing pack.
    pub fn push_document(&self, pack_id: &str, document: Value) {
        let mut packs = self.packs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(pack) = packs.iter_mut().find(|pack| pack.info.id == pack_id) {
            pack.documents.push(document);
        }
    }

    pub fn set_system(&self, system: impl Into<String>) {
        *self.system.write().unwrap_or_else(PoisonError::into_inner) = system.into();
    }

    pub fn set_auto_invalidate(&self, enabled: bool) {
        self.auto_invalidate.store(enabled, Ordering::SeqCst);
    }

    /// Make `listing` fail for one pack.
    pub fn fail_listing(&self, pack_id: &str) {
        self.failing_listings.lock().unwrap_or_else(PoisonError::into_inner).insert(pack_id.to_string());
    }

    pub fn recover_listing(&self, pack_id: &str) {
        self.failing_listings.lock().unwrap_or_else(PoisonError::into_inner).remove(pack_id);
    }

    /// Make `documents` fail for one pack.
    pub fn fail_documents(&self, pack_id: &str) {
        self.failing_documents.lock().unwrap_or_else(PoisonError::into_inner).insert(pack_id.to_string());
    }

    /// Make `packs` fail.
    pub fn fail_catalogue(&self, fail: bool) {
        self.fail_catalogue.store(fail, Ordering::SeqCst);
    }

    /// Hold every `documents` call until the returned semaphore gets a
    /// permit.
    pub fn gate_documents(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(gate.clone());
        gate
    }

    pub fn listing_loads(&self) -> usize {
        self.listing_loads.load(Ordering::SeqCst)
    }

    pub fn document_loads(&self) -> usize {
        self.document_loads.load(Ordering::SeqCst)
    }

    /// Change notifications sent with [`emit`](Self::emit). Replaces any
    /// earlier subscriber.
    pub fn events(&self) -> impl Stream<Item = ChangeEvent> + use<> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        stream! {
            while let Some(event) = rx.recv().await {
                yield event;
            }
        }
    }

    /// Send a change notification. Dropping the host ends the stream.
    pub fn emit(&self, event: ChangeEvent) {
        if let Some(tx) = self.events.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Stop sending change notifications; ends the event stream.
    pub fn close_events(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    fn with_pack_ref<T>(&self, pack_id: &str, f: impl FnOnce(&MemoryPack) -> T) -> Result<T> {
        let packs = self.packs.read().unwrap_or_else(PoisonError::into_inner);
        match packs.iter().find(|pack| pack.info.id == pack_id) {
            Some(pack) => Ok(f(pack)),
            None => exn::bail!(ErrorKind::Host(format!("unknown pack '{pack_id}'"))),
        }
    }

    fn is_failing(set: &Mutex<HashSet<String>>, pack_id: &str) -> bool {
        set.lock().unwrap_or_else(PoisonError::into_inner).contains(pack_id)
    }
}

#[async_trait]
impl ContentHost for MemoryHost {
    fn active_system(&self) -> String {
        self.system.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn auto_invalidate(&self) -> bool {
        self.auto_invalidate.load(Ordering::SeqCst)
    }

    async fn packs(&self) -> Result<Vec<PackInfo>> {
        if self.fail_catalogue.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Host("pack catalogue unavailable".to_string()));
        }
        Ok(self.packs.read().unwrap_or_else(PoisonError::into_inner).iter().map(|pack| pack.info.clone()).collect())
    }

    async fn listing(&self, pack_id: &str) -> Result<Vec<ListingItem>> {
        self.listing_loads.fetch_add(1, Ordering::SeqCst);
        if Self::is_failing(&self.failing_listings, pack_id) {
            exn::bail!(ErrorKind::Host(format!("listing unavailable for '{pack_id}'")));
        }
        self.with_pack_ref(pack_id, |pack| {
            pack.documents
                .iter()
                .map(|raw| {
                    let field = |key: &str| raw.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
                    ListingItem { id: field("_id"), name: field("name"), document_type: field("type") }
                })
                .collect()
        })
    }

    async fn documents(&self, pack_id: &str) -> Result<Vec<Document>> {
        self.document_loads.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| exn::Exn::from(ErrorKind::Host("document gate closed".to_string())))?;
        }
        if Self::is_failing(&self.failing_documents, pack_id) {
            exn::bail!(ErrorKind::Host(format!("documents unavailable for '{pack_id}'")));
        }
        self.with_pack_ref(pack_id, |pack| pack.documents.iter().cloned().map(Document::new).collect())
    }
}
