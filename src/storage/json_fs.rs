// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-file document store.
//!
//! Each collection is a directory and each document a pretty-printed JSON
//! file named `{sequence}-{id}.json` (see [`StoragePaths`]). Writes go to a
//! temp file first and are renamed into place, so a document is either
//! fully present or absent even if the process dies mid-write.
//!
//! Mutations are serialized through a single lock that also owns the
//! insertion sequence. Reads take no lock.
//!
//! Every operation runs on tokio's blocking pool, so file I/O never stalls a
//! runtime worker and a caller-side timeout can elapse while the disk is
//! slow. An operation abandoned by its caller still runs to completion.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::document::{
    apply_changes, ensure_id, Document, DocumentStore, Filter, FindQuery, StorageError,
    StorageResult, UpdateOutcome,
};
use super::StoragePaths;

#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    paths: StoragePaths,
    /// Last insertion sequence handed out.
    sequence: Mutex<u64>,
}

impl FileDocumentStore {
    /// Open (creating if needed) a store rooted at `paths.root()`.
    ///
    /// Scans existing collections so new documents continue the insertion
    /// sequence after a restart.
    pub fn open(paths: StoragePaths) -> StorageResult<Self> {
        fs::create_dir_all(paths.root())?;

        let mut last = 0;
        for entry in fs::read_dir(paths.root())? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            for (name, _) in list_document_files(&entry.path())? {
                if let Some(sequence) = StoragePaths::sequence_of(&name) {
                    last = last.max(sequence);
                }
            }
        }

        tracing::info!(
            root = %paths.root().display(),
            last_sequence = last,
            "Opened JSON document store"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                paths,
                sequence: Mutex::new(last),
            }),
        })
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.shared.paths
    }

    /// Run `task` on the blocking pool.
    async fn blocking<T, F>(&self, task: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Shared) -> StorageResult<T> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || task(&shared))
            .await
            .map_err(|e| StorageError::Unavailable(format!("document store task failed: {e}")))?
    }
}

impl Shared {
    fn lock(&self) -> StorageResult<MutexGuard<'_, u64>> {
        self.sequence
            .lock()
            .map_err(|_| StorageError::Unavailable("document store lock poisoned".to_string()))
    }

    /// All documents of a collection in insertion order, with their paths.
    fn load_collection(&self, collection: &str) -> StorageResult<Vec<(PathBuf, Document)>> {
        let dir = self.paths.collection_dir(collection);
        let mut documents = Vec::new();
        for (_, path) in list_document_files(&dir)? {
            let document = read_document(collection, &path)?;
            documents.push((path, document));
        }
        Ok(documents)
    }

    fn find_first(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> StorageResult<Option<(PathBuf, Document)>> {
        Ok(self
            .load_collection(collection)?
            .into_iter()
            .find(|(_, document)| filter.matches(document)))
    }

    fn insert_one(&self, collection: &str, mut document: Document) -> StorageResult<String> {
        let id = ensure_id(&mut document);
        if !is_safe_id(&id) {
            return Err(StorageError::invalid_document(
                collection,
                format!("identifier `{id}` is not usable as a file name"),
            ));
        }

        let mut sequence = self.lock()?;
        let next = *sequence + 1;
        write_atomic(&self.paths.document(collection, next, &id), &document)?;
        *sequence = next;

        Ok(id)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        changes: Document,
    ) -> StorageResult<UpdateOutcome> {
        let _guard = self.lock()?;
        let Some((path, mut document)) = self.find_first(collection, filter)? else {
            return Ok(UpdateOutcome { matched: false });
        };

        apply_changes(&mut document, changes);
        write_atomic(&path, &document)?;
        Ok(UpdateOutcome { matched: true })
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StorageResult<bool> {
        let _guard = self.lock()?;
        match self.find_first(collection, filter)? {
            Some((path, _)) => {
                fs::remove_file(path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write-read-delete probe of the data directory. Holds the lock so
    /// concurrent probes do not share the scratch file.
    fn ping(&self) -> StorageResult<()> {
        let _guard = self.lock()?;
        let probe = self.paths.health_check_file();
        let data = b"health_check_data";

        fs::write(&probe, data)?;
        let read_back = fs::read(&probe)?;
        fs::remove_file(&probe)?;

        if read_back != data {
            return Err(StorageError::Unavailable(
                "health check data mismatch".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn insert_one(&self, collection: &str, document: Document) -> StorageResult<String> {
        let collection = collection.to_string();
        self.blocking(move |shared| shared.insert_one(&collection, document))
            .await
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.blocking(move |shared| {
            Ok(shared
                .find_first(&collection, &filter)?
                .map(|(_, document)| document))
        })
        .await
    }

    async fn find_many(&self, collection: &str, query: &FindQuery) -> StorageResult<Vec<Document>> {
        let collection = collection.to_string();
        let query = query.clone();
        self.blocking(move |shared| {
            let matching = shared
                .load_collection(&collection)?
                .into_iter()
                .map(|(_, document)| document)
                .filter(|document| query.filter.matches(document))
                .collect();
            Ok(query.finish(matching))
        })
        .await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        changes: Document,
    ) -> StorageResult<UpdateOutcome> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.blocking(move |shared| shared.update_one(&collection, &filter, changes))
            .await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StorageResult<bool> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.blocking(move |shared| shared.delete_one(&collection, &filter))
            .await
    }

    async fn ping(&self) -> StorageResult<()> {
        self.blocking(|shared| shared.ping()).await
    }
}

/// Document files of a directory as `(file name, path)`, sorted by name.
fn list_document_files(dir: &Path) -> StorageResult<Vec<(String, PathBuf)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            files.push((name.to_string(), path.clone()));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn read_document(collection: &str, path: &Path) -> StorageResult<Document> {
    let bytes = fs::read(path)?;
    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(document) => Ok(document),
        other => Err(StorageError::invalid_document(
            collection,
            format!("{} holds {} instead of an object", path.display(), kind_of(&other)),
        )),
    }
}

/// Write to `{path}.tmp`, flush, then rename over `path`.
fn write_atomic(path: &Path, document: &Document) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, document)?;
        writer.flush()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

fn is_safe_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::document::Sort;
    use crate::storage::TimeoutStore;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn open_store() -> (FileDocumentStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileDocumentStore::open(StoragePaths::new(temp_dir.path()))
            .expect("Failed to open store");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn insert_and_find_document() {
        let (store, _temp_dir) = open_store();
        let id = store
            .insert_one("users", doc(json!({"email": "p@example.com"})))
            .await
            .unwrap();

        let found = store
            .find_one("users", &Filter::eq("email", "p@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["_id"], json!(id));
    }

    #[tokio::test]
    async fn insertion_order_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FileDocumentStore::open(StoragePaths::new(temp_dir.path())).unwrap();
            for n in 0..3 {
                store
                    .insert_one("detections", doc(json!({"n": n, "at": "same"})))
                    .await
                    .unwrap();
            }
        }

        let reopened = FileDocumentStore::open(StoragePaths::new(temp_dir.path())).unwrap();
        reopened
            .insert_one("detections", doc(json!({"n": 3, "at": "same"})))
            .await
            .unwrap();

        let query = FindQuery::new(Filter::all()).sort(Sort::descending("at"));
        let docs = reopened.find_many("detections", &query).await.unwrap();
        let order: Vec<_> = docs.iter().map(|d| d["n"].as_i64().unwrap()).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn update_rewrites_in_place() {
        let (store, _temp_dir) = open_store();
        store
            .insert_one("refresh_tokens", doc(json!({"token_id": "t1", "revoked": false})))
            .await
            .unwrap();

        let outcome = store
            .update_one(
                "refresh_tokens",
                &Filter::eq("token_id", "t1"),
                doc(json!({"revoked": true})),
            )
            .await
            .unwrap();
        assert!(outcome.matched);

        let all = store
            .find_many("refresh_tokens", &FindQuery::new(Filter::all()))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["revoked"], json!(true));
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let (store, _temp_dir) = open_store();
        store.insert_one("users", doc(json!({"k": "v"}))).await.unwrap();

        assert!(store.delete_one("users", &Filter::eq("k", "v")).await.unwrap());
        assert!(store
            .find_one("users", &Filter::eq("k", "v"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn rejects_unsafe_identifiers() {
        let (store, _temp_dir) = open_store();
        let result = store
            .insert_one("users", doc(json!({"_id": "../escape"})))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidDocument { .. })));
    }

    #[tokio::test]
    async fn ping_succeeds_on_writable_root() {
        let (store, _temp_dir) = open_store();
        store.ping().await.unwrap();
        assert!(!store.paths().health_check_file().exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_pings_all_succeed() {
        let (store, _temp_dir) = open_store();
        let pings: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.ping().await })
            })
            .collect();
        for ping in pings {
            ping.await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn stalled_disk_work_trips_the_store_timeout() {
        let (store, _temp_dir) = open_store();
        let shared = Arc::clone(&store.shared);
        let bounded = TimeoutStore::new(store, Duration::from_millis(50));

        let stalled = shared.sequence.lock().unwrap();
        let result = bounded
            .update_one("users", &Filter::eq("k", "v"), doc(json!({"k": "w"})))
            .await;
        drop(stalled);

        assert!(matches!(
            result,
            Err(StorageError::Timeout { operation: "update_one" })
        ));
        assert!(bounded.ping().await.is_ok());
    }
}
