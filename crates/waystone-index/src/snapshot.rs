//! Whole-index persistence to `STORAGE_PATH/search_index/`.
//!
//! The original calls `self.ix.storage.copyto(path)` to snapshot `whoosh`'s
//! on-disk segments; since this index lives entirely in memory, the
//! equivalent here is a single JSON dump, written the way
//! `meilisearch-types`'s dump crate snapshots its own in-memory structures
//! via `serde_json`.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use waystone_types::{Error, Result, SearchDocument};

use crate::index::Index;
use crate::schema::FIELDS;

#[derive(Debug, Serialize, Deserialize)]
struct IndexSnapshot {
    next_id: u32,
    documents: Vec<(u32, SearchDocument)>,
    postings: Vec<Vec<(String, Vec<(u32, u32)>)>>,
    field_len: Vec<Vec<(u32, u32)>>,
}

impl Index {
    pub fn save_snapshot(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::Fatal(format!("failed to create {}: {e}", dir.display())))?;
        let path = dir.join("index.json");
        let file = File::create(&path)
            .map_err(|e| Error::Fatal(format!("failed to create {}: {e}", path.display())))?;
        let snapshot = self.to_snapshot();
        serde_json::to_writer(BufWriter::new(file), &snapshot)
            .map_err(|e| Error::Fatal(format!("failed to write index snapshot: {e}")))?;
        Ok(())
    }

    pub fn load_snapshot(dir: impl AsRef<Path>) -> Result<Index> {
        let path = dir.as_ref().join("index.json");
        let file = File::open(&path)
            .map_err(|e| Error::Fatal(format!("failed to open {}: {e}", path.display())))?;
        let snapshot: IndexSnapshot = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Fatal(format!("failed to read index snapshot: {e}")))?;
        Ok(Index::from_snapshot(snapshot))
    }

    fn to_snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            next_id: self.next_id,
            documents: self.documents.iter().map(|(id, d)| (*id, d.doc.clone())).collect(),
            postings: self
                .postings
                .iter()
                .map(|field_postings| {
                    field_postings
                        .iter()
                        .map(|(term, docs)| {
                            (term.clone(), docs.iter().map(|(&a, &b)| (a, b)).collect())
                        })
                        .collect()
                })
                .collect(),
            field_len: self
                .field_len
                .iter()
                .map(|lens| lens.iter().map(|(&a, &b)| (a, b)).collect())
                .collect(),
        }
    }

    fn from_snapshot(snapshot: IndexSnapshot) -> Index {
        let mut index = Index::new();
        index.next_id = snapshot.next_id;
        for (id, doc) in snapshot.documents {
            index.url_to_id.insert(doc.url.clone(), id);
            index.documents.insert(id, crate::index::StoredDoc { id, doc });
        }
        for (field_idx, entries) in snapshot.postings.into_iter().enumerate().take(FIELDS.len()) {
            index.postings[field_idx] = entries.into_iter().map(|(t, d)| (t, d.into_iter().collect())).collect();
        }
        for (field_idx, entries) in snapshot.field_len.into_iter().enumerate().take(FIELDS.len()) {
            index.field_len[field_idx] = entries.into_iter().collect();
        }
        index
    }
}
