//! Document table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{NgramdexError, Result};

/// Document identifier. Ids start at 1 and only ever grow.
pub type DocId = u64;

/// A stored document. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub content: String,
}

impl Document {
    pub fn new<T: Into<String>, C: Into<String>>(id: DocId, title: T, content: C) -> Self {
        Document {
            id,
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Holds every document record and allocates ids.
///
/// Ids are handed out in strictly increasing order and never reused, so
/// iteration in id order is insertion order.
#[derive(Clone, Debug)]
pub struct DocumentStore {
    documents: BTreeMap<DocId, Document>,
    next_id: DocId,
}

impl Default for DocumentStore {
    fn default() -> Self {
        DocumentStore {
            documents: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next `create` will return.
    pub fn next_id(&self) -> DocId {
        self.next_id
    }

    /// Allocate a fresh id and store the record under it.
    ///
    /// Duplicate titles or contents are fine; each call gets its own id.
    pub fn create<T: Into<String>, C: Into<String>>(&mut self, title: T, content: C) -> DocId {
        let id = self.next_id;
        self.documents.insert(id, Document::new(id, title, content));
        self.next_id += 1;
        id
    }

    /// Store a document that already carries its id (log replay, snapshots).
    ///
    /// Refuses ids that are taken or not above every id handed out so far.
    pub fn insert(&mut self, document: Document) -> Result<()> {
        self.check_insertable(document.id)?;
        self.insert_unchecked(document);
        Ok(())
    }

    pub(crate) fn check_insertable(&self, id: DocId) -> Result<()> {
        if id == 0 {
            return Err(NgramdexError::index("document id 0 is reserved"));
        }
        if id < self.next_id {
            return Err(NgramdexError::index(format!(
                "document id {id} is not above the last allocated id {}",
                self.next_id - 1
            )));
        }
        Ok(())
    }

    pub(crate) fn insert_unchecked(&mut self, document: Document) {
        self.next_id = self.next_id.max(document.id + 1);
        self.documents.insert(document.id, document);
    }

    /// Move the allocation cursor forward (restoring a snapshot taken after
    /// ids were handed out).
    pub(crate) fn reserve_up_to(&mut self, next_id: DocId) {
        self.next_id = self.next_id.max(next_id);
    }

    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.documents.get(&id)
    }

    pub fn contains(&self, id: DocId) -> bool {
        self.documents.contains_key(&id)
    }

    /// All documents in insertion order.
    pub fn list(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
