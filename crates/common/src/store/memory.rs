use std::collections::BTreeMap;

use super::bolt::page::{ELEMENT_SIZE, PAGE_HEADER_SIZE};
use super::{Bucket, BucketStats, Entry, StoreError, Tx};

/// In-memory store with the same shape as a bolt file: a root bucket holding
/// nested buckets and key/value pairs, iterated in byte order of the keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    root: MemoryNode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryNode {
    children: BTreeMap<Vec<u8>, Child>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Child {
    Value(Vec<u8>),
    Bucket(MemoryNode),
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bucket reached through exactly these names, created on the way.
    ///
    /// Panics if one of the names is already used by a value; two entries
    /// can never share a key.
    pub fn bucket_mut<I, K>(&mut self, names: I) -> &mut MemoryNode
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        names
            .into_iter()
            .fold(&mut self.root, |node, name| node.bucket_mut(name))
    }
}

impl MemoryNode {
    pub fn bucket_mut(&mut self, name: impl AsRef<[u8]>) -> &mut MemoryNode {
        let child = self
            .children
            .entry(name.as_ref().to_vec())
            .or_insert_with(|| Child::Bucket(MemoryNode::default()));
        match child {
            Child::Bucket(node) => node,
            Child::Value(_) => panic!(
                "{:?} is a value, not a bucket",
                String::from_utf8_lossy(name.as_ref())
            ),
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn put(&mut self, key: impl AsRef<[u8]>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.children
            .insert(key.as_ref().to_vec(), Child::Value(value.into()));
        self
    }
}

impl Tx for MemoryStore {
    type Bucket<'tx> = MemoryBucket<'tx>;

    fn root(&self) -> Result<MemoryBucket<'_>, StoreError> {
        Ok(MemoryBucket { node: &self.root })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MemoryBucket<'tx> {
    node: &'tx MemoryNode,
}

impl<'tx> Bucket<'tx> for MemoryBucket<'tx> {
    fn bucket(&self, name: &[u8]) -> Result<Option<Self>, StoreError> {
        Ok(match self.node.children.get(name) {
            Some(Child::Bucket(node)) => Some(MemoryBucket { node }),
            _ => None,
        })
    }

    fn get(&self, key: &[u8]) -> Result<Option<&'tx [u8]>, StoreError> {
        Ok(match self.node.children.get(key) {
            Some(Child::Value(value)) => Some(value.as_slice()),
            _ => None,
        })
    }

    fn entries(&self) -> Result<Vec<Entry<'tx>>, StoreError> {
        Ok(self
            .node
            .children
            .iter()
            .map(|(key, child)| Entry {
                key: key.as_slice(),
                value: match child {
                    Child::Value(value) => Some(value.as_slice()),
                    Child::Bucket(_) => None,
                },
            })
            .collect())
    }

    /// Accounting as if the bucket were a single inline leaf page.
    fn stats(&self) -> Result<BucketStats, StoreError> {
        let entries = self.entries()?;
        Ok(BucketStats {
            key_n: entries.len(),
            depth: 1,
            leaf_inuse: inline_used_bytes(&entries),
            ..BucketStats::default()
        })
    }
}

/// Bytes an inline leaf page holding these entries would occupy. Nested
/// buckets count as their 16 byte bucket header.
fn inline_used_bytes(entries: &[Entry<'_>]) -> usize {
    entries.iter().fold(PAGE_HEADER_SIZE, |used, entry| {
        used + ELEMENT_SIZE + entry.key.len() + entry.value.map_or(16, <[u8]>::len)
    })
}
