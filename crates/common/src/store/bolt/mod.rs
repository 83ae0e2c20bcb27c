//! Read-only access to bolt (bbolt) database files.
//!
//! A [`Snapshot`] maps the file once and serves every read of one request
//! from that mapping, using the meta page that was current when it was
//! opened. Dropping the snapshot unmaps the file.

use std::fs::File;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;

use super::{Bucket, BucketStats, Entry, StoreError, Tx};

pub mod meta;
pub mod page;

pub use meta::Meta;
use page::{LeafElement, Page, BUCKET_HEADER_SIZE, META_PAGE, PAGE_HEADER_SIZE};

/// Page size assumed while looking for the second meta page when the first
/// one is unreadable.
const DEFAULT_PAGE_SIZE: usize = 4096;

/// B+tree walks deeper than this are treated as a reference cycle.
const MAX_TREE_DEPTH: usize = 64;

/// A read-only, point-in-time view of a bolt file.
pub struct Snapshot {
    path: PathBuf,
    mmap: Mmap,
    meta: Meta,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("path", &self.path)
            .field("len", &self.mmap.len())
            .field("meta", &self.meta)
            .finish()
    }
}

impl Snapshot {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |source| StoreError::Unavailable {
            path: path.clone(),
            source,
        };

        let file = File::open(&path).map_err(unavailable)?;
        let len = file.metadata().map_err(unavailable)?.len() as usize;
        if len < PAGE_HEADER_SIZE + meta::META_SIZE {
            return Err(StoreError::Invalid(format!(
                "{} is too small ({} bytes)",
                path.display(),
                len
            )));
        }

        // SAFETY: the mapping is read-only and never outlives the snapshot.
        // bolt writers never modify pages reachable from a committed meta
        // page in place.
        let mmap = unsafe { Mmap::map(&file) }.map_err(unavailable)?;

        let first = Self::read_meta(&mmap, 0);
        let page_size = match &first {
            Ok(meta) => meta.page_size as usize,
            Err(_) => DEFAULT_PAGE_SIZE,
        };
        let second = Self::read_meta(&mmap, page_size);
        let meta = Meta::select(first, second)?;

        let expected = (meta.pgid as u128) * u128::from(meta.page_size);
        if expected > len as u128 {
            return Err(StoreError::Invalid(format!(
                "{} is truncated: {} pages of {} bytes need {} bytes, file has {}",
                path.display(),
                meta.pgid,
                meta.page_size,
                expected,
                len
            )));
        }

        tracing::debug!(
            path = %path.display(),
            page_size = meta.page_size,
            txid = meta.txid,
            root = meta.root,
            "opened bolt snapshot"
        );

        Ok(Snapshot { path, mmap, meta })
    }

    fn read_meta(mmap: &[u8], offset: usize) -> Result<Meta, StoreError> {
        let data = mmap
            .get(offset..)
            .ok_or_else(|| StoreError::Invalid("meta page beyond end of file".into()))?;
        let page = Page::parse(data)?;
        if page.flags & META_PAGE == 0 {
            return Err(StoreError::Invalid(format!(
                "page at offset {} is not a meta page (flags {:#06x})",
                offset, page.flags
            )));
        }
        Meta::parse(data)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn page_size(&self) -> usize {
        self.meta.page_size as usize
    }

    pub fn file_size(&self) -> usize {
        self.mmap.len()
    }

    /// The page with this id, including its overflow pages.
    pub fn page(&self, id: u64) -> Result<Page<'_>, StoreError> {
        let page_size = self.page_size();
        let offset = usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_mul(page_size))
            .filter(|offset| {
                offset
                    .checked_add(PAGE_HEADER_SIZE)
                    .is_some_and(|end| end <= self.mmap.len())
            })
            .ok_or_else(|| StoreError::corrupt(id, "page beyond end of file"))?;

        let header = Page::parse(&self.mmap[offset..])?;
        let data = (header.overflow as usize)
            .checked_add(1)
            .and_then(|pages| pages.checked_mul(page_size))
            .and_then(|span| offset.checked_add(span))
            .and_then(|end| self.mmap.get(offset..end))
            .ok_or_else(|| StoreError::corrupt(id, "overflow runs past end of file"))?;
        Page::parse(data)
    }

    /// Ids on the persisted freelist. Empty when the freelist is not synced.
    pub fn free_pages(&self) -> Result<Vec<u64>, StoreError> {
        if self.meta.freelist == meta::NO_FREELIST {
            return Ok(Vec::new());
        }
        let page = self.page(self.meta.freelist)?;
        if !page.is_freelist() {
            return Err(StoreError::corrupt(
                self.meta.freelist,
                "meta freelist does not point at a freelist page",
            ));
        }
        page.freelist_ids()
    }
}

impl Tx for Snapshot {
    type Bucket<'tx> = BoltBucket<'tx>;

    fn root(&self) -> Result<BoltBucket<'_>, StoreError> {
        Ok(BoltBucket {
            snapshot: self,
            root: Root::Paged(self.meta.root),
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Root<'tx> {
    Paged(u64),
    /// Small buckets store their single leaf page inside the parent's value.
    Inline(Page<'tx>),
}

/// A bucket inside a [`Snapshot`].
#[derive(Debug, Clone, Copy)]
pub struct BoltBucket<'tx> {
    snapshot: &'tx Snapshot,
    root: Root<'tx>,
}

impl<'tx> BoltBucket<'tx> {
    fn open_child(&self, element: &LeafElement<'tx>) -> Result<Self, StoreError> {
        let value = element.value;
        if value.len() < BUCKET_HEADER_SIZE {
            return Err(StoreError::corrupt(
                self.page_id(),
                "bucket value shorter than its header",
            ));
        }
        let root_pgid = LittleEndian::read_u64(&value[0..8]);
        let root = if root_pgid == 0 {
            Root::Inline(Page::parse(&value[BUCKET_HEADER_SIZE..])?)
        } else {
            Root::Paged(root_pgid)
        };
        Ok(BoltBucket {
            snapshot: self.snapshot,
            root,
        })
    }

    fn page_id(&self) -> u64 {
        match self.root {
            Root::Paged(id) => id,
            Root::Inline(page) => page.id,
        }
    }

    fn root_page(&self) -> Result<Page<'tx>, StoreError> {
        match self.root {
            Root::Paged(id) => self.snapshot.page(id),
            Root::Inline(page) => Ok(page),
        }
    }

    /// Descend to the leaf element holding exactly `key`.
    fn seek(&self, key: &[u8]) -> Result<Option<LeafElement<'tx>>, StoreError> {
        let mut page = self.root_page()?;
        for _ in 0..MAX_TREE_DEPTH {
            if page.is_leaf() {
                let elements = page.leaf_elements()?;
                return Ok(elements
                    .binary_search_by(|element| element.key.cmp(key))
                    .ok()
                    .map(|index| elements[index]));
            }
            if !page.is_branch() {
                return Err(StoreError::corrupt(page.id, "expected a branch or leaf page"));
            }
            let elements = page.branch_elements()?;
            if elements.is_empty() {
                return Ok(None);
            }
            // last child whose first key is <= the search key
            let index = match elements.binary_search_by(|element| element.key.cmp(key)) {
                Ok(index) => index,
                Err(0) => 0,
                Err(index) => index - 1,
            };
            page = self.snapshot.page(elements[index].pgid)?;
        }
        Err(StoreError::corrupt(self.page_id(), "tree deeper than allowed"))
    }

    /// Visit every page of this bucket's own tree, depth first, with its
    /// 1-based depth.
    fn walk_pages<F>(&self, mut visit: F) -> Result<(), StoreError>
    where
        F: FnMut(&Page<'tx>, usize) -> Result<(), StoreError>,
    {
        let mut stack = vec![(self.root_page()?, 1usize)];
        while let Some((page, depth)) = stack.pop() {
            if depth > MAX_TREE_DEPTH {
                return Err(StoreError::corrupt(page.id, "tree deeper than allowed"));
            }
            visit(&page, depth)?;
            if page.is_branch() {
                // push in reverse so children are visited in key order
                for element in page.branch_elements()?.into_iter().rev() {
                    stack.push((self.snapshot.page(element.pgid)?, depth + 1));
                }
            } else if !page.is_leaf() {
                return Err(StoreError::corrupt(page.id, "expected a branch or leaf page"));
            }
        }
        Ok(())
    }
}

impl<'tx> Bucket<'tx> for BoltBucket<'tx> {
    fn bucket(&self, name: &[u8]) -> Result<Option<Self>, StoreError> {
        match self.seek(name)? {
            Some(element) if element.is_bucket() => self.open_child(&element).map(Some),
            _ => Ok(None),
        }
    }

    fn get(&self, key: &[u8]) -> Result<Option<&'tx [u8]>, StoreError> {
        Ok(self
            .seek(key)?
            .filter(|element| !element.is_bucket())
            .map(|element| element.value))
    }

    fn entries(&self) -> Result<Vec<Entry<'tx>>, StoreError> {
        let mut entries = Vec::new();
        self.walk_pages(|page, _| {
            if page.is_leaf() {
                for element in page.leaf_elements()? {
                    entries.push(Entry {
                        key: element.key,
                        value: (!element.is_bucket()).then_some(element.value),
                    });
                }
            }
            Ok(())
        })?;
        Ok(entries)
    }

    fn stats(&self) -> Result<BucketStats, StoreError> {
        let mut stats = BucketStats::default();
        if let Root::Inline(page) = self.root {
            stats.key_n = page.count as usize;
            stats.depth = 1;
            stats.leaf_inuse = page.used_bytes()?;
            return Ok(stats);
        }

        self.walk_pages(|page, depth| {
            stats.depth = stats.depth.max(depth);
            if page.is_leaf() {
                stats.leaf_page_n += 1;
                stats.leaf_overflow_n += page.overflow as usize;
                stats.key_n += page.count as usize;
                stats.leaf_inuse += page.used_bytes()?;
            } else {
                stats.branch_page_n += 1;
                stats.branch_overflow_n += page.overflow as usize;
                stats.branch_inuse += page.used_bytes()?;
            }
            Ok(())
        })?;
        Ok(stats)
    }
}
