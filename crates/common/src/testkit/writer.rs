//! A minimal bolt file writer.
//!
//! Produces the layout bolt leaves behind after a commit: two meta pages,
//! a freelist page, then the B+trees. Keys are written in byte order.

use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};

use crate::store::bolt::meta::{Meta, NO_FREELIST};
use crate::store::bolt::page::{
    BRANCH_PAGE, BUCKET_LEAF_FLAG, ELEMENT_SIZE, FREELIST_PAGE, LEAF_PAGE, META_PAGE,
    PAGE_HEADER_SIZE,
};

pub const PAGE_SIZE: usize = 4096;

#[derive(Debug, Clone)]
pub enum Node {
    Value(Vec<u8>),
    Bucket(Tree),
}

/// Bucket contents to be written, in key order.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    entries: BTreeMap<Vec<u8>, Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&mut self, name: impl AsRef<[u8]>) -> &mut Tree {
        let node = self
            .entries
            .entry(name.as_ref().to_vec())
            .or_insert_with(|| Node::Bucket(Tree::default()));
        match node {
            Node::Bucket(tree) => tree,
            Node::Value(_) => panic!("key is already a value"),
        }
    }

    pub fn path(&mut self, names: &[&str]) -> &mut Tree {
        names.iter().fold(self, |tree, name| tree.bucket(name))
    }

    pub fn put(&mut self, key: impl AsRef<[u8]>, value: impl Into<Vec<u8>>) -> &mut Tree {
        self.entries
            .insert(key.as_ref().to_vec(), Node::Value(value.into()));
        self
    }
}

type Element = (u32, Vec<u8>, Vec<u8>);

/// Buckets without sub-buckets whose leaf fits in a quarter page are
/// stored inline, like bolt does.
pub struct BoltWriter {
    buf: Vec<u8>,
    max_leaf_entries: usize,
    free: Vec<u64>,
    persist_freelist: bool,
    txid: u64,
}

impl Default for BoltWriter {
    fn default() -> Self {
        Self {
            buf: vec![0u8; 3 * PAGE_SIZE],
            max_leaf_entries: 64,
            free: Vec::new(),
            persist_freelist: true,
            txid: 42,
        }
    }
}

impl BoltWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split leaves after this many entries, to get branch pages.
    pub fn max_leaf_entries(mut self, n: usize) -> Self {
        self.max_leaf_entries = n;
        self
    }

    /// Append `n` blank pages and list them on the freelist.
    pub fn free_pages(mut self, n: usize) -> Self {
        for _ in 0..n {
            let id = self.alloc(page_header(0, 0));
            self.free.push(id);
        }
        self
    }

    /// Leave the freelist unpersisted, as `NoFreelistSync` databases do.
    pub fn without_freelist(mut self) -> Self {
        self.persist_freelist = false;
        self
    }

    pub fn txid(mut self, txid: u64) -> Self {
        self.txid = txid;
        self
    }

    pub fn finish(mut self, root: &Tree) -> Vec<u8> {
        let elements = self.elements(root);
        let root_pgid = self.write_tree(elements);
        let pgid = (self.buf.len() / PAGE_SIZE) as u64;

        let mut freelist = page_header(FREELIST_PAGE, self.free.len());
        for id in &self.free {
            freelist.extend_from_slice(&id.to_le_bytes());
        }
        LittleEndian::write_u64(&mut freelist[0..8], 2);
        self.buf[2 * PAGE_SIZE..2 * PAGE_SIZE + freelist.len()].copy_from_slice(&freelist);

        for (id, txid) in [(0u64, self.txid - 1), (1, self.txid)] {
            let meta = Meta {
                page_size: PAGE_SIZE as u32,
                flags: 0,
                root: root_pgid,
                sequence: 0,
                freelist: if self.persist_freelist { 2 } else { NO_FREELIST },
                pgid,
                txid,
            };
            let mut page = page_header(META_PAGE, 0);
            LittleEndian::write_u64(&mut page[0..8], id);
            page.extend_from_slice(&meta.encode());
            let start = id as usize * PAGE_SIZE;
            self.buf[start..start + page.len()].copy_from_slice(&page);
        }
        self.buf
    }

    fn alloc(&mut self, mut page: Vec<u8>) -> u64 {
        let id = (self.buf.len() / PAGE_SIZE) as u64;
        let span = page.len().div_ceil(PAGE_SIZE).max(1);
        LittleEndian::write_u64(&mut page[0..8], id);
        LittleEndian::write_u32(&mut page[12..16], (span - 1) as u32);
        page.resize(span * PAGE_SIZE, 0);
        self.buf.extend_from_slice(&page);
        id
    }

    fn elements(&mut self, tree: &Tree) -> Vec<Element> {
        let mut elements = Vec::with_capacity(tree.entries.len());
        for (key, node) in &tree.entries {
            elements.push(match node {
                Node::Value(value) => (0, key.clone(), value.clone()),
                Node::Bucket(child) => (BUCKET_LEAF_FLAG, key.clone(), self.bucket_value(child)),
            });
        }
        elements
    }

    fn bucket_value(&mut self, tree: &Tree) -> Vec<u8> {
        let elements = self.elements(tree);
        let has_buckets = elements.iter().any(|(flags, _, _)| flags & BUCKET_LEAF_FLAG != 0);
        let leaf = leaf_page(&elements);

        let mut value = vec![0u8; 16];
        if !has_buckets && leaf.len() <= PAGE_SIZE / 4 && elements.len() <= self.max_leaf_entries {
            value.extend_from_slice(&leaf);
        } else {
            let root = self.write_tree(elements);
            LittleEndian::write_u64(&mut value[0..8], root);
        }
        value
    }

    fn write_tree(&mut self, elements: Vec<Element>) -> u64 {
        if elements.is_empty() {
            return self.alloc(leaf_page(&[]));
        }
        let mut children = Vec::new();
        for chunk in elements.chunks(self.max_leaf_entries) {
            let first = chunk[0].1.clone();
            children.push((first, self.alloc(leaf_page(chunk))));
        }
        if children.len() == 1 {
            return children[0].1;
        }
        self.alloc(branch_page(&children))
    }
}

fn page_header(flags: u16, count: usize) -> Vec<u8> {
    let mut page = vec![0u8; PAGE_HEADER_SIZE];
    LittleEndian::write_u16(&mut page[8..10], flags);
    LittleEndian::write_u16(&mut page[10..12], count as u16);
    page
}

fn leaf_page(elements: &[Element]) -> Vec<u8> {
    let mut page = page_header(LEAF_PAGE, elements.len());
    page.resize(PAGE_HEADER_SIZE + ELEMENT_SIZE * elements.len(), 0);
    for (i, (flags, key, value)) in elements.iter().enumerate() {
        let at = PAGE_HEADER_SIZE + ELEMENT_SIZE * i;
        let pos = page.len() - at;
        LittleEndian::write_u32(&mut page[at..at + 4], *flags);
        LittleEndian::write_u32(&mut page[at + 4..at + 8], pos as u32);
        LittleEndian::write_u32(&mut page[at + 8..at + 12], key.len() as u32);
        LittleEndian::write_u32(&mut page[at + 12..at + 16], value.len() as u32);
        page.extend_from_slice(key);
        page.extend_from_slice(value);
    }
    page
}

fn branch_page(children: &[(Vec<u8>, u64)]) -> Vec<u8> {
    let mut page = page_header(BRANCH_PAGE, children.len());
    page.resize(PAGE_HEADER_SIZE + ELEMENT_SIZE * children.len(), 0);
    for (i, (key, pgid)) in children.iter().enumerate() {
        let at = PAGE_HEADER_SIZE + ELEMENT_SIZE * i;
        let pos = page.len() - at;
        LittleEndian::write_u32(&mut page[at..at + 4], pos as u32);
        LittleEndian::write_u32(&mut page[at + 4..at + 8], key.len() as u32);
        LittleEndian::write_u64(&mut page[at + 8..at + 16], *pgid);
        page.extend_from_slice(key);
    }
    page
}
