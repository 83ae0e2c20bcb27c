//! Page and element layout of a bolt file.
//!
//! ```text
//! page header   id u64 | flags u16 | count u16 | overflow u32
//! branch elem   pos u32 | ksize u32 | pgid u64
//! leaf elem     flags u32 | pos u32 | ksize u32 | vsize u32
//! ```
//!
//! Element `pos` is relative to the element's own address. All integers are
//! little endian. Every read is bounds checked against the page slice and
//! turns into [`StoreError::Corrupt`] instead of panicking.

use byteorder::{ByteOrder, LittleEndian};

use crate::store::StoreError;

pub const PAGE_HEADER_SIZE: usize = 16;
pub const ELEMENT_SIZE: usize = 16;

pub const BRANCH_PAGE: u16 = 0x01;
pub const LEAF_PAGE: u16 = 0x02;
pub const META_PAGE: u16 = 0x04;
pub const FREELIST_PAGE: u16 = 0x10;

/// Leaf element flag marking a nested bucket.
pub const BUCKET_LEAF_FLAG: u32 = 0x01;

/// Size of the `{root, sequence}` header at the start of a bucket value.
pub const BUCKET_HEADER_SIZE: usize = 16;

/// A page viewed in place. `data` starts at the page header and covers the
/// page plus its overflow pages (or the rest of the value, for inline pages).
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub id: u64,
    pub flags: u16,
    pub count: u16,
    pub overflow: u32,
    data: &'a [u8],
}

#[derive(Debug, Clone, Copy)]
pub struct LeafElement<'a> {
    pub flags: u32,
    pub key: &'a [u8],
    pub value: &'a [u8],
}

impl<'a> LeafElement<'a> {
    pub fn is_bucket(&self) -> bool {
        self.flags & BUCKET_LEAF_FLAG != 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BranchElement<'a> {
    pub key: &'a [u8],
    pub pgid: u64,
}

impl<'a> Page<'a> {
    /// View the page header at the start of `data`.
    pub fn parse(data: &'a [u8]) -> Result<Self, StoreError> {
        let header = data
            .get(..PAGE_HEADER_SIZE)
            .ok_or_else(|| StoreError::corrupt(0, "page shorter than its header"))?;
        Ok(Page {
            id: LittleEndian::read_u64(&header[0..8]),
            flags: LittleEndian::read_u16(&header[8..10]),
            count: LittleEndian::read_u16(&header[10..12]),
            overflow: LittleEndian::read_u32(&header[12..16]),
            data,
        })
    }

    pub fn is_branch(&self) -> bool {
        self.flags & BRANCH_PAGE != 0
    }

    pub fn is_leaf(&self) -> bool {
        self.flags & LEAF_PAGE != 0
    }

    pub fn is_freelist(&self) -> bool {
        self.flags & FREELIST_PAGE != 0
    }

    fn element_header(&self, index: usize) -> Result<(usize, &'a [u8]), StoreError> {
        let start = PAGE_HEADER_SIZE + index * ELEMENT_SIZE;
        let header = self
            .data
            .get(start..start + ELEMENT_SIZE)
            .ok_or_else(|| StoreError::corrupt(self.id, format!("element {} out of bounds", index)))?;
        Ok((start, header))
    }

    fn slice(&self, start: usize, len: usize) -> Result<&'a [u8], StoreError> {
        start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .ok_or_else(|| StoreError::corrupt(self.id, "element data out of bounds"))
    }

    pub fn leaf_element(&self, index: usize) -> Result<LeafElement<'a>, StoreError> {
        let (start, header) = self.element_header(index)?;
        let flags = LittleEndian::read_u32(&header[0..4]);
        let pos = LittleEndian::read_u32(&header[4..8]) as usize;
        let ksize = LittleEndian::read_u32(&header[8..12]) as usize;
        let vsize = LittleEndian::read_u32(&header[12..16]) as usize;

        let key_start = start + pos;
        let key = self.slice(key_start, ksize)?;
        let value = self.slice(key_start + ksize, vsize)?;
        Ok(LeafElement { flags, key, value })
    }

    pub fn branch_element(&self, index: usize) -> Result<BranchElement<'a>, StoreError> {
        let (start, header) = self.element_header(index)?;
        let pos = LittleEndian::read_u32(&header[0..4]) as usize;
        let ksize = LittleEndian::read_u32(&header[4..8]) as usize;
        let pgid = LittleEndian::read_u64(&header[8..16]);

        let key = self.slice(start + pos, ksize)?;
        Ok(BranchElement { key, pgid })
    }

    pub fn leaf_elements(&self) -> Result<Vec<LeafElement<'a>>, StoreError> {
        (0..self.count as usize)
            .map(|i| self.leaf_element(i))
            .collect()
    }

    pub fn branch_elements(&self) -> Result<Vec<BranchElement<'a>>, StoreError> {
        (0..self.count as usize)
            .map(|i| self.branch_element(i))
            .collect()
    }

    /// Bytes of the page actually occupied by the header, the element table
    /// and the key/value data.
    pub fn used_bytes(&self) -> Result<usize, StoreError> {
        if self.count == 0 {
            return Ok(PAGE_HEADER_SIZE);
        }
        let last = self.count as usize - 1;
        let (_, header) = self.element_header(last)?;
        let tail = if self.is_leaf() {
            LittleEndian::read_u32(&header[4..8]) as usize
                + LittleEndian::read_u32(&header[8..12]) as usize
                + LittleEndian::read_u32(&header[12..16]) as usize
        } else {
            LittleEndian::read_u32(&header[0..4]) as usize
                + LittleEndian::read_u32(&header[4..8]) as usize
        };
        Ok(PAGE_HEADER_SIZE + ELEMENT_SIZE * last + tail)
    }

    /// Page ids listed on a freelist page.
    pub fn freelist_ids(&self) -> Result<Vec<u64>, StoreError> {
        let (count, start) = if self.count == u16::MAX {
            let raw = self.slice(PAGE_HEADER_SIZE, 8)?;
            (LittleEndian::read_u64(raw) as usize, PAGE_HEADER_SIZE + 8)
        } else {
            (self.count as usize, PAGE_HEADER_SIZE)
        };
        let len = count
            .checked_mul(8)
            .ok_or_else(|| StoreError::corrupt(self.id, "freelist count overflows"))?;
        let raw = self.slice(start, len)?;
        Ok(raw.chunks_exact(8).map(LittleEndian::read_u64).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_page(entries: &[(u32, &[u8], &[u8])]) -> Vec<u8> {
        let mut buf = vec![0u8; PAGE_HEADER_SIZE + ELEMENT_SIZE * entries.len()];
        LittleEndian::write_u16(&mut buf[8..10], LEAF_PAGE);
        LittleEndian::write_u16(&mut buf[10..12], entries.len() as u16);
        for (i, (flags, key, value)) in entries.iter().enumerate() {
            let elem = PAGE_HEADER_SIZE + i * ELEMENT_SIZE;
            let pos = buf.len() - elem;
            LittleEndian::write_u32(&mut buf[elem..elem + 4], *flags);
            LittleEndian::write_u32(&mut buf[elem + 4..elem + 8], pos as u32);
            LittleEndian::write_u32(&mut buf[elem + 8..elem + 12], key.len() as u32);
            LittleEndian::write_u32(&mut buf[elem + 12..elem + 16], value.len() as u32);
            buf.extend_from_slice(key);
            buf.extend_from_slice(value);
        }
        buf
    }

    #[test]
    fn test_leaf_elements() {
        let buf = leaf_page(&[(0, b"a", b"1"), (BUCKET_LEAF_FLAG, b"b", b"22")]);
        let page = Page::parse(&buf).unwrap();
        assert!(page.is_leaf());
        let elements = page.leaf_elements().unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].key, b"a");
        assert_eq!(elements[0].value, b"1");
        assert!(!elements[0].is_bucket());
        assert_eq!(elements[1].value, b"22");
        assert!(elements[1].is_bucket());
    }

    #[test]
    fn test_used_bytes_covers_whole_leaf() {
        let buf = leaf_page(&[(0, b"key", b"value"), (0, b"k2", b"v2")]);
        let page = Page::parse(&buf).unwrap();
        assert_eq!(page.used_bytes().unwrap(), buf.len());
    }

    #[test]
    fn test_truncated_element_is_corrupt() {
        let mut buf = leaf_page(&[(0, b"key", b"value")]);
        buf.truncate(buf.len() - 2);
        let page = Page::parse(&buf).unwrap();
        assert!(matches!(
            page.leaf_element(0),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_missing_element_header_is_corrupt() {
        let mut buf = leaf_page(&[]);
        LittleEndian::write_u16(&mut buf[10..12], 3);
        let page = Page::parse(&buf).unwrap();
        assert!(page.leaf_elements().is_err());
    }

    #[test]
    fn test_freelist_ids() {
        let mut buf = vec![0u8; PAGE_HEADER_SIZE];
        LittleEndian::write_u16(&mut buf[8..10], FREELIST_PAGE);
        LittleEndian::write_u16(&mut buf[10..12], 2);
        buf.extend_from_slice(&9u64.to_le_bytes());
        buf.extend_from_slice(&12u64.to_le_bytes());
        let page = Page::parse(&buf).unwrap();
        assert!(page.is_freelist());
        assert_eq!(page.freelist_ids().unwrap(), vec![9, 12]);
    }
}
