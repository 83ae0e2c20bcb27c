use byteorder::{ByteOrder, LittleEndian};

use super::page::PAGE_HEADER_SIZE;
use crate::store::StoreError;

pub const MAGIC: u32 = 0xED0C_DAED;
pub const VERSION: u32 = 2;
/// Size of the meta body that follows the page header.
pub const META_SIZE: usize = 64;
/// Byte offset of the checksum inside the meta body.
const CHECKSUM_OFFSET: usize = 56;
/// Freelist page id used when the freelist is not persisted.
pub const NO_FREELIST: u64 = u64::MAX;

/// The header a bolt file keeps in each of its two meta pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub page_size: u32,
    pub flags: u32,
    /// Root page of the top-level bucket tree
    pub root: u64,
    pub sequence: u64,
    pub freelist: u64,
    /// High water mark: first page id past the end of the data
    pub pgid: u64,
    pub txid: u64,
}

impl Meta {
    /// Parse and validate the meta page starting at `page`.
    pub fn parse(page: &[u8]) -> Result<Self, StoreError> {
        let body = page
            .get(PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + META_SIZE)
            .ok_or_else(|| StoreError::Invalid("file too small for a meta page".into()))?;

        let magic = LittleEndian::read_u32(&body[0..4]);
        if magic != MAGIC {
            return Err(StoreError::Invalid(format!("bad magic {:#010x}", magic)));
        }
        let version = LittleEndian::read_u32(&body[4..8]);
        if version != VERSION {
            return Err(StoreError::Invalid(format!(
                "unsupported format version {}",
                version
            )));
        }
        let checksum = LittleEndian::read_u64(&body[CHECKSUM_OFFSET..META_SIZE]);
        if checksum != fnv1a64(&body[..CHECKSUM_OFFSET]) {
            return Err(StoreError::Invalid("meta checksum mismatch".into()));
        }

        let meta = Meta {
            page_size: LittleEndian::read_u32(&body[8..12]),
            flags: LittleEndian::read_u32(&body[12..16]),
            root: LittleEndian::read_u64(&body[16..24]),
            sequence: LittleEndian::read_u64(&body[24..32]),
            freelist: LittleEndian::read_u64(&body[32..40]),
            pgid: LittleEndian::read_u64(&body[40..48]),
            txid: LittleEndian::read_u64(&body[48..56]),
        };
        if meta.page_size < (PAGE_HEADER_SIZE + META_SIZE) as u32 {
            return Err(StoreError::Invalid(format!(
                "implausible page size {}",
                meta.page_size
            )));
        }
        Ok(meta)
    }

    /// Pick the meta page a reader should use: the valid one with the
    /// highest transaction id.
    pub fn select(first: Result<Meta, StoreError>, second: Result<Meta, StoreError>) -> Result<Meta, StoreError> {
        match (first, second) {
            (Ok(a), Ok(b)) => Ok(if b.txid > a.txid { b } else { a }),
            (Ok(a), Err(e)) | (Err(e), Ok(a)) => {
                tracing::warn!("ignoring invalid meta page: {}", e);
                Ok(a)
            }
            (Err(e), Err(_)) => Err(e),
        }
    }

    /// Serialize into a 64 byte meta body with a fresh checksum.
    pub fn encode(&self) -> [u8; META_SIZE] {
        let mut body = [0u8; META_SIZE];
        LittleEndian::write_u32(&mut body[0..4], MAGIC);
        LittleEndian::write_u32(&mut body[4..8], VERSION);
        LittleEndian::write_u32(&mut body[8..12], self.page_size);
        LittleEndian::write_u32(&mut body[12..16], self.flags);
        LittleEndian::write_u64(&mut body[16..24], self.root);
        LittleEndian::write_u64(&mut body[24..32], self.sequence);
        LittleEndian::write_u64(&mut body[32..40], self.freelist);
        LittleEndian::write_u64(&mut body[40..48], self.pgid);
        LittleEndian::write_u64(&mut body[48..56], self.txid);
        let checksum = fnv1a64(&body[..CHECKSUM_OFFSET]);
        LittleEndian::write_u64(&mut body[CHECKSUM_OFFSET..], checksum);
        body
    }
}

/// 64-bit FNV-1a, the checksum bolt stores in its meta pages.
fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET_BASIS, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(PRIME)
    })
}
