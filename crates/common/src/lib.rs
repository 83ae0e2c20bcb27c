/**
 * Store access.
 *  - `Tx` / `Bucket` traits the rest of the crate
 *    is written against
 *  - a read-only bbolt file reader
 *  - an in-memory store for tests and
 *    pre-decoded trees
 */
pub mod store;
/**
 * Turns an ambiguous slash-joined path into
 *  a bucket handle.
 */
pub mod resolve;
/**
 * Value classification (JSON / text / binary)
 *  and preview rendering.
 */
pub mod classify;
/**
 * Fixed-width hex + ASCII dumps.
 */
pub mod hexdump;
/**
 * Opportunistic decoders for values with a
 *  known binary layout: marshalled timestamps
 *  and typed payload envelopes.
 */
pub mod decode;
/**
 * Recursive bucket summaries.
 */
pub mod tree;
/**
 * Capped depth-first key search.
 */
pub mod search;
/**
 * Per-request operations that open a snapshot,
 *  do one thing, and release it.
 */
pub mod inspect;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;
/**
 * Bolt file writer and sample data for tests.
 */
#[cfg(feature = "testkit")]
pub mod testkit;

pub mod prelude {
    pub use crate::classify::{classify, ClassifiedValue, PreviewMode, ValueKind};
    pub use crate::decode::{decode_envelope, decode_time, DecodeError, DecodedTime, Envelope};
    pub use crate::hexdump::dump;
    pub use crate::inspect::{DatabaseStats, InspectError, Inspector};
    pub use crate::resolve::{resolve, ResolveError};
    pub use crate::search::{search, SearchHit};
    pub use crate::store::{Bucket, BucketStats, Entry, StoreError, Tx};
    pub use crate::tree::{build_summary, build_tree, BucketSummary};
    pub use crate::version::{build_info, BuildInfo};
}
