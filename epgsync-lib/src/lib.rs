//! XMLTV schedule sync library.
//!
//! Merges remotely fetched per-channel schedules into a local XMLTV guide
//! document, replacing each synced channel's programme entries wholesale.
//! Channels the source table does not know about, and channels whose fetch
//! fails, keep their existing programmes.
//!
//! # Reference
//! XMLTV file format: <https://wiki.xmltv.org/index.php/XMLTVFormat>
//!
mod error;
mod fetch;
mod merge;
mod sources;
mod writer;
mod xmltv;

pub use error::*;
pub use fetch::*;
pub use merge::*;
pub use sources::*;
pub use writer::*;
pub use xmltv::*;
