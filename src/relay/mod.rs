//! Media range relay — partial-content streaming of remote objects.

pub mod drive;
pub mod range;

pub use drive::{ByteStream, DriveClient, ObjectMetadata, RemoteDrive};
pub use range::{RangeError, RangeWindow};
