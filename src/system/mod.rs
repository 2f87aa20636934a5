// System Layer
pub mod codec;
pub mod copier;
pub mod counter;
pub mod engine;
pub mod filesystem;

pub use codec::{ArchiveEntry, ArchiveReader, ArchiveWriter};
pub use copier::{CancelFlag, CancellableCopier, PlainCopier, StreamCopier};
pub use counter::{count_bytes, count_bytes_list, sizes_in_archive};
pub use engine::{entry_infos, list_entries, ArchiveTaskEngine};
pub use filesystem::{FileSystem, ListKind};
