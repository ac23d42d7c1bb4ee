pub mod node;
pub mod path;
pub mod resolver;

pub use node::{FileMetadata, FolderMetadata, Metadata, Resolved, RevisionMetadata};
pub use path::{PathFormat, VirtualPath};
pub use resolver::PathResolver;
