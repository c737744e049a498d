//! File explorer state: the `FileBase` tree, its flattened view index, and
//! the selection/expansion/drag-and-drop operations that replace it.

pub mod model;
pub mod tree;
pub mod view;

pub use model::{ExternalFile, FileBase, FileKind, mime_for_media_type};
pub use tree::{FileMeta, FileTree, ItemAccessors, TreeError};
pub use view::{ExplorerOptions, FileExplorer};
