//! Flattened view index over a `FileBase` tree.
//!
//! DESIGN
//! ======
//! `FileTree` stores each node once (children stripped) keyed by its id, a
//! `FileMeta` per node with parent/depth/position, and the ordered child ids
//! of every parent (`None` is the root level). The nested form is rebuilt on
//! demand with [`FileTree::to_items`]; node count and parent/child relations
//! survive the round trip.

use std::collections::HashMap;

use crate::model::{FileBase, FileKind};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("all items require a unique id; {0:?} appears more than once")]
    DuplicateId(String),
    #[error("item has an empty id (name {0:?})")]
    EmptyId(String),
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("cannot move {id} into itself or its descendant {target}")]
    CycleDetected { id: String, target: String },
    #[error("{0} cannot hold children")]
    NotAContainer(String),
    #[error("item is disabled: {0}")]
    Disabled(String),
    #[error("item is not expandable: {0}")]
    NotExpandable(String),
    #[error("{0} drag and drop is disabled")]
    DndDisabled(&'static str),
    #[error("file type {0:?} is not accepted")]
    FileTypeRejected(Option<String>),
}

type IdFn = Box<dyn Fn(&FileBase) -> String + Send + Sync>;
type DisabledFn = Box<dyn Fn(&FileBase) -> bool + Send + Sync>;

/// How ids, labels and disabled state are read from items.
pub struct ItemAccessors {
    pub get_item_id: IdFn,
    pub get_item_label: IdFn,
    pub is_item_disabled: DisabledFn,
}

impl Default for ItemAccessors {
    fn default() -> Self {
        Self {
            get_item_id: Box::new(|item: &FileBase| item.id.clone()),
            get_item_label: Box::new(|item: &FileBase| item.name.clone()),
            is_item_disabled: Box::new(|_: &FileBase| false),
        }
    }
}

/// View metadata for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub id: String,
    pub label: String,
    pub parent_id: Option<String>,
    pub depth: usize,
    /// Position among its siblings.
    pub index: usize,
    pub expandable: bool,
    pub disabled: bool,
    pub kind: FileKind,
}

#[derive(Debug, Clone, Default)]
pub struct FileTree {
    nodes: HashMap<String, FileBase>,
    metas: HashMap<String, FileMeta>,
    children: HashMap<Option<String>, Vec<String>>,
}

impl FileTree {
    /// Index `items`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::DuplicateId`] or [`TreeError::EmptyId`].
    pub fn from_items(items: Vec<FileBase>, accessors: &ItemAccessors) -> Result<Self, TreeError> {
        let mut tree = Self::default();
        tree.children.insert(None, Vec::new());
        tree.insert_level(items, None, 0, accessors)?;
        Ok(tree)
    }

    fn insert_level(
        &mut self,
        items: Vec<FileBase>,
        parent_id: Option<&str>,
        depth: usize,
        accessors: &ItemAccessors,
    ) -> Result<(), TreeError> {
        for (index, mut item) in items.into_iter().enumerate() {
            let id = (accessors.get_item_id)(&item);
            if id.is_empty() {
                return Err(TreeError::EmptyId(item.name));
            }
            if self.metas.contains_key(&id) {
                return Err(TreeError::DuplicateId(id));
            }
            let children = std::mem::take(&mut item.children);
            let meta = FileMeta {
                id: id.clone(),
                label: (accessors.get_item_label)(&item),
                parent_id: parent_id.map(str::to_owned),
                depth,
                index,
                expandable: !children.is_empty(),
                disabled: (accessors.is_item_disabled)(&item),
                kind: item.kind,
            };
            self.metas.insert(id.clone(), meta);
            self.nodes.insert(id.clone(), item);
            self.children
                .entry(parent_id.map(str::to_owned))
                .or_default()
                .push(id.clone());
            self.insert_level(children, Some(&id), depth + 1, accessors)?;
        }
        Ok(())
    }

    /// Rebuild the nested items.
    #[must_use]
    pub fn to_items(&self) -> Vec<FileBase> {
        self.build_level(None)
    }

    fn build_level(&self, parent: Option<&str>) -> Vec<FileBase> {
        self.children_ids(parent)
            .iter()
            .filter_map(|id| {
                let mut node = self.nodes.get(id)?.clone();
                node.children = self.build_level(Some(id));
                Some(node)
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node without its children.
    #[must_use]
    pub fn item(&self, id: &str) -> Option<&FileBase> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn meta(&self, id: &str) -> Option<&FileMeta> {
        self.metas.get(id)
    }

    /// Ordered child ids of `parent` (`None` for the root level).
    #[must_use]
    pub fn children_ids(&self, parent: Option<&str>) -> &[String] {
        self.children
            .get(&parent.map(str::to_owned))
            .map_or(&[], Vec::as_slice)
    }

    /// Whether `candidate` is `ancestor` or lies beneath it.
    #[must_use]
    pub fn is_descendant_or_self(&self, candidate: &str, ancestor: &str) -> bool {
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.metas.get(id).and_then(|m| m.parent_id.as_deref());
        }
        false
    }

    /// Depth-first order of the items a view would render: every root, and
    /// the children of each item whose id is in `expanded`.
    #[must_use]
    pub fn visible_items(&self, is_expanded: impl Fn(&str) -> bool) -> Vec<&FileMeta> {
        let mut out = Vec::new();
        self.collect_visible(None, &is_expanded, &mut out);
        out
    }

    fn collect_visible<'a>(&'a self, parent: Option<&str>, is_expanded: &dyn Fn(&str) -> bool, out: &mut Vec<&'a FileMeta>) {
        for id in self.children_ids(parent) {
            let Some(meta) = self.metas.get(id) else {
                continue;
            };
            out.push(meta);
            if meta.expandable && is_expanded(id) {
                self.collect_visible(Some(id), is_expanded, out);
            }
        }
    }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tests;
