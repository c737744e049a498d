//! Interactive explorer state over a [`FileTree`].
//!
//! Selection and expansion are id sets kept beside the tree and written back
//! into the `selected`/`expanded` flags by [`FileExplorer::items`]. Structural
//! edits (move, drop, trash) work on the nested items and swap in a freshly
//! indexed tree; a failed edit leaves the previous tree in place.

use std::collections::BTreeSet;
use std::fmt;

use common::named_id;

use crate::model::{ExternalFile, FileBase, FileKind};
use crate::tree::{FileMeta, FileTree, ItemAccessors, TreeError};

type ToggleCallback = Box<dyn FnMut(&str, bool) + Send>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplorerOptions {
    pub multi_select: bool,
    pub checkbox_selection: bool,
    /// Reorder and reparent items by dragging inside the explorer.
    pub dnd_internal: bool,
    /// Accept files dropped from outside.
    pub dnd_external: bool,
    pub dnd_trash: bool,
    /// Media types accepted from external drops. Empty accepts everything.
    pub dnd_file_types: Vec<String>,
}

pub struct FileExplorer {
    options: ExplorerOptions,
    accessors: ItemAccessors,
    tree: FileTree,
    selected: BTreeSet<String>,
    expanded: BTreeSet<String>,
    on_item_selection_toggle: Option<ToggleCallback>,
    on_item_expansion_toggle: Option<ToggleCallback>,
}

impl fmt::Debug for FileExplorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileExplorer")
            .field("options", &self.options)
            .field("items", &self.tree.len())
            .field("selected", &self.selected)
            .field("expanded", &self.expanded)
            .finish_non_exhaustive()
    }
}

impl FileExplorer {
    /// # Errors
    ///
    /// Fails if an id is empty or repeated anywhere in `items`.
    pub fn new(items: Vec<FileBase>, options: ExplorerOptions) -> Result<Self, TreeError> {
        Self::with_accessors(items, options, ItemAccessors::default())
    }

    /// # Errors
    ///
    /// Fails if an id is empty or repeated anywhere in `items`.
    pub fn with_accessors(
        items: Vec<FileBase>,
        options: ExplorerOptions,
        accessors: ItemAccessors,
    ) -> Result<Self, TreeError> {
        let mut selected = BTreeSet::new();
        let mut expanded = BTreeSet::new();
        collect_flags(&items, &accessors, &mut selected, &mut expanded);
        if !options.multi_select && selected.len() > 1 {
            let first = selected.iter().next().cloned();
            selected = first.into_iter().collect();
        }
        let tree = FileTree::from_items(items, &accessors)?;
        Ok(Self {
            options,
            accessors,
            tree,
            selected,
            expanded,
            on_item_selection_toggle: None,
            on_item_expansion_toggle: None,
        })
    }

    pub fn on_item_selection_toggle(&mut self, callback: impl FnMut(&str, bool) + Send + 'static) {
        self.on_item_selection_toggle = Some(Box::new(callback));
    }

    pub fn on_item_expansion_toggle(&mut self, callback: impl FnMut(&str, bool) + Send + 'static) {
        self.on_item_expansion_toggle = Some(Box::new(callback));
    }

    #[must_use]
    pub fn options(&self) -> &ExplorerOptions {
        &self.options
    }

    #[must_use]
    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    #[must_use]
    pub fn item(&self, id: &str) -> Option<&FileBase> {
        self.tree.item(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Nested items with current selection and expansion flags.
    #[must_use]
    pub fn items(&self) -> Vec<FileBase> {
        let mut items = self.tree.to_items();
        self.write_flags(&mut items);
        items
    }

    fn write_flags(&self, items: &mut [FileBase]) {
        for item in items {
            let id = (self.accessors.get_item_id)(item);
            item.selected = self.selected.contains(&id);
            item.expanded = self.expanded.contains(&id);
            self.write_flags(&mut item.children);
        }
    }

    // =========================================================================
    // SELECTION / EXPANSION
    // =========================================================================

    /// Toggle selection of `id`. With `multi_select` and either `additive`
    /// or checkbox selection the item is toggled independently; otherwise it
    /// replaces the current selection (or clears it if it was the only one).
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] or [`TreeError::Disabled`].
    pub fn toggle_selection(&mut self, id: &str, additive: bool) -> Result<bool, TreeError> {
        let meta = self.enabled_meta(id)?;
        let id = meta.id.clone();
        let now_selected = !self.selected.contains(&id);

        if self.options.multi_select && (additive || self.options.checkbox_selection) {
            if now_selected {
                self.selected.insert(id.clone());
            } else {
                self.selected.remove(&id);
            }
            self.notify_selection(&id, now_selected);
            return Ok(now_selected);
        }

        let cleared: Vec<String> = std::mem::take(&mut self.selected)
            .into_iter()
            .filter(|s| *s != id)
            .collect();
        for other in &cleared {
            self.notify_selection(other, false);
        }
        let now_selected = now_selected || !cleared.is_empty();
        if now_selected {
            self.selected.insert(id.clone());
        }
        self.notify_selection(&id, now_selected);
        Ok(now_selected)
    }

    /// Selected ids in sorted order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<&str> {
        self.selected.iter().map(String::as_str).collect()
    }

    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`], [`TreeError::Disabled`] or
    /// [`TreeError::NotExpandable`] for items without children.
    pub fn toggle_expansion(&mut self, id: &str) -> Result<bool, TreeError> {
        let meta = self.enabled_meta(id)?;
        if !meta.expandable {
            return Err(TreeError::NotExpandable(meta.id.clone()));
        }
        let id = meta.id.clone();
        let now_expanded = !self.expanded.remove(&id);
        if now_expanded {
            self.expanded.insert(id.clone());
        }
        if let Some(callback) = self.on_item_expansion_toggle.as_mut() {
            callback(&id, now_expanded);
        }
        Ok(now_expanded)
    }

    #[must_use]
    pub fn expanded_ids(&self) -> Vec<&str> {
        self.expanded.iter().map(String::as_str).collect()
    }

    /// Items in render order: roots, plus children of expanded items.
    #[must_use]
    pub fn visible_items(&self) -> Vec<&FileMeta> {
        self.tree.visible_items(|id| self.expanded.contains(id))
    }

    fn enabled_meta(&self, id: &str) -> Result<&FileMeta, TreeError> {
        let meta = self.tree.meta(id).ok_or_else(|| TreeError::NotFound(id.to_owned()))?;
        if meta.disabled {
            return Err(TreeError::Disabled(id.to_owned()));
        }
        Ok(meta)
    }

    fn notify_selection(&mut self, id: &str, selected: bool) {
        if let Some(callback) = self.on_item_selection_toggle.as_mut() {
            callback(id, selected);
        }
    }

    // =========================================================================
    // DRAG AND DROP
    // =========================================================================

    /// Move `id` under `new_parent` (`None` for the root level) at `index`,
    /// clamped to the number of siblings.
    ///
    /// # Errors
    ///
    /// Fails when internal drag and drop is off, either item is missing, the
    /// target is the item or one of its descendants, or the target is a plain
    /// file.
    pub fn move_item(&mut self, id: &str, new_parent: Option<&str>, index: usize) -> Result<(), TreeError> {
        if !self.options.dnd_internal {
            return Err(TreeError::DndDisabled("internal"));
        }
        self.enabled_meta(id)?;
        if let Some(target) = new_parent {
            self.container_meta(target)?;
            if self.tree.is_descendant_or_self(target, id) {
                return Err(TreeError::CycleDetected { id: id.to_owned(), target: target.to_owned() });
            }
        }

        let mut items = self.tree.to_items();
        let node = detach(&mut items, id, &self.accessors)
            .ok_or_else(|| TreeError::NotFound(id.to_owned()))?;
        self.insert(&mut items, new_parent, index, vec![node])?;
        self.replace_tree(items)?;
        tracing::debug!(id, parent = ?new_parent, index, "moved item");
        Ok(())
    }

    /// Add files dropped from outside under `parent`. Files whose media type
    /// is not accepted are skipped. Returns the generated ids.
    ///
    /// # Errors
    ///
    /// Fails when external drag and drop is off, when `parent` is not a
    /// folder, or when every dropped file is rejected.
    pub fn add_external_files(&mut self, parent: Option<&str>, files: Vec<ExternalFile>) -> Result<Vec<String>, TreeError> {
        if !self.options.dnd_external {
            return Err(TreeError::DndDisabled("external"));
        }
        if let Some(target) = parent {
            self.container_meta(target)?;
        }

        let mut rejected = None;
        let nodes: Vec<FileBase> = files
            .into_iter()
            .filter_map(|file| {
                if self.accepts(file.media_type.as_deref()) {
                    Some(FileBase {
                        id: named_id("file"),
                        name: file.name,
                        size: file.size,
                        modified: file.modified,
                        media_type: file.media_type,
                        ..FileBase::default()
                    })
                } else {
                    tracing::debug!(name = %file.name, media_type = ?file.media_type, "rejected dropped file");
                    rejected = Some(file.media_type);
                    None
                }
            })
            .collect();
        if nodes.is_empty() {
            if let Some(media_type) = rejected {
                return Err(TreeError::FileTypeRejected(media_type));
            }
            return Ok(Vec::new());
        }

        let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
        let mut items = self.tree.to_items();
        let end = self.tree.children_ids(parent).len();
        self.insert(&mut items, parent, end, nodes)?;
        self.replace_tree(items)?;
        Ok(ids)
    }

    /// Drop `id` on the trash. The item moves into the first trash folder
    /// when one exists, otherwise it is removed. Returns the item.
    ///
    /// # Errors
    ///
    /// Fails when trash drops are off, or `id` is unknown or disabled.
    pub fn trash_item(&mut self, id: &str) -> Result<FileBase, TreeError> {
        if !self.options.dnd_trash {
            return Err(TreeError::DndDisabled("trash"));
        }
        let meta = self.enabled_meta(id)?;
        if meta.kind == FileKind::Trash {
            return Err(TreeError::NotAContainer(id.to_owned()));
        }
        let trash = self.find_trash().filter(|t| !self.tree.is_descendant_or_self(t, id));

        let mut items = self.tree.to_items();
        let node = detach(&mut items, id, &self.accessors)
            .ok_or_else(|| TreeError::NotFound(id.to_owned()))?;
        if let Some(trash) = trash.as_deref() {
            let end = self.tree.children_ids(Some(trash)).len();
            self.insert(&mut items, Some(trash), end, vec![node.clone()])?;
        }
        self.replace_tree(items)?;

        let gone: Vec<String> = self
            .selected
            .iter()
            .chain(self.expanded.iter())
            .filter(|s| self.tree.meta(s).is_none())
            .cloned()
            .collect();
        for stale in gone {
            self.selected.remove(&stale);
            self.expanded.remove(&stale);
        }
        tracing::debug!(id, trash = ?trash, "trashed item");
        Ok(node)
    }

    fn find_trash(&self) -> Option<String> {
        let mut stack: Vec<&str> = self.tree.children_ids(None).iter().map(String::as_str).rev().collect();
        while let Some(id) = stack.pop() {
            if self.tree.meta(id).is_some_and(|m| m.kind == FileKind::Trash) {
                return Some(id.to_owned());
            }
            stack.extend(self.tree.children_ids(Some(id)).iter().map(String::as_str).rev());
        }
        None
    }

    fn accepts(&self, media_type: Option<&str>) -> bool {
        self.options.dnd_file_types.is_empty()
            || media_type.is_some_and(|m| self.options.dnd_file_types.iter().any(|t| t == m))
    }

    fn container_meta(&self, id: &str) -> Result<&FileMeta, TreeError> {
        let meta = self.enabled_meta(id)?;
        if !meta.kind.is_container() {
            return Err(TreeError::NotAContainer(id.to_owned()));
        }
        Ok(meta)
    }

    fn insert(
        &self,
        items: &mut Vec<FileBase>,
        parent: Option<&str>,
        index: usize,
        nodes: Vec<FileBase>,
    ) -> Result<(), TreeError> {
        let siblings = match parent {
            None => items,
            Some(parent) => {
                find_mut(items, parent, &self.accessors)
                    .map(|p| &mut p.children)
                    .ok_or_else(|| TreeError::NotFound(parent.to_owned()))?
            }
        };
        let at = index.min(siblings.len());
        for (offset, node) in nodes.into_iter().enumerate() {
            siblings.insert(at + offset, node);
        }
        Ok(())
    }

    fn replace_tree(&mut self, items: Vec<FileBase>) -> Result<(), TreeError> {
        self.tree = FileTree::from_items(items, &self.accessors)?;
        // A parent that lost its last child is no longer expandable.
        let tree = &self.tree;
        self.expanded.retain(|id| tree.meta(id).is_some_and(|m| m.expandable));
        Ok(())
    }
}

fn collect_flags(
    items: &[FileBase],
    accessors: &ItemAccessors,
    selected: &mut BTreeSet<String>,
    expanded: &mut BTreeSet<String>,
) {
    for item in items {
        let id = (accessors.get_item_id)(item);
        if item.selected {
            selected.insert(id.clone());
        }
        if item.expanded && !item.children.is_empty() {
            expanded.insert(id);
        }
        collect_flags(&item.children, accessors, selected, expanded);
    }
}

fn detach(items: &mut Vec<FileBase>, id: &str, accessors: &ItemAccessors) -> Option<FileBase> {
    if let Some(pos) = items.iter().position(|i| (accessors.get_item_id)(i) == id) {
        return Some(items.remove(pos));
    }
    items.iter_mut().find_map(|i| detach(&mut i.children, id, accessors))
}

fn find_mut<'a>(items: &'a mut [FileBase], id: &str, accessors: &ItemAccessors) -> Option<&'a mut FileBase> {
    for item in items {
        if (accessors.get_item_id)(item) == id {
            return Some(item);
        }
        if let Some(found) = find_mut(&mut item.children, id, accessors) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
