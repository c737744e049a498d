//! File explorer items.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    #[default]
    File,
    Folder,
    Trash,
}

impl FileKind {
    /// Folders and the trash can hold children.
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, Self::Folder | Self::Trash)
    }
}

/// A file or folder node. Children are owned, so a tree built from these
/// values cannot contain cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileBase {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileBase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Last modification, milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<i64>,
    #[serde(default, rename = "type")]
    pub kind: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub expanded: bool,
}

impl FileBase {
    #[must_use]
    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), ..Self::default() }
    }

    #[must_use]
    pub fn folder(id: impl Into<String>, name: impl Into<String>, children: Vec<FileBase>) -> Self {
        Self { id: id.into(), name: name.into(), children, kind: FileKind::Folder, ..Self::default() }
    }

    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(FileBase::count).sum::<usize>()
    }
}

/// A file dropped from outside the explorer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalFile {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified: Option<i64>,
    #[serde(default)]
    pub media_type: Option<String>,
}

/// MIME type used when exporting an item of the given media type.
#[must_use]
pub fn mime_for_media_type(media_type: Option<&str>) -> &'static str {
    match media_type {
        Some("image") => "image/png",
        Some("video") => "video/mp4",
        Some("audio") => "audio/mpeg",
        Some("pdf") => "application/pdf",
        Some("doc" | "text") => "text/plain",
        Some("lottie" | "json") => "application/json",
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("xml") => "application/xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
