//! Recursive directory tree mirroring the remote listing hierarchy.
//!
//! On disk a node is a JSON object: an optional `files` key holding the
//! node's own files, plus one key per child directory. In memory that shape
//! is a tagged variant so callers never inspect dictionary keys.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Error as _, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reserved key holding a node's own files.
pub const FILES_KEY: &str = "files";

/// Named child directories, in listing order.
pub type Children<T> = Vec<(String, DirectoryNode<T>)>;

/// One level of the hierarchy.
///
/// `T` is [`ResourceRef`](geoscout_common::ResourceRef) straight out of the
/// crawler and [`EnrichedItem`](geoscout_common::EnrichedItem) once stored.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryNode<T> {
    /// Only files.
    Files(Vec<T>),
    /// Only subdirectories (possibly none).
    Branch(Children<T>),
    /// Files and subdirectories side by side.
    Mixed(Vec<T>, Children<T>),
}

impl<T> Default for DirectoryNode<T> {
    fn default() -> Self {
        Self::Branch(Vec::new())
    }
}

/// Address of one file in a tree: child indices from the root, then the
/// position in that node's `files`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemSlot {
    pub branch: Vec<usize>,
    pub index: usize,
}

impl<T> DirectoryNode<T> {
    /// Build the variant matching what is present.
    ///
    /// `files` is `None` when the node has no files bucket at all, which is
    /// distinct from an empty bucket.
    pub fn from_parts(files: Option<Vec<T>>, children: Children<T>) -> Self {
        match (files, children.is_empty()) {
            (Some(files), true) => Self::Files(files),
            (Some(files), false) => Self::Mixed(files, children),
            (None, _) => Self::Branch(children),
        }
    }

    pub fn into_parts(self) -> (Option<Vec<T>>, Children<T>) {
        match self {
            Self::Files(files) => (Some(files), Vec::new()),
            Self::Branch(children) => (None, children),
            Self::Mixed(files, children) => (Some(files), children),
        }
    }

    /// This node's own files bucket, if it has one.
    pub fn files(&self) -> Option<&[T]> {
        match self {
            Self::Files(files) | Self::Mixed(files, _) => Some(files),
            Self::Branch(_) => None,
        }
    }

    pub fn files_mut(&mut self) -> Option<&mut Vec<T>> {
        match self {
            Self::Files(files) | Self::Mixed(files, _) => Some(files),
            Self::Branch(_) => None,
        }
    }

    pub fn children(&self) -> &[(String, DirectoryNode<T>)] {
        match self {
            Self::Branch(children) | Self::Mixed(_, children) => children,
            Self::Files(_) => &[],
        }
    }

    fn children_mut(&mut self) -> &mut [(String, DirectoryNode<T>)] {
        match self {
            Self::Branch(children) | Self::Mixed(_, children) => children,
            Self::Files(_) => &mut [],
        }
    }

    /// Child directory by name.
    pub fn child(&self, name: &str) -> Option<&DirectoryNode<T>> {
        self.children()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    /// Descend through child names; an empty path is this node.
    pub fn descend(&self, path: &[&str]) -> Option<&DirectoryNode<T>> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Convert every file, keeping the tree shape.
    pub fn map_files<U, F: FnMut(T) -> U>(self, mut f: F) -> DirectoryNode<U> {
        self.map_with(&mut f)
    }

    fn map_with<U, F: FnMut(T) -> U>(self, f: &mut F) -> DirectoryNode<U> {
        let (files, children) = self.into_parts();
        let files = files.map(|files| files.into_iter().map(&mut *f).collect());
        let children = children
            .into_iter()
            .map(|(name, node)| (name, node.map_with(f)))
            .collect();
        DirectoryNode::from_parts(files, children)
    }

    /// Every file in the tree, own files before children, children in order.
    pub fn iter_files(&self) -> impl Iterator<Item = &T> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out.into_iter()
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a T>) {
        if let Some(files) = self.files() {
            out.extend(files.iter());
        }
        for (_, child) in self.children() {
            child.collect_files(out);
        }
    }

    pub fn file_count(&self) -> usize {
        self.files().map_or(0, <[T]>::len)
            + self
                .children()
                .iter()
                .map(|(_, c)| c.file_count())
                .sum::<usize>()
    }

    /// Slots of every file, in the same order as [`Self::iter_files`].
    pub fn slots(&self) -> Vec<ItemSlot> {
        let mut out = Vec::new();
        let mut branch = Vec::new();
        self.collect_slots(&mut branch, &mut out);
        out
    }

    fn collect_slots(&self, branch: &mut Vec<usize>, out: &mut Vec<ItemSlot>) {
        if let Some(files) = self.files() {
            out.extend((0..files.len()).map(|index| ItemSlot {
                branch: branch.clone(),
                index,
            }));
        }
        for (i, (_, child)) in self.children().iter().enumerate() {
            branch.push(i);
            child.collect_slots(branch, out);
            branch.pop();
        }
    }

    pub fn get(&self, slot: &ItemSlot) -> Option<&T> {
        let node = slot
            .branch
            .iter()
            .try_fold(self, |node, &i| node.children().get(i).map(|(_, c)| c))?;
        node.files()?.get(slot.index)
    }

    pub fn get_mut(&mut self, slot: &ItemSlot) -> Option<&mut T> {
        let mut node = self;
        for &i in &slot.branch {
            node = &mut node.children_mut().get_mut(i)?.1;
        }
        node.files_mut()?.get_mut(slot.index)
    }

    /// Directories that carry a files bucket, with their path from this node.
    pub fn directories(&self) -> Vec<(Vec<&str>, &[T])> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_directories(&mut path, &mut out);
        out
    }

    fn collect_directories<'a>(
        &'a self,
        path: &mut Vec<&'a str>,
        out: &mut Vec<(Vec<&'a str>, &'a [T])>,
    ) {
        if let Some(files) = self.files() {
            out.push((path.clone(), files));
        }
        for (name, child) in self.children() {
            path.push(name);
            child.collect_directories(path, out);
            path.pop();
        }
    }
}

impl<T: Serialize> Serialize for DirectoryNode<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let files = self.files();
        let children = self.children();
        let len = children.len() + usize::from(files.is_some());

        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(files) = files {
            map.serialize_entry(FILES_KEY, files)?;
        }
        for (name, child) in children {
            map.serialize_entry(name, child)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for DirectoryNode<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NodeVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for NodeVisitor<T> {
            type Value = DirectoryNode<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a directory object of `files` and named subdirectories")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut files: Option<Vec<T>> = None;
                let mut children = Vec::new();

                while let Some(key) = access.next_key::<String>()? {
                    if key == FILES_KEY {
                        if files.is_some() {
                            return Err(A::Error::duplicate_field(FILES_KEY));
                        }
                        files = Some(access.next_value()?);
                    } else {
                        let child: DirectoryNode<T> = access.next_value()?;
                        children.push((key, child));
                    }
                }

                Ok(DirectoryNode::from_parts(files, children))
            }
        }

        deserializer.deserialize_map(NodeVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoscout_common::ResourceRef;
    use serde_json::json;

    fn r(name: &str) -> ResourceRef {
        ResourceRef::new(format!("https://x/{name}"), 1)
    }

    fn sample() -> DirectoryNode<ResourceRef> {
        DirectoryNode::Mixed(
            vec![r("AD.parquet")],
            vec![
                (
                    "b".to_string(),
                    DirectoryNode::Files(vec![r("b/1.parquet"), r("b/2.parquet")]),
                ),
                (
                    "a".to_string(),
                    DirectoryNode::Branch(vec![(
                        "deep".to_string(),
                        DirectoryNode::Files(vec![r("a/deep/3.parquet")]),
                    )]),
                ),
            ],
        )
    }

    #[test]
    fn from_parts_picks_variant() {
        let files = Some(vec![r("x")]);
        assert!(matches!(
            DirectoryNode::from_parts(files.clone(), vec![]),
            DirectoryNode::Files(_)
        ));
        assert!(matches!(
            DirectoryNode::from_parts(files, vec![("c".into(), DirectoryNode::default())]),
            DirectoryNode::Mixed(..)
        ));
        assert!(matches!(
            DirectoryNode::<ResourceRef>::from_parts(None, vec![]),
            DirectoryNode::Branch(c) if c.is_empty()
        ));
        assert!(matches!(
            DirectoryNode::<ResourceRef>::from_parts(Some(vec![]), vec![]),
            DirectoryNode::Files(f) if f.is_empty()
        ));
    }

    #[test]
    fn iteration_order_is_files_then_children_in_order() {
        let tree = sample();
        let urls: Vec<&str> = tree.iter_files().map(|f| f.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://x/AD.parquet",
                "https://x/b/1.parquet",
                "https://x/b/2.parquet",
                "https://x/a/deep/3.parquet",
            ]
        );
        assert_eq!(tree.file_count(), 4);
    }

    #[test]
    fn slots_address_the_same_files_as_iteration() {
        let tree = sample();
        let via_slots: Vec<&ResourceRef> =
            tree.slots().iter().map(|s| tree.get(s).unwrap()).collect();
        let via_iter: Vec<&ResourceRef> = tree.iter_files().collect();
        assert_eq!(via_slots, via_iter);
    }

    #[test]
    fn get_mut_edits_in_place() {
        let mut tree = sample();
        let slot = ItemSlot {
            branch: vec![1, 0],
            index: 0,
        };
        tree.get_mut(&slot).unwrap().size = 42;
        assert_eq!(tree.descend(&["a", "deep"]).unwrap().files().unwrap()[0].size, 42);

        let missing = ItemSlot {
            branch: vec![0, 0],
            index: 0,
        };
        assert!(tree.get_mut(&missing).is_none());
    }

    #[test]
    fn map_files_keeps_shape() {
        let mapped = sample().map_files(|f| f.size * 10);
        assert_eq!(mapped.iter_files().copied().collect::<Vec<_>>(), vec![10; 4]);
        assert_eq!(mapped.children()[0].0, "b");
        assert!(matches!(mapped, DirectoryNode::Mixed(..)));
    }

    #[test]
    fn directories_report_paths() {
        let tree = sample();
        let dirs: Vec<(Vec<&str>, usize)> = tree
            .directories()
            .into_iter()
            .map(|(p, files)| (p, files.len()))
            .collect();
        assert_eq!(
            dirs,
            vec![(vec![], 1), (vec!["b"], 2), (vec!["a", "deep"], 1)]
        );
    }

    #[test]
    fn json_shape_matches_checkpoint_format() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "files": [{"url": "https://x/AD.parquet", "size": 1}],
                "b": {"files": [
                    {"url": "https://x/b/1.parquet", "size": 1},
                    {"url": "https://x/b/2.parquet", "size": 1}
                ]},
                "a": {"deep": {"files": [{"url": "https://x/a/deep/3.parquet", "size": 1}]}}
            })
        );
    }

    #[test]
    fn json_preserves_child_order() {
        let text = serde_json::to_string(&sample()).unwrap();
        let b = text.find("\"b\"").unwrap();
        let a = text.find("\"a\"").unwrap();
        assert!(b < a);

        let back: DirectoryNode<ResourceRef> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn json_rejects_non_object_nodes() {
        assert!(serde_json::from_value::<DirectoryNode<ResourceRef>>(json!([1, 2])).is_err());
        assert!(
            serde_json::from_value::<DirectoryNode<ResourceRef>>(json!({"sub": "oops"})).is_err()
        );
        assert!(
            serde_json::from_value::<DirectoryNode<ResourceRef>>(json!({"files": {"url": 1}}))
                .is_err()
        );
    }
}
