//! The resource browser hierarchy.
//!
//! Encoding and decoding walk the tree with an explicit stack, so folder depth is bounded by
//! memory only.
use crate::gmk::project::{GmString, Room};
use crate::gmk::stream::GmkStream;
use crate::types::GmkError;
use anyhow::Result;
use serde::Serialize;

/// Number of top-level folders every archive starts with.
pub const ROOT_COUNT: usize = 12;

pub const STATUS_PRIMARY: u32 = 1;
pub const STATUS_GROUP: u32 = 2;
pub const STATUS_SECONDARY: u32 = 3;

pub const GROUP_OBJECTS: u32 = 1;
pub const GROUP_SPRITES: u32 = 2;
pub const GROUP_SOUNDS: u32 = 3;
pub const GROUP_ROOMS: u32 = 4;
pub const GROUP_BACKGROUNDS: u32 = 6;
pub const GROUP_SCRIPTS: u32 = 7;
pub const GROUP_PATHS: u32 = 8;
pub const GROUP_FONTS: u32 = 9;
pub const GROUP_GAME_INFO: u32 = 10;
pub const GROUP_SETTINGS: u32 = 11;
pub const GROUP_TIMELINES: u32 = 12;
pub const GROUP_PACKAGES: u32 = 13;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceTreeNode {
    pub status: u32,
    pub group: u32,
    pub index: u32,
    pub name: GmString,
    pub children: Vec<ResourceTreeNode>,
}

impl Drop for ResourceTreeNode {
    fn drop(&mut self) {
        // Flatten before dropping so deep chains never recurse.
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl ResourceTreeNode {
    pub fn folder(status: u32, group: u32, name: impl Into<GmString>) -> Self {
        Self {
            status,
            group,
            index: 0,
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn leaf(group: u32, index: u32, name: impl Into<GmString>) -> Self {
        Self {
            status: STATUS_SECONDARY,
            group,
            index,
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including this one.
    pub fn count(&self) -> usize {
        let mut total = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            total += 1;
            stack.extend(node.children.iter());
        }
        total
    }
}

/// One node of a flattened tree. Children follow their parent with `depth + 1`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TreeEntry<'a> {
    pub depth: usize,
    pub status: u32,
    pub group: u32,
    pub index: u32,
    pub name: &'a GmString,
}

/// Lists every node in pre-order, so deep trees can be exported without recursion.
pub fn flatten_tree(nodes: &[ResourceTreeNode]) -> Vec<TreeEntry<'_>> {
    let mut entries = Vec::new();
    let mut stack: Vec<(usize, &ResourceTreeNode)> = nodes.iter().rev().map(|n| (0, n)).collect();
    while let Some((depth, node)) = stack.pop() {
        entries.push(TreeEntry {
            depth,
            status: node.status,
            group: node.group,
            index: node.index,
            name: &node.name,
        });
        stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
    }
    entries
}

/// Resource kinds that own a top-level folder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Sprite,
    Sound,
    Background,
    Path,
    Script,
    Font,
    Timeline,
    Object,
    Room,
}

impl ResourceKind {
    /// Position of the kind's folder among the top-level nodes.
    pub fn root_position(self) -> usize {
        match self {
            ResourceKind::Sprite => 0,
            ResourceKind::Sound => 1,
            ResourceKind::Background => 2,
            ResourceKind::Path => 3,
            ResourceKind::Script => 4,
            ResourceKind::Font => 5,
            ResourceKind::Timeline => 6,
            ResourceKind::Object => 7,
            ResourceKind::Room => 8,
        }
    }

    pub fn group(self) -> u32 {
        match self {
            ResourceKind::Sprite => GROUP_SPRITES,
            ResourceKind::Sound => GROUP_SOUNDS,
            ResourceKind::Background => GROUP_BACKGROUNDS,
            ResourceKind::Path => GROUP_PATHS,
            ResourceKind::Script => GROUP_SCRIPTS,
            ResourceKind::Font => GROUP_FONTS,
            ResourceKind::Timeline => GROUP_TIMELINES,
            ResourceKind::Object => GROUP_OBJECTS,
            ResourceKind::Room => GROUP_ROOMS,
        }
    }
}

fn read_node(stream: &mut GmkStream) -> Result<(ResourceTreeNode, u32)> {
    let status = stream.read_u32()?;
    let group = stream.read_u32()?;
    let index = stream.read_u32()?;
    let name = stream.read_string()?;
    let children = stream.read_u32()?;
    Ok((
        ResourceTreeNode {
            status,
            group,
            index,
            name,
            children: Vec::new(),
        },
        children,
    ))
}

/// Reads `roots` top-level nodes together with all of their descendants.
pub fn read_tree(stream: &mut GmkStream, roots: usize) -> Result<Vec<ResourceTreeNode>> {
    let mut result = Vec::with_capacity(roots);
    // (node being filled, children still to read)
    let mut stack: Vec<(ResourceTreeNode, u32)> = Vec::new();
    for _ in 0..roots {
        stack.push(read_node(stream)?);
        while let Some((node, remaining)) = stack.pop() {
            if remaining == 0 {
                match stack.last_mut() {
                    Some((parent, _)) => parent.children.push(node),
                    None => result.push(node),
                }
            } else {
                stack.push((node, remaining - 1));
                stack.push(read_node(stream)?);
            }
        }
    }
    Ok(result)
}

/// Writes the nodes depth-first in stored order.
pub fn write_tree(nodes: &[ResourceTreeNode], stream: &mut GmkStream) {
    let mut stack = vec![nodes.iter()];
    while let Some(iter) = stack.last_mut() {
        match iter.next() {
            Some(node) => {
                stream.write_u32(node.status);
                stream.write_u32(node.group);
                stream.write_u32(node.index);
                stream.write_string(&node.name);
                stream.write_u32(node.children.len() as u32);
                stack.push(node.children.iter());
            }
            None => {
                stack.pop();
            }
        }
    }
}

/// Appends a leaf for a freshly decoded resource to its kind's folder.
pub fn insert_leaf(
    tree: &mut [ResourceTreeNode],
    kind: ResourceKind,
    index: u32,
    name: &GmString,
) -> Result<()> {
    let root = tree.get_mut(kind.root_position()).ok_or_else(|| {
        GmkError::InvalidData(format!("resource tree has no folder for {:?}", kind))
    })?;
    root.children
        .push(ResourceTreeNode::leaf(kind.group(), index, name.clone()));
    Ok(())
}

/// Replaces the rooms folder with one leaf per entry of the execution order.
///
/// Entries pointing at a missing room get an empty name.
pub fn rebuild_room_folder(
    tree: &mut [ResourceTreeNode],
    rooms: &[Option<Room>],
    order: &[u32],
) -> Result<()> {
    let root = tree
        .get_mut(ResourceKind::Room.root_position())
        .ok_or_else(|| GmkError::InvalidData("resource tree has no rooms folder".into()))?;
    let mut folder = ResourceTreeNode::folder(STATUS_PRIMARY, GROUP_ROOMS, "Rooms");
    for &index in order {
        let name = match rooms.get(index as usize) {
            Some(Some(room)) => room.name.clone(),
            _ => {
                log::warn!("room order entry {} has no room", index);
                GmString::new()
            }
        };
        folder
            .children
            .push(ResourceTreeNode::leaf(GROUP_ROOMS, index, name));
    }
    *root = folder;
    Ok(())
}
