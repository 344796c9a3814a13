use crate::config::Appearance;
use crate::dispatch::Button;
use crate::error::MenuError;
use crate::events::{Listener, ListenerId};
use crate::geometry::{Dial, Point, Rect};
use crate::timing::{Blink, TaskId};
use derive_more::{AsRef, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("node#{_0}")]
pub struct NodeId(usize);

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct Label(String);

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct IconName(String);

crate::impl_string_newtype!(Label, IconName);

pub type Action = Box<dyn FnMut()>;

/// A leaf entry: choosing it runs its action.
pub struct MenuItem {
    pub label: Label,
    pub icon: Option<IconName>,
    pub enabled: bool,
    action: Option<Action>,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Label::new(label),
            icon: None,
            enabled: true,
            action: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(IconName::new(icon));
        self
    }

    pub fn on_activate(mut self, action: impl FnMut() + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub(crate) fn activate(&mut self) {
        if let Some(action) = self.action.as_mut() {
            action();
        }
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("label", &self.label)
            .field("icon", &self.icon)
            .field("enabled", &self.enabled)
            .field("action", &self.action.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub enum Entry {
    Item(MenuItem),
    Submenu(NodeId),
}

/// Everything a node forgets when it closes.
#[derive(Debug, Default)]
pub(crate) struct NodeState {
    pub open: bool,
    /// Screen-space bounds while open.
    pub frame: Option<Rect>,
    pub selected: Option<usize>,
    pub active_child: Option<NodeId>,
    pub show_task: Option<TaskId>,
    pub submenu_task: Option<TaskId>,
    pub submenu_slot: Option<usize>,
    pub commit_task: Option<TaskId>,
    pub can_abort_submenu: bool,
    pub dragged_in: bool,
    pub just_closed_submenu: bool,
    pub just_opened: bool,
    pub blink: Option<Blink>,
    /// Tasks that came due while this node was blinking.
    pub awaiting_blink: Vec<TaskId>,
}

impl NodeState {
    pub fn owned_tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        [
            self.show_task,
            self.submenu_task,
            self.commit_task,
            self.blink.as_ref().map(|b| b.task),
        ]
        .into_iter()
        .flatten()
        .chain(self.awaiting_blink.iter().copied())
    }
}

pub struct MenuNode {
    pub label: Label,
    pub icon: Option<IconName>,
    pub enabled: bool,
    pub appearance: Appearance,
    /// Overrides the policy's trigger button for gestures this node handles.
    pub trigger: Option<Button>,
    entries: Vec<Entry>,
    parent: Option<NodeId>,
    default_selected: Option<usize>,
    pub(crate) listeners: Vec<(ListenerId, Listener)>,
    pub(crate) state: NodeState,
}

impl MenuNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Label::new(label),
            icon: None,
            enabled: true,
            appearance: Appearance::default(),
            trigger: None,
            entries: Vec::new(),
            parent: None,
            default_selected: None,
            listeners: Vec::new(),
            state: NodeState::default(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(IconName::new(icon));
        self
    }

    /// Invalid radii are logged and ignored.
    pub fn with_radius(mut self, radius: f64) -> Self {
        let _ = self.appearance.set_outer_radius(radius);
        self
    }

    pub fn with_appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = appearance;
        self
    }

    pub fn with_trigger(mut self, button: Button) -> Self {
        self.trigger = Some(button);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn item_count(&self) -> usize {
        self.entries.len()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn default_selected(&self) -> Option<usize> {
        self.default_selected
    }

    pub fn is_open(&self) -> bool {
        self.state.open
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.selected
    }

    pub fn frame(&self) -> Option<Rect> {
        self.state.frame
    }

    pub fn active_child(&self) -> Option<NodeId> {
        self.state.active_child
    }

    /// Whether the selected slice is currently drawn dimmed by the commit blink.
    pub fn is_blink_dimmed(&self) -> bool {
        self.state.blink.as_ref().is_some_and(|b| b.dimmed)
    }

    /// Layout in the node's own coordinates, where the center is `(outer, outer)`.
    pub fn dial(&self) -> Dial {
        let outer = self.appearance.outer_radius();
        Dial {
            center: Point::new(outer, outer),
            outer,
            inner: self.appearance.inner_radius(),
            item_count: self.entries.len(),
            line_north: self.appearance.line_north,
        }
    }
}

impl fmt::Debug for MenuNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuNode")
            .field("label", &self.label)
            .field("entries", &self.entries)
            .field("parent", &self.parent)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Arena owning every node of one hierarchy. Parent and active-child links
/// are plain ids, so nothing in the tree owns anything else.
#[derive(Debug)]
pub struct MenuTree {
    nodes: Vec<MenuNode>,
}

impl MenuTree {
    pub fn new(root: MenuNode) -> Self {
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Adds a detached node; it becomes reachable once attached as a submenu.
    pub fn insert(&mut self, node: MenuNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_node(
        &mut self,
        label: impl Into<String>,
        icon: Option<IconName>,
        radius: f64,
    ) -> NodeId {
        let mut node = MenuNode::new(label).with_radius(radius);
        node.icon = icon;
        self.insert(node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Result<&MenuNode, MenuError> {
        self.nodes.get(id.0).ok_or(MenuError::UnknownNode(id))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut MenuNode, MenuError> {
        self.nodes.get_mut(id.0).ok_or(MenuError::UnknownNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &MenuNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Inserts `entry` at `position`, appending when `None`.
    pub fn attach(
        &mut self,
        parent: NodeId,
        entry: Entry,
        position: Option<usize>,
    ) -> Result<usize, MenuError> {
        let len = self.get(parent)?.entries.len();

        if let Entry::Submenu(child) = &entry {
            let child = *child;
            let node = self.get(child)?;
            if child == self.root() || child == parent || self.is_ancestor(child, parent) {
                return Err(MenuError::Cycle(child));
            }
            if node.parent.is_some() {
                return Err(MenuError::AlreadyAttached(child));
            }
        }

        let index = position.unwrap_or(len);
        if index > len {
            return Err(MenuError::Index { index, len });
        }

        if let Entry::Submenu(child) = &entry {
            self.nodes[child.0].parent = Some(parent);
        }
        let node = &mut self.nodes[parent.0];
        node.entries.insert(index, entry);
        // the default follows its entry
        if let Some(d) = node.default_selected.filter(|&d| index <= d) {
            node.default_selected = Some(d + 1);
        }
        Ok(index)
    }

    pub fn remove(&mut self, parent: NodeId, position: usize) -> Result<Entry, MenuError> {
        let node = self.get_mut(parent)?;
        let len = node.entries.len();
        if position >= len {
            return Err(MenuError::Index {
                index: position,
                len,
            });
        }
        let entry = node.entries.remove(position);
        node.default_selected = match node.default_selected {
            Some(d) if d == position => None,
            Some(d) if d > position => Some(d - 1),
            other => other,
        };
        if let Entry::Submenu(child) = &entry {
            self.nodes[child.0].parent = None;
        }
        Ok(entry)
    }

    pub fn entry(&self, node: NodeId, position: usize) -> Result<&Entry, MenuError> {
        let entries = &self.get(node)?.entries;
        entries.get(position).ok_or(MenuError::Index {
            index: position,
            len: entries.len(),
        })
    }

    pub fn item(&self, node: NodeId, position: usize) -> Result<&MenuItem, MenuError> {
        match self.entry(node, position)? {
            Entry::Item(item) => Ok(item),
            Entry::Submenu(_) => Err(MenuError::Configuration(format!(
                "entry {position} of {node} is a submenu"
            ))),
        }
    }

    pub fn item_count(&self, node: NodeId) -> usize {
        self.nodes.get(node.0).map_or(0, |n| n.entries.len())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    /// Out-of-range positions clear the default selection.
    pub fn set_default_selected(
        &mut self,
        node: NodeId,
        position: Option<usize>,
    ) -> Result<(), MenuError> {
        let node = self.get_mut(node)?;
        node.default_selected = position.filter(|&p| p < node.entries.len());
        Ok(())
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn root_of(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Deepest open node reached through active-child links, or `node` itself.
    /// Unknown ids are returned unchanged.
    pub fn active_leaf(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(child) = self
            .nodes
            .get(current.0)
            .and_then(|n| n.state.active_child)
        {
            if !self.nodes.get(child.0).is_some_and(|n| n.state.open) {
                break;
            }
            current = child;
        }
        current
    }

    /// Open nodes from `node` down to its active leaf.
    pub fn open_chain(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(node) = self.nodes.get(id.0).filter(|n| n.state.open) else {
                break;
            };
            chain.push(id);
            current = node.state.active_child;
        }
        chain
    }

    pub(crate) fn node(&self, id: NodeId) -> &MenuNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut MenuNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn state(&self, id: NodeId) -> &NodeState {
        &self.nodes[id.0].state
    }

    pub(crate) fn state_mut(&mut self, id: NodeId) -> &mut NodeState {
        &mut self.nodes[id.0].state
    }

    pub(crate) fn entry_mut(&mut self, node: NodeId, position: usize) -> Option<&mut Entry> {
        self.nodes.get_mut(node.0)?.entries.get_mut(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_items(labels: &[&str]) -> MenuTree {
        let mut tree = MenuTree::new(MenuNode::new("root"));
        for label in labels {
            tree.attach(tree.root(), Entry::Item(MenuItem::new(*label)), None)
                .unwrap();
        }
        tree
    }

    fn labels(tree: &MenuTree, node: NodeId) -> Vec<String> {
        tree.get(node)
            .unwrap()
            .entries()
            .iter()
            .map(|e| match e {
                Entry::Item(item) => item.label.to_string(),
                Entry::Submenu(id) => tree.get(*id).unwrap().label.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_attach_appends_and_inserts() {
        let mut tree = tree_with_items(&["a", "c"]);
        let root = tree.root();
        assert_eq!(
            tree.attach(root, Entry::Item(MenuItem::new("b")), Some(1)),
            Ok(1)
        );
        assert_eq!(tree.attach(root, Entry::Item(MenuItem::new("d")), None), Ok(3));
        assert_eq!(labels(&tree, root), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_attach_past_end_fails() {
        let mut tree = tree_with_items(&["a"]);
        let root = tree.root();
        assert_eq!(
            tree.attach(root, Entry::Item(MenuItem::new("x")), Some(3)),
            Err(MenuError::Index { index: 3, len: 1 })
        );
    }

    #[test]
    fn test_remove_out_of_bounds_is_index_error() {
        let mut tree = tree_with_items(&["a", "b"]);
        let root = tree.root();
        assert!(matches!(
            tree.remove(root, 2),
            Err(MenuError::Index { index: 2, len: 2 })
        ));
        assert!(matches!(tree.remove(root, 0), Ok(Entry::Item(_))));
        assert_eq!(labels(&tree, root), ["b"]);
    }

    #[test]
    fn test_submenu_links_parent() {
        let mut tree = tree_with_items(&["a"]);
        let root = tree.root();
        let sub = tree.create_node("more", None, 80.0);
        tree.attach(root, Entry::Submenu(sub), None).unwrap();

        assert_eq!(tree.parent(sub), Some(root));
        assert_eq!(tree.root_of(sub), root);
        assert!(tree.is_ancestor(root, sub));
        assert_eq!(tree.get(sub).unwrap().appearance.outer_radius(), 80.0);

        assert!(matches!(tree.remove(root, 1), Ok(Entry::Submenu(id)) if id == sub));
        assert_eq!(tree.parent(sub), None);
    }

    #[test]
    fn test_submenu_cannot_be_shared_or_cyclic() {
        let mut tree = tree_with_items(&[]);
        let root = tree.root();
        let sub = tree.create_node("sub", None, 100.0);
        let other = tree.create_node("other", None, 100.0);
        tree.attach(root, Entry::Submenu(sub), None).unwrap();

        assert_eq!(
            tree.attach(other, Entry::Submenu(sub), None),
            Err(MenuError::AlreadyAttached(sub))
        );
        assert_eq!(
            tree.attach(sub, Entry::Submenu(root), None),
            Err(MenuError::Cycle(root))
        );
        assert_eq!(
            tree.attach(sub, Entry::Submenu(sub), None),
            Err(MenuError::Cycle(sub))
        );
    }

    #[test]
    fn test_default_selected_out_of_range_clears() {
        let mut tree = tree_with_items(&["a", "b"]);
        let root = tree.root();
        tree.set_default_selected(root, Some(1)).unwrap();
        assert_eq!(tree.get(root).unwrap().default_selected(), Some(1));
        tree.set_default_selected(root, Some(2)).unwrap();
        assert_eq!(tree.get(root).unwrap().default_selected(), None);
    }

    #[test]
    fn test_default_selected_follows_its_entry() {
        let mut tree = tree_with_items(&["a", "b", "c", "d"]);
        let root = tree.root();
        let default_label = |tree: &MenuTree| {
            let d = tree.get(root).unwrap().default_selected()?;
            Some(tree.item(root, d).unwrap().label.to_string())
        };

        tree.set_default_selected(root, Some(2)).unwrap();
        tree.remove(root, 0).unwrap();
        assert_eq!(tree.get(root).unwrap().default_selected(), Some(1));
        assert_eq!(default_label(&tree).as_deref(), Some("c"));

        tree.attach(root, Entry::Item(MenuItem::new("x")), Some(1)).unwrap();
        assert_eq!(default_label(&tree).as_deref(), Some("c"));

        tree.attach(root, Entry::Item(MenuItem::new("y")), None).unwrap();
        assert_eq!(default_label(&tree).as_deref(), Some("c"));

        let position = tree.get(root).unwrap().default_selected().unwrap();
        tree.remove(root, position).unwrap();
        assert_eq!(tree.get(root).unwrap().default_selected(), None);
    }

    #[test]
    fn test_unknown_ids_have_no_open_chain() {
        let tree = tree_with_items(&["a"]);
        let stale = NodeId(7);
        assert_eq!(tree.active_leaf(stale), stale);
        assert!(tree.open_chain(stale).is_empty());
    }

    #[test]
    fn test_active_leaf_follows_open_children() {
        let mut tree = tree_with_items(&[]);
        let root = tree.root();
        let sub = tree.create_node("sub", None, 100.0);
        let leaf = tree.create_node("leaf", None, 100.0);
        tree.attach(root, Entry::Submenu(sub), None).unwrap();
        tree.attach(sub, Entry::Submenu(leaf), None).unwrap();

        assert_eq!(tree.active_leaf(root), root);

        tree.state_mut(root).open = true;
        tree.state_mut(root).active_child = Some(sub);
        tree.state_mut(sub).open = true;
        assert_eq!(tree.active_leaf(root), sub);
        assert_eq!(tree.open_chain(root), vec![root, sub]);

        tree.state_mut(sub).active_child = Some(leaf);
        tree.state_mut(leaf).open = true;
        assert_eq!(tree.active_leaf(root), leaf);
        assert_eq!(tree.open_chain(root), vec![root, sub, leaf]);
    }

    #[test]
    fn test_unknown_node_is_reported() {
        let tree = tree_with_items(&[]);
        let mut other = tree_with_items(&[]);
        let foreign = other.create_node("foreign", None, 100.0);
        assert_eq!(
            tree.get(foreign).map(|n| n.label.clone()),
            Err(MenuError::UnknownNode(foreign))
        );
    }
}
