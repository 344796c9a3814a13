//! The pie menu controller: owns the node arena, the pending timers and the
//! host outbox, and drives every node through its open/close lifecycle.

mod handler;

use crate::config::{Appearance, Policy};
use crate::dispatch::{
    Button, Gesture, Host, HostAttachment, HostRequest, PointerEvent, PointerKind,
};
use crate::error::MenuError;
use crate::events::{ListenerId, MenuEvent};
use crate::geometry::{Point, Rect, clamp_center};
use crate::timing::{BLINK_PERIOD, BLINK_TOGGLES, Blink, Scheduler, Task, TaskId, TaskQueue};
use crate::tree::{Entry, IconName, MenuItem, MenuNode, MenuTree, NodeId, NodeState};
use std::time::Duration;
use strum::Display as StrumDisplay;

/// Where a node is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
pub enum MenuState {
    Closed,
    /// The trigger is down or a delayed show is pending.
    Armed,
    Open,
    SubmenuPending,
    SubmenuOpen,
}

pub struct PieMenu {
    pub(crate) tree: MenuTree,
    pub(crate) policy: Policy,
    pub(crate) tasks: TaskQueue,
    pub(crate) attachment: Option<HostAttachment>,
    pub(crate) gesture: Gesture,
    /// Latest motion or release, replayed when a delayed show fires.
    pub(crate) buffered: Option<PointerEvent>,
    pub(crate) selection_locked: bool,
    requests: Vec<HostRequest>,
    next_listener: u64,
}

impl PieMenu {
    pub fn new(root: MenuNode, policy: Policy, scheduler: impl Scheduler + 'static) -> Self {
        Self {
            tree: MenuTree::new(root),
            policy,
            tasks: TaskQueue::new(Box::new(scheduler)),
            attachment: None,
            gesture: Gesture::default(),
            buffered: None,
            selection_locked: false,
            requests: Vec::new(),
            next_listener: 0,
        }
    }

    /// Hides everything and starts over with a fresh hierarchy. Pending
    /// timers are aborted and task ids keep counting, so late deliveries for
    /// the old tree are ignored.
    pub fn reset(&mut self, root: MenuNode, policy: Policy) {
        self.hide();
        self.tree = MenuTree::new(root);
        self.policy = policy;
        self.requests.clear();
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn tree(&self) -> &MenuTree {
        &self.tree
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn attachment(&self) -> Option<HostAttachment> {
        self.attachment
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.live_count()
    }

    pub fn create_node(
        &mut self,
        label: impl Into<String>,
        icon: Option<IconName>,
        radius: f64,
    ) -> NodeId {
        self.tree.create_node(label, icon, radius)
    }

    pub fn insert_node(&mut self, node: MenuNode) -> NodeId {
        self.tree.insert(node)
    }

    pub fn appearance_mut(&mut self, node: NodeId) -> Result<&mut Appearance, MenuError> {
        Ok(&mut self.tree.get_mut(node)?.appearance)
    }

    pub fn set_trigger_button(
        &mut self,
        node: NodeId,
        button: Option<Button>,
    ) -> Result<(), MenuError> {
        self.tree.get_mut(node)?.trigger = button;
        Ok(())
    }

    pub fn set_default_selected(
        &mut self,
        node: NodeId,
        position: Option<usize>,
    ) -> Result<(), MenuError> {
        self.tree.set_default_selected(node, position)
    }

    pub fn add(
        &mut self,
        parent: NodeId,
        item: MenuItem,
        position: Option<usize>,
    ) -> Result<usize, MenuError> {
        self.tree.attach(parent, Entry::Item(item), position)
    }

    pub fn add_submenu(
        &mut self,
        parent: NodeId,
        child: NodeId,
        position: Option<usize>,
    ) -> Result<usize, MenuError> {
        self.tree.attach(parent, Entry::Submenu(child), position)
    }

    /// Removes an entry. A removed submenu is closed first; an open parent
    /// loses its selection since slice indices shift.
    pub fn remove(&mut self, parent: NodeId, position: usize) -> Result<Entry, MenuError> {
        if let Entry::Submenu(child) = self.tree.entry(parent, position)? {
            let child = *child;
            if self.tree.state(child).open {
                self.close_node(child);
            }
        }

        if self.tree.state(parent).open {
            if let Some(id) = self.tree.state_mut(parent).submenu_task.take() {
                self.abort_task(id);
            }
            let state = self.tree.state_mut(parent);
            state.submenu_slot = None;
            state.selected = None;
            self.repaint(parent);
        }

        self.tree.remove(parent, position)
    }

    /// Shows the root at `(x, y)` in host coordinates after the policy's
    /// initial delay.
    pub fn show(&mut self, host: &dyn Host, x: f64, y: f64) -> Result<(), MenuError> {
        let anchor = HostAttachment::resolve(host)?;
        let root = self.tree.root();
        if let Some(id) = self.tree.state_mut(root).show_task.take() {
            self.abort_task(id);
        }
        let id = self.tasks.schedule(
            Task::ShowMenu { anchor },
            root,
            Point::new(x, y),
            self.policy.initial_delay(),
        );
        self.tree.state_mut(root).show_task = Some(id);
        Ok(())
    }

    pub fn show_now(&mut self, host: &dyn Host, x: f64, y: f64) -> Result<(), MenuError> {
        let anchor = HostAttachment::resolve(host)?;
        let root = self.tree.root();
        if let Some(id) = self.tree.state_mut(root).show_task.take() {
            self.abort_task(id);
        }
        self.open_root(anchor, Point::new(x, y));
        Ok(())
    }

    /// Cancels a delayed show. Nothing was attached yet, so nothing is undone.
    pub fn abort_show(&mut self) {
        let root = self.tree.root();
        if let Some(id) = self.tree.state_mut(root).show_task.take() {
            self.abort_task(id);
        }
    }

    pub fn hide(&mut self) {
        let root = self.tree.root();
        self.abort_show();
        self.gesture = Gesture::default();
        let leaf = self.tree.active_leaf(root);
        self.collapse_all(leaf);
    }

    /// The host changed size or moved between screens; open menus would be
    /// misplaced, so everything is hidden.
    pub fn host_resized(&mut self) {
        if self.tree.state(self.tree.root()).open {
            log::debug!("host resized, hiding menus");
        }
        self.hide();
    }

    /// Runs a task whose delay has elapsed. Unknown or aborted ids are ignored.
    pub fn fire(&mut self, id: TaskId) {
        let Some(pending) = self.tasks.get(id) else {
            log::debug!("{id} is no longer pending");
            return;
        };
        let owner = pending.owner;

        if !matches!(pending.task, Task::Blink) && self.tree.state(owner).blink.is_some() {
            let awaiting = &mut self.tree.state_mut(owner).awaiting_blink;
            if !awaiting.contains(&id) {
                log::debug!("deferring {id} until {owner} stops blinking");
                awaiting.push(id);
            }
            return;
        }

        let Some(task) = self.tasks.take_fired(id) else {
            return;
        };
        self.tree.state_mut(owner).awaiting_blink.retain(|t| *t != id);

        match task.task {
            Task::ShowMenu { anchor } => self.fire_show(anchor, task.target),
            Task::ShowSubmenu { child } => self.fire_show_submenu(owner, id, child, task.target),
            Task::Commit { item } => self.fire_commit(owner, id, item),
            Task::Blink => self.blink_tick(owner, id),
        }
    }

    /// Drains the pending insert/remove/repaint work for the host.
    pub fn take_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn add_listener(
        &mut self,
        node: NodeId,
        listener: impl FnMut(&MenuEvent) + 'static,
    ) -> Result<ListenerId, MenuError> {
        let id = ListenerId(self.next_listener);
        self.tree.get_mut(node)?.listeners.push((id, Box::new(listener)));
        self.next_listener += 1;
        Ok(id)
    }

    pub fn remove_listener(&mut self, node: NodeId, id: ListenerId) -> bool {
        let Ok(node) = self.tree.get_mut(node) else {
            return false;
        };
        let before = node.listeners.len();
        node.listeners.retain(|(listener, _)| *listener != id);
        node.listeners.len() != before
    }

    pub fn state(&self, node: NodeId) -> MenuState {
        if !self.tree.contains(node) {
            return MenuState::Closed;
        }
        let state = self.tree.state(node);
        if state.open {
            if state.active_child.is_some() {
                MenuState::SubmenuOpen
            } else if self.tasks.is_live(state.submenu_task) {
                MenuState::SubmenuPending
            } else {
                MenuState::Open
            }
        } else if node == self.tree.root()
            && (self.tasks.is_live(state.show_task) || self.gesture.trigger_down)
        {
            MenuState::Armed
        } else {
            MenuState::Closed
        }
    }

    pub fn is_open(&self, node: NodeId) -> bool {
        self.tree.get(node).is_ok_and(|n| n.is_open())
    }

    pub fn selected(&self, node: NodeId) -> Option<usize> {
        self.tree.get(node).ok().and_then(|n| n.selected())
    }

    pub fn frame(&self, node: NodeId) -> Option<Rect> {
        self.tree.get(node).ok().and_then(|n| n.frame())
    }

    pub fn blink_highlight(&self, node: NodeId) -> bool {
        self.tree.get(node).is_ok_and(|n| n.is_blink_dimmed())
    }

    pub fn active_leaf(&self) -> NodeId {
        self.tree.active_leaf(self.tree.root())
    }

    /// Closes `node` and everything opened below it. Unknown ids are ignored.
    pub fn collapse_descendants(&mut self, node: NodeId) {
        if self.tree.contains(node) {
            self.close_node(node);
        }
    }

    /// Closes every node from the top of the hierarchy down to `node`.
    pub fn collapse_ancestors(&mut self, node: NodeId) {
        if !self.tree.contains(node) {
            return;
        }
        if let Some(parent) = self.tree.parent(node) {
            self.collapse_ancestors(parent);
        }
        self.close_node(node);
    }

    pub fn collapse_all(&mut self, node: NodeId) {
        self.collapse_ancestors(node);
        self.collapse_descendants(node);
    }

    pub(crate) fn activates(&self, node: NodeId, button: Button) -> bool {
        self.tree.node(node).trigger.unwrap_or(self.policy.trigger_button) == button
    }

    fn open_root(&mut self, anchor: HostAttachment, at: Point) {
        let root = self.tree.root();
        if self.tree.state(root).open {
            self.collapse_all(root);
        }
        self.attachment = Some(anchor);
        let radius = self.tree.node(root).appearance.outer_radius();
        let center = clamp_center(anchor.origin + at, radius, anchor.screen);
        self.open_node(root, center);
    }

    fn open_node(&mut self, node: NodeId, center: Point) {
        let stale: Vec<TaskId> = self.tree.state(node).owned_tasks().collect();
        for id in stale {
            self.tasks.abort(id);
        }

        let frame = Rect::around(center, self.tree.node(node).appearance.outer_radius());
        *self.tree.state_mut(node) = NodeState {
            open: true,
            frame: Some(frame),
            can_abort_submenu: true,
            just_opened: true,
            ..NodeState::default()
        };
        log::debug!("opening {node} at {frame:?}");
        self.requests.push(HostRequest::Insert { node, frame });
        self.emit(node, MenuEvent::AboutToShow(node));
        self.selection_locked = false;
    }

    fn close_node(&mut self, node: NodeId) {
        if let Some(child) = self.tree.state(node).active_child {
            self.close_node(child);
        }

        let state = std::mem::take(self.tree.state_mut(node));
        for id in state.owned_tasks() {
            self.abort_task(id);
        }

        if state.open {
            log::debug!("closing {node}");
            self.emit(node, MenuEvent::AboutToHide(node));
            self.requests.push(HostRequest::Remove { node });
            if let Some(parent) = self.tree.parent(node) {
                let parent = self.tree.state_mut(parent);
                if parent.active_child == Some(node) {
                    parent.active_child = None;
                    parent.just_closed_submenu = true;
                }
            }
        }

        if node == self.tree.root() {
            self.attachment = None;
            self.buffered = None;
        }
        self.selection_locked = false;
    }

    /// Nothing to undo: a submenu only opens once its task has left the queue.
    fn abort_task(&mut self, id: TaskId) {
        self.tasks.abort(id);
    }

    fn fire_show(&mut self, anchor: HostAttachment, at: Point) {
        let root = self.tree.root();
        self.tree.state_mut(root).show_task = None;
        let replay = self.buffered.take();
        self.open_root(anchor, at);

        if let Some(event) = replay.filter(|e| e.kind != PointerKind::Press) {
            log::debug!("replaying {} into {root}", event.kind);
            self.forward(event);
        }
    }

    fn fire_show_submenu(&mut self, owner: NodeId, id: TaskId, child: NodeId, target: Point) {
        let state = self.tree.state(owner);
        if state.submenu_task != Some(id) || !state.open {
            return;
        }
        let previous = state.active_child;
        let Some(frame) = state.frame else {
            return;
        };
        let Some(attachment) = self.attachment else {
            return;
        };
        self.tree.state_mut(owner).submenu_task = None;

        if !self.tree.node(child).enabled || self.tree.state(child).open {
            return;
        }
        if let Some(previous) = previous {
            self.close_node(previous);
        }

        let radius = self.tree.node(child).appearance.outer_radius();
        let center = clamp_center(frame.origin + target, radius, attachment.screen);
        self.open_node(child, center);

        let state = self.tree.state_mut(owner);
        state.active_child = Some(child);
        state.dragged_in = false;
        state.just_closed_submenu = false;
    }

    fn fire_commit(&mut self, owner: NodeId, id: TaskId, item: usize) {
        if self.tree.state(owner).commit_task != Some(id) {
            return;
        }
        self.tree.state_mut(owner).commit_task = None;

        let event = match self.tree.entry_mut(owner, item) {
            Some(Entry::Item(entry)) if entry.enabled => {
                log::debug!("activating {} in {owner}", entry.label);
                entry.activate();
                MenuEvent::Activated {
                    node: owner,
                    item,
                    label: entry.label.clone(),
                }
            }
            _ => MenuEvent::Canceled(owner),
        };
        self.emit(owner, event);
        self.collapse_all(owner);
    }

    pub(crate) fn start_blink(&mut self, node: NodeId) {
        if let Some(previous) = self.tree.state_mut(node).blink.take() {
            self.tasks.abort(previous.task);
        }
        self.selection_locked = true;
        let task = self
            .tasks
            .schedule(Task::Blink, node, Point::default(), Duration::ZERO);
        self.tree.state_mut(node).blink = Some(Blink {
            task,
            toggles: 0,
            dimmed: false,
        });
    }

    fn blink_tick(&mut self, node: NodeId, id: TaskId) {
        let Some(blink) = self.tree.state_mut(node).blink.as_mut() else {
            return;
        };
        if blink.task != id {
            return;
        }
        if blink.toggles >= BLINK_TOGGLES {
            self.finish_blink(node);
            return;
        }
        blink.toggles += 1;
        blink.dimmed = !blink.dimmed;

        let next = self
            .tasks
            .schedule(Task::Blink, node, Point::default(), BLINK_PERIOD);
        if let Some(blink) = self.tree.state_mut(node).blink.as_mut() {
            blink.task = next;
        }
        self.repaint(node);
    }

    /// Ends the blink and resumes whatever came due while it ran.
    fn finish_blink(&mut self, node: NodeId) {
        let state = self.tree.state_mut(node);
        state.blink = None;
        let awaiting = std::mem::take(&mut state.awaiting_blink);
        if !self.tasks.is_live(self.tree.state(node).commit_task) {
            self.selection_locked = false;
        }
        self.repaint(node);
        for id in awaiting {
            self.fire(id);
        }
    }

    /// Changes the highlighted slice. Re-selecting the current slice, a locked
    /// selection or a committed pending submenu leave it unchanged.
    pub(crate) fn set_selected(&mut self, node: NodeId, selected: Option<usize>) {
        if self.selection_locked {
            return;
        }
        let selected = selected.filter(|&i| i < self.tree.item_count(node));
        let state = self.tree.state(node);
        if state.selected == selected {
            return;
        }
        if self.tasks.is_live(state.submenu_task) && !state.can_abort_submenu {
            return;
        }

        self.abort_submenu(node);
        let state = self.tree.state_mut(node);
        state.selected = selected;
        state.just_closed_submenu = false;
        self.repaint(node);
    }

    fn abort_submenu(&mut self, node: NodeId) {
        let state = self.tree.state(node);
        if !state.can_abort_submenu {
            return;
        }
        let child = state.active_child;
        if let Some(id) = self.tree.state_mut(node).submenu_task.take() {
            self.abort_task(id);
        }
        if let Some(child) = child {
            self.close_node(child);
        }
    }

    /// Schedules the submenu under `local` if there is one and nothing is
    /// pending or open yet. Returns whether a new task was scheduled.
    pub(crate) fn maybe_show_submenu(&mut self, node: NodeId, local: Point) -> bool {
        let dial = self.tree.node(node).dial();
        let Some(slot) = dial.slice_index(local) else {
            return false;
        };
        let state = self.tree.state(node);
        if self.tasks.is_live(state.submenu_task) || state.active_child.is_some() {
            return false;
        }
        let Ok(Entry::Submenu(child)) = self.tree.entry(node, slot) else {
            return false;
        };
        let child = *child;
        if self.tree.state(child).open {
            return false;
        }
        self.tree.state_mut(node).submenu_slot = Some(slot);
        if !self.tree.node(child).enabled {
            return false;
        }

        let target = if self.policy.relocate_submenus_to_cursor {
            local
        } else {
            let appearance = &self.tree.node(node).appearance;
            dial.slice_center(slot, appearance.outer_radius() * appearance.scaling_factor)
        };
        let id = self.tasks.schedule(
            Task::ShowSubmenu { child },
            node,
            target,
            self.policy.submenu_delay(),
        );
        self.tree.state_mut(node).submenu_task = Some(id);
        true
    }

    pub(crate) fn submenu_pending_or_open(&self, node: NodeId) -> bool {
        let state = self.tree.state(node);
        self.tasks.is_live(state.submenu_task) || state.active_child.is_some()
    }

    fn repaint(&mut self, node: NodeId) {
        if let Some(frame) = self.tree.state(node).frame {
            self.requests.push(HostRequest::Repaint { node, frame });
        }
    }

    /// Listeners are moved out for the duration of the dispatch.
    pub(crate) fn emit(&mut self, node: NodeId, event: MenuEvent) {
        let mut listeners = std::mem::take(&mut self.tree.node_mut(node).listeners);
        for (_, listener) in listeners.iter_mut() {
            listener(&event);
        }
        let node = self.tree.node_mut(node);
        listeners.append(&mut node.listeners);
        node.listeners = listeners;
    }
}

impl std::fmt::Debug for PieMenu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PieMenu")
            .field("tree", &self.tree)
            .field("policy", &self.policy)
            .field("tasks", &self.tasks)
            .field("attachment", &self.attachment)
            .finish_non_exhaustive()
    }
}
