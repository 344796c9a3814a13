use super::PieMenu;
use crate::config::OpenPolicy;
use crate::dispatch::Button;
use crate::events::MenuEvent;
use crate::geometry::Point;
use crate::timing::{COMMIT_DELAY, Task};
use crate::tree::{Entry, NodeId};

// Handlers for the active leaf. Points are in the leaf's own coordinates.
impl PieMenu {
    pub(crate) fn leaf_pressed(&mut self, node: NodeId, local: Point, _button: Option<Button>) {
        self.tree.state_mut(node).just_opened = false;

        let slice = self.tree.node(node).dial().slice_index(local);
        self.set_selected(node, slice);

        if self.maybe_show_submenu(node, local) {
            self.tree.state_mut(node).can_abort_submenu = true;
        }
    }

    pub(crate) fn leaf_released(&mut self, node: NodeId, local: Point, button: Option<Button>) {
        let state = self.tree.state(node);
        if state.just_opened && self.policy.open_policy == OpenPolicy::TapHold {
            self.tree.state_mut(node).just_opened = false;
            return;
        }
        self.tree.state_mut(node).just_opened = false;

        let state = self.tree.state(node);
        if self.tasks.is_live(state.commit_task) {
            return;
        }

        let dial = self.tree.node(node).dial();
        let triggered = button.is_some_and(|b| self.activates(node, b));
        if !triggered && !state.dragged_in && !dial.contains_outer(local) {
            log::debug!("release outside {node}, canceling");
            self.emit(node, MenuEvent::Canceled(node));
            self.collapse_all(node);
            return;
        }

        let Some(slot) = dial.slice_index(local) else {
            self.emit(node, MenuEvent::Canceled(node));
            self.collapse_descendants(node);
            return;
        };

        self.set_selected(node, Some(slot));
        self.maybe_show_submenu(node, local);
        self.tree.state_mut(node).can_abort_submenu = false;

        if self.submenu_pending_or_open(node) {
            self.start_blink(node);
            return;
        }

        let Some(selected) = self.tree.state(node).selected else {
            return;
        };
        match self.tree.entry(node, selected) {
            Ok(Entry::Item(item)) if item.enabled => {}
            _ => return,
        }

        self.start_blink(node);
        let id = self
            .tasks
            .schedule(Task::Commit { item: selected }, node, local, COMMIT_DELAY);
        self.tree.state_mut(node).commit_task = Some(id);
    }

    pub(crate) fn leaf_dragged(&mut self, node: NodeId, local: Point, button: Option<Button>) {
        let dial = self.tree.node(node).dial();

        if dial.contains_outer(local) {
            self.tree.state_mut(node).dragged_in = true;
        } else if !self.tree.state(node).dragged_in
            && button.is_some_and(|b| !self.activates(node, b))
        {
            // a foreign button outside the circle points at "close"
            self.set_selected(node, None);
            return;
        }

        let slice = dial.slice_index(local);
        let state = self.tree.state(node);
        if state.just_closed_submenu && slice.is_some() && slice == state.submenu_slot {
            return;
        }

        self.set_selected(node, slice);
        if slice.is_none() {
            return;
        }
        self.tree.state_mut(node).just_opened = false;

        if self.policy.relocate_submenus_to_cursor {
            if let Some(id) = self.tree.state(node).submenu_task {
                self.tasks.retarget(id, local);
            }
        }

        if self.policy.auto_open_submenus && self.maybe_show_submenu(node, local) {
            self.tree.state_mut(node).can_abort_submenu = true;
        }
    }

    /// Hovering selects like dragging but never counts as dragging through.
    pub(crate) fn leaf_moved(&mut self, node: NodeId, local: Point) {
        self.leaf_dragged(node, local, None);
        self.tree.state_mut(node).dragged_in = false;
    }
}
