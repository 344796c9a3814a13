use crate::config::OpenPolicy;
use crate::error::MenuError;
use crate::geometry::{Point, Rect};
use crate::menu::PieMenu;
use crate::tree::NodeId;
use serde::Serialize;
use serde_with::DeserializeFromStr;
use strum::{Display as StrumDisplay, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    DeserializeFromStr,
    EnumString,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Button {
    Left,
    Middle,
    Right,
}

impl Button {
    /// Maps X11/GDK button numbers.
    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            1 => Some(Self::Left),
            2 => Some(Self::Middle),
            3 => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
pub enum PointerKind {
    Press,
    Release,
    Move,
    /// Motion with a button held.
    Drag,
}

/// Pointer input in host-widget coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub button: Option<Button>,
    pub position: Point,
    pub time_ms: u64,
}

impl PointerEvent {
    pub fn press(button: Button, x: f64, y: f64) -> Self {
        Self::new(PointerKind::Press, Some(button), x, y)
    }

    pub fn release(button: Button, x: f64, y: f64) -> Self {
        Self::new(PointerKind::Release, Some(button), x, y)
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::new(PointerKind::Move, None, x, y)
    }

    pub fn drag(button: Button, x: f64, y: f64) -> Self {
        Self::new(PointerKind::Drag, Some(button), x, y)
    }

    pub fn at(mut self, time_ms: u64) -> Self {
        self.time_ms = time_ms;
        self
    }

    fn new(kind: PointerKind, button: Option<Button>, x: f64, y: f64) -> Self {
        Self {
            kind,
            button,
            position: Point::new(x, y),
            time_ms: 0,
        }
    }
}

/// The widget a menu is shown on.
pub trait Host {
    /// Screen position of the widget's origin; `None` when the widget is not
    /// realized on a screen.
    fn screen_origin(&self) -> Option<Point>;
    fn screen_bounds(&self) -> Rect;
}

/// Where the hierarchy is currently attached. Only exists while shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostAttachment {
    pub origin: Point,
    pub screen: Rect,
}

impl HostAttachment {
    pub fn resolve(host: &dyn Host) -> Result<Self, MenuError> {
        let origin = host.screen_origin().ok_or(MenuError::UnsupportedHost)?;
        Ok(Self {
            origin,
            screen: host.screen_bounds(),
        })
    }
}

/// Work for the host: place, drop or redraw a node's surface at a screen frame.
#[derive(Debug, Clone, PartialEq)]
pub enum HostRequest {
    Insert { node: NodeId, frame: Rect },
    Remove { node: NodeId },
    Repaint { node: NodeId, frame: Rect },
}

impl HostRequest {
    pub fn node(&self) -> NodeId {
        match self {
            Self::Insert { node, .. } | Self::Remove { node } | Self::Repaint { node, .. } => *node,
        }
    }
}

/// Trigger-button state while no menu is visible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gesture {
    pub pressed_at: Point,
    pub travel_x: f64,
    pub travel_y: f64,
    pub trigger_down: bool,
}

impl Gesture {
    pub fn begin(&mut self, at: Point) {
        *self = Self {
            pressed_at: at,
            trigger_down: true,
            ..Self::default()
        };
    }

    /// Remembers the farthest travel along each axis since the press.
    pub fn track(&mut self, at: Point) {
        self.travel_x = self.travel_x.max((at.x - self.pressed_at.x).abs());
        self.travel_y = self.travel_y.max((at.y - self.pressed_at.y).abs());
    }

    pub fn travelled_too_far(&self, inner: f64) -> bool {
        self.travel_x * self.travel_x + self.travel_y * self.travel_y > inner * inner
    }
}

impl PieMenu {
    /// Entry point for pointer input on the host widget.
    ///
    /// While the menu is closed the host's own gestures arm and open it;
    /// once open, events are routed to the deepest open submenu only.
    pub fn handle_pointer(
        &mut self,
        host: &dyn Host,
        event: PointerEvent,
    ) -> Result<(), MenuError> {
        let root = self.tree.root();
        let open = self.tree.state(root).open;
        if open {
            let origin = host.screen_origin().ok_or(MenuError::UnsupportedHost)?;
            if let Some(attachment) = self.attachment.as_mut() {
                attachment.origin = origin;
            }
        }

        match event.kind {
            PointerKind::Press => self.host_pressed(host, event),
            PointerKind::Move | PointerKind::Drag => {
                self.buffered = Some(event);
                if open {
                    self.forward(event);
                } else {
                    self.armed_motion(event);
                }
                Ok(())
            }
            PointerKind::Release => self.host_released(host, event),
        }
    }

    fn host_pressed(&mut self, host: &dyn Host, event: PointerEvent) -> Result<(), MenuError> {
        let root = self.tree.root();
        self.buffered = None;
        let open = self.tree.state(root).open;

        if open {
            if let Some(node) = self.open_node_at(event.position) {
                self.tree.state_mut(node).just_opened = false;
                self.forward(event);
                return Ok(());
            }
        }

        if event.button.is_some_and(|b| self.activates(root, b)) {
            self.gesture.begin(event.position);
            self.tree.state_mut(root).just_opened = false;
            if !open {
                match self.policy.open_policy {
                    OpenPolicy::Drag => {
                        self.show_now(host, event.position.x, event.position.y)?;
                    }
                    OpenPolicy::TapHold => {
                        self.show(host, event.position.x, event.position.y)?;
                    }
                    OpenPolicy::Tap => {}
                }
            }
        } else if open {
            let leaf = self.tree.active_leaf(root);
            self.set_selected(leaf, None);
        }
        Ok(())
    }

    fn armed_motion(&mut self, event: PointerEvent) {
        let root = self.tree.root();
        let show_task = self.tree.state(root).show_task;
        let delayed = matches!(self.policy.open_policy, OpenPolicy::Tap | OpenPolicy::TapHold);

        if delayed {
            if let Some(id) = show_task {
                self.tasks.retarget(id, event.position);
            }
        }
        if !self.gesture.trigger_down {
            return;
        }
        self.gesture.track(event.position);

        let inner = self.tree.node(root).appearance.inner_radius();
        if delayed && self.gesture.travelled_too_far(inner) && show_task.is_some() {
            log::debug!("pointer left the tap zone, not opening");
            self.abort_show();
        }
    }

    fn host_released(&mut self, host: &dyn Host, event: PointerEvent) -> Result<(), MenuError> {
        let root = self.tree.root();
        self.buffered = Some(event);

        let is_trigger = event.button.is_some_and(|b| self.activates(root, b));
        let was_down = self.gesture.trigger_down;
        if is_trigger {
            self.gesture.trigger_down = false;
        }

        if !self.tree.state(root).open {
            if is_trigger && was_down {
                self.gesture.track(event.position);
                let inner = self.tree.node(root).appearance.inner_radius();
                match self.policy.open_policy {
                    OpenPolicy::Tap if !self.gesture.travelled_too_far(inner) => {
                        self.buffered = None;
                        self.show(host, event.position.x, event.position.y)?;
                    }
                    OpenPolicy::TapHold => self.abort_show(),
                    _ => {}
                }
            }
            return Ok(());
        }

        if self.policy.open_policy == OpenPolicy::TapHold && self.tree.state(root).just_opened {
            // the release that ends the hold only reveals the menu
            self.tree.state_mut(root).just_opened = false;
            return Ok(());
        }

        self.forward(event);
        Ok(())
    }

    /// Deepest open node whose circle contains a host-space point.
    fn open_node_at(&self, position: Point) -> Option<NodeId> {
        let attachment = self.attachment?;
        let screen = position + attachment.origin;
        self.tree
            .open_chain(self.tree.root())
            .into_iter()
            .rev()
            .find(|&node| {
                self.tree.state(node).frame.is_some_and(|frame| {
                    let local = screen - frame.origin;
                    self.tree.node(node).dial().contains_outer(local)
                })
            })
    }

    /// Translates a host-space event to the active leaf and delivers it there.
    pub(crate) fn forward(&mut self, event: PointerEvent) {
        let Some(attachment) = self.attachment else {
            return;
        };
        let leaf = self.tree.active_leaf(self.tree.root());
        let Some(frame) = self.tree.state(leaf).frame else {
            return;
        };
        let local = event.position + attachment.origin - frame.origin;

        match event.kind {
            PointerKind::Press => self.leaf_pressed(leaf, local, event.button),
            PointerKind::Release => self.leaf_released(leaf, local, event.button),
            PointerKind::Drag => self.leaf_dragged(leaf, local, event.button),
            PointerKind::Move => self.leaf_moved(leaf, local),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_parsing() {
        let cases = vec![
            ("\"left\"", Button::Left),
            ("\"RIGHT\"", Button::Right),
            ("\"Middle\"", Button::Middle),
        ];
        for (json, expected) in cases {
            let parsed: Button = serde_json::from_str(json).unwrap();
            assert_eq!(parsed, expected);
        }
        assert_eq!(Button::from_number(3), Some(Button::Right));
        assert_eq!(Button::from_number(8), None);
        assert_eq!(Button::Left.to_string(), "left");
    }

    #[test]
    fn test_gesture_tracks_farthest_travel() {
        let mut gesture = Gesture::default();
        gesture.begin(Point::new(100.0, 100.0));
        gesture.track(Point::new(112.0, 95.0));
        gesture.track(Point::new(101.0, 115.0));
        assert_eq!(gesture.travel_x, 12.0);
        assert_eq!(gesture.travel_y, 15.0);
        assert!(!gesture.travelled_too_far(20.0));

        gesture.track(Point::new(100.0, 118.0));
        assert!(gesture.travelled_too_far(20.0));
    }

    #[test]
    fn test_begin_resets_travel() {
        let mut gesture = Gesture::default();
        gesture.begin(Point::new(0.0, 0.0));
        gesture.track(Point::new(50.0, 50.0));
        gesture.begin(Point::new(10.0, 10.0));
        assert_eq!(gesture.travel_x, 0.0);
        assert!(gesture.trigger_down);
    }

    struct Detached;

    impl Host for Detached {
        fn screen_origin(&self) -> Option<Point> {
            None
        }

        fn screen_bounds(&self) -> Rect {
            Rect::new(0.0, 0.0, 800.0, 600.0)
        }
    }

    #[test]
    fn test_unrealized_host_is_unsupported() {
        assert_eq!(
            HostAttachment::resolve(&Detached),
            Err(MenuError::UnsupportedHost)
        );
    }
}
