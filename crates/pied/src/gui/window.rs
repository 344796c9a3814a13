use gtk::gdk;
use gtk::prelude::*;
use gtk4 as gtk;
use gtk4_layer_shell::{Edge, Layer, LayerShell};
use piemenu::{Button, Host, Point, Rect};

pub fn get_cursor_position(window: &gtk::ApplicationWindow) -> Option<Point> {
    gdk::Display::default()
        .and_then(|d| d.default_seat())
        .and_then(|s| s.pointer())
        .zip(window.surface())
        .and_then(|(p, s)| s.device_position(&p))
        .map(|(x, y, _)| Point::new(x, y))
}

pub fn init_layer_shell(window: &gtk::ApplicationWindow) {
    window.init_layer_shell();
    window.set_layer(Layer::Overlay);
    window.set_namespace(Some("pied"));
    window.set_exclusive_zone(-1);
    for edge in [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom] {
        window.set_anchor(edge, true);
    }
    window.set_keyboard_mode(gtk4_layer_shell::KeyboardMode::OnDemand);
}

pub fn get_monitor(window: &gtk::ApplicationWindow) -> Option<gdk::Monitor> {
    let display = gdk::Display::default()?;
    let surface = window.surface()?;
    display.monitor_at_surface(&surface)
}

/// Button held during a motion event, if any.
pub fn held_button(state: gdk::ModifierType) -> Option<Button> {
    [
        (gdk::ModifierType::BUTTON1_MASK, Button::Left),
        (gdk::ModifierType::BUTTON2_MASK, Button::Middle),
        (gdk::ModifierType::BUTTON3_MASK, Button::Right),
    ]
    .into_iter()
    .find(|(mask, _)| state.contains(*mask))
    .map(|(_, button)| button)
}

/// The full-screen overlay window as the surface menus are shown on.
///
/// The window is anchored to every edge of its monitor, so its origin is the
/// monitor's origin and overlay coordinates double as screen coordinates.
pub struct OverlayHost<'a> {
    pub window: &'a gtk::ApplicationWindow,
}

impl Host for OverlayHost<'_> {
    fn screen_origin(&self) -> Option<Point> {
        self.window.surface().map(|_| Point::default())
    }

    fn screen_bounds(&self) -> Rect {
        match get_monitor(self.window) {
            Some(monitor) => {
                let geometry = monitor.geometry();
                Rect::new(0.0, 0.0, geometry.width() as f64, geometry.height() as f64)
            }
            None => Rect::new(
                0.0,
                0.0,
                self.window.width() as f64,
                self.window.height() as f64,
            ),
        }
    }
}
