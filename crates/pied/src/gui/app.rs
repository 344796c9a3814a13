use crate::config;
use crate::events::{AppEvent, Command};
use crate::gui::icon::IconCache;
use crate::gui::theme::{self, ThemeColors};
use crate::gui::{menu, view, window};
use gtk::prelude::*;
use gtk4 as gtk;
use piemenu::{
    Button, Host, HostRequest, MenuEvent, MenuNode, PieMenu, PointerEvent, PointerKind, TaskId,
};
use relm4::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub struct AppModel {
    pub menu: Rc<RefCell<PieMenu>>,
    pub visible: bool,
    pub theme_colors: Rc<Cell<bool>>,
    pub icons: Rc<IconCache>,
    pub root: gtk::ApplicationWindow,
    pub drawing_area: gtk::DrawingArea,
    size: Option<(i32, i32)>,
}

#[derive(Debug)]
pub enum AppMsg {
    Command(Command),
    Pointer(PointerEvent),
    TimerFired(TaskId),
    Resized(i32, i32),
    MenuClosed,
    ConfigReload,
}

impl From<AppEvent> for AppMsg {
    fn from(event: AppEvent) -> Self {
        match event {
            AppEvent::Command(command) => AppMsg::Command(command),
            AppEvent::ConfigReload => AppMsg::ConfigReload,
        }
    }
}

pub struct AppInit {
    pub menu: PieMenu,
    pub theme_colors: bool,
    pub events: async_channel::Receiver<AppEvent>,
    pub timers: async_channel::Receiver<TaskId>,
}

fn pointer_time(controller: &impl IsA<gtk::EventController>) -> u64 {
    controller.current_event_time() as u64
}

#[relm4::component(pub)]
impl SimpleComponent for AppModel {
    type Init = AppInit;
    type Input = AppMsg;
    type Output = ();

    view! {
        #[root]
        #[name = "window"]
        gtk::ApplicationWindow {
            set_title: Some("Pied"),
            #[watch]
            set_visible: model.visible,
            #[watch]
            set_opacity: if model.visible { 1.0 } else { 0.0 },
            add_css_class: "pied-window",
            set_decorated: false,

            add_controller = gtk::EventControllerKey {
                connect_key_pressed[sender] => move |_, key, _, _| {
                    if key == gtk::gdk::Key::Escape {
                        sender.input(AppMsg::Command(Command::Hide));
                        return glib::Propagation::Stop;
                    }
                    glib::Propagation::Proceed
                }
            },

            #[name = "drawing_area"]
            gtk::DrawingArea {
                set_hexpand: true,
                set_vexpand: true,
                add_css_class: "pied-drawing-area",

                connect_resize[sender] => move |_, width, height| {
                    sender.input(AppMsg::Resized(width, height));
                },

                add_controller = gtk::EventControllerMotion {
                    connect_motion[sender] => move |controller, x, y| {
                        let event = match window::held_button(controller.current_event_state()) {
                            Some(button) => PointerEvent::drag(button, x, y),
                            None => PointerEvent::moved(x, y),
                        };
                        sender.input(AppMsg::Pointer(event.at(pointer_time(controller))));
                    }
                },

                add_controller = gtk::GestureClick {
                    set_button: 0, // Listen to all buttons
                    connect_pressed[sender] => move |gesture, _, x, y| {
                        if let Some(button) = Button::from_number(gesture.current_button()) {
                            let event =
                                PointerEvent::press(button, x, y).at(pointer_time(gesture));
                            sender.input(AppMsg::Pointer(event));
                        }
                    },
                    connect_released[sender] => move |gesture, _, x, y| {
                        if let Some(button) = Button::from_number(gesture.current_button()) {
                            let event =
                                PointerEvent::release(button, x, y).at(pointer_time(gesture));
                            sender.input(AppMsg::Pointer(event));
                        }
                    }
                }
            }
        }
    }

    fn init(
        init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let AppInit {
            menu,
            theme_colors,
            events,
            timers,
        } = init;

        theme::load_css();
        window::init_layer_shell(&root);

        let menu = Rc::new(RefCell::new(menu));
        watch_root(&mut menu.borrow_mut(), &sender);

        let model = AppModel {
            menu: menu.clone(),
            visible: false,
            theme_colors: Rc::new(Cell::new(theme_colors)),
            icons: Rc::new(IconCache::default()),
            root: root.clone(),
            drawing_area: gtk::DrawingArea::default(),
            size: None,
        };

        let widgets = view_output!();

        let mut model = model;
        model.drawing_area = widgets.drawing_area.clone();

        let menu_draw = model.menu.clone();
        let icons = model.icons.clone();
        let use_theme = model.theme_colors.clone();
        widgets
            .drawing_area
            .set_draw_func(move |drawing_area, cr, _, _| {
                let style_context = drawing_area.style_context();
                let colors = |node: &MenuNode| {
                    if use_theme.get() {
                        ThemeColors::from_context(&style_context, &node.appearance)
                    } else {
                        ThemeColors::from_appearance(&node.appearance)
                    }
                };
                if let Err(e) = view::draw(cr, &menu_draw.borrow(), &icons, colors) {
                    log::error!("Drawing error: {}", e);
                }
            });

        let sender_clone = sender.clone();
        relm4::spawn(async move {
            while let Ok(event) = events.recv().await {
                sender_clone.input(AppMsg::from(event));
            }
        });

        let sender_clone = sender.clone();
        relm4::spawn(async move {
            while let Ok(id) = timers.recv().await {
                sender_clone.input(AppMsg::TimerFired(id));
            }
        });

        root.set_visible(false);

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>) {
        match msg {
            AppMsg::Command(Command::Show) => {
                self.raise();
                let host = window::OverlayHost { window: &self.root };
                let cursor = window::get_cursor_position(&self.root)
                    .unwrap_or_else(|| host.screen_bounds().center());
                if let Err(e) = self.menu.borrow_mut().show_now(&host, cursor.x, cursor.y) {
                    log::error!("Failed to show menu: {}", e);
                    self.visible = false;
                }
            }
            AppMsg::Command(Command::Arm) => self.raise(),
            AppMsg::Command(Command::Hide) => {
                self.menu.borrow_mut().hide();
                self.visible = false;
            }
            AppMsg::Pointer(event) => {
                if !self.visible {
                    return;
                }
                let host = window::OverlayHost { window: &self.root };
                let mut menu = self.menu.borrow_mut();
                if let Err(e) = menu.handle_pointer(&host, event) {
                    log::error!("Failed to handle {} event: {}", event.kind, e);
                }
                // a gesture that ended without opening anything drops the overlay
                if event.kind == PointerKind::Release
                    && !menu.is_open(menu.root())
                    && menu.pending_tasks() == 0
                {
                    self.visible = false;
                }
            }
            AppMsg::TimerFired(id) => self.menu.borrow_mut().fire(id),
            AppMsg::Resized(width, height) => {
                let previous = self.size.replace((width, height));
                if previous.is_some_and(|size| size != (width, height)) {
                    self.menu.borrow_mut().host_resized();
                }
            }
            AppMsg::MenuClosed => {
                self.visible = false;
            }
            AppMsg::ConfigReload => match config::load_config() {
                Ok(new_config) => {
                    let mut pie = self.menu.borrow_mut();
                    match menu::rebuild(&mut pie, &new_config) {
                        Ok(()) => {
                            watch_root(&mut pie, &sender);
                            self.theme_colors.set(new_config.theme_colors);
                            self.icons.clear();
                            log::info!("Configuration reloaded");
                        }
                        Err(e) => log::error!("Failed to rebuild menu: {}", e),
                    }
                }
                Err(e) => log::error!("Failed to reload config: {}", e),
            },
        }
        self.sync();
    }
}

impl AppModel {
    fn raise(&mut self) {
        self.visible = true;
        self.root.set_visible(true);
    }

    /// Applies the menu's pending host work. The whole overlay is one
    /// surface, so every request ends in a redraw.
    fn sync(&self) {
        let requests = self.menu.borrow_mut().take_requests();
        for request in &requests {
            match request {
                HostRequest::Insert { node, frame } => log::trace!("insert {node} at {frame:?}"),
                HostRequest::Remove { node } => log::trace!("remove {node}"),
                HostRequest::Repaint { .. } => {}
            }
        }
        if !requests.is_empty() {
            self.drawing_area.queue_draw();
        }
    }
}

/// Drops the overlay once the root menu goes away.
fn watch_root(menu: &mut PieMenu, sender: &ComponentSender<AppModel>) {
    let root = menu.root();
    let sender = sender.clone();
    let watched = menu.add_listener(root, move |event| {
        if matches!(event, MenuEvent::AboutToHide(node) if *node == root) {
            sender.input(AppMsg::MenuClosed);
        }
    });
    if let Err(e) = watched {
        log::error!("Failed to watch {}: {}", root, e);
    }
}
