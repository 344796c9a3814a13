pub mod app;
pub mod icon;
pub mod menu;
pub mod theme;
pub mod view;
pub mod window;
