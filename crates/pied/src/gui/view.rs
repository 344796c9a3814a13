use crate::gui::icon::{ICON_SIZE, IconCache};
use crate::gui::theme::ThemeColors;
use cairo::Context;
use gdk4::prelude::*;
use gdk_pixbuf::Pixbuf;
use palette::Srgba;
use piemenu::geometry::{Dial, cartesian};
use piemenu::{Entry, IconName, MenuNode, MenuTree, NodeId, PieMenu, Point};
use std::f64::consts::TAU;

const DISABLED_ALPHA: f64 = 0.4;

/// What a slice shows, taken from the item or from the submenu it opens.
struct Face<'a> {
    label: &'a str,
    icon: Option<&'a IconName>,
    enabled: bool,
}

impl<'a> Face<'a> {
    fn of(tree: &'a MenuTree, entry: &'a Entry) -> Option<Self> {
        match entry {
            Entry::Item(item) => Some(Self {
                label: item.label.as_str(),
                icon: item.icon.as_ref(),
                enabled: item.enabled,
            }),
            Entry::Submenu(child) => tree.get(*child).ok().map(|node| Self {
                label: node.label.as_str(),
                icon: node.icon.as_ref(),
                enabled: node.enabled,
            }),
        }
    }
}

struct NodeRenderer<'a> {
    tree: &'a MenuTree,
    node: &'a MenuNode,
    dial: Dial,
    colors: ThemeColors,
}

impl<'a> NodeRenderer<'a> {
    fn draw(&self, cr: &Context, icons: &IconCache) -> Result<(), cairo::Error> {
        let Some(frame) = self.node.frame() else {
            return Ok(());
        };

        cr.save()?;
        cr.translate(frame.origin.x, frame.origin.y);
        if self.node.appearance.clip {
            cr.arc(self.dial.center.x, self.dial.center.y, self.dial.outer, 0.0, TAU);
            cr.clip();
        }

        self.draw_disc(cr)?;
        if let Some(default) = self.node.default_selected() {
            self.draw_wedge(cr, default, self.colors.default_selected)?;
        }
        if let Some(selected) = self.node.selected() {
            let color = if self.node.is_blink_dimmed() {
                self.colors.dimmed()
            } else {
                self.colors.selected
            };
            self.draw_wedge(cr, selected, color)?;
        }
        self.draw_boundaries(cr)?;
        self.draw_center(cr)?;

        for (index, entry) in self.node.entries().iter().enumerate() {
            if let Some(face) = Face::of(self.tree, entry) {
                self.draw_face(cr, index, &face, icons)?;
            }
        }
        cr.restore()
    }

    fn draw_disc(&self, cr: &Context) -> Result<(), cairo::Error> {
        let Dial { center, outer, .. } = self.dial;
        cr.new_path();
        cr.arc(center.x, center.y, outer - self.line_width(), 0.0, TAU);
        set_color(cr, self.colors.fill);
        cr.fill_preserve()?;
        set_color(cr, self.colors.line);
        cr.set_line_width(self.line_width());
        cr.stroke()
    }

    /// Fills slice `index` between the inner and outer radius.
    fn draw_wedge(
        &self,
        cr: &Context,
        index: usize,
        color: Srgba<f64>,
    ) -> Result<(), cairo::Error> {
        if index >= self.dial.item_count {
            return Ok(());
        }
        let Dial { center, outer, inner, .. } = self.dial;
        let from = self.dial.start_angle() + index as f64 * self.dial.step();
        let to = from + self.dial.step();

        // cairo measures angles clockwise on a y-down surface
        cr.new_path();
        cr.arc_negative(center.x, center.y, outer - self.line_width(), -from, -to);
        cr.arc(center.x, center.y, inner, -to, -from);
        cr.close_path();
        set_color(cr, color);
        cr.fill()
    }

    fn draw_boundaries(&self, cr: &Context) -> Result<(), cairo::Error> {
        if self.dial.item_count < 2 {
            return Ok(());
        }
        set_color(cr, self.colors.line);
        cr.set_line_width(self.line_width());
        for index in 0..self.dial.item_count {
            let angle = self.dial.start_angle() + index as f64 * self.dial.step();
            let from = cartesian(self.dial.center, angle, self.dial.inner);
            let to = cartesian(self.dial.center, angle, self.dial.outer);
            cr.move_to(from.x, from.y);
            cr.line_to(to.x, to.y);
        }
        cr.stroke()
    }

    fn draw_center(&self, cr: &Context) -> Result<(), cairo::Error> {
        let Dial { center, inner, .. } = self.dial;
        if inner <= 0.0 {
            return Ok(());
        }
        cr.new_path();
        cr.arc(center.x, center.y, inner, 0.0, TAU);
        set_color(cr, self.colors.fill);
        cr.fill_preserve()?;
        set_color(cr, self.colors.line);
        cr.set_line_width(self.line_width());
        cr.stroke()
    }

    fn draw_face(
        &self,
        cr: &Context,
        index: usize,
        face: &Face,
        icons: &IconCache,
    ) -> Result<(), cairo::Error> {
        let alpha = if face.enabled { 1.0 } else { DISABLED_ALPHA };
        match face.icon.and_then(|icon| icons.get(icon)) {
            Some(pixbuf) => self.draw_icon(cr, index, &pixbuf, alpha),
            None => self.draw_text(cr, index, face.label, alpha),
        }
    }

    fn slice_anchor(&self, index: usize) -> Point {
        let radius = (self.dial.outer + self.dial.inner) / 2.0;
        self.dial.slice_center(index, radius)
    }

    fn draw_icon(
        &self,
        cr: &Context,
        index: usize,
        pixbuf: &Pixbuf,
        alpha: f64,
    ) -> Result<(), cairo::Error> {
        let span = (self.dial.outer - self.dial.inner) * self.node.appearance.scaling_factor;
        let icon_scale = span / ICON_SIZE as f64;
        let (iw, ih) = (
            pixbuf.width() as f64 * icon_scale,
            pixbuf.height() as f64 * icon_scale,
        );
        let anchor = self.slice_anchor(index);

        cr.save()?;
        cr.translate(anchor.x - iw / 2.0, anchor.y - ih / 2.0);
        cr.scale(icon_scale, icon_scale);
        cr.set_source_pixbuf(pixbuf, 0.0, 0.0);
        cr.paint_with_alpha(alpha)?;
        cr.restore()
    }

    fn draw_text(
        &self,
        cr: &Context,
        index: usize,
        text: &str,
        alpha: f64,
    ) -> Result<(), cairo::Error> {
        let appearance = &self.node.appearance;
        let font = self.colors.font;
        cr.set_source_rgba(font.red, font.green, font.blue, font.alpha * alpha);
        cr.select_font_face(
            &appearance.font_family,
            cairo::FontSlant::Normal,
            cairo::FontWeight::Bold,
        );
        cr.set_font_size(appearance.font_size);
        if let Ok(ext) = cr.text_extents(text) {
            let anchor = self.slice_anchor(index);
            cr.move_to(
                anchor.x - ext.width() / 2.0 - ext.x_bearing(),
                anchor.y + ext.height() / 2.0,
            );
            cr.show_text(text)?;
        }
        Ok(())
    }

    fn line_width(&self) -> f64 {
        self.node.appearance.line_width
    }
}

fn set_color(cr: &Context, color: Srgba<f64>) {
    let (r, g, b, a) = color.into_components();
    cr.set_source_rgba(r, g, b, a);
}

/// Paints every open node of the hierarchy, root first so submenus land on top.
pub fn draw(
    cr: &Context,
    menu: &PieMenu,
    icons: &IconCache,
    colors: impl Fn(&MenuNode) -> ThemeColors,
) -> Result<(), cairo::Error> {
    let tree = menu.tree();
    for id in tree.open_chain(menu.root()) {
        draw_node(cr, tree, id, icons, &colors)?;
    }
    Ok(())
}

fn draw_node(
    cr: &Context,
    tree: &MenuTree,
    id: NodeId,
    icons: &IconCache,
    colors: &impl Fn(&MenuNode) -> ThemeColors,
) -> Result<(), cairo::Error> {
    let Ok(node) = tree.get(id) else {
        return Ok(());
    };
    NodeRenderer {
        tree,
        node,
        dial: node.dial(),
        colors: colors(node),
    }
    .draw(cr, icons)
}
