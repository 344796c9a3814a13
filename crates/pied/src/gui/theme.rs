use gtk::gdk;
use gtk::prelude::*;
use gtk4 as gtk;
use palette::Srgba;
use piemenu::Appearance;

/// Colours a node is painted with.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeColors {
    pub fill: Srgba<f64>,
    pub line: Srgba<f64>,
    pub selected: Srgba<f64>,
    pub default_selected: Srgba<f64>,
    pub font: Srgba<f64>,
}

impl ThemeColors {
    /// The node's own colours, ignoring the GTK theme.
    pub fn from_appearance(appearance: &Appearance) -> Self {
        Self {
            fill: appearance.fill_color,
            line: appearance.line_color,
            selected: appearance.selected_color,
            default_selected: appearance.default_selected_color(),
            font: appearance.font_color,
        }
    }

    /// Theme colours where the theme defines them, the node's otherwise.
    pub fn from_context(context: &gtk::StyleContext, appearance: &Appearance) -> Self {
        let fallback = Self::from_appearance(appearance);
        let selected =
            Self::lookup_color(context, "theme_selected_bg_color", fallback.selected, None);
        Self {
            fill: Self::lookup_color(context, "theme_bg_color", fallback.fill, Some(0.95)),
            line: Self::lookup_color(context, "theme_fg_color", fallback.line, Some(0.35)),
            default_selected: Srgba::new(selected.red, selected.green, selected.blue, 0.5),
            selected,
            font: Self::lookup_color(context, "theme_fg_color", fallback.font, None),
        }
    }

    /// Colour of the selected slice while the commit blink has it dimmed.
    pub fn dimmed(&self) -> Srgba<f64> {
        self.fill
    }

    fn lookup_color(
        context: &gtk::StyleContext,
        name: &str,
        fallback: Srgba<f64>,
        alpha_override: Option<f64>,
    ) -> Srgba<f64> {
        context
            .lookup_color(name)
            .map(|c| {
                let (r, g, b, a) = (
                    c.red() as f64,
                    c.green() as f64,
                    c.blue() as f64,
                    c.alpha() as f64,
                );
                Srgba::new(r, g, b, alpha_override.unwrap_or(a))
            })
            .unwrap_or(fallback)
    }
}

pub fn load_css() {
    let provider = gtk::CssProvider::new();
    let css_data = "
.pied-window, .pied-drawing-area {
    background: none;
    background-color: transparent;
}
";
    provider.load_from_data(css_data);

    if let Some(display) = gdk::Display::default() {
        gtk::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}
