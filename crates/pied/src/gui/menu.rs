use crate::config::{self, Config, EntryConfig, SETUP_COMMAND};
use crate::sys::exec::ExecCommand;
use piemenu::{Appearance, MenuError, MenuItem, MenuNode, NodeId, PieMenu};

/// Root node carrying the configured appearance.
pub fn root_node(config: &Config) -> MenuNode {
    let mut appearance = Appearance::default();
    config.appearance.apply(&mut appearance);

    let mut root = MenuNode::new(config.menu.label.as_str()).with_appearance(appearance);
    root.icon = config.menu.icon.clone();
    root
}

/// Adds every configured entry below the root of `menu`.
pub fn populate(menu: &mut PieMenu, config: &Config) -> Result<(), MenuError> {
    let root = menu.root();
    let base = menu.tree().get(root)?.appearance.clone();
    add_entries(menu, root, &config.menu.items, &base)?;
    menu.set_default_selected(root, config.menu.default_selected)
}

/// Builds a fresh hierarchy from `config` in place of the current one.
pub fn rebuild(menu: &mut PieMenu, config: &Config) -> Result<(), MenuError> {
    menu.reset(root_node(config), config.policy.clone());
    populate(menu, config)
}

fn add_entries(
    menu: &mut PieMenu,
    parent: NodeId,
    entries: &[EntryConfig],
    base: &Appearance,
) -> Result<(), MenuError> {
    for entry in entries {
        if entry.is_submenu() {
            let mut appearance = base.clone();
            if let Some(overrides) = &entry.appearance {
                overrides.apply(&mut appearance);
            }
            let mut node = MenuNode::new(entry.label.as_str()).with_appearance(appearance.clone());
            node.icon = entry.icon.clone();
            node.enabled = entry.enabled;

            let child = menu.insert_node(node);
            add_entries(menu, child, &entry.items, &appearance)?;
            menu.add_submenu(parent, child, None)?;
        } else {
            menu.add(parent, leaf(entry), None)?;
        }
    }
    Ok(())
}

fn leaf(entry: &EntryConfig) -> MenuItem {
    let mut item = MenuItem::new(entry.label.as_str());
    if let Some(icon) = &entry.icon {
        item = item.with_icon(icon.as_str());
    }

    match (&entry.exec, entry.enabled) {
        (Some(exec), true) => {
            let exec = exec.clone();
            item.on_activate(move || run(&exec))
        }
        (None, _) => {
            log::warn!("'{}' has no command, disabling it", entry.label);
            item.disabled()
        }
        (Some(_), false) => item.disabled(),
    }
}

fn run(exec: &ExecCommand) {
    if exec.as_str() == SETUP_COMMAND {
        match config::write_default_config() {
            Ok(path) => {
                let open = format!("xdg-open {}", shell_words::quote(&path.to_string_lossy()));
                if let Err(e) = ExecCommand::new(open).spawn() {
                    log::error!("Failed to open {}: {}", path.display(), e);
                }
            }
            Err(e) => log::error!("Failed to write default config: {}", e),
        }
    } else if let Err(e) = exec.spawn() {
        log::error!("Failed to run '{}': {}", exec, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piemenu::{Entry, ManualClock};

    fn config() -> Config {
        serde_json::from_str(
            r#"{
                "appearance": { "outer_radius": 130.0 },
                "menu": {
                    "default_selected": 1,
                    "items": [
                        { "label": "Terminal", "exec": "foot" },
                        { "label": "System", "appearance": { "inner_radius": 10.0 }, "items": [
                            { "label": "Lock", "exec": "loginctl lock-session" },
                            { "label": "Nested", "items": [ { "label": "Deep", "exec": "true" } ] }
                        ] },
                        { "label": "Broken" },
                        { "label": "Off", "exec": "false", "enabled": false }
                    ]
                }
            }"#,
        )
        .unwrap()
    }

    fn build() -> PieMenu {
        let config = config();
        let mut menu = PieMenu::new(root_node(&config), config.policy.clone(), ManualClock::new());
        populate(&mut menu, &config).unwrap();
        menu
    }

    #[test]
    fn test_tree_mirrors_config() {
        let menu = build();
        let tree = menu.tree();
        let root = tree.get(menu.root()).unwrap();

        assert_eq!(root.item_count(), 4);
        assert_eq!(root.default_selected(), Some(1));
        assert_eq!(root.appearance.outer_radius(), 130.0);

        let Entry::Submenu(system) = &root.entries()[1] else {
            panic!("System should be a submenu");
        };
        let system = tree.get(*system).unwrap();
        assert_eq!(system.label.as_str(), "System");
        assert_eq!(system.item_count(), 2);
        assert_eq!(system.appearance.outer_radius(), 130.0);
        assert_eq!(system.appearance.inner_radius(), 10.0);

        let Entry::Submenu(nested) = &system.entries()[1] else {
            panic!("Nested should be a submenu");
        };
        assert_eq!(tree.get(*nested).unwrap().appearance.inner_radius(), 10.0);
    }

    #[test]
    fn test_entries_without_command_are_disabled() {
        let menu = build();
        let root = menu.root();
        let enabled: Vec<bool> = [0, 2, 3]
            .into_iter()
            .map(|i| menu.tree().item(root, i).unwrap().enabled)
            .collect();
        assert_eq!(enabled, [true, false, false]);
    }

    #[test]
    fn test_rebuild_replaces_entries() {
        let mut menu = build();
        let mut config = config();
        config.menu.items.truncate(1);
        config.menu.default_selected = None;
        rebuild(&mut menu, &config).unwrap();
        assert_eq!(menu.tree().item_count(menu.root()), 1);
    }
}
