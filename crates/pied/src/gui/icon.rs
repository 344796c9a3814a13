use freedesktop_icons::lookup;
use gdk_pixbuf::Pixbuf;
use parking_lot::RwLock;
use piemenu::IconName;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const ICON_SIZE: i32 = 128;

static PATHS: OnceLock<RwLock<HashMap<IconName, Option<PathBuf>>>> = OnceLock::new();

/// Resolves an icon name or absolute path, remembering misses too.
pub fn find_icon_path(icon_name: &IconName) -> Option<PathBuf> {
    if icon_name.is_empty() {
        return None;
    }

    let cache = PATHS.get_or_init(|| RwLock::new(HashMap::new()));
    if let Some(found) = cache.read().get(icon_name) {
        return found.clone();
    }

    let path = Path::new(icon_name.as_str());
    let found = if path.is_absolute() {
        path.exists().then(|| path.to_path_buf())
    } else {
        lookup(icon_name.as_str())
            .with_size(ICON_SIZE as u16)
            .with_scale(1)
            .find()
    };
    if found.is_none() {
        log::debug!("no icon found for '{}'", icon_name);
    }
    cache.write().insert(icon_name.clone(), found.clone());
    found
}

/// Decoded icons, owned by the GTK thread.
#[derive(Default)]
pub struct IconCache {
    pixbufs: RefCell<HashMap<IconName, Option<Pixbuf>>>,
}

impl IconCache {
    pub fn get(&self, icon_name: &IconName) -> Option<Pixbuf> {
        if let Some(pixbuf) = self.pixbufs.borrow().get(icon_name) {
            return pixbuf.clone();
        }
        let pixbuf = find_icon_path(icon_name)
            .and_then(|path| Pixbuf::from_file_at_scale(&path, ICON_SIZE, ICON_SIZE, true).ok());
        self.pixbufs
            .borrow_mut()
            .insert(icon_name.clone(), pixbuf.clone());
        pixbuf
    }

    pub fn clear(&self) {
        self.pixbufs.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_missing_icons() {
        assert_eq!(find_icon_path(&IconName::new("")), None);
        let missing = IconName::new("/definitely/not/here.png");
        assert_eq!(find_icon_path(&missing), None);
        assert_eq!(find_icon_path(&missing), None);
    }
}
