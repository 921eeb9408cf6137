use std::path::Path;

use super::store::Store;

/// Load a cached store. A missing or unreadable cache yields an empty store.
pub fn load_snapshot(path: &Path) -> Store {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<Store>(&content) {
            Ok(store) => store,
            Err(e) => {
                log::warn!("Ignoring corrupt snapshot {}: {}", path.display(), e);
                Store::new()
            }
        },
        Err(_) => Store::new(),
    }
}

pub fn save_snapshot(path: &Path, store: &Store) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            log::error!("Failed to create {}: {}", parent.display(), e);
            return;
        }
    }
    match serde_json::to_string_pretty(store) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                log::error!("Failed to save snapshot: {}", e);
            }
        }
        Err(e) => log::error!("Failed to serialize snapshot: {}", e),
    }
}
