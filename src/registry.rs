//! Object-handle and storage registries

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

/// Bidirectional map between object handles and filesystem paths.
///
/// Handles are dense, start at 1 (zero is the reserved "no parent" value)
/// and stay valid for the life of the responder; nothing is ever evicted,
/// so repeated enumerations hand the initiator the same handles back.
pub(crate) struct HandleRegistry {
    by_handle: HashMap<u32, String>,
    by_path: HashMap<String, u32>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        HandleRegistry {
            by_handle: HashMap::new(),
            by_path: HashMap::new(),
        }
    }

    /// The handle for `path`, allocating the next one on first sight.
    pub fn get_or_insert(&mut self, path: &str) -> u32 {
        if let Some(&handle) = self.by_path.get(path) {
            return handle;
        }
        let handle = self.by_handle.len() as u32 + 1;
        self.by_handle.insert(handle, String::from(path));
        self.by_path.insert(String::from(path), handle);
        handle
    }

    pub fn lookup(&self, handle: u32) -> Option<&str> {
        self.by_handle.get(&handle).map(String::as_str)
    }
}

/// A registered volume: where it mounts and what the host calls it.
pub(crate) struct StorageEntry {
    pub id: u32,
    pub mount_prefix: String,
    pub label: String,
}

impl StorageEntry {
    /// The drive-qualified root the volume provider traverses from.
    pub fn root(&self) -> String {
        format!("{}:/", self.mount_prefix)
    }
}

/// Registered volumes, kept in registration order for `GetStorageIds`.
pub(crate) struct StorageRegistry {
    entries: Vec<StorageEntry>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        StorageRegistry {
            entries: Vec::new(),
        }
    }

    /// Register a volume, replacing any previous entry with the same id.
    pub fn insert(&mut self, id: u32, mount_prefix: &str, label: &str) {
        let entry = StorageEntry {
            id,
            mount_prefix: String::from(mount_prefix),
            label: String::from(label),
        };
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn get(&self, id: u32) -> Option<&StorageEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn by_prefix(&self, prefix: &str) -> Option<&StorageEntry> {
        self.entries.iter().find(|e| e.mount_prefix == prefix)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StorageEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{HandleRegistry, StorageRegistry};

    #[test]
    fn handles_are_dense_and_one_based() {
        let mut reg = HandleRegistry::new();
        assert_eq!(1, reg.get_or_insert("sdmc:/a.bin"));
        assert_eq!(2, reg.get_or_insert("sdmc:/b.bin"));
        assert_eq!(3, reg.get_or_insert("sdmc:/dir"));
    }

    #[test]
    fn same_path_reuses_its_handle() {
        let mut reg = HandleRegistry::new();
        let first = reg.get_or_insert("sdmc:/a.bin");
        reg.get_or_insert("sdmc:/b.bin");
        assert_eq!(first, reg.get_or_insert("sdmc:/a.bin"));
    }

    #[test]
    fn lookup_round_trips() {
        let mut reg = HandleRegistry::new();
        for path in ["sdmc:/a.bin", "sdmc:/dir", "sdmc:/dir/c.bin"] {
            let handle = reg.get_or_insert(path);
            assert_eq!(Some(path), reg.lookup(handle));
        }
    }

    #[test]
    fn unknown_handles_miss() {
        let mut reg = HandleRegistry::new();
        reg.get_or_insert("sdmc:/a.bin");
        assert_eq!(None, reg.lookup(0));
        assert_eq!(None, reg.lookup(2));
    }

    #[test]
    fn storages_keep_registration_order() {
        let mut reg = StorageRegistry::new();
        reg.insert(0x0002_0001, "user", "User");
        reg.insert(0x0001_0001, "sdmc", "SD Card");

        let ids: alloc::vec::Vec<u32> = reg.iter().map(|e| e.id).collect();
        assert_eq!([0x0002_0001, 0x0001_0001], ids.as_slice());
        assert_eq!("sdmc:/", reg.get(0x0001_0001).unwrap().root());
        assert_eq!("User", reg.by_prefix("user").unwrap().label);
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut reg = StorageRegistry::new();
        reg.insert(0x0001_0001, "sdmc", "SD Card");
        reg.insert(0x0001_0001, "sdmc", "External");

        assert_eq!(1, reg.iter().count());
        assert_eq!("External", reg.get(0x0001_0001).unwrap().label);
    }
}
