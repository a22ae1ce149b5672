use mtp_responder::{ObjectRead, ObjectTimes, VolumeProvider, VolumeStat};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// In-memory filesystem with drive-qualified paths (`"sdmc:/dir/file"`).
///
/// Clones share the tree, so tests can mutate it after the responder has
/// taken its copy. Listing order is the `BTreeMap` key order, which keeps
/// the handle-stability assertions deterministic.
#[derive(Clone)]
pub struct TestVolume {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    stats: BTreeMap<String, VolumeStat>,
    dirs: Vec<String>,
    files: BTreeMap<String, FileNode>,
}

struct FileNode {
    content: Vec<u8>,
    times: ObjectTimes,
}

impl TestVolume {
    pub fn new() -> Self {
        TestVolume {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn add_volume(&self, prefix: &str, total_bytes: u64, free_bytes: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.stats.insert(
            prefix.to_string(),
            VolumeStat {
                total_bytes,
                free_bytes,
            },
        );
        inner.dirs.push(format!("{prefix}:/"));
    }

    pub fn add_dir(&self, path: &str) {
        self.inner.lock().unwrap().dirs.push(path.to_string());
    }

    pub fn add_file(&self, path: &str, content: &[u8], created: i64, modified: i64) {
        self.inner.lock().unwrap().files.insert(
            path.to_string(),
            FileNode {
                content: content.to_vec(),
                times: ObjectTimes { created, modified },
            },
        );
    }

    pub fn remove_file(&self, path: &str) {
        self.inner.lock().unwrap().files.remove(path);
    }

    fn is_child(dir: &str, path: &str) -> bool {
        let rest = match path.strip_prefix(dir) {
            Some(rest) => rest,
            None => return false,
        };
        let rest = if dir.ends_with('/') {
            rest
        } else {
            match rest.strip_prefix('/') {
                Some(rest) => rest,
                None => return false,
            }
        };
        !rest.is_empty() && !rest.contains('/')
    }
}

pub struct SliceRead {
    data: Vec<u8>,
    pos: usize,
}

impl ObjectRead for SliceRead {
    fn read(&mut self, dst: &mut [u8]) -> usize {
        let take = dst.len().min(self.data.len() - self.pos);
        dst[..take].copy_from_slice(&self.data[self.pos..self.pos + take]);
        self.pos += take;
        take
    }
}

impl VolumeProvider for TestVolume {
    type Dir = std::vec::IntoIter<String>;
    type Read = SliceRead;

    fn stat_volume(&self, prefix: &str) -> Option<VolumeStat> {
        self.inner.lock().unwrap().stats.get(prefix).copied()
    }

    fn list_directory(&self, path: &str) -> Option<Self::Dir> {
        let inner = self.inner.lock().unwrap();
        if !inner.dirs.iter().any(|d| d == path) {
            return None;
        }
        let mut children: Vec<String> = Vec::new();
        children.extend(
            inner
                .dirs
                .iter()
                .filter(|d| Self::is_child(path, d))
                .cloned(),
        );
        children.extend(
            inner
                .files
                .keys()
                .filter(|f| Self::is_child(path, f))
                .cloned(),
        );
        Some(children.into_iter())
    }

    fn is_directory(&self, path: &str) -> bool {
        self.inner.lock().unwrap().dirs.iter().any(|d| d == path)
    }

    fn file_size(&self, path: &str) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|f| f.content.len() as u64)
            .unwrap_or(0)
    }

    fn stat_times(&self, path: &str) -> ObjectTimes {
        self.inner
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|f| f.times)
            .unwrap_or_default()
    }

    fn open_read(&self, path: &str) -> Option<SliceRead> {
        self.inner.lock().unwrap().files.get(path).map(|f| SliceRead {
            data: f.content.clone(),
            pos: 0,
        })
    }
}
