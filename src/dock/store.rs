use crate::icons::IconImage;
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SHORTCUT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a tile. Never derived from the path: two shortcuts may point
/// at the same target and still be distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortcutId(u64);

impl ShortcutId {
    fn next() -> Self {
        Self(NEXT_SHORTCUT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub struct Shortcut {
    id: ShortcutId,
    pub name: String,
    pub path: PathBuf,
    pub icon: Option<IconImage>,
}

impl Shortcut {
    pub fn new(name: String, path: PathBuf, icon: Option<IconImage>) -> Self {
        Self {
            id: ShortcutId::next(),
            name,
            path,
            icon,
        }
    }

    pub fn from_path(path: PathBuf) -> Self {
        let name = display_name(&path).unwrap_or_else(|| "Unknown".to_string());
        Self::new(name, path, None)
    }

    pub fn id(&self) -> ShortcutId {
        self.id
    }

    pub fn path_key(&self) -> String {
        normalize_path_key(&self.path)
    }
}

pub fn display_name(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn normalize_path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Change notification emitted after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Inserted(usize),
    Removed(usize),
    Moved { from: usize, to: usize },
    PlaceholderChanged(Option<usize>),
}

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// One entry of the row as it is drawn.
#[derive(Debug, Clone, Copy)]
pub enum VisualSlot<'a> {
    Tile(usize, &'a Shortcut),
    Placeholder,
}

/// Ordered shortcut list. The placeholder is kept beside the list, as an
/// insertion position, so it can never leak into the persisted order.
#[derive(Default)]
pub struct ShortcutStore {
    items: Vec<Shortcut>,
    placeholder: Option<usize>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for ShortcutStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortcutStore")
            .field("items", &self.items)
            .field("placeholder", &self.placeholder)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ShortcutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: StoreEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Shortcut> {
        self.items.get(index)
    }

    pub fn get_by_id(&self, id: ShortcutId) -> Option<&Shortcut> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn index_of(&self, id: ShortcutId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shortcut> {
        self.items.iter()
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        let key = normalize_path_key(path);
        self.items.iter().any(|item| item.path_key() == key)
    }

    /// Target paths in display order; the durable projection of the list.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.items.iter().map(|item| item.path.clone()).collect()
    }

    /// Inserts at `index` clamped to `[0, len]`. Returns the final index, or
    /// `None` when an item with the same identity is already present.
    pub fn insert(&mut self, item: Shortcut, index: usize) -> Option<usize> {
        if self.index_of(item.id).is_some() {
            debug!("ignoring insert of already present shortcut {:?}", item.id);
            return None;
        }
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        if let Some(slot) = self.placeholder {
            if index <= slot {
                self.placeholder = Some(slot + 1);
            }
        }
        self.emit(StoreEvent::Inserted(index));
        Some(index)
    }

    pub fn append(&mut self, item: Shortcut) -> Option<usize> {
        let len = self.items.len();
        self.insert(item, len)
    }

    pub fn remove(&mut self, id: ShortcutId) -> Option<Shortcut> {
        let index = self.index_of(id)?;
        let item = self.items.remove(index);
        if let Some(slot) = self.placeholder {
            if index < slot {
                self.placeholder = Some(slot - 1);
            }
        }
        self.emit(StoreEvent::Removed(index));
        Some(item)
    }

    /// Moves the item at `from` so that it ends up at `to`, where `to` is an
    /// index into the list with the item already taken out. Both indices are
    /// clamped. Returns whether the order changed.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if self.items.is_empty() {
            return false;
        }
        let last = self.items.len() - 1;
        let from = from.min(last);
        let to = to.min(last);
        if from == to {
            return false;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        self.emit(StoreEvent::Moved { from, to });
        true
    }

    pub fn placeholder(&self) -> Option<usize> {
        self.placeholder
    }

    /// Places the single placeholder before the item currently at `index`
    /// (clamped to `[0, len]`), replacing any previous one.
    pub fn set_placeholder(&mut self, index: usize) {
        let index = index.min(self.items.len());
        if self.placeholder != Some(index) {
            self.placeholder = Some(index);
            self.emit(StoreEvent::PlaceholderChanged(Some(index)));
        }
    }

    pub fn take_placeholder(&mut self) -> Option<usize> {
        let slot = self.placeholder.take();
        if slot.is_some() {
            self.emit(StoreEvent::PlaceholderChanged(None));
        }
        slot
    }

    /// Number of drawn tiles, placeholder included.
    pub fn visual_len(&self) -> usize {
        self.items.len() + usize::from(self.placeholder.is_some())
    }

    pub fn visual_slots(&self) -> Vec<VisualSlot<'_>> {
        let mut slots = Vec::with_capacity(self.visual_len());
        for (idx, item) in self.items.iter().enumerate() {
            if self.placeholder == Some(idx) {
                slots.push(VisualSlot::Placeholder);
            }
            slots.push(VisualSlot::Tile(idx, item));
        }
        if self.placeholder == Some(self.items.len()) {
            slots.push(VisualSlot::Placeholder);
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make(name: &str) -> Shortcut {
        Shortcut::from_path(PathBuf::from(format!("/apps/{name}.exe")))
    }

    fn names(store: &ShortcutStore) -> Vec<String> {
        store.iter().map(|item| item.name.clone()).collect()
    }

    fn store_of(list: &[&str]) -> ShortcutStore {
        let mut store = ShortcutStore::new();
        for name in list {
            store.append(make(name));
        }
        store
    }

    #[test]
    fn display_name_comes_from_file_stem() {
        let item = make("Firefox");
        assert_eq!(item.name, "Firefox");
        let dir = Shortcut::from_path(PathBuf::from("/"));
        assert_eq!(dir.name, "Unknown");
    }

    #[test]
    fn identities_are_distinct_for_same_path() {
        let a = make("A");
        let b = make("A");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.path_key(), b.path_key());
    }

    #[test]
    fn insert_clamps_index() {
        let mut store = store_of(&["A", "B"]);
        assert_eq!(store.insert(make("C"), 99), Some(2));
        assert_eq!(names(&store), vec!["A", "B", "C"]);
        assert_eq!(store.insert(make("D"), 0), Some(0));
        assert_eq!(names(&store), vec!["D", "A", "B", "C"]);
    }

    #[test]
    fn insert_rejects_duplicate_identity() {
        let mut store = ShortcutStore::new();
        let item = make("A");
        let copy = item.clone();
        store.append(item);
        assert_eq!(store.append(copy), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_by_identity_is_noop_when_absent() {
        let mut store = store_of(&["A", "B"]);
        let stranger = make("A");
        assert!(store.remove(stranger.id()).is_none());
        assert_eq!(names(&store), vec!["A", "B"]);

        let id = store.get(0).map(Shortcut::id).expect("first item");
        let removed = store.remove(id).expect("removed");
        assert_eq!(removed.name, "A");
        assert_eq!(names(&store), vec!["B"]);
    }

    #[test]
    fn move_to_same_index_is_noop() {
        let mut store = store_of(&["A", "B", "C"]);
        let ids: Vec<_> = store.iter().map(Shortcut::id).collect();
        for i in 0..3 {
            assert!(!store.move_item(i, i));
        }
        let after: Vec<_> = store.iter().map(Shortcut::id).collect();
        assert_eq!(ids, after);
    }

    #[test]
    fn move_uses_post_removal_indices_and_clamps() {
        let mut store = store_of(&["A", "B", "C", "D"]);
        assert!(store.move_item(0, 2));
        assert_eq!(names(&store), vec!["B", "C", "A", "D"]);
        assert!(store.move_item(10, 0));
        assert_eq!(names(&store), vec!["D", "B", "C", "A"]);
        assert!(store.move_item(1, 10));
        assert_eq!(names(&store), vec!["D", "C", "A", "B"]);
    }

    #[test]
    fn mutations_notify_listeners() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut store = ShortcutStore::new();
        store.subscribe(move |event| sink.borrow_mut().push(*event));

        store.append(make("A"));
        store.insert(make("B"), 0);
        store.move_item(0, 1);
        store.move_item(1, 1);
        let id = store.get(0).map(Shortcut::id).expect("item");
        store.remove(id);
        store.set_placeholder(5);
        store.take_placeholder();

        assert_eq!(
            *events.borrow(),
            vec![
                StoreEvent::Inserted(0),
                StoreEvent::Inserted(0),
                StoreEvent::Moved { from: 0, to: 1 },
                StoreEvent::Removed(0),
                StoreEvent::PlaceholderChanged(Some(1)),
                StoreEvent::PlaceholderChanged(None),
            ]
        );
    }

    #[test]
    fn placeholder_is_not_part_of_the_list() {
        let mut store = store_of(&["A", "B"]);
        store.set_placeholder(1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.visual_len(), 3);
        assert_eq!(store.paths().len(), 2);

        let kinds: Vec<&str> = store
            .visual_slots()
            .iter()
            .map(|slot| match slot {
                VisualSlot::Tile(_, item) => item.name.as_str(),
                VisualSlot::Placeholder => "_",
            })
            .collect();
        assert_eq!(kinds, vec!["A", "_", "B"]);

        store.set_placeholder(0);
        assert_eq!(store.placeholder(), Some(0));
        assert_eq!(store.take_placeholder(), Some(0));
        assert_eq!(store.take_placeholder(), None);
    }

    #[test]
    fn placeholder_follows_inserts_before_it() {
        let mut store = store_of(&["A", "B"]);
        store.set_placeholder(1);
        store.insert(make("C"), 0);
        assert_eq!(store.placeholder(), Some(2));
        store.insert(make("D"), 3);
        assert_eq!(store.placeholder(), Some(2));
    }

    #[test]
    fn contains_path_ignores_case() {
        let store = store_of(&["Editor"]);
        assert!(store.contains_path(Path::new("/APPS/editor.EXE")));
        assert!(!store.contains_path(Path::new("/apps/other.exe")));
    }

    #[test]
    fn contains_path_ignores_case_beyond_ascii() {
        let mut store = ShortcutStore::new();
        store.insert(Shortcut::from_path(PathBuf::from("/ИГРЫ/ИГРА.exe")), 0);
        assert!(store.contains_path(Path::new("/Игры/Игра.exe")));
        assert!(!store.contains_path(Path::new("/Игры/Другая.exe")));
    }
}
