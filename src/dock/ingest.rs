use super::store::{display_name, normalize_path_key, Shortcut, ShortcutStore};
use crate::icons::{default_icon, IconResolver};
use log::{debug, info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;

const COPY_ATTEMPTS: usize = 16;
const SUFFIX_LEN: usize = 4;
const SUFFIX_MARK: char = '~';

/// Partial downloads and scratch files; they never launch anything useful.
const REJECTED_EXTENSIONS: [&str; 5] = ["tmp", "part", "crdownload", "partial", "download"];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),
    #[error("{} is already on the dock", .0.display())]
    Duplicate(PathBuf),
    #[error("could not copy {} into {}: {source}", .source_path.display(), .dir.display())]
    Copy {
        source_path: PathBuf,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutKind {
    Directory,
    /// `.lnk` / `.desktop` launchers.
    ShellLink,
    /// `.url` / `.webloc` internet shortcuts.
    WebLink,
    /// Programs and documents; both are launched through the shell.
    File,
}

impl ShortcutKind {
    pub fn is_link(self) -> bool {
        matches!(self, Self::ShellLink | Self::WebLink)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Files dropped from outside: duplicates rejected, links copied.
    Drop,
    /// Paths read back from the saved config: taken as they are.
    Restore,
}

pub fn classify(path: &Path) -> Result<ShortcutKind, IngestError> {
    if path.is_dir() {
        return Ok(ShortcutKind::Directory);
    }
    if !path.is_file() {
        return Err(IngestError::Missing(path.to_path_buf()));
    }
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if REJECTED_EXTENSIONS.contains(&ext.as_str()) || display_name(path).is_none() {
        return Err(IngestError::Unsupported(path.to_path_buf()));
    }
    Ok(match ext.as_str() {
        "lnk" | "desktop" => ShortcutKind::ShellLink,
        "url" | "webloc" => ShortcutKind::WebLink,
        _ => ShortcutKind::File,
    })
}

/// Turns dropped or restored paths into shortcut records.
pub struct IngestionPipeline {
    icons: Box<dyn IconResolver>,
    managed_dir: Option<PathBuf>,
    copy_links: bool,
}

impl IngestionPipeline {
    pub fn new(icons: Box<dyn IconResolver>) -> Self {
        Self {
            icons,
            managed_dir: None,
            copy_links: false,
        }
    }

    /// Link files dropped onto the dock get copied into `dir` so the dock
    /// keeps working after the original is deleted.
    pub fn with_managed_dir(mut self, dir: PathBuf, copy_links: bool) -> Self {
        self.managed_dir = Some(dir);
        self.copy_links = copy_links;
        self
    }

    pub fn ingest(
        &self,
        path: &Path,
        store: &ShortcutStore,
        mode: IngestMode,
    ) -> Result<Shortcut, IngestError> {
        let kind = classify(path)?;

        if mode == IngestMode::Drop && self.is_duplicate(path, kind, store) {
            return Err(IngestError::Duplicate(path.to_path_buf()));
        }

        let name = self.display_name_for(path);
        let target = match (&self.managed_dir, mode) {
            (Some(dir), IngestMode::Drop)
                if self.copy_links && kind.is_link() && !is_inside(path, dir) =>
            {
                match copy_into_storage(path, dir) {
                    Ok(copied) => {
                        info!("copied {} to {}", path.display(), copied.display());
                        copied
                    }
                    Err(err) => {
                        warn!("{err}; keeping original path");
                        path.to_path_buf()
                    }
                }
            }
            _ => path.to_path_buf(),
        };

        let icon = self.icons.resolve(&target).unwrap_or_else(|| {
            debug!("no icon for {}, using default", target.display());
            default_icon()
        });

        Ok(Shortcut::new(name, target, Some(icon)))
    }

    fn is_duplicate(&self, path: &Path, kind: ShortcutKind, store: &ShortcutStore) -> bool {
        if store.contains_path(path) {
            return true;
        }
        // A link dropped twice lands on an earlier managed copy of itself.
        let (Some(dir), true) = (&self.managed_dir, kind.is_link()) else {
            return false;
        };
        let Some(file_name) = path.file_name() else {
            return false;
        };
        let Ok(source) = std::fs::read(path) else {
            return false;
        };
        store
            .iter()
            .filter(|item| is_inside(&item.path, dir))
            .filter(|item| same_file_name_modulo_suffix(&item.path, Path::new(file_name)))
            .any(|item| std::fs::read(&item.path).map(|c| c == source).unwrap_or(false))
    }

    /// Deletes the managed copy behind a removed tile once no other tile
    /// points at it. Files outside managed storage are never touched.
    pub fn release(&self, removed: &Shortcut, store: &ShortcutStore) {
        let Some(dir) = &self.managed_dir else {
            return;
        };
        if !is_inside(&removed.path, dir) || store.contains_path(&removed.path) {
            return;
        }
        match std::fs::remove_file(&removed.path) {
            Ok(()) => info!("deleted managed copy {}", removed.path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                "could not delete managed copy {}: {err}",
                removed.path.display()
            ),
        }
    }

    fn display_name_for(&self, path: &Path) -> String {
        let name = display_name(path).unwrap_or_else(|| path.to_string_lossy().to_string());
        match &self.managed_dir {
            Some(dir) if is_inside(path, dir) => strip_copy_suffix(&name).to_string(),
            _ => name,
        }
    }
}

fn is_inside(path: &Path, dir: &Path) -> bool {
    path.parent()
        .map(|parent| normalize_path_key(parent) == normalize_path_key(dir))
        .unwrap_or(false)
}

fn strip_copy_suffix(stem: &str) -> &str {
    match stem.rsplit_once(SUFFIX_MARK) {
        Some((base, suffix))
            if !base.is_empty()
                && suffix.len() == SUFFIX_LEN
                && suffix.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            base
        }
        _ => stem,
    }
}

fn same_file_name_modulo_suffix(stored: &Path, dropped: &Path) -> bool {
    let ext = |p: &Path| {
        p.extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    };
    let (Some(stored_stem), Some(dropped_stem)) = (display_name(stored), display_name(dropped))
    else {
        return false;
    };
    ext(stored) == ext(dropped)
        && strip_copy_suffix(&stored_stem).to_lowercase() == dropped_stem.to_lowercase()
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

fn suffixed_name(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!(
            "{stem}{SUFFIX_MARK}{}.{}",
            random_suffix(),
            ext.to_string_lossy()
        ),
        None => format!("{stem}{SUFFIX_MARK}{}", random_suffix()),
    };
    PathBuf::from(name)
}

/// Copies `source` into `dir` without ever replacing an existing file. A
/// taken name gets a short random suffix.
pub fn copy_into_storage(source: &Path, dir: &Path) -> Result<PathBuf, IngestError> {
    let copy_err = |source_err: std::io::Error| IngestError::Copy {
        source_path: source.to_path_buf(),
        dir: dir.to_path_buf(),
        source: source_err,
    };

    std::fs::create_dir_all(dir).map_err(copy_err)?;
    let file_name = source
        .file_name()
        .ok_or_else(|| IngestError::Unsupported(source.to_path_buf()))?;

    let mut candidate = dir.join(file_name);
    let mut last_err = None;
    for _ in 0..COPY_ATTEMPTS {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut out) => {
                let copied = std::fs::File::open(source)
                    .and_then(|mut input| std::io::copy(&mut input, &mut out));
                return match copied {
                    Ok(_) => Ok(candidate),
                    Err(err) => {
                        drop(out);
                        let _ = std::fs::remove_file(&candidate);
                        Err(copy_err(err))
                    }
                };
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                last_err = Some(err);
                candidate = dir.join(suffixed_name(source));
            }
            Err(err) => return Err(copy_err(err)),
        }
    }
    Err(copy_err(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::AlreadyExists, "no free file name")
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::IconImage;
    use eframe::egui;
    use std::sync::Arc;

    struct GreenForExe;

    impl IconResolver for GreenForExe {
        fn resolve(&self, path: &Path) -> Option<IconImage> {
            let is_exe = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("exe"))
                .unwrap_or(false);
            is_exe.then(|| Arc::new(egui::ColorImage::new([4, 4], egui::Color32::GREEN)))
        }
    }

    fn pipeline() -> IngestionPipeline {
        IngestionPipeline::new(Box::new(GreenForExe))
    }

    fn touch(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    #[test]
    fn missing_path_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = ShortcutStore::new();
        let err = pipeline()
            .ingest(&dir.path().join("nope.exe"), &store, IngestMode::Drop)
            .expect_err("missing");
        assert!(matches!(err, IngestError::Missing(_)));
    }

    #[test]
    fn scratch_files_are_unsupported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let part = touch(dir.path(), "setup.exe.part", b"x");
        let store = ShortcutStore::new();
        let err = pipeline()
            .ingest(&part, &store, IngestMode::Drop)
            .expect_err("unsupported");
        assert!(matches!(err, IngestError::Unsupported(_)));
    }

    #[test]
    fn classifies_by_extension() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert_eq!(classify(dir.path()).ok(), Some(ShortcutKind::Directory));
        let cases = [
            ("Editor.LNK", ShortcutKind::ShellLink),
            ("site.url", ShortcutKind::WebLink),
            ("tool.exe", ShortcutKind::File),
            ("notes.txt", ShortcutKind::File),
        ];
        for (name, kind) in cases {
            let path = touch(dir.path(), name, b"x");
            assert_eq!(classify(&path).ok(), Some(kind), "{name}");
        }
    }

    #[test]
    fn name_comes_from_stem_and_icon_falls_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let exe = touch(dir.path(), "Paint.exe", b"MZ");
        let doc = touch(dir.path(), "Report.final.txt", b"text");
        let store = ShortcutStore::new();

        let paint = pipeline().ingest(&exe, &store, IngestMode::Drop).expect("exe");
        assert_eq!(paint.name, "Paint");
        assert_eq!(
            paint.icon.as_ref().map(|i| i.pixels[0]),
            Some(egui::Color32::GREEN)
        );

        let report = pipeline().ingest(&doc, &store, IngestMode::Drop).expect("doc");
        assert_eq!(report.name, "Report.final");
        assert_eq!(report.icon.as_ref().map(|i| i.size), Some(default_icon().size));
    }

    #[test]
    fn duplicate_drop_is_rejected_case_insensitively() {
        let dir = tempfile::tempdir().expect("temp dir");
        let exe = touch(dir.path(), "Game.exe", b"MZ");
        let mut store = ShortcutStore::new();
        let shouted = PathBuf::from(exe.to_string_lossy().to_ascii_uppercase());
        store.append(Shortcut::from_path(shouted));

        let err = pipeline()
            .ingest(&exe, &store, IngestMode::Drop)
            .expect_err("duplicate");
        assert!(matches!(err, IngestError::Duplicate(_)));

        let again = pipeline().ingest(&exe, &store, IngestMode::Restore);
        assert!(again.is_ok(), "restore keeps duplicates");
    }

    #[test]
    fn links_are_copied_into_managed_storage() {
        let src = tempfile::tempdir().expect("temp dir");
        let managed = tempfile::tempdir().expect("temp dir");
        let link = touch(src.path(), "Browser.lnk", b"link-a");
        let pipeline = pipeline().with_managed_dir(managed.path().to_path_buf(), true);
        let store = ShortcutStore::new();

        let item = pipeline.ingest(&link, &store, IngestMode::Drop).expect("ingest");
        assert_eq!(item.path, managed.path().join("Browser.lnk"));
        assert_eq!(std::fs::read(&item.path).expect("copy"), b"link-a");
        assert_eq!(item.name, "Browser");

        let exe = touch(src.path(), "tool.exe", b"MZ");
        let item = pipeline.ingest(&exe, &store, IngestMode::Drop).expect("exe");
        assert_eq!(item.path, exe, "programs are referenced in place");
    }

    #[test]
    fn name_collision_gets_suffix_and_never_overwrites() {
        let src = tempfile::tempdir().expect("temp dir");
        let managed = tempfile::tempdir().expect("temp dir");
        let unrelated = touch(managed.path(), "Mail.url", b"unrelated");
        let link = touch(src.path(), "Mail.url", b"mine");
        let pipeline = pipeline().with_managed_dir(managed.path().to_path_buf(), true);
        let store = ShortcutStore::new();

        let item = pipeline.ingest(&link, &store, IngestMode::Drop).expect("ingest");
        assert_ne!(item.path, unrelated);
        assert_eq!(std::fs::read(&unrelated).expect("unrelated"), b"unrelated");
        assert_eq!(std::fs::read(&item.path).expect("copy"), b"mine");
        assert_eq!(item.name, "Mail");

        let stem = item
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .expect("stem");
        let (base, suffix) = stem.rsplit_once(SUFFIX_MARK).expect("suffix");
        assert_eq!(base, "Mail");
        assert_eq!(suffix.len(), SUFFIX_LEN);
    }

    #[test]
    fn failed_copy_keeps_original_path() {
        let src = tempfile::tempdir().expect("temp dir");
        let link = touch(src.path(), "Music.lnk", b"x");
        // A file where the managed directory should be makes create_dir_all fail.
        let blocker = touch(src.path(), "not_a_dir", b"");
        let pipeline = pipeline().with_managed_dir(blocker.join("Shortcuts"), true);
        let store = ShortcutStore::new();

        let item = pipeline.ingest(&link, &store, IngestMode::Drop).expect("ingest");
        assert_eq!(item.path, link);
    }

    #[test]
    fn same_link_dropped_twice_is_a_duplicate() {
        let src = tempfile::tempdir().expect("temp dir");
        let managed = tempfile::tempdir().expect("temp dir");
        let link = touch(src.path(), "Chat.lnk", b"chat");
        let pipeline = pipeline().with_managed_dir(managed.path().to_path_buf(), true);
        let mut store = ShortcutStore::new();

        let item = pipeline.ingest(&link, &store, IngestMode::Drop).expect("first");
        store.append(item);
        let err = pipeline
            .ingest(&link, &store, IngestMode::Drop)
            .expect_err("second");
        assert!(matches!(err, IngestError::Duplicate(_)));

        let other = tempfile::tempdir().expect("temp dir");
        let different = touch(other.path(), "Chat.lnk", b"another chat");
        let item = pipeline
            .ingest(&different, &store, IngestMode::Drop)
            .expect("different content");
        assert_ne!(item.path, managed.path().join("Chat.lnk"));
    }

    #[test]
    fn non_ascii_duplicate_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let games = dir.path().join("Игры");
        std::fs::create_dir(&games).expect("mkdir");
        let exe = touch(&games, "Игра.exe", b"MZ");
        let mut store = ShortcutStore::new();
        store.append(Shortcut::from_path(dir.path().join("ИГРЫ").join("ИГРА.exe")));

        let err = pipeline()
            .ingest(&exe, &store, IngestMode::Drop)
            .expect_err("duplicate");
        assert!(matches!(err, IngestError::Duplicate(_)));
    }

    #[test]
    fn release_deletes_unreferenced_managed_copy() {
        let src = tempfile::tempdir().expect("temp dir");
        let managed = tempfile::tempdir().expect("temp dir");
        let link = touch(src.path(), "Chat.lnk", b"chat");
        let pipeline = pipeline().with_managed_dir(managed.path().to_path_buf(), true);
        let mut store = ShortcutStore::new();

        for _ in 0..3 {
            let item = pipeline.ingest(&link, &store, IngestMode::Drop).expect("drop");
            let id = item.id();
            store.append(item);
            let removed = store.remove(id).expect("remove");
            pipeline.release(&removed, &store);
        }
        assert!(std::fs::read_dir(managed.path()).expect("dir").next().is_none());
        assert!(link.exists(), "the dropped original stays");

        // Still referenced by a restored duplicate: kept.
        let item = pipeline.ingest(&link, &store, IngestMode::Drop).expect("drop");
        let copy = item.path.clone();
        store.append(item);
        store.append(Shortcut::from_path(copy.clone()));
        let first = store.get(0).map(Shortcut::id).expect("item");
        let removed = store.remove(first).expect("remove");
        pipeline.release(&removed, &store);
        assert!(copy.exists());

        // Outside managed storage: never deleted.
        let exe = touch(src.path(), "tool.exe", b"MZ");
        pipeline.release(&Shortcut::from_path(exe.clone()), &store);
        assert!(exe.exists());
    }

    #[test]
    fn restore_does_not_copy() {
        let managed = tempfile::tempdir().expect("temp dir");
        let src = tempfile::tempdir().expect("temp dir");
        let link = touch(src.path(), "Docs.lnk", b"x");
        let pipeline = pipeline().with_managed_dir(managed.path().to_path_buf(), true);
        let item = pipeline
            .ingest(&link, &ShortcutStore::new(), IngestMode::Restore)
            .expect("restore");
        assert_eq!(item.path, link);
        assert!(std::fs::read_dir(managed.path()).expect("dir").next().is_none());
    }

    #[test]
    fn copy_suffix_is_stripped_only_when_well_formed() {
        assert_eq!(strip_copy_suffix("Mail~a1b2"), "Mail");
        assert_eq!(strip_copy_suffix("Mail~toolong"), "Mail~toolong");
        assert_eq!(strip_copy_suffix("~a1b2"), "~a1b2");
        assert_eq!(strip_copy_suffix("Plain"), "Plain");
    }
}
