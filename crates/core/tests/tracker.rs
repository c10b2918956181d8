use filetrack_core::config::AppConfig;
use filetrack_core::probe::{FsProbe, MetadataProbe, ProbeError};
use filetrack_core::{Tracker, TrackerError};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use storage::{FileKind, FileRecord, RecordStore, RefreshSummary};
use tempfile::TempDir;

/// Filesystem probe that reports an I/O failure for selected paths.
struct FlakyProbe {
    failing: HashSet<String>,
}

impl MetadataProbe for FlakyProbe {
    fn probe(&self, path: &Path) -> Result<FileRecord, ProbeError> {
        if self.failing.contains(path.to_string_lossy().as_ref()) {
            return Err(ProbeError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        FsProbe.probe(path)
    }
}

fn setup() -> (TempDir, Tracker) {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = AppConfig::default();
    cfg.store.path = dir.path().join("filetrack.json").to_string_lossy().into_owned();
    let tracker = Tracker::from_config(&cfg).unwrap();
    (dir, tracker)
}

fn write(dir: &TempDir, rel: &str, bytes: usize) -> String {
    let path = dir.path().join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, vec![b'a'; bytes]).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn add_file_probes_and_stores_with_empty_tags() {
    let (dir, tracker) = setup();
    let path = write(&dir, "report.txt", 42);

    tracker.add_file(&path).unwrap();
    let meta = tracker.file_meta(&path).unwrap();
    assert_eq!(meta.record.filename, "report.txt");
    assert_eq!(meta.record.kind, FileKind::File);
    assert_eq!(meta.record.size, 42);
    assert!(meta.record.tags.is_empty());
    assert!(tracker.file_exists(&path));
}

#[test]
fn add_missing_path_is_not_found() {
    let (dir, tracker) = setup();
    let missing = dir.path().join("nope.txt").to_string_lossy().into_owned();
    assert!(matches!(
        tracker.add_file(&missing),
        Err(TrackerError::NotFound(_))
    ));
    assert!(tracker.list_files().is_empty());
}

#[test]
fn add_reports_probe_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "locked.txt", 1);
    let store = RecordStore::open(dir.path().join("filetrack.json")).unwrap();
    let probe = FlakyProbe {
        failing: HashSet::from([path.clone()]),
    };
    let tracker = Tracker::new(store, probe, &AppConfig::default()).unwrap();

    assert!(matches!(tracker.add_file(&path), Err(TrackerError::Probe(_))));
    assert!(!tracker.file_exists(&path));
}

#[test]
fn re_adding_resets_tags() {
    let (dir, tracker) = setup();
    let path = write(&dir, "a.txt", 1);
    tracker.add_file(&path).unwrap();
    tracker.add_tag(&path, "draft").unwrap();

    tracker.add_file(&path).unwrap();
    assert!(tracker.file_meta(&path).unwrap().record.tags.is_empty());
    assert_eq!(tracker.list_files().len(), 1);
}

#[test]
fn tag_round_trip_and_distinct_untracked_error() {
    let (dir, tracker) = setup();
    let path = write(&dir, "a.txt", 1);
    tracker.add_file(&path).unwrap();

    assert!(tracker.add_tag(&path, "work").unwrap());
    assert!(!tracker.add_tag(&path, "work").unwrap());
    assert_eq!(tracker.file_meta(&path).unwrap().record.tags, vec!["work"]);

    assert!(!tracker.remove_tag(&path, "absent").unwrap());
    assert!(tracker.remove_tag(&path, "work").unwrap());
    assert!(tracker.file_meta(&path).unwrap().record.tags.is_empty());

    let other = write(&dir, "b.txt", 1);
    assert!(matches!(
        tracker.add_tag(&other, "work"),
        Err(TrackerError::NotTracked(p)) if p == other
    ));
}

#[test]
fn search_by_tag_sees_mutations_between_calls() {
    let (dir, tracker) = setup();
    let a = write(&dir, "a.txt", 1);
    let b = write(&dir, "b.txt", 1);
    tracker.add_file(&a).unwrap();
    tracker.add_file(&b).unwrap();

    tracker.add_tag(&a, "x").unwrap();
    assert_eq!(tracker.search_by_tag("x").len(), 1);

    tracker.add_tag(&b, "x").unwrap();
    assert_eq!(tracker.search_by_tag("x").len(), 2);

    tracker.remove_tag(&a, "x").unwrap();
    let hits = tracker.search_by_tag("x");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, b);
}

#[test]
fn name_searches_differ_in_scope() {
    let (dir, tracker) = setup();
    let in_dir = write(&dir, "Projects/notes.md", 1);
    let by_name = write(&dir, "projects-plan.txt", 1);
    tracker.add_file(&in_dir).unwrap();
    tracker.add_file(&by_name).unwrap();

    let mut hits: Vec<_> = tracker
        .search_by_name("PROJECTS")
        .into_iter()
        .map(|f| f.path)
        .collect();
    hits.sort();
    let mut expected = vec![in_dir.clone(), by_name.clone()];
    expected.sort();
    assert_eq!(hits, expected);

    let hits = tracker.find_by_filename("PROJECTS");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, by_name);
}

#[test]
fn add_path_non_recursive_tracks_directory_itself() {
    let (dir, tracker) = setup();
    write(&dir, "data/one.bin", 10);
    write(&dir, "data/two.bin", 20);
    let root = dir.path().join("data").to_string_lossy().into_owned();

    let summary = tracker.add_path(&root, false).unwrap();
    assert_eq!(summary.added, 1);
    let meta = tracker.file_meta(&root).unwrap();
    assert_eq!(meta.record.kind, FileKind::Directory);
    assert_eq!(meta.record.size, 30);
}

#[test]
fn add_path_recursive_tracks_dotfiles_and_skips_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let keep = write(&dir, "tree/a.txt", 1);
    let nested = write(&dir, "tree/sub/b.txt", 1);
    let env = write(&dir, "tree/.env", 1);
    write(&dir, "tree/target/out.o", 1);
    let failing = write(&dir, "tree/sub/locked.txt", 1);

    let mut cfg = AppConfig::default();
    cfg.scan.exclude = vec!["**/target".to_string()];
    let store = RecordStore::open(dir.path().join("filetrack.json")).unwrap();
    let probe = FlakyProbe {
        failing: HashSet::from([failing.clone()]),
    };
    let tracker = Tracker::new(store, probe, &cfg).unwrap();

    let root = dir.path().join("tree").to_string_lossy().into_owned();
    let summary = tracker.add_path(&root, true).unwrap();
    assert_eq!(summary.added, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total, 4);

    let mut paths: Vec<_> = tracker.list_files().into_iter().map(|f| f.path).collect();
    paths.sort();
    let mut expected = vec![keep, nested, env];
    expected.sort();
    assert_eq!(paths, expected);
}

#[test]
fn add_path_recursive_can_skip_hidden_entries() {
    let dir = tempfile::tempdir().unwrap();
    let keep = write(&dir, "tree/a.txt", 1);
    write(&dir, "tree/.env", 1);
    write(&dir, "tree/.git/config", 1);

    let mut cfg = AppConfig::default();
    cfg.store.path = dir.path().join("filetrack.json").to_string_lossy().into_owned();
    cfg.scan.include_hidden = false;
    let tracker = Tracker::from_config(&cfg).unwrap();

    let root = dir.path().join("tree").to_string_lossy().into_owned();
    let summary = tracker.add_path(&root, true).unwrap();
    assert_eq!((summary.added, summary.failed, summary.total), (1, 0, 1));
    let paths: Vec<_> = tracker.list_files().into_iter().map(|f| f.path).collect();
    assert_eq!(paths, vec![keep]);
}

#[cfg(unix)]
#[test]
fn add_path_recursive_counts_dangling_links_as_failed() {
    let (dir, tracker) = setup();
    let keep = write(&dir, "tree/a.txt", 1);
    let root = dir.path().join("tree");
    std::os::unix::fs::symlink(root.join("missing"), root.join("broken")).unwrap();

    let summary = tracker.add_path(&root.to_string_lossy(), true).unwrap();
    assert_eq!((summary.added, summary.failed, summary.total), (1, 1, 2));
    let paths: Vec<_> = tracker.list_files().into_iter().map(|f| f.path).collect();
    assert_eq!(paths, vec![keep]);
}

#[test]
fn ensure_tracked_adds_once() {
    let (dir, tracker) = setup();
    let path = write(&dir, "a.txt", 1);
    assert!(tracker.ensure_tracked(&path).unwrap());
    tracker.add_tag(&path, "keep").unwrap();
    assert!(!tracker.ensure_tracked(&path).unwrap());
    assert_eq!(tracker.file_meta(&path).unwrap().record.tags, vec!["keep"]);
}

#[test]
fn untrack_single_and_recursive() {
    let (dir, tracker) = setup();
    let a = write(&dir, "tree/a.txt", 1);
    let b = write(&dir, "tree/sub/b.txt", 1);
    let outside = write(&dir, "other.txt", 1);
    for p in [&a, &b, &outside] {
        tracker.add_file(p).unwrap();
    }

    assert_eq!(tracker.untrack(&outside, false).unwrap(), 1);
    assert_eq!(tracker.untrack(&outside, false).unwrap(), 0);

    let root = dir.path().join("tree").to_string_lossy().into_owned();
    assert_eq!(tracker.untrack(&root, true).unwrap(), 2);
    assert!(tracker.list_files().is_empty());
}

#[test]
fn refresh_recomputes_fields_keeps_tags_and_drops_deleted() {
    let (dir, tracker) = setup();
    let a = write(&dir, "a.txt", 5);
    let b = write(&dir, "b.txt", 5);
    tracker.add_file(&a).unwrap();
    tracker.add_file(&b).unwrap();
    tracker.add_tag(&a, "keep").unwrap();
    tracker.add_tag(&a, "also").unwrap();

    fs::write(&a, vec![b'z'; 11]).unwrap();
    fs::remove_file(&b).unwrap();

    let summary = tracker.refresh_database().unwrap();
    assert_eq!(
        summary,
        RefreshSummary {
            updated: 1,
            failed: 1,
            total: 2
        }
    );

    let all = tracker.list_files();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].path, a);
    assert_eq!(all[0].record.size, 11);
    assert_eq!(all[0].record.tags, vec!["keep", "also"]);
}

#[test]
fn refresh_drops_records_whose_probe_fails() {
    let dir = tempfile::tempdir().unwrap();
    let ok = write(&dir, "ok.txt", 1);
    let bad = write(&dir, "bad.txt", 1);

    let store = RecordStore::open(dir.path().join("filetrack.json")).unwrap();
    store.upsert(&ok, FsProbe.probe(Path::new(&ok)).unwrap()).unwrap();
    store.upsert(&bad, FsProbe.probe(Path::new(&bad)).unwrap()).unwrap();

    let probe = FlakyProbe {
        failing: HashSet::from([bad.clone()]),
    };
    let tracker = Tracker::new(store, probe, &AppConfig::default()).unwrap();
    let summary = tracker.refresh_database().unwrap();
    assert_eq!((summary.updated, summary.failed, summary.total), (1, 1, 2));
    assert!(tracker.file_exists(&ok));
    assert!(!tracker.file_exists(&bad));
}

#[test]
fn corrupt_store_is_usable() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("filetrack.json");
    fs::write(&store_path, "[1, 2,").unwrap();
    let mut cfg = AppConfig::default();
    cfg.store.path = store_path.to_string_lossy().into_owned();

    let tracker = Tracker::from_config(&cfg).unwrap();
    assert!(tracker.list_files().is_empty());

    let path = write(&dir, "a.txt", 3);
    tracker.add_file(&path).unwrap();
    assert_eq!(tracker.list_files().len(), 1);
}

#[test]
fn invalid_exclude_pattern_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = AppConfig::default();
    cfg.store.path = dir.path().join("s.json").to_string_lossy().into_owned();
    cfg.scan.exclude = vec!["[unclosed".to_string()];
    assert!(matches!(
        Tracker::from_config(&cfg),
        Err(TrackerError::Pattern(_))
    ));
}
