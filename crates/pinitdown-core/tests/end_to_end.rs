use std::collections::HashSet;

use pinitdown_core::map::LatLng;
use pinitdown_core::offline::{
    AssetRequest, AssetResponse, CacheStorage, DiskCacheStorage, Fetcher, Manifest, OfflineWorker,
    ResponseKind, WorkerState,
};
use pinitdown_core::store::DEFAULT_STORAGE_KEY;
use pinitdown_core::view::list_html;
use pinitdown_core::{
    CacheError, Command, FetchError, FileKeyValueStore, MapView, NoteStore, Outcome, Pinboard,
};
use tempfile::TempDir;

const ORIGIN: &str = "http://localhost:8080/";

fn open_board(dir: &TempDir, center: LatLng) -> Pinboard<FileKeyValueStore> {
    let storage = FileKeyValueStore::new(dir.path().join("data")).unwrap();
    let store = NoteStore::open(storage, DEFAULT_STORAGE_KEY).unwrap();
    Pinboard::new(store, MapView::new(center, 13))
}

#[test]
fn test_create_note_via_map_click_then_save() {
    let tmp = TempDir::new().unwrap();
    let spot = LatLng::new(56.48, 84.95);
    let mut board = open_board(&tmp, spot);
    let before = board.store().len();

    board.dispatch(Command::MapClick(spot)).unwrap();
    board.form_mut().title = "Lunch spot".to_string();
    board.form_mut().content = "Great noodles".to_string();
    assert_eq!(board.dispatch(Command::Save).unwrap(), Outcome::Updated);

    assert_eq!(board.store().len(), before + 1);
    assert_eq!(board.markers().note_markers().len(), 1);
    assert_eq!(board.list().count_label(), "1 of 1 notes");

    // Survives a restart field for field
    let saved = board.store().notes().to_vec();
    drop(board);
    let reopened = open_board(&tmp, spot);
    assert_eq!(reopened.store().notes(), saved.as_slice());
    assert_eq!(reopened.list().count_label(), "1 of 1 notes");
}

#[test]
fn test_hostile_title_is_escaped_everywhere() {
    let tmp = TempDir::new().unwrap();
    let spot = LatLng::new(56.48, 84.95);
    let mut board = open_board(&tmp, spot);

    board.dispatch(Command::MapClick(spot)).unwrap();
    board.form_mut().title = "<img src=x onerror=alert(1)>".to_string();
    board.form_mut().content = "x".to_string();
    board.dispatch(Command::Save).unwrap();

    let html = list_html(board.list());
    assert!(html.contains("&lt;img"));
    assert!(!html.contains("<img"));
    let popup = &board.markers().note_markers()[0].popup;
    assert!(popup.contains("&lt;img"));
}

#[test]
fn test_update_keeps_identity_across_restart() {
    let tmp = TempDir::new().unwrap();
    let spot = LatLng::new(56.48, 84.95);
    let mut board = open_board(&tmp, spot);

    board.dispatch(Command::MapClick(spot)).unwrap();
    board.form_mut().title = "Draft".to_string();
    board.form_mut().content = "First".to_string();
    board.dispatch(Command::Save).unwrap();
    let original = board.store().notes()[0].clone();

    board.dispatch(Command::Edit(original.id.clone())).unwrap();
    board.form_mut().content = "Second".to_string();
    board.dispatch(Command::Save).unwrap();
    drop(board);

    let reopened = open_board(&tmp, spot);
    let note = &reopened.store().notes()[0];
    assert_eq!(note.id, original.id);
    assert_eq!(note.created_at, original.created_at);
    assert_eq!(note.content, "Second");
}

struct ReachableOnly(HashSet<String>);

impl Fetcher for ReachableOnly {
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, FetchError> {
        if self.0.contains(&request.url) {
            Ok(AssetResponse {
                url: request.url.clone(),
                status: 200,
                kind: ResponseKind::Basic,
                content_type: Some("text/plain".to_string()),
                body: request.url.as_bytes().to_vec(),
            })
        } else {
            Err(FetchError::Offline(request.url.clone()))
        }
    }
}

fn manifest() -> Manifest {
    Manifest::build(
        ORIGIN,
        &["https://unpkg.com/leaflet@1.9.4/dist/leaflet.js".to_string()],
    )
    .unwrap()
}

#[tokio::test]
async fn test_install_with_one_unreachable_url() {
    let tmp = TempDir::new().unwrap();
    let manifest = manifest();
    let unreachable = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js".to_string();
    let reachable: HashSet<String> = manifest
        .urls()
        .iter()
        .filter(|u| **u != unreachable)
        .cloned()
        .collect();

    let storage = DiskCacheStorage::new(tmp.path().join("caches")).unwrap();
    let mut worker = OfflineWorker::new(
        storage,
        ReachableOnly(reachable.clone()),
        manifest,
        "pinitdown-v1",
        vec!["unpkg.com".to_string()],
    );

    let err = worker.install().await.unwrap_err();
    assert!(matches!(err, CacheError::InstallIncomplete { ref missing, .. } if missing == &vec![unreachable.clone()]));
    assert_eq!(worker.state(), WorkerState::Installed);

    let storage = worker.storage();
    assert!(storage.match_url("pinitdown-v1", &unreachable).unwrap().is_none());
    for url in &reachable {
        assert!(storage.match_url("pinitdown-v1", url).unwrap().is_some(), "{url} cached");
    }
}

#[tokio::test]
async fn test_activate_removes_two_stale_generations() {
    let tmp = TempDir::new().unwrap();
    let mut storage = DiskCacheStorage::new(tmp.path().join("caches")).unwrap();
    storage.open("pinitdown-v1").unwrap();
    storage.open("pinitdown-v2").unwrap();
    let shell = AssetResponse {
        url: format!("{}index.html", ORIGIN),
        status: 200,
        kind: ResponseKind::Basic,
        content_type: Some("text/html".to_string()),
        body: b"<html></html>".to_vec(),
    };
    storage.put("pinitdown-v3", &shell.url, &shell).unwrap();

    let mut worker = OfflineWorker::new(
        storage,
        ReachableOnly(HashSet::new()),
        manifest(),
        "pinitdown-v3",
        vec![],
    );
    assert_eq!(worker.restore().unwrap(), WorkerState::Installed);

    let mut deleted = worker.activate().unwrap();
    deleted.sort();
    assert_eq!(deleted, vec!["pinitdown-v1", "pinitdown-v2"]);
    assert_eq!(worker.storage().keys().unwrap(), vec!["pinitdown-v3"]);
    let hit = worker
        .storage()
        .match_url("pinitdown-v3", &shell.url)
        .unwrap()
        .unwrap();
    assert_eq!(hit.response.body, shell.body);
    assert_eq!(worker.state(), WorkerState::Active);
}
