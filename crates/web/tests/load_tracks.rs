use std::path::PathBuf;
use td_storage::SqliteStore;
use td_web::loader;

const EXAMPLE_TRACKS_YAML: &str = r#"
- assembly: hg19
  tracks:
  - bigDataUrl: https://github.com/Duke-GCB/topdata/fakedata/AR_8988T_rep1.bw
    cell_type: 8988T
    longLabel: AR 8988T rep1
    rep_name: rep1
    shortLabel: AR 8988T rep1
    tf_name: AR
    track: AR_8988T_rep1
    type: bigWig
    position: "chr1:35000-40000"
  - bigDataUrl: https://github.com/Duke-GCB/topdata/fakedata/AR_8988T_rep2.bw
    cell_type: 8988T
    longLabel: AR 8988T rep2
    rep_name: rep2
    shortLabel: AR 8988T rep2
    tf_name: AR
    track: AR_8988T_rep2
    type: bigWig
    position: "chr1:35000-40000"
  - bigDataUrl: https://github.com/Duke-GCB/topdata/fakedata/ATF_8988T_rep1.bw
    cell_type: 8988T
    longLabel: ATF 8988T rep1
    rep_name: rep1
    shortLabel: ATF 8988T rep1
    tf_name: ATF
    track: ATF_8988T_rep1
    type: bigWig
    position: "chr1:35000-40000"
  - bigDataUrl: https://github.com/Duke-GCB/topdata/fakedata/ATF_8988T_rep2.bw
    cell_type: 8988T
    longLabel: ATF 8988T rep2
    rep_name: rep2
    shortLabel: ATF 8988T rep2
    tf_name: ATF
    track: ATF_8988T_rep2
    type: bigWig
    position: "chr1:35000-40000"
"#;

fn temp_storage_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    base.join(format!("topdata_loader_{test_name}_{pid}_{nonce}"))
}

fn names<T>(items: Vec<T>, name: impl Fn(T) -> String) -> Vec<String> {
    items.into_iter().map(name).collect()
}

#[test]
fn load_tracks_into_database() {
    let storage_dir = temp_storage_dir("load");
    std::fs::create_dir_all(&storage_dir).expect("create storage dir");
    let catalog = storage_dir.join("data.yaml");
    std::fs::write(&catalog, EXAMPLE_TRACKS_YAML).expect("write catalog");

    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let loaded = loader::load_tracks(&mut store, &catalog).expect("load tracks");
    assert_eq!(loaded, 4);

    assert_eq!(
        names(store.list_genomes().expect("genomes"), |g| g.name),
        vec!["hg19"]
    );
    assert_eq!(
        names(store.list_transcription_factors().expect("tfs"), |tf| tf.name),
        vec!["AR", "ATF"]
    );
    assert_eq!(
        names(store.list_cell_types().expect("cell types"), |ct| ct.name),
        vec!["8988T"]
    );
    assert_eq!(
        names(store.list_rep_names().expect("reps"), |rep| rep.name),
        vec!["rep1", "rep2"]
    );

    let tracks = store.list_tracks().expect("tracks");
    assert_eq!(
        tracks.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        vec![
            "AR_8988T_rep1",
            "AR_8988T_rep2",
            "ATF_8988T_rep1",
            "ATF_8988T_rep2"
        ]
    );
    for track in &tracks {
        assert_eq!(track.genome, "hg19");
        assert_eq!(track.file_type, "bigWig");
        assert_eq!(track.position, "chr1:35000-40000");
    }

    drop(store);
    let _ = std::fs::remove_dir_all(storage_dir);
}

#[test]
fn failed_load_leaves_store_unchanged() {
    let storage_dir = temp_storage_dir("rollback");
    std::fs::create_dir_all(&storage_dir).expect("create storage dir");
    let catalog = storage_dir.join("data.yaml");
    let duplicated = format!(
        "{EXAMPLE_TRACKS_YAML}{}",
        r#"
- assembly: hg19
  tracks:
  - bigDataUrl: https://github.com/Duke-GCB/topdata/fakedata/AR_8988T_rep1.bw
    cell_type: CLL
    longLabel: AR CLL rep1
    rep_name: rep9
    shortLabel: AR CLL rep1
    tf_name: AR
    track: AR_8988T_rep1
    type: bigWig
"#
    );
    std::fs::write(&catalog, duplicated).expect("write catalog");

    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let err = loader::load_tracks(&mut store, &catalog).expect_err("duplicate track name");
    assert!(format!("{err:#}").contains("AR_8988T_rep1"));
    assert_eq!(store.track_count().expect("count"), 0);
    assert!(store.list_cell_types().expect("cell types").is_empty());
    assert!(store.list_rep_names().expect("reps").is_empty());

    drop(store);
    let _ = std::fs::remove_dir_all(storage_dir);
}

#[test]
fn missing_catalog_is_reported() {
    let storage_dir = temp_storage_dir("missing");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let err = loader::load_tracks(&mut store, &storage_dir.join("nope.yaml"))
        .expect_err("missing file");
    assert!(format!("{err:#}").contains("failed to read"));
    drop(store);
    let _ = std::fs::remove_dir_all(storage_dir);
}
