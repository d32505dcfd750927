#![forbid(unsafe_code)]

use crate::http::{decode_path_segment, encode_path_segment};
use td_core::hub::{GENOMES_FILE, HUB_FILE, TRACK_DB_FILE};
use td_core::key::TrackKey;

pub const ROOT: &str = "/";
pub const INDEX: &str = "/tracks/";
pub const ABOUT: &str = "/tracks/about/";
pub const SELECT_FACTORS: &str = "/tracks/select-factors/";
pub const SELECT_CELL_TYPE: &str = "/tracks/select-cell-type/";
pub const SELECT_TRACKS: &str = "/tracks/select-tracks/";

pub fn detail_path(key: &TrackKey) -> String {
    format!("{INDEX}{key}/")
}

pub fn hub_path(key: &TrackKey) -> String {
    format!("{INDEX}{key}/{HUB_FILE}")
}

pub fn genomes_path(key: &TrackKey) -> String {
    format!("{INDEX}{key}/{GENOMES_FILE}")
}

pub fn track_db_path(key: &TrackKey, genome: &str) -> String {
    format!("{INDEX}{key}/{}/{TRACK_DB_FILE}", encode_path_segment(genome))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Root,
    Index,
    About,
    SelectFactors,
    SelectCellType,
    SelectTracks,
    Detail { key: String },
    Hub { key: String },
    Genomes { key: String },
    TrackDb { key: String, genome: String },
    NotFound,
}

/// Maps a request path (no query) onto a route. Named pages win over track keys, and the
/// trailing slash on pages is optional.
pub fn resolve(path: &str) -> Route {
    if path == ROOT || path.is_empty() {
        return Route::Root;
    }
    let Some(rest) = path.strip_prefix("/tracks") else {
        return Route::NotFound;
    };
    if rest.is_empty() {
        return Route::Index;
    }
    let Some(rest) = rest.strip_prefix('/') else {
        return Route::NotFound;
    };
    if rest.is_empty() {
        return Route::Index;
    }

    let trimmed = rest.strip_suffix('/').unwrap_or(rest);
    let segments = trimmed.split('/').collect::<Vec<_>>();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Route::NotFound;
    }
    let Some(segments) = segments
        .iter()
        .map(|segment| decode_path_segment(segment))
        .collect::<Option<Vec<_>>>()
    else {
        return Route::NotFound;
    };
    let is_dir = rest.ends_with('/');

    match segments.as_slice() {
        [page] if page == "about" => Route::About,
        [page] if page == "select-factors" => Route::SelectFactors,
        [page] if page == "select-cell-type" => Route::SelectCellType,
        [page] if page == "select-tracks" => Route::SelectTracks,
        [key] => Route::Detail { key: key.clone() },
        [key, file] if !is_dir && file == HUB_FILE => Route::Hub { key: key.clone() },
        [key, file] if !is_dir && file == GENOMES_FILE => Route::Genomes { key: key.clone() },
        [key, genome, file] if !is_dir && file == TRACK_DB_FILE => Route::TrackDb {
            key: key.clone(),
            genome: genome.clone(),
        },
        _ => Route::NotFound,
    }
}
