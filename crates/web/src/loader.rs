#![forbid(unsafe_code)]

//! Bulk import of track definitions from a YAML catalog, one entry per genome assembly.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use td_storage::{NewTrack, SqliteStore};

#[derive(Debug, Deserialize)]
struct GenomeEntry {
    #[serde(deserialize_with = "scalar_string")]
    assembly: String,
    #[serde(default)]
    tracks: Vec<TrackEntry>,
}

#[derive(Debug, Deserialize)]
struct TrackEntry {
    #[serde(deserialize_with = "scalar_string")]
    track: String,
    #[serde(rename = "type", deserialize_with = "scalar_string")]
    file_type: String,
    #[serde(rename = "shortLabel", deserialize_with = "scalar_string")]
    short_label: String,
    #[serde(rename = "longLabel", deserialize_with = "scalar_string")]
    long_label: String,
    #[serde(rename = "bigDataUrl", deserialize_with = "scalar_string")]
    big_data_url: String,
    #[serde(deserialize_with = "scalar_string")]
    tf_name: String,
    #[serde(deserialize_with = "scalar_string")]
    cell_type: String,
    #[serde(deserialize_with = "scalar_string")]
    rep_name: String,
    #[serde(default, deserialize_with = "scalar_string")]
    position: String,
}

/// Accepts any YAML scalar as text, so names such as `1234` or `true` survive unquoted.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(value) => Ok(value),
        serde_yaml::Value::Number(value) => Ok(value.to_string()),
        serde_yaml::Value::Bool(value) => Ok(value.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a scalar, found {other:?}"
        ))),
    }
}

/// Flattens the catalog into insert requests, preserving file order.
pub fn parse_catalog(yaml: &str) -> Result<Vec<NewTrack>> {
    let genomes: Vec<GenomeEntry> =
        serde_yaml::from_str(yaml).context("track catalog is not a list of genomes")?;
    let mut tracks = Vec::new();
    for genome in genomes {
        for entry in genome.tracks {
            tracks.push(NewTrack {
                genome: genome.assembly.clone(),
                name: entry.track,
                short_label: entry.short_label,
                long_label: entry.long_label,
                big_data_url: entry.big_data_url,
                file_type: entry.file_type,
                tf: entry.tf_name,
                cell_type: entry.cell_type,
                rep_name: entry.rep_name,
                position: entry.position,
            });
        }
    }
    Ok(tracks)
}

pub fn read_tracks_from_config(path: &Path) -> Result<Vec<NewTrack>> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_catalog(&yaml).with_context(|| format!("failed to parse {}", path.display()))
}

/// Loads every track in `path` in a single transaction.
pub fn load_tracks(store: &mut SqliteStore, path: &Path) -> Result<usize> {
    let tracks = read_tracks_from_config(path)?;
    tracing::debug!(file = %path.display(), tracks = tracks.len(), "parsed track catalog");
    let loaded = store
        .load_tracks(&tracks)
        .with_context(|| format!("failed to load tracks from {}", path.display()))?;
    tracing::info!(file = %path.display(), loaded, "tracks loaded");
    Ok(loaded)
}
