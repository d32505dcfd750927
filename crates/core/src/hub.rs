#![forbid(unsafe_code)]

//! Renderers for the three plain-text files of a track hub.
//!
//! The genome browser parses these line by line, so blank lines and trailing newlines are
//! part of the format.

use crate::key::TrackKey;
use crate::model::Track;
use std::fmt::Write as _;

pub const HUB_FILE: &str = "hub.txt";
pub const GENOMES_FILE: &str = "genomes.txt";
pub const TRACK_DB_FILE: &str = "trackDb.txt";

const HUB_ID_PREFIX: &str = "TOPhub_";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HubSettings {
    pub short_label: String,
    pub long_label: String,
    pub email: String,
    pub description_url: String,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            short_label: "TopData".to_string(),
            long_label: "TopData".to_string(),
            email: "test@test.test".to_string(),
            description_url: "http://www.genome.duke.edu".to_string(),
        }
    }
}

pub fn hub_id(key: &TrackKey) -> String {
    format!("{HUB_ID_PREFIX}{key}")
}

pub fn track_db_path(genome: &str) -> String {
    format!("{genome}/{TRACK_DB_FILE}")
}

/// hub.txt has no trailing newline.
pub fn render_hub_txt(key: &TrackKey, settings: &HubSettings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "hub {}", hub_id(key));
    let _ = writeln!(out, "shortLabel {}", settings.short_label);
    let _ = writeln!(out, "longLabel {}", settings.long_label);
    let _ = writeln!(out, "genomesFile {GENOMES_FILE}");
    let _ = writeln!(out, "email {}", settings.email);
    let _ = write!(out, "descriptionUrl {}", settings.description_url);
    out
}

/// One stanza per genome, separated by a blank line.
pub fn render_genomes_txt<'a>(genomes: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for (index, genome) in genomes.into_iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "genome {genome}");
        let _ = writeln!(out, "trackDb {}", track_db_path(genome));
    }
    out
}

/// Every track block is wrapped in an empty line on both sides, so consecutive tracks are
/// separated by two blank lines.
pub fn render_track_db_txt(tracks: &[Track]) -> String {
    let mut out = String::new();
    for track in tracks {
        out.push('\n');
        let _ = writeln!(out, "track {}", track.name);
        let _ = writeln!(out, "bigDataUrl {}", track.big_data_url);
        let _ = writeln!(out, "shortLabel {}", track.short_label);
        let _ = writeln!(out, "longLabel {}", track.long_label);
        let _ = writeln!(out, "type {}", track.file_type);
        out.push_str("graphTypeDefault bar\n");
        out.push_str("autoScale off\n");
        out.push_str("maxHeightPixels 100:32:8\n");
        out.push_str("viewLimits 0:100\n");
        out.push_str("visibility dense\n");
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: i64, name: &str) -> Track {
        Track {
            id,
            genome: "hg19".to_string(),
            name: name.to_string(),
            short_label: name.to_string(),
            long_label: name.to_string(),
            big_data_url: "https://github.com/Duke-GCB/topdata".to_string(),
            file_type: "bigWig".to_string(),
            tf: "AR".to_string(),
            cell_type: "8988T".to_string(),
            rep_name: "rep1".to_string(),
            position: "chr1:100-200".to_string(),
        }
    }

    #[test]
    fn hub_txt_matches_browser_format() {
        let key = TrackKey::parse("1_2").expect("key");
        let text = render_hub_txt(&key, &HubSettings::default());
        assert_eq!(
            text,
            "hub TOPhub_1_2\n\
             shortLabel TopData\n\
             longLabel TopData\n\
             genomesFile genomes.txt\n\
             email test@test.test\n\
             descriptionUrl http://www.genome.duke.edu"
        );
    }

    #[test]
    fn genomes_txt_single_and_multiple() {
        assert_eq!(
            render_genomes_txt(["hg19"]),
            "genome hg19\ntrackDb hg19/trackDb.txt\n"
        );
        assert_eq!(
            render_genomes_txt(["hg19", "hg38"]),
            "genome hg19\ntrackDb hg19/trackDb.txt\n\ngenome hg38\ntrackDb hg38/trackDb.txt\n"
        );
        assert_eq!(render_genomes_txt(std::iter::empty()), "");
    }

    #[test]
    fn track_db_blocks_are_blank_line_wrapped() {
        let text = render_track_db_txt(&[track(1, "AR8988Trep1"), track(2, "ARCLLrep1")]);
        let expected = "
track AR8988Trep1
bigDataUrl https://github.com/Duke-GCB/topdata
shortLabel AR8988Trep1
longLabel AR8988Trep1
type bigWig
graphTypeDefault bar
autoScale off
maxHeightPixels 100:32:8
viewLimits 0:100
visibility dense


track ARCLLrep1
bigDataUrl https://github.com/Duke-GCB/topdata
shortLabel ARCLLrep1
longLabel ARCLLrep1
type bigWig
graphTypeDefault bar
autoScale off
maxHeightPixels 100:32:8
viewLimits 0:100
visibility dense

";
        assert_eq!(text, expected);
        assert_eq!(render_track_db_txt(&[]), "");
    }
}
