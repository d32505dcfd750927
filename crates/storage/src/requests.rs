#![forbid(unsafe_code)]

/// A track to insert. Lookup rows are referenced by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTrack {
    pub genome: String,
    pub name: String,
    pub short_label: String,
    pub long_label: String,
    pub big_data_url: String,
    pub file_type: String,
    pub tf: String,
    pub cell_type: String,
    pub rep_name: String,
    pub position: String,
}

/// A transcription factor / cell type combination that has at least one track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackPair {
    pub tf: String,
    pub cell_type: String,
    pub track_count: usize,
}
