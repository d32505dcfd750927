#![forbid(unsafe_code)]

pub mod hub;

pub mod model {
    pub const MAX_NAME_LEN: usize = 255;
    pub const MAX_URL_LEN: usize = 1000;

    /// A genome assembly a track exists in. Example: `hg19`.
    #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Genome {
        pub name: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct TranscriptionFactor {
        pub name: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct CellType {
        pub name: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct RepName {
        pub id: i64,
        pub name: String,
    }

    /// One genomic data file, tagged by transcription factor, cell type, replicate and
    /// genome assembly. `id` is the row identifier that ends up in encoded hub keys.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Track {
        pub id: i64,
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

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum FieldError {
        Empty { field: &'static str },
        TooLong { field: &'static str, max: usize },
    }

    impl std::fmt::Display for FieldError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Empty { field } => write!(f, "{field} must not be empty"),
                Self::TooLong { field, max } => {
                    write!(f, "{field} must be at most {max} characters")
                }
            }
        }
    }

    impl std::error::Error for FieldError {}

    pub fn validate_name(field: &'static str, value: &str) -> Result<(), FieldError> {
        validate_text(field, value, MAX_NAME_LEN)
    }

    pub fn validate_url(field: &'static str, value: &str) -> Result<(), FieldError> {
        validate_text(field, value, MAX_URL_LEN)
    }

    fn validate_text(field: &'static str, value: &str, max: usize) -> Result<(), FieldError> {
        if value.trim().is_empty() {
            return Err(FieldError::Empty { field });
        }
        if value.chars().count() > max {
            return Err(FieldError::TooLong { field, max });
        }
        Ok(())
    }
}

pub mod key {
    /// Upper bound on the raw key length accepted from a URL path segment.
    pub const MAX_KEY_LEN: usize = 16 * 1024;

    /// Track row ids joined by `_`, used as an opaque path segment to recover a selection.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct TrackKey {
        ids: Vec<i64>,
    }

    impl TrackKey {
        pub fn try_new(ids: Vec<i64>) -> Result<Self, KeyError> {
            if ids.is_empty() {
                return Err(KeyError::Empty);
            }
            if let Some(index) = ids.iter().position(|id| *id < 0) {
                return Err(KeyError::InvalidToken {
                    index,
                    token: ids[index].to_string(),
                });
            }
            Ok(Self { ids })
        }

        pub fn parse(value: &str) -> Result<Self, KeyError> {
            if value.is_empty() {
                return Err(KeyError::Empty);
            }
            if value.len() > MAX_KEY_LEN {
                return Err(KeyError::TooLong);
            }

            let mut ids = Vec::new();
            for (index, token) in value.split('_').enumerate() {
                let canonical = token == "0" || !token.starts_with('0');
                if token.is_empty() || !canonical || !token.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(KeyError::InvalidToken {
                        index,
                        token: token.to_string(),
                    });
                }
                let id = token.parse::<i64>().map_err(|_| KeyError::InvalidToken {
                    index,
                    token: token.to_string(),
                })?;
                ids.push(id);
            }

            Ok(Self { ids })
        }

        pub fn ids(&self) -> &[i64] {
            &self.ids
        }

        pub fn encode(&self) -> String {
            self.ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join("_")
        }
    }

    impl std::fmt::Display for TrackKey {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.encode())
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum KeyError {
        Empty,
        TooLong,
        InvalidToken { index: usize, token: String },
    }

    impl std::fmt::Display for KeyError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Empty => write!(f, "track key is empty"),
                Self::TooLong => write!(f, "track key is too long"),
                Self::InvalidToken { index, token } => {
                    write!(f, "track key token {index} is not a track id: {token:?}")
                }
            }
        }
    }

    impl std::error::Error for KeyError {}
}

pub mod browser {
    pub const DEFAULT_BROWSER_URL: &str = "https://genome.ucsc.edu/cgi-bin/hgTracks";
    pub const DEFAULT_ORGANISM: &str = "human";

    /// Everything the external genome browser needs to open a hub at a location.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct BrowserLink<'a> {
        pub browser_url: &'a str,
        pub organism: &'a str,
        pub genome: &'a str,
        pub hub_url: &'a str,
        pub position: &'a str,
    }

    impl BrowserLink<'_> {
        // The browser takes hubUrl verbatim; it is not percent-encoded.
        pub fn to_url(&self) -> String {
            format!(
                "{}?org={}&db={}&hubUrl={}&position={}",
                self.browser_url, self.organism, self.genome, self.hub_url, self.position
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::browser::BrowserLink;
    use super::key::{KeyError, TrackKey};
    use super::model::{FieldError, validate_name, validate_url};

    #[test]
    fn key_parses_ids_in_order() {
        let key = TrackKey::parse("1_2_4").expect("valid key");
        assert_eq!(key.ids(), &[1, 2, 4]);
        assert_eq!(key.encode(), "1_2_4");
        assert_eq!(key.to_string(), "1_2_4");
    }

    #[test]
    fn key_rejects_malformed_tokens() {
        assert_eq!(TrackKey::parse(""), Err(KeyError::Empty));
        assert!(matches!(
            TrackKey::parse("1__2"),
            Err(KeyError::InvalidToken { index: 1, .. })
        ));
        assert!(matches!(
            TrackKey::parse("1_x"),
            Err(KeyError::InvalidToken { index: 1, .. })
        ));
        assert!(matches!(
            TrackKey::parse("-1"),
            Err(KeyError::InvalidToken { index: 0, .. })
        ));
        assert!(matches!(
            TrackKey::parse("99999999999999999999"),
            Err(KeyError::InvalidToken { index: 0, .. })
        ));
    }

    #[test]
    fn key_accepts_only_canonical_ids() {
        assert!(matches!(
            TrackKey::parse("01_002"),
            Err(KeyError::InvalidToken { index: 0, .. })
        ));
        assert!(matches!(
            TrackKey::parse("1_002"),
            Err(KeyError::InvalidToken { index: 1, .. })
        ));
        for raw in ["0", "10_2", "1_2_4"] {
            let key = TrackKey::parse(raw).expect("canonical key");
            assert_eq!(key.encode(), raw);
        }
    }

    #[test]
    fn key_from_ids_requires_non_negative_ids() {
        assert_eq!(TrackKey::try_new(Vec::new()), Err(KeyError::Empty));
        assert!(TrackKey::try_new(vec![3, -1]).is_err());
        let key = TrackKey::try_new(vec![7, 3]).expect("valid ids");
        assert_eq!(key.encode(), "7_3");
    }

    #[test]
    fn field_validation_bounds() {
        assert!(validate_name("name", "hg19").is_ok());
        assert_eq!(
            validate_name("name", "  "),
            Err(FieldError::Empty { field: "name" })
        );
        let long = "a".repeat(256);
        assert_eq!(
            validate_name("name", &long),
            Err(FieldError::TooLong {
                field: "name",
                max: 255
            })
        );
        assert!(validate_url("big_data_url", &long).is_ok());
    }

    #[test]
    fn browser_link_keeps_hub_url_verbatim() {
        let link = BrowserLink {
            browser_url: "https://genome.ucsc.edu/cgi-bin/hgTracks",
            organism: "human",
            genome: "hg19",
            hub_url: "http://testserver/tracks/1_2/hub.txt",
            position: "chr1:100-200",
        };
        assert_eq!(
            link.to_url(),
            "https://genome.ucsc.edu/cgi-bin/hgTracks?org=human&db=hg19&hubUrl=http://testserver/tracks/1_2/hub.txt&position=chr1:100-200"
        );
    }
}
