#![forbid(unsafe_code)]

//! The three wizard forms. Each step posts repeated fields and, once valid, hands the
//! accumulated selection to the next step through query parameters.

use crate::config::Settings;
use crate::html;
use crate::http::encode_form;
use crate::routes;
use std::collections::BTreeMap;
use td_core::browser::BrowserLink;
use td_core::key::TrackKey;
use td_storage::{SqliteStore, StoreError};

pub mod fields {
    pub const TF: &str = "tf";
    pub const CELL_TYPE: &str = "celltype";
    pub const TRACK_STR: &str = "track_str";
}

pub const NON_FIELD_ERRORS: &str = "__all__";
pub const REQUIRED_MESSAGE: &str = "This field is required.";

const TF_LABEL: &str = "Select one or more transcription factors";
const CELL_TYPE_LABEL: &str = "Select one or more cell types";

pub fn invalid_choice_message(value: &str) -> String {
    format!("Select a valid choice. {value} is not one of the available choices.")
}

pub fn too_many_tracks_message(num_tracks: usize, limit: usize) -> String {
    format!(
        "Too many cell types selected. Your selection resulted in {num_tracks} tracks. Max allowed is {limit}."
    )
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorList {
    errors: Vec<String>,
}

impl ErrorList {
    pub fn push(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.errors
    }

    /// Bootstrap-styled `<ul>`; empty when there is nothing to report.
    pub fn as_ul(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        let items = self
            .errors
            .iter()
            .map(|error| format!(r#"<li class="d-block">{}</li>"#, html::escape(error)))
            .collect::<String>();
        format!(r#"<ul class="errorlist alert alert-warning">{items}</ul>"#)
    }
}

impl From<Vec<String>> for ErrorList {
    fn from(errors: Vec<String>) -> Self {
        Self { errors }
    }
}

/// Errors keyed by field name; form-wide errors live under [`NON_FIELD_ERRORS`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormErrors {
    by_field: BTreeMap<String, ErrorList>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.by_field
            .entry(field.to_string())
            .or_default()
            .push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty()
    }

    pub fn field(&self, field: &str) -> Option<&ErrorList> {
        self.by_field.get(field)
    }

    pub fn non_field(&self) -> Option<&ErrorList> {
        self.by_field.get(NON_FIELD_ERRORS)
    }

    pub fn remove(&mut self, field: &str) -> Option<ErrorList> {
        self.by_field.remove(field)
    }

    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        self.by_field
            .iter()
            .map(|(field, errors)| (field.clone(), errors.messages().to_vec()))
            .collect()
    }

    fn field_ul(&self, field: &str) -> String {
        self.field(field).map(ErrorList::as_ul).unwrap_or_default()
    }

    fn non_field_ul(&self) -> String {
        self.non_field().map(ErrorList::as_ul).unwrap_or_default()
    }
}

/// Validates a multi-select against its choices. The result follows choice order with
/// duplicates removed.
fn clean_choices(
    values: &[String],
    choices: &[String],
    required: bool,
) -> Result<Vec<String>, String> {
    if values.is_empty() {
        return if required {
            Err(REQUIRED_MESSAGE.to_string())
        } else {
            Ok(Vec::new())
        };
    }
    if let Some(invalid) = values.iter().find(|value| !choices.contains(value)) {
        return Err(invalid_choice_message(invalid));
    }
    Ok(choices
        .iter()
        .filter(|choice| values.contains(choice))
        .cloned()
        .collect())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptionFactorForm {
    choices: Vec<String>,
    selected: Vec<String>,
    bound: bool,
    errors: FormErrors,
}

impl TranscriptionFactorForm {
    pub fn unbound(store: &SqliteStore) -> Result<Self, StoreError> {
        Ok(Self {
            choices: tf_choices(store)?,
            selected: Vec::new(),
            bound: false,
            errors: FormErrors::default(),
        })
    }

    pub fn bind(store: &SqliteStore, tfs: &[String]) -> Result<Self, StoreError> {
        let choices = tf_choices(store)?;
        let mut errors = FormErrors::default();
        let selected = match clean_choices(tfs, &choices, true) {
            Ok(selected) => selected,
            Err(message) => {
                errors.add(fields::TF, message);
                Vec::new()
            }
        };
        Ok(Self {
            choices,
            selected,
            bound: true,
            errors,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.bound && self.errors.is_empty()
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn next_step_url(&self) -> String {
        let query = self
            .selected
            .iter()
            .map(|tf| (fields::TF, tf.as_str()))
            .collect::<Vec<_>>();
        format!("{}?{}", routes::SELECT_CELL_TYPE, encode_form(&query))
    }

    pub fn as_p(&self) -> String {
        format!(
            "{}{}<p>{} {}</p>",
            self.errors.non_field_ul(),
            self.errors.field_ul(fields::TF),
            html::label(fields::TF, TF_LABEL),
            html::select_multiple(fields::TF, &self.choices, &self.selected)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellTypeForm {
    cell_type_choices: Vec<String>,
    selected_cell_types: Vec<String>,
    selected_tfs: Vec<String>,
    bound: bool,
    errors: FormErrors,
}

impl CellTypeForm {
    /// Validates both fields. With a `limit` (submitted forms only) it also rejects
    /// selections whose track count exceeds it.
    pub fn bind(
        store: &SqliteStore,
        tfs: &[String],
        cell_types: &[String],
        limit: Option<usize>,
    ) -> Result<Self, StoreError> {
        let cell_type_choices = cell_type_choices(store)?;
        let tf_choices = tf_choices(store)?;
        let mut errors = FormErrors::default();

        let selected_cell_types = clean_choices(cell_types, &cell_type_choices, true);
        let selected_tfs = clean_choices(tfs, &tf_choices, true);

        if let (Some(limit), Ok(tfs), Ok(cell_types)) =
            (limit, &selected_tfs, &selected_cell_types)
        {
            let num_tracks = store.count_tracks_for_selection(tfs, cell_types)?;
            if num_tracks > limit {
                errors.add(
                    NON_FIELD_ERRORS,
                    too_many_tracks_message(num_tracks, limit),
                );
            }
        }

        let selected_cell_types = selected_cell_types.unwrap_or_else(|message| {
            errors.add(fields::CELL_TYPE, message);
            Vec::new()
        });
        let selected_tfs = selected_tfs.unwrap_or_else(|message| {
            errors.add(fields::TF, message);
            Vec::new()
        });

        Ok(Self {
            cell_type_choices,
            selected_cell_types,
            selected_tfs,
            bound: true,
            errors,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.bound && self.errors.is_empty()
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Drops a field's errors, e.g. so a user arriving from the previous step is not
    /// warned about a field they have not filled in yet.
    pub fn clear_errors(&mut self, field: &str) {
        self.errors.remove(field);
    }

    pub fn cell_type_choices(&self) -> &[String] {
        &self.cell_type_choices
    }

    pub fn selected_tfs(&self) -> &[String] {
        &self.selected_tfs
    }

    pub fn selected_cell_types(&self) -> &[String] {
        &self.selected_cell_types
    }

    pub fn next_step_url(&self) -> String {
        let query = self
            .selected_tfs
            .iter()
            .map(|tf| (fields::TF, tf.as_str()))
            .chain(
                self.selected_cell_types
                    .iter()
                    .map(|cell_type| (fields::CELL_TYPE, cell_type.as_str())),
            )
            .collect::<Vec<_>>();
        format!("{}?{}", routes::SELECT_TRACKS, encode_form(&query))
    }

    pub fn as_p(&self) -> String {
        format!(
            "{}{}<p>{} {}</p>{}{}",
            self.errors.non_field_ul(),
            self.errors.field_ul(fields::CELL_TYPE),
            html::label(fields::CELL_TYPE, CELL_TYPE_LABEL),
            html::select_multiple(
                fields::CELL_TYPE,
                &self.cell_type_choices,
                &self.selected_cell_types
            ),
            self.errors.field_ul(fields::TF),
            html::hidden_inputs(fields::TF, &self.selected_tfs)
        )
    }
}

/// A `TF,CELLTYPE` checkbox value on the track selection step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackChoice {
    pub tf: String,
    pub cell_type: String,
}

impl TrackChoice {
    pub fn parse(value: &str) -> Option<Self> {
        let (tf, cell_type) = value.split_once(',')?;
        if tf.is_empty() || cell_type.is_empty() {
            return None;
        }
        Some(Self {
            tf: tf.to_string(),
            cell_type: cell_type.to_string(),
        })
    }

    pub fn value(&self) -> String {
        format!("{},{}", self.tf, self.cell_type)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracksForm {
    selected: Vec<TrackChoice>,
    bound: bool,
    errors: FormErrors,
}

impl TracksForm {
    pub fn unbound() -> Self {
        Self {
            selected: Vec::new(),
            bound: false,
            errors: FormErrors::default(),
        }
    }

    /// A value is a valid choice only if at least one track has that exact pair.
    pub fn bind(store: &SqliteStore, values: &[String]) -> Result<Self, StoreError> {
        let mut errors = FormErrors::default();
        let mut selected: Vec<TrackChoice> = Vec::new();

        if values.is_empty() {
            errors.add(fields::TRACK_STR, REQUIRED_MESSAGE);
        }
        for value in values {
            let choice = match TrackChoice::parse(value) {
                Some(choice) => choice,
                None => {
                    errors.add(fields::TRACK_STR, invalid_choice_message(value));
                    selected.clear();
                    break;
                }
            };
            if !store.pair_exists(&choice.tf, &choice.cell_type)? {
                errors.add(fields::TRACK_STR, invalid_choice_message(value));
                selected.clear();
                break;
            }
            if !selected.contains(&choice) {
                selected.push(choice);
            }
        }

        Ok(Self {
            selected,
            bound: true,
            errors,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.bound && self.errors.is_empty()
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn selected(&self) -> &[TrackChoice] {
        &self.selected
    }

    /// Track ids of every selected pair, pair by pair in submitted order.
    pub fn track_key(&self, store: &SqliteStore) -> Result<Option<TrackKey>, StoreError> {
        let mut ids = Vec::new();
        for choice in &self.selected {
            for track in store.tracks_for_pair(&choice.tf, &choice.cell_type)? {
                ids.push(track.id);
            }
        }
        Ok(TrackKey::try_new(ids).ok())
    }

    /// Genome browser URL preloaded with this selection's hub. The browser opens on the
    /// genome and position of the first selected track.
    pub fn next_step_url(
        &self,
        store: &SqliteStore,
        settings: &Settings,
        host: Option<&str>,
    ) -> Result<Option<String>, StoreError> {
        if !self.is_valid() {
            return Ok(None);
        }
        let Some(key) = self.track_key(store)? else {
            return Ok(None);
        };
        let Some(first) = store.tracks_by_ids(&key.ids()[..1])?.into_iter().next() else {
            return Ok(None);
        };

        let hub_url = format!("{}{}", settings.base_url(host), routes::hub_path(&key));
        let link = BrowserLink {
            browser_url: &settings.browser_url,
            organism: &settings.organism,
            genome: &first.genome,
            hub_url: &hub_url,
            position: &first.position,
        };
        Ok(Some(link.to_url()))
    }
}

fn tf_choices(store: &SqliteStore) -> Result<Vec<String>, StoreError> {
    Ok(store
        .list_transcription_factors()?
        .into_iter()
        .map(|tf| tf.name)
        .collect())
}

fn cell_type_choices(store: &SqliteStore) -> Result<Vec<String>, StoreError> {
    Ok(store
        .list_cell_types()?
        .into_iter()
        .map(|cell_type| cell_type.name)
        .collect())
}
