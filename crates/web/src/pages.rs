#![forbid(unsafe_code)]

//! Server-rendered HTML pages. Every page shares the navigation bar; the wizard pages also
//! show step breadcrumbs.

use crate::forms::{CellTypeForm, TrackChoice, TracksForm, TranscriptionFactorForm, fields};
use crate::html::{escape, link};
use crate::routes;
use std::fmt::Write as _;
use td_core::key::TrackKey;
use td_core::model::{CellType, Genome, TranscriptionFactor};
use td_storage::TrackPair;

pub const NAV_TITLE: &str = "Top Data";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Tracks,
    About,
}

impl Page {
    fn label(self) -> &'static str {
        match self {
            Page::Tracks => "Tracks",
            Page::About => "About",
        }
    }

    fn href(self) -> &'static str {
        match self {
            Page::Tracks => routes::SELECT_FACTORS,
            Page::About => routes::ABOUT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigation {
    pub title: &'static str,
    pub items: Vec<NavItem>,
    pub download_all_url: String,
}

impl Navigation {
    pub fn new(active: Page, download_all_url: &str) -> Self {
        let items = [Page::Tracks, Page::About]
            .into_iter()
            .map(|page| NavItem {
                label: page.label(),
                href: page.href(),
                is_active: page == active,
            })
            .collect();
        Self {
            title: NAV_TITLE,
            items,
            download_all_url: download_all_url.to_string(),
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            r#"<nav class="navbar navbar-expand navbar-dark bg-dark"><a class="navbar-brand" href="{}">{}</a><ul class="navbar-nav mr-auto">"#,
            routes::INDEX,
            escape(self.title)
        );
        for item in &self.items {
            let class = if item.is_active {
                "nav-item active"
            } else {
                "nav-item"
            };
            let _ = write!(
                out,
                r#"<li class="{class}"><a class="nav-link" href="{}">{}</a></li>"#,
                item.href,
                escape(item.label)
            );
        }
        let _ = write!(
            out,
            r#"</ul><a class="btn btn-outline-light" href="{}">Download All Data</a></nav>"#,
            escape(&self.download_all_url)
        );
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    TranscriptionFactors,
    CellTypes,
    Tracks,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::TranscriptionFactors, Step::CellTypes, Step::Tracks];

    pub fn label(self) -> &'static str {
        match self {
            Step::TranscriptionFactors => "Transcription Factors",
            Step::CellTypes => "Cell Type",
            Step::Tracks => "Tracks",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepItem {
    pub label: &'static str,
    pub is_active: bool,
}

/// Breadcrumbs up to and including the active step.
pub fn step_items(active: Step) -> Vec<StepItem> {
    let mut items = Vec::new();
    for step in Step::ALL {
        items.push(StepItem {
            label: step.label(),
            is_active: step == active,
        });
        if step == active {
            break;
        }
    }
    items
}

fn render_steps(active: Step) -> String {
    let mut out = String::from(r#"<ol class="breadcrumb">"#);
    for item in step_items(active) {
        if item.is_active {
            let _ = write!(
                out,
                r#"<li class="breadcrumb-item active">{}</li>"#,
                escape(item.label)
            );
        } else {
            let _ = write!(out, r#"<li class="breadcrumb-item">{}</li>"#, escape(item.label));
        }
    }
    out.push_str("</ol>");
    out
}

fn layout(nav: &Navigation, title: &str, content: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            r#"<html lang="en"><head><meta charset="utf-8">"#,
            r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#,
            "<title>{title} - {nav_title}</title>",
            r#"<link rel="stylesheet" href="https://stackpath.bootstrapcdn.com/bootstrap/4.1.3/css/bootstrap.min.css">"#,
            "</head><body>{nav}",
            r#"<main class="container mt-3">{content}</main>"#,
            "</body></html>\n"
        ),
        title = escape(title),
        nav_title = escape(nav.title),
        nav = nav.render(),
        content = content
    )
}

fn wizard_form(action: &str, form_html: &str, submit: &str) -> String {
    format!(
        r#"<form method="post" action="{}">{form_html}<button type="submit" class="btn btn-primary">{}</button></form>"#,
        escape(action),
        escape(submit)
    )
}

pub fn select_factors(nav: &Navigation, form: &TranscriptionFactorForm) -> String {
    let content = format!(
        "{}{}",
        render_steps(Step::TranscriptionFactors),
        wizard_form(routes::SELECT_FACTORS, &form.as_p(), "Next")
    );
    layout(nav, "Select Transcription Factors", &content)
}

pub fn select_cell_type(nav: &Navigation, form: &CellTypeForm) -> String {
    let content = format!(
        "{}{}",
        render_steps(Step::CellTypes),
        wizard_form(routes::SELECT_CELL_TYPE, &form.as_p(), "Next")
    );
    layout(nav, "Select Cell Types", &content)
}

/// Grid of the selected transcription factors by cell types. A cell carries a checkbox
/// only when the pair has tracks.
pub fn select_tracks(
    nav: &Navigation,
    action: &str,
    tfs: &[TranscriptionFactor],
    cell_types: &[CellType],
    pairs: &[TrackPair],
    form: &TracksForm,
) -> String {
    let mut grid = String::from(r#"<table class="table table-sm"><thead><tr><th></th>"#);
    for cell_type in cell_types {
        let _ = write!(grid, "<th>{}</th>", escape(&cell_type.name));
    }
    grid.push_str("</tr></thead><tbody>");
    for tf in tfs {
        let _ = write!(grid, "<tr><th>{}</th>", escape(&tf.name));
        for cell_type in cell_types {
            let pair = pairs
                .iter()
                .find(|pair| pair.tf == tf.name && pair.cell_type == cell_type.name);
            let Some(pair) = pair else {
                grid.push_str("<td></td>");
                continue;
            };
            let choice = TrackChoice {
                tf: pair.tf.clone(),
                cell_type: pair.cell_type.clone(),
            };
            let checked = if form.selected().contains(&choice) {
                " checked"
            } else {
                ""
            };
            let _ = write!(
                grid,
                r#"<td><input type="checkbox" name="{}" value="{}" title="{} tracks"{checked}></td>"#,
                fields::TRACK_STR,
                escape(&choice.value()),
                pair.track_count
            );
        }
        grid.push_str("</tr>");
    }
    grid.push_str("</tbody></table>");

    let errors = form
        .errors()
        .field(fields::TRACK_STR)
        .map(|errors| errors.as_ul())
        .unwrap_or_default();
    let content = format!(
        "{}{}",
        render_steps(Step::Tracks),
        wizard_form(action, &format!("{errors}{grid}"), "View in Genome Browser")
    );
    layout(nav, "Select Tracks", &content)
}

pub fn detail(nav: &Navigation, key: &TrackKey, genomes: &[Genome]) -> String {
    let mut content = format!(
        "<h2>Track hub {}</h2><p>{}</p><ul>",
        escape(&key.encode()),
        link(&routes::hub_path(key), "hub.txt")
    );
    let _ = write!(
        content,
        "<li>{}<ul>",
        link(&routes::genomes_path(key), "genomes.txt")
    );
    for genome in genomes {
        let _ = write!(
            content,
            "<li>{} {}</li>",
            escape(&genome.name),
            link(&routes::track_db_path(key, &genome.name), "trackDb.txt")
        );
    }
    content.push_str("</ul></li></ul>");
    layout(nav, "Track Hub", &content)
}

pub fn about(nav: &Navigation) -> String {
    let content = format!(
        concat!(
            "<h2>About</h2>",
            "<p>TopData builds UCSC genome browser track hubs for transcription factor ",
            "binding data. Pick transcription factors and cell types, choose the tracks to ",
            "show, and the browser opens with a hub generated for your selection.</p>",
            "<p>{}</p>"
        ),
        link(&nav.download_all_url, "Download all data")
    );
    layout(nav, "About", &content)
}

pub fn error(nav: &Navigation, title: &str, message: &str) -> String {
    let content = format!(
        r#"<div class="alert alert-danger"><h2>{}</h2><p>{}</p></div>"#,
        escape(title),
        escape(message)
    );
    layout(nav, title, &content)
}
