#![forbid(unsafe_code)]

//! Request handlers. `dispatch` never fails: store errors become a 500 page and are logged.

use crate::config::Settings;
use crate::forms::{CellTypeForm, TracksForm, TranscriptionFactorForm, fields};
use crate::http::{HttpRequest, HttpResponse, Status};
use crate::pages::{self, Navigation, Page};
use crate::routes::{self, Route};
use td_core::hub::{render_genomes_txt, render_hub_txt, render_track_db_txt};
use td_core::key::TrackKey;
use td_storage::{SqliteStore, StoreError};

pub fn dispatch(request: &HttpRequest, store: &SqliteStore, settings: &Settings) -> HttpResponse {
    let method = request.method.as_str();
    if method != "GET" && method != "HEAD" && method != "POST" {
        return HttpResponse::plain(Status::MethodNotAllowed, "Method not allowed.");
    }
    let is_post = method == "POST";

    let route = routes::resolve(request.path());
    let result = match route {
        Route::Root => Ok(HttpResponse::redirect(routes::INDEX)),
        Route::Index => Ok(HttpResponse::redirect(routes::SELECT_FACTORS)),
        Route::About => Ok(HttpResponse::html(
            Status::Ok,
            pages::about(&Navigation::new(Page::About, &settings.all_data_url)),
        )),
        Route::SelectFactors => select_factors(request, store, settings),
        Route::SelectCellType => select_cell_type(request, store, settings),
        Route::SelectTracks => select_tracks(request, store, settings),
        _ if is_post => Ok(HttpResponse::plain(
            Status::MethodNotAllowed,
            "Method not allowed.",
        )),
        Route::Detail { key } => with_key(&key, settings, |key| detail(key, store, settings)),
        Route::Hub { key } => with_key(&key, settings, |key| {
            Ok(HttpResponse::text(render_hub_txt(key, &settings.hub)))
        }),
        Route::Genomes { key } => with_key(&key, settings, |key| genomes(key, store)),
        Route::TrackDb { key, genome } => {
            with_key(&key, settings, |key| track_db(key, &genome, store))
        }
        Route::NotFound => Ok(not_found(settings)),
    };

    result.unwrap_or_else(|err| {
        tracing::error!(
            code = err.code(),
            method,
            path = request.path(),
            "request failed: {err}"
        );
        HttpResponse::html(
            Status::InternalServerError,
            pages::error(
                &Navigation::new(Page::Tracks, &settings.all_data_url),
                "Server Error",
                "The track database could not be read.",
            ),
        )
    })
}

fn tracks_nav(settings: &Settings) -> Navigation {
    Navigation::new(Page::Tracks, &settings.all_data_url)
}

fn not_found(settings: &Settings) -> HttpResponse {
    HttpResponse::html(
        Status::NotFound,
        pages::error(
            &tracks_nav(settings),
            "Not Found",
            "The requested page does not exist.",
        ),
    )
}

fn with_key(
    raw: &str,
    settings: &Settings,
    handler: impl FnOnce(&TrackKey) -> Result<HttpResponse, StoreError>,
) -> Result<HttpResponse, StoreError> {
    match TrackKey::parse(raw) {
        Ok(key) => handler(&key),
        Err(err) => {
            tracing::debug!(key = raw, "rejected track key: {err}");
            Ok(not_found(settings))
        }
    }
}

fn select_factors(
    request: &HttpRequest,
    store: &SqliteStore,
    settings: &Settings,
) -> Result<HttpResponse, StoreError> {
    let form = if request.method == "POST" {
        let form = TranscriptionFactorForm::bind(store, &request.form_values(fields::TF))?;
        if form.is_valid() {
            return Ok(HttpResponse::redirect(form.next_step_url()));
        }
        form
    } else {
        TranscriptionFactorForm::unbound(store)?
    };
    Ok(HttpResponse::html(
        Status::Ok,
        pages::select_factors(&tracks_nav(settings), &form),
    ))
}

fn select_cell_type(
    request: &HttpRequest,
    store: &SqliteStore,
    settings: &Settings,
) -> Result<HttpResponse, StoreError> {
    let form = if request.method == "POST" {
        let form = CellTypeForm::bind(
            store,
            &request.form_values(fields::TF),
            &request.form_values(fields::CELL_TYPE),
            Some(settings.track_selection_limit),
        )?;
        if form.is_valid() {
            return Ok(HttpResponse::redirect(form.next_step_url()));
        }
        form
    } else {
        let tfs = request.query_values(fields::TF);
        if tfs.is_empty() {
            return Ok(HttpResponse::redirect(routes::SELECT_FACTORS));
        }
        let mut form = CellTypeForm::bind(
            store,
            &tfs,
            &request.query_values(fields::CELL_TYPE),
            None,
        )?;
        form.clear_errors(fields::CELL_TYPE);
        form
    };
    Ok(HttpResponse::html(
        Status::Ok,
        pages::select_cell_type(&tracks_nav(settings), &form),
    ))
}

fn select_tracks(
    request: &HttpRequest,
    store: &SqliteStore,
    settings: &Settings,
) -> Result<HttpResponse, StoreError> {
    let form = if request.method == "POST" {
        let form = TracksForm::bind(store, &request.form_values(fields::TRACK_STR))?;
        if let Some(url) = form.next_step_url(store, settings, request.host.as_deref())? {
            return Ok(HttpResponse::redirect(url));
        }
        form
    } else {
        TracksForm::unbound()
    };

    let tf_names = request.query_values(fields::TF);
    let cell_type_names = request.query_values(fields::CELL_TYPE);
    if tf_names.is_empty() || cell_type_names.is_empty() {
        return Ok(HttpResponse::redirect(routes::SELECT_FACTORS));
    }
    let tfs = store.transcription_factors_named(&tf_names)?;
    let cell_types = store.cell_types_named(&cell_type_names)?;
    let pairs = store.track_pairs(&tf_names, &cell_type_names)?;
    Ok(HttpResponse::html(
        Status::Ok,
        pages::select_tracks(
            &tracks_nav(settings),
            &request.target,
            &tfs,
            &cell_types,
            &pairs,
            &form,
        ),
    ))
}

fn detail(
    key: &TrackKey,
    store: &SqliteStore,
    settings: &Settings,
) -> Result<HttpResponse, StoreError> {
    let genomes = store.genomes_for_ids(key.ids())?;
    Ok(HttpResponse::html(
        Status::Ok,
        pages::detail(&tracks_nav(settings), key, &genomes),
    ))
}

fn genomes(key: &TrackKey, store: &SqliteStore) -> Result<HttpResponse, StoreError> {
    let genomes = store.genomes_for_ids(key.ids())?;
    Ok(HttpResponse::text(render_genomes_txt(
        genomes.iter().map(|genome| genome.name.as_str()),
    )))
}

fn track_db(key: &TrackKey, genome: &str, store: &SqliteStore) -> Result<HttpResponse, StoreError> {
    let tracks = store.tracks_by_ids_in_genome(key.ids(), genome)?;
    Ok(HttpResponse::text(render_track_db_txt(&tracks)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::TEXT_PLAIN;
    use td_storage::NewTrack;

    fn new_track(genome: &str, tf: &str, cell_type: &str) -> NewTrack {
        let name = format!("{tf}{cell_type}rep1");
        NewTrack {
            genome: genome.to_string(),
            name: name.clone(),
            short_label: name.clone(),
            long_label: name,
            big_data_url: "https://github.com/Duke-GCB/topdata".to_string(),
            file_type: "bigWig".to_string(),
            tf: tf.to_string(),
            cell_type: cell_type.to_string(),
            rep_name: "rep1".to_string(),
            position: "chr1:100-200".to_string(),
        }
    }

    fn seeded_store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().expect("store");
        store
            .load_tracks(&[
                new_track("hg19", "AR", "8988T"),
                new_track("hg19", "AR", "CLL"),
                new_track("hg19", "ATF", "8988T"),
                new_track("hg19", "ATF", "CLL"),
            ])
            .expect("seed");
        store
    }

    fn get(store: &SqliteStore, target: &str) -> HttpResponse {
        dispatch(
            &HttpRequest::get(target).with_host("testserver"),
            store,
            &Settings::default(),
        )
    }

    fn post(store: &SqliteStore, target: &str, fields: &[(&str, &str)]) -> HttpResponse {
        dispatch(
            &HttpRequest::post_form(target, fields).with_host("testserver"),
            store,
            &Settings::default(),
        )
    }

    #[test]
    fn index_redirects_into_the_wizard() {
        let store = seeded_store();
        assert_eq!(get(&store, "/").location.as_deref(), Some("/tracks/"));
        assert_eq!(
            get(&store, "/tracks/").location.as_deref(),
            Some("/tracks/select-factors/")
        );
    }

    #[test]
    fn select_factors_get_and_post() {
        let store = seeded_store();
        let response = get(&store, "/tracks/select-factors/");
        assert_eq!(response.status, Status::Ok);
        let body = response.body_text();
        assert!(body.contains(r#"<option value="AR">AR</option>"#));
        assert!(body.contains("Transcription Factors"));
        assert!(!body.contains("Cell Type</li>"));

        let response = post(&store, "/tracks/select-factors/", &[("tf", "AR"), ("tf", "ATF")]);
        assert_eq!(response.status, Status::Found);
        assert_eq!(
            response.location.as_deref(),
            Some("/tracks/select-cell-type/?tf=AR&tf=ATF")
        );

        let response = post(&store, "/tracks/select-factors/", &[]);
        assert_eq!(response.status, Status::Ok);
        assert!(response.body_text().contains("This field is required."));
    }

    #[test]
    fn select_cell_type_needs_factors() {
        let store = seeded_store();
        let response = get(&store, "/tracks/select-cell-type/");
        assert_eq!(
            response.location.as_deref(),
            Some("/tracks/select-factors/")
        );

        let response = get(&store, "/tracks/select-cell-type/?tf=AR");
        assert_eq!(response.status, Status::Ok);
        let body = response.body_text();
        assert!(!body.contains("This field is required."));
        assert!(body.contains(r#"<input type="hidden" name="tf" value="AR""#));

        let response = post(
            &store,
            "/tracks/select-cell-type/",
            &[
                ("tf", "AR"),
                ("tf", "ATF"),
                ("celltype", "8988T"),
                ("celltype", "CLL"),
            ],
        );
        assert_eq!(
            response.location.as_deref(),
            Some("/tracks/select-tracks/?tf=AR&tf=ATF&celltype=8988T&celltype=CLL")
        );
    }

    #[test]
    fn select_cell_type_reports_track_limit() {
        let store = seeded_store();
        let settings = Settings {
            track_selection_limit: 1,
            ..Settings::default()
        };
        let response = dispatch(
            &HttpRequest::post_form(
                "/tracks/select-cell-type/",
                &[("tf", "AR"), ("celltype", "8988T"), ("celltype", "CLL")],
            ),
            &store,
            &settings,
        );
        assert_eq!(response.status, Status::Ok);
        assert!(response.body_text().contains(
            "Too many cell types selected. Your selection resulted in 2 tracks. Max allowed is 1."
        ));
    }

    #[test]
    fn select_cell_type_get_skips_track_limit() {
        let store = seeded_store();
        let settings = Settings {
            track_selection_limit: 0,
            ..Settings::default()
        };
        let response = dispatch(
            &HttpRequest::get("/tracks/select-cell-type/?tf=AR&celltype=CLL"),
            &store,
            &settings,
        );
        assert_eq!(response.status, Status::Ok);
        let body = response.body_text();
        assert!(!body.contains("Too many cell types selected."));
        assert!(body.contains(r#"<option value="CLL" selected>CLL</option>"#));
    }

    #[test]
    fn select_tracks_grid_and_redirect() {
        let store = seeded_store();
        assert_eq!(
            get(&store, "/tracks/select-tracks/?tf=AR").location.as_deref(),
            Some("/tracks/select-factors/")
        );

        let response = get(&store, "/tracks/select-tracks/?tf=AR&celltype=CLL");
        assert_eq!(response.status, Status::Ok);
        let body = response.body_text();
        assert!(body.contains(r#"value="AR,CLL""#));
        assert!(!body.contains(r#"value="AR,8988T""#));

        let response = post(
            &store,
            "/tracks/select-tracks/",
            &[
                ("track_str", "AR,8988T"),
                ("track_str", "AR,CLL"),
                ("track_str", "ATF,CLL"),
            ],
        );
        assert_eq!(response.status, Status::Found);
        assert_eq!(
            response.location.as_deref(),
            Some(
                "https://genome.ucsc.edu/cgi-bin/hgTracks?org=human&db=hg19&hubUrl=http://testserver/tracks/1_2_4/hub.txt&position=chr1:100-200"
            )
        );
    }

    #[test]
    fn invalid_track_post_rerenders_with_query() {
        let store = seeded_store();
        let response = post(
            &store,
            "/tracks/select-tracks/?tf=AR&celltype=CLL",
            &[("track_str", "AR,NOPE")],
        );
        assert_eq!(response.status, Status::Ok);
        assert!(response.body_text().contains(
            "Select a valid choice. AR,NOPE is not one of the available choices."
        ));

        let response = post(&store, "/tracks/select-tracks/", &[("track_str", "AR,NOPE")]);
        assert_eq!(
            response.location.as_deref(),
            Some("/tracks/select-factors/")
        );
    }

    #[test]
    fn hub_files_are_plain_text() {
        let store = seeded_store();
        let response = get(&store, "/tracks/1_2/hub.txt");
        assert_eq!(response.status, Status::Ok);
        assert_eq!(response.content_type, TEXT_PLAIN);
        assert!(response.body_text().starts_with("hub TOPhub_1_2\n"));

        let response = get(&store, "/tracks/1_2/genomes.txt");
        assert_eq!(response.body_text(), "genome hg19\ntrackDb hg19/trackDb.txt\n");

        let response = get(&store, "/tracks/2/hg19/trackDb.txt");
        assert!(response.body_text().starts_with("\ntrack ARCLLrep1\n"));

        let response = get(&store, "/tracks/2/hg38/trackDb.txt");
        assert_eq!(response.body_text(), "");
    }

    #[test]
    fn malformed_keys_and_methods() {
        let store = seeded_store();
        assert_eq!(get(&store, "/tracks/1_x/hub.txt").status, Status::NotFound);
        assert_eq!(get(&store, "/tracks/1__2/").status, Status::NotFound);
        assert_eq!(get(&store, "/tracks/01_002/hub.txt").status, Status::NotFound);
        assert_eq!(get(&store, "/nope").status, Status::NotFound);
        assert_eq!(
            post(&store, "/tracks/1_2/hub.txt", &[]).status,
            Status::MethodNotAllowed
        );

        let mut request = HttpRequest::get("/tracks/");
        request.method = "DELETE".to_string();
        assert_eq!(
            dispatch(&request, &store, &Settings::default()).status,
            Status::MethodNotAllowed
        );
    }

    #[test]
    fn detail_track_db_links_are_followable() {
        let mut store = SqliteStore::open_in_memory().expect("store");
        store
            .load_tracks(&[new_track("hg 38", "AR", "CLL")])
            .expect("seed");
        let detail = get(&store, "/tracks/1/").body_text();
        let link = "/tracks/1/hg%2038/trackDb.txt";
        assert!(detail.contains(&format!(r#"href="{link}""#)));

        let response = get(&store, link);
        assert_eq!(response.status, Status::Ok);
        assert!(response.body_text().starts_with("\ntrack ARCLLrep1\n"));
    }

    #[test]
    fn detail_lists_genomes() {
        let store = seeded_store();
        let response = get(&store, "/tracks/1_2/");
        assert_eq!(response.status, Status::Ok);
        assert!(response.body_text().contains(r#"href="/tracks/1_2/hg19/trackDb.txt""#));
    }
}
