#![forbid(unsafe_code)]

use super::lookups::{
    NameTable, get_or_create_name, get_or_create_rep_name, name_exists, rep_name_id,
};
use super::{NewTrack, SqliteStore, StoreError, TrackPair, is_unique_violation, placeholders};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use td_core::model::{Genome, Track, validate_name, validate_url};

const TRACK_SELECT: &str = "SELECT t.id, t.genome, t.name, t.short_label, t.long_label, \
     t.big_data_url, t.file_type, t.tf, t.cell_type, r.name, t.position \
     FROM tracks t JOIN rep_names r ON r.id = t.rep_name_id";

impl SqliteStore {
    /// Inserts one track. Every lookup row it references must already exist.
    pub fn create_track(&mut self, track: NewTrack) -> Result<Track, StoreError> {
        let tx = self.conn.transaction()?;
        let created = insert_track(&tx, &track)?;
        tx.commit()?;
        Ok(created)
    }

    /// Creates missing lookup rows and inserts all tracks in a single transaction.
    /// Nothing is written if any track fails.
    pub fn load_tracks(&mut self, tracks: &[NewTrack]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        for track in tracks {
            get_or_create_name(&tx, NameTable::Genomes, &track.genome)?;
            get_or_create_name(&tx, NameTable::TranscriptionFactors, &track.tf)?;
            get_or_create_name(&tx, NameTable::CellTypes, &track.cell_type)?;
            get_or_create_rep_name(&tx, &track.rep_name)?;
            insert_track(&tx, track)?;
        }
        tx.commit()?;
        Ok(tracks.len())
    }

    pub fn track_count(&self) -> Result<usize, StoreError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get::<_, i64>(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn list_tracks(&self) -> Result<Vec<Track>, StoreError> {
        query_tracks(
            &self.conn,
            &format!("{TRACK_SELECT} ORDER BY t.name ASC, t.id ASC"),
            Vec::new(),
        )
    }

    /// Number of tracks whose transcription factor is in `tfs` and cell type in `cell_types`.
    pub fn count_tracks_for_selection(
        &self,
        tfs: &[String],
        cell_types: &[String],
    ) -> Result<usize, StoreError> {
        if tfs.is_empty() || cell_types.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "SELECT COUNT(*) FROM tracks WHERE tf IN ({}) AND cell_type IN ({})",
            placeholders(1, tfs.len()),
            placeholders(tfs.len() + 1, cell_types.len())
        );
        let values = tfs.iter().chain(cell_types.iter());
        let count = self
            .conn
            .query_row(&sql, params_from_iter(values), |row| row.get::<_, i64>(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn tracks_for_pair(&self, tf: &str, cell_type: &str) -> Result<Vec<Track>, StoreError> {
        query_tracks(
            &self.conn,
            &format!("{TRACK_SELECT} WHERE t.tf=?1 AND t.cell_type=?2 ORDER BY t.id ASC"),
            vec![Value::from(tf.to_string()), Value::from(cell_type.to_string())],
        )
    }

    pub fn pair_exists(&self, tf: &str, cell_type: &str) -> Result<bool, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM tracks WHERE tf=?1 AND cell_type=?2 LIMIT 1",
                params![tf, cell_type],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some())
    }

    /// Existing pairs among `tfs` x `cell_types`, ordered by transcription factor then cell type.
    pub fn track_pairs(
        &self,
        tfs: &[String],
        cell_types: &[String],
    ) -> Result<Vec<TrackPair>, StoreError> {
        if tfs.is_empty() || cell_types.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT tf, cell_type, COUNT(*) FROM tracks \
             WHERE tf IN ({}) AND cell_type IN ({}) \
             GROUP BY tf, cell_type \
             ORDER BY tf ASC, cell_type ASC",
            placeholders(1, tfs.len()),
            placeholders(tfs.len() + 1, cell_types.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(tfs.iter().chain(cell_types.iter())))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(TrackPair {
                tf: row.get(0)?,
                cell_type: row.get(1)?,
                track_count: usize::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
            });
        }
        Ok(out)
    }

    pub fn tracks_by_ids(&self, ids: &[i64]) -> Result<Vec<Track>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        query_tracks(
            &self.conn,
            &format!(
                "{TRACK_SELECT} WHERE t.id IN ({}) ORDER BY t.id ASC",
                placeholders(1, ids.len())
            ),
            ids.iter().map(|id| Value::from(*id)).collect(),
        )
    }

    pub fn tracks_by_ids_in_genome(
        &self,
        ids: &[i64],
        genome: &str,
    ) -> Result<Vec<Track>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut values = vec![Value::from(genome.to_string())];
        values.extend(ids.iter().map(|id| Value::from(*id)));
        query_tracks(
            &self.conn,
            &format!(
                "{TRACK_SELECT} WHERE t.genome=?1 AND t.id IN ({}) ORDER BY t.id ASC",
                placeholders(2, ids.len())
            ),
            values,
        )
    }

    /// Distinct genomes of the given tracks, ordered by name.
    pub fn genomes_for_ids(&self, ids: &[i64]) -> Result<Vec<Genome>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT DISTINCT genome FROM tracks WHERE id IN ({}) ORDER BY genome ASC",
            placeholders(1, ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(ids.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(Genome { name: row.get(0)? });
        }
        Ok(out)
    }
}

fn insert_track(conn: &Connection, track: &NewTrack) -> Result<Track, StoreError> {
    validate_new_track(track)?;

    if !name_exists(conn, NameTable::Genomes, &track.genome)?
        || !name_exists(conn, NameTable::TranscriptionFactors, &track.tf)?
        || !name_exists(conn, NameTable::CellTypes, &track.cell_type)?
    {
        return Err(StoreError::UnknownId);
    }
    let Some(rep_id) = rep_name_id(conn, &track.rep_name)? else {
        return Err(StoreError::UnknownId);
    };

    let insert = conn.execute(
        "INSERT INTO tracks(genome, name, short_label, long_label, big_data_url, file_type, tf, cell_type, rep_name_id, position) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            track.genome,
            track.name,
            track.short_label,
            track.long_label,
            track.big_data_url,
            track.file_type,
            track.tf,
            track.cell_type,
            rep_id,
            track.position,
        ],
    );
    match insert {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => {
            return Err(StoreError::TrackAlreadyExists {
                genome: track.genome.clone(),
                name: track.name.clone(),
            });
        }
        Err(err) => return Err(err.into()),
    }

    Ok(Track {
        id: conn.last_insert_rowid(),
        genome: track.genome.clone(),
        name: track.name.clone(),
        short_label: track.short_label.clone(),
        long_label: track.long_label.clone(),
        big_data_url: track.big_data_url.clone(),
        file_type: track.file_type.clone(),
        tf: track.tf.clone(),
        cell_type: track.cell_type.clone(),
        rep_name: track.rep_name.clone(),
        position: track.position.clone(),
    })
}

fn validate_new_track(track: &NewTrack) -> Result<(), StoreError> {
    validate_name("name", &track.name)
        .map_err(|_| StoreError::InvalidInput("invalid track name"))?;
    validate_name("short_label", &track.short_label)
        .map_err(|_| StoreError::InvalidInput("invalid short label"))?;
    validate_name("long_label", &track.long_label)
        .map_err(|_| StoreError::InvalidInput("invalid long label"))?;
    validate_name("file_type", &track.file_type)
        .map_err(|_| StoreError::InvalidInput("invalid file type"))?;
    validate_url("big_data_url", &track.big_data_url)
        .map_err(|_| StoreError::InvalidInput("invalid big data url"))?;
    Ok(())
}

fn query_tracks(
    conn: &Connection,
    sql: &str,
    values: Vec<Value>,
) -> Result<Vec<Track>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(values))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(track_from_row(row)?);
    }
    Ok(out)
}

fn track_from_row(row: &Row<'_>) -> Result<Track, rusqlite::Error> {
    Ok(Track {
        id: row.get(0)?,
        genome: row.get(1)?,
        name: row.get(2)?,
        short_label: row.get(3)?,
        long_label: row.get(4)?,
        big_data_url: row.get(5)?,
        file_type: row.get(6)?,
        tf: row.get(7)?,
        cell_type: row.get(8)?,
        rep_name: row.get(9)?,
        position: row.get(10)?,
    })
}
