#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError, placeholders};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use td_core::model::{CellType, Genome, RepName, TranscriptionFactor, validate_name};

/// Lookup tables keyed by their name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NameTable {
    Genomes,
    TranscriptionFactors,
    CellTypes,
}

impl NameTable {
    fn table(self) -> &'static str {
        match self {
            Self::Genomes => "genomes",
            Self::TranscriptionFactors => "transcription_factors",
            Self::CellTypes => "cell_types",
        }
    }

    fn invalid_name(self) -> StoreError {
        StoreError::InvalidInput(match self {
            Self::Genomes => "invalid genome name",
            Self::TranscriptionFactors => "invalid transcription factor name",
            Self::CellTypes => "invalid cell type name",
        })
    }
}

impl SqliteStore {
    pub fn get_or_create_genome(&mut self, name: &str) -> Result<Genome, StoreError> {
        get_or_create_name(&self.conn, NameTable::Genomes, name)?;
        Ok(Genome {
            name: name.to_string(),
        })
    }

    pub fn get_or_create_transcription_factor(
        &mut self,
        name: &str,
    ) -> Result<TranscriptionFactor, StoreError> {
        get_or_create_name(&self.conn, NameTable::TranscriptionFactors, name)?;
        Ok(TranscriptionFactor {
            name: name.to_string(),
        })
    }

    pub fn get_or_create_cell_type(&mut self, name: &str) -> Result<CellType, StoreError> {
        get_or_create_name(&self.conn, NameTable::CellTypes, name)?;
        Ok(CellType {
            name: name.to_string(),
        })
    }

    pub fn get_or_create_rep_name(&mut self, name: &str) -> Result<RepName, StoreError> {
        get_or_create_rep_name(&self.conn, name)
    }

    pub fn list_genomes(&self) -> Result<Vec<Genome>, StoreError> {
        Ok(list_names(&self.conn, NameTable::Genomes)?
            .into_iter()
            .map(|name| Genome { name })
            .collect())
    }

    pub fn list_transcription_factors(&self) -> Result<Vec<TranscriptionFactor>, StoreError> {
        Ok(list_names(&self.conn, NameTable::TranscriptionFactors)?
            .into_iter()
            .map(|name| TranscriptionFactor { name })
            .collect())
    }

    pub fn list_cell_types(&self) -> Result<Vec<CellType>, StoreError> {
        Ok(list_names(&self.conn, NameTable::CellTypes)?
            .into_iter()
            .map(|name| CellType { name })
            .collect())
    }

    pub fn list_rep_names(&self) -> Result<Vec<RepName>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM rep_names ORDER BY name ASC")?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(RepName {
                id: row.get(0)?,
                name: row.get(1)?,
            });
        }
        Ok(out)
    }

    /// Rows among `names` that exist, ordered by name. Unknown names are dropped.
    pub fn transcription_factors_named(
        &self,
        names: &[String],
    ) -> Result<Vec<TranscriptionFactor>, StoreError> {
        Ok(names_in(&self.conn, NameTable::TranscriptionFactors, names)?
            .into_iter()
            .map(|name| TranscriptionFactor { name })
            .collect())
    }

    pub fn cell_types_named(&self, names: &[String]) -> Result<Vec<CellType>, StoreError> {
        Ok(names_in(&self.conn, NameTable::CellTypes, names)?
            .into_iter()
            .map(|name| CellType { name })
            .collect())
    }
}

pub(crate) fn get_or_create_name(
    conn: &Connection,
    table: NameTable,
    name: &str,
) -> Result<(), StoreError> {
    validate_name("name", name).map_err(|_| table.invalid_name())?;
    conn.execute(
        &format!("INSERT OR IGNORE INTO {}(name) VALUES (?1)", table.table()),
        params![name],
    )?;
    Ok(())
}

pub(crate) fn get_or_create_rep_name(conn: &Connection, name: &str) -> Result<RepName, StoreError> {
    validate_name("rep_name", name)
        .map_err(|_| StoreError::InvalidInput("invalid replicate name"))?;
    conn.execute(
        "INSERT OR IGNORE INTO rep_names(name) VALUES (?1)",
        params![name],
    )?;
    let id = conn.query_row(
        "SELECT id FROM rep_names WHERE name=?1",
        params![name],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(RepName {
        id,
        name: name.to_string(),
    })
}

pub(crate) fn name_exists(
    conn: &Connection,
    table: NameTable,
    name: &str,
) -> Result<bool, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT 1 FROM {} WHERE name=?1", table.table()),
            params![name],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

pub(crate) fn rep_name_id(conn: &Connection, name: &str) -> Result<Option<i64>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id FROM rep_names WHERE name=?1",
            params![name],
            |row| row.get::<_, i64>(0),
        )
        .optional()?)
}

fn list_names(conn: &Connection, table: NameTable) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT name FROM {} ORDER BY name ASC",
        table.table()
    ))?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row.get::<_, String>(0)?);
    }
    Ok(out)
}

fn names_in(
    conn: &Connection,
    table: NameTable,
    names: &[String],
) -> Result<Vec<String>, StoreError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT name FROM {} WHERE name IN ({}) ORDER BY name ASC",
        table.table(),
        placeholders(1, names.len())
    ))?;
    let mut rows = stmt.query(params_from_iter(names.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row.get::<_, String>(0)?);
    }
    Ok(out)
}
