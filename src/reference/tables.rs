//! Row records for the static GTFS tables and a CSV loader for them.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::TableError;

/// A static table the loader knows how to read and validate.
pub trait TableRow: DeserializeOwned {
    /// File stem inside the static directory, e.g. `trips` for `trips.txt`.
    const TABLE: &'static str;
    /// Header columns that must be present.
    const REQUIRED: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TripRow {
    pub trip_id: String,
    pub route_id: String,
    pub trip_headsign: String,
}

impl TableRow for TripRow {
    const TABLE: &'static str = "trips";
    const REQUIRED: &'static [&'static str] = &["trip_id", "route_id", "trip_headsign"];
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteRow {
    pub route_id: String,
    pub route_long_name: String,
}

impl TableRow for RouteRow {
    const TABLE: &'static str = "routes";
    const REQUIRED: &'static [&'static str] = &["route_id", "route_long_name"];
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StopRow {
    pub stop_id: String,
    pub stop_name: String,
}

impl TableRow for StopRow {
    const TABLE: &'static str = "stops";
    const REQUIRED: &'static [&'static str] = &["stop_id", "stop_name"];
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StopTimeRow {
    pub trip_id: String,
    pub stop_sequence: u32,
    pub stop_id: String,
}

impl TableRow for StopTimeRow {
    const TABLE: &'static str = "stop_times";
    const REQUIRED: &'static [&'static str] = &["trip_id", "stop_sequence", "stop_id"];
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranslationRow {
    pub record_id: String,
    pub field_value: String,
    pub translation: String,
    pub language: String,
}

impl TableRow for TranslationRow {
    const TABLE: &'static str = "translations";
    const REQUIRED: &'static [&'static str] =
        &["record_id", "field_value", "translation", "language"];
}

/// All five static tables of one feed, as parsed rows in file order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub trips: Vec<TripRow>,
    pub routes: Vec<RouteRow>,
    pub stops: Vec<StopRow>,
    pub stop_times: Vec<StopTimeRow>,
    pub translations: Vec<TranslationRow>,
}

impl ReferenceTables {
    /// Loads `trips.txt`, `routes.txt`, `stops.txt`, `stop_times.txt` and
    /// `translations.txt` from `dir`.
    ///
    /// # Errors
    ///
    /// Any missing file, missing required column or malformed row.
    pub fn load(dir: &Path) -> Result<Self, TableError> {
        Ok(Self {
            trips: load_table(dir)?,
            routes: load_table(dir)?,
            stops: load_table(dir)?,
            stop_times: load_table(dir)?,
            translations: load_table(dir)?,
        })
    }
}

/// Opens `{dir}/{T::TABLE}.txt` and parses it with [`read_table`].
pub fn load_table<T: TableRow>(dir: &Path) -> Result<Vec<T>, TableError> {
    let path = dir.join(format!("{}.txt", T::TABLE));
    let file = File::open(&path).map_err(|source| TableError::Open {
        table: T::TABLE,
        path: path.clone(),
        source,
    })?;

    let rows = read_table::<T, _>(file)?;
    debug!(table = T::TABLE, path = %path.display(), rows = rows.len(), "Loaded reference table");
    Ok(rows)
}

/// Parses a headed CSV table. Columns beyond [`TableRow::REQUIRED`] are ignored.
pub fn read_table<T: TableRow, R: Read>(reader: R) -> Result<Vec<T>, TableError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|source| TableError::Row {
            table: T::TABLE,
            source,
        })?
        .clone();

    for column in T::REQUIRED {
        if !headers.iter().any(|h| h == *column) {
            return Err(TableError::MissingColumn {
                table: T::TABLE,
                column: *column,
            });
        }
    }

    rdr.deserialize::<T>()
        .map(|row| {
            row.map_err(|source| TableError::Row {
                table: T::TABLE,
                source,
            })
        })
        .collect()
}
