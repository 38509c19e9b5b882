//! Columnar export of a spread table.
//!
//! Columns: `timestamp` (Datetime, ms), `certificate_price`,
//! `physical_price`, `spread` (Float64). Parquet files are written to a
//! sibling temp file and renamed into place.

use crate::table::TimeSeriesTable;
use polars::prelude::*;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The presentation-layer table schema.
pub struct SpreadSchema;

impl SpreadSchema {
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new(
                "timestamp".into(),
                DataType::Datetime(TimeUnit::Milliseconds, None),
            ),
            Field::new("certificate_price".into(), DataType::Float64),
            Field::new("physical_price".into(), DataType::Float64),
            Field::new("spread".into(), DataType::Float64),
        ])
    }

    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        let actual = df.schema();
        for field in Self::schema().iter_fields() {
            let dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: dtype.clone(),
                });
            }
        }
        Ok(())
    }
}

pub fn table_to_dataframe(table: &TimeSeriesTable) -> Result<DataFrame, ExportError> {
    let points = table.points();
    let millis: Vec<i64> = points.iter().map(|p| p.timestamp.timestamp_millis()).collect();
    let certificate: Vec<f64> = points.iter().map(|p| p.certificate_price).collect();
    let physical: Vec<f64> = points.iter().map(|p| p.physical_price).collect();
    let spread: Vec<f64> = points.iter().map(|p| p.spread).collect();

    let df = DataFrame::new(vec![
        Column::new("timestamp".into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
        Column::new("certificate_price".into(), certificate),
        Column::new("physical_price".into(), physical),
        Column::new("spread".into(), spread),
    ])?;
    SpreadSchema::validate(&df)?;
    Ok(df)
}

/// Write `table` as Parquet at `path`, replacing any existing file.
pub fn write_parquet(table: &TimeSeriesTable, path: &Path) -> Result<(), ExportError> {
    let mut df = table_to_dataframe(table)?;
    let io_err = |p: &Path| {
        let path = p.display().to_string();
        move |source: std::io::Error| ExportError::Io { path, source }
    };

    let tmp = path.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp).map_err(io_err(&tmp))?;
    ParquetWriter::new(file).finish(&mut df)?;
    fs::rename(&tmp, path).map_err(io_err(path))?;
    Ok(())
}
