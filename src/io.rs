//! Helpers for reading financial reports and outputting results

use std::io::{Read, Write};

use csv::Trim;
use serde::Serialize;
use tracing::debug;

use crate::{
    errors::Error,
    types::{Transaction, TransactionTable},
};

/// Name of the column holding transaction dates
const DATE_COLUMN: &str = "date";

/// Loads a report from a CSV-formatted stream.
///
/// Columns are matched by header name; other columns are ignored and any of `date`,
/// `category`, `title` or `amount` may be missing or empty. If there is no `date` column
/// at all the returned table records that, see [`TransactionTable::has_date_column`].
///
/// Expects input data in this format (including header):
/// ```csv
/// date,       category,  title,     amount
/// 2024-01-05, food,      Groceries,  50.00
/// 2024-01-07, food,      Restaurant, 120.00
/// 2024-02-01, rent,      February, 1000.00
/// ```
/// # Errors
/// [`Error::Load`] if the stream cannot be read or a cell cannot be parsed
pub fn load_transactions_from_csv<R>(reader: &mut R) -> Result<TransactionTable, Error>
where
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    debug!(
        "Columns in report: {:?}",
        headers.iter().collect::<Vec<_>>()
    );
    let has_date_column = headers.iter().any(|header| header == DATE_COLUMN);
    if !has_date_column {
        debug!("'{DATE_COLUMN}' column not found in report");
    }
    let rows = csv_reader
        .deserialize()
        .collect::<Result<Vec<Transaction>, _>>()?;
    debug!(rows = rows.len(), "Loaded report");
    Ok(if has_date_column {
        TransactionTable::new(rows)
    } else {
        TransactionTable::without_date_column(rows)
    })
}

/// Writes `value` as pretty-printed JSON, e.g. a [`ResultBundle`](crate::types::ResultBundle).
/// # Errors
/// [`Error::Encode`] if serialization or writing fails
pub fn write_json<W, T>(writer: &mut W, value: &T) -> Result<(), Error>
where
    W: Write,
    T: Serialize + ?Sized,
{
    serde_json::to_writer_pretty(&mut *writer, value).map_err(Error::Encode)?;
    writeln!(writer).map_err(|e| Error::Encode(serde_json::Error::io(e)))
}
