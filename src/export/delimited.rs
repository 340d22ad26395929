use crate::errors::ServiceError;

/// Writes `rows` as delimiter-separated text with RFC 4180 quoting.
pub(super) fn write_delimited(rows: &[Vec<String>], delimiter: u8) -> Result<Vec<u8>, ServiceError> {
    let mut writer = ::csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| ServiceError::SerializationError(e.to_string()))
}
