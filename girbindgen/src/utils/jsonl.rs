//! Serialization utilities for reading and writing model records.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::api::source::ModelRecord;
use crate::error::Error;

fn io_error<P: AsRef<Path>>(path: P, source: std::io::Error) -> Error {
    Error::Io {
        path: path.as_ref().display().to_string(),
        source,
    }
}

/// Write a collection of model records to a file in JSON-lines format
pub fn write_model_file<P: AsRef<Path>>(
    file_path: P,
    records: &[ModelRecord],
) -> Result<(), Error> {
    let mut file = fs::File::create(&file_path).map_err(|e| io_error(&file_path, e))?;
    for record in records {
        let json_line = serde_json::to_string(record).map_err(|e| {
            io_error(
                &file_path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        writeln!(file, "{json_line}").map_err(|e| io_error(&file_path, e))?;
    }
    file.flush().map_err(|e| io_error(&file_path, e))?;
    Ok(())
}

/// Read model records from a JSON-lines file
pub fn read_model_file<P: AsRef<Path>>(file_path: P) -> Result<Vec<ModelRecord>, Error> {
    let content = fs::read_to_string(&file_path).map_err(|e| io_error(&file_path, e))?;
    let mut records = Vec::new();

    // Parse JSON-lines format: each line is a separate JSON object
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue; // Skip empty lines
        }

        let record: ModelRecord = serde_json::from_str(line).map_err(|e| Error::ModelFormat {
            path: file_path.as_ref().display().to_string(),
            line: line_num + 1,
            message: e.to_string(),
        })?;

        records.push(record);
    }

    Ok(records)
}
