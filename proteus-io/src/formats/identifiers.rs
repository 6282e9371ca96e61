use proteus_core::{ProteusError, ProteusResult, ReadId};
use std::path::Path;

pub(crate) fn map_csv(e: csv::Error) -> ProteusError {
    if e.is_io_error() {
        match e.into_kind() {
            csv::ErrorKind::Io(io) => ProteusError::Io(io),
            other => ProteusError::Parse(format!("{:?}", other)),
        }
    } else {
        ProteusError::Parse(format!("CSV error: {}", e))
    }
}

/// Read identifiers from the first column of a delimited table with a header row
pub fn read_identifiers<P: AsRef<Path>>(path: P) -> ProteusResult<Vec<ReadId>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path.as_ref())
        .map_err(map_csv)?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record.map_err(map_csv)?;
        ids.push(ReadId::new(record.get(0).unwrap_or_default()));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_first_column_is_used() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "sequence_id,count\nread_a,12\nread_b,3\nread_c,1\n").unwrap();

        let ids = read_identifiers(file.path()).unwrap();
        assert_eq!(
            ids,
            vec![ReadId::from("read_a"), ReadId::from("read_b"), ReadId::from("read_c")]
        );
    }

    #[test]
    fn test_header_only_table() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "sequence_id,count\n").unwrap();
        assert!(read_identifiers(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_ragged_rows_and_quoting() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "id\n\"read,1\",extra\nread_2\n").unwrap();

        let ids = read_identifiers(file.path()).unwrap();
        assert_eq!(ids, vec![ReadId::from("read,1"), ReadId::from("read_2")]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = read_identifiers("/nonexistent/dedup_counts.csv");
        assert!(matches!(result, Err(ProteusError::Io(_))));
    }
}
