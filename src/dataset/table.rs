// Table module - the `filepath,emotion` label CSV

use std::fs;
use std::path::{Path, PathBuf};

use super::LabeledSample;
use crate::emotion::Emotion;
use crate::error::DatasetError;

const FILEPATH_COLUMN: &str = "filepath";
const EMOTION_COLUMN: &str = "emotion";

/// Write labeled samples, replacing any existing file
///
/// The parent directory is created when absent. Rows keep input order.
pub fn write_labels(samples: &[LabeledSample], csv_path: &Path) -> Result<(), DatasetError> {
    if let Some(parent) = csv_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| DatasetError::io(parent, err))?;
    }

    let mut writer = csv::Writer::from_path(csv_path).map_err(|err| DatasetError::io(csv_path, err))?;
    writer
        .write_record([FILEPATH_COLUMN, EMOTION_COLUMN])
        .map_err(|err| DatasetError::io(csv_path, err))?;

    for sample in samples {
        let path = sample.file_path.to_string_lossy();
        writer
            .write_record([path.as_ref(), sample.emotion.as_str()])
            .map_err(|err| DatasetError::io(csv_path, err))?;
    }

    writer.flush().map_err(|err| DatasetError::io(csv_path, err))
}

/// Read the label CSV
///
/// Extra columns are ignored. Rows whose emotion cell is not a known label
/// are skipped with a warning.
///
/// # Returns
/// * `Err(DatasetError::CsvMissing)` - File does not exist
/// * `Err(DatasetError::MissingColumns)` - Header lacks `filepath` or `emotion`
pub fn read_labels(csv_path: &Path) -> Result<Vec<LabeledSample>, DatasetError> {
    if !csv_path.is_file() {
        return Err(DatasetError::CsvMissing {
            path: csv_path.to_path_buf(),
        });
    }

    let mut reader = csv::Reader::from_path(csv_path).map_err(|err| DatasetError::io(csv_path, err))?;
    let headers = reader
        .headers()
        .map_err(|err| DatasetError::io(csv_path, err))?
        .clone();

    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (Some(path_idx), Some(emotion_idx)) = (column(FILEPATH_COLUMN), column(EMOTION_COLUMN))
    else {
        return Err(DatasetError::MissingColumns {
            found: headers.iter().map(str::to_string).collect(),
        });
    };

    let mut samples = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|err| DatasetError::io(csv_path, err))?;
        let (Some(path), Some(label)) = (record.get(path_idx), record.get(emotion_idx)) else {
            tracing::warn!("[Dataset] Row {} is missing cells, skipping", line + 2);
            continue;
        };

        match label.parse::<Emotion>() {
            Ok(emotion) => samples.push(LabeledSample {
                file_path: PathBuf::from(path),
                emotion,
            }),
            Err(err) => {
                tracing::warn!("[Dataset] Row {}: {}, skipping", line + 2, err);
            }
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("nested").join("labels.csv");
        let samples = vec![
            LabeledSample {
                file_path: PathBuf::from("/data/Actor_01/03-01-05-01-01-01-01.wav"),
                emotion: Emotion::Angry,
            },
            LabeledSample {
                file_path: PathBuf::from("/data/Actor_01/a, b.wav"),
                emotion: Emotion::Unknown,
            },
        ];

        write_labels(&samples, &csv_path).unwrap();
        assert_eq!(read_labels(&csv_path).unwrap(), samples);
    }

    #[test]
    fn test_write_truncates_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("labels.csv");
        fs::write(&csv_path, "stale\ncontent\nthat is long\n").unwrap();

        write_labels(&[], &csv_path).unwrap();
        assert_eq!(fs::read_to_string(&csv_path).unwrap(), "filepath,emotion\n");
    }

    #[test]
    fn test_missing_csv() {
        let err = read_labels(Path::new("/nonexistent/labels.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::CsvMissing { .. }));
    }

    #[test]
    fn test_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("labels.csv");
        fs::write(&csv_path, "path,label\n/a.wav,Angry\n").unwrap();

        match read_labels(&csv_path).unwrap_err() {
            DatasetError::MissingColumns { found } => assert_eq!(found, vec!["path", "label"]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_emotion_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("labels.csv");
        fs::write(
            &csv_path,
            "emotion,extra,filepath\nAngry,x,/a.wav\nbored,y,/b.wav\ncalm,z,/c.wav\n",
        )
        .unwrap();

        let samples = read_labels(&csv_path).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].emotion, Emotion::Angry);
        assert_eq!(samples[1].emotion, Emotion::Calm);
        assert_eq!(samples[1].file_path, PathBuf::from("/c.wav"));
    }
}
