// Labeler - derive emotion labels from RAVDESS filenames
//
// RAVDESS clips are named `MM-VV-EE-II-SS-RR-AA.wav`: modality, vocal
// channel, emotion, intensity, statement, repetition and actor, each two
// digits. The archive holds one folder per actor; only `.wav` files one level
// below the extraction root are considered.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::{write_labels, LabeledSample};
use crate::emotion::Emotion;
use crate::error::{log_dataset_error, DatasetError};

static FILENAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{2})-(\d{2})-(\d{2})-(\d{2})-(\d{2})-(\d{2})-(\d{2})\.wav$")
        .expect("filename pattern is a valid regex")
});

/// The seven two-digit fields of a RAVDESS filename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RavdessFilename {
    pub modality: u8,
    pub vocal_channel: u8,
    pub emotion_code: u8,
    pub intensity: u8,
    pub statement: u8,
    pub repetition: u8,
    pub actor: u8,
}

impl RavdessFilename {
    /// Label for the emotion field; codes outside 01-08 are `Unknown`
    pub fn emotion(&self) -> Emotion {
        Emotion::from_code(&format!("{:02}", self.emotion_code))
    }
}

/// Parse a bare filename such as `03-01-05-01-01-01-01.wav`
///
/// # Returns
/// `None` when the name does not have seven two-digit fields and a `.wav`
/// extension (extension matched case-insensitively).
pub fn parse_filename(name: &str) -> Option<RavdessFilename> {
    let caps = FILENAME_PATTERN.captures(name)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u8>().ok());

    Some(RavdessFilename {
        modality: field(1)?,
        vocal_channel: field(2)?,
        emotion_code: field(3)?,
        intensity: field(4)?,
        statement: field(5)?,
        repetition: field(6)?,
        actor: field(7)?,
    })
}

/// Outcome of a labeling pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelingReport {
    pub samples: Vec<LabeledSample>,
    /// `.wav` files whose name did not match the pattern
    pub skipped: usize,
    /// Files listed in a folder that vanished before they could be checked
    pub missing: usize,
}

impl LabelingReport {
    pub fn labeled(&self) -> usize {
        self.samples.len()
    }
}

/// Unpack a zip archive into `dest`, creating it if needed
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), DatasetError> {
    if !archive.is_file() {
        return Err(DatasetError::ArchiveMissing {
            path: archive.to_path_buf(),
        });
    }

    let file = File::open(archive).map_err(|err| DatasetError::io(archive, err))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|err| DatasetError::ArchiveCorrupt {
        path: archive.to_path_buf(),
        reason: err.to_string(),
    })?;

    fs::create_dir_all(dest).map_err(|err| DatasetError::io(dest, err))?;
    zip.extract(dest).map_err(|err| match err {
        zip::result::ZipError::Io(io) => DatasetError::io(dest, io),
        other => DatasetError::ArchiveCorrupt {
            path: archive.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    tracing::info!(
        "[Labeler] Extracted {} entries from {} into {}",
        zip.len(),
        archive.display(),
        dest.display()
    );
    Ok(())
}

/// Label every matching clip in the actor folders below `root`
///
/// Folders and files are visited in sorted order so the output is stable.
pub fn label_directory(root: &Path) -> Result<LabelingReport, DatasetError> {
    let root = absolute(root)?;
    let mut report = LabelingReport::default();

    for actor_dir in sorted_entries(&root)?.into_iter().filter(|p| p.is_dir()) {
        tracing::info!("[Labeler] Processing folder: {}", actor_dir.display());

        for path in sorted_entries(&actor_dir)? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.to_ascii_lowercase().ends_with(".wav") {
                continue;
            }

            let Some(parsed) = parse_filename(name) else {
                tracing::warn!("[Labeler] Skipping invalid filename pattern: {}", name);
                report.skipped += 1;
                continue;
            };

            if !path.exists() {
                tracing::warn!("[Labeler] File not found: {}", path.display());
                report.missing += 1;
                continue;
            }

            report.samples.push(LabeledSample {
                file_path: path,
                emotion: parsed.emotion(),
            });
        }
    }

    Ok(report)
}

/// Extract, label and write the CSV in one pass
///
/// An archive with no matching clips is reported with a warning and still
/// produces a header-only CSV.
pub fn run_labeling(
    archive: &Path,
    extract_dir: &Path,
    csv_path: &Path,
) -> Result<LabelingReport, DatasetError> {
    let report = extract_archive(archive, extract_dir)
        .and_then(|()| label_directory(extract_dir))
        .and_then(|report| write_labels(&report.samples, csv_path).map(|()| report))
        .map_err(|err| {
            log_dataset_error(&err, "run_labeling");
            err
        })?;

    if report.samples.is_empty() {
        tracing::warn!("[Labeler] No files were labeled. Check the dataset structure.");
    } else {
        tracing::info!(
            "[Labeler] Successfully labeled {} files ({} skipped, {} missing)",
            report.labeled(),
            report.skipped,
            report.missing
        );
    }
    tracing::info!("[Labeler] Labeled dataset saved to {}", csv_path.display());

    Ok(report)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|err| DatasetError::io(dir, err))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| DatasetError::io(dir, err))?;
    entries.sort();
    Ok(entries)
}

fn absolute(path: &Path) -> Result<PathBuf, DatasetError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|err| DatasetError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn touch(path: &Path) {
        fs::write(path, b"RIFF").unwrap();
    }

    #[test]
    fn test_parse_filename_fields() {
        let parsed = parse_filename("03-01-05-01-02-01-12.wav").unwrap();
        assert_eq!(parsed.modality, 3);
        assert_eq!(parsed.vocal_channel, 1);
        assert_eq!(parsed.emotion_code, 5);
        assert_eq!(parsed.intensity, 1);
        assert_eq!(parsed.statement, 2);
        assert_eq!(parsed.repetition, 1);
        assert_eq!(parsed.actor, 12);
        assert_eq!(parsed.emotion(), Emotion::Angry);
    }

    #[test]
    fn test_parse_filename_rejects_malformed() {
        assert!(parse_filename("03-01-05-01-02-01.wav").is_none());
        assert!(parse_filename("03-01-5-01-02-01-12.wav").is_none());
        assert!(parse_filename("03-01-05-01-02-01-12.mp3").is_none());
        assert!(parse_filename("x03-01-05-01-02-01-12.wav").is_none());
        assert!(parse_filename("03-01-05-01-02-01-12.WAV").is_some());
    }

    #[test]
    fn test_unknown_emotion_code() {
        let parsed = parse_filename("03-01-09-01-01-01-01.wav").unwrap();
        assert_eq!(parsed.emotion(), Emotion::Unknown);
    }

    #[test]
    fn test_label_directory_walks_actor_folders() {
        let dir = tempfile::tempdir().unwrap();
        let actor1 = dir.path().join("Actor_01");
        let actor2 = dir.path().join("Actor_02");
        fs::create_dir_all(&actor1).unwrap();
        fs::create_dir_all(&actor2).unwrap();

        touch(&actor1.join("03-01-05-01-01-01-01.wav"));
        touch(&actor1.join("03-01-01-01-01-01-01.wav"));
        touch(&actor1.join("notes.txt"));
        touch(&actor2.join("bad_name.wav"));
        touch(&actor2.join("03-01-08-02-02-02-02.WAV"));
        // Loose top-level files are ignored
        touch(&dir.path().join("03-01-02-01-01-01-01.wav"));

        let report = label_directory(dir.path()).unwrap();
        assert_eq!(report.labeled(), 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.missing, 0);

        let emotions: Vec<Emotion> = report.samples.iter().map(|s| s.emotion).collect();
        assert_eq!(
            emotions,
            vec![Emotion::Neutral, Emotion::Angry, Emotion::Surprised]
        );
        assert!(report.samples.iter().all(|s| s.file_path.is_absolute()));
    }

    #[test]
    fn test_extract_archive_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_archive(&dir.path().join("nope.zip"), &dir.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, DatasetError::ArchiveMissing { .. }));
        assert_eq!(
            err.to_string(),
            format!(
                "DatasetError (code 2001): ZIP file '{}' not found",
                dir.path().join("nope.zip").display()
            )
        );
    }

    #[test]
    fn test_extract_archive_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, b"this is not a zip archive").unwrap();

        let err = extract_archive(&archive, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, DatasetError::ArchiveCorrupt { .. }));
    }

    #[test]
    fn test_run_labeling_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("dataset.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.add_directory("Actor_01/", options).unwrap();
            zip.start_file("Actor_01/03-01-05-01-01-01-01.wav", options)
                .unwrap();
            zip.write_all(b"RIFF").unwrap();
            zip.start_file("Actor_01/readme.md", options).unwrap();
            zip.write_all(b"ignored").unwrap();
            zip.finish().unwrap();
        }

        let extract_dir = dir.path().join("extracted");
        let csv_path = dir.path().join("data").join("labels.csv");
        let report = run_labeling(&archive, &extract_dir, &csv_path).unwrap();
        assert_eq!(report.labeled(), 1);

        let contents = fs::read_to_string(&csv_path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("filepath,emotion"));
        let row = lines.next().unwrap();
        assert!(row.ends_with("03-01-05-01-01-01-01.wav,Angry"), "row: {}", row);
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_run_labeling_empty_archive_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("empty.zip");
        {
            let file = File::create(&archive).unwrap();
            zip::ZipWriter::new(file).finish().unwrap();
        }

        let csv_path = dir.path().join("labels.csv");
        let report = run_labeling(&archive, &dir.path().join("x"), &csv_path).unwrap();
        assert_eq!(report.labeled(), 0);
        assert_eq!(fs::read_to_string(&csv_path).unwrap().trim(), "filepath,emotion");
    }
}
