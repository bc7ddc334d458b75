// Upload module - per-request temp files with guaranteed cleanup
//
// Each request writes its bytes to a uniquely named file in the upload
// directory. A second file is created only when the upload has to be
// transcoded. Both are deleted when the `ScopedUpload` drops, whichever way
// the request ends.

use std::io::Write;
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

use crate::audio::{is_pcm_wav, transcode_to_wav};
use crate::error::{DecodeError, InferenceError};

const DEFAULT_EXTENSION: &str = "bin";
const MAX_EXTENSION_LEN: usize = 8;

/// Reduce the client filename's extension to `[a-z0-9]{1,8}`, else `bin`
pub fn sanitize_extension(file_name: Option<&str>) -> String {
    let ext: String = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_EXTENSION_LEN)
        .collect();

    if ext.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else {
        ext
    }
}

/// Temp files owned by one request
pub struct ScopedUpload {
    extension: String,
    upload: NamedTempFile,
    normalized: Option<NamedTempFile>,
}

impl ScopedUpload {
    /// Write `bytes` to a fresh `upload-XXXXXX.<ext>` file in `dir`
    pub fn create(dir: &Path, file_name: Option<&str>, bytes: &[u8]) -> Result<Self, InferenceError> {
        let extension = sanitize_extension(file_name);
        let suffix = format!(".{}", extension);

        let mut upload = Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .rand_bytes(6)
            .tempfile_in(dir)
            .map_err(io_error)?;
        upload.write_all(bytes).map_err(io_error)?;
        upload.flush().map_err(io_error)?;

        Ok(Self {
            extension,
            upload,
            normalized: None,
        })
    }

    pub fn path(&self) -> &Path {
        self.upload.path()
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path of a PCM WAV holding the upload's audio
    ///
    /// Readable WAV uploads are used as-is; anything else is transcoded into
    /// a second temp file next to the upload.
    pub fn normalize(&mut self) -> Result<&Path, InferenceError> {
        if self.extension == "wav" && is_pcm_wav(self.upload.path()) {
            return Ok(self.upload.path());
        }

        let dir = self
            .upload
            .path()
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let normalized = Builder::new()
            .prefix("normalized-")
            .suffix(".wav")
            .rand_bytes(6)
            .tempfile_in(&dir)
            .map_err(io_error)?;

        let summary = transcode_to_wav(self.upload.path(), normalized.path())
            .map_err(InferenceError::from)?;
        tracing::debug!(
            "[InferenceService] Transcoded .{} upload ({} frames @ {} Hz)",
            self.extension,
            summary.frames,
            summary.sample_rate
        );

        Ok(self.normalized.insert(normalized).path())
    }
}

fn io_error(err: std::io::Error) -> InferenceError {
    DecodeError::from(err).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_extension() {
        assert_eq!(sanitize_extension(Some("clip.WAV")), "wav");
        assert_eq!(sanitize_extension(Some("voice.m4a")), "m4a");
        assert_eq!(sanitize_extension(Some("x.w@v!")), "wv");
        assert_eq!(sanitize_extension(Some("long.abcdefghijkl")), "abcdefgh");
        assert_eq!(sanitize_extension(Some("noext")), "bin");
        assert_eq!(sanitize_extension(Some("trailing.")), "bin");
        assert_eq!(sanitize_extension(None), "bin");
    }

    #[test]
    fn test_files_are_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let upload = ScopedUpload::create(dir.path(), Some("a.ogg"), b"bytes").unwrap();
            let name = upload.path().file_name().unwrap().to_str().unwrap().to_string();
            assert!(name.starts_with("upload-"));
            assert!(name.ends_with(".ogg"));
            upload.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_normalize_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut upload = ScopedUpload::create(dir.path(), Some("x.mp3"), &[0u8; 512]).unwrap();
            let err = upload.normalize().unwrap_err();
            assert!(matches!(err, InferenceError::UnprocessableInput { .. }));
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_concurrent_uploads_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = ScopedUpload::create(dir.path(), Some("a.wav"), b"1").unwrap();
        let b = ScopedUpload::create(dir.path(), Some("a.wav"), b"2").unwrap();
        assert_ne!(a.path(), b.path());
    }
}
