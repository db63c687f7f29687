//! Extraction results and the downloadable JSON artefact.

use crate::audit::MarksAudit;
use crate::error::ExtractError;
use crate::schema::QuestionPaper;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name offered for download.
pub const DOWNLOAD_FILE_NAME: &str = "extracted_questions.json";
pub const DOWNLOAD_MIME: &str = "application/json";

/// Rough per-page model latency used for the wait estimate.
pub const SECONDS_PER_PAGE: u64 = 12;

/// Everything one successful extraction produced.
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub paper: QuestionPaper,
    /// Reply text exactly as the model returned it.
    pub raw_response: String,
    pub audit: MarksAudit,
    pub stats: ExtractionStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub page_count: usize,
    pub question_count: usize,
    /// Reported by the backend; `None` when it does not report usage.
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    /// Zero when the caller supplied pages already rasterised.
    pub rasterize_ms: u64,
    pub request_ms: u64,
    pub total_ms: u64,
}

/// An in-memory file ready to hand to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: &'static str,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Pretty-printed JSON of `paper` as a [`Download`].
pub fn download(paper: &QuestionPaper) -> Result<Download, ExtractError> {
    let json = paper
        .to_json_pretty()
        .map_err(|e| ExtractError::Internal(format!("serialising paper: {}", e)))?;
    Ok(Download {
        file_name: DOWNLOAD_FILE_NAME,
        mime: DOWNLOAD_MIME,
        bytes: json.into_bytes(),
    })
}

/// Write `download` to `path`; a directory receives `download.file_name`.
///
/// The bytes go to a sibling temp file that is then renamed over the target,
/// so a reader never sees a half-written file. Returns the final path.
pub async fn write_download(
    download: &Download,
    path: impl AsRef<Path>,
) -> Result<PathBuf, ExtractError> {
    let requested = path.as_ref();
    let target = if tokio::fs::metadata(requested)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        requested.join(download.file_name)
    } else {
        requested.to_path_buf()
    };
    let write_err = |source| ExtractError::OutputWriteFailed {
        path: target.clone(),
        source,
    };

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = target.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &download.bytes)
        .await
        .map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, &target).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(target)
}

/// Expected wait for a paper of `page_count` pages.
pub fn estimate_processing_time(page_count: usize) -> Duration {
    Duration::from_secs(page_count as u64 * SECONDS_PER_PAGE)
}

/// Human wording for an estimate: `~36 seconds`, `~2 minute(s)`.
pub fn describe_estimate(estimate: Duration) -> String {
    let secs = estimate.as_secs();
    if secs < 60 {
        format!("~{} seconds", secs)
    } else {
        format!("~{} minute(s)", secs / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{QuestionDetail, QuestionType};

    fn paper() -> QuestionPaper {
        QuestionPaper {
            questions: vec![QuestionDetail::new("1", QuestionType::Mcq, "$1+1=?$", 2.0)],
            total_max_marks: 2.0,
        }
    }

    #[test]
    fn download_is_pretty_json_of_paper() {
        let d = download(&paper()).unwrap();
        assert_eq!(d.file_name, "extracted_questions.json");
        assert_eq!(d.mime, "application/json");
        let text = String::from_utf8(d.bytes).unwrap();
        assert!(text.contains("\n  \"questions\""));
        let back: QuestionPaper = serde_json::from_str(&text).unwrap();
        assert_eq!(back, paper());
    }

    #[tokio::test]
    async fn write_into_directory_uses_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let d = download(&paper()).unwrap();
        let written = write_download(&d, dir.path()).await.unwrap();
        assert_eq!(written, dir.path().join(DOWNLOAD_FILE_NAME));
        assert_eq!(std::fs::read(&written).unwrap(), d.bytes);
        assert!(!written.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out/paper.json");
        let d = download(&paper()).unwrap();
        assert_eq!(write_download(&d, &target).await.unwrap(), target);
        assert!(target.exists());
    }

    #[tokio::test]
    async fn write_failure_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let target = blocker.join("paper.json");
        let err = write_download(&download(&paper()).unwrap(), &target)
            .await
            .unwrap_err();
        match err {
            ExtractError::OutputWriteFailed { path, .. } => assert_eq!(path, target),
            other => panic!("expected OutputWriteFailed, got {other:?}"),
        }
    }

    #[test]
    fn estimate_is_twelve_seconds_per_page() {
        assert_eq!(estimate_processing_time(3), Duration::from_secs(36));
        assert_eq!(describe_estimate(estimate_processing_time(3)), "~36 seconds");
        assert_eq!(describe_estimate(estimate_processing_time(10)), "~2 minute(s)");
    }
}
