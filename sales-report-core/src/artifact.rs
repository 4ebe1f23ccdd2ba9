//! Local temporary files holding rendered documents until they are uploaded.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::period::ReportPeriod;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const SPREADSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A rendered document on disk plus the blob name it is published under.
///
/// The file is removed when the artifact is dropped, so an aborted run leaves
/// nothing behind in the work directory.
#[derive(Debug)]
pub struct GeneratedArtifact {
    file: NamedTempFile,
    blob_name: String,
    content_type: &'static str,
}

impl GeneratedArtifact {
    /// Write `bytes` to a fresh file in `work_dir` named
    /// `<prefix><random><suffix>`. The directory is created if missing.
    pub fn write(
        work_dir: &Path,
        prefix: &str,
        suffix: &str,
        blob_name: impl Into<String>,
        content_type: &'static str,
        bytes: &[u8],
    ) -> std::io::Result<Self> {
        std::fs::create_dir_all(work_dir)?;
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(work_dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        let artifact = Self {
            file,
            blob_name: blob_name.into(),
            content_type,
        };
        debug!(
            path = %artifact.path().display(),
            blob = %artifact.blob_name,
            size = bytes.len(),
            "Wrote artifact"
        );
        Ok(artifact)
    }

    /// `ReporteVentas_<start>_<end>_<timestamp>….pdf`
    pub fn pdf(
        work_dir: &Path,
        period: &ReportPeriod,
        generated_at: NaiveDateTime,
        bytes: &[u8],
    ) -> std::io::Result<Self> {
        let prefix = format!(
            "ReporteVentas_{}_{}_{}",
            period.start_iso(),
            period.end_iso(),
            generated_at.format(TIMESTAMP_FORMAT)
        );
        Self::write(
            work_dir,
            &prefix,
            ".pdf",
            period.pdf_blob_name(),
            PDF_CONTENT_TYPE,
            bytes,
        )
    }

    /// `ReporteVentas_<timestamp>….xlsx`
    pub fn spreadsheet(
        work_dir: &Path,
        period: &ReportPeriod,
        generated_at: NaiveDateTime,
        bytes: &[u8],
    ) -> std::io::Result<Self> {
        let prefix = format!("ReporteVentas_{}", generated_at.format(TIMESTAMP_FORMAT));
        Self::write(
            work_dir,
            &prefix,
            ".xlsx",
            period.spreadsheet_blob_name(),
            SPREADSHEET_CONTENT_TYPE,
            bytes,
        )
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn blob_name(&self) -> &str {
        &self.blob_name
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Remove the local file now, reporting any I/O error.
    pub fn delete(self) -> std::io::Result<()> {
        let path = self.file.path().to_path_buf();
        self.file.close()?;
        debug!(path = %path.display(), "Deleted artifact");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(23, 5, 9)
            .unwrap()
    }

    #[test]
    fn file_names_carry_period_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let period = ReportPeriod::for_month(2024, 3).unwrap();

        let pdf = GeneratedArtifact::pdf(dir.path(), &period, generated_at(), b"%PDF-").unwrap();
        let name = pdf.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("ReporteVentas_2024-03-01_2024-03-31_20240331_230509"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(pdf.blob_name(), "Reporte_3_2024.pdf");

        let xlsx = GeneratedArtifact::spreadsheet(dir.path(), &period, generated_at(), b"PK").unwrap();
        let name = xlsx.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("ReporteVentas_20240331_230509"));
        assert!(name.ends_with(".xlsx"));
        assert_eq!(xlsx.content_type(), SPREADSHEET_CONTENT_TYPE);
    }

    #[test]
    fn delete_and_drop_both_remove_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let period = ReportPeriod::for_month(2024, 3).unwrap();

        let deleted = GeneratedArtifact::pdf(dir.path(), &period, generated_at(), b"a").unwrap();
        let deleted_path = deleted.path().to_path_buf();
        deleted.delete().unwrap();
        assert!(!deleted_path.exists());

        let dropped_path = {
            let dropped =
                GeneratedArtifact::spreadsheet(dir.path(), &period, generated_at(), b"b").unwrap();
            dropped.path().to_path_buf()
        };
        assert!(!dropped_path.exists());
    }

    #[test]
    fn missing_work_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let artifact =
            GeneratedArtifact::write(&nested, "x", ".bin", "x.bin", PDF_CONTENT_TYPE, b"1").unwrap();
        assert_eq!(std::fs::read(artifact.path()).unwrap(), b"1");
    }
}
