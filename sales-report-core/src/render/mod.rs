//! Document rendering: the PDF report and the spreadsheet export.
//!
//! [`DocumentRenderer`] holds the presentation settings (currency symbol and
//! company block) and turns an ordered list of [`SaleRecord`]s into document
//! bytes. Both documents are built from the same [`table::ReportTable`], so
//! column order and record order cannot drift between them.

pub mod pdf;
pub mod spreadsheet;
pub mod table;

use tracing::info;

use crate::config::{CompanyInfo, PipelineConfig};
use crate::contract::SaleRecord;
use crate::error::RenderError;
use crate::period::ReportPeriod;

pub use pdf::{PdfTableLayout, RowKind};
pub use table::ReportTable;

#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    currency_symbol: String,
    company: CompanyInfo,
}

impl DocumentRenderer {
    pub fn new(currency_symbol: impl Into<String>, company: CompanyInfo) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
            company,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.currency_symbol.clone(), config.company.clone())
    }

    /// Page layout of the PDF table, without drawing anything.
    pub fn layout_pdf_table(&self, records: &[SaleRecord]) -> PdfTableLayout {
        pdf::layout_table(&ReportTable::from_records(records), &self.currency_symbol)
    }

    pub fn render_pdf(
        &self,
        period: &ReportPeriod,
        records: &[SaleRecord],
        branding_image: &[u8],
    ) -> Result<Vec<u8>, RenderError> {
        let layout = self.layout_pdf_table(records);
        info!(
            records = records.len(),
            pages = layout.page_count(),
            "[REPORT][RENDER] Rendering PDF"
        );
        pdf::render(period, &layout, &self.company, branding_image)
    }

    pub fn render_spreadsheet(&self, records: &[SaleRecord]) -> Result<Vec<u8>, RenderError> {
        info!(records = records.len(), "[REPORT][RENDER] Rendering spreadsheet");
        spreadsheet::render(&ReportTable::from_records(records))
    }
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}
