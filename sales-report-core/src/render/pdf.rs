//! Landscape A4 PDF rendering with printpdf.
//!
//! Rendering happens in two passes. [`layout_table`] wraps every cell into
//! lines and assigns rows to pages, producing a [`PdfTableLayout`] that can be
//! inspected without decoding a PDF. [`render`] then turns the layout plus the
//! branding block into printpdf operations.
//!
//! Text is set in the Helvetica subsets bundled with printpdf, embedded as
//! TrueType fonts so that accented characters are written as glyph ids with a
//! ToUnicode map. Layout measures text with the Helvetica AFM advance widths,
//! which match those fonts.

use printpdf::*;
use tracing::debug;

use super::table::{ReportTable, COLUMN_COUNT, HEADERS};
use crate::config::CompanyInfo;
use crate::error::RenderError;
use crate::period::ReportPeriod;

/// Relative column widths; scaled to the usable page width.
pub const COLUMN_WEIGHTS: [f32; COLUMN_COUNT] =
    [8.0, 20.0, 25.0, 15.0, 12.0, 12.0, 15.0, 15.0, 15.0, 20.0];

const PAGE_WIDTH_MM: f32 = 297.0;
const PAGE_HEIGHT_MM: f32 = 210.0;
const PAGE_WIDTH: f32 = PAGE_WIDTH_MM * 72.0 / 25.4;
const PAGE_HEIGHT: f32 = PAGE_HEIGHT_MM * 72.0 / 25.4;
const MARGIN: f32 = 36.0;
const PAGE_TOP: f32 = PAGE_HEIGHT - MARGIN;
const PAGE_BOTTOM: f32 = MARGIN;

const LOGO_BOX: f32 = 100.0;
const BLOCK_SPACING: f32 = 20.0;
const COMPANY_FONT_SIZE: f32 = 12.0;
const COMPANY_LINE_HEIGHT: f32 = 14.4;
const TITLE_FONT_SIZE: f32 = 18.0;
const TITLE_LINE_HEIGHT: f32 = 21.6;

/// Top of the table on the first page, below logo, company block and title.
const FIRST_PAGE_TABLE_TOP: f32 = PAGE_TOP
    - LOGO_BOX
    - BLOCK_SPACING
    - 3.0 * COMPANY_LINE_HEIGHT
    - BLOCK_SPACING
    - TITLE_LINE_HEIGHT
    - BLOCK_SPACING;

const CELL_FONT_SIZE: f32 = 10.0;
const CELL_LINE_HEIGHT: f32 = 12.0;
const CELL_PADDING: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Header,
    /// Index into the input records.
    Record(usize),
}

/// A row, or one segment of a row, placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRow {
    pub kind: RowKind,
    /// True for the second and later segments of a row taller than the space
    /// left on a page.
    pub continued: bool,
    /// Y coordinate of the top edge, in points from the page bottom.
    pub top: f32,
    pub height: f32,
    /// Wrapped lines per column.
    pub cells: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaidOutPage {
    pub rows: Vec<PlacedRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfTableLayout {
    pub left: f32,
    pub column_widths: [f32; COLUMN_COUNT],
    pub pages: Vec<LaidOutPage>,
}

impl PdfTableLayout {
    pub fn column_count(&self) -> usize {
        self.column_widths.len()
    }

    /// Logical rows: the header plus one per record, however many segments
    /// each was split into.
    pub fn row_count(&self) -> usize {
        self.segments().filter(|row| !row.continued).count()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Record indexes in the order they are drawn.
    pub fn record_order(&self) -> Vec<usize> {
        self.segments()
            .filter(|row| !row.continued)
            .filter_map(|row| match row.kind {
                RowKind::Record(idx) => Some(idx),
                RowKind::Header => None,
            })
            .collect()
    }

    /// All lines drawn for `kind`, across its segments, per column.
    pub fn lines_for(&self, kind: RowKind) -> Vec<Vec<String>> {
        let mut columns = vec![Vec::new(); COLUMN_COUNT];
        for row in self.segments().filter(|row| row.kind == kind) {
            for (column, lines) in columns.iter_mut().zip(&row.cells) {
                column.extend(lines.iter().cloned());
            }
        }
        columns
    }

    fn segments(&self) -> impl Iterator<Item = &PlacedRow> {
        self.pages.iter().flat_map(|page| page.rows.iter())
    }
}

/// Wrap every cell and paginate the table. Header first, then records in
/// input order; nothing is dropped or cut short.
pub fn layout_table(table: &ReportTable, currency_symbol: &str) -> PdfTableLayout {
    let usable_width = PAGE_WIDTH - 2.0 * MARGIN;
    let total_weight: f32 = COLUMN_WEIGHTS.iter().sum();
    let column_widths = COLUMN_WEIGHTS.map(|weight| usable_width * weight / total_weight);

    let mut paginator = Paginator {
        pages: vec![LaidOutPage::default()],
        cursor: FIRST_PAGE_TABLE_TOP,
    };

    let header_cells = HEADERS
        .iter()
        .zip(column_widths.iter())
        .map(|(text, width)| wrap_text(text, width - 2.0 * CELL_PADDING, CELL_FONT_SIZE, true))
        .collect();
    paginator.place(RowKind::Header, header_cells);

    for (idx, row) in table.rows().iter().enumerate() {
        let cells = row
            .iter()
            .zip(column_widths.iter())
            .map(|(cell, width)| {
                wrap_text(
                    &cell.display(currency_symbol),
                    width - 2.0 * CELL_PADDING,
                    CELL_FONT_SIZE,
                    false,
                )
            })
            .collect();
        paginator.place(RowKind::Record(idx), cells);
    }

    PdfTableLayout {
        left: MARGIN,
        column_widths,
        pages: paginator.pages,
    }
}

struct Paginator {
    pages: Vec<LaidOutPage>,
    cursor: f32,
}

impl Paginator {
    fn lines_fitting(height: f32) -> usize {
        ((height - 2.0 * CELL_PADDING) / CELL_LINE_HEIGHT).floor().max(0.0) as usize
    }

    fn new_page(&mut self) {
        self.pages.push(LaidOutPage::default());
        self.cursor = PAGE_TOP;
    }

    fn current_page_is_empty(&self) -> bool {
        self.pages.last().map_or(true, |page| page.rows.is_empty())
    }

    fn place(&mut self, kind: RowKind, cells: Vec<Vec<String>>) {
        let total_lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let full_page_lines = Self::lines_fitting(PAGE_TOP - PAGE_BOTTOM);
        let mut offset = 0;

        while offset < total_lines {
            let remaining = total_lines - offset;
            let available = Self::lines_fitting(self.cursor - PAGE_BOTTOM);

            if remaining <= available {
                self.push_segment(kind, &cells, offset, total_lines);
                return;
            }
            // Keep a row whole when a fresh page can hold it.
            if (remaining <= full_page_lines && !self.current_page_is_empty()) || available == 0 {
                self.new_page();
                continue;
            }
            self.push_segment(kind, &cells, offset, offset + available);
            offset += available;
            self.new_page();
        }
    }

    fn push_segment(&mut self, kind: RowKind, cells: &[Vec<String>], from: usize, to: usize) {
        let lines = to - from;
        let height = lines as f32 * CELL_LINE_HEIGHT + 2.0 * CELL_PADDING;
        let segment_cells = cells
            .iter()
            .map(|column| {
                let start = from.min(column.len());
                let end = to.min(column.len());
                column[start..end].to_vec()
            })
            .collect();
        let row = PlacedRow {
            kind,
            continued: from > 0,
            top: self.cursor,
            height,
            cells: segment_cells,
        };
        self.cursor -= height;
        if let Some(page) = self.pages.last_mut() {
            page.rows.push(row);
        }
    }
}

/// Greedy word wrap to `max_width` points. Words wider than a line are broken
/// between characters. Always returns at least one line.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32, bold: bool) -> Vec<String> {
    let fits = |candidate: &str| text_width(candidate, font_size, bold) <= max_width;
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if fits(&candidate) {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if fits(word) {
                current = word.to_string();
                continue;
            }
            for ch in word.chars() {
                let mut next = current.clone();
                next.push(ch);
                if !current.is_empty() && !fits(&next) {
                    lines.push(std::mem::replace(&mut current, ch.to_string()));
                } else {
                    current = next;
                }
            }
        }
        lines.push(current);
    }
    lines
}

/// Estimated width in points of `text` set in Helvetica.
pub fn text_width(text: &str, font_size: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(glyph_width).sum();
    let weight = if bold { 1.08 } else { 1.0 };
    units as f32 * font_size / 1000.0 * weight
}

fn glyph_width(ch: char) -> u32 {
    match ch {
        'i' | 'j' | 'l' | 'ì' | 'í' | 'î' | 'ï' => 222,
        ' ' | '!' | ',' | '.' | '/' | ':' | ';' | 'I' | 'f' | 't' | '[' | ']' | '\\' => 278,
        'Ì' | 'Í' | 'Î' | 'Ï' => 278,
        '\'' | '|' => 191,
        '(' | ')' | '-' | 'r' | '¡' | '°' => 333,
        '"' => 355,
        '*' => 389,
        'J' | 'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' | 'ç' | 'ý' | 'ÿ' => 500,
        '+' | '<' | '=' | '>' => 584,
        'F' | 'T' | 'Z' | '¿' => 611,
        'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' | '&' => 667,
        'Á' | 'À' | 'Â' | 'Ä' | 'É' | 'È' | 'Ê' | 'Ë' | 'Ý' => 667,
        'C' | 'D' | 'H' | 'N' | 'R' | 'U' | 'w' | 'Ç' | 'Ñ' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 722,
        'G' | 'O' | 'Q' | 'Ó' | 'Ò' | 'Ô' | 'Ö' => 778,
        'M' | 'm' => 833,
        '%' => 889,
        'W' => 944,
        '@' => 1015,
        c if c.is_uppercase() => 722,
        _ => 556,
    }
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb {
        r,
        g,
        b,
        icc_profile: None,
    })
}

/// Regular and bold Helvetica registered with one document.
struct ReportFonts {
    regular: FontId,
    bold: FontId,
}

impl ReportFonts {
    fn register(doc: &mut PdfDocument, warnings: &mut Vec<PdfWarnMsg>) -> Result<Self, RenderError> {
        Ok(Self {
            regular: embed_font(doc, BuiltinFont::Helvetica, warnings)?,
            bold: embed_font(doc, BuiltinFont::HelveticaBold, warnings)?,
        })
    }

    fn for_row(&self, kind: RowKind) -> &FontId {
        match kind {
            RowKind::Header => &self.bold,
            RowKind::Record(_) => &self.regular,
        }
    }
}

fn embed_font(
    doc: &mut PdfDocument,
    builtin: BuiltinFont,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Result<FontId, RenderError> {
    let subset = builtin.get_subset_font();
    let font = ParsedFont::from_bytes(&subset.bytes, 0, warnings)
        .ok_or_else(|| RenderError::Pdf(format!("font {} could not be parsed", builtin.get_id())))?;
    Ok(doc.add_font(&font))
}

fn text_ops(text: &str, x: f32, baseline: f32, size: f32, font: &FontId) -> Vec<Op> {
    vec![
        Op::StartTextSection,
        Op::SetFontSize {
            size: Pt(size),
            font: font.clone(),
        },
        Op::SetTextCursor {
            pos: Point {
                x: Pt(x),
                y: Pt(baseline),
            },
        },
        Op::WriteText {
            items: vec![TextItem::Text(text.to_string())],
            font: font.clone(),
        },
        Op::EndTextSection,
    ]
}

fn centered_text_ops(text: &str, baseline: f32, size: f32, fonts: &ReportFonts) -> Vec<Op> {
    let x = ((PAGE_WIDTH - text_width(text, size, true)) / 2.0).max(MARGIN);
    text_ops(text, x, baseline, size, &fonts.bold)
}

fn rect_op(x: f32, bottom: f32, width: f32, height: f32, mode: PaintMode) -> Op {
    let corners = [
        (x, bottom),
        (x + width, bottom),
        (x + width, bottom + height),
        (x, bottom + height),
    ];
    Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: corners
                    .iter()
                    .map(|&(px, py)| LinePoint {
                        p: Point { x: Pt(px), y: Pt(py) },
                        bezier: false,
                    })
                    .collect(),
            }],
            mode,
            winding_order: WindingOrder::NonZero,
        },
    }
}

fn header_block_ops(
    period: &ReportPeriod,
    company: &CompanyInfo,
    logo: &XObjectId,
    logo_size: (f32, f32),
    fonts: &ReportFonts,
) -> Vec<Op> {
    let mut ops = Vec::new();

    let (width, height) = logo_size;
    let scale = (LOGO_BOX / width).min(LOGO_BOX / height);
    ops.push(Op::UseXobject {
        id: logo.clone(),
        transform: XObjectTransform {
            translate_x: Some(Pt((PAGE_WIDTH - width * scale) / 2.0)),
            translate_y: Some(Pt(PAGE_TOP - height * scale)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(72.0),
            ..Default::default()
        },
    });

    ops.push(Op::SetFillColor {
        col: rgb(0.0, 0.0, 0.0),
    });
    let mut baseline = PAGE_TOP - LOGO_BOX - BLOCK_SPACING - COMPANY_FONT_SIZE;
    for line in [
        format!("Nombre de la empresa: {}", company.name),
        format!("Correo: {}", company.email),
        format!("Celular: {}", company.phone),
    ] {
        ops.extend(centered_text_ops(&line, baseline, COMPANY_FONT_SIZE, fonts));
        baseline -= COMPANY_LINE_HEIGHT;
    }

    let title = format!(
        "Reporte de ventas del mes {} a {}",
        period.start_iso(),
        period.end_iso()
    );
    let title_baseline = baseline + COMPANY_LINE_HEIGHT - BLOCK_SPACING - TITLE_LINE_HEIGHT;
    ops.extend(centered_text_ops(&title, title_baseline, TITLE_FONT_SIZE, fonts));
    ops
}

fn table_page_ops(layout: &PdfTableLayout, page: &LaidOutPage, fonts: &ReportFonts) -> Vec<Op> {
    let mut ops = vec![
        Op::SetOutlineColor {
            col: rgb(0.2, 0.2, 0.2),
        },
        Op::SetOutlineThickness { pt: Pt(0.5) },
    ];

    // Cell boxes first; the header fill colour would otherwise tint the text.
    for row in &page.rows {
        let (mode, fill) = match row.kind {
            RowKind::Header => (PaintMode::FillStroke, rgb(0.5, 0.5, 0.5)),
            RowKind::Record(_) => (PaintMode::Stroke, rgb(1.0, 1.0, 1.0)),
        };
        ops.push(Op::SetFillColor { col: fill });
        let mut x = layout.left;
        for width in layout.column_widths {
            ops.push(rect_op(x, row.top - row.height, width, row.height, mode));
            x += width;
        }
    }

    ops.push(Op::SetFillColor {
        col: rgb(0.0, 0.0, 0.0),
    });
    for row in &page.rows {
        let font = fonts.for_row(row.kind);
        let mut x = layout.left;
        for (lines, width) in row.cells.iter().zip(layout.column_widths) {
            for (line_idx, line) in lines.iter().enumerate() {
                if line.is_empty() {
                    continue;
                }
                let line_x = match row.kind {
                    RowKind::Header => {
                        x + ((width - text_width(line, CELL_FONT_SIZE, true)) / 2.0)
                            .max(CELL_PADDING)
                    }
                    RowKind::Record(_) => x + CELL_PADDING,
                };
                let baseline = row.top
                    - CELL_PADDING
                    - line_idx as f32 * CELL_LINE_HEIGHT
                    - CELL_FONT_SIZE * 0.9;
                ops.extend(text_ops(line, line_x, baseline, CELL_FONT_SIZE, font));
            }
            x += width;
        }
    }
    ops
}

/// Draw the branding block and the laid-out table into a PDF document.
pub fn render(
    period: &ReportPeriod,
    layout: &PdfTableLayout,
    company: &CompanyInfo,
    branding_image: &[u8],
) -> Result<Vec<u8>, RenderError> {
    let mut doc = PdfDocument::new("Reporte de ventas");
    let mut warnings = Vec::new();

    let image = RawImage::decode_from_bytes(branding_image, &mut warnings)
        .map_err(|e| RenderError::ImageDecode(e.to_string()))?;
    if image.width == 0 || image.height == 0 {
        return Err(RenderError::ImageDecode("image has no pixels".to_string()));
    }
    let logo_size = (image.width as f32, image.height as f32);
    let logo = doc.add_image(&image);
    let fonts = ReportFonts::register(&mut doc, &mut warnings)?;

    let pages: Vec<PdfPage> = layout
        .pages
        .iter()
        .enumerate()
        .map(|(idx, page)| {
            let mut ops = Vec::new();
            if idx == 0 {
                ops.extend(header_block_ops(period, company, &logo, logo_size, &fonts));
            }
            ops.extend(table_page_ops(layout, page, &fonts));
            PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), ops)
        })
        .collect();

    let bytes = doc
        .with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut warnings);
    debug!(
        warnings = warnings.len(),
        pages = layout.page_count(),
        size = bytes.len(),
        "Rendered PDF"
    );

    if !bytes.starts_with(b"%PDF") {
        return Err(RenderError::Pdf(
            "printpdf produced output without a PDF header".to_string(),
        ));
    }
    Ok(bytes)
}
