use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::debug;

use super::table::{format_date, Cell, ReportTable, COLUMN_COUNT};
use crate::error::RenderError;

pub const SHEET_NAME: &str = "Reporte de Ventas";
pub const TITLE: &str = "Reporte de Ventas";

const TITLE_ROW: u32 = 0;
const HEADER_ROW: u32 = 1;
const FIRST_DATA_ROW: u32 = 2;
const LAST_COLUMN: u16 = COLUMN_COUNT as u16 - 1;

/// Single-sheet workbook: merged title row, header row, then one row per
/// record. Numbers stay numeric; dates are written as `dd/mm/yyyy` text.
pub fn render(table: &ReportTable) -> Result<Vec<u8>, RenderError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let title_format = Format::new()
        .set_bold()
        .set_font_size(16.0)
        .set_font_color(Color::White)
        .set_background_color(Color::Green)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    worksheet.merge_range(TITLE_ROW, 0, TITLE_ROW, LAST_COLUMN, TITLE, &title_format)?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::Gray)
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin);
    for (col, header) in table.headers().iter().enumerate() {
        worksheet.write_string_with_format(HEADER_ROW, col as u16, *header, &header_format)?;
    }

    if table.is_empty() {
        debug!("No records for the period; writing title and header only");
    }
    for (idx, row) in table.rows().iter().enumerate() {
        let row_num = FIRST_DATA_ROW + idx as u32;
        for (col, cell) in row.iter().enumerate() {
            write_cell(worksheet, row_num, col as u16, cell)?;
        }
    }

    worksheet.autofit();

    let bytes = workbook.save_to_buffer()?;
    debug!(rows = table.len(), size = bytes.len(), "Rendered spreadsheet");
    Ok(bytes)
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<(), RenderError> {
    match cell {
        Cell::Integer(value) => {
            worksheet.write_number(row, col, *value as f64)?;
        }
        Cell::Money(amount) => match amount.to_f64() {
            Some(value) => {
                worksheet.write_number(row, col, value)?;
            }
            None => {
                worksheet.write_string(row, col, amount.to_string())?;
            }
        },
        Cell::Date(date) => {
            worksheet.write_string(row, col, format_date(date))?;
        }
        Cell::Text(text) => {
            worksheet.write_string(row, col, text)?;
        }
    }
    Ok(())
}
