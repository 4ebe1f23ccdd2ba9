//! Row model shared by the PDF and the spreadsheet.
//!
//! Both documents show the same ten columns in the same order; this module
//! turns sale records into typed cells once, and each renderer decides how a
//! cell is presented (formatted text in the PDF, native values in the sheet).

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::contract::SaleRecord;

pub const COLUMN_COUNT: usize = 10;

pub const HEADERS: [&str; COLUMN_COUNT] = [
    "ID",
    "Nombre",
    "Descripción",
    "Categoría",
    "Precio",
    "Cantidad",
    "Fecha Ingreso",
    "Fecha Venta",
    "Proveedor",
    "Ubicación",
];

pub const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Integer(i64),
    Money(Decimal),
    Date(NaiveDate),
    Text(String),
}

impl Cell {
    /// Text shown for this cell in the PDF.
    pub fn display(&self, currency_symbol: &str) -> String {
        match self {
            Cell::Integer(value) => value.to_string(),
            Cell::Money(amount) => format_currency(amount, currency_symbol),
            Cell::Date(date) => format_date(date),
            Cell::Text(text) => text.clone(),
        }
    }
}

pub type Row = [Cell; COLUMN_COUNT];

#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    rows: Vec<Row>,
}

impl ReportTable {
    /// One row per record, in input order.
    pub fn from_records(records: &[SaleRecord]) -> Self {
        let rows = records
            .iter()
            .map(|r| {
                [
                    Cell::Integer(r.product_id.into()),
                    Cell::Text(r.name.clone()),
                    Cell::Text(r.description.clone()),
                    Cell::Text(r.category.clone()),
                    Cell::Money(r.unit_price),
                    Cell::Integer(r.stock_quantity.into()),
                    Cell::Date(r.intake_date),
                    Cell::Date(r.sale_date),
                    Cell::Text(r.supplier.clone()),
                    Cell::Text(r.storage_location.clone()),
                ]
            })
            .collect();
        Self { rows }
    }

    pub fn headers(&self) -> &'static [&'static str; COLUMN_COUNT] {
        &HEADERS
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `S/ 1,234.50` style: symbol, thousands separators, two decimals rounded
/// half away from zero.
pub fn format_currency(amount: &Decimal, symbol: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let plain = format!("{:.2}", rounded.abs());
    let (whole, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    if symbol.is_empty() {
        format!("{sign}{grouped}.{cents}")
    } else {
        format!("{sign}{symbol} {grouped}.{cents}")
    }
}
