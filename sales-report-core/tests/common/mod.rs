#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sales_report_core::contract::SaleRecord;

/// 4x2 RGB PNG.
pub const LOGO_PNG: [u8; 73] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x02, 0x08, 0x02, 0x00, 0x00, 0x00, 0xf0,
    0xca, 0xea, 0x34, 0x00, 0x00, 0x00, 0x10, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x38,
    0x21, 0x27, 0x07, 0x47, 0x0c, 0xc8, 0x1c, 0x00, 0x6f, 0x0a, 0x08, 0x21, 0x06, 0xa5, 0xd2,
    0x76, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn record(id: i32, name: &str, price: &str, sale_date: NaiveDate) -> SaleRecord {
    SaleRecord {
        product_id: id,
        name: name.to_string(),
        description: format!("Descripción de {name}"),
        category: "Electrónica".to_string(),
        unit_price: Decimal::from_str(price).unwrap(),
        stock_quantity: 7,
        intake_date: date(2024, 1, 10),
        sale_date,
        supplier: "Proveedor SAC".to_string(),
        storage_location: "A-01".to_string(),
        active: true,
    }
}

/// The two March 2024 sales used across tests.
pub fn march_records() -> Vec<SaleRecord> {
    vec![
        record(1, "Laptop", "1234.5", date(2024, 3, 5)),
        record(2, "Mouse", "25", date(2024, 3, 20)),
    ]
}

pub fn many_records(count: i32) -> Vec<SaleRecord> {
    (1..=count)
        .map(|id| record(id, &format!("Producto {id}"), "10.99", date(2024, 3, 1 + (id as u32 % 28))))
        .collect()
}

/// Decoded text of every page, in page order.
pub fn pdf_page_texts(bytes: &[u8]) -> Vec<String> {
    let doc = lopdf::Document::load_mem(bytes).expect("PDF should parse");
    doc.get_pages()
        .keys()
        .map(|page| doc.extract_text(&[*page]).expect("page text should decode"))
        .collect()
}

/// One XML part of an XLSX archive.
pub fn xlsx_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("xlsx is a zip archive");
    let mut part = archive.by_name(name).expect("part should exist");
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

/// XML of a single `<c>` element.
pub fn xlsx_cell<'a>(sheet: &'a str, reference: &str) -> &'a str {
    let start = sheet
        .find(&format!("<c r=\"{reference}\""))
        .unwrap_or_else(|| panic!("cell {reference} missing"));
    let rest = &sheet[start..];
    let end = rest.find("</c>").map(|i| i + 4).unwrap_or_else(|| rest.find("/>").unwrap() + 2);
    &rest[..end]
}
