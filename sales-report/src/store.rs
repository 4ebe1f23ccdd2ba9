//! Postgres record store.
//!
//! Every call opens its own connection, runs the single sales query, and
//! closes the connection again whether or not the query succeeded.

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::TryStreamExt;
use rust_decimal::Decimal;
use sales_report_core::contract::{RecordStore, SaleRecord};
use sales_report_core::error::StoreError;
use sales_report_core::period::ReportPeriod;
use sqlx::{Connection, PgConnection};
use tracing::{debug, info, warn};

pub const SALES_QUERY: &str = "SELECT product_id, nombre, descripcion, categoria, precio, \
cantidad_en_stock, fecha_de_ingreso, fecha_de_venta, proveedor, ubicacion_en_almacen, activo \
FROM productos \
WHERE fecha_de_venta BETWEEN CAST($1 AS DATE) AND CAST($2 AS DATE)";

/// Row shape of `productos`. Free-text columns are nullable in the table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductoRow {
    pub product_id: i32,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub categoria: Option<String>,
    pub precio: Decimal,
    pub cantidad_en_stock: i32,
    pub fecha_de_ingreso: NaiveDate,
    pub fecha_de_venta: NaiveDate,
    pub proveedor: Option<String>,
    pub ubicacion_en_almacen: Option<String>,
    pub activo: bool,
}

impl ProductoRow {
    pub fn into_record(self) -> Result<SaleRecord, StoreError> {
        let stock_quantity =
            u32::try_from(self.cantidad_en_stock).map_err(|_| StoreError::InvalidRecord {
                product_id: self.product_id,
                reason: format!("negative stock quantity {}", self.cantidad_en_stock),
            })?;
        Ok(SaleRecord {
            product_id: self.product_id,
            name: self.nombre,
            description: self.descripcion.unwrap_or_default(),
            category: self.categoria.unwrap_or_default(),
            unit_price: self.precio,
            stock_quantity,
            intake_date: self.fecha_de_ingreso,
            sale_date: self.fecha_de_venta,
            supplier: self.proveedor.unwrap_or_default(),
            storage_location: self.ubicacion_en_almacen.unwrap_or_default(),
            active: self.activo,
        })
    }
}

/// A lazily opened connection. `open` on an open connection and `close` on a
/// closed one are no-ops; dropping an open connection closes its socket.
pub struct SalesConnection {
    connection_string: String,
    conn: Option<PgConnection>,
}

impl SalesConnection {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            conn: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub async fn open(&mut self) -> Result<&mut PgConnection, StoreError> {
        if self.conn.is_none() {
            let conn = PgConnection::connect(&self.connection_string)
                .await
                .map_err(|e| StoreError::Connect(e.to_string()))?;
            debug!("Opened database connection");
            self.conn = Some(conn);
        }
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::Connect("connection unavailable after open".to_string()))
    }

    pub async fn close(&mut self) -> Result<(), StoreError> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| StoreError::Connect(e.to_string()))?;
            debug!("Closed database connection");
        }
        Ok(())
    }

    /// Sales inside `period`, in the order the database returns them.
    pub async fn fetch_sales(&mut self, period: &ReportPeriod) -> Result<Vec<SaleRecord>, StoreError> {
        let conn = self.open().await?;
        let mut rows = sqlx::query_as::<_, ProductoRow>(SALES_QUERY)
            .bind(period.start_iso())
            .bind(period.end_iso())
            .fetch(&mut *conn);

        let mut records = Vec::new();
        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            records.push(row.into_record()?);
        }
        Ok(records)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PgRecordStore;

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn fetch_sales(
        &self,
        connection_string: &str,
        period: &ReportPeriod,
    ) -> Result<Vec<SaleRecord>, StoreError> {
        let mut connection = SalesConnection::new(connection_string);
        let result = connection.fetch_sales(period).await;
        if let Err(e) = connection.close().await {
            warn!(error = %e, "Closing the database connection failed");
        }

        let records = result?;
        info!(
            records = records.len(),
            start = %period.start_iso(),
            end = %period.end_iso(),
            "Fetched sales from Postgres"
        );
        Ok(records)
    }
}
