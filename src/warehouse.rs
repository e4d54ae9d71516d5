#![forbid(unsafe_code)]

//! Bulk loads [`Table`]s into a libsql database.
//!
//! A destination is addressed as `dataset.table` and stored under that exact
//! (quoted) name, so several datasets can live in one database file or one
//! remote libsql instance. Every load runs inside one transaction and only
//! returns once it has been committed.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use libsql::params::Params;
use libsql::{Builder, Connection, Value as SqlValue, params};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::table::Table;

/// What happens to rows already present in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Drop and recreate the destination before inserting.
    #[default]
    Truncate,
    /// Create the destination if needed and add rows to it.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Real,
    Boolean,
    Text,
}

impl FieldType {
    fn sql(self) -> &'static str {
        match self {
            FieldType::Integer => "INTEGER",
            FieldType::Real => "REAL",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub field_type: FieldType,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Load settings. Explicit schema fields override the detected type of the
/// column with the same name (compared case-insensitively); fields the table
/// lacks are created and left null.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub write_mode: WriteMode,
    pub schema: Option<Vec<SchemaField>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub dataset: String,
    pub table: String,
}

impl Destination {
    pub fn new(dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    fn quoted(&self) -> String {
        quote_identifier(&self.to_string())
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

impl FromStr for Destination {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().split_once('.') {
            Some((dataset, table))
                if !dataset.is_empty() && !table.is_empty() && !table.contains('.') =>
            {
                Ok(Self::new(dataset, table))
            }
            _ => Err(PipelineError::InvalidInput(format!(
                "destination must look like dataset.table, got '{value}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub destination: Destination,
    pub rows: usize,
    pub columns: usize,
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Handle on the warehouse database.
pub struct Warehouse {
    conn: Connection,
}

impl Warehouse {
    /// Opens `target` as a remote database when it carries a
    /// `libsql://`, `http://` or `https://` scheme, otherwise as a local file.
    pub async fn open(target: &str, auth_token: Option<&str>) -> Result<Self> {
        if is_remote(target) {
            Self::open_remote(target, auth_token.unwrap_or_default()).await
        } else {
            Self::open_local(Path::new(target)).await
        }
    }

    pub async fn open_local(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )
        .await?;
        Ok(Self { conn })
    }

    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self> {
        let db = Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await?;
        let conn = db.connect()?;
        Ok(Self { conn })
    }

    /// Writes every row of `table` to `destination`.
    pub async fn load_table(
        &self,
        table: &Table,
        destination: &Destination,
        options: &LoadOptions,
    ) -> Result<LoadSummary> {
        let fields = resolve_schema(table, options.schema.as_deref())?;
        let target = destination.quoted();
        if fields.is_empty() {
            if options.write_mode == WriteMode::Truncate {
                let tx = self.conn.transaction().await?;
                tx.execute(&format!("DROP TABLE IF EXISTS {target}"), params![])
                    .await?;
                tx.commit().await?;
                warn!(%destination, "no columns and no schema: destination dropped, nothing loaded");
            } else {
                warn!(%destination, "nothing to load: table has no columns and no schema");
            }
            return Ok(LoadSummary {
                destination: destination.clone(),
                rows: 0,
                columns: 0,
            });
        }

        let column_defs: Vec<String> = fields
            .iter()
            .map(|field| format!("{} {}", quote_identifier(&field.name), field.field_type.sql()))
            .collect();
        let column_list: Vec<String> = fields
            .iter()
            .map(|field| quote_identifier(&field.name))
            .collect();
        let placeholders: Vec<String> = (1..=fields.len()).map(|n| format!("?{n}")).collect();
        let insert_sql = format!(
            "INSERT INTO {target} ({}) VALUES ({})",
            column_list.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction().await?;
        if options.write_mode == WriteMode::Truncate {
            tx.execute(&format!("DROP TABLE IF EXISTS {target}"), params![])
                .await?;
        }
        tx.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {target} ({})",
                column_defs.join(", ")
            ),
            params![],
        )
        .await?;

        let positions: Vec<Option<usize>> = fields
            .iter()
            .map(|field| table.column_index(&field.name))
            .collect();
        for row in table.rows() {
            let cells: Vec<&Value> = row.iter().collect();
            let values: Vec<SqlValue> = fields
                .iter()
                .zip(&positions)
                .map(|(field, position)| {
                    let cell = position.and_then(|p| cells.get(p).copied());
                    to_sql_value(cell.unwrap_or(&Value::Null), field.field_type)
                })
                .collect();
            tx.execute(&insert_sql, Params::Positional(values)).await?;
        }
        tx.commit().await?;

        let summary = LoadSummary {
            destination: destination.clone(),
            rows: table.len(),
            columns: fields.len(),
        };
        info!(
            "Loaded {} rows and {} columns to {}",
            summary.rows, summary.columns, destination
        );
        Ok(summary)
    }

    pub async fn row_count(&self, destination: &Destination) -> Result<i64> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT COUNT(*) FROM {}", destination.quoted()),
                params![],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    /// Column names and declared types, in table order.
    #[cfg(test)]
    async fn columns(&self, destination: &Destination) -> Result<Vec<(String, String)>> {
        let mut rows = self
            .conn
            .query(
                &format!("PRAGMA table_info({})", destination.quoted()),
                params![],
            )
            .await?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next().await? {
            columns.push((row.get::<String>(1)?, row.get::<String>(2)?));
        }
        Ok(columns)
    }

    #[cfg(test)]
    fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn is_remote(target: &str) -> bool {
    ["libsql://", "http://", "https://"]
        .iter()
        .any(|scheme| target.starts_with(scheme))
}

/// Table columns with detected (or overridden) types, then schema-only fields.
/// Names compare case-insensitively, the way SQL identifiers do.
fn resolve_schema(table: &Table, explicit: Option<&[SchemaField]>) -> Result<Vec<SchemaField>> {
    let explicit = explicit.unwrap_or_default();
    for (position, field) in explicit.iter().enumerate() {
        if explicit[..position]
            .iter()
            .any(|earlier| earlier.name.eq_ignore_ascii_case(&field.name))
        {
            return Err(PipelineError::InvalidInput(format!(
                "schema lists column '{}' more than once",
                field.name
            )));
        }
    }

    let mut fields: Vec<SchemaField> = table
        .columns()
        .iter()
        .map(|column| {
            let field_type = explicit
                .iter()
                .find(|field| field.name.eq_ignore_ascii_case(column))
                .map(|field| field.field_type)
                .unwrap_or_else(|| detect_type(table.column_values(column)));
            SchemaField::new(column.clone(), field_type)
        })
        .collect();
    for field in explicit {
        let in_table = table
            .columns()
            .iter()
            .any(|column| column.eq_ignore_ascii_case(&field.name));
        if !in_table {
            fields.push(field.clone());
        }
    }
    Ok(fields)
}

fn detect_type(values: Vec<&Value>) -> FieldType {
    let mut detected: Option<FieldType> = None;
    for value in values {
        let current = match value {
            Value::Null => continue,
            Value::Bool(_) => FieldType::Boolean,
            Value::Number(number) if number.is_i64() => FieldType::Integer,
            Value::Number(_) => FieldType::Real,
            Value::String(_) | Value::Array(_) | Value::Object(_) => return FieldType::Text,
        };
        detected = Some(match (detected, current) {
            (None, current) => current,
            (Some(previous), current) if previous == current => current,
            (Some(FieldType::Integer), FieldType::Real)
            | (Some(FieldType::Real), FieldType::Integer) => FieldType::Real,
            _ => return FieldType::Text,
        });
    }
    detected.unwrap_or(FieldType::Text)
}

fn to_sql_value(value: &Value, field_type: FieldType) -> SqlValue {
    match (value, field_type) {
        (Value::Null, _) => SqlValue::Null,
        (Value::Bool(flag), FieldType::Text) => SqlValue::Text(flag.to_string()),
        (Value::Bool(flag), _) => SqlValue::Integer(i64::from(*flag)),
        (Value::Number(number), FieldType::Text) => SqlValue::Text(number.to_string()),
        (Value::Number(number), _) => match number.as_i64() {
            Some(int) if field_type != FieldType::Real => SqlValue::Integer(int),
            _ => number
                .as_f64()
                .map(SqlValue::Real)
                .unwrap_or_else(|| SqlValue::Text(number.to_string())),
        },
        (Value::String(text), FieldType::Integer) => text
            .trim()
            .parse::<i64>()
            .map(SqlValue::Integer)
            .unwrap_or_else(|_| SqlValue::Text(text.clone())),
        (Value::String(text), FieldType::Real) => text
            .trim()
            .parse::<f64>()
            .map(SqlValue::Real)
            .unwrap_or_else(|_| SqlValue::Text(text.clone())),
        (Value::String(text), FieldType::Boolean) => match text.trim() {
            "true" => SqlValue::Integer(1),
            "false" => SqlValue::Integer(0),
            _ => SqlValue::Text(text.clone()),
        },
        (Value::String(text), FieldType::Text) => SqlValue::Text(text.clone()),
        (nested @ (Value::Array(_) | Value::Object(_)), _) => SqlValue::Text(nested.to_string()),
    }
}
