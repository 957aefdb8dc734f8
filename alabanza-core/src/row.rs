//! Backend-neutral statement parameters and result rows

use serde::Serialize;
use sqlx::any::AnyRow;
use sqlx::{Column, Row as _, ValueRef};

/// A single bound parameter or column value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// One result row: column names mapped to values, in select-list order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    /// Text column; `NULL` and absent columns are `None`
    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn into_columns(self) -> Vec<(String, Value)> {
        self.columns
    }

    /// Materialize a driver row, keeping column declaration order.
    pub(crate) fn from_any(row: &AnyRow) -> Result<Self, sqlx::Error> {
        let columns = row
            .columns()
            .iter()
            .map(|col| Ok((col.name().to_owned(), decode_column(row, col.ordinal())?)))
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(Self { columns })
    }
}

// The Any driver reports a column kind per value; trying the decoders from
// narrowest to widest lets a single code path serve SQLite and Postgres.
fn decode_column(row: &AnyRow, idx: usize) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(Value::Null);
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Ok(Value::Integer(v));
    }
    if let Ok(v) = row.try_get::<i32, _>(idx) {
        return Ok(Value::Integer(i64::from(v)));
    }
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return Ok(Value::Real(v));
    }
    if let Ok(v) = row.try_get::<bool, _>(idx) {
        return Ok(Value::Bool(v));
    }
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return Ok(Value::Text(v));
    }
    let bytes: Vec<u8> = row.try_get(idx)?;
    Ok(Value::Text(String::from_utf8_lossy(&bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row::new(vec![
            ("id".into(), Value::Integer(3)),
            ("name".into(), Value::from("Amazing Grace")),
            ("lyrics".into(), Value::Null),
        ])
    }

    #[test]
    fn lookup_by_name() {
        let row = sample();
        assert_eq!(row.i64("id"), Some(3));
        assert_eq!(row.text("name"), Some("Amazing Grace"));
        assert_eq!(row.text("lyrics"), None);
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn preserves_column_order() {
        let names: Vec<_> = sample().column_names().map(str::to_owned).collect();
        assert_eq!(names, ["id", "name", "lyrics"]);
    }

    #[test]
    fn option_converts_to_null() {
        assert!(Value::from(None::<String>).is_null());
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn serializes_as_plain_json() {
        let json = serde_json::to_value(Value::Integer(5)).unwrap();
        assert_eq!(json, serde_json::json!(5));
    }
}
