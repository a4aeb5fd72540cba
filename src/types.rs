use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::SqlModelError;

/// Values that can be stored in a database row or used as query parameters.
///
/// Model field values are pushed as `RowValues` in declaration order:
/// ```rust
/// use sql_model::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            RowValues::Blob(bytes) => Some(bytes),
            RowValues::Text(text) => Some(text.as_bytes()),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RowValues::Int(_) => "integer",
            RowValues::Float(_) => "float",
            RowValues::Text(_) => "text",
            RowValues::Bool(_) => "bool",
            RowValues::Timestamp(_) => "timestamp",
            RowValues::Null => "NULL",
            RowValues::JSON(_) => "json",
            RowValues::Blob(_) => "blob",
        }
    }
}

fn mismatch(expected: &str, got: &RowValues) -> SqlModelError {
    SqlModelError::ConversionError(format!("cannot scan {} into {expected}", got.kind()))
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for RowValues {
                fn from(value: $t) -> Self {
                    RowValues::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i64, i32, i16, i8, u32, u16, u8);

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<f32> for RowValues {
    fn from(value: f32) -> Self {
        RowValues::Float(f64::from(value))
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// A mutable destination for one column of a scanned row.
///
/// Models hand out `&mut dyn ScanTarget` for their fields; stores do the same
/// for the slot at the current row index.
pub trait ScanTarget {
    /// Overwrite the target with a decoded column value.
    ///
    /// # Errors
    /// Returns [`SqlModelError::ConversionError`] when the value does not fit the target type.
    fn set_value(&mut self, value: RowValues) -> Result<(), SqlModelError>;
}

macro_rules! impl_scan_int {
    ($($t:ty),*) => {
        $(
            impl ScanTarget for $t {
                fn set_value(&mut self, value: RowValues) -> Result<(), SqlModelError> {
                    let raw = match &value {
                        RowValues::Int(i) => *i,
                        RowValues::Bool(b) => i64::from(*b),
                        other => return Err(mismatch(stringify!($t), other)),
                    };
                    *self = <$t>::try_from(raw).map_err(|_| {
                        SqlModelError::ConversionError(format!(
                            "integer {raw} out of range for {}",
                            stringify!($t)
                        ))
                    })?;
                    Ok(())
                }
            }
        )*
    };
}

impl_scan_int!(i64, i32, i16, i8, u64, u32, u16, u8, usize);

impl ScanTarget for f64 {
    fn set_value(&mut self, value: RowValues) -> Result<(), SqlModelError> {
        *self = value.as_float().ok_or_else(|| mismatch("f64", &value))?;
        Ok(())
    }
}

impl ScanTarget for bool {
    fn set_value(&mut self, value: RowValues) -> Result<(), SqlModelError> {
        *self = *value.as_bool().ok_or_else(|| mismatch("bool", &value))?;
        Ok(())
    }
}

impl ScanTarget for String {
    fn set_value(&mut self, value: RowValues) -> Result<(), SqlModelError> {
        match value {
            RowValues::Text(text) => *self = text,
            RowValues::Int(i) => *self = i.to_string(),
            RowValues::Float(f) => *self = f.to_string(),
            other => return Err(mismatch("String", &other)),
        }
        Ok(())
    }
}

impl ScanTarget for Vec<u8> {
    fn set_value(&mut self, value: RowValues) -> Result<(), SqlModelError> {
        match value {
            RowValues::Blob(bytes) => *self = bytes,
            RowValues::Text(text) => *self = text.into_bytes(),
            other => return Err(mismatch("Vec<u8>", &other)),
        }
        Ok(())
    }
}

impl ScanTarget for NaiveDateTime {
    fn set_value(&mut self, value: RowValues) -> Result<(), SqlModelError> {
        *self = value
            .as_timestamp()
            .ok_or_else(|| mismatch("NaiveDateTime", &value))?;
        Ok(())
    }
}

impl ScanTarget for JsonValue {
    fn set_value(&mut self, value: RowValues) -> Result<(), SqlModelError> {
        *self = match value {
            RowValues::JSON(json) => json,
            RowValues::Text(text) => serde_json::from_str(&text)
                .map_err(|e| SqlModelError::ConversionError(format!("invalid json: {e}")))?,
            RowValues::Null => JsonValue::Null,
            other => return Err(mismatch("json", &other)),
        };
        Ok(())
    }
}

impl ScanTarget for RowValues {
    fn set_value(&mut self, value: RowValues) -> Result<(), SqlModelError> {
        *self = value;
        Ok(())
    }
}

impl<T: ScanTarget + Default> ScanTarget for Option<T> {
    fn set_value(&mut self, value: RowValues) -> Result<(), SqlModelError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.set_value(value)?;
        *self = Some(inner);
        Ok(())
    }
}

/// Which part of an execution result the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultType {
    /// Ignore the result, always `0`.
    Nothing,
    /// The id generated by the last insert.
    LastInsertId,
    /// The number of rows changed.
    #[default]
    RowsAffected,
}

/// Raw outcome of a DML statement as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: i64,
}

impl ExecResult {
    /// Pick the value requested by `typ`.
    #[must_use]
    pub fn resolve(&self, typ: ResultType) -> i64 {
        match typ {
            ResultType::Nothing => 0,
            ResultType::LastInsertId => self.last_insert_id,
            ResultType::RowsAffected => i64::try_from(self.rows_affected).unwrap_or(i64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_option_and_null() {
        let mut age: Option<i32> = Some(3);
        age.set_value(RowValues::Null).unwrap();
        assert_eq!(age, None);
        age.set_value(RowValues::Int(42)).unwrap();
        assert_eq!(age, Some(42));
    }

    #[test]
    fn rejects_out_of_range_integers() {
        let mut small: u8 = 0;
        let err = small.set_value(RowValues::Int(300)).unwrap_err();
        assert!(matches!(err, SqlModelError::ConversionError(_)));
    }

    #[test]
    fn bool_accepts_sqlite_integers() {
        let mut flag = false;
        flag.set_value(RowValues::Int(1)).unwrap();
        assert!(flag);
        assert!(flag.set_value(RowValues::Int(7)).is_err());
    }

    #[test]
    fn timestamps_parse_from_text() {
        let mut ts = NaiveDateTime::default();
        ts.set_value(RowValues::Text("2024-01-02 03:04:05".into()))
            .unwrap();
        assert_eq!(ts.to_string(), "2024-01-02 03:04:05");
    }

    #[test]
    fn resolve_result_types() {
        let res = ExecResult {
            rows_affected: 2,
            last_insert_id: 9,
        };
        assert_eq!(res.resolve(ResultType::Nothing), 0);
        assert_eq!(res.resolve(ResultType::LastInsertId), 9);
        assert_eq!(res.resolve(ResultType::RowsAffected), 2);
    }
}
