//! Type-aware parameter binding.
//!
//! Maps a column's declared SQL type name to a [`BindingType`] and coerces
//! application-level values (typically strings from a form payload) into
//! the exact scalar the driver must send. Coercion never fails: values that
//! cannot be represented in the target type bind as NULL.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as Json;
use tracing::warn;
use uuid::Uuid;

use crate::core::value::Value;

/// Inline text parameters above this length bind as the large-text variant,
/// since the driver caps ordinary (n)varchar parameters at 4000 characters.
pub const LARGE_TEXT_THRESHOLD: usize = 4000;

/// The scalar category a parameter is tagged with when sent to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Real,
    Decimal,
    Date,
    DateTime,
    DateTime2,
    SmallDateTime,
    DateTimeOffset,
    Time,
    Guid,
    Xml,
    Char,
    NChar,
    VarChar,
    NVarChar,
    VarCharMax,
    NVarCharMax,
    Binary,
    VarBinary,
    Image,
}

impl BindingType {
    /// Resolve a declared SQL type name to a binding type.
    ///
    /// Exact-name checks are evaluated before the generic substring checks
    /// so that `bigint`/`smallint`/`tinyint` never fall into the generic
    /// "int" match, and `datetime2`/`datetimeoffset`/`smalldatetime` never
    /// fall into the generic "date" match. Unrecognized names default to
    /// `NVarChar` with a warning; resolution never fails.
    #[must_use]
    pub fn resolve(data_type: &str) -> BindingType {
        let t = data_type.trim().to_ascii_lowercase();

        match t.as_str() {
            "bit" => return BindingType::Bit,
            "bigint" => return BindingType::BigInt,
            "smallint" => return BindingType::SmallInt,
            "tinyint" => return BindingType::TinyInt,
            "float" => return BindingType::Float,
            "real" => return BindingType::Real,
            "decimal" | "numeric" | "money" | "smallmoney" => return BindingType::Decimal,
            "date" => return BindingType::Date,
            "datetime2" => return BindingType::DateTime2,
            "datetimeoffset" => return BindingType::DateTimeOffset,
            "smalldatetime" => return BindingType::SmallDateTime,
            "uniqueidentifier" => return BindingType::Guid,
            "xml" => return BindingType::Xml,
            "char" => return BindingType::Char,
            "nchar" => return BindingType::NChar,
            "binary" => return BindingType::Binary,
            "image" => return BindingType::Image,
            _ => {}
        }

        if t.contains("char") || t.contains("text") {
            let unicode = t.starts_with('n');
            let large = t.contains("max") || t.contains("text");
            return match (unicode, large) {
                (true, true) => BindingType::NVarCharMax,
                (true, false) => BindingType::NVarChar,
                (false, true) => BindingType::VarCharMax,
                (false, false) => BindingType::VarChar,
            };
        }
        if t.contains("int") {
            return BindingType::Int;
        }
        if t.contains("date") {
            return BindingType::DateTime;
        }
        if t.contains("time") {
            return BindingType::Time;
        }
        if t.contains("binary") {
            return BindingType::VarBinary;
        }

        warn!("Unrecognized data type '{}', binding as nvarchar", data_type);
        BindingType::NVarChar
    }

    /// The large-text variant of a text binding; other bindings are
    /// returned unchanged.
    #[must_use]
    pub fn large_text(self) -> BindingType {
        match self {
            BindingType::Char | BindingType::VarChar => BindingType::VarCharMax,
            BindingType::NChar | BindingType::NVarChar => BindingType::NVarCharMax,
            other => other,
        }
    }

    fn is_text(self) -> bool {
        matches!(
            self,
            BindingType::Char
                | BindingType::NChar
                | BindingType::VarChar
                | BindingType::NVarChar
                | BindingType::VarCharMax
                | BindingType::NVarCharMax
                | BindingType::Xml
        )
    }
}

/// A positional value paired with its resolved binding type.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBinding {
    pub value: Value,
    pub ty: BindingType,
}

impl ParamBinding {
    /// A typed NULL binding. The binding type is preserved so the driver
    /// does not mis-infer the parameter type.
    #[must_use]
    pub fn null(ty: BindingType) -> Self {
        ParamBinding {
            value: Value::Null,
            ty,
        }
    }

    #[must_use]
    pub fn new(value: Value, ty: BindingType) -> Self {
        ParamBinding { value, ty }
    }

    /// Bind this parameter into a query, positionally. NULLs bind as a
    /// typed `Option::<T>::None` matching the resolved binding type.
    pub fn apply<'a>(&'a self, query: &mut tiberius::Query<'a>) {
        match &self.value {
            Value::Null => match self.ty {
                BindingType::Bit => query.bind(Option::<bool>::None),
                BindingType::TinyInt => query.bind(Option::<u8>::None),
                BindingType::SmallInt => query.bind(Option::<i16>::None),
                BindingType::Int => query.bind(Option::<i32>::None),
                BindingType::BigInt => query.bind(Option::<i64>::None),
                BindingType::Real => query.bind(Option::<f32>::None),
                BindingType::Float => query.bind(Option::<f64>::None),
                BindingType::Decimal => query.bind(Option::<tiberius::numeric::Numeric>::None),
                BindingType::Date => query.bind(Option::<NaiveDate>::None),
                BindingType::Time => query.bind(Option::<NaiveTime>::None),
                BindingType::DateTime
                | BindingType::DateTime2
                | BindingType::SmallDateTime => query.bind(Option::<NaiveDateTime>::None),
                BindingType::DateTimeOffset => query.bind(Option::<DateTime<Utc>>::None),
                BindingType::Guid => query.bind(Option::<Uuid>::None),
                BindingType::Binary | BindingType::VarBinary | BindingType::Image => {
                    query.bind(Option::<Vec<u8>>::None)
                }
                _ => query.bind(Option::<String>::None),
            },
            Value::Bool(v) => query.bind(*v),
            Value::U8(v) => query.bind(*v),
            Value::I16(v) => query.bind(*v),
            Value::I32(v) => query.bind(*v),
            Value::I64(v) => query.bind(*v),
            Value::F32(v) => query.bind(*v),
            Value::F64(v) => query.bind(*v),
            Value::String(v) => query.bind(v.as_str()),
            Value::Bytes(v) => query.bind(v.as_slice()),
            Value::Uuid(v) => query.bind(*v),
            Value::Decimal(v) => query.bind(decimal_to_numeric(v)),
            Value::DateTime(v) => query.bind(*v),
            Value::DateTimeOffset(v) => query.bind(v.with_timezone(&Utc)),
            Value::Date(v) => query.bind(*v),
            Value::Time(v) => query.bind(*v),
        }
    }
}

/// Convert an application-level value into a correctly-typed parameter.
///
/// Input is JSON-shaped (form payloads arrive that way); values that cannot
/// be represented bind as NULL rather than failing.
#[must_use]
pub fn coerce_value(value: &Json, ty: BindingType, raw_type: &str) -> ParamBinding {
    if value.is_null() {
        return ParamBinding::null(ty);
    }

    match ty {
        BindingType::Bit => ParamBinding::new(Value::Bool(coerce_bool(value)), ty),
        BindingType::TinyInt => match coerce_i64(value) {
            Some(n) => match u8::try_from(n) {
                Ok(v) => ParamBinding::new(Value::U8(v), ty),
                Err(_) => ParamBinding::null(ty),
            },
            None => ParamBinding::null(ty),
        },
        BindingType::SmallInt => match coerce_i64(value) {
            Some(n) => match i16::try_from(n) {
                Ok(v) => ParamBinding::new(Value::I16(v), ty),
                Err(_) => ParamBinding::null(ty),
            },
            None => ParamBinding::null(ty),
        },
        BindingType::Int => match coerce_i64(value) {
            Some(n) => match i32::try_from(n) {
                Ok(v) => ParamBinding::new(Value::I32(v), ty),
                Err(_) => ParamBinding::null(ty),
            },
            None => ParamBinding::null(ty),
        },
        BindingType::BigInt => match coerce_i64(value) {
            Some(n) => ParamBinding::new(Value::I64(n), ty),
            None => ParamBinding::null(ty),
        },
        BindingType::Real => match coerce_f64(value) {
            Some(f) => ParamBinding::new(Value::F32(f as f32), ty),
            None => ParamBinding::null(ty),
        },
        BindingType::Float => match coerce_f64(value) {
            Some(f) => ParamBinding::new(Value::F64(f), ty),
            None => ParamBinding::null(ty),
        },
        BindingType::Decimal => match coerce_decimal(value) {
            Some(d) => ParamBinding::new(Value::Decimal(d), ty),
            None => ParamBinding::null(ty),
        },
        BindingType::Guid => match value.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok()) {
            Some(u) => ParamBinding::new(Value::Uuid(u), ty),
            None => ParamBinding::null(ty),
        },
        BindingType::Date => match value.as_str().and_then(parse_date) {
            Some(d) => ParamBinding::new(Value::Date(d), ty),
            None => ParamBinding::null(ty),
        },
        BindingType::Time => match value.as_str().and_then(parse_time) {
            Some(t) => ParamBinding::new(Value::Time(t), ty),
            None => ParamBinding::null(ty),
        },
        BindingType::DateTime | BindingType::DateTime2 | BindingType::SmallDateTime => {
            match value.as_str().and_then(parse_datetime) {
                Some(dt) => ParamBinding::new(Value::DateTime(dt), ty),
                None => ParamBinding::null(ty),
            }
        }
        BindingType::DateTimeOffset => {
            match value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            {
                Some(dt) => ParamBinding::new(Value::DateTimeOffset(dt), ty),
                None => ParamBinding::null(ty),
            }
        }
        BindingType::Binary | BindingType::VarBinary | BindingType::Image => {
            match value.as_str().and_then(decode_data_uri) {
                Some(bytes) => ParamBinding::new(Value::Bytes(bytes), ty),
                None => {
                    // Unsupported binary input is dropped, not rejected.
                    warn!(
                        "Dropping non-data-URI value for {} column, binding NULL",
                        raw_type
                    );
                    ParamBinding::null(ty)
                }
            }
        }
        _ => {
            let text = match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
            let ty = if ty.is_text() && text.chars().count() > LARGE_TEXT_THRESHOLD {
                ty.large_text()
            } else {
                ty
            };
            ParamBinding::new(Value::String(text), ty)
        }
    }
}

fn coerce_bool(value: &Json) -> bool {
    match value {
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Json::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            other => !other.is_empty(),
        },
        Json::Null => false,
        _ => true,
    }
}

fn coerce_i64(value: &Json) -> Option<i64> {
    match value {
        Json::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Json::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

fn coerce_f64(value: &Json) -> Option<f64> {
    match value {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn coerce_decimal(value: &Json) -> Option<Decimal> {
    match value {
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(|f| Decimal::try_from(f).ok())
            }
        }
        Json::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.date()))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveTime::parse_from_str(s, "%H:%M").ok())
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Convert a [`Decimal`] to the driver's `Numeric` parameter type.
///
/// tiberius 0.12 implements only by-reference `ToSql` for `Decimal`, but
/// `Query::bind` takes parameters by value (`IntoSql`), so the same
/// conversion its `ToSql` impl performs is applied here before binding.
fn decimal_to_numeric(d: &Decimal) -> tiberius::numeric::Numeric {
    let unpacked = d.unpack();
    let mut value = (((unpacked.hi as u128) << 64)
        + ((unpacked.mid as u128) << 32)
        + unpacked.lo as u128) as i128;
    if d.is_sign_negative() {
        value = -value;
    }
    tiberius::numeric::Numeric::new_with_scale(value, d.scale() as u8)
}

/// Decode a `data:<mime>;base64,<payload>` URI into raw bytes.
fn decode_data_uri(s: &str) -> Option<Vec<u8>> {
    let rest = s.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(";base64,")?;
    BASE64.decode(payload.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_exact_before_substring() {
        assert_eq!(BindingType::resolve("bigint"), BindingType::BigInt);
        assert_eq!(BindingType::resolve("smallint"), BindingType::SmallInt);
        assert_eq!(BindingType::resolve("tinyint"), BindingType::TinyInt);
        assert_eq!(BindingType::resolve("int"), BindingType::Int);
        assert_ne!(BindingType::resolve("bigint"), BindingType::resolve("int"));
    }

    #[test]
    fn test_resolve_text_variants() {
        assert_eq!(BindingType::resolve("varchar"), BindingType::VarChar);
        assert_eq!(BindingType::resolve("nvarchar"), BindingType::NVarChar);
        assert_ne!(
            BindingType::resolve("nvarchar"),
            BindingType::resolve("varchar")
        );
        assert_eq!(BindingType::resolve("nvarchar(max)"), BindingType::NVarCharMax);
        assert_eq!(BindingType::resolve("varchar(max)"), BindingType::VarCharMax);
        assert_eq!(BindingType::resolve("text"), BindingType::VarCharMax);
        assert_eq!(BindingType::resolve("ntext"), BindingType::NVarCharMax);
        assert_eq!(BindingType::resolve("char"), BindingType::Char);
        assert_eq!(BindingType::resolve("nchar"), BindingType::NChar);
    }

    #[test]
    fn test_resolve_date_variants() {
        assert_eq!(BindingType::resolve("date"), BindingType::Date);
        assert_eq!(BindingType::resolve("datetime"), BindingType::DateTime);
        assert_eq!(BindingType::resolve("datetime2"), BindingType::DateTime2);
        assert_eq!(
            BindingType::resolve("datetimeoffset"),
            BindingType::DateTimeOffset
        );
        assert_eq!(
            BindingType::resolve("smalldatetime"),
            BindingType::SmallDateTime
        );
        assert_eq!(BindingType::resolve("time"), BindingType::Time);
    }

    #[test]
    fn test_resolve_misc() {
        assert_eq!(BindingType::resolve("bit"), BindingType::Bit);
        assert_eq!(BindingType::resolve("float"), BindingType::Float);
        assert_eq!(BindingType::resolve("real"), BindingType::Real);
        assert_eq!(BindingType::resolve("money"), BindingType::Decimal);
        assert_eq!(BindingType::resolve("uniqueidentifier"), BindingType::Guid);
        assert_eq!(BindingType::resolve("xml"), BindingType::Xml);
        assert_eq!(BindingType::resolve("image"), BindingType::Image);
        assert_eq!(BindingType::resolve("varbinary"), BindingType::VarBinary);
        assert_eq!(BindingType::resolve("binary"), BindingType::Binary);
    }

    #[test]
    fn test_resolve_unknown_defaults_to_nvarchar() {
        assert_eq!(BindingType::resolve("sql_variant"), BindingType::NVarChar);
        assert_eq!(BindingType::resolve("geography"), BindingType::NVarChar);
    }

    #[test]
    fn test_coerce_bool_strings() {
        let b = coerce_value(&json!("true"), BindingType::Bit, "bit");
        assert_eq!(b.value, Value::Bool(true));
        let b = coerce_value(&json!("false"), BindingType::Bit, "bit");
        assert_eq!(b.value, Value::Bool(false));
        let b = coerce_value(&json!(""), BindingType::Bit, "bit");
        assert_eq!(b.value, Value::Bool(false));
        let b = coerce_value(&json!("yes"), BindingType::Bit, "bit");
        assert_eq!(b.value, Value::Bool(true));
        let b = coerce_value(&json!(0), BindingType::Bit, "bit");
        assert_eq!(b.value, Value::Bool(false));
    }

    #[test]
    fn test_coerce_unparsable_number_binds_null() {
        let b = coerce_value(&json!("not-a-number"), BindingType::Int, "int");
        assert!(b.value.is_null());
        assert_eq!(b.ty, BindingType::Int);

        let b = coerce_value(&json!("abc"), BindingType::Float, "float");
        assert!(b.value.is_null());
    }

    #[test]
    fn test_coerce_numeric_strings() {
        let b = coerce_value(&json!("42"), BindingType::Int, "int");
        assert_eq!(b.value, Value::I32(42));
        let b = coerce_value(&json!("42.5"), BindingType::Float, "float");
        assert_eq!(b.value, Value::F64(42.5));
        let b = coerce_value(&json!("19.99"), BindingType::Decimal, "money");
        assert_eq!(b.value, Value::Decimal("19.99".parse().unwrap()));
        let b = coerce_value(&json!("9000000000"), BindingType::BigInt, "bigint");
        assert_eq!(b.value, Value::I64(9_000_000_000));
    }

    #[test]
    fn test_coerce_int_overflow_binds_null() {
        let b = coerce_value(&json!(300), BindingType::TinyInt, "tinyint");
        assert!(b.value.is_null());
    }

    #[test]
    fn test_coerce_null_preserves_type() {
        let b = coerce_value(&Json::Null, BindingType::BigInt, "bigint");
        assert!(b.value.is_null());
        assert_eq!(b.ty, BindingType::BigInt);
    }

    #[test]
    fn test_coerce_data_uri() {
        let b = coerce_value(
            &json!("data:image/png;base64,AQID"),
            BindingType::VarBinary,
            "varbinary",
        );
        assert_eq!(b.value, Value::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn test_coerce_invalid_binary_dropped_to_null() {
        let b = coerce_value(&json!("hello"), BindingType::VarBinary, "varbinary");
        assert!(b.value.is_null());
        let b = coerce_value(&json!("data:text/plain,hi"), BindingType::Image, "image");
        assert!(b.value.is_null());
    }

    #[test]
    fn test_coerce_long_text_upgrades_to_large() {
        let long = "x".repeat(LARGE_TEXT_THRESHOLD + 1);
        let b = coerce_value(&json!(long), BindingType::NVarChar, "nvarchar");
        assert_eq!(b.ty, BindingType::NVarCharMax);

        let short = "x".repeat(10);
        let b = coerce_value(&json!(short), BindingType::NVarChar, "nvarchar");
        assert_eq!(b.ty, BindingType::NVarChar);
    }

    #[test]
    fn test_coerce_guid() {
        let b = coerce_value(
            &json!("00000000-0000-0000-0000-000000000000"),
            BindingType::Guid,
            "uniqueidentifier",
        );
        assert_eq!(b.value, Value::Uuid(Uuid::nil()));
        let b = coerce_value(&json!("not-a-guid"), BindingType::Guid, "uniqueidentifier");
        assert!(b.value.is_null());
    }

    #[test]
    fn test_coerce_temporal() {
        let b = coerce_value(&json!("2024-03-01"), BindingType::Date, "date");
        assert_eq!(
            b.value,
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );

        let b = coerce_value(
            &json!("2024-03-01T10:30:00"),
            BindingType::DateTime2,
            "datetime2",
        );
        assert!(matches!(b.value, Value::DateTime(_)));

        let b = coerce_value(&json!("10:30:00"), BindingType::Time, "time");
        assert!(matches!(b.value, Value::Time(_)));

        let b = coerce_value(&json!("yesterday"), BindingType::DateTime, "datetime");
        assert!(b.value.is_null());
    }

    #[test]
    fn test_coerce_non_string_stringifies_for_text() {
        let b = coerce_value(&json!(42), BindingType::NVarChar, "nvarchar");
        assert_eq!(b.value, Value::String("42".to_string()));
    }
}
