//! Field contracts.
//!
//! Every field is checked in the same order: null policy, then the shape
//! check for its kind, then the semantic check. Kinds that build on another
//! kind (Email on Char, BirthDay on Date, Gender on Integer) call the base
//! checks explicitly instead of inheriting them.

use chrono::{Datelike, NaiveDate};
use scoring_shared::FieldError;
use serde_json::{Map, Value};

/// Accepted birthday formats and other dates: `day.month.year`
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Oldest accepted age, in calendar years
pub const MAX_AGE_YEARS: i32 = 70;

pub const GENDER_UNKNOWN: i64 = 0;
pub const GENDER_MALE: i64 = 1;
pub const GENDER_FEMALE: i64 = 2;
pub const GENDERS: [i64; 3] = [GENDER_UNKNOWN, GENDER_MALE, GENDER_FEMALE];

/// Phone numbers are 11 digits and start with this digit
const PHONE_PREFIX: char = '7';
const PHONE_LEN: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Char,
    Arguments,
    Email,
    Phone,
    Date,
    BirthDay,
    Integer,
    Gender,
    ClientIds,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Char => "CharField",
            FieldKind::Arguments => "ArgumentsField",
            FieldKind::Email => "EmailField",
            FieldKind::Phone => "PhoneField",
            FieldKind::Date => "DateField",
            FieldKind::BirthDay => "BirthDayField",
            FieldKind::Integer => "IntField",
            FieldKind::Gender => "GenderField",
            FieldKind::ClientIds => "ClientIDsField",
        }
    }

    fn shape(&self, raw: &Value) -> Result<(), String> {
        match self {
            FieldKind::Char | FieldKind::Email => char_shape(raw),
            FieldKind::Arguments => match raw {
                Value::Object(_) => Ok(()),
                _ => Err("value must be an object".to_string()),
            },
            _ => Ok(()),
        }
    }

    fn semantic(&self, raw: &Value, today: NaiveDate) -> Result<FieldValue, String> {
        match self {
            FieldKind::Char => Ok(FieldValue::Text(scalar_text(raw))),
            FieldKind::Arguments => match raw {
                Value::Object(map) => Ok(FieldValue::Map(map.clone())),
                _ => Err("value must be an object".to_string()),
            },
            FieldKind::Email => {
                let text = scalar_text(raw);
                if !text.contains('@') {
                    return Err(format!("'{}' is not an email address", text));
                }
                Ok(FieldValue::Text(text))
            }
            FieldKind::Phone => normalize_phone(raw).map(FieldValue::Text),
            FieldKind::Date => parse_date(raw).map(FieldValue::Date),
            FieldKind::BirthDay => {
                let date = parse_date(raw)?;
                check_age(date, today)?;
                Ok(FieldValue::Date(date))
            }
            FieldKind::Integer => to_int(raw)
                .map(FieldValue::Int)
                .ok_or_else(|| format!("{} is not an integer", raw)),
            FieldKind::Gender => {
                let value = to_int(raw).ok_or_else(|| format!("{} is not an integer", raw))?;
                if !GENDERS.contains(&value) {
                    return Err(format!("{} is not one of {:?}", value, GENDERS));
                }
                Ok(FieldValue::Int(value))
            }
            FieldKind::ClientIds => client_ids(raw).map(FieldValue::IdList),
        }
    }
}

/// Contract for one named slot of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub required: bool,
    pub nullable: bool,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Optional, nullable field of `kind`
    pub const fn new(kind: FieldKind) -> Self {
        Self {
            required: false,
            nullable: true,
            kind,
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn non_nullable(self) -> Self {
        Self {
            nullable: false,
            ..self
        }
    }

    /// Run the contract for `name` against its raw value.
    ///
    /// `None` means the key was absent; it is handled exactly like JSON null.
    pub fn validate(
        &self,
        name: &str,
        raw: Option<&Value>,
        today: NaiveDate,
    ) -> Result<FieldValue, FieldError> {
        let fail = |reason: String| FieldError::new(name, self.kind.name(), reason);

        let raw = match raw {
            None | Some(Value::Null) if self.nullable => return Ok(FieldValue::Null),
            None | Some(Value::Null) => return Err(fail("cannot be null".to_string())),
            Some(raw) => raw,
        };

        self.kind.shape(raw).map_err(fail)?;
        self.kind.semantic(raw, today).map_err(fail)
    }
}

/// A value that passed its field contract
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Int(i64),
    Date(NaiveDate),
    Map(Map<String, Value>),
    IdList(Vec<i64>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_ids(&self) -> Option<&[i64]> {
        match self {
            FieldValue::IdList(ids) => Some(ids),
            _ => None,
        }
    }
}

fn char_shape(raw: &Value) -> Result<(), String> {
    match raw {
        Value::Object(_) | Value::Array(_) => Err("value must be a string".to_string()),
        _ => Ok(()),
    }
}

fn scalar_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize_phone(raw: &Value) -> Result<String, String> {
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        _ => return Err("value must be a string or an integer".to_string()),
    };

    let stripped = text.strip_prefix('+').unwrap_or(&text);
    let digits: String = stripped
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if digits.len() != PHONE_LEN
        || !digits.chars().all(|c| c.is_ascii_digit())
        || !digits.starts_with(PHONE_PREFIX)
    {
        return Err(format!(
            "'{}' must be {} digits starting with {}",
            text, PHONE_LEN, PHONE_PREFIX
        ));
    }
    Ok(digits)
}

fn parse_date(raw: &Value) -> Result<NaiveDate, String> {
    let text = raw
        .as_str()
        .ok_or_else(|| "value must be a DD.MM.YYYY string".to_string())?;
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| format!("'{}' is not a DD.MM.YYYY date", text))
}

fn check_age(birthday: NaiveDate, today: NaiveDate) -> Result<(), String> {
    if birthday > today {
        return Err(format!("{} is in the future", birthday.format(DATE_FORMAT)));
    }
    if today.year() - birthday.year() > MAX_AGE_YEARS {
        return Err(format!(
            "{} is more than {} years back",
            birthday.format(DATE_FORMAT),
            MAX_AGE_YEARS
        ));
    }
    Ok(())
}

/// Integer conversion shared by Integer, Gender and ClientIds
fn to_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn client_ids(raw: &Value) -> Result<Vec<i64>, String> {
    let items = raw
        .as_array()
        .ok_or_else(|| "value must be a list of ids".to_string())?;
    if items.is_empty() {
        return Err("list of ids cannot be empty".to_string());
    }
    items
        .iter()
        .map(|item| to_int(item).ok_or_else(|| format!("id {} is not an integer", item)))
        .collect()
}
