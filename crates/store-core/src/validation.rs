//! # Validation Module
//!
//! Declarative request validation. A [`Schema`] is a list of [`Field`]s;
//! validating a JSON payload against it yields either the normalized payload
//! or every failure found.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One Validation Pass                                │
//! │                                                                         │
//! │  raw JSON (body, or path params + query string)                        │
//! │       │                                                                 │
//! │       ├── unknown keys?            → "\"key\" is not allowed"          │
//! │       ├── each declared field:                                         │
//! │       │     absent  → required? error : default? insert : skip         │
//! │       │     null    → nullable? keep : type error                      │
//! │       │     present → coerce type → trim/lowercase → rules             │
//! │       ├── cross-field rules        → confirmations, date ordering      │
//! │       └── object rules             → "at least one field"              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Ok(normalized map)  or  Err(ValidationErrors: every message)          │
//! │                                                                         │
//! │  Layer 2 of 3: the database still enforces NOT NULL / UNIQUE / FK      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All fields are checked in one pass; within a single field the first
//! failing rule is the one reported.
//!
//! ## Coercion
//! Path and query values always arrive as strings, so integer, number,
//! boolean and date fields accept their string spellings (`"42"`, `"true"`,
//! `"2024-05-01"`). Dates are normalized to RFC 3339.
//!
//! ## Usage
//! ```rust
//! use serde_json::json;
//! use store_core::validation::{Field, Schema};
//!
//! let schema = Schema::new("vendors.create")
//!     .field(Field::string("vendor_name").required().min_len(2).max_len(100))
//!     .field(Field::string("country").nullable().allow_empty());
//!
//! let ok = schema.validate(&json!({ "vendor_name": "  Flour Co  " })).unwrap();
//! assert_eq!(ok["vendor_name"], "Flour Co");
//!
//! let err = schema.validate(&json!({ "country": "FR" })).unwrap_err();
//! assert_eq!(err.to_string(), "Vendor name is required");
//! ```

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Number, Value};

use crate::error::{ValidationError, ValidationErrors};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationErrors>;

// =============================================================================
// Field Definitions
// =============================================================================

#[derive(Debug, Clone)]
enum Kind {
    String,
    Email,
    Integer,
    Number,
    Boolean,
    Date,
    Object(Vec<Field>),
    Array(Box<Field>),
}

impl Kind {
    fn expected(&self) -> &'static str {
        match self {
            Kind::String | Kind::Email => "a string",
            Kind::Integer => "an integer",
            Kind::Number => "a number",
            Kind::Boolean => "a boolean",
            Kind::Date => "a valid date",
            Kind::Object(_) => "an object",
            Kind::Array(_) => "an array",
        }
    }
}

/// Value inserted for an absent optional field.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    Value(Value),
    /// The current time, as an RFC 3339 string.
    Now,
}

#[derive(Debug, Clone)]
enum Rule {
    MinLength(usize),
    MaxLength(usize),
    Positive,
    NonNegative,
    Min(i64),
    Max(i64),
    Precision(u32),
    OneOf(&'static [&'static str]),
    Check(fn(&str) -> bool, &'static str),
    MinItems(usize, &'static str),
}

#[derive(Debug, Clone)]
enum CrossRule {
    Matches(&'static str, &'static str),
    NotBefore(&'static str, &'static str),
}

/// One declared key of a schema.
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    label: String,
    kind: Kind,
    required: bool,
    nullable: bool,
    allow_empty: bool,
    lowercase: bool,
    default: Option<DefaultValue>,
    rules: Vec<Rule>,
    cross: Vec<CrossRule>,
}

impl Field {
    fn new(name: &'static str, kind: Kind) -> Self {
        Field {
            name,
            label: humanize(name),
            kind,
            required: false,
            nullable: false,
            allow_empty: false,
            lowercase: false,
            default: None,
            rules: Vec::new(),
            cross: Vec::new(),
        }
    }

    /// A trimmed string.
    pub fn string(name: &'static str) -> Self {
        Field::new(name, Kind::String)
    }

    /// A trimmed, lowercased email address.
    pub fn email(name: &'static str) -> Self {
        Field::new(name, Kind::Email).lowercase()
    }

    pub fn integer(name: &'static str) -> Self {
        Field::new(name, Kind::Integer)
    }

    pub fn number(name: &'static str) -> Self {
        Field::new(name, Kind::Number)
    }

    pub fn boolean(name: &'static str) -> Self {
        Field::new(name, Kind::Boolean)
    }

    pub fn date(name: &'static str) -> Self {
        Field::new(name, Kind::Date)
    }

    /// A nested object validated against its own fields.
    pub fn object(name: &'static str, fields: Vec<Field>) -> Self {
        Field::new(name, Kind::Object(fields))
    }

    /// An array whose every element is validated by `item`.
    pub fn array(name: &'static str, item: Field) -> Self {
        Field::new(name, Kind::Array(Box::new(item)))
    }

    /// Overrides the label used in messages (default: humanized key).
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Accepts an explicit `null`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Accepts `""` for string fields.
    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn default_now(mut self) -> Self {
        self.default = Some(DefaultValue::Now);
        self
    }

    pub fn min_len(mut self, min: usize) -> Self {
        self.rules.push(Rule::MinLength(min));
        self
    }

    pub fn max_len(mut self, max: usize) -> Self {
        self.rules.push(Rule::MaxLength(max));
        self
    }

    /// Strictly greater than zero.
    pub fn positive(mut self) -> Self {
        self.rules.push(Rule::Positive);
        self
    }

    /// Zero or more.
    pub fn non_negative(mut self) -> Self {
        self.rules.push(Rule::NonNegative);
        self
    }

    pub fn min(mut self, min: i64) -> Self {
        self.rules.push(Rule::Min(min));
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.rules.push(Rule::Max(max));
        self
    }

    /// At most `places` decimal places.
    pub fn precision(mut self, places: u32) -> Self {
        self.rules.push(Rule::Precision(places));
        self
    }

    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.rules.push(Rule::OneOf(allowed));
        self
    }

    /// A predicate over the string value, reported with `message` on failure.
    pub fn check(mut self, predicate: fn(&str) -> bool, message: &'static str) -> Self {
        self.rules.push(Rule::Check(predicate, message));
        self
    }

    pub fn min_items(mut self, min: usize, message: &'static str) -> Self {
        self.rules.push(Rule::MinItems(min, message));
        self
    }

    /// Must equal the (normalized) value of `other`.
    pub fn matches(mut self, other: &'static str, message: &'static str) -> Self {
        self.cross.push(CrossRule::Matches(other, message));
        self
    }

    /// A date that must not precede the date in `other`.
    pub fn not_before(mut self, other: &'static str, message: &'static str) -> Self {
        self.cross.push(CrossRule::NotBefore(other, message));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn type_error(&self) -> ValidationErrors {
        ValidationError::WrongType {
            label: self.label.clone(),
            expected: self.kind.expected(),
        }
        .into()
    }

    /// Coerces and checks one present value.
    fn normalize(&self, raw: &Value) -> ValidationResult<Value> {
        if raw.is_null() {
            return if self.nullable {
                Ok(Value::Null)
            } else {
                Err(self.type_error())
            };
        }

        let value = match &self.kind {
            Kind::String | Kind::Email => {
                let Value::String(s) = raw else {
                    return Err(self.type_error());
                };
                let mut s = s.trim().to_string();
                if s.is_empty() {
                    if self.allow_empty {
                        return Ok(Value::String(s));
                    }
                    return Err(ValidationError::Empty {
                        label: self.label.clone(),
                    }
                    .into());
                }
                if self.lowercase {
                    s = s.to_lowercase();
                }
                if matches!(self.kind, Kind::Email) && !is_email(&s) {
                    return Err(ValidationError::InvalidEmail {
                        label: self.label.clone(),
                    }
                    .into());
                }
                Value::String(s)
            }
            Kind::Integer => coerce_integer(raw).ok_or_else(|| self.type_error())?,
            Kind::Number => coerce_number(raw).ok_or_else(|| self.type_error())?,
            Kind::Boolean => match raw {
                Value::Bool(b) => Value::Bool(*b),
                Value::String(s) if s.trim() == "true" => Value::Bool(true),
                Value::String(s) if s.trim() == "false" => Value::Bool(false),
                _ => return Err(self.type_error()),
            },
            Kind::Date => {
                let parsed = parse_date(raw).ok_or_else(|| self.type_error())?;
                Value::String(parsed.to_rfc3339())
            }
            Kind::Object(fields) => {
                let Value::Object(map) = raw else {
                    return Err(self.type_error());
                };
                Value::Object(validate_fields(fields, false, map)?)
            }
            Kind::Array(item) => {
                let Value::Array(items) = raw else {
                    return Err(self.type_error());
                };
                let mut errors = ValidationErrors::new();
                let mut out = Vec::with_capacity(items.len());
                for element in items {
                    match item.normalize(element) {
                        Ok(v) => out.push(v),
                        Err(e) => errors.extend(e),
                    }
                }
                if !errors.is_empty() {
                    return Err(errors);
                }
                Value::Array(out)
            }
        };

        self.apply_rules(&value)?;
        Ok(value)
    }

    fn apply_rules(&self, value: &Value) -> Result<(), ValidationError> {
        let label = || self.label.clone();
        for rule in &self.rules {
            match rule {
                Rule::MinLength(min) => {
                    if value.as_str().is_some_and(|s| s.chars().count() < *min) {
                        return Err(ValidationError::TooShort { label: label(), min: *min });
                    }
                }
                Rule::MaxLength(max) => {
                    if value.as_str().is_some_and(|s| s.chars().count() > *max) {
                        return Err(ValidationError::TooLong { label: label(), max: *max });
                    }
                }
                Rule::Positive => {
                    if value.as_f64().is_some_and(|n| n <= 0.0) {
                        return Err(ValidationError::MustBePositive { label: label() });
                    }
                }
                Rule::NonNegative => {
                    if value.as_f64().is_some_and(|n| n < 0.0) {
                        return Err(ValidationError::Negative { label: label() });
                    }
                }
                Rule::Min(min) => {
                    if value.as_f64().is_some_and(|n| n < *min as f64) {
                        return Err(ValidationError::BelowMinimum { label: label(), min: *min });
                    }
                }
                Rule::Max(max) => {
                    if value.as_f64().is_some_and(|n| n > *max as f64) {
                        return Err(ValidationError::AboveMaximum { label: label(), max: *max });
                    }
                }
                Rule::Precision(places) => {
                    if value.as_f64().is_some_and(|n| !within_precision(n, *places)) {
                        return Err(ValidationError::TooPrecise {
                            label: label(),
                            places: *places,
                        });
                    }
                }
                Rule::OneOf(allowed) => {
                    if value.as_str().is_some_and(|s| !allowed.contains(&s)) {
                        return Err(ValidationError::NotAllowed {
                            label: label(),
                            allowed: allowed.iter().map(|a| a.to_string()).collect(),
                        });
                    }
                }
                Rule::Check(predicate, message) => {
                    if value.as_str().is_some_and(|s| !predicate(s)) {
                        return Err(ValidationError::Custom(message.to_string()));
                    }
                }
                Rule::MinItems(min, message) => {
                    if value.as_array().is_some_and(|items| items.len() < *min) {
                        return Err(ValidationError::Custom(message.to_string()));
                    }
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Schema
// =============================================================================

/// A named set of fields plus object-level rules.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    allow_unknown: bool,
    min_fields: Option<(usize, &'static str)>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Schema {
            name: name.into(),
            fields: Vec::new(),
            allow_unknown: false,
            min_fields: None,
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Keys not declared by the schema are passed through untouched.
    pub fn allow_unknown(mut self) -> Self {
        self.allow_unknown = true;
        self
    }

    /// Requires at least `min` declared, non-null keys.
    pub fn min_fields(mut self, min: usize, message: &'static str) -> Self {
        self.min_fields = Some((min, message));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Validates `data` and returns the normalized object.
    ///
    /// `null` is treated as an empty object so that an absent body and `{}`
    /// behave the same.
    pub fn validate(&self, data: &Value) -> ValidationResult<Map<String, Value>> {
        let empty = Map::new();
        let input = match data {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                return Err(ValidationError::WrongType {
                    label: "Request data".to_string(),
                    expected: "an object",
                }
                .into())
            }
        };

        let mut errors = ValidationErrors::new();
        let output = match validate_fields(&self.fields, self.allow_unknown, input) {
            Ok(output) => Some(output),
            Err(e) => {
                errors.extend(e);
                None
            }
        };

        if let Some((min, message)) = self.min_fields {
            let provided = self
                .fields
                .iter()
                .filter(|f| input.get(f.name).is_some_and(|v| !v.is_null()))
                .count();
            if provided < min {
                errors.push(ValidationError::Custom(message.to_string()));
            }
        }

        match output {
            Some(output) if errors.is_empty() => Ok(output),
            _ => Err(errors),
        }
    }
}

/// Validates one object level: declared fields, unknown keys, cross rules.
fn validate_fields(
    fields: &[Field],
    allow_unknown: bool,
    input: &Map<String, Value>,
) -> ValidationResult<Map<String, Value>> {
    let mut errors = ValidationErrors::new();
    let mut output = Map::new();

    for field in fields {
        match input.get(field.name) {
            None => {
                if field.required {
                    errors.push(ValidationError::Required {
                        label: field.label.clone(),
                    });
                } else if let Some(default) = &field.default {
                    let value = match default {
                        DefaultValue::Value(v) => v.clone(),
                        DefaultValue::Now => Value::String(Utc::now().to_rfc3339()),
                    };
                    output.insert(field.name.to_string(), value);
                }
            }
            Some(raw) => match field.normalize(raw) {
                Ok(value) => {
                    output.insert(field.name.to_string(), value);
                }
                Err(e) => errors.extend(e),
            },
        }
    }

    for key in input.keys() {
        if fields.iter().any(|f| f.name == key) {
            continue;
        }
        if allow_unknown {
            output.insert(key.clone(), input[key].clone());
        } else {
            errors.push(ValidationError::UnknownField { field: key.clone() });
        }
    }

    // Cross-field rules only run against values that normalized cleanly.
    for field in fields {
        let Some(value) = output.get(field.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        for rule in &field.cross {
            match rule {
                CrossRule::Matches(other, message) => {
                    if output.get(*other) != Some(value) {
                        errors.push(ValidationError::Custom(message.to_string()));
                    }
                }
                CrossRule::NotBefore(other, message) => {
                    let mine = parse_date(value);
                    let theirs = output.get(*other).and_then(parse_date);
                    if let (Some(mine), Some(theirs)) = (mine, theirs) {
                        if mine < theirs {
                            errors.push(ValidationError::Custom(message.to_string()));
                        }
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(output)
    } else {
        Err(errors)
    }
}

// =============================================================================
// Coercion Helpers
// =============================================================================

fn coerce_integer(raw: &Value) -> Option<Value> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::from(i))
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| Value::from(f as i64))
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn coerce_number(raw: &Value) -> Option<Value> {
    match raw {
        Value::Number(n) => Some(Value::Number(n.clone())),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        _ => None,
    }
}

/// Parses RFC 3339 timestamps, plain `YYYY-MM-DD` dates (midnight UTC) and
/// epoch milliseconds.
fn parse_date(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn within_precision(n: f64, places: u32) -> bool {
    let scaled = n * 10f64.powi(places as i32);
    (scaled - scaled.round()).abs() < 1e-6
}

/// `first_name` → `First name`, `vendor_id` → `Vendor ID`.
fn humanize(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .enumerate()
        .map(|(i, word)| {
            if word.eq_ignore_ascii_case("id") {
                "ID".to_string()
            } else if i == 0 {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A deliberately small address check: one `@`, no whitespace, a dotted
/// domain with no empty labels.
pub fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================
