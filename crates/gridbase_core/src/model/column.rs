//! Column types and typed cell values.
//!
//! # Responsibility
//! - Define the closed set of column types.
//! - Validate raw cell input per type and order values of one type.
//!
//! # Invariants
//! - A stored cell value is always the canonical text of a `CellValue` that
//!   its column type accepted.
//! - Dropdown columns declare at least one option; options are unique.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DATE_FORMAT: &str = "%Y-%m-%d";

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://[^\s/?#.][^\s/?#]*(?:[/?#]\S*)?$").expect("url pattern is valid")
});

/// Column type, serialized as `{"type": "..."}` with per-type options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Number,
    /// ISO calendar date, `YYYY-MM-DD`.
    Date,
    Checkbox,
    /// Single choice from a fixed option list.
    Dropdown { options: Vec<String> },
    Url,
    RichText,
}

/// Typed cell value produced by [`ColumnType::parse_value`].
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Checkbox(bool),
    Dropdown(String),
    Url(String),
    RichText(String),
}

/// Column definition or cell input rejected by its column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValidationError {
    InvalidNumber(String),
    InvalidDate(String),
    InvalidCheckbox(String),
    UnknownOption { value: String, options: Vec<String> },
    InvalidUrl(String),
    InvalidDropdownOptions(String),
    InvalidColumnType(String),
}

impl Display for ColumnValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber(value) => write!(f, "`{value}` is not a finite number"),
            Self::InvalidDate(value) => write!(f, "`{value}` is not a YYYY-MM-DD date"),
            Self::InvalidCheckbox(value) => write!(f, "`{value}` is not a checkbox value"),
            Self::UnknownOption { value, options } => write!(
                f,
                "`{value}` is not one of the dropdown options [{}]",
                options.join(", ")
            ),
            Self::InvalidUrl(value) => write!(f, "`{value}` is not an http(s) url"),
            Self::InvalidDropdownOptions(message) => {
                write!(f, "invalid dropdown options: {message}")
            }
            Self::InvalidColumnType(message) => write!(f, "invalid column type: {message}"),
        }
    }
}

impl Error for ColumnValidationError {}

impl ColumnType {
    /// Stable snake_case label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Checkbox => "checkbox",
            Self::Dropdown { .. } => "dropdown",
            Self::Url => "url",
            Self::RichText => "rich_text",
        }
    }

    /// Validates the column definition itself.
    pub fn validate(&self) -> Result<(), ColumnValidationError> {
        let Self::Dropdown { options } = self else {
            return Ok(());
        };
        if options.is_empty() {
            return Err(ColumnValidationError::InvalidDropdownOptions(
                "at least one option is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for option in options {
            if option.trim().is_empty() {
                return Err(ColumnValidationError::InvalidDropdownOptions(
                    "options must not be blank".to_string(),
                ));
            }
            if option.trim() != option {
                return Err(ColumnValidationError::InvalidDropdownOptions(format!(
                    "option `{option}` has surrounding whitespace"
                )));
            }
            if !seen.insert(option.as_str()) {
                return Err(ColumnValidationError::InvalidDropdownOptions(format!(
                    "duplicate option `{option}`"
                )));
            }
        }
        Ok(())
    }

    /// Parses raw cell input into a typed value.
    pub fn parse_value(&self, raw: &str) -> Result<CellValue, ColumnValidationError> {
        let trimmed = raw.trim();
        match self {
            Self::Text => Ok(CellValue::Text(raw.to_string())),
            Self::RichText => Ok(CellValue::RichText(raw.to_string())),
            Self::Number => trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(CellValue::Number)
                .ok_or_else(|| ColumnValidationError::InvalidNumber(raw.to_string())),
            Self::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(CellValue::Date)
                .map_err(|_| ColumnValidationError::InvalidDate(raw.to_string())),
            Self::Checkbox => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(CellValue::Checkbox(true)),
                "false" | "0" | "no" | "" => Ok(CellValue::Checkbox(false)),
                _ => Err(ColumnValidationError::InvalidCheckbox(raw.to_string())),
            },
            Self::Dropdown { options } => {
                if options.iter().any(|option| option == trimmed) {
                    Ok(CellValue::Dropdown(trimmed.to_string()))
                } else {
                    Err(ColumnValidationError::UnknownOption {
                        value: raw.to_string(),
                        options: options.clone(),
                    })
                }
            }
            Self::Url => {
                if URL_PATTERN.is_match(trimmed) {
                    Ok(CellValue::Url(trimmed.to_string()))
                } else {
                    Err(ColumnValidationError::InvalidUrl(raw.to_string()))
                }
            }
        }
    }

    /// Orders two values of this column type.
    ///
    /// Text-like values compare case-insensitively, then byte-wise. Dropdown
    /// values follow option order.
    pub fn compare(&self, left: &CellValue, right: &CellValue) -> Ordering {
        match (left, right) {
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Date(a), CellValue::Date(b)) => a.cmp(b),
            (CellValue::Checkbox(a), CellValue::Checkbox(b)) => a.cmp(b),
            (CellValue::Dropdown(a), CellValue::Dropdown(b)) => {
                let position = |value: &str| match self {
                    Self::Dropdown { options } => options
                        .iter()
                        .position(|option| option == value)
                        .unwrap_or(options.len()),
                    _ => 0,
                };
                position(a).cmp(&position(b)).then_with(|| a.cmp(b))
            }
            (CellValue::Text(a), CellValue::Text(b))
            | (CellValue::Url(a), CellValue::Url(b))
            | (CellValue::RichText(a), CellValue::RichText(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            _ => left.variant_order().cmp(&right.variant_order()),
        }
    }

    /// Serializes the type for storage.
    pub fn to_storage(&self) -> Result<String, ColumnValidationError> {
        serde_json::to_string(self)
            .map_err(|err| ColumnValidationError::InvalidColumnType(err.to_string()))
    }

    /// Parses a stored type definition.
    pub fn from_storage(value: &str) -> Result<Self, ColumnValidationError> {
        serde_json::from_str(value)
            .map_err(|err| ColumnValidationError::InvalidColumnType(err.to_string()))
    }
}

impl CellValue {
    /// Canonical text form written to storage.
    pub fn to_storage(&self) -> String {
        match self {
            Self::Text(value) | Self::Dropdown(value) | Self::Url(value) | Self::RichText(value) => {
                value.clone()
            }
            Self::Number(value) => value.to_string(),
            Self::Date(value) => value.format(DATE_FORMAT).to_string(),
            Self::Checkbox(value) => value.to_string(),
        }
    }

    fn variant_order(&self) -> u8 {
        match self {
            Self::Text(_) => 0,
            Self::Number(_) => 1,
            Self::Date(_) => 2,
            Self::Checkbox(_) => 3,
            Self::Dropdown(_) => 4,
            Self::Url(_) => 5,
            Self::RichText(_) => 6,
        }
    }
}
