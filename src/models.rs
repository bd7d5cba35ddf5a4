use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use serde_with::skip_serializing_none;
use std::str::FromStr;

/// Draft listing attributes produced by the vision backend.
///
/// Text fields are free-form. `price` and `average` are decimals internally and
/// travel as two-decimal strings (`"25.00"`).
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDraft {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub condition: String,
    #[serde(default, with = "money")]
    pub price: Option<Decimal>,
    #[serde(default, with = "money")]
    pub average: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    #[default]
    Staged,
    Ready,
}

/// Images grouped under one SKU, plus the draft once one has been generated.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub sku: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub status: BatchStatus,
    #[serde(default)]
    pub ai: Option<ListingDraft>,
}

impl Batch {
    pub fn staged(sku: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            sku: sku.into(),
            files,
            status: BatchStatus::Staged,
            ai: None,
        }
    }

    /// Attaches a generated draft. `files` is left untouched.
    pub fn apply_draft(&mut self, draft: ListingDraft) {
        self.ai = Some(draft);
        self.status = BatchStatus::Ready;
    }

    pub fn is_ready(&self) -> bool {
        self.status == BatchStatus::Ready
    }
}

/// Result of a comparable-sales lookup. `Empty` is the "no comparables"
/// answer, serialized as `{"average":"-","quickSale":"-","count":0}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompsSummary {
    Empty,
    Found {
        average: Decimal,
        quick_sale: Decimal,
        count: usize,
    },
}

const NO_COMPS: &str = "-";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompsWire {
    average: String,
    quick_sale: String,
    count: usize,
}

impl Serialize for CompsSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            CompsSummary::Empty => CompsWire {
                average: NO_COMPS.into(),
                quick_sale: NO_COMPS.into(),
                count: 0,
            },
            CompsSummary::Found {
                average,
                quick_sale,
                count,
            } => CompsWire {
                average: format_amount(*average),
                quick_sale: format_amount(*quick_sale),
                count: *count,
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CompsSummary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = CompsWire::deserialize(deserializer)?;
        if wire.count == 0 || wire.average == NO_COMPS {
            return Ok(CompsSummary::Empty);
        }
        let average = parse_amount(&wire.average)
            .ok_or_else(|| serde::de::Error::custom("invalid average"))?;
        let quick_sale = parse_amount(&wire.quick_sale)
            .ok_or_else(|| serde::de::Error::custom("invalid quickSale"))?;
        Ok(CompsSummary::Found {
            average,
            quick_sale,
            count: wire.count,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRequest {
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompsRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastSkuResponse {
    pub last_sku: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastSkuWrite {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub sku: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignResponse {
    pub batch: Batch,
    pub next_sku: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Formats an amount with exactly two decimals, rounding half away from zero.
pub fn format_amount(value: Decimal) -> String {
    let mut rounded = round_cents(value);
    rounded.rescale(2);
    rounded.to_string()
}

pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parses `"25"`, `"25.5"`, `"$1,299.00"` or `"19.99 USD"` into a decimal.
pub fn parse_amount(input: &str) -> Option<Decimal> {
    let cleaned: String = input
        .trim()
        .trim_end_matches("USD")
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

pub fn amount_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_amount(s),
        Value::Number(n) => parse_amount(&n.to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_string(),
    })
}

mod money {
    use super::{amount_from_value, format_amount};
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(amount) => serializer.serialize_str(&format_amount(*amount)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Decimal>, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(amount_from_value))
    }
}
