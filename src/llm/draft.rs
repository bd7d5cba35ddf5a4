use crate::models::ListingDraft;
use rust_decimal::Decimal;
use serde_json::Value;

pub const TITLE_LIMIT: usize = 80;

/// How a vision reply was turned into a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftOutcome {
    /// The reply was a JSON object describing the listing.
    Parsed(ListingDraft),
    /// The reply could not be parsed; the raw text went into `description`.
    Fallback(ListingDraft),
}

impl DraftOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, DraftOutcome::Fallback(_))
    }

    pub fn draft(&self) -> &ListingDraft {
        match self {
            DraftOutcome::Parsed(draft) | DraftOutcome::Fallback(draft) => draft,
        }
    }

    pub fn into_draft(self) -> ListingDraft {
        match self {
            DraftOutcome::Parsed(draft) | DraftOutcome::Fallback(draft) => draft,
        }
    }
}

/// Strictly parses the reply as a JSON object; anything else yields the
/// fallback draft.
pub fn classify(text: &str) -> DraftOutcome {
    let cleaned = strip_markdown_fence(text);
    let parsed = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value @ Value::Object(_)) => serde_json::from_value::<ListingDraft>(value).ok(),
        _ => None,
    };
    match parsed {
        Some(mut draft) => {
            draft.title = truncate(draft.title.trim(), TITLE_LIMIT);
            DraftOutcome::Parsed(draft)
        }
        None => DraftOutcome::Fallback(fallback_draft(text)),
    }
}

pub fn fallback_draft(text: &str) -> ListingDraft {
    ListingDraft {
        title: truncate(text, TITLE_LIMIT),
        description: text.to_string(),
        category: "Clothing".into(),
        condition: "Pre-owned".into(),
        price: Some(Decimal::new(2500, 2)),
        average: Some(Decimal::new(2800, 2)),
    }
}

/// Canned draft served when the service runs without a vision backend.
pub fn mock_draft(sku: &str) -> ListingDraft {
    ListingDraft {
        title: format!("Example Listing for {sku}"),
        description: "Mock AI description for your product. Replace this with real OpenAI results later.".into(),
        category: "Apparel".into(),
        condition: "Pre-owned".into(),
        price: Some(Decimal::new(2500, 2)),
        average: Some(Decimal::new(2800, 2)),
    }
}

fn strip_markdown_fence(input: &str) -> String {
    let trimmed = input.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut body = Vec::new();
    for line in trimmed.lines().skip(1) {
        if line.trim_start().starts_with("```") {
            break;
        }
        body.push(line);
    }
    body.join("\n")
}

fn truncate(value: &str, limit: usize) -> String {
    value.chars().take(limit).collect()
}
