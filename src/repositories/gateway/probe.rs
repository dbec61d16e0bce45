use serde_json::Value;

/// Locations of the payment status, in priority order.
pub const STATUS_FIELDS: &[&str] = &["/status", "/payment/status", "/transaction_status"];

/// The gateway has been seen answering with either spelling.
pub const NUMBER_TOKEN_FIELDS: &[&str] = &["/number_token", "/numberToken"];

pub const ACCESS_TOKEN_FIELDS: &[&str] = &["/access_token"];

pub const MESSAGE_FIELDS: &[&str] = &[
    "/message",
    "/details/0/description",
    "/error_description",
    "/error",
];

/// Tries each JSON pointer in order; the first non-empty string wins.
pub fn first_non_empty<'a>(value: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| value.pointer(field))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Approved,
    Pending,
}

#[derive(Debug, Clone)]
pub struct StatusClassifier {
    positive: Vec<String>,
}

impl StatusClassifier {
    pub fn new(positive: &[String]) -> Self {
        let positive = positive
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self { positive }
    }

    /// Returns the classification and the lower-cased status it was based on.
    pub fn classify(&self, body: &Value) -> (PaymentStatus, String) {
        let status = first_non_empty(body, STATUS_FIELDS)
            .unwrap_or_default()
            .to_lowercase();

        if self.positive.iter().any(|p| status.contains(p.as_str())) {
            (PaymentStatus::Approved, status)
        } else {
            (PaymentStatus::Pending, status)
        }
    }
}
