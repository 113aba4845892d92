//! Order creation draft: local validation before `POST /orders`.
//!
//! The server validates again; these checks only save a round trip and give
//! the operator field-level messages.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use odk_schemas::{CreateOrderRequest, MetaValue, Metadata};

pub const MAX_PRODUCTS: usize = 10;
pub const MIN_AMOUNT: f64 = 0.01;
pub const MAX_AMOUNT: f64 = 999_999.99;
pub const MAX_NOTES_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(DraftError::InvalidPriority(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// DraftError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    NoProducts,
    TooManyProducts,
    EmptyProductId,
    DuplicateProduct(String),
    AmountTooSmall,
    AmountTooLarge,
    InvalidEmail,
    NotesTooLong,
    InvalidPriority(String),
}

impl fmt::Display for DraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftError::NoProducts => f.write_str("At least one product is required"),
            DraftError::TooManyProducts => {
                write!(f, "Maximum {MAX_PRODUCTS} products allowed")
            }
            DraftError::EmptyProductId => f.write_str("Product ID cannot be empty"),
            DraftError::DuplicateProduct(id) => write!(f, "Product ID already added: {id}"),
            DraftError::AmountTooSmall => f.write_str("Amount must be greater than 0"),
            DraftError::AmountTooLarge => f.write_str("Amount too large"),
            DraftError::InvalidEmail => f.write_str("Invalid email format"),
            DraftError::NotesTooLong => {
                write!(f, "Notes too long (max {MAX_NOTES_CHARS} characters)")
            }
            DraftError::InvalidPriority(p) => {
                write!(f, "Invalid priority '{p}' (expected low, medium or high)")
            }
        }
    }
}

impl std::error::Error for DraftError {}

// ---------------------------------------------------------------------------
// CreateOrderDraft
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOrderDraft {
    product_ids: Vec<String>,
    pub amount: f64,
    pub customer_name: String,
    pub customer_email: String,
    pub notes: String,
    pub priority: Option<Priority>,
    pub source: String,
}

impl Default for CreateOrderDraft {
    fn default() -> Self {
        Self {
            product_ids: Vec::new(),
            amount: 0.0,
            customer_name: String::new(),
            customer_email: String::new(),
            notes: String::new(),
            priority: Some(Priority::Medium),
            source: "web_form".to_string(),
        }
    }
}

impl CreateOrderDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product_ids(&self) -> &[String] {
        &self.product_ids
    }

    /// Add a product id (trimmed). Rejects empty ids, duplicates, and an
    /// eleventh product.
    pub fn add_product(&mut self, raw: &str) -> Result<(), DraftError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(DraftError::EmptyProductId);
        }
        if self.product_ids.iter().any(|p| p == id) {
            return Err(DraftError::DuplicateProduct(id.to_string()));
        }
        if self.product_ids.len() >= MAX_PRODUCTS {
            return Err(DraftError::TooManyProducts);
        }
        self.product_ids.push(id.to_string());
        Ok(())
    }

    pub fn remove_product(&mut self, id: &str) -> bool {
        let before = self.product_ids.len();
        self.product_ids.retain(|p| p != id);
        self.product_ids.len() != before
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.product_ids.is_empty() {
            return Err(DraftError::NoProducts);
        }
        if self.product_ids.len() > MAX_PRODUCTS {
            return Err(DraftError::TooManyProducts);
        }
        if self.amount.is_nan() || self.amount < MIN_AMOUNT {
            return Err(DraftError::AmountTooSmall);
        }
        if self.amount > MAX_AMOUNT {
            return Err(DraftError::AmountTooLarge);
        }
        let email = self.customer_email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            return Err(DraftError::InvalidEmail);
        }
        if self.notes.chars().count() > MAX_NOTES_CHARS {
            return Err(DraftError::NotesTooLong);
        }
        Ok(())
    }

    /// Validate and build the request body.
    ///
    /// Empty optional fields are omitted; `created_via` and `created_at` are
    /// always added.
    pub fn into_request(
        self,
        created_via: &str,
        now: DateTime<Utc>,
    ) -> Result<CreateOrderRequest, DraftError> {
        self.validate()?;

        let mut metadata = Metadata::new();
        for (key, value) in [
            ("customer_name", self.customer_name.trim()),
            ("customer_email", self.customer_email.trim()),
            ("notes", self.notes.trim()),
            ("source", self.source.trim()),
        ] {
            if !value.is_empty() {
                metadata.insert(key.to_string(), MetaValue::from(value));
            }
        }
        if let Some(p) = self.priority {
            metadata.insert("priority".to_string(), MetaValue::from(p.as_str()));
        }
        metadata.insert("created_via".to_string(), MetaValue::from(created_via));
        metadata.insert(
            "created_at".to_string(),
            MetaValue::from(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        Ok(CreateOrderRequest {
            product_ids: self.product_ids,
            amount: self.amount,
            metadata,
        })
    }
}

fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
