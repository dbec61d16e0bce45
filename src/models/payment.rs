use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::errors::CheckoutError;
use crate::settings::PaymentProfile;

/// Client credentials of this service at the gateway.
pub struct ServiceCredentials {
    client_id: String,
    client_secret: SecretString,
    seller_id: String,
}

impl ServiceCredentials {
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        seller_id: String,
    ) -> Result<Self, CheckoutError> {
        if client_id.trim().is_empty() {
            return Err(CheckoutError::Configuration("missing client id".to_string()));
        }
        if client_secret.expose_secret().trim().is_empty() {
            return Err(CheckoutError::Configuration(
                "missing client secret".to_string(),
            ));
        }
        if seller_id.trim().is_empty() {
            return Err(CheckoutError::Configuration("missing seller id".to_string()));
        }

        Ok(Self {
            client_id,
            client_secret,
            seller_id,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    pub fn seller_id(&self) -> &str {
        &self.seller_id
    }
}

impl fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("seller_id", &self.seller_id)
            .finish()
    }
}

/// Short-lived access token owned by a single payment attempt.
pub struct BearerCredential {
    pub access_token: SecretString,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
    pub issued_at: DateTime<Utc>,
}

impl fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerCredential")
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Single-use stand-in for the card number.
#[derive(Debug, PartialEq, Eq)]
pub struct NumberToken(String);

impl NumberToken {
    pub fn new(token: String) -> Self {
        NumberToken(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Deserialize)]
pub struct CardInput {
    pub cardholder_name: String,
    #[serde(deserialize_with = "secret")]
    pub number: SecretString,
    pub exp_month: String,
    pub exp_year: String,
    #[serde(deserialize_with = "secret")]
    pub security_code: SecretString,
    pub brand: String,
}

fn secret<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

impl fmt::Debug for CardInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardInput")
            .field("cardholder_name", &self.cardholder_name)
            .field("number", &"[REDACTED]")
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("security_code", &"[REDACTED]")
            .field("brand", &self.brand)
            .finish()
    }
}

impl CardInput {
    pub fn validate(&self) -> Result<(), CheckoutError> {
        require(&self.cardholder_name, "cardholder name")?;
        require(self.number.expose_secret(), "card number")?;
        require(&self.exp_month, "expiration month")?;
        require(&self.exp_year, "expiration year")?;
        require(self.security_code.expose_secret(), "security code")?;
        require(&self.brand, "card brand")?;

        if normalize_card_number(self.number.expose_secret()).is_empty() {
            return Err(CheckoutError::Validation("card number is required".to_string()));
        }

        Ok(())
    }

    /// Splits off the raw card number, which only the tokenizer may see.
    pub fn into_parts(self) -> (SecretString, CardMetadata) {
        let metadata = CardMetadata {
            cardholder_name: self.cardholder_name.trim().to_string(),
            exp_month: self.exp_month.trim().to_string(),
            exp_year: self.exp_year.trim().to_string(),
            security_code: self.security_code,
            brand: self.brand.trim().to_string(),
        };

        (self.number, metadata)
    }
}

/// What the authorization request still needs once the card is tokenized.
pub struct CardMetadata {
    pub cardholder_name: String,
    pub exp_month: String,
    pub exp_year: String,
    pub security_code: SecretString,
    pub brand: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub document_number: Option<String>,
    pub phone_number: Option<String>,
}

impl CustomerInfo {
    pub fn validate(&self) -> Result<(), CheckoutError> {
        require(&self.name, "customer name")?;
        require(&self.email, "customer email")?;

        if !self.email.contains('@') {
            return Err(CheckoutError::Validation(
                "customer email is invalid".to_string(),
            ));
        }

        Ok(())
    }
}

fn require(value: &str, field: &str) -> Result<(), CheckoutError> {
    if value.trim().is_empty() {
        return Err(CheckoutError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

pub fn normalize_card_number(number: &str) -> String {
    number.chars().filter(|c| !c.is_whitespace()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentType {
    /// Company registry number, the long form.
    #[serde(rename = "CNPJ")]
    Cnpj,
    /// Individual taxpayer number, the short form.
    #[serde(rename = "CPF")]
    Cpf,
}

/// Classifies a document number, stripping the usual formatting first.
/// Returns `None` when there is nothing left to send.
pub fn infer_document(document_number: Option<&str>) -> Option<(DocumentType, String)> {
    let normalized: String = document_number?
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '.' | '-' | '/'))
        .collect();

    if normalized.is_empty() {
        return None;
    }

    let document_type = if normalized.chars().count() > 11 {
        DocumentType::Cnpj
    } else {
        DocumentType::Cpf
    };

    Some((document_type, normalized))
}

#[derive(Debug, Serialize)]
pub struct TransactionRequest {
    pub seller_id: String,
    pub amount: i64,
    pub currency: String,
    pub order: Order,
    pub customer: Customer,
    pub credit: Credit,
}

#[derive(Debug, Serialize)]
pub struct Order {
    pub order_id: String,
    pub sales_tax: i64,
    pub product_type: String,
}

#[derive(Debug, Serialize)]
pub struct Customer {
    pub customer_id: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Credit {
    pub delayed: bool,
    pub save_card_data: bool,
    pub transaction_type: String,
    pub number_installments: u32,
    pub soft_descriptor: String,
    pub dynamic_mcc: String,
    pub card: Card,
}

#[derive(Serialize)]
pub struct Card {
    pub number_token: String,
    pub cardholder_name: String,
    #[serde(serialize_with = "expose")]
    pub security_code: SecretString,
    pub brand: String,
    pub expiration_month: String,
    pub expiration_year: String,
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("number_token", &self.number_token)
            .field("cardholder_name", &self.cardholder_name)
            .field("security_code", &"[REDACTED]")
            .field("brand", &self.brand)
            .field("expiration_month", &self.expiration_month)
            .field("expiration_year", &self.expiration_year)
            .finish()
    }
}

fn expose<S: serde::Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl TransactionRequest {
    pub fn build(
        profile: &PaymentProfile,
        seller_id: &str,
        order_id: String,
        token: NumberToken,
        card: CardMetadata,
        customer: &CustomerInfo,
        installments: u32,
    ) -> Self {
        let name = customer.name.trim().to_string();
        let (first_name, last_name) = split_name(&name);
        let document = infer_document(customer.document_number.as_deref());
        let phone_number = customer
            .phone_number
            .as_deref()
            .map(|p| p.chars().filter(char::is_ascii_digit).collect::<String>())
            .filter(|p| !p.is_empty());

        TransactionRequest {
            seller_id: seller_id.to_string(),
            amount: profile.amount_in_cents,
            currency: profile.currency.clone(),
            order: Order {
                order_id,
                sales_tax: profile.sales_tax,
                product_type: profile.product_type.clone(),
            },
            customer: Customer {
                customer_id: customer.email.trim().to_string(),
                first_name,
                last_name,
                name,
                email: customer.email.trim().to_string(),
                document_type: document.as_ref().map(|(t, _)| *t),
                document_number: document.map(|(_, n)| n),
                phone_number,
            },
            credit: Credit {
                delayed: false,
                save_card_data: false,
                transaction_type: profile.transaction_type.clone(),
                number_installments: installments,
                soft_descriptor: profile.soft_descriptor.clone(),
                dynamic_mcc: profile.category_code.clone(),
                card: Card {
                    number_token: token.0,
                    cardholder_name: card.cardholder_name,
                    security_code: card.security_code,
                    brand: card.brand,
                    expiration_month: card.exp_month,
                    expiration_year: card.exp_year,
                },
            },
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order.order_id
    }
}

fn split_name(name: &str) -> (String, String) {
    match name.split_once(char::is_whitespace) {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (name.to_string(), name.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentReceipt {
    pub order_id: String,
    pub payment_id: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Approved(PaymentReceipt),
    Pending(PaymentReceipt),
    Failed(String),
}

impl TransactionOutcome {
    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        match self {
            TransactionOutcome::Approved(receipt) | TransactionOutcome::Pending(receipt) => {
                Some(receipt)
            }
            TransactionOutcome::Failed(_) => None,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, TransactionOutcome::Approved(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> PaymentProfile {
        PaymentProfile {
            amount_in_cents: 1990,
            currency: "BRL".to_string(),
            product_type: "digital_content".to_string(),
            transaction_type: "FULL".to_string(),
            soft_descriptor: "MOOZE*PREMIUM".to_string(),
            category_code: "5815".to_string(),
            sales_tax: 0,
            positive_statuses: vec!["approved".to_string()],
            max_installments: 12,
        }
    }

    fn metadata() -> CardMetadata {
        CardMetadata {
            cardholder_name: "JOAO DA SILVA".to_string(),
            exp_month: "12".to_string(),
            exp_year: "28".to_string(),
            security_code: SecretString::from("123".to_string()),
            brand: "Visa".to_string(),
        }
    }

    fn customer(document: Option<&str>) -> CustomerInfo {
        CustomerInfo {
            name: "Joao da Silva".to_string(),
            email: "joao@example.com".to_string(),
            document_number: document.map(str::to_string),
            phone_number: Some("(11) 98765-4321".to_string()),
        }
    }

    #[test]
    fn card_number_whitespace_is_stripped() {
        assert_eq!(
            normalize_card_number("4111 1111 1111 1111"),
            "4111111111111111"
        );
        assert_eq!(normalize_card_number(" 4111\t1111 "), "41111111");
    }

    #[test]
    fn document_type_follows_length() {
        assert_eq!(
            infer_document(Some("12345678901234")),
            Some((DocumentType::Cnpj, "12345678901234".to_string()))
        );
        assert_eq!(
            infer_document(Some("12345678901")),
            Some((DocumentType::Cpf, "12345678901".to_string()))
        );
        assert_eq!(
            infer_document(Some("123.456.789-01")),
            Some((DocumentType::Cpf, "12345678901".to_string()))
        );
        assert_eq!(infer_document(Some("   ")), None);
        assert_eq!(infer_document(None), None);
    }

    #[test]
    fn formatted_cnpj_is_stripped_before_length_check() {
        assert_eq!(
            infer_document(Some("12.345.678/0001-90")),
            Some((DocumentType::Cnpj, "12345678000190".to_string()))
        );

        let request = TransactionRequest::build(
            &profile(),
            "seller",
            "order-1".to_string(),
            NumberToken::new("tok".to_string()),
            metadata(),
            &customer(Some("12.345.678/0001-90")),
            1,
        );
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["customer"]["document_type"], "CNPJ");
        assert_eq!(body["customer"]["document_number"], "12345678000190");
    }

    #[test]
    fn absent_document_is_omitted_from_wire() {
        let request = TransactionRequest::build(
            &profile(),
            "seller",
            "order-1".to_string(),
            NumberToken::new("tok".to_string()),
            metadata(),
            &customer(None),
            1,
        );
        let body = serde_json::to_value(&request).unwrap();

        assert!(body["customer"].get("document_type").is_none());
        assert!(body["customer"].get("document_number").is_none());
        assert_eq!(body["customer"]["phone_number"], "11987654321");
        assert_eq!(body["credit"]["card"]["security_code"], "123");
        assert_eq!(body["customer"]["first_name"], "Joao");
        assert_eq!(body["customer"]["last_name"], "da Silva");
    }

    #[test]
    fn request_carries_profile_constants() {
        let request = TransactionRequest::build(
            &profile(),
            "seller",
            "order-1".to_string(),
            NumberToken::new("tok".to_string()),
            metadata(),
            &customer(Some("12345678901234")),
            3,
        );
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["seller_id"], "seller");
        assert_eq!(body["amount"], 1990);
        assert_eq!(body["currency"], "BRL");
        assert_eq!(body["order"]["product_type"], "digital_content");
        assert_eq!(body["credit"]["transaction_type"], "FULL");
        assert_eq!(body["credit"]["number_installments"], 3);
        assert_eq!(body["credit"]["dynamic_mcc"], "5815");
        assert_eq!(body["credit"]["card"]["number_token"], "tok");
        assert_eq!(body["customer"]["document_type"], "CNPJ");
        assert!(!format!("{:?}", request).contains("\"123\""));
    }

    #[test]
    fn missing_card_fields_fail_validation() {
        let card = CardInput {
            cardholder_name: "JOAO".to_string(),
            number: SecretString::from("   ".to_string()),
            exp_month: "12".to_string(),
            exp_year: "28".to_string(),
            security_code: SecretString::from("123".to_string()),
            brand: "Visa".to_string(),
        };

        assert!(matches!(card.validate(), Err(CheckoutError::Validation(_))));
        assert!(!format!("{:?}", card).contains("123"));
    }
}
