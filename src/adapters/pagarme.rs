use crate::domain::model::{Account, ChargeTicket};
use crate::domain::ports::ChargeProvider;
use crate::utils::error::{Result, SiteError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const PIX_EXPIRY_SECS: u64 = 3600;
// Fallbacks when the account has no usable phone on file.
const DEFAULT_AREA_CODE: &str = "31";
const DEFAULT_PHONE_NUMBER: &str = "999999999";

/// PIX charge creation against the payment provider's order API.
/// Auth is HTTP Basic with the secret key as username and empty password.
pub struct PagarmeCharges {
    client: Client,
    api_base: String,
    api_key: String,
}

impl PagarmeCharges {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    charges: Option<Vec<Charge>>,
}

#[derive(Debug, Deserialize)]
struct Charge {
    last_transaction: Option<LastTransaction>,
}

#[derive(Debug, Deserialize)]
struct LastTransaction {
    qr_code: Option<String>,
    qr_code_url: Option<String>,
    qr_codes: Option<Vec<QrCode>>,
}

#[derive(Debug, Deserialize)]
struct QrCode {
    qr_code: String,
    url: Option<String>,
}

fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn split_phone(phone: Option<&str>) -> (String, String) {
    if let Some(phone) = phone {
        let digits = digits_only(phone);
        if digits.len() >= 10 {
            return (digits[..2].to_string(), digits[2..].to_string());
        }
    }
    (
        DEFAULT_AREA_CODE.to_string(),
        DEFAULT_PHONE_NUMBER.to_string(),
    )
}

#[async_trait]
impl ChargeProvider for PagarmeCharges {
    async fn create_charge(
        &self,
        account: &Account,
        quantity: i64,
        amount_cents: i64,
    ) -> Result<ChargeTicket> {
        let (area_code, number) = split_phone(account.phone.as_deref());
        let document = digits_only(account.document.as_deref().unwrap_or_default());

        let body = json!({
            "items": [{
                "amount": amount_cents,
                "description": format!("Purchase of {} token(s)", quantity),
                "quantity": 1
            }],
            "customer": {
                "name": account.name,
                "type": "individual",
                "document": document,
                "email": account.email,
                "phones": {
                    "mobile_phone": {
                        "country_code": "55",
                        "area_code": area_code,
                        "number": number
                    }
                }
            },
            "payments": [{
                "payment_method": "pix",
                "pix": { "expires_in": PIX_EXPIRY_SECS }
            }]
        });

        let credential = STANDARD.encode(format!("{}:", self.api_key));
        let response = self
            .client
            .post(format!("{}/core/v5/orders", self.api_base))
            .header("Authorization", format!("Basic {}", credential))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SiteError::PaymentError {
                message: format!("Charge creation returned {}: {}", status, body),
            });
        }

        let payload: OrderResponse = response.json().await?;
        let transaction = payload
            .charges
            .and_then(|mut charges| {
                if charges.is_empty() {
                    None
                } else {
                    Some(charges.remove(0))
                }
            })
            .and_then(|charge| charge.last_transaction)
            .ok_or_else(|| SiteError::PaymentError {
                message: "Charge response is missing transaction data".to_string(),
            })?;

        // Newer API versions nest the QR data in `qr_codes`; fall back to
        // the flat fields for older responses.
        let (qr_payload, qr_image_url) = match transaction.qr_codes.and_then(|mut codes| {
            if codes.is_empty() {
                None
            } else {
                Some(codes.remove(0))
            }
        }) {
            Some(qr) => (qr.qr_code, qr.url),
            None => match transaction.qr_code {
                Some(code) => (code, transaction.qr_code_url),
                None => {
                    return Err(SiteError::PaymentError {
                        message: "QR code missing from charge response".to_string(),
                    })
                }
            },
        };

        tracing::info!("📡 Charge created at provider: order {}", payload.id);
        Ok(ChargeTicket {
            order_id: payload.id,
            qr_payload,
            qr_image_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_phone_extracts_area_code() {
        let (area, number) = split_phone(Some("(31) 99999-8888"));
        assert_eq!(area, "31");
        assert_eq!(number, "999998888");
    }

    #[test]
    fn test_split_phone_falls_back_when_too_short() {
        let (area, number) = split_phone(Some("12345"));
        assert_eq!(area, "31");
        assert_eq!(number, "999999999");
    }

    #[test]
    fn test_split_phone_falls_back_when_missing() {
        let (area, number) = split_phone(None);
        assert_eq!(area, DEFAULT_AREA_CODE);
        assert_eq!(number, DEFAULT_PHONE_NUMBER);
    }
}
