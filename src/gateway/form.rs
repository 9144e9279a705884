//! Gateway form descriptor and its static field schema.
//!
//! The backend hands back a signed descriptor for the payment gateway. The
//! gateway dictates the POST field set, so the names are declared here once
//! instead of trusting whatever keys the descriptor carries.

use crate::finance::error::{FinanceError, FinanceResult};
use crate::logging::mask_secret;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;

/// Fields posted to the gateway, in the order the gateway documents them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GatewayField {
    MerchantId,
    AppId,
    AppName,
    TxnId,
    TxnDate,
    TxnCurrency,
    TxnAmount,
    ReferenceId,
    Remarks,
    Particulars,
    Token,
}

impl GatewayField {
    pub const ALL: [GatewayField; 11] = [
        GatewayField::MerchantId,
        GatewayField::AppId,
        GatewayField::AppName,
        GatewayField::TxnId,
        GatewayField::TxnDate,
        GatewayField::TxnCurrency,
        GatewayField::TxnAmount,
        GatewayField::ReferenceId,
        GatewayField::Remarks,
        GatewayField::Particulars,
        GatewayField::Token,
    ];

    pub const REQUIRED: [GatewayField; 7] = [
        GatewayField::MerchantId,
        GatewayField::AppId,
        GatewayField::AppName,
        GatewayField::TxnId,
        GatewayField::TxnDate,
        GatewayField::TxnAmount,
        GatewayField::Token,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayField::MerchantId => "MERCHANTID",
            GatewayField::AppId => "APPID",
            GatewayField::AppName => "APPNAME",
            GatewayField::TxnId => "TXNID",
            GatewayField::TxnDate => "TXNDATE",
            GatewayField::TxnCurrency => "TXNCRNCY",
            GatewayField::TxnAmount => "TXNAMT",
            GatewayField::ReferenceId => "REFERENCEID",
            GatewayField::Remarks => "REMARKS",
            GatewayField::Particulars => "PARTICULARS",
            GatewayField::Token => "TOKEN",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl fmt::Display for GatewayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const GATEWAY_URL_KEY: &str = "gateway_url";
pub const SUCCESS_URL_KEY: &str = "success_url";
pub const FAILURE_URL_KEY: &str = "failure_url";

/// Keys that route the flow but are never posted to the gateway.
pub const NAVIGATION_KEYS: [&str; 3] = [GATEWAY_URL_KEY, SUCCESS_URL_KEY, FAILURE_URL_KEY];

/// Raw descriptor as returned by the initiate endpoint, not yet checked.
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, JsonValue>")]
pub struct PaymentFormData {
    gateway_url: Option<String>,
    success_url: Option<String>,
    failure_url: Option<String>,
    fields: BTreeMap<GatewayField, String>,
    unexpected: Vec<String>,
}

fn stringify(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::Bool(flag) => Some(flag.to_string()),
        other => Some(other.to_string()),
    }
}

impl From<Map<String, JsonValue>> for PaymentFormData {
    fn from(map: Map<String, JsonValue>) -> Self {
        let mut form = PaymentFormData::default();
        for (key, value) in map {
            let value = stringify(&value);
            match key.as_str() {
                GATEWAY_URL_KEY => form.gateway_url = value,
                SUCCESS_URL_KEY => form.success_url = value,
                FAILURE_URL_KEY => form.failure_url = value,
                name => match GatewayField::from_name(name) {
                    Some(field) => {
                        if let Some(value) = value {
                            form.fields.insert(field, value);
                        }
                    }
                    None => form.unexpected.push(key),
                },
            }
        }
        form.unexpected.sort();
        form
    }
}

impl PaymentFormData {
    pub fn builder(gateway_url: impl Into<String>) -> PaymentFormDataBuilder {
        PaymentFormDataBuilder {
            form: PaymentFormData {
                gateway_url: Some(gateway_url.into()),
                ..Default::default()
            },
        }
    }

    pub fn gateway_url(&self) -> Option<&str> {
        self.gateway_url.as_deref()
    }

    pub fn get(&self, field: GatewayField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Required fields that are absent or blank, in schema order.
    pub fn missing_required(&self) -> Vec<GatewayField> {
        GatewayField::REQUIRED
            .into_iter()
            .filter(|field| {
                self.fields
                    .get(field)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .collect()
    }

    /// Schema check that must pass before any navigation happens.
    pub fn validate(self) -> FinanceResult<ValidatedPaymentForm> {
        let gateway_url = self
            .gateway_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                FinanceError::validation("Payment gateway URL is missing", Some(GATEWAY_URL_KEY))
            })?
            .to_string();
        if !gateway_url.starts_with("https://") && !gateway_url.starts_with("http://") {
            return Err(FinanceError::validation(
                "Payment gateway URL must be an absolute http(s) URL",
                Some(GATEWAY_URL_KEY),
            ));
        }

        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(FinanceError::MissingGatewayFields {
                fields: missing.iter().map(|f| f.as_str().to_string()).collect(),
            });
        }

        if !self.unexpected.is_empty() {
            return Err(FinanceError::UnexpectedGatewayFields {
                fields: self.unexpected,
            });
        }

        Ok(ValidatedPaymentForm {
            gateway_url,
            success_url: self.success_url,
            failure_url: self.failure_url,
            fields: self.fields,
        })
    }
}

impl fmt::Debug for PaymentFormData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentFormData")
            .field("gateway_url", &self.gateway_url)
            .field("success_url", &self.success_url)
            .field("failure_url", &self.failure_url)
            .field("fields", &MaskedFields(&self.fields))
            .field("unexpected", &self.unexpected)
            .finish()
    }
}

pub struct PaymentFormDataBuilder {
    form: PaymentFormData,
}

impl PaymentFormDataBuilder {
    pub fn field(mut self, field: GatewayField, value: impl Into<String>) -> Self {
        self.form.fields.insert(field, value.into());
        self
    }

    pub fn return_urls(mut self, success: impl Into<String>, failure: impl Into<String>) -> Self {
        self.form.success_url = Some(success.into());
        self.form.failure_url = Some(failure.into());
        self
    }

    pub fn build(self) -> PaymentFormData {
        self.form
    }
}

/// Descriptor that passed the schema check; the only input the redirector accepts.
#[derive(Clone, PartialEq)]
pub struct ValidatedPaymentForm {
    gateway_url: String,
    success_url: Option<String>,
    failure_url: Option<String>,
    fields: BTreeMap<GatewayField, String>,
}

impl ValidatedPaymentForm {
    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    pub fn success_url(&self) -> Option<&str> {
        self.success_url.as_deref()
    }

    pub fn failure_url(&self) -> Option<&str> {
        self.failure_url.as_deref()
    }

    pub fn txn_id(&self) -> &str {
        self.fields
            .get(&GatewayField::TxnId)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn amount(&self) -> &str {
        self.fields
            .get(&GatewayField::TxnAmount)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Gateway POST parameters in schema order; navigation keys never appear.
    pub fn hidden_fields(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.fields
            .iter()
            .map(|(field, value)| (field.as_str(), value.as_str()))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl fmt::Debug for ValidatedPaymentForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedPaymentForm")
            .field("gateway_url", &self.gateway_url)
            .field("success_url", &self.success_url)
            .field("failure_url", &self.failure_url)
            .field("fields", &MaskedFields(&self.fields))
            .finish()
    }
}

impl Serialize for ValidatedPaymentForm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in self.hidden_fields() {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(GATEWAY_URL_KEY, &self.gateway_url)?;
        if let Some(url) = &self.success_url {
            map.serialize_entry(SUCCESS_URL_KEY, url)?;
        }
        if let Some(url) = &self.failure_url {
            map.serialize_entry(FAILURE_URL_KEY, url)?;
        }
        map.end()
    }
}

struct MaskedFields<'a>(&'a BTreeMap<GatewayField, String>);

impl fmt::Debug for MaskedFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (field, value) in self.0 {
            if *field == GatewayField::Token {
                map.entry(&field.as_str(), &mask_secret(value));
            } else {
                map.entry(&field.as_str(), value);
            }
        }
        map.finish()
    }
}
