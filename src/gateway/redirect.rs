//! Full-page form POST to the external payment gateway.

use crate::gateway::form::ValidatedPaymentForm;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use tracing::info;

pub const GATEWAY_FORM_ID: &str = "gateway-form";

/// The point of no return for a top-up.
///
/// This is not a future and carries no result: once the browser receives it the
/// page submits itself to the gateway, and control only comes back through the
/// gateway's success/failure callback URL.
#[must_use = "a gateway navigation does nothing until it is sent to the browser"]
pub struct GatewayNavigation {
    txn_id: String,
    fields: Vec<(&'static str, String)>,
    markup: Markup,
}

impl GatewayNavigation {
    pub fn txn_id(&self) -> &str {
        &self.txn_id
    }

    /// The hidden inputs the page will post, in order.
    pub fn form_fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    pub fn html(&self) -> &str {
        &self.markup.0
    }
}

impl IntoResponse for GatewayNavigation {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CACHE_CONTROL, "no-store")],
            Html(self.markup.into_string()),
        )
            .into_response()
    }
}

/// Hands the browser over to the gateway.
pub fn redirect_to_gateway(form: ValidatedPaymentForm) -> GatewayNavigation {
    let fields: Vec<(&'static str, String)> = form
        .hidden_fields()
        .map(|(name, value)| (name, value.to_string()))
        .collect();

    info!(
        txn_id = %form.txn_id(),
        gateway_url = %form.gateway_url(),
        field_count = fields.len(),
        "Redirecting browser to payment gateway"
    );

    let markup = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                meta name="referrer" content="no-referrer";
                title { "Redirecting to payment gateway" }
            }
            body {
                p { "Redirecting you to the payment gateway. Please do not close this window." }
                form id=(GATEWAY_FORM_ID)
                    action=(form.gateway_url())
                    method="post"
                    enctype="application/x-www-form-urlencoded"
                    target="_self"
                    style="display:none" {
                    @for (name, value) in &fields {
                        input type="hidden" name=(name) value=(value);
                    }
                }
                noscript {
                    button type="submit" form=(GATEWAY_FORM_ID) { "Continue to payment" }
                }
                (PreEscaped(format!(
                    r#"<script>document.getElementById("{}").submit();</script>"#,
                    GATEWAY_FORM_ID
                )))
            }
        }
    };

    GatewayNavigation {
        txn_id: form.txn_id().to_string(),
        fields,
        markup,
    }
}
