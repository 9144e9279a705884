//! External payment gateway hand-off.

pub mod form;
pub mod redirect;

pub use form::{GatewayField, PaymentFormData, ValidatedPaymentForm};
pub use redirect::{redirect_to_gateway, GatewayNavigation};
