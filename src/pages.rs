//! Shared page chrome for server-rendered console pages.

use maud::{html, Markup, DOCTYPE};

pub fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | Wallet" }
            }
            body {
                main class="console" {
                    (body)
                }
            }
        }
    }
}

/// Inline error banner used under forms.
pub fn error_banner(message: Option<&str>) -> Markup {
    html! {
        @if let Some(message) = message {
            div class="alert alert-error" role="alert" { (message) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_escapes_title() {
        let page = layout("<Wallet>", html! { p { "body" } }).into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("&lt;Wallet&gt; | Wallet"));
        assert!(page.contains("<p>body</p>"));
    }

    #[test]
    fn banner_only_renders_with_message() {
        assert_eq!(error_banner(None).into_string(), "");
        assert!(error_banner(Some("Oops"))
            .into_string()
            .contains(r#"role="alert""#));
    }
}
