//! Interpretation of the identity provider's redirect back to the client.
//!
//! Magic-link and OAuth flows return to a callback route. Errors (expired or
//! reused links) arrive in the URL fragment; the intended destination arrives
//! as `next` in the query.

use crate::gate::{next_target_from_query, query_param, sign_in_url};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Continue to `next` once the session is picked up.
    Proceed { next: String },
    /// The link was rejected; send the visitor back to sign in.
    LinkExpired {
        error: String,
        description: Option<String>,
        retry: String,
    },
    /// No verified user behind the callback; sign in again.
    SignInRequired { retry: String },
}

impl CallbackOutcome {
    /// Where the visitor goes next.
    pub fn destination(&self) -> &str {
        match self {
            CallbackOutcome::Proceed { next } => next,
            CallbackOutcome::LinkExpired { retry, .. } | CallbackOutcome::SignInRequired { retry } => retry,
        }
    }
}

/// Interpret the callback URL alone. Never yields `SignInRequired`; that
/// needs the provider (see `SessionManager::complete_callback`).
pub fn resolve_callback(fragment: &str, query: &str, sign_in_path: &str) -> CallbackOutcome {
    let next = next_target_from_query(query);
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);

    match query_param(fragment, "error").filter(|e| !e.is_empty()) {
        Some(error) => {
            let description = query_param(fragment, "error_description").filter(|d| !d.is_empty());
            tracing::warn!(error = %error, "auth callback carried an error");
            CallbackOutcome::LinkExpired {
                error,
                description,
                retry: sign_in_url(sign_in_path, &next),
            }
        }
        None => CallbackOutcome::Proceed { next },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_callback_proceeds_to_next() {
        let outcome = resolve_callback("#access_token=abc&type=magiclink", "next=%2Fmissions", "/login");
        assert_eq!(outcome, CallbackOutcome::Proceed { next: "/missions".to_string() });
    }

    #[test]
    fn missing_next_defaults_to_root() {
        assert_eq!(
            resolve_callback("", "", "/login"),
            CallbackOutcome::Proceed { next: "/".to_string() }
        );
    }

    #[test]
    fn fragment_error_sends_back_to_sign_in_keeping_next() {
        let outcome = resolve_callback(
            "#error=access_denied&error_code=otp_expired&error_description=Email+link+is+invalid+or+has+expired",
            "next=%2Fpassport",
            "/login",
        );
        assert_eq!(
            outcome,
            CallbackOutcome::LinkExpired {
                error: "access_denied".to_string(),
                description: Some("Email link is invalid or has expired".to_string()),
                retry: "/login?next=%2Fpassport".to_string(),
            }
        );
    }
}
