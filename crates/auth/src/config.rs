//! Session and gate configuration.
//!
//! Defaults match the web client's routes. `from_env` reads overrides and
//! falls back to the default (with a warning) on anything it cannot use.

use core::str::FromStr;

use sahara_core::DomainError;

use crate::Role;
use crate::storage::AuthNamespace;

/// Gate policy (see [`crate::gate`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatePolicy {
    /// Only require a signed-in identity; ignore roles and provisioning.
    AuthenticationOnly,
    /// Check roles, but let unprovisioned identities through.
    RoleChecked,
    /// Require a profile and check roles. Staff bypass roles, not the profile.
    #[default]
    RoleAndProfileRequired,
}

impl GatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatePolicy::AuthenticationOnly => "authentication-only",
            GatePolicy::RoleChecked => "role-checked",
            GatePolicy::RoleAndProfileRequired => "role-and-profile",
        }
    }
}

impl FromStr for GatePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "authentication-only" => Ok(GatePolicy::AuthenticationOnly),
            "role-checked" => Ok(GatePolicy::RoleChecked),
            "role-and-profile" => Ok(GatePolicy::RoleAndProfileRequired),
            other => Err(DomainError::validation(format!("unknown gate policy '{other}'"))),
        }
    }
}

/// Session manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Sign-in entry point; sign-out always ends here.
    pub sign_in_path: String,
    /// Where the password-reset email sends the user back to.
    pub password_reset_redirect: String,
    /// Storage key prefixes owned by the identity provider's client library.
    pub auth_key_prefixes: Vec<String>,
    /// Durable storage key of the role hint.
    pub role_hint_key: String,
    /// Landing page after an interactive password sign-in.
    pub post_sign_in_path: String,
    /// Role given to identities provisioned from the auth callback.
    pub default_role: Role,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sign_in_path: "/login".to_string(),
            password_reset_redirect: "/reset-password".to_string(),
            auth_key_prefixes: vec!["supabase.auth.".to_string(), "sb-".to_string()],
            role_hint_key: "sahara.session-hint".to_string(),
            post_sign_in_path: "/".to_string(),
            default_role: Role::Talent,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = non_blank(lookup("SAHARA_SIGN_IN_PATH")) {
            config.sign_in_path = path;
        }
        if let Some(path) = non_blank(lookup("SAHARA_RESET_REDIRECT")) {
            config.password_reset_redirect = path;
        }
        if let Some(raw) = lookup("SAHARA_AUTH_KEY_PREFIXES") {
            let prefixes: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if prefixes.is_empty() {
                tracing::warn!("SAHARA_AUTH_KEY_PREFIXES is empty; keeping defaults");
            } else {
                config.auth_key_prefixes = prefixes;
            }
        }
        config
    }

    pub fn with_sign_in_path(mut self, path: impl Into<String>) -> Self {
        self.sign_in_path = path.into();
        self
    }

    pub fn with_auth_key_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth_key_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn auth_namespace(&self) -> AuthNamespace {
        AuthNamespace::new(self.auth_key_prefixes.iter().cloned())
    }
}

/// Route gate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub sign_in_path: String,
    pub pending_path: String,
    pub unauthorized_path: String,
    pub policy: GatePolicy,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            sign_in_path: "/login".to_string(),
            pending_path: "/pending-approval".to_string(),
            unauthorized_path: "/unauthorized".to_string(),
            policy: GatePolicy::default(),
        }
    }
}

impl GateConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = non_blank(lookup("SAHARA_SIGN_IN_PATH")) {
            config.sign_in_path = path;
        }
        if let Some(raw) = lookup("SAHARA_GATE_POLICY") {
            match raw.parse() {
                Ok(policy) => config.policy = policy,
                Err(err) => tracing::warn!(
                    error = %err,
                    fallback = config.policy.as_str(),
                    "ignoring SAHARA_GATE_POLICY"
                ),
            }
        }
        config
    }

    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.policy = policy;
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn session_config_reads_overrides() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("SAHARA_SIGN_IN_PATH", "/auth"),
            ("SAHARA_AUTH_KEY_PREFIXES", "app.auth., sb-"),
        ]));
        assert_eq!(config.sign_in_path, "/auth");
        assert_eq!(config.auth_key_prefixes, vec!["app.auth.", "sb-"]);
        assert_eq!(config.password_reset_redirect, "/reset-password");
    }

    #[test]
    fn builders_override_paths_and_namespace() {
        let config = SessionConfig::default()
            .with_sign_in_path("/connexion")
            .with_auth_key_prefixes(["app.auth."]);

        assert_eq!(config.sign_in_path, "/connexion");
        let namespace = config.auth_namespace();
        assert!(namespace.matches("app.auth.token"));
        assert!(!namespace.matches("sb-refresh"));
    }

    #[test]
    fn blank_overrides_keep_defaults() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("SAHARA_SIGN_IN_PATH", "  "),
            ("SAHARA_AUTH_KEY_PREFIXES", " , "),
        ]));
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn gate_policy_parses_and_bad_values_fall_back() {
        let config = GateConfig::from_lookup(lookup(&[("SAHARA_GATE_POLICY", "role-checked")]));
        assert_eq!(config.policy, GatePolicy::RoleChecked);

        let config = GateConfig::from_lookup(lookup(&[("SAHARA_GATE_POLICY", "anything")]));
        assert_eq!(config.policy, GatePolicy::RoleAndProfileRequired);
    }
}
