//! Descriptive metadata for API documentation generators.

use serde::Serialize;
use serde_json::{Value, json};

use crate::config::SessionAuthConfig;

/// An OpenAPI 3.1 security scheme object describing cookie session authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub description: String,
}

impl SecurityScheme {
    #[must_use]
    pub fn session_cookie() -> Self {
        Self {
            scheme_type: "apiKey".to_string(),
            name: "Set-Cookie".to_string(),
            location: "cookie".to_string(),
            description: "Session cookie authentication.".to_string(),
        }
    }
}

impl SessionAuthConfig {
    #[must_use]
    pub fn security_scheme_name(&self) -> &str {
        &self.security_scheme_name
    }

    /// `{"securitySchemes": {<name>: <scheme>}}`, ready to merge into an OpenAPI `components`
    /// object.
    #[must_use]
    pub fn openapi_components(&self) -> Value {
        json!({
            "securitySchemes": {
                self.security_scheme_name(): SecurityScheme::session_cookie(),
            }
        })
    }

    /// `{<name>: []}`, for the top-level or per-operation `security` list.
    #[must_use]
    pub fn security_requirement(&self) -> Value {
        json!({ self.security_scheme_name(): [] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_components() {
        let config = SessionAuthConfig::default();

        assert_eq!(
            config.openapi_components(),
            json!({
                "securitySchemes": {
                    "sessionCookie": {
                        "type": "apiKey",
                        "name": "Set-Cookie",
                        "in": "cookie",
                        "description": "Session cookie authentication.",
                    }
                }
            })
        );
        assert_eq!(config.security_requirement(), json!({ "sessionCookie": [] }));
    }

    #[test]
    fn custom_scheme_name() {
        let config = SessionAuthConfig::default().with_security_scheme_name("cookieAuth");

        assert!(config.openapi_components()["securitySchemes"]["cookieAuth"].is_object());
        assert_eq!(config.security_requirement(), json!({ "cookieAuth": [] }));
    }
}
