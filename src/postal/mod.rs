use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

pub const DEFAULT_BASE_URL: &str = "https://viacep.com.br";

/// Advisory address suggestion from an 8-digit postal code. Every failure
/// mode (bad code, transport error, malformed body, "not found" marker)
/// degrades to `None`; a submission never depends on this client.
#[derive(Clone)]
pub struct PostalClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq, ToSchema)]
pub struct PostalAddress {
    #[schema(example = "Praça da Sé")]
    pub street: String,
    #[schema(example = "Sé")]
    pub neighborhood: String,
    #[schema(example = "São Paulo")]
    pub municipality: String,
    #[schema(example = "SP")]
    pub region: String,
}

#[derive(Debug, Deserialize)]
struct LookupBody {
    logradouro: Option<String>,
    bairro: Option<String>,
    localidade: Option<String>,
    uf: Option<String>,
    // present (as bool or string, depending on the service) only on misses
    erro: Option<serde_json::Value>,
}

impl PostalClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub async fn lookup(&self, raw_code: &str) -> Option<PostalAddress> {
        let code = normalize_code(raw_code)?;
        let url = format!("{}/ws/{}/json/", self.base_url, code);

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("postal lookup transport failure: {e}");
                return None;
            }
        };

        let body: LookupBody = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("postal lookup returned malformed body: {e}");
                return None;
            }
        };

        if body.erro.is_some() {
            tracing::debug!("postal code {code} not found");
            return None;
        }

        Some(PostalAddress {
            street: body.logradouro.unwrap_or_default(),
            neighborhood: body.bairro.unwrap_or_default(),
            municipality: body.localidade.unwrap_or_default(),
            region: body.uf.unwrap_or_default(),
        })
    }
}

/// Strips non-digit separators; anything other than exactly 8 digits is
/// not a postal code.
fn normalize_code(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() == 8).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_are_stripped() {
        assert_eq!(normalize_code("01.001-000"), Some("01001000".to_string()));
        assert_eq!(normalize_code(" 01001000 "), Some("01001000".to_string()));
    }

    #[test]
    fn wrong_length_codes_are_rejected() {
        assert_eq!(normalize_code("123"), None);
        assert_eq!(normalize_code("123456789"), None);
        assert_eq!(normalize_code("abcdefgh"), None);
    }

    #[test]
    fn error_marker_body_parses_as_a_miss() {
        let body: LookupBody = serde_json::from_str(r#"{"erro": true}"#).unwrap();
        assert!(body.erro.is_some());

        let body: LookupBody = serde_json::from_str(r#"{"erro": "true"}"#).unwrap();
        assert!(body.erro.is_some());
    }

    #[test]
    fn successful_body_parses_the_address_tuple() {
        let body: LookupBody = serde_json::from_str(
            r#"{"cep": "01001-000", "logradouro": "Praça da Sé",
                "bairro": "Sé", "localidade": "São Paulo", "uf": "SP"}"#,
        )
        .unwrap();
        assert!(body.erro.is_none());
        assert_eq!(body.localidade.as_deref(), Some("São Paulo"));
    }

    #[tokio::test]
    async fn short_code_short_circuits_without_network() {
        let client = PostalClient::new("http://127.0.0.1:1");
        assert_eq!(client.lookup("123").await, None);
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_none() {
        let client = PostalClient::new("http://127.0.0.1:1");
        assert_eq!(client.lookup("01001000").await, None);
    }
}
