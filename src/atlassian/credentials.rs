//! Per-product credential resolution

use super::types::{MissingCredential, Product};
use crate::config::AtlassianConfig;

/// The effective (domain, email, token) triple for one product.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub domain: String,
    pub email: String,
    pub token: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("domain", &self.domain)
            .field("email", &self.email)
            .field("token", &"***")
            .finish()
    }
}

/// Pick the credential for `product`.
///
/// The product-specific token wins over the legacy shared `api_token`.
/// Blank values are treated as absent.
pub fn resolve_credential(
    config: &AtlassianConfig,
    product: Product,
) -> Result<Credential, MissingCredential> {
    let domain = non_blank(Some(&config.domain)).ok_or(MissingCredential::Field("domain"))?;
    let email = non_blank(Some(&config.email)).ok_or(MissingCredential::Field("email"))?;

    let product_token = match product {
        Product::Confluence => config.confluence_token.as_ref(),
        Product::Jira => config.jira_token.as_ref(),
    };

    let token = non_blank(product_token)
        .or_else(|| non_blank(config.api_token.as_ref()))
        .ok_or(MissingCredential::Token(product))?;

    Ok(Credential {
        domain: domain.to_string(),
        email: email.to_string(),
        token: token.to_string(),
    })
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}
