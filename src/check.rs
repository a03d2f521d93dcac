//! Connection self-check: one small listing per product with the configured
//! credentials.

use crate::atlassian::{AtlassianError, AtlassianService, Product};

const CHECK_LIMIT: u32 = 5;

/// Outcome of the check for one product.
#[derive(Debug)]
pub struct ProductCheck {
    pub product: Product,
    pub result: Result<Vec<String>, AtlassianError>,
}

impl ProductCheck {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }

    /// The PASS/FAIL line printed for this product.
    pub fn summary(&self) -> String {
        match &self.result {
            Ok(keys) if keys.is_empty() => format!("PASS {}: connected, nothing visible", self.product),
            Ok(keys) => format!("PASS {}: {}", self.product, keys.join(", ")),
            Err(e) => format!("FAIL {}: [{}] {}", self.product, e.kind(), e),
        }
    }
}

pub async fn run_checks(service: &AtlassianService) -> Vec<ProductCheck> {
    let confluence = service
        .confluence_list_spaces(Some(CHECK_LIMIT))
        .await
        .map(|spaces| spaces.into_iter().map(|s| s.key).collect());
    let jira = service
        .jira_list_projects(Some(CHECK_LIMIT))
        .await
        .map(|projects| projects.into_iter().map(|p| p.key).collect());

    vec![
        ProductCheck {
            product: Product::Confluence,
            result: confluence,
        },
        ProductCheck {
            product: Product::Jira,
            result: jira,
        },
    ]
}

/// Line naming the site and account the checks run against.
pub fn target_line(service: &AtlassianService) -> String {
    let config = service.config();
    format!(
        "Checking https://{} as {} (timeout {:?})",
        config.domain, config.email, config.timeout
    )
}

/// Run every check, print one line per product to stdout and report whether
/// all of them passed.
pub async fn check_connection(service: &AtlassianService) -> bool {
    println!("{}", target_line(service));
    let checks = run_checks(service).await;
    for check in &checks {
        if let Err(e) = &check.result {
            tracing::error!("{} check failed: {}", check.product, e);
        }
        println!("{}", check.summary());
    }
    checks.iter().all(ProductCheck::passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlassian::{AtlassianClient, FailureKind};
    use crate::config::AtlassianConfig;
    use mockito::Matcher;
    use std::sync::Arc;
    use std::time::Duration;

    fn service(base_url: &str, jira_token: Option<&str>) -> AtlassianService {
        let config = Arc::new(AtlassianConfig {
            domain: "acme.atlassian.net".into(),
            email: "dev@acme.com".into(),
            confluence_token: Some("conf".into()),
            jira_token: jira_token.map(String::from),
            api_token: None,
            timeout: Duration::from_secs(5),
        });
        let client = AtlassianClient::new(config.timeout).with_base_url(base_url);
        AtlassianService::with_client(config, client)
    }

    #[test]
    fn test_target_line_names_site_without_secrets() {
        let line = target_line(&service("http://127.0.0.1:1", Some("jira-secret")));
        assert_eq!(line, "Checking https://acme.atlassian.net as dev@acme.com (timeout 5s)");
        assert!(!line.contains("secret"));
    }

    #[tokio::test]
    async fn test_both_products_pass() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/wiki/rest/api/space")
            .match_query(Matcher::UrlEncoded("limit".into(), "5".into()))
            .with_status(200)
            .with_body(r#"{"results": [{"id": 1, "key": "ENG", "name": "Engineering"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/rest/api/3/project")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"id": "1", "key": "PROJ", "name": "Project"}, {"id": "2", "key": "OPS", "name": "Ops"}]"#)
            .create_async()
            .await;

        let checks = run_checks(&service(&server.url(), Some("jira"))).await;
        assert!(checks.iter().all(ProductCheck::passed));
        assert_eq!(checks[0].summary(), "PASS Confluence: ENG");
        assert_eq!(checks[1].summary(), "PASS Jira: PROJ, OPS");
    }

    #[tokio::test]
    async fn test_missing_jira_token_fails_jira_only() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/wiki/rest/api/space")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"results": []}"#)
            .create_async()
            .await;

        let service = service(&server.url(), None);
        let checks = run_checks(&service).await;

        assert!(checks[0].passed());
        assert_eq!(checks[0].summary(), "PASS Confluence: connected, nothing visible");

        let jira = checks[1].result.as_ref().unwrap_err();
        assert_eq!(jira.kind(), FailureKind::MissingCredential);
        assert!(checks[1].summary().starts_with("FAIL Jira: [missing_credential]"));
        assert!(!check_connection(&service).await);
    }
}
