//! REST client for the Unity Catalog and SQL Statement Execution APIs.

use super::types::{
    CatalogInfo, CatalogsPage, ExecuteStatementRequest, SchemaInfo, SchemasPage, ServiceError,
    StatementResponse, StatementResult, StatementState, TableSummary, TablesPage, TokenResponse,
};
use super::Workspace;
use crate::config::WorkspaceConfig;
use crate::error::{MigrateError, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const TOKEN_PATH: &str = "/oidc/v1/token";
const CATALOGS_PATH: &str = "/api/2.1/unity-catalog/catalogs";
const SCHEMAS_PATH: &str = "/api/2.1/unity-catalog/schemas";
const TABLES_PATH: &str = "/api/2.1/unity-catalog/tables";
const STATEMENTS_PATH: &str = "/api/2.0/sql/statements";

/// How long the server holds the submit call before handing back a
/// statement id to poll.
const STATEMENT_WAIT_TIMEOUT: &str = "10s";

/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(300);

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Authenticated client for one workspace, using OAuth machine-to-machine
/// credentials of a service principal.
pub struct WorkspaceClient {
    http: HttpClient,
    host: String,
    config: WorkspaceConfig,
    token: Mutex<Option<AccessToken>>,
    statement_timeout: Duration,
    poll_interval: Duration,
}

impl WorkspaceClient {
    /// Create a client. Authentication happens lazily on the first call.
    pub fn new(config: WorkspaceConfig, request_timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder().timeout(request_timeout).build()?;

        Ok(Self {
            http,
            host: config.host.trim_end_matches('/').to_string(),
            config,
            token: Mutex::new(None),
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Give up on a statement that has not finished after `timeout`.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Interval between status polls of a running statement.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    /// Return a cached bearer token, exchanging client credentials when the
    /// cached one is missing or about to expire.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting OAuth token from {}", self.host);
        let response = self
            .http
            .post(self.url(TOKEN_PATH))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "all-apis")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MigrateError::Auth {
                host: self.host.clone(),
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let token: TokenResponse = response.json().await?;
        let value = token.access_token.clone();
        *cached = Some(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Follow `next_page_token` until the listing is exhausted.
    async fn list_all<P>(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<P::Item>>
    where
        P: Page + DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page: P = match page_token.as_deref() {
                Some(token) => {
                    let mut params = query.to_vec();
                    params.push(("page_token", token));
                    self.get(path, &params).await?
                }
                None => self.get(path, query).await?,
            };
            let (mut batch, next) = page.into_parts();
            items.append(&mut batch);

            match next {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn cancel_statement(&self, statement_id: &str) {
        let result: Result<()> = async {
            let token = self.access_token().await?;
            let response = self
                .http
                .post(self.url(&format!("{}/{}/cancel", STATEMENTS_PATH, statement_id)))
                .bearer_auth(token)
                .send()
                .await?;
            check(response).await.map(|_| ())
        }
        .await;

        if let Err(e) = result {
            warn!("Failed to cancel statement {}: {}", statement_id, e);
        }
    }
}

#[async_trait]
impl Workspace for WorkspaceClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>> {
        self.list_all::<CatalogsPage>(CATALOGS_PATH, &[]).await
    }

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>> {
        self.list_all::<SchemasPage>(SCHEMAS_PATH, &[("catalog_name", catalog)])
            .await
    }

    async fn list_tables(&self, catalog: &str, schema: &str) -> Result<Vec<TableSummary>> {
        self.list_all::<TablesPage>(
            TABLES_PATH,
            &[
                ("catalog_name", catalog),
                ("schema_name", schema),
                ("omit_columns", "true"),
            ],
        )
        .await
    }

    async fn execute_statement(&self, statement: &str) -> Result<StatementResult> {
        let token = self.access_token().await?;
        let request = ExecuteStatementRequest {
            statement,
            warehouse_id: &self.config.warehouse_id,
            wait_timeout: STATEMENT_WAIT_TIMEOUT,
            on_wait_timeout: "CONTINUE",
            disposition: "INLINE",
            format: "JSON_ARRAY",
        };

        let response = self
            .http
            .post(self.url(STATEMENTS_PATH))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;
        let mut response: StatementResponse = check(response).await?.json().await?;

        let started = Instant::now();
        while !response.status.state.is_terminal() {
            if started.elapsed() >= self.statement_timeout {
                self.cancel_statement(&response.statement_id).await;
                return Err(MigrateError::StatementTimeout {
                    statement_id: response.statement_id,
                    waited_secs: self.statement_timeout.as_secs(),
                });
            }

            debug!(
                "Statement {} is {}, polling again in {:?}",
                response.statement_id, response.status.state, self.poll_interval
            );
            tokio::time::sleep(self.poll_interval).await;
            response = self
                .get(&format!("{}/{}", STATEMENTS_PATH, response.statement_id), &[])
                .await?;
        }

        match response.status.state {
            StatementState::Succeeded => Ok(StatementResult {
                statement_id: response.statement_id,
                rows: response.result.unwrap_or_default().data_array,
            }),
            state => Err(MigrateError::Statement {
                statement_id: response.statement_id,
                state: state.to_string(),
                message: response
                    .status
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
            }),
        }
    }
}

/// A page of a paged listing endpoint.
trait Page {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

impl Page for CatalogsPage {
    type Item = CatalogInfo;

    fn into_parts(self) -> (Vec<CatalogInfo>, Option<String>) {
        (self.catalogs, self.next_page_token)
    }
}

impl Page for SchemasPage {
    type Item = SchemaInfo;

    fn into_parts(self) -> (Vec<SchemaInfo>, Option<String>) {
        (self.schemas, self.next_page_token)
    }
}

impl Page for TablesPage {
    type Item = TableSummary;

    fn into_parts(self) -> (Vec<TableSummary>, Option<String>) {
        (self.tables, self.next_page_token)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(MigrateError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Render a Databricks error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ServiceError>(body) {
        Ok(err) if err.error_code.is_some() || err.message.is_some() => err.to_string(),
        _ => body.to_string(),
    }
}
