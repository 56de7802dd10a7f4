use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use crate::common::error::{Error, Result};
use crate::config::subscription::{self, ParseReport};

/// 路由器控制 API
#[async_trait]
pub trait RouterApi: Send + Sync {
    /// `GET /configs`
    async fn fetch_config(&self) -> Result<Value>;
    /// 试写配置，失败表示路由器拒绝该文档
    async fn verify_config(&self, doc: &Value) -> Result<()>;
    /// `PUT /configs`
    async fn write_config(&self, doc: &Value) -> Result<()>;
    /// `POST /restart`
    async fn restart(&self) -> Result<()>;
}

/// reqwest 实现
pub struct HttpRouterClient {
    client: reqwest::Client,
    base_url: String,
    secret: Option<String>,
}

impl HttpRouterClient {
    pub fn new(base_url: &str, secret: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.filter(|s| !s.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.secret {
            Some(secret) => req.bearer_auth(secret),
            None => req,
        }
    }

    async fn put_config(&self, doc: &Value) -> Result<()> {
        let resp = self
            .request(Method::PUT, "/configs")
            .json(doc)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl RouterApi for HttpRouterClient {
    async fn fetch_config(&self) -> Result<Value> {
        let resp = self.request(Method::GET, "/configs").send().await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn verify_config(&self, doc: &Value) -> Result<()> {
        // 路由器没有单独的校验接口，试写即校验
        self.put_config(doc).await
    }

    async fn write_config(&self, doc: &Value) -> Result<()> {
        self.put_config(doc).await
    }

    async fn restart(&self) -> Result<()> {
        let resp = self.request(Method::POST, "/restart").send().await?;
        check_status(resp).await?;
        Ok(())
    }
}

async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::RouterStatus {
        status: status.as_u16(),
        body,
    })
}

/// 下载订阅并解析出节点
pub async fn fetch_subscription(url: &str) -> Result<ParseReport> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let resp = client.get(url).send().await?;
    let body = check_status(resp).await?.text().await?;
    let report = subscription::parse_subscription(&body);
    debug!(
        url = url,
        nodes = report.nodes.len(),
        skipped = report.skipped,
        "subscription fetched"
    );
    Ok(report)
}
