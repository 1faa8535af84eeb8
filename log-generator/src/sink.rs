use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::info;

use crate::payload::SyntheticLog;

#[async_trait]
pub trait LogSink {
    async fn send(&self, record: &SyntheticLog) -> anyhow::Result<()>;
}

pub struct PrintSink {}

#[async_trait]
impl LogSink for PrintSink {
    async fn send(&self, record: &SyntheticLog) -> anyhow::Result<()> {
        info!("generated record: {:?}", record);
        Ok(())
    }
}

/// Posts each record to the ingestion endpoint, one request per record.
#[derive(Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    target: String,
}

impl HttpSink {
    pub fn new(target: String, timeout: Duration) -> anyhow::Result<HttpSink> {
        info!("posting generated logs to {}", target);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpSink { client, target })
    }
}

#[async_trait]
impl LogSink for HttpSink {
    async fn send(&self, record: &SyntheticLog) -> anyhow::Result<()> {
        let response = self.client.post(&self.target).json(record).send().await?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            bail!("ingestion endpoint answered {}: {}", status, body);
        }
        Ok(())
    }
}
