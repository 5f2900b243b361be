//! Gateway client

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::types::DapnetCall;
use crate::config::GatewayConfig;
use crate::error::{PassError, PassResult};

/// Outbound message sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message. Errors are always [`PassError::Delivery`].
    async fn send(&self, text: &str) -> PassResult<()>;
}

pub struct DapnetClient {
    client: Client,
    url: String,
    username: String,
    password: String,
    call_signs: Vec<String>,
    transmitter_groups: Vec<String>,
    emergency: bool,
}

impl DapnetClient {
    pub fn new(config: &GatewayConfig) -> PassResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("pass-pager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PassError::Delivery(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            call_signs: config.call_signs.clone(),
            transmitter_groups: config.transmitter_groups.clone(),
            emergency: config.emergency,
        })
    }

    pub fn call(&self, text: &str) -> DapnetCall {
        DapnetCall::new(
            text,
            self.call_signs.clone(),
            self.transmitter_groups.clone(),
            self.emergency,
        )
    }
}

#[async_trait]
impl Notifier for DapnetClient {
    async fn send(&self, text: &str) -> PassResult<()> {
        let call = self.call(text);

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&call)
            .send()
            .await
            .map_err(|e| PassError::Delivery(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PassError::Delivery(format!(
                "gateway answered {}: {}",
                status,
                body.trim()
            )));
        }

        tracing::info!("[DAPNET] Sent to {:?} via {:?}: '{}'", call.call_sign_names, call.transmitter_group_names, text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> GatewayConfig {
        GatewayConfig {
            url: url.to_string(),
            username: "f4abc".to_string(),
            password: "secret".to_string(),
            call_signs: vec!["f4abc".to_string(), "f4xyz".to_string()],
            transmitter_groups: vec!["f-53".to_string()],
            emergency: true,
            timeout_secs: 2,
        }
    }

    #[test]
    fn test_call_carries_recipients() {
        let client = DapnetClient::new(&config("http://127.0.0.1:9/api/calls")).unwrap();
        let call = client.call("ISS end 21:17");

        assert_eq!(call.text, "ISS end 21:17");
        assert_eq!(call.call_sign_names, vec!["f4abc", "f4xyz"]);
        assert_eq!(call.transmitter_group_names, vec!["f-53"]);
        assert!(call.emergency);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_delivery_failure() {
        let client = DapnetClient::new(&config("http://127.0.0.1:9/api/calls")).unwrap();

        match client.send("ISS visible 21:07").await {
            Err(PassError::Delivery(message)) => assert!(message.contains("127.0.0.1:9")),
            other => panic!("expected Delivery, got {:?}", other),
        }
    }
}
