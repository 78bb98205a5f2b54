use invoice_service::config::{InvoiceConfig, RenderConfig, SalesforceConfig};
use invoice_service::services::crm::{CrmClient, MockCrmClient};
use invoice_service::startup::Application;
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct TestApp {
    pub http_address: String,
    pub crm: Arc<MockCrmClient>,
    pub events: mpsc::Sender<Value>,
}

pub fn test_config() -> InvoiceConfig {
    InvoiceConfig {
        common: CoreConfig { port: 0 },
        salesforce: SalesforceConfig {
            login_url: "https://login.test.local".to_string(),
            api_version: "58.0".to_string(),
            username: "test@example.com".to_string(),
            password: "secret".to_string(),
            request_topic: "Invoice_Request__e".to_string(),
            response_object: "Invoice_Response__e".to_string(),
        },
        render: RenderConfig {
            logo_path: "assets/logo.png".to_string(),
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let crm = Arc::new(MockCrmClient::new());
        let events = crm.sender();

        let crm_client: Arc<dyn CrmClient> = crm.clone();
        let app = Application::build(test_config(), Some(crm_client))
            .await
            .expect("Failed to build test application");
        let http_address = format!("http://127.0.0.1:{}", app.port());
        let health_url = format!("{}/health", http_address);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the HTTP server to come up.
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            http_address,
            crm,
            events,
        }
    }

    /// Poll until the mock has captured `count` created records.
    pub async fn wait_for_created(&self, count: usize) -> Vec<(String, Value)> {
        for _ in 0..100 {
            let created = self.crm.created();
            if created.len() >= count {
                return created;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!(
            "timed out waiting for {} created records, have {}",
            count,
            self.crm.created().len()
        );
    }
}
