//! Per-event processing: parse → render → encode → publish.
//!
//! Every inbound event runs on its own task; a failure in any stage drops
//! that event only, the subscription keeps receiving.

use crate::config::InvoiceConfig;
use crate::models::{Invoice, ParseError};
use crate::render::{render_invoice, RenderError};
use crate::services::crm::{CrmClient, CrmError};
use crate::services::encode::Base64StreamEncoder;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

const STREAM_CHUNK_SIZE: usize = 8 * 1024;

/// Tagged per-stage failure. Logged and dropped by the pipeline loop;
/// nothing is retried and no failure event is emitted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("payload parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("publish failed: {0}")]
    Publish(#[from] CrmError),
}

/// Subscribe to the request topic and process events until the subscription
/// channel closes.
pub async fn run_pipeline(crm: Arc<dyn CrmClient>, config: InvoiceConfig) {
    let topic = config.salesforce.request_topic.clone();
    let mut events = match crm.subscribe(&topic).await {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(error = %e, topic = %topic, "subscription failed; no inbound events will be processed");
            return;
        }
    };
    tracing::info!(topic = %topic, "subscribed to invoice request topic");

    while let Some(payload) = events.recv().await {
        let crm = Arc::clone(&crm);
        let config = config.clone();
        tokio::spawn(async move {
            match process_event(crm.as_ref(), &config, payload).await {
                Ok(record_id) => {
                    tracing::info!(record_id = %record_id, "invoice response published");
                }
                Err(e) => {
                    tracing::error!(error = %e, "invoice event dropped");
                }
            }
        });
    }
    tracing::warn!(topic = %topic, "subscription channel closed");
}

/// Run one event through the full pipeline. Returns the created response
/// record's id.
pub async fn process_event(
    crm: &dyn CrmClient,
    config: &InvoiceConfig,
    payload: Value,
) -> Result<String, PipelineError> {
    let invoice = Invoice::from_payload(&payload)?;

    let logo = tokio::fs::read(&config.render.logo_path)
        .await
        .map_err(|e| RenderError::Logo(format!("{}: {}", config.render.logo_path, e)))?;

    // Render on a blocking task, streaming the document bytes out in
    // chunks; the async side encodes each chunk as it lands and awaits
    // stream completion before publishing.
    let (tx, mut chunks) = mpsc::channel::<Vec<u8>>(8);
    let render_input = invoice.clone();
    let render_task = tokio::task::spawn_blocking(move || -> Result<(), RenderError> {
        let bytes = render_invoice(&render_input, &logo)?;
        for chunk in bytes.chunks(STREAM_CHUNK_SIZE) {
            if tx.blocking_send(chunk.to_vec()).is_err() {
                break;
            }
        }
        Ok(())
    });

    let mut encoder = Base64StreamEncoder::new();
    while let Some(chunk) = chunks.recv().await {
        encoder.push(&chunk);
    }
    render_task
        .await
        .map_err(|e| RenderError::Aborted(e.to_string()))??;
    let encoded = encoder.finish();

    let mut fields = serde_json::Map::new();
    fields.insert(
        "Invoice_PDF_Base64__c".to_string(),
        Value::String(encoded),
    );
    fields.insert(
        invoice.correlation.field_name().to_string(),
        Value::String(invoice.correlation.value().to_string()),
    );
    fields.insert(
        "Invoice_Number__c".to_string(),
        Value::String(invoice.invoice_number.clone()),
    );

    let result = crm
        .create_record(&config.salesforce.response_object, Value::Object(fields))
        .await?;
    Ok(result.id.unwrap_or_default())
}
