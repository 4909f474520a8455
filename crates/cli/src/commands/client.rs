//! `ctxlink client` — Drive a short conversation against a running server.

use ctxlink_config::AppConfig;
use ctxlink_core::context::Context;
use ctxlink_core::message::{Message, Payload, QueryOptions};
use ctxlink_gateway::client::Client;
use serde_json::json;
use tracing::{debug, info};

const DEFAULT_PROMPTS: [&str; 2] = ["What is the capital of France?", "Tell me more about it."];

/// Advisory options attached to every query.
fn query_options() -> QueryOptions {
    QueryOptions {
        temperature: Some(0.7),
        max_tokens: Some(50),
        ..QueryOptions::default()
    }
}

pub async fn run(
    config: &AppConfig,
    url: Option<String>,
    model: Option<String>,
    prompts: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = url.unwrap_or_else(|| format!("ws://127.0.0.1:{}", config.server.port));
    let model_id = model.unwrap_or_else(|| config.model.default_model_id.clone());
    let prompts = if prompts.is_empty() {
        DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect()
    } else {
        prompts
    };

    let mut client = Client::connect(&url).await?;
    info!(url = %url, model = %model_id, "Client connected");
    println!("Connected to {url}");

    let context = Context::new(model_id)
        .with_parameter("temperature", json!(0.7))
        .with_parameter("maxTokens", json!(100));
    let ack = client.request(&Message::init(Some(context))).await?;
    println!("{}", describe_reply(&ack));

    for prompt in prompts {
        println!("\n> {prompt}");
        debug!(prompt = %prompt, "Sending query");
        let reply = client
            .request(&Message::query_with_options(prompt, query_options()))
            .await?;
        println!("{}", describe_reply(&reply));
    }

    client.close().await?;
    info!("Client finished");
    Ok(())
}

/// Render a server reply for the terminal.
fn describe_reply(message: &Message) -> String {
    match &message.payload {
        Payload::Response(response) => {
            let mut out = response.text.clone();
            if let Some(meta) = &response.metadata {
                out.push_str(&format!(
                    "\n   [{} tokens, {}ms, model {}]",
                    meta.tokens, meta.processing_time, meta.model
                ));
            }
            if let Some(context) = &message.context {
                out.push_str(&format!("\n   history: {} entries", context.history.len()));
                if let Some(last) = context.last() {
                    out.push_str(&format!(", last at {}", last.timestamp));
                }
            }
            out
        }
        Payload::Error(error) => format!("❌ {}: {}", error.code, error.message),
        Payload::Init(status) | Payload::ContextUpdate(status) => {
            let model = message.context.as_ref().map(|c| c.model_id.as_str()).unwrap_or("-");
            format!("✅ {} ({model})", status.status.as_deref().unwrap_or("ok"))
        }
        Payload::Query(_) => "⚠️  unexpected query from server".to_string(),
    }
}
