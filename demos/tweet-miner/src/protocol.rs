//! JSON-lines request handling.

use capability_registry::CapabilityRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct Request {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Response {
    Ok { tool: String, output: String },
    Err { tool: Option<String>, error: String },
}

/// Handles one request line, always producing a response.
pub async fn handle_line(registry: &CapabilityRegistry, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            warn!(%err, "malformed request line");
            return Response::Err {
                tool: None,
                error: format!("Error: malformed request: {err}"),
            };
        }
    };

    match registry.invoke(&request.tool, request.arguments).await {
        Ok(output) => Response::Ok {
            tool: request.tool,
            output,
        },
        Err(err) => Response::Err {
            error: err.feedback(),
            tool: Some(request.tool),
        },
    }
}
