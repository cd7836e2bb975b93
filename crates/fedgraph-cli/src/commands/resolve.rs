use crate::gateway::build_context;
use crate::support::{exit_with_error, load_config_or_exit, load_fragments_or_exit, print_json};
use fedgraph_entity::RequestContext;
use serde_json::{Value, json};
use std::fs;
use std::io::Read;
use std::time::Duration;

fn read_representations(source: &str) -> Result<Vec<Value>, String> {
    let text = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        buffer
    } else {
        fs::read_to_string(source).map_err(|e| format!("failed to read {source}: {e}"))?
    };

    match serde_json::from_str(&text) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(single @ Value::Object(_)) => Ok(vec![single]),
        Ok(_) => Err("representations must be a JSON object or array".to_string()),
        Err(e) => Err(format!("invalid representations JSON: {e}")),
    }
}

pub fn run(representations: String, config: String, timeout_ms: Option<u64>) {
    let gateway = load_config_or_exit(&config);
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| gateway.resolution_timeout());
    let loaded = load_fragments_or_exit(&gateway);
    let context = build_context(loaded).unwrap_or_else(|e| exit_with_error(e));
    let representations =
        read_representations(&representations).unwrap_or_else(|e| exit_with_error(e));

    let request = RequestContext::new().with_timeout(timeout);
    tracing::info!(
        request_id = %request.request_id,
        references = representations.len(),
        timeout_ms = timeout.as_millis() as u64,
        "resolving references"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| exit_with_error(format!("failed to create tokio runtime: {e}")));
    let results = runtime.block_on(context.resolve(representations, &request));

    let payload: Vec<Value> = results
        .into_iter()
        .map(|result| match result {
            Ok(resolution) => serde_json::to_value(&resolution).expect("json serialization"),
            Err(error) => json!({
                "status": "error",
                "code": error.code(),
                "message": error.to_string(),
            }),
        })
        .collect();
    print_json(&payload);
}
