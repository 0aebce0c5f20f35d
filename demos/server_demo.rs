use std::sync::Arc;

use patchwire::{EngineBuilder, EngineConfig, RequestContext, Response, StaticTemplates};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let templates = StaticTemplates::new()
        .with_template("todo", "<li id=\"todo-{{ id }}\">{{ title }}</li>")
        .with_fragment("todos", "counter", "<span id=\"counter\">{{ open }} open</span>");
    let templates = Arc::new(templates);

    let engine = EngineBuilder::new()
        .with_config(EngineConfig::default())
        .with_templates(templates.clone())
        .with_fragments(templates)
        .build();

    for request in [
        RequestContext::new("/todos", "localhost:8080").with_protocol(),
        RequestContext::new("/todos", "localhost:8080"),
    ] {
        let mut response = engine.begin(Arc::new(request));
        response.fallback(Response::html("<h1>Todos</h1>"));
        response
            .view(
                "todo",
                json!({"id": 3, "title": "Write docs"}),
                patchwire::ElementPatch::at("#todos", patchwire::PatchMode::Append),
            )?
            .fragment("todos", "counter", json!({"open": 3}), Default::default())?
            .errors(json!({}))?;

        let http = response.finalize()?;
        tracing::info!("status {} headers {:?}", http.status, http.headers);
        let body = http.body.into_bytes().await;
        println!("{}", String::from_utf8_lossy(&body));
    }

    Ok(())
}
