use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use patchwire::{Body, Engine, MemorySession, PatchwireError, RequestContext, StreamContext};

async fn report(mut sse: StreamContext) -> Result<(), PatchwireError> {
    for step in 1..=5 {
        sse.state("progress", step * 20)?;
        sse.append("#log", &format!("<li>step {step} done</li>"))?;
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    sse.redirect("/reports/latest")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let engine = Engine::default();
    let request = RequestContext::new("/reports", "localhost:8080").with_protocol();

    let mut response = engine.begin(Arc::new(request));
    response.with_session(Arc::new(MemorySession::new()));
    response.state("progress", 0)?;
    response.stream(report)?;

    let http = response.finalize()?;
    let Body::Stream(mut body) = http.body else {
        return Ok(());
    };
    while let Some(chunk) = body.next().await {
        print!("{}", String::from_utf8_lossy(&chunk));
    }

    Ok(())
}
