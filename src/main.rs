use docsummary::{api, config, logging, pipeline};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    config::init_config();
    logging::init_tracing();

    let settings = config::get_config();
    tracing::info!(
        processor = %settings.docai_processor,
        dataset = %settings.warehouse_dataset,
        table = %settings.warehouse_table,
        model = %settings.summary_model,
        "Starting document summarization service"
    );

    let app = api::create_router(Arc::new(pipeline::DocumentPipeline::new()));
    let (listener, port) = bind_listener(settings.server_port)
        .await
        .expect("Failed to bind listener");
    tracing::info!(port, "Accepting storage event deliveries");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}

/// Bind the configured port, or scan a small local range when none is set.
async fn bind_listener(configured: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    if let Some(port) = configured {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        return Ok((listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 8080..=8099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No free port in 8080-8099",
    ))
}
