//! Root endpoint handler for the landing page.
//!
//! This module provides the `/` endpoint handler that displays
//! a minimal landing page linking to the metrics endpoint.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");
    Html(landing_page(state.config.telemetry_path()))
}

/// Renders the landing page HTML.
pub fn landing_page(metrics_path: &str) -> String {
    format!(
        r#"<html>
<head><title>Old Lib Exporter</title></head>
<body>
<h1>Old Lib Exporter</h1>
<p><a href='{metrics_path}'>Metrics</a></p>
</body>
</html>
"#
    )
}
