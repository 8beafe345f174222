use std::sync::Arc;

use axum::{extract::State, response::Html};

use crate::router::ExporterState;

pub async fn index_page(State(state): State<Arc<ExporterState>>) -> Html<String> {
    Html(render_index(&state.telemetry_path))
}

fn render_index(telemetry_path: &str) -> String {
    let href = escape_attribute(telemetry_path);
    format!(
        "<html>\n\
         <head><title>AWS SES Exporter</title></head>\n\
         <body>\n\
         <h1>AWS SES Exporter</h1>\n\
         <p><a href='{href}'>Metrics</a></p>\n\
         </body>\n\
         </html>\n"
    )
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('\'', "&#39;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::render_index;

    #[test]
    fn links_to_telemetry_path() {
        let page = render_index("/metrics");
        assert!(page.contains("<title>AWS SES Exporter</title>"));
        assert!(page.contains("<a href='/metrics'>Metrics</a>"));
    }

    #[test]
    fn escapes_path_in_link() {
        let page = render_index("/m'<x>");
        assert!(page.contains("href='/m&#39;&lt;x&gt;'"));
    }
}
