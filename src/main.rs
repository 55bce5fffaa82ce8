use std::env;

#[tokio::main]
async fn main() {
    let raw_args: Vec<String> = env::args().collect();
    let command = raw_args.get(1).cloned();
    match command.as_deref() {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = firecalc::api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Some("project") => {
            if let Err(e) = firecalc::api::run_cli_projection(raw_args.into_iter().skip(1)) {
                eprintln!("Error: {e}");
                std::process::exit(2);
            }
        }
        _ => {
            eprintln!("Usage: firecalc serve [port]");
            eprintln!("       firecalc project [--current-assets N --monthly-contribution N ...]");
            std::process::exit(1);
        }
    }
}
