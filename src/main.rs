use std::env;

#[tokio::main]
async fn main() {
    fire_bridge::logging::init_logging("info");

    let raw_args: Vec<String> = env::args().collect();
    match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = fire_bridge::api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Some("evaluate") => match fire_bridge::api::run_cli(&raw_args[1..]) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(2);
            }
        },
        _ => {
            eprintln!("Usage: fire-bridge serve [port]");
            eprintln!("       fire-bridge evaluate [--flags ...]   (see `evaluate --help`)");
            std::process::exit(1);
        }
    }
}
