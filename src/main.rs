use clap::Parser;
use retire::api::{Cli, Command, run_http_server, run_project};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("retire=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve(args) => {
            if let Err(e) = run_http_server(args.into()).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Project(args) => match run_project(&args) {
            Ok(projection) => match serde_json::to_string_pretty(&projection) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Failed to encode projection: {e}");
                    std::process::exit(1);
                }
            },
            Err(errors) => {
                for error in &errors {
                    eprintln!("{}", error.message);
                }
                std::process::exit(2);
            }
        },
    }
}
