use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    correlate::app::startup::startup().await
}
