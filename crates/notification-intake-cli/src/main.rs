use notification_intake_cli::{run_cli, CliError};

#[tokio::main]
async fn main() {
    if let Err(e) = run_cli().await {
        eprintln!("error: {:#}", e);

        // Typed failures get distinct exit codes; anything else is 1
        let exit_code = e
            .downcast_ref::<CliError>()
            .map(CliError::exit_code)
            .unwrap_or(1);

        std::process::exit(exit_code);
    }
}
