use anyhow::Result;
use std::process;
use log::error;
use flowq::{app, cli, logging};
use flowq::cli::Commands;

fn main() {
    if let Err(e) = run() {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::args::parse_args();

    cli::args::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    // The server serves every connection concurrently; demo and client only
    // need a runtime to wait on blocking work and stdin.
    let runtime = match &args.command {
        Commands::Serve(_) => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?,
        Commands::Demo(_) | Commands::Client(_) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?,
    };

    runtime.block_on(async {
        match &args.command {
            Commands::Demo(demo) => {
                let outcome = app::run_demo(demo, &config_manager).await?;
                println!();
                print!("{}", outcome.render());
                Ok(())
            }
            Commands::Serve(serve) => app::run_server(serve, &config_manager).await,
            Commands::Client(client) => app::run_client(client, &config_manager).await,
        }
    })
}
