use clap::Parser;
use kingmaker::cli::{check, diagnostic, registry, run, status, Cli, Commands};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    // Both tokio-tungstenite and reqwest pull in rustls; pick the provider once.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Check(args) => check::execute(&args.config),
        Commands::Status(args) => status::execute(args),
        Commands::Registry(args) => registry::execute(args).await,
    };

    if let Err(e) = result {
        eprintln!("{:?}", diagnostic::report(e));
        std::process::exit(1);
    }
}
