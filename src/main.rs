mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use deployspec::framework::ReconcileOptions;
use deployspec::runtime::{apply, aws_reconciler, dry_run_reconciler, setup_tracing};

#[tokio::main]
async fn main() {
    setup_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply(args) => {
            let reconciler = if args.dryrun {
                dry_run_reconciler()
            } else {
                aws_reconciler(cli.region, cli.profile).await
            };
            let opts = ReconcileOptions {
                dry_run: args.dryrun,
            };
            let app_spec = apply(&reconciler, &args.file, &opts).await?;
            print!("{app_spec}");
        }
    }

    Ok(())
}
