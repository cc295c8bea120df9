use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deployspec")]
#[command(about = "Reconcile a deploy spec against AWS Lambda and ECS")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// AWS region (overrides the ambient AWS configuration)
    #[arg(long, global = true, env = "AWS_REGION")]
    pub region: Option<String>,

    /// AWS shared config profile
    #[arg(long, global = true, env = "AWS_PROFILE")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy the resources of a deploy spec and print the resulting app spec
    Apply(ApplyArgs),
}

#[derive(clap::Args)]
pub struct ApplyArgs {
    /// Path to the deploy spec YAML
    #[arg(short, long, env = "DEPLOYSPEC_FILE")]
    pub file: PathBuf,
    /// Resolve the app spec without calling AWS
    #[arg(long)]
    pub dryrun: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_flags() {
        let cli = Cli::try_parse_from([
            "deployspec",
            "--region",
            "eu-west-1",
            "apply",
            "--file",
            "spec.yaml",
            "--dryrun",
        ])
        .unwrap();

        assert_eq!(cli.region.as_deref(), Some("eu-west-1"));
        let Commands::Apply(args) = cli.command;
        assert_eq!(args.file, PathBuf::from("spec.yaml"));
        assert!(args.dryrun);
    }

    #[test]
    fn test_apply_defaults_to_live_run() {
        let cli = Cli::try_parse_from(["deployspec", "apply", "-f", "spec.yaml"]).unwrap();
        let Commands::Apply(args) = cli.command;
        assert!(!args.dryrun);
    }
}
