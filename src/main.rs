use anyhow::Result;
use clap::Parser;
use fencepost::{
    cli::{AppContext, Cli, Commands},
    cli_ext::{apply_cmd, completions_cmd, parse_cmd, validate_cmd},
    infra::logging,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
    };
    logging::init(ctx.verbose, ctx.no_color);

    match cli.command {
        Commands::Parse(args) => parse_cmd::run(args, &ctx),
        Commands::Apply(args) => apply_cmd::run(args, &ctx),
        Commands::Validate(args) => validate_cmd::run(args, &ctx),
        Commands::Init(args) => fencepost::infra::config::init(args, &ctx),
        Commands::Completions(args) => completions_cmd::run(args),
    }
}
