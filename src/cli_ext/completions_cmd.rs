//! Shell completion scripts via clap_complete.

use std::{fs::File, io};

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::generate;

use crate::cli::{Cli, CompletionsArgs};

pub fn run(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();

    match args.output {
        Some(path) => {
            let mut file =
                File::create(&path).with_context(|| format!("create {}", path.display()))?;
            generate(args.shell, &mut cmd, bin, &mut file);
            eprintln!("Wrote {} completion to {}", args.shell, path.display());
        }
        None => generate(args.shell, &mut cmd, bin, &mut io::stdout()),
    }
    Ok(())
}
