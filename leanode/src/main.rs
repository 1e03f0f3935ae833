use std::process::ExitCode;

use anyhow::Result;
use clap::{Error as ClapError, Parser as _};
use log::error;

use crate::args::LeanodeArgs;

mod args;
mod commands;
mod logging;

fn main() -> ExitCode {
    if let Err(error) = try_main() {
        error.downcast_ref().map(ClapError::exit);
        error!("{error:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    let parsed_args = LeanodeArgs::try_parse()?;

    logging::initialize()?;

    commands::run(parsed_args)
}
