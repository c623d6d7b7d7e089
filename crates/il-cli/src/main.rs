use std::process::exit;

use clap::Parser;

use crate::args::IlCliArgs;

pub mod args;
pub mod commands;
pub mod report;

pub struct Context {
    pub debug: bool,
}

fn main() {
    let args = IlCliArgs::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let mut context = Context { debug: args.debug };
    match context.execute(args) {
        Ok(code) => exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            exit(1);
        }
    }
}
