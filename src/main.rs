pub mod args;
pub mod driver;
pub mod gmk;
pub mod types;
pub mod utils;

use std::path::Path;

fn print_stage(stage: &str) {
    eprintln!("{}...", stage);
}

fn run(arg: &args::Arg) -> anyhow::Result<()> {
    match &arg.command {
        args::Command::Convert {
            load,
            output,
            output_version,
        } => {
            eprintln!("Converting {}", load.input);
            let written = driver::convert(
                Path::new(&load.input),
                output.as_deref().map(Path::new),
                &load.config(),
                *output_version,
                &mut print_stage,
            )?;
            eprintln!("Saved {}", written.display());
        }
        args::Command::Info { load } => {
            let project =
                driver::load_file(Path::new(&load.input), &load.config(), &mut print_stage)?;
            println!("{}", serde_json::to_string_pretty(&project.summary())?);
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let arg = args::parse_args();
    if arg.backtrace {
        unsafe { std::env::set_var("RUST_LIB_BACKTRACE", "1") };
    }
    if let Err(e) = run(&arg) {
        eprintln!("Error: {}", e);
        if arg.backtrace {
            eprintln!("Backtrace: {}", e.backtrace());
        }
        std::process::exit(1);
    }
}
