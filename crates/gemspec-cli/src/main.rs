use clap::{Parser, Subcommand};
use gemspec::{
    commands::{
        edit::{self, AddCommand, ApplyCommand, RemoveCommand},
        inspect::{self, InspectCommand},
    },
    init_tracing, GlobalOpts, Outcome,
};
use gemspec_logger as logger;

#[derive(Parser)]
#[command(name = "gemspec")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Edit gemspec dependencies without reformatting the file",
    long_about = "gemspec rewrites the dependency and attribute declarations of a Ruby gemspec, touching only the statements it has to change."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a dependency or update its version requirements
    Add(AddCommand),
    /// Remove every declaration of a dependency
    Remove(RemoveCommand),
    /// Apply a TOML instruction script
    Apply(ApplyCommand),
    /// Show the dependencies and literal attributes of a gemspec
    Inspect(InspectCommand),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_with_verbosity(cli.global.verbosity_level(), cli.global.quiet) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    let result = match &cli.command {
        Commands::Add(cmd) => edit::handle_add(cmd, &cli.global).map(|o| (o, cmd.output.check)),
        Commands::Remove(cmd) => {
            edit::handle_remove(cmd, &cli.global).map(|o| (o, cmd.output.check))
        }
        Commands::Apply(cmd) => edit::handle_apply(cmd, &cli.global).map(|o| (o, cmd.output.check)),
        Commands::Inspect(cmd) => {
            inspect::handle_inspect(cmd, &cli.global).map(|()| (Outcome::Unchanged, false))
        }
    };

    match result {
        Ok((Outcome::Changed, true)) => std::process::exit(1),
        Ok(_) => {}
        Err(e) => {
            logger::error(&format!("{:#}", e));
            if cli.global.verbosity_level() > 0 {
                logger::show_log_path();
            }
            std::process::exit(1);
        }
    }
}
