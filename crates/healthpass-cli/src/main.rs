use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod commands;

#[derive(Parser)]
#[command(name = "healthpass-cli", version, about = "HealthPass CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reminder management
    Reminder {
        #[command(subcommand)]
        action: commands::reminder::ReminderAction,
    },
    /// Vital-sign readings
    Metric {
        #[command(subcommand)]
        action: commands::metric::MetricAction,
    },
    /// Goal range management
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run the foreground due-reminder watch loop
    Watch {
        /// Run a single scheduler tick and exit (background wake-up entry point)
        #[arg(long)]
        once: bool,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Reminder { action } => commands::reminder::run(action),
        Commands::Metric { action } => commands::metric::run(action),
        Commands::Goal { action } => commands::goal::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Watch { once } => commands::watch::run(once),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
