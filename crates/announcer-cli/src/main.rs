use clap::{Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "announcer", version, about = "Announcement scheduler and speech delivery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the station until Ctrl-C
    Run(commands::run::RunArgs),
    /// Recurring announcement timers
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Speak arbitrary text and wait until it finishes
    Say {
        /// Text to speak
        text: String,
    },
    /// Voice engine and voice selection
    Voice {
        #[command(subcommand)]
        action: commands::voice::VoiceAction,
    },
    /// Closing-time announcements
    Closing {
        #[command(subcommand)]
        action: commands::closing::ClosingAction,
    },
    /// Top-of-the-hour chime
    Hourly {
        #[command(subcommand)]
        action: commands::hourly::HourlyAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Timer { action } => commands::timer::run(action).await,
        Commands::Say { text } => commands::say::run(&text).await,
        Commands::Voice { action } => commands::voice::run(action),
        Commands::Closing { action } => commands::closing::run(action).await,
        Commands::Hourly { action } => commands::hourly::run(action).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
