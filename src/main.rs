mod commands;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use copa_client::{ClientSettings, SessionChannel};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "copa")]
#[command(about = "Send requests to a CoPA calendar server")]
struct Cli {
    /// Settings file (TOML, or a Java-style .properties file)
    #[arg(short, long, global = true)]
    settings: Option<String>,

    /// Do not log in before sending
    #[arg(long, global = true)]
    no_auth: bool,

    /// Log every request and response to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with the configured credentials
    Login,
    /// Send a typed request and print the classified result
    Request {
        /// Request discriminator (e.g. "GetCategoriesRequest")
        request_type: String,

        /// Expected response discriminator. Defaults to the request type
        /// with "Request" replaced by "Response".
        #[arg(short, long)]
        expect: Option<String>,

        /// JSON body of the request
        #[arg(short, long, default_value = "{}")]
        content: String,
    },
    /// Send literal text as the request and print the raw response
    SendText { text: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match cli.settings.as_deref() {
        Some(path) => ClientSettings::load_from(&ClientSettings::resolve_path(path)),
        None => ClientSettings::load(),
    }
    .context("Failed to load settings")?;

    tracing::debug!(
        login_url = %settings.login_url,
        request_url = %settings.request_url,
        use_tls = settings.use_tls,
        "Loaded settings"
    );

    let channel = settings.channel();
    channel.start().context("Failed to start HTTPS client")?;

    // Stop on every path once started
    let result = run(&cli, &settings, &channel);
    channel.stop()?;
    result
}

fn run(cli: &Cli, settings: &ClientSettings, channel: &SessionChannel) -> Result<()> {
    match &cli.command {
        Commands::Login => commands::login::run(settings, channel),
        Commands::Request {
            request_type,
            expect,
            content,
        } => {
            if !cli.no_auth {
                commands::authenticate(settings, channel)?;
            }
            commands::request::run(channel, request_type, expect.as_deref(), content)
        }
        Commands::SendText { text } => {
            if !cli.no_auth {
                commands::authenticate(settings, channel)?;
            }
            commands::send_text::run(channel, text)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("copa=debug,copa_client=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
