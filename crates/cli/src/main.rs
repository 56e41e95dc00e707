use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chatlog")]
#[command(about = "Chatlog: record Slack conversations from the Events API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory, a default config, and the data directory.
    Init {
        /// Config file path (default: CHATLOG_CONFIG_PATH or ~/.chatlog/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the Events API endpoint. Point the Slack app's Request URL at http(s)://<host><eventsPath>.
    Serve {
        /// Config file path (default: CHATLOG_CONFIG_PATH or ~/.chatlog/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 15152)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the stored messages of one conversation.
    History {
        /// Config file path (default: CHATLOG_CONFIG_PATH or ~/.chatlog/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Slack channel id (e.g. C0123456789)
        #[arg(long, value_name = "ID")]
        channel: String,

        /// Collection to read (default from config)
        #[arg(long, value_name = "NAME")]
        collection: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("chatlog {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::History {
            config,
            channel,
            collection,
        }) => {
            if let Err(e) = run_history(config, channel, collection).await {
                log::error!("history failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(chatlog::config::default_config_path);
    let dir = chatlog::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = chatlog::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!("starting server on {}:{}", config.gateway.bind, config.gateway.port);
    chatlog::gateway::run_server(config, path).await
}

async fn run_history(
    config_path: Option<std::path::PathBuf>,
    channel: String,
    collection: Option<String>,
) -> anyhow::Result<()> {
    let (config, path) = chatlog::config::load_config(config_path)?;
    let store = chatlog::store::open_store(&config, &path)?;
    let collection = collection.unwrap_or_else(|| config.store.collection.clone());
    let messages = store.list_messages(&collection, &channel).await?;
    if messages.is_empty() {
        println!("no messages for {} in {}", channel, collection);
        return Ok(());
    }
    for m in messages {
        println!("{} {}: {}", m.created_at.to_rfc3339(), m.sender, m.text);
    }
    Ok(())
}
