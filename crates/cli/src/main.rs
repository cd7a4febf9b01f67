use clap::{Parser, Subcommand};
use omnichat::auth::SessionGate;
use omnichat::config::Config;
use omnichat::conversation::Conversation;
use omnichat::dispatch::{self, Dispatcher, Settlement};
use omnichat::storage::FileStore;
use omnichat::webhook::{Webhook, WebhookClient};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "omnichat")]
#[command(about = "Omni Chat CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: OMNICHAT_CONFIG_PATH or ~/.omnichat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Log in with the admin password and remember the session.
    Login {
        /// Config file path (default: OMNICHAT_CONFIG_PATH or ~/.omnichat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Password; prompted for when omitted.
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the remembered session.
    Logout {
        /// Config file path (default: OMNICHAT_CONFIG_PATH or ~/.omnichat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Show login state, webhook and spaces.
    Status {
        /// Config file path (default: OMNICHAT_CONFIG_PATH or ~/.omnichat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Chat interactively. Asks for the password first unless already logged in.
    Chat {
        /// Config file path (default: OMNICHAT_CONFIG_PATH or ~/.omnichat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Space to start in (default from config).
        #[arg(long, short)]
        space: Option<String>,
    },

    /// Send one message and print the reply. Requires a remembered login.
    Send {
        /// Config file path (default: OMNICHAT_CONFIG_PATH or ~/.omnichat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Space to send to (default from config).
        #[arg(long, short)]
        space: Option<String>,

        /// Message text.
        message: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("omnichat {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Init { config }) => run_init(config),
        Some(Commands::Login { config, password }) => run_login(config, password),
        Some(Commands::Logout { config }) => run_logout(config),
        Some(Commands::Status { config }) => run_status(config),
        Some(Commands::Chat { config, space }) => run_chat(config, space).await,
        Some(Commands::Send {
            config,
            space,
            message,
        }) => run_send(config, space, message).await,
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };
    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Loaded config plus a gate restored from the configured store.
struct Context {
    config: Config,
    gate: SessionGate<FileStore>,
}

fn open_context(config_path: Option<PathBuf>) -> anyhow::Result<Context> {
    let (config, path) = omnichat::config::load_config(config_path)?;
    let store_path = omnichat::config::resolve_store_path(&config, &path);
    let store = FileStore::open(&store_path)?;
    let mut gate = SessionGate::new(store);
    gate.restore_session();
    Ok(Context { config, gate })
}

fn new_conversation(config: &Config, space: Option<String>) -> anyhow::Result<Conversation> {
    let mut conversation = Conversation::with_spaces(&config.spaces);
    if let Some(space) = space {
        conversation.set_space(&space)?;
    }
    Ok(conversation)
}

fn prompt(label: &str) -> anyhow::Result<Option<String>> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Prompt until the password is accepted. Returns false on end of input.
fn login_interactively(gate: &mut SessionGate<FileStore>) -> anyhow::Result<bool> {
    if !gate.is_logged_in() {
        println!("Admin Login");
    }
    while !gate.is_logged_in() {
        let Some(password) = prompt("password: ")? else {
            return Ok(false);
        };
        if gate.login(&password).is_err() {
            eprintln!("{}", gate.login_error());
        }
    }
    Ok(true)
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(omnichat::config::default_config_path);
    let dir = omnichat::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn run_login(config_path: Option<PathBuf>, password: Option<String>) -> anyhow::Result<()> {
    let mut ctx = open_context(config_path)?;
    if ctx.gate.is_logged_in() {
        println!("already logged in");
        return Ok(());
    }
    match password {
        Some(password) => {
            if ctx.gate.login(&password).is_err() {
                anyhow::bail!("{}", ctx.gate.login_error());
            }
        }
        None => {
            if !login_interactively(&mut ctx.gate)? {
                anyhow::bail!("login aborted");
            }
        }
    }
    println!("logged in");
    Ok(())
}

fn run_logout(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut ctx = open_context(config_path)?;
    ctx.gate.logout();
    println!("logged out");
    Ok(())
}

fn run_status(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let ctx = open_context(config_path)?;
    let config = &ctx.config;
    println!(
        "session: {}",
        if ctx.gate.is_logged_in() {
            "logged in"
        } else {
            "logged out"
        }
    );
    println!("store: {}", ctx.gate.store().path().display());
    println!(
        "webhook: {}",
        omnichat::config::resolve_webhook_url(config).unwrap_or_else(|| "(not configured)".into())
    );
    println!(
        "timeout: {}s",
        omnichat::config::resolve_timeout(config).as_secs()
    );
    if config.spaces.options.is_empty() {
        println!("spaces: (none)");
    } else {
        println!(
            "spaces: {} (default {})",
            config.spaces.options.join(", "),
            config.spaces.initial().unwrap_or_default()
        );
    }
    Ok(())
}

enum ChatExit {
    Quit,
    Logout,
}

async fn run_chat(config_path: Option<PathBuf>, space: Option<String>) -> anyhow::Result<()> {
    let mut ctx = open_context(config_path)?;
    let dispatcher = Dispatcher::new(WebhookClient::from_config(&ctx.config)?);
    let mut conversation = new_conversation(&ctx.config, space)?;

    loop {
        if !login_interactively(&mut ctx.gate)? {
            return Ok(());
        }
        match chat_loop(&dispatcher, &mut conversation).await? {
            ChatExit::Quit => return Ok(()),
            ChatExit::Logout => {
                ctx.gate.logout();
                println!("logged out");
            }
        }
    }
}

/// A slash command typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum ChatCommand<'a> {
    Quit,
    Logout,
    ListSpaces,
    ShowSpace,
    SetSpace(&'a str),
}

/// None means the line is a message to send.
fn parse_chat_command(line: &str) -> Option<ChatCommand<'_>> {
    let input = line.trim();
    let (word, rest) = match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    };
    if word.eq_ignore_ascii_case("/exit") || word.eq_ignore_ascii_case("/quit") {
        Some(ChatCommand::Quit)
    } else if word.eq_ignore_ascii_case("/logout") {
        Some(ChatCommand::Logout)
    } else if word.eq_ignore_ascii_case("/spaces") {
        Some(ChatCommand::ListSpaces)
    } else if word.eq_ignore_ascii_case("/space") {
        if rest.is_empty() {
            Some(ChatCommand::ShowSpace)
        } else {
            Some(ChatCommand::SetSpace(rest))
        }
    } else {
        None
    }
}

async fn chat_loop(
    dispatcher: &Dispatcher<WebhookClient>,
    conversation: &mut Conversation,
) -> anyhow::Result<ChatExit> {
    println!("Omni Chat — /space NAME, /spaces, /logout, /quit");
    loop {
        let label = match conversation.space() {
            Some(space) => format!("[{}] > ", space),
            None => "> ".to_string(),
        };
        let Some(line) = prompt(&label)? else {
            return Ok(ChatExit::Quit);
        };
        match parse_chat_command(&line) {
            Some(ChatCommand::Quit) => return Ok(ChatExit::Quit),
            Some(ChatCommand::Logout) => return Ok(ChatExit::Logout),
            Some(ChatCommand::ListSpaces) => {
                if conversation.spaces().is_empty() {
                    println!("no spaces configured");
                }
                for s in conversation.spaces() {
                    let marker = if conversation.space() == Some(s.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{} {}", marker, s);
                }
                continue;
            }
            Some(ChatCommand::ShowSpace) => {
                println!("{}", conversation.space().unwrap_or("(none)"));
                continue;
            }
            Some(ChatCommand::SetSpace(name)) => {
                if let Err(e) = conversation.set_space(name) {
                    eprintln!("{}", e);
                }
                continue;
            }
            None => {}
        }

        conversation.set_input(line);
        let Some(request) = dispatch::begin(conversation) else {
            continue;
        };
        if let Some(status) = conversation.status_line() {
            eprintln!("{}", status);
        }
        let result = dispatcher.webhook().post(&request).await;
        let settlement = dispatch::settle(conversation, result);
        print_reply(conversation, &settlement);
    }
}

fn print_reply(conversation: &Conversation, settlement: &Settlement) {
    if let Some(reply) = conversation.messages().last() {
        let text = reply.text.trim();
        if settlement.is_success() {
            println!("< {}", text);
        } else {
            eprintln!("< {}", text);
        }
    }
}

async fn run_send(
    config_path: Option<PathBuf>,
    space: Option<String>,
    message: String,
) -> anyhow::Result<()> {
    let ctx = open_context(config_path)?;
    if !ctx.gate.is_logged_in() {
        anyhow::bail!("not logged in; run `omnichat login` first");
    }
    let dispatcher = Dispatcher::new(WebhookClient::from_config(&ctx.config)?);
    let mut conversation = new_conversation(&ctx.config, space)?;
    conversation.set_input(message);
    let Some(settlement) = dispatcher.submit(&mut conversation).await else {
        anyhow::bail!("message is empty");
    };
    print_reply(&conversation, &settlement);
    if let Settlement::Failed(e) = settlement {
        anyhow::bail!("webhook request failed: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_command_takes_a_name() {
        assert_eq!(
            parse_chat_command("/space OMNIPRO"),
            Some(ChatCommand::SetSpace("OMNIPRO"))
        );
        assert_eq!(parse_chat_command("  /space  "), Some(ChatCommand::ShowSpace));
        assert_eq!(parse_chat_command("/spaces"), Some(ChatCommand::ListSpaces));
    }

    #[test]
    fn words_starting_with_a_command_are_messages() {
        assert_eq!(parse_chat_command("/spaceship launch plan"), None);
        assert_eq!(parse_chat_command("/quitting soon"), None);
        assert_eq!(parse_chat_command("what is /space for?"), None);
    }

    #[test]
    fn exit_commands() {
        assert_eq!(parse_chat_command("/QUIT"), Some(ChatCommand::Quit));
        assert_eq!(parse_chat_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_chat_command("/logout"), Some(ChatCommand::Logout));
    }
}
