use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use futures::StreamExt;
use krishi_chat::{ChatClient, ChatSession, ClientConfig, Conversation};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;

const DEFAULT_GREETING: &str =
    "Namaste! I'm your farming assistant. Ask me about crops, equipment, labour or FPOs.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    krishi_chat::init_logging();

    let matches = Command::new("krishi-chat")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Chat with the Krishi marketplace farming assistant")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON file with the client configuration")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("endpoint")
                .long("endpoint")
                .value_name("URL")
                .help("Chat-completion endpoint, overrides the configuration")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("MODEL")
                .help("Model to request")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("message")
                .long("message")
                .short('m')
                .value_name("TEXT")
                .help("Send one message and exit instead of starting a chat")
                .action(ArgAction::Set),
        )
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => ClientConfig::from_env().context("no --config given and environment is incomplete")?,
    };
    if let Some(endpoint) = matches.get_one::<String>("endpoint") {
        config.endpoint = endpoint.clone();
        config.validate()?;
    }
    if let Some(model) = matches.get_one::<String>("model") {
        config.model = Some(model.clone());
    }

    let client = ChatClient::new(&config).context("failed to build chat client")?;
    let greeting = config
        .greeting
        .clone()
        .unwrap_or_else(|| DEFAULT_GREETING.to_string());
    let mut session = ChatSession::new(client, Conversation::with_greeting(greeting.clone()));

    if let Some(message) = matches.get_one::<String>("message") {
        return exchange(&mut session, message).await;
    }

    println!("{greeting}");
    prompt()?;
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    while let Some(line) = lines.next().await {
        let line = line?;
        if line.trim().is_empty() {
            prompt()?;
            continue;
        }
        // failures are already shown as the fallback reply
        let _ = exchange(&mut session, &line).await;
        prompt()?;
    }

    Ok(())
}

/// Send one message, printing each new fragment as it arrives.
async fn exchange(session: &mut ChatSession, message: &str) -> anyhow::Result<()> {
    let mut printed = 0;
    let result = session
        .send(message, |text| {
            print!("{}", &text[printed..]);
            let _ = io::stdout().flush();
            printed = text.len();
        })
        .await;
    if printed > 0 {
        println!();
    }
    if result.is_err() {
        if let Some(fallback) = session.conversation().last() {
            println!("{}", fallback.content);
        }
    }
    result.map_err(Into::into)
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}
