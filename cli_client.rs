use futures_util::{SinkExt, StreamExt};
use plotline_protocol::{split_options, ClientMessage, ServerMessage};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Plotline CLI controller");
    println!("=======================");

    print!("Enter your name: ");
    io::stdout().flush()?;
    let mut player_name = String::new();
    io::stdin().read_line(&mut player_name)?;
    let player_name = player_name.trim().to_string();

    if player_name.is_empty() {
        println!("Name cannot be empty");
        return Ok(());
    }

    let url =
        std::env::var("PLOTLINE_URL").unwrap_or_else(|_| "ws://127.0.0.1:8080/ws".to_string());
    println!("Connecting to {url}...");
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    println!("Connected!");

    let (mut write, mut read) = ws_stream.split();

    let join_msg = ClientMessage::Join {
        player_name: player_name.clone(),
    };
    write.send(Message::Text(serde_json::to_string(&join_msg)?)).await?;

    // latest vote options, so `vote <n>` can send the option text
    let (options_tx, options_rx) = watch::channel(Vec::<String>::new());

    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Ok(server_msg) = serde_json::from_str::<ServerMessage>(&text) {
                        handle_server_message(server_msg, &options_tx);
                    }
                }
                Ok(Message::Close(_)) => {
                    println!("Connection closed by server");
                    break;
                }
                Err(e) => {
                    println!("WebSocket error: {e}");
                    break;
                }
                _ => {}
            }
        }
    });

    println!("\nCommands:");
    println!("  start          - Start the game (host only)");
    println!("  prompt <text>  - Answer your prompt");
    println!("  react <word>   - React to an answer (comedy, dark, chaos, ...)");
    println!("  vote <n>       - Pick option n");
    println!("  quit           - Leave");
    println!("\nType commands and press Enter:");

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();

        if line == "quit" {
            break;
        }

        let parsed = parse_command(line, &options_rx.borrow());
        if let Some(msg) = parsed {
            write.send(Message::Text(serde_json::to_string(&msg)?)).await?;
        } else {
            println!("Unknown command: {line}");
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn handle_server_message(msg: ServerMessage, options: &watch::Sender<Vec<String>>) {
    match msg {
        ServerMessage::Joined {
            player_name,
            is_host,
            ready_to_start,
        } => {
            println!("Joined as {player_name}{}", if is_host { " (host)" } else { "" });
            match (is_host, ready_to_start) {
                (true, true) => println!("Enough players. Type `start` when ready."),
                (_, false) => println!("Waiting for players..."),
                (false, true) => println!("Waiting for the host..."),
            }
        }
        ServerMessage::StartGame => println!("\nThe game is starting! Watch the big screen."),
        ServerMessage::ShowPrompt { text, options: choices, .. } => {
            println!("\nPROMPT: {text}");
            if choices.is_empty() {
                println!("Answer with: prompt <your answer>");
            } else {
                for (i, c) in choices.iter().enumerate() {
                    println!("  {}. {c}", i + 1);
                }
                println!("Answer with: prompt <option text>");
            }
        }
        ServerMessage::ShowAnswer { text, my_prompt } => {
            if my_prompt {
                println!("\nEveryone is reacting to your answer...");
            } else {
                println!("\nANSWER: {text}");
                println!("React with: react <comedy|triumphant|dark|tragedy|chaos|bittersweet>");
            }
        }
        ServerMessage::ShowChoices { text, my_prompt } => {
            let choices = split_options(&text);
            if my_prompt {
                println!("\nThe others are guessing your answer...");
            } else {
                println!("\nWhich one is real?");
                for (i, c) in choices.iter().enumerate() {
                    println!("  {}. {c}", i + 1);
                }
                println!("Vote with: vote <n>");
            }
            let _ = options.send(choices);
        }
        ServerMessage::GameOver { text, scores } => {
            println!("\n{text}");
            for s in scores {
                println!("  {}: {}", s.player_name, s.score);
            }
        }
        ServerMessage::Error { message } => println!("Error: {message}"),
    }
}

fn parse_command(input: &str, options: &[String]) -> Option<ClientMessage> {
    let (cmd, rest) = match input.split_once(' ') {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (input, ""),
    };

    match cmd.to_lowercase().as_str() {
        "start" => Some(ClientMessage::StartGame),
        "prompt" if !rest.is_empty() => Some(ClientMessage::SendPrompt {
            text: rest.to_string(),
        }),
        "react" if !rest.is_empty() => Some(ClientMessage::SendReact {
            text: rest.to_string(),
        }),
        "vote" => {
            let n: usize = rest.parse().ok()?;
            let text = options.get(n.checked_sub(1)?)?.clone();
            Some(ClientMessage::SendChoice { text })
        }
        _ => None,
    }
}
