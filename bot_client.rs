use futures_util::{SinkExt, StreamExt};
use plotline_protocol::{split_options, ClientMessage, InputType, ServerMessage};
use rand::seq::SliceRandom;
use std::env;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const REACTIONS: [&str; 6] = ["comedy", "triumphant", "dark", "tragedy", "chaos", "bittersweet"];

const ANSWERS: [&str; 8] = [
    "A goose with a grudge",
    "The lighthouse keeper's cousin",
    "Everything was on fire, again",
    "A very polite dragon",
    "Nobody expected the soup",
    "They simply walked away",
    "A map drawn on a napkin",
    "The moon, briefly",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let player_name = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| format!("Bot{}", std::process::id()));
    let url = env::var("PLOTLINE_URL").unwrap_or_else(|_| "ws://127.0.0.1:8080/ws".to_string());

    println!("[{player_name}] connecting to {url}...");
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    let join = ClientMessage::Join {
        player_name: player_name.clone(),
    };
    write.send(Message::Text(serde_json::to_string(&join)?)).await?;

    let mut started = false;
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let Ok(server_msg) = serde_json::from_str::<ServerMessage>(&text) else {
                    println!("[{player_name}] unreadable message: {text}");
                    continue;
                };
                println!("[{player_name}] <- {server_msg:?}");
                if matches!(server_msg, ServerMessage::StartGame) {
                    started = true;
                }
                if let Some(reply) = auto_play_response(&server_msg, started) {
                    // give humans at the table a moment to read
                    tokio::time::sleep(tokio::time::Duration::from_millis(800)).await;
                    println!("[{player_name}] -> {reply:?}");
                    write.send(Message::Text(serde_json::to_string(&reply)?)).await?;
                }
                if matches!(server_msg, ServerMessage::GameOver { .. }) {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                println!("[{player_name}] connection closed by server");
                break;
            }
            Err(e) => {
                println!("[{player_name}] websocket error: {e}");
                break;
            }
            _ => {}
        }
    }

    println!("[{player_name}] disconnected");
    Ok(())
}

fn auto_play_response(msg: &ServerMessage, started: bool) -> Option<ClientMessage> {
    let mut rng = rand::thread_rng();
    match msg {
        ServerMessage::Joined {
            is_host: true,
            ready_to_start: true,
            ..
        } if !started => Some(ClientMessage::StartGame),
        ServerMessage::ShowPrompt {
            input_type: InputType::Choice,
            options,
            ..
        } => options.choose(&mut rng).map(|o| ClientMessage::SendPrompt { text: o.clone() }),
        ServerMessage::ShowPrompt { .. } => ANSWERS
            .choose(&mut rng)
            .map(|a| ClientMessage::SendPrompt { text: a.to_string() }),
        ServerMessage::ShowAnswer {
            my_prompt: false, ..
        } => REACTIONS
            .choose(&mut rng)
            .map(|r| ClientMessage::SendReact { text: r.to_string() }),
        ServerMessage::ShowChoices {
            text,
            my_prompt: false,
        } => split_options(text)
            .choose(&mut rng)
            .map(|c| ClientMessage::SendChoice { text: c.clone() }),
        _ => None,
    }
}
