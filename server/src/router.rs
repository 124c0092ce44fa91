use crate::connections::ConnectionId;
use crate::session::Session;
use plotline_protocol::ClientMessage;

/// Dispatches one parsed envelope. Rejections are logged and, where the
/// client can do something about it, answered with an `error` envelope.
pub fn route_message(session: &mut Session, id: ConnectionId, msg: ClientMessage) {
    let kind = msg.kind();
    let result = match msg {
        ClientMessage::Join { player_name } => session.join(id, &player_name),
        ClientMessage::StartGame => session.start_game(id),
        ClientMessage::SendPrompt { text } => session.submit_prompt(id, &text),
        ClientMessage::SendReact { text } => session.submit_reaction(id, &text),
        ClientMessage::SendChoice { text } => session.submit_choice(id, &text),
    };

    if let Err(e) = result {
        tracing::warn!(connection_id = %id, kind, error = %e, "Message rejected");
        if e.notify_client() {
            session.send_error(id, &e);
        }
    }
}
