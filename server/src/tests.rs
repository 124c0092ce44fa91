use crate::config::GameConfig;
use crate::content::JsonContent;
use crate::content::PromptSource;
use crate::event_queue::EventQueue;
use crate::game::GameState;
use crate::screen::InstantScreen;
use crate::session::Session;
use plotline_protocol::*;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use uuid::Uuid;

/// Session wired to an instant screen and the built-in content.
fn create_test_session(queue: EventQueue<Session>, config: GameConfig) -> Session {
    let content = JsonContent::builtin();
    Session::new(
        config,
        queue.clone(),
        Box::new(InstantScreen::new(queue)),
        content.load_prompts().unwrap(),
        Box::new(content.load_dialogue().unwrap()),
    )
}

fn test_config(min_players: usize, max_players: usize) -> GameConfig {
    GameConfig {
        min_players,
        max_players,
        submission_timeout: None,
        seed: Some(7),
    }
}

fn joined(name: &str, is_host: bool, ready_to_start: bool) -> ServerMessage {
    ServerMessage::Joined {
        player_name: name.to_string(),
        is_host,
        ready_to_start,
    }
}

#[cfg(test)]
mod game_tests {
    use super::*;
    use std::time::Duration;

    struct TestClient {
        id: Uuid,
        rx: UnboundedReceiver<String>,
        log: Vec<ServerMessage>,
        open: bool,
    }

    /// Drives a session by hand: every call runs on the test thread, the
    /// way the logic loop would run it.
    struct Harness {
        session: Session,
        queue: EventQueue<Session>,
        clients: Vec<TestClient>,
    }

    impl Harness {
        fn new(min_players: usize, max_players: usize) -> Self {
            Self::with_config(test_config(min_players, max_players))
        }

        fn with_config(config: GameConfig) -> Self {
            let queue = EventQueue::new();
            let session = create_test_session(queue.clone(), config);
            Harness {
                session,
                queue,
                clients: vec![],
            }
        }

        fn connect(&mut self) -> usize {
            let id = Uuid::new_v4();
            let (tx, rx) = mpsc::unbounded_channel();
            self.session.on_open(id, tx);
            self.clients.push(TestClient {
                id,
                rx,
                log: vec![],
                open: true,
            });
            self.clients.len() - 1
        }

        fn join(&mut self, name: &str) -> usize {
            let i = self.connect();
            self.send(i, json!({"type": "join", "playerName": name}));
            i
        }

        fn disconnect(&mut self, i: usize) {
            self.clients[i].open = false;
            let id = self.clients[i].id;
            self.session.on_close(id);
        }

        fn send(&mut self, i: usize, msg: Value) {
            let id = self.clients[i].id;
            self.session.on_message(id, &msg.to_string());
        }

        fn settle(&mut self) -> usize {
            self.queue.drain_all(&mut self.session)
        }

        fn inbox(&mut self, i: usize) -> Vec<ServerMessage> {
            let client = &mut self.clients[i];
            let mut out = vec![];
            while let Ok(raw) = client.rx.try_recv() {
                out.push(serde_json::from_str::<ServerMessage>(&raw).unwrap());
            }
            client.log.extend(out.iter().cloned());
            out
        }

        fn clear_inboxes(&mut self) {
            for i in 0..self.clients.len() {
                self.inbox(i);
            }
        }

        fn state(&self) -> GameState {
            self.session.state()
        }

        /// Answers whatever each open client was last asked. Returns replies sent.
        fn respond(&mut self) -> usize {
            let mut sent = 0;
            for i in 0..self.clients.len() {
                if !self.clients[i].open {
                    continue;
                }
                for msg in self.inbox(i) {
                    let reply = match msg {
                        ServerMessage::ShowPrompt { options, .. } if !options.is_empty() => {
                            json!({"type": "send_prompt", "text": options[0]})
                        }
                        ServerMessage::ShowPrompt { .. } => {
                            json!({"type": "send_prompt", "text": format!("answer from {i}")})
                        }
                        ServerMessage::ShowAnswer {
                            my_prompt: false, ..
                        } => json!({"type": "send_react", "text": "comedy"}),
                        ServerMessage::ShowChoices {
                            text,
                            my_prompt: false,
                        } => json!({"type": "send_choice", "text": split_options(&text)[0]}),
                        _ => continue,
                    };
                    self.send(i, reply);
                    sent += 1;
                }
            }
            sent
        }

        fn play_out(&mut self) {
            for _ in 0..1000 {
                self.settle();
                if self.respond() == 0 && self.queue.is_empty() {
                    return;
                }
            }
            panic!("game did not settle");
        }

        /// Plays on until an answer is on the phones during `state`. The
        /// phones' copy of that answer is left unread.
        fn play_until_presenting(&mut self, state: GameState) {
            for _ in 0..1000 {
                self.settle();
                if self.state() == state && self.session.rounds().is_presenting() {
                    return;
                }
                self.respond();
            }
            panic!("never reached a reveal during {state:?}");
        }

        fn index_of(&self, id: Uuid) -> usize {
            self.clients.iter().position(|c| c.id == id).unwrap()
        }

        /// `n` named players, host starts, round 1 prompts handed out.
        fn started(n: usize) -> Self {
            let mut h = Harness::new(2, 8);
            for i in 0..n {
                h.join(&format!("P{i}"));
            }
            h.send(0, json!({"type": "start_game"}));
            h.settle();
            assert_eq!(h.state(), GameState::Prompting);
            h.clear_inboxes();
            h
        }
    }

    fn prompt_of(msgs: &[ServerMessage]) -> (String, InputType) {
        let found: Vec<_> = msgs
            .iter()
            .filter_map(|m| match m {
                ServerMessage::ShowPrompt {
                    text, input_type, ..
                } => Some((text.clone(), *input_type)),
                _ => None,
            })
            .collect();
        assert_eq!(found.len(), 1, "expected one show_prompt in {msgs:?}");
        found[0].clone()
    }

    fn answer_of(msgs: &[ServerMessage]) -> (String, bool) {
        match msgs {
            [ServerMessage::ShowAnswer { text, my_prompt }] => (text.clone(), *my_prompt),
            other => panic!("expected one show_answer, got {other:?}"),
        }
    }

    fn count(log: &[ServerMessage], pred: impl Fn(&ServerMessage) -> bool) -> usize {
        log.iter().filter(|m| pred(m)).count()
    }

    /// Two players join, play round 1 end to end and land in round 2
    #[test]
    fn test_two_player_game_reaches_round_two() {
        let mut h = Harness::new(2, 8);

        let a = h.join("Ann");
        assert_eq!(h.inbox(a), vec![joined("Ann", true, false)]);

        let b = h.join("Bo");
        assert_eq!(h.inbox(a), vec![joined("Ann", true, true)]);
        assert_eq!(h.inbox(b), vec![joined("Bo", false, true)]);

        h.send(a, json!({"type": "start_game"}));
        assert_eq!(h.inbox(a), vec![ServerMessage::StartGame]);
        assert_eq!(h.inbox(b), vec![ServerMessage::StartGame]);
        assert_eq!(h.state(), GameState::Talking);

        // intro narration completes, round 1 prompts go out
        h.settle();
        assert_eq!(h.state(), GameState::Prompting);
        let (pa, ta) = prompt_of(&h.inbox(a));
        let (pb, tb) = prompt_of(&h.inbox(b));
        assert_ne!(pa, pb);
        assert_eq!((ta, tb), (InputType::Text, InputType::Text));

        h.send(a, json!({"type": "send_prompt", "text": "A knight called Ann"}));
        assert_eq!(h.state(), GameState::Prompting);
        h.send(b, json!({"type": "send_prompt", "text": "A haunted bakery"}));
        assert_eq!(h.state(), GameState::Reacting);

        let mut shown = vec![];
        for _ in 0..2 {
            h.settle();
            let (text_a, mine_a) = answer_of(&h.inbox(a));
            let (text_b, mine_b) = answer_of(&h.inbox(b));
            assert_eq!(text_a, text_b);
            assert!(mine_a ^ mine_b, "exactly one recipient owns the answer");
            shown.push(text_a);
            let reactor = if mine_a { b } else { a };
            h.send(reactor, json!({"type": "send_react", "text": "Comedy"}));
        }
        shown.sort();
        assert_eq!(shown, vec!["A haunted bakery", "A knight called Ann"]);

        h.settle();
        assert_eq!(h.state(), GameState::Prompting);
        assert_eq!(h.session.story().round(), 2);
        let (_, input) = prompt_of(&h.inbox(a));
        assert_eq!(input, InputType::Text);
        prompt_of(&h.inbox(b));

        let beats = h.session.story().beats();
        assert_eq!(beats.len(), 2);
        assert!(beats.iter().all(|b| b.round == 1));
        assert!(beats
            .iter()
            .all(|b| b.reaction == Some(crate::reactions::ReactionType::Comedy)));
    }

    /// A full game runs six rounds and ends exactly once
    #[test]
    fn test_full_game_ends_once_after_round_six() {
        let mut h = Harness::new(2, 8);
        for name in ["Ann", "Bo", "Cy"] {
            h.join(name);
        }
        h.send(0, json!({"type": "start_game"}));
        h.play_out();

        assert_eq!(h.state(), GameState::Ended);
        for i in 0..3 {
            let log = &h.clients[i].log;
            let prompts = count(log, |m| matches!(m, ServerMessage::ShowPrompt { .. }));
            assert_eq!(prompts, 6, "client {i} prompts");
            let choice_prompts = count(log, |m| {
                matches!(
                    m,
                    ServerMessage::ShowPrompt {
                        input_type: InputType::Choice,
                        ..
                    }
                )
            });
            assert_eq!(choice_prompts, 1, "only the climax is a choice");
            let overs: Vec<_> = log
                .iter()
                .filter_map(|m| match m {
                    ServerMessage::GameOver { scores, .. } => Some(scores.clone()),
                    _ => None,
                })
                .collect();
            assert_eq!(overs.len(), 1);
            assert_eq!(overs[0].len(), 3);
        }
        assert_eq!(h.session.story().beats().len(), 18);

        // nothing further is scheduled
        assert_eq!(h.settle(), 0);
        h.send(0, json!({"type": "start_game"}));
        assert!(matches!(h.inbox(0).as_slice(), [ServerMessage::Error { .. }]));
        assert_eq!(h.state(), GameState::Ended);
        assert!(h.inbox(1).is_empty());
        assert!(h.inbox(2).is_empty());
    }

    /// Crossing min players sends one personalised joined to each player
    #[test]
    fn test_ready_broadcast_fires_once_on_threshold() {
        let mut h = Harness::new(3, 4);
        let a = h.join("Ann");
        let b = h.join("Bo");
        assert_eq!(h.inbox(a), vec![joined("Ann", true, false)]);
        assert_eq!(h.inbox(b), vec![joined("Bo", false, false)]);

        let c = h.join("Cy");
        assert_eq!(h.inbox(a), vec![joined("Ann", true, true)]);
        assert_eq!(h.inbox(b), vec![joined("Bo", false, true)]);
        assert_eq!(h.inbox(c), vec![joined("Cy", false, true)]);

        // already announced: later joins only answer the sender
        let d = h.join("Di");
        assert_eq!(h.inbox(d), vec![joined("Di", false, true)]);
        for i in [a, b, c] {
            assert!(h.inbox(i).is_empty());
        }
    }

    /// A socket that has not sent `join` yet keeps its name form
    #[test]
    fn test_unjoined_connection_hears_nothing_until_it_joins() {
        let mut h = Harness::new(2, 8);
        let a = h.join("Ann");
        let c = h.connect();
        let b = h.join("Bo");

        assert!(h.inbox(c).is_empty());
        assert_eq!(
            h.inbox(a),
            vec![joined("Ann", true, false), joined("Ann", true, true)]
        );
        assert_eq!(h.inbox(b), vec![joined("Bo", false, true)]);

        h.send(c, json!({"type": "join", "playerName": "Cy"}));
        assert_eq!(h.inbox(c), vec![joined("Cy", false, true)]);
        assert!(h.inbox(a).is_empty());
        assert!(h.inbox(b).is_empty());
    }

    #[test]
    fn test_unnamed_new_host_is_not_sent_joined() {
        let mut h = Harness::new(2, 8);
        let a = h.join("Ann");
        let c = h.connect();
        let b = h.join("Bo");
        h.clear_inboxes();

        h.disconnect(a);
        assert!(h.inbox(c).is_empty());
        assert!(matches!(h.inbox(b).as_slice(), [ServerMessage::Joined { .. }]));

        h.send(c, json!({"type": "join", "playerName": "Cy"}));
        assert!(matches!(
            h.inbox(c).as_slice(),
            [ServerMessage::Joined { player_name, .. }] if player_name == "Cy"
        ));
        assert_eq!(h.session.players().iter().filter(|p| p.is_host).count(), 1);
    }

    #[test]
    fn test_host_leaving_lobby_promotes_and_notifies() {
        let mut h = Harness::new(2, 8);
        for name in ["Ann", "Bo", "Cy"] {
            h.join(name);
        }
        h.clear_inboxes();

        h.disconnect(0);
        let mut hosts = 0;
        for i in [1, 2] {
            match h.inbox(i).as_slice() {
                [ServerMessage::Joined {
                    is_host,
                    ready_to_start,
                    ..
                }] => {
                    assert!(*ready_to_start);
                    if *is_host {
                        hosts += 1;
                    }
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(hosts, 1);
        assert_eq!(h.session.players().iter().filter(|p| p.is_host).count(), 1);
    }

    #[test]
    fn test_full_game_turns_extra_connection_away() {
        let mut h = Harness::new(1, 2);
        h.join("Ann");
        h.join("Bo");
        let extra = h.connect();
        assert!(matches!(
            h.inbox(extra).as_slice(),
            [ServerMessage::Error { message }] if message.contains("full")
        ));
        assert!(matches!(
            h.clients[extra].rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
        assert_eq!(h.session.players().count(), 2);
        assert!(h.session.players().get(h.clients[extra].id).is_none());
    }

    #[test]
    fn test_only_a_ready_host_can_start() {
        let mut h = Harness::new(2, 8);
        let a = h.join("Ann");
        h.clear_inboxes();

        h.send(a, json!({"type": "start_game"}));
        assert!(matches!(h.inbox(a).as_slice(), [ServerMessage::Error { .. }]));
        assert_eq!(h.state(), GameState::Lobby);

        let b = h.join("Bo");
        h.clear_inboxes();
        h.send(b, json!({"type": "start_game"}));
        assert!(matches!(
            h.inbox(b).as_slice(),
            [ServerMessage::Error { message }] if message.contains("host")
        ));
        assert_eq!(h.state(), GameState::Lobby);
    }

    #[test]
    fn test_wrong_phase_messages_are_dropped() {
        let mut h = Harness::new(2, 8);
        let a = h.join("Ann");
        h.join("Bo");
        h.clear_inboxes();

        h.send(a, json!({"type": "send_prompt", "text": "too early"}));
        assert!(matches!(h.inbox(a).as_slice(), [ServerMessage::Error { .. }]));

        let mut h = Harness::started(2);
        h.send(0, json!({"type": "send_react", "text": "chaos"}));
        h.send(0, json!({"type": "send_choice", "text": "1"}));
        assert_eq!(h.inbox(0).len(), 2);
        assert_eq!(h.state(), GameState::Prompting);
        assert!(h.session.players().iter().all(|p| !p.ready));
    }

    #[test]
    fn test_unknown_and_malformed_messages_are_ignored() {
        let mut h = Harness::new(2, 8);
        let a = h.join("Ann");
        h.clear_inboxes();

        h.send(a, json!({"type": "dance"}));
        h.send(a, json!({"playerName": "no type"}));
        let id = h.clients[a].id;
        h.session.on_message(id, "{not json");
        h.session.on_message(Uuid::new_v4(), r#"{"type":"start_game"}"#);

        assert!(h.inbox(a).is_empty());
        assert_eq!(h.state(), GameState::Lobby);
        assert_eq!(h.session.players().count(), 1);
    }

    #[test]
    fn test_second_submission_is_not_double_counted() {
        let mut h = Harness::started(3);
        h.send(0, json!({"type": "send_prompt", "text": "first"}));
        h.send(0, json!({"type": "send_prompt", "text": "second"}));
        h.send(1, json!({"type": "send_prompt", "text": "other"}));
        assert_eq!(h.state(), GameState::Prompting);
        assert_eq!(h.session.rounds().submission_count(), 2);
        assert_eq!(
            h.session.rounds().submission(h.clients[0].id),
            Some("first")
        );
    }

    #[test]
    fn test_disconnect_while_prompting_does_not_stall() {
        let mut h = Harness::started(3);
        h.send(0, json!({"type": "send_prompt", "text": "one"}));
        h.send(1, json!({"type": "send_prompt", "text": "two"}));
        assert_eq!(h.state(), GameState::Prompting);

        h.disconnect(2);
        assert_eq!(h.state(), GameState::Reacting);
        h.settle();
        let a = answer_of(&h.inbox(0));
        let b = answer_of(&h.inbox(1));
        assert_eq!(a.0, b.0);
        assert!(a.1 ^ b.1);
    }

    #[test]
    fn test_presenter_leaving_mid_reveal_moves_on() {
        let mut h = Harness::started(3);
        for i in 0..3 {
            h.send(i, json!({"type": "send_prompt", "text": format!("answer {i}")}));
        }
        h.settle();
        let presenter = (0..3)
            .find(|&i| answer_of(&h.inbox(i)).1)
            .unwrap();

        h.disconnect(presenter);
        assert_eq!(h.state(), GameState::Reacting);
        assert_eq!(h.session.story().beats().len(), 1);
        // a departing host hands over with a joined update
        h.clear_inboxes();

        h.settle();
        let others: Vec<usize> = (0..3).filter(|&i| i != presenter).collect();
        let x = answer_of(&h.inbox(others[0]));
        let y = answer_of(&h.inbox(others[1]));
        assert_eq!(x.0, y.0);
        assert!(x.1 ^ y.1);
    }

    /// Three players in round 2: one votes, the other leaves, the reveal advances
    #[test]
    fn test_voter_leaving_mid_vote_moves_on() {
        let mut h = Harness::new(2, 8);
        for name in ["Ann", "Bo", "Cy"] {
            h.join(name);
        }
        h.send(0, json!({"type": "start_game"}));
        h.play_until_presenting(GameState::Voting);
        assert_eq!(h.session.story().round(), 2);
        let beats = h.session.story().beats().len();

        let presenter = h.index_of(h.session.rounds().presenter().unwrap());
        let others: Vec<usize> = (0..3).filter(|&i| i != presenter).collect();
        let (voter, leaver) = (others[0], others[1]);
        let pick = h
            .inbox(voter)
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::ShowChoices { text, .. } => Some(split_options(&text)[0].clone()),
                _ => None,
            })
            .unwrap();
        h.send(voter, json!({"type": "send_choice", "text": pick}));
        assert_eq!(h.session.story().beats().len(), beats);

        h.disconnect(leaver);
        assert_eq!(h.session.story().beats().len(), beats + 1);
        h.settle();
        assert_eq!(h.state(), GameState::Voting);
        // the leaver's own answer is gone, so the voter presents next
        assert_eq!(
            h.session.rounds().presenter(),
            Some(h.clients[voter].id)
        );
    }

    #[test]
    fn test_disconnect_while_talking_starts_round_without_them() {
        let mut h = Harness::new(2, 8);
        let a = h.join("Ann");
        let b = h.join("Bo");
        h.send(a, json!({"type": "start_game"}));
        assert_eq!(h.state(), GameState::Talking);

        h.disconnect(b);
        assert_eq!(h.state(), GameState::Talking);
        h.settle();
        assert_eq!(h.state(), GameState::Prompting);
        prompt_of(&h.inbox(a));

        h.send(a, json!({"type": "send_prompt", "text": "alone"}));
        assert_eq!(h.state(), GameState::Reacting);
    }

    #[test]
    fn test_everyone_leaving_ends_the_game() {
        let mut h = Harness::started(2);
        h.disconnect(0);
        assert_eq!(h.state(), GameState::Prompting);
        h.disconnect(1);
        assert_eq!(h.state(), GameState::Ended);
        assert_eq!(h.settle(), 1, "only the closing narration remains");
    }

    #[test]
    fn test_late_joiner_does_not_block_the_round() {
        let mut h = Harness::started(2);
        let late = h.join("Late");
        assert!(h.session.players().get(h.clients[late].id).unwrap().ready);

        h.send(0, json!({"type": "send_prompt", "text": "one"}));
        h.send(1, json!({"type": "send_prompt", "text": "two"}));
        assert_eq!(h.state(), GameState::Reacting);
        assert_eq!(h.session.rounds().submission_count(), 2);
    }

    #[test]
    fn test_votes_are_scored_in_game_over() {
        let mut h = Harness::new(2, 8);
        h.join("Ann");
        h.join("Bo");
        h.send(0, json!({"type": "start_game"}));
        h.play_out();

        let scores = h.clients[0]
            .log
            .iter()
            .find_map(|m| match m {
                ServerMessage::GameOver { scores, .. } => Some(scores.clone()),
                _ => None,
            })
            .unwrap();
        let total: u32 = scores.iter().map(|s| s.score).sum();
        // five voted rounds, two reveals each, one voter per reveal
        assert_eq!(total, 10);
        assert!(scores.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_submission_timeout_skips_silent_players() {
        let mut h = Harness::with_config(GameConfig {
            submission_timeout: Some(Duration::from_millis(30)),
            ..test_config(2, 8)
        });
        h.join("Ann");
        h.join("Bo");
        h.send(0, json!({"type": "start_game"}));
        h.settle();
        assert_eq!(h.state(), GameState::Prompting);

        h.send(0, json!({"type": "send_prompt", "text": "only me"}));
        tokio::time::sleep(Duration::from_millis(120)).await;
        h.settle();

        assert_eq!(h.state(), GameState::Reacting);
        assert_eq!(h.session.rounds().submission_count(), 1);
        assert_eq!(h.session.rounds().presenter(), Some(h.clients[0].id));
    }

    #[tokio::test]
    async fn test_stale_timeout_does_not_skip_the_next_step() {
        let mut h = Harness::with_config(GameConfig {
            submission_timeout: Some(Duration::from_millis(30)),
            ..test_config(2, 8)
        });
        h.join("Ann");
        h.join("Bo");
        h.send(0, json!({"type": "start_game"}));
        h.settle();

        h.send(0, json!({"type": "send_prompt", "text": "one"}));
        h.send(1, json!({"type": "send_prompt", "text": "two"}));
        assert_eq!(h.state(), GameState::Reacting);

        // the prompting timer fires while the first answer is still staged
        tokio::time::sleep(Duration::from_millis(60)).await;
        h.settle();
        assert!(h.session.rounds().is_presenting());
        assert_eq!(h.session.players().pending().len(), 1);
    }

    #[tokio::test]
    async fn test_submission_timeout_skips_silent_reactor() {
        let mut h = Harness::with_config(GameConfig {
            submission_timeout: Some(Duration::from_millis(30)),
            ..test_config(2, 8)
        });
        h.join("Ann");
        h.join("Bo");
        h.send(0, json!({"type": "start_game"}));
        h.settle();
        h.send(0, json!({"type": "send_prompt", "text": "one"}));
        h.send(1, json!({"type": "send_prompt", "text": "two"}));
        h.settle();
        let first = h.session.rounds().presenter().unwrap();
        assert_eq!(h.session.players().pending().len(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        h.settle();

        assert_eq!(h.state(), GameState::Reacting);
        assert_eq!(h.session.story().beats().len(), 1);
        assert_eq!(h.session.story().beats()[0].reaction, None);
        let second = h.session.rounds().presenter().unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_submission_timeout_skips_silent_voter() {
        let mut h = Harness::with_config(GameConfig {
            submission_timeout: Some(Duration::from_millis(30)),
            ..test_config(2, 8)
        });
        h.join("Ann");
        h.join("Bo");
        h.send(0, json!({"type": "start_game"}));
        h.play_until_presenting(GameState::Voting);
        let first = h.session.rounds().presenter().unwrap();
        let beats = h.session.story().beats().len();

        tokio::time::sleep(Duration::from_millis(80)).await;
        h.settle();

        assert_eq!(h.state(), GameState::Voting);
        assert_eq!(h.session.story().beats().len(), beats + 1);
        assert_ne!(h.session.rounds().presenter(), Some(first));
        assert!(h.session.rounds().is_presenting());
        let scores: u32 = h.session.players().iter().map(|p| p.score).sum();
        assert_eq!(scores, 0, "a skipped vote scores nothing");
    }
}

#[cfg(test)]
mod server_tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio_tungstenite::{connect_async, tungstenite::Message};

    async fn recv<S>(ws: &mut S) -> ServerMessage
    where
        S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for server")
                .expect("socket closed")
                .expect("socket error");
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    async fn send<S>(ws: &mut S, value: Value)
    where
        S: futures::Sink<Message> + Unpin,
        S::Error: std::fmt::Debug,
    {
        ws.send(Message::Text(value.to_string())).await.unwrap();
    }

    /// Two websocket clients join through the real router and get round 1 prompts
    #[tokio::test]
    async fn test_websocket_clients_join_and_start() {
        let queue = EventQueue::new();
        let session = create_test_session(queue.clone(), test_config(2, 8));
        tokio::spawn(crate::run_logic_loop(
            session,
            queue.clone(),
            Duration::from_millis(5),
        ));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, crate::app(queue)).await.unwrap();
        });
        let url = format!("ws://{addr}/ws");

        let (mut a, _) = connect_async(url.as_str()).await.unwrap();
        send(&mut a, json!({"type": "join", "playerName": "Ann"})).await;
        assert_eq!(recv(&mut a).await, joined("Ann", true, false));

        let (mut b, _) = connect_async(url.as_str()).await.unwrap();
        send(&mut b, json!({"type": "join", "playerName": "Bo"})).await;
        assert_eq!(recv(&mut a).await, joined("Ann", true, true));
        assert_eq!(recv(&mut b).await, joined("Bo", false, true));

        send(&mut a, json!({"type": "start_game"})).await;
        assert_eq!(recv(&mut a).await, ServerMessage::StartGame);
        assert_eq!(recv(&mut b).await, ServerMessage::StartGame);

        for ws in [&mut a, &mut b] {
            match recv(ws).await {
                ServerMessage::ShowPrompt { input_type, .. } => {
                    assert_eq!(input_type, InputType::Text)
                }
                other => panic!("expected show_prompt, got {other:?}"),
            }
        }
    }
}
