//! The shared host display.
//!
//! Every call is single shot: the continuation is queued exactly once, after
//! the text has been on screen long enough to read. The game logic never
//! waits on wall-clock time itself.

use crate::config::Pacing;
use crate::event_queue::{Event, EventQueue};
use crate::session::Session;
use std::time::Duration;

pub type Done = Event<Session>;

pub trait Screen: Send {
    fn show_narrative(&self, text: &str, done: Done);
    fn show_submission(&self, author: &str, answer: &str, done: Done);
    fn show_choices(&self, author: &str, options: &[String], done: Done);
}

/// Narrative is read out one sentence at a time.
pub fn sentences(text: &str) -> Vec<String> {
    text.split(". ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Prints to the server terminal and holds each line for its reading time.
pub struct PacedScreen {
    queue: EventQueue<Session>,
    pacing: Pacing,
}

impl PacedScreen {
    pub fn new(queue: EventQueue<Session>, pacing: Pacing) -> Self {
        PacedScreen { queue, pacing }
    }

    fn play(&self, lines: Vec<String>, done: Done) {
        let delays: Vec<Duration> = lines.iter().map(|l| self.pacing.display_time(l)).collect();
        let queue = self.queue.clone();
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No runtime for screen pacing, completing immediately");
            for line in &lines {
                println!("  | {line}");
            }
            queue.enqueue(done);
            return;
        };
        handle.spawn(async move {
            for (line, delay) in lines.iter().zip(delays) {
                println!("  | {line}");
                tokio::time::sleep(delay).await;
            }
            println!();
            queue.enqueue(done);
        });
    }
}

impl Screen for PacedScreen {
    fn show_narrative(&self, text: &str, done: Done) {
        self.play(sentences(text), done);
    }

    fn show_submission(&self, author: &str, answer: &str, done: Done) {
        self.play(vec![format!("{author}: {answer}")], done);
    }

    fn show_choices(&self, author: &str, options: &[String], done: Done) {
        let mut lines = vec![format!("{author}'s answer is one of:")];
        lines.extend(options.iter().enumerate().map(|(i, o)| format!("{}. {o}", i + 1)));
        self.play(lines, done);
    }
}

/// Completes on the next drain. Used to run whole games inside tests.
#[cfg(test)]
pub struct InstantScreen {
    queue: EventQueue<Session>,
}

#[cfg(test)]
impl InstantScreen {
    pub fn new(queue: EventQueue<Session>) -> Self {
        InstantScreen { queue }
    }
}

#[cfg(test)]
impl Screen for InstantScreen {
    fn show_narrative(&self, text: &str, done: Done) {
        tracing::debug!(text, "narrative");
        self.queue.enqueue(done);
    }

    fn show_submission(&self, author: &str, answer: &str, done: Done) {
        tracing::debug!(author, answer, "submission");
        self.queue.enqueue(done);
    }

    fn show_choices(&self, author: &str, options: &[String], done: Done) {
        tracing::debug!(author, ?options, "choices");
        self.queue.enqueue(done);
    }
}
