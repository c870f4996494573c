//! Asking a chat model about a rendered report.
//!
//! The model itself is a collaborator behind [`ChatModel`]; this module only
//! composes prompts and keeps the conversation log bounded.

use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::error::{ReportError, Result};
use crate::types::ReportText;

pub const SYSTEM_PROMPT: &str =
    "You are a data analyst with a focus on digital growth and conversion optimization.";

/// Anything that can answer a single chat turn.
pub trait ChatModel {
    fn complete(&self, system: &str, user: &str) -> std::result::Result<String, String>;
}

impl<F> ChatModel for F
where
    F: Fn(&str, &str) -> std::result::Result<String, String>,
{
    fn complete(&self, system: &str, user: &str) -> std::result::Result<String, String> {
        self(system, user)
    }
}

/// Append-only conversation memory with a character budget.
///
/// The preamble (business context) is always kept; when the budget is
/// exceeded the oldest turns are dropped first. A single turn larger than
/// the whole budget is still kept as the latest turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationLog {
    preamble: String,
    turns: VecDeque<String>,
    budget: usize,
}

impl ConversationLog {
    pub fn new(preamble: impl Into<String>, budget: usize) -> Self {
        ConversationLog {
            preamble: preamble.into(),
            turns: VecDeque::new(),
            budget,
        }
    }

    pub fn record(&mut self, question: &str, answer: &str) {
        self.turns
            .push_back(format!("User: {}\nModel: {}", question, answer));
        let mut dropped = 0usize;
        while self.turns.len() > 1 && self.rendered_len() > self.budget {
            self.turns.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, kept = self.turns.len(), "trimmed conversation log");
        }
    }

    pub fn turns(&self) -> impl Iterator<Item = &str> {
        self.turns.iter().map(String::as_str)
    }

    pub fn render(&self) -> String {
        let mut out = self.preamble.clone();
        for turn in &self.turns {
            out.push('\n');
            out.push_str(turn);
            out.push('\n');
        }
        out
    }

    fn rendered_len(&self) -> usize {
        self.preamble.chars().count()
            + self
                .turns
                .iter()
                .map(|t| t.chars().count() + 2)
                .sum::<usize>()
    }
}

pub fn compose_prompt(context: &str, report: &ReportText, question: &str) -> String {
    format!(
        "{}\n\nData Summary:\n{}\n\nUser Question: {}",
        context,
        report.as_str(),
        question
    )
}

/// Ask `model` about `report`. The turn is logged only when the model answers.
pub fn ask(
    model: &dyn ChatModel,
    log: &mut ConversationLog,
    report: &ReportText,
    question: &str,
) -> Result<String> {
    let prompt = compose_prompt(&log.render(), report, question);
    match model.complete(SYSTEM_PROMPT, &prompt) {
        Ok(answer) => {
            log.record(question, &answer);
            Ok(answer)
        }
        Err(e) => {
            warn!(error = %e, "chat model request failed");
            Err(ReportError::Chat(e))
        }
    }
}
