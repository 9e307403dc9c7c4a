//! Dialog navigation guard: BACK/REPEAT/NEXT/STOP meta-intents.
//!
//! Runs before NLU and the FSM, operating only on the dialog stack. STOP is
//! always honored; the rest obey the admin navigation toggles (checked by
//! the orchestrator).

use std::sync::OnceLock;

use regex::Regex;

use kelner_core::text::normalize;

use crate::types::{Intent, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Back,
    Repeat,
    Next,
    Stop,
}

impl NavAction {
    pub fn intent(&self) -> Intent {
        match self {
            NavAction::Back => Intent::DialogBack,
            NavAction::Repeat => Intent::DialogRepeat,
            NavAction::Next => Intent::DialogNext,
            NavAction::Stop => Intent::DialogStop,
        }
    }
}

fn stop_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(stop|wystarczy|cisza)\b").expect("static regex"))
}

fn back_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(cofnij|wroc|poprzednie|pokaz poprzednie)\b").expect("static regex")
    })
}

fn repeat_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\bpowtorz\b|jeszcze raz)").expect("static regex"))
}

fn next_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(dalej|nastepne|pokaz wiecej)\b").expect("static regex")
    })
}

/// Classify an utterance as a meta-intent, or `None` for regular input.
pub fn detect(input: &str) -> Option<NavAction> {
    let folded = normalize(input);
    if stop_re().is_match(&folded) {
        return Some(NavAction::Stop);
    }
    if back_re().is_match(&folded) {
        return Some(NavAction::Back);
    }
    if repeat_re().is_match(&folded) {
        return Some(NavAction::Repeat);
    }
    if next_re().is_match(&folded) {
        return Some(NavAction::Next);
    }
    None
}

pub struct NavReply {
    pub intent: Intent,
    pub reply: String,
    pub should_reply: bool,
    pub stop_tts: bool,
}

/// Execute a meta-intent against the session's dialog stack.
pub fn apply(session: &mut Session, action: NavAction) -> NavReply {
    match action {
        NavAction::Stop => {
            session.stop_tts = true;
            NavReply {
                intent: Intent::DialogStop,
                reply: String::new(),
                should_reply: false,
                stop_tts: true,
            }
        }
        NavAction::Back => {
            let reply = session
                .dialog_stack
                .back()
                .map(|e| e.rendered_text.clone())
                .unwrap_or_else(|| "Nie mam wcześniejszego widoku.".to_string());
            NavReply {
                intent: Intent::DialogBack,
                reply,
                should_reply: true,
                stop_tts: false,
            }
        }
        NavAction::Repeat => {
            let reply = session
                .dialog_stack
                .current()
                .map(|e| e.rendered_text.clone())
                .unwrap_or_else(|| "Nie mam czego powtórzyć.".to_string());
            NavReply {
                intent: Intent::DialogRepeat,
                reply,
                should_reply: true,
                stop_tts: false,
            }
        }
        NavAction::Next => {
            let reply = session
                .dialog_stack
                .forward()
                .map(|e| e.rendered_text.clone())
                .unwrap_or_else(|| "To już wszystko, nic więcej nie mam.".to_string());
            NavReply {
                intent: Intent::DialogNext,
                reply,
                should_reply: true,
                stop_tts: false,
            }
        }
    }
}
