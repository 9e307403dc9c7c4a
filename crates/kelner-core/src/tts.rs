//! TTS text pipeline: speech polishing, sentence chunking, pacing and an
//! abortable chunk stream. The actual synthesizer is a collaborator behind
//! `SpeechSynthesizer`; everything here is offline text work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use rand::Rng;
use regex::Regex;

use crate::settings::settings;
use crate::text::ordinal_intro_pl;

#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    #[error("synthesis timed out")]
    Timeout,
}

/// External synthesizer seam. Returns encoded audio bytes.
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    pub rate: f64,
    pub pitch: f64,
    pub pause_between_chunks_ms: u64,
    pub pause_jitter_ms: u64,
}

impl Pacing {
    pub fn from_settings() -> Self {
        let tts = &settings().tts;
        Self {
            rate: tts.rate,
            pitch: tts.pitch,
            pause_between_chunks_ms: tts.pause_between_chunks_ms,
            pause_jitter_ms: tts.pause_jitter_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtsPlan {
    pub chunks: Vec<String>,
    pub pacing: Pacing,
}

fn leading_enum_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\.\s+").expect("static regex"))
}

fn inline_enum_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" (\d+)\.\s+").expect("static regex"))
}

fn sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^.!?]+[.!?]+").expect("static regex"))
}

/// Rewrite display text into something a voice can read.
///
/// List numbers become spoken ordinals ("1. " → "Po pierwsze, "), markdown
/// emphasis is stripped, dashes become commas, whitespace and duplicate
/// commas collapse. Idempotent.
pub fn polish_for_speech(text: &str) -> String {
    let mut out = leading_enum_re()
        .replace(text, |caps: &regex::Captures| {
            spoken_enum(&caps[1], "").unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned();
    out = inline_enum_re()
        .replace_all(&out, |caps: &regex::Captures| {
            spoken_enum(&caps[1], " ").unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned();

    out = out.replace("**", "").replace('*', "").replace('_', "");
    out = out.replace('–', ",").replace('—', ",");

    // Collapse whitespace, then comma runs left over from the replacements.
    out = out.split_whitespace().collect::<Vec<_>>().join(" ");
    while out.contains(", ,") {
        out = out.replace(", ,", ",");
    }
    while out.contains(",,") {
        out = out.replace(",,", ",");
    }
    out = out.replace(" ,", ",");
    out.trim().to_string()
}

fn spoken_enum(digits: &str, prefix: &str) -> Option<String> {
    let n: usize = digits.parse().ok()?;
    ordinal_intro_pl(n).map(|intro| format!("{prefix}{intro}, "))
}

/// Split polished text on sentence boundaries and greedily pack sentences
/// into chunks of at most `max_chars` characters, never breaking inside a
/// sentence. An oversized single sentence stays whole.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut sentences: Vec<String> = sentence_re()
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .collect();
    let matched_len: usize = sentence_re()
        .find_iter(text)
        .map(|m| m.end())
        .max()
        .unwrap_or(0);
    let tail = text[matched_len..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    for sentence in sentences {
        if current.is_empty() {
            current = sentence;
            continue;
        }
        if current.chars().count() + 1 + sentence.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(&sentence);
        } else {
            chunks.push(std::mem::take(&mut current));
            current = sentence;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Full plan for one reply: polish, chunk, attach pacing.
pub fn process_for_tts(text: &str) -> TtsPlan {
    let polished = polish_for_speech(text);
    let chunks = split_into_chunks(&polished, settings().tts.chunk_max_chars);
    TtsPlan {
        chunks,
        pacing: Pacing::from_settings(),
    }
}

/// When a reply carries a restaurant or menu list the UI already shows,
/// only the first sentence is spoken.
pub fn list_intro(reply: &str) -> String {
    split_into_chunks(reply, 1)
        .into_iter()
        .next()
        .unwrap_or_else(|| reply.to_string())
}

/// Stream chunks in order with a jittered pause between them, honoring the
/// abort flag (barge-in) before every chunk. Returns the number of chunks
/// delivered.
pub fn stream_chunks(
    text: &str,
    abort: &AtomicBool,
    mut sink: impl FnMut(&str),
) -> usize {
    let plan = process_for_tts(text);
    let mut delivered = 0;
    for (i, chunk) in plan.chunks.iter().enumerate() {
        if abort.load(Ordering::SeqCst) {
            break;
        }
        if i > 0 {
            let base = plan.pacing.pause_between_chunks_ms;
            let jitter = plan.pacing.pause_jitter_ms;
            let pause = if jitter > 0 {
                rand::thread_rng().gen_range(base.saturating_sub(jitter)..=base + jitter)
            } else {
                base
            };
            std::thread::sleep(Duration::from_millis(pause));
            if abort.load(Ordering::SeqCst) {
                break;
            }
        }
        sink(chunk);
        delivered += 1;
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polish_converts_list_numbers() {
        let out = polish_for_speech("1. Bar Praha 2. Pizzeria Roma");
        assert_eq!(out, "Po pierwsze, Bar Praha Po drugie, Pizzeria Roma");
    }

    #[test]
    fn test_polish_strips_markdown_and_dashes() {
        let out = polish_for_speech("**Ważne** – to jest _test_ — naprawdę");
        assert_eq!(out, "Ważne, to jest test, naprawdę");
    }

    #[test]
    fn test_polish_keeps_large_numbers() {
        let out = polish_for_speech("Pozycja 11. w rankingu");
        assert!(out.contains("11."));
    }

    #[test]
    fn test_polish_idempotent() {
        for s in [
            "1. Bar Praha 2. Pizzeria Roma",
            "**Ważne** – to jest _test_",
            "W Bytomiu mam 2 miejsca: 1. Bar, 2. Roma. Którą wybierasz?",
            "Zwykłe zdanie bez niczego.",
        ] {
            let once = polish_for_speech(s);
            assert_eq!(polish_for_speech(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_chunks_respect_sentences() {
        let text = "Pierwsze zdanie. Drugie zdanie! Trzecie zdanie?";
        let chunks = split_into_chunks(text, 35);
        assert_eq!(
            chunks,
            vec![
                "Pierwsze zdanie. Drugie zdanie!".to_string(),
                "Trzecie zdanie?".to_string()
            ]
        );
    }

    #[test]
    fn test_chunks_roundtrip_concatenation() {
        let text = "Raz dwa trzy. Cztery pięć sześć. Siedem osiem!";
        let chunks = split_into_chunks(text, 20);
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_oversized_sentence_stays_whole() {
        let text = "To jest bardzo długie zdanie które przekracza limit znaków w jednym kawałku.";
        let chunks = split_into_chunks(text, 10);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_chunks_tail_without_punctuation() {
        let chunks = split_into_chunks("Zdanie pierwsze. I ogon bez kropki", 100);
        assert_eq!(chunks, vec!["Zdanie pierwsze. I ogon bez kropki".to_string()]);
    }

    #[test]
    fn test_list_intro() {
        assert_eq!(
            list_intro("W Bytomiu mam 2 miejsca. Którą wybierasz?"),
            "W Bytomiu mam 2 miejsca."
        );
    }

    #[test]
    fn test_stream_aborts_immediately() {
        let abort = AtomicBool::new(true);
        let mut seen = Vec::new();
        let n = stream_chunks("Jedno. Drugie.", &abort, |c| seen.push(c.to_string()));
        assert_eq!(n, 0);
        assert!(seen.is_empty());
    }

    #[test]
    fn test_stream_delivers_in_order() {
        let abort = AtomicBool::new(false);
        let mut seen = Vec::new();
        stream_chunks("Jedno krótkie zdanie.", &abort, |c| seen.push(c.to_string()));
        assert_eq!(seen, vec!["Jedno krótkie zdanie.".to_string()]);
    }
}
