use super::{EngineState, Turn};
use crate::eval;
use crate::text::title_case;
use anyhow::Result;
use chrono::Local;

const GREETING_WORDS: &[&str] = &["hello", "hi", "hey"];
const KNOWLEDGE_COMMANDS: &[&str] = &["show knowledge", "knowledge", "show kb"];
const TEACH_PREFIX: &str = "teach:";
const CALC_PREFIX: &str = "calc ";
const TEACH_HINT: &str = "Teach format: teach:question=>answer";

// The alphabet of a bare arithmetic message. `e`, `E`, `p` and `i` are in it
// so expressions can use the constants, which also routes inputs like "pie"
// to the evaluator.
const EXPRESSION_CHARS: &str = "0123456789.+-*/()%^!eEpi";

/// A single dispatch rule. Returning Ok(None) passes the turn to the next
/// rule in the chain.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, turn: &Turn, state: &mut EngineState) -> Result<Option<String>>;
}

/// The full chain, in match order. Order is load-bearing: seeded knowledge
/// answers "hello" before the greeting rule sees it, and the calc prefix
/// outranks bare expression detection.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(CaptureName),
        Box::new(Teach),
        Box::new(ShowKnowledge),
        Box::new(SaveConversation),
        Box::new(Calculate),
        Box::new(BareExpression),
        Box::new(AnswerFromKnowledge),
        Box::new(Greet),
        Box::new(TellTime),
        Box::new(TellDate),
        Box::new(Fallback),
    ]
}

/// Until a name is known, the next message is the name.
struct CaptureName;

impl Rule for CaptureName {
    fn name(&self) -> &'static str {
        "capture_name"
    }

    fn apply(&self, turn: &Turn, state: &mut EngineState) -> Result<Option<String>> {
        if state.profile.name.is_some() {
            return Ok(None);
        }

        let name = title_case(&turn.raw);
        state.profile.name = Some(name.clone());
        state.store.save_profile(&state.profile)?;

        Ok(Some(format!(
            "Nice to meet you {}! I will remember your name.",
            name
        )))
    }
}

struct Teach;

impl Rule for Teach {
    fn name(&self) -> &'static str {
        "teach"
    }

    fn apply(&self, turn: &Turn, state: &mut EngineState) -> Result<Option<String>> {
        let Some(rest) = strip_prefix_ignore_case(&turn.raw, TEACH_PREFIX) else {
            return Ok(None);
        };
        let Some((question, answer)) = rest.split_once("=>") else {
            return Ok(Some(TEACH_HINT.to_string()));
        };

        match state.knowledge.teach(question, answer) {
            Some(_) => {
                state.store.save_knowledge(&state.knowledge)?;
                Ok(Some(format!(
                    "Learned: '{}' → '{}'",
                    question.trim(),
                    answer.trim()
                )))
            }
            None => Ok(Some(TEACH_HINT.to_string())),
        }
    }
}

struct ShowKnowledge;

impl Rule for ShowKnowledge {
    fn name(&self) -> &'static str {
        "show_knowledge"
    }

    fn apply(&self, turn: &Turn, state: &mut EngineState) -> Result<Option<String>> {
        if !KNOWLEDGE_COMMANDS.contains(&turn.normalized.as_str()) {
            return Ok(None);
        }
        if state.knowledge.is_empty() {
            return Ok(Some("Nothing learned yet.".to_string()));
        }

        let lines: Vec<String> = state
            .knowledge
            .iter()
            .map(|(question, answer)| format!("{} → {}", question, answer))
            .collect();
        Ok(Some(lines.join("\n")))
    }
}

struct SaveConversation;

impl Rule for SaveConversation {
    fn name(&self) -> &'static str {
        "save_conversation"
    }

    fn apply(&self, turn: &Turn, state: &mut EngineState) -> Result<Option<String>> {
        if !turn.normalized.contains("save conversation") {
            return Ok(None);
        }
        state.save_all()?;
        Ok(Some("Saved.".to_string()))
    }
}

/// `calc <expr>` evaluates whatever follows the prefix, so function calls
/// like `calc pow(2, 10)` work here even though the bare detector would
/// never accept them.
struct Calculate;

impl Rule for Calculate {
    fn name(&self) -> &'static str {
        "calculate"
    }

    fn apply(&self, turn: &Turn, _state: &mut EngineState) -> Result<Option<String>> {
        match strip_prefix_ignore_case(&turn.raw, CALC_PREFIX) {
            Some(expr) => Ok(Some(eval_reply(expr))),
            None => Ok(None),
        }
    }
}

struct BareExpression;

impl Rule for BareExpression {
    fn name(&self) -> &'static str {
        "bare_expression"
    }

    fn apply(&self, turn: &Turn, _state: &mut EngineState) -> Result<Option<String>> {
        if looks_like_expression(&turn.raw) {
            Ok(Some(eval_reply(&turn.raw)))
        } else {
            Ok(None)
        }
    }
}

struct AnswerFromKnowledge;

impl Rule for AnswerFromKnowledge {
    fn name(&self) -> &'static str {
        "answer_from_knowledge"
    }

    fn apply(&self, turn: &Turn, state: &mut EngineState) -> Result<Option<String>> {
        Ok(state.knowledge.lookup(&turn.raw).map(String::from))
    }
}

struct Greet;

impl Rule for Greet {
    fn name(&self) -> &'static str {
        "greet"
    }

    fn apply(&self, turn: &Turn, state: &mut EngineState) -> Result<Option<String>> {
        if GREETING_WORDS
            .iter()
            .any(|word| turn.normalized.contains(word))
        {
            Ok(Some(format!(
                "Hello {}! Ask 'help'.",
                state.profile.display_name()
            )))
        } else {
            Ok(None)
        }
    }
}

struct TellTime;

impl Rule for TellTime {
    fn name(&self) -> &'static str {
        "tell_time"
    }

    fn apply(&self, turn: &Turn, _state: &mut EngineState) -> Result<Option<String>> {
        if turn.normalized.contains("time") {
            Ok(Some(Local::now().format("%H:%M:%S").to_string()))
        } else {
            Ok(None)
        }
    }
}

struct TellDate;

impl Rule for TellDate {
    fn name(&self) -> &'static str {
        "tell_date"
    }

    fn apply(&self, turn: &Turn, _state: &mut EngineState) -> Result<Option<String>> {
        if turn.normalized.contains("date") {
            Ok(Some(Local::now().format("%A, %d %B %Y").to_string()))
        } else {
            Ok(None)
        }
    }
}

struct Fallback;

impl Rule for Fallback {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn apply(&self, _turn: &Turn, state: &mut EngineState) -> Result<Option<String>> {
        Ok(Some(format!(
            "Sorry {}, I don't understand. Try 'help'.",
            state.profile.display_name()
        )))
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

fn looks_like_expression(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_whitespace() || EXPRESSION_CHARS.contains(c))
}

fn eval_reply(expr: &str) -> String {
    match eval::evaluate(expr) {
        Ok(value) => eval::format_value(value),
        Err(e) => format!("Math error: {}", e),
    }
}
