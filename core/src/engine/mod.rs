pub mod rules;

pub use rules::Rule;

use crate::config::Config;
use crate::store::{History, Knowledge, Profile, Store};
use crate::text::normalize;
use anyhow::{Result, bail};
use tracing::debug;

/// One incoming message, in the two shapes rules look at.
pub struct Turn {
    pub raw: String,
    pub normalized: String,
}

impl Turn {
    pub fn new(text: &str) -> Self {
        let raw = text.trim().to_string();
        let normalized = normalize(&raw);
        Turn { raw, normalized }
    }
}

/// Everything a rule may read or mutate while producing a reply.
pub struct EngineState {
    pub store: Store,
    pub config: Config,
    pub knowledge: Knowledge,
    pub history: History,
    pub profile: Profile,
}

impl EngineState {
    pub fn save_all(&self) -> Result<()> {
        self.store.save_history(&self.history)?;
        self.store.save_knowledge(&self.knowledge)?;
        self.store.save_profile(&self.profile)?;
        Ok(())
    }
}

/// The rule chain behind every reply. Rules run in a fixed order and the
/// first one that produces a reply wins; the fallback at the end always
/// answers.
pub struct Engine {
    rules: Vec<Box<dyn Rule>>,
    state: EngineState,
}

impl Engine {
    pub fn open(config: Config) -> Result<Self> {
        let store = Store::open(&config.data_dir)?;
        let knowledge = store.load_knowledge()?;
        let history = store.load_history()?;
        let profile = store.load_profile()?;

        Ok(Engine {
            rules: rules::default_rules(),
            state: EngineState {
                store,
                config,
                knowledge,
                history,
                profile,
            },
        })
    }

    /// Produces a reply and appends the exchange to the in-memory history.
    /// Knowledge and profile changes are persisted by the rules that make
    /// them; the history itself is only written on demand.
    pub fn respond(&mut self, text: &str) -> Result<String> {
        let turn = Turn::new(text);
        if turn.raw.is_empty() {
            bail!("empty message");
        }

        for rule in &self.rules {
            if let Some(reply) = rule.apply(&turn, &mut self.state)? {
                debug!(rule = rule.name(), "rule matched");
                let limit = self.state.config.history_limit;
                self.state
                    .history
                    .push(turn.raw.clone(), reply.clone(), limit);
                return Ok(reply);
            }
        }

        bail!("no rule replied to '{}'", turn.raw)
    }

    pub fn save_all(&self) -> Result<()> {
        self.state.save_all()
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.state.history.clear();
        self.state.store.save_history(&self.state.history)
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_engine(tmp: &TempDir) -> Engine {
        let config = Config {
            data_dir: tmp.path().to_path_buf(),
            ..Config::default()
        };
        Engine::open(config).unwrap()
    }

    fn named_engine(tmp: &TempDir) -> Engine {
        let mut engine = open_engine(tmp);
        engine.respond("Ada").unwrap();
        engine
    }

    #[test]
    fn first_message_becomes_name() {
        let tmp = TempDir::new().unwrap();
        let mut engine = open_engine(&tmp);
        let reply = engine.respond("  ada lovelace ").unwrap();
        assert_eq!(
            reply,
            "Nice to meet you Ada Lovelace! I will remember your name."
        );

        // The capture is persisted right away.
        let store = Store::open(tmp.path()).unwrap();
        let profile = store.load_profile().unwrap();
        assert_eq!(profile.name.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn name_capture_outranks_every_other_rule() {
        let tmp = TempDir::new().unwrap();
        let mut engine = open_engine(&tmp);
        let reply = engine.respond("2+2").unwrap();
        assert_eq!(reply, "Nice to meet you 2+2! I will remember your name.");
    }

    #[test]
    fn seeded_knowledge_answers_hello_before_greeting() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        let reply = engine.respond("Hello!").unwrap();
        assert_eq!(reply, "Hello! How can I help you today?");
    }

    #[test]
    fn greeting_matches_by_substring() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        assert_eq!(engine.respond("hey there").unwrap(), "Hello Ada! Ask 'help'.");
        assert_eq!(
            engine.respond("this is my chair").unwrap(),
            "Hello Ada! Ask 'help'."
        );
    }

    #[test]
    fn teach_learns_and_persists() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);

        let reply = engine.respond("teach:What's Rust?=>A systems language.").unwrap();
        assert_eq!(reply, "Learned: 'What's Rust?' → 'A systems language.'");
        assert_eq!(engine.respond("whats rust").unwrap(), "A systems language.");

        let store = Store::open(tmp.path()).unwrap();
        let kb = store.load_knowledge().unwrap();
        assert_eq!(kb.lookup("whats rust"), Some("A systems language."));
    }

    #[test]
    fn teach_is_case_insensitive_and_strict_about_format() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        assert_eq!(
            engine.respond("TEACH:a=>b").unwrap(),
            "Learned: 'a' → 'b'"
        );
        assert_eq!(
            engine.respond("teach:no arrow here").unwrap(),
            "Teach format: teach:question=>answer"
        );
        assert_eq!(
            engine.respond("teach:??!=>answer").unwrap(),
            "Teach format: teach:question=>answer"
        );
    }

    #[test]
    fn show_knowledge_lists_entries() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        for command in ["Show Knowledge", "knowledge", "show kb"] {
            let reply = engine.respond(command).unwrap();
            assert!(reply.contains("hello → Hello! How can I help you today?"));
        }
    }

    #[test]
    fn save_conversation_writes_everything_up_to_that_point() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        engine.respond("2+2").unwrap();
        assert_eq!(engine.respond("please save conversation now").unwrap(), "Saved.");

        // The save itself is not part of the persisted history; it is only
        // appended in memory after the rule ran.
        let store = Store::open(tmp.path()).unwrap();
        let history = store.load_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.tail(1)[0].user, "2+2");
        assert_eq!(engine.state().history.len(), 3);
    }

    #[test]
    fn calc_prefix_evaluates_with_functions() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        assert_eq!(engine.respond("calc sqrt(16)").unwrap(), "4");
        assert_eq!(engine.respond("CALC 2+2").unwrap(), "4");
        assert_eq!(engine.respond("calc pow(2, 10)").unwrap(), "1024");
    }

    #[test]
    fn calc_without_expression_reports_math_error() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        let reply = engine.respond("calc what").unwrap();
        assert!(reply.starts_with("Math error:"));
    }

    #[test]
    fn bare_calc_falls_through_to_fallback() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        assert_eq!(
            engine.respond("calc").unwrap(),
            "Sorry Ada, I don't understand. Try 'help'."
        );
    }

    #[test]
    fn bare_expressions_are_detected_and_evaluated() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        assert_eq!(engine.respond("2+2*2").unwrap(), "6");
        assert_eq!(engine.respond("(1 + 2) * 3").unwrap(), "9");
        assert_eq!(engine.respond("5!").unwrap(), "120");
        assert_eq!(engine.respond("2^10").unwrap(), "1024");
    }

    #[test]
    fn expression_lookalikes_report_math_errors() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        // Every character is in the expression alphabet, so this reaches the
        // evaluator instead of falling through.
        let reply = engine.respond("pie").unwrap();
        assert!(reply.starts_with("Math error:"));
        let reply = engine.respond("1/0").unwrap();
        assert!(reply.starts_with("Math error:"));

        // Runaway nesting comes back as a reply too.
        let deep = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
        let reply = engine.respond(&deep).unwrap();
        assert!(reply.starts_with("Math error:"));
    }

    #[test]
    fn time_and_date_rules() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);

        let reply = engine.respond("what time is it").unwrap();
        assert_eq!(reply.matches(':').count(), 2);

        let reply = engine.respond("date please").unwrap();
        let year = chrono::Local::now().format("%Y").to_string();
        assert!(reply.contains(&year));
        assert!(reply.contains(','));
    }

    #[test]
    fn fallback_mentions_the_user() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        assert_eq!(
            engine.respond("qwerty zxcvb").unwrap(),
            "Sorry Ada, I don't understand. Try 'help'."
        );
    }

    #[test]
    fn empty_message_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        assert!(engine.respond("   ").is_err());
    }

    #[test]
    fn history_is_trimmed_to_the_configured_limit() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            data_dir: tmp.path().to_path_buf(),
            history_limit: 2,
            ..Config::default()
        };
        let mut engine = Engine::open(config).unwrap();
        engine.respond("Ada").unwrap();
        engine.respond("1+1").unwrap();
        engine.respond("2+2").unwrap();
        assert_eq!(engine.state().history.len(), 2);
        assert_eq!(engine.state().history.tail(2)[0].user, "1+1");
    }

    #[test]
    fn clear_history_persists_immediately() {
        let tmp = TempDir::new().unwrap();
        let mut engine = named_engine(&tmp);
        engine.respond("2+2").unwrap();
        engine.save_all().unwrap();
        engine.clear_history().unwrap();

        let store = Store::open(tmp.path()).unwrap();
        assert!(store.load_history().unwrap().is_empty());
        assert!(engine.state().history.is_empty());
    }
}
