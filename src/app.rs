//! Application state and orchestration.
//!
//! `AppState` owns the session, the bookshelf and the preferences, and is the
//! only thing the front end talks to. Every state change is published as an
//! [`AppEvent`] to the subscribers; the front end renders from those events.
//!
//! A chat round trip is split in two so the request itself can run
//! elsewhere:
//!
//! ```text
//! begin_chat(msg) -> Some(ChatRequest)   // marks a request in flight
//!   ... transport.send(&request).await ...
//! finish_chat(result)                    // clears it, emits the reply
//! ```
//!
//! While a request is in flight `begin_chat` refuses new messages.

use crate::bookshelf::{AddOutcome, Book, Bookshelf, ShelfFilter};
use crate::domain::SkillDomain;
use crate::extract::{Recommendation, Resource};
use crate::postprocess::{PostProcessor, ProcessedReply};
use crate::session::SessionState;
use crate::store::{SharedStore, DARK_MODE_KEY};
use crate::transport::{ChatRequest, ChatTransport};
use crate::Result;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Who a chat message is from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Bot,
}

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Append a chat message
    Message { author: Author, text: String },
    /// Persona announcement after a domain switch
    Persona(String),
    /// Books from the last reply that can be added to the shelf
    Recommendations(Vec<Recommendation>),
    /// Links from the last reply
    Resources(Vec<Resource>),
    /// The shelf changed; carries the full listing, newest first
    BookshelfChanged(Vec<Book>),
    DarkModeChanged(bool),
    /// A request is pending (`true`) or finished (`false`)
    Waiting(bool),
    /// A message was refused because a request is still pending
    Busy,
}

pub struct AppState {
    session: SessionState,
    bookshelf: Bookshelf,
    store: SharedStore,
    post_processor: PostProcessor,
    dark_mode: bool,
    in_flight: bool,
    last_reply: Option<ProcessedReply>,
    subscribers: Vec<mpsc::UnboundedSender<AppEvent>>,
}

impl AppState {
    /// Build the state from what `store` holds
    pub fn load(store: SharedStore, initial_domain: SkillDomain) -> Result<Self> {
        let bookshelf = Bookshelf::load(store.clone())?;
        let dark_mode = match store.get(DARK_MODE_KEY) {
            Ok(value) => parse_flag(value.as_ref()),
            Err(e) => {
                warn!("Failed to read dark mode preference: {}", e);
                false
            }
        };

        info!(
            "App state loaded: domain={}, books={}, dark_mode={}",
            initial_domain,
            bookshelf.len(),
            dark_mode
        );

        Ok(Self {
            session: SessionState::new(initial_domain),
            bookshelf,
            store,
            post_processor: PostProcessor::new(),
            dark_mode,
            in_flight: false,
            last_reply: None,
            subscribers: Vec::new(),
        })
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<AppEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: AppEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn emit_shelf(&mut self) {
        let books = self.bookshelf.list(ShelfFilter::All);
        self.emit(AppEvent::BookshelfChanged(books));
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn bookshelf(&self) -> &Bookshelf {
        &self.bookshelf
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    pub fn last_reply(&self) -> Option<&ProcessedReply> {
        self.last_reply.as_ref()
    }

    // ── Session ─────────────────────────────────────────────────────

    /// Switch skill domain, emitting the persona announcement if one is due
    pub fn select_domain(&mut self, domain: SkillDomain) -> Option<&'static str> {
        let message = self.session.select_domain(domain);
        if let Some(text) = message {
            self.emit(AppEvent::Persona(text.to_string()));
        }
        message
    }

    // ── Chat ────────────────────────────────────────────────────────

    /// Start a chat round trip.
    ///
    /// Returns the request to send, or `None` for a blank message or while
    /// another request is pending.
    pub fn begin_chat(&mut self, message: &str) -> Option<ChatRequest> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }
        if self.in_flight {
            debug!("Refusing message while a request is pending");
            self.emit(AppEvent::Busy);
            return None;
        }

        self.in_flight = true;
        self.emit(AppEvent::Message {
            author: Author::User,
            text: message.to_string(),
        });
        self.emit(AppEvent::Waiting(true));

        Some(ChatRequest {
            message: message.to_string(),
            skill_domain: self.session.current(),
            read_books: self.bookshelf.read_titles(),
        })
    }

    /// Complete the pending round trip with the transport's result.
    ///
    /// Failures become a single bot message; the state stays usable.
    pub fn finish_chat(&mut self, result: Result<String>) -> Option<&ProcessedReply> {
        self.in_flight = false;
        self.emit(AppEvent::Waiting(false));

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Chat request failed: {}", e);
                self.emit(AppEvent::Message {
                    author: Author::Bot,
                    text: format!("Error: {}", e),
                });
                return None;
            }
        };

        let reply = self.post_processor.process(&raw, &self.bookshelf);
        self.emit(AppEvent::Message {
            author: Author::Bot,
            text: reply.cleaned_text.clone(),
        });
        if !reply.new_recommendations.is_empty() {
            self.emit(AppEvent::Recommendations(reply.new_recommendations.clone()));
        }
        if !reply.resources.is_empty() {
            self.emit(AppEvent::Resources(reply.resources.clone()));
        }

        self.last_reply = Some(reply);
        self.last_reply.as_ref()
    }

    /// Full round trip through `transport`
    pub async fn submit<T>(&mut self, transport: &T, message: &str) -> Option<&ProcessedReply>
    where
        T: ChatTransport + ?Sized,
    {
        let request = self.begin_chat(message)?;
        let result = transport.send(&request).await;
        self.finish_chat(result)
    }

    // ── Bookshelf ───────────────────────────────────────────────────

    /// Save a recommendation under the current skill domain
    pub fn add_recommendation(&mut self, recommendation: &Recommendation) -> Result<AddOutcome> {
        let outcome = self.bookshelf.add(
            &recommendation.title,
            &recommendation.author,
            self.session.current(),
        )?;
        if matches!(outcome, AddOutcome::Added(_)) {
            self.emit_shelf();
        }
        Ok(outcome)
    }

    /// Save the `index`-th new recommendation of the last reply.
    ///
    /// `None` when there is no such recommendation.
    pub fn add_from_last_reply(&mut self, index: usize) -> Result<Option<AddOutcome>> {
        let Some(recommendation) = self
            .last_reply
            .as_ref()
            .and_then(|r| r.new_recommendations.get(index))
            .cloned()
        else {
            return Ok(None);
        };
        self.add_recommendation(&recommendation).map(Some)
    }

    pub fn toggle_read(&mut self, title: &str) -> Result<Option<bool>> {
        let toggled = self.bookshelf.toggle_read(title)?;
        if toggled.is_some() {
            self.emit_shelf();
        }
        Ok(toggled)
    }

    /// Empty the shelf. Callers confirm with the user first.
    pub fn clear_bookshelf(&mut self) -> Result<()> {
        self.bookshelf.clear()?;
        self.emit_shelf();
        Ok(())
    }

    pub fn list_books(&self, filter: ShelfFilter) -> Vec<Book> {
        self.bookshelf.list(filter)
    }

    // ── Preferences ─────────────────────────────────────────────────

    /// Flip and persist the dark mode flag, returning the new value
    pub fn toggle_dark_mode(&mut self) -> Result<bool> {
        let enabled = !self.dark_mode;
        self.store
            .set(DARK_MODE_KEY, &Value::String(enabled.to_string()))?;
        self.dark_mode = enabled;
        self.emit(AppEvent::DarkModeChanged(enabled));
        Ok(enabled)
    }
}

/// `"true"` / `true` are on; anything else is off
fn parse_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => s == "true",
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FlakyStore;
    use crate::store::MemoryStore;
    use crate::UpskillError;
    use std::sync::Arc;

    fn app() -> (SharedStore, AppState) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let app = AppState::load(store.clone(), SkillDomain::Both).unwrap();
        (store, app)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_in_flight_guard() {
        let (_, mut app) = app();
        let mut rx = app.subscribe();

        let request = app.begin_chat("  What should I read?  ").unwrap();
        assert_eq!(request.message, "What should I read?");
        assert!(app.is_busy());

        assert!(app.begin_chat("Second question").is_none());
        assert!(drain(&mut rx).contains(&AppEvent::Busy));

        app.finish_chat(Ok("Try \"Atomic Habits\".".to_string()));
        assert!(!app.is_busy());
        assert!(app.begin_chat("Second question").is_some());
    }

    #[test]
    fn test_blank_message_ignored() {
        let (_, mut app) = app();
        assert!(app.begin_chat("   ").is_none());
        assert!(!app.is_busy());
    }

    #[test]
    fn test_request_carries_domain_and_read_books() {
        let (_, mut app) = app();
        app.select_domain(SkillDomain::Business);
        app.add_recommendation(&Recommendation::new("Deep Work", Some("Cal Newport")))
            .unwrap();
        app.add_recommendation(&Recommendation::new("Range", None)).unwrap();
        app.toggle_read("Range").unwrap();

        let request = app.begin_chat("hi").unwrap();
        assert_eq!(request.skill_domain, SkillDomain::Business);
        assert_eq!(request.read_books, vec!["Range".to_string()]);
        assert_eq!(
            app.bookshelf().get("Deep Work").unwrap().category,
            SkillDomain::Business
        );
    }

    #[test]
    fn test_failure_becomes_bot_message() {
        let (_, mut app) = app();
        let mut rx = app.subscribe();
        app.begin_chat("hello").unwrap();
        let reply = app.finish_chat(Err(UpskillError::Transport("model offline".to_string())));
        assert!(reply.is_none());

        let events = drain(&mut rx);
        assert!(events.contains(&AppEvent::Message {
            author: Author::Bot,
            text: "Error: model offline".to_string(),
        }));
        assert!(!app.is_busy());
    }

    #[test]
    fn test_persona_event_only_after_first_switch() {
        let (_, mut app) = app();
        let mut rx = app.subscribe();
        assert!(app.select_domain(SkillDomain::Business).is_none());
        assert!(app.select_domain(SkillDomain::DataScience).is_some());

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![AppEvent::Persona(
                SkillDomain::DataScience.persona_message().to_string()
            )]
        );
    }

    #[test]
    fn test_add_from_last_reply() {
        let (_, mut app) = app();
        app.begin_chat("books?").unwrap();
        app.finish_chat(Ok("Read \"Deep Work\" by Cal Newport.".to_string()));

        assert!(matches!(
            app.add_from_last_reply(0).unwrap(),
            Some(AddOutcome::Added(_))
        ));
        assert_eq!(
            app.add_from_last_reply(0).unwrap(),
            Some(AddOutcome::AlreadyPresent)
        );
        assert_eq!(app.add_from_last_reply(5).unwrap(), None);
    }

    #[test]
    fn test_dark_mode_persists_as_string() {
        let (store, mut app) = app();
        assert!(!app.dark_mode());
        assert!(app.toggle_dark_mode().unwrap());
        assert_eq!(
            store.get(DARK_MODE_KEY).unwrap(),
            Some(Value::String("true".to_string()))
        );

        let reloaded = AppState::load(store, SkillDomain::Both).unwrap();
        assert!(reloaded.dark_mode());
    }

    #[test]
    fn test_clear_emits_empty_shelf() {
        let (_, mut app) = app();
        app.add_recommendation(&Recommendation::new("Range", None)).unwrap();
        let mut rx = app.subscribe();
        app.clear_bookshelf().unwrap();
        assert_eq!(drain(&mut rx), vec![AppEvent::BookshelfChanged(Vec::new())]);
        assert!(app.list_books(ShelfFilter::All).is_empty());
    }

    #[test]
    fn test_store_failures_keep_state_and_stay_usable() {
        let flaky = Arc::new(FlakyStore::new());
        let store: SharedStore = flaky.clone();
        let mut app = AppState::load(store, SkillDomain::Both).unwrap();
        app.add_recommendation(&Recommendation::new("Range", None)).unwrap();
        let mut rx = app.subscribe();

        flaky.fail_writes(true);
        assert!(app.add_recommendation(&Recommendation::new("Deep Work", None)).is_err());
        assert!(app.toggle_read("Range").is_err());
        assert!(app.clear_bookshelf().is_err());
        assert!(app.toggle_dark_mode().is_err());

        assert!(!app.dark_mode());
        assert_eq!(app.bookshelf().len(), 1);
        assert!(app.bookshelf().read_titles().is_empty());
        assert!(drain(&mut rx).is_empty());

        flaky.fail_writes(false);
        assert!(matches!(
            app.add_recommendation(&Recommendation::new("Deep Work", None)).unwrap(),
            AddOutcome::Added(_)
        ));
        assert!(app.toggle_dark_mode().unwrap());
    }

    #[test]
    fn test_unreadable_store_fails_load() {
        let flaky = Arc::new(FlakyStore::new());
        flaky.fail_reads(true);
        let store: SharedStore = flaky.clone();
        assert!(AppState::load(store, SkillDomain::Both).is_err());
    }
}
