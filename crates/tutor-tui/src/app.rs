use std::sync::Arc;

use tokio::sync::watch;
use tutor_core::{
    CompletionGateway, ConversationState, ConversationStore, HealthStatus, SessionConfig,
};

/// What the header shows about the tutor server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Checking,
    Online(HealthStatus),
    Offline(String),
}

pub struct App {
    pub should_quit: bool,

    // Conversation: the store takes mutations, the view is what gets drawn
    pub store: ConversationStore,
    pub view: watch::Receiver<ConversationState>,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat pane
    pub scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub endpoint: String,
    pub server: ServerStatus,
}

impl App {
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        endpoint: &str,
        session: SessionConfig,
    ) -> Self {
        let store = ConversationStore::from_config(gateway, session);
        let view = store.subscribe();

        Self {
            should_quit: false,
            store,
            view,
            input: String::new(),
            cursor: 0,
            scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            endpoint: endpoint.to_string(),
            server: ServerStatus::Checking,
        }
    }

    /// Send the input box contents as the next turn. The box is only cleared
    /// when the store took the message.
    pub fn submit_input(&mut self) {
        if self.store.submit(&self.input) {
            self.input.clear();
            self.cursor = 0;
            self.scroll_to_bottom();
        }
    }

    pub fn reset_conversation(&mut self) {
        self.store.reset();
        self.scroll = 0;
    }

    /// Called by the event loop after a reply has been applied.
    pub fn on_settled(&mut self) {
        self.animation_frame = 0;
        self.scroll_to_bottom();
    }

    pub fn set_health(&mut self, health: Result<HealthStatus, String>) {
        self.server = match health {
            Ok(status) => ServerStatus::Online(status),
            Err(err) => ServerStatus::Offline(err),
        };
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.store.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.total_chat_lines().saturating_sub(self.visible_height());
        self.scroll = self.scroll.saturating_add(lines).min(max);
    }

    /// Scroll chat to bottom so the newest message (or "Thinking...") is visible
    pub fn scroll_to_bottom(&mut self) {
        let total_lines = self.total_chat_lines();
        let visible_height = self.visible_height();

        self.scroll = total_lines.saturating_sub(visible_height);
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Wrapped line count of the chat pane, mirroring how `ui` lays it out.
    fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let state = self.view.borrow();
        let mut total_lines: usize = 0;

        for msg in &state.history {
            total_lines = total_lines.saturating_add(1); // Role line ("You:" or "Tutor:")
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add(char_count / wrap_width + 1);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if state.pending {
            total_lines = total_lines.saturating_add(2); // "Tutor:" + "Thinking..."
        }

        // Paragraph scroll offsets are u16; longer transcripts pin to the end
        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::{ChatMessage, HttpGateway};

    fn offline_app() -> App {
        // Nothing listens on the discard port, so every turn settles as a failure.
        let endpoint = "http://127.0.0.1:9/chat";
        App::new(
            Arc::new(HttpGateway::new(endpoint)),
            endpoint,
            SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_submit_clears_input_only_when_accepted() {
        let mut app = offline_app();

        app.input = "   ".to_string();
        app.cursor = 3;
        app.submit_input();
        assert_eq!(app.input, "   ");
        assert!(!app.store.is_pending());

        app.input = "2+2?".to_string();
        app.submit_input();
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.store.is_pending());
        assert_eq!(app.view.borrow().history.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_turn_shows_fallback_in_view() {
        let mut app = offline_app();

        app.input = "hi".to_string();
        app.submit_input();
        assert!(app.store.settle().await);
        app.on_settled();

        let state = app.view.borrow().clone();
        assert!(!state.pending);
        assert_eq!(state.history[1], ChatMessage::user("hi"));
        assert_eq!(
            state.history[2],
            ChatMessage::assistant(tutor_core::store::GATEWAY_ERROR_FALLBACK)
        );
    }

    #[tokio::test]
    async fn test_scroll_stays_in_bounds() {
        let mut app = offline_app();
        app.chat_height = 2;
        app.chat_width = 80;

        app.scroll_down(100);
        // Greeting: role line, one text line, blank line
        assert_eq!(app.scroll, 1);

        app.scroll_up(100);
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn test_health_status() {
        let mut app = offline_app();
        assert_eq!(app.server, ServerStatus::Checking);

        app.set_health(Err("connection refused".to_string()));
        assert_eq!(
            app.server,
            ServerStatus::Offline("connection refused".to_string())
        );
    }

    #[test]
    fn test_huge_transcript_saturates_line_count() {
        let gateway = Arc::new(HttpGateway::new("http://127.0.0.1:9/chat"));
        let session = SessionConfig {
            greeting: "a\n".repeat(70_000),
            ..SessionConfig::default()
        };
        let mut app = App::new(gateway, "http://127.0.0.1:9/chat", session);
        app.chat_height = 10;
        app.chat_width = 80;

        app.scroll_to_bottom();
        assert_eq!(app.scroll, u16::MAX - 10);

        app.scroll_down(100);
        assert_eq!(app.scroll, u16::MAX - 10);
    }
}
