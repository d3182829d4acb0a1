//! Conversation session state machine
//!
//! [`ConversationStore`] owns the transcript and the in-flight flag. The only
//! mutation entry points are [`ConversationStore::submit`] and
//! [`ConversationStore::reset`]; a submitted turn is completed on a spawned
//! task and its result comes back over a channel, where the store applies it
//! in one step (append the reply, then clear `pending`).

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::gateway::{CompletionGateway, GatewayError};
use crate::state::{ChatMessage, ConversationState, StaleReplyPolicy};

pub const DEFAULT_GREETING: &str = "Hi, I'm your math tutor. How can I help you today?";

/// Shown when the endpoint answered but the reply was empty.
pub const EMPTY_REPLY_FALLBACK: &str = "Could not process the request.";

/// Shown when the endpoint could not be reached or answered badly.
pub const GATEWAY_ERROR_FALLBACK: &str = "An error occurred while processing your message.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub greeting: String,
    pub stale_replies: StaleReplyPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            stale_replies: StaleReplyPolicy::default(),
        }
    }
}

struct Settlement {
    generation: u64,
    outcome: Result<String, GatewayError>,
}

pub struct ConversationStore {
    history: Vec<ChatMessage>,
    pending: bool,
    // Bumped by every reset; settlements remember the value they started with.
    generation: u64,
    config: SessionConfig,
    gateway: Arc<dyn CompletionGateway>,
    settled_tx: mpsc::UnboundedSender<Settlement>,
    settled_rx: mpsc::UnboundedReceiver<Settlement>,
    observers: watch::Sender<ConversationState>,
}

impl ConversationStore {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self::from_config(gateway, SessionConfig::default())
    }

    pub fn with_greeting(gateway: Arc<dyn CompletionGateway>, greeting: &str) -> Self {
        Self::from_config(
            gateway,
            SessionConfig {
                greeting: greeting.to_string(),
                ..SessionConfig::default()
            },
        )
    }

    /// Build a store from `config`. A blank greeting is replaced with
    /// [`DEFAULT_GREETING`] so the transcript never holds an empty message.
    pub fn from_config(gateway: Arc<dyn CompletionGateway>, mut config: SessionConfig) -> Self {
        if config.greeting.trim().is_empty() {
            config.greeting = DEFAULT_GREETING.to_string();
        }
        let history = vec![ChatMessage::assistant(config.greeting.clone())];
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let (observers, _) = watch::channel(ConversationState {
            history: history.clone(),
            pending: false,
        });

        Self {
            history,
            pending: false,
            generation: 0,
            config,
            gateway,
            settled_tx,
            settled_rx,
            observers,
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn greeting(&self) -> &str {
        &self.config.greeting
    }

    pub fn snapshot(&self) -> ConversationState {
        ConversationState {
            history: self.history.clone(),
            pending: self.pending,
        }
    }

    /// Watch the conversation. The receiver sees every committed transition,
    /// never a half-applied one.
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.observers.subscribe()
    }

    /// Start a turn with `text`.
    ///
    /// Blank input, or input while a turn is already in flight, is ignored and
    /// `false` is returned. Otherwise the trimmed text is appended as a user
    /// message and exactly one gateway call is spawned with the updated
    /// history. Must be called from within a tokio runtime.
    pub fn submit(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring blank submission");
            return false;
        }
        if self.pending {
            debug!("ignoring submission while a reply is pending");
            return false;
        }

        self.history.push(ChatMessage::user(text));
        self.pending = true;
        self.publish();

        let snapshot = self.history.clone();
        let gateway = Arc::clone(&self.gateway);
        let tx = self.settled_tx.clone();
        let generation = self.generation;

        info!(messages = snapshot.len(), "submitting turn");
        tokio::spawn(async move {
            // Run the call on its own task so a panicking gateway still settles.
            let call = tokio::spawn(async move { gateway.complete(&snapshot).await });
            let outcome = match call.await {
                Ok(outcome) => outcome,
                Err(err) => Err(GatewayError::Task(err.to_string())),
            };
            // Receiver is gone only if the store was dropped mid-turn.
            let _ = tx.send(Settlement {
                generation,
                outcome,
            });
        });

        true
    }

    /// Replace the transcript with the greeting. The pending flag is left
    /// alone: a turn in flight still settles afterwards.
    pub fn reset(&mut self) {
        if self.pending {
            info!("resetting conversation with a reply still pending");
        } else {
            info!("resetting conversation");
        }
        self.history = vec![ChatMessage::assistant(self.config.greeting.clone())];
        self.generation += 1;
        self.publish();
    }

    /// Wait for the in-flight turn to settle and apply it.
    ///
    /// Returns `false` straight away when nothing is in flight. Cancel safe,
    /// so it can sit in a `tokio::select!` branch.
    pub async fn settle(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        match self.settled_rx.recv().await {
            Some(settlement) => {
                self.apply(settlement);
                true
            }
            None => false,
        }
    }

    /// Apply a settlement that has already arrived, without waiting.
    pub fn try_settle(&mut self) -> bool {
        match self.settled_rx.try_recv() {
            Ok(settlement) => {
                self.apply(settlement);
                true
            }
            Err(_) => false,
        }
    }

    fn apply(&mut self, settlement: Settlement) {
        let reply = match settlement.outcome {
            Ok(reply) if reply.is_empty() => {
                warn!("completion endpoint returned an empty reply");
                EMPTY_REPLY_FALLBACK.to_string()
            }
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "completion request failed");
                GATEWAY_ERROR_FALLBACK.to_string()
            }
        };

        let stale = settlement.generation != self.generation;
        if stale && self.config.stale_replies == StaleReplyPolicy::Discard {
            info!("discarding reply from before the last reset");
        } else {
            if stale {
                debug!("appending reply from before the last reset");
            }
            self.history.push(ChatMessage::assistant(reply));
        }

        self.pending = false;
        self.publish();
    }

    fn publish(&self) {
        self.observers.send_replace(self.snapshot());
    }
}
