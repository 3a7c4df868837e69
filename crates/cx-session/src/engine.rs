//! Session state shared by the connection manager and the client handle
//!
//! `SessionEngine` owns every piece of mutable session state and is driven
//! by exactly one task. It performs no I/O: requests that should go on the
//! wire collect in an outbox and notifications collect in an event buffer,
//! both drained by the driver after each call.

use cx_core::config::ClientConfig;
use cx_core::{ClientError, ConnectionState};
use cx_protocol::{ChatDetails, Directive, DirectiveKind, InboundFrame, Lang, Page, Request};

use crate::event::SessionEvent;
use crate::history::{Conversation, Turn};
use crate::queue::{OutboundQueue, WorkingMessage};
use crate::request::RequestDescriptor;
use crate::turn::{TurnMachine, TurnState};

/// State of one conversation session
#[derive(Debug)]
pub struct SessionEngine {
    conversation: Conversation,
    turn: TurnMachine,
    queue: OutboundQueue,
    working: Option<WorkingMessage>,
    connection: ConnectionState,
    lang: Lang,
    page: Page,
    outbox: Vec<Request>,
    events: Vec<SessionEvent>,
}

impl SessionEngine {
    pub fn new(lang: Lang, page: Page) -> Self {
        Self {
            conversation: Conversation::new(),
            turn: TurnMachine::new(),
            queue: OutboundQueue::new(),
            working: None,
            connection: ConnectionState::Disconnected,
            lang,
            page,
            outbox: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.lang, config.page)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn.state()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn working(&self) -> Option<&WorkingMessage> {
        self.working.as_ref()
    }

    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    pub fn set_lang(&mut self, lang: Lang) {
        self.lang = lang;
    }

    /// Submit a request
    ///
    /// Blank chat text is ignored. If a turn is still streaming it is
    /// finalized first with whatever text has arrived.
    pub fn submit(&mut self, descriptor: RequestDescriptor) -> Result<(), ClientError> {
        descriptor.validate()?;
        if descriptor.is_blank() {
            tracing::debug!("Ignoring blank chat submission");
            return Ok(());
        }

        if self.turn.is_responding() {
            tracing::debug!("Interrupting in-flight turn");
            self.finalize(true);
        }

        let RequestDescriptor {
            action,
            text,
            page,
            setup,
            images,
            file_name,
            keep_existing,
        } = descriptor;

        let messages = match text.filter(|_| action.is_chat()) {
            Some(text) => {
                let user = Turn::user(text);
                let messages = self.conversation.build_context(Some(&user));
                self.conversation.push(user);
                messages
            }
            None => self.conversation.build_context(None),
        };

        let mut request = Request::new(action, self.lang);
        request.details = Some(ChatDetails {
            page: page.unwrap_or(self.page),
            messages,
            setup,
        });
        request.images = images;
        request.file_name = file_name;

        self.enqueue(request, keep_existing);
        self.turn.begin();
        Ok(())
    }

    /// Record that a connection attempt started
    pub fn on_connecting(&mut self) {
        self.connection = ConnectionState::Connecting;
    }

    /// The socket opened: retry the working message, flush the queue, then
    /// announce the connection
    pub fn on_open(&mut self) {
        self.connection = ConnectionState::Open;

        let mut pending = self.queue.drain();
        if let Some(working) = self.working.take() {
            tracing::debug!("Retrying request interrupted by disconnect");
            pending.push_front(working.request);
        }
        for request in pending {
            self.transmit(request);
        }

        self.events.push(SessionEvent::Connected);
    }

    /// The socket closed or a connection attempt failed
    ///
    /// A partially streamed reply is abandoned; its request stays the
    /// working message and is sent again on the next open.
    pub fn on_close(&mut self) {
        self.connection = ConnectionState::Disconnected;
        if let Some(partial) = self.turn.abandon(&mut self.conversation) {
            tracing::warn!("Connection lost mid-stream, abandoning partial reply");
            self.events.push(SessionEvent::TurnAbandoned { partial });
        }
        self.events.push(SessionEvent::Disconnected);
    }

    /// Requests from the outbox that never reached the socket
    ///
    /// They go back to the head of the queue; the working message is among
    /// them, so it is cleared to avoid sending it twice.
    pub fn on_send_failed(&mut self, unsent: Vec<Request>) {
        if unsent.is_empty() {
            return;
        }
        self.working = None;
        self.queue.restore_front(unsent);
    }

    /// Apply one inbound frame
    pub fn handle_frame(&mut self, frame: InboundFrame) {
        if !self.turn.is_responding() {
            tracing::debug!("Ignoring frame received while idle");
            return;
        }

        if frame.is_streaming() {
            self.apply_stream(frame);
        } else if let Some(directive) = frame.directive() {
            self.apply_directive(directive);
        } else {
            self.events.push(SessionEvent::Message(frame));
        }
    }

    /// Requests to write to the socket, in order
    pub fn take_outbox(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    /// Notifications produced since the last drain
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn enqueue(&mut self, request: Request, keep_existing: bool) {
        if self.connection.is_open() {
            self.transmit(request);
        } else {
            tracing::debug!(
                action = %request.action,
                keep_existing,
                "Connection not open, queueing request"
            );
            self.queue.enqueue(request, keep_existing);
        }
    }

    fn transmit(&mut self, request: Request) {
        self.working = Some(WorkingMessage::new(request.clone()));
        self.outbox.push(request);
    }

    fn apply_stream(&mut self, frame: InboundFrame) {
        if frame.response_start {
            self.turn.start_stream(&mut self.conversation);
            self.events.push(SessionEvent::StreamStarted {
                action: frame.action.clone(),
            });
        }

        if let Some(text) = frame.response {
            if self.turn.append(&mut self.conversation, &text) {
                self.events.push(SessionEvent::Delta { text });
            } else {
                tracing::debug!("Dropping delta with no active assistant turn");
            }
        }

        if frame.response_end {
            self.finalize(false);
            if let Some(action) = frame.action {
                self.events.push(SessionEvent::ActionFinished {
                    action,
                    payload: frame.extra,
                });
            }
        }
    }

    fn apply_directive(&mut self, directive: Directive) {
        match directive.kind {
            DirectiveKind::NotUnderstand => {
                if let Some(index) = self.conversation.forget_last_user() {
                    tracing::debug!(index, "Backend did not understand, forgetting user turn");
                }
                return;
            }
            DirectiveKind::SwitchLang => match directive.lang().and_then(Lang::from_code) {
                Some(lang) => {
                    tracing::info!(%lang, "Backend switched language");
                    self.lang = lang;
                }
                None => tracing::warn!("switchLang directive without a known language"),
            },
            _ => {}
        }
        self.events.push(SessionEvent::Directive(directive));
    }

    fn finalize(&mut self, interrupted: bool) {
        let turn = self.turn.finish(&mut self.conversation);
        self.working = None;
        self.events
            .push(SessionEvent::TurnFinished { turn, interrupted });
    }
}
