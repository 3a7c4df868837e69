//! Caller-facing request descriptor

use cx_core::ClientError;
use cx_protocol::{Page, RequestAction};
use serde_json::{Map, Value};

/// What the UI asks the session client to send
///
/// The session fills in the language and the conversation context; the
/// descriptor only carries what the caller knows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDescriptor {
    pub action: RequestAction,
    /// User text; required for `Chat`
    pub text: Option<String>,
    /// Overrides the session's default page
    pub page: Option<Page>,
    pub setup: Option<Map<String, Value>>,
    pub images: Option<Vec<String>>,
    pub file_name: Option<String>,
    /// Append to the outbound queue instead of replacing it
    pub keep_existing: bool,
}

impl RequestDescriptor {
    /// A chat turn with user text
    pub fn chat(text: impl Into<String>) -> Self {
        Self {
            action: RequestAction::Chat,
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// A non-chat action such as `Welcome`
    pub fn action(action: RequestAction) -> Self {
        Self {
            action,
            ..Default::default()
        }
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_setup(mut self, setup: Map<String, Value>) -> Self {
        self.setup = Some(setup);
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Preserve requests already waiting in the outbound queue
    pub fn keep_existing(mut self) -> Self {
        self.keep_existing = true;
        self
    }

    /// Reject descriptors that can never be sent
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.action.is_chat() && self.text.is_none() {
            return Err(ClientError::EmptyChatRequest);
        }
        Ok(())
    }

    /// A chat descriptor whose text is empty or whitespace; submitting it
    /// does nothing
    pub fn is_blank(&self) -> bool {
        self.action.is_chat()
            && self
                .text
                .as_deref()
                .map_or(true, |text| text.trim().is_empty())
    }
}
