//! Conversation-related types.

use intellibot_model::ModelMessage;

/// Who produced a conversation item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptSource {
    /// Text typed by the user.
    User,
    /// Text generated by the model.
    Assistant,
    /// Output of a tool call.
    Tool,
}

/// The history of one agent, oldest item first.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    pub(crate) items: Vec<Item>,
}

impl Conversation {
    /// Returns all items in order.
    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing has been said yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// An item in the conversation.
#[derive(Clone, Debug)]
pub struct Item {
    pub(crate) msg: ModelMessage,
    pub(crate) transcript: String,
    pub(crate) source: TranscriptSource,
}

impl Item {
    /// Returns the transcript of this item.
    ///
    /// The transcript is the human-readable text of the item. It is not
    /// enough to rebuild the message sent to the model, which may carry
    /// provider-specific data such as tool call ids.
    #[inline]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Returns who produced this item.
    #[inline]
    pub fn source(&self) -> TranscriptSource {
        self.source
    }

    /// Returns the message replayed to the model.
    #[inline]
    pub fn message(&self) -> &ModelMessage {
        &self.msg
    }
}
