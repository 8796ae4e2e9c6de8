//! Conversation-related types.

use journi_model::ModelMessage;

/// The memory of an agent: every message it has exchanged, oldest first.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    pub(crate) items: Vec<Item>,
}

impl Conversation {
    /// Returns the items of this conversation.
    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns `true` when nothing has been exchanged yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn push<S: Into<String>>(&mut self, msg: ModelMessage, transcript: S) {
        self.items.push(Item {
            msg,
            transcript: transcript.into(),
        });
    }

    pub(crate) fn messages(&self) -> impl Iterator<Item = &ModelMessage> {
        self.items.iter().map(|item| &item.msg)
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }
}

/// An item in the conversation.
#[derive(Clone, Debug)]
pub struct Item {
    pub(crate) msg: ModelMessage,
    pub(crate) transcript: String,
}

impl Item {
    /// Returns the message as it is sent to the model.
    #[inline]
    pub fn message(&self) -> &ModelMessage {
        &self.msg
    }

    /// Returns the transcript of this item.
    ///
    /// The transcript is a string representation of the message item,
    /// which can be exported later. But transcript alone is not enough
    /// to reconstruct the message item.
    #[inline]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}
