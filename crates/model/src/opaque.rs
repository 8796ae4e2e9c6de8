use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A provider-specific history message the agent keeps without looking
/// inside.
///
/// Some providers need their own message shape echoed back in later
/// requests (reasoning content, provider tool-call ids). The provider wraps
/// that shape in an `OpaqueMessage`, the agent stores it in memory, and the
/// provider unwraps it again with [`OpaqueMessage::to_raw`] when building
/// the next request.
///
/// Two opaque messages are equal when their ids are equal.
pub struct OpaqueMessage(Arc<dyn OpaqueValue>);

impl OpaqueMessage {
    /// Wraps `value` under `id`, which must be unique within a conversation.
    #[inline]
    pub fn new<ID: Into<String>, T: Send + Sync + 'static>(
        id: ID,
        value: T,
    ) -> Self {
        Self(Arc::new(Entry {
            id: id.into(),
            value,
        }))
    }

    /// Returns the id of this message.
    #[inline]
    pub fn id(&self) -> &str {
        self.0.id()
    }

    /// Returns the wrapped value if it has type `T`.
    #[inline]
    pub fn to_raw<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }
}

impl Clone for OpaqueMessage {
    #[inline]
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl Debug for OpaqueMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueMessage").field(&self.id()).finish()
    }
}

impl PartialEq for OpaqueMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for OpaqueMessage {}

impl Hash for OpaqueMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

trait OpaqueValue: Send + Sync {
    fn id(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

struct Entry<T> {
    id: String,
    value: T,
}

impl<T: Send + Sync + 'static> OpaqueValue for Entry<T> {
    fn id(&self) -> &str {
        &self.id
    }

    fn as_any(&self) -> &dyn Any {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[derive(Clone)]
    struct ProviderTurn {
        reasoning: String,
    }

    #[test]
    fn test_downcast() {
        let msg = OpaqueMessage::new(
            "chatcmpl-1",
            ProviderTurn {
                reasoning: "Tokyo is in Japan".to_owned(),
            },
        );
        assert_eq!(msg.id(), "chatcmpl-1");
        assert_eq!(
            msg.to_raw::<ProviderTurn>().unwrap().reasoning,
            "Tokyo is in Japan"
        );
        assert!(msg.to_raw::<String>().is_none());
    }

    #[test]
    fn test_identity_by_id() {
        let first = OpaqueMessage::new(
            "chatcmpl-1",
            ProviderTurn {
                reasoning: "a".to_owned(),
            },
        );
        let second = OpaqueMessage::new(
            "chatcmpl-2",
            ProviderTurn {
                reasoning: "a".to_owned(),
            },
        );

        assert_eq!(first, first.clone());
        assert_ne!(first, second);

        let set: HashSet<_> =
            [first.clone(), first, second].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
