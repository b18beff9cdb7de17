use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A provider-specific history message the agent stores but never reads.
///
/// Some providers need more than plain text to replay an assistant turn,
/// e.g. the exact tool call structure they produced. A provider wraps its
/// own message type in `OpaqueMessage`, the agent keeps it in the
/// conversation, and the provider unwraps it with [`OpaqueMessage::get`]
/// when serializing the next request.
///
/// Identity is the `id` alone: two opaque messages are equal if and only if
/// their ids are equal, whatever they carry.
#[derive(Clone)]
pub struct OpaqueMessage {
    id: Arc<str>,
    value: Arc<dyn Any + Send + Sync>,
}

impl OpaqueMessage {
    /// Wraps `value` under an id that is unique within the conversation.
    #[inline]
    pub fn new<ID: AsRef<str>, T: Send + Sync + 'static>(
        id: ID,
        value: T,
    ) -> Self {
        Self {
            id: Arc::from(id.as_ref()),
            value: Arc::new(value),
        }
    }

    /// Returns the id of this message.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the wrapped value if it is a `T`.
    #[inline]
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl Debug for OpaqueMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueMessage").field(&self.id).finish()
    }
}

impl PartialEq for OpaqueMessage {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OpaqueMessage {}

impl Hash for OpaqueMessage {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct WireMessage(&'static str);

    #[test]
    fn test_get_wrapped_value() {
        let opaque = OpaqueMessage::new("chatcmpl-1", WireMessage("hi"));
        assert_eq!(opaque.id(), "chatcmpl-1");
        assert_eq!(opaque.get::<WireMessage>(), Some(&WireMessage("hi")));
        assert!(opaque.get::<String>().is_none());
    }

    #[test]
    fn test_identity_is_the_id() {
        let first = OpaqueMessage::new("a", WireMessage("one"));
        let same_id = OpaqueMessage::new("a", 42_u32);
        let other = OpaqueMessage::new("b", WireMessage("one"));

        assert_eq!(first, same_id);
        assert_ne!(first, other);

        let set: HashSet<_> = [first.clone(), first, same_id, other]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }
}
