use serde::{Deserialize, Serialize};

use super::error::{RadioError, RadioResult};

const MAX_CHANNEL_ID_LEN: usize = 64;

/// Channel identifier as it appears in `/ws/{channel_id}` and on the wire.
///
/// Any non-empty string of at most 64 characters without control characters
/// is accepted, whether or not the catalog knows the channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> RadioResult<Self> {
        let id = id.into();

        let well_formed = !id.is_empty()
            && id.chars().count() <= MAX_CHANNEL_ID_LEN
            && !id.chars().any(char::is_control);

        if !well_formed {
            return Err(RadioError::InvalidChannelId(format!(
                "expected 1-{} printable characters, got: {:?}",
                MAX_CHANNEL_ID_LEN, id
            )));
        }

        Ok(ChannelId(id))
    }

    /// For ids written into the source; they are checked by the catalog tests.
    pub(crate) fn from_static(id: &'static str) -> Self {
        debug_assert!(ChannelId::new(id).is_ok(), "malformed built-in channel id {:?}", id);
        ChannelId(id.to_string())
    }

}

impl TryFrom<String> for ChannelId {
    type Error = RadioError;

    fn try_from(value: String) -> RadioResult<Self> {
        ChannelId::new(value)
    }
}

impl From<ChannelId> for String {
    fn from(id: ChannelId) -> Self {
        id.0
    }
}

// Implement Display so we can use it in format strings
impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
