use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;

use crate::store::keys;
use crate::store::operations::modules::map_txn_error;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Append a message to the conversation log and the recipient's inbox
    /// index in one transaction.
    pub fn append_message(&self, message: &DirectMessage) -> Result<(), StoreError> {
        let ts = message.created_at.timestamp_millis();
        let key = keys::message_key(&message.sender_id, &message.recipient_id, ts, &message.id)?;
        let inbox_key = keys::inbox_key(&message.recipient_id, ts, &message.id)?;
        let bytes = Self::serialize(message)?;

        (&self.messages, &self.message_inbox)
            .transaction(|(tx_messages, tx_inbox)| {
                tx_messages.insert(key.as_bytes(), bytes.as_slice())?;
                tx_inbox.insert(inbox_key.as_bytes(), message.sender_id.as_bytes())?;
                Ok(())
            })
            .map_err(map_txn_error)?;
        Ok(())
    }

    /// Conversation between two users, oldest first, capped at `limit`.
    pub fn list_conversation(
        &self,
        user_a: &str,
        user_b: &str,
        limit: usize,
    ) -> Result<Vec<DirectMessage>, StoreError> {
        let prefix = keys::message_conversation_prefix(user_a, user_b)?;
        let mut messages = Vec::new();
        for item in self.messages.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            messages.push(Self::deserialize::<DirectMessage>(&value)?);
            if messages.len() >= limit {
                break;
            }
        }
        Ok(messages)
    }

    /// Most recent message of a conversation, if any.
    pub fn last_conversation_message(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<DirectMessage>, StoreError> {
        let prefix = keys::message_conversation_prefix(user_a, user_b)?;
        match self.messages.scan_prefix(prefix.as_bytes()).next_back() {
            Some(item) => {
                let (_, value) = item?;
                Ok(Some(Self::deserialize(&value)?))
            }
            None => Ok(None),
        }
    }

    /// Number of inbox messages for `recipient_id` newer than `since_ms`.
    /// The inbox index is keyed newest-first, so the scan stops at the first
    /// older entry.
    pub fn count_inbox_since(&self, recipient_id: &str, since_ms: i64) -> Result<u64, StoreError> {
        let prefix = keys::inbox_prefix(recipient_id)?;
        let mut count = 0u64;
        for item in self.message_inbox.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            match keys::parse_inbox_timestamp_ms(&key) {
                Some(ts) if ts > since_ms => count += 1,
                Some(_) => break,
                None => continue,
            }
        }
        Ok(count)
    }
}
