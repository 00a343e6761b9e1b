//! Buyer-seller conversations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use livestall_core::{ConversationId, MessageId, ProductId, UserId};

/// An inbox row from one participant's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub product_id: Option<ProductId>,
    pub product_title: Option<String>,
    /// Display name of the other participant.
    pub counterpart_name: String,
    pub last_message: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
