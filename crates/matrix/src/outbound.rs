use {
    anyhow::Result,
    async_trait::async_trait,
    matrix_sdk::{
        room::Room,
        ruma::{
            EventId, RoomId,
            api::client::receipt::create_receipt::v3::ReceiptType,
            events::{receipt::ReceiptThread, room::message::RoomMessageEventContent},
        },
    },
    tracing::debug,
};

use pineapple_channels::plugin::ChannelOutbound;

use crate::state::AccountStateMap;

/// Outbound message sender for Matrix.
pub struct MatrixOutbound {
    pub(crate) accounts: AccountStateMap,
}

impl MatrixOutbound {
    fn get_room(&self, account_id: &str, room_id: &str) -> Result<Room> {
        let client = {
            let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
            accounts
                .get(account_id)
                .map(|s| s.client.clone())
                .ok_or_else(|| anyhow::anyhow!("unknown account: {account_id}"))?
        };
        let room_id = RoomId::parse(room_id)?;
        client
            .get_room(&room_id)
            .ok_or_else(|| anyhow::anyhow!("room {room_id} is not known to account {account_id}"))
    }
}

#[async_trait]
impl ChannelOutbound for MatrixOutbound {
    async fn send_text(&self, account_id: &str, to: &str, text: &str) -> Result<()> {
        let room = self.get_room(account_id, to)?;
        room.send(RoomMessageEventContent::text_plain(text)).await?;
        debug!(account_id, room_id = to, len = text.len(), "sent matrix message");
        Ok(())
    }

    async fn send_read_receipt(&self, account_id: &str, to: &str, message_id: &str) -> Result<()> {
        let room = self.get_room(account_id, to)?;
        let event_id = EventId::parse(message_id)?;
        room.send_single_receipt(ReceiptType::Read, ReceiptThread::Unthreaded, event_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::{
            collections::HashMap,
            sync::{Arc, RwLock},
        },
    };

    fn outbound() -> MatrixOutbound {
        MatrixOutbound {
            accounts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    #[tokio::test]
    async fn send_text_unknown_account_returns_error() {
        let result = outbound()
            .send_text("nonexistent", "!abc:example.org", "hi")
            .await;
        assert!(
            result.unwrap_err().to_string().contains("unknown account"),
            "should report unknown account"
        );
    }

    #[tokio::test]
    async fn read_receipt_unknown_account_returns_error() {
        let result = outbound()
            .send_read_receipt("nonexistent", "!abc:example.org", "$event:example.org")
            .await;
        assert!(result.is_err());
    }
}
