use std::sync::Arc;

use {
    matrix_sdk::{
        Client,
        room::Room,
        ruma::{
            RoomId, UserId,
            events::room::{
                member::{MembershipState, StrippedRoomMemberEvent},
                message::{MessageType, OriginalSyncRoomMessageEvent},
            },
        },
    },
    tracing::{debug, info, warn},
};

use pineapple_channels::{
    gating,
    plugin::{ChannelMessageKind, ChannelType, InboundMessage},
};

use crate::state::AccountStateMap;

/// Map a Matrix `msgtype` to the channel-level message kind.
pub fn message_kind(msgtype: &MessageType) -> ChannelMessageKind {
    match msgtype {
        MessageType::Text(_) => ChannelMessageKind::Text,
        MessageType::Notice(_) => ChannelMessageKind::Notice,
        _ => ChannelMessageKind::Other,
    }
}

/// Normalize a room message event.
pub fn to_inbound(
    account_id: &str,
    room_id: &RoomId,
    ev: &OriginalSyncRoomMessageEvent,
    own_user_id: &UserId,
    encrypted: bool,
) -> InboundMessage {
    InboundMessage {
        channel_type: ChannelType::Matrix,
        account_id: account_id.to_string(),
        chat_id: room_id.to_string(),
        message_id: Some(ev.event_id.to_string()),
        sender: ev.sender.to_string(),
        kind: message_kind(&ev.content.msgtype),
        body: ev.content.msgtype.body().to_string(),
        from_self: &*ev.sender == own_user_id,
        encrypted,
    }
}

/// Handle a room message for one account: filter by room allowlist, then hand
/// it to the event sink together with this account's outbound sender.
pub async fn handle_room_message(
    ev: OriginalSyncRoomMessageEvent,
    room: Room,
    account_id: &str,
    accounts: &AccountStateMap,
) -> anyhow::Result<()> {
    let (own_user_id, allowlist, event_sink, outbound) = {
        let accounts = accounts.read().unwrap_or_else(|e| e.into_inner());
        let Some(state) = accounts.get(account_id) else {
            debug!(account_id, "message for stopped account ignored");
            return Ok(());
        };
        (
            state.user_id.clone(),
            state.config.room_allowlist.clone(),
            state.event_sink.clone(),
            Arc::clone(&state.outbound),
        )
    };

    let room_id = room.room_id();
    if !gating::is_allowed(room_id.as_str(), &allowlist) {
        debug!(account_id, room_id = %room_id, "room not on allowlist, ignoring");
        return Ok(());
    }

    let Some(sink) = event_sink else {
        debug!(account_id, "no event sink configured");
        return Ok(());
    };

    let encrypted = room.latest_encryption_state().await?.is_encrypted();
    let msg = to_inbound(account_id, room_id, &ev, &own_user_id, encrypted);
    debug!(
        account_id,
        room_id = %room_id,
        sender = %msg.sender,
        kind = ?msg.kind,
        encrypted,
        from_self = msg.from_self,
        "matrix message"
    );

    sink.dispatch_inbound(&msg, outbound.as_ref()).await
}

/// Accept invites addressed to this account.
pub async fn handle_invite(ev: StrippedRoomMemberEvent, room: Room, client: Client) {
    if ev.content.membership != MembershipState::Invite {
        return;
    }
    let Some(own_id) = client.user_id() else {
        return;
    };
    if ev.state_key != own_id.as_str() {
        return;
    }
    info!(room_id = %room.room_id(), "auto-joining invited room");
    if let Err(e) = room.join().await {
        warn!(room_id = %room.room_id(), error = %e, "failed to accept invite");
    }
}
