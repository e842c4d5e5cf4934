use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {
    matrix_sdk::{Client, ruma::OwnedUserId},
    tokio_util::sync::CancellationToken,
};

use pineapple_channels::ChannelEventSink;

use crate::{config::MatrixAccountConfig, outbound::MatrixOutbound};

/// Shared account state map.
pub type AccountStateMap = Arc<RwLock<HashMap<String, AccountState>>>;

/// Per-account runtime state.
pub struct AccountState {
    pub client: Client,
    /// The account's own user ID, used to recognise its own messages.
    pub user_id: OwnedUserId,
    pub account_id: String,
    pub config: MatrixAccountConfig,
    pub outbound: Arc<MatrixOutbound>,
    pub cancel: CancellationToken,
    pub event_sink: Option<Arc<dyn ChannelEventSink>>,
}
