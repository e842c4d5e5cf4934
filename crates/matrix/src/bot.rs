use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use {
    anyhow::Context,
    matrix_sdk::{
        Client, SessionChange,
        config::SyncSettings,
        room::Room,
        ruma::events::room::{
            member::StrippedRoomMemberEvent, message::OriginalSyncRoomMessageEvent,
        },
    },
    secrecy::ExposeSecret,
    tokio::sync::broadcast::error::RecvError,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

use pineapple_channels::{ChannelEventSink, plugin::ChannelType};

use crate::{
    config::MatrixAccountConfig,
    handlers,
    outbound::MatrixOutbound,
    session::{SavedSession, load_session, save_session},
    state::{AccountState, AccountStateMap},
};

/// Delay before retrying after the sync loop fails.
const SYNC_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Log in (or restore a saved session) and start syncing a single account.
///
/// Events already in the room timeline when the bot connects are skipped: the
/// first sync only fetches a sync token. Spawns a background task that syncs
/// until the returned `CancellationToken` is cancelled.
pub async fn start_sync(
    account_id: String,
    config: MatrixAccountConfig,
    state_dir: &Path,
    accounts: AccountStateMap,
    event_sink: Option<Arc<dyn ChannelEventSink>>,
) -> anyhow::Result<CancellationToken> {
    let store_dir = config.store_dir_in(state_dir, &account_id);
    let session_file = config.session_file_in(state_dir, &account_id);

    std::fs::create_dir_all(&store_dir)
        .with_context(|| format!("creating store directory at {}", store_dir.display()))?;

    // SQLite store persists the E2EE keys across restarts.
    let client = Client::builder()
        .homeserver_url(&config.homeserver)
        .handle_refresh_tokens()
        .sqlite_store(&store_dir, None)
        .build()
        .await
        .context("building matrix client")?;

    login(&client, &account_id, &config, &session_file).await?;

    let user_id = client
        .user_id()
        .map(ToOwned::to_owned)
        .context("matrix client has no user id after login")?;

    let settings = SyncSettings::new().timeout(Duration::from_millis(config.sync_timeout_ms));
    let initial = client
        .sync_once(settings.clone())
        .await
        .context("initial matrix sync")?;
    let settings = settings.token(initial.next_batch);

    if config.autojoin {
        client.add_event_handler(
            |ev: StrippedRoomMemberEvent, room: Room, client: Client| async move {
                handlers::handle_invite(ev, room, client).await;
            },
        );
    }

    let handler_accounts = Arc::clone(&accounts);
    let handler_aid = account_id.clone();
    client.add_event_handler(move |ev: OriginalSyncRoomMessageEvent, room: Room| {
        let accounts = Arc::clone(&handler_accounts);
        let aid = handler_aid.clone();
        async move {
            if let Err(e) = handlers::handle_room_message(ev, room, &aid, &accounts).await {
                error!(account_id = aid, error = %e, "error handling matrix message");
            }
        }
    });

    info!(account_id, user_id = %user_id, "matrix account connected");

    let cancel = CancellationToken::new();
    let outbound = Arc::new(MatrixOutbound {
        accounts: Arc::clone(&accounts),
    });

    let state = AccountState {
        client: client.clone(),
        user_id,
        account_id: account_id.clone(),
        config,
        outbound,
        cancel: cancel.clone(),
        event_sink: event_sink.clone(),
    };
    {
        let mut map = accounts.write().unwrap_or_else(|e| e.into_inner());
        map.insert(account_id.clone(), state);
    }

    spawn_session_saver(
        client.clone(),
        account_id.clone(),
        session_file,
        cancel.clone(),
    );

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        info!(account_id, "starting matrix sync loop");
        loop {
            tokio::select! {
                () = cancel_clone.cancelled() => {
                    info!(account_id, "matrix sync stopped");
                    break;
                },
                result = client.sync(settings.clone()) => {
                    let Err(e) = result else {
                        break;
                    };
                    if is_unrecoverable(&e) {
                        warn!(account_id, error = %e, "matrix account disabled: session is no longer valid");
                        if let Some(sink) = &event_sink {
                            sink.request_disable_account(
                                ChannelType::Matrix,
                                &account_id,
                                "the homeserver rejected the access token",
                            )
                            .await;
                        }
                        cancel_clone.cancel();
                        break;
                    }
                    warn!(account_id, error = %e, "matrix sync failed, retrying");
                    tokio::time::sleep(SYNC_RETRY_DELAY).await;
                },
            }
        }
    });

    Ok(cancel)
}

/// Restore the saved session if one exists, otherwise log in with the
/// password and save the new session.
async fn login(
    client: &Client,
    account_id: &str,
    config: &MatrixAccountConfig,
    session_file: &Path,
) -> anyhow::Result<()> {
    if let Some(saved) = load_session(session_file)? {
        info!(account_id, user_id = %saved.user_id, "restoring matrix session");
        client
            .restore_session(saved.to_matrix_session()?)
            .await
            .context("restoring session")?;
        return Ok(());
    }

    if !config.has_password() {
        anyhow::bail!(
            "no password configured and no saved session at {}",
            session_file.display()
        );
    }

    info!(account_id, username = %config.username, "logging in to matrix");
    let response = client
        .matrix_auth()
        .login_username(&config.username, config.password.expose_secret())
        .initial_device_display_name(&config.device_name)
        .request_refresh_token()
        .send()
        .await
        .context("login failed")?;

    let session = SavedSession {
        access_token: response.access_token.clone(),
        refresh_token: response.refresh_token.clone(),
        user_id: response.user_id.to_string(),
        device_id: response.device_id.to_string(),
    };
    save_session(session_file, &session)?;
    info!(
        account_id,
        user_id = %session.user_id,
        device_id = %session.device_id,
        "matrix login succeeded, session saved"
    );
    Ok(())
}

/// Rewrite the session file whenever the SDK rotates the access and refresh
/// tokens, so the next restart does not restore a revoked pair.
fn spawn_session_saver(
    client: Client,
    account_id: String,
    session_file: PathBuf,
    cancel: CancellationToken,
) {
    let mut changes = client.subscribe_to_session_changes();
    tokio::spawn(async move {
        loop {
            let change = tokio::select! {
                () = cancel.cancelled() => break,
                change = changes.recv() => change,
            };
            match change {
                Ok(SessionChange::TokensRefreshed) => {
                    let Some(session) = client.matrix_auth().session() else {
                        continue;
                    };
                    let saved = SavedSession::from_matrix_session(&session);
                    match save_session(&session_file, &saved) {
                        Ok(()) => info!(account_id, "matrix tokens refreshed, session saved"),
                        Err(e) => {
                            error!(account_id, error = %e, "failed to save refreshed matrix session")
                        },
                    }
                },
                Ok(SessionChange::UnknownToken { .. }) | Err(RecvError::Lagged(_)) => {},
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// A revoked or unknown access token will fail every retry.
fn is_unrecoverable(e: &matrix_sdk::Error) -> bool {
    e.client_api_error_kind().is_some_and(|kind| {
        matches!(
            kind,
            matrix_sdk::ruma::api::client::error::ErrorKind::UnknownToken { .. }
        )
    })
}
