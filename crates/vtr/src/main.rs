use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use vtr_core::{
    config::Config,
    driver::{self, ErrorLog},
    guard,
    listener::Listener,
    messaging::delivery::ChatDelivery,
    post::WallPostFormatter,
    relay::WallRelay,
    store::JsonStore,
};
use vtr_telegram::{InboxListener, TelegramMessenger};
use vtr_vk::VkClient;

#[tokio::main]
async fn main() -> Result<(), vtr_core::Error> {
    vtr_core::logging::init("vtr")?;
    tracing::info!("program is running");

    let result = run().await;
    if let Err(e) = &result {
        if e.is_fatal() {
            tracing::error!("error in configuration, program execution is not possible: {e}");
        } else {
            tracing::error!("relay stopped: {e}");
        }
    }
    result
}

async fn run() -> Result<(), vtr_core::Error> {
    let cfg = Arc::new(Config::load()?);
    guard::check_env(&cfg)?;

    let messenger = Arc::new(TelegramMessenger::new(cfg.telegram_bot_token.clone()));
    let downstream = Arc::new(ChatDelivery::new(
        messenger,
        cfg.team_chat()?,
        cfg.operator_chat()?,
    ));
    guard::verify_downstream(downstream.as_ref()).await?;

    let group_id = cfg.vk_group_id()?;
    let upstream = Arc::new(VkClient::new(
        cfg.vk_token_admin.clone(),
        group_id,
        cfg.vk_api_version.clone(),
        cfg.vk_request_timeout,
    )?);
    let formatter = Arc::new(WallPostFormatter::new(
        cfg.team_name.clone(),
        group_id,
        cfg.telegram_message_limit,
    ));

    let store = JsonStore::new(cfg.app_json_folder.clone());
    let mut errors = ErrorLog::load(store.clone());
    let relay = WallRelay::load(
        store,
        upstream,
        formatter.clone(),
        formatter,
        downstream,
        cfg.vk_update_interval,
    );

    let mut listeners: Vec<Box<dyn Listener>> = vec![Box::new(relay)];
    if cfg.telegram_listener_enabled {
        listeners.push(Box::new(InboxListener::new(cfg.telegram_update_interval)));
    }

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, finishing current cycle");
            on_signal.cancel();
        }
    });

    tracing::info!(
        "data check succeeded, all APIs are available; polling group {group_id} ({:?})",
        cfg.run_mode
    );
    driver::run(&mut listeners, cfg.run_mode, &mut errors, &shutdown).await
}
