use crate::config;
use crate::events::AppEvent;
use crate::sys::server;
use async_channel::Sender;
use tokio::runtime::{Builder, Handle};

/// Starts a tokio runtime on its own thread running the control socket and
/// the config watcher. Menu timers are spawned on the returned handle.
pub fn start_background_services(tx: Sender<AppEvent>) -> std::io::Result<Handle> {
    let rt = Builder::new_multi_thread()
        .thread_name("pied-services")
        .enable_all()
        .build()?;
    let handle = rt.handle().clone();

    handle.spawn(server::run_server(tx.clone()));
    handle.spawn(config::run_async_watcher(tx));

    std::thread::Builder::new()
        .name("pied-runtime".into())
        .spawn(move || rt.block_on(std::future::pending::<()>()))?;

    Ok(handle)
}
