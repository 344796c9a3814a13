use crate::events::{AppEvent, Command};
use async_channel::Sender;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

pub const SOCKET_PATH: &str = "/tmp/pied.sock";
pub const SOCKET_ENV: &str = "PIED_SOCKET";

/// Control socket location, `PIED_SOCKET` taking precedence.
pub fn socket_path() -> PathBuf {
    std::env::var_os(SOCKET_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(SOCKET_PATH))
}

/// One line of the control protocol. Blank lines and `#` comments are skipped.
pub fn parse_line(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(line.parse::<Command>().map_err(|_| line.to_owned()))
}

pub async fn run_server(tx: Sender<AppEvent>) {
    let path = socket_path();
    // a stale socket from a previous run blocks bind
    if path.exists()
        && let Err(e) = fs_err::remove_file(&path)
    {
        log::warn!("{}", e);
    }

    let listener = match UnixListener::bind(&path) {
        Ok(l) => l,
        Err(e) => {
            log::error!("Failed to bind {}: {}", path.display(), e);
            return;
        }
    };
    log::info!("Listening on {}", path.display());

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                tokio::spawn(serve_client(stream, tx.clone()));
            }
            Err(e) => log::error!("Failed to accept connection: {}", e),
        }
    }
}

async fn serve_client(stream: UnixStream, tx: Sender<AppEvent>) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match parse_line(&line) {
            Some(Ok(command)) => {
                log::debug!("received {command}");
                if tx.send(AppEvent::Command(command)).await.is_err() {
                    return;
                }
            }
            Some(Err(unknown)) => log::warn!("Ignoring unknown command '{}'", unknown),
            None => {}
        }
    }
}
