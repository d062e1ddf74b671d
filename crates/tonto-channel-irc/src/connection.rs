//! IRC connection loop with reconnect.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tonto_types::{ChannelStatus, InboundMessage};

use crate::IrcConfig;
use crate::message::IrcMessage;

const QUIT_MESSAGE: &str = "QUIT :Adios";

/// Status shared between the channel handle and its connection loop.
pub(crate) type SharedStatus = Arc<RwLock<ChannelStatus>>;

pub(crate) fn set_status(status: &SharedStatus, value: ChannelStatus) {
    *status.write().unwrap_or_else(|e| e.into_inner()) = value;
}

/// How a single session ended without an I/O error.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Server closed the socket. `joined` tells whether the session got as
    /// far as joining the channel.
    Disconnected { joined: bool },
    /// Cancelled, or one of the bot-side channels closed.
    Shutdown,
}

/// Keep a session to `config.server` alive, reconnecting with exponential
/// backoff (1s doubling up to 30s).
///
/// Exits when `cancel` is cancelled, the inbound `sender` is closed, or the
/// `outgoing` queue is dropped.
pub async fn run_connection_loop(
    config: IrcConfig,
    sender: mpsc::Sender<InboundMessage>,
    mut outgoing: mpsc::Receiver<String>,
    status: SharedStatus,
    cancel: CancellationToken,
) {
    let mut backoff = Duration::from_secs(1);
    let max_backoff = Duration::from_secs(30);

    info!(server = %config.server, port = config.port, "IRC connection loop started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        set_status(&status, ChannelStatus::Starting);
        let result = run_session(&config, &sender, &mut outgoing, &status, &cancel).await;

        let reason = match result {
            Ok(SessionEnd::Shutdown) => break,
            Ok(SessionEnd::Disconnected { joined }) => {
                if joined {
                    backoff = Duration::from_secs(1);
                }
                "server closed the connection".to_string()
            }
            Err(e) => format!("{e:#}"),
        };

        warn!(
            backoff_secs = backoff.as_secs(),
            "IRC connection lost: {reason}, reconnecting"
        );
        set_status(&status, ChannelStatus::Error(reason));

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(max_backoff);
    }

    set_status(&status, ChannelStatus::Stopped);
    info!("IRC connection loop stopped");
}

async fn run_session(
    config: &IrcConfig,
    sender: &mpsc::Sender<InboundMessage>,
    outgoing: &mut mpsc::Receiver<String>,
    status: &SharedStatus,
    cancel: &CancellationToken,
) -> anyhow::Result<SessionEnd> {
    let addr = format!("{}:{}", config.server, config.port);
    info!(%addr, "Connecting to IRC server");

    let stream = tokio::select! {
        _ = cancel.cancelled() => return Ok(SessionEnd::Shutdown),
        stream = TcpStream::connect(&addr) => {
            stream.with_context(|| format!("failed to connect to {addr}"))?
        }
    };
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut nickname = config.nickname.clone();
    write_line(&mut writer, &format!("NICK {nickname}")).await?;
    write_line(
        &mut writer,
        &format!("USER {nickname} 0 * :{}", config.realname),
    )
    .await?;

    let mut registered = false;
    let mut joined = false;
    // `read_until` keeps partial data in `buf` when another branch wins, so
    // it is only cleared after a full line has been handled.
    let mut buf = Vec::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write_line(&mut writer, QUIT_MESSAGE).await;
                return Ok(SessionEnd::Shutdown);
            }
            read = reader.read_until(b'\n', &mut buf) => {
                if read.context("failed to read from IRC server")? == 0 {
                    return Ok(SessionEnd::Disconnected { joined });
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                buf.clear();

                let Some(msg) = IrcMessage::parse(&line) else {
                    continue;
                };

                match msg.command.as_str() {
                    "PING" => {
                        let token = msg.param(0).unwrap_or_default();
                        write_line(&mut writer, &format!("PONG :{token}")).await?;
                    }
                    "001" => {
                        registered = true;
                        info!(nickname = %nickname, channel = %config.channel, "Registered, joining channel");
                        write_line(&mut writer, &format!("JOIN {}", config.channel)).await?;
                    }
                    "433" if !registered => {
                        nickname.push('_');
                        warn!(nickname = %nickname, "Nickname in use, retrying");
                        write_line(&mut writer, &format!("NICK {nickname}")).await?;
                    }
                    "JOIN" if msg.nick() == Some(nickname.as_str())
                        && msg.param(0).is_some_and(|c| c.eq_ignore_ascii_case(&config.channel)) =>
                    {
                        joined = true;
                        set_status(status, ChannelStatus::Running);
                        info!(channel = %config.channel, "Joined channel");
                    }
                    "PRIVMSG" => {
                        let (Some(target), Some(text), Some(nick)) =
                            (msg.param(0), msg.param(1), msg.nick())
                        else {
                            continue;
                        };
                        if !target.eq_ignore_ascii_case(&config.channel) {
                            debug!(to = target, nick, "Ignoring message outside the channel");
                            continue;
                        }

                        let inbound = InboundMessage::new(config.channel.clone(), nick, text);
                        if sender.send(inbound).await.is_err() {
                            info!("Inbound receiver dropped, closing IRC session");
                            let _ = write_line(&mut writer, QUIT_MESSAGE).await;
                            return Ok(SessionEnd::Shutdown);
                        }
                    }
                    "ERROR" => {
                        warn!(reason = msg.param(0).unwrap_or_default(), "IRC server error");
                    }
                    _ => {}
                }
            }
            // Replies wait until the channel has been joined.
            line = outgoing.recv(), if joined => {
                let Some(line) = line else {
                    let _ = write_line(&mut writer, QUIT_MESSAGE).await;
                    return Ok(SessionEnd::Shutdown);
                };
                write_line(&mut writer, &line).await?;
            }
        }
    }
}

async fn write_line<W>(writer: &mut W, line: &str) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    debug!(line, "IRC >>");
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await?;
    Ok(())
}
