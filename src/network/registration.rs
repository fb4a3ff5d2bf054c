//! Client registration: PASS, NICK and USER before the client is attached.

use futures_util::{SinkExt, StreamExt};
use slbnc_proto::{LineCodec, Message};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::error::RegistrationError;

/// How long a client has to complete registration.
pub const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Server name used in replies sent before attaching.
const SERVER_NAME: &str = "slbnc";

/// A client that sent the right password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Nick the client asked for.
    pub nick: String,
}

#[derive(Debug, Default)]
struct Pending {
    password: Option<String>,
    nick: Option<String>,
    user: bool,
}

/// Read registration lines until NICK and USER have both arrived, then
/// check the PASS the client sent against `password`.
pub async fn register<S>(
    conn: &mut Framed<S, LineCodec>,
    password: &str,
) -> Result<Registration, RegistrationError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    timeout(REGISTRATION_TIMEOUT, read_registration(conn, password))
        .await
        .map_err(|_| RegistrationError::Timeout)?
}

async fn read_registration<S>(
    conn: &mut Framed<S, LineCodec>,
    password: &str,
) -> Result<Registration, RegistrationError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut pending = Pending::default();

    loop {
        let line = match conn.next().await {
            Some(line) => line?,
            None => return Err(RegistrationError::Closed),
        };
        let msg = match line.parse::<Message>() {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, code = e.error_code(), "Ignoring registration line");
                continue;
            }
        };

        match msg.command.to_ascii_uppercase().as_str() {
            "PASS" => pending.password = msg.param(0).map(str::to_string),
            "NICK" => pending.nick = msg.param(0).map(str::to_string),
            "USER" => pending.user = true,
            "CAP" if msg.param(0).is_some_and(|sub| sub.eq_ignore_ascii_case("LS")) => {
                // No capabilities; lets clients that open with CAP LS move on.
                conn.send(format!(":{SERVER_NAME} CAP * LS :")).await?;
            }
            "PING" => {
                let token = msg.param(0).unwrap_or(SERVER_NAME);
                conn.send(format!(":{SERVER_NAME} PONG {SERVER_NAME} :{token}")).await?;
            }
            "QUIT" => return Err(RegistrationError::Closed),
            _ => {}
        }

        let Some(nick) = pending.nick.as_deref().filter(|_| pending.user) else {
            continue;
        };
        if pending.password.as_deref() != Some(password) {
            conn.send(format!(":{SERVER_NAME} 464 {nick} :Password incorrect"))
                .await?;
            return Err(RegistrationError::BadPassword);
        }
        return Ok(Registration {
            nick: nick.to_string(),
        });
    }
}
