//! Single STUN request/response exchange with bounded retries.

use crate::error::{StunResult, TransportError};
use crate::message::{MAX_MESSAGE_SIZE, Message};
use crate::socket::StunSocket;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, trace};

/// Attempts per transaction
pub const MAX_ATTEMPTS: u32 = 3;

/// Run one transaction with the default attempt budget.
///
/// Returns `Ok(None)` when no matching response arrived, which is a normal
/// outcome rather than an error.
///
/// # Errors
///
/// See [`execute_with_attempts`].
pub async fn execute<S: StunSocket + ?Sized>(
    request: &Message,
    socket: &S,
    remote: SocketAddr,
    deadline: Duration,
) -> StunResult<Option<Message>> {
    execute_with_attempts(request, socket, remote, deadline, MAX_ATTEMPTS).await
}

/// Run one transaction, sending `request` up to `max_attempts` times.
///
/// Each attempt bounds the send and the following receive by `deadline`.
/// A failed or timed-out send or receive just moves on to the next attempt,
/// without backoff. The first response whose transaction ID matches ends the
/// transaction.
///
/// Socket send and receive errors are not surfaced; they only use up an
/// attempt.
///
/// A datagram left in the socket by an earlier transaction, such as a
/// duplicate answer to a retransmission, is not skipped. It ends this
/// transaction with a mismatch.
///
/// # Errors
///
/// - `TransportError::TransactionIdMismatch` as soon as a response for a
///   different transaction arrives; remaining attempts are abandoned.
/// - `FormatError` if a received datagram cannot be decoded.
pub async fn execute_with_attempts<S: StunSocket + ?Sized>(
    request: &Message,
    socket: &S,
    remote: SocketAddr,
    deadline: Duration,
    max_attempts: u32,
) -> StunResult<Option<Message>> {
    let started = Instant::now();
    let request_bytes = request.encode();
    let transaction_id = hex::encode(request.transaction_id);
    let mut buf = [0u8; MAX_MESSAGE_SIZE];

    for attempt in 1..=max_attempts {
        match timeout(deadline, socket.send_to(&request_bytes, remote)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                trace!(%remote, attempt, error = %e, "send failed");
                continue;
            }
            Err(_) => {
                trace!(%remote, attempt, "send timed out");
                continue;
            }
        }

        let len = match timeout(deadline, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _from))) => len,
            Ok(Err(e)) => {
                trace!(%remote, attempt, error = %e, "receive failed");
                continue;
            }
            Err(_) => {
                trace!(%remote, attempt, "receive timed out");
                continue;
            }
        };

        let response = Message::decode(&buf[..len])?;
        if response.transaction_id != request.transaction_id {
            return Err(TransportError::TransactionIdMismatch {
                expected: request.transaction_id,
                received: response.transaction_id,
            }
            .into());
        }

        debug!(
            %remote,
            transaction_id = %transaction_id,
            attempt,
            elapsed = ?started.elapsed(),
            "transaction answered"
        );
        return Ok(Some(response));
    }

    debug!(
        %remote,
        transaction_id = %transaction_id,
        attempts = max_attempts,
        elapsed = ?started.elapsed(),
        "transaction got no response"
    );
    Ok(None)
}
