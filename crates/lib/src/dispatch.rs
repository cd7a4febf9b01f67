//! Request dispatcher: `Idle -> Sending -> {Succeeded, Failed} -> Idle`.
//!
//! [`begin`] and [`settle`] are the two synchronous halves of a submission so a
//! front-end can run the request wherever it likes (the desktop app uses a worker
//! thread); [`Dispatcher::submit`] strings them together around an awaited POST.

use crate::conversation::{Conversation, DispatchStatus};
use crate::webhook::{Webhook, WebhookError, WebhookReply, WebhookRequest};

/// Bot text appended for any failed request. Timeouts, refused connections and
/// server errors all look the same to the user.
pub const ERROR_REPLY: &str = "Error connecting to the server.";

/// How a submission ended.
#[derive(Debug)]
pub enum Settlement {
    Succeeded,
    Failed(WebhookError),
}

impl Settlement {
    pub fn is_success(&self) -> bool {
        matches!(self, Settlement::Succeeded)
    }
}

/// Leave `Idle`: snapshot and clear the input, append the user message and mark the
/// conversation as sending. Returns the request to send, or None when the input is
/// blank or a request is already in flight.
pub fn begin(conversation: &mut Conversation) -> Option<WebhookRequest> {
    if conversation.status() != DispatchStatus::Idle {
        log::debug!("submit ignored: request already in flight");
        return None;
    }
    let message = conversation.input().to_string();
    if !conversation.append_user_message(message.clone()) {
        return None;
    }
    conversation.set_status(DispatchStatus::Sending);
    let request = WebhookRequest {
        message,
        space: conversation.space().map(str::to_string),
    };
    log::debug!(
        "sending message ({} chars) to space {:?}",
        request.message.len(),
        request.space
    );
    Some(request)
}

/// Fold a request result back in: exactly one bot message, then back to `Idle`.
pub fn settle(
    conversation: &mut Conversation,
    result: Result<WebhookReply, WebhookError>,
) -> Settlement {
    let settlement = match result {
        Ok(reply) => {
            conversation.append_bot_message(reply.text());
            Settlement::Succeeded
        }
        Err(e) => {
            if e.is_timeout() {
                log::error!("webhook timed out: {}", e);
            } else {
                log::error!("webhook error: {}", e);
            }
            conversation.append_bot_message(Some(ERROR_REPLY));
            Settlement::Failed(e)
        }
    };
    conversation.set_status(DispatchStatus::Idle);
    settlement
}

/// Resets the status if the submit future is dropped before settling.
struct SendingGuard<'a> {
    conversation: &'a mut Conversation,
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.conversation.set_status(DispatchStatus::Idle);
    }
}

/// Sends conversation input through a [`Webhook`].
pub struct Dispatcher<W> {
    webhook: W,
}

impl<W: Webhook> Dispatcher<W> {
    pub fn new(webhook: W) -> Self {
        Self { webhook }
    }

    pub fn webhook(&self) -> &W {
        &self.webhook
    }

    /// Submit the current input. None when the submission was rejected (blank input or busy).
    pub async fn submit(&self, conversation: &mut Conversation) -> Option<Settlement> {
        let request = begin(conversation)?;
        let mut guard = SendingGuard { conversation };
        let result = self.webhook.post(&request).await;
        Some(settle(&mut *guard.conversation, result))
    }
}
