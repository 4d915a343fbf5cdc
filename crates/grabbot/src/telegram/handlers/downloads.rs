//! Format-choice callback and the download → upload pipeline behind it

use teloxide::prelude::*;
use teloxide::types::MessageId;

use grabcore::download::{deliver, DeliveryError, RetrievalError, RetrievalOutcome};
use grabcore::RetrievalRequest;

use super::types::{HandlerDeps, HandlerError};
use crate::telegram::keyboard::parse_callback;
use crate::telegram::{messages, Bot, TelegramUploader};

pub(super) async fn handle_format_callback(bot: Bot, q: CallbackQuery, deps: HandlerDeps) -> Result<(), HandlerError> {
    let callback_id = q.id.clone();

    let Some(choice) = q.data.as_deref().and_then(parse_callback) else {
        bot.answer_callback_query(callback_id).text(messages::BAD_CALLBACK).await?;
        return Ok(());
    };

    let Some((chat_id, message_id)) = q.message.as_ref().map(|m| (m.chat().id, m.id())) else {
        bot.answer_callback_query(callback_id).await?;
        return Ok(());
    };

    let Some(url) = deps.pending.get(&choice.pending_id).await else {
        log::info!("Chat {} picked an expired link {}", chat_id, choice.pending_id);
        bot.answer_callback_query(callback_id)
            .text(messages::LINK_EXPIRED)
            .show_alert(true)
            .await?;
        return Ok(());
    };

    bot.answer_callback_query(callback_id).await?;
    log::info!("Chat {} asked for {} of {}", chat_id, choice.kind, url);

    // Runs outside the dispatcher so this chat's next update is not held up
    // for the whole download.
    let request = RetrievalRequest::new(url, choice.kind);
    tokio::spawn(run_request(bot, chat_id, message_id, request, deps));
    Ok(())
}

/// Retrieves, gates and uploads one request, reporting every outcome in the
/// chat by editing the progress message. Never fails; errors end up in the
/// chat and the log.
pub async fn run_request(bot: Bot, chat_id: ChatId, progress: MessageId, request: RetrievalRequest, deps: HandlerDeps) {
    edit_progress(&bot, chat_id, progress, &messages::downloading(request.kind())).await;

    let artifact = match deps.retrieval.retrieve(request).await {
        RetrievalOutcome::Success(artifact) => artifact,
        RetrievalOutcome::Failure(e) => {
            log::warn!("Chat {}: retrieval failed ({}): {}", chat_id, e.reason(), e);
            edit_progress(&bot, chat_id, progress, failure_text(&e)).await;
            return;
        }
    };

    edit_progress(&bot, chat_id, progress, &messages::uploading(artifact.title())).await;

    let uploader = TelegramUploader::new(bot.clone(), chat_id);
    match deliver(artifact, &deps.gate, &uploader).await {
        Ok(delivered) => {
            log::info!("Chat {}: sent {} ({} bytes)", chat_id, delivered.kind, delivered.size_bytes);
            if let Err(e) = bot.delete_message(chat_id, progress).await {
                log::warn!("Chat {}: cannot delete progress message: {}", chat_id, e);
            }
        }
        Err(DeliveryError::TooLarge {
            size_bytes,
            ceiling_bytes,
        }) => {
            edit_progress(&bot, chat_id, progress, &messages::too_large(size_bytes, ceiling_bytes)).await;
        }
        Err(DeliveryError::UploadFailed(error)) => {
            edit_progress(&bot, chat_id, progress, &messages::upload_failed(&error)).await;
        }
        Err(e @ DeliveryError::Measure(_)) => {
            log::error!("Chat {}: {}", chat_id, e);
            edit_progress(&bot, chat_id, progress, messages::DOWNLOAD_FAILED).await;
        }
    }
}

/// User-facing text for a failed retrieval. Details stay in the log.
pub fn failure_text(error: &RetrievalError) -> &'static str {
    match error {
        RetrievalError::Busy(_) => messages::BUSY,
        _ => messages::DOWNLOAD_FAILED,
    }
}

/// Edits the progress message, falling back to a new message when the edit
/// is refused (message too old, deleted by the user).
async fn edit_progress(bot: &Bot, chat_id: ChatId, message_id: MessageId, text: &str) {
    if let Err(e) = bot.edit_message_text(chat_id, message_id, text).await {
        log::debug!("Chat {}: edit failed ({}), sending instead", chat_id, e);
        if let Err(e) = bot.send_message(chat_id, text).await {
            log::error!("Chat {}: cannot send status message: {}", chat_id, e);
        }
    }
}
