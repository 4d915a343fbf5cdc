//! Sends a finished artifact to the chat that asked for it.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::InputFile;

use grabcore::download::{UploadItem, Uploader};
use grabcore::MediaKind;

use crate::telegram::Bot;

/// Telegram allows 1024 characters in a media caption
const MAX_CAPTION_CHARS: usize = 1000;

pub struct TelegramUploader {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramUploader {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl Uploader for TelegramUploader {
    async fn upload(&self, item: UploadItem<'_>) -> anyhow::Result<()> {
        let caption = caption(item.title);
        let file = InputFile::file(item.path);
        let duration = item.duration_secs.and_then(|d| u32::try_from(d).ok());

        match item.kind {
            MediaKind::Audio => {
                let mut request = self
                    .bot
                    .send_audio(self.chat_id, file)
                    .caption(caption)
                    .title(item.title.to_string());
                if let Some(d) = duration {
                    request = request.duration(d);
                }
                request.await?;
            }
            MediaKind::Video => {
                let mut request = self
                    .bot
                    .send_video(self.chat_id, file)
                    .caption(caption)
                    .supports_streaming(true);
                // Telegram needs these to show the right aspect ratio and length
                if let Some(d) = duration {
                    request = request.duration(d);
                }
                if let Some(w) = item.width {
                    request = request.width(w);
                }
                if let Some(h) = item.height {
                    request = request.height(h);
                }
                request.await?;
            }
        }
        Ok(())
    }
}

/// Title cut to fit a media caption
pub fn caption(title: &str) -> String {
    if title.chars().count() <= MAX_CAPTION_CHARS {
        return title.to_string();
    }
    let mut truncated: String = title.chars().take(MAX_CAPTION_CHARS - 1).collect();
    truncated.push('…');
    truncated
}
