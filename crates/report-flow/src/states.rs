//! Conversation states.
//!
//! Each state is its own type implementing [`ConversationState`]. States are
//! rebuilt every turn from the persisted state code through [`STATE_TABLE`];
//! adding a state means adding a type and a table row.
//!
//! ```text
//! Init ──INSERT_NEW──▶ InitInsert ──images──▶ ImgUploaded ──text──▶ TagAdded ─┐
//!  │  └──images──────────────────────────────▶      ▲          text ◀─┘       │
//!  │                                                                       SKIP
//!  └──RECENT_REPORT──▶ RecentReport(cursor)                                   ▼
//!                        │ ▲ RECENT_REPORT        InsertComplete ◀─text/SKIP─ ReportUser
//!                        └─┘  anything else ▶ Init
//!
//! CANCEL from InitInsert, ImgUploaded, TagAdded or ReportUser ▶ InsertCancelled
//! ```

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::context::ConversationContext;
use crate::draft::DraftReport;
use crate::error::Result;
use crate::payload::Signal;
use crate::preference::UserPreference;
use crate::reply::{OutboundMessage, QuickReplyGenerator};
use crate::settings::FlowSettings;
use crate::store::{MediaUrls, ReportHistory};
use crate::template::ReportTemplates;

/// Mutable view of one turn handed to [`ConversationState::update_by_context`].
pub struct Turn<'a> {
    pub context: &'a mut ConversationContext,
    pub draft: &'a mut DraftReport,
}

/// Everything a state may read while rendering its reply.
pub struct ReplyEnv<'a> {
    pub user_id: &'a str,
    pub preference: &'a UserPreference,
    pub draft: &'a DraftReport,
    pub history: &'a dyn ReportHistory,
    pub media: &'a dyn MediaUrls,
    pub settings: &'a FlowSettings,
    pub now: DateTime<Utc>,
}

impl ReplyEnv<'_> {
    fn suggestions(&self) -> QuickReplyGenerator<'_> {
        QuickReplyGenerator::new(self.preference)
    }
}

/// One node of the conversation.
#[async_trait]
pub trait ConversationState: Send + Sync + fmt::Debug {
    /// Code persisted in the conversation context.
    fn code(&self) -> &'static str;

    /// Consume the inputs this state handles and return the next state, or
    /// `None` to stay. Unrecognised input is left alone.
    fn update_by_context(&self, turn: &mut Turn<'_>) -> Option<Box<dyn ConversationState>>;

    /// Render the message shown while in this state. Never mutates.
    async fn generate_reply(&self, env: &ReplyEnv<'_>) -> Result<OutboundMessage>;
}

type StateConstructor = fn() -> Box<dyn ConversationState>;

fn build<S: ConversationState + Default + 'static>() -> Box<dyn ConversationState> {
    Box::new(S::default())
}

/// State code to constructor.
pub const STATE_TABLE: &[(&str, StateConstructor)] = &[
    (Init::CODE, build::<Init>),
    (RecentReport::CODE, build::<RecentReport>),
    (InitInsert::CODE, build::<InitInsert>),
    (ImgUploaded::CODE, build::<ImgUploaded>),
    (TagAdded::CODE, build::<TagAdded>),
    (ReportUser::CODE, build::<ReportUser>),
    (InsertComplete::CODE, build::<InsertComplete>),
    (InsertCancelled::CODE, build::<InsertCancelled>),
];

/// Rebuild a state from its code. Missing or unknown codes give a fresh
/// [`Init`].
pub fn state_from_code(code: Option<&str>) -> Box<dyn ConversationState> {
    code.and_then(|code| STATE_TABLE.iter().find(|(c, _)| *c == code))
        .map(|(_, construct)| construct())
        .unwrap_or_else(|| Box::new(Init))
}

/// Moves an in-progress insert to [`InsertCancelled`] on `CANCEL`.
fn take_cancel(context: &mut ConversationContext) -> Option<Box<dyn ConversationState>> {
    if context.signal() == Some(Signal::Cancel) {
        context.take_signal();
        return Some(Box::new(InsertCancelled));
    }
    None
}

/// Main menu.
#[derive(Debug, Clone, Copy, Default)]
pub struct Init;

impl Init {
    pub const CODE: &'static str = "INIT";
}

#[async_trait]
impl ConversationState for Init {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn update_by_context(&self, turn: &mut Turn<'_>) -> Option<Box<dyn ConversationState>> {
        let ctx = &mut *turn.context;
        match ctx.signal() {
            Some(Signal::InsertNew) => {
                ctx.take_signal();
                return Some(Box::new(InitInsert));
            }
            Some(Signal::RecentReport) => {
                if let Some(cursor) = ctx.take_cursor() {
                    ctx.take_signal();
                    return Some(Box::new(RecentReport::new(cursor)));
                }
            }
            _ => {}
        }

        if ctx.has_images() {
            turn.draft.add_images(ctx.take_images());
            return Some(Box::new(ImgUploaded));
        }
        None
    }

    async fn generate_reply(&self, env: &ReplyEnv<'_>) -> Result<OutboundMessage> {
        Ok(OutboundMessage::text_with_replies(
            "Hi! Send a photo to start a new report, or look back at your recent reports.",
            QuickReplyGenerator::menu(env.now),
        ))
    }
}

/// Browsing report history, one page per turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecentReport {
    cursor: Option<DateTime<Utc>>,
}

impl RecentReport {
    pub const CODE: &'static str = "RECENT_REPORT";

    pub fn new(cursor: DateTime<Utc>) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }

    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }
}

#[async_trait]
impl ConversationState for RecentReport {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn update_by_context(&self, turn: &mut Turn<'_>) -> Option<Box<dyn ConversationState>> {
        let ctx = &mut *turn.context;
        if ctx.signal() == Some(Signal::RecentReport) {
            if let Some(cursor) = ctx.take_cursor() {
                ctx.take_signal();
                return Some(Box::new(RecentReport::new(cursor)));
            }
        }
        Some(Box::new(Init))
    }

    async fn generate_reply(&self, env: &ReplyEnv<'_>) -> Result<OutboundMessage> {
        let cursor = self.cursor.unwrap_or(env.now);
        let limit = env.settings.page_limit;

        // Two past the page: one proves there is a next page, the other is spare.
        let records = env.history.load(env.user_id, cursor, limit + 2).await?;

        let templates = ReportTemplates::new(env.media, env.settings.local_offset);
        Ok(match templates.report_page(&records, limit) {
            Some(template) => OutboundMessage::Template { template },
            None => OutboundMessage::text_with_replies(
                "You have no reports yet.",
                QuickReplyGenerator::menu(env.now),
            ),
        })
    }
}

/// Waiting for the first image of a new report.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitInsert;

impl InitInsert {
    pub const CODE: &'static str = "INIT_INSERT";
}

#[async_trait]
impl ConversationState for InitInsert {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn update_by_context(&self, turn: &mut Turn<'_>) -> Option<Box<dyn ConversationState>> {
        if let Some(next) = take_cancel(turn.context) {
            return Some(next);
        }
        if turn.context.has_images() {
            turn.draft.add_images(turn.context.take_images());
            return Some(Box::new(ImgUploaded));
        }
        None
    }

    async fn generate_reply(&self, _env: &ReplyEnv<'_>) -> Result<OutboundMessage> {
        Ok(OutboundMessage::text_with_replies(
            "Please upload an image to start.",
            vec![QuickReplyGenerator::cancel()],
        ))
    }
}

/// Image received, waiting for the first tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImgUploaded;

impl ImgUploaded {
    pub const CODE: &'static str = "IMG_UPLOADED";
}

#[async_trait]
impl ConversationState for ImgUploaded {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn update_by_context(&self, turn: &mut Turn<'_>) -> Option<Box<dyn ConversationState>> {
        if let Some(next) = take_cancel(turn.context) {
            return Some(next);
        }
        if let Some(tag) = turn.context.take_text() {
            turn.draft.add_tag(tag);
            return Some(Box::new(TagAdded));
        }
        None
    }

    async fn generate_reply(&self, env: &ReplyEnv<'_>) -> Result<OutboundMessage> {
        let size = env.settings.suggestion_size;
        let mut replies = env.suggestions().tags(env.draft.tags(), size, false);
        replies.push(QuickReplyGenerator::cancel());

        let count = env.draft.images().len();
        let text = if count == 1 {
            "Got your image. Please add a tag.".to_string()
        } else {
            format!("Got {} images. Please add a tag.", count)
        };
        Ok(OutboundMessage::text_with_replies(text, replies))
    }
}

/// At least one tag added. More tags, or skip ahead.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagAdded;

impl TagAdded {
    pub const CODE: &'static str = "TAG_ADDED";
}

#[async_trait]
impl ConversationState for TagAdded {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn update_by_context(&self, turn: &mut Turn<'_>) -> Option<Box<dyn ConversationState>> {
        if let Some(next) = take_cancel(turn.context) {
            return Some(next);
        }
        if turn.context.signal() == Some(Signal::Skip) {
            turn.context.take_signal();
            return Some(Box::new(ReportUser));
        }
        if let Some(tag) = turn.context.take_text() {
            turn.draft.add_tag(tag);
        }
        None
    }

    async fn generate_reply(&self, env: &ReplyEnv<'_>) -> Result<OutboundMessage> {
        let size = env.settings.suggestion_size;
        let mut replies = env.suggestions().tags(env.draft.tags(), size, true);
        replies.push(QuickReplyGenerator::cancel());

        Ok(OutboundMessage::text_with_replies(
            "Add another tag, or skip to continue.",
            replies,
        ))
    }
}

/// Waiting for the name the report is about.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportUser;

impl ReportUser {
    pub const CODE: &'static str = "REPORT_USER";
}

#[async_trait]
impl ConversationState for ReportUser {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn update_by_context(&self, turn: &mut Turn<'_>) -> Option<Box<dyn ConversationState>> {
        if let Some(next) = take_cancel(turn.context) {
            return Some(next);
        }
        if turn.context.signal() == Some(Signal::Skip) {
            turn.context.take_signal();
            return Some(Box::new(InsertComplete));
        }
        if let Some(target) = turn.context.take_text() {
            turn.draft.add_target(target);
            return Some(Box::new(InsertComplete));
        }
        None
    }

    async fn generate_reply(&self, env: &ReplyEnv<'_>) -> Result<OutboundMessage> {
        let excludes: Vec<&str> = env.draft.target().into_iter().collect();
        let size = env.settings.suggestion_size;
        let mut replies = env.suggestions().targets(&excludes, size, true);
        replies.push(QuickReplyGenerator::cancel());

        Ok(OutboundMessage::text_with_replies(
            "Who is this report about? Type a name, or skip.",
            replies,
        ))
    }
}

/// Report finished. Terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertComplete;

impl InsertComplete {
    pub const CODE: &'static str = "INSERT_COMPLETE";
}

#[async_trait]
impl ConversationState for InsertComplete {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn update_by_context(&self, _turn: &mut Turn<'_>) -> Option<Box<dyn ConversationState>> {
        None
    }

    async fn generate_reply(&self, env: &ReplyEnv<'_>) -> Result<OutboundMessage> {
        let mut text = String::from("Report saved!");
        if !env.draft.tags().is_empty() {
            let tags: Vec<String> = env.draft.tags().iter().map(|t| format!("#{}", t)).collect();
            text.push_str(&format!(" {}", tags.join(" ")));
        }
        if let Some(target) = env.draft.target() {
            text.push_str(&format!(" ({})", target));
        }
        Ok(OutboundMessage::text_with_replies(
            text,
            QuickReplyGenerator::menu(env.now),
        ))
    }
}

/// Report abandoned. Terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertCancelled;

impl InsertCancelled {
    pub const CODE: &'static str = "INSERT_CANCELLED";
}

#[async_trait]
impl ConversationState for InsertCancelled {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn update_by_context(&self, _turn: &mut Turn<'_>) -> Option<Box<dyn ConversationState>> {
        None
    }

    async fn generate_reply(&self, env: &ReplyEnv<'_>) -> Result<OutboundMessage> {
        Ok(OutboundMessage::text_with_replies(
            "Report cancelled.",
            QuickReplyGenerator::menu(env.now),
        ))
    }
}
