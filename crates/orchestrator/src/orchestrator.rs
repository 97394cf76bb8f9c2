//! Turn orchestrator: one inbound event in, one reply out.

use chrono::{DateTime, Utc};
use messenger::{EventKind, InboundEvent, SenderAction};
use report_flow::{
    Action, FlowSettings, OutboundMessage, PayloadCodec, ReplyDeps, StateMachine,
};
use tracing::{debug, info, warn};

use crate::error::OrchestratorError;
use crate::media::MediaStore;
use crate::sender::MessageSender;
use crate::store::Store;

/// Coordinates one conversation turn.
///
/// The orchestrator:
/// - Logs the inbound message and shows read/typing indicators
/// - Turns the event into an [`Action`], storing uploaded media
/// - Rehydrates the user's [`StateMachine`] and feeds it the action
/// - Commits a completed report, or persists the conversation
/// - Sends and logs the reply
pub struct Orchestrator<S, D, M> {
    sender: S,
    store: D,
    media: M,
    settings: FlowSettings,
}

impl<S, D, M> Orchestrator<S, D, M>
where
    S: MessageSender,
    D: Store,
    M: MediaStore,
{
    pub fn new(sender: S, store: D, media: M, settings: FlowSettings) -> Self {
        Self {
            sender,
            store,
            media,
            settings,
        }
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Process an inbound event end-to-end.
    ///
    /// A message ID already processed is skipped; one whose earlier turn
    /// did not finish runs again. Events without a message ID are not
    /// deduplicated. On failure the stored conversation keeps its last saved
    /// value.
    pub async fn process(&self, event: InboundEvent) -> Result<OutboundMessage, OrchestratorError> {
        let user_id = event.sender_id.as_str();
        info!(user_id = %user_id, mid = %event.log_id(), "Processing event");

        // 1. Log the raw message and acknowledge it
        if let Some(mid) = event.mid.as_deref() {
            match self.store.log_message(user_id, mid, &event.raw).await {
                Ok(true) => {}
                Ok(false) => {
                    return Err(OrchestratorError::Skipped(format!(
                        "message {} already processed",
                        mid
                    )));
                }
                Err(e) => warn!("Failed to log message {}: {}", mid, e),
            }
        }
        self.mark_seen(user_id).await;
        self.typing(user_id, true).await;

        let result = self.run_turn(&event, Utc::now()).await;

        self.typing(user_id, false).await;

        let (reply, saved) = result?;
        if let Some(mid) = event.mid.as_deref() {
            if let Err(e) = self.store.mark_processed(mid, &saved).await {
                warn!("Failed to mark message {} processed: {}", mid, e);
            }
        }
        Ok(reply)
    }

    /// Run the state machine for one event and deliver the reply.
    ///
    /// Returns the reply and the media keys stored for the event.
    async fn run_turn(
        &self,
        event: &InboundEvent,
        now: DateTime<Utc>,
    ) -> Result<(OutboundMessage, Vec<String>), OrchestratorError> {
        let user_id = event.sender_id.as_str();

        // 2. Build the action
        let action = self.build_action(user_id, &event.kind).await;
        let saved = action.images.clone();
        debug!("Action for {}: {:?}", user_id, action);

        // 3. Load the conversation and preference
        let (context, draft) = self.store.load_conversation(user_id).await?;
        let preference = self.store.read(user_id).await?;

        // 4. Advance and render
        let mut machine = StateMachine::from_blobs(&context, &draft, preference);
        let previous = machine.state_code();
        machine.receive_context(action);
        info!(
            user_id = %user_id,
            "State {} -> {}",
            previous,
            machine.state_code()
        );

        let deps = ReplyDeps {
            user_id,
            history: &self.store,
            media: &self.media,
            settings: &self.settings,
            now,
        };
        let reply = machine.generate_reply(&deps).await?;

        // 5. Commit or persist
        self.commit(user_id, &mut machine, now).await?;

        // 6. Deliver
        self.sender.send_reply(user_id, &reply).await?;
        if let Err(e) = self.store.log_reply(user_id, &reply).await {
            warn!("Failed to log reply for {}: {}", user_id, e);
        }

        Ok((reply, saved))
    }

    /// Turn an inbound event into an [`Action`].
    ///
    /// Only image and video attachments are stored. Attachments that fail to
    /// store are left out of the action.
    async fn build_action(&self, user_id: &str, kind: &EventKind) -> Action {
        match kind {
            EventKind::Text(text) => Action::text(text.clone()),
            EventKind::QuickReply(payload) | EventKind::Postback(payload) => {
                Action::from(PayloadCodec::decode(payload))
            }
            EventKind::Attachments(attachments) => {
                let mut keys = Vec::new();
                let mut skipped = 0;
                for attachment in attachments {
                    if !attachment.is_media() {
                        skipped += 1;
                        continue;
                    }
                    match self.media.save(user_id, attachment).await {
                        Ok(key) => keys.push(key),
                        Err(e) => warn!("Failed to store attachment for {}: {}", user_id, e),
                    }
                }
                if skipped > 0 {
                    info!(
                        "Skipped {} of {} attachments from {} (only image and video are stored)",
                        skipped,
                        attachments.len(),
                        user_id
                    );
                }
                Action::images(keys)
            }
        }
    }

    /// Persist the outcome of a turn.
    ///
    /// A completed draft becomes a report stamped `now` and is folded into
    /// the preference; completed and cancelled conversations start over.
    async fn commit(
        &self,
        user_id: &str,
        machine: &mut StateMachine,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        if machine.is_completed() {
            machine.draft_mut().bind_user(user_id);
            let record = machine.draft().to_record(now);
            self.store.insert_report(&record).await?;

            let mut preference = machine.preference().clone();
            preference.merge_report(&record);
            self.store.write(user_id, &preference).await?;

            self.store.clear_conversation(user_id).await?;
            info!(
                user_id = %user_id,
                "Report saved ({} tags, {} images)",
                record.tags.len(),
                record.images.len()
            );
        } else if machine.is_cancelled() {
            self.store.clear_conversation(user_id).await?;
            info!(user_id = %user_id, "Report cancelled");
        } else {
            self.store
                .save_conversation(user_id, &machine.context_blob(), &machine.draft_blob())
                .await?;
        }
        Ok(())
    }

    async fn mark_seen(&self, user_id: &str) {
        if let Err(e) = self.sender.sender_action(user_id, SenderAction::MarkSeen).await {
            warn!("Failed to mark seen for {}: {}", user_id, e);
        }
    }

    async fn typing(&self, user_id: &str, started: bool) {
        if let Err(e) = self.sender.set_typing(user_id, started).await {
            warn!("Failed to set typing for {}: {}", user_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryMediaStore, MemoryStore};
    use crate::sender::NoOpSender;
    use crate::store::MessageLog;
    use messenger::{Attachment, AttachmentPayload};
    use report_flow::{Payload, Signal};

    fn orchestrator() -> Orchestrator<NoOpSender, MemoryStore, MemoryMediaStore> {
        Orchestrator::new(
            NoOpSender,
            MemoryStore::new(),
            MemoryMediaStore::new("http://127.0.0.1:8790/media"),
            FlowSettings::default(),
        )
    }

    fn attachment(kind: &str, url: &str) -> Attachment {
        Attachment {
            kind: kind.to_string(),
            payload: Some(AttachmentPayload {
                url: Some(url.to_string()),
            }),
        }
    }

    #[tokio::test]
    async fn test_build_action_from_payload() {
        let orchestrator = orchestrator();
        let payload = PayloadCodec::encode(&Payload::signal(Signal::InsertNew));

        let action = orchestrator
            .build_action("42", &EventKind::QuickReply(payload.clone()))
            .await;
        assert_eq!(action, Action::signal(Signal::InsertNew));

        let action = orchestrator
            .build_action("42", &EventKind::Postback(payload))
            .await;
        assert_eq!(action, Action::signal(Signal::InsertNew));

        let action = orchestrator
            .build_action("42", &EventKind::QuickReply("not json".to_string()))
            .await;
        assert!(action.is_empty());
    }

    #[tokio::test]
    async fn test_build_action_stores_only_media() {
        let orchestrator = orchestrator();
        let kind = EventKind::Attachments(vec![
            attachment("image", "https://cdn.example.com/a.jpg"),
            attachment("audio", "https://cdn.example.com/b.mp4"),
            attachment("video", "https://cdn.example.com/c.mp4"),
        ]);

        let action = orchestrator.build_action("42", &kind).await;
        assert_eq!(
            action.images,
            ["saved_attachments/42/a.jpg", "saved_attachments/42/c.mp4"]
        );
        assert_eq!(orchestrator.media().saved().await.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_message_is_skipped() {
        let orchestrator = orchestrator();
        let event = InboundEvent {
            sender_id: "42".to_string(),
            mid: Some("mid.1".to_string()),
            timestamp: None,
            kind: EventKind::Text("hello".to_string()),
            raw: "{}".to_string(),
        };

        orchestrator.process(event.clone()).await.unwrap();
        let result = orchestrator.process(event).await;
        assert!(matches!(result, Err(OrchestratorError::Skipped(_))));
    }

    #[tokio::test]
    async fn test_unfinished_message_runs_again() {
        let orchestrator = orchestrator();
        // Logged by a turn that failed before completion
        orchestrator
            .store()
            .log_message("42", "mid.1", "{}")
            .await
            .unwrap();

        let event = InboundEvent {
            sender_id: "42".to_string(),
            mid: Some("mid.1".to_string()),
            timestamp: None,
            kind: EventKind::Text("hello".to_string()),
            raw: "{}".to_string(),
        };
        orchestrator.process(event).await.unwrap();
        assert!(orchestrator.store().message("mid.1").await.unwrap().processed);
    }

    #[tokio::test]
    async fn test_events_without_mid_are_not_deduplicated() {
        let orchestrator = orchestrator();
        let event = InboundEvent {
            sender_id: "42".to_string(),
            mid: None,
            timestamp: None,
            kind: EventKind::Postback(PayloadCodec::encode(&Payload::signal(Signal::InsertNew))),
            raw: "{}".to_string(),
        };

        orchestrator.process(event.clone()).await.unwrap();
        orchestrator.process(event).await.unwrap();
        assert_eq!(orchestrator.store().replies_for("42").await.len(), 2);
    }
}
