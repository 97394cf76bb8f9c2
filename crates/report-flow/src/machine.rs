//! The conversation state machine driven once per turn.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::action::Action;
use crate::context::ConversationContext;
use crate::draft::DraftReport;
use crate::error::Result;
use crate::preference::UserPreference;
use crate::reply::OutboundMessage;
use crate::settings::FlowSettings;
use crate::states::{
    state_from_code, ConversationState, InsertCancelled, InsertComplete, ReplyEnv, Turn,
};
use crate::store::{MediaUrls, ReportHistory};

/// Collaborators and per-turn values needed to render a reply.
pub struct ReplyDeps<'a> {
    pub user_id: &'a str,
    pub history: &'a dyn ReportHistory,
    pub media: &'a dyn MediaUrls,
    pub settings: &'a FlowSettings,
    pub now: DateTime<Utc>,
}

/// One user's conversation for the duration of a turn.
///
/// Holds no state across turns: everything is loaded from the persisted
/// context and draft blobs and written back by the caller.
#[derive(Debug)]
pub struct StateMachine {
    state: Box<dyn ConversationState>,
    context: ConversationContext,
    draft: DraftReport,
    preference: UserPreference,
}

impl StateMachine {
    /// Rehydrate from a loaded context and draft.
    pub fn load(
        mut context: ConversationContext,
        draft: DraftReport,
        preference: UserPreference,
    ) -> Self {
        let state = state_from_code(context.state_code());
        context.set_state_code(state.code());
        Self {
            state,
            context,
            draft,
            preference,
        }
    }

    /// Rehydrate from persisted JSON blobs.
    pub fn from_blobs(
        context: &serde_json::Value,
        draft: &serde_json::Value,
        preference: UserPreference,
    ) -> Self {
        Self::load(
            ConversationContext::from_blob(context),
            DraftReport::from_blob(draft),
            preference,
        )
    }

    /// Feed one action through the current state.
    ///
    /// Never fails: input the current state does not handle is ignored, and
    /// transient input left over at the end of the turn is dropped.
    pub fn receive_context(&mut self, action: Action) {
        self.context.merge(action);

        let next = self.state.update_by_context(&mut Turn {
            context: &mut self.context,
            draft: &mut self.draft,
        });
        if let Some(next) = next {
            self.set_state(next);
        }

        if self.context.has_transient() {
            debug!("Dropping unconsumed input in state {}", self.state.code());
        }
        self.context.clear_transient();
    }

    pub fn set_state(&mut self, state: Box<dyn ConversationState>) {
        debug!("State {} -> {}", self.state.code(), state.code());
        self.context.set_state_code(state.code());
        self.state = state;
    }

    /// Render the reply for the current state.
    pub async fn generate_reply(&self, deps: &ReplyDeps<'_>) -> Result<OutboundMessage> {
        let env = ReplyEnv {
            user_id: deps.user_id,
            preference: &self.preference,
            draft: &self.draft,
            history: deps.history,
            media: deps.media,
            settings: deps.settings,
            now: deps.now,
        };
        self.state.generate_reply(&env).await
    }

    pub fn state(&self) -> &dyn ConversationState {
        self.state.as_ref()
    }

    pub fn state_code(&self) -> &'static str {
        self.state.code()
    }

    pub fn is_completed(&self) -> bool {
        self.state.code() == InsertComplete::CODE
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.code() == InsertCancelled::CODE
    }

    pub fn context_blob(&self) -> serde_json::Value {
        self.context.to_blob()
    }

    pub fn draft_blob(&self) -> serde_json::Value {
        self.draft.to_blob()
    }

    pub fn draft(&self) -> &DraftReport {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut DraftReport {
        &mut self.draft
    }

    pub fn preference(&self) -> &UserPreference {
        &self.preference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::ReportRecord;
    use crate::payload::{PayloadCodec, Signal};
    use crate::reply::Template;
    use crate::states::{
        ImgUploaded, Init, InitInsert, RecentReport, ReportUser, TagAdded, STATE_TABLE,
    };
    use crate::store::{EmptyHistory, PrefixMediaUrls};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    fn fresh() -> StateMachine {
        StateMachine::load(
            ConversationContext::new(),
            DraftReport::new(),
            UserPreference::default(),
        )
    }

    fn at(code: &str) -> StateMachine {
        StateMachine::from_blobs(
            &serde_json::json!({ "state_code": code }),
            &serde_json::json!({}),
            UserPreference::default(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    /// History that records the queries it receives.
    struct FakeHistory {
        reports: Vec<ReportRecord>,
        queries: Mutex<Vec<(DateTime<Utc>, usize)>>,
    }

    impl FakeHistory {
        fn with(count: usize) -> Self {
            let reports = (0..count)
                .map(|i| ReportRecord {
                    user_id: "u1".to_string(),
                    tags: vec![],
                    images: vec![],
                    target: None,
                    timestamp: now() - Duration::minutes(i as i64),
                })
                .collect();
            Self {
                reports,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReportHistory for FakeHistory {
        async fn load(
            &self,
            _user_id: &str,
            cursor: DateTime<Utc>,
            limit: usize,
        ) -> Result<Vec<ReportRecord>> {
            self.queries.lock().unwrap().push((cursor, limit));
            Ok(self
                .reports
                .iter()
                .filter(|r| r.timestamp <= cursor)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    async fn reply(machine: &StateMachine, history: &dyn ReportHistory) -> OutboundMessage {
        let media = PrefixMediaUrls::new("https://media.example.com");
        let settings = FlowSettings::default();
        let deps = ReplyDeps {
            user_id: "u1",
            history,
            media: &media,
            settings: &settings,
            now: now(),
        };
        machine.generate_reply(&deps).await.unwrap()
    }

    #[tokio::test]
    async fn test_first_reply_is_init() {
        let machine = fresh();
        assert_eq!(machine.state_code(), Init::CODE);
        assert_eq!(machine.context_blob(), serde_json::json!({ "state_code": "INIT" }));

        let message = reply(&machine, &EmptyHistory).await;
        assert!(message.as_text().unwrap().starts_with("Hi!"));
        assert_eq!(message.quick_replies().len(), 2);
        assert_eq!(message.quick_replies()[0].decoded_payload().signal, Some(Signal::InsertNew));
    }

    #[test]
    fn test_full_insert_flow() {
        let mut machine = fresh();

        machine.receive_context(Action::signal(Signal::InsertNew));
        assert_eq!(machine.state_code(), InitInsert::CODE);

        machine.receive_context(Action::images(vec!["a.jpg".to_string()]));
        assert_eq!(machine.state_code(), ImgUploaded::CODE);

        machine.receive_context(Action::text("sunset"));
        assert_eq!(machine.state_code(), TagAdded::CODE);

        machine.receive_context(Action::signal(Signal::Skip));
        assert_eq!(machine.state_code(), ReportUser::CODE);

        machine.receive_context(Action::text("alice"));
        assert!(machine.is_completed());
        assert!(!machine.is_cancelled());

        assert_eq!(
            machine.draft_blob(),
            serde_json::json!({ "images": ["a.jpg"], "tags": ["sunset"], "target": "alice" })
        );
    }

    #[test]
    fn test_flow_survives_persistence_between_turns() {
        let mut blobs = (serde_json::json!({}), serde_json::json!({}));
        let actions = vec![
            Action::images(vec!["a.jpg".to_string()]),
            Action::text("sunset"),
            Action::text("beach"),
            Action::signal(Signal::Skip),
            Action::signal(Signal::Skip),
        ];
        for action in actions {
            let mut machine =
                StateMachine::from_blobs(&blobs.0, &blobs.1, UserPreference::default());
            machine.receive_context(action);
            if machine.is_completed() {
                assert_eq!(machine.draft().tags(), ["sunset", "beach"]);
                assert_eq!(machine.draft().target(), None);
                return;
            }
            blobs = (machine.context_blob(), machine.draft_blob());
        }
        panic!("flow did not complete");
    }

    #[test]
    fn test_skip_without_tags_still_advances() {
        let mut machine = at(TagAdded::CODE);
        assert!(machine.draft().tags().is_empty());
        machine.receive_context(Action::signal(Signal::Skip));
        assert_eq!(machine.state_code(), ReportUser::CODE);
    }

    #[test]
    fn test_report_user_skip_completes_without_target() {
        let mut machine = at(ReportUser::CODE);
        machine.receive_context(Action::signal(Signal::Skip));
        assert!(machine.is_completed());
        assert_eq!(machine.draft().target(), None);
    }

    #[test]
    fn test_unrecognized_actions_keep_state() {
        let unrecognized = [
            (Init::CODE, Action::text("hello")),
            (Init::CODE, Action::signal(Signal::Skip)),
            (Init::CODE, Action::signal(Signal::Unknown)),
            (InitInsert::CODE, Action::text("where do I upload?")),
            (InitInsert::CODE, Action::signal(Signal::Skip)),
            (ImgUploaded::CODE, Action::signal(Signal::Skip)),
            (ImgUploaded::CODE, Action::text("")),
            (TagAdded::CODE, Action::signal(Signal::InsertNew)),
            (ReportUser::CODE, Action::images(vec!["b.jpg".to_string()])),
            (InsertComplete::CODE, Action::text("more")),
            (InsertCancelled::CODE, Action::signal(Signal::InsertNew)),
        ];
        for (code, action) in unrecognized {
            let mut machine = at(code);
            machine.receive_context(action);
            assert_eq!(machine.state_code(), code);
            assert_eq!(machine.context_blob(), serde_json::json!({ "state_code": code }));
        }

        for (code, _) in STATE_TABLE {
            if *code == RecentReport::CODE {
                continue;
            }
            let mut machine = at(code);
            machine.receive_context(Action::empty());
            assert_eq!(machine.state_code(), *code);
        }
    }

    #[test]
    fn test_cancel_discards_nothing_from_draft_but_marks_cancelled() {
        let mut machine = at(TagAdded::CODE);
        machine.receive_context(Action::text("sunset"));
        machine.receive_context(Action::signal(Signal::Cancel));
        assert!(machine.is_cancelled());
        assert!(!machine.is_completed());
    }

    #[test]
    fn test_init_images_go_straight_to_uploaded() {
        let mut machine = fresh();
        machine.receive_context(Action::images(vec!["a.jpg".to_string(), "b.jpg".to_string()]));
        assert_eq!(machine.state_code(), ImgUploaded::CODE);
        assert_eq!(machine.draft().images(), ["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_malformed_payload_is_noop() {
        let mut machine = at(TagAdded::CODE);
        machine.receive_context(Action::from(PayloadCodec::decode("QR_SKIP")));
        assert_eq!(machine.state_code(), TagAdded::CODE);
    }

    #[test]
    fn test_recent_report_cursor_never_persisted() {
        let first = now();
        let second = now() - Duration::hours(3);

        let mut machine = fresh();
        machine.receive_context(Action {
            signal: Some(Signal::RecentReport),
            start_timestamp: Some(first),
            ..Default::default()
        });
        assert_eq!(machine.state_code(), RecentReport::CODE);
        assert_eq!(machine.context_blob(), serde_json::json!({ "state_code": "RECENT_REPORT" }));

        let mut machine = StateMachine::from_blobs(
            &machine.context_blob(),
            &machine.draft_blob(),
            UserPreference::default(),
        );
        machine.receive_context(Action {
            signal: Some(Signal::RecentReport),
            start_timestamp: Some(second),
            ..Default::default()
        });
        assert_eq!(machine.state_code(), RecentReport::CODE);
        assert!(format!("{:?}", machine.state()).contains(&format!("{:?}", second)));
        assert_eq!(machine.context_blob(), serde_json::json!({ "state_code": "RECENT_REPORT" }));
    }

    #[test]
    fn test_recent_report_anything_else_returns_to_init() {
        let mut machine = at(RecentReport::CODE);
        machine.receive_context(Action::text("hi"));
        assert_eq!(machine.state_code(), Init::CODE);

        let mut machine = at(RecentReport::CODE);
        machine.receive_context(Action::signal(Signal::RecentReport));
        assert_eq!(machine.state_code(), Init::CODE);
    }

    #[tokio::test]
    async fn test_recent_report_queries_past_page_end() {
        let history = FakeHistory::with(7);
        let cursor = now();

        let mut machine = fresh();
        machine.receive_context(Action {
            signal: Some(Signal::RecentReport),
            start_timestamp: Some(cursor),
            ..Default::default()
        });

        let message = reply(&machine, &history).await;
        assert_eq!(history.queries.lock().unwrap().as_slice(), &[(cursor, 7)]);

        let OutboundMessage::Template { template } = message else {
            panic!("expected template");
        };
        let Template::Carousel { cards } = template else {
            panic!("expected carousel");
        };
        assert_eq!(cards.len(), 5);
        let next = PayloadCodec::decode(&cards[4].buttons[0].payload);
        assert_eq!(next.start_timestamp, Some(history.reports[5].timestamp));
    }

    #[tokio::test]
    async fn test_recent_report_without_cursor_starts_now() {
        let history = FakeHistory::with(0);
        let machine = at(RecentReport::CODE);

        let message = reply(&machine, &history).await;
        assert_eq!(history.queries.lock().unwrap()[0].0, now());
        assert_eq!(message.as_text(), Some("You have no reports yet."));
    }

    #[tokio::test]
    async fn test_suggestions_exclude_draft_values() {
        let preference = UserPreference::new(
            vec!["Sunset".into(), "beach".into(), "ocean".into(), "city".into()],
            vec!["Alice".into(), "bob".into()],
        );
        let mut machine =
            StateMachine::load(ConversationContext::new(), DraftReport::new(), preference);
        machine.receive_context(Action::images(vec!["a.jpg".to_string()]));
        machine.receive_context(Action::text("sunset"));

        let message = reply(&machine, &EmptyHistory).await;
        let titles: Vec<&str> = message.quick_replies().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["beach", "ocean", "city", "skip", "cancel"]);

        machine.draft_mut().add_target("alice");
        machine.set_state(Box::new(ReportUser));
        let message = reply(&machine, &EmptyHistory).await;
        let titles: Vec<&str> = message.quick_replies().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["bob", "skip", "cancel"]);
    }

    #[tokio::test]
    async fn test_history_failure_surfaces() {
        struct Broken;

        #[async_trait]
        impl ReportHistory for Broken {
            async fn load(
                &self,
                _user_id: &str,
                _cursor: DateTime<Utc>,
                _limit: usize,
            ) -> Result<Vec<ReportRecord>> {
                Err(crate::error::FlowError::History("table missing".to_string()))
            }
        }

        let machine = at(RecentReport::CODE);
        let media = PrefixMediaUrls::new("https://media.example.com");
        let settings = FlowSettings::default();
        let deps = ReplyDeps {
            user_id: "u1",
            history: &Broken,
            media: &media,
            settings: &settings,
            now: now(),
        };
        assert!(machine.generate_reply(&deps).await.is_err());
    }
}
