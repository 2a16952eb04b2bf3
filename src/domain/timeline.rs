use crate::domain::{
    ChatButton, PENDING_DISPLAY, RawMessage, ResultView, build_export_text, is_hidden_status,
    is_intro, is_pending, normalize, normalize_opt, resolve_normalized, should_hide_message,
};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, warn};

/// Topic the bot publishes replies on.
pub const BOT_TOPIC: &str = "bot_msg";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChannelSignal {
    Payload(String),
    Error(String),
    Closed,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is closed")]
    Closed,

    #[error("channel error: {0}")]
    Transport(String),
}

/// Long-lived publish/subscribe feed of bot replies, owned by the caller and lent to the
/// timeline.
pub trait PushChannel {
    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError>;
    fn unsubscribe(&mut self);
    fn try_next(&mut self) -> Option<ChannelSignal>;
    fn close(&mut self);
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimelineEntry {
    pub id: i64,
    pub username: Option<String>,
    pub created_at: Option<String>,
    pub view: Arc<ResultView>,
    pub image_url: Option<String>,
    pub buttons: Vec<ChatButton>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DrainOutcome {
    pub appended: usize,
    pub dropped: usize,
    pub closed: bool,
}

type CacheKey = (i64, [u8; 32]);

/// Resolved views keyed by message id and a hash of the raw text.
#[derive(Debug, Default)]
pub struct ParseCache {
    entries: HashMap<CacheKey, Arc<ResultView>>,
}

impl ParseCache {
    pub fn resolve(&mut self, id: i64, raw: &str) -> Arc<ResultView> {
        let key = (id, text_digest(raw));
        self.entries
            .entry(key)
            .or_insert_with(|| Arc::new(resolve_normalized(&normalize(raw))))
            .clone()
    }

    pub fn retain_ids(&mut self, ids: &HashSet<i64>) {
        self.entries.retain(|(id, _), _| ids.contains(id));
    }
}

fn text_digest(text: &str) -> [u8; 32] {
    Sha256::digest(text.as_bytes()).into()
}

/// Ordered message list fed by one-shot fetches and the push channel.
#[derive(Debug, Default)]
pub struct Timeline {
    messages: Vec<RawMessage>,
    cache: ParseCache,
    last_error: Option<String>,
    download_base: Option<String>,
}

impl Timeline {
    pub fn new(download_base: Option<String>) -> Self {
        Self {
            download_base,
            ..Self::default()
        }
    }

    /// Replaces the timeline with a fetched batch: onboarding noise dropped, duplicates
    /// collapsed, sorted by creation time.
    pub fn load_initial(&mut self, batch: Vec<RawMessage>) {
        let mut seen: HashSet<i64> = HashSet::new();
        let mut messages: Vec<RawMessage> = batch
            .into_iter()
            .filter(|msg| !is_intro(msg.text_or_empty()))
            .filter(|msg| seen.insert(msg.id))
            .collect();
        messages.sort_by_key(|msg| msg.created_at.as_deref().and_then(parse_timestamp_ms));
        debug!(count = messages.len(), "timeline loaded");

        self.cache.retain_ids(&seen);
        self.messages = messages;
    }

    /// Appends at the tail without re-sorting. Returns `false` for an id already present.
    pub fn push(&mut self, msg: RawMessage) -> bool {
        if self.messages.iter().any(|existing| existing.id == msg.id) {
            debug!(id = msg.id, "duplicate message ignored");
            return false;
        }
        self.messages.push(msg);
        true
    }

    /// Decodes one push payload and appends it. Malformed payloads are logged and dropped.
    pub fn push_payload(&mut self, payload: &str) -> bool {
        match serde_json::from_str::<RawMessage>(payload) {
            Ok(msg) => self.push(msg),
            Err(error) => {
                warn!(%error, "dropping malformed push payload");
                false
            }
        }
    }

    /// Pulls everything currently queued on `channel`.
    pub fn drain(&mut self, channel: &mut dyn PushChannel) -> DrainOutcome {
        let mut outcome = DrainOutcome::default();
        while let Some(signal) = channel.try_next() {
            match signal {
                ChannelSignal::Payload(payload) => {
                    if self.push_payload(&payload) {
                        outcome.appended += 1;
                    } else {
                        outcome.dropped += 1;
                    }
                }
                ChannelSignal::Error(message) => self.record_error(message),
                ChannelSignal::Closed => {
                    outcome.closed = true;
                    break;
                }
            }
        }
        outcome
    }

    pub fn messages(&self) -> &[RawMessage] {
        &self.messages
    }

    /// Messages that survive the noise filters, in timeline order.
    pub fn visible(&self) -> Vec<&RawMessage> {
        let candidates: Vec<&RawMessage> = self
            .messages
            .iter()
            .filter(|msg| has_body(msg) && !is_hidden_status(msg.text_or_empty()))
            .collect();
        candidates
            .iter()
            .enumerate()
            .filter(|(index, msg)| !should_hide_message(msg, *index, &candidates))
            .map(|(_, msg)| *msg)
            .collect()
    }

    pub fn entries(&mut self) -> Vec<TimelineEntry> {
        let visible: Vec<RawMessage> = self.visible().into_iter().cloned().collect();
        visible
            .into_iter()
            .map(|msg| self.entry_for(msg))
            .collect()
    }

    /// Clipboard text for one visible message.
    pub fn export_text(&mut self, id: i64) -> Option<String> {
        let msg = self
            .visible()
            .into_iter()
            .find(|msg| msg.id == id)
            .cloned()?;
        let view = self.view_for(&msg);
        Some(build_export_text(&view, &normalize_opt(msg.text.as_deref())))
    }

    /// Keeps only the latest failure.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn cached_views(&self) -> usize {
        self.cache.entries.len()
    }

    fn view_for(&mut self, msg: &RawMessage) -> Arc<ResultView> {
        let text = msg.text_or_empty();
        if is_pending(text) {
            return Arc::new(ResultView::PlainText(PENDING_DISPLAY.to_string()));
        }
        self.cache.resolve(msg.id, text)
    }

    fn entry_for(&mut self, msg: RawMessage) -> TimelineEntry {
        let view = self.view_for(&msg);
        let image_url = if msg.is_jpeg() && !matches!(*view, ResultView::FaceRecognition(_)) {
            self.image_url(&msg)
        } else {
            None
        };
        TimelineEntry {
            id: msg.id,
            username: msg.username,
            created_at: msg.created_at,
            view,
            image_url,
            buttons: msg.buttons,
        }
    }

    fn image_url(&self, msg: &RawMessage) -> Option<String> {
        if let Some(url) = msg.file_url.as_deref().filter(|url| !url.trim().is_empty()) {
            return Some(url.to_string());
        }
        let base = self.download_base.as_deref()?;
        let chat_id = msg.chat_id?;
        Some(download_file_url(base, chat_id, msg.message_id.unwrap_or(msg.id)))
    }
}

/// Backend endpoint serving an image message that carries no `file_url`.
pub fn download_file_url(base: &str, chat_id: i64, message_id: i64) -> String {
    format!(
        "{}/download-file?chat_id={chat_id}&message_id={message_id}",
        base.trim_end_matches('/')
    )
}

fn has_body(msg: &RawMessage) -> bool {
    !msg.text_or_empty().trim().is_empty() || msg.is_jpeg() || !msg.buttons.is_empty()
}

/// RFC 3339 first, then the backend's `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_timestamp_ms(value: &str) -> Option<i64> {
    let value = value.trim();
    let timestamp = match OffsetDateTime::parse(value, &Rfc3339) {
        Ok(timestamp) => timestamp,
        Err(_) => PrimitiveDateTime::parse(
            value,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        )
        .ok()?
        .assume_utc(),
    };
    let ms: i128 = timestamp.unix_timestamp_nanos() / 1_000_000;
    i64::try_from(ms).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DisplayDecision;
    use std::collections::VecDeque;

    fn msg(id: i64, text: &str, created_at: &str) -> RawMessage {
        RawMessage {
            id,
            text: Some(text.to_string()),
            mime_type: None,
            file_url: None,
            created_at: Some(created_at.to_string()),
            username: Some("bot".to_string()),
            chat_id: Some(10),
            message_id: Some(id),
            buttons: Vec::new(),
        }
    }

    #[derive(Default)]
    struct FakeChannel {
        queue: VecDeque<ChannelSignal>,
        topic: Option<String>,
        closed: bool,
    }

    impl PushChannel for FakeChannel {
        fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
            if self.closed {
                return Err(ChannelError::Closed);
            }
            self.topic = Some(topic.to_string());
            Ok(())
        }

        fn unsubscribe(&mut self) {
            self.topic = None;
        }

        fn try_next(&mut self) -> Option<ChannelSignal> {
            self.topic.as_ref()?;
            self.queue.pop_front()
        }

        fn close(&mut self) {
            self.closed = true;
            self.topic = None;
        }
    }

    fn ids(timeline: &Timeline) -> Vec<i64> {
        timeline.visible().iter().map(|m| m.id).collect()
    }

    #[test]
    fn initial_load_sorts_and_drops_intro() {
        let mut timeline = Timeline::new(None);
        timeline.load_initial(vec![
            msg(3, "NIK: 3", "2026-02-18T10:00:03Z"),
            msg(1, "/start", "2026-02-18T10:00:00Z"),
            msg(2, "halo", "2026-02-18 10:00:01"),
            msg(2, "dup", "2026-02-18T10:00:09Z"),
        ]);
        let order: Vec<i64> = timeline.messages().iter().map(|m| m.id).collect();
        assert_eq!(order, vec![2, 3]);
        assert_eq!(timeline.messages()[0].text.as_deref(), Some("halo"));
    }

    #[test]
    fn button_only_replies_stay_visible() {
        let mut timeline = Timeline::new(None);
        let keyboard = RawMessage {
            id: 7,
            created_at: Some("2026-02-18T10:00:07Z".to_string()),
            buttons: vec![ChatButton {
                text: "Next".to_string(),
                data: "page:2".to_string(),
            }],
            ..RawMessage::default()
        };
        timeline.load_initial(vec![keyboard]);
        assert_eq!(ids(&timeline), vec![7]);
        assert_eq!(timeline.entries()[0].buttons[0].data, "page:2");
    }

    #[test]
    fn pushed_messages_append_without_resorting() {
        let mut timeline = Timeline::new(None);
        timeline.load_initial(vec![msg(5, "lima", "2026-02-18T10:00:05Z")]);
        assert!(timeline.push(msg(4, "empat", "2026-02-18T10:00:04Z")));
        assert!(!timeline.push(msg(5, "lima lagi", "2026-02-18T10:00:06Z")));
        assert_eq!(ids(&timeline), vec![5, 4]);
    }

    #[test]
    fn hides_noise_and_keeps_last_pending() {
        let mut timeline = Timeline::new(None);
        timeline.load_initial(vec![
            msg(1, "NIK: 1", "2026-02-18T10:00:01Z"),
            msg(2, "Mengirim permintaan…", "2026-02-18T10:00:02Z"),
            msg(3, "Please wait, on proses", "2026-02-18T10:00:03Z"),
            msg(4, "Mengirim permintaan…", "2026-02-18T10:00:04Z"),
            msg(5, "   ", "2026-02-18T10:00:05Z"),
        ]);
        assert_eq!(ids(&timeline), vec![1, 4]);

        let entries = timeline.entries();
        assert_eq!(
            *entries[1].view,
            ResultView::PlainText(PENDING_DISPLAY.to_string())
        );
    }

    #[test]
    fn drains_fake_channel_and_drops_malformed_payloads() {
        let mut channel = FakeChannel::default();
        channel.queue.push_back(ChannelSignal::Payload(
            r#"{"id":9,"result_text":"NIK: 9\nNAMA: A","created_at":"2026-02-18T10:00:09Z"}"#
                .to_string(),
        ));
        channel
            .queue
            .push_back(ChannelSignal::Payload("not json".to_string()));
        channel
            .queue
            .push_back(ChannelSignal::Error("socket hiccup".to_string()));
        channel.queue.push_back(ChannelSignal::Closed);

        let mut timeline = Timeline::new(None);
        assert_eq!(timeline.drain(&mut channel), DrainOutcome::default());

        channel.subscribe(BOT_TOPIC).expect("subscribe");
        let outcome = timeline.drain(&mut channel);
        assert_eq!(
            outcome,
            DrainOutcome {
                appended: 1,
                dropped: 1,
                closed: true
            }
        );
        assert_eq!(ids(&timeline), vec![9]);
        assert_eq!(timeline.last_error(), Some("socket hiccup"));

        channel.close();
        assert!(channel.subscribe(BOT_TOPIC).is_err());
    }

    #[test]
    fn latest_error_replaces_previous() {
        let mut timeline = Timeline::new(None);
        timeline.record_error("first");
        timeline.record_error("second");
        assert_eq!(timeline.last_error(), Some("second"));
        timeline.clear_error();
        assert_eq!(timeline.last_error(), None);
    }

    #[test]
    fn views_are_memoized_per_message() {
        let mut timeline = Timeline::new(None);
        timeline.load_initial(vec![
            msg(1, "NO. 1\nNIK: 1\nNAMA: A", "2026-02-18T10:00:01Z"),
            msg(2, "halo", "2026-02-18T10:00:02Z"),
        ]);
        let first = timeline.entries();
        let second = timeline.entries();
        assert_eq!(timeline.cached_views(), 2);
        assert!(Arc::ptr_eq(&first[0].view, &second[0].view));
        assert_eq!(first[0].view.decision(), DisplayDecision::PopulationRecords);
    }

    #[test]
    fn image_urls_prefer_file_url_then_download_endpoint() {
        let mut timeline = Timeline::new(Some("https://api.example/".to_string()));
        let mut with_url = msg(1, "", "2026-02-18T10:00:01Z");
        with_url.mime_type = Some("image/jpeg".to_string());
        with_url.file_url = Some("https://cdn.example/a.jpg".to_string());
        let mut without_url = msg(2, "foto", "2026-02-18T10:00:02Z");
        without_url.mime_type = Some("image/jpeg".to_string());
        timeline.load_initial(vec![with_url, without_url]);

        let entries = timeline.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].image_url.as_deref(),
            Some("https://cdn.example/a.jpg")
        );
        assert_eq!(
            entries[1].image_url.as_deref(),
            Some("https://api.example/download-file?chat_id=10&message_id=2")
        );
    }

    #[test]
    fn export_text_uses_resolved_view() {
        let mut timeline = Timeline::new(None);
        timeline.load_initial(vec![msg(
            1,
            "```\nNO. 1\nNIK: 3201\nNAMA: Budi\n```",
            "2026-02-18T10:00:01Z",
        )]);
        let out = timeline.export_text(1).expect("export");
        assert_eq!(out, "DATA KEPENDUDUKAN\n\nData 1\nNIK: 3201\nNama: Budi");
        assert_eq!(timeline.export_text(99), None);
    }

    #[test]
    fn parses_both_timestamp_shapes() {
        assert_eq!(parse_timestamp_ms("1970-01-01T00:00:01Z"), Some(1_000));
        assert_eq!(parse_timestamp_ms("1970-01-01 00:00:02"), Some(2_000));
        assert_eq!(parse_timestamp_ms("yesterday"), None);
    }
}
