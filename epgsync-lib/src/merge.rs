use std::fmt::Display;

use tracing::{debug, info, warn};

use crate::{fetch::Fetch, sources::SourceTable, xmltv::Document};

/// Outcome of syncing a single channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Programmes were replaced with the fetched schedule.
    Synced { programmes: usize },
    /// No source row for this channel; left untouched.
    NoSource,
    /// Source row present but its schedule URL is empty; left untouched.
    NoUrl,
    /// Fetch or parse failed; left untouched.
    Failed(String),
}

/// Per-channel outcomes for one merge run, in guide document order.
#[derive(Debug, Default)]
pub struct MergeSummary {
    pub channels: Vec<(String, ChannelStatus)>,
}

impl MergeSummary {
    #[must_use]
    pub fn synced(&self) -> usize {
        self.count(|status| matches!(status, ChannelStatus::Synced { .. }))
    }

    /// Channels left untouched because they had no source row or no URL.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, ChannelStatus::NoSource | ChannelStatus::NoUrl))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, ChannelStatus::Failed(_)))
    }

    /// True when no channel with a schedule source failed to sync.
    #[must_use]
    pub fn fully_succeeded(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&ChannelStatus) -> bool) -> usize {
        self.channels.iter().filter(|(_, status)| pred(status)).count()
    }
}

impl Display for MergeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "channels={} synced={} skipped={} failed={}",
            self.channels.len(),
            self.synced(),
            self.skipped(),
            self.failed(),
        )
    }
}

/// Replace the programmes of every channel that has a schedule source with
/// the programmes from its freshly fetched schedule document.
///
/// Channels are processed one at a time in guide document order. A channel
/// with no source row or an empty URL is left entirely alone, as is any
/// channel whose fetch or parse fails; removal only ever happens once a
/// replacement document is in hand. Adopted programmes get their `channel`
/// attribute rewritten to the local channel id and are appended after all
/// existing content.
pub fn merge<F: Fetch>(guide: &mut Document, sources: &SourceTable, fetcher: &F) -> MergeSummary {
    let mut summary = MergeSummary::default();
    for channel_id in guide.channel_ids() {
        let status = sync_channel(guide, &channel_id, sources, fetcher);
        summary.channels.push((channel_id, status));
    }
    summary
}

fn sync_channel<F: Fetch>(
    guide: &mut Document,
    channel_id: &str,
    sources: &SourceTable,
    fetcher: &F,
) -> ChannelStatus {
    let Some(row) = sources.get(channel_id) else {
        debug!("no schedule source for channel {channel_id}; skipping");
        return ChannelStatus::NoSource;
    };
    let url = row.schedule_source.as_str();
    if url.is_empty() {
        debug!("empty schedule source for channel {channel_id}; skipping");
        return ChannelStatus::NoUrl;
    }

    info!("fetching schedule for channel {channel_id} from {url}");
    // The fetch must fully succeed before any local programme is removed.
    let remote = match fetcher.fetch(url) {
        Ok(doc) => doc,
        Err(err) => {
            warn!("failed to fetch or parse schedule for channel {channel_id}: {err}");
            return ChannelStatus::Failed(err.to_string());
        }
    };

    let removed = guide.remove_programmes(channel_id);
    let mut adopted = 0;
    for programme in remote.programmes() {
        let mut programme = programme.clone();
        programme.set_attr("channel", channel_id);
        guide.children.push(programme);
        adopted += 1;
    }
    debug!("channel {channel_id}: removed {removed} programmes, adopted {adopted}");

    ChannelStatus::Synced {
        programmes: adopted,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::error::{Error, Result};
    use crate::xmltv::PROGRAMME;

    use super::*;

    /// [Fetch] backed by canned XML per URL.
    struct MockFetch {
        responses: HashMap<String, String>,
    }

    impl MockFetch {
        fn new(responses: &[(&str, &str)]) -> Self {
            MockFetch {
                responses: responses
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
            }
        }
    }

    impl Fetch for MockFetch {
        fn fetch(&self, url: &str) -> Result<Document> {
            match self.responses.get(url) {
                Some(body) => Document::parse(body),
                None => Err(Error::FetchFailed(format!("no response for {url}"))),
            }
        }
    }

    fn guide() -> Document {
        Document::parse(
            r#"<tv>
  <channel id="a"><display-name>A</display-name></channel>
  <channel id="b"><display-name>B</display-name></channel>
  <programme start="1" channel="a"><title>a1</title></programme>
  <programme start="2" channel="a"><title>a2</title></programme>
  <programme start="3" channel="b"><title>b1</title></programme>
</tv>"#,
        )
        .expect("failed to parse test guide")
    }

    fn sources(rows: &str) -> SourceTable {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "epg_channel_id,schedule_source\n{rows}").unwrap();
        SourceTable::with_path(file.path()).unwrap()
    }

    fn programme_count(doc: &Document, channel_id: &str) -> usize {
        doc.programmes()
            .filter(|p| p.attr("channel") == Some(channel_id))
            .count()
    }

    #[test]
    fn test_replaces_programmes_and_leaves_unmatched_channels_alone() {
        let mut guide = guide();
        let sources = sources("a,http://host/a.xml\n");
        let fetcher = MockFetch::new(&[(
            "http://host/a.xml",
            r#"<schedule>
  <programme start="10" channel="a"><title>new1</title></programme>
  <programme start="11" channel="a"><title>new2</title></programme>
  <programme start="12" channel="a"><title>new3</title></programme>
</schedule>"#,
        )]);

        let summary = merge(&mut guide, &sources, &fetcher);

        assert_eq!(
            summary.channels,
            vec![
                (
                    "a".to_string(),
                    ChannelStatus::Synced { programmes: 3 }
                ),
                ("b".to_string(), ChannelStatus::NoSource),
            ]
        );
        assert_eq!(programme_count(&guide, "a"), 3);
        assert_eq!(programme_count(&guide, "b"), 1, "b must be untouched");
        assert!(summary.fully_succeeded());

        // None of the original channel-a programmes survive
        for programme in guide.programmes().filter(|p| p.attr("channel") == Some("a")) {
            assert!(
                programme.inner.contains("new"),
                "stale programme left behind: {:?}",
                programme.inner
            );
        }
    }

    #[test]
    fn test_failed_fetch_leaves_channel_untouched() {
        let mut guide = guide();
        let before = guide.clone();
        // URL maps to nothing, so every fetch fails
        let sources = sources("a,http://host/timeout.xml\n");
        let fetcher = MockFetch::new(&[]);

        let summary = merge(&mut guide, &sources, &fetcher);

        assert_eq!(summary.failed(), 1);
        assert!(!summary.fully_succeeded());
        assert_eq!(guide, before, "a failed fetch must never remove programmes");
    }

    #[test]
    fn test_remote_parse_failure_leaves_channel_untouched() {
        let mut guide = guide();
        let before = guide.clone();
        let sources = sources("a,http://host/a.xml\n");
        let fetcher = MockFetch::new(&[("http://host/a.xml", "<schedule><programme")]);

        let summary = merge(&mut guide, &sources, &fetcher);

        assert_eq!(summary.failed(), 1);
        assert_eq!(guide, before);
    }

    #[test]
    fn test_empty_source_table_is_a_no_op() {
        let mut guide = guide();
        let before = guide.clone();
        let sources = sources("");
        let fetcher = MockFetch::new(&[]);

        let summary = merge(&mut guide, &sources, &fetcher);

        assert_eq!(guide, before);
        assert_eq!(summary.synced(), 0);
        assert_eq!(summary.skipped(), 2);
        assert!(summary.fully_succeeded(), "skips are not failures");
    }

    #[test]
    fn test_blank_url_skips_without_fetching() {
        let mut guide = guide();
        let before = guide.clone();
        // MockFetch would fail for any URL, proving no fetch was attempted
        let sources = sources("a,\n");
        let fetcher = MockFetch::new(&[]);

        let summary = merge(&mut guide, &sources, &fetcher);

        assert_eq!(
            summary.channels[0],
            ("a".to_string(), ChannelStatus::NoUrl)
        );
        assert_eq!(guide, before);
    }

    #[test]
    fn test_remote_channel_attribute_is_overwritten() {
        let mut guide = guide();
        let sources = sources("a,http://host/a.xml\n");
        let fetcher = MockFetch::new(&[(
            "http://host/a.xml",
            r#"<schedule>
  <channel id="their-id"/>
  <programme start="10" channel="their-id"><title>new</title></programme>
  <programme start="11"><title>unattributed</title></programme>
</schedule>"#,
        )]);

        merge(&mut guide, &sources, &fetcher);

        let adopted: Vec<_> = guide
            .programmes()
            .filter(|p| p.inner.contains("new") || p.inner.contains("unattributed"))
            .collect();
        assert_eq!(adopted.len(), 2);
        for programme in adopted {
            assert_eq!(
                programme.attr("channel"),
                Some("a"),
                "local id must always win"
            );
        }
        // The remote channel declaration is discarded, not adopted
        assert_eq!(guide.channel_ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_adopted_programmes_append_after_existing_content() {
        let mut guide = guide();
        let sources = sources("a,http://host/a.xml\n");
        let fetcher = MockFetch::new(&[(
            "http://host/a.xml",
            r#"<schedule>
  <programme start="10"><title>first</title></programme>
  <programme start="11"><title>second</title></programme>
</schedule>"#,
        )]);

        merge(&mut guide, &sources, &fetcher);

        let last_two: Vec<_> = guide.children[guide.children.len() - 2..]
            .iter()
            .map(|e| e.inner.clone())
            .collect();
        assert!(last_two[0].contains("first"), "remote order preserved");
        assert!(last_two[1].contains("second"));
        // b's pre-existing programme sits before the adopted block
        let b_pos = guide
            .children
            .iter()
            .position(|e| e.name == PROGRAMME && e.attr("channel") == Some("b"))
            .unwrap();
        assert!(b_pos < guide.children.len() - 2);
    }

    #[test]
    fn test_nested_remote_programmes_are_not_adopted() {
        let mut guide = guide();
        let sources = sources("a,http://host/a.xml\n");
        let fetcher = MockFetch::new(&[(
            "http://host/a.xml",
            r#"<schedule>
  <day><programme start="10"><title>nested</title></programme></day>
  <programme start="11"><title>flat</title></programme>
</schedule>"#,
        )]);

        let summary = merge(&mut guide, &sources, &fetcher);

        assert_eq!(
            summary.channels[0],
            (
                "a".to_string(),
                ChannelStatus::Synced { programmes: 1 }
            ),
            "only direct children are scanned"
        );
        assert_eq!(programme_count(&guide, "a"), 1);
    }

    #[test]
    fn test_summary_display() {
        let summary = MergeSummary {
            channels: vec![
                ("a".to_string(), ChannelStatus::Synced { programmes: 3 }),
                ("b".to_string(), ChannelStatus::NoSource),
                ("c".to_string(), ChannelStatus::Failed("timed out".to_string())),
            ],
        };

        assert_eq!(
            summary.to_string(),
            "channels=3 synced=1 skipped=1 failed=1"
        );
    }
}
