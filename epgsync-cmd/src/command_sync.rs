use std::{
    collections::{HashMap, HashSet},
    path::Path,
    thread,
};

use anyhow::{bail, Context, Result};
use crossbeam::channel;
use epgsync::{
    merge, write_guide, Document, Error, Fetch, HttpFetcher, MergeSummary, SourceTable,
};
use tracing::{debug, info};

/// Remote documents fetched ahead of the merge, keyed by URL.
///
/// Serving the merge from prefetched results keeps the per-channel
/// remove-then-insert step sequential and in guide document order even when
/// the fetches themselves ran in parallel.
struct Prefetched {
    docs: HashMap<String, Result<Document, String>>,
}

impl Fetch for Prefetched {
    fn fetch(&self, url: &str) -> epgsync::Result<Document> {
        match self.docs.get(url) {
            Some(Ok(doc)) => Ok(doc.clone()),
            Some(Err(msg)) => Err(Error::FetchFailed(msg.clone())),
            None => Err(Error::FetchFailed(format!("{url} was not prefetched"))),
        }
    }
}

/// Fetch every URL on a pool of `jobs` worker threads.
fn prefetch<F>(urls: Vec<String>, fetcher: &F, jobs: usize) -> Prefetched
where
    F: Fetch + Sync,
{
    let jobs = jobs.min(urls.len());
    let (work_tx, work_rx) = channel::unbounded::<String>();
    let (zult_tx, zult_rx) = channel::unbounded();

    let docs = thread::scope(|s| {
        for _ in 0..jobs {
            let work_rx = work_rx.clone();
            let zult_tx = zult_tx.clone();
            s.spawn(move || {
                for url in work_rx {
                    let zult = fetcher.fetch(&url).map_err(|err| err.to_string());
                    let _ = zult_tx.send((url, zult));
                }
            });
        }
        drop(work_rx);
        drop(zult_tx);

        for url in urls {
            let _ = work_tx.send(url);
        }
        drop(work_tx);

        zult_rx.iter().collect()
    });

    Prefetched { docs }
}

/// Distinct schedule URLs for the guide's channels, in guide document order.
fn schedule_urls(guide: &Document, sources: &SourceTable) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::default();
    guide
        .channel_ids()
        .iter()
        .filter_map(|id| sources.url_for(id))
        .filter(|url| seen.insert(url.to_string()))
        .map(String::from)
        .collect()
}

pub fn sync(guide_path: &Path, sources_path: &Path, jobs: usize) -> Result<MergeSummary> {
    if !guide_path.exists() {
        bail!("Guide file does not exist: {guide_path:?}");
    }
    if !sources_path.exists() {
        bail!("Sources file does not exist: {sources_path:?}");
    }

    let mut guide = Document::with_path(guide_path)
        .with_context(|| format!("parsing guide {guide_path:?}"))?;
    let sources = SourceTable::with_path(sources_path)
        .with_context(|| format!("reading sources {sources_path:?}"))?;
    info!(
        "loaded {} channels and {} schedule sources",
        guide.channel_ids().len(),
        sources.len()
    );

    let fetcher = HttpFetcher::new().context("creating HTTP client")?;
    let summary = if jobs > 1 {
        let urls = schedule_urls(&guide, &sources);
        debug!("prefetching {} schedule documents on {jobs} workers", urls.len());
        let prefetched = prefetch(urls, &fetcher, jobs);
        merge(&mut guide, &sources, &prefetched)
    } else {
        merge(&mut guide, &sources, &fetcher)
    };

    write_guide(&guide, guide_path).with_context(|| format!("writing {guide_path:?}"))?;
    info!("saved {guide_path:?}");

    Ok(summary)
}
