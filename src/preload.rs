use anyhow::Result;
use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::content::Question;

lazy_static! {
    static ref URL_NOISE_REGEX: Regex = Regex::new("[?#].*$").unwrap();
}

/// Cache key for an image reference. Query strings and fragments are
/// dropped so rotating signed-URL parameters still hit the same entry.
pub fn url_to_key(url: &str) -> String {
    URL_NOISE_REGEX.replace(url, "").into()
}

/// Fetches raw image bytes. Implemented by the embedding app's network
/// layer; transport policy and timeouts live there.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Shared image store, safe to populate from concurrent prefetches.
/// Last writer wins when two fetches race on the same key.
#[derive(Default)]
pub struct ImageCache {
    entries: RwLock<HashMap<String, Arc<Vec<u8>>>>,
}

impl ImageCache {
    pub fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.entries.read().get(key).cloned()
    }

    pub fn put(&self, key: &str, bytes: Vec<u8>) {
        self.entries.write().insert(key.to_owned(), Arc::new(bytes));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Warms the cache for every question after the first one. The first
/// question's image is fetched on demand when it is shown, so prefetching
/// it here would double the work. Fetch failures are logged and skipped.
pub fn preload_images<F: ImageFetcher>(questions: &[Question], cache: &ImageCache, fetcher: &F) {
    for question in questions.iter().skip(1) {
        let url = match &question.image_url {
            Some(url) => url,
            None => continue,
        };
        let key = url_to_key(url);
        if cache.contains(&key) {
            continue;
        }
        match fetcher.fetch(url) {
            Ok(bytes) => cache.put(&key, bytes),
            Err(e) => log::warn!("image preload failed for {}: {:#}", url, e),
        }
    }
}

pub fn spawn_preload<F>(
    questions: Vec<Question>,
    cache: Arc<ImageCache>,
    fetcher: Arc<F>,
) -> JoinHandle<()>
where
    F: ImageFetcher + Send + Sync + 'static,
{
    thread::spawn(move || preload_images(&questions, &cache, fetcher.as_ref()))
}

/// Ticket for an in-flight image fetch. Tokens are compared, never
/// dereferenced, so equal URLs requested at different times stay distinct.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FetchToken(u64);

/// Issues fetch tokens for the image shown on screen. Advancing to the next
/// question issues a fresh token; a completion handler holding an older one
/// must drop its result silently.
#[derive(Default)]
pub struct FetchGate {
    latest: AtomicU64,
}

impl FetchGate {
    pub fn issue(&self) -> FetchToken {
        FetchToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: FetchToken) -> bool {
        token.0 == self.latest.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::collections::HashSet;

    #[derive(Default)]
    struct MockFetcher {
        requests: RwLock<Vec<String>>,
        failing: HashSet<String>,
    }

    impl MockFetcher {
        fn failing_on(url: &str) -> Self {
            MockFetcher {
                requests: RwLock::new(Vec::new()),
                failing: [url.to_owned()].iter().cloned().collect(),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.read().clone()
        }
    }

    impl ImageFetcher for MockFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.requests.write().push(url.to_owned());
            if self.failing.contains(url) {
                bail!("mock fetch failure");
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    fn question(image_url: Option<&str>) -> Question {
        Question {
            text: "?".to_owned(),
            image_url: image_url.map(str::to_owned),
            answers: vec!["a".to_owned(), "b".to_owned()],
            correct: [0].iter().copied().collect(),
        }
    }

    #[test]
    fn strips_query_and_fragment_from_cache_keys() {
        assert_eq!(
            url_to_key("https://img.example/a.jpg?token=abc#frag"),
            "https://img.example/a.jpg"
        );
        assert_eq!(url_to_key("https://img.example/a.jpg"), "https://img.example/a.jpg");
    }

    #[test]
    fn preloads_every_question_but_the_first() {
        let questions = vec![
            question(Some("https://img.example/1.jpg")),
            question(Some("https://img.example/2.jpg")),
            question(None),
            question(Some("https://img.example/3.jpg")),
        ];
        let cache = ImageCache::default();
        let fetcher = MockFetcher::default();

        preload_images(&questions, &cache, &fetcher);

        assert_eq!(
            fetcher.requests(),
            ["https://img.example/2.jpg", "https://img.example/3.jpg"]
        );
        assert!(!cache.contains("https://img.example/1.jpg"));
        assert!(cache.contains("https://img.example/2.jpg"));
        assert!(cache.contains("https://img.example/3.jpg"));
    }

    #[test]
    fn skips_already_cached_images() {
        let questions = vec![
            question(None),
            question(Some("https://img.example/2.jpg?token=first")),
        ];
        let cache = ImageCache::default();
        cache.put("https://img.example/2.jpg", vec![1, 2, 3]);
        let fetcher = MockFetcher::default();

        preload_images(&questions, &cache, &fetcher);

        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn keeps_going_after_a_failed_fetch() {
        let questions = vec![
            question(None),
            question(Some("https://img.example/bad.jpg")),
            question(Some("https://img.example/good.jpg")),
        ];
        let cache = ImageCache::default();
        let fetcher = MockFetcher::failing_on("https://img.example/bad.jpg");

        preload_images(&questions, &cache, &fetcher);

        assert!(!cache.contains("https://img.example/bad.jpg"));
        assert!(cache.contains("https://img.example/good.jpg"));
    }

    #[test]
    fn background_preload_populates_shared_cache() {
        let questions = vec![question(None), question(Some("https://img.example/2.jpg"))];
        let cache = Arc::new(ImageCache::default());
        let fetcher = Arc::new(MockFetcher::default());

        spawn_preload(questions, cache.clone(), fetcher.clone())
            .join()
            .unwrap();

        assert!(cache.contains("https://img.example/2.jpg"));
    }

    #[test]
    fn stale_fetch_tokens_are_rejected() {
        let gate = FetchGate::default();
        let first = gate.issue();
        assert!(gate.is_current(first));

        let second = gate.issue();
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
        assert_ne!(first, second);
    }

    #[test]
    fn cache_overwrites_keep_the_last_value() {
        let cache = ImageCache::default();
        cache.put("key", vec![1]);
        cache.put("key", vec![2]);
        assert_eq!(*cache.get("key").unwrap(), vec![2]);
        assert_eq!(cache.len(), 1);
    }
}
