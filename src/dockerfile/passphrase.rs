//! Human-pronounceable passphrases for the base image user

use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

const FALLBACK_LENGTH: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphraseSource {
    Wordlist,
    /// Word list unavailable; random alphanumeric string
    Random,
}

#[derive(Debug, Clone)]
pub struct Passphrase {
    pub value: String,
    pub source: PassphraseSource,
}

/// Fetches a plain-text word list, keeping alphanumeric words only
pub async fn fetch_wordlist(url: &str, timeout: Duration) -> Result<Vec<String>, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    Ok(body
        .lines()
        .map(str::trim)
        .filter(|w| !w.is_empty() && w.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
        .collect())
}

/// Samples `count` distinct words and concatenates them; `None` if the list is too short
pub fn sample_passphrase(words: &[String], count: usize) -> Option<String> {
    if count == 0 || words.len() < count {
        return None;
    }
    let mut rng = rand::thread_rng();
    Some(
        words
            .choose_multiple(&mut rng, count)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .concat(),
    )
}

pub fn random_passphrase(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Word-list passphrase, degrading to a random string when the list cannot be used
pub async fn generate_passphrase(url: &str, words: usize, timeout: Duration) -> Passphrase {
    match fetch_wordlist(url, timeout).await {
        Ok(list) => match sample_passphrase(&list, words) {
            Some(value) => {
                debug!(words, "Passphrase sampled from word list");
                return Passphrase {
                    value,
                    source: PassphraseSource::Wordlist,
                };
            }
            None => warn!(
                available = list.len(),
                requested = words,
                "Word list too short, using random passphrase"
            ),
        },
        Err(e) => warn!(url, error = %e, "Word list fetch failed, using random passphrase"),
    }

    Passphrase {
        value: random_passphrase(FALLBACK_LENGTH),
        source: PassphraseSource::Random,
    }
}
