//! Comic lookup against a curated index of science-themed xkcd strips.

use super::{MediaSource, http_client};
use crate::media::{MediaKind, MediaRequest, MediaResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};
use serde::Deserialize;
use std::{collections::BTreeSet, sync::Mutex, time::Duration};
use tracing::debug;

/// Keyword to comic numbers. A keyword matches when it is contained in the
/// lowercased query.
const COMIC_INDEX: &[(&str, &[u32])] = &[
    ("black hole", &[2135, 1758]),
    ("gravity", &[681, 2735, 852]),
    ("quantum", &[1240, 1861, 2735, 1591]),
    ("entanglement", &[1591]),
    ("physics", &[793, 669, 730, 1489]),
    ("space", &[1356, 1939, 2333, 1110]),
    ("astronomy", &[1758, 2360, 2014]),
    ("dna", &[1605, 2131]),
    ("gene", &[1605, 2131]),
    ("crispr", &[2131]),
    ("biology", &[2131, 1605, 1430]),
    ("evolution", &[1605, 2300]),
    ("climate", &[1732, 2500, 1321]),
    ("temperature", &[1732, 2500]),
    ("carbon", &[1732]),
    ("ocean", &[1321, 2561]),
    ("neural network", &[2173, 1838]),
    ("machine learning", &[2173, 1838, 1425]),
    ("ai", &[2173, 1838, 948]),
    ("computer", &[2173, 1838, 378]),
    ("math", &[55, 435, 2042, 687]),
    ("statistics", &[2400, 552, 882]),
    ("chemistry", &[2561, 435]),
    ("rocket", &[1356, 2333]),
    ("planet", &[2360, 1071]),
    ("star", &[2360, 1758, 1071]),
    ("dark matter", &[2135]),
    ("dark energy", &[2135]),
    ("cosmology", &[2135, 2360]),
    ("neutrino", &[2360]),
    ("particle", &[2360, 793]),
    ("energy", &[1732, 2500, 1321]),
    ("robot", &[2128, 948]),
    ("virus", &[2287, 2355]),
    ("vaccine", &[2515]),
    ("brain", &[2173, 1838]),
    ("universe", &[2135, 482, 1071]),
];

/// Science domains: cue words that place a query in the domain, and the index
/// keywords whose comics belong to it.
const DOMAINS: &[(&[&str], &[&str])] = &[
    (
        &["relativ", "astro", "galax", "cosm", "photon", "electron", "atom", "nuclear", "orbit", "light"],
        &["black hole", "gravity", "quantum", "physics", "space", "astronomy", "planet", "star", "universe"],
    ),
    (
        &["cell", "protein", "genom", "bacteri", "organism", "species", "neuro", "immun", "medic"],
        &["dna", "gene", "biology", "evolution", "virus", "vaccine", "brain"],
    ),
    (
        &["weather", "warming", "glacier", "emission", "atmospher", "greenhouse"],
        &["climate", "temperature", "carbon", "ocean"],
    ),
    (
        &["algorithm", "software", "program", "data", "learning", "intelligen"],
        &["neural network", "machine learning", "computer", "robot"],
    ),
    (
        &["equation", "probab", "geometr", "calcul", "molecul", "reaction", "element"],
        &["math", "statistics", "chemistry"],
    ),
];

pub struct XkcdSource {
    http: reqwest::Client,
    rng: Mutex<StdRng>,
}

impl XkcdSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_rng(timeout, StdRng::from_os_rng())
    }

    pub fn with_rng(timeout: Duration, rng: StdRng) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout, None)?,
            rng: Mutex::new(rng),
        })
    }

    fn pick(&self, candidates: &[u32]) -> Option<u32> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        candidates.choose(&mut *rng).copied()
    }
}

#[async_trait]
impl MediaSource for XkcdSource {
    fn kind(&self) -> MediaKind {
        MediaKind::Xkcd
    }

    fn available(&self) -> bool {
        true
    }

    async fn fetch(&self, request: &MediaRequest) -> Result<Option<MediaResult>> {
        let candidates = candidate_comics(&request.query);
        let Some(num) = self.pick(&candidates) else {
            debug!(query = %request.query, "No xkcd comic matches query");
            return Ok(None);
        };
        let comic: Comic = self
            .http
            .get(format!("https://xkcd.com/{num}/info.0.json"))
            .send()
            .await
            .with_context(|| format!("xkcd request for #{num} failed"))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("failed to parse xkcd #{num}"))?;
        Ok(Some(comic.into_result()))
    }
}

/// Comics whose keyword occurs in the query, else every comic of the query's
/// science domain. Sorted and free of duplicates.
fn candidate_comics(query: &str) -> Vec<u32> {
    let query = query.to_lowercase();
    let direct = comics_for(COMIC_INDEX.iter().filter(|(kw, _)| query.contains(*kw)).map(|(kw, _)| *kw));
    if !direct.is_empty() {
        return direct;
    }
    DOMAINS
        .iter()
        .find(|(cues, _)| cues.iter().any(|cue| query.contains(cue)))
        .map(|(_, keywords)| comics_for(keywords.iter().copied()))
        .unwrap_or_default()
}

fn comics_for<'a>(keywords: impl Iterator<Item = &'a str>) -> Vec<u32> {
    let mut comics = BTreeSet::new();
    for keyword in keywords {
        if let Some((_, nums)) = COMIC_INDEX.iter().find(|(kw, _)| *kw == keyword) {
            comics.extend(nums.iter().copied());
        }
    }
    comics.into_iter().collect()
}

#[derive(Debug, Deserialize)]
struct Comic {
    num: u32,
    #[serde(default)]
    title: String,
    img: String,
    #[serde(default)]
    alt: String,
}

impl Comic {
    fn into_result(self) -> MediaResult {
        MediaResult::new(
            self.img,
            "xkcd",
            format!("xkcd #{}: {}", self.num, self.title),
        )
        .with_extra("alt_text", self.alt)
        .with_extra("title", self.title)
    }
}
