use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};

use super::{FetchOutcome, SourceConnector};
use crate::error::Result;
use crate::models::{FetchStatus, Mention, SourceConfig};

/// (name, source type, reach multiplier in thousands)
const SOURCE_CATALOGUE: &[(&str, &str, u64)] = &[
    ("TechCrunch", "Technology", 50),
    ("The Verge", "Technology", 40),
    ("Hacker News", "Technology", 20),
    ("Twitter/X", "Social", 5),
    ("LinkedIn", "Social", 10),
    ("Reddit", "Forum", 8),
    ("PR Newswire", "PR", 30),
    ("Trustpilot", "Reviews", 3),
];

const AUTHORS: &[&str] = &[
    "alex_dev",
    "Maria Chen",
    "techwatcher",
    "J. Okafor",
    "product_hunter",
    "Sam Rivera",
    "cloudops_lee",
    "Priya N.",
];

const POSITIVE_TEMPLATES: &[&str] = &[
    "Just switched our team to {keyword} and the onboarding was seamless. Highly recommend it!",
    "The latest {keyword} release is excellent, the new dashboard is intuitive and fast.",
    "Impressed by how helpful the {keyword} support team was today. Great experience overall.",
    "{keyword} keeps getting better. Love the new integration features in this update.",
];

const NEGATIVE_TEMPLATES: &[&str] = &[
    "The new {keyword} update broke our workflow and support has been unresponsive for days.",
    "Really disappointed with {keyword} lately, constant crashes and slow page loads.",
    "{keyword} pricing is overpriced for what you get, and the billing issue is still not fixed.",
    "Reports of a data breach involving {keyword} customer accounts are circulating this morning.",
];

const NEUTRAL_TEMPLATES: &[&str] = &[
    "{keyword} announced a new regional office and plans to expand its engineering team.",
    "Comparing {keyword} with two alternatives for our Q3 tooling review, notes to follow.",
    "{keyword} published its quarterly product roadmap on the company blog this week.",
    "Attending a webinar about {keyword} deployment options this afternoon.",
];

const MIXED_TEMPLATES: &[&str] = &[
    "{keyword} has great features but the mobile app is still slow on older phones.",
    "Love the {keyword} design refresh, though the new pricing tiers are a problem for small teams.",
    "{keyword} support was helpful in the end, but the outage this week was frustrating.",
    "The {keyword} API is excellent, documentation less so and we hit a bug in the SDK.",
];

const TEMPLATE_POOLS: [&[&str]; 4] = [
    POSITIVE_TEMPLATES,
    NEGATIVE_TEMPLATES,
    NEUTRAL_TEMPLATES,
    MIXED_TEMPLATES,
];

/// Deterministic demo source: the same seed always yields the same batch.
pub struct SyntheticGenerator {
    seed: AtomicU64,
}

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self::with_seed(Utc::now().timestamp().unsigned_abs())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: AtomicU64::new(seed),
        }
    }

    /// Produce `count` mentions for `keywords` from a fixed seed.
    pub fn generate(&self, seed: u64, keywords: &[String], count: usize) -> Vec<Mention> {
        let keywords: Vec<&str> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Vec::new();
        }

        let now = Utc::now();
        (0..count)
            .map(|i| {
                let roll = |salt: &str| pseudo_random(seed, i, salt);

                let keyword = keywords[(roll("keyword") % keywords.len() as u64) as usize];
                let pool = TEMPLATE_POOLS[(roll("pool") % TEMPLATE_POOLS.len() as u64) as usize];
                let template = pool[(roll("template") % pool.len() as u64) as usize];
                let (source, source_type, multiplier) =
                    SOURCE_CATALOGUE[(roll("source") % SOURCE_CATALOGUE.len() as u64) as usize];
                let author = AUTHORS[(roll("author") % AUTHORS.len() as u64) as usize];

                let reach = multiplier * (500 + roll("reach") % 1_000);
                let minutes_ago = (roll("age") % (24 * 60)) as i64;
                let id = format!("synthetic:{seed}:{i}");

                Mention::new(&id, template.replace("{keyword}", keyword), source, source_type)
                    .with_author(author)
                    .with_url(format!(
                        "https://example.com/{}/{seed}-{i}",
                        super::text::slug(source)
                    ))
                    .with_reach(reach)
                    .published_at(now - Duration::minutes(minutes_ago))
            })
            .collect()
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn pseudo_random(seed: u64, index: usize, salt: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update((index as u64).to_le_bytes());
    hasher.update(salt.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[async_trait]
impl SourceConnector for SyntheticGenerator {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn fetch(&self, config: &SourceConfig) -> Result<FetchOutcome> {
        let seed = self.seed.fetch_add(1, Ordering::SeqCst);
        let mentions = self.generate(seed, &config.keywords, config.synthetic_count);
        tracing::debug!(seed, count = mentions.len(), "Generated synthetic mentions");

        let status = FetchStatus::ok("Synthetic generator", mentions.len());
        Ok(FetchOutcome::new(mentions, vec![status]))
    }
}
