//! Per-provider usage counters, reported once at shutdown.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

#[derive(Debug)]
struct ProviderUsage {
    name: String,
    calls: AtomicU64,
    tokens: AtomicU64,
}

/// Counters for one process lifetime. Not persisted.
#[derive(Debug)]
pub struct UsageStats {
    providers: Vec<ProviderUsage>,
}

impl UsageStats {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            providers: names
                .into_iter()
                .map(|name| ProviderUsage {
                    name: name.into(),
                    calls: AtomicU64::new(0),
                    tokens: AtomicU64::new(0),
                })
                .collect(),
        }
    }

    /// Count one successful call, plus its tokens when the backend reported them.
    pub fn record(&self, provider: &str, total_tokens: Option<u64>) {
        let Some(usage) = self.providers.iter().find(|p| p.name == provider) else {
            debug!(provider, "Usage recorded for unknown provider");
            return;
        };
        usage.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(tokens) = total_tokens {
            usage.tokens.fetch_add(tokens, Ordering::Relaxed);
        }
    }

    pub fn calls(&self, provider: &str) -> u64 {
        self.providers
            .iter()
            .find(|p| p.name == provider)
            .map_or(0, |p| p.calls.load(Ordering::Relaxed))
    }

    pub fn total_tokens(&self) -> u64 {
        self.providers.iter().map(|p| p.tokens.load(Ordering::Relaxed)).sum()
    }

    pub fn report(&self) -> UsageReport {
        UsageReport {
            rows: self
                .providers
                .iter()
                .map(|p| (p.name.clone(), p.calls.load(Ordering::Relaxed)))
                .collect(),
            total_tokens: self.total_tokens(),
        }
    }
}

/// Snapshot of [`UsageStats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageReport {
    pub rows: Vec<(String, u64)>,
    pub total_tokens: u64,
}

impl UsageReport {
    /// Logs the [`Display`](fmt::Display) form, one record per line.
    pub fn log(&self) {
        for line in self.to_string().lines() {
            info!("{line}");
        }
    }
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===== Token usage =====")?;
        for (provider, calls) in &self.rows {
            writeln!(f, "{provider} calls: {calls}")?;
        }
        writeln!(f, "Total tokens (all providers): {}", self.total_tokens)?;
        write!(f, "=======================")
    }
}
