//! Fast email-availability checks for signup and employee creation.
//!
//! A cuckoo filter answers "definitely unused" without touching the
//! database; a moka cache answers "definitely taken" for recently seen
//! addresses. Anything else falls through to MySQL.

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;
use std::time::Duration;

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static EMAIL_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

static TAKEN_EMAILS: Lazy<Cache<String, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(86_400))
        .build()
});

#[inline]
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// False positives possible, false negatives not. A poisoned lock is
/// reported as "might exist" so the caller falls back to the database.
fn might_exist(email: &str) -> bool {
    match EMAIL_FILTER.read() {
        Ok(filter) => filter.contains(email),
        Err(_) => true,
    }
}

pub async fn mark_taken(email: &str) {
    let email = normalize(email);
    if let Ok(mut filter) = EMAIL_FILTER.write() {
        filter.add(&email);
    }
    TAKEN_EMAILS.insert(email, ()).await;
}

/// Called when an employee is deleted so the address can be reused.
pub async fn forget(email: &str) {
    let email = normalize(email);
    if let Ok(mut filter) = EMAIL_FILTER.write() {
        filter.remove(&email);
    }
    TAKEN_EMAILS.invalidate(&email).await;
}

/// `true` when nobody is registered under `email`.
pub async fn is_available(email: &str, pool: &MySqlPool) -> bool {
    let email = normalize(email);

    if !might_exist(&email) {
        return true;
    }

    if TAKEN_EMAILS.contains_key(&email) {
        return false;
    }

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE email = ?")
        .bind(&email)
        .fetch_one(pool)
        .await
        .map(|n| n > 0)
        .unwrap_or(true); // fail-safe: the unique index decides

    if exists {
        TAKEN_EMAILS.insert(email, ()).await;
    }
    !exists
}

/// Loads every registered email into the filter, streaming in batches.
pub async fn warmup(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT email FROM employees").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (email,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
        batch.push(normalize(&email));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch)?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch)?;
    }

    log::info!("Email filter warmup complete: {} employees", total);
    Ok(())
}

fn insert_batch(emails: &[String]) -> Result<()> {
    let mut filter = EMAIL_FILTER
        .write()
        .map_err(|_| anyhow!("email filter lock poisoned"))?;

    for email in emails {
        filter.add(email);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_ignores_case_and_padding() {
        assert_eq!(normalize("  Jane.Doe@Dew.COM "), "jane.doe@dew.com");
    }

    #[tokio::test]
    async fn marked_email_might_exist_until_forgotten() {
        let email = "registry-test@example.com";
        assert!(!might_exist(email));

        mark_taken("Registry-Test@Example.com").await;
        assert!(might_exist(email));
        assert!(TAKEN_EMAILS.contains_key(email));

        forget(email).await;
        assert!(!TAKEN_EMAILS.contains_key(email));
    }
}
