use crate::auth::password::hash_password;
use crate::config::Config;
use crate::error::is_constraint_violation;
use crate::model::role::Role;
use crate::utils::email_registry;
use anyhow::{Context, anyhow};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::{info, warn};

pub async fn init_db(database_url: &str) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Credentials for the admin account created on first start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

impl SeedAdmin {
    /// `None` when no password is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let password = config.seed_admin_password.clone()?;
        let email = email_registry::normalize(&config.seed_admin_email);
        if email.is_empty() {
            return None;
        }
        let full_name = match config.seed_admin_name.trim() {
            "" => "Dew Admin".to_string(),
            name => name.to_string(),
        };
        Some(Self {
            email,
            full_name,
            password,
        })
    }
}

/// Creates the seed admin unless some admin already exists. Safe to run on
/// every start and from several instances at once.
pub async fn ensure_seeded_admin(pool: &MySqlPool, config: &Config) -> anyhow::Result<()> {
    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE role = ?")
        .bind(Role::DewAdmin.as_ref())
        .fetch_one(pool)
        .await
        .context("Failed to count admin accounts")?;
    if admins > 0 {
        return Ok(());
    }

    let Some(seed) = SeedAdmin::from_config(config) else {
        warn!("No admin account exists and SEED_ADMIN_PASSWORD is not set; skipping admin seed");
        return Ok(());
    };

    let password_hash = hash_password(&seed.password)
        .map_err(|e| anyhow!("Failed to hash seed admin password: {e}"))?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO employees (full_name, email, password_hash, role, client_id, is_active)
        VALUES (?, ?, ?, ?, NULL, TRUE)
        "#,
    )
    .bind(&seed.full_name)
    .bind(&seed.email)
    .bind(&password_hash)
    .bind(Role::DewAdmin.as_ref())
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => {
            email_registry::mark_taken(&seed.email).await;
            info!(email = %seed.email, "Seeded admin account; change its password after first login");
            Ok(())
        }
        Err(e) if is_constraint_violation(&e) => {
            warn!(email = %seed.email, "Seed admin email already registered; leaving it unchanged");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to create seed admin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_needs_a_password() {
        let config = Config::for_secret("s");
        assert_eq!(SeedAdmin::from_config(&config), None);
    }

    #[test]
    fn seed_credentials_come_from_config() {
        let mut config = Config::for_secret("s");
        config.seed_admin_email = "  Boss@Example.COM ".into();
        config.seed_admin_name = "  ".into();
        config.seed_admin_password = Some("s3cret-pass".into());

        let seed = SeedAdmin::from_config(&config).unwrap();
        assert_eq!(seed.email, "boss@example.com");
        assert_eq!(seed.full_name, "Dew Admin");
        assert_eq!(seed.password, "s3cret-pass");
    }

    #[test]
    fn blank_seed_email_disables_seeding() {
        let mut config = Config::for_secret("s");
        config.seed_admin_email = " ".into();
        config.seed_admin_password = Some("pw".into());
        assert_eq!(SeedAdmin::from_config(&config), None);
    }
}
