mod settings;

use agora_db::{Database, DbError};
use tracing::{info, warn};

use crate::settings::Settings;

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug,agora_db=debug".into()),
        )
        .init();

    let settings = Settings::from_env()?;

    // Init database
    let db = Database::open(&settings.db_path)?;
    if db.is_migration_needed()? {
        let version = db.schema_version()?;
        if version != 0 {
            anyhow::bail!(
                "store is at schema version {} but this build expects {}; upgrade is not supported",
                version,
                agora_db::MODEL_VERSION
            );
        }
        info!("Fresh store, creating schema");
        db.migrate()?;
    }

    if let Some(su) = &settings.superuser {
        match db.create_super_user(&su.username, &su.password) {
            Ok(_) => {}
            Err(DbError::AlreadyExists(_)) => {
                warn!("Super user {} already exists, leaving it untouched", su.username)
            }
            Err(e) => return Err(e.into()),
        }
    }

    // Settings are read once and handed to the request layer from here on.
    let config = db.load_config()?;
    info!("Forum settings: {}", serde_json::to_string(&config)?);
    info!(
        "{} ready: {} users, {} groups, {} topics, {} comments",
        config.forum_name,
        db.num_users()?,
        db.num_groups()?,
        db.num_topics()?,
        db.num_comments()?
    );

    Ok(())
}
