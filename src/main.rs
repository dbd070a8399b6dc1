use color_eyre::eyre::Result;
use dotenv::dotenv;

use calbook_api::config::ApiConfig;
use calbook_db::{
    create_pool,
    schema::{initialize_database, seed_categories},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env()?;

    // Create database connection pool
    let db_pool = create_pool(&config.database_url).await?;

    // Initialize database schema and the fixed category registry
    initialize_database(&db_pool).await?;
    seed_categories(&db_pool).await?;

    // Start API server
    calbook_api::start_server(config, db_pool).await?;

    Ok(())
}
