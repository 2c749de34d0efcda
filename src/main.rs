use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use splitbook::auth::PasswordScheme;
use splitbook::settings::{Settings, StoreBackend};
use splitbook::store::{MemoryStore, MongoStore, RecordStore};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "splitbook={level},actix_web={level}",
            level = settings.log_level
        ))
        .init();

    let store: Arc<dyn RecordStore> = match settings.store {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, records are lost on exit");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Mongo => {
            let uri = settings
                .mongo_uri
                .as_deref()
                .ok_or("MONGO_URI is required for the mongo store")?;
            match MongoStore::connect(uri, &settings.database).await {
                Ok(store) => {
                    tracing::info!("Connected to MongoDB");
                    Arc::new(store)
                }
                Err(err) => {
                    tracing::error!("MongoDB connection error: {err}");
                    return Err(err.into());
                }
            }
        }
    };

    let scheme = PasswordScheme::from_pepper(settings.password_pepper.clone());
    if scheme == PasswordScheme::Plaintext {
        tracing::warn!("PASSWORD_PEPPER not set, passwords are stored as given");
    }

    let store = web::Data::from(store);
    let scheme = web::Data::new(scheme);

    tracing::info!("Server running at http://{}:{}", settings.bind, settings.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(store.clone())
            .app_data(scheme.clone())
            .configure(splitbook::configure)
    })
    .bind((settings.bind.as_str(), settings.port))?
    .run()
    .await?;

    Ok(())
}
