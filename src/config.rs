// src/config.rs

use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::db_utils::TxTimeouts,
    db::SequenceRepository,
    services::{DocumentNumberingService, PdfService, SimulatedTaxAuthority, TaxDocumentService},
};

/// Configuração lida das variáveis de ambiente (`.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub tx_timeouts: TxTimeouts,
    pub fonts_dir: PathBuf,
    pub pdf_font_family: String,
    pub company_name: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        Ok(Self {
            database_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_var("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            tx_timeouts: TxTimeouts {
                lock_timeout: Duration::from_millis(parse_var("LOCK_TIMEOUT_MS", 5_000)?),
                statement_timeout: Duration::from_millis(parse_var("STATEMENT_TIMEOUT_MS", 15_000)?),
            },
            fonts_dir: env::var("FONTS_DIR").unwrap_or_else(|_| "./fonts".to_string()).into(),
            pdf_font_family: env::var("PDF_FONT_FAMILY").unwrap_or_else(|_| "Roboto".to_string()),
            company_name: env::var("COMPANY_NAME").ok().filter(|s| !s.trim().is_empty()),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub tax_document_service: TaxDocumentService,
    pub pdf_service: PdfService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, config))
    }

    /// Monta o gráfico de dependências sobre um pool já criado.
    pub fn from_pool(db_pool: PgPool, config: &Config) -> Self {
        let numbering = DocumentNumberingService::new(SequenceRepository::new());
        let tax_document_service = TaxDocumentService::new(
            db_pool.clone(),
            numbering,
            Arc::new(SimulatedTaxAuthority),
            config.tx_timeouts,
        );
        let pdf_service = PdfService::new(
            config.fonts_dir.clone(),
            config.pdf_font_family.clone(),
            config.company_name.clone(),
        );

        Self {
            db_pool,
            tax_document_service,
            pdf_service,
        }
    }
}
