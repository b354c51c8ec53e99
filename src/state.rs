use crate::services::pdf::PdfRenderer;
use crate::templates::TemplateRegistry;
use sqlx::PgPool;
use std::sync::Arc;

pub struct AppState {
    pub pool: PgPool,
    pub renderer: Arc<dyn PdfRenderer>,
    pub templates: TemplateRegistry,
    pub signing_key: Vec<u8>,
    pub verify_base_url: String,
}

pub type SharedState = Arc<AppState>;
