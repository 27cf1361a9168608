//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) y expone una estructura inmutable
//! (`CONFIG`). El modo de ejecución se guarda como string: el parseo (y el
//! fallo de configuración por modo inválido) ocurre donde se arma el
//! pipeline, que es donde puede reportarse bien.
use once_cell::sync::Lazy;
use std::env;

/// Configuración global de la aplicación.
pub struct AppConfig {
    /// Configuración del cache de checkpoints.
    pub cache: CacheConfig,
    /// Configuración de ejecución.
    pub execution: ExecutionConfig,
}

/// Parámetros del cache en disco.
pub struct CacheConfig {
    /// Directorio del backing store (manifest + snapshots).
    pub dir: String,
    /// Capacidad del plano LFU en memoria.
    pub capacity: usize,
}

/// Parámetros de ejecución del pipeline.
pub struct ExecutionConfig {
    /// "development" o "production".
    pub mode: String,
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    let dir = env::var("TABFLOW_CACHE_DIR").unwrap_or_else(|_| ".tabflow-cache".to_string());
    let capacity = env::var("TABFLOW_CACHE_CAPACITY").ok()
        .and_then(|v| v.parse().ok()).unwrap_or(16);
    let mode = env::var("TABFLOW_MODE").unwrap_or_else(|_| "production".to_string());
    AppConfig {
        cache: CacheConfig { dir, capacity },
        execution: ExecutionConfig { mode },
    }
});
