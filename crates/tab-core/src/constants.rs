//! Constantes del motor core.
//!
//! Valores estáticos que participan en el cálculo de fingerprints y en la
//! compatibilidad entre versiones del motor. `ENGINE_VERSION` forma parte del
//! input de hashing: un cambio de versión del engine invalida los checkpoints
//! aunque la definición y los datos no cambien.

/// Versión lógica del motor. Mantener estable mientras no haya cambios
/// incompatibles en el formato de snapshots o fingerprints.
pub const ENGINE_VERSION: &str = "1.0";

/// Nombre del archivo de registro del cache en disco (step_key -> registro).
pub const MANIFEST_FILE: &str = "manifest.json";

/// Extensión de los archivos de snapshot comprimidos.
pub const SNAPSHOT_EXT: &str = "snap.zst";
