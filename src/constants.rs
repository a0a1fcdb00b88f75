//! Common constants used throughout fsbuild.

/// Project descriptor file name, searched for in the working directory and its ancestors
pub const PROJECT_FILE: &str = "farmsim.yml";

/// Build configuration file name, one optional file per directory layer
pub const CONFIG_FILE: &str = ".fsbuild.yml";

/// Manifest descriptor consumed by the game
pub const MOD_DESC_FILE: &str = "modDesc.xml";

/// Directory holding `translation_<lang>.xml` files
pub const TRANSLATIONS_DIR: &str = "translations";

/// Icon used when the project does not name one
pub const DEFAULT_ICON: &str = "icon.dds";

/// Manifest descriptor format written into every build
pub const MOD_DESC_VERSION: &str = "40";

/// Version written when the project does not declare one
pub const DEFAULT_MOD_VERSION: &str = "0.0.0.0";

/// Prefix of the per-build scratch directory inside the project directory
pub const SCRATCH_PREFIX: &str = ".fsbuild-";

/// Subdirectory of the game user folder where mods are installed
pub const MODS_DIR: &str = "mods";
