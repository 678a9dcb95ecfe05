use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: Option<String>,
    pub registry_db_path: Option<String>,
    pub max_clusters: usize,
    pub cluster_similarity_threshold: Option<f32>,
    pub default_limit: usize,
    pub max_k: usize,
    pub simd_enabled: bool,
    pub parallel_scan: bool,
    pub parallel_scan_min: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            data_dir: std::env::var("DATA_DIR").ok(),
            registry_db_path: std::env::var("REGISTRY_DB_PATH").ok(),
            max_clusters: resolve_usize("--max-clusters", "MAX_CLUSTERS", 8),
            cluster_similarity_threshold: resolve_optional_f32(
                "--cluster-similarity-threshold",
                "CLUSTER_SIMILARITY_THRESHOLD",
            ),
            default_limit: resolve_usize("--default-limit", "DEFAULT_LIMIT", 10),
            max_k: resolve_usize("--max-k", "MAX_K", 256),
            simd_enabled: resolve_bool("--simd", "SIMD_ENABLED", true),
            parallel_scan: resolve_bool("--parallel-scan", "PARALLEL_SCAN", true),
            parallel_scan_min: resolve_usize("--parallel-scan-min", "PARALLEL_SCAN_MIN", 4096),
        })
    }

    /// Registry database location: explicit path wins, else it lives inside
    /// the data dir.
    pub fn registry_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.registry_db_path {
            return Some(PathBuf::from(path));
        }
        self.data_dir
            .as_ref()
            .map(|dir| PathBuf::from(dir).join("tier_index.db"))
    }

    pub fn partitions_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| PathBuf::from(dir).join("partitions"))
    }
}

// Helpers

fn cli_arg(flag: &str) -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

fn resolve_usize(flag: &str, env: &str, default: usize) -> usize {
    if let Some(val_str) = cli_arg(flag) {
        if let Ok(v) = val_str.parse::<usize>() {
            return v;
        }
    }
    if let Ok(val_str) = std::env::var(env) {
        if let Ok(v) = val_str.parse::<usize>() {
            return v;
        }
    }
    default
}

fn resolve_optional_f32(flag: &str, env: &str) -> Option<f32> {
    if let Some(val_str) = cli_arg(flag) {
        if let Ok(v) = val_str.parse::<f32>() {
            return Some(v);
        }
    }
    if let Ok(val_str) = std::env::var(env) {
        if let Ok(v) = val_str.parse::<f32>() {
            return Some(v);
        }
    }
    None
}

fn resolve_bool(flag: &str, env: &str, default: bool) -> bool {
    let parse = |raw: &str| match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    };
    if let Some(val_str) = cli_arg(flag) {
        if let Some(v) = parse(&val_str) {
            return v;
        }
    }
    if let Ok(val_str) = std::env::var(env) {
        if let Some(v) = parse(&val_str) {
            return v;
        }
    }
    default
}
