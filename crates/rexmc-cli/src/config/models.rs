use rexmc::engine::config::SamplingConfig;
use std::path::PathBuf;

pub struct AppConfig {
    pub model_path: PathBuf,
    pub stat_path: PathBuf,
    pub best_path: Option<PathBuf>,
    pub core_config: SamplingConfig,
}
