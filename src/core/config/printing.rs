use crate::core::config::data::{path_display, Config};
use crate::core::config::defaults::{DEFAULT_BASE_URL, DEFAULT_MODEL};

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.model {
            Some(model) => println!("  model: {model}"),
            None => println!("  model: {DEFAULT_MODEL} (default)"),
        }
        match &self.base_url {
            Some(url) => println!("  base-url: {url}"),
            None => println!("  base-url: {DEFAULT_BASE_URL} (default)"),
        }
        match &self.characters_path {
            Some(path) => println!("  characters-path: {}", path_display(path)),
            None => println!("  characters-path: (bundled)"),
        }
        match (&self.data_dir, self.data_dir()) {
            (Some(path), _) => println!("  data-dir: {}", path_display(path)),
            (None, Some(path)) => println!("  data-dir: {} (default)", path_display(path)),
            (None, None) => println!("  data-dir: (unavailable)"),
        }
        match self.history_limit {
            Some(limit) => println!("  history-limit: {limit}"),
            None => println!("  history-limit: (unlimited)"),
        }
    }
}
