use std::path::PathBuf;

/// Configuration for a block store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the backing file
    pub path: PathBuf,

    /// Maximum number of blocks held in the cache (default: 1024)
    pub cache_capacity: usize,

    /// Create the file if it does not exist (default: true)
    pub create: bool,

    /// Truncate an existing file on open (default: false)
    pub truncate: bool,

    /// Permission bits for a newly created file (default: 0o644, unix only)
    pub mode: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./postings.db"),
            cache_capacity: 1024,
            create: true,
            truncate: false,
            mode: 0o644,
        }
    }
}

impl StoreConfig {
    /// Create a new config for the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the block cache capacity, at least one block is always kept
    pub fn cache_capacity(mut self, blocks: usize) -> Self {
        self.cache_capacity = blocks.max(1);
        self
    }

    /// Create the backing file when missing
    pub fn create(mut self, enabled: bool) -> Self {
        self.create = enabled;
        self
    }

    /// Discard existing contents on open
    pub fn truncate(mut self, enabled: bool) -> Self {
        self.truncate = enabled;
        self
    }

    /// Set permission bits used when the file is created
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.path, PathBuf::from("./postings.db"));
        assert_eq!(config.cache_capacity, 1024);
        assert!(config.create);
        assert!(!config.truncate);
        assert_eq!(config.mode, 0o644);
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::new("/tmp/test.db")
            .cache_capacity(16)
            .create(false)
            .truncate(true)
            .mode(0o600);

        assert_eq!(config.path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.cache_capacity, 16);
        assert!(!config.create);
        assert!(config.truncate);
        assert_eq!(config.mode, 0o600);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let config = StoreConfig::new("/tmp/test.db").cache_capacity(0);
        assert_eq!(config.cache_capacity, 1);
    }
}
