use serde::{Deserialize, Serialize};

/// Summaries fetched per `load_more` batch unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub page_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Effective batch size; a zero in the config file would stall paging.
    pub fn page_size(&self) -> usize {
        self.page_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientConfig, DEFAULT_PAGE_SIZE};

    #[test]
    fn missing_page_size_uses_default() -> anyhow::Result<()> {
        let config: ClientConfig = serde_json::from_str("{}")?;
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        Ok(())
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let config = ClientConfig { page_size: 0 };
        assert_eq!(config.page_size(), 1);
    }
}
