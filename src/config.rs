use std::path::PathBuf;

use anyhow::Context;

use crate::tracking::DEFAULT_STUDENTS_PER_PAGE;

pub const STATE_DIR_VAR: &str = "GRADEBOOK_STATE_DIR";
pub const PER_PAGE_VAR: &str = "GRADEBOOK_STUDENTS_PER_PAGE";
const DEFAULT_STATE_DIR: &str = ".gradebook";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub state_dir: PathBuf,
    pub students_per_page: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let state_dir = lookup(STATE_DIR_VAR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));

        let students_per_page = match lookup(PER_PAGE_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| {
                    format!("{PER_PAGE_VAR} must be a positive integer, got {raw:?}")
                })?,
            None => DEFAULT_STUDENTS_PER_PAGE,
        };

        Ok(Self {
            state_dir,
            students_per_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.state_dir, PathBuf::from(".gradebook"));
        assert_eq!(config.students_per_page, 35);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            (STATE_DIR_VAR, "/tmp/rased"),
            (PER_PAGE_VAR, "20"),
        ]))
        .unwrap();
        assert_eq!(config.state_dir, PathBuf::from("/tmp/rased"));
        assert_eq!(config.students_per_page, 20);
    }

    #[test]
    fn invalid_page_size_is_rejected() {
        assert!(Config::from_lookup(lookup(&[(PER_PAGE_VAR, "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[(PER_PAGE_VAR, "many")])).is_err());
    }
}
