use crate::registry::CodeRange;
use crate::size_limit::SizeLimit;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_WORKERS: usize = 10;
const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Settings for a portdrop server.
///
/// Start from [`Config::default`] or [`Config::from_env`] and adjust with
/// the builder methods.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) addr: SocketAddr,
    pub(crate) upload_dir: PathBuf,
    pub(crate) workers: usize,
    pub(crate) exchange_host: IpAddr,
    pub(crate) codes: CodeRange,
    pub(crate) listen_timeout: Option<Duration>,
    pub(crate) limits: SizeLimit,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Reads the configuration from `PORTDROP_*` environment variables,
    /// falling back to the defaults for unset ones.
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `PORTDROP_ADDR` | HTTP listen address, `0.0.0.0:8080` |
    /// | `PORTDROP_UPLOAD_DIR` | where uploads are stored |
    /// | `PORTDROP_WORKERS` | runtime worker threads, `10` |
    /// | `PORTDROP_EXCHANGE_HOST` | address exchange listeners bind, `127.0.0.1` |
    /// | `PORTDROP_CODE_RANGE` | `start-end`, `49152-65535` |
    /// | `PORTDROP_LISTEN_TIMEOUT_SECS` | listener lifetime, `600`; `0` waits forever |
    /// | `PORTDROP_MAX_CONTENT_SIZE` | upload size cap in bytes |
    pub fn from_env() -> crate::Result<Config> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> crate::Result<Config>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(addr) = parsed(&lookup, "PORTDROP_ADDR")? {
            config.addr = addr;
        }
        if let Some(dir) = lookup("PORTDROP_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(workers) = parsed::<usize, _>(&lookup, "PORTDROP_WORKERS")? {
            if workers == 0 {
                return Err(crate::Error::InvalidConfig {
                    key: "PORTDROP_WORKERS",
                    value: workers.to_string(),
                });
            }
            config.workers = workers;
        }
        if let Some(host) = parsed(&lookup, "PORTDROP_EXCHANGE_HOST")? {
            config.exchange_host = host;
        }
        if let Some(range) = lookup("PORTDROP_CODE_RANGE") {
            config.codes = parse_code_range(&range).ok_or(crate::Error::InvalidConfig {
                key: "PORTDROP_CODE_RANGE",
                value: range,
            })?;
        }
        if let Some(secs) = parsed::<u64, _>(&lookup, "PORTDROP_LISTEN_TIMEOUT_SECS")? {
            config.listen_timeout = Some(secs).filter(|secs| *secs > 0).map(Duration::from_secs);
        }
        if let Some(limit) = parsed(&lookup, "PORTDROP_MAX_CONTENT_SIZE")? {
            config.limits = config.limits.content(limit);
        }

        Ok(config)
    }

    pub fn addr(mut self, addr: SocketAddr) -> Config {
        self.addr = addr;
        self
    }

    pub fn upload_dir<P: Into<PathBuf>>(mut self, dir: P) -> Config {
        self.upload_dir = dir.into();
        self
    }

    /// Sets the number of runtime worker threads; at least one is used.
    pub fn workers(mut self, workers: usize) -> Config {
        self.workers = workers.max(1);
        self
    }

    pub fn exchange_host(mut self, host: IpAddr) -> Config {
        self.exchange_host = host;
        self
    }

    pub fn codes(mut self, codes: CodeRange) -> Config {
        self.codes = codes;
        self
    }

    /// Sets how long an exchange listener waits for its peer. `None` waits
    /// forever.
    pub fn listen_timeout(mut self, timeout: Option<Duration>) -> Config {
        self.listen_timeout = timeout;
        self
    }

    pub fn limits(mut self, limits: SizeLimit) -> Config {
        self.limits = limits;
        self
    }

    pub fn get_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn get_upload_dir(&self) -> &PathBuf {
        &self.upload_dir
    }

    pub fn get_workers(&self) -> usize {
        self.workers
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            upload_dir: std::env::temp_dir().join("portdrop-uploads"),
            workers: DEFAULT_WORKERS,
            exchange_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            codes: CodeRange::default(),
            listen_timeout: Some(DEFAULT_LISTEN_TIMEOUT),
            limits: SizeLimit::default(),
        }
    }
}

fn parsed<T, F>(lookup: &F, key: &'static str) -> crate::Result<Option<T>>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| crate::Error::InvalidConfig { key, value }),
        None => Ok(None),
    }
}

fn parse_code_range(value: &str) -> Option<CodeRange> {
    let (start, end) = value.split_once('-')?;
    Some(CodeRange::new(start.trim().parse().ok()?, end.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&'static str, &str)]) -> crate::Result<Config> {
        let vars: HashMap<&'static str, String> = pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();

        assert_eq!(config.get_addr(), "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.get_workers(), 10);
        assert_eq!(config.codes, CodeRange::new(49152, 65535));
        assert_eq!(config.listen_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.limits, SizeLimit::default());
    }

    #[test]
    fn test_from_vars() {
        let config = from_pairs(&[
            ("PORTDROP_ADDR", "127.0.0.1:9000"),
            ("PORTDROP_UPLOAD_DIR", "/var/tmp/drops"),
            ("PORTDROP_WORKERS", "4"),
            ("PORTDROP_CODE_RANGE", "50000 - 50100"),
            ("PORTDROP_LISTEN_TIMEOUT_SECS", "0"),
            ("PORTDROP_MAX_CONTENT_SIZE", "1024"),
        ])
        .unwrap();

        assert_eq!(config.get_addr(), "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.get_upload_dir(), &PathBuf::from("/var/tmp/drops"));
        assert_eq!(config.get_workers(), 4);
        assert_eq!(config.codes, CodeRange::new(50000, 50100));
        assert_eq!(config.listen_timeout, None);
        assert_eq!(config.limits.content_limit(), 1024);
    }

    #[test]
    fn test_invalid_vars() {
        let err = from_pairs(&[("PORTDROP_WORKERS", "many")]).unwrap_err();
        assert_eq!(
            err,
            crate::Error::InvalidConfig {
                key: "PORTDROP_WORKERS",
                value: "many".to_owned()
            }
        );

        let err = from_pairs(&[("PORTDROP_WORKERS", "0")]).unwrap_err();
        assert_eq!(
            err,
            crate::Error::InvalidConfig {
                key: "PORTDROP_WORKERS",
                value: "0".to_owned()
            }
        );
        assert_eq!(Config::new().workers(0).get_workers(), 1);

        assert!(from_pairs(&[("PORTDROP_CODE_RANGE", "50000")]).is_err());
        assert!(from_pairs(&[("PORTDROP_CODE_RANGE", "1-70000")]).is_err());
    }
}
