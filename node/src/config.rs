//! Node configuration: defaults, optional config file, `PROOFPOT_*`
//! environment variables, then command-line overrides.

use anyhow::{anyhow, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use config::{Config, File as ConfigFile};
use proofpot_registry::{AccessPolicy, CreatorSource, RegistryConfig};
use proofpot_types::Identity;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 8080;
const DEFAULT_EVENT_LOG_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sled,
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "sled" => Ok(StorageBackend::Sled),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!("unknown storage backend '{other}' (expected sled or memory)")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            StorageBackend::Sled => "sled",
            StorageBackend::Memory => "memory",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub node_id: String,
    pub data_dir: PathBuf,
    pub storage: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub log_level: String,
    pub log_format: String,
    pub access_mode: String,
    pub administrator: Option<String>,
    pub creator_source: Option<String>,
    pub mint_delay_ms: u64,
    pub event_log_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "proofpot-node".to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            storage: "sled".to_string(),
            rpc_host: DEFAULT_RPC_HOST.to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            access_mode: "owner_gated".to_string(),
            administrator: None,
            creator_source: None,
            mint_delay_ms: 0,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
        }
    }
}

impl NodeConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            let path = PathBuf::from(path);
            if !path.exists() {
                anyhow::bail!(
                    "Configuration file {} not found (specified via --config)",
                    path.display()
                );
            }
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }

        builder = builder.add_source(config::Environment::with_prefix("PROOFPOT"));

        Self::from_config(&builder.build()?)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            node_id: get_string_value(config, "node_id").unwrap_or(defaults.node_id),
            data_dir: get_string_value(config, "data_dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            storage: get_string_value(config, "storage").unwrap_or(defaults.storage),
            rpc_host: get_string_value(config, "rpc_host").unwrap_or(defaults.rpc_host),
            rpc_port: get_parsed_value(config, "rpc_port")?.unwrap_or(defaults.rpc_port),
            log_level: get_string_value(config, "log_level").unwrap_or(defaults.log_level),
            log_format: get_string_value(config, "log_format").unwrap_or(defaults.log_format),
            access_mode: get_string_value(config, "access_mode").unwrap_or(defaults.access_mode),
            administrator: get_string_value(config, "administrator"),
            creator_source: get_string_value(config, "creator_source"),
            mint_delay_ms: get_parsed_value(config, "mint_delay_ms")?
                .unwrap_or(defaults.mint_delay_ms),
            event_log_capacity: get_parsed_value(config, "event_log_capacity")?
                .unwrap_or(defaults.event_log_capacity),
        })
    }

    /// Command-line values win over file and environment.
    pub fn apply_overrides(&mut self, matches: &ArgMatches) {
        if let Some(dir) = matches.get_one::<String>("data-dir") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(storage) = matches.get_one::<String>("storage") {
            self.storage = storage.clone();
        }
        if let Some(host) = matches.get_one::<String>("rpc-host") {
            self.rpc_host = host.clone();
        }
        if let Some(port) = matches.get_one::<u16>("rpc-port") {
            self.rpc_port = *port;
        }
        if let Some(level) = matches.get_one::<String>("log-level") {
            self.log_level = level.clone();
        }
        if let Some(format) = matches.get_one::<String>("log-format") {
            self.log_format = format.clone();
        }
        if let Some(mode) = matches.get_one::<String>("access-mode") {
            self.access_mode = mode.clone();
        }
        if let Some(admin) = matches.get_one::<String>("administrator") {
            self.administrator = Some(admin.clone());
        }
        if let Some(source) = matches.get_one::<String>("creator-source") {
            self.creator_source = Some(source.clone());
        }
        if let Some(delay) = matches.get_one::<u64>("mint-delay-ms") {
            self.mint_delay_ms = *delay;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            anyhow::bail!("node_id must not be empty");
        }
        if self.rpc_port == 0 {
            anyhow::bail!("rpc_port must be greater than zero");
        }
        if self.event_log_capacity == 0 {
            anyhow::bail!("event_log_capacity must be greater than zero");
        }
        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            anyhow::bail!("log_format must be 'pretty' or 'json', got '{}'", self.log_format);
        }
        if self.storage_backend()? == StorageBackend::Sled
            && self.data_dir.as_os_str().is_empty()
        {
            anyhow::bail!("data_dir must not be empty when using sled storage");
        }
        self.registry_config()?;
        Ok(())
    }

    pub fn storage_backend(&self) -> Result<StorageBackend> {
        StorageBackend::parse(&self.storage)
    }

    pub fn access_policy(&self) -> Result<AccessPolicy> {
        match self.access_mode.trim().to_lowercase().as_str() {
            "owner_gated" => {
                let raw = self.administrator.as_deref().ok_or_else(|| {
                    anyhow!("access_mode 'owner_gated' requires an administrator address")
                })?;
                let administrator = Identity::from_hex(raw)
                    .map_err(|err| anyhow!("invalid administrator address '{raw}': {err}"))?;
                AccessPolicy::owner_gated(administrator).map_err(|err| anyhow!("{err}"))
            }
            "open" => Ok(AccessPolicy::Open),
            other => Err(anyhow!(
                "unknown access_mode '{other}' (expected owner_gated or open)"
            )),
        }
    }

    pub fn registry_config(&self) -> Result<RegistryConfig> {
        let config = RegistryConfig::new(self.access_policy()?);
        match self.creator_source.as_deref() {
            Some(raw) => {
                let source: CreatorSource = raw.parse().map_err(|err: String| anyhow!(err))?;
                Ok(config.with_creator_source(source))
            }
            None => Ok(config),
        }
    }

    pub fn mint_delay(&self) -> Duration {
        Duration::from_millis(self.mint_delay_ms)
    }

    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_host, self.rpc_port)
    }
}

fn get_string_value(config: &Config, key: &str) -> Option<String> {
    config
        .get_string(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn get_parsed_value<T>(config: &Config, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    get_string_value(config, key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|err| anyhow!("invalid value '{raw}' for {key}: {err}"))
        })
        .transpose()
}

pub fn command() -> Command {
    Command::new("proofpot-node")
        .about("ProofPot recipe provenance node")
        .disable_version_flag(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .value_name("DIR")
                .help("Data directory for the sled store"),
        )
        .arg(
            Arg::new("storage")
                .long("storage")
                .value_name("BACKEND")
                .value_parser(["sled", "memory"])
                .help("Storage backend"),
        )
        .arg(
            Arg::new("rpc-host")
                .long("rpc-host")
                .value_name("HOST")
                .help("Override HTTP bind host"),
        )
        .arg(
            Arg::new("rpc-port")
                .long("rpc-port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("Override HTTP bind port"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .help("Override the log level"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .value_parser(["pretty", "json"])
                .help("Select log output format"),
        )
        .arg(
            Arg::new("access-mode")
                .long("access-mode")
                .value_name("MODE")
                .value_parser(["owner_gated", "open"])
                .help("Who may register content hashes"),
        )
        .arg(
            Arg::new("administrator")
                .long("administrator")
                .value_name("ADDRESS")
                .help("Registry administrator address (owner_gated mode)"),
        )
        .arg(
            Arg::new("creator-source")
                .long("creator-source")
                .value_name("SOURCE")
                .value_parser(["explicit", "caller"])
                .help("Whether registrations name the creator or use the caller"),
        )
        .arg(
            Arg::new("mint-delay-ms")
                .long("mint-delay-ms")
                .value_name("MILLIS")
                .value_parser(value_parser!(u64))
                .help("Simulated confirmation delay for mints and transfers"),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .action(ArgAction::SetTrue)
                .help("Validate configuration, then exit"),
        )
        .arg(
            Arg::new("version_flag")
                .short('V')
                .long("version")
                .action(ArgAction::SetTrue)
                .help("Print version information and exit"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const ADMIN: &str = "0x1111111111111111111111111111111111111111";

    fn from_toml(toml: &str) -> Result<NodeConfig> {
        let config = Config::builder()
            .add_source(ConfigFile::from_str(toml, FileFormat::Toml))
            .build()?;
        NodeConfig::from_config(&config)
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = from_toml("").unwrap();
        assert_eq!(config.rpc_port, DEFAULT_RPC_PORT);
        assert_eq!(config.storage_backend().unwrap(), StorageBackend::Sled);
        assert_eq!(config.event_log_capacity, DEFAULT_EVENT_LOG_CAPACITY);
        assert_eq!(config.mint_delay(), Duration::ZERO);
        // Owner-gated is the default and needs an administrator.
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_values_are_read() {
        let config = from_toml(&format!(
            r#"
            storage = "memory"
            rpc_port = 9191
            administrator = "{ADMIN}"
            mint_delay_ms = 250
            log_format = "json"
            "#
        ))
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.storage_backend().unwrap(), StorageBackend::Memory);
        assert_eq!(config.rpc_addr(), "127.0.0.1:9191");
        assert_eq!(config.mint_delay(), Duration::from_millis(250));

        let registry = config.registry_config().unwrap();
        assert_eq!(
            registry.policy.administrator(),
            Some(Identity::from_hex(ADMIN).unwrap())
        );
        assert_eq!(registry.creator_source, None);
        assert_eq!(registry.effective_creator_source(), CreatorSource::Explicit);
    }

    #[test]
    fn open_mode_defaults_to_caller_creator_source() {
        let config = from_toml("access_mode = \"open\"").unwrap();
        config.validate().unwrap();
        let registry = config.registry_config().unwrap();
        assert_eq!(registry.policy, AccessPolicy::Open);
        assert_eq!(registry.effective_creator_source(), CreatorSource::Caller);

        let explicit = from_toml("access_mode = \"open\"\ncreator_source = \"explicit\"").unwrap();
        assert_eq!(
            explicit.registry_config().unwrap().creator_source,
            Some(CreatorSource::Explicit)
        );
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = from_toml("access_mode = \"open\"").unwrap();
        config.rpc_port = 0;
        assert!(config.validate().is_err());

        for toml in [
            "access_mode = \"public\"",
            "access_mode = \"open\"\nstorage = \"postgres\"",
            "access_mode = \"open\"\ncreator_source = \"anyone\"",
            "access_mode = \"open\"\nlog_format = \"xml\"",
            "access_mode = \"open\"\nevent_log_capacity = 0",
            "administrator = \"0x0000000000000000000000000000000000000000\"",
            "administrator = \"not-an-address\"",
        ] {
            let config = from_toml(toml).unwrap();
            assert!(config.validate().is_err(), "accepted: {toml}");
        }

        assert!(from_toml("rpc_port = \"eighty\"").is_err());
    }

    #[test]
    fn command_line_overrides_win() {
        let mut config = from_toml("access_mode = \"open\"\nrpc_port = 9000").unwrap();
        let matches = command()
            .try_get_matches_from([
                "proofpot-node",
                "--rpc-port",
                "7000",
                "--storage",
                "memory",
                "--access-mode",
                "owner_gated",
                "--administrator",
                ADMIN,
            ])
            .unwrap();
        config.apply_overrides(&matches);

        assert_eq!(config.rpc_port, 7000);
        assert_eq!(config.storage_backend().unwrap(), StorageBackend::Memory);
        assert_eq!(
            config.access_policy().unwrap(),
            AccessPolicy::owner_gated(Identity::from_hex(ADMIN).unwrap()).unwrap()
        );
    }

    #[test]
    fn creator_source_and_mint_delay_can_be_overridden() {
        let mut config =
            from_toml("access_mode = \"open\"\ncreator_source = \"caller\"\nmint_delay_ms = 10")
                .unwrap();
        let matches = command()
            .try_get_matches_from([
                "proofpot-node",
                "--creator-source",
                "explicit",
                "--mint-delay-ms",
                "1500",
            ])
            .unwrap();
        config.apply_overrides(&matches);
        config.validate().unwrap();

        assert_eq!(config.mint_delay(), Duration::from_millis(1500));
        assert_eq!(
            config.registry_config().unwrap().creator_source,
            Some(CreatorSource::Explicit)
        );

        assert!(command()
            .try_get_matches_from(["proofpot-node", "--creator-source", "anyone"])
            .is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(NodeConfig::load(path.to_str()).is_err());
    }
}
