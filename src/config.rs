//! Application configuration from `EMS_PACK_*` environment variables.
//!
//! Every value has a default. Unparsable or out-of-range values are logged
//! with `warn!` and replaced by the default, so startup never fails on
//! configuration. `AppConfig::from_lookup` takes any variable source, which
//! keeps tests independent of the process environment.

use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{info, warn};

use crate::annealing::AnnealingConfig;
use crate::generator::GeneratorConfig;
use crate::packer::PackingConfig;
use crate::types::{Dimensions, Vec3};

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(env_string)
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api: ApiConfig::from_lookup(&lookup),
            engine: EngineConfig::from_lookup(&lookup),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "EMS_PACK_API_HOST";
    const PORT_VAR: &'static str = "EMS_PACK_API_PORT";

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let host_value = lookup(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match lookup(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "⚠️ {} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Defaults the API falls back to when a request leaves a field out.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    packing: PackingConfig,
    container: Dimensions,
    generator: GeneratorConfig,
    annealing: AnnealingConfig,
    seed: Option<u64>,
}

impl EngineConfig {
    const DEFAULT_CONTAINER: (f64, f64, f64) = (5870.0, 2330.0, 2200.0);

    const SUPPORT_RATIO_VAR: &'static str = "EMS_PACK_SUPPORT_RATIO";
    const CONTAINER_DIMS_VAR: &'static str = "EMS_PACK_CONTAINER_DIMS";
    const ITEM_COUNT_VAR: &'static str = "EMS_PACK_GENERATOR_ITEM_COUNT";
    const MIN_SIDE_VAR: &'static str = "EMS_PACK_GENERATOR_MIN_SIDE";
    const ITERATIONS_VAR: &'static str = "EMS_PACK_OPTIMIZER_ITERATIONS";
    const YIELD_BATCH_VAR: &'static str = "EMS_PACK_OPTIMIZER_YIELD_BATCH";
    const SEED_VAR: &'static str = "EMS_PACK_SEED";

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let support_ratio = load_f64_with_warning(
            lookup,
            Self::SUPPORT_RATIO_VAR,
            PackingConfig::DEFAULT_SUPPORT_RATIO,
            |value| (0.0..=1.0).contains(&value),
            "must be between 0 and 1",
            "Adjusted minimum support may lead to unstable stacks",
        );

        let container = match lookup(Self::CONTAINER_DIMS_VAR) {
            Some(raw) => parse_dims(&raw).unwrap_or_else(|| {
                warn!(
                    "⚠️ {} ('{}') must be three positive numbers like '5870,2330,2200'. Using default.",
                    Self::CONTAINER_DIMS_VAR,
                    raw
                );
                Vec3::from(Self::DEFAULT_CONTAINER)
            }),
            None => Vec3::from(Self::DEFAULT_CONTAINER),
        };

        let item_count = load_usize_with_warning(
            lookup,
            Self::ITEM_COUNT_VAR,
            GeneratorConfig::DEFAULT_ITEM_COUNT,
            GeneratorConfig::MAX_ITEM_COUNT,
        );

        let min_side = load_f64_with_warning(
            lookup,
            Self::MIN_SIDE_VAR,
            GeneratorConfig::DEFAULT_MIN_SIDE,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted minimum side length changes generated item sizes",
        );

        let optimizer_iterations = load_usize_with_warning(
            lookup,
            Self::ITERATIONS_VAR,
            GeneratorConfig::DEFAULT_OPTIMIZER_ITERATIONS,
            GeneratorConfig::MAX_OPTIMIZER_ITERATIONS,
        );

        let yield_batch = load_usize_with_warning(
            lookup,
            Self::YIELD_BATCH_VAR,
            AnnealingConfig::DEFAULT_YIELD_BATCH,
            usize::MAX,
        );

        let seed = lookup(Self::SEED_VAR).and_then(|raw| match raw.parse::<u64>() {
            Ok(seed) => {
                info!("🎲 Using fixed seed {} for generator and optimizer", seed);
                Some(seed)
            }
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using entropy.",
                    Self::SEED_VAR,
                    raw,
                    err
                );
                None
            }
        });

        Self {
            packing: PackingConfig::builder().support_ratio(support_ratio).build(),
            container,
            generator: GeneratorConfig {
                item_count,
                min_side,
                optimizer_iterations,
            },
            annealing: AnnealingConfig {
                yield_batch,
                ..AnnealingConfig::default()
            },
            seed,
        }
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing
    }

    /// Container used when a request names none.
    pub fn container(&self) -> Dimensions {
        self.container
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        self.generator
    }

    pub fn annealing_config(&self) -> AnnealingConfig {
        self.annealing
    }

    /// Fixed seed, if one was configured.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_lookup(&|_: &str| None)
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

/// Parses `"w,d,h"` (commas or `x` as separators) into positive dimensions.
fn parse_dims(raw: &str) -> Option<Vec3> {
    let parts: Vec<f64> = raw
        .split([',', 'x', 'X'])
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [w, d, h] => {
            let dims = Vec3::new(*w, *d, *h);
            dims.is_valid_dimension().then_some(dims)
        }
        _ => None,
    }
}

fn load_usize_with_warning(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
    default: usize,
    max: usize,
) -> usize {
    match lookup(var_name) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(0) => {
                warn!(
                    "⚠️ {} must be at least 1. Using {}.",
                    var_name, default
                );
                default
            }
            Ok(value) if value > max => {
                warn!(
                    "⚠️ {} ({}) exceeds the limit of {}. Using {}.",
                    var_name, value, max, default
                );
                default
            }
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}') as integer: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

fn load_f64_with_warning(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match lookup(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => {
                if !validator(value) {
                    warn!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    let tolerance = (default.abs().max(1.0)) * 1e-9;
                    if (value - default).abs() > tolerance {
                        info!("⚠️ {} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.api.port(), 8080);
        assert!(config.api.binds_to_all_interfaces());
        assert!(config.api.uses_default_host());

        let engine = &config.engine;
        assert_eq!(engine.packing_config(), PackingConfig::default());
        assert_eq!(engine.container(), Vec3::new(5870.0, 2330.0, 2200.0));
        assert_eq!(engine.generator_config(), GeneratorConfig::default());
        assert_eq!(engine.annealing_config().yield_batch, 10);
        assert_eq!(engine.seed(), None);
    }

    #[test]
    fn variables_override_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("EMS_PACK_API_HOST", "127.0.0.1"),
            ("EMS_PACK_API_PORT", "9000"),
            ("EMS_PACK_SUPPORT_RATIO", "0.8"),
            ("EMS_PACK_CONTAINER_DIMS", "100, 50, 40"),
            ("EMS_PACK_GENERATOR_ITEM_COUNT", "8"),
            ("EMS_PACK_GENERATOR_MIN_SIDE", "5"),
            ("EMS_PACK_OPTIMIZER_ITERATIONS", "50"),
            ("EMS_PACK_OPTIMIZER_YIELD_BATCH", "3"),
            ("EMS_PACK_SEED", "42"),
        ]));

        assert_eq!(config.api.socket_addr().to_string(), "127.0.0.1:9000");
        assert!(!config.api.binds_to_all_interfaces());

        let engine = &config.engine;
        assert!((engine.packing_config().support_ratio - 0.8).abs() < 1e-12);
        assert_eq!(engine.container(), Vec3::new(100.0, 50.0, 40.0));
        let generator = engine.generator_config();
        assert_eq!(generator.item_count, 8);
        assert!((generator.min_side - 5.0).abs() < 1e-12);
        assert_eq!(generator.optimizer_iterations, 50);
        assert_eq!(engine.annealing_config().yield_batch, 3);
        assert_eq!(engine.seed(), Some(42));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("EMS_PACK_API_HOST", "not-an-ip"),
            ("EMS_PACK_API_PORT", "0"),
            ("EMS_PACK_SUPPORT_RATIO", "1.5"),
            ("EMS_PACK_CONTAINER_DIMS", "10,20"),
            ("EMS_PACK_GENERATOR_ITEM_COUNT", "0"),
            ("EMS_PACK_GENERATOR_MIN_SIDE", "-3"),
            ("EMS_PACK_OPTIMIZER_ITERATIONS", "many"),
            ("EMS_PACK_SEED", "abc"),
        ]));

        assert_eq!(config.api.port(), 8080);
        assert!(config.api.uses_default_host());
        let engine = &config.engine;
        assert_eq!(engine.packing_config(), PackingConfig::default());
        assert_eq!(engine.container(), Vec3::new(5870.0, 2330.0, 2200.0));
        assert_eq!(engine.generator_config(), GeneratorConfig::default());
        assert_eq!(engine.seed(), None);
    }

    #[test]
    fn counts_above_the_limits_fall_back() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("EMS_PACK_GENERATOR_ITEM_COUNT", "10001"),
            ("EMS_PACK_OPTIMIZER_ITERATIONS", "18446744073709551615"),
        ]));

        let generator = config.engine.generator_config();
        assert_eq!(generator.item_count, GeneratorConfig::DEFAULT_ITEM_COUNT);
        assert_eq!(
            generator.optimizer_iterations,
            GeneratorConfig::DEFAULT_OPTIMIZER_ITERATIONS
        );
        assert!(generator.validate().is_ok());
    }

    #[test]
    fn parse_dims_accepts_common_separators() {
        assert_eq!(parse_dims("1,2,3"), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(parse_dims("10x20x30"), Some(Vec3::new(10.0, 20.0, 30.0)));
        assert_eq!(parse_dims(" 4 , 5 , 6 "), Some(Vec3::new(4.0, 5.0, 6.0)));
        assert_eq!(parse_dims("1,2"), None);
        assert_eq!(parse_dims("1,0,3"), None);
        assert_eq!(parse_dims("a,b,c"), None);
    }
}
