//! Configuration loading tests.

use shorelink_core::config::{defaults, env_vars, ConfigError, RelayConfig};

// The environment is process-global, so everything env-related lives in
// this single test.
#[test]
fn test_from_env() {
    std::env::remove_var(env_vars::SCOPE);
    std::env::remove_var(env_vars::REMOTE_HOST);
    std::env::remove_var(env_vars::REMOTE_PORT);

    // scope is required
    assert!(matches!(
        RelayConfig::from_env(),
        Err(ConfigError::MissingScope)
    ));

    std::env::set_var(env_vars::SCOPE, "xs1");
    let config = RelayConfig::from_env().unwrap();
    assert_eq!(config.scope, "xs1");
    assert_eq!(config.remote_host, defaults::REMOTE_HOST);
    assert_eq!(config.remote_port, defaults::REMOTE_PORT);

    // overrides are honored, bad numbers are rejected
    std::env::set_var(env_vars::REMOTE_HOST, "relay.example.org");
    std::env::set_var(env_vars::REMOTE_PORT, "7000");
    let config = RelayConfig::from_env().unwrap();
    assert_eq!(config.remote_host, "relay.example.org");
    assert_eq!(config.remote_port, 7000);

    std::env::set_var(env_vars::REMOTE_PORT, "not-a-port");
    assert!(matches!(
        RelayConfig::from_env(),
        Err(ConfigError::InvalidValue { .. })
    ));

    std::env::remove_var(env_vars::SCOPE);
    std::env::remove_var(env_vars::REMOTE_HOST);
    std::env::remove_var(env_vars::REMOTE_PORT);
}
