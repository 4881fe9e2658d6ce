use super::*;

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert!(settings.database.url.is_none());
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.backend, CacheBackendKind::Memory);
    assert_eq!(settings.cache.default_page_size.get(), 20);
    assert_eq!(settings.cache.list_ttl_seconds, 600);
    assert_eq!(settings.cache.memory_capacity.get(), DEFAULT_MEMORY_CAPACITY);
    assert!(settings.ingest.api_key.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.cache.enabled = Some(true);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        cache_enabled: Some(false),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(!settings.cache.enabled);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn redis_backend_requires_url() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("redis".to_string());

    let err = Settings::from_raw(raw).expect_err("missing redis url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.redis_url",
            ..
        }
    ));
}

#[test]
fn unknown_backend_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("memcached".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown backend");
    assert!(matches!(err, LoadError::Invalid { key: "cache.backend", .. }));
}

#[test]
fn page_size_is_bounded() {
    let mut raw = RawSettings::default();
    raw.cache.default_page_size = Some(MAX_PAGE_SIZE + 1);
    assert!(Settings::from_raw(raw).is_err());

    let mut zero = RawSettings::default();
    zero.cache.default_page_size = Some(0);
    assert!(Settings::from_raw(zero).is_err());
}

#[test]
fn memory_capacity_must_be_positive() {
    let mut raw = RawSettings::default();
    raw.cache.memory_capacity = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "cache.memory_capacity",
            ..
        })
    ));
}

#[test]
fn blank_values_count_as_absent() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    raw.ingest.api_key = Some("".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
    assert!(settings.ingest.api_key.is_none());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["scandeals"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_refresh_cache_arguments() {
    let args = CliArgs::parse_from([
        "scandeals",
        "refresh-cache",
        "--database-url",
        "postgres://example",
        "--cache-backend",
        "redis",
        "--cache-redis-url",
        "redis://cache:6379",
    ]);

    match args.command.expect("refresh-cache command") {
        Command::RefreshCache(refresh) => {
            assert_eq!(
                refresh.backends.database_url.as_deref(),
                Some("postgres://example")
            );
            assert_eq!(refresh.backends.cache_backend.as_deref(), Some("redis"));

            let mut raw = RawSettings::default();
            raw.apply_backend_overrides(&refresh.backends);
            let settings = Settings::from_raw(raw).expect("valid settings");
            assert_eq!(settings.cache.backend, CacheBackendKind::Redis);
            assert_eq!(
                settings.cache.redis_url.as_deref(),
                Some("redis://cache:6379")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "scandeals",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--ingest-api-key",
        "crawler-secret",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.backends.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(
                serve.overrides.ingest_api_key.as_deref(),
                Some("crawler-secret")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
#[serial_test::serial]
fn environment_layer_overrides_files_and_cli_overrides_environment() {
    const PORT_VAR: &str = "SCANDEALS__SERVER__PORT";
    const TTL_VAR: &str = "SCANDEALS__CACHE__LIST_TTL_SECONDS";

    // SAFETY: environment-touching tests are serialized.
    unsafe {
        std::env::set_var(PORT_VAR, "9191");
        std::env::set_var(TTL_VAR, "45");
    }

    let from_env = load(&CliArgs {
        config_file: None,
        command: None,
    });
    let from_cli = load(&CliArgs::parse_from([
        "scandeals",
        "serve",
        "--server-port",
        "7000",
    ]));

    // SAFETY: see above.
    unsafe {
        std::env::remove_var(PORT_VAR);
        std::env::remove_var(TTL_VAR);
    }

    let from_env = from_env.expect("env settings");
    assert_eq!(from_env.server.addr.port(), 9191);
    assert_eq!(from_env.cache.list_ttl_seconds, 45);

    let from_cli = from_cli.expect("cli settings");
    assert_eq!(from_cli.server.addr.port(), 7000);
    assert_eq!(from_cli.cache.list_ttl_seconds, 45);
}
