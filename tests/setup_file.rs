// 文件日志集成测试
// 全局订阅器只能设置一次，单独放在一个测试二进制中

mod common;

use useful_logs::logging::context::{self, RestorePolicy};
use useful_logs::{LoggingConfig, LoggingSetup};

#[test]
fn test_init_writes_json_lines_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let template = format!("{}/logs/{{hostname}}-{{filename}}", dir.path().display());

    let config = LoggingConfig {
        file_path: Some(template),
        restore_policy: RestorePolicy::Strict,
        install_hooks: false,
        ..LoggingSetup::test_config()
    };
    LoggingSetup::init(&config).unwrap();
    assert_eq!(context::restore_policy(), RestorePolicy::Strict);

    context::set("request_id", "r-1");
    tracing::warn!(app = "demo", "testing");
    tracing::info!("filtered by level");
    context::cleanup();

    let path = dir
        .path()
        .join("logs")
        .join(format!("{}-rust.log", LoggingSetup::hostname()));
    let records = common::parse_lines(&std::fs::read_to_string(path).unwrap());

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["message"], "testing");
    assert_eq!(records[0]["app"], "demo");
    assert_eq!(records[0]["request_id"], "r-1");
    assert_eq!(records[0]["src"], "rust");

    // 再次初始化会失败
    assert!(LoggingSetup::init(&config).is_err());
}
