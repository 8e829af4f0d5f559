// panic 钩子集成测试
// 钩子是进程级的，单独放在一个测试二进制中

mod common;

use common::TestWriter;
use useful_logs::logging::{JsonFormatter, hooks};

fn panic_in_thread(thread_name: &str, message: &'static str) -> TestWriter {
    let writer = TestWriter::default();
    let thread_writer = writer.clone();

    std::thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || {
            let subscriber = tracing_subscriber::fmt()
                .with_writer(thread_writer)
                .event_format(JsonFormatter::default())
                .finish();
            tracing::subscriber::with_default(subscriber, || {
                let _ = std::panic::catch_unwind(|| panic!("{message}"));
            });
        })
        .unwrap()
        .join()
        .unwrap();

    writer
}

#[test]
fn test_background_thread_panic_is_logged() {
    hooks::install();
    hooks::install();

    let records = panic_in_thread("worker-1", "worker failed").records();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record["message"], hooks::UNCAUGHT_THREAD_MESSAGE);
    assert_eq!(record["level"], "ERROR");
    assert_eq!(record["exc_thread"], "worker-1");
    let traceback = record["traceback"].as_str().unwrap();
    assert!(traceback.contains("panic_hooks.rs"));
    assert!(traceback.ends_with("panic: worker failed"));
}

#[test]
fn test_main_thread_panic_is_logged() {
    hooks::install();

    let records = panic_in_thread("main", "startup failed").records();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record["message"], hooks::UNCAUGHT_MESSAGE);
    assert!(record.get("exc_thread").is_none());
    assert!(record["traceback"].as_str().unwrap().ends_with("panic: startup failed"));
}
