// 集成测试公共工具

#![allow(dead_code)]

use serde_json::Value;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// 捕获输出的测试写入器
#[derive(Clone, Default)]
pub struct TestWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl TestWriter {
    pub fn records(&self) -> Vec<Value> {
        let buffer = self.buffer.lock().unwrap();
        parse_lines(&String::from_utf8_lossy(&buffer))
    }
}

impl Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .map_err(|_| io::Error::other("Mutex poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for TestWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// 解析按行分隔的 JSON 日志
pub fn parse_lines(output: &str) -> Vec<Value> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
