//! Integration tests for Engine logging
//!
//! Verifies that errors raised by the public API reach a custom logger.
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use little_renderer::lr::log::{format_entry, LogEntry, LogSeverity, Logger};
use little_renderer::lr::render::{RenderGraph, RenderTargetType};
use little_renderer::lr::{Engine, Error};
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    Engine::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].severity, LogSeverity::Info);
        assert_eq!(captured[1].severity, LogSeverity::Warn);
        assert_eq!(captured[1].message, "Test warning message");
        assert!(captured[0].file.is_none());
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_invalid_state_is_logged_with_location() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let mut graph = RenderGraph::new();
    graph.allocate_renderpass("main", RenderTargetType::Graphics).unwrap();
    let result = graph.allocate_renderpass("main", RenderTargetType::Compute);
    assert!(matches!(result, Err(Error::InvalidState(_))));

    {
        let captured = entries.lock().unwrap();
        let error = captured
            .iter()
            .find(|e| e.severity == LogSeverity::Error)
            .expect("duplicate pass name should log an error");
        assert_eq!(error.source, "lr::RenderGraph");
        assert!(error.message.contains("main"));
        assert!(error.file.is_some());
        assert!(error.line.is_some());
        assert!(format_entry(error).contains("[lr::RenderGraph]"));
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);
    Engine::log(LogSeverity::Info, "test", "Message 1".to_string());
    assert_eq!(entries.lock().unwrap().len(), 1);

    Engine::reset_logger();
    Engine::log(LogSeverity::Info, "test", "Message 2".to_string());
    assert_eq!(entries.lock().unwrap().len(), 1);
}
