//! Reporter trait for dependency injection.
//!
//! Library code reports progress, warnings, and ambiguity notices through
//! this trait instead of printing, so the transaction logic stays testable
//! without a terminal and the protocol-server layer can serialize output
//! its own way.

use crate::types::{PackageName, Version};

pub trait Reporter: Send + Sync {
    /// A package operation has started (e.g. "installing", "removing").
    fn working(&self, action: &str, name: &PackageName, version: &Version);

    /// A package operation finished successfully.
    fn done(&self, action: &str, name: &PackageName, version: &Version);

    /// A package operation failed with a specific reason.
    fn failed(&self, name: &PackageName, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

/// Plain console reporter used by the CLI.
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn working(&self, action: &str, name: &PackageName, version: &Version) {
        println!("  {action} {name} {version}");
    }

    fn done(&self, action: &str, name: &PackageName, version: &Version) {
        println!("  ✓ {action} {name} {version}");
    }

    fn failed(&self, name: &PackageName, reason: &str) {
        eprintln!("  ✗ {name}: {reason}");
    }

    fn info(&self, msg: &str) {
        println!("{msg}");
    }

    fn warning(&self, msg: &str) {
        eprintln!("warning: {msg}");
    }

    fn error(&self, msg: &str) {
        eprintln!("error: {msg}");
    }
}

/// Reporter that swallows everything; used in tests.
#[derive(Debug, Clone, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn working(&self, _action: &str, _name: &PackageName, _version: &Version) {}
    fn done(&self, _action: &str, _name: &PackageName, _version: &Version) {}
    fn failed(&self, _name: &PackageName, _reason: &str) {}
    fn info(&self, _msg: &str) {}
    fn warning(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}
