//! Scripted transport for unit tests: records every statement and answers
//! from canned responses matched by SQL prefix.

use super::{ColumnMeta, Connector, NativeConnection, RecordSet};
use crate::dialects::base::EngineDescriptor;
use crate::driver::{ConnectParams, DriverError};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
pub(crate) struct Script {
    pub log: Vec<String>,
    pub opens: usize,
    pub persistent_opens: usize,
    pub responses: Vec<(String, RecordSet)>,
    pub failures: Vec<(String, String)>,
    pub refuse_connection: bool,
    pub now_function: bool,
    pub collation: bool,
    pub registered: Vec<String>,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedConnector {
    pub script: Rc<RefCell<Script>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector for a server reporting `version`.
    pub fn with_version(version: &str) -> Self {
        let connector = Self::new();
        connector.respond("SELECT VERSION()", scalar(version));
        connector.respond("SHOW server_version", scalar(version));
        connector.respond("SELECT sqlite_version()", scalar(version));
        connector
    }

    pub fn respond(&self, prefix: &str, rs: RecordSet) {
        self.script
            .borrow_mut()
            .responses
            .push((prefix.to_string(), rs));
    }

    pub fn fail(&self, prefix: &str, message: &str) {
        self.script
            .borrow_mut()
            .failures
            .push((prefix.to_string(), message.to_string()));
    }

    pub fn log(&self) -> Vec<String> {
        self.script.borrow().log.clone()
    }

    pub fn clear_log(&self) {
        self.script.borrow_mut().log.clear();
    }

    pub fn count(&self, sql: &str) -> usize {
        self.script.borrow().log.iter().filter(|s| *s == sql).count()
    }
}

pub(crate) fn scalar(value: &str) -> RecordSet {
    RecordSet::new(
        vec![ColumnMeta::new("value", "SQL_VARCHAR")],
        vec![vec![Some(value.to_string())]],
    )
}

struct ScriptedConnection {
    script: Rc<RefCell<Script>>,
}

impl ScriptedConnection {
    fn run(&mut self, sql: &str) -> Result<RecordSet, DriverError> {
        let mut script = self.script.borrow_mut();
        script.log.push(sql.to_string());
        if let Some((_, message)) = script.failures.iter().find(|(p, _)| sql.starts_with(p)) {
            return Err(DriverError::Query(message.clone()));
        }
        Ok(script
            .responses
            .iter()
            .find(|(p, _)| sql.starts_with(p))
            .map(|(_, rs)| rs.clone())
            .unwrap_or_default())
    }
}

impl NativeConnection for ScriptedConnection {
    fn execute(&mut self, sql: &str) -> Result<(), DriverError> {
        self.run(sql).map(|_| ())
    }

    fn query(&mut self, sql: &str) -> Result<RecordSet, DriverError> {
        self.run(sql)
    }

    fn register_now_function(&mut self) -> Result<bool, DriverError> {
        let mut script = self.script.borrow_mut();
        if script.now_function {
            script.registered.push("now".to_string());
        }
        Ok(script.now_function)
    }

    fn register_unicode_collation(&mut self, name: &str) -> Result<bool, DriverError> {
        let mut script = self.script.borrow_mut();
        if script.collation {
            script.registered.push(name.to_string());
        }
        Ok(script.collation)
    }
}

impl Connector for ScriptedConnector {
    fn open(
        &self,
        engine: &EngineDescriptor,
        _params: &ConnectParams,
        persistent: bool,
    ) -> Result<Box<dyn NativeConnection>, DriverError> {
        let mut script = self.script.borrow_mut();
        if script.refuse_connection {
            return Err(DriverError::Connection(format!(
                "{}: connection refused",
                engine.name
            )));
        }
        script.opens += 1;
        if persistent {
            script.persistent_opens += 1;
        }
        Ok(Box::new(ScriptedConnection {
            script: Rc::clone(&self.script),
        }))
    }
}
