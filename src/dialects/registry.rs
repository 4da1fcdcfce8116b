use crate::dialects::base::{Charset, EngineDescriptor, SqlFamily, Transport};
use crate::driver::DriverError;
use log::debug;
use std::collections::HashMap;

/// The supported engine/transport pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    Mysqli,
    MysqliMb4,
    PdoMysql,
    PdoMysqlMb4,
    PdoPgsql,
    PdoSqlite,
}

const MYSQLI: EngineDescriptor = EngineDescriptor {
    name: "MySQL (mysqli)",
    key: "mysqli",
    aliases: &["mysql"],
    family: SqlFamily::Mysql,
    transport: Transport::Mysqli,
    charset: Charset::Utf8,
    supports_persistent: true,
};

const MYSQLI_MB4: EngineDescriptor = EngineDescriptor {
    name: "MySQL utf8mb4 (mysqli)",
    key: "mysqlimb4",
    aliases: &["mysqlmb4", "utf8mb4"],
    family: SqlFamily::Mysql,
    transport: Transport::Mysqli,
    charset: Charset::Utf8mb4,
    supports_persistent: true,
};

const PDO_MYSQL: EngineDescriptor = EngineDescriptor {
    name: "MySQL (PDO)",
    key: "pdomysql",
    aliases: &["pdo_mysql"],
    family: SqlFamily::Mysql,
    transport: Transport::Pdo,
    charset: Charset::Utf8,
    supports_persistent: true,
};

const PDO_MYSQL_MB4: EngineDescriptor = EngineDescriptor {
    name: "MySQL utf8mb4 (PDO)",
    key: "pdomysqlmb4",
    aliases: &["pdo_mysql_mb4"],
    family: SqlFamily::Mysql,
    transport: Transport::Pdo,
    charset: Charset::Utf8mb4,
    supports_persistent: true,
};

const PDO_PGSQL: EngineDescriptor = EngineDescriptor {
    name: "PostgreSQL (PDO)",
    key: "pdopgsql",
    aliases: &["pgsql", "postgres", "postgresql", "pdo_pgsql"],
    family: SqlFamily::Postgresql,
    transport: Transport::Pdo,
    charset: Charset::Utf8,
    supports_persistent: true,
};

const PDO_SQLITE: EngineDescriptor = EngineDescriptor {
    name: "SQLite (PDO)",
    key: "pdosqlite",
    aliases: &["sqlite", "sqlite3", "pdo_sqlite"],
    family: SqlFamily::Sqlite,
    transport: Transport::Pdo,
    charset: Charset::Utf8,
    supports_persistent: false,
};

impl DriverKind {
    pub const ALL: [DriverKind; 6] = [
        DriverKind::Mysqli,
        DriverKind::MysqliMb4,
        DriverKind::PdoMysql,
        DriverKind::PdoMysqlMb4,
        DriverKind::PdoPgsql,
        DriverKind::PdoSqlite,
    ];

    pub fn descriptor(&self) -> &'static EngineDescriptor {
        match self {
            DriverKind::Mysqli => &MYSQLI,
            DriverKind::MysqliMb4 => &MYSQLI_MB4,
            DriverKind::PdoMysql => &PDO_MYSQL,
            DriverKind::PdoMysqlMb4 => &PDO_MYSQL_MB4,
            DriverKind::PdoPgsql => &PDO_PGSQL,
            DriverKind::PdoSqlite => &PDO_SQLITE,
        }
    }
}

/// Maps driver keys and aliases to drivers. Built once at startup and
/// handed to whoever needs to resolve a configured key.
pub struct DriverRegistry {
    drivers: HashMap<String, DriverKind>,
    aliases: HashMap<String, String>, // alias -> driver key
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Registry holding every built-in driver.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for kind in DriverKind::ALL {
            registry.register(kind);
        }
        registry
    }

    pub fn register(&mut self, kind: DriverKind) {
        let descriptor = kind.descriptor();
        debug!("Registering driver: {}", descriptor.key);

        for alias in descriptor.aliases {
            self.aliases
                .insert(alias.to_string(), descriptor.key.to_string());
        }
        self.drivers.insert(descriptor.key.to_string(), kind);
    }

    /// Look up a driver by key or alias, case-insensitively.
    pub fn get(&self, key: &str) -> Option<DriverKind> {
        let key = key.trim().to_ascii_lowercase();
        if let Some(kind) = self.drivers.get(&key) {
            return Some(*kind);
        }
        self.aliases
            .get(&key)
            .and_then(|name| self.drivers.get(name))
            .copied()
    }

    pub fn resolve(&self, key: &str) -> Result<DriverKind, DriverError> {
        self.get(key)
            .ok_or_else(|| DriverError::UnknownDriver(key.to_string()))
    }

    /// Registered drivers, sorted by key.
    pub fn list_drivers(&self) -> Vec<&'static EngineDescriptor> {
        let mut drivers: Vec<_> = self.drivers.values().map(|k| k.descriptor()).collect();
        drivers.sort_by_key(|d| d.key);
        drivers
    }

    pub fn get_aliases(&self, key: &str) -> Vec<String> {
        let mut aliases: Vec<String> = self
            .aliases
            .iter()
            .filter(|(_, name)| *name == key)
            .map(|(alias, _)| alias.clone())
            .collect();
        aliases.sort();
        aliases
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
