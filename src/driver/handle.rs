use crate::dialects::base::{Engine, EngineDescriptor, FieldType, OrderSpec, SqlFamily, VacuumPlan};
use crate::dialects::{DriverKind, DriverRegistry, ServerVersion, engine_for};
use crate::driver::{ConnectParams, DriverError};
use crate::executor::{Connector, NativeConnection, NativeConnector, OdbcSettings, RecordSet};
use crate::model::DatabaseConfig;
use crate::schema::Schema;
use log::{debug, info, warn};
use std::fmt;

/// One connection to one database through one driver.
///
/// Every statement goes through `&mut self`, so a handle is never shared
/// between concurrent callers.
pub struct DbHandle {
    kind: DriverKind,
    descriptor: &'static EngineDescriptor,
    engine: Box<dyn Engine>,
    connector: Box<dyn Connector>,
    params: ConnectParams,
    weak_locks: bool,
    native: Option<Box<dyn NativeConnection>>,
    raw_version: Option<String>,
    server_version: Option<ServerVersion>,
    unicode_collation: Option<String>,
    deferred_vacuum: Option<String>,
    locked: bool,
}

impl DbHandle {
    /// Closed handle for `kind`. Weak locks default to on for the MySQL
    /// family.
    pub fn new(kind: DriverKind, params: ConnectParams, connector: Box<dyn Connector>) -> Self {
        let descriptor = kind.descriptor();
        Self {
            kind,
            descriptor,
            engine: engine_for(descriptor.family),
            connector,
            params,
            weak_locks: descriptor.family == SqlFamily::Mysql,
            native: None,
            raw_version: None,
            server_version: None,
            unicode_collation: None,
            deferred_vacuum: None,
            locked: false,
        }
    }

    /// Closed handle built from the `[database]` section, using the native
    /// transports.
    pub fn from_config(
        config: &DatabaseConfig,
        registry: &DriverRegistry,
    ) -> Result<Self, DriverError> {
        let kind = registry.resolve(&config.driver)?;

        let mut odbc = OdbcSettings {
            login_timeout: config.login_timeout,
            ..OdbcSettings::default()
        };
        if let Some(driver) = &config.odbc_driver {
            match kind.descriptor().family {
                SqlFamily::Mysql => odbc.mysql_driver = driver.clone(),
                SqlFamily::Postgresql => odbc.postgres_driver = driver.clone(),
                SqlFamily::Sqlite => {
                    debug!("Ignoring odbc_driver for {}", kind.descriptor().key)
                }
            }
        }

        let params = ConnectParams::new(
            config.host.clone(),
            config.user.clone().unwrap_or_default(),
            config.password.clone().unwrap_or_default(),
            config.database.clone(),
        );

        let mut handle = Self::new(kind, params, Box::new(NativeConnector::new(odbc)));
        if let Some(weak) = config.weak_locks {
            handle = handle.with_weak_locks(weak);
        }
        Ok(handle)
    }

    pub fn with_weak_locks(mut self, weak_locks: bool) -> Self {
        if weak_locks && !self.engine.honours_weak_locks() {
            debug!(
                "{} does not honour weak locks, lock failures will propagate",
                self.descriptor.name
            );
        }
        self.weak_locks = weak_locks;
        self
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    pub fn descriptor(&self) -> &'static EngineDescriptor {
        self.descriptor
    }

    pub fn params(&self) -> &ConnectParams {
        &self.params
    }

    /// Whether lock failures are currently swallowed.
    pub fn weak_locks(&self) -> bool {
        self.weak_locks && self.engine.honours_weak_locks()
    }

    pub fn is_connected(&self) -> bool {
        self.native.is_some()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Collation negotiated for the open session; `None` means collated
    /// ordering degrades to `LOWER()`.
    pub fn unicode_collation(&self) -> Option<&str> {
        self.unicode_collation.as_deref()
    }

    pub fn server_version(&self) -> Option<ServerVersion> {
        self.server_version
    }

    /// Open the native connection and negotiate the session.
    pub fn connect(&mut self) -> Result<(), DriverError> {
        self.open(false)
    }

    /// Like `connect`, but through the transport's connection pool. Drivers
    /// without persistent support fall back to a normal connect.
    pub fn persistent_connect(&mut self) -> Result<(), DriverError> {
        if !self.descriptor.supports_persistent {
            info!(
                "{} has no persistent connections, connecting normally",
                self.descriptor.name
            );
            return self.open(false);
        }
        self.open(true)
    }

    fn open(&mut self, persistent: bool) -> Result<(), DriverError> {
        if self.native.is_some() {
            debug!("{} handle is already connected", self.descriptor.key);
            return Ok(());
        }

        let mut native = self
            .connector
            .open(self.descriptor, &self.params, persistent)?;

        let raw_version = native
            .query(self.engine.version_sql())
            .map_err(|e| {
                DriverError::Connection(format!("Unable to read server version: {}", e.message()))
            })?
            .scalar()
            .unwrap_or_default()
            .to_string();
        let version = ServerVersion::parse(&raw_version).unwrap_or_else(|| {
            warn!(
                "Unrecognised server version '{}', assuming oldest behaviour",
                raw_version
            );
            ServerVersion::default()
        });

        // On failure `native` is dropped here and the handle stays closed.
        let negotiated = self
            .engine
            .negotiate(&mut *native, self.descriptor, &version)?;

        info!(
            "Connected with {} (server {})",
            self.descriptor.name, raw_version
        );
        self.native = Some(native);
        self.raw_version = Some(raw_version);
        self.server_version = Some(version);
        self.unicode_collation = negotiated.unicode_collation;
        Ok(())
    }

    /// Release the native connection. A held write lock is released first,
    /// then a deferred vacuum runs. Closing a closed handle does nothing.
    pub fn close(&mut self) -> Result<(), DriverError> {
        let Some(mut native) = self.native.take() else {
            return Ok(());
        };

        let mut result = Ok(());
        if self.locked {
            let sql = self.engine.unlock_sql();
            warn!(
                "Closing {} connection while a write lock is held, running {}",
                self.descriptor.key, sql
            );
            if let Err(e) = native.execute(sql) {
                if self.weak_locks() {
                    warn!("Ignoring unlock failure (weak locks): {}", e);
                } else {
                    result = Err(DriverError::Lock(e.message()));
                }
            }
        }

        if let Some(sql) = self.deferred_vacuum.take() {
            info!("Running deferred {}", sql);
            if let Err(e) = native.execute(&sql) {
                if result.is_ok() {
                    result = Err(e);
                } else {
                    warn!("Deferred {} failed: {}", sql, e);
                }
            }
        }

        self.raw_version = None;
        self.server_version = None;
        self.unicode_collation = None;
        self.locked = false;
        drop(native);

        info!("Closed {} connection", self.descriptor.key);
        result
    }

    fn native(&mut self) -> Result<&mut (dyn NativeConnection + 'static), DriverError> {
        self.native.as_deref_mut().ok_or(DriverError::NotConnected)
    }

    pub fn select(&mut self, sql: &str) -> Result<RecordSet, DriverError> {
        self.native()?.query(sql)
    }

    pub fn execute(&mut self, sql: &str) -> Result<(), DriverError> {
        self.native()?.execute(sql)
    }

    /// Key generated by the last insert on this session.
    pub fn last_insert_id(&mut self) -> Result<Option<i64>, DriverError> {
        let sql = self.engine.last_insert_id_sql();
        let rs = self.native()?.query(sql)?;
        Ok(rs.scalar().and_then(|v| v.trim().parse().ok()))
    }

    /// Server version string as reported at connect time.
    pub fn version(&self) -> Result<&str, DriverError> {
        self.raw_version.as_deref().ok_or(DriverError::NotConnected)
    }

    pub fn escape_system(&self, identifier: &str) -> String {
        self.engine.escape_system(identifier)
    }

    pub fn escape_str(&self, value: &str) -> String {
        self.engine.escape_str(value)
    }

    pub fn order_by(&self, specs: &[OrderSpec]) -> String {
        self.engine.order_by(specs, self.unicode_collation())
    }

    pub fn lex_fields(&self, fields: &[&str]) -> String {
        self.engine.lex_fields(fields, self.unicode_collation())
    }

    pub fn date_format(&self, field: &str, pattern: &str) -> String {
        self.engine.date_format(field, pattern)
    }

    pub fn concat(&self, fields: &[&str]) -> String {
        self.engine.concat(fields)
    }

    /// Canonical type of column `position` in `rs`.
    pub fn field_type(&self, rs: &RecordSet, position: usize) -> FieldType {
        rs.columns
            .get(position)
            .map(|column| self.engine.field_type(&column.native_type))
            .unwrap_or(FieldType::Unknown)
    }

    /// Take the engine's write lock on `table`.
    pub fn write_lock(&mut self, table: &str) -> Result<(), DriverError> {
        let quoted = self.engine.escape_system(table);
        let statements = self.engine.lock_statements(&quoted);
        let weak = self.weak_locks();
        let native = self
            .native
            .as_deref_mut()
            .ok_or(DriverError::NotConnected)?;

        for (index, statement) in statements.iter().enumerate() {
            debug!("Locking {}: {}", table, statement);
            if let Err(e) = native.execute(statement) {
                if index > 0 {
                    if let Some(abort) = self.engine.abort_lock_sql() {
                        if let Err(abort_err) = native.execute(abort) {
                            warn!("{} after failed lock also failed: {}", abort, abort_err);
                        }
                    }
                }
                if weak {
                    warn!("Ignoring lock failure on {} (weak locks): {}", table, e);
                    return Ok(());
                }
                return Err(DriverError::Lock(format!("{}: {}", table, e.message())));
            }
        }

        self.locked = true;
        Ok(())
    }

    /// Release the lock taken by `write_lock`. Does nothing when no lock
    /// is held.
    pub fn unlock(&mut self) -> Result<(), DriverError> {
        let weak = self.weak_locks();
        let sql = self.engine.unlock_sql();
        let native = self
            .native
            .as_deref_mut()
            .ok_or(DriverError::NotConnected)?;

        if !self.locked {
            debug!("No write lock held, skipping {}", sql);
            return Ok(());
        }

        let result = native.execute(sql);
        self.locked = false;
        match result {
            Ok(()) => Ok(()),
            Err(e) if weak => {
                warn!("Ignoring unlock failure (weak locks): {}", e);
                Ok(())
            }
            Err(e) => Err(DriverError::Lock(e.message())),
        }
    }

    /// Reclaim space held by `table`. SQLite defers the work to `close`.
    pub fn vacuum(&mut self, table: &str) -> Result<(), DriverError> {
        let plan = self.engine.vacuum_plan(&self.engine.escape_system(table));
        let native = self
            .native
            .as_deref_mut()
            .ok_or(DriverError::NotConnected)?;

        match plan {
            VacuumPlan::Now(sql) => {
                info!("Vacuuming {}", table);
                native.execute(&sql)
            }
            VacuumPlan::OnClose(sql) => {
                if self.deferred_vacuum.is_none() {
                    debug!("{} deferred until close", sql);
                }
                self.deferred_vacuum = Some(sql);
                Ok(())
            }
        }
    }

    /// Schema provider paired with this handle's engine.
    pub fn schema(&mut self) -> Schema<'_> {
        let ops = self.engine.schema(self.descriptor);
        Schema::new(self, ops)
    }
}

impl Drop for DbHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error while closing {} connection: {}", self.descriptor.key, e);
        }
    }
}

impl fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbHandle")
            .field("driver", &self.descriptor.key)
            .field("params", &self.params)
            .field("weak_locks", &self.weak_locks)
            .field("connected", &self.native.is_some())
            .field("server_version", &self.raw_version)
            .field("unicode_collation", &self.unicode_collation)
            .field("deferred_vacuum", &self.deferred_vacuum.is_some())
            .field("locked", &self.locked)
            .finish()
    }
}
