use crate::cli::args::{Cli, Commands, ConnArgs};
use crate::dialects::DriverRegistry;
use crate::driver::{DbHandle, DriverError};
use crate::executor::RecordSet;
use crate::logger;
use crate::model::{Config, DatabaseConfig};
use log::{debug, error, info};

pub fn handle(cli: Cli) {
    // Load configuration
    let config = match Config::load(cli.config.as_deref(), cli.env.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logger::setup_logger(cli.verbose, "info");
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    logger::setup_logger(cli.verbose, &config.logging.level);

    debug!("Loaded configuration: {:?}", config);
    let registry = DriverRegistry::builtin();

    let result = match cli.command {
        Commands::Drivers => {
            run_drivers(&registry);
            Ok(())
        }
        Commands::Check { conn } => {
            info!("Running CHECK command");
            run_check(&database_config(&config, &conn), &registry)
        }
        Commands::Query { sql, conn } => {
            debug!("Running QUERY command");
            run_query(&database_config(&config, &conn), &registry, &sql)
        }
        Commands::Tables { conn } => run_tables(&database_config(&config, &conn), &registry),
        Commands::Describe { table, conn } => {
            run_describe(&database_config(&config, &conn), &registry, &table)
        }
        Commands::Vacuum { table, conn } => {
            info!("Running VACUUM command");
            run_vacuum(&database_config(&config, &conn), &registry, &table)
        }
        Commands::Config { output } => {
            run_config(&output, cli.env.as_deref());
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn database_config(config: &Config, conn: &ConnArgs) -> DatabaseConfig {
    let mut database = config.database.clone();
    conn.apply_to(&mut database);
    debug!("Database settings: {:?}", database);
    database
}

/// Build a handle from the merged settings and open it.
fn open(config: &DatabaseConfig, registry: &DriverRegistry) -> Result<DbHandle, DriverError> {
    let mut db = DbHandle::from_config(config, registry)?;
    if config.persistent {
        db.persistent_connect()?;
    } else {
        db.connect()?;
    }
    Ok(db)
}

fn run_drivers(registry: &DriverRegistry) {
    for descriptor in registry.list_drivers() {
        let aliases = registry.get_aliases(descriptor.key);
        println!(
            "{:<12} {:<24} family={}{}",
            descriptor.key,
            descriptor.name,
            descriptor.family,
            if aliases.is_empty() {
                String::new()
            } else {
                format!(" aliases={}", aliases.join(","))
            }
        );
    }
}

fn run_check(config: &DatabaseConfig, registry: &DriverRegistry) -> Result<(), DriverError> {
    let mut db = open(config, registry)?;

    println!("Driver: {} ({})", db.descriptor().name, db.descriptor().key);
    println!("Server version: {}", db.version()?);
    println!(
        "Unicode collation: {}",
        db.unicode_collation().unwrap_or("none (LOWER fallback)")
    );
    println!("Weak locks: {}", if db.weak_locks() { "on" } else { "off" });

    db.close()
}

fn print_record_set(rs: &RecordSet) {
    let header: Vec<&str> = rs.columns.iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join("\t"));
    for row in &rs.rows {
        let cells: Vec<&str> = row
            .iter()
            .map(|value| value.as_deref().unwrap_or("NULL"))
            .collect();
        println!("{}", cells.join("\t"));
    }
}

fn run_query(
    config: &DatabaseConfig,
    registry: &DriverRegistry,
    sql: &str,
) -> Result<(), DriverError> {
    let mut db = open(config, registry)?;
    let rs = db.select(sql)?;
    if !rs.columns.is_empty() {
        print_record_set(&rs);
    }
    info!("{} rows", rs.len());
    db.close()
}

fn run_tables(config: &DatabaseConfig, registry: &DriverRegistry) -> Result<(), DriverError> {
    let mut db = open(config, registry)?;
    for table in db.schema().tables()? {
        println!("{}", table);
    }
    db.close()
}

fn run_describe(
    config: &DatabaseConfig,
    registry: &DriverRegistry,
    table: &str,
) -> Result<(), DriverError> {
    let mut db = open(config, registry)?;
    let mut schema = db.schema();

    let columns = schema.columns(table)?;
    if columns.is_empty() {
        return Err(DriverError::Query(format!("Table not found: {}", table)));
    }
    let indexes = schema.indexes(table)?;

    println!("Columns of {}:", table);
    for column in &columns {
        println!(
            "  {:<24} {:<20}{}{}{}",
            column.name,
            column.native_type,
            if column.nullable { "" } else { " NOT NULL" },
            column
                .default
                .as_ref()
                .map(|d| format!(" DEFAULT {}", d))
                .unwrap_or_default(),
            if column.primary_key { " PRIMARY" } else { "" }
        );
    }
    if !indexes.is_empty() {
        println!("Indexes:");
        for index in &indexes {
            println!(
                "  {:<24} ({}){}",
                index.name,
                index.columns.join(", "),
                if index.unique { " UNIQUE" } else { "" }
            );
        }
    }

    db.close()
}

fn run_vacuum(
    config: &DatabaseConfig,
    registry: &DriverRegistry,
    table: &str,
) -> Result<(), DriverError> {
    let mut db = open(config, registry)?;
    db.vacuum(table)?;
    db.close()?;
    info!("Vacuumed {}", table);
    Ok(())
}

fn run_config(output: &str, env: Option<&str>) {
    debug!("Output path: {}", output);

    match Config::generate_default_config(output) {
        Ok(()) => {
            info!("Generated default configuration file: {}", output);
            if let Some(env_name) = env {
                let env_path = format!("config/{}.toml", env_name);
                match std::fs::create_dir_all("config") {
                    Ok(()) => match Config::generate_default_config(&env_path) {
                        Ok(()) => info!("Generated environment configuration file: {}", env_path),
                        Err(e) => error!("Failed to create environment config: {}", e),
                    },
                    Err(e) => error!("Failed to create config directory: {}", e),
                }
            }
        }
        Err(e) => {
            error!("Failed to generate configuration file: {}", e);
            std::process::exit(1);
        }
    }
}
