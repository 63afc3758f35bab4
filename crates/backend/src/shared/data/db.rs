use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};

use crate::shared::config::StorageBackend;

/// Open (creating if needed) the SQLite database at `db_path` and return the
/// connection handle. The handle is passed explicitly to every repository;
/// nothing in the process holds it as ambient state.
pub async fn connect(db_path: &str) -> anyhow::Result<DatabaseConnection> {
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if std::path::Path::new(db_path).is_absolute() {
        std::path::PathBuf::from(db_path)
    } else {
        std::env::current_dir()?.join(db_path)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);
    let conn = Database::connect(&db_url).await?;
    Ok(conn)
}

/// In-memory database for tests.
#[cfg(test)]
pub async fn connect_memory() -> DatabaseConnection {
    Database::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite")
}

const SHARED_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS company (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        gstin TEXT,
        created_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS company_address (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        company_id INTEGER NOT NULL,
        address_line TEXT NOT NULL,
        city TEXT NOT NULL DEFAULT '',
        state TEXT NOT NULL DEFAULT '',
        pincode TEXT NOT NULL DEFAULT '',
        is_default INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS app_user (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        role TEXT NOT NULL DEFAULT '',
        password_hash TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS initial_setup (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        company_name TEXT NOT NULL,
        address TEXT NOT NULL DEFAULT '',
        city TEXT NOT NULL DEFAULT '',
        state TEXT NOT NULL DEFAULT '',
        pincode TEXT NOT NULL DEFAULT '',
        gstin TEXT NOT NULL DEFAULT '',
        footnote TEXT NOT NULL DEFAULT '',
        mobile TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL
    );
    "#,
];

const RELATIONAL_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS bilty_address (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        company_id INTEGER,
        address_line TEXT NOT NULL,
        city TEXT NOT NULL DEFAULT '',
        state TEXT NOT NULL DEFAULT '',
        pincode TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bilty (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bilty_no INTEGER NOT NULL,
        consignor_company_id INTEGER,
        consignee_company_id INTEGER,
        consignor_address_id INTEGER,
        consignee_address_id INTEGER,
        from_location TEXT NOT NULL DEFAULT '',
        to_location TEXT NOT NULL DEFAULT '',
        date TEXT NOT NULL,
        to_pay REAL NOT NULL DEFAULT 0,
        gstin TEXT,
        inv_no TEXT,
        pvt_marks TEXT,
        permit_no TEXT,
        value_rupees REAL,
        remarks TEXT,
        hamali REAL,
        dd_charges REAL,
        other_charges REAL,
        fov REAL,
        statistical TEXT,
        created_by INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT,
        pdf_path TEXT,
        pdf_created_at TEXT,
        status TEXT NOT NULL DEFAULT 'draft'
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS goods (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bilty_id INTEGER NOT NULL,
        particulars TEXT NOT NULL,
        num_of_pkts INTEGER NOT NULL DEFAULT 0,
        weight_kg REAL,
        rate REAL,
        per TEXT,
        amount REAL
    );
    "#,
];

const DOCUMENT_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS bilty_doc (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bilty_no INTEGER NOT NULL,
        created_by INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'draft',
        created_at TEXT NOT NULL,
        updated_at TEXT,
        body TEXT NOT NULL
    );
    "#,
];

/// Ensure required tables exist (minimal schema bootstrap). Idempotent, run
/// once at startup against the configured database.
pub async fn bootstrap_schema(
    conn: &DatabaseConnection,
    backend: StorageBackend,
) -> anyhow::Result<()> {
    let backend_tables = match backend {
        StorageBackend::Relational => RELATIONAL_TABLES,
        StorageBackend::Document => DOCUMENT_TABLES,
    };
    for ddl in SHARED_TABLES.iter().chain(backend_tables) {
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            (*ddl).to_string(),
        ))
        .await?;
    }
    tracing::info!("Database schema ready ({:?} backend)", backend);
    Ok(())
}
