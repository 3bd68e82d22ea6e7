//! Database initialization
//!
//! Both services share one SQLite database. Whichever starts first creates
//! the full schema; creation is idempotent so a second service starting
//! against an existing file is a no-op.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Well-known id of the seeded admin operator
pub const ADMIN_OPERATOR_ID: &str = "00000000-0000-0000-0000-000000000001";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
///
/// Runs in two phases: a single bootstrap connection creates the schema and
/// reads the configured busy timeout, then the production pool is built with
/// that timeout applied to every connection.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let bootstrap = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options(db_path, DEFAULT_BUSY_TIMEOUT_MS))
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&bootstrap).await?;

    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'database_busy_timeout_ms'",
    )
    .fetch_optional(&bootstrap)
    .await?
    .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS as i64);

    bootstrap.close().await;

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect_with(connect_options(db_path, timeout_ms.max(0) as u64))
        .await?;

    Ok(pool)
}

/// Per-connection options shared by the bootstrap and production pools
///
/// Foreign keys must be on for every connection; several tables rely on
/// ON DELETE CASCADE to clean up dependent rows.
fn connect_options(db_path: &Path, busy_timeout_ms: u64) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        // WAL allows concurrent readers with one writer; both services hit
        // the same file so this matters even at modest load
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(busy_timeout_ms))
}

/// In-memory database with the full schema, for tests and tooling
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_module_config_table(pool).await?;
    create_providers_table(pool).await?;
    create_operators_table(pool).await?;
    create_trucks_table(pool).await?;
    create_entries_table(pool).await?;
    create_warehouses_table(pool).await?;
    create_locations_table(pool).await?;
    create_inventory_items_table(pool).await?;
    create_packages_table(pool).await?;
    create_package_movements_table(pool).await?;
    create_labels_table(pool).await?;
    create_reexpedicion_tables(pool).await?;
    create_notifications_tables(pool).await?;

    // VMS tables
    create_shipments_table(pool).await?;
    create_pre_alerta_records_table(pool).await?;
    create_pre_ruteo_records_table(pool).await?;
    create_scanned_packages_table(pool).await?;
    create_clasificacion_tables(pool).await?;

    init_default_settings(pool).await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values and resets NULL
/// values back to their defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "database_busy_timeout_ms", "5000").await?;

    // Window for the "active shipments" query on scanner stations
    ensure_setting(pool, "vms_active_window_hours", "48").await?;

    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE so concurrent initialization of both services
        // cannot race past the exists check into a constraint error
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Read a setting value, `None` when absent or NULL
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

async fn create_module_config_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS module_config (
            module_name TEXT PRIMARY KEY CHECK (module_name IN ('ops', 'vms')),
            host TEXT NOT NULL,
            port INTEGER NOT NULL CHECK (port > 0 AND port <= 65535),
            enabled INTEGER NOT NULL DEFAULT 1,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let defaults = vec![("ops", "127.0.0.1", 5730), ("vms", "127.0.0.1", 5731)];

    for (module_name, host, port) in defaults {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO module_config (module_name, host, port, enabled)
            VALUES (?, ?, ?, 1)
            "#,
        )
        .bind(module_name)
        .bind(host)
        .bind(port)
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn create_providers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS providers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            responsible TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_providers_name ON providers(name)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the operators table and seed the default admin
///
/// Operators are the request identities resolved from the `X-Operator`
/// header; VMS operators carry the provider that scopes their queries.
async fn create_operators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operators (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL CHECK (role IN ('ADMIN', 'OPERADOR', 'VMS')),
            provider_id TEXT REFERENCES providers(id) ON DELETE SET NULL,
            active INTEGER NOT NULL DEFAULT 1 CHECK (active IN (0, 1)),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Default admin so a fresh database is usable immediately
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO operators (id, name, role, provider_id, active, created_at)
        VALUES (?, 'admin', 'ADMIN', NULL, 1, ?)
        "#,
    )
    .bind(ADMIN_OPERATOR_ID)
    .bind(crate::time::now_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_trucks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trucks (
            id TEXT PRIMARY KEY,
            license_plate TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the entries table
///
/// Gate entries stamp the ISO week and calendar month at write time so the
/// weekly/monthly dashboards group without date arithmetic at query time.
async fn create_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id TEXT PRIMARY KEY,
            provider_id TEXT NOT NULL REFERENCES providers(id),
            truck_id TEXT NOT NULL REFERENCES trucks(id),
            arrival_time TEXT,
            departure_time TEXT,
            week INTEGER NOT NULL CHECK (week >= 1 AND week <= 53),
            month INTEGER NOT NULL CHECK (month >= 1 AND month <= 12),
            duration_minutes INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (duration_minutes IS NULL OR duration_minutes >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_provider ON entries(provider_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_truck ON entries(truck_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_week ON entries(week)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_month ON entries(month)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_warehouses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS warehouses (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            address TEXT,
            description TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_locations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS locations (
            id TEXT PRIMARY KEY,
            warehouse_id TEXT NOT NULL REFERENCES warehouses(id),
            name TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_locations_warehouse ON locations(warehouse_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_inventory_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inventory_items (
            id TEXT PRIMARY KEY,
            entry_id TEXT NOT NULL REFERENCES entries(id),
            location_id TEXT NOT NULL REFERENCES locations(id),
            quantity INTEGER NOT NULL CHECK (quantity >= 0),
            status TEXT NOT NULL DEFAULT 'STORED' CHECK (status IN ('STORED', 'REMOVED')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_inventory_location ON inventory_items(location_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_inventory_entry ON inventory_items(entry_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the packages table
///
/// Tracks physical packages through the warehouse; every state change also
/// appends to package_movements.
async fn create_packages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS packages (
            id TEXT PRIMARY KEY,
            tracking_number TEXT NOT NULL UNIQUE,
            current_provider_id TEXT REFERENCES providers(id),
            current_location_id TEXT REFERENCES locations(id),
            status TEXT NOT NULL DEFAULT 'INGRESADO'
                CHECK (status IN ('INGRESADO', 'ALMACENADO', 'EN_TRASPASO', 'ENTREGADO')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_packages_tracking ON packages(tracking_number)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_packages_provider ON packages(current_provider_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_packages_location ON packages(current_location_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_packages_status ON packages(status)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_package_movements_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS package_movements (
            id TEXT PRIMARY KEY,
            package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
            action TEXT NOT NULL CHECK (action IN ('INGRESO', 'TRASPASO', 'SALIDA')),
            from_provider_id TEXT,
            to_provider_id TEXT,
            from_location_id TEXT,
            to_location_id TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_movements_package ON package_movements(package_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_labels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS labels (
            id TEXT PRIMARY KEY,
            barcode TEXT NOT NULL UNIQUE,
            provider_name TEXT NOT NULL CHECK (provider_name IN ('Urbano', 'Ocasa')),
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_labels_provider ON labels(provider_name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_labels_created ON labels(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the reexpedición movement and label tables
///
/// An INGRESO movement owns a batch of scanned labels; EGRESO movements
/// reference an origin INGRESO and consume its labels. Origin state degrades
/// ACTIVO -> EGRESADO_PARCIAL -> EGRESADO_TOTAL as labels leave.
async fn create_reexpedicion_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reexpedicion_movimientos (
            id TEXT PRIMARY KEY,
            tipo TEXT NOT NULL CHECK (tipo IN ('INGRESO', 'EGRESO')),
            subtipo_ingreso TEXT
                CHECK (subtipo_ingreso IS NULL OR subtipo_ingreso IN
                    ('RETORNOS', 'PENDIENTE_RETIRO', 'PICKUP', 'INSUMOS_WH')),
            subtipo_egreso TEXT
                CHECK (subtipo_egreso IS NULL OR subtipo_egreso IN
                    ('ENTREGA_PARCIAL', 'ENTREGA_TOTAL')),
            warehouse_id TEXT NOT NULL REFERENCES warehouses(id),
            location_id TEXT NOT NULL REFERENCES locations(id),
            cantidad INTEGER NOT NULL CHECK (cantidad > 0),
            cantidad_egresada INTEGER NOT NULL DEFAULT 0 CHECK (cantidad_egresada >= 0),
            estado TEXT NOT NULL DEFAULT 'ACTIVO'
                CHECK (estado IN ('ACTIVO', 'EGRESADO_PARCIAL', 'EGRESADO_TOTAL')),
            notas TEXT,
            movimiento_origen_id TEXT REFERENCES reexpedicion_movimientos(id),
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reexp_mov_tipo ON reexpedicion_movimientos(tipo, estado)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reexp_mov_location ON reexpedicion_movimientos(location_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reexpedicion_etiquetas (
            id TEXT PRIMARY KEY,
            movimiento_id TEXT NOT NULL REFERENCES reexpedicion_movimientos(id) ON DELETE CASCADE,
            tracking_number TEXT NOT NULL,
            estado TEXT NOT NULL DEFAULT 'ACTIVO' CHECK (estado IN ('ACTIVO', 'EGRESADO_TOTAL')),
            escaneado_at TEXT NOT NULL,
            egresado_at TEXT,
            UNIQUE (movimiento_id, tracking_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reexp_etq_tracking ON reexpedicion_etiquetas(tracking_number)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_notifications_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            operator_id TEXT NOT NULL REFERENCES operators(id) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK (kind IN
                ('NEW_ENTRY', 'NEW_PROVIDER', 'NEW_INVENTORY', 'NEW_REEXPEDICION')),
            message TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_notifications_operator ON notifications(operator_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_preferences (
            operator_id TEXT PRIMARY KEY REFERENCES operators(id) ON DELETE CASCADE,
            new_entry INTEGER NOT NULL DEFAULT 1 CHECK (new_entry IN (0, 1)),
            new_provider INTEGER NOT NULL DEFAULT 1 CHECK (new_provider IN (0, 1)),
            new_inventory INTEGER NOT NULL DEFAULT 1 CHECK (new_inventory IN (0, 1)),
            new_reexpedicion INTEGER NOT NULL DEFAULT 1 CHECK (new_reexpedicion IN (0, 1))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the shipments table
///
/// One shipment per verification cycle, walked through
/// PRE_ALERTA -> PRE_RUTEO -> VERIFICACION -> FINALIZADO.
async fn create_shipments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shipments (
            id TEXT PRIMARY KEY,
            provider_id TEXT NOT NULL REFERENCES providers(id),
            shipment_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PRE_ALERTA'
                CHECK (status IN ('PRE_ALERTA', 'PRE_RUTEO', 'VERIFICACION', 'FINALIZADO')),
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            finalized_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_shipments_provider ON shipments(provider_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_shipments_status ON shipments(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_shipments_created ON shipments(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_pre_alerta_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pre_alerta_records (
            id TEXT PRIMARY KEY,
            shipment_id TEXT NOT NULL REFERENCES shipments(id) ON DELETE CASCADE,
            tracking_number TEXT NOT NULL,
            client TEXT,
            country TEXT,
            weight REAL,
            value REAL,
            buyer_normalized_id TEXT,
            buyer TEXT,
            buyer_address1 TEXT,
            buyer_address1_number TEXT,
            buyer_address2 TEXT,
            buyer_city TEXT,
            buyer_state TEXT,
            buyer_location TEXT,
            buyer_zip TEXT,
            buyer_phone TEXT,
            buyer_email TEXT,
            raw_data TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (shipment_id, tracking_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pre_alerta_tracking ON pre_alerta_records(tracking_number)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_pre_ruteo_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pre_ruteo_records (
            id TEXT PRIMARY KEY,
            shipment_id TEXT NOT NULL REFERENCES shipments(id) ON DELETE CASCADE,
            codigo_cliente TEXT,
            razon_social TEXT,
            domicilio TEXT,
            tipo_cliente TEXT,
            fecha_reparto TEXT,
            codigo_reparto TEXT,
            maquina TEXT,
            chofer TEXT,
            fecha_pedido TEXT,
            codigo_pedido TEXT NOT NULL,
            ventana_horaria TEXT,
            arribo TEXT,
            partida TEXT,
            peso_kg REAL,
            volumen_m3 REAL,
            dinero REAL,
            raw_data TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (shipment_id, codigo_pedido)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pre_ruteo_pedido ON pre_ruteo_records(codigo_pedido)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the scanned_packages table
///
/// The UNIQUE (shipment_id, tracking_number) pair is the scan idempotency
/// guarantee: a duplicate scan can never insert a second row, so outcome
/// counts cannot double.
async fn create_scanned_packages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scanned_packages (
            id TEXT PRIMARY KEY,
            shipment_id TEXT NOT NULL REFERENCES shipments(id) ON DELETE CASCADE,
            tracking_number TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('OK', 'SOBRANTE', 'FUERA_COBERTURA', 'PREVIO')),
            scanned_at TEXT NOT NULL,
            scanned_by TEXT NOT NULL,
            UNIQUE (shipment_id, tracking_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_scanned_status ON scanned_packages(shipment_id, status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_clasificacion_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clasificacion_archivos (
            id TEXT PRIMARY KEY,
            shipment_id TEXT NOT NULL REFERENCES shipments(id) ON DELETE CASCADE,
            provider_id TEXT NOT NULL REFERENCES providers(id),
            total_rows INTEGER NOT NULL DEFAULT 0,
            uploaded_by TEXT NOT NULL,
            uploaded_at TEXT NOT NULL,
            finalizado INTEGER NOT NULL DEFAULT 0 CHECK (finalizado IN (0, 1)),
            finalizado_at TEXT,
            finalizado_por TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_clasificacion_shipment ON clasificacion_archivos(shipment_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS paquetes_clasificacion (
            id TEXT PRIMARY KEY,
            clasificacion_id TEXT NOT NULL REFERENCES clasificacion_archivos(id) ON DELETE CASCADE,
            tracking_number TEXT NOT NULL,
            vehiculo TEXT NOT NULL,
            orden_visita TEXT NOT NULL,
            orden_numerico INTEGER NOT NULL,
            escaneado INTEGER NOT NULL DEFAULT 0 CHECK (escaneado IN (0, 1)),
            escaneado_at TEXT,
            escaneado_por TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_paq_clas_tracking ON paquetes_clasificacion(clasificacion_id, tracking_number)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_paq_clas_vehiculo ON paquetes_clasificacion(clasificacion_id, vehiculo, orden_numerico)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
