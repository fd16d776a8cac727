use crate::config::CommitMode;
use crate::error::{EtlError, Result};
use crate::rows::{HoaRow, NormalizedBatch, PropertyRow, RecordKey, RehabRow, ValuationRow};
use rusqlite::{params, Connection, Transaction};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS properties (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    property_title TEXT, street_address TEXT, city TEXT, state TEXT, zip_code TEXT,
    property_type TEXT, sqft_basement REAL, sqft_mu REAL, sqft_total REAL,
    year_built REAL, bedrooms REAL, bathrooms REAL, parking TEXT, layout TEXT,
    highway TEXT, train TEXT, water TEXT, sewage TEXT, pool TEXT, commercial TEXT,
    htw TEXT, tax_rate REAL, taxes REAL, net_yield REAL, irr REAL,
    rent_restricted TEXT, neighborhood_rating REAL, latitude REAL, longitude REAL,
    subdivision TEXT, selling_reason TEXT, seller_retained_broker TEXT,
    final_reviewer TEXT, school_average REAL, reviewed_status TEXT,
    most_recent_status TEXT, source TEXT, market TEXT, occupancy TEXT, flood TEXT
);
CREATE TABLE IF NOT EXISTS hoa (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    property_id INTEGER REFERENCES properties(id),
    hoa_fee REAL,
    hoa_flag TEXT
);
CREATE TABLE IF NOT EXISTS rehab_estimates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    property_id INTEGER REFERENCES properties(id),
    underwriting_rehab REAL, rehab_calculation REAL,
    paint TEXT, flooring_flag TEXT, foundation_flag TEXT, roof_flag TEXT,
    hvac_flag TEXT, kitchen_flag TEXT, bathroom_flag TEXT, appliances_flag TEXT,
    windows_flag TEXT, landscaping_flag TEXT, trashout_flag TEXT
);
CREATE TABLE IF NOT EXISTS valuations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    property_id INTEGER REFERENCES properties(id),
    list_price REAL, previous_rent REAL, arv REAL, rent_zestimate REAL,
    low_fmr REAL, high_fmr REAL, redfin_value REAL, zestimate REAL, expected_rent REAL
);
"#;

/// Row counts persisted by a load pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub properties: usize,
    pub hoa: usize,
    pub rehab: usize,
    pub valuations: usize,
}

/// Persists a normalized batch. Owns the database connection for the run;
/// dropping the loader closes it on every exit path.
pub struct Loader {
    conn: Connection,
    commit_mode: CommitMode,
}

impl Loader {
    pub fn connect(path: &Path, commit_mode: CommitMode) -> Result<Self> {
        let conn = Connection::open(path).map_err(EtlError::Connection)?;
        info!(path = %path.display(), "Connected to database");
        Ok(Self::new(conn, commit_mode))
    }

    pub fn new(conn: Connection, commit_mode: CommitMode) -> Self {
        Self { conn, commit_mode }
    }

    /// Creates the four destination tables if they do not exist.
    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA_DDL)
            .map_err(load_err("schema"))
    }

    /// Loads the batch: properties first (capturing each row's assigned
    /// identity), then the child tables with `property_id` resolved through
    /// the identity map. Transaction scope depends on the commit mode.
    pub fn load(&mut self, batch: &NormalizedBatch) -> Result<LoadReport> {
        match self.commit_mode {
            CommitMode::PerTable => self.load_per_table(batch),
            CommitMode::AllOrNothing => self.load_all_or_nothing(batch),
        }
    }

    /// Each table commits on its own. A failure rolls back only the open
    /// transaction; tables committed earlier stay persisted and the run
    /// halts where it is.
    fn load_per_table(&mut self, batch: &NormalizedBatch) -> Result<LoadReport> {
        let tx = self.conn.transaction().map_err(load_err("properties"))?;
        let identities = insert_properties(&tx, &batch.properties)?;
        tx.commit().map_err(load_err("properties"))?;
        info!(count = batch.properties.len(), "Inserted properties");

        let tx = self.conn.transaction().map_err(load_err("hoa"))?;
        insert_hoa(&tx, &batch.hoa, &identities)?;
        tx.commit().map_err(load_err("hoa"))?;
        info!(count = batch.hoa.len(), "Inserted HOA records");

        let tx = self.conn.transaction().map_err(load_err("rehab_estimates"))?;
        insert_rehab(&tx, &batch.rehab, &identities)?;
        tx.commit().map_err(load_err("rehab_estimates"))?;
        info!(count = batch.rehab.len(), "Inserted rehab estimates");

        let tx = self.conn.transaction().map_err(load_err("valuations"))?;
        insert_valuations(&tx, &batch.valuations, &identities)?;
        tx.commit().map_err(load_err("valuations"))?;
        info!(count = batch.valuations.len(), "Inserted valuations");

        Ok(report_for(batch))
    }

    /// One transaction spans all four tables; any failure rolls back the
    /// whole batch.
    fn load_all_or_nothing(&mut self, batch: &NormalizedBatch) -> Result<LoadReport> {
        let tx = self.conn.transaction().map_err(load_err("properties"))?;

        let identities = insert_properties(&tx, &batch.properties)?;
        insert_hoa(&tx, &batch.hoa, &identities)?;
        insert_rehab(&tx, &batch.rehab, &identities)?;
        insert_valuations(&tx, &batch.valuations, &identities)?;

        tx.commit().map_err(load_err("properties"))?;
        info!(
            properties = batch.properties.len(),
            hoa = batch.hoa.len(),
            rehab = batch.rehab.len(),
            valuations = batch.valuations.len(),
            "Committed batch"
        );
        Ok(report_for(batch))
    }
}

fn report_for(batch: &NormalizedBatch) -> LoadReport {
    LoadReport {
        properties: batch.properties.len(),
        hoa: batch.hoa.len(),
        rehab: batch.rehab.len(),
        valuations: batch.valuations.len(),
    }
}

fn load_err(table: &'static str) -> impl Fn(rusqlite::Error) -> EtlError {
    move |source| EtlError::Load { table, source }
}

/// Inserts property rows in sequence order, recording the database-assigned
/// identity per record key as each row lands.
fn insert_properties(
    tx: &Transaction<'_>,
    rows: &[PropertyRow],
) -> Result<HashMap<RecordKey, i64>> {
    let mut stmt = tx
        .prepare(
            "INSERT INTO properties (
                property_title, street_address, city, state, zip_code, property_type,
                sqft_basement, sqft_mu, sqft_total, year_built, bedrooms, bathrooms,
                parking, layout, highway, train, water, sewage, pool, commercial,
                htw, tax_rate, taxes, net_yield, irr, rent_restricted, neighborhood_rating,
                latitude, longitude, subdivision, selling_reason, seller_retained_broker,
                final_reviewer, school_average, reviewed_status, most_recent_status,
                source, market, occupancy, flood
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                      ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28,
                      ?29, ?30, ?31, ?32, ?33, ?34, ?35, ?36, ?37, ?38, ?39, ?40)",
        )
        .map_err(load_err("properties"))?;

    let mut identities = HashMap::with_capacity(rows.len());
    for row in rows {
        stmt.execute(params![
            row.property_title,
            row.street_address,
            row.city,
            row.state,
            row.zip,
            row.property_type,
            row.sqft_basement,
            row.sqft_mu,
            row.sqft_total,
            row.year_built,
            row.bedrooms,
            row.bathrooms,
            row.parking,
            row.layout,
            row.highway,
            row.train,
            row.water,
            row.sewage,
            row.pool,
            row.commercial,
            row.htw,
            row.tax_rate,
            row.taxes,
            row.net_yield,
            row.irr,
            row.rent_restricted,
            row.neighborhood_rating,
            row.latitude,
            row.longitude,
            row.subdivision,
            row.selling_reason,
            row.seller_retained_broker,
            row.final_reviewer,
            row.school_average,
            row.reviewed_status,
            row.most_recent_status,
            row.source,
            row.market,
            row.occupancy,
            row.flood,
        ])
        .map_err(load_err("properties"))?;
        identities.insert(row.record_key, tx.last_insert_rowid());
    }
    Ok(identities)
}

fn insert_hoa(
    tx: &Transaction<'_>,
    rows: &[HoaRow],
    identities: &HashMap<RecordKey, i64>,
) -> Result<()> {
    let mut stmt = tx
        .prepare("INSERT INTO hoa (property_id, hoa_fee, hoa_flag) VALUES (?1, ?2, ?3)")
        .map_err(load_err("hoa"))?;
    for row in rows {
        // Unresolved keys persist with a null foreign key, never dropped.
        let property_id = identities.get(&row.record_key).copied();
        stmt.execute(params![property_id, row.hoa_fee, row.hoa_flag])
            .map_err(load_err("hoa"))?;
    }
    Ok(())
}

fn insert_rehab(
    tx: &Transaction<'_>,
    rows: &[RehabRow],
    identities: &HashMap<RecordKey, i64>,
) -> Result<()> {
    let mut stmt = tx
        .prepare(
            "INSERT INTO rehab_estimates (
                property_id, underwriting_rehab, rehab_calculation, paint,
                flooring_flag, foundation_flag, roof_flag, hvac_flag,
                kitchen_flag, bathroom_flag, appliances_flag, windows_flag,
                landscaping_flag, trashout_flag
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .map_err(load_err("rehab_estimates"))?;
    for row in rows {
        let property_id = identities.get(&row.record_key).copied();
        stmt.execute(params![
            property_id,
            row.underwriting_rehab,
            row.rehab_calculation,
            row.paint,
            row.flooring_flag,
            row.foundation_flag,
            row.roof_flag,
            row.hvac_flag,
            row.kitchen_flag,
            row.bathroom_flag,
            row.appliances_flag,
            row.windows_flag,
            row.landscaping_flag,
            row.trashout_flag,
        ])
        .map_err(load_err("rehab_estimates"))?;
    }
    Ok(())
}

fn insert_valuations(
    tx: &Transaction<'_>,
    rows: &[ValuationRow],
    identities: &HashMap<RecordKey, i64>,
) -> Result<()> {
    let mut stmt = tx
        .prepare(
            "INSERT INTO valuations (
                property_id, list_price, previous_rent, arv, rent_zestimate,
                low_fmr, high_fmr, redfin_value, zestimate, expected_rent
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .map_err(load_err("valuations"))?;
    for row in rows {
        let property_id = identities.get(&row.record_key).copied();
        stmt.execute(params![
            property_id,
            row.list_price,
            row.previous_rent,
            row.arv,
            row.rent_zestimate,
            row.low_fmr,
            row.high_fmr,
            row.redfin_value,
            row.zestimate,
            row.expected_rent,
        ])
        .map_err(load_err("valuations"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader(commit_mode: CommitMode) -> Loader {
        let conn = Connection::open_in_memory().unwrap();
        let loader = Loader::new(conn, commit_mode);
        loader.init_schema().unwrap();
        loader
    }

    fn property(record_key: RecordKey, address: &str) -> PropertyRow {
        PropertyRow {
            record_key,
            street_address: Some(address.to_string()),
            ..PropertyRow::default()
        }
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn child_rows_resolve_to_parent_identity() {
        let mut loader = loader(CommitMode::PerTable);
        let batch = NormalizedBatch {
            properties: vec![property(0, "1 Main St"), property(1, "2 Oak Ave")],
            hoa: vec![HoaRow {
                record_key: 0,
                hoa_fee: Some(100.0),
                hoa_flag: Some("Yes".to_string()),
            }],
            rehab: vec![],
            valuations: vec![ValuationRow {
                record_key: 1,
                list_price: Some(250000.0),
                ..ValuationRow::default()
            }],
        };

        let report = loader.load(&batch).unwrap();
        assert_eq!(
            report,
            LoadReport {
                properties: 2,
                hoa: 1,
                rehab: 0,
                valuations: 1
            }
        );

        let first_id: i64 = loader
            .conn
            .query_row(
                "SELECT id FROM properties WHERE street_address = '1 Main St'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        let hoa_parent: i64 = loader
            .conn
            .query_row("SELECT property_id FROM hoa", [], |r| r.get(0))
            .unwrap();
        assert_eq!(hoa_parent, first_id);

        let second_id: i64 = loader
            .conn
            .query_row(
                "SELECT id FROM properties WHERE street_address = '2 Oak Ave'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        let valuation_parent: i64 = loader
            .conn
            .query_row("SELECT property_id FROM valuations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(valuation_parent, second_id);
    }

    #[test]
    fn unresolved_key_persists_with_null_foreign_key() {
        let mut loader = loader(CommitMode::PerTable);
        let batch = NormalizedBatch {
            properties: vec![],
            hoa: vec![HoaRow {
                record_key: 7,
                hoa_fee: Some(50.0),
                hoa_flag: None,
            }],
            rehab: vec![],
            valuations: vec![],
        };

        loader.load(&batch).unwrap();

        let (property_id, fee): (Option<i64>, f64) = loader
            .conn
            .query_row("SELECT property_id, hoa_fee FROM hoa", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(property_id, None);
        assert_eq!(fee, 50.0);
    }

    #[test]
    fn failed_property_insert_rolls_back_the_whole_table() {
        // Pre-create the table with a uniqueness constraint so the second
        // insert fails mid-transaction; init_schema's IF NOT EXISTS keeps it.
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE properties (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                property_title TEXT, street_address TEXT UNIQUE, city TEXT, state TEXT,
                zip_code TEXT, property_type TEXT, sqft_basement REAL, sqft_mu REAL,
                sqft_total REAL, year_built REAL, bedrooms REAL, bathrooms REAL,
                parking TEXT, layout TEXT, highway TEXT, train TEXT, water TEXT,
                sewage TEXT, pool TEXT, commercial TEXT, htw TEXT, tax_rate REAL,
                taxes REAL, net_yield REAL, irr REAL, rent_restricted TEXT,
                neighborhood_rating REAL, latitude REAL, longitude REAL, subdivision TEXT,
                selling_reason TEXT, seller_retained_broker TEXT, final_reviewer TEXT,
                school_average REAL, reviewed_status TEXT, most_recent_status TEXT,
                source TEXT, market TEXT, occupancy TEXT, flood TEXT
            );",
        )
        .unwrap();
        let mut loader = Loader::new(conn, CommitMode::PerTable);
        loader.init_schema().unwrap();

        let batch = NormalizedBatch {
            properties: vec![property(0, "1 Main St"), property(1, "1 Main St")],
            ..NormalizedBatch::default()
        };

        let err = loader.load(&batch).unwrap_err();
        assert!(matches!(
            err,
            EtlError::Load {
                table: "properties",
                ..
            }
        ));
        // The open transaction rolled back; nothing half-committed.
        assert_eq!(count(&loader.conn, "properties"), 0);
    }

    #[test]
    fn per_table_mode_keeps_earlier_commits_after_a_child_failure() {
        let mut loader = loader(CommitMode::PerTable);
        // Sabotage the hoa table after schema init so its insert fails.
        loader.conn.execute_batch("DROP TABLE hoa;").unwrap();

        let batch = NormalizedBatch {
            properties: vec![property(0, "1 Main St")],
            hoa: vec![HoaRow {
                record_key: 0,
                hoa_fee: None,
                hoa_flag: None,
            }],
            ..NormalizedBatch::default()
        };

        let err = loader.load(&batch).unwrap_err();
        assert!(matches!(err, EtlError::Load { table: "hoa", .. }));
        // Properties committed before the failure remain persisted.
        assert_eq!(count(&loader.conn, "properties"), 1);
    }

    #[test]
    fn all_or_nothing_mode_rolls_back_everything() {
        let mut loader = loader(CommitMode::AllOrNothing);
        loader.conn.execute_batch("DROP TABLE hoa;").unwrap();

        let batch = NormalizedBatch {
            properties: vec![property(0, "1 Main St")],
            hoa: vec![HoaRow {
                record_key: 0,
                hoa_fee: None,
                hoa_flag: None,
            }],
            ..NormalizedBatch::default()
        };

        assert!(loader.load(&batch).is_err());
        assert_eq!(count(&loader.conn, "properties"), 0);
    }

    #[test]
    fn identities_are_assigned_in_sequence_order() {
        let mut loader = loader(CommitMode::PerTable);
        let batch = NormalizedBatch {
            properties: vec![
                property(0, "1 Main St"),
                property(1, "2 Oak Ave"),
                property(2, "3 Pine Rd"),
            ],
            ..NormalizedBatch::default()
        };
        loader.load(&batch).unwrap();

        let addresses: Vec<String> = loader
            .conn
            .prepare("SELECT street_address FROM properties ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(addresses, vec!["1 Main St", "2 Oak Ave", "3 Pine Rd"]);
    }
}
