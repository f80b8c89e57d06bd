use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use crate::config::Config;
use crate::models::CarListing;

/// Named field values for an upsert. `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFields {
    pub title: Option<String>,
    pub price_usd: Option<i64>,
    pub odometer: Option<i64>,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub image_url: Option<String>,
    pub image_count: Option<String>,
    pub car_number: Option<String>,
    pub car_vin: Option<String>,
}

impl From<&CarListing> for ListingFields {
    fn from(listing: &CarListing) -> Self {
        Self {
            title: Some(listing.title.clone()),
            price_usd: Some(listing.price_usd),
            odometer: Some(listing.odometer),
            username: Some(listing.username.clone()),
            phone_number: Some(listing.phone_number.clone()),
            image_url: Some(listing.image_url.clone()),
            image_count: Some(listing.image_count.clone()),
            car_number: Some(listing.car_number.clone()),
            car_vin: Some(listing.car_vin.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Skipped,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub price_usd: Option<i64>,
    pub odometer: Option<i64>,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub image_url: Option<String>,
    pub image_count: Option<String>,
    pub car_number: Option<String>,
    pub car_vin: Option<String>,
    pub found_at: chrono::DateTime<Utc>,
}

/// Listing store. Every call opens its own connection and closes it when done.
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn open(config: &Config) -> Result<Self> {
        tracing::debug!(
            "Using database '{}' on {} as {}",
            config.db_name, config.db_host, config.db_user
        );
        if !config.db_password.is_empty() {
            tracing::debug!("SQLite has no accounts, the database password is not used");
        }
        Self::open_at(config.database_file())
    }

    /// Create the database directory and the schema if they are missing
    fn open_at(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let db = Database { path };
        db.init_schema()?;
        Ok(db)
    }

    #[cfg(test)]
    pub fn open_temporary() -> Result<Self> {
        let path = std::env::temp_dir().join(format!("ria_cars_{}.db", Uuid::new_v4()));
        Self::open_at(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path)
            .with_context(|| format!("Failed to open database at {}", self.path.display()))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS used_cars_info (
                id BLOB PRIMARY KEY NOT NULL,
                url TEXT NOT NULL UNIQUE,
                title TEXT,
                price_usd INTEGER,
                odometer INTEGER,
                username TEXT,
                phone_number TEXT,
                image_url TEXT,
                image_count TEXT,
                car_number TEXT,
                car_vin TEXT,
                found_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_used_cars_url ON used_cars_info(url)",
            [],
        )?;

        Ok(())
    }

    /// Insert a listing keyed by `url`, or overwrite the supplied fields of the existing one.
    /// `found_at` is only written on insert.
    pub fn upsert(&self, url: &str, fields: &ListingFields) -> Result<UpsertOutcome> {
        if url.is_empty() {
            tracing::info!("There is no car url. Skipping...");
            return Ok(UpsertOutcome::Skipped);
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let existing: Option<Uuid> = tx
            .query_row(
                "SELECT id FROM used_cars_info WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE used_cars_info SET
                        title = COALESCE(?2, title),
                        price_usd = COALESCE(?3, price_usd),
                        odometer = COALESCE(?4, odometer),
                        username = COALESCE(?5, username),
                        phone_number = COALESCE(?6, phone_number),
                        image_url = COALESCE(?7, image_url),
                        image_count = COALESCE(?8, image_count),
                        car_number = COALESCE(?9, car_number),
                        car_vin = COALESCE(?10, car_vin)
                     WHERE id = ?1",
                    params![
                        id,
                        &fields.title,
                        fields.price_usd,
                        fields.odometer,
                        &fields.username,
                        &fields.phone_number,
                        &fields.image_url,
                        &fields.image_count,
                        &fields.car_number,
                        &fields.car_vin,
                    ],
                )?;
                tracing::debug!("Updated listing {} ({})", id, url);
                UpsertOutcome::Updated
            }
            None => {
                let id = Uuid::new_v4();
                tx.execute(
                    "INSERT INTO used_cars_info (
                        id, url, title, price_usd, odometer, username, phone_number,
                        image_url, image_count, car_number, car_vin, found_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        id,
                        url,
                        &fields.title,
                        fields.price_usd,
                        fields.odometer,
                        &fields.username,
                        &fields.phone_number,
                        &fields.image_url,
                        &fields.image_count,
                        &fields.car_number,
                        &fields.car_vin,
                        Utc::now(),
                    ],
                )?;
                tracing::debug!("Inserted listing {} ({})", id, url);
                UpsertOutcome::Inserted
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    /// Store every field of a scraped listing
    pub fn upsert_listing(&self, listing: &CarListing) -> Result<UpsertOutcome> {
        self.upsert(&listing.url, &ListingFields::from(listing))
    }

    #[cfg(test)]
    pub fn get_listing_by_url(&self, url: &str) -> Result<Option<ListingRecord>> {
        let record = self
            .connect()?
            .query_row(
                "SELECT id, url, title, price_usd, odometer, username, phone_number,
                        image_url, image_count, car_number, car_vin, found_at
                 FROM used_cars_info WHERE url = ?1",
                params![url],
                |row| {
                    Ok(ListingRecord {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        title: row.get(2)?,
                        price_usd: row.get(3)?,
                        odometer: row.get(4)?,
                        username: row.get(5)?,
                        phone_number: row.get(6)?,
                        image_url: row.get(7)?,
                        image_count: row.get(8)?,
                        car_number: row.get(9)?,
                        car_vin: row.get(10)?,
                        found_at: row.get(11)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    pub fn count_listings(&self) -> Result<usize> {
        let count: i64 = self.connect()?.query_row(
            "SELECT COUNT(*) FROM used_cars_info",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://auto.ria.com/uk/auto_bmw_x5_35000001.html";

    fn sample_listing(url: &str) -> CarListing {
        CarListing {
            url: url.to_string(),
            title: "BMW X5 2015".to_string(),
            price_usd: 25500,
            odometer: 150000,
            username: "Олександр".to_string(),
            phone_number: "(067) 111 11 11".to_string(),
            image_url: "https://cdn.riastatic.com/photos/auto/photo/bmw_x5.jpg".to_string(),
            image_count: "14".to_string(),
            car_number: "AA 1234 BB".to_string(),
            car_vin: "WBAKS410X00A12345".to_string(),
        }
    }

    #[test]
    fn test_insert_new_listing() {
        let db = Database::open_temporary().unwrap();

        let outcome = db.upsert_listing(&sample_listing(URL)).unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let record = db.get_listing_by_url(URL).unwrap().unwrap();
        assert_eq!(record.title.as_deref(), Some("BMW X5 2015"));
        assert_eq!(record.price_usd, Some(25500));
        assert_eq!(record.odometer, Some(150000));
        assert_eq!(record.car_vin.as_deref(), Some("WBAKS410X00A12345"));
        assert_eq!(db.count_listings().unwrap(), 1);
    }

    #[test]
    fn test_second_upsert_overwrites_and_keeps_found_at() {
        let db = Database::open_temporary().unwrap();

        db.upsert_listing(&sample_listing(URL)).unwrap();
        let first = db.get_listing_by_url(URL).unwrap().unwrap();

        let mut changed = sample_listing(URL);
        changed.title = "BMW X5 2015 xDrive".to_string();
        changed.price_usd = 23900;
        changed.car_number = String::new();

        let outcome = db.upsert_listing(&changed).unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let second = db.get_listing_by_url(URL).unwrap().unwrap();
        assert_eq!(db.count_listings().unwrap(), 1);
        assert_eq!(second.id, first.id);
        assert_eq!(second.found_at, first.found_at);
        assert_eq!(second.title.as_deref(), Some("BMW X5 2015 xDrive"));
        assert_eq!(second.price_usd, Some(23900));
        assert_eq!(second.car_number.as_deref(), Some(""));
    }

    #[test]
    fn test_unsupplied_fields_keep_their_value() {
        let db = Database::open_temporary().unwrap();
        db.upsert_listing(&sample_listing(URL)).unwrap();

        let fields = ListingFields {
            price_usd: Some(19999),
            ..Default::default()
        };
        db.upsert(URL, &fields).unwrap();

        let record = db.get_listing_by_url(URL).unwrap().unwrap();
        assert_eq!(record.price_usd, Some(19999));
        assert_eq!(record.title.as_deref(), Some("BMW X5 2015"));
        assert_eq!(record.username.as_deref(), Some("Олександр"));
    }

    #[test]
    fn test_insert_leaves_unsupplied_fields_null() {
        let db = Database::open_temporary().unwrap();

        let fields = ListingFields {
            title: Some("Audi A4".to_string()),
            ..Default::default()
        };
        db.upsert(URL, &fields).unwrap();

        let record = db.get_listing_by_url(URL).unwrap().unwrap();
        assert_eq!(record.title.as_deref(), Some("Audi A4"));
        assert_eq!(record.price_usd, None);
        assert_eq!(record.car_vin, None);
    }

    #[test]
    fn test_empty_url_is_a_no_op() {
        let db = Database::open_temporary().unwrap();
        db.upsert_listing(&sample_listing(URL)).unwrap();

        let outcome = db.upsert_listing(&sample_listing("")).unwrap();
        assert_eq!(outcome, UpsertOutcome::Skipped);
        assert_eq!(db.count_listings().unwrap(), 1);

        let record = db.get_listing_by_url(URL).unwrap().unwrap();
        assert_eq!(record.title.as_deref(), Some("BMW X5 2015"));
    }

    #[test]
    fn test_whitespace_url_is_stored() {
        let db = Database::open_temporary().unwrap();

        let outcome = db.upsert_listing(&sample_listing(" ")).unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert!(db.get_listing_by_url(" ").unwrap().is_some());
    }

    #[test]
    fn test_schema_creation_is_idempotent() {
        let db = Database::open_temporary().unwrap();
        db.init_schema().unwrap();
        assert_eq!(db.count_listings().unwrap(), 0);
    }

    #[test]
    fn test_each_upsert_is_committed_on_its_own() {
        let db = Database::open_temporary().unwrap();
        db.upsert_listing(&sample_listing(URL)).unwrap();

        // A second handle on the same file sees the row, so nothing was left uncommitted
        let reopened = Database::open_at(db.path().to_path_buf()).unwrap();
        assert_eq!(reopened.count_listings().unwrap(), 1);
        let record = reopened.get_listing_by_url(URL).unwrap().unwrap();
        assert_eq!(record.title.as_deref(), Some("BMW X5 2015"));
    }

    #[test]
    fn test_open_creates_the_database_under_db_host() {
        let host = std::env::temp_dir().join(format!("ria_cars_{}", Uuid::new_v4()));
        let config = Config {
            db_host: host.to_string_lossy().into_owned(),
            db_name: "cars".to_string(),
            ..Config::default()
        };

        let db = Database::open(&config).unwrap();
        assert_eq!(db.path(), host.join("cars.db").as_path());
        assert!(db.path().exists());
        assert_eq!(db.count_listings().unwrap(), 0);
    }
}
