use crate::models::{ListingRow, ReviewRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, Row};
use tracing::debug;
use uuid::Uuid;

use wanderworld_types::api::{NewListing, NewReview};
use wanderworld_types::models::{
    DEFAULT_IMAGE_FILENAME, GeoPoint, Image, Listing, ListingDetail, Review, User,
};

/// The unique account column a new user collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakenField {
    Username,
    Email,
}

const LISTING_COLUMNS: &str = "id, title, description, price, location, country, image_url, \
     image_filename, geometry_lng, geometry_lat, owner_id, created_at";

impl Database {
    // -- Users --

    /// Inserts a user. Returns the taken field instead of an error when the
    /// username or email is already registered.
    pub fn create_user(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<TakenField>> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id.to_string(), username, email, password_hash),
            );
            match inserted {
                Ok(_) => Ok(None),
                Err(rusqlite::Error::SqliteFailure(err, Some(msg)))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    if msg.contains("users.username") {
                        Ok(Some(TakenField::Username))
                    } else if msg.contains("users.email") {
                        Ok(Some(TakenField::Email))
                    } else {
                        Err(anyhow::anyhow!("user insert rejected: {}", msg))
                    }
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Returns the row (including the password hash) for credential checks.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))?
            .map(UserRow::into_user)
            .transpose()
    }

    // -- Listings --

    pub fn insert_listing(
        &self,
        id: Uuid,
        owner: Uuid,
        listing: &NewListing,
        geometry: Option<GeoPoint>,
    ) -> Result<()> {
        let image = listing
            .image_url
            .clone()
            .map(|url| Image {
                url,
                filename: DEFAULT_IMAGE_FILENAME.to_string(),
            })
            .unwrap_or_default();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO listings (id, title, description, price, location, country,
                                       image_url, image_filename, geometry_lng, geometry_lat, owner_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    id.to_string(),
                    listing.title,
                    listing.description,
                    listing.price,
                    listing.location,
                    listing.country,
                    image.url,
                    image.filename,
                    geometry.map(|g| g.lng),
                    geometry.map(|g| g.lat),
                    owner.to_string(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_listings(&self) -> Result<Vec<Listing>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LISTING_COLUMNS} FROM listings ORDER BY created_at, rowid"
            ))?;
            let rows = stmt
                .query_map([], listing_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter().map(ListingRow::into_listing).collect()
    }

    pub fn get_listing(&self, id: Uuid) -> Result<Option<Listing>> {
        self.with_conn(|conn| query_listing(conn, id))?
            .map(ListingRow::into_listing)
            .transpose()
    }

    /// The listing with its owner's name and its reviews, oldest first.
    pub fn get_listing_detail(&self, id: Uuid) -> Result<Option<ListingDetail>> {
        let found = self.with_conn(|conn| {
            let Some(row) = query_listing(conn, id)? else {
                return Ok(None);
            };

            let owner_username: Option<String> = match row.owner_id.as_deref() {
                Some(owner) => conn
                    .query_row("SELECT username FROM users WHERE id = ?1", [owner], |r| r.get(0))
                    .optional()?,
                None => None,
            };

            let reviews = query_reviews_for_listing(conn, id)?;
            Ok(Some((row, owner_username, reviews)))
        })?;

        let Some((row, owner_username, reviews)) = found else {
            return Ok(None);
        };

        Ok(Some(ListingDetail {
            listing: row.into_listing()?,
            owner_username,
            reviews: reviews
                .into_iter()
                .map(ReviewRow::into_review)
                .collect::<Result<Vec<_>>>()?,
        }))
    }

    /// Rewrites the editable fields of a listing. The owner is never touched;
    /// a missing image URL keeps the current image.
    pub fn update_listing(
        &self,
        id: Uuid,
        listing: &NewListing,
        geometry: Option<GeoPoint>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE listings
                 SET title = ?2, description = ?3, price = ?4, location = ?5, country = ?6,
                     image_url = COALESCE(?7, image_url),
                     geometry_lng = ?8, geometry_lat = ?9
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    listing.title,
                    listing.description,
                    listing.price,
                    listing.location,
                    listing.country,
                    listing.image_url,
                    geometry.map(|g| g.lng),
                    geometry.map(|g| g.lat),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes a listing and every review attached to it in one transaction.
    /// Returns false when the listing did not exist.
    pub fn delete_listing(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let id = id.to_string();
            let reviews = tx.execute("DELETE FROM reviews WHERE listing_id = ?1", [&id])?;
            let listings = tx.execute("DELETE FROM listings WHERE id = ?1", [&id])?;
            tx.commit()?;

            debug!("Deleted listing {} with {} reviews", id, reviews);
            Ok(listings > 0)
        })
    }

    pub fn listings_without_geometry(&self) -> Result<Vec<Listing>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LISTING_COLUMNS} FROM listings
                 WHERE geometry_lng IS NULL OR geometry_lat IS NULL
                 ORDER BY created_at, rowid"
            ))?;
            let rows = stmt
                .query_map([], listing_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter().map(ListingRow::into_listing).collect()
    }

    pub fn set_listing_geometry(&self, id: Uuid, point: GeoPoint) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE listings SET geometry_lng = ?2, geometry_lat = ?3 WHERE id = ?1",
                rusqlite::params![id.to_string(), point.lng, point.lat],
            )?;
            Ok(())
        })
    }

    // -- Reviews --

    pub fn insert_review(
        &self,
        id: Uuid,
        listing_id: Uuid,
        author: Uuid,
        review: &NewReview,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reviews (id, listing_id, author_id, rating, comment)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    id.to_string(),
                    listing_id.to_string(),
                    author.to_string(),
                    review.rating,
                    review.comment,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_review(&self, id: Uuid) -> Result<Option<Review>> {
        let row = self.with_conn(|conn| {
            conn.query_row(
                "SELECT r.id, r.listing_id, r.author_id, u.username, r.rating, r.comment, r.created_at
                 FROM reviews r
                 LEFT JOIN users u ON r.author_id = u.id
                 WHERE r.id = ?1",
                [id.to_string()],
                review_row,
            )
            .optional()
        })?;

        row.map(ReviewRow::into_review).transpose()
    }

    /// Removes a review from its listing. Returns false when no review with
    /// that id belongs to the listing.
    pub fn delete_review(&self, listing_id: Uuid, review_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM reviews WHERE id = ?1 AND listing_id = ?2",
                [review_id.to_string(), listing_id.to_string()],
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn count_reviews_for_listing(&self, listing_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM reviews WHERE listing_id = ?1",
                [listing_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(usize::try_from(count)?)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, email, password, created_at FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_listing(conn: &Connection, id: Uuid) -> Result<Option<ListingRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = ?1"))?;
    stmt.query_row([id.to_string()], listing_row).optional()
}

fn query_reviews_for_listing(conn: &Connection, listing_id: Uuid) -> Result<Vec<ReviewRow>> {
    // JOIN users to fetch author usernames in a single query
    let mut stmt = conn.prepare(
        "SELECT r.id, r.listing_id, r.author_id, u.username, r.rating, r.comment, r.created_at
         FROM reviews r
         LEFT JOIN users u ON r.author_id = u.id
         WHERE r.listing_id = ?1
         ORDER BY r.created_at, r.rowid",
    )?;

    let rows = stmt
        .query_map([listing_id.to_string()], review_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn listing_row(row: &Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        location: row.get(4)?,
        country: row.get(5)?,
        image_url: row.get(6)?,
        image_filename: row.get(7)?,
        geometry_lng: row.get(8)?,
        geometry_lat: row.get(9)?,
        owner_id: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn review_row(row: &Row<'_>) -> rusqlite::Result<ReviewRow> {
    Ok(ReviewRow {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row.get(3)?,
        rating: row.get(4)?,
        comment: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
