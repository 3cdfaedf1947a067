//! [`SqliteStore`] — the SQLite implementation of [`PlatformStore`].
//!
//! Ledger mutations run their reads, guarded writes, and audit inserts
//! inside one `rusqlite` transaction per operation, all within a single
//! `conn.call` closure. Dropping the transaction on an error path rolls
//! everything back, so a failed guard leaves no trace.

use std::path::Path;

use chrono::{DateTime, Datelike, Timelike, Utc};
use rusqlite::{OptionalExtension as _, params, params_from_iter};
use uuid::Uuid;

use bursary_core::{
  Error as CoreError,
  admin::{
    AdminAction, Breakdown, DailyVolume, DonationAnalytics, PlatformStats,
    ReconcileReport, TopDonor, TopStudent, UserRecord, UserRole,
  },
  donation::{Donation, DonationStatus, DonationSummary, NewDonation},
  donor::{Donor, DonorDashboard, DonorProfileUpdate, NewDonor},
  export::ExportRow,
  ledger,
  money::Cents,
  query::{
    DonationPage, DonationQuery, DonationSort, SortDirection, StudentFacets,
    StudentPage, StudentQuery, StudentSort, StudentWithProgress, clamp_paging,
  },
  recurring::{NewRecurringDonation, RecurringDonation, RecurringUpdate},
  registry::{NewRegistryItem, RegistryItem, RegistryItemUpdate},
  store::{Credential, PlatformStore},
  student::{NewStudent, Student, StudentProfileUpdate},
  verification::{
    NewVerification, School, SchoolVerification, VerificationStats,
    VerificationStatus,
  },
};

use crate::{
  Error, Result,
  encode::{
    DONATION_COLUMNS, RawAdminAction, RawCredential, RawDonation,
    RawDonationRecord, RawDonor, RawRecurring, RawRegistryItem, RawSchool,
    RawStudent, RawUser, RawVerification, STUDENT_COLUMNS, decode_day,
    decode_uuid, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Bursary platform store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread, threading domain errors back out.
  /// `f` returns a full store [`Result`]; rusqlite failures convert into it
  /// via `?` inside the closure.
  async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── Small helpers ───────────────────────────────────────────────────────────

/// Human-quotable receipt identifier derived from the donation id.
fn receipt_number(donation_id: Uuid) -> String {
  format!(
    "BRS-{}",
    hex::encode(&donation_id.as_bytes()[..6]).to_uppercase()
  )
}

fn exists(
  conn: &rusqlite::Connection,
  sql: &str,
  id: &str,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(sql, params![id], |_| Ok(true))
      .optional()?
      .unwrap_or(false),
  )
}

fn require_student(conn: &rusqlite::Connection, id: Uuid) -> Result<()> {
  if !exists(conn, "SELECT 1 FROM students WHERE student_id = ?1", &encode_uuid(id))? {
    return Err(CoreError::StudentNotFound(id).into());
  }
  Ok(())
}

fn require_donor(conn: &rusqlite::Connection, id: Uuid) -> Result<()> {
  if !exists(conn, "SELECT 1 FROM donors WHERE donor_id = ?1", &encode_uuid(id))? {
    return Err(CoreError::DonorNotFound(id).into());
  }
  Ok(())
}

/// The SQL expression for a party's effective contribution: full amount for
/// completed donations, the unrefunded remainder for refunded ones. Used by
/// the dashboard, analytics, and reconciliation so all of them agree.
const EFFECTIVE_AMOUNT: &str =
  "CASE status WHEN 'completed' THEN amount \
   WHEN 'refunded' THEN amount - COALESCE(refund_amount, amount) \
   ELSE 0 END";

// ─── Transaction bodies ──────────────────────────────────────────────────────

fn insert_donation(conn: &rusqlite::Connection, d: &Donation) -> Result<()> {
  conn.execute(
    "INSERT INTO donations (
       donation_id, student_id, donor_id, amount, net_amount, status,
       donation_type, payment_method, target_registry_id, recurring_id,
       receipt_number, created_at, processed_at, refund_amount,
       refund_reason, refunded_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    params![
      encode_uuid(d.donation_id),
      encode_uuid(d.student_id),
      d.donor_id.map(encode_uuid),
      d.amount,
      d.net_amount,
      d.status.to_string(),
      d.donation_type.to_string(),
      d.payment_method.to_string(),
      d.target_registry_id.map(encode_uuid),
      d.recurring_id.map(encode_uuid),
      d.receipt_number,
      encode_dt(d.created_at),
      d.processed_at.map(encode_dt),
      d.refund_amount,
      d.refund_reason,
      d.refunded_at.map(encode_dt),
    ],
  )?;
  Ok(())
}

fn get_donation_row(
  conn: &rusqlite::Connection,
  donation_id: Uuid,
) -> Result<Donation> {
  let sql = format!("SELECT {DONATION_COLUMNS} FROM donations WHERE donation_id = ?1");
  let raw = conn
    .query_row(&sql, params![encode_uuid(donation_id)], |row| {
      RawDonation::from_row(row)
    })
    .optional()?
    .ok_or(CoreError::DonationNotFound(donation_id))?;
  raw.into_donation()
}

/// Recompute a donor's distinct-students count and impact score from the
/// current state of the ledger.
fn refresh_donor_summary(conn: &rusqlite::Connection, donor_id: Uuid) -> Result<()> {
  let id = encode_uuid(donor_id);
  let (total, supported): (i64, i64) = conn.query_row(
    "SELECT total_donated,
            (SELECT COUNT(DISTINCT student_id) FROM donations
              WHERE donor_id = ?1 AND status IN ('completed', 'refunded'))
       FROM donors WHERE donor_id = ?1",
    params![id],
    |row| Ok((row.get(0)?, row.get(1)?)),
  )?;
  conn.execute(
    "UPDATE donors SET students_supported = ?1, impact_score = ?2
      WHERE donor_id = ?3",
    params![supported, ledger::impact_score(total, supported), id],
  )?;
  Ok(())
}

/// Apply the balance side of a completed donation: student counter, donor
/// counters, and — when targeted — the guarded registry funding write.
/// Must run inside the transaction that finalises the donation row.
fn apply_completed(conn: &rusqlite::Connection, d: &Donation) -> Result<()> {
  let student_id = encode_uuid(d.student_id);

  let n = conn.execute(
    "UPDATE students
        SET amount_raised = amount_raised + ?1,
            total_donations = total_donations + 1
      WHERE student_id = ?2",
    params![d.amount, student_id],
  )?;
  if n == 0 {
    return Err(CoreError::StudentNotFound(d.student_id).into());
  }

  if let Some(donor_id) = d.donor_id {
    let n = conn.execute(
      "UPDATE donors SET total_donated = total_donated + ?1 WHERE donor_id = ?2",
      params![d.amount, encode_uuid(donor_id)],
    )?;
    if n == 0 {
      return Err(CoreError::DonorNotFound(donor_id).into());
    }
    refresh_donor_summary(conn, donor_id)?;
  }

  if let Some(item_id) = d.target_registry_id {
    fund_registry_item(conn, item_id, d.amount)?;
  }

  Ok(())
}

/// The sponsorship funding write. The UPDATE is conditional on the item
/// still accepting funds and the new total staying within the price, which
/// closes the race between two concurrent sponsors: the loser's guard
/// matches zero rows and the whole transaction aborts with a conflict.
fn fund_registry_item(
  conn: &rusqlite::Connection,
  item_id: Uuid,
  amount: Cents,
) -> Result<()> {
  let id = encode_uuid(item_id);

  let n = conn.execute(
    "UPDATE registry_items
        SET amount_funded = amount_funded + ?1
      WHERE item_id = ?2
        AND funded_status != 'funded'
        AND amount_funded + ?1 <= price",
    params![amount, id],
  )?;

  if n == 0 {
    let row: Option<String> = conn
      .query_row(
        "SELECT funded_status FROM registry_items WHERE item_id = ?1",
        params![id],
        |r| r.get(0),
      )
      .optional()?;
    return Err(
      match row.as_deref() {
        None => CoreError::RegistryItemNotFound(item_id),
        Some("funded") => CoreError::RegistryClosed(item_id),
        Some(_) => {
          CoreError::Conflict("sponsorship would overfund the item".into())
        }
      }
      .into(),
    );
  }

  let (funded, price): (Cents, Cents) = conn.query_row(
    "SELECT amount_funded, price FROM registry_items WHERE item_id = ?1",
    params![id],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;
  conn.execute(
    "UPDATE registry_items SET funded_status = ?1 WHERE item_id = ?2",
    params![ledger::funded_status(funded, price).to_string(), id],
  )?;
  Ok(())
}

fn insert_admin_action(
  conn: &rusqlite::Connection,
  admin_id: Uuid,
  action: &str,
  target_id: Uuid,
  detail: Option<String>,
) -> Result<()> {
  conn.execute(
    "INSERT INTO admin_actions (action_id, admin_id, action, target_id, detail, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      encode_uuid(Uuid::new_v4()),
      encode_uuid(admin_id),
      action,
      encode_uuid(target_id),
      detail,
      encode_dt(Utc::now()),
    ],
  )?;
  Ok(())
}

fn get_verification_row(
  conn: &rusqlite::Connection,
  verification_id: Uuid,
) -> Result<SchoolVerification> {
  let raw = conn
    .query_row(
      "SELECT verification_id, student_id, school_id, document_url, status,
              rejection_reason, submitted_at, reviewed_at
         FROM school_verifications WHERE verification_id = ?1",
      params![encode_uuid(verification_id)],
      |row| RawVerification::from_row(row),
    )
    .optional()?
    .ok_or(CoreError::VerificationNotFound(verification_id))?;
  raw.into_verification()
}

// ─── PlatformStore impl ──────────────────────────────────────────────────────

impl PlatformStore for SqliteStore {
  type Error = Error;

  // ── Donors ────────────────────────────────────────────────────────────

  async fn add_donor(&self, input: NewDonor) -> Result<Donor> {
    let donor = Donor {
      donor_id:           Uuid::new_v4(),
      name:               input.name,
      email:              input.email,
      total_donated:      0,
      students_supported: 0,
      impact_score:       0,
      is_active:          true,
      created_at:         Utc::now(),
    };

    let d = donor.clone();
    self
      .with_conn(move |conn| {
        conn.execute(
          "INSERT INTO donors (donor_id, name, email, total_donated,
             students_supported, impact_score, is_active, created_at)
           VALUES (?1, ?2, ?3, 0, 0, 0, 1, ?4)",
          params![
            encode_uuid(d.donor_id),
            d.name,
            d.email,
            encode_dt(d.created_at)
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(donor)
  }

  async fn get_donor(&self, id: Uuid) -> Result<Option<Donor>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawDonor> = self
      .with_conn(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT donor_id, name, email, total_donated,
                      students_supported, impact_score, is_active, created_at
                 FROM donors WHERE donor_id = ?1",
              params![id_str],
              |row| {
                Ok(RawDonor {
                  donor_id:           row.get(0)?,
                  name:               row.get(1)?,
                  email:              row.get(2)?,
                  total_donated:      row.get(3)?,
                  students_supported: row.get(4)?,
                  impact_score:       row.get(5)?,
                  is_active:          row.get(6)?,
                  created_at:         row.get(7)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDonor::into_donor).transpose()
  }

  async fn update_donor_profile(
    &self,
    id: Uuid,
    update: DonorProfileUpdate,
  ) -> Result<Donor> {
    self
      .with_conn(move |conn| {
        let id_str = encode_uuid(id);
        let n = conn.execute(
          "UPDATE donors
              SET name  = COALESCE(?1, name),
                  email = COALESCE(?2, email)
            WHERE donor_id = ?3",
          params![update.name, update.email, id_str],
        )?;
        if n == 0 {
          return Err(CoreError::DonorNotFound(id).into());
        }
        Ok(())
      })
      .await?;

    self.get_donor(id).await?.ok_or(CoreError::DonorNotFound(id).into())
  }

  async fn donor_dashboard(&self, id: Uuid) -> Result<DonorDashboard> {
    let month_start = {
      let now = Utc::now();
      encode_dt(
        now
          .with_day(1)
          .and_then(|d| d.with_hour(0))
          .and_then(|d| d.with_minute(0))
          .and_then(|d| d.with_second(0))
          .and_then(|d| d.with_nanosecond(0))
          .unwrap_or(now),
      )
    };

    self
      .with_conn(move |conn| {
        require_donor(conn, id)?;
        let id_str = encode_uuid(id);

        let sql = format!(
          "SELECT COALESCE(SUM({EFFECTIVE_AMOUNT}), 0),
                  COUNT(*),
                  COUNT(DISTINCT student_id)
             FROM donations
            WHERE donor_id = ?1 AND status IN ('completed', 'refunded')"
        );
        let (total, count, supported): (Cents, i64, i64) =
          conn.query_row(&sql, params![id_str], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
          })?;

        let active_recurring: i64 = conn.query_row(
          "SELECT COUNT(*) FROM recurring_donations
            WHERE donor_id = ?1 AND active = 1",
          params![id_str],
          |row| row.get(0),
        )?;

        let this_month: Cents = conn.query_row(
          "SELECT COALESCE(SUM(amount), 0) FROM donations
            WHERE donor_id = ?1 AND status = 'completed'
              AND processed_at >= ?2",
          params![id_str, month_start],
          |row| row.get(0),
        )?;

        let mut stmt = conn.prepare("SELECT total_donated FROM donors")?;
        let all_totals = stmt
          .query_map([], |row| row.get::<_, Cents>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(DonorDashboard {
          total_donated: total,
          students_supported: supported,
          impact_score: ledger::impact_score(total, supported),
          donation_count: count,
          active_recurring,
          community_rank: ledger::community_rank(total, &all_totals),
          this_month,
        })
      })
      .await
  }

  // ── Students ──────────────────────────────────────────────────────────

  async fn add_student(&self, input: NewStudent) -> Result<Student> {
    let now = Utc::now();
    let student = Student {
      student_id:          Uuid::new_v4(),
      name:                input.name,
      email:               input.email,
      school:              input.school,
      major:               input.major,
      location:            input.location,
      graduation_year:     input.graduation_year,
      bio:                 input.bio,
      urgency:             input.urgency,
      funding_goal:        input.funding_goal,
      amount_raised:       0,
      total_donations:     0,
      registration_status: Default::default(),
      verified:            false,
      is_active:           true,
      public_profile:      true,
      last_active:         now,
      created_at:          now,
    };

    let s = student.clone();
    self
      .with_conn(move |conn| {
        conn.execute(
          "INSERT INTO students (student_id, name, email, school, major,
             location, graduation_year, bio, urgency, funding_goal,
             amount_raised, total_donations, registration_status, verified,
             is_active, public_profile, last_active, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                   0, 0, ?11, 0, 1, 1, ?12, ?13)",
          params![
            encode_uuid(s.student_id),
            s.name,
            s.email,
            s.school,
            s.major,
            s.location,
            s.graduation_year,
            s.bio,
            s.urgency.to_string(),
            s.funding_goal,
            s.registration_status.to_string(),
            encode_dt(s.last_active),
            encode_dt(s.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(student)
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawStudent> = self
      .with_conn(move |conn| {
        let sql =
          format!("SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = ?1");
        Ok(
          conn
            .query_row(&sql, params![id_str], |row| RawStudent::from_row(row))
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn update_student_profile(
    &self,
    id: Uuid,
    update: StudentProfileUpdate,
  ) -> Result<Student> {
    self
      .with_conn(move |conn| {
        let n = conn.execute(
          "UPDATE students
              SET name            = COALESCE(?1, name),
                  school          = COALESCE(?2, school),
                  major           = COALESCE(?3, major),
                  location        = COALESCE(?4, location),
                  graduation_year = COALESCE(?5, graduation_year),
                  bio             = COALESCE(?6, bio),
                  urgency         = COALESCE(?7, urgency),
                  funding_goal    = COALESCE(?8, funding_goal),
                  public_profile  = COALESCE(?9, public_profile),
                  last_active     = ?10
            WHERE student_id = ?11",
          params![
            update.name,
            update.school,
            update.major,
            update.location,
            update.graduation_year,
            update.bio,
            update.urgency.map(|u| u.to_string()),
            update.funding_goal,
            update.public_profile,
            encode_dt(Utc::now()),
            encode_uuid(id),
          ],
        )?;
        if n == 0 {
          return Err(CoreError::StudentNotFound(id).into());
        }
        Ok(())
      })
      .await?;

    self
      .get_student(id)
      .await?
      .ok_or(CoreError::StudentNotFound(id).into())
  }

  async fn search_students(&self, query: &StudentQuery) -> Result<StudentPage> {
    let (page, limit) = clamp_paging(query.page, query.limit);
    let q = query.clone();

    self
      .with_conn(move |conn| {
        use rusqlite::types::Value;

        let mut conds: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if !q.include_unverified {
          conds.push(
            "is_active = 1 AND public_profile = 1 AND verified = 1".into(),
          );
        }
        if let Some(text) = &q.search {
          let pattern = format!("%{text}%");
          conds.push(
            "(name LIKE ?x OR school LIKE ?x OR major LIKE ?x OR bio LIKE ?x)"
              .replace("?x", &format!("?{}", values.len() + 1)),
          );
          values.push(Value::Text(pattern));
        }
        let mut push_eq = |col: &str, v: Value, conds: &mut Vec<String>,
                           values: &mut Vec<Value>| {
          conds.push(format!("{col} = ?{}", values.len() + 1));
          values.push(v);
        };
        if let Some(school) = q.school {
          push_eq("school", Value::Text(school), &mut conds, &mut values);
        }
        if let Some(major) = q.major {
          push_eq("major", Value::Text(major), &mut conds, &mut values);
        }
        if let Some(location) = q.location {
          push_eq("location", Value::Text(location), &mut conds, &mut values);
        }
        if let Some(year) = q.graduation_year {
          push_eq(
            "graduation_year",
            Value::Integer(year as i64),
            &mut conds,
            &mut values,
          );
        }
        if let Some(urgency) = q.urgency {
          push_eq(
            "urgency",
            Value::Text(urgency.to_string()),
            &mut conds,
            &mut values,
          );
        }
        if let Some(min) = q.min_goal {
          conds.push(format!("funding_goal >= ?{}", values.len() + 1));
          values.push(Value::Integer(min));
        }
        if let Some(max) = q.max_goal {
          conds.push(format!("funding_goal <= ?{}", values.len() + 1));
          values.push(Value::Integer(max));
        }
        if let Some(verified) = q.verified {
          conds.push(format!("verified = ?{}", values.len() + 1));
          values.push(Value::Integer(verified as i64));
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let order = match q.sort {
          StudentSort::Recent => "last_active DESC",
          StudentSort::Name => "name ASC",
          StudentSort::GoalAsc => "funding_goal ASC",
          StudentSort::GoalDesc => "funding_goal DESC",
          StudentSort::Progress => "amount_raised DESC, funding_goal ASC",
        };

        let count_sql = format!("SELECT COUNT(*) FROM students {where_clause}");
        let total: i64 = conn.query_row(
          &count_sql,
          params_from_iter(values.iter()),
          |row| row.get(0),
        )?;

        let offset = (page - 1) as i64 * limit as i64;
        let sql = format!(
          "SELECT {STUDENT_COLUMNS} FROM students {where_clause}
           ORDER BY {order} LIMIT {limit} OFFSET {offset}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map(params_from_iter(values.iter()), |row| {
            RawStudent::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let students = raws
          .into_iter()
          .map(|raw| {
            let student = raw.into_student()?;
            let progress_percentage = ledger::progress_percentage(
              student.amount_raised,
              student.funding_goal,
            );
            Ok(StudentWithProgress { student, progress_percentage })
          })
          .collect::<Result<Vec<_>>>()?;

        // Facets ignore applied filters; only the base visibility predicate
        // applies.
        let facet_base = if q.include_unverified {
          ""
        } else {
          "WHERE is_active = 1 AND public_profile = 1 AND verified = 1"
        };
        let mut facet = |col: &str| -> rusqlite::Result<Vec<String>> {
          let sql = format!(
            "SELECT DISTINCT {col} FROM students {facet_base} ORDER BY {col}"
          );
          let mut stmt = conn.prepare(&sql)?;
          stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()
        };
        let facets = StudentFacets {
          schools:   facet("school")?,
          majors:    facet("major")?,
          locations: facet("location")?,
        };

        Ok(StudentPage { students, total, page, limit, facets })
      })
      .await
  }

  // ── Bookmarks ─────────────────────────────────────────────────────────

  async fn add_bookmark(&self, donor_id: Uuid, student_id: Uuid) -> Result<()> {
    self
      .with_conn(move |conn| {
        require_donor(conn, donor_id)?;
        require_student(conn, student_id)?;

        let n = conn.execute(
          "INSERT OR IGNORE INTO bookmarks (donor_id, student_id, created_at)
           VALUES (?1, ?2, ?3)",
          params![
            encode_uuid(donor_id),
            encode_uuid(student_id),
            encode_dt(Utc::now())
          ],
        )?;
        if n == 0 {
          return Err(
            CoreError::Conflict("student is already bookmarked".into()).into(),
          );
        }
        Ok(())
      })
      .await
  }

  async fn list_bookmarks(&self, donor_id: Uuid) -> Result<Vec<StudentWithProgress>> {
    let raws: Vec<RawStudent> = self
      .with_conn(move |conn| {
        let sql = format!(
          "SELECT {STUDENT_COLUMNS} FROM students
            WHERE student_id IN
              (SELECT student_id FROM bookmarks WHERE donor_id = ?1)
            ORDER BY name ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params![encode_uuid(donor_id)], |row| {
            RawStudent::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|raw| {
        let student = raw.into_student()?;
        let progress_percentage = ledger::progress_percentage(
          student.amount_raised,
          student.funding_goal,
        );
        Ok(StudentWithProgress { student, progress_percentage })
      })
      .collect()
  }

  async fn remove_bookmark(&self, donor_id: Uuid, student_id: Uuid) -> Result<()> {
    self
      .with_conn(move |conn| {
        let n = conn.execute(
          "DELETE FROM bookmarks WHERE donor_id = ?1 AND student_id = ?2",
          params![encode_uuid(donor_id), encode_uuid(student_id)],
        )?;
        if n == 0 {
          return Err(CoreError::BookmarkNotFound(student_id).into());
        }
        Ok(())
      })
      .await
  }

  // ── Registry items ────────────────────────────────────────────────────

  async fn add_registry_item(&self, input: NewRegistryItem) -> Result<RegistryItem> {
    ledger::validate_donation_amount(input.price)
      .map_err(CoreError::from)?;

    let item = RegistryItem {
      item_id:       Uuid::new_v4(),
      student_id:    input.student_id,
      name:          input.name,
      description:   input.description,
      price:         input.price,
      amount_funded: 0,
      funded_status: ledger::funded_status(0, input.price),
      created_at:    Utc::now(),
    };

    let i = item.clone();
    self
      .with_conn(move |conn| {
        require_student(conn, i.student_id)?;
        conn.execute(
          "INSERT INTO registry_items (item_id, student_id, name, description,
             price, amount_funded, funded_status, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
          params![
            encode_uuid(i.item_id),
            encode_uuid(i.student_id),
            i.name,
            i.description,
            i.price,
            i.funded_status.to_string(),
            encode_dt(i.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(item)
  }

  async fn get_registry_item(&self, id: Uuid) -> Result<Option<RegistryItem>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawRegistryItem> = self
      .with_conn(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT item_id, student_id, name, description, price,
                      amount_funded, funded_status, created_at
                 FROM registry_items WHERE item_id = ?1",
              params![id_str],
              |row| RawRegistryItem::from_row(row),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRegistryItem::into_item).transpose()
  }

  async fn list_registry_items(&self, student_id: Uuid) -> Result<Vec<RegistryItem>> {
    let raws: Vec<RawRegistryItem> = self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT item_id, student_id, name, description, price,
                  amount_funded, funded_status, created_at
             FROM registry_items WHERE student_id = ?1
            ORDER BY created_at ASC",
        )?;
        let rows = stmt
          .query_map(params![encode_uuid(student_id)], |row| {
            RawRegistryItem::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRegistryItem::into_item).collect()
  }

  async fn update_registry_item(
    &self,
    item_id: Uuid,
    student_id: Uuid,
    update: RegistryItemUpdate,
  ) -> Result<RegistryItem> {
    if let Some(price) = update.price {
      ledger::validate_donation_amount(price).map_err(CoreError::from)?;
    }

    let raw: RawRegistryItem = self
      .with_conn(move |conn| {
        let raw: RawRegistryItem = conn
          .query_row(
            "SELECT item_id, student_id, name, description, price,
                    amount_funded, funded_status, created_at
               FROM registry_items
              WHERE item_id = ?1 AND student_id = ?2",
            params![encode_uuid(item_id), encode_uuid(student_id)],
            |row| RawRegistryItem::from_row(row),
          )
          .optional()?
          .ok_or(CoreError::RegistryItemNotFound(item_id))?;

        let name = update.name.unwrap_or(raw.name);
        let description = update.description.unwrap_or(raw.description);
        let price = update.price.unwrap_or(raw.price);
        if price < raw.amount_funded {
          return Err(
            CoreError::Conflict(
              "price cannot be lowered below the amount already funded"
                .into(),
            )
            .into(),
          );
        }
        let status = ledger::funded_status(raw.amount_funded, price);

        conn.execute(
          "UPDATE registry_items
              SET name = ?1, description = ?2, price = ?3, funded_status = ?4
            WHERE item_id = ?5",
          params![name, description, price, status.to_string(), raw.item_id],
        )?;

        Ok(RawRegistryItem {
          name,
          description,
          price,
          funded_status: status.to_string(),
          ..raw
        })
      })
      .await?;

    raw.into_item()
  }

  async fn remove_registry_item(
    &self,
    item_id: Uuid,
    student_id: Uuid,
  ) -> Result<()> {
    self
      .with_conn(move |conn| {
        let funded: Cents = conn
          .query_row(
            "SELECT amount_funded FROM registry_items
              WHERE item_id = ?1 AND student_id = ?2",
            params![encode_uuid(item_id), encode_uuid(student_id)],
            |row| row.get(0),
          )
          .optional()?
          .ok_or(CoreError::RegistryItemNotFound(item_id))?;

        if funded > 0 {
          return Err(
            CoreError::Conflict(
              "a funded item cannot be removed".into(),
            )
            .into(),
          );
        }
        conn.execute(
          "DELETE FROM registry_items WHERE item_id = ?1",
          params![encode_uuid(item_id)],
        )?;
        Ok(())
      })
      .await
  }

  // ── Ledger operations ─────────────────────────────────────────────────

  async fn record_completed_donation(&self, input: NewDonation) -> Result<Donation> {
    ledger::validate_donation_amount(input.amount).map_err(CoreError::from)?;

    let now = Utc::now();
    let donation_id = Uuid::new_v4();
    let donation = Donation {
      donation_id,
      student_id: input.student_id,
      donor_id: input.donor_id,
      amount: input.amount,
      net_amount: input.net_amount,
      status: DonationStatus::Completed,
      donation_type: input.donation_type,
      payment_method: input.payment_method,
      target_registry_id: input.target_registry_id,
      recurring_id: input.recurring_id,
      receipt_number: receipt_number(donation_id),
      created_at: now,
      processed_at: Some(now),
      refund_amount: None,
      refund_reason: None,
      refunded_at: None,
    };

    let d = donation.clone();
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        require_student(&tx, d.student_id)?;
        insert_donation(&tx, &d)?;
        apply_completed(&tx, &d)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(donation)
  }

  async fn record_pending_donation(&self, input: NewDonation) -> Result<Donation> {
    ledger::validate_donation_amount(input.amount).map_err(CoreError::from)?;

    let donation_id = Uuid::new_v4();
    let donation = Donation {
      donation_id,
      student_id: input.student_id,
      donor_id: input.donor_id,
      amount: input.amount,
      net_amount: input.net_amount,
      status: DonationStatus::Pending,
      donation_type: input.donation_type,
      payment_method: input.payment_method,
      target_registry_id: input.target_registry_id,
      recurring_id: input.recurring_id,
      receipt_number: receipt_number(donation_id),
      created_at: Utc::now(),
      processed_at: None,
      refund_amount: None,
      refund_reason: None,
      refunded_at: None,
    };

    let d = donation.clone();
    self
      .with_conn(move |conn| {
        require_student(conn, d.student_id)?;
        insert_donation(conn, &d)?;
        Ok(())
      })
      .await?;

    Ok(donation)
  }

  async fn complete_donation(&self, donation_id: Uuid) -> Result<Donation> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;

        let mut donation = get_donation_row(&tx, donation_id)?;
        if donation.status != DonationStatus::Pending {
          return Err(CoreError::InvalidState(donation_id).into());
        }

        let now = Utc::now();
        donation.status = DonationStatus::Completed;
        donation.processed_at = Some(now);

        tx.execute(
          "UPDATE donations SET status = 'completed', processed_at = ?1
            WHERE donation_id = ?2",
          params![encode_dt(now), encode_uuid(donation_id)],
        )?;
        apply_completed(&tx, &donation)?;

        tx.commit()?;
        Ok(donation)
      })
      .await
  }

  async fn refund_donation(
    &self,
    donation_id: Uuid,
    refund_amount: Cents,
    reason: String,
    admin_id: Uuid,
  ) -> Result<Donation> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;

        let mut donation = get_donation_row(&tx, donation_id)?;
        ledger::check_refund(&donation, refund_amount)
          .map_err(CoreError::from)?;

        let now = Utc::now();
        tx.execute(
          "UPDATE donations
              SET status = 'refunded', refund_amount = ?1,
                  refund_reason = ?2, refunded_at = ?3
            WHERE donation_id = ?4",
          params![
            refund_amount,
            reason,
            encode_dt(now),
            encode_uuid(donation_id)
          ],
        )?;

        // The CHECK constraint on amount_raised rejects a refund that would
        // take the student's balance negative.
        tx.execute(
          "UPDATE students SET amount_raised = amount_raised - ?1
            WHERE student_id = ?2",
          params![refund_amount, encode_uuid(donation.student_id)],
        )?;

        if let Some(donor_id) = donation.donor_id {
          tx.execute(
            "UPDATE donors SET total_donated = total_donated - ?1
              WHERE donor_id = ?2",
            params![refund_amount, encode_uuid(donor_id)],
          )?;
          refresh_donor_summary(&tx, donor_id)?;
        }

        insert_admin_action(
          &tx,
          admin_id,
          "refund_donation",
          donation_id,
          Some(reason.clone()),
        )?;

        tx.commit()?;

        donation.status = DonationStatus::Refunded;
        donation.refund_amount = Some(refund_amount);
        donation.refund_reason = Some(reason);
        donation.refunded_at = Some(now);
        Ok(donation)
      })
      .await
  }

  // ── Donation history / export / analytics ─────────────────────────────

  async fn list_donations(&self, query: &DonationQuery) -> Result<DonationPage> {
    let (page, limit) = clamp_paging(query.page, query.limit);
    let q = query.clone();

    self
      .with_conn(move |conn| {
        use rusqlite::types::Value;

        let mut conds: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        let mut push = |cond: String, v: Option<Value>,
                        conds: &mut Vec<String>, values: &mut Vec<Value>| {
          conds.push(cond);
          if let Some(v) = v {
            values.push(v);
          }
        };

        if let Some(donor_id) = q.donor_id {
          let idx = values.len() + 1;
          push(
            format!("d.donor_id = ?{idx}"),
            Some(Value::Text(encode_uuid(donor_id))),
            &mut conds,
            &mut values,
          );
        }
        if let Some(student_id) = q.student_id {
          let idx = values.len() + 1;
          push(
            format!("d.student_id = ?{idx}"),
            Some(Value::Text(encode_uuid(student_id))),
            &mut conds,
            &mut values,
          );
        }
        if let Some(status) = q.status {
          let idx = values.len() + 1;
          push(
            format!("d.status = ?{idx}"),
            Some(Value::Text(status.to_string())),
            &mut conds,
            &mut values,
          );
        }
        if let Some(kind) = q.kind {
          let idx = values.len() + 1;
          push(
            format!("d.donation_type = ?{idx}"),
            Some(Value::Text(kind.to_string())),
            &mut conds,
            &mut values,
          );
        }
        if let Some(after) = q.after {
          let idx = values.len() + 1;
          push(
            format!("d.created_at >= ?{idx}"),
            Some(Value::Text(encode_dt(after))),
            &mut conds,
            &mut values,
          );
        }
        if let Some(before) = q.before {
          let idx = values.len() + 1;
          push(
            format!("d.created_at <= ?{idx}"),
            Some(Value::Text(encode_dt(before))),
            &mut conds,
            &mut values,
          );
        }
        match q.recurring {
          Some(true) => {
            push("d.recurring_id IS NOT NULL".into(), None, &mut conds, &mut values)
          }
          Some(false) => {
            push("d.recurring_id IS NULL".into(), None, &mut conds, &mut values)
          }
          None => {}
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let order_col = match q.sort {
          DonationSort::Date => "d.created_at",
          DonationSort::Amount => "d.amount",
          DonationSort::StudentName => "s.name",
        };
        let order_dir = match q.direction {
          SortDirection::Asc => "ASC",
          SortDirection::Desc => "DESC",
        };

        let count_sql = format!(
          "SELECT COUNT(*) FROM donations d
            JOIN students s ON s.student_id = d.student_id {where_clause}"
        );
        let total: i64 = conn.query_row(
          &count_sql,
          params_from_iter(values.iter()),
          |row| row.get(0),
        )?;

        let offset = (page - 1) as i64 * limit as i64;
        let cols: String = DONATION_COLUMNS
          .split(", ")
          .map(|c| format!("d.{}", c.trim()))
          .collect::<Vec<_>>()
          .join(", ");
        let sql = format!(
          "SELECT {cols}, s.name, s.school
             FROM donations d
             JOIN students s ON s.student_id = d.student_id
            {where_clause}
            ORDER BY {order_col} {order_dir}
            LIMIT {limit} OFFSET {offset}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map(params_from_iter(values.iter()), |row| {
            Ok(RawDonationRecord {
              donation:     RawDonation::from_row(row)?,
              student_name: row.get(16)?,
              school:       row.get(17)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let donations = raws
          .into_iter()
          .map(RawDonationRecord::into_record)
          .collect::<Result<Vec<_>>>()?;

        // Summary block: donor-scoped when the query is, global otherwise.
        let (summary_where, summary_params) = match q.donor_id {
          Some(donor_id) => (
            "WHERE donor_id = ?1".to_string(),
            vec![Value::Text(encode_uuid(donor_id))],
          ),
          None => (String::new(), vec![]),
        };
        let sql = format!(
          "SELECT COALESCE(SUM({EFFECTIVE_AMOUNT}), 0),
                  COUNT(CASE WHEN status IN ('completed', 'refunded') THEN 1 END)
             FROM donations {summary_where}"
        );
        let (lifetime_total, donation_count): (Cents, i64) = conn.query_row(
          &sql,
          params_from_iter(summary_params.iter()),
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let active_recurring: i64 = match q.donor_id {
          Some(donor_id) => conn.query_row(
            "SELECT COUNT(*) FROM recurring_donations
              WHERE donor_id = ?1 AND active = 1",
            params![encode_uuid(donor_id)],
            |row| row.get(0),
          )?,
          None => conn.query_row(
            "SELECT COUNT(*) FROM recurring_donations WHERE active = 1",
            [],
            |row| row.get(0),
          )?,
        };

        Ok(DonationPage {
          donations,
          total,
          page,
          limit,
          summary: DonationSummary {
            lifetime_total,
            donation_count,
            active_recurring,
          },
        })
      })
      .await
  }

  async fn export_donations(
    &self,
    donor_id: Uuid,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
  ) -> Result<Vec<ExportRow>> {
    self
      .with_conn(move |conn| {
        // Unbounded ends of the range default to the full history.
        let after = after.map(encode_dt).unwrap_or_default();
        let before = before
          .map(encode_dt)
          .unwrap_or_else(|| encode_dt(Utc::now()));

        let mut stmt = conn.prepare(
          "SELECT d.processed_at, d.amount, s.name, s.school, d.receipt_number
             FROM donations d
             JOIN students s ON s.student_id = d.student_id
            WHERE d.donor_id = ?1 AND d.status = 'completed'
              AND d.processed_at >= ?2 AND d.processed_at <= ?3
            ORDER BY d.processed_at DESC",
        )?;
        let rows = stmt
          .query_map(
            params![encode_uuid(donor_id), after, before],
            |row| {
              Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
              ))
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        rows
          .into_iter()
          .map(|(processed_at, amount, student, school, receipt)| {
            Ok(ExportRow {
              date: crate::encode::decode_dt(&processed_at)?,
              amount,
              student,
              school,
              receipt_url: format!("/receipts/{receipt}"),
              receipt_number: receipt,
            })
          })
          .collect()
      })
      .await
  }

  async fn donation_analytics(
    &self,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
  ) -> Result<DonationAnalytics> {
    self
      .with_conn(move |conn| {
        let after = after.map(encode_dt).unwrap_or_default();
        let before = before
          .map(encode_dt)
          .unwrap_or_else(|| encode_dt(Utc::now()));

        let (total_volume, donation_count): (Cents, i64) = conn.query_row(
          "SELECT COALESCE(SUM(amount), 0), COUNT(*) FROM donations
            WHERE status = 'completed'
              AND processed_at >= ?1 AND processed_at <= ?2",
          params![after, before],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let refunded_total: Cents = conn.query_row(
          "SELECT COALESCE(SUM(refund_amount), 0) FROM donations
            WHERE status = 'refunded'
              AND refunded_at >= ?1 AND refunded_at <= ?2",
          params![after, before],
          |row| row.get(0),
        )?;

        let mut breakdown = |col: &str| -> rusqlite::Result<Vec<Breakdown>> {
          let sql = format!(
            "SELECT {col}, COALESCE(SUM(amount), 0), COUNT(*)
               FROM donations
              WHERE status = 'completed'
                AND processed_at >= ?1 AND processed_at <= ?2
              GROUP BY {col} ORDER BY SUM(amount) DESC"
          );
          let mut stmt = conn.prepare(&sql)?;
          stmt
            .query_map(params![after, before], |row| {
              Ok(Breakdown {
                key:   row.get(0)?,
                total: row.get(1)?,
                count: row.get(2)?,
              })
            })?
            .collect()
        };
        let by_payment_method = breakdown("payment_method")?;
        let by_donation_type = breakdown("donation_type")?;

        let mut stmt = conn.prepare(
          "SELECT date(processed_at), COALESCE(SUM(amount), 0), COUNT(*)
             FROM donations
            WHERE status = 'completed'
              AND processed_at >= ?1 AND processed_at <= ?2
            GROUP BY date(processed_at) ORDER BY date(processed_at)",
        )?;
        let daily = stmt
          .query_map(params![after, before], |row| {
            Ok((
              row.get::<_, String>(0)?,
              row.get::<_, i64>(1)?,
              row.get::<_, i64>(2)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?
          .into_iter()
          .map(|(day, total, count)| {
            Ok(DailyVolume { day: decode_day(&day)?, total, count })
          })
          .collect::<Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT d.donor_id, o.name, SUM(d.amount) AS total
             FROM donations d JOIN donors o ON o.donor_id = d.donor_id
            WHERE d.status = 'completed'
              AND d.processed_at >= ?1 AND d.processed_at <= ?2
            GROUP BY d.donor_id ORDER BY total DESC LIMIT 5",
        )?;
        let top_donors = stmt
          .query_map(params![after, before], |row| {
            Ok((
              row.get::<_, String>(0)?,
              row.get::<_, String>(1)?,
              row.get::<_, i64>(2)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?
          .into_iter()
          .map(|(id, name, total)| {
            Ok(TopDonor { donor_id: decode_uuid(&id)?, name, total })
          })
          .collect::<Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT d.student_id, s.name, SUM(d.amount) AS raised
             FROM donations d JOIN students s ON s.student_id = d.student_id
            WHERE d.status = 'completed'
              AND d.processed_at >= ?1 AND d.processed_at <= ?2
            GROUP BY d.student_id ORDER BY raised DESC LIMIT 5",
        )?;
        let top_students = stmt
          .query_map(params![after, before], |row| {
            Ok((
              row.get::<_, String>(0)?,
              row.get::<_, String>(1)?,
              row.get::<_, i64>(2)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?
          .into_iter()
          .map(|(id, name, raised)| {
            Ok(TopStudent { student_id: decode_uuid(&id)?, name, raised })
          })
          .collect::<Result<Vec<_>>>()?;

        Ok(DonationAnalytics {
          total_volume,
          donation_count,
          refunded_total,
          by_payment_method,
          by_donation_type,
          daily,
          top_donors,
          top_students,
        })
      })
      .await
  }

  // ── Recurring donations ───────────────────────────────────────────────

  async fn add_recurring_donation(
    &self,
    input: NewRecurringDonation,
  ) -> Result<RecurringDonation> {
    ledger::validate_donation_amount(input.amount).map_err(CoreError::from)?;

    let now = Utc::now();
    let recurring = RecurringDonation {
      recurring_id:      Uuid::new_v4(),
      donor_id:          input.donor_id,
      student_id:        input.student_id,
      amount:            input.amount,
      frequency:         input.frequency,
      active:            true,
      next_payment_date: input.frequency.next_after(now),
      created_at:        now,
      cancelled_at:      None,
    };

    let r = recurring.clone();
    self
      .with_conn(move |conn| {
        require_donor(conn, r.donor_id)?;
        require_student(conn, r.student_id)?;
        conn.execute(
          "INSERT INTO recurring_donations (recurring_id, donor_id,
             student_id, amount, frequency, active, next_payment_date,
             created_at, cancelled_at)
           VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, NULL)",
          params![
            encode_uuid(r.recurring_id),
            encode_uuid(r.donor_id),
            encode_uuid(r.student_id),
            r.amount,
            r.frequency.to_string(),
            encode_dt(r.next_payment_date),
            encode_dt(r.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(recurring)
  }

  async fn list_recurring_donations(
    &self,
    donor_id: Uuid,
  ) -> Result<Vec<RecurringDonation>> {
    let raws: Vec<RawRecurring> = self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT recurring_id, donor_id, student_id, amount, frequency,
                  active, next_payment_date, created_at, cancelled_at
             FROM recurring_donations WHERE donor_id = ?1
            ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map(params![encode_uuid(donor_id)], |row| {
            RawRecurring::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecurring::into_recurring).collect()
  }

  async fn update_recurring_donation(
    &self,
    id: Uuid,
    donor_id: Uuid,
    update: RecurringUpdate,
  ) -> Result<RecurringDonation> {
    if let Some(amount) = update.amount {
      ledger::validate_donation_amount(amount).map_err(CoreError::from)?;
    }

    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;

        let raw = tx
          .query_row(
            "SELECT recurring_id, donor_id, student_id, amount, frequency,
                    active, next_payment_date, created_at, cancelled_at
               FROM recurring_donations
              WHERE recurring_id = ?1 AND donor_id = ?2",
            params![encode_uuid(id), encode_uuid(donor_id)],
            |row| RawRecurring::from_row(row),
          )
          .optional()?
          .ok_or(CoreError::RecurringDonationNotFound(id))?;
        let mut recurring = raw.into_recurring()?;

        let now = Utc::now();
        if let Some(amount) = update.amount {
          recurring.amount = amount;
        }
        if let Some(frequency) = update.frequency {
          recurring.frequency = frequency;
          recurring.next_payment_date = frequency.next_after(now);
        }
        match update.active {
          Some(false) if recurring.active => {
            recurring.active = false;
            recurring.cancelled_at = Some(now);
          }
          Some(true) if !recurring.active => {
            recurring.active = true;
            recurring.cancelled_at = None;
            recurring.next_payment_date = recurring.frequency.next_after(now);
          }
          _ => {}
        }

        tx.execute(
          "UPDATE recurring_donations
              SET amount = ?1, frequency = ?2, active = ?3,
                  next_payment_date = ?4, cancelled_at = ?5
            WHERE recurring_id = ?6",
          params![
            recurring.amount,
            recurring.frequency.to_string(),
            recurring.active,
            encode_dt(recurring.next_payment_date),
            recurring.cancelled_at.map(encode_dt),
            encode_uuid(id),
          ],
        )?;

        tx.commit()?;
        Ok(recurring)
      })
      .await
  }

  // ── School verification ───────────────────────────────────────────────

  async fn list_schools(&self) -> Result<Vec<School>> {
    let raws: Vec<RawSchool> = self
      .with_conn(|conn| {
        let mut stmt = conn.prepare(
          "SELECT school_id, name, city, state FROM schools ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawSchool {
              school_id: row.get(0)?,
              name:      row.get(1)?,
              city:      row.get(2)?,
              state:     row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSchool::into_school).collect()
  }

  async fn seed_schools(&self, schools: Vec<School>) -> Result<()> {
    self
      .with_conn(move |conn| {
        for school in schools {
          conn.execute(
            "INSERT OR IGNORE INTO schools (school_id, name, city, state)
             VALUES (?1, ?2, ?3, ?4)",
            params![
              encode_uuid(school.school_id),
              school.name,
              school.city,
              school.state
            ],
          )?;
        }
        Ok(())
      })
      .await
  }

  async fn submit_verification(
    &self,
    input: NewVerification,
  ) -> Result<SchoolVerification> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;

        require_student(&tx, input.student_id)?;
        if !exists(
          &tx,
          "SELECT 1 FROM schools WHERE school_id = ?1",
          &encode_uuid(input.school_id),
        )? {
          return Err(CoreError::SchoolNotFound(input.school_id).into());
        }

        let existing: Option<(String, String)> = tx
          .query_row(
            "SELECT verification_id, status FROM school_verifications
              WHERE student_id = ?1",
            params![encode_uuid(input.student_id)],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        let now = Utc::now();
        let verification = match existing {
          None => {
            let verification = SchoolVerification {
              verification_id:  Uuid::new_v4(),
              student_id:       input.student_id,
              school_id:        input.school_id,
              document_url:     input.document_url.clone(),
              status:           VerificationStatus::Pending,
              rejection_reason: None,
              submitted_at:     now,
              reviewed_at:      None,
            };
            tx.execute(
              "INSERT INTO school_verifications (verification_id, student_id,
                 school_id, document_url, status, rejection_reason,
                 submitted_at, reviewed_at)
               VALUES (?1, ?2, ?3, ?4, 'pending', NULL, ?5, NULL)",
              params![
                encode_uuid(verification.verification_id),
                encode_uuid(verification.student_id),
                encode_uuid(verification.school_id),
                verification.document_url,
                encode_dt(now),
              ],
            )?;
            verification
          }
          // Resubmission after rejection reuses the row and clears the
          // rejection reason.
          Some((id_str, status)) if status == "rejected" => {
            let verification_id = decode_uuid(&id_str)?;
            tx.execute(
              "UPDATE school_verifications
                  SET school_id = ?1, document_url = ?2, status = 'pending',
                      rejection_reason = NULL, submitted_at = ?3,
                      reviewed_at = NULL
                WHERE verification_id = ?4",
              params![
                encode_uuid(input.school_id),
                input.document_url,
                encode_dt(now),
                id_str,
              ],
            )?;
            SchoolVerification {
              verification_id,
              student_id: input.student_id,
              school_id: input.school_id,
              document_url: input.document_url.clone(),
              status: VerificationStatus::Pending,
              rejection_reason: None,
              submitted_at: now,
              reviewed_at: None,
            }
          }
          Some((_, status)) => {
            return Err(
              CoreError::Conflict(format!(
                "a verification is already {status} for this student"
              ))
              .into(),
            );
          }
        };

        tx.commit()?;
        Ok(verification)
      })
      .await
  }

  async fn list_verifications(
    &self,
    status: Option<VerificationStatus>,
  ) -> Result<Vec<SchoolVerification>> {
    let status_str = status.map(|s| s.to_string());
    let raws: Vec<RawVerification> = self
      .with_conn(move |conn| {
        let rows = if let Some(status) = status_str {
          let mut stmt = conn.prepare(
            "SELECT verification_id, student_id, school_id, document_url,
                    status, rejection_reason, submitted_at, reviewed_at
               FROM school_verifications WHERE status = ?1
              ORDER BY submitted_at ASC",
          )?;
          stmt
            .query_map(params![status], |row| RawVerification::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT verification_id, student_id, school_id, document_url,
                    status, rejection_reason, submitted_at, reviewed_at
               FROM school_verifications ORDER BY submitted_at ASC",
          )?;
          stmt
            .query_map([], |row| RawVerification::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawVerification::into_verification)
      .collect()
  }

  async fn verification_stats(&self) -> Result<VerificationStats> {
    self
      .with_conn(|conn| {
        let count = |status: &str| -> rusqlite::Result<i64> {
          conn.query_row(
            "SELECT COUNT(*) FROM school_verifications WHERE status = ?1",
            params![status],
            |row| row.get(0),
          )
        };
        Ok(VerificationStats {
          pending:  count("pending")?,
          approved: count("approved")?,
          rejected: count("rejected")?,
        })
      })
      .await
  }

  async fn approve_verification(
    &self,
    verification_id: Uuid,
    admin_id: Uuid,
  ) -> Result<SchoolVerification> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;

        let mut verification = get_verification_row(&tx, verification_id)?;
        if verification.status != VerificationStatus::Pending {
          return Err(CoreError::InvalidState(verification_id).into());
        }

        let now = Utc::now();
        tx.execute(
          "UPDATE school_verifications
              SET status = 'approved', reviewed_at = ?1
            WHERE verification_id = ?2",
          params![encode_dt(now), encode_uuid(verification_id)],
        )?;

        // The student flag flips in the same transaction; approval without
        // a verified student (or vice versa) cannot be observed.
        let n = tx.execute(
          "UPDATE students SET verified = 1 WHERE student_id = ?1",
          params![encode_uuid(verification.student_id)],
        )?;
        if n == 0 {
          return Err(
            CoreError::StudentNotFound(verification.student_id).into(),
          );
        }

        insert_admin_action(
          &tx,
          admin_id,
          "approve_verification",
          verification_id,
          None,
        )?;

        tx.commit()?;

        verification.status = VerificationStatus::Approved;
        verification.reviewed_at = Some(now);
        Ok(verification)
      })
      .await
  }

  async fn reject_verification(
    &self,
    verification_id: Uuid,
    admin_id: Uuid,
    reason: String,
  ) -> Result<SchoolVerification> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;

        let mut verification = get_verification_row(&tx, verification_id)?;
        if verification.status != VerificationStatus::Pending {
          return Err(CoreError::InvalidState(verification_id).into());
        }

        let now = Utc::now();
        tx.execute(
          "UPDATE school_verifications
              SET status = 'rejected', rejection_reason = ?1, reviewed_at = ?2
            WHERE verification_id = ?3",
          params![reason, encode_dt(now), encode_uuid(verification_id)],
        )?;

        insert_admin_action(
          &tx,
          admin_id,
          "reject_verification",
          verification_id,
          Some(reason.clone()),
        )?;

        tx.commit()?;

        verification.status = VerificationStatus::Rejected;
        verification.rejection_reason = Some(reason);
        verification.reviewed_at = Some(now);
        Ok(verification)
      })
      .await
  }

  // ── Platform administration ───────────────────────────────────────────

  async fn platform_stats(&self) -> Result<PlatformStats> {
    self
      .with_conn(|conn| {
        let single = |sql: &str| -> rusqlite::Result<i64> {
          conn.query_row(sql, [], |row| row.get(0))
        };
        Ok(PlatformStats {
          total_donors:      single("SELECT COUNT(*) FROM donors")?,
          total_students:    single("SELECT COUNT(*) FROM students")?,
          verified_students: single(
            "SELECT COUNT(*) FROM students WHERE verified = 1",
          )?,
          total_raised:      single(
            "SELECT COALESCE(SUM(amount_raised), 0) FROM students",
          )?,
          total_donations:   single(
            "SELECT COUNT(*) FROM donations WHERE status = 'completed'",
          )?,
          pending_verifications: single(
            "SELECT COUNT(*) FROM school_verifications WHERE status = 'pending'",
          )?,
        })
      })
      .await
  }

  async fn list_users(&self) -> Result<Vec<UserRecord>> {
    let raws: Vec<RawUser> = self
      .with_conn(|conn| {
        let mut stmt = conn.prepare(
          "SELECT donor_id, name, email, 'donor', is_active, created_at
             FROM donors
           UNION ALL
           SELECT student_id, name, email, 'student', is_active, created_at
             FROM students
           ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawUser {
              user_id:    row.get(0)?,
              name:       row.get(1)?,
              email:      row.get(2)?,
              role:       row.get(3)?,
              is_active:  row.get(4)?,
              created_at: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn set_user_status(&self, user_id: Uuid, is_active: bool) -> Result<UserRecord> {
    let raw: RawUser = self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let id = encode_uuid(user_id);

        let n = tx.execute(
          "UPDATE donors SET is_active = ?1 WHERE donor_id = ?2",
          params![is_active, id],
        )?;
        let (table, id_col, role) = if n > 0 {
          ("donors", "donor_id", "donor")
        } else {
          let n = tx.execute(
            "UPDATE students SET is_active = ?1 WHERE student_id = ?2",
            params![is_active, id],
          )?;
          if n == 0 {
            return Err(CoreError::UserNotFound(user_id).into());
          }
          ("students", "student_id", "student")
        };

        let sql = format!(
          "SELECT {id_col}, name, email, is_active, created_at
             FROM {table} WHERE {id_col} = ?1"
        );
        let raw = tx.query_row(&sql, params![id], |row| {
          Ok(RawUser {
            user_id:    row.get(0)?,
            name:       row.get(1)?,
            email:      row.get(2)?,
            role:       role.to_string(),
            is_active:  row.get(3)?,
            created_at: row.get(4)?,
          })
        })?;

        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_user()
  }

  async fn list_admin_actions(&self, target_id: Uuid) -> Result<Vec<AdminAction>> {
    let raws: Vec<RawAdminAction> = self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT action_id, admin_id, action, target_id, detail, created_at
             FROM admin_actions WHERE target_id = ?1
            ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map(params![encode_uuid(target_id)], |row| {
            Ok(RawAdminAction {
              action_id:  row.get(0)?,
              admin_id:   row.get(1)?,
              action:     row.get(2)?,
              target_id:  row.get(3)?,
              detail:     row.get(4)?,
              created_at: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAdminAction::into_action).collect()
  }

  // ── Reconciliation ────────────────────────────────────────────────────

  async fn reconcile_student(&self, student_id: Uuid) -> Result<ReconcileReport> {
    self
      .with_conn(move |conn| {
        let id = encode_uuid(student_id);
        let stored: Cents = conn
          .query_row(
            "SELECT amount_raised FROM students WHERE student_id = ?1",
            params![id],
            |row| row.get(0),
          )
          .optional()?
          .ok_or(CoreError::StudentNotFound(student_id))?;

        let sql = format!(
          "SELECT COALESCE(SUM({EFFECTIVE_AMOUNT}), 0) FROM donations
            WHERE student_id = ?1"
        );
        let recomputed: Cents =
          conn.query_row(&sql, params![id], |row| row.get(0))?;

        Ok(ReconcileReport {
          subject_id: student_id,
          stored,
          recomputed,
          drift: stored - recomputed,
        })
      })
      .await
  }

  async fn reconcile_donor(&self, donor_id: Uuid) -> Result<ReconcileReport> {
    self
      .with_conn(move |conn| {
        let id = encode_uuid(donor_id);
        let stored: Cents = conn
          .query_row(
            "SELECT total_donated FROM donors WHERE donor_id = ?1",
            params![id],
            |row| row.get(0),
          )
          .optional()?
          .ok_or(CoreError::DonorNotFound(donor_id))?;

        let sql = format!(
          "SELECT COALESCE(SUM({EFFECTIVE_AMOUNT}), 0) FROM donations
            WHERE donor_id = ?1"
        );
        let recomputed: Cents =
          conn.query_row(&sql, params![id], |row| row.get(0))?;

        Ok(ReconcileReport {
          subject_id: donor_id,
          stored,
          recomputed,
          drift: stored - recomputed,
        })
      })
      .await
  }

  // ── Credentials ───────────────────────────────────────────────────────

  async fn add_credential(&self, credential: Credential) -> Result<()> {
    self
      .with_conn(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO credentials (user_id, email, role, password_hash)
           VALUES (?1, ?2, ?3, ?4)",
          params![
            encode_uuid(credential.user_id),
            credential.email,
            credential.role.to_string(),
            credential.password_hash,
          ],
        )?;
        if n == 0 {
          return Err(
            CoreError::Conflict(
              "an account already exists for this email".into(),
            )
            .into(),
          );
        }
        Ok(())
      })
      .await
  }

  async fn get_credential(
    &self,
    email: &str,
    role: UserRole,
  ) -> Result<Option<Credential>> {
    let email = email.to_owned();
    let role_str = role.to_string();
    let raw: Option<RawCredential> = self
      .with_conn(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, email, role, password_hash FROM credentials
                WHERE email = ?1 AND role = ?2",
              params![email, role_str],
              |row| {
                Ok(RawCredential {
                  user_id:       row.get(0)?,
                  email:         row.get(1)?,
                  role:          row.get(2)?,
                  password_hash: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCredential::into_credential).transpose()
  }
}
