//! [`Attendance`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Date,
};
use itertools::Itertools as _;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{attendance, user, Attendance},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::attendance::{list, Active},
};

/// Columns of an `attendances` row.
const ATTENDANCE_COLUMNS: &str = "\
    id, user_id, date, time_zone, \
    clock_in, clock_out, status, \
    total_break_minutes, duration_minutes, total_hours, \
    shift_report, reported_at, \
    created_at, updated_at";

/// Builds an [`Attendance`] without its [`Break`]s from the provided [`Row`].
///
/// [`Break`]: attendance::Break
fn attendance_from(row: &Row) -> Attendance {
    Attendance {
        id: row.get("id"),
        user_id: row.get("user_id"),
        date: row.get("date"),
        time_zone: row.get("time_zone"),
        clock_in: row.get("clock_in"),
        clock_out: row.get("clock_out"),
        status: row.get("status"),
        total_break: row.get("total_break_minutes"),
        duration: row.get("duration_minutes"),
        total_hours: row.get("total_hours"),
        shift_report: row.get("shift_report"),
        reported_at: row.get("reported_at"),
        breaks: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Fills the provided [`Attendance`]s with their [`Break`]s.
///
/// [`Break`]: attendance::Break
async fn with_breaks<C: Connection>(
    conn: &C,
    mut attendances: Vec<Attendance>,
) -> Result<Vec<Attendance>, Traced<database::Error>> {
    if attendances.is_empty() {
        return Ok(attendances);
    }
    let ids = attendances.iter().map(|a| a.id).collect::<Vec<_>>();

    const SQL: &str = "\
        SELECT id, attendance_id, \
               start_time, end_time, duration_minutes, \
               kind, notes \
        FROM attendance_breaks \
        WHERE attendance_id = ANY($1::UUID[]) \
        ORDER BY start_time ASC, id ASC";
    let mut breaks: HashMap<attendance::Id, Vec<attendance::Break>> = conn
        .query(SQL, &[&ids])
        .await
        .map_err(tracerr::wrap!())?
        .into_iter()
        .map(|row| attendance::Break {
            id: row.get("id"),
            attendance_id: row.get("attendance_id"),
            start_time: row.get("start_time"),
            end_time: row.get("end_time"),
            duration: row.get("duration_minutes"),
            kind: row.get("kind"),
            notes: row.get("notes"),
        })
        .into_group_map_by(|b| b.attendance_id);

    for a in &mut attendances {
        a.breaks = breaks.remove(&a.id).unwrap_or_default();
    }
    Ok(attendances)
}

impl<C> Database<Select<By<Option<Attendance>, attendance::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Attendance>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Attendance>, attendance::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: attendance::Id = by.into_inner();

        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} \
             FROM attendances \
             WHERE id = $1::UUID"
        );
        let Some(row) = self
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };
        Ok(with_breaks(&**self, vec![attendance_from(&row)])
            .await
            .map_err(tracerr::wrap!())?
            .pop())
    }
}

impl<C> Database<Select<By<Option<Active<Attendance>>, user::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Active<Attendance>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Active<Attendance>>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id: user::Id = by.into_inner();
        let active = [attendance::Status::ClockedIn, attendance::Status::OnBreak];

        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} \
             FROM attendances \
             WHERE user_id = $1::UUID \
               AND status = ANY($2::INT2[]) \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        let Some(row) = self
            .query_opt(sql.as_str(), &[&user_id, &active.as_slice()])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };
        Ok(with_breaks(&**self, vec![attendance_from(&row)])
            .await
            .map_err(tracerr::wrap!())?
            .pop()
            .map(Active))
    }
}

impl<C> Database<Select<By<Option<Attendance>, (user::Id, Date)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Attendance>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Attendance>, (user::Id, Date)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (user_id, date) = by.into_inner();

        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} \
             FROM attendances \
             WHERE user_id = $1::UUID \
               AND date = $2::DATE \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        let Some(row) = self
            .query_opt(sql.as_str(), &[&user_id, &date])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };
        Ok(with_breaks(&**self, vec![attendance_from(&row)])
            .await
            .map_err(tracerr::wrap!())?
            .pop())
    }
}

impl<C> Database<Select<By<Vec<Attendance>, list::Selector>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Attendance>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Attendance>, list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let list::Selector { filter, limit } = by.into_inner();
        let limit = i64::from(limit);

        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} \
             FROM attendances \
             WHERE ($1::UUID IS NULL OR user_id = $1::UUID) \
               AND ($2::DATE IS NULL OR date >= $2::DATE) \
               AND ($3::DATE IS NULL OR date <= $3::DATE) \
             ORDER BY date DESC, clock_in DESC \
             LIMIT $4::INT8"
        );
        let found = self
            .query(
                sql.as_str(),
                &[&filter.user_id, &filter.from, &filter.to, &limit],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(attendance_from)
            .collect();
        with_breaks(&**self, found).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Insert<Attendance>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Attendance>, Ok = (), Err = Traced<database::Error>>
        + Database<
            Update<attendance::Break>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(mut attendance): Insert<Attendance>,
    ) -> Result<Self::Ok, Self::Err> {
        let breaks = std::mem::take(&mut attendance.breaks);
        self.execute(Update(attendance))
            .await
            .map_err(tracerr::wrap!())?;
        for b in breaks {
            self.execute(Update(b)).await.map_err(tracerr::wrap!())?;
        }
        Ok(())
    }
}

impl<C> Database<Update<Attendance>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(attendance): Update<Attendance>,
    ) -> Result<Self::Ok, Self::Err> {
        let Attendance {
            id,
            user_id,
            date,
            time_zone,
            clock_in,
            clock_out,
            status,
            total_break,
            duration,
            total_hours,
            shift_report,
            reported_at,
            breaks: _,
            created_at,
            updated_at,
        } = attendance;

        const SQL: &str = "\
            INSERT INTO attendances (\
                id, user_id, date, time_zone, \
                clock_in, clock_out, status, \
                total_break_minutes, duration_minutes, total_hours, \
                shift_report, reported_at, \
                created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::DATE, $4::VARCHAR, \
                $5::TIMESTAMPTZ, $6::TIMESTAMPTZ, $7::INT2, \
                $8::INT4, $9::INT4, $10::NUMERIC, \
                $11::TEXT, $12::TIMESTAMPTZ, \
                $13::TIMESTAMPTZ, $14::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET date = EXCLUDED.date, \
                clock_out = EXCLUDED.clock_out, \
                status = EXCLUDED.status, \
                total_break_minutes = EXCLUDED.total_break_minutes, \
                duration_minutes = EXCLUDED.duration_minutes, \
                total_hours = EXCLUDED.total_hours, \
                shift_report = EXCLUDED.shift_report, \
                reported_at = EXCLUDED.reported_at, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &date,
                &time_zone,
                &clock_in,
                &clock_out,
                &status,
                &total_break,
                &duration,
                &total_hours,
                &shift_report,
                &reported_at,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Insert<attendance::Break>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Update<attendance::Break>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(b): Insert<attendance::Break>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(b)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<attendance::Break>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(b): Update<attendance::Break>,
    ) -> Result<Self::Ok, Self::Err> {
        let attendance::Break {
            id,
            attendance_id,
            start_time,
            end_time,
            duration,
            kind,
            notes,
        } = b;

        const SQL: &str = "\
            INSERT INTO attendance_breaks (\
                id, attendance_id, \
                start_time, end_time, duration_minutes, \
                kind, notes\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, \
                $3::TIMESTAMPTZ, $4::TIMESTAMPTZ, $5::INT4, \
                $6::INT2, $7::TEXT\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET end_time = EXCLUDED.end_time, \
                duration_minutes = EXCLUDED.duration_minutes, \
                notes = EXCLUDED.notes";
        self.exec(
            SQL,
            &[
                &id,
                &attendance_id,
                &start_time,
                &end_time,
                &duration,
                &kind,
                &notes,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Attendance, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Attendance, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let user_id: user::Id = by.into_inner();

        // Touching the row holds its lock until the transaction ends, even
        // when it already exists.
        const SQL: &str = "\
            INSERT INTO attendance_locks (user_id) \
            VALUES ($1::UUID) \
            ON CONFLICT (user_id) DO UPDATE \
            SET user_id = EXCLUDED.user_id";
        self.exec(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
