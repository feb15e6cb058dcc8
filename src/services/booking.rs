use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::config::Config;
use crate::entities::booking::{self, BookingStatus};
use crate::error::{AppError, AppResult};
use crate::utils::fare::{compute_fare, is_valid_distance};

/// Named fare constants, loaded from configuration.
/// The fare of every booking is `base_fee + distance_km * per_km_rate`.
#[derive(Debug, Clone, Copy)]
pub struct FarePolicy {
    pub base_fee: f64,
    pub per_km_rate: f64,
}

impl From<&Config> for FarePolicy {
    fn from(config: &Config) -> Self {
        Self {
            base_fee: config.fare_base_fee,
            per_km_rate: config.fare_per_km_rate,
        }
    }
}

/// Create a new ride request for `rider_id`. The booking starts out
/// `Pending` with no driver assigned.
pub async fn create_booking(
    db: &DatabaseConnection,
    policy: FarePolicy,
    rider_id: Uuid,
    pickup: &str,
    dropoff: &str,
    distance_km: f64,
) -> AppResult<booking::Model> {
    let pickup = pickup.trim();
    let dropoff = dropoff.trim();

    if pickup.is_empty() {
        return Err(AppError::BadRequest("Pickup location is required".to_string()));
    }
    if dropoff.is_empty() {
        return Err(AppError::BadRequest("Drop location is required".to_string()));
    }
    if !is_valid_distance(distance_km) {
        return Err(AppError::BadRequest(
            "Distance must be a non-negative number of kilometers".to_string(),
        ));
    }

    let fare = compute_fare(policy.base_fee, policy.per_km_rate, distance_km);

    let new_booking = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        rider_id: Set(rider_id),
        driver_id: Set(None),
        pickup: Set(pickup.to_string()),
        dropoff: Set(dropoff.to_string()),
        distance_km: Set(distance_km),
        fare: Set(fare),
        status: Set(BookingStatus::Pending),
        ..Default::default()
    };

    Ok(new_booking.insert(db).await?)
}

/// All bookings ever requested by `rider_id`, oldest first.
pub async fn bookings_for_rider(
    db: &DatabaseConnection,
    rider_id: Uuid,
) -> AppResult<Vec<booking::Model>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::RiderId.eq(rider_id))
        .order_by_asc(booking::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(bookings)
}

/// All bookings still waiting for a driver, oldest first.
/// Every driver sees the same list.
pub async fn pending_bookings(db: &DatabaseConnection) -> AppResult<Vec<booking::Model>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .order_by_asc(booking::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(bookings)
}

/// Assign `driver_id` to a pending booking.
///
/// The transition is a single conditional UPDATE keyed by booking id and
/// current status, so two drivers racing for the same booking resolve to
/// exactly one winner; the loser gets a conflict.
pub async fn accept_booking(
    db: &DatabaseConnection,
    booking_id: Uuid,
    driver_id: Uuid,
) -> AppResult<booking::Model> {
    let result = booking::Entity::update_many()
        .set(booking::ActiveModel {
            status: Set(BookingStatus::Accepted),
            driver_id: Set(Some(driver_id)),
            ..Default::default()
        })
        .filter(booking::Column::Id.eq(booking_id))
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return match find_booking(db, booking_id).await? {
            Some(_) => Err(AppError::Conflict(
                "Ride has already been taken".to_string(),
            )),
            None => Err(AppError::NotFound("Booking not found".to_string())),
        };
    }

    find_booking(db, booking_id)
        .await?
        .ok_or_else(|| AppError::Internal("Booking missing after accept".to_string()))
}

/// Mark an accepted ride as completed. Only the assigned driver may do so.
pub async fn complete_booking(
    db: &DatabaseConnection,
    booking_id: Uuid,
    driver_id: Uuid,
) -> AppResult<booking::Model> {
    let result = booking::Entity::update_many()
        .set(booking::ActiveModel {
            status: Set(BookingStatus::Completed),
            ..Default::default()
        })
        .filter(booking::Column::Id.eq(booking_id))
        .filter(booking::Column::Status.eq(BookingStatus::Accepted))
        .filter(booking::Column::DriverId.eq(driver_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        // Status first: a pending ride has no driver yet, which must not
        // read as an ownership failure
        return Err(match find_booking(db, booking_id).await? {
            None => AppError::NotFound("Booking not found".to_string()),
            Some(b) if b.status != BookingStatus::Accepted => {
                AppError::Conflict("Ride is not in an accepted state".to_string())
            }
            Some(_) => AppError::Forbidden("You are not assigned to this ride".to_string()),
        });
    }

    find_booking(db, booking_id)
        .await?
        .ok_or_else(|| AppError::Internal("Booking missing after completion".to_string()))
}

/// Cancel an accepted ride. Only the requesting rider may do so.
pub async fn cancel_booking(
    db: &DatabaseConnection,
    booking_id: Uuid,
    rider_id: Uuid,
) -> AppResult<booking::Model> {
    let result = booking::Entity::update_many()
        .set(booking::ActiveModel {
            status: Set(BookingStatus::Cancelled),
            ..Default::default()
        })
        .filter(booking::Column::Id.eq(booking_id))
        .filter(booking::Column::Status.eq(BookingStatus::Accepted))
        .filter(booking::Column::RiderId.eq(rider_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(match find_booking(db, booking_id).await? {
            None => AppError::NotFound("Booking not found".to_string()),
            Some(b) if b.status != BookingStatus::Accepted => {
                AppError::Conflict("Only accepted rides can be cancelled".to_string())
            }
            Some(_) => AppError::Forbidden("You can only cancel your own bookings".to_string()),
        });
    }

    find_booking(db, booking_id)
        .await?
        .ok_or_else(|| AppError::Internal("Booking missing after cancellation".to_string()))
}

async fn find_booking(
    db: &DatabaseConnection,
    booking_id: Uuid,
) -> AppResult<Option<booking::Model>> {
    Ok(booking::Entity::find_by_id(booking_id).one(db).await?)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;

    const POLICY: FarePolicy = FarePolicy {
        base_fee: 50.0,
        per_km_rate: 10.0,
    };

    fn booking_model(
        rider_id: Uuid,
        driver_id: Option<Uuid>,
        status: BookingStatus,
    ) -> booking::Model {
        booking::Model {
            id: Uuid::new_v4(),
            rider_id,
            driver_id,
            pickup: "Airport".to_string(),
            dropoff: "Old Town".to_string(),
            distance_km: 5.0,
            fare: 100.0,
            status,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn create_booking_starts_pending_without_driver() {
        let rider_id = Uuid::new_v4();
        let expected = booking_model(rider_id, None, BookingStatus::Pending);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![expected.clone()]])
            .into_connection();

        let created = create_booking(&db, POLICY, rider_id, "Airport", "Old Town", 5.0)
            .await
            .expect("create failed");

        assert_eq!(created.status, BookingStatus::Pending);
        assert_eq!(created.driver_id, None);
        assert_eq!(created.fare, 100.0);
    }

    #[tokio::test]
    async fn create_booking_rejects_empty_locations() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let rider_id = Uuid::new_v4();

        let err = create_booking(&db, POLICY, rider_id, "  ", "Old Town", 5.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = create_booking(&db, POLICY, rider_id, "Airport", "", 5.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        // No insert reached the database
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn create_booking_rejects_bad_distances() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let rider_id = Uuid::new_v4();

        for distance in [-1.0, f64::NAN, f64::INFINITY] {
            let err = create_booking(&db, POLICY, rider_id, "Airport", "Old Town", distance)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }

        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn accept_booking_assigns_driver() {
        let rider_id = Uuid::new_v4();
        let driver_id = Uuid::new_v4();
        let accepted = booking_model(rider_id, Some(driver_id), BookingStatus::Accepted);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([vec![accepted.clone()]])
            .into_connection();

        let booking = accept_booking(&db, accepted.id, driver_id)
            .await
            .expect("accept failed");

        assert_eq!(booking.status, BookingStatus::Accepted);
        assert_eq!(booking.driver_id, Some(driver_id));
    }

    #[tokio::test]
    async fn accept_booking_missing_id_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([Vec::<booking::Model>::new()])
            .into_connection();

        let err = accept_booking(&db, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn accept_booking_already_taken_is_conflict() {
        let rider_id = Uuid::new_v4();
        let winner = Uuid::new_v4();
        let taken = booking_model(rider_id, Some(winner), BookingStatus::Accepted);

        // The conditional UPDATE matched no rows because the status already
        // changed; the follow-up read sees the winner's assignment.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![taken.clone()]])
            .into_connection();

        let err = accept_booking(&db, taken.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn complete_booking_requires_assigned_driver() {
        let rider_id = Uuid::new_v4();
        let assigned = Uuid::new_v4();
        let accepted = booking_model(rider_id, Some(assigned), BookingStatus::Accepted);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![accepted.clone()]])
            .into_connection();

        let err = complete_booking(&db, accepted.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn complete_pending_booking_is_conflict_not_forbidden() {
        let rider_id = Uuid::new_v4();
        let pending = booking_model(rider_id, None, BookingStatus::Pending);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![pending.clone()]])
            .into_connection();

        let err = complete_booking(&db, pending.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn cancel_by_other_rider_is_forbidden() {
        let rider_id = Uuid::new_v4();
        let accepted = booking_model(rider_id, Some(Uuid::new_v4()), BookingStatus::Accepted);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![accepted.clone()]])
            .into_connection();

        let err = cancel_booking(&db, accepted.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn cancel_booking_only_from_accepted() {
        let rider_id = Uuid::new_v4();
        let pending = booking_model(rider_id, None, BookingStatus::Pending);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![pending.clone()]])
            .into_connection();

        let err = cancel_booking(&db, pending.id, rider_id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn pending_listing_only_contains_pending() {
        let waiting = vec![
            booking_model(Uuid::new_v4(), None, BookingStatus::Pending),
            booking_model(Uuid::new_v4(), None, BookingStatus::Pending),
        ];

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([waiting.clone()])
            .into_connection();

        let bookings = pending_bookings(&db).await.expect("list failed");
        assert_eq!(bookings.len(), 2);
        assert!(bookings
            .iter()
            .all(|b| b.status == BookingStatus::Pending && b.driver_id.is_none()));

        // The query itself carries the status filter
        let log = db.into_transaction_log();
        assert!(format!("{:?}", log).contains("status"));
    }

    #[tokio::test]
    async fn rider_listing_is_scoped_to_rider() {
        let rider_id = Uuid::new_v4();
        let mine = vec![
            booking_model(rider_id, None, BookingStatus::Pending),
            booking_model(rider_id, Some(Uuid::new_v4()), BookingStatus::Accepted),
        ];

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([mine.clone()])
            .into_connection();

        let bookings = bookings_for_rider(&db, rider_id).await.expect("list failed");
        assert_eq!(bookings.len(), 2);
        assert!(bookings.iter().all(|b| b.rider_id == rider_id));

        // Creation order comes from the query itself, oldest first
        let sql = format!("{:?}", db.into_transaction_log());
        assert!(sql.contains("ORDER BY"));
        assert!(sql.contains("created_at"));
    }
}
