use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/admin/timeslots",
            get(handlers::admin::list_timeslots).post(handlers::admin::create_timeslot),
        )
        .route(
            "/api/admin/timeslots/:id",
            get(handlers::admin::get_timeslot)
                .put(handlers::admin::update_timeslot)
                .delete(handlers::admin::delete_timeslot),
        )
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route(
            "/api/admin/bookings/:id",
            delete(handlers::admin::cancel_booking),
        )
}
