use calbook_core::errors::CalendarResult;
use calbook_core::models::booking::BookingStatusFilter;
use calbook_core::models::time_slot::{SlotWindow, UpdateTimeSlotRequest};
use chrono::{DateTime, Utc};
use mockall::mock;
use uuid::Uuid;

use crate::models::{
    DbAuthToken, DbBooking, DbBookingDetail, DbCategory, DbSlotWithBooking, DbTimeSlot, DbUser,
};
use crate::repositories::booking::BookingFilter;
use crate::repositories::time_slot::SlotFilter;

// Mock repositories for testing

mock! {
    pub UserRepo {
        pub async fn create_user(
            &self,
            username: &'static str,
            email: &'static str,
            password_hash: &'static str,
            is_staff: bool,
        ) -> CalendarResult<DbUser>;

        pub async fn get_user_by_id(&self, id: Uuid) -> eyre::Result<Option<DbUser>>;

        pub async fn get_user_by_username(
            &self,
            username: &'static str,
        ) -> eyre::Result<Option<DbUser>>;

        pub async fn verify_credentials(
            &self,
            username: &'static str,
            password: &'static str,
        ) -> eyre::Result<Option<DbUser>>;

        pub async fn create_token(
            &self,
            user_id: Uuid,
            token: &'static str,
        ) -> eyre::Result<DbAuthToken>;

        pub async fn get_user_by_token(
            &self,
            token: &'static str,
        ) -> eyre::Result<Option<DbUser>>;

        pub async fn delete_token(&self, token: &'static str) -> eyre::Result<()>;
    }
}

mock! {
    pub CategoryRepo {
        pub async fn list_categories(&self) -> eyre::Result<Vec<DbCategory>>;

        pub async fn get_category_by_id(&self, id: Uuid) -> eyre::Result<Option<DbCategory>>;
    }
}

mock! {
    pub TimeSlotRepo {
        pub async fn list_slots(
            &self,
            filter: SlotFilter,
        ) -> eyre::Result<Vec<DbSlotWithBooking>>;

        pub async fn get_slot_with_booking(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbSlotWithBooking>>;

        pub async fn user_booked_windows(
            &self,
            user_id: Uuid,
        ) -> eyre::Result<Vec<SlotWindow>>;

        pub async fn create_time_slot(
            &self,
            category_id: Uuid,
            start_time: DateTime<Utc>,
            end_time: DateTime<Utc>,
            created_by: Uuid,
        ) -> CalendarResult<DbTimeSlot>;

        pub async fn update_time_slot(
            &self,
            id: Uuid,
            changes: UpdateTimeSlotRequest,
        ) -> CalendarResult<DbTimeSlot>;

        pub async fn delete_time_slot(&self, id: Uuid) -> CalendarResult<DbTimeSlot>;
    }
}

mock! {
    pub BookingRepo {
        pub async fn create_booking(
            &self,
            time_slot_id: Uuid,
            user_id: Uuid,
        ) -> CalendarResult<DbBooking>;

        pub async fn get_booking_detail(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbBookingDetail>>;

        pub async fn delete_booking(&self, id: Uuid) -> CalendarResult<()>;

        pub async fn list_user_bookings(
            &self,
            user_id: Uuid,
            status: Option<BookingStatusFilter>,
            now: DateTime<Utc>,
        ) -> eyre::Result<Vec<DbBookingDetail>>;

        pub async fn list_bookings(
            &self,
            filter: BookingFilter,
        ) -> eyre::Result<Vec<DbBookingDetail>>;
    }
}
