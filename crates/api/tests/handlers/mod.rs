mod booking_test;
mod middleware_test;
mod time_slot_test;
