pub mod room_provider;
